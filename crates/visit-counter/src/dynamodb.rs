//! AWS DynamoDB visit store.
//!
//! Items are laid out as `{"user": S, "count": N}` with `user` as the
//! partition key.
use std::collections::HashMap;

use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::types::{self as aws, AttributeValue};

use crate::{VisitRecord, VisitStore};

/// Partition key attribute.
pub const USER_ATTRIBUTE: &str = "user";
/// Visit count attribute.
pub const COUNT_ATTRIBUTE: &str = "count";

#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum BillingMode {
    #[default]
    PayPerRequest,
    Provisioned {
        read_capacity_units: i64,
        write_capacity_units: i64,
    },
}

impl From<BillingMode> for aws::BillingMode {
    fn from(value: BillingMode) -> Self {
        match value {
            BillingMode::PayPerRequest => aws::BillingMode::PayPerRequest,
            BillingMode::Provisioned { .. } => aws::BillingMode::Provisioned,
        }
    }
}

impl BillingMode {
    fn provisioned_throughput(self) -> anyhow::Result<Option<aws::ProvisionedThroughput>> {
        Ok(match self {
            BillingMode::PayPerRequest => None,
            BillingMode::Provisioned {
                read_capacity_units,
                write_capacity_units,
            } => Some(
                aws::ProvisionedThroughput::builder()
                    .read_capacity_units(read_capacity_units)
                    .write_capacity_units(write_capacity_units)
                    .build()?,
            ),
        })
    }
}

fn user_key(user: &str) -> AttributeValue {
    AttributeValue::S(user.to_owned())
}

/// Converts a record into a DynamoDB item.
pub fn record_to_item(record: &VisitRecord) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (USER_ATTRIBUTE.to_owned(), user_key(&record.user)),
        (
            COUNT_ATTRIBUTE.to_owned(),
            AttributeValue::N(record.count.to_string()),
        ),
    ])
}

/// Reads the record of `user` out of a DynamoDB item.
pub fn record_from_item(
    user: &str,
    item: &HashMap<String, AttributeValue>,
) -> anyhow::Result<VisitRecord> {
    let att = item
        .get(COUNT_ATTRIBUTE)
        .with_context(|| format!("no such attribute '{COUNT_ATTRIBUTE}'"))?;
    let count_str = att
        .as_n()
        .ok()
        .with_context(|| format!("'{COUNT_ATTRIBUTE}' is not a number"))?;
    let count = count_str
        .parse::<u64>()
        .with_context(|| format!("cannot parse '{COUNT_ATTRIBUTE}' value {count_str:?}"))?;
    Ok(VisitRecord::new(user, count))
}

/// A [`VisitStore`] backed by a DynamoDB table.
#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        DynamoStore {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn from_sdk_config(cfg: &SdkConfig, table_name: impl Into<String>) -> Self {
        Self::new(aws_sdk_dynamodb::Client::new(cfg), table_name)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Creates the visit-count table.
    ///
    /// AWS finishes creating the table asynchronously, use
    /// [`DynamoStore::wait_until_active`] before reading or writing items.
    pub async fn create_table(&self, billing_mode: BillingMode) -> anyhow::Result<()> {
        let out = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .billing_mode(billing_mode.into())
            .set_provisioned_throughput(billing_mode.provisioned_throughput()?)
            .key_schema(
                aws::KeySchemaElement::builder()
                    .attribute_name(USER_ATTRIBUTE)
                    .key_type(aws::KeyType::Hash)
                    .build()?,
            )
            .attribute_definitions(
                aws::AttributeDefinition::builder()
                    .attribute_name(USER_ATTRIBUTE)
                    .attribute_type(aws::ScalarAttributeType::S)
                    .build()?,
            )
            .send()
            .await
            .with_context(|| format!("could not create table '{}'", self.table_name))?;
        let description = out.table_description.context("missing table description")?;
        log::info!(
            "table {} {} creation started",
            self.table_name,
            description.table_arn().unwrap_or("(no arn)")
        );
        Ok(())
    }

    /// Polls the table until it is active, giving up after `timeout`.
    pub async fn wait_until_active(&self, timeout: std::time::Duration) -> anyhow::Result<()> {
        let start = std::time::Instant::now();
        log::info!("awaiting table finalization");
        loop {
            let out = self
                .client
                .describe_table()
                .table_name(&self.table_name)
                .send()
                .await
                .with_context(|| format!("could not describe table '{}'", self.table_name))?;
            let table_info = out.table.context("missing table description")?;
            if table_info.table_status == Some(aws::TableStatus::Active) {
                return Ok(());
            }
            anyhow::ensure!(
                table_info.table_status == Some(aws::TableStatus::Creating),
                "table finalization failed, table status: {:?}",
                table_info.table_status
            );
            if start.elapsed() >= timeout {
                anyhow::bail!("finalization timed out after {} seconds", timeout.as_secs());
            }
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        }
    }
}

impl VisitStore for DynamoStore {
    type Error = anyhow::Error;

    async fn get(&self, user: &str) -> anyhow::Result<Option<VisitRecord>> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(USER_ATTRIBUTE, user_key(user))
            .send()
            .await
            .with_context(|| format!("could not get item from '{}'", self.table_name))?;
        out.item
            .map(|item| record_from_item(user, &item))
            .transpose()
    }

    async fn put(&self, record: &VisitRecord) -> anyhow::Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record_to_item(record)))
            .send()
            .await
            .with_context(|| format!("could not put item into '{}'", self.table_name))?;
        Ok(())
    }

    async fn increment(&self, user: &str) -> anyhow::Result<VisitRecord> {
        // `count` is a reserved word in update expressions.
        let out = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(USER_ATTRIBUTE, user_key(user))
            .update_expression("ADD #count :one")
            .expression_attribute_names("#count", COUNT_ATTRIBUTE)
            .expression_attribute_values(":one", AttributeValue::N("1".to_owned()))
            .return_values(aws::ReturnValue::UpdatedNew)
            .send()
            .await
            .with_context(|| format!("could not update item in '{}'", self.table_name))?;
        let attributes = out.attributes.context("missing updated attributes")?;
        record_from_item(user, &attributes)
    }
}
