//! The visit counter as an AWS Lambda function.
//!
//! Expects events of the form `{"user": "..."}` and answers with
//! `{"message": "...", "count": N}`. Configured through `VISIT_COUNT_TABLE`,
//! `DYNAMODB_ENDPOINT` and `VISIT_COUNT_STRATEGY`.
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use visits::{Config, DynamoStore, VisitCounter, VisitResponse};

async fn function_handler(
    counter: &VisitCounter<DynamoStore>,
    event: LambdaEvent<serde_json::Value>,
) -> Result<VisitResponse, Error> {
    let (payload, context) = event.into_parts();
    log::debug!("invocation {}", context.request_id);
    Ok(counter.handle_event(payload).await?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();

    let config = Config::from_env()?;
    log::info!(
        "counting visits in table '{}' ({})",
        config.table_name,
        config.strategy
    );
    let counter = VisitCounter::from_config(config.dynamo_store().await, &config);
    run(service_fn(|event| function_handler(&counter, event))).await
}
