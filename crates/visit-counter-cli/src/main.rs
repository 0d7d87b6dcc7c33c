//! Drive the visit counter from a workstation.
//!
//! Talks to the configured DynamoDB table, which makes it handy against
//! DynamoDB Local. Run with `RUST_LOG=info` to see what the counter does.
//!
//! ```sh
//! visits --endpoint-url http://localhost:8000 create-table --wait
//! visits --endpoint-url http://localhost:8000 hit alice
//! visits --endpoint-url http://localhost:8000 show alice
//! ```
use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use visits::{
    dynamodb::BillingMode, Config, VisitCounter, VisitRecord, VisitRequest, VisitResponse,
    VisitStore,
};

#[derive(Parser)]
#[command(name = "visits", version, about = "Count page visits per user")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a visit, exactly as the hosted function would.
    Hit {
        user: String,
        /// Print the raw JSON response.
        #[arg(long)]
        json: bool,
    },
    /// Show the stored count without recording a visit.
    Show { user: String },
    /// Create the visit-count table.
    CreateTable {
        /// Provisioned read capacity, on-demand billing when omitted.
        #[arg(long, requires = "write_capacity")]
        read_capacity: Option<i64>,
        /// Provisioned write capacity, on-demand billing when omitted.
        #[arg(long, requires = "read_capacity")]
        write_capacity: Option<i64>,
        /// Wait for the table to become active.
        #[arg(long)]
        wait: bool,
    },
}

fn billing_mode(read_capacity: Option<i64>, write_capacity: Option<i64>) -> BillingMode {
    match (read_capacity, write_capacity) {
        (Some(read_capacity_units), Some(write_capacity_units)) => BillingMode::Provisioned {
            read_capacity_units,
            write_capacity_units,
        },
        _ => BillingMode::PayPerRequest,
    }
}

fn print_response(response: &VisitResponse, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        println!("{}", response.message.green());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let store = cli.config.dynamo_store().await;

    match cli.command {
        Command::Hit { user, json } => {
            let counter = VisitCounter::from_config(store, &cli.config);
            let response = counter.handle(&VisitRequest::new(user)).await?;
            print_response(&response, json)?;
        }
        Command::Show { user } => {
            let found = store.get(&user).await?;
            if found.is_none() {
                log::info!("'{user}' has no record");
            }
            let record = VisitRecord::or_absent(found, &user);
            println!("{}: {}", record.user.bold(), record.count);
        }
        Command::CreateTable {
            read_capacity,
            write_capacity,
            wait,
        } => {
            store
                .create_table(billing_mode(read_capacity, write_capacity))
                .await?;
            if wait {
                store
                    .wait_until_active(std::time::Duration::from_secs(60 * 5))
                    .await
                    .context("table did not become active")?;
                println!("{} '{}' is active", "table".green(), store.table_name());
            } else {
                println!(
                    "{} '{}' is being created",
                    "table".yellow(),
                    store.table_name()
                );
            }
        }
    }
    Ok(())
}
