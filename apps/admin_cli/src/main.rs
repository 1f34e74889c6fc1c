mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use mutation_engine::{Collection, HttpRemote, MutationController, Notifier};
use serde_json::Value;
use shared::domain::Record;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Optimistic CRUD against a REST collection")]
struct Args {
    #[arg(long, default_value = "admin.toml")]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    resource: Option<String>,
    #[arg(long)]
    id_field: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current collection.
    List,
    /// Create a record from a JSON object.
    Create { json: String },
    /// Patch the record with `id` using a JSON object.
    Update { id: String, json: String },
    Delete { id: String },
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("ok: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("failed: {message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(resource) = args.resource {
        settings.resource = resource;
    }
    if let Some(id_field) = args.id_field {
        settings.engine.id_field = id_field;
    }

    let remote = Arc::new(HttpRemote::with_timeout(
        &settings.server_url,
        &settings.resource,
        settings.request_timeout(),
    )?);
    info!(url = %remote.collection_url(), "admin: loading collection");
    let records = remote
        .list()
        .await
        .map_err(|failure| anyhow!(mutation_engine::normalize(&failure)))
        .context("failed to load collection")?;

    let collection = Collection::new(records);
    let controller =
        MutationController::new_with_options(collection.clone(), remote, settings.engine)
            .with_notifier(Arc::new(ConsoleNotifier));

    let succeeded = match args.command {
        Command::List => true,
        Command::Create { json } => {
            let outcome = controller.create_item(parse_record(&json)?).await;
            if let Some(item) = &outcome.item {
                print_json("created", &Value::Object(item.clone()))?;
            }
            outcome.is_success()
        }
        Command::Update { id, json } => {
            let updated = controller.update_item(&id, parse_record(&json)?).await;
            if let Some(item) = &updated {
                print_json("updated", &Value::Object(item.clone()))?;
            }
            updated.is_some()
        }
        Command::Delete { id } => controller.delete_item(&id).await,
    };

    let items = collection.snapshot().into_iter().map(Value::Object).collect();
    print_json("collection", &Value::Array(items))?;

    if !succeeded {
        let message = controller
            .state()
            .last_error_message()
            .unwrap_or_else(|| mutation_engine::FALLBACK_MESSAGE.to_string());
        println!("error: {message}");
        bail!(message);
    }
    Ok(())
}

fn parse_record(json: &str) -> Result<Record> {
    match serde_json::from_str::<Value>(json).context("argument is not valid JSON")? {
        Value::Object(record) => Ok(record),
        other => bail!("expected a JSON object, got {other}"),
    }
}

fn print_json(label: &str, value: &Value) -> Result<()> {
    println!("{label}: {}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
