//! Command-line front end for the CRUD core
//!
//! ```text
//! crudkit list todos --page 1 --limit 5 --filter userId=1
//! crudkit get users 3
//! crudkit --offline --config crudkit.yaml delete posts 1 2 3
//! ```

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use crudkit::prelude::*;
use serde::Serialize;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crudkit", version, about = "Browse and edit placeholder REST entities")]
struct Cli {
    /// YAML configuration file
    #[arg(long, short, env = "CRUDKIT_CONFIG")]
    config: Option<String>,

    /// Override the backend base url
    #[arg(long)]
    base_url: Option<String>,

    /// Serve requests from the configured local JSON data instead of the backend
    #[arg(long)]
    offline: bool,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List records of an entity
    List {
        entity: String,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
        /// Exact-match filter, repeatable (`field=value`)
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
        /// Sort as `field` or `field:desc`
        #[arg(long)]
        sort: Option<String>,
    },
    /// Show one record
    Get { entity: String, id: String },
    /// Select the given ids and delete them one request per id
    Delete {
        entity: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected field=value, got '{}'", raw))
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match &cli.config {
        Some(path) => ClientConfig::from_yaml_file(path)?,
        None => ClientConfig::default_config(),
    };
    Ok(config.with_overrides(cli.base_url.clone(), cli.timeout_ms)?)
}

fn build_transport(cli: &Cli, config: &ClientConfig) -> Result<Arc<dyn Transport>> {
    if cli.offline {
        let path = config
            .fallback_data
            .as_deref()
            .ok_or_else(|| anyhow!("--offline needs `fallback_data` in the configuration"))?;
        tracing::info!(path = %path, "Using local fallback data");
        return Ok(Arc::new(InMemoryTransport::from_json_file(path)?));
    }

    let transport =
        ReqwestTransport::with_connect_timeout(config.base_url.clone(), Duration::from_secs(5))?;
    Ok(Arc::new(transport))
}

fn print_json<V: Serialize>(value: &V) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run<T: Entity>(command: Command, gateway: RequestGateway, retry: RetryConfig) -> Result<()> {
    let client = ResourceClient::<T>::with_retry(gateway, retry);

    match command {
        Command::List {
            page,
            limit,
            filters,
            sort,
            ..
        } => {
            let mut query = ListQuery::new();
            if let Some(page) = page {
                query = query.page(page);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            for (field, value) in filters {
                query = query.filter(field, value);
            }
            if let Some(sort) = sort {
                query = query.sort(sort);
            }
            let records = client.list(&query).await?;
            print_json(&records)
        }
        Command::Get { id, .. } => {
            let record = client.get(&EntityId::parse(&id)).await?;
            print_json(&record)
        }
        Command::Delete { ids, .. } => {
            let mut selection = SelectionStore::new();
            let candidates: Vec<EntityId> = ids.iter().map(|raw| EntityId::parse(raw)).collect();
            selection.toggle_all(&candidates);

            let report = client.delete_many(selection.selected_ids()).await;
            for id in &report.deleted {
                println!("deleted {} {}", T::resource_name_singular(), id);
            }
            for (id, err) in &report.failed {
                eprintln!("failed {} {}: {}", T::resource_name_singular(), id, err);
            }
            if !report.is_complete() {
                bail!(
                    "{} of {} deletes failed",
                    report.failed.len(),
                    report.total()
                );
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crudkit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli).context("failed to load configuration")?;
    let transport = build_transport(&cli, &config)?;
    let gateway = RequestGateway::from_config(&config, transport);
    let retry = config.retry.clone();

    let entity = match &cli.command {
        Command::List { entity, .. } | Command::Get { entity, .. } | Command::Delete { entity, .. } => {
            entity.clone()
        }
    };
    let resource = config
        .entity(&entity)
        .map(|e| e.plural.clone())
        .unwrap_or(entity);

    match resource.as_str() {
        "users" => run::<User>(cli.command, gateway, retry).await,
        "posts" => run::<Post>(cli.command, gateway, retry).await,
        "todos" => run::<Todo>(cli.command, gateway, retry).await,
        "comments" => run::<Comment>(cli.command, gateway, retry).await,
        "photos" => run::<Photo>(cli.command, gateway, retry).await,
        "calendar" => run::<CalendarEvent>(cli.command, gateway, retry).await,
        other => bail!("unknown entity '{}'", other),
    }
}
