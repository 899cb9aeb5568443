//! Schemaless CLI - inspect and edit a schema-inferring SQLite store

mod criteria;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use criteria::{build_find_options, CriteriaArgs};
use schemaless_core::domain::{Document, Entity};
use schemaless_core::port::{InMemorySchemaRegistry, RegisteredSchema, Repository};
use schemaless_infra_sqlite::{
    create_pool, Location, RepositoryOptions, SqliteRepository, StoreConfig,
};
use serde_json::Value;
use std::sync::Arc;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DB_PATH: &str = "~/.schemaless/store.db";
const DEFAULT_LOG_FILTER: &str = "schemaless_core=info,schemaless_infra_sqlite=info,schemaless_cli=info";

#[derive(Parser)]
#[command(name = "schemaless")]
#[command(about = "Schemaless entity store CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file (`:memory:` for a throwaway store)
    #[arg(long, env = "SCHEMALESS_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db: String,

    /// Table to operate on
    #[arg(short, long, global = true, default_value = "documents")]
    table: String,

    /// Known column names, used to seed inference for an existing table
    #[arg(long, value_delimiter = ',', global = true)]
    columns: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show live columns and their inferred metadata
    Columns,

    /// Query documents
    Find(FindArgs),

    /// Count documents matching the filters
    Count(FindArgs),

    /// Upsert one JSON object or an array of them
    Save {
        /// JSON document(s)
        json: String,
    },

    /// Delete documents by id
    Remove {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Args)]
struct FindArgs {
    /// Equality filter, `field=value` (`field=null` matches NULL)
    #[arg(short = 'w', long = "where")]
    equals: Vec<String>,

    #[arg(long)]
    gt: Vec<String>,

    #[arg(long)]
    gte: Vec<String>,

    #[arg(long)]
    lt: Vec<String>,

    #[arg(long)]
    lte: Vec<String>,

    /// Sort key, `field` or `field:desc`
    #[arg(short, long)]
    order: Vec<String>,

    #[arg(short, long)]
    limit: Option<u64>,

    #[arg(long)]
    offset: Option<u64>,
}

impl From<FindArgs> for CriteriaArgs {
    fn from(args: FindArgs) -> Self {
        Self {
            equals: args.equals,
            gt: args.gt,
            gte: args.gte,
            lt: args.lt,
            lte: args.lte,
            order: args.order,
            limit: args.limit,
            offset: args.offset,
        }
    }
}

#[derive(Tabled)]
struct ColumnRow {
    column: String,
    live: bool,
    sql_type: String,
    nullable: String,
    kind: String,
}

fn init_logging() -> Result<()> {
    // JSON for machines, pretty for people; always on stderr so stdout stays parseable
    let log_format = std::env::var("SCHEMALESS_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}

/// `--db` (or `SCHEMALESS_DB_PATH`) plus the environment overrides
fn store_config(db: &str) -> Result<StoreConfig> {
    let config = StoreConfig::from_location(db)
        .with_env_overrides()
        .context("Invalid store configuration")?;

    if let Location::File(path) = &config.location {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(config)
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn print_documents(documents: &[Document], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(documents)?);
        }
        OutputFormat::Table => {
            let mut headers: Vec<String> = vec!["id".to_string()];
            for doc in documents {
                for key in doc.fields.keys() {
                    if !headers.contains(key) {
                        headers.push(key.clone());
                    }
                }
            }

            let mut builder = Builder::default();
            builder.push_record(headers.clone());
            for doc in documents {
                let mut row = vec![doc.id.clone().unwrap_or_default()];
                row.extend(headers[1..].iter().map(|h| render_value(doc.get(h))));
                builder.push_record(row);
            }
            let mut table = builder.build();
            table.with(Style::rounded());
            println!("{}", table);
            println!("{}", format!("{} document(s)", documents.len()).dimmed());
        }
    }
    Ok(())
}

async fn run(cli: Cli, repo: &SqliteRepository<Document>) -> Result<()> {
    match cli.command {
        Commands::Columns => {
            let live = repo.live_columns().await?;
            let inferred = repo.columns();
            let mut names: Vec<String> = live.clone();
            for name in inferred.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }

            let rows: Vec<ColumnRow> = names
                .into_iter()
                .map(|name| {
                    let meta = inferred.get(&name);
                    ColumnRow {
                        live: live.contains(&name),
                        sql_type: meta.map(|m| m.sql_type.to_string()).unwrap_or_default(),
                        nullable: meta.map(|m| m.nullable.to_string()).unwrap_or_default(),
                        kind: meta.map(|m| format!("{:?}", m.kind)).unwrap_or_default(),
                        column: name,
                    }
                })
                .collect();

            println!("{}", format!("Table {}", repo.table_name()).cyan().bold());
            println!("{}", Table::new(rows).with(Style::rounded()));
        }

        Commands::Find(args) => {
            let options = build_find_options(&args.into())?;
            let documents = repo.find(options).await?;
            print_documents(&documents, cli.format)?;
        }

        Commands::Count(args) => {
            let options = build_find_options(&args.into())?;
            println!("{}", repo.count(options).await?);
        }

        Commands::Save { json } => {
            let parsed: Value = serde_json::from_str(&json).context("Invalid JSON document")?;
            let documents: Vec<Document> = match parsed {
                Value::Array(items) => items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<std::result::Result<_, _>>()
                    .context("Every array item must be a JSON object")?,
                other => vec![serde_json::from_value(other).context("Document must be a JSON object")?],
            };

            let saved = repo.save_many(documents).await?;
            println!("{}", format!("✓ Saved {} document(s)", saved.len()).green().bold());
            print_documents(&saved, cli.format)?;
        }

        Commands::Remove { ids } => {
            let documents = ids
                .into_iter()
                .map(|id| Document {
                    id: Some(id),
                    ..Document::default()
                })
                .collect();
            let removed = repo.remove_many(documents).await?;
            println!("{}", format!("✓ Removed {} document(s)", removed.len()).green().bold());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let config = store_config(&cli.db)?;
    info!(db = %cli.db, table = %cli.table, "Opening store");
    let pool = create_pool(&config).await.context("Failed to open database")?;

    // Document is dynamic: the registry decides which table it maps to
    let registry = Arc::new(InMemorySchemaRegistry::new());
    registry.register::<Document>(RegisteredSchema {
        table_name: Some(cli.table.clone()),
        columns: cli.columns.clone(),
    });

    let repo: SqliteRepository<Document> = SqliteRepository::with_options(
        pool,
        RepositoryOptions {
            registry: Some(registry),
            ..RepositoryOptions::default()
        },
    )
    .await
    .with_context(|| format!("Failed to open {} table {}", Document::TYPE_NAME, cli.table))?;

    let result = run(cli, &repo).await;
    repo.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_config() {
        let config = store_config(":memory:").unwrap();
        assert_eq!(config.location, Location::Memory);
    }

    #[test]
    fn test_cli_parses_find_criteria() {
        let cli = Cli::try_parse_from([
            "schemaless", "--db", ":memory:", "--table", "pets", "find", "--gte", "age=18",
            "--order", "name:desc", "--limit", "5",
        ])
        .unwrap();
        assert_eq!(cli.table, "pets");
        match cli.command {
            Commands::Find(args) => {
                let options = build_find_options(&args.into()).unwrap();
                assert_eq!(options.filters.len(), 1);
                assert_eq!(options.take, Some(5));
            }
            _ => panic!("expected find"),
        }
    }
}
