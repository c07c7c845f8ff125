use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docmodel::config::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_MS};
use docmodel::{loader, Bootstrap, BootstrapConfig, ModelSource, SqliteConnector};
use docmodel_core::Database;

#[derive(Parser)]
#[command(name = "docmodel")]
#[command(about = "Compile document-model declarations and synchronize their schemas")]
struct Cli {
    /// Schema store location (defaults to the platform data directory)
    #[arg(long, global = true, env = "DOCMODEL_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compiled schema documents for matching declaration files
    Compile {
        /// Glob of declaration files, e.g. models/**/*.json
        pattern: String,
    },
    /// Compile matching declaration files and synchronize them with the store
    Sync {
        pattern: String,

        /// Connection retries on a busy store
        #[arg(long, env = "DOCMODEL_RETRIES", default_value_t = DEFAULT_RETRIES)]
        retries: u32,

        /// Wait between connection attempts, in milliseconds
        #[arg(long, env = "DOCMODEL_RETRY_DELAY_MS", default_value_t = DEFAULT_RETRY_DELAY_MS)]
        retry_delay_ms: u64,
    },
    /// Print a stored schema
    Show {
        name: String,

        /// Print only the validator, without store directives
        #[arg(long)]
        validator: bool,
    },
    /// List stored schemas
    List,
}

fn open_store(path: Option<PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "docmodel=info,docmodel_core=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { pattern } => {
            let models = loader::load_pattern(&pattern)?;
            println!("{}", serde_json::to_string_pretty(&models)?);
        }
        Commands::Sync {
            pattern,
            retries,
            retry_delay_ms,
        } => {
            let connector = match cli.db {
                Some(path) => SqliteConnector::new(path),
                None => SqliteConnector::default_location(),
            };
            let config = BootstrapConfig::new(retries, Duration::from_millis(retry_delay_ms));

            let ready = Bootstrap::new(connector, ModelSource::Pattern(pattern))
                .with_config(config)
                .run()
                .await?;

            if let Some(report) = ready.report {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Commands::Show { name, validator } => {
            let db = open_store(cli.db)?;
            let Some(stored) = db.get_schema(&name)? else {
                bail!("No schema stored for model {}", name);
            };
            if validator {
                println!("{}", serde_json::to_string_pretty(&stored.schema.json_schema())?);
            } else {
                println!("{}", serde_json::to_string_pretty(&stored)?);
            }
        }
        Commands::List => {
            let db = open_store(cli.db)?;
            for stored in db.list_schemas()? {
                println!(
                    "{}\trev {}\t{}/{}\t{}",
                    stored.name,
                    stored.revision,
                    stored.validation_action.as_str(),
                    stored.validation_level.as_str(),
                    stored.updated_at.to_rfc3339()
                );
            }
        }
    }

    Ok(())
}
