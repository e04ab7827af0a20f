mod links;
mod records;
mod scrape;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use prodex_core::{AppConfig, OrderRecord, ProductRecord, ScrapeSettings};
use prodex_scraper::{SanitizerSet, Site};
use prodex_store::{DedupStore, JsonFileBackend, PoolConfig, RecordBackend, SqliteBackend};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "prodex")]
#[command(about = "Extract product and order records from storefront pages")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape one product page and store the record
    Scrape {
        url: String,

        /// Parse this saved HTML file instead of fetching the URL
        #[arg(long)]
        html: Option<PathBuf>,

        /// External id to store the record under (derived from the page when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Use this site's strategy table regardless of the URL's host
        #[arg(long)]
        site: Option<Site>,

        /// JSON scrape settings file
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Scrape one seller order detail page and store the order
    Order {
        url: String,

        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Scrape every link in a file (JSON array or one URL per line)
    Bulk {
        links: PathBuf,

        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Print every stored record
    List {
        #[arg(long)]
        orders: bool,
    },
    /// Print one stored record
    Get {
        id: String,

        #[arg(long)]
        orders: bool,
    },
    /// Delete stored records by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,

        #[arg(long)]
        orders: bool,
    },
    /// Move records from the fallback directory into the database
    SyncFallback,
    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending schema migrations
    Migrate,
}

/// Product and order stores sharing one pair of backends.
struct Stores {
    products: DedupStore<ProductRecord>,
    orders: DedupStore<OrderRecord>,
}

async fn open_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    let sqlite = SqliteBackend::connect(&config.database_url, PoolConfig::default())
        .await
        .context("failed to open primary store")?;
    sqlite
        .run_migrations()
        .await
        .context("failed to migrate primary store")?;

    let primary: Arc<dyn RecordBackend> = Arc::new(sqlite);
    let secondary: Arc<dyn RecordBackend> =
        Arc::new(JsonFileBackend::new(config.fallback_dir.clone()));
    Ok(Stores {
        products: DedupStore::new(Arc::clone(&primary), Arc::clone(&secondary)),
        orders: DedupStore::new(primary, secondary),
    })
}

fn load_sanitizers(config: &AppConfig) -> anyhow::Result<SanitizerSet> {
    match &config.brand_rules_path {
        Some(path) => {
            let file = prodex_core::load_brand_rules(path)?;
            Ok(SanitizerSet::from_rules_file(&file)?)
        }
        None => Ok(SanitizerSet::builtin()),
    }
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<ScrapeSettings> {
    match path {
        Some(path) => Ok(prodex_core::load_settings(path)?),
        None => Ok(ScrapeSettings::default()),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = prodex_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(command) => run(&config, command).await,
        None => {
            println!("prodex ready; run `prodex --help` for commands");
            Ok(())
        }
    }
}

async fn run(config: &AppConfig, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Scrape {
            url,
            html,
            id,
            site,
            settings,
        } => {
            let settings = load_settings(settings.as_ref())?;
            let sanitizers = load_sanitizers(config)?;
            let stores = open_stores(config).await?;
            let request = scrape::ScrapeRequest {
                url,
                id,
                site,
                html,
            };
            scrape::scrape_product(config, &stores.products, &sanitizers, &request, &settings).await
        }
        Commands::Order { url, html } => {
            let stores = open_stores(config).await?;
            scrape::scrape_order(config, &stores.orders, &url, html.as_deref()).await
        }
        Commands::Bulk { links, settings } => {
            let settings = load_settings(settings.as_ref())?;
            let sanitizers = load_sanitizers(config)?;
            let links = links::load_links(&links)?;
            let stores = open_stores(config).await?;
            scrape::scrape_bulk(config, &stores.products, &sanitizers, &links, &settings).await
        }
        Commands::List { orders } => {
            let stores = open_stores(config).await?;
            if orders {
                records::list(&stores.orders).await
            } else {
                records::list(&stores.products).await
            }
        }
        Commands::Get { id, orders } => {
            let stores = open_stores(config).await?;
            if orders {
                records::get(&stores.orders, &id).await
            } else {
                records::get(&stores.products, &id).await
            }
        }
        Commands::Delete { ids, orders } => {
            let stores = open_stores(config).await?;
            if orders {
                records::delete(&stores.orders, &ids).await
            } else {
                records::delete(&stores.products, &ids).await
            }
        }
        Commands::SyncFallback => {
            let stores = open_stores(config).await?;
            records::sync_fallback(&stores).await
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let sqlite =
                SqliteBackend::connect(&config.database_url, PoolConfig::default()).await?;
            let applied = sqlite.run_migrations().await?;
            tracing::info!(applied, "migrations complete");
            print_json(&serde_json::json!({ "applied": applied }))
        }
    }
}
