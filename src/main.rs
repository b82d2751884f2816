//! # Recipe Cards CLI (`cards`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cards init` | Create an empty store file |
//! | `cards extract` | Extract every card not yet in the store |
//! | `cards list` | List stored recipes |
//! | `cards show <id>` | Print one recipe as JSON |
//! | `cards serve` | Serve images and store over HTTP |
//!
//! ## Examples
//!
//! ```bash
//! cards --config ./config/cards.toml extract --limit 5
//! RUST_LOG=debug cards extract
//! cards serve
//! ```

use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use recipe_cards::config::{self, Config};
use recipe_cards::store::JsonFileStore;
use recipe_cards::{catalog, pipeline, server};

const DEFAULT_CONFIG: &str = "./config/cards.toml";

/// Recipe Cards CLI: extract structured recipes from card photos.
#[derive(Parser)]
#[command(
    name = "cards",
    about = "Recipe Cards — extract structured recipes from photographed recipe cards",
    version,
    long_about = "Recipe Cards sends photographed recipe cards to a multimodal model, \
    stores the extracted title, ingredients, nutrition and tags in a JSON file, \
    and serves the collection to the local network."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cards.toml`. If that file does not exist the
    /// built-in defaults are used (`./data.json`, `./images`, Gemini).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty store file.
    ///
    /// Idempotent: an existing valid store is left untouched.
    Init,

    /// Extract recipes from cards not yet in the store.
    ///
    /// Scans the image directory for front images, sends each new card to
    /// the extraction service, and saves the store after every success.
    /// Cards that fail are skipped and retried on the next run.
    Extract {
        /// Maximum number of cards to process.
        #[arg(long)]
        limit: Option<usize>,

        /// List pending cards without calling the service.
        #[arg(long)]
        dry_run: bool,
    },

    /// List stored recipes.
    List {
        /// Only show one vendor: `hf` or `gousto`.
        #[arg(long)]
        vendor: Option<String>,
    },

    /// Print a recipe by id.
    Show {
        /// Recipe id, e.g. `007`.
        id: String,
    },

    /// Serve the images and store over HTTP.
    ///
    /// Binds to `[server].bind` and serves `[server].root`.
    Serve,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// Loads the config file, falling back to defaults only when the default
/// path is absent. An explicit `--config` that does not exist is an error.
fn resolve_config(path: &Path) -> anyhow::Result<Config> {
    if path == Path::new(DEFAULT_CONFIG) && !path.exists() {
        return Ok(Config::minimal());
    }
    config::load_config(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let cfg = resolve_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = JsonFileStore::new(&cfg.store.path);
            if store.init()? {
                println!("Store initialized: {}", cfg.store.path.display());
            } else {
                println!("Store already initialized: {}", cfg.store.path.display());
            }
        }
        Commands::Extract { limit, dry_run } => {
            pipeline::run_extract(&cfg, limit, dry_run).await?;
        }
        Commands::List { vendor } => {
            catalog::run_list(&cfg, vendor.as_deref())?;
        }
        Commands::Show { id } => {
            catalog::run_show(&cfg, &id)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
