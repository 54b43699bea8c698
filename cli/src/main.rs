mod commands;
mod config;
mod server;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{
    AddArgs, FilterArgs, cmd_add, cmd_bookmark, cmd_bookmarks, cmd_export, cmd_import, cmd_list,
    cmd_rate, cmd_show,
};
use crate::config::Config;
use cookbook_core::local::LocalCatalog;
use cookbook_core::service::{CookbookService, RecipeCatalog};
use cookbook_core::store::JsonFileStore;

/// A catalog chosen at startup: the SQLite service or the local JSON file.
pub(crate) type Catalog = Box<dyn RecipeCatalog>;

#[derive(Parser)]
#[command(
    name = "cookbook",
    version,
    about = "Browse, rate, bookmark, import and export recipes"
)]
struct Cli {
    /// Use the local JSON catalog instead of the database
    #[arg(long, global = true)]
    local: bool,
    /// User id for ratings and bookmarks
    #[arg(long, global = true, env = "COOKBOOK_USER", default_value = "local")]
    user: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List recipes
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one recipe (a unique id prefix is enough)
    Show {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a recipe
    Add {
        #[command(flatten)]
        recipe: AddArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rate a recipe from 1 to 5
    Rate {
        id: String,
        rating: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle the bookmark on a recipe
    Bookmark {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List bookmarked recipes
    Bookmarks {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import recipes from a CSV file
    Import {
        /// Path to the .csv file
        file: PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export recipes as CSV or Markdown
    Export {
        /// csv or markdown
        format: String,
        /// Output file (default: recipes.csv / recipes.md)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn open_catalog(config: &Config, local: bool, user: &str) -> Result<Catalog> {
    if local {
        let store = JsonFileStore::new(&config.catalog_path);
        Ok(Box::new(LocalCatalog::open(store)?))
    } else {
        let service = CookbookService::new(&config.db_path, Some(user.to_string()))?;
        Ok(Box::new(service))
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let mut catalog = open_catalog(&config, cli.local, &cli.user)?;

    match cli.command {
        Commands::List { filter, json } => cmd_list(&*catalog, &filter, json),
        Commands::Show { id, json } => cmd_show(&*catalog, &id, json),
        Commands::Add { recipe, json } => cmd_add(&mut *catalog, recipe, json),
        Commands::Rate { id, rating, json } => cmd_rate(&mut *catalog, &id, rating, json),
        Commands::Bookmark { id, json } => cmd_bookmark(&mut *catalog, &id, json),
        Commands::Bookmarks { json } => cmd_bookmarks(&*catalog, json),
        Commands::Import {
            file,
            dry_run,
            json,
        } => cmd_import(&mut *catalog, &file, dry_run, json),
        Commands::Export {
            format,
            output,
            filter,
            json,
        } => cmd_export(&*catalog, &format, output, &filter, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                Some(config.load_or_create_api_key()?)
            };
            server::start_server(catalog, port, &bind, api_key).await
        }
    }
}
