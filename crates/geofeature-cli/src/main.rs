//! geofeature CLI - run feature-service operations against configured
//! PostGIS databases and print the JSON documents they produce.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    CollectionCommand, CollectionsCommand, GlobalArgs, ItemCommand, ItemsCommand,
    QueryablesCommand,
};
use geofeature_query::FeatureError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Service configuration file (YAML or JSON)
    #[arg(
        long,
        default_value = "geofeature.yaml",
        env = "GEOFEATURE_CONFIG",
        global = true
    )]
    config: PathBuf,

    /// Base URL used for links in collection documents
    #[arg(
        long,
        default_value = "http://localhost:8000",
        env = "GEOFEATURE_BASE_URL",
        global = true
    )]
    base_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "GEOFEATURE_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "GEOFEATURE_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every collection of every configured database
    Collections(CollectionsCommand),
    /// Show the metadata of one collection
    Collection(CollectionCommand),
    /// Show the queryable properties of one collection
    Queryables(QueryablesCommand),
    /// Query the features of a collection
    Items(ItemsCommand),
    /// Fetch one feature by its gid
    Item(ItemCommand),
}

fn init_tracing(log_level: &str, log_format: &str) -> anyhow::Result<()> {
    // If RUST_LOG is set, use it directly; otherwise use our default filter
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG environment variable: {}", e))?
    } else {
        // Our crates at the requested level, the driver at warn
        tracing_subscriber::EnvFilter::new(format!(
            "geofeature={level},\
             geofeature_query={level},\
             geofeature_query_postgres={level},\
             tokio_postgres=warn",
            level = log_level
        ))
    };

    // Logs go to stderr so stdout stays pure JSON
    let fmt_layer = match log_format {
        "full" => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, &cli.log_format)?;

    let global = GlobalArgs {
        config: cli.config,
        base_url: cli.base_url,
    };

    let result = match cli.command {
        Commands::Collections(cmd) => cmd.execute(&global),
        Commands::Collection(cmd) => cmd.execute(&global),
        Commands::Queryables(cmd) => cmd.execute(&global),
        Commands::Items(cmd) => cmd.execute(&global),
        Commands::Item(cmd) => cmd.execute(&global),
    };

    // Service errors are reported as problem documents
    if let Err(e) = &result {
        if let Some(feature_error) = e.downcast_ref::<FeatureError>() {
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&feature_error.problem_details())?
            );
            std::process::exit(1);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "geofeature",
            "item",
            "data.public.parcels",
            "7",
            "--config",
            "service.json",
            "--log-format",
            "full",
        ]);
        assert_eq!(cli.config, PathBuf::from("service.json"));
        assert_eq!(cli.log_format, "full");
        match cli.command {
            Commands::Item(cmd) => {
                assert_eq!(cmd.collection_id, "data.public.parcels");
                assert_eq!(cmd.feature_id, "7");
            }
            _ => panic!("expected the item command"),
        }
    }
}
