mod inflect;
mod migration;
mod publish;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::FilesConfig;
use common::config::DEFAULT_CONFIG_PATH;
use console::style;
use tracing_subscriber::EnvFilter;

use migration::{CommandGenerator, MigrationError, Patch, add_file_field};
use publish::{Publish, publish_config};

#[derive(Parser)]
#[command(name = "modelfiles")]
#[command(author, version, about = "Scaffolding for records with file collections")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a migration adding a nullable JSON `files` column to a model's table
    AddFileField {
        /// Model name, e.g. Invoice
        model: String,
    },

    /// Write the default configuration file
    PublishConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Destination
        #[arg(long, default_value_t = format!("{DEFAULT_CONFIG_PATH}.toml"))]
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::AddFileField { model } => run_add_file_field(&model),
        Commands::PublishConfig { force, path } => run_publish_config(PathBuf::from(path), force),
    }
}

fn run_add_file_field(model: &str) -> Result<()> {
    let config = FilesConfig::load().context("Failed to load config")?;
    let generator = CommandGenerator::from_config(&config.migrations);

    match add_file_field(&generator, &config.migrations, model) {
        Ok(Patch::Applied { table, path }) => println!(
            "{}\n  {}",
            style(format!(
                "Migration to add 'files' field to {table} table has been created and updated."
            ))
            .green(),
            style(path.display()).dim()
        ),
        Ok(Patch::AnchorMissing { table, path }) => println!(
            "{}",
            style(format!(
                "Migration {} has no Schema::table('{table}', ...) block; add the files column by hand.",
                path.display()
            ))
            .yellow()
        ),
        Err(MigrationError::MigrationFileNotFound { .. }) => {
            println!("{}", style("Failed to find the migration file.").red())
        }
        Err(err) => println!("{}", style(err).red()),
    }
    Ok(())
}

fn run_publish_config(path: PathBuf, force: bool) -> Result<()> {
    match publish_config(&path, force)? {
        Publish::Written => println!(
            "{}",
            style(format!("Config published to {}.", path.display())).green()
        ),
        Publish::AlreadyExists => println!(
            "{}",
            style(format!(
                "{} already exists. Use --force to overwrite it.",
                path.display()
            ))
            .yellow()
        ),
    }
    Ok(())
}
