//! iam-drift
//!
//! Builds service access matrices from collector output and reports drift
//! between two matrices

use anyhow::Context;
use clap::{Parser, Subcommand};
use iam_drift::{classify, AccessAnalyzer, Config, DirectoryStore};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "iam-drift")]
#[command(about = "IAM service access matrices and drift reports")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the service and access level of each action
    Classify {
        /// Actions such as s3:GetObject
        #[arg(required = true)]
        actions: Vec<String>,
    },

    /// Build the action detail and service access matrix
    Matrix {
        /// Directory holding input and output collections
        #[arg(short = 'r', long)]
        root: PathBuf,

        /// TOML configuration file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Users collector output
        #[arg(long)]
        users: Option<String>,

        /// Groups collector output
        #[arg(long)]
        groups: Option<String>,

        /// Roles collector output
        #[arg(long)]
        roles: Option<String>,

        /// Prefix for output collection names
        #[arg(long)]
        output_prefix: Option<String>,
    },

    /// Compare two matrices and write the drift report
    Drift {
        /// Directory holding input and output collections
        #[arg(short = 'r', long)]
        root: PathBuf,

        /// TOML configuration file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Earlier matrix (.csv or .jsonl)
        #[arg(long)]
        day1: Option<String>,

        /// Later matrix (.csv or .jsonl)
        #[arg(long)]
        day2: Option<String>,

        /// Drift report collection
        #[arg(short = 'o', long)]
        output: Option<String>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load configuration from {:?}", path)),
        None => Ok(Config::default()),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Classify { actions } => {
            for action in actions {
                let result = classify(&action);
                println!("{}\t{}\t{}", action, result.service, result.level);
            }
        }

        Command::Matrix {
            root,
            config,
            users,
            groups,
            roles,
            output_prefix,
        } => {
            let mut matrix = load_config(config.as_deref())?
                .matrix
                .unwrap_or_default();
            if let Some(users) = users {
                matrix = matrix.with_users(users);
            }
            if let Some(groups) = groups {
                matrix = matrix.with_groups(groups);
            }
            if let Some(roles) = roles {
                matrix = matrix.with_roles(roles);
            }
            if let Some(prefix) = output_prefix {
                matrix = matrix.with_output_prefix(prefix);
            }

            let checked = Config {
                matrix: Some(matrix),
                drift: None,
            };
            checked.check().context("invalid matrix configuration")?;
            let matrix = checked.matrix()?;

            info!("Building service access matrix under {:?}", root);
            let mut analyzer = AccessAnalyzer::new(DirectoryStore::new(&root))
                .with_cache_capacity(matrix.classification_cache_capacity);
            let outcome = analyzer
                .matrix_job(matrix)
                .with_context(|| format!("matrix job under {:?} failed", root))?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::Drift {
            root,
            config,
            day1,
            day2,
            output,
        } => {
            let mut drift = load_config(config.as_deref())?
                .drift
                .unwrap_or_default();
            if let Some(day1) = day1 {
                drift.day1_matrix = day1;
            }
            if let Some(day2) = day2 {
                drift.day2_matrix = day2;
            }
            if let Some(output) = output {
                drift.output = output;
            }

            let checked = Config {
                matrix: None,
                drift: Some(drift),
            };
            checked.check().context("invalid drift configuration")?;

            info!("Comparing matrices under {:?}", root);
            let analyzer = AccessAnalyzer::new(DirectoryStore::new(&root));
            let report = analyzer
                .drift_job(checked.drift()?)
                .with_context(|| format!("drift job under {:?} failed", root))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
