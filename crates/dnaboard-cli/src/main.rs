//! dnaboard CLI: build practice boards and record how the class did.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dnaboard", version, about = "Practice boards with spaced repetition")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a board for a group and print it
    Build {
        /// Group (class) the board is for
        #[arg(long)]
        group: String,

        /// Topics to draw fresh questions from (comma-separated, default: all)
        #[arg(long)]
        topics: Option<String>,

        /// Only fresh questions at this difficulty (e.g. "easy", "2", "•••")
        #[arg(long)]
        difficulty: Option<String>,

        /// Number of slots (default from config)
        #[arg(long)]
        capacity: Option<usize>,

        /// Seed for a reproducible board
        #[arg(long)]
        seed: Option<u64>,

        /// Show answers
        #[arg(long)]
        answers: bool,

        /// Write the board as JSON for a later `session`
        #[arg(long)]
        save: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Rate a saved board and record the session
    Session {
        /// Board JSON written by `build --save`
        #[arg(long)]
        board: PathBuf,

        /// Scores in display order (comma-separated: 0, 25, 75 or 100)
        #[arg(long)]
        ratings: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List items due for review
    Due {
        /// Group (class) to check
        #[arg(long)]
        group: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show session statistics for a group
    Stats {
        /// Group (class) to summarize
        #[arg(long)]
        group: String,

        /// Break results down by topic
        #[arg(long)]
        by_topic: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Publish a saved board so other groups can reuse it
    Share {
        /// Board JSON written by `build --save`
        #[arg(long)]
        board: PathBuf,

        /// Display name
        #[arg(long)]
        name: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List shared boards
    Shared {
        /// Filter by name or topic
        #[arg(long)]
        search: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Generate sample instances from a question bank
    Preview {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,

        /// Only this item
        #[arg(long)]
        item: Option<String>,

        /// Instances per item
        #[arg(long, default_value = "1")]
        count: usize,

        /// Seed for reproducible output
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dnaboard=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            group,
            topics,
            difficulty,
            capacity,
            seed,
            answers,
            save,
            config,
        } => {
            commands::build::execute(
                group, topics, difficulty, capacity, seed, answers, save, config,
            )
            .await
        }
        Commands::Session {
            board,
            ratings,
            config,
        } => commands::session::execute(board, ratings, config).await,
        Commands::Due { group, config } => commands::due::execute(group, config).await,
        Commands::Stats {
            group,
            by_topic,
            format,
            config,
        } => commands::stats::execute(group, by_topic, format, config),
        Commands::Share {
            board,
            name,
            config,
        } => commands::share::publish(board, name, config).await,
        Commands::Shared { search, config } => commands::share::list(search, config).await,
        Commands::Preview {
            bank,
            item,
            count,
            seed,
        } => commands::preview::execute(bank, item, count, seed),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
