use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use podcastr::api::DEFAULT_API_URL;
use podcastr::locale::Locale;
use podcastr::pages::{DEFAULT_PATH_LIMIT, DEFAULT_REVALIDATE_SECS};

#[derive(Debug, Parser)]
#[command(
    name = "podcastr",
    version,
    about = "Fetch podcast episodes and render or pre-generate their detail pages"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Base URL of the episodes API
    #[arg(long, global = true, env = "PODCASTR_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Month names used for publication dates (en, pt-BR)
    #[arg(long, global = true, env = "PODCASTR_LOCALE", default_value = "en")]
    pub locale: Locale,

    /// Per-request connect and read timeout
    #[arg(long, global = true, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Attempts per request before giving up
    #[arg(long, global = true, default_value_t = 3)]
    pub retries: usize,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the ids of the newest episodes
    Paths {
        #[arg(long, default_value_t = DEFAULT_PATH_LIMIT)]
        limit: usize,
    },
    /// Fetch one episode and print its detail view
    Show {
        id: String,
        /// Print the view model as JSON
        #[arg(long)]
        json: bool,
        /// Pass description HTML through unescaped
        #[arg(long)]
        trust_description: bool,
    },
    /// Write one JSON page per episode, skipping pages that are still fresh
    Generate {
        /// Episode ids to generate; defaults to the newest episodes
        ids: Vec<String>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_PATH_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = DEFAULT_REVALIDATE_SECS)]
        revalidate_secs: u64,
        /// Regenerate pages even when they are still fresh
        #[arg(long)]
        force: bool,
        /// Pass description HTML through unescaped
        #[arg(long)]
        trust_description: bool,
    },
}
