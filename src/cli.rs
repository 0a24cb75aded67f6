//! CLI argument definitions for Spyglass.

use clap::{Args, Parser, Subcommand};

use crate::view::DEFAULT_PAGE_SIZE;

/// Spyglass - a GitHub issues dashboard for an organization's repositories.
///
/// Running `sg` with no subcommand shows the issues dashboard.
#[derive(Parser, Debug)]
#[command(name = "sg")]
#[command(author, version, about = "Browse GitHub issues across an organization's repositories", long_about = None)]
pub struct Cli {
    /// Repository owner (organization or user)
    #[arg(short = 'o', long = "owner", global = true, env = "SPYGLASS_OWNER")]
    pub owner: Option<String>,

    /// Structured catalog source: a CSV URL or file path
    #[arg(long = "catalog", global = true, env = "SPYGLASS_CATALOG")]
    pub catalog: Option<String>,

    /// GitHub bearer token (falls back to the stored token)
    #[arg(
        long = "token",
        global = true,
        env = "SPYGLASS_GITHUB_TOKEN",
        hide_env_values = true
    )]
    pub token: Option<String>,

    /// Output JSON instead of human-readable text
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the issues dashboard (the default command)
    Issues(IssuesArgs),

    /// List the repository catalog with cached issue counts
    Repos,

    /// Show one issue in full, with its comments
    Show {
        /// Repository name
        repo: String,
        /// Issue number
        number: u64,
    },

    /// Manage the stored GitHub token
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Get or set the list/card rendering preference
    View {
        /// New view mode: "list" or "card" (omit to print the current one)
        mode: Option<String>,
    },

    /// Show the tracked API rate-limit budget
    RateLimit,
}

/// Arguments for the issues dashboard.
#[derive(Args, Debug)]
pub struct IssuesArgs {
    /// Filter to one repository ("all" for every repository)
    #[arg(short, long)]
    pub repo: Option<String>,

    /// Filter by state: open, closed, all
    #[arg(long)]
    pub state: Option<String>,

    /// Filter by assignee: all, unassigned, or a login
    #[arg(long)]
    pub assignee: Option<String>,

    /// Filter by label name ("all" for any)
    #[arg(long)]
    pub label: Option<String>,

    /// Case-insensitive search over title, body, number, and labels
    #[arg(short, long)]
    pub search: Option<String>,

    /// Sort key: updated, created, comments, title, number
    #[arg(long)]
    pub sort: Option<String>,

    /// Page to display
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,

    /// Issues per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Bypass the cached snapshot and refetch
    #[arg(long)]
    pub refresh: bool,

    /// Print the shareable filter fragment instead of the dashboard
    #[arg(long)]
    pub link: bool,

    /// Start from a shareable filter fragment
    #[arg(long, value_name = "FRAGMENT")]
    pub from_link: Option<String>,
}

impl Default for IssuesArgs {
    fn default() -> Self {
        Self {
            repo: None,
            state: None,
            assignee: None,
            label: None,
            search: None,
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            refresh: false,
            link: false,
            from_link: None,
        }
    }
}

/// Token management commands
#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Store a token (cached data is invalidated)
    Set {
        /// The GitHub bearer token
        token: String,
    },
    /// Remove the stored token (cached data is invalidated)
    Clear,
    /// Show whether a token is stored
    Status,
}
