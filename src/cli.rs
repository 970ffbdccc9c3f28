use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "simple-github")]
#[command(about = "Simple GitHub - Sign in to GitHub, search repositories and inspect them")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub api_url: String,

    /// GitHub identity host serving the OAuth endpoints
    #[arg(long, env = "GITHUB_AUTH_URL", default_value = "https://github.com")]
    pub auth_url: String,

    /// Directory holding preferences and history (defaults to the platform config dir)
    #[arg(long, env = "SIMPLE_GITHUB_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// OAuth application client id (overrides the build-time value)
    #[arg(long, env = "GITHUB_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth application client secret (overrides the build-time value)
    #[arg(long, env = "GITHUB_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the authorization URL, or finish sign-in from the redirect URI
    Login {
        /// Redirect URI the browser was sent back to, carrying `code`
        #[arg(long)]
        redirect: Option<String>,
    },

    /// Forget the stored access token
    Logout,

    /// Show whether an access token is stored
    Status,

    /// Search public repositories (first page only)
    Search {
        query: String,

        /// Attach the stored token to the request
        #[arg(long)]
        with_token: bool,
    },

    /// Show a single repository and record it in the history
    Repo {
        owner: String,
        name: String,

        /// Attach the stored token to the request
        #[arg(long)]
        with_token: bool,
    },

    /// List recently viewed repositories
    History {
        /// Remove all entries instead of listing them
        #[arg(long)]
        clear: bool,
    },
}
