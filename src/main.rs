mod cli;

use anyhow::{anyhow, Context};
use clap::Parser;
use cli::{Cli, Command};
use colored::*;
use simple_github::oauth::{authorize_url, extract_authorization_code};
use simple_github::types::NO_SEARCH_RESULT;
use simple_github::{
    AccessToken, AuthTokenStore, CallHandle, ClientConfig, GitHubClient, OAuthApp, Repository,
    SearchHistory, SimpleGithubError,
};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ClientConfig::with_base_urls(&cli.auth_url, &cli.api_url)?;
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => simple_github::store::default_data_dir()?,
    };
    let store = AuthTokenStore::new(&data_dir);

    match &cli.command {
        Command::Login { redirect } => login(&cli, config, &store, redirect.as_deref()).await,
        Command::Logout => {
            store.clear_token()?;
            println!("{}", "Signed out".green());
            Ok(())
        }
        Command::Status => {
            if store.has_token()? {
                println!("{} (preferences at {})", "Signed in".green(), store.path().display());
            } else {
                println!("{}", "Not signed in".yellow());
            }
            Ok(())
        }
        Command::Search { query, with_token } => {
            let client = api_client(config, &store, *with_token)?;
            let result = run_cancellable(client.spawn_search_repositories(query)?).await?;

            if result.is_empty() {
                println!("{}", NO_SEARCH_RESULT.yellow());
                return Ok(());
            }

            println!(
                "{} repositories match {} (showing {})\n",
                result.total_count.to_string().bold(),
                query.cyan(),
                result.items.len()
            );
            for repo in &result.items {
                println!(
                    "{}  {}  {}",
                    repo.full_name.bold(),
                    repo.language_or_default().dimmed(),
                    repo.stars_label().yellow()
                );
            }
            Ok(())
        }
        Command::Repo { owner, name, with_token } => {
            let client = api_client(config, &store, *with_token)?;
            let repo = run_cancellable(client.spawn_get_repository(owner, name)?).await?;
            print_repository(&repo);
            SearchHistory::new(&data_dir).add(&repo)?;
            Ok(())
        }
        Command::History { clear } => history(&data_dir, *clear),
    }
}

fn oauth_app(cli: &Cli) -> anyhow::Result<OAuthApp> {
    match (&cli.client_id, &cli.client_secret) {
        (Some(id), Some(secret)) => Ok(OAuthApp::new(id.clone(), secret.clone())?),
        _ => OAuthApp::from_build_env()
            .ok_or_else(|| anyhow!("no OAuth client id/secret configured (set GITHUB_CLIENT_ID and GITHUB_CLIENT_SECRET)")),
    }
}

async fn login(
    cli: &Cli,
    config: ClientConfig,
    store: &AuthTokenStore,
    redirect: Option<&str>,
) -> anyhow::Result<()> {
    let app = oauth_app(cli)?;

    let Some(redirect) = redirect else {
        if store.has_token()? {
            println!("{}", "Already signed in".green());
        }
        println!("Open this URL in a browser to sign in:\n");
        println!("  {}\n", authorize_url(&config, app.client_id())?.as_str().cyan());
        println!("Then run: simple-github login --redirect '<redirect URI>'");
        return Ok(());
    };

    let code = extract_authorization_code(redirect)?;
    let client = GitHubClient::unauthenticated(config)?;
    let token = run_cancellable(client.spawn_exchange_authorization_code(&app, &code)?).await?;
    store.update_token(token.value())?;

    println!("{} (scope: {})", "Signed in".green(), display_scope(&token));
    Ok(())
}

fn display_scope(token: &AccessToken) -> &str {
    if token.scope().is_empty() {
        "none"
    } else {
        token.scope()
    }
}

/// Client for search and repository lookups.
///
/// A stored token is required, as the app only offers these screens after
/// sign-in, but it is only sent when asked for.
fn api_client(config: ClientConfig, store: &AuthTokenStore, with_token: bool) -> anyhow::Result<GitHubClient> {
    let token = store
        .token()?
        .ok_or_else(|| anyhow!("not signed in; run `simple-github login` first"))?;

    let client = GitHubClient::unauthenticated(config)?;
    if with_token {
        Ok(client.with_token(AccessToken::bearer(token)?))
    } else {
        Ok(client)
    }
}

/// Await a call, cancelling it on Ctrl+C.
async fn run_cancellable<T>(handle: CallHandle<T>) -> anyhow::Result<T> {
    let mut handle = handle;
    tokio::select! {
        outcome = &mut handle => outcome.map_err(report),
        _ = tokio::signal::ctrl_c() => {
            handle.cancel();
            Err(anyhow!("{}", "Cancelled".yellow()))
        }
    }
}

fn report(err: SimpleGithubError) -> anyhow::Error {
    match err {
        SimpleGithubError::NotFound(what) => anyhow!("{} not found", what),
        SimpleGithubError::AuthRejected { message, .. } => anyhow!("Sign-in rejected: {}", message),
        other => anyhow!("{}", other.message()),
    }
}

fn print_repository(repo: &Repository) {
    println!("{}", repo.full_name.bold().green());
    println!("{}", "=".repeat(repo.full_name.len()).dimmed());
    println!("Owner:        {} ({})", repo.owner.login, repo.owner.avatar_url.dimmed());
    println!("Stars:        {}", repo.stars_label().yellow());
    println!("Description:  {}", repo.description_or_default());
    println!("Language:     {}", repo.language_or_default());
    println!("Last update:  {}", repo.last_update());
}

fn history(data_dir: &Path, clear: bool) -> anyhow::Result<()> {
    let history = SearchHistory::new(data_dir);
    if clear {
        history.clear().context("failed to clear history")?;
        println!("{}", "History cleared".green());
        return Ok(());
    }

    let entries = history.entries()?;
    if entries.is_empty() {
        println!("{}", "No recently viewed repositories".yellow());
        return Ok(());
    }
    for entry in entries {
        println!(
            "{}  {}  {}",
            entry.repository.full_name.bold(),
            entry.repository.stars_label().yellow(),
            entry.viewed_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
    Ok(())
}
