use crate::call::CallHandle;
use crate::error::{Result, SimpleGithubError};
use crate::oauth::OAuthApp;
use crate::types::{decode, AccessToken, ApiErrorBody, OAuthErrorBody, Repository, SearchResult};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

pub const AUTH_BASE_URL: &str = "https://github.com";
pub const API_BASE_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "Simple GitHub/0.1.0";
const API_ACCEPT: &str = "application/vnd.github.v3+json";
const JSON_ACCEPT: &str = "application/json";

/// Transport settings shared by every client variant.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Identity host serving the OAuth endpoints.
    pub auth_base_url: Url,
    /// REST API host.
    pub api_base_url: Url,
    pub user_agent: String,
    /// `None` keeps the transport's default.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            auth_base_url: Url::parse(AUTH_BASE_URL).expect("valid auth base URL"),
            api_base_url: Url::parse(API_BASE_URL).expect("valid api base URL"),
            user_agent: USER_AGENT.to_string(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn with_base_urls(auth_base_url: &str, api_base_url: &str) -> Result<Self> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| SimpleGithubError::Config(format!("invalid base URL {}: {}", raw, e)))
        };
        Ok(ClientConfig {
            auth_base_url: parse(auth_base_url)?,
            api_base_url: parse(api_base_url)?,
            ..Default::default()
        })
    }
}

/// Append path segments to a base URL, percent-encoding each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SimpleGithubError::Config(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    AccessToken,
    SearchRepositories,
    Repository,
}

impl Endpoint {
    fn name(self) -> &'static str {
        match self {
            Endpoint::AccessToken => "access_token",
            Endpoint::SearchRepositories => "search_repositories",
            Endpoint::Repository => "repository",
        }
    }

    /// The identity host never sees a stored token.
    fn carries_token(self) -> bool {
        !matches!(self, Endpoint::AccessToken)
    }
}

/// Client for the OAuth identity host and the REST API.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    config: Arc<ClientConfig>,
    token: Option<AccessToken>,
}

impl GitHubClient {
    /// Unauthenticated client against the public GitHub hosts.
    pub fn new() -> Result<Self> {
        Self::unauthenticated(ClientConfig::default())
    }

    pub fn unauthenticated(config: ClientConfig) -> Result<Self> {
        let client = build_transport(&config)?;
        Ok(GitHubClient {
            client,
            config: Arc::new(config),
            token: None,
        })
    }

    /// Client that sends `Authorization: token <value>` with every API request.
    /// The token exchange goes out without it.
    pub fn authenticated(config: ClientConfig, token: AccessToken) -> Result<Self> {
        Ok(Self::unauthenticated(config)?.with_token(token))
    }

    /// Same transport, now carrying `token`.
    pub fn with_token(&self, token: AccessToken) -> Self {
        GitHubClient {
            client: self.client.clone(),
            config: self.config.clone(),
            token: Some(token),
        }
    }

    pub fn without_token(&self) -> Self {
        GitHubClient {
            client: self.client.clone(),
            config: self.config.clone(),
            token: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, endpoint: Endpoint, method: Method, url: Url, accept: &'static str) -> RequestBuilder {
        let builder = self.client.request(method, url).header(ACCEPT, accept);
        match &self.token {
            Some(token) if endpoint.carries_token() => {
                builder.header(AUTHORIZATION, format!("token {}", token.value()))
            }
            _ => builder,
        }
    }

    /// Send a request and buffer the whole body.
    async fn execute(&self, endpoint: Endpoint, request: RequestBuilder) -> Result<(StatusCode, Vec<u8>)> {
        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            warn!(endpoint = endpoint.name(), error = %e, "request failed before a response arrived");
            SimpleGithubError::Transport(e)
        })?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        debug!(
            endpoint = endpoint.name(),
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "GitHub response"
        );

        Ok((status, body))
    }

    /// Exchange the authorization code delivered to the redirect URI for an access token.
    pub async fn exchange_authorization_code(&self, app: &OAuthApp, code: &str) -> Result<AccessToken> {
        require_non_empty("code", code)?;
        let url = endpoint(&self.config.auth_base_url, &["login", "oauth", "access_token"])?;
        let request = self.request(Endpoint::AccessToken, Method::POST, url, JSON_ACCEPT).form(&[
            ("client_id", app.client_id()),
            ("client_secret", app.client_secret()),
            ("code", code),
        ]);

        let (status, body) = self.execute(Endpoint::AccessToken, request).await?;
        if !status.is_success() {
            return Err(SimpleGithubError::AuthRejected {
                status,
                message: error_message(status, &body),
            });
        }

        // A declined code still comes back as 200 with an error body.
        if let Ok(rejection) = serde_json::from_slice::<OAuthErrorBody>(&body) {
            warn!(error = %rejection.error, "token exchange declined");
            return Err(SimpleGithubError::AuthRejected {
                status,
                message: rejection.error_description.unwrap_or(rejection.error),
            });
        }

        decode(&body)
    }

    /// Search public repositories by keyword. Only the first page is fetched.
    pub async fn search_repositories(&self, query: &str) -> Result<SearchResult> {
        require_non_empty("query", query)?;
        let mut url = endpoint(&self.config.api_base_url, &["search", "repositories"])?;
        url.query_pairs_mut().append_pair("q", query);

        let request = self.request(Endpoint::SearchRepositories, Method::GET, url, API_ACCEPT);
        let (status, body) = self.execute(Endpoint::SearchRepositories, request).await?;
        if !status.is_success() {
            return Err(SimpleGithubError::HttpStatus {
                status,
                message: error_message(status, &body),
            });
        }

        decode(&body)
    }

    pub async fn get_repository(&self, login: &str, name: &str) -> Result<Repository> {
        require_non_empty("login", login)?;
        require_non_empty("repository name", name)?;
        let url = endpoint(&self.config.api_base_url, &["repos", login, name])?;

        let request = self.request(Endpoint::Repository, Method::GET, url, API_ACCEPT);
        let (status, body) = self.execute(Endpoint::Repository, request).await?;
        match status {
            StatusCode::NOT_FOUND => Err(SimpleGithubError::NotFound(format!("{}/{}", login, name))),
            status if !status.is_success() => Err(SimpleGithubError::HttpStatus {
                status,
                message: error_message(status, &body),
            }),
            _ => decode(&body),
        }
    }

    /// Start a token exchange and return a cancellable handle to it.
    ///
    /// Argument errors are reported here rather than through the handle.
    pub fn spawn_exchange_authorization_code(
        &self,
        app: &OAuthApp,
        code: &str,
    ) -> Result<CallHandle<AccessToken>> {
        require_non_empty("code", code)?;
        let client = self.clone();
        let app = app.clone();
        let code = code.to_string();
        Ok(CallHandle::spawn(async move {
            client.exchange_authorization_code(&app, &code).await
        }))
    }

    pub fn spawn_search_repositories(&self, query: &str) -> Result<CallHandle<SearchResult>> {
        require_non_empty("query", query)?;
        let client = self.clone();
        let query = query.to_string();
        Ok(CallHandle::spawn(async move {
            client.search_repositories(&query).await
        }))
    }

    pub fn spawn_get_repository(&self, login: &str, name: &str) -> Result<CallHandle<Repository>> {
        require_non_empty("login", login)?;
        require_non_empty("repository name", name)?;
        let client = self.clone();
        let login = login.to_string();
        let name = name.to_string();
        Ok(CallHandle::spawn(async move {
            client.get_repository(&login, &name).await
        }))
    }
}

fn build_transport(config: &ClientConfig) -> Result<Client> {
    let mut builder = Client::builder().user_agent(config.user_agent.clone());
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SimpleGithubError::BadArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// Best message the server offered for a failed response.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(api) = serde_json::from_slice::<ApiErrorBody>(body) {
        return api.message;
    }
    if let Ok(oauth) = serde_json::from_slice::<OAuthErrorBody>(body) {
        return oauth.error;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() && text.len() <= 200 {
        return text.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("Unexpected error")
        .to_string()
}
