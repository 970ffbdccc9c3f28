use crate::error::{Result, SimpleGithubError};
use crate::models::LastUpdate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message a consumer shows when a search matched nothing.
pub const NO_SEARCH_RESULT: &str = "No search result";
pub const NO_DESCRIPTION: &str = "No description provided.";
pub const NO_LANGUAGE: &str = "No language specified.";

/// Decode a fully buffered response body.
///
/// Any decoding failure, including a violated model invariant, is reported
/// as [`SimpleGithubError::MalformedPayload`]. Unknown fields are ignored.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| SimpleGithubError::MalformedPayload(e.to_string()))
}

// GitHub API response structures

/// OAuth access token returned by the identity host.
///
/// Two tokens are equal when their token strings are equal.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "AccessTokenWire")]
pub struct AccessToken {
    #[serde(rename = "access_token")]
    value: String,
    #[serde(rename = "token_type")]
    scheme: String,
    scope: String,
}

#[derive(Deserialize)]
struct AccessTokenWire {
    access_token: String,
    token_type: String,
    scope: String,
}

impl TryFrom<AccessTokenWire> for AccessToken {
    type Error = String;

    fn try_from(wire: AccessTokenWire) -> std::result::Result<Self, Self::Error> {
        if wire.access_token.is_empty() {
            return Err("access_token must not be empty".to_string());
        }
        Ok(AccessToken {
            value: wire.access_token,
            scheme: wire.token_type,
            scope: wire.scope,
        })
    }
}

impl AccessToken {
    pub fn new(
        value: impl Into<String>,
        scheme: impl Into<String>,
        scope: impl Into<String>,
    ) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(SimpleGithubError::BadArgument(
                "access token must not be empty".to_string(),
            ));
        }
        Ok(AccessToken {
            value,
            scheme: scheme.into(),
            scope: scope.into(),
        })
    }

    /// A bearer token restored from storage, where only the token string survives.
    pub fn bearer(value: impl Into<String>) -> Result<Self> {
        Self::new(value, "bearer", "")
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for AccessToken {}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("scheme", &self.scheme)
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OwnerWire")]
pub struct Owner {
    pub login: String,
    pub avatar_url: String,
}

#[derive(Deserialize)]
struct OwnerWire {
    login: String,
    avatar_url: String,
}

impl TryFrom<OwnerWire> for Owner {
    type Error = String;

    fn try_from(wire: OwnerWire) -> std::result::Result<Self, Self::Error> {
        check_owner(&wire.login, &wire.avatar_url)?;
        Ok(Owner {
            login: wire.login,
            avatar_url: wire.avatar_url,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RepositoryWire")]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "stargazers_count")]
    pub stars: u32,
    pub updated_at: String,
}

#[derive(Deserialize)]
struct RepositoryWire {
    id: u64,
    name: String,
    full_name: String,
    owner: Owner,
    description: Option<String>,
    language: Option<String>,
    stargazers_count: u32,
    updated_at: String,
}

impl TryFrom<RepositoryWire> for Repository {
    type Error = String;

    fn try_from(wire: RepositoryWire) -> std::result::Result<Self, Self::Error> {
        check_full_name(&wire.full_name, &wire.owner.login, &wire.name)?;
        Ok(Repository {
            id: wire.id,
            name: wire.name,
            full_name: wire.full_name,
            owner: wire.owner,
            description: wire.description,
            language: wire.language,
            stars: wire.stargazers_count,
            updated_at: wire.updated_at,
        })
    }
}

fn check_owner(login: &str, avatar_url: &str) -> std::result::Result<(), String> {
    if login.is_empty() {
        return Err("owner.login must not be empty".to_string());
    }
    url::Url::parse(avatar_url).map_err(|e| format!("owner.avatar_url is not an absolute URL: {}", e))?;
    Ok(())
}

fn check_full_name(full_name: &str, login: &str, name: &str) -> std::result::Result<(), String> {
    let expected = format!("{}/{}", login, name);
    if full_name != expected {
        return Err(format!(
            "full_name {:?} does not match owner/name {:?}",
            full_name, expected
        ));
    }
    Ok(())
}

impl Repository {
    /// Check a repository built in code against the rules decoding enforces.
    pub fn validate(&self) -> Result<()> {
        check_owner(&self.owner.login, &self.owner.avatar_url)
            .and_then(|()| check_full_name(&self.full_name, &self.owner.login, &self.name))
            .map_err(SimpleGithubError::BadArgument)
    }

    pub fn last_update(&self) -> LastUpdate {
        LastUpdate::parse(&self.updated_at)
    }

    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or(NO_DESCRIPTION)
    }

    pub fn language_or_default(&self) -> &str {
        self.language.as_deref().unwrap_or(NO_LANGUAGE)
    }

    pub fn stars_label(&self) -> String {
        if self.stars == 1 {
            "1 star".to_string()
        } else {
            format!("{} stars", self.stars)
        }
    }
}

/// First page of a repository search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SearchResultWire")]
pub struct SearchResult {
    pub total_count: u64,
    pub items: Vec<Repository>,
}

#[derive(Deserialize)]
struct SearchResultWire {
    total_count: u64,
    items: Vec<Repository>,
}

impl TryFrom<SearchResultWire> for SearchResult {
    type Error = String;

    fn try_from(wire: SearchResultWire) -> std::result::Result<Self, Self::Error> {
        if wire.items.len() as u64 > wire.total_count {
            return Err(format!(
                "{} items exceed total_count {}",
                wire.items.len(),
                wire.total_count
            ));
        }
        Ok(SearchResult {
            total_count: wire.total_count,
            items: wire.items,
        })
    }
}

impl SearchResult {
    /// True when the server reported no matches; consumers show [`NO_SEARCH_RESULT`].
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

/// Error body returned by the OAuth token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct OAuthErrorBody {
    pub error: String,
    pub error_description: Option<String>,
}

/// Error body returned by the REST API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: String,
}
