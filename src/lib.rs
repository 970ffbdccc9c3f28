//! Core of a small GitHub browsing client.
//!
//! [`github::GitHubClient`] talks to the OAuth identity host and the REST
//! API, [`store::AuthTokenStore`] keeps the access token between runs, and
//! [`types`] holds the decoded values a UI renders.

pub mod call;
pub mod error;
pub mod github;
pub mod history;
pub mod models;
pub mod oauth;
pub mod store;
pub mod types;

pub use call::CallHandle;
pub use error::{ErrorKind, Result, SimpleGithubError};
pub use github::{ClientConfig, GitHubClient};
pub use history::SearchHistory;
pub use oauth::OAuthApp;
pub use store::AuthTokenStore;
pub use types::{AccessToken, Owner, Repository, SearchResult};
