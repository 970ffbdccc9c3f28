use crate::error::{Result, SimpleGithubError};
use crate::github::{endpoint, ClientConfig};
use std::fmt;
use url::Url;

/// Credentials of the registered OAuth application.
///
/// Only ever handed to the token exchange; never persisted or logged.
#[derive(Clone)]
pub struct OAuthApp {
    client_id: String,
    client_secret: String,
}

impl OAuthApp {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.is_empty() {
            return Err(SimpleGithubError::Config("client id must not be empty".to_string()));
        }
        if client_secret.is_empty() {
            return Err(SimpleGithubError::Config(
                "client secret must not be empty".to_string(),
            ));
        }
        Ok(OAuthApp {
            client_id,
            client_secret,
        })
    }

    /// Credentials baked in at build time through `GITHUB_CLIENT_ID` and
    /// `GITHUB_CLIENT_SECRET`, if both were set.
    pub fn from_build_env() -> Option<Self> {
        let id = option_env!("GITHUB_CLIENT_ID")?;
        let secret = option_env!("GITHUB_CLIENT_SECRET")?;
        Self::new(id, secret).ok()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn authorize_url(&self, config: &ClientConfig) -> Result<Url> {
        authorize_url(config, &self.client_id)
    }
}

impl fmt::Debug for OAuthApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthApp")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// URL the user opens in a browser to grant access.
pub fn authorize_url(config: &ClientConfig, client_id: &str) -> Result<Url> {
    if client_id.is_empty() {
        return Err(SimpleGithubError::BadArgument(
            "client id must not be empty".to_string(),
        ));
    }
    let mut url = endpoint(&config.auth_base_url, &["login", "oauth", "authorize"])?;
    url.query_pairs_mut().append_pair("client_id", client_id);
    Ok(url)
}

/// Pull the authorization code out of the redirect the browser delivered.
pub fn extract_authorization_code(redirect_uri: &str) -> Result<String> {
    let url = Url::parse(redirect_uri).map_err(|e| {
        SimpleGithubError::BadArgument(format!("invalid redirect URI {:?}: {}", redirect_uri, e))
    })?;

    let mut code = None;
    let mut error = None;
    let mut error_description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(SimpleGithubError::BadArgument(format!(
            "authorization denied: {}",
            error_description.unwrap_or(error)
        )));
    }

    match code {
        Some(code) if !code.is_empty() => Ok(code),
        _ => Err(SimpleGithubError::BadArgument(
            "no code exists in the redirect URI".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_authorize_url() {
        let url = authorize_url(&ClientConfig::default(), "abc def").unwrap();
        assert_eq!(
            url.as_str(),
            "https://github.com/login/oauth/authorize?client_id=abc+def"
        );
    }

    #[test]
    fn extracts_code_verbatim() {
        let code = extract_authorization_code("simplegithub://authorize?code=abc123&state=x").unwrap();
        assert_eq!(code, "abc123");
    }

    #[test]
    fn missing_code_is_bad_argument() {
        let err = extract_authorization_code("simplegithub://authorize?state=x").unwrap_err();
        assert!(matches!(err, SimpleGithubError::BadArgument(_)));

        let err = extract_authorization_code("simplegithub://authorize?code=").unwrap_err();
        assert!(matches!(err, SimpleGithubError::BadArgument(_)));

        let err = extract_authorization_code("not a uri").unwrap_err();
        assert!(matches!(err, SimpleGithubError::BadArgument(_)));
    }

    #[test]
    fn denied_consent_carries_description() {
        let err = extract_authorization_code(
            "simplegithub://authorize?error=access_denied&error_description=The+user+has+denied",
        )
        .unwrap_err();
        assert!(err.to_string().contains("The user has denied"));
    }

    #[test]
    fn secret_is_not_in_debug_output() {
        let app = OAuthApp::new("id123", "shh-secret").unwrap();
        let debug = format!("{:?}", app);
        assert!(debug.contains("id123"));
        assert!(!debug.contains("shh-secret"));
    }
}
