use reqwest::header;
use reqwest::RequestBuilder;

/// Source of the ambient session credential.
///
/// Injected into [`ApiClient`](crate::ApiClient) at construction time; the
/// token is read fresh on every dispatch so rotation in the backing store is
/// picked up without rebuilding the client.
pub trait CredentialProvider: Send + Sync {
    /// Returns the current token, or `None` for an anonymous request.
    fn token(&self) -> Option<String>;
}

/// Always anonymous; the default provider.
#[derive(Clone, Copy, Debug, Default)]
pub struct Anonymous;

impl CredentialProvider for Anonymous {
    fn token(&self) -> Option<String> {
        None
    }
}

/// A fixed token supplied at construction.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Reads the token from an environment variable on every request.
///
/// Unset or blank means anonymous.
#[derive(Clone, Debug)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvToken {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }
}

/// Attaches the bearer credential to an outgoing request.
///
/// An absent credential leaves the request untouched; this never fails.
pub(crate) fn attach(request: RequestBuilder, credentials: &dyn CredentialProvider) -> RequestBuilder {
    match credentials.token() {
        Some(token) => request.header(header::AUTHORIZATION, bearer_authorization(&token)),
        None => request,
    }
}

/// Formats an authorization value, adding the `Bearer ` prefix when missing.
pub(crate) fn bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::{bearer_authorization, Anonymous, CredentialProvider, EnvToken, StaticToken};

    #[test]
    fn bearer_adds_prefix_when_missing() {
        assert_eq!(bearer_authorization("abc123"), "Bearer abc123".to_owned());
    }

    #[test]
    fn bearer_keeps_existing_prefix() {
        assert_eq!(
            bearer_authorization("bEaReR abc123"),
            "bEaReR abc123".to_owned()
        );
    }

    #[test]
    fn static_and_anonymous_providers() {
        assert_eq!(
            StaticToken::new("t").token(),
            Some("t".to_owned())
        );
        assert_eq!(Anonymous.token(), None);
    }

    #[test]
    fn env_token_treats_blank_as_anonymous() {
        // Deliberately unset variable name.
        let provider = EnvToken::new("PREEMPT_HTTP_TEST_UNSET_TOKEN");
        assert_eq!(provider.token(), None);
    }
}
