use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::time::sleep;

use crate::{
    auth,
    error::Failure,
    key,
    registry::{CancelReason, InFlightRegistry},
    retry::{RetryDecision, RetryState},
    ApiError, CredentialProvider, Envelope, ErrorBody, Notifier, RequestConfig, Result,
    TracingNotifier,
};

#[derive(Clone)]
/// HTTP client for a JSON API behind a shared dispatch path.
///
/// Every call runs through the same pipeline: derive the request identity,
/// preempt any identical in-flight request, attach the bearer credential,
/// perform transport with a timeout, retry transient failures, and normalize
/// whatever remains. Clones share the in-flight registry, so deduplication
/// holds across all of them.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
    notifier: Arc<dyn Notifier>,
    registry: Arc<InFlightRegistry>,
    defaults: RequestConfig,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("credentials", &"<redacted>")
            .field("defaults", &self.defaults)
            .finish()
    }
}

enum AttemptError {
    /// Candidate for retry; normalized if the budget is spent.
    Transient(Failure),
    /// Never retried and never normalized.
    Fatal(ApiError),
}

impl ApiClient {
    /// Creates an anonymous client for the API rooted at `base_url`.
    ///
    /// Paths passed to the verb methods are appended to `base_url` verbatim,
    /// so they should start with `/`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            credentials: Arc::new(auth::Anonymous),
            notifier: Arc::new(TracingNotifier),
            registry: Arc::new(InFlightRegistry::new()),
            defaults: RequestConfig::default(),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `PREEMPT_API_URL` — base URL of the API
    /// - `PREEMPT_API_TOKEN` — session token, re-read on every request;
    ///   unset or blank means anonymous
    ///
    /// Returns an error if the URL variable is missing or empty.
    pub fn from_env() -> std::result::Result<Self, String> {
        let base_url = std::env::var("PREEMPT_API_URL")
            .map_err(|_| "missing PREEMPT_API_URL environment variable".to_owned())?;
        if base_url.trim().is_empty() {
            return Err("PREEMPT_API_URL is set but empty".to_owned());
        }
        Ok(Self::new(base_url).with_credentials(auth::EnvToken::new("PREEMPT_API_TOKEN")))
    }

    /// Replaces the default per-call configuration.
    pub fn with_defaults(mut self, defaults: RequestConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Installs the credential provider consulted on every request.
    pub fn with_credentials(mut self, credentials: impl CredentialProvider + 'static) -> Self {
        self.credentials = Arc::new(credentials);
        self
    }

    /// Installs the collaborator that receives user-visible error notices.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Sends a GET request with query parameters.
    pub async fn get<T: DeserializeOwned, P: Serialize>(
        &self,
        path: &str,
        params: P,
    ) -> Result<Envelope<T>> {
        self.get_with(path, params, self.defaults.clone()).await
    }

    /// Sends a GET request with an explicit per-call configuration.
    pub async fn get_with<T: DeserializeOwned, P: Serialize>(
        &self,
        path: &str,
        params: P,
        config: RequestConfig,
    ) -> Result<Envelope<T>> {
        let params = to_query(params)?;
        self.dispatch(Method::GET, path, params, None, config).await
    }

    /// Sends a POST request with a JSON body.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: B,
    ) -> Result<Envelope<T>> {
        self.post_with(path, body, self.defaults.clone()).await
    }

    /// Sends a POST request with an explicit per-call configuration.
    pub async fn post_with<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: B,
        config: RequestConfig,
    ) -> Result<Envelope<T>> {
        let body = to_payload(body)?;
        self.dispatch(Method::POST, path, None, body, config).await
    }

    /// Sends a PUT request with a JSON body.
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: B,
    ) -> Result<Envelope<T>> {
        self.put_with(path, body, self.defaults.clone()).await
    }

    /// Sends a PUT request with an explicit per-call configuration.
    pub async fn put_with<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: B,
        config: RequestConfig,
    ) -> Result<Envelope<T>> {
        let body = to_payload(body)?;
        self.dispatch(Method::PUT, path, None, body, config).await
    }

    /// Sends a DELETE request with query parameters.
    pub async fn delete<T: DeserializeOwned, P: Serialize>(
        &self,
        path: &str,
        params: P,
    ) -> Result<Envelope<T>> {
        self.delete_with(path, params, self.defaults.clone()).await
    }

    /// Sends a DELETE request with an explicit per-call configuration.
    pub async fn delete_with<T: DeserializeOwned, P: Serialize>(
        &self,
        path: &str,
        params: P,
        config: RequestConfig,
    ) -> Result<Envelope<T>> {
        let params = to_query(params)?;
        self.dispatch(Method::DELETE, path, params, None, config)
            .await
    }

    /// Aborts the in-flight request with the given identity, if any.
    ///
    /// The identity is rebuilt from the same inputs the original dispatch
    /// used. Returns whether a request was actually cancelled; its caller
    /// observes [`ApiError::Cancelled`].
    pub fn abort(
        &self,
        method: Method,
        path: &str,
        params: impl Serialize,
        body: impl Serialize,
    ) -> Result<bool> {
        let params = to_payload(params)?;
        let body = to_payload(body)?;
        let url = self.url_for(path);
        let identity = key::encode(method.as_str(), &url, params.as_ref(), body.as_ref());
        Ok(self.registry.abort(&identity))
    }

    /// Number of requests currently in flight across all clones.
    pub fn in_flight_count(&self) -> usize {
        self.registry.len()
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Option<JsonValue>,
        body: Option<JsonValue>,
        config: RequestConfig,
    ) -> Result<Envelope<T>> {
        let url = self.url_for(path);
        let identity = key::encode(method.as_str(), &url, params.as_ref(), body.as_ref());
        // The ticket releases the registration when dropped, so the entry is
        // cleaned up even when the caller drops this future mid-flight.
        let (_ticket, mut cancelled) = InFlightRegistry::register(&self.registry, &identity);
        let mut retry = RetryState::new(&config);

        loop {
            // Registration and transport start are not separated by an await
            // on the registry, so a concurrent identical dispatch always
            // supersedes this one before observing its response.
            let result = tokio::select! {
                reason = &mut cancelled => Err(AttemptError::Transient(Failure::Cancelled(
                    reason.unwrap_or(CancelReason::Aborted),
                ))),
                result = self.attempt::<T>(&method, &url, params.as_ref(), body.as_ref(), &config) => result,
            };

            match result {
                Ok(envelope) => break Ok(envelope),
                Err(AttemptError::Fatal(error)) => break Err(error),
                Err(AttemptError::Transient(failure @ Failure::Cancelled(_))) => {
                    break Err(self.normalize(failure, &config))
                }
                Err(AttemptError::Transient(failure)) => match retry.on_failure() {
                    RetryDecision::Retry { delay } => {
                        tracing::debug!(
                            %identity,
                            delay_ms = delay.as_millis() as u64,
                            remaining = retry.remaining(),
                            "retrying after transient failure"
                        );
                        // The delay is a suspension point too: supersession
                        // during the wait must prevent the re-issue.
                        tokio::select! {
                            reason = &mut cancelled => {
                                break Err(self.normalize(
                                    Failure::Cancelled(reason.unwrap_or(CancelReason::Aborted)),
                                    &config,
                                ))
                            }
                            _ = sleep(delay) => {}
                        }
                    }
                    RetryDecision::Exhausted => break Err(self.normalize(failure, &config)),
                },
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &str,
        params: Option<&JsonValue>,
        body: Option<&JsonValue>,
        config: &RequestConfig,
    ) -> std::result::Result<Envelope<T>, AttemptError> {
        let mut request = self
            .http
            .request(method.clone(), url)
            .timeout(Duration::from_millis(config.timeout_ms));
        if let Some(params) = params {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let request = auth::attach(request, self.credentials.as_ref());

        let response = request
            .send()
            .await
            .map_err(|err| AttemptError::Transient(Failure::Network(err)))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| AttemptError::Transient(Failure::Network(err)))?;

        if !status.is_success() {
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            return Err(AttemptError::Transient(Failure::Status {
                status: status.as_u16(),
                body,
            }));
        }

        serde_json::from_str::<Envelope<T>>(&text).map_err(|err| {
            AttemptError::Fatal(ApiError::Decode(format!(
                "invalid response envelope JSON: {err}; body: {text}"
            )))
        })
    }

    /// Maps a terminal failure onto [`ApiError`] and emits the user notice
    /// unless the call opted out. Cancellations always suppress the notice.
    fn normalize(&self, failure: Failure, config: &RequestConfig) -> ApiError {
        match failure {
            Failure::Cancelled(reason) => {
                tracing::debug!(%reason, "request cancelled");
                ApiError::Cancelled(reason)
            }
            failure => {
                let message = failure.message();
                let status = failure.status();
                tracing::warn!(?status, %message, "request failed terminally");
                let notice_suppressed = config.skip_error_handler;
                if !notice_suppressed {
                    self.notifier.error(&message);
                }
                ApiError::Terminal {
                    message,
                    status,
                    notice_suppressed,
                }
            }
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn to_payload(value: impl Serialize) -> Result<Option<JsonValue>> {
    let value = serde_json::to_value(value).map_err(|err| ApiError::Encode(err.to_string()))?;
    Ok(match value {
        JsonValue::Null => None,
        other => Some(other),
    })
}

/// Serializes query parameters, rejecting shapes the query string cannot
/// carry. A nested object would otherwise only fail inside the URL encoder at
/// send time and burn the retry budget on a deterministic caller error.
fn to_query(value: impl Serialize) -> Result<Option<JsonValue>> {
    let params = to_payload(value)?;
    if let Some(params) = &params {
        let entries = match params {
            JsonValue::Object(map) => map,
            _ => {
                return Err(ApiError::Encode(
                    "query params must be an object of key-value pairs".to_owned(),
                ))
            }
        };
        for (name, value) in entries {
            if value.is_object() || value.is_array() {
                return Err(ApiError::Encode(format!(
                    "query param `{name}` must be a primitive value"
                )));
            }
        }
    }
    Ok(params)
}
