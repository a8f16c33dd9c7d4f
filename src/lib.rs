//! `preempt-http` is an async HTTP client for JSON APIs with a shared
//! dispatch path.
//!
//! Every request runs through the same pipeline:
//! - a stable identity derived from method, URL, and canonicalized payloads
//! - latest-wins preemption: an identical in-flight request is cancelled
//!   before the new one starts transport
//! - bearer credential injection from an ambient [`CredentialProvider`]
//! - automatic retry of transient failures with a fixed delay
//! - normalized error reporting with an optional user-visible notice
//!
//! Entry points: [`ApiClient::get`], [`ApiClient::post`], [`ApiClient::put`],
//! [`ApiClient::delete`].

mod auth;
mod client;
mod error;
mod key;
mod notify;
mod options;
mod registry;
mod retry;
mod wire;

pub use auth::{Anonymous, CredentialProvider, EnvToken, StaticToken};
pub use client::ApiClient;
pub use error::ApiError;
pub use notify::{Notifier, TracingNotifier};
pub use options::RequestConfig;
pub use registry::CancelReason;
pub use retry::{RetryDecision, RetryState};
pub use wire::{Envelope, ErrorBody};

pub use reqwest::Method;

pub type Result<T> = std::result::Result<T, ApiError>;
