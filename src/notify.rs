/// Collaborator that surfaces terminal failures to the user.
///
/// Fire-and-forget: the dispatcher never consumes a return value and never
/// depends on delivery.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// Default notifier: routes notices to the `tracing` error stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::error!(target: "preempt_http::notice", "{message}");
    }
}
