//! User-facing notification seam.
//!
//! The host dashboard decides how messages are shown; the gateway only
//! pushes short human-readable strings through this trait.

use log::{error, info};

/// Receiver for user-facing success and error messages.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Routes notifications to the process log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, message: &str) {
        info!("event=notify module=ui status=ok message={message}");
    }

    fn error(&self, message: &str) {
        error!("event=notify module=ui status=error message={message}");
    }
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn success(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}
