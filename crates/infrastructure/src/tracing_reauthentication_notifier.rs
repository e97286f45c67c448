use std::sync::atomic::{AtomicBool, Ordering};

use orderdesk_application::ReauthenticationNotifier;
use tracing::warn;

/// Reports the sign-in requirement through the log and remembers it.
///
/// The client checks [`Self::was_triggered`] after each command to tell the
/// user to sign in again.
#[derive(Debug, Default)]
pub struct TracingReauthenticationNotifier {
    triggered: AtomicBool,
}

impl TracingReauthenticationNotifier {
    /// Creates a notifier that has not fired yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether sign-in has been required since creation.
    #[must_use]
    pub fn was_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl ReauthenticationNotifier for TracingReauthenticationNotifier {
    fn require_sign_in(&self, reason: &str) {
        self.triggered.store(true, Ordering::SeqCst);
        warn!(reason, "session ended, sign in again");
    }
}

#[cfg(test)]
mod tests {
    use orderdesk_application::ReauthenticationNotifier;

    use super::TracingReauthenticationNotifier;

    #[test]
    fn notifier_remembers_that_it_fired() {
        let notifier = TracingReauthenticationNotifier::new();
        assert!(!notifier.was_triggered());

        notifier.require_sign_in("credential renewal failed");
        assert!(notifier.was_triggered());
    }
}
