use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;
use tracing::debug;

/// At most one pending "shift ending" timer. Rescheduling or cancelling aborts the old one.
#[derive(Debug, Default)]
pub(crate) struct ShiftReminder {
    pending: Mutex<Option<AbortHandle>>,
}

impl ShiftReminder {
    /// Runs `fire` at `shift_end`. Shifts that already ended only cancel the previous timer.
    pub(crate) fn schedule<F>(&self, shift_end: DateTime<Utc>, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let Ok(delay) = (shift_end - Utc::now()).to_std() else {
            debug!(%shift_end, "shift already ended; no reminder scheduled");
            return;
        };

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        });
        *self.lock() = Some(handle.abort_handle());
    }

    pub(crate) fn cancel(&self) {
        if let Some(handle) = self.lock().take() {
            handle.abort();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<AbortHandle>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ShiftReminder {
    fn drop(&mut self) {
        self.cancel();
    }
}
