//! Shared state for API handlers.

use crate::canopy::CanopyClient;
use crate::messaging::MessagingDyn;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;

/// State shared by every request.
pub struct ApiState {
    /// Bot user id; mentions of it are stripped from the query text.
    pub bot_user_id: String,
    /// Signing secret used to verify event callbacks. `None` disables verification.
    pub signing_secret: Option<String>,
    pub canopy: CanopyClient,
    pub messaging: Arc<dyn MessagingDyn>,
    /// Mention answers still running after their webhook was acked.
    tasks: TaskTracker,
}

impl ApiState {
    pub fn new(
        bot_user_id: impl Into<String>,
        signing_secret: Option<String>,
        canopy: CanopyClient,
        messaging: Arc<dyn MessagingDyn>,
    ) -> Self {
        Self {
            bot_user_id: bot_user_id.into(),
            signing_secret,
            canopy,
            messaging,
            tasks: TaskTracker::new(),
        }
    }

    /// Run `task` in the background, tracked until [`ApiState::drain_tasks`].
    pub(crate) fn spawn_task<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Wait up to `timeout` for background tasks to finish.
    ///
    /// Returns `false` if some were still running when the timeout hit.
    pub async fn drain_tasks(&self, timeout: Duration) -> bool {
        self.tasks.close();
        let pending = self.tasks.len();
        if pending > 0 {
            tracing::info!(pending, "waiting for in-flight replies");
        }
        tokio::time::timeout(timeout, self.tasks.wait())
            .await
            .is_ok()
    }
}
