use anyhow::Result;
use std::time::Duration;

use crate::dashboard::{ActionBatch, BatchAction, DashboardApi};

/// Most actions the platform accepts in a single batch
pub const MAX_BATCH_ACTIONS: usize = 100;
/// A new batch is only submitted while at most this many are pending
pub const MAX_PENDING_BATCHES: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    /// Pause between pending-batch checks while at capacity
    pub poll_interval: Duration,
    /// Pause after each submission
    pub submit_spacing: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            submit_spacing: Duration::from_secs(1),
        }
    }
}

/// ActionBatcher submits device setting changes in throttled chunks
pub struct ActionBatcher<'a> {
    api: &'a dyn DashboardApi,
    org_id: &'a str,
    settings: BatchSettings,
}

impl<'a> ActionBatcher<'a> {
    pub fn new(api: &'a dyn DashboardApi, org_id: &'a str, settings: BatchSettings) -> Self {
        Self { api, org_id, settings }
    }

    /// Submit all actions, waiting for pending batches to drain between chunks
    pub async fn submit(&self, actions: &[BatchAction]) -> Result<Vec<ActionBatch>> {
        let mut submitted = Vec::new();

        for chunk in actions.chunks(MAX_BATCH_ACTIONS) {
            self.wait_for_capacity().await?;

            tracing::info!("Creating camera settings action batch ({} actions)", chunk.len());
            let batch = self
                .api
                .create_action_batch(self.org_id, chunk, true, false)
                .await?;
            tracing::info!("Action batch {} submitted", batch.id);
            submitted.push(batch);

            tokio::time::sleep(self.settings.submit_spacing).await;
        }

        Ok(submitted)
    }

    async fn wait_for_capacity(&self) -> Result<()> {
        loop {
            let pending = self.api.list_pending_action_batches(self.org_id).await?;
            if pending.len() <= MAX_PENDING_BATCHES {
                return Ok(());
            }

            let ids: Vec<&str> = pending.iter().map(|b| b.id.as_str()).collect();
            tracing::info!(
                "{} unfinished action batches ({}), waiting before scheduling a new one",
                pending.len(),
                ids.join(", ")
            );
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}
