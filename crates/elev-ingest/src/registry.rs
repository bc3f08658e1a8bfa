//! Per-caller bookkeeping of open status channels.

use std::collections::HashMap;
use tracing::debug;

use crate::transport::Connector;
use crate::{ChannelConfig, CloseHandle, JobId, StatusChannel};

/// Tracks the channels one caller has opened, at most one per job.
///
/// Opening a job that already has a channel closes the old one first.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    config: ChannelConfig,
    open: HashMap<JobId, CloseHandle>,
}

impl ChannelRegistry {
    /// Create a registry whose channels share `config`.
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            open: HashMap::new(),
        }
    }

    /// Open a channel for `job_id`, closing any previous one for that job.
    pub async fn open(
        &mut self,
        job_id: impl Into<JobId>,
        connector: &dyn Connector,
    ) -> StatusChannel {
        let job_id = job_id.into();
        self.open.retain(|_, handle| !handle.is_closed());
        if let Some(previous) = self.open.remove(&job_id) {
            debug!(%job_id, "closing previous status channel");
            previous.close();
        }
        let mut channel = StatusChannel::new(job_id.clone(), self.config.clone());
        self.open.insert(job_id, channel.close_handle());
        channel.connect(connector).await;
        channel
    }

    /// Close the channel for `job_id`, if any.
    pub fn close(&mut self, job_id: &JobId) {
        if let Some(handle) = self.open.remove(job_id) {
            handle.close();
        }
    }

    /// Close every channel opened through this registry.
    pub fn close_all(&mut self) {
        for (_, handle) in self.open.drain() {
            handle.close();
        }
    }

    /// Jobs whose channel is still open.
    pub fn open_jobs(&self) -> Vec<JobId> {
        let mut jobs: Vec<JobId> = self
            .open
            .iter()
            .filter(|(_, handle)| !handle.is_closed())
            .map(|(job_id, _)| job_id.clone())
            .collect();
        jobs.sort();
        jobs
    }
}

impl Drop for ChannelRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelConnector;
    use crate::ChannelState;

    #[tokio::test]
    async fn test_reopen_closes_previous_channel() {
        let connector = ChannelConnector::new();
        let first_sender = connector.register("abc123");
        let second_sender = connector.register("abc123");
        let mut registry = ChannelRegistry::default();

        let mut first = registry.open("abc123", &connector).await;
        let mut second = registry.open("abc123", &connector).await;

        assert_eq!(first.state(), ChannelState::Closed);
        assert_eq!(first.next_event().await, None);
        assert!(first_sender.is_closed());

        assert_eq!(second.state(), ChannelState::Open);
        second_sender.send_text(r#"{"status":"RUNNING","progress":5}"#);
        assert_eq!(second.next_event().await.unwrap().progress(), Some(5));
        assert_eq!(registry.open_jobs(), vec![JobId::new("abc123")]);
    }

    #[tokio::test]
    async fn test_reopen_releases_idle_transport() {
        let connector = ChannelConnector::new();
        let first_sender = connector.register("abc123");
        let _second_sender = connector.register("abc123");
        let mut registry = ChannelRegistry::default();

        let _first = registry.open("abc123", &connector).await;
        assert!(!first_sender.is_closed());

        let _second = registry.open("abc123", &connector).await;
        assert!(first_sender.is_closed());
        assert!(!first_sender.send_text(r#"{"status":"RUNNING"}"#));
    }

    #[tokio::test]
    async fn test_finished_jobs_are_pruned() {
        let connector = ChannelConnector::new();
        let done_sender = connector.register("done");
        let _live_sender = connector.register("live");
        let mut registry = ChannelRegistry::default();

        let mut done = registry.open("done", &connector).await;
        done_sender.send_text(r#"{"status":"SUCCESS","progress":100}"#);
        assert!(done.next_event().await.unwrap().is_terminal());
        assert!(registry.open_jobs().is_empty());

        let _live = registry.open("live", &connector).await;
        assert_eq!(registry.open.len(), 1);
        assert_eq!(registry.open_jobs(), vec![JobId::new("live")]);
    }

    #[tokio::test]
    async fn test_close_all() {
        let connector = ChannelConnector::new();
        let _a = connector.register("a");
        let _b = connector.register("b");
        let mut registry = ChannelRegistry::default();

        let a = registry.open("a", &connector).await;
        let b = registry.open("b", &connector).await;
        assert_eq!(registry.open_jobs().len(), 2);

        registry.close_all();
        assert_eq!(a.state(), ChannelState::Closed);
        assert_eq!(b.state(), ChannelState::Closed);
        assert!(registry.open_jobs().is_empty());
    }
}
