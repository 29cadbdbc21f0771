//! The polling half of the service: snapshots subscribed buckets,
//! diffs consecutive snapshots, and hands change events to the
//! notifier.

use crate::event::{ChangeEvent, EventType};
use crate::notifier::Notifier;
use bucketwatch_core::{ConfigStore, PollingTable, S3Settings};
use bucketwatch_s3::{BucketState, ObjectStore, S3Client, StoreError};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// One heartbeat log line per this many cycles (30 × the default 10 s
/// interval ≈ 5 minutes).
pub const HEARTBEAT_EVERY_CYCLES: u64 = 30;

const CONFIG_ERROR_BACKOFF: Duration = Duration::from_secs(15);
const TRANSPORT_ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Computes the events between two snapshots of one bucket. A new key
/// or a changed ETag is a creation (modification included); a missing
/// key is a deletion.
pub fn diff_states(
    previous: &BucketState,
    current: &BucketState,
    bucket: &str,
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for (key, etag) in current {
        if previous.get(key) != Some(etag) {
            events.push(ChangeEvent::new(EventType::ObjectCreated, bucket, key));
        }
    }

    for key in previous.keys() {
        if !current.contains_key(key) {
            events.push(ChangeEvent::new(EventType::ObjectDeleted, bucket, key));
        }
    }

    events
}

/// Tracks the last seen snapshot per bucket.
#[derive(Debug, Default)]
pub struct BucketWatcher {
    known_states: HashMap<String, BucketState>,
}

impl BucketWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops state for buckets no longer subscribed. A bucket that is
    /// re-enabled later starts from a fresh snapshot.
    pub fn prune(&mut self, active: &BTreeSet<String>) {
        let stale: Vec<String> = self
            .known_states
            .keys()
            .filter(|b| !active.contains(*b))
            .cloned()
            .collect();
        for bucket in stale {
            self.known_states.remove(&bucket);
            info!(bucket = %bucket, "stopped monitoring bucket");
        }
    }

    /// Records a snapshot and returns the change events since the
    /// previous one. The first snapshot of a bucket establishes a
    /// baseline and produces no events.
    pub fn observe(&mut self, bucket: &str, current: BucketState) -> Vec<ChangeEvent> {
        let events = match self.known_states.get(bucket) {
            Some(previous) => diff_states(previous, &current, bucket),
            None => {
                info!(
                    bucket = %bucket,
                    objects = current.len(),
                    "now monitoring bucket"
                );
                Vec::new()
            }
        };

        self.known_states.insert(bucket.to_string(), current);
        events
    }

    pub fn is_tracking(&self, bucket: &str) -> bool {
        self.known_states.contains_key(bucket)
    }
}

/// Blocks until the configured S3 endpoint accepts a connection,
/// retrying forever. The web UI may not have written settings yet when
/// the process starts.
pub async fn wait_for_client(config: &ConfigStore, retry: Duration) -> S3Client {
    info!("polling task started, waiting for S3 configuration");

    loop {
        let saved = config.load_settings().ok().flatten();
        let settings = S3Settings::resolve(saved.as_ref());

        match S3Client::connect(&settings).await {
            Ok(client) => {
                info!(endpoint = client.endpoint(), "S3 client ready, starting poll loop");
                return client;
            }
            Err(e) => {
                warn!(error = %e, "S3 endpoint not ready, will retry");
                sleep(retry).await;
            }
        }
    }
}

/// The poll loop. Owns its own store handle; the HTTP server side
/// swaps clients on settings changes independently.
pub struct Poller<N: Notifier> {
    store: Arc<dyn ObjectStore>,
    config: ConfigStore,
    notifier: N,
    interval: Duration,
}

impl<N: Notifier> Poller<N> {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: ConfigStore,
        notifier: N,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            config,
            notifier,
            interval,
        }
    }

    /// Runs one cycle against an already-loaded table: prune, snapshot,
    /// diff, notify. Returns true if a transport-level error was seen,
    /// so the loop can back off harder.
    pub async fn poll_once(&self, watcher: &mut BucketWatcher, table: &PollingTable) -> bool {
        let active: BTreeSet<String> = table
            .iter()
            .filter(|(_, rule)| rule.enabled)
            .map(|(bucket, _)| bucket.clone())
            .collect();

        watcher.prune(&active);

        let mut transport_error = false;

        for (bucket, rule) in table {
            if !rule.enabled {
                continue;
            }

            let current = match self.store.bucket_state(bucket).await {
                Ok(state) => state,
                Err(e) => {
                    // Keep the previous snapshot: a listing failure must
                    // not read as a mass deletion.
                    if matches!(e, StoreError::Connection(_) | StoreError::Timeout(_)) {
                        transport_error = true;
                    }
                    warn!(bucket = %bucket, error = %e, "snapshot failed, skipping bucket this cycle");
                    continue;
                }
            };

            for event in watcher.observe(bucket, current) {
                match self.notifier.deliver(&rule.webhook_url, &event).await {
                    Ok(()) => info!(
                        bucket = %bucket,
                        key = %event.object_key,
                        event = ?event.event_type,
                        url = %rule.webhook_url,
                        "sent notification"
                    ),
                    Err(e) => error!(
                        bucket = %bucket,
                        key = %event.object_key,
                        error = %e,
                        "failed to send webhook notification"
                    ),
                }
            }
        }

        transport_error
    }

    /// The main loop. Reloads the polling table every cycle so edits
    /// made through the API take effect without a restart. Never
    /// returns; the caller aborts the task on shutdown.
    pub async fn run(self) {
        let mut watcher = BucketWatcher::new();
        let mut cycles: u64 = 0;

        loop {
            cycles += 1;

            let table = match self.config.load_polling() {
                Ok(table) => table,
                Err(e) => {
                    warn!(error = %e, "polling config not readable, retrying");
                    sleep(CONFIG_ERROR_BACKOFF).await;
                    continue;
                }
            };

            if cycles % HEARTBEAT_EVERY_CYCLES == 0 {
                let active = table.values().filter(|r| r.enabled).count();
                info!(active_buckets = active, "polling heartbeat");
                cycles = 0;
            }

            let transport_error = self.poll_once(&mut watcher, &table).await;

            if transport_error {
                warn!(
                    backoff_secs = TRANSPORT_ERROR_BACKOFF.as_secs(),
                    "endpoint unreachable, backing off"
                );
                sleep(TRANSPORT_ERROR_BACKOFF).await;
            } else {
                sleep(self.interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NotifyError;
    use async_trait::async_trait;
    use bucketwatch_core::PollingRule;
    use bucketwatch_s3::MemoryStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        delivered: Mutex<Vec<(String, ChangeEvent)>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn events(&self) -> Vec<(String, ChangeEvent)> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for &RecordingNotifier {
        async fn deliver(
            &self,
            webhook_url: &str,
            event: &ChangeEvent,
        ) -> Result<(), NotifyError> {
            self.delivered
                .lock()
                .unwrap()
                .push((webhook_url.to_string(), event.clone()));
            if self.fail {
                return Err(NotifyError::Status(500));
            }
            Ok(())
        }
    }

    fn state(entries: &[(&str, &str)]) -> BucketState {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn subscribed(bucket: &str) -> PollingTable {
        let mut table = PollingTable::new();
        table.insert(
            bucket.to_string(),
            PollingRule {
                enabled: true,
                webhook_url: "http://hooks/test".to_string(),
            },
        );
        table
    }

    #[test]
    fn test_diff_detects_created() {
        let events = diff_states(&state(&[]), &state(&[("a.txt", "\"e1\"")]), "b");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ObjectCreated);
        assert_eq!(events[0].object_key, "a.txt");
        assert_eq!(events[0].bucket, "b");
    }

    #[test]
    fn test_diff_detects_modified_as_created() {
        let events = diff_states(
            &state(&[("a.txt", "\"e1\"")]),
            &state(&[("a.txt", "\"e2\"")]),
            "b",
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ObjectCreated);
    }

    #[test]
    fn test_diff_detects_deleted() {
        let events = diff_states(&state(&[("a.txt", "\"e1\"")]), &state(&[]), "b");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ObjectDeleted);
    }

    #[test]
    fn test_diff_unchanged_is_silent() {
        let snapshot = state(&[("a.txt", "\"e1\""), ("b.txt", "\"e2\"")]);
        assert!(diff_states(&snapshot, &snapshot, "b").is_empty());
    }

    #[test]
    fn test_first_observation_is_baseline_only() {
        let mut watcher = BucketWatcher::new();
        let events = watcher.observe("b", state(&[("a.txt", "\"e1\"")]));
        assert!(events.is_empty());

        let events = watcher.observe("b", state(&[("a.txt", "\"e1\""), ("new.txt", "\"e9\"")]));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].object_key, "new.txt");
    }

    #[test]
    fn test_prune_drops_inactive_buckets() {
        let mut watcher = BucketWatcher::new();
        watcher.observe("keep", BucketState::new());
        watcher.observe("drop", BucketState::new());

        let active: BTreeSet<String> = ["keep".to_string()].into_iter().collect();
        watcher.prune(&active);

        assert!(watcher.is_tracking("keep"));
        assert!(!watcher.is_tracking("drop"));
    }

    #[tokio::test]
    async fn test_poll_once_delivers_changes() {
        let store = Arc::new(MemoryStore::new());
        store.seed("invoices", "jan.pdf", b"v1").await;

        let dir = tempfile::TempDir::new().unwrap();
        let notifier = RecordingNotifier::default();
        let poller = Poller::new(
            store.clone() as Arc<dyn ObjectStore>,
            ConfigStore::new(dir.path()),
            &notifier,
            Duration::from_secs(10),
        );

        let table = subscribed("invoices");
        let mut watcher = BucketWatcher::new();

        // Baseline cycle: no events.
        poller.poll_once(&mut watcher, &table).await;
        assert!(notifier.events().is_empty());

        store.seed("invoices", "feb.pdf", b"v1").await;
        store.delete_object("invoices", "jan.pdf").await.unwrap();

        poller.poll_once(&mut watcher, &table).await;
        let events = notifier.events();
        assert_eq!(events.len(), 2);

        let (url, created) = &events[0];
        assert_eq!(url, "http://hooks/test");
        assert_eq!(created.event_type, EventType::ObjectCreated);
        assert_eq!(created.object_key, "feb.pdf");

        let (_, deleted) = &events[1];
        assert_eq!(deleted.event_type, EventType::ObjectDeleted);
        assert_eq!(deleted.object_key, "jan.pdf");
    }

    #[tokio::test]
    async fn test_failed_snapshot_keeps_previous_state() {
        let store = Arc::new(MemoryStore::new());
        store.seed("invoices", "jan.pdf", b"v1").await;

        let dir = tempfile::TempDir::new().unwrap();
        let notifier = RecordingNotifier::default();
        let poller = Poller::new(
            store.clone() as Arc<dyn ObjectStore>,
            ConfigStore::new(dir.path()),
            &notifier,
            Duration::from_secs(10),
        );

        let table = subscribed("invoices");
        let mut watcher = BucketWatcher::new();
        poller.poll_once(&mut watcher, &table).await;

        // Bucket disappears: snapshot fails, but no deletion storm.
        store.drop_bucket("invoices").await;
        poller.poll_once(&mut watcher, &table).await;
        assert!(notifier.events().is_empty());
        assert!(watcher.is_tracking("invoices"));

        // Bucket comes back without the file: now it is a real delete.
        store.create_bucket("invoices").await.unwrap();
        poller.poll_once(&mut watcher, &table).await;
        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1.event_type, EventType::ObjectDeleted);
    }

    #[tokio::test]
    async fn test_disabled_rule_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.seed("invoices", "jan.pdf", b"v1").await;

        let dir = tempfile::TempDir::new().unwrap();
        let notifier = RecordingNotifier::default();
        let poller = Poller::new(
            store.clone() as Arc<dyn ObjectStore>,
            ConfigStore::new(dir.path()),
            &notifier,
            Duration::from_secs(10),
        );

        let mut table = subscribed("invoices");
        let mut watcher = BucketWatcher::new();
        poller.poll_once(&mut watcher, &table).await;
        assert!(watcher.is_tracking("invoices"));

        table.get_mut("invoices").unwrap().enabled = false;
        poller.poll_once(&mut watcher, &table).await;
        assert!(!watcher.is_tracking("invoices"));

        // Changes while disabled produce nothing.
        store.seed("invoices", "feb.pdf", b"v1").await;
        poller.poll_once(&mut watcher, &table).await;
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_abort_cycle() {
        let store = Arc::new(MemoryStore::new());
        store.seed("invoices", "jan.pdf", b"v1").await;

        let dir = tempfile::TempDir::new().unwrap();
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let poller = Poller::new(
            store.clone() as Arc<dyn ObjectStore>,
            ConfigStore::new(dir.path()),
            &notifier,
            Duration::from_secs(10),
        );

        let table = subscribed("invoices");
        let mut watcher = BucketWatcher::new();
        poller.poll_once(&mut watcher, &table).await;

        store.seed("invoices", "feb.pdf", b"v1").await;
        store.seed("invoices", "mar.pdf", b"v1").await;
        poller.poll_once(&mut watcher, &table).await;

        // Both deliveries were attempted despite failures.
        assert_eq!(notifier.events().len(), 2);
    }
}
