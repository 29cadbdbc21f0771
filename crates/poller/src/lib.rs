pub mod event;
pub mod notifier;
pub mod watcher;

pub use event::{ChangeEvent, EventType};
pub use notifier::{Notifier, NotifyError, WebhookNotifier};
pub use watcher::{diff_states, wait_for_client, BucketWatcher, Poller};
