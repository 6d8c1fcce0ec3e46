use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{Query, QueryResult};
use crate::cache::mutex_lock;
use crate::client::QueryClient;

const SOURCE: &str = "tessera::query::debounce";

/// Publishes the latest pushed value once no newer value arrived within the
/// delay.
pub struct Debouncer<T> {
    delay: Duration,
    sender: Arc<watch::Sender<T>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Debouncer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            delay,
            sender: Arc::new(sender),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value`, replacing any value still waiting. Must be called
    /// inside a Tokio runtime.
    pub fn push(&self, value: T) {
        let mut pending = mutex_lock(&self.pending, SOURCE, "push");
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        let sender = Arc::clone(&self.sender);
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sender.send_replace(value);
        }));
    }

    /// Latest published value.
    pub fn current(&self) -> T {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let pending = match self.pending.get_mut() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }
}

type Build<'c, P, T> = Box<dyn Fn(&'c QueryClient, &P) -> Query<'c, T> + Send + Sync + 'c>;

/// A query whose input settles through a [`Debouncer`] before it fetches.
pub struct DebouncedQuery<'c, P, T> {
    client: &'c QueryClient,
    debouncer: Debouncer<P>,
    receiver: watch::Receiver<P>,
    build: Build<'c, P, T>,
}

impl<'c, P, T> DebouncedQuery<'c, P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new<F>(client: &'c QueryClient, initial: P, delay: Duration, build: F) -> Self
    where
        F: Fn(&'c QueryClient, &P) -> Query<'c, T> + Send + Sync + 'c,
    {
        let debouncer = Debouncer::new(initial, delay);
        let receiver = debouncer.subscribe();
        Self {
            client,
            debouncer,
            receiver,
            build: Box::new(build),
        }
    }

    /// Feed raw input; only the last value within the delay is queried.
    pub fn set(&self, value: P) {
        self.debouncer.push(value);
    }

    pub fn value(&self) -> P {
        self.debouncer.current()
    }

    /// Query for the currently published value.
    pub fn query(&self) -> Query<'c, T> {
        (self.build)(self.client, &self.debouncer.current())
    }

    /// Wait for the next published value and fetch it.
    pub async fn next(&mut self) -> Option<QueryResult<T>> {
        self.receiver.changed().await.ok()?;
        let value = self.receiver.borrow_and_update().clone();
        let query = (self.build)(self.client, &value);
        debug!(key = %query.key(), "Debounced input settled");
        Some(query.fetch().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn only_last_value_within_delay_is_published() {
        let debouncer = Debouncer::new(String::new(), Duration::from_millis(500));
        let mut receiver = debouncer.subscribe();

        debouncer.push("a".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.push("ab".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.push("abc".to_string());

        receiver.changed().await.expect("published");
        assert_eq!(*receiver.borrow_and_update(), "abc");

        let more = tokio::time::timeout(Duration::from_secs(2), receiver.changed()).await;
        assert!(more.is_err(), "superseded values must not publish");
    }

    #[tokio::test(start_paused = true)]
    async fn value_waits_for_delay() {
        let debouncer = Debouncer::new(0_u32, Duration::from_millis(500));
        debouncer.push(7);
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(debouncer.current(), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(debouncer.current(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels_pending_value() {
        let debouncer = Debouncer::new(0_u32, Duration::from_millis(500));
        let mut receiver = debouncer.subscribe();
        debouncer.push(7);
        drop(debouncer);

        let changed = tokio::time::timeout(Duration::from_secs(2), receiver.changed())
            .await
            .expect("channel closes once the timer is cancelled");
        assert!(changed.is_err());
        assert_eq!(*receiver.borrow(), 0);
    }
}
