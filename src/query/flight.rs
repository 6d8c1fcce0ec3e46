//! Shares one request between concurrent fetches of the same key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::cache::{QueryKey, mutex_lock};
use crate::error::ApiError;

const SOURCE: &str = "tessera::query::flight";

/// How a shared fetch ended: `None` on success, the error otherwise.
type Landing = Option<Arc<ApiError>>;

#[derive(Default)]
pub(crate) struct InFlight {
    fetches: Mutex<HashMap<QueryKey, watch::Receiver<Option<Landing>>>>,
}

pub(crate) enum Flight<'a> {
    /// This caller runs the request and reports through the guard.
    Leader(FlightGuard<'a>),
    /// Another caller is already fetching; wait for it to land.
    Follower(watch::Receiver<Option<Landing>>),
}

impl InFlight {
    pub(crate) fn join(&self, key: &QueryKey) -> Flight<'_> {
        let mut fetches = mutex_lock(&self.fetches, SOURCE, "join");
        if let Some(receiver) = fetches.get(key) {
            return Flight::Follower(receiver.clone());
        }
        let (sender, receiver) = watch::channel(None);
        fetches.insert(key.clone(), receiver);
        Flight::Leader(FlightGuard {
            flights: self,
            key: key.clone(),
            sender,
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        mutex_lock(&self.fetches, SOURCE, "len").len()
    }
}

/// Held by the caller running a shared fetch. Dropping it without
/// [`FlightGuard::land`] lets followers fetch on their own.
pub(crate) struct FlightGuard<'a> {
    flights: &'a InFlight,
    key: QueryKey,
    sender: watch::Sender<Option<Landing>>,
}

impl FlightGuard<'_> {
    pub(crate) fn land(self, error: Landing) {
        self.sender.send_replace(Some(error));
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        mutex_lock(&self.flights.fetches, SOURCE, "drop").remove(&self.key);
    }
}

/// Wait for the leader. `None` when it was dropped before landing.
pub(crate) async fn wait(mut receiver: watch::Receiver<Option<Landing>>) -> Option<Landing> {
    receiver
        .wait_for(Option::is_some)
        .await
        .ok()
        .and_then(|landing| (*landing).clone())
}
