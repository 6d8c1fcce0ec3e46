//! Cache-aware writes.
//!
//! A [`Mutation`] describes one write: how to call the server, how to
//! edit cached data before the reply arrives, and which keys go stale once
//! it settles. [`PendingMutation`] drives the lifecycle:
//!
//! ```text
//! Idle -> Pending -> OptimisticApplied -> Settled(Success | Error)
//! ```
//!
//! On error every optimistic edit is rolled back from its snapshot. Either
//! way the settle keys are invalidated, except for realtime-backed
//! mutations when the client has websocket updates enabled.

use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use metrics::{counter, histogram};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::{ApiContext, split_ids};
use crate::cache::{QueryCache, QueryKey, Rollback};
use crate::client::QueryClient;
use crate::error::ApiResult;
use crate::notify::{Action, Notification, Payload, Phase};

pub mod chat;
pub mod items;
pub mod members;
pub mod memberships;
pub mod subscriptions;
pub mod tags;

pub use chat::{ClearItemChat, DeleteChatMessage, PatchChatMessage, PostChatMessage};
pub use items::{
    CopyItems, DeleteItemGeolocation, DeleteItems, EditItem, MoveItems, PostItem,
    PutItemGeolocation, RecycleItems, RestoreItems, UploadFiles,
};
pub use members::EditMember;
pub use memberships::{DeleteItemMembership, EditItemMembership, PostItemMembership};
pub use subscriptions::{SubscribeToItem, UnsubscribeFromItem};
pub use tags::{DeleteItemTag, PostItemTag};

#[async_trait]
pub trait Mutation: Send + Sync {
    type Output: Send + Sync + 'static;
    /// What an optimistic edit saved so it can be undone.
    type Snapshot: Rollback;

    fn action(&self) -> Action;

    /// Read whatever cache state later steps need, before any write.
    fn prepare(&mut self, _cache: &QueryCache) {}

    /// Keys the optimistic edit writes. In-flight fetches for them are
    /// cancelled first so a late reply cannot overwrite the edit.
    fn optimistic_keys(&self) -> Vec<QueryKey> {
        Vec::new()
    }

    /// Edit cached data ahead of the server reply. Only entries already
    /// present are touched.
    fn apply_optimistic(&self, _cache: &QueryCache) -> Option<Self::Snapshot> {
        None
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Self::Output>;

    /// Write the server's reply into the cache.
    fn on_success(&self, _cache: &QueryCache, _output: &Self::Output) {}

    /// Keys marked stale once the mutation settles, whatever the outcome.
    fn settled_keys(&self, cache: &QueryCache, output: Option<&Self::Output>) -> Vec<QueryKey>;

    /// Realtime-backed mutations leave invalidation to server pushes.
    fn defer_to_websocket(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Pending,
    OptimisticApplied,
    Settled(Outcome),
}

pub struct PendingMutation<'c, M: Mutation> {
    client: &'c QueryClient,
    mutation: M,
    state: MutationState,
    snapshot: Option<M::Snapshot>,
    started: Option<Instant>,
}

impl<'c, M: Mutation> PendingMutation<'c, M> {
    pub fn new(client: &'c QueryClient, mutation: M) -> Self {
        Self {
            client,
            mutation,
            state: MutationState::Idle,
            snapshot: None,
            started: None,
        }
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    pub fn mutation(&self) -> &M {
        &self.mutation
    }

    /// Announce the mutation and apply its optimistic edit. Calling it
    /// twice has no further effect.
    pub fn begin(&mut self) {
        if self.state != MutationState::Idle {
            return;
        }
        let action = self.mutation.action();
        let cache = self.client.cache();
        self.started = Some(Instant::now());
        self.client
            .notify(Notification::new(action, Phase::Trigger, Payload::Empty));
        self.state = MutationState::Pending;

        self.mutation.prepare(cache);
        for key in self.mutation.optimistic_keys() {
            cache.cancel(&key);
        }
        if let Some(snapshot) = self.mutation.apply_optimistic(cache) {
            debug!(action = %action, "Optimistic update applied");
            self.snapshot = Some(snapshot);
            self.state = MutationState::OptimisticApplied;
        }
    }

    /// Run the request and settle. Begins the mutation first if needed.
    pub async fn execute(&mut self) -> ApiResult<M::Output> {
        if let MutationState::Settled(_) = self.state {
            warn!(action = %self.mutation.action(), "Mutation already settled; running again");
            self.state = MutationState::Idle;
        }
        self.begin();
        self.client.notify(Notification::new(
            self.mutation.action(),
            Phase::Request,
            Payload::Empty,
        ));
        let result = self.mutation.mutate(self.client.api()).await;
        self.settle(result)
    }

    /// Apply the outcome to the cache and notify. Returns `result`
    /// unchanged.
    pub fn settle(&mut self, result: ApiResult<M::Output>) -> ApiResult<M::Output> {
        let action = self.mutation.action();
        let cache = self.client.cache();

        let outcome = match &result {
            Ok(output) => {
                self.client.notify(Notification::success(action));
                self.mutation.on_success(cache, output);
                self.snapshot = None;
                Outcome::Success
            }
            Err(err) => {
                if let Some(snapshot) = self.snapshot.take() {
                    snapshot.rollback(cache);
                    debug!(action = %action, "Optimistic update rolled back");
                }
                self.client.notify(Notification::failure(action, err));
                Outcome::Error
            }
        };

        if self.client.websocket_enabled() && self.mutation.defer_to_websocket() {
            debug!(action = %action, "Invalidation left to realtime updates");
        } else {
            for key in self.mutation.settled_keys(cache, result.as_ref().ok()) {
                cache.invalidate(&key);
            }
        }
        self.client
            .notify(Notification::new(action, Phase::Fulfill, Payload::Empty));

        let label = match outcome {
            Outcome::Success => "success",
            Outcome::Error => "error",
        };
        counter!("tessera_mutation_total", "action" => action.as_str(), "outcome" => label)
            .increment(1);
        if let Some(started) = self.started.take() {
            histogram!("tessera_mutation_ms", "action" => action.as_str())
                .record(started.elapsed().as_secs_f64() * 1000.0);
        }

        self.state = MutationState::Settled(outcome);
        result
    }
}

impl QueryClient {
    pub fn pending<M: Mutation>(&self, mutation: M) -> PendingMutation<'_, M> {
        PendingMutation::new(self, mutation)
    }

    /// Run one mutation to completion.
    pub async fn mutate<M: Mutation>(&self, mutation: M) -> ApiResult<M::Output> {
        self.pending(mutation).execute().await
    }

    /// Split `ids` by the modify limit and run one mutation per chunk
    /// concurrently. Each chunk notifies and settles on its own; the first
    /// failure in chunk order is returned.
    pub async fn mutate_chunked<M, F>(&self, ids: &[Uuid], build: F) -> ApiResult<Vec<M::Output>>
    where
        M: Mutation,
        F: Fn(Vec<Uuid>) -> M,
    {
        let chunks = split_ids(ids, self.api().limits().max_modify_targets);
        let runs = chunks.into_iter().map(|chunk| self.mutate(build(chunk)));
        let mut outputs = Vec::new();
        let mut first_error = None;
        for result in join_all(runs).await {
            match result {
                Ok(output) => outputs.push(output),
                Err(err) if first_error.is_none() => first_error = Some(err),
                Err(_) => {}
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(outputs),
        }
    }
}
