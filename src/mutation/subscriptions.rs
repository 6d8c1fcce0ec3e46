use async_trait::async_trait;
use tessera_api_types::Subscription;
use uuid::Uuid;

use super::Mutation;
use crate::api::{ApiContext, subscriptions};
use crate::cache::{QueryCache, QueryKey, Snapshot, SubscriptionKeys};
use crate::error::ApiResult;
use crate::notify::Action;

pub struct SubscribeToItem {
    pub item_id: Uuid,
}

#[async_trait]
impl Mutation for SubscribeToItem {
    type Output = Subscription;
    type Snapshot = ();

    fn action(&self) -> Action {
        Action::SubscribeToItem
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Subscription> {
        subscriptions::subscribe_to_item(api, self.item_id).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&Subscription>) -> Vec<QueryKey> {
        vec![SubscriptionKeys::all()]
    }
}

pub struct UnsubscribeFromItem {
    pub item_id: Uuid,
}

#[async_trait]
impl Mutation for UnsubscribeFromItem {
    type Output = ();
    type Snapshot = Snapshot<Vec<Subscription>>;

    fn action(&self) -> Action {
        Action::UnsubscribeFromItem
    }

    fn optimistic_keys(&self) -> Vec<QueryKey> {
        vec![SubscriptionKeys::current()]
    }

    fn apply_optimistic(&self, cache: &QueryCache) -> Option<Self::Snapshot> {
        let key = SubscriptionKeys::current();
        let snapshot = cache.snapshot::<Vec<Subscription>>(&key)?;
        cache.update::<Vec<Subscription>, _>(&key, |list| {
            list.retain(|subscription| subscription.item_id != self.item_id);
        });
        Some(snapshot)
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<()> {
        subscriptions::unsubscribe_from_item(api, self.item_id).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&()>) -> Vec<QueryKey> {
        vec![SubscriptionKeys::all()]
    }
}
