use tessera_api_types::Subscription;

use super::Query;
use crate::api::subscriptions;
use crate::cache::SubscriptionKeys;
use crate::client::QueryClient;

impl QueryClient {
    pub fn subscriptions(&self) -> Query<'_, Vec<Subscription>> {
        self.query(SubscriptionKeys::current(), true, |api| async move {
            subscriptions::get_subscriptions(&api).await
        })
    }
}
