use std::collections::HashMap;

use tessera_api_types::ItemMembership;
use uuid::Uuid;

use super::{Query, require};
use crate::api::{into_partial, memberships};
use crate::cache::{ItemKeys, MembershipKeys};
use crate::client::QueryClient;

impl QueryClient {
    pub fn item_memberships(&self, item_id: impl Into<Option<Uuid>>) -> Query<'_, Vec<ItemMembership>> {
        let item_id = item_id.into();
        let key = ItemKeys::single(item_id).memberships();
        self.query(key, item_id.is_some(), move |api| async move {
            let item_id = require(item_id, "item id")?;
            let reply = memberships::get_item_memberships(&api, &[item_id]).await?;
            let mut by_item = into_partial(reply)?;
            Ok(by_item.remove(&item_id).unwrap_or_default())
        })
    }

    /// Memberships of many items at once. Each list also fills the item's
    /// own memberships key.
    pub fn many_memberships(
        &self,
        item_ids: &[Uuid],
    ) -> Query<'_, HashMap<Uuid, Vec<ItemMembership>>> {
        let owned = item_ids.to_vec();
        self.query(MembershipKeys::many(item_ids), true, move |api| {
            let item_ids = owned.clone();
            async move { memberships::get_memberships_for_items(&api, &item_ids).await }
        })
        .fan_out(|cache, by_item: &HashMap<Uuid, Vec<ItemMembership>>| {
            for (item_id, list) in by_item {
                cache.set(ItemKeys::single(*item_id).memberships(), list.clone());
            }
        })
    }
}
