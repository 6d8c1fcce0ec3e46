use async_trait::async_trait;
use tessera_api_types::{ItemMembership, MembershipPatch, NewMembership, PermissionLevel};
use uuid::Uuid;

use super::Mutation;
use crate::api::{ApiContext, memberships};
use crate::cache::{ItemKeys, MembershipKeys, QueryCache, QueryKey, Snapshot};
use crate::error::ApiResult;
use crate::notify::Action;

fn membership_keys(item_id: Uuid) -> Vec<QueryKey> {
    vec![ItemKeys::single(item_id).memberships(), MembershipKeys::all()]
}

/// Edit the cached membership list of `item_id` in place.
fn edit_list<F>(cache: &QueryCache, item_id: Uuid, edit: F) -> Option<Snapshot<Vec<ItemMembership>>>
where
    F: FnOnce(&mut Vec<ItemMembership>),
{
    let key = ItemKeys::single(item_id).memberships();
    let snapshot = cache.snapshot::<Vec<ItemMembership>>(&key)?;
    cache.update::<Vec<ItemMembership>, _>(&key, edit);
    Some(snapshot)
}

pub struct PostItemMembership {
    pub item_id: Uuid,
    pub membership: NewMembership,
}

#[async_trait]
impl Mutation for PostItemMembership {
    type Output = ItemMembership;
    type Snapshot = ();

    fn action(&self) -> Action {
        Action::PostItemMembership
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<ItemMembership> {
        memberships::post_item_membership(api, self.item_id, &self.membership).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&ItemMembership>) -> Vec<QueryKey> {
        membership_keys(self.item_id)
    }
}

pub struct EditItemMembership {
    pub item_id: Uuid,
    pub membership_id: Uuid,
    pub permission: PermissionLevel,
}

#[async_trait]
impl Mutation for EditItemMembership {
    type Output = ItemMembership;
    type Snapshot = Snapshot<Vec<ItemMembership>>;

    fn action(&self) -> Action {
        Action::EditItemMembership
    }

    fn optimistic_keys(&self) -> Vec<QueryKey> {
        vec![ItemKeys::single(self.item_id).memberships()]
    }

    fn apply_optimistic(&self, cache: &QueryCache) -> Option<Self::Snapshot> {
        edit_list(cache, self.item_id, |list| {
            for membership in list.iter_mut().filter(|m| m.id == self.membership_id) {
                membership.permission = self.permission;
            }
        })
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<ItemMembership> {
        let patch = MembershipPatch {
            permission: self.permission,
        };
        memberships::edit_item_membership(api, self.membership_id, &patch).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&ItemMembership>) -> Vec<QueryKey> {
        membership_keys(self.item_id)
    }
}

pub struct DeleteItemMembership {
    pub item_id: Uuid,
    pub membership_id: Uuid,
}

#[async_trait]
impl Mutation for DeleteItemMembership {
    type Output = ItemMembership;
    type Snapshot = Snapshot<Vec<ItemMembership>>;

    fn action(&self) -> Action {
        Action::DeleteItemMembership
    }

    fn optimistic_keys(&self) -> Vec<QueryKey> {
        vec![ItemKeys::single(self.item_id).memberships()]
    }

    fn apply_optimistic(&self, cache: &QueryCache) -> Option<Self::Snapshot> {
        edit_list(cache, self.item_id, |list| {
            list.retain(|m| m.id != self.membership_id);
        })
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<ItemMembership> {
        memberships::delete_item_membership(api, self.membership_id).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&ItemMembership>) -> Vec<QueryKey> {
        // Losing a membership can remove the item from the accessible list.
        let mut keys = membership_keys(self.item_id);
        keys.push(ItemKeys::all_accessible());
        keys
    }
}
