use std::collections::HashMap;

use tessera_api_types::{Member, ThumbnailSize};
use uuid::Uuid;

use super::{Query, require};
use crate::api::members;
use crate::cache::MemberKeys;
use crate::client::QueryClient;

impl QueryClient {
    /// The signed-in member. Fails with `Unauthenticated` without a session.
    pub fn current_member(&self) -> Query<'_, Member> {
        self.query(MemberKeys::current(), true, |api| async move {
            members::get_current_member(&api).await
        })
    }

    pub fn member(&self, id: impl Into<Option<Uuid>>) -> Query<'_, Member> {
        let id = id.into();
        self.query(MemberKeys::single(id).content(), id.is_some(), move |api| async move {
            members::get_member(&api, require(id, "member id")?).await
        })
    }

    pub fn members_many(&self, ids: &[Uuid]) -> Query<'_, HashMap<Uuid, Member>> {
        let owned = ids.to_vec();
        self.query(MemberKeys::many(ids), true, move |api| {
            let ids = owned.clone();
            async move { members::get_many_members(&api, &ids).await }
        })
        .fan_out(|cache, members: &HashMap<Uuid, Member>| {
            for (id, member) in members {
                cache.set(MemberKeys::single(*id).content(), member.clone());
            }
        })
    }

    pub fn member_avatar_url(
        &self,
        id: impl Into<Option<Uuid>>,
        size: ThumbnailSize,
    ) -> Query<'_, Option<String>> {
        let id = id.into();
        let key = MemberKeys::single(id).avatar(size);
        self.query(key, id.is_some(), move |api| async move {
            members::get_member_avatar_url(&api, require(id, "member id")?, size).await
        })
    }
}
