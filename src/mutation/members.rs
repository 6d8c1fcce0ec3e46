use async_trait::async_trait;
use tessera_api_types::{Member, MemberPatch};
use uuid::Uuid;

use super::Mutation;
use crate::api::{ApiContext, members};
use crate::cache::{MemberKeys, QueryCache, QueryKey, Snapshot};
use crate::error::ApiResult;
use crate::notify::Action;

pub struct EditMember {
    pub id: Uuid,
    pub patch: MemberPatch,
}

impl EditMember {
    pub fn new(id: Uuid, patch: MemberPatch) -> Self {
        Self { id, patch }
    }

    /// The current-member entry, when it belongs to this member.
    fn current_snapshot(&self, cache: &QueryCache) -> Option<Snapshot<Member>> {
        cache
            .snapshot::<Member>(&MemberKeys::current())
            .filter(|snapshot| snapshot.value().id == self.id)
    }
}

#[async_trait]
impl Mutation for EditMember {
    type Output = Member;
    type Snapshot = (Option<Snapshot<Member>>, Option<Snapshot<Member>>);

    fn action(&self) -> Action {
        Action::EditMember
    }

    fn optimistic_keys(&self) -> Vec<QueryKey> {
        vec![MemberKeys::current(), MemberKeys::single(self.id).content()]
    }

    fn apply_optimistic(&self, cache: &QueryCache) -> Option<Self::Snapshot> {
        let current = self.current_snapshot(cache);
        let single = cache.snapshot::<Member>(&MemberKeys::single(self.id).content());
        for snapshot in current.iter().chain(single.iter()) {
            cache.update::<Member, _>(snapshot.key(), |member| self.patch.apply_to(member));
        }
        if current.is_none() && single.is_none() {
            return None;
        }
        Some((current, single))
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Member> {
        members::edit_member(api, self.id, &self.patch).await
    }

    fn on_success(&self, cache: &QueryCache, member: &Member) {
        if self.current_snapshot(cache).is_some() {
            cache.set(MemberKeys::current(), member.clone());
        }
        cache.set(MemberKeys::single(self.id).content(), member.clone());
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&Member>) -> Vec<QueryKey> {
        vec![MemberKeys::current(), MemberKeys::single(self.id).key()]
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;
    use crate::client::{ClientConfig, QueryClient};

    #[tokio::test]
    async fn rename_rolls_back_on_server_error() {
        let server = MockServer::start();
        let id = Uuid::new_v4();
        server.mock(|when, then| {
            when.method("PATCH")
                .path(format!("/members/{id}"))
                .json_body(json!({"name": "Grace H."}));
            then.status(500).body("boom");
        });
        let host = server.base_url().parse().expect("host");
        let client =
            QueryClient::new(ClientConfig::new(host).with_session("token")).expect("client");
        let original = Member {
            id,
            name: "Grace".into(),
            email: None,
            extra: serde_json::Value::Null,
        };
        client.cache().set(MemberKeys::current(), original.clone());

        let mut pending = client.pending(EditMember::new(
            id,
            MemberPatch {
                name: Some("Grace H.".into()),
                ..MemberPatch::default()
            },
        ));
        pending.begin();
        let optimistic = client.cache().peek::<Member>(&MemberKeys::current());
        assert_eq!(optimistic.map(|m| m.name), Some("Grace H.".to_string()));

        pending.execute().await.expect_err("server error");
        assert_eq!(
            client.cache().peek::<Member>(&MemberKeys::current()),
            Some(original)
        );
    }
}
