use async_trait::async_trait;
use tessera_api_types::{ChatMessage, ChatMessagePatch, NewChatMessage};
use uuid::Uuid;

use super::Mutation;
use crate::api::{ApiContext, chat};
use crate::cache::{ItemKeys, QueryCache, QueryKey, Snapshot};
use crate::error::ApiResult;
use crate::notify::Action;

fn edit_chat<F>(cache: &QueryCache, item_id: Uuid, edit: F) -> Option<Snapshot<Vec<ChatMessage>>>
where
    F: FnOnce(&mut Vec<ChatMessage>),
{
    let key = ItemKeys::single(item_id).chat();
    let snapshot = cache.snapshot::<Vec<ChatMessage>>(&key)?;
    cache.update::<Vec<ChatMessage>, _>(&key, edit);
    Some(snapshot)
}

pub struct PostChatMessage {
    pub item_id: Uuid,
    pub message: NewChatMessage,
}

#[async_trait]
impl Mutation for PostChatMessage {
    type Output = ChatMessage;
    type Snapshot = ();

    fn action(&self) -> Action {
        Action::PostChatMessage
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<ChatMessage> {
        chat::post_chat_message(api, self.item_id, &self.message).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&ChatMessage>) -> Vec<QueryKey> {
        vec![ItemKeys::single(self.item_id).chat()]
    }

    fn defer_to_websocket(&self) -> bool {
        true
    }
}

pub struct PatchChatMessage {
    pub item_id: Uuid,
    pub message_id: Uuid,
    pub body: String,
}

#[async_trait]
impl Mutation for PatchChatMessage {
    type Output = ChatMessage;
    type Snapshot = Snapshot<Vec<ChatMessage>>;

    fn action(&self) -> Action {
        Action::PatchChatMessage
    }

    fn optimistic_keys(&self) -> Vec<QueryKey> {
        vec![ItemKeys::single(self.item_id).chat()]
    }

    fn apply_optimistic(&self, cache: &QueryCache) -> Option<Self::Snapshot> {
        edit_chat(cache, self.item_id, |messages| {
            for message in messages.iter_mut().filter(|m| m.id == self.message_id) {
                message.body.clone_from(&self.body);
            }
        })
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<ChatMessage> {
        let patch = ChatMessagePatch {
            body: self.body.clone(),
        };
        chat::patch_chat_message(api, self.item_id, self.message_id, &patch).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&ChatMessage>) -> Vec<QueryKey> {
        vec![ItemKeys::single(self.item_id).chat()]
    }

    fn defer_to_websocket(&self) -> bool {
        true
    }
}

pub struct DeleteChatMessage {
    pub item_id: Uuid,
    pub message_id: Uuid,
}

#[async_trait]
impl Mutation for DeleteChatMessage {
    type Output = ChatMessage;
    type Snapshot = Snapshot<Vec<ChatMessage>>;

    fn action(&self) -> Action {
        Action::DeleteChatMessage
    }

    fn optimistic_keys(&self) -> Vec<QueryKey> {
        vec![ItemKeys::single(self.item_id).chat()]
    }

    fn apply_optimistic(&self, cache: &QueryCache) -> Option<Self::Snapshot> {
        edit_chat(cache, self.item_id, |messages| {
            messages.retain(|m| m.id != self.message_id);
        })
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<ChatMessage> {
        chat::delete_chat_message(api, self.item_id, self.message_id).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&ChatMessage>) -> Vec<QueryKey> {
        vec![ItemKeys::single(self.item_id).chat()]
    }

    fn defer_to_websocket(&self) -> bool {
        true
    }
}

pub struct ClearItemChat {
    pub item_id: Uuid,
}

#[async_trait]
impl Mutation for ClearItemChat {
    type Output = ();
    type Snapshot = Snapshot<Vec<ChatMessage>>;

    fn action(&self) -> Action {
        Action::ClearItemChat
    }

    fn optimistic_keys(&self) -> Vec<QueryKey> {
        vec![ItemKeys::single(self.item_id).chat()]
    }

    fn apply_optimistic(&self, cache: &QueryCache) -> Option<Self::Snapshot> {
        edit_chat(cache, self.item_id, Vec::clear)
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<()> {
        chat::clear_item_chat(api, self.item_id).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&()>) -> Vec<QueryKey> {
        vec![ItemKeys::single(self.item_id).chat()]
    }

    fn defer_to_websocket(&self) -> bool {
        true
    }
}
