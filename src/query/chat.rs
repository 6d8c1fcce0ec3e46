use tessera_api_types::ChatMessage;
use uuid::Uuid;

use super::{Query, require};
use crate::api::chat;
use crate::cache::ItemKeys;
use crate::client::QueryClient;

impl QueryClient {
    pub fn item_chat(&self, item_id: impl Into<Option<Uuid>>) -> Query<'_, Vec<ChatMessage>> {
        let item_id = item_id.into();
        self.query(ItemKeys::single(item_id).chat(), item_id.is_some(), move |api| async move {
            chat::get_item_chat(&api, require(item_id, "item id")?).await
        })
    }
}
