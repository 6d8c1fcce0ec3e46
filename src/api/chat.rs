use reqwest::Method;
use tessera_api_types::{ChatMessage, ChatMessagePatch, NewChatMessage};
use uuid::Uuid;

use super::{ApiContext, routes};
use crate::error::ApiResult;

pub async fn get_item_chat(ctx: &ApiContext, item_id: Uuid) -> ApiResult<Vec<ChatMessage>> {
    ctx.get(&routes::item_chat(item_id)).await
}

pub async fn post_chat_message(
    ctx: &ApiContext,
    item_id: Uuid,
    message: &NewChatMessage,
) -> ApiResult<ChatMessage> {
    ctx.send(Method::POST, &routes::item_chat(item_id), Some(message))
        .await
}

pub async fn patch_chat_message(
    ctx: &ApiContext,
    item_id: Uuid,
    message_id: Uuid,
    patch: &ChatMessagePatch,
) -> ApiResult<ChatMessage> {
    ctx.send(
        Method::PATCH,
        &routes::chat_message(item_id, message_id),
        Some(patch),
    )
    .await
}

pub async fn delete_chat_message(
    ctx: &ApiContext,
    item_id: Uuid,
    message_id: Uuid,
) -> ApiResult<ChatMessage> {
    ctx.send::<(), _>(
        Method::DELETE,
        &routes::chat_message(item_id, message_id),
        None,
    )
    .await
}

pub async fn clear_item_chat(ctx: &ApiContext, item_id: Uuid) -> ApiResult<()> {
    ctx.send_unit::<()>(Method::DELETE, &routes::item_chat(item_id), None)
        .await
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn post_message_returns_created_record() {
        let server = MockServer::start();
        let item_id = Uuid::new_v4();
        let message_id = Uuid::new_v4();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path(format!("/items/{item_id}/chat"))
                .json_body(json!({"body": "hello"}));
            then.status(200).json_body(json!({
                "id": message_id,
                "itemId": item_id,
                "body": "hello",
                "createdAt": "2024-03-01T10:00:00Z",
                "updatedAt": "2024-03-01T10:00:00Z",
            }));
        });

        let ctx = ApiContext::connect(&server.base_url(), Some("token".into())).expect("ctx");
        let message = NewChatMessage {
            body: "hello".into(),
            mentions: Vec::new(),
        };
        let created = post_chat_message(&ctx, item_id, &message)
            .await
            .expect("created");
        mock.assert();
        assert_eq!(created.id, message_id);
    }
}
