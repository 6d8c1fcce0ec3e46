use reqwest::Method;
use tessera_api_types::Subscription;
use uuid::Uuid;

use super::{ApiContext, routes};
use crate::error::ApiResult;

/// Subscriptions of the signed-in member.
pub async fn get_subscriptions(ctx: &ApiContext) -> ApiResult<Vec<Subscription>> {
    ctx.get_authed(&routes::subscriptions()).await
}

pub async fn subscribe_to_item(ctx: &ApiContext, item_id: Uuid) -> ApiResult<Subscription> {
    ctx.send::<(), _>(Method::POST, &routes::item_subscription(item_id), None)
        .await
}

pub async fn unsubscribe_from_item(ctx: &ApiContext, item_id: Uuid) -> ApiResult<()> {
    ctx.send_unit::<()>(Method::DELETE, &routes::item_subscription(item_id), None)
        .await
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;

    use super::*;
    use crate::error::ApiError;

    #[tokio::test]
    async fn unsubscribe_ignores_reply_body() {
        let server = MockServer::start();
        let item_id = Uuid::new_v4();
        let mock = server.mock(|when, then| {
            when.method("DELETE")
                .path(format!("/items/{item_id}/subscriptions"));
            then.status(204);
        });

        let ctx = ApiContext::connect(&server.base_url(), Some("token".into())).expect("ctx");
        unsubscribe_from_item(&ctx, item_id).await.expect("unsubscribed");
        mock.assert();
    }

    #[tokio::test]
    async fn listing_requires_session() {
        let ctx = ApiContext::connect("http://127.0.0.1:9", None).expect("ctx");
        let err = get_subscriptions(&ctx).await.expect_err("no session");
        assert!(matches!(err, ApiError::Unauthenticated));
    }
}
