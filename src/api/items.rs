use std::collections::HashMap;

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tessera_api_types::{
    AccessibleParams, ChildrenParams, DescendantsParams, GeoBounds, Geolocation, Item,
    ItemGeolocation, ItemPatch, NewItem, Page, Pagination, ResultOf, ThumbnailSize, UploadFile,
};
use uuid::Uuid;

use super::{ApiContext, chunked_request, into_partial, routes};
use crate::error::ApiResult;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParentBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<Uuid>,
}

#[derive(Serialize)]
struct GeolocationBody {
    geolocation: Geolocation,
}

pub async fn get_item(ctx: &ApiContext, id: Uuid) -> ApiResult<Item> {
    ctx.get(&routes::item(id)).await
}

/// One request for at most `max_read_targets` ids.
pub async fn get_items(ctx: &ApiContext, ids: &[Uuid]) -> ApiResult<ResultOf<Item>> {
    ctx.get(&routes::items(ids)).await
}

/// Any number of ids, split into concurrent requests.
pub async fn get_many_items(ctx: &ApiContext, ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Item>> {
    chunked_request(ids, ctx.limits().max_read_targets, |chunk| async move {
        get_items(ctx, &chunk).await
    })
    .await
}

pub async fn get_children(
    ctx: &ApiContext,
    id: Uuid,
    params: &ChildrenParams,
) -> ApiResult<Vec<Item>> {
    ctx.get(&routes::children(id, params)).await
}

pub async fn get_descendants(
    ctx: &ApiContext,
    id: Uuid,
    params: &DescendantsParams,
) -> ApiResult<Vec<Item>> {
    ctx.get(&routes::descendants(id, params)).await
}

pub async fn get_parents(ctx: &ApiContext, id: Uuid) -> ApiResult<Vec<Item>> {
    ctx.get(&routes::parents(id)).await
}

pub async fn get_accessible_items(
    ctx: &ApiContext,
    params: &AccessibleParams,
    pagination: &Pagination,
) -> ApiResult<Page<Item>> {
    ctx.get_authed(&routes::accessible(params, pagination)).await
}

pub async fn get_recycled_items(ctx: &ApiContext) -> ApiResult<Vec<Item>> {
    ctx.get_authed(&routes::recycled()).await
}

pub async fn get_items_in_bounds(
    ctx: &ApiContext,
    bounds: &GeoBounds,
) -> ApiResult<Vec<ItemGeolocation>> {
    ctx.get(&routes::in_bounds(bounds)).await
}

pub async fn get_item_geolocation(
    ctx: &ApiContext,
    id: Uuid,
) -> ApiResult<Option<ItemGeolocation>> {
    ctx.get(&routes::item_geolocation(id)).await
}

pub async fn put_item_geolocation(
    ctx: &ApiContext,
    id: Uuid,
    geolocation: Geolocation,
) -> ApiResult<()> {
    let body = GeolocationBody { geolocation };
    ctx.send_unit(Method::PUT, &routes::item_geolocation(id), Some(&body))
        .await
}

pub async fn delete_item_geolocation(ctx: &ApiContext, id: Uuid) -> ApiResult<()> {
    ctx.send_unit::<()>(Method::DELETE, &routes::item_geolocation(id), None)
        .await
}

/// URL of the item's thumbnail, or `None` when it has none.
pub async fn get_item_thumbnail_url(
    ctx: &ApiContext,
    id: Uuid,
    size: ThumbnailSize,
) -> ApiResult<Option<String>> {
    let body = ctx.get_text(&routes::item_thumbnail(id, size)).await?;
    Ok(body.map(unquote))
}

/// Bodies may be a bare URL or a JSON string.
pub(crate) fn unquote(body: String) -> String {
    serde_json::from_str::<String>(&body).unwrap_or(body)
}

pub async fn post_item(ctx: &ApiContext, item: &NewItem) -> ApiResult<Item> {
    ctx.send(Method::POST, &routes::post_item(item.parent_id), Some(item))
        .await
}

/// Multipart upload into `parent_id`, or into the member's root.
pub async fn upload_files(
    ctx: &ApiContext,
    parent_id: Option<Uuid>,
    geolocation: Option<Geolocation>,
    files: &[UploadFile],
) -> ApiResult<HashMap<Uuid, Item>> {
    let mut form = Form::new();
    for file in files {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        form = form.part("files", part);
    }
    let reply: ResultOf<Item> = ctx
        .send_multipart(&routes::upload(parent_id, geolocation), form)
        .await?;
    into_partial(reply)
}

pub async fn edit_item(ctx: &ApiContext, id: Uuid, patch: &ItemPatch) -> ApiResult<Item> {
    ctx.send(Method::PATCH, &routes::item(id), Some(patch)).await
}

/// Delete one chunk of items.
pub async fn delete_items(ctx: &ApiContext, ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Item>> {
    let reply: ResultOf<Item> = ctx
        .send::<(), _>(Method::DELETE, &routes::items(ids), None)
        .await?;
    into_partial(reply)
}

/// Move one chunk of items under `to`, or to the root when `None`.
pub async fn move_items(
    ctx: &ApiContext,
    ids: &[Uuid],
    to: Option<Uuid>,
) -> ApiResult<HashMap<Uuid, Item>> {
    let body = ParentBody { parent_id: to };
    let reply: ResultOf<Item> = ctx
        .send(Method::POST, &routes::move_items(ids), Some(&body))
        .await?;
    into_partial(reply)
}

/// Copy one chunk of items; the reply maps each source id to its copy.
pub async fn copy_items(
    ctx: &ApiContext,
    ids: &[Uuid],
    to: Option<Uuid>,
) -> ApiResult<HashMap<Uuid, Item>> {
    let body = ParentBody { parent_id: to };
    let reply: ResultOf<Item> = ctx
        .send(Method::POST, &routes::copy_items(ids), Some(&body))
        .await?;
    into_partial(reply)
}

pub async fn recycle_items(ctx: &ApiContext, ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Item>> {
    let reply: ResultOf<Item> = ctx
        .send::<(), _>(Method::POST, &routes::recycle_items(ids), None)
        .await?;
    into_partial(reply)
}

pub async fn restore_items(ctx: &ApiContext, ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Item>> {
    let reply: ResultOf<Item> = ctx
        .send::<(), _>(Method::POST, &routes::restore_items(ids), None)
        .await?;
    into_partial(reply)
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;
    use tessera_api_types::{ItemType, build_item_path};

    use super::*;
    use crate::error::ApiError;

    fn item_json(id: Uuid, path: &[Uuid]) -> serde_json::Value {
        json!({
            "id": id,
            "name": "item",
            "type": "folder",
            "path": build_item_path(path),
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
        })
    }

    fn ctx(server: &MockServer) -> ApiContext {
        ApiContext::connect(&server.base_url(), Some("token".into())).expect("ctx")
    }

    #[tokio::test]
    async fn get_item_decodes_record() {
        let server = MockServer::start();
        let id = Uuid::new_v4();
        let mock = server.mock(|when, then| {
            when.method("GET").path(format!("/items/{id}"));
            then.status(200).json_body(item_json(id, &[id]));
        });

        let item = get_item(&ctx(&server), id).await.expect("item");
        mock.assert();
        assert_eq!(item.id, id);
        assert_eq!(item.item_type, ItemType::Folder);
        assert_eq!(item.parent_id(), None);
    }

    #[tokio::test]
    async fn mutations_require_a_session() {
        let ctx = ApiContext::connect("http://127.0.0.1:9", None).expect("ctx");
        let err = post_item(&ctx, &NewItem::new("x", ItemType::Folder))
            .await
            .expect_err("no session");
        assert!(matches!(err, ApiError::Unauthenticated));

        let err = delete_items(&ctx, &[Uuid::new_v4()])
            .await
            .expect_err("no session");
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn post_item_sends_parent_as_query() {
        let server = MockServer::start();
        let parent = Uuid::new_v4();
        let created = Uuid::new_v4();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/items")
                .query_param("parentId", parent.to_string())
                .json_body(json!({"name": "notes", "type": "document"}));
            then.status(200).json_body(item_json(created, &[parent, created]));
        });

        let item = post_item(
            &ctx(&server),
            &NewItem::new("notes", ItemType::Document).in_parent(parent),
        )
        .await
        .expect("created");
        mock.assert();
        assert_eq!(item.parent_id(), Some(parent));
    }

    #[tokio::test]
    async fn bulk_delete_reports_embedded_errors() {
        let server = MockServer::start();
        let ok = Uuid::new_v4();
        let denied = Uuid::new_v4();
        let mock = server.mock(|when, then| {
            when.method("DELETE")
                .path("/items")
                .query_param("id", ok.to_string())
                .query_param("id", denied.to_string());
            then.status(200).json_body(json!({
                "data": { ok.to_string(): item_json(ok, &[ok]) },
                "errors": [{ "code": "GERR006", "message": "no admin right", "statusCode": 403 }],
            }));
        });

        let err = delete_items(&ctx(&server), &[ok, denied])
            .await
            .expect_err("partial");
        mock.assert();
        assert!(matches!(err, ApiError::Partial(ref errors) if errors.len() == 1));
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn thumbnail_url_accepts_json_string_and_missing() {
        let server = MockServer::start();
        let with = Uuid::new_v4();
        let without = Uuid::new_v4();
        server.mock(|when, then| {
            when.method("GET")
                .path(format!("/items/{with}/thumbnails/small"))
                .query_param("replyUrl", "true");
            then.status(200).body("\"https://cdn.example.org/t.png\"");
        });
        server.mock(|when, then| {
            when.method("GET")
                .path(format!("/items/{without}/thumbnails/small"));
            then.status(404);
        });

        let ctx = ctx(&server);
        assert_eq!(
            get_item_thumbnail_url(&ctx, with, ThumbnailSize::Small)
                .await
                .expect("url")
                .as_deref(),
            Some("https://cdn.example.org/t.png")
        );
        assert_eq!(
            get_item_thumbnail_url(&ctx, without, ThumbnailSize::Small)
                .await
                .expect("none"),
            None
        );
    }

    #[tokio::test]
    async fn upload_posts_multipart_with_point() {
        let server = MockServer::start();
        let parent = Uuid::new_v4();
        let created = Uuid::new_v4();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/items/upload")
                .query_param("id", parent.to_string())
                .query_param("lat", "1")
                .query_param("lng", "1")
                .header_exists("content-type");
            then.status(200).json_body(json!({
                "data": { created.to_string(): item_json(created, &[parent, created]) },
                "errors": [],
            }));
        });

        let file = UploadFile {
            name: "a.txt".into(),
            mime: "text/plain".into(),
            bytes: b"hello".to_vec(),
        };
        let items = upload_files(
            &ctx(&server),
            Some(parent),
            Some(Geolocation { lat: 1.0, lng: 1.0 }),
            &[file],
        )
        .await
        .expect("uploaded");
        mock.assert();
        assert!(items.contains_key(&created));
    }
}
