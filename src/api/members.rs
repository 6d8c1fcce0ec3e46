use std::collections::HashMap;

use reqwest::Method;
use tessera_api_types::{Member, MemberPatch, ResultOf, ThumbnailSize};
use uuid::Uuid;

use super::items::unquote;
use super::{ApiContext, chunked_request, routes};
use crate::error::ApiResult;

pub async fn get_current_member(ctx: &ApiContext) -> ApiResult<Member> {
    ctx.get_authed(&routes::current_member()).await
}

pub async fn get_member(ctx: &ApiContext, id: Uuid) -> ApiResult<Member> {
    ctx.get(&routes::member(id)).await
}

pub async fn get_members(ctx: &ApiContext, ids: &[Uuid]) -> ApiResult<ResultOf<Member>> {
    ctx.get(&routes::members(ids)).await
}

pub async fn get_many_members(
    ctx: &ApiContext,
    ids: &[Uuid],
) -> ApiResult<HashMap<Uuid, Member>> {
    chunked_request(ids, ctx.limits().max_read_targets, |chunk| async move {
        get_members(ctx, &chunk).await
    })
    .await
}

pub async fn edit_member(ctx: &ApiContext, id: Uuid, patch: &MemberPatch) -> ApiResult<Member> {
    ctx.send(Method::PATCH, &routes::member(id), Some(patch)).await
}

pub async fn get_member_avatar_url(
    ctx: &ApiContext,
    id: Uuid,
    size: ThumbnailSize,
) -> ApiResult<Option<String>> {
    let body = ctx.get_text(&routes::member_avatar(id, size)).await?;
    Ok(body.map(unquote))
}
