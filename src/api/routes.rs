//! Endpoint routes.
//!
//! A [`Route`] is a relative path plus ordered query pairs. Array parameters
//! are repeated (`id=a&id=b`). Builders below name every endpoint the client
//! talks to.

use std::fmt::Display;

use tessera_api_types::{
    AccessibleParams, ChildrenParams, DescendantsParams, GeoBounds, Geolocation, Pagination,
    TagCategory, TagSearch, ThumbnailSize,
};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    path: String,
    query: Vec<(&'static str, String)>,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn segment(mut self, segment: impl Display) -> Self {
        if !self.path.is_empty() && !self.path.ends_with('/') {
            self.path.push('/');
        }
        self.path.push_str(&segment.to_string());
        self
    }

    pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.query.push((name, value.to_string()));
        self
    }

    pub fn param_opt<V: ToString>(self, name: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Repeat `name` once per value.
    pub fn params<I>(mut self, name: &'static str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        for value in values {
            self.query.push((name, value.to_string()));
        }
        self
    }

    pub fn page(self, pagination: &Pagination) -> Self {
        self.param("page", pagination.page)
            .param("pageSize", pagination.page_size)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(&'static str, String)] {
        &self.query
    }

    pub fn to_url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut url = base.join(self.path.trim_start_matches('/'))?;
        url.set_query(None);
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

// ============================================================================
// Items
// ============================================================================

pub fn item(id: Uuid) -> Route {
    Route::new("items").segment(id)
}

pub fn items(ids: &[Uuid]) -> Route {
    Route::new("items").params("id", ids)
}

pub fn children(id: Uuid, params: &ChildrenParams) -> Route {
    item(id)
        .segment("children")
        .params("types", params.normalized_types().iter().map(|t| t.as_str()))
        .param("ordered", params.ordered)
        .param_opt("keywords", params.normalized_keywords())
}

pub fn descendants(id: Uuid, params: &DescendantsParams) -> Route {
    item(id)
        .segment("descendants")
        .params("types", params.normalized_types().iter().map(|t| t.as_str()))
        .param("showHidden", params.show_hidden)
}

pub fn parents(id: Uuid) -> Route {
    item(id).segment("parents")
}

pub fn accessible(params: &AccessibleParams, pagination: &Pagination) -> Route {
    Route::new("items/accessible")
        .page(pagination)
        .param_opt("keywords", params.normalized_keywords())
        .param("sortBy", params.sort_by.as_str())
        .param("ordering", params.ordering.as_str())
        .params(
            "permissions",
            params.normalized_permissions().iter().map(|p| p.as_str()),
        )
        .params("types", params.normalized_types().iter().map(|t| t.as_str()))
        .param_opt("creatorId", params.creator_id)
}

pub fn recycled() -> Route {
    Route::new("items/recycled")
}

pub fn in_bounds(bounds: &GeoBounds) -> Route {
    Route::new("items/geolocation")
        .param("lat1", bounds.lat1)
        .param("lat2", bounds.lat2)
        .param("lng1", bounds.lng1)
        .param("lng2", bounds.lng2)
}

pub fn item_geolocation(id: Uuid) -> Route {
    item(id).segment("geolocation")
}

pub fn item_thumbnail(id: Uuid, size: ThumbnailSize) -> Route {
    item(id)
        .segment("thumbnails")
        .segment(size.as_str())
        .param("replyUrl", true)
}

pub fn post_item(parent_id: Option<Uuid>) -> Route {
    Route::new("items").param_opt("parentId", parent_id)
}

pub fn upload(parent_id: Option<Uuid>, geolocation: Option<Geolocation>) -> Route {
    Route::new("items/upload")
        .param_opt("id", parent_id)
        .param_opt("lat", geolocation.map(|g| g.lat))
        .param_opt("lng", geolocation.map(|g| g.lng))
}

pub fn move_items(ids: &[Uuid]) -> Route {
    Route::new("items/move").params("id", ids)
}

pub fn copy_items(ids: &[Uuid]) -> Route {
    Route::new("items/copy").params("id", ids)
}

pub fn recycle_items(ids: &[Uuid]) -> Route {
    Route::new("items/recycle").params("id", ids)
}

pub fn restore_items(ids: &[Uuid]) -> Route {
    Route::new("items/restore").params("id", ids)
}

// ============================================================================
// Members & memberships
// ============================================================================

pub fn current_member() -> Route {
    Route::new("members/current")
}

pub fn member(id: Uuid) -> Route {
    Route::new("members").segment(id)
}

pub fn members(ids: &[Uuid]) -> Route {
    Route::new("members").params("id", ids)
}

pub fn member_avatar(id: Uuid, size: ThumbnailSize) -> Route {
    member(id)
        .segment("avatar")
        .segment(size.as_str())
        .param("replyUrl", true)
}

pub fn item_memberships(item_ids: &[Uuid]) -> Route {
    Route::new("item-memberships").params("itemId", item_ids)
}

pub fn post_item_membership(item_id: Uuid) -> Route {
    Route::new("item-memberships").param("itemId", item_id)
}

pub fn item_membership(membership_id: Uuid) -> Route {
    Route::new("item-memberships").segment(membership_id)
}

// ============================================================================
// Chat, tags, subscriptions
// ============================================================================

pub fn item_chat(item_id: Uuid) -> Route {
    item(item_id).segment("chat")
}

pub fn chat_message(item_id: Uuid, message_id: Uuid) -> Route {
    item_chat(item_id).segment(message_id)
}

pub fn item_tags(item_id: Uuid) -> Route {
    item(item_id).segment("tags")
}

pub fn post_item_tag(item_id: Uuid, category: TagCategory) -> Route {
    item_tags(item_id).segment(category.as_str())
}

pub fn item_tag(item_id: Uuid, tag_id: Uuid) -> Route {
    item_tags(item_id).segment(tag_id)
}

pub fn tag_search(search: &TagSearch) -> Route {
    Route::new("tags")
        .param_opt("search", search.normalized_search())
        .param_opt("category", search.category.map(TagCategory::as_str))
}

pub fn subscriptions() -> Route {
    Route::new("subscriptions")
}

pub fn item_subscription(item_id: Uuid) -> Route {
    item(item_id).segment("subscriptions")
}

#[cfg(test)]
mod tests {
    use tessera_api_types::{ItemType, PermissionLevel, SortBy, SortOrder};

    use super::*;

    fn base() -> Url {
        Url::parse("https://api.example.org/").expect("base")
    }

    #[test]
    fn array_parameters_repeat_the_name() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let url = items(&[a, b]).to_url(&base()).expect("url");
        assert_eq!(
            url.as_str(),
            format!("https://api.example.org/items?id={a}&id={b}")
        );
    }

    #[test]
    fn children_route_normalizes_filters() {
        let id = Uuid::new_v4();
        let params = ChildrenParams {
            types: vec![ItemType::Document, ItemType::Folder, ItemType::Document],
            ordered: false,
            keywords: Some("  ".into()),
        };
        let url = children(id, &params).to_url(&base()).expect("url");
        assert_eq!(
            url.as_str(),
            format!(
                "https://api.example.org/items/{id}/children?types=folder&types=document&ordered=false"
            )
        );
    }

    #[test]
    fn accessible_route_carries_pagination_and_filters() {
        let params = AccessibleParams {
            keywords: Some("physics lab".into()),
            sort_by: SortBy::Name,
            ordering: SortOrder::Asc,
            creator_id: None,
            permissions: vec![PermissionLevel::Admin, PermissionLevel::Write],
            types: Vec::new(),
        };
        let route = accessible(&params, &Pagination::default());
        assert_eq!(route.path(), "items/accessible");
        assert_eq!(
            route.query(),
            &[
                ("page", "1".to_string()),
                ("pageSize", "24".to_string()),
                ("keywords", "physics lab".to_string()),
                ("sortBy", "item.name".to_string()),
                ("ordering", "asc".to_string()),
                ("permissions", "write".to_string()),
                ("permissions", "admin".to_string()),
            ]
        );
        let url = route.to_url(&base()).expect("url");
        assert!(url.as_str().contains("keywords=physics+lab"));
    }

    #[test]
    fn upload_route_carries_parent_and_point() {
        let parent = Uuid::new_v4();
        let route = upload(Some(parent), Some(Geolocation { lat: 1.5, lng: -2.0 }));
        assert_eq!(
            route.query(),
            &[
                ("id", parent.to_string()),
                ("lat", "1.5".to_string()),
                ("lng", "-2".to_string()),
            ]
        );
        assert!(upload(None, None).query().is_empty());
    }

    #[test]
    fn nested_resources_extend_item_path() {
        let item_id = Uuid::new_v4();
        let message_id = Uuid::new_v4();
        assert_eq!(
            chat_message(item_id, message_id).path(),
            format!("items/{item_id}/chat/{message_id}")
        );
        assert_eq!(
            post_item_tag(item_id, TagCategory::ResourceType).path(),
            format!("items/{item_id}/tags/resourceType")
        );
        assert_eq!(
            item_thumbnail(item_id, ThumbnailSize::Small)
                .to_url(&base())
                .expect("url")
                .query(),
            Some("replyUrl=true")
        );
    }
}
