//! Shared request and response types for the Tessera content API.
//!
//! Records mirror the JSON payloads exchanged with the server (camelCase on
//! the wire). Query-parameter records are used both to build request routes
//! and to build cache keys, so they resolve their defaults eagerly.

pub mod chat;
pub mod items;
pub mod members;
pub mod memberships;
pub mod pagination;
pub mod results;
pub mod subscriptions;
pub mod tags;

pub use chat::{ChatMessage, ChatMessagePatch, NewChatMessage};
pub use items::{
    AccessibleParams, ChildrenParams, DescendantsParams, GeoBounds, Geolocation, Item,
    ItemGeolocation, ItemPatch, ItemType, NewItem, SortBy, SortOrder, ThumbnailSize, UploadFile,
    build_item_path, path_to_ids,
};
pub use members::{Member, MemberPatch};
pub use memberships::{ItemMembership, MembershipPatch, NewMembership, PermissionLevel};
pub use pagination::{Page, Pagination};
pub use results::{ErrorPayload, ResultOf};
pub use subscriptions::Subscription;
pub use tags::{NewTag, Tag, TagCategory, TagCount, TagSearch};
