use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::memberships::PermissionLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    Folder,
    Document,
    App,
    #[serde(rename = "embeddedLink")]
    Link,
    File,
    Shortcut,
    H5p,
    Etherpad,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Folder => "folder",
            ItemType::Document => "document",
            ItemType::App => "app",
            ItemType::Link => "embeddedLink",
            ItemType::File => "file",
            ItemType::Shortcut => "shortcut",
            ItemType::H5p => "h5p",
            ItemType::Etherpad => "etherpad",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub path: String,
    #[serde(default)]
    pub extra: Value,
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub creator_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Item {
    /// Identifier of the direct parent, derived from the item path.
    pub fn parent_id(&self) -> Option<Uuid> {
        let ids = path_to_ids(&self.path);
        if ids.len() < 2 {
            return None;
        }
        ids.get(ids.len() - 2).copied()
    }

    /// Ancestors from the root down, excluding the item itself.
    pub fn ancestor_ids(&self) -> Vec<Uuid> {
        let mut ids = path_to_ids(&self.path);
        ids.pop();
        ids
    }
}

/// Build an ltree-style item path (`aaaa_bbbb.cccc_dddd`) from root to leaf.
pub fn build_item_path(ids: &[Uuid]) -> String {
    ids.iter()
        .map(|id| id.to_string().replace('-', "_"))
        .collect::<Vec<_>>()
        .join(".")
}

/// Parse an item path back into identifiers, skipping malformed segments.
pub fn path_to_ids(path: &str) -> Vec<Uuid> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| Uuid::parse_str(&segment.replace('_', "-")).ok())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub lat: f64,
    pub lng: f64,
}

/// Rectangular map bounds used by geolocation searches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub lat1: f64,
    pub lat2: f64,
    pub lng1: f64,
    pub lng2: f64,
}

impl GeoBounds {
    /// The one-degree cell containing `point`.
    pub fn around(point: &Geolocation) -> Self {
        let lat1 = point.lat.floor();
        let lng1 = point.lng.floor();
        Self {
            lat1,
            lat2: lat1 + 1.0,
            lng1,
            lng2: lng1 + 1.0,
        }
    }

    pub fn contains(&self, point: &Geolocation) -> bool {
        let (lat_lo, lat_hi) = min_max(self.lat1, self.lat2);
        let (lng_lo, lng_hi) = min_max(self.lng1, self.lng2);
        (lat_lo..=lat_hi).contains(&point.lat) && (lng_lo..=lng_hi).contains(&point.lng)
    }
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGeolocation {
    pub id: Uuid,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub item: Item,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailSize {
    Small,
    Medium,
    Large,
    Original,
}

impl ThumbnailSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ThumbnailSize::Small => "small",
            ThumbnailSize::Medium => "medium",
            ThumbnailSize::Large => "large",
            ThumbnailSize::Original => "original",
        }
    }
}

/// Payload for creating an item. The parent travels as a query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub extra: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub settings: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<Geolocation>,
    #[serde(skip)]
    pub parent_id: Option<Uuid>,
}

impl NewItem {
    pub fn new(name: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            name: name.into(),
            item_type,
            description: None,
            extra: Value::Null,
            settings: Value::Null,
            geolocation: None,
            parent_id: None,
        }
    }

    pub fn in_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn at(mut self, geolocation: Geolocation) -> Self {
        self.geolocation = Some(geolocation);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

impl ItemPatch {
    /// Apply the patch locally, as the server would.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone());
        }
        if let Some(extra) = &self.extra {
            item.extra = extra.clone();
        }
        if let Some(settings) = &self.settings {
            item.settings = settings.clone();
        }
    }
}

/// A file to upload into a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildrenParams {
    pub types: Vec<ItemType>,
    pub ordered: bool,
    pub keywords: Option<String>,
}

impl Default for ChildrenParams {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            ordered: true,
            keywords: None,
        }
    }
}

impl ChildrenParams {
    pub fn of_types(types: impl IntoIterator<Item = ItemType>) -> Self {
        Self {
            types: types.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Type filter sorted and without duplicates.
    pub fn normalized_types(&self) -> Vec<ItemType> {
        normalize(&self.types)
    }

    /// Keywords with surrounding whitespace removed; blank keywords are dropped.
    pub fn normalized_keywords(&self) -> Option<String> {
        normalize_text(self.keywords.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescendantsParams {
    pub types: Vec<ItemType>,
    pub show_hidden: bool,
}

impl Default for DescendantsParams {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            show_hidden: true,
        }
    }
}

impl DescendantsParams {
    pub fn normalized_types(&self) -> Vec<ItemType> {
        normalize(&self.types)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortBy {
    Name,
    Type,
    CreatedAt,
    #[default]
    UpdatedAt,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Name => "item.name",
            SortBy::Type => "item.type",
            SortBy::CreatedAt => "item.created_at",
            SortBy::UpdatedAt => "item.updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AccessibleParams {
    pub keywords: Option<String>,
    pub sort_by: SortBy,
    pub ordering: SortOrder,
    pub creator_id: Option<Uuid>,
    pub permissions: Vec<PermissionLevel>,
    pub types: Vec<ItemType>,
}

impl AccessibleParams {
    pub fn normalized_keywords(&self) -> Option<String> {
        normalize_text(self.keywords.as_deref())
    }

    pub fn normalized_permissions(&self) -> Vec<PermissionLevel> {
        normalize(&self.permissions)
    }

    pub fn normalized_types(&self) -> Vec<ItemType> {
        normalize(&self.types)
    }
}

fn normalize<T: Ord + Copy>(values: &[T]) -> Vec<T> {
    let mut values = values.to_vec();
    values.sort_unstable();
    values.dedup();
    values
}

pub(crate) fn normalize_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
