//! Cache key definitions.
//!
//! A `QueryKey` is an ordered list of parts. Keys are hierarchical: the key
//! of an item is a strict prefix of the keys of everything derived from it
//! (children, thumbnails, chat, ...), so invalidating the parent by prefix
//! reaches every derived entry.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use tessera_api_types::{
    AccessibleParams, ChildrenParams, DescendantsParams, GeoBounds, Pagination, TagSearch,
    ThumbnailSize,
};
use uuid::Uuid;

const ITEMS: &str = "items";
const MEMBERS: &str = "members";
const MEMBERSHIPS: &str = "memberships";
const TAGS: &str = "tags";
const SUBSCRIPTIONS: &str = "subscriptions";

const ONE: &str = "one";
const MANY: &str = "many";

/// A parameter value inside a key.
///
/// Floats compare and hash by bit pattern (with `-0.0` folded into `0.0`)
/// so that keys can live in hash maps.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    fn float_bits(value: f64) -> u64 {
        if value == 0.0 {
            0.0f64.to_bits()
        } else {
            value.to_bits()
        }
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ParamValue::Null, ParamValue::Null) => true,
            (ParamValue::Bool(a), ParamValue::Bool(b)) => a == b,
            (ParamValue::Int(a), ParamValue::Int(b)) => a == b,
            (ParamValue::Float(a), ParamValue::Float(b)) => {
                Self::float_bits(*a) == Self::float_bits(*b)
            }
            (ParamValue::Text(a), ParamValue::Text(b)) => a == b,
            (ParamValue::List(a), ParamValue::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ParamValue {}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ParamValue::Null => {}
            ParamValue::Bool(value) => value.hash(state),
            ParamValue::Int(value) => value.hash(state),
            ParamValue::Float(value) => Self::float_bits(*value).hash(state),
            ParamValue::Text(value) => value.hash(state),
            ParamValue::List(values) => values.hash(state),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => f.write_str("null"),
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Float(value) => write!(f, "{value}"),
            ParamValue::Text(value) => write!(f, "{value:?}"),
            ParamValue::List(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<Uuid> for ParamValue {
    fn from(value: Uuid) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Named parameters, ordered by name so insertion order never matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyParams(BTreeMap<&'static str, ParamValue>);

impl KeyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }
}

impl fmt::Display for KeyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (name, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}:{value}")?;
        }
        f.write_str("}")
    }
}

impl From<&ChildrenParams> for KeyParams {
    fn from(params: &ChildrenParams) -> Self {
        KeyParams::new()
            .with("types", type_names(&params.normalized_types()))
            .with("ordered", params.ordered)
            .with("keywords", params.normalized_keywords())
    }
}

impl From<&DescendantsParams> for KeyParams {
    fn from(params: &DescendantsParams) -> Self {
        KeyParams::new()
            .with("types", type_names(&params.normalized_types()))
            .with("showHidden", params.show_hidden)
    }
}

impl From<&AccessibleParams> for KeyParams {
    fn from(params: &AccessibleParams) -> Self {
        let permissions: Vec<&str> = params
            .normalized_permissions()
            .into_iter()
            .map(|p| p.as_str())
            .collect();
        KeyParams::new()
            .with("keywords", params.normalized_keywords())
            .with("sortBy", params.sort_by.as_str())
            .with("ordering", params.ordering.as_str())
            .with("creatorId", params.creator_id)
            .with("permissions", permissions)
            .with("types", type_names(&params.normalized_types()))
    }
}

impl From<&Pagination> for KeyParams {
    fn from(pagination: &Pagination) -> Self {
        KeyParams::new()
            .with("page", pagination.page)
            .with("pageSize", pagination.page_size)
    }
}

impl From<&GeoBounds> for KeyParams {
    fn from(bounds: &GeoBounds) -> Self {
        KeyParams::new()
            .with("lat1", bounds.lat1)
            .with("lat2", bounds.lat2)
            .with("lng1", bounds.lng1)
            .with("lng2", bounds.lng2)
    }
}

impl From<&TagSearch> for KeyParams {
    fn from(search: &TagSearch) -> Self {
        KeyParams::new()
            .with("search", search.normalized_search())
            .with("category", search.category.map(|c| c.as_str()))
    }
}

fn type_names(types: &[tessera_api_types::ItemType]) -> Vec<&'static str> {
    types.iter().map(|t| t.as_str()).collect()
}

/// One segment of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Scope(&'static str),
    /// An identifier; `None` keeps the key valid before the id is known.
    Id(Option<Uuid>),
    /// A sorted, deduplicated identifier set.
    Ids(Vec<Uuid>),
    Text(String),
    Params(KeyParams),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Scope(scope) => write!(f, "{scope:?}"),
            KeyPart::Id(Some(id)) => write!(f, "\"{id}\""),
            KeyPart::Id(None) => f.write_str("undefined"),
            KeyPart::Ids(ids) => {
                f.write_str("[")?;
                for (index, id) in ids.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "\"{id}\"")?;
                }
                f.write_str("]")
            }
            KeyPart::Text(text) => write!(f, "{text:?}"),
            KeyPart::Params(params) => write!(f, "{params}"),
        }
    }
}

/// Structural cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    pub fn root(scope: &'static str) -> Self {
        Self(vec![KeyPart::Scope(scope)])
    }

    pub fn scope(self, scope: &'static str) -> Self {
        self.push(KeyPart::Scope(scope))
    }

    pub fn id(self, id: Option<Uuid>) -> Self {
        self.push(KeyPart::Id(id))
    }

    pub fn ids(self, ids: &[Uuid]) -> Self {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        self.push(KeyPart::Ids(ids))
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.push(KeyPart::Text(text.into()))
    }

    pub fn params(self, params: impl Into<KeyParams>) -> Self {
        self.push(KeyPart::Params(params.into()))
    }

    fn push(mut self, part: KeyPart) -> Self {
        self.0.push(part);
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `prefix` equals this key or is one of its ancestors.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// True when any identifier part of the key is missing.
    pub fn has_undefined_id(&self) -> bool {
        self.0.iter().any(|part| matches!(part, KeyPart::Id(None)))
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, part) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str("]")
    }
}

// ============================================================================
// Items
// ============================================================================

pub struct ItemKeys;

impl ItemKeys {
    pub fn all() -> QueryKey {
        QueryKey::root(ITEMS)
    }

    pub fn single(id: impl Into<Option<Uuid>>) -> ItemKey {
        ItemKey(Self::all().scope(ONE).id(id.into()))
    }

    pub fn many(ids: &[Uuid]) -> QueryKey {
        Self::all().scope(MANY).ids(ids)
    }

    pub fn all_accessible() -> QueryKey {
        Self::all().scope("accessible")
    }

    pub fn accessible(params: &AccessibleParams, pagination: &Pagination) -> QueryKey {
        Self::all_accessible().params(params).params(pagination)
    }

    pub fn recycled() -> QueryKey {
        Self::all().scope("recycled")
    }

    pub fn all_geolocation() -> QueryKey {
        Self::all().scope("geolocation")
    }

    pub fn in_bounds(bounds: &GeoBounds) -> QueryKey {
        Self::all_geolocation().params(bounds)
    }
}

/// Keys rooted at one item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey(QueryKey);

impl ItemKey {
    pub fn key(&self) -> QueryKey {
        self.0.clone()
    }

    pub fn content(&self) -> QueryKey {
        self.key().scope("content")
    }

    pub fn all_children(&self) -> QueryKey {
        self.key().scope("children")
    }

    pub fn children(&self, params: &ChildrenParams) -> QueryKey {
        self.all_children().params(params)
    }

    pub fn all_descendants(&self) -> QueryKey {
        self.key().scope("descendants")
    }

    pub fn descendants(&self, params: &DescendantsParams) -> QueryKey {
        self.all_descendants().params(params)
    }

    pub fn parents(&self) -> QueryKey {
        self.key().scope("parents")
    }

    pub fn thumbnail(&self, size: ThumbnailSize) -> QueryKey {
        self.key().scope("thumbnails").text(size.as_str())
    }

    pub fn memberships(&self) -> QueryKey {
        self.key().scope(MEMBERSHIPS)
    }

    pub fn chat(&self) -> QueryKey {
        self.key().scope("chat")
    }

    pub fn tags(&self) -> QueryKey {
        self.key().scope(TAGS)
    }

    pub fn geolocation(&self) -> QueryKey {
        self.key().scope("geolocation")
    }
}

impl From<ItemKey> for QueryKey {
    fn from(key: ItemKey) -> Self {
        key.0
    }
}

// ============================================================================
// Members
// ============================================================================

pub struct MemberKeys;

impl MemberKeys {
    pub fn all() -> QueryKey {
        QueryKey::root(MEMBERS)
    }

    pub fn current() -> QueryKey {
        Self::all().scope("current")
    }

    pub fn single(id: impl Into<Option<Uuid>>) -> MemberKey {
        MemberKey(Self::all().scope(ONE).id(id.into()))
    }

    pub fn many(ids: &[Uuid]) -> QueryKey {
        Self::all().scope(MANY).ids(ids)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberKey(QueryKey);

impl MemberKey {
    pub fn key(&self) -> QueryKey {
        self.0.clone()
    }

    pub fn content(&self) -> QueryKey {
        self.key().scope("content")
    }

    pub fn avatar(&self, size: ThumbnailSize) -> QueryKey {
        self.key().scope("avatar").text(size.as_str())
    }
}

// ============================================================================
// Memberships, tags, subscriptions
// ============================================================================

pub struct MembershipKeys;

impl MembershipKeys {
    pub fn all() -> QueryKey {
        QueryKey::root(MEMBERSHIPS)
    }

    pub fn many(item_ids: &[Uuid]) -> QueryKey {
        Self::all().scope(MANY).ids(item_ids)
    }
}

pub struct TagKeys;

impl TagKeys {
    pub fn all() -> QueryKey {
        QueryKey::root(TAGS)
    }

    pub fn search(search: &TagSearch) -> QueryKey {
        Self::all().scope("search").params(search)
    }
}

pub struct SubscriptionKeys;

impl SubscriptionKeys {
    pub fn all() -> QueryKey {
        QueryKey::root(SUBSCRIPTIONS)
    }

    pub fn current() -> QueryKey {
        Self::all().scope("current")
    }
}
