use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::items::normalize_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagCategory {
    Level,
    Discipline,
    ResourceType,
}

impl TagCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TagCategory::Level => "level",
            TagCategory::Discipline => "discipline",
            TagCategory::ResourceType => "resourceType",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub category: TagCategory,
}

/// A tag name with the number of items carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub name: String,
    pub category: TagCategory,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagSearch {
    pub search: String,
    pub category: Option<TagCategory>,
}

impl TagSearch {
    /// Search text without surrounding whitespace, or `None` when blank.
    pub fn normalized_search(&self) -> Option<String> {
        normalize_text(Some(&self.search))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTag {
    pub name: String,
}
