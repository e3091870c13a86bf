//! Catalog entities as they are handed out by the [`CatalogStore`](crate::CatalogStore).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Identifier of a [`Category`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::From,
    derive_more::Into,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct CategoryId(u64);

/// Identifier of an [`Item`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::From,
    derive_more::Into,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct ItemId(u64);

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Category id
    pub id: CategoryId,
    /// Unique name of the category
    pub name: String,
}

/// A catalog item, together with the name of the category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Item id
    pub id: ItemId,
    /// Name of the item, unique within its category
    pub name: String,
    /// Free form description, may be empty
    pub description: String,
    /// Id of the owning category
    pub category_id: CategoryId,
    /// Name of the owning category
    pub category: String,
    /// When the item was created
    pub created_at: SystemTime,
}

impl Item {
    /// Creation time formatted as RFC 3339 with second precision.
    pub fn creation_date(&self) -> String {
        humantime::format_rfc3339_seconds(self.created_at).to_string()
    }
}

/// The user supplied fields of an item, used for creating and updating items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    /// Item name
    pub name: String,
    /// Item description
    pub description: String,
    /// Name of the category the item should be filed under
    pub category: String,
}

/// A category with all of its items, as exported by the catalog endpoints.
#[derive(Debug, Clone)]
pub struct CategoryWithItems {
    /// The category
    pub category: Category,
    /// Its items, ordered by name
    pub items: Vec<Item>,
}

pub(crate) fn to_micros(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros()
        .try_into()
        .unwrap_or(u64::MAX)
}

pub(crate) fn from_micros(micros: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_micros(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micros_roundtrip_keeps_precision() {
        let time = UNIX_EPOCH + Duration::from_micros(1_700_000_000_123_456);
        assert_eq!(from_micros(to_micros(time)), time);
    }

    #[test]
    fn creation_date_is_rfc3339() {
        let item = Item {
            id: 1.into(),
            name: "Ball".to_string(),
            description: String::new(),
            category_id: 1.into(),
            category: "Soccer".to_string(),
            created_at: UNIX_EPOCH + Duration::from_secs(86_400),
        };
        assert_eq!(item.creation_date(), "1970-01-02T00:00:00Z");
    }
}
