// Table Definitions

use redb::TableDefinition;

/// Table: Categories
/// Key:   `u64`  # CategoryId
/// Value: `&str` # Category name
pub const CATEGORIES_TABLE: TableDefinition<u64, &str> = TableDefinition::new("categories-1");

/// Table: Category names
/// Key:   `&str` # Category name
/// Value: `u64`  # CategoryId
pub const CATEGORY_NAMES_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("category-names-1");

/// Table: Items
/// Key:   `u64` # ItemId
/// Value: `(u64, u64, &str, &str)`
///      # (CategoryId, creation time in microseconds, name, description)
pub const ITEMS_TABLE: TableDefinition<u64, ItemValue> = TableDefinition::new("items-1");
pub type ItemValue<'a> = (u64, u64, &'a str, &'a str);

/// Table: Items by category
/// Key:   `(u64, &str)` # (CategoryId, item name)
/// Value: `u64`         # ItemId
pub const ITEMS_BY_CATEGORY_TABLE: TableDefinition<ItemsByCategoryKey, u64> =
    TableDefinition::new("items-by-category-1");
pub type ItemsByCategoryKey<'a> = (u64, &'a str);

/// Table: Items by creation time
/// Key:   `(u64, u64)` # (creation time in microseconds, ItemId)
/// Value: `()`
pub const ITEMS_BY_CREATION_TABLE: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("items-by-creation-1");
