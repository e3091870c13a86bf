//! Persistent catalog store.

use std::{path::Path, sync::Arc, time::SystemTime};

use anyhow::Context;
use redb::{backends::InMemoryBackend, Database, ReadableTable};
use tracing::{debug, info};

use crate::model::{
    from_micros, to_micros, Category, CategoryId, CategoryWithItems, Item, ItemDraft, ItemId,
};

use self::tables::{
    ItemValue, CATEGORIES_TABLE, CATEGORY_NAMES_TABLE, ITEMS_BY_CATEGORY_TABLE,
    ITEMS_BY_CREATION_TABLE, ITEMS_TABLE,
};

mod tables;

/// Errors returned by the [`CatalogStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The named category does not exist.
    #[error("the category '{0}' does not exist")]
    UnknownCategory(String),
    /// The category already holds an item with this name.
    #[error("an item named '{name}' already exists in the category '{category}'")]
    DuplicateItem {
        /// Category name
        category: String,
        /// Item name
        name: String,
    },
    /// No item with this id.
    #[error("the item {0} does not exist")]
    ItemNotFound(ItemId),
    /// The database failed.
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),
}

macro_rules! storage_error_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for StoreError {
                fn from(value: $ty) -> Self {
                    Self::Storage(value.into())
                }
            }
        )*
    };
}

storage_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError
);

/// Result type of the store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store for categories and items, backed by a [`redb`] database.
///
/// Cloning is cheap, all clones share the same database.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    db: Arc<Database>,
}

impl CatalogStore {
    /// Open (or create) a database file at `path`.
    pub fn persistent(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        info!("loading catalog database from {}", path.to_string_lossy());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create database directory at {}",
                    parent.to_string_lossy()
                )
            })?;
        }
        let db = Database::builder()
            .create(path)
            .context("failed to open catalog database")?;
        Ok(Self::open(db)?)
    }

    /// Create a store that lives in memory only.
    pub fn in_memory() -> anyhow::Result<Self> {
        info!("using in-memory catalog database");
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Ok(Self::open(db)?)
    }

    fn open(db: Database) -> StoreResult<Self> {
        let write_tx = db.begin_write()?;
        {
            let _table = write_tx.open_table(CATEGORIES_TABLE)?;
            let _table = write_tx.open_table(CATEGORY_NAMES_TABLE)?;
            let _table = write_tx.open_table(ITEMS_TABLE)?;
            let _table = write_tx.open_table(ITEMS_BY_CATEGORY_TABLE)?;
            let _table = write_tx.open_table(ITEMS_BY_CREATION_TABLE)?;
        }
        write_tx.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Insert all categories from `names` that do not exist yet.
    ///
    /// Names are trimmed, empty names are skipped. Returns the number of inserted categories.
    pub fn ensure_categories<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> StoreResult<usize> {
        let tx = self.db.begin_write()?;
        let mut inserted = 0;
        {
            let mut categories = tx.open_table(CATEGORIES_TABLE)?;
            let mut by_name = tx.open_table(CATEGORY_NAMES_TABLE)?;
            for name in names.into_iter().map(str::trim) {
                if name.is_empty() || by_name.get(name)?.is_some() {
                    continue;
                }
                let id = next_id(&categories)?;
                categories.insert(id, name)?;
                by_name.insert(name, id)?;
                debug!(id, name, "inserted category");
                inserted += 1;
            }
        }
        tx.commit()?;
        if inserted > 0 {
            info!("seeded {inserted} categories");
        }
        Ok(inserted)
    }

    /// All categories, ordered by id.
    pub fn categories(&self) -> StoreResult<Vec<Category>> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(CATEGORIES_TABLE)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (id, name) = entry?;
            out.push(Category {
                id: id.value().into(),
                name: name.value().to_string(),
            });
        }
        Ok(out)
    }

    /// Look up a category by its name.
    pub fn category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(CATEGORY_NAMES_TABLE)?;
        let category = table.get(name)?.map(|id| Category {
            id: id.value().into(),
            name: name.to_string(),
        });
        Ok(category)
    }

    /// All items of a category, ordered by name.
    pub fn items_in_category(&self, category: CategoryId) -> StoreResult<Vec<Item>> {
        let tx = self.db.begin_read()?;
        let categories = tx.open_table(CATEGORIES_TABLE)?;
        let items = tx.open_table(ITEMS_TABLE)?;
        let by_category = tx.open_table(ITEMS_BY_CATEGORY_TABLE)?;
        let category = u64::from(category);
        let mut out = Vec::new();
        for entry in by_category.range((category, "")..(category + 1, ""))? {
            let (_key, id) = entry?;
            if let Some(item) = load_item(&items, &categories, id.value())? {
                out.push(item);
            }
        }
        Ok(out)
    }

    /// The most recently created items, newest first.
    pub fn latest_items(&self, limit: usize) -> StoreResult<Vec<Item>> {
        let tx = self.db.begin_read()?;
        let categories = tx.open_table(CATEGORIES_TABLE)?;
        let items = tx.open_table(ITEMS_TABLE)?;
        let by_creation = tx.open_table(ITEMS_BY_CREATION_TABLE)?;
        let mut out = Vec::with_capacity(limit);
        for entry in by_creation.iter()?.rev().take(limit) {
            let (key, _) = entry?;
            let (_created, id) = key.value();
            if let Some(item) = load_item(&items, &categories, id)? {
                out.push(item);
            }
        }
        Ok(out)
    }

    /// Get an item by id.
    pub fn item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let tx = self.db.begin_read()?;
        let categories = tx.open_table(CATEGORIES_TABLE)?;
        let items = tx.open_table(ITEMS_TABLE)?;
        load_item(&items, &categories, id.into())
    }

    /// Get an item by its category and name.
    pub fn item_by_name(&self, category: CategoryId, name: &str) -> StoreResult<Option<Item>> {
        let tx = self.db.begin_read()?;
        let categories = tx.open_table(CATEGORIES_TABLE)?;
        let items = tx.open_table(ITEMS_TABLE)?;
        let by_category = tx.open_table(ITEMS_BY_CATEGORY_TABLE)?;
        let Some(id) = by_category.get((u64::from(category), name))? else {
            return Ok(None);
        };
        load_item(&items, &categories, id.value())
    }

    /// Create a new item, stamped with the current time.
    pub fn create_item(&self, draft: ItemDraft) -> StoreResult<Item> {
        self.create_item_at(draft, SystemTime::now())
    }

    pub(crate) fn create_item_at(&self, draft: ItemDraft, created_at: SystemTime) -> StoreResult<Item> {
        let created = to_micros(created_at);
        let tx = self.db.begin_write()?;
        let item = {
            let category_id = category_id_by_name(&tx, &draft.category)?;
            let mut by_category = tx.open_table(ITEMS_BY_CATEGORY_TABLE)?;
            if by_category
                .get((category_id, draft.name.as_str()))?
                .is_some()
            {
                return Err(StoreError::DuplicateItem {
                    category: draft.category,
                    name: draft.name,
                });
            }
            let mut items = tx.open_table(ITEMS_TABLE)?;
            let mut by_creation = tx.open_table(ITEMS_BY_CREATION_TABLE)?;
            let id = next_id(&items)?;
            items.insert(
                id,
                (
                    category_id,
                    created,
                    draft.name.as_str(),
                    draft.description.as_str(),
                ),
            )?;
            by_category.insert((category_id, draft.name.as_str()), id)?;
            by_creation.insert((created, id), ())?;
            Item {
                id: id.into(),
                name: draft.name,
                description: draft.description,
                category_id: category_id.into(),
                category: draft.category,
                created_at: from_micros(created),
            }
        };
        tx.commit()?;
        debug!(id = %item.id, name = %item.name, "created item");
        Ok(item)
    }

    /// Replace name, description and category of an existing item.
    ///
    /// The creation time is kept.
    pub fn update_item(&self, id: ItemId, draft: ItemDraft) -> StoreResult<Item> {
        let key = u64::from(id);
        let tx = self.db.begin_write()?;
        let item = {
            let category_id = category_id_by_name(&tx, &draft.category)?;
            let mut items = tx.open_table(ITEMS_TABLE)?;
            let mut by_category = tx.open_table(ITEMS_BY_CATEGORY_TABLE)?;
            let Some((old_category, created, old_name)) = items
                .get(key)?
                .map(|row| {
                    let (category, created, name, _) = row.value();
                    (category, created, name.to_string())
                })
            else {
                return Err(StoreError::ItemNotFound(id));
            };
            if (old_category, old_name.as_str()) != (category_id, draft.name.as_str()) {
                if by_category
                    .get((category_id, draft.name.as_str()))?
                    .is_some()
                {
                    return Err(StoreError::DuplicateItem {
                        category: draft.category,
                        name: draft.name,
                    });
                }
                by_category.remove((old_category, old_name.as_str()))?;
                by_category.insert((category_id, draft.name.as_str()), key)?;
            }
            items.insert(
                key,
                (
                    category_id,
                    created,
                    draft.name.as_str(),
                    draft.description.as_str(),
                ),
            )?;
            Item {
                id,
                name: draft.name,
                description: draft.description,
                category_id: category_id.into(),
                category: draft.category,
                created_at: from_micros(created),
            }
        };
        tx.commit()?;
        debug!(%id, name = %item.name, "updated item");
        Ok(item)
    }

    /// Delete an item, returning what was removed.
    pub fn delete_item(&self, id: ItemId) -> StoreResult<Item> {
        let key = u64::from(id);
        let tx = self.db.begin_write()?;
        let item = {
            let categories = tx.open_table(CATEGORIES_TABLE)?;
            let mut items = tx.open_table(ITEMS_TABLE)?;
            let Some(item) = load_item(&items, &categories, key)? else {
                return Err(StoreError::ItemNotFound(id));
            };
            let mut by_category = tx.open_table(ITEMS_BY_CATEGORY_TABLE)?;
            let mut by_creation = tx.open_table(ITEMS_BY_CREATION_TABLE)?;
            items.remove(key)?;
            by_category.remove((u64::from(item.category_id), item.name.as_str()))?;
            by_creation.remove((to_micros(item.created_at), key))?;
            item
        };
        tx.commit()?;
        debug!(%id, name = %item.name, "deleted item");
        Ok(item)
    }

    /// Every category together with its items.
    pub fn catalog(&self) -> StoreResult<Vec<CategoryWithItems>> {
        self.categories()?
            .into_iter()
            .map(|category| {
                let items = self.items_in_category(category.id)?;
                Ok(CategoryWithItems { category, items })
            })
            .collect()
    }
}

fn category_id_by_name(tx: &redb::WriteTransaction, name: &str) -> StoreResult<u64> {
    let by_name = tx.open_table(CATEGORY_NAMES_TABLE)?;
    let id = by_name.get(name)?.map(|id| id.value());
    id.ok_or_else(|| StoreError::UnknownCategory(name.to_string()))
}

fn next_id<V: redb::Value + 'static>(table: &impl ReadableTable<u64, V>) -> StoreResult<u64> {
    let last = table.last()?.map(|(id, _)| id.value()).unwrap_or(0);
    Ok(last + 1)
}

fn load_item(
    items: &impl ReadableTable<u64, ItemValue<'static>>,
    categories: &impl ReadableTable<u64, &'static str>,
    id: u64,
) -> StoreResult<Option<Item>> {
    let Some(row) = items.get(id)? else {
        return Ok(None);
    };
    let (category_id, created, name, description) = row.value();
    let category = categories
        .get(category_id)?
        .map(|name| name.value().to_string())
        .unwrap_or_default();
    Ok(Some(Item {
        id: id.into(),
        name: name.to_string(),
        description: description.to_string(),
        category_id: category_id.into(),
        category,
        created_at: from_micros(created),
    }))
}
