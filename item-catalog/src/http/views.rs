//! Template contexts and link helpers.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::{Category, Item, ItemDraft, ItemId};

static URL_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://catalog.invalid/").expect("valid base url"));

/// Build an absolute path with a trailing slash from unescaped segments.
pub fn path(segments: &[&str]) -> String {
    let mut url = URL_BASE.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.clear().extend(segments).push("");
    }
    url.path().to_string()
}

pub fn category_url(category: &str) -> String {
    path(&["catalog", category, "items"])
}

pub fn item_url(category: &str, item: &str) -> String {
    path(&["catalog", category, item])
}

pub fn edit_url(id: ItemId) -> String {
    format!("/item/edit/{id}/")
}

pub fn delete_url(id: ItemId) -> String {
    format!("/item/delete/{id}/")
}

/// Context shared by all pages.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub title: String,
    pub categories: Vec<CategoryLink>,
    pub flashes: Vec<String>,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Serialize)]
pub struct CategoryLink {
    pub name: String,
    pub url: String,
}

impl From<&Category> for CategoryLink {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            url: category_url(&category.name),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub creation_date: String,
    pub url: String,
    pub category_url: String,
    pub edit_url: String,
    pub delete_url: String,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            creation_date: item.creation_date(),
            url: item_url(&item.category, &item.name),
            category_url: category_url(&item.category),
            edit_url: edit_url(item.id),
            delete_url: delete_url(item.id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LatestItems {
    pub items: Vec<ItemView>,
}

#[derive(Debug, Serialize)]
pub struct CategoryItems {
    pub category: CategoryLink,
    pub number_of_items: usize,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Serialize)]
pub struct ShowItem {
    pub item: ItemView,
}

/// Fields of the create and edit forms.
///
/// Missing fields deserialize as empty strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemForm {
    pub name: String,
    pub description: String,
    pub category: String,
}

impl ItemForm {
    /// Trim all fields and drop control characters other than tabs and line breaks.
    pub fn trimmed(self) -> Self {
        Self {
            name: clean(&self.name),
            description: clean(&self.description),
            category: clean(&self.category),
        }
    }

    /// Check the required fields, returning a message for the user on failure.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.is_empty() {
            return Err("Please enter a name for the item.");
        }
        // dot segments are removed from paths, so such items could not be linked
        if matches!(self.name.as_str(), "." | "..") {
            return Err("The names '.' and '..' are reserved, please choose another name.");
        }
        if self.category.is_empty() {
            return Err("Please choose a category for the item.");
        }
        Ok(())
    }

    pub fn into_draft(self) -> ItemDraft {
        ItemDraft {
            name: self.name,
            description: self.description,
            category: self.category,
        }
    }
}

fn clean(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect::<String>()
        .trim()
        .to_string()
}

impl From<&Item> for ItemForm {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Choice {
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct FormPage {
    pub form: ItemForm,
    pub choices: Vec<Choice>,
    pub error: Option<String>,
    pub action: String,
    pub submit: &'static str,
    pub cancel_url: String,
    pub item: Option<ItemView>,
}

impl FormPage {
    pub fn new(form: ItemForm, categories: &[Category], action: String) -> Self {
        let choices = categories
            .iter()
            .map(|category| Choice {
                name: category.name.clone(),
                selected: category.name == form.category,
            })
            .collect();
        Self {
            form,
            choices,
            error: None,
            action,
            submit: "Create",
            cancel_url: "/".to_string(),
            item: None,
        }
    }

    pub fn editing(mut self, item: &Item) -> Self {
        self.submit = "Save";
        self.cancel_url = item_url(&item.category, &item.name);
        self.item = Some(item.into());
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub nonce: String,
}

#[derive(Debug, Serialize)]
pub struct DeletePage {
    pub item: ItemView,
    pub nonce: String,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_escape_segments() {
        assert_eq!(category_url("Soccer"), "/catalog/Soccer/items/");
        assert_eq!(
            item_url("Rock Climbing", "50/50 rope?"),
            "/catalog/Rock%20Climbing/50%2F50%20rope%3F/"
        );
        assert_eq!(edit_url(3.into()), "/item/edit/3/");
        assert_eq!(delete_url(3.into()), "/item/delete/3/");
    }

    #[test]
    fn form_validation() {
        let form = ItemForm {
            name: "  Ball ".into(),
            description: " round\n".into(),
            category: "   ".into(),
        }
        .trimmed();
        assert_eq!(form.name, "Ball");
        assert_eq!(form.description, "round");
        assert!(form.validate().is_err());

        let form = ItemForm {
            name: String::new(),
            category: "Soccer".into(),
            ..Default::default()
        };
        assert_eq!(form.validate(), Err("Please enter a name for the item."));

        for name in [".", ".."] {
            let form = ItemForm {
                name: name.into(),
                category: "Soccer".into(),
                ..Default::default()
            };
            assert!(form.validate().is_err(), "{name}");
        }
        let form = ItemForm {
            name: "...".into(),
            category: "Soccer".into(),
            ..Default::default()
        };
        assert!(form.validate().is_ok());
        assert_eq!(item_url("Soccer", "..."), "/catalog/Soccer/.../");
    }

    #[test]
    fn control_characters_are_dropped() {
        let form = ItemForm {
            name: "\u{1}ctl\u{7}x\u{0} ".into(),
            description: "line one\r\n\tline two\u{1b}".into(),
            category: "Soccer\u{8}".into(),
        }
        .trimmed();
        assert_eq!(form.name, "ctlx");
        assert_eq!(form.description, "line one\r\n\tline two");
        assert_eq!(form.category, "Soccer");
    }
}
