//! Machine readable exports of the whole catalog.

use axum::{extract::State, response::IntoResponse, Json};
use http::header::CONTENT_TYPE;
use serde::Serialize;

use super::error::AppResult;
use crate::{
    model::{CategoryId, CategoryWithItems, Item, ItemId},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct CatalogJson {
    #[serde(rename = "Categories")]
    pub categories: Vec<CategoryJson>,
}

#[derive(Debug, Serialize)]
pub struct CategoryJson {
    pub id: CategoryId,
    pub name: String,
    pub items: Vec<ItemJson>,
}

#[derive(Debug, Serialize)]
pub struct ItemJson {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
    pub creation_date: String,
}

impl From<&Item> for ItemJson {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            category_id: item.category_id,
            creation_date: item.creation_date(),
        }
    }
}

impl From<CategoryWithItems> for CategoryJson {
    fn from(entry: CategoryWithItems) -> Self {
        Self {
            id: entry.category.id,
            name: entry.category.name,
            items: entry.items.iter().map(ItemJson::from).collect(),
        }
    }
}

/// GET handler returning the catalog as JSON
pub async fn catalog_json(State(state): State<AppState>) -> AppResult<Json<CatalogJson>> {
    let catalog = state.store.catalog()?;
    Ok(Json(CatalogJson {
        categories: catalog.into_iter().map(CategoryJson::from).collect(),
    }))
}

/// GET handler returning the catalog as XML document
pub async fn catalog_xml(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let catalog = state.store.catalog()?;
    Ok(([(CONTENT_TYPE, "text/xml")], catalog_to_xml(&catalog)))
}

fn catalog_to_xml(catalog: &[CategoryWithItems]) -> String {
    let mut lines = vec![
        r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
        "<Categories>".to_string(),
    ];
    for entry in catalog {
        lines.push("  <Category>".to_string());
        lines.push(element(4, "id", &entry.category.id.to_string()));
        lines.push(element(4, "name", &entry.category.name));
        lines.push("    <Items>".to_string());
        for item in &entry.items {
            lines.push("      <Item>".to_string());
            lines.push(element(8, "id", &item.id.to_string()));
            lines.push(element(8, "name", &item.name));
            lines.push(element(8, "description", &item.description));
            lines.push(element(8, "creation_date", &item.creation_date()));
            lines.push("      </Item>".to_string());
        }
        lines.push("    </Items>".to_string());
        lines.push("  </Category>".to_string());
    }
    lines.push("</Categories>".to_string());
    lines.join("\n")
}

fn element(indent: usize, name: &str, text: &str) -> String {
    format!("{:indent$}<{name}>{}</{name}>", "", escape_xml(text))
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            // not allowed anywhere in an XML 1.0 document
            c if c < ' ' || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;
    use crate::model::Category;

    fn catalog() -> Vec<CategoryWithItems> {
        vec![
            CategoryWithItems {
                category: Category {
                    id: 1.into(),
                    name: "Rock & Roll".to_string(),
                },
                items: vec![Item {
                    id: 7.into(),
                    name: "<Guitar>".to_string(),
                    description: "says \"hi\"\u{1}".to_string(),
                    category_id: 1.into(),
                    category: "Rock & Roll".to_string(),
                    created_at: UNIX_EPOCH + Duration::from_secs(60),
                }],
            },
            CategoryWithItems {
                category: Category {
                    id: 2.into(),
                    name: "Empty".to_string(),
                },
                items: vec![],
            },
        ]
    }

    #[test]
    fn xml_document() {
        let xml = catalog_to_xml(&catalog());
        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<Categories>
  <Category>
    <id>1</id>
    <name>Rock &amp; Roll</name>
    <Items>
      <Item>
        <id>7</id>
        <name>&lt;Guitar&gt;</name>
        <description>says &quot;hi&quot;</description>
        <creation_date>1970-01-01T00:01:00Z</creation_date>
      </Item>
    </Items>
  </Category>
  <Category>
    <id>2</id>
    <name>Empty</name>
    <Items>
    </Items>
  </Category>
</Categories>"#;
        assert_eq!(xml, expected);
        assert!(!xml.contains('\u{1}'));
    }

    #[test]
    fn xml_escaping_drops_forbidden_characters() {
        assert_eq!(escape_xml("a\u{0}b\u{1f}c\u{FFFF}"), "abc");
        assert_eq!(escape_xml("tab\tline\r\n"), "tab\tline\r\n");
        assert_eq!(escape_xml("caf\u{e9} & co"), "caf\u{e9} &amp; co");
    }

    #[test]
    fn json_shape() -> anyhow::Result<()> {
        let json = CatalogJson {
            categories: catalog().into_iter().map(CategoryJson::from).collect(),
        };
        let value = serde_json::to_value(&json)?;
        assert_eq!(
            value["Categories"][0]["items"][0],
            serde_json::json!({
                "id": 7,
                "name": "<Guitar>",
                "description": "says \"hi\"\u{1}",
                "category_id": 1,
                "creation_date": "1970-01-01T00:01:00Z",
            })
        );
        assert_eq!(value["Categories"][1]["name"], "Empty");
        assert_eq!(value["Categories"][1]["items"], serde_json::json!([]));
        Ok(())
    }
}
