//! HTML templates, compiled into the binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::response::Html;
use handlebars::Handlebars;
use serde::Serialize;

const PARTIALS: &[(&str, &str)] = &[
    ("header", include_str!("../templates/partials/header.hbs")),
    ("footer", include_str!("../templates/partials/footer.hbs")),
    (
        "item_form",
        include_str!("../templates/partials/item_form.hbs"),
    ),
];

const PAGES: &[(&str, &str)] = &[
    ("latest_items", include_str!("../templates/latest_items.hbs")),
    ("list_items", include_str!("../templates/list_items.hbs")),
    ("show_item", include_str!("../templates/show_item.hbs")),
    ("create_item", include_str!("../templates/create_item.hbs")),
    ("edit_item", include_str!("../templates/edit_item.hbs")),
    ("delete_item", include_str!("../templates/delete_item.hbs")),
];

/// The registered page templates.
#[derive(Debug, Clone)]
pub struct Templates {
    registry: Arc<Handlebars<'static>>,
}

impl Templates {
    /// Parse and register all templates.
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        for (name, source) in PARTIALS {
            registry
                .register_partial(name, *source)
                .with_context(|| format!("invalid partial {name}"))?;
        }
        for (name, source) in PAGES {
            registry
                .register_template_string(name, *source)
                .with_context(|| format!("invalid template {name}"))?;
        }
        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    /// Render the page `name` with `data` as context.
    pub fn render(&self, name: &str, data: &impl Serialize) -> Result<Html<String>> {
        let html = self
            .registry
            .render(name, data)
            .with_context(|| format!("failed to render {name}"))?;
        Ok(Html(html))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn all_templates_parse() -> Result<()> {
        let templates = Templates::new()?;
        for (name, _) in PAGES {
            assert!(templates.registry.has_template(name), "{name} missing");
        }
        Ok(())
    }

    #[test]
    fn output_is_escaped() -> Result<()> {
        let templates = Templates::new()?;
        let Html(html) = templates.render(
            "list_items",
            &json!({
                "title": "<b>",
                "categories": [],
                "flashes": ["<script>alert(1)</script>"],
                "category": { "name": "Soccer" },
                "number_of_items": 0,
                "items": [],
            }),
        )?;
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Soccer (0 items)"));
        Ok(())
    }
}
