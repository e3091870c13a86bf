//! HTML pages: browsing the catalog and the item forms.

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use http::StatusCode;
use serde::Serialize;
use tracing::{debug, info};

use super::{
    error::{AppError, AppResult},
    views::{
        category_url, edit_url, CategoryItems, CategoryLink, DeleteForm, DeletePage,
        FormPage, ItemForm, ItemView, LatestItems, Page, ShowItem,
    },
};
use crate::{
    model::{Item, ItemId},
    session::Session,
    state::AppState,
    store::StoreError,
};

const CREATE_ACTION: &str = "/item/new/";
const NONCE_MISMATCH: &str = "The request could not be verified. Please confirm the deletion again.";

/// Render `template` inside the common page frame.
fn render<T: Serialize>(
    state: &AppState,
    session: &Session,
    template: &str,
    title: impl Into<String>,
    body: T,
) -> AppResult<Html<String>> {
    let categories = state.store.categories()?;
    let page = Page {
        title: title.into(),
        categories: categories.iter().map(CategoryLink::from).collect(),
        flashes: session.take_flashes(),
        body,
    };
    Ok(state.templates.render(template, &page)?)
}

fn find_item(state: &AppState, id: ItemId) -> AppResult<Item> {
    state
        .store
        .item(id)?
        .ok_or_else(|| AppError::not_found(format!("the item {id} does not exist")))
}

/// GET handler for the front page listing the most recent items
pub async fn latest_items(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> AppResult<Html<String>> {
    let items = state.store.latest_items(state.latest_items)?;
    let body = LatestItems {
        items: items.iter().map(ItemView::from).collect(),
    };
    render(&state, &session, "latest_items", "Latest items", body)
}

/// GET handler listing all items of a category
pub async fn list_items(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(category_name): Path<String>,
) -> AppResult<Html<String>> {
    let category = state
        .store
        .category_by_name(&category_name)?
        .ok_or_else(|| AppError::not_found(format!("no category named '{category_name}'")))?;
    let items = state.store.items_in_category(category.id)?;
    let body = CategoryItems {
        category: CategoryLink::from(&category),
        number_of_items: items.len(),
        items: items.iter().map(ItemView::from).collect(),
    };
    render(&state, &session, "list_items", category.name, body)
}

/// GET handler showing a single item
pub async fn show_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((category_name, item_name)): Path<(String, String)>,
) -> AppResult<Html<String>> {
    let category = state
        .store
        .category_by_name(&category_name)?
        .ok_or_else(|| AppError::not_found(format!("no category named '{category_name}'")))?;
    let item = state
        .store
        .item_by_name(category.id, &item_name)?
        .ok_or_else(|| {
            AppError::not_found(format!("no item named '{item_name}' in '{category_name}'"))
        })?;
    let body = ShowItem {
        item: ItemView::from(&item),
    };
    render(&state, &session, "show_item", item.name, body)
}

/// GET handler for the item creation form
pub async fn create_item_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> AppResult<Html<String>> {
    let categories = state.store.categories()?;
    let body = FormPage::new(ItemForm::default(), &categories, CREATE_ACTION.to_string());
    render(&state, &session, "create_item", "New item", body)
}

/// POST handler creating an item
pub async fn create_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<ItemForm>,
) -> AppResult<Response> {
    let form = form.trimmed();
    let rejected = |form: ItemForm, error: String| -> AppResult<Response> {
        state.metrics.form_rejections.inc();
        let categories = state.store.categories()?;
        let body = FormPage::new(form, &categories, CREATE_ACTION.to_string()).with_error(error);
        let html = render(&state, &session, "create_item", "New item", body)?;
        Ok((StatusCode::UNPROCESSABLE_ENTITY, html).into_response())
    };

    if let Err(message) = form.validate() {
        return rejected(form, message.to_string());
    }
    match state.store.create_item(form.clone().into_draft()) {
        Ok(item) => {
            info!(id = %item.id, name = %item.name, category = %item.category, "item created");
            state.metrics.items_created.inc();
            session.flash(format!("the item '{}' has been created", item.name));
            Ok(Redirect::to(&category_url(&item.category)).into_response())
        }
        Err(err @ (StoreError::UnknownCategory(_) | StoreError::DuplicateItem { .. })) => {
            debug!(%err, "rejected new item");
            rejected(form, err.to_string())
        }
        Err(err) => Err(err.into()),
    }
}

/// GET handler for the item edit form
pub async fn edit_item_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<ItemId>,
) -> AppResult<Html<String>> {
    let item = find_item(&state, id)?;
    let categories = state.store.categories()?;
    let body = FormPage::new(ItemForm::from(&item), &categories, edit_url(id)).editing(&item);
    render(&state, &session, "edit_item", format!("Edit {}", item.name), body)
}

/// POST handler updating an item
pub async fn edit_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<ItemId>,
    Form(form): Form<ItemForm>,
) -> AppResult<Response> {
    let item = find_item(&state, id)?;
    let form = form.trimmed();
    let rejected = |form: ItemForm, error: String| -> AppResult<Response> {
        state.metrics.form_rejections.inc();
        let categories = state.store.categories()?;
        let body = FormPage::new(form, &categories, edit_url(id))
            .editing(&item)
            .with_error(error);
        let title = format!("Edit {}", item.name);
        let html = render(&state, &session, "edit_item", title, body)?;
        Ok((StatusCode::UNPROCESSABLE_ENTITY, html).into_response())
    };

    if let Err(message) = form.validate() {
        return rejected(form, message.to_string());
    }
    match state.store.update_item(id, form.clone().into_draft()) {
        Ok(updated) => {
            info!(%id, name = %updated.name, category = %updated.category, "item updated");
            state.metrics.items_updated.inc();
            session.flash(format!("the item '{}' has been modified", updated.name));
            Ok(Redirect::to(&category_url(&updated.category)).into_response())
        }
        Err(err @ (StoreError::UnknownCategory(_) | StoreError::DuplicateItem { .. })) => {
            debug!(%err, "rejected item update");
            rejected(form, err.to_string())
        }
        Err(err) => Err(err.into()),
    }
}

/// GET handler asking to confirm a deletion
pub async fn delete_item_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<ItemId>,
) -> AppResult<Html<String>> {
    let item = find_item(&state, id)?;
    let body = DeletePage {
        item: ItemView::from(&item),
        nonce: session.create_nonce(),
        error: None,
    };
    render(&state, &session, "delete_item", format!("Delete {}", item.name), body)
}

/// POST handler deleting an item, guarded by the session nonce
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<ItemId>,
    Form(form): Form<DeleteForm>,
) -> AppResult<Response> {
    let item = find_item(&state, id)?;
    if !session.use_nonce(form.nonce.trim()) {
        debug!(%id, "nonce mismatch on delete");
        state.metrics.nonce_rejections.inc();
        let title = format!("Delete {}", item.name);
        let body = DeletePage {
            item: ItemView::from(&item),
            nonce: session.create_nonce(),
            error: Some(NONCE_MISMATCH.to_string()),
        };
        let html = render(&state, &session, "delete_item", title, body)?;
        return Ok((StatusCode::FORBIDDEN, html).into_response());
    }
    let removed = state.store.delete_item(id)?;
    info!(%id, name = %removed.name, "item deleted");
    state.metrics.items_deleted.inc();
    session.flash(format!("the item '{}' has been removed", removed.name));
    Ok(Redirect::to(&category_url(&removed.category)).into_response())
}
