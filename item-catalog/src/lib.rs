//! A small item catalog web application.
//!
//! Categories hold items which can be browsed, created, edited and deleted through HTML forms.
//! The whole catalog is also exported as JSON and XML.

#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod http;
pub mod metrics;
pub mod model;
pub mod server;
pub mod session;
pub mod state;
pub mod store;
pub mod templates;

// Re-export to be able to construct your own catalog server
pub use store::CatalogStore;
