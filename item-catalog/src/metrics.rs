//! Metrics support for the server

use iroh_metrics::{Counter, MetricsGroup};

/// Metrics for item-catalog
#[derive(Debug, Default, MetricsGroup)]
#[metrics(name = "item_catalog")]
pub struct Metrics {
    /// Number of HTTP requests
    pub http_requests: Counter,
    /// Number of HTTP requests answered with a 2xx or 3xx status code
    pub http_requests_success: Counter,
    /// Number of HTTP requests answered with a 4xx or 5xx status code
    pub http_requests_error: Counter,
    /// Total duration of all HTTP requests
    pub http_requests_duration_ms: Counter,
    /// Items created through the create form
    pub items_created: Counter,
    /// Items changed through the edit form
    pub items_updated: Counter,
    /// Items removed through the delete form
    pub items_deleted: Counter,
    /// Item forms that were sent back because of invalid input
    pub form_rejections: Counter,
    /// Delete requests whose nonce did not match the session
    pub nonce_rejections: Counter,
}
