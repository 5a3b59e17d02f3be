//! Shared application state for all routes.

use crate::service::TableService;

#[derive(Clone)]
pub struct AppState {
    pub service: TableService,
}
