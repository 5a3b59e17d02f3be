//! Table and record routes. Table names in the path are resolved against
//! the live catalog by the service; nothing here trusts them.

use crate::handlers::{records, tables};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn table_routes(state: AppState) -> Router {
    Router::new()
        .route("/tables", get(tables::list_tables))
        .route("/tables/:name", get(tables::get_table))
        .route(
            "/tables/:name/records",
            get(records::list).post(records::create),
        )
        .route(
            "/tables/:name/records/:id",
            get(records::get).put(records::update).delete(records::delete),
        )
        .route("/connection-test", get(tables::connection_test))
        .with_state(state)
}
