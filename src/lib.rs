//! Tabula: schema-agnostic CRUD API over PostgreSQL. Tables and columns are
//! discovered from the catalog at request time; one set of routes serves
//! every table.

pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use descriptor::{ColumnDescriptor, ColumnKind, TableDescriptor};
pub use error::AppError;
pub use response::RecordPage;
pub use routes::{common_routes, table_routes};
pub use service::TableService;
pub use sql::{QuerySpec, SortOrder};
pub use state::AppState;
pub use store::ensure_meta_table;
