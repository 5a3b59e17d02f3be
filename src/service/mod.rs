mod crud;

pub use crud::{page_count, TableService};
