mod common;
mod tables;

pub use common::common_routes;
pub use tables::table_routes;
