pub mod records;
pub mod tables;
