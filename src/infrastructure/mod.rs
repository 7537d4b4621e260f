pub mod observability;
pub mod table_csv;

pub use table_csv::{read_table, write_table};
