pub mod history;
pub mod schema;
