pub mod field;
pub mod field_value;
pub mod row;
pub mod session;
pub mod sheet;
pub mod user;
