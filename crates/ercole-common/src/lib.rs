pub mod alert;
pub mod id;
pub mod types;
