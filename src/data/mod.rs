pub mod persistence;
pub mod store;
