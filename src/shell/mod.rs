pub mod reveal;
pub mod safety;
