pub mod batch_service;
pub mod save_service;
