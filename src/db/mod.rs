pub mod lead_store;
pub mod message_repository;
pub mod project_repository;
