pub mod activity_log_repository;
#[cfg(test)]
pub mod mock_db;
pub mod postgres_activity_log_repository;
pub mod postgres_system_status_repository;
pub mod postgres_ticket_repository;
pub mod postgres_user_repository;
pub mod system_status_repository;
pub mod ticket_repository;
pub mod user_repository;
