pub mod activity_log;
pub mod system_status;
pub mod ticket;
pub mod ticket_response;
pub mod user;
