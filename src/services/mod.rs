pub mod backend_service;
pub mod loader_service;
pub mod notification_service;
pub mod result_service;
pub mod scoring_service;
pub mod session_service;
