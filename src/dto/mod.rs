pub mod backend_dto;
pub mod session_dto;
