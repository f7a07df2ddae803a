pub mod auth_service;
pub mod poll_service;
