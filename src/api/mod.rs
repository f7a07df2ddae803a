pub mod auth;
pub mod health;
pub mod polls;
pub mod swagger;
