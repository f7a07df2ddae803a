// Utility functions
pub mod error;
pub mod sanitize;
pub mod token;
pub mod validate;
