pub mod poll;
pub mod user;

pub use poll::*;
pub use user::*;
