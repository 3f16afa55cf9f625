pub mod booking;
pub mod error;
pub mod hold;
pub mod ports;
pub mod repository;
pub mod route;
pub mod session;

pub use error::{Error, Result};
