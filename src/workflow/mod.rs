pub mod cycle;
pub mod error;
pub mod health;
pub mod profile;
pub mod session;
