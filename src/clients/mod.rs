pub mod client_model;
pub mod directory;
