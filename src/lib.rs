pub mod cli;
pub mod clients;
pub mod notify;
pub mod review;
pub mod staging;
pub mod submit;
pub mod trace;
pub mod upload;
pub mod workflow;
