pub mod submitter;
pub mod unflatten;
pub mod validate;
