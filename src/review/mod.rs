pub mod flatten;
pub mod form;
