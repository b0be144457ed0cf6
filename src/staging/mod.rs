pub mod staged_file;
pub mod stager;
