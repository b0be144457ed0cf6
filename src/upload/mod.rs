pub mod outcome;
pub mod progress;
pub mod transport;
pub mod uploader;
