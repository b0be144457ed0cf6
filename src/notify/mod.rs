pub mod console;
pub mod notification;
