pub mod all;
pub mod dispatch;
pub mod entry;
pub mod library;
