pub mod catalog;
pub mod config;
pub mod init;
pub mod play;
