pub mod catalog;
pub mod config;
pub mod constants;
pub mod dynamics;
pub mod playback;

#[cfg(feature = "player")]
pub mod media;
