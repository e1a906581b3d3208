pub mod config_io;
pub mod directory;
pub mod log;
pub mod watcher;
