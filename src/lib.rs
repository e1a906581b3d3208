pub mod cli;
pub mod editor;
pub mod io;
pub mod model;
pub mod tui;
pub mod util;
