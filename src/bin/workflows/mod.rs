mod cli;
mod commands;
mod layout;

pub(crate) use cli::{Cli, Commands};
pub(crate) use commands::run;
pub(crate) use layout::locate_project_dir;
