mod commands;

pub use commands::{Cli, Commands, InventoryCommand, ThreadsCommand};
