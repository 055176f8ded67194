use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "furnish")]
#[command(author, version, about = "Chat with the furniture inventory assistant", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a single message and print the reply
    Chat {
        message: String,

        /// Conversation thread to continue (a new one is created if omitted)
        #[arg(short = 't', long)]
        thread: Option<String>,
    },

    /// Start an interactive chat session
    Interactive {
        #[arg(short = 't', long)]
        thread: Option<String>,
    },

    /// Print the saved transcript of a thread
    History { thread: String },

    /// Manage saved conversation threads
    Threads {
        #[command(subcommand)]
        command: ThreadsCommand,
    },

    /// Inspect or load the inventory database
    Inventory {
        #[command(subcommand)]
        command: InventoryCommand,
    },
}

#[derive(Subcommand)]
pub enum ThreadsCommand {
    /// List every saved thread id
    List,

    /// Delete a thread's checkpoint
    Delete { thread: String },
}

#[derive(Subcommand)]
pub enum InventoryCommand {
    /// Number of items in the inventory
    Count,

    /// Show a few items
    Sample {
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Import a JSON array of items with precomputed embeddings
    Import { file: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_with_thread() {
        let cli = Cli::try_parse_from(["furnish", "chat", "any desks?", "--thread", "t-1"]).unwrap();
        match cli.command {
            Commands::Chat { message, thread } => {
                assert_eq!(message, "any desks?");
                assert_eq!(thread.as_deref(), Some("t-1"));
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn test_parse_inventory_sample_default_limit() {
        let cli = Cli::try_parse_from(["furnish", "inventory", "sample"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Inventory {
                command: InventoryCommand::Sample { limit: 5 }
            }
        ));
    }
}
