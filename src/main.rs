use anyhow::Result;
use clap::Parser;
use furnish::cli::{Cli, Commands, InventoryCommand, ThreadsCommand};
use furnish::{utils, AgentError, InventoryAgent, Settings};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
        )
        .init();

    let cli = Cli::parse();

    // Only the conversational commands talk to the model endpoint
    let api_key = match cli.command {
        Commands::Chat { .. } | Commands::Interactive { .. } => Settings::api_key()?,
        _ => Settings::api_key().unwrap_or_default(),
    };
    let agent = InventoryAgent::build(settings, api_key).await?;

    match cli.command {
        Commands::Chat { message, thread } => handle_chat(&agent, message, thread).await,
        Commands::Interactive { thread } => handle_interactive(&agent, thread).await,
        Commands::History { thread } => handle_history(&agent, &thread).await,
        Commands::Threads { command } => handle_threads(&agent, command).await,
        Commands::Inventory { command } => handle_inventory(&agent, command).await,
    }
}

fn new_thread_id() -> String {
    Uuid::new_v4().to_string()
}

/// Log the detailed error, show the user only the generic message
fn report_turn_error(err: &AgentError) {
    tracing::error!("Turn failed ({}): {}", err.kind(), err);
    utils::print_error(err.user_message());
}

async fn handle_chat(agent: &InventoryAgent, message: String, thread: Option<String>) -> Result<()> {
    let thread_id = thread.unwrap_or_else(new_thread_id);
    utils::print_info(&format!("Thread: {}", thread_id));

    match agent.send(&thread_id, &message).await {
        Ok(outcome) => {
            println!();
            utils::print_reply(&outcome.reply);
            Ok(())
        }
        Err(err) => {
            report_turn_error(&err);
            std::process::exit(1);
        }
    }
}

async fn handle_interactive(agent: &InventoryAgent, thread: Option<String>) -> Result<()> {
    let thread_id = thread.unwrap_or_else(new_thread_id);

    utils::print_header("Furniture Inventory Assistant");
    utils::print_info(&format!("Thread: {}", thread_id));

    let history = agent.history(&thread_id).await?;
    if history.is_empty() {
        utils::print_success("New conversation started");
    } else {
        utils::print_success(&format!(
            "Resumed conversation with {} previous messages",
            history.len()
        ));
    }
    utils::print_info("Type /help for commands (Ctrl+C to exit)\n");

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        utils::print_prompt("You: ");
        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            println!();
            return Ok(());
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/help" => {
                utils::print_info("/history  show this thread's transcript");
                utils::print_info("/help     show this help");
                utils::print_info("/exit     leave the session\n");
                continue;
            }
            "/history" => {
                for message in agent.history(&thread_id).await?.messages() {
                    utils::print_message(message);
                }
                println!();
                continue;
            }
            "/exit" | "/quit" => return Ok(()),
            _ => {}
        }

        match agent.send(&thread_id, input).await {
            Ok(outcome) => {
                tracing::debug!("Turn finished in {} step(s)", outcome.steps);
                utils::print_reply(&outcome.reply);
                println!();
            }
            Err(err) => report_turn_error(&err),
        }
    }
}

async fn handle_history(agent: &InventoryAgent, thread_id: &str) -> Result<()> {
    let history = agent.history(thread_id).await?;
    if history.is_empty() {
        utils::print_info(&format!("No saved conversation for '{}'", thread_id));
        return Ok(());
    }

    utils::print_header(&format!("Thread {}", thread_id));
    for message in history.messages() {
        utils::print_message(message);
    }
    Ok(())
}

async fn handle_threads(agent: &InventoryAgent, command: ThreadsCommand) -> Result<()> {
    match command {
        ThreadsCommand::List => {
            let threads = agent.list_threads().await?;
            if threads.is_empty() {
                utils::print_info("No saved threads");
            }
            for thread in threads {
                println!("{}", thread);
            }
        }
        ThreadsCommand::Delete { thread } => {
            if agent.delete_thread(&thread).await? {
                utils::print_success(&format!("Deleted thread '{}'", thread));
            } else {
                utils::print_error(&format!("Thread '{}' not found", thread));
            }
        }
    }
    Ok(())
}

async fn handle_inventory(agent: &InventoryAgent, command: InventoryCommand) -> Result<()> {
    match command {
        InventoryCommand::Count => {
            println!("{}", agent.inventory_count().await?);
        }
        InventoryCommand::Sample { limit } => {
            let items = agent.inventory_sample(limit).await?;
            if items.is_empty() {
                utils::print_info("Inventory is empty");
            }
            for item in &items {
                utils::print_item(item);
            }
        }
        InventoryCommand::Import { file } => {
            let imported = agent.import_inventory(&file).await?;
            utils::print_success(&format!("Imported {} item(s)", imported));
        }
    }
    Ok(())
}
