use crate::core::Message;
use crate::inventory::InventoryItem;
use colored::*;
use std::io::Write;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
    let _ = std::io::stdout().flush();
}

pub fn print_reply(text: &str) {
    println!("{} {}", "Assistant:".green().bold(), text);
}

pub fn print_message(message: &Message) {
    match message {
        Message::User { content } => println!("{} {}", "You:".yellow().bold(), content),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            for call in tool_calls {
                println!(
                    "{} {}({})",
                    "  tool call:".dimmed(),
                    call.name.magenta(),
                    call.arguments
                );
            }
            if !content.is_empty() {
                print_reply(content);
            }
        }
        Message::Tool { name, content, .. } => {
            println!("{} {}", format!("  {} result:", name).dimmed(), truncate(content, 160).dimmed());
        }
    }
}

pub fn print_item(item: &InventoryItem) {
    let categories = if item.categories.is_empty() {
        String::new()
    } else {
        format!(" [{}]", item.categories.join(", "))
    };
    println!(
        "{} {}{}",
        item.item_id.bright_black(),
        item.item_name.bold(),
        categories.cyan()
    );
    if !item.item_description.is_empty() {
        println!("    {}", truncate(&item.item_description, 120));
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}
