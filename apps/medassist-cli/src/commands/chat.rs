//! Interactive chat command

use anyhow::Result;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input};
use indicatif::{ProgressBar, ProgressStyle};
use medassist_conversation::{render_reply, ChatError, ChatMessage, ChatSessionManager};
use std::time::Duration;

use crate::commands::history::{find_thread, print_thread_table};
use crate::context::Context;
use crate::output;

pub async fn run(ctx: &Context, initial_message: Option<String>) -> Result<()> {
    let chat = ctx.session.chat();

    println!(
        "{} chat in workspace {}",
        "Starting".green(),
        ctx.active_name()?.cyan()
    );
    println!("{}", "Type '/exit' to end the session, '/help' for commands.".dimmed());
    println!();
    print_messages(&chat.visible_messages());

    if let Some(msg) = initial_message {
        send_message(chat, &msg).await?;
    }

    loop {
        let input: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let (command, argument) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command.to_lowercase().as_str() {
            "exit" | "quit" | "/exit" | "/quit" => {
                println!("{}", "Goodbye!".green());
                break;
            }
            "/help" => print_help(),
            "/new" => {
                chat.new_chat();
                print_messages(&chat.visible_messages());
            }
            "/threads" => {
                let workspace = ctx.session.active_workspace()?;
                let threads = chat.threads_for_workspace(&workspace.id);
                if threads.is_empty() {
                    output::dimmed("No threads in this workspace yet.");
                } else {
                    print_thread_table(&threads);
                }
            }
            "/open" if argument.is_empty() => output::warning("Usage: /open <thread id>"),
            "/open" => match find_thread(chat, argument) {
                Ok(thread) => {
                    chat.select_thread(thread.id)?;
                    output::section(&thread.title);
                    print_messages(&chat.visible_messages());
                }
                Err(e) => output::warning(&e.to_string()),
            },
            _ => send_message(chat, input).await?,
        }
    }

    Ok(())
}

async fn send_message(chat: &ChatSessionManager, message: &str) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = chat.send(message).await;
    spinner.finish_and_clear();

    match result {
        Ok(reply) => print_assistant(&render_reply(&reply)),
        // The conversation already carries the error reply; show that one.
        Err(ChatError::Backend(_)) => {
            if let Some(last) = chat.visible_messages().last() {
                print_assistant(&last.content.display().red().to_string());
            }
        }
        Err(e) => output::warning(&e.user_message()),
    }
    Ok(())
}

fn print_assistant(text: &str) {
    println!();
    println!("{}: {}", "Assistant".cyan().bold(), text);
    println!();
}

/// Print a conversation the way the prompt shows it
pub fn print_messages(messages: &[ChatMessage]) {
    for message in messages.iter().filter(|m| !m.is_typing) {
        let speaker = if message.is_user {
            "You".green()
        } else {
            "Assistant".cyan()
        };
        println!("{}: {}", speaker.bold(), message.content.display());
        println!();
    }
}

fn print_help() {
    println!();
    println!("{}", "Available Commands:".yellow().bold());
    println!("  {}  - End the chat session", "/exit, /quit".cyan());
    println!("  {}          - Show this help message", "/help".cyan());
    println!("  {}           - Start a new conversation", "/new".cyan());
    println!("  {}       - List threads of this workspace", "/threads".cyan());
    println!("  {}     - Continue a stored thread", "/open <id>".cyan());
    println!();
}
