//! Chat history commands

use anyhow::{anyhow, Context as _, Result};
use colored::Colorize;
use dialoguer::Confirm;
use medassist_conversation::{export_thread, ChatSessionManager, ChatThread, ExportFormat};
use medassist_core::ThreadId;
use serde::Serialize;
use std::path::PathBuf;
use tabled::{Table, Tabled};

use crate::commands::chat::print_messages;
use crate::context::{friendly, Context};
use crate::output;
use crate::HistoryCommands;

pub async fn run(ctx: &Context, cmd: HistoryCommands) -> Result<()> {
    match cmd {
        HistoryCommands::List { all, limit } => list_threads(ctx, all, limit),
        HistoryCommands::Show { id, export, output } => show_thread(ctx, &id, export, output),
        HistoryCommands::Delete { id, force } => delete_thread(ctx, &id, force),
    }
}

/// Find a thread by full id or unique id prefix.
pub fn find_thread(chat: &ChatSessionManager, key: &str) -> Result<ChatThread> {
    if let Ok(id) = key.parse::<ThreadId>() {
        return chat
            .thread(id)
            .ok_or_else(|| anyhow!("No thread with id {}", id));
    }

    let mut matches = chat
        .threads()
        .into_iter()
        .filter(|t| t.id.to_string().starts_with(key));
    match (matches.next(), matches.next()) {
        (Some(found), None) => Ok(found),
        (Some(_), Some(_)) => Err(anyhow!("'{}' matches more than one thread", key)),
        _ => Err(anyhow!("No thread matches '{}'", key)),
    }
}

#[derive(Tabled, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreadRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Messages")]
    messages: usize,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl ThreadRow {
    fn from_thread(thread: &ChatThread, id_width: usize) -> Self {
        Self {
            id: thread.id.to_string().chars().take(id_width).collect(),
            title: output::truncate(&thread.title, 40),
            messages: thread.messages.len(),
            updated: thread.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Print threads as a table with short ids
pub fn print_thread_table(threads: &[ChatThread]) {
    let rows: Vec<ThreadRow> = threads
        .iter()
        .map(|t| ThreadRow::from_thread(t, 8))
        .collect();
    println!("{}", Table::new(rows));
}

fn list_threads(ctx: &Context, all: bool, limit: usize) -> Result<()> {
    let chat = ctx.session.chat();
    let threads = if all {
        chat.threads()
    } else {
        chat.threads_for_workspace(&ctx.session.active_workspace()?.id)
    };
    let threads: Vec<ChatThread> = threads.into_iter().take(limit).collect();

    let rows: Vec<ThreadRow> = threads
        .iter()
        .map(|t| ThreadRow::from_thread(t, usize::MAX))
        .collect();
    if output::print_structured(&rows, ctx.format)? {
        return Ok(());
    }

    if threads.is_empty() {
        println!("{}", "No chat threads found.".dimmed());
        return Ok(());
    }
    print_thread_table(&threads);
    Ok(())
}

fn show_thread(
    ctx: &Context,
    key: &str,
    export: Option<String>,
    output_path: Option<PathBuf>,
) -> Result<()> {
    let thread = find_thread(ctx.session.chat(), key)?;

    if let Some(format) = export {
        let format: ExportFormat = format.parse().map_err(anyhow::Error::msg)?;
        let content = export_thread(&thread, format)?;
        match output_path {
            Some(path) => {
                std::fs::write(&path, content)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                output::success(&format!("Exported to {}", path.display()));
            }
            None => println!("{}", content),
        }
        return Ok(());
    }

    if output::print_structured(&thread, ctx.format)? {
        return Ok(());
    }
    output::key_value("ID", &thread.id.to_string());
    output::key_value("Title", &thread.title);
    output::key_value("Updated", &thread.timestamp.to_rfc3339());
    output::key_value("Messages", &thread.messages.len().to_string());
    println!();
    print_messages(&thread.messages);
    Ok(())
}

fn delete_thread(ctx: &Context, key: &str, force: bool) -> Result<()> {
    let chat = ctx.session.chat();
    let thread = find_thread(chat, key)?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete thread '{}'?", thread.title))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled.".yellow());
            return Ok(());
        }
    }

    chat.delete_thread(thread.id).map_err(friendly)?;
    output::success(&format!("Deleted thread {}", thread.title));
    Ok(())
}
