//! Document commands for the active workspace

use anyhow::{Context as _, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use medassist_core::{Category, FilePayload};
use medassist_documents::DocumentError;
use medassist_ingestion::read_candidate;
use medassist_session::SessionError;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

use crate::context::{friendly, parse_category, Context};
use crate::output;
use crate::DocsCommands;

pub async fn run(ctx: &Context, cmd: DocsCommands) -> Result<()> {
    match cmd {
        DocsCommands::List { category } => list_documents(ctx, parse_category(&category)?).await,
        DocsCommands::Upload { category, paths } => {
            upload(ctx, parse_category(&category)?, paths).await
        }
        DocsCommands::Delete { category, file } => {
            delete(ctx, parse_category(&category)?, &file).await
        }
        DocsCommands::Url { category, url } => {
            process_url(ctx, parse_category(&category)?, &url).await
        }
        DocsCommands::Retry {
            category,
            references,
        } => retry(ctx, parse_category(&category)?, references).await,
    }
}

fn spinner(message: String) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    Ok(spinner)
}

async fn list_documents(ctx: &Context, category: Category) -> Result<()> {
    if let Err(e) = ctx.session.refresh().await {
        output::warning(&format!("Showing cached listing. {}", e.user_message()));
    }

    let workspace = ctx.active_name()?;
    let documents = ctx.session.controller(category).documents();
    let listing = json!({
        "workspace": workspace,
        "category": category.label(),
        "documents": documents,
    });
    if output::print_structured(&listing, ctx.format)? {
        return Ok(());
    }

    output::section(&format!(
        "{} documents in {}",
        capitalize(category.label()),
        workspace
    ));
    if documents.is_empty() {
        output::dimmed("No documents yet.");
    }
    for name in &documents {
        println!("  {}", name);
    }
    Ok(())
}

async fn upload(ctx: &Context, category: Category, paths: Vec<PathBuf>) -> Result<()> {
    let mut files: Vec<FilePayload> = Vec::with_capacity(paths.len());
    for path in &paths {
        let file = read_candidate(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(file);
    }
    let total: u64 = files.iter().map(FilePayload::size).sum();

    let progress = spinner(format!(
        "Uploading {} files ({})...",
        files.len(),
        output::format_size(total)
    ))?;
    let result = ctx.session.upload(category, files).await;
    progress.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(SessionError::Document(e @ DocumentError::PartialFailure { .. })) => {
            if let Some(hint) = retry_hint(category, &e) {
                output::info(&hint);
            }
            return Err(friendly(e));
        }
        Err(e) => return Err(friendly(e)),
    };

    if output::print_structured(&report, ctx.format)? {
        return Ok(());
    }

    for dropped in &report.dropped {
        output::warning(&format!("Skipped {}: {}", dropped.name, dropped.reason));
    }
    output::success(&format!(
        "Uploaded {} {} documents to {}",
        report.reference_names.len(),
        category.label(),
        ctx.active_name()?.cyan()
    ));
    for stored in &report.stored {
        println!(
            "  {} {} {}",
            stored.original_name,
            "→".dimmed(),
            stored.saved_as.dimmed()
        );
    }
    if let Some(count) = report.process_result.processed_count() {
        output::key_value("Processed", &count.to_string());
    }
    Ok(())
}

async fn delete(ctx: &Context, category: Category, file: &str) -> Result<()> {
    let side_call = ctx
        .session
        .delete_document(category, file)
        .await
        .map_err(friendly)?;
    output::success(&format!("Deleted {}", file));

    // Wait for the side call so it is not cut off when the process exits.
    if let Err(e) = side_call.outcome().await {
        output::dimmed(&format!(
            "Processing service was not notified: {}",
            e.user_message()
        ));
    }
    Ok(())
}

async fn process_url(ctx: &Context, category: Category, url: &str) -> Result<()> {
    let progress = spinner(format!("Processing {}...", url))?;
    let result = ctx.session.process_url(category, url).await;
    progress.finish_and_clear();
    let result = result.map_err(friendly)?;

    if output::print_structured(&result, ctx.format)? {
        return Ok(());
    }
    output::success(&format!("Submitted {} for {} processing", url, category.label()));
    Ok(())
}

async fn retry(ctx: &Context, category: Category, references: Vec<String>) -> Result<()> {
    let progress = spinner(format!("Processing {} files...", references.len()))?;
    let result = ctx.session.retry_process(category, &references).await;
    progress.finish_and_clear();
    let result = result.map_err(friendly)?;

    if output::print_structured(&result, ctx.format)? {
        return Ok(());
    }
    output::success(&format!("Processed {} {} documents", references.len(), category.label()));
    Ok(())
}

/// Command that finishes an upload whose processing never ran
fn retry_hint(category: Category, err: &DocumentError) -> Option<String> {
    let references = err.unprocessed_references();
    if references.is_empty() {
        return None;
    }
    Some(format!(
        "Retry processing with: medassist docs retry {} {}",
        category.label(),
        references.join(" ")
    ))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medassist_core::BackendError;
    use medassist_documents::FailedStep;

    fn partial(step: FailedStep) -> DocumentError {
        DocumentError::PartialFailure {
            references: vec!["1-scan.pdf".to_string(), "2-notes.txt".to_string()],
            step,
            cause: BackendError::timeout("deadline elapsed"),
        }
    }

    #[test]
    fn test_retry_hint_only_when_processing_is_missing() {
        assert_eq!(
            retry_hint(Category::Medical, &partial(FailedStep::Process)).as_deref(),
            Some("Retry processing with: medassist docs retry medical 1-scan.pdf 2-notes.txt")
        );
        assert!(retry_hint(Category::Medical, &partial(FailedStep::Store)).is_some());
        assert!(retry_hint(Category::Medical, &partial(FailedStep::Refresh)).is_none());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("medical"), "Medical");
        assert_eq!(capitalize(""), "");
    }
}
