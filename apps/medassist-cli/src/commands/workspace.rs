//! Workspace management commands

use anyhow::{anyhow, Result};
use colored::Colorize;
use dialoguer::Confirm;
use medassist_core::{Category, Workspace, WorkspaceId};
use medassist_workspace::WorkspaceStore;
use tabled::{Table, Tabled};

use crate::context::{friendly, Context};
use crate::output;
use crate::WorkspaceCommands;

pub async fn run(ctx: &Context, cmd: WorkspaceCommands) -> Result<()> {
    match cmd {
        WorkspaceCommands::List => list_workspaces(ctx).await,
        WorkspaceCommands::Create { name } => create_workspace(ctx, &name),
        WorkspaceCommands::Delete { workspace, force } => {
            delete_workspace(ctx, &workspace, force)
        }
        WorkspaceCommands::Use { workspace } => use_workspace(ctx, &workspace),
        WorkspaceCommands::Refresh => refresh(ctx).await,
    }
}

/// Find a workspace by exact id, name, or unique id prefix.
pub fn resolve(store: &WorkspaceStore, key: &str) -> Result<Workspace> {
    if let Some(found) = store
        .get(&WorkspaceId::from(key))
        .or_else(|| store.find_by_name(key))
    {
        return Ok(found);
    }

    let mut matches = store
        .workspaces()
        .into_iter()
        .filter(|w| w.id.as_str().starts_with(key));
    match (matches.next(), matches.next()) {
        (Some(found), None) => Ok(found),
        (Some(_), Some(_)) => Err(anyhow!("'{}' matches more than one workspace", key)),
        _ => Err(anyhow!("No workspace matches '{}'", key)),
    }
}

#[derive(Tabled)]
struct WorkspaceRow {
    #[tabled(rename = "")]
    active: &'static str,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Medical")]
    medical: usize,
    #[tabled(rename = "Patient")]
    patient: usize,
    #[tabled(rename = "Updated")]
    updated: String,
}

async fn list_workspaces(ctx: &Context) -> Result<()> {
    let store = ctx.session.workspaces();
    let workspaces = match store.list_workspaces().await {
        Ok(listed) => listed,
        Err(e) => {
            output::warning(&format!("Showing cached listings. {}", e.user_message()));
            store.workspaces()
        }
    };

    if output::print_structured(&workspaces, ctx.format)? {
        return Ok(());
    }

    let active = store.active_id();
    let rows: Vec<WorkspaceRow> = workspaces
        .iter()
        .map(|w| WorkspaceRow {
            active: if active.as_ref() == Some(&w.id) { "*" } else { "" },
            id: output::truncate(w.id.as_str(), 11),
            name: w.name.clone(),
            medical: w.files(Category::Medical).len(),
            patient: w.files(Category::Patient).len(),
            updated: w.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();

    println!("{}", Table::new(rows));
    Ok(())
}

fn create_workspace(ctx: &Context, name: &str) -> Result<()> {
    let workspace = ctx
        .session
        .workspaces()
        .create_workspace(name)
        .map_err(friendly)?;

    if output::print_structured(&workspace, ctx.format)? {
        return Ok(());
    }
    output::success(&format!(
        "Created workspace {} ({}) and made it active",
        workspace.name.cyan(),
        workspace.id
    ));
    Ok(())
}

fn delete_workspace(ctx: &Context, key: &str, force: bool) -> Result<()> {
    let store = ctx.session.workspaces();
    let workspace = resolve(store, key)?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete workspace '{}'?", workspace.name))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled.".yellow());
            return Ok(());
        }
    }

    store.delete_workspace(&workspace.id).map_err(friendly)?;
    output::success(&format!("Deleted workspace {}", workspace.name));
    if let Some(active) = store.active_workspace() {
        output::info(&format!("Active workspace is now {}", active.name.cyan()));
    }
    Ok(())
}

fn use_workspace(ctx: &Context, key: &str) -> Result<()> {
    let store = ctx.session.workspaces();
    let workspace = resolve(store, key)?;
    store.set_active(&workspace.id).map_err(friendly)?;
    output::success(&format!("Switched to workspace {}", workspace.name.cyan()));
    Ok(())
}

async fn refresh(ctx: &Context) -> Result<()> {
    let workspaces = ctx.session.refresh().await.map_err(friendly)?;

    if output::print_structured(&workspaces, ctx.format)? {
        return Ok(());
    }
    let files: usize = workspaces
        .iter()
        .flat_map(|w| w.folders.iter())
        .map(|f| f.files.len())
        .sum();
    output::success(&format!(
        "Refreshed {} workspaces ({} documents)",
        workspaces.len(),
        files
    ));
    Ok(())
}
