//! Configuration management commands

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use crate::config::{CliConfig, KEYS};
use crate::output::{self, OutputFormat};
use crate::ConfigCommands;

pub async fn run(cmd: ConfigCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show_config(format),
        ConfigCommands::Set { key, value } => set_config(&key, &value),
        ConfigCommands::Get { key } => get_config(&key),
        ConfigCommands::Reset { force } => reset_config(force),
        ConfigCommands::Path => {
            println!("{}", CliConfig::config_path()?.display());
            Ok(())
        }
    }
}

fn show_config(format: OutputFormat) -> Result<()> {
    let config = CliConfig::load()?;
    if output::print_structured(&config, format)? {
        return Ok(());
    }

    let path = CliConfig::config_path()?;
    println!("{}: {}", "Config file".bold(), path.display());
    println!();

    for key in KEYS {
        match config.get(key)? {
            Some(value) => println!("{}: {}", key.cyan(), value),
            None => println!("{}: {}", key.cyan(), "(not set)".dimmed()),
        }
    }

    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = CliConfig::load()?;
    config.set(key, value)?;
    config.save()?;
    println!("{} {} = {}", "Set".green(), key.cyan(), value);

    Ok(())
}

fn get_config(key: &str) -> Result<()> {
    let config = CliConfig::load()?;

    match config.get(key)? {
        Some(v) => println!("{}", v),
        None => println!("{}", "(not set)".dimmed()),
    }

    Ok(())
}

fn reset_config(force: bool) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt("Reset configuration to defaults?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled.".yellow());
            return Ok(());
        }
    }

    let path = CliConfig::config_path()?;
    if path.exists() {
        std::fs::remove_file(&path)?;
    }

    println!("{} configuration", "Reset".green());
    Ok(())
}
