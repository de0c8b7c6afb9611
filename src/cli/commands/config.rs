//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::cli::output;
use crate::config::{Config, ConfigManager};
use crate::error::CacheResult;

/// Execute the config command
pub fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> CacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force)?,
    }

    Ok(())
}

fn show_config(config: &Config) -> CacheResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

fn init_config(manager: &ConfigManager, force: bool) -> CacheResult<()> {
    let path = manager.path();

    if path.exists() && !force {
        output::step_warn_hint(
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::example())?;
    output::step_ok_detail("Configuration initialized", &path.display().to_string());

    Ok(())
}
