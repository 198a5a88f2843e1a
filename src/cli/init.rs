//! tickoff init command implementation
//!
//! Creates the data directory and a default config, and marks onboarding
//! as seen.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session::SessionStore;
use crate::storage::STORE_DIR;

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    created: InitCreated,
    onboarding_seen: bool,
}

#[derive(serde::Serialize)]
struct InitCreated {
    data_dir: bool,
    config: bool,
    store_dir: bool,
}

pub fn run(data_dir: PathBuf, force: bool, output: OutputOptions) -> Result<()> {
    let created_data_dir = ensure_dir(&data_dir)?;
    let created_store_dir = ensure_dir(&data_dir.join(STORE_DIR))?;
    let created_config = ensure_config(&data_dir, force)?;
    SessionStore::new(&data_dir).mark_onboarding_seen()?;

    let report = InitReport {
        data_dir: data_dir.clone(),
        created: InitCreated {
            data_dir: created_data_dir,
            config: created_config,
            store_dir: created_store_dir,
        },
        onboarding_seen: true,
    };

    let mut created_items = Vec::new();
    if created_data_dir {
        created_items.push("data dir");
    }
    if created_config {
        created_items.push("config.toml");
    }
    if created_store_dir {
        created_items.push("store/");
    }

    let header = if created_items.is_empty() {
        "tickoff init: nothing to do".to_string()
    } else {
        "tickoff init: ready".to_string()
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("data dir", data_dir.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_next_step("tickoff user login <email>");
    human.push_next_step("tickoff add <text> --category <category>");

    emit_success(output, "init", &report, Some(&human))
}

fn ensure_config(data_dir: &Path, force: bool) -> Result<bool> {
    let config_path = Config::path_in(data_dir);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::OperationFailed(format!(
                "config.toml exists but is not a file: {}",
                config_path.display()
            )));
        }
        if !force {
            return Ok(false);
        }
    }

    Config::default().save(&config_path)?;
    Ok(true)
}

fn ensure_dir(path: &Path) -> Result<bool> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::OperationFailed(format!(
                "expected a directory at {}",
                path.display()
            )));
        }
        return Ok(false);
    }
    std::fs::create_dir_all(path)?;
    Ok(true)
}
