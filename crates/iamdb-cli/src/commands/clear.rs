use super::Workspace;
use crate::output::Output;
use color_eyre::Result;
use iamdb_config::Config;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

pub fn run_clear(
    all: bool,
    cache: bool,
    credentials: bool,
    workspace: &Workspace,
    output: &Output,
) -> Result<ExitCode> {
    let paths = workspace.paths();

    if all {
        clear_cache(&paths.cache_dir(), output)?;
        clear_keyring(workspace, output)?;
        clear_credentials(&paths.credentials_file(), output)?;
        output.success("Cache and credentials cleared");
        return Ok(ExitCode::SUCCESS);
    }

    if cache {
        clear_cache(&paths.cache_dir(), output)?;
    }
    if credentials {
        clear_keyring(workspace, output)?;
        clear_credentials(&paths.credentials_file(), output)?;
    }

    if !cache && !credentials {
        output.warn("No clear option specified. Use --cache, --credentials, or --all");
        output.println("\nExample: iamdb clear --cache");
    }

    Ok(ExitCode::SUCCESS)
}

fn clear_cache(cache_dir: &Path, output: &Output) -> Result<()> {
    if cache_dir.exists() {
        fs::remove_dir_all(cache_dir).map_err(|e| {
            color_eyre::eyre::eyre!(
                "Failed to remove dataset cache at {}: {}",
                cache_dir.display(),
                e
            )
        })?;
        output.success(format!("Cleared dataset cache: {}", cache_dir.display()));
    } else {
        output.info("No dataset cache found to clear");
    }
    Ok(())
}

/// Drop the configured user's keyring entry. An unusable keyring only warns.
fn clear_keyring(workspace: &Workspace, output: &Output) -> Result<()> {
    let user = Config::load_from_file(workspace.config_file())
        .map(|config| config.remote.user)
        .unwrap_or_else(|_| Config::default().remote.user);

    match workspace.password_store()?.delete_from_keyring(&user) {
        Ok(true) => output.success(format!("Removed keyring password for '{}'", user)),
        Ok(false) => output.info(format!("No keyring password stored for '{}'", user)),
        Err(e) => output.warn(format!("Could not clear keyring password for '{}': {}", user, e)),
    }
    Ok(())
}

fn clear_credentials(credentials_file: &Path, output: &Output) -> Result<()> {
    if credentials_file.exists() {
        fs::remove_file(credentials_file).map_err(|e| {
            color_eyre::eyre::eyre!(
                "Failed to remove credentials file at {}: {}",
                credentials_file.display(),
                e
            )
        })?;
        output.success(format!("Cleared credentials: {}", credentials_file.display()));
    } else {
        output.info("No credentials file found to clear");
    }
    Ok(())
}
