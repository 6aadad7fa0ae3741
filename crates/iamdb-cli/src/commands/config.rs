use super::{progress, prompts, Workspace};
use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use iamdb_config::{redact_uri, Config, WatchlistConfig};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

pub fn run_config(cmd: ConfigCommands, workspace: &Workspace, output: &Output) -> Result<ExitCode> {
    match cmd {
        ConfigCommands::Show { full } => show_config(full, workspace, output)?,
        ConfigCommands::Init { force } => init_config(force, workspace, output)?,
        ConfigCommands::Password { user } => store_password(user, workspace, output)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn mask_string(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

fn check_mark(value: bool) -> String {
    if value {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

fn section(title: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec![Cell::new(title).fg(Color::Cyan).add_attribute(Attribute::Bold)]);
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "<none>".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn show_config(full: bool, workspace: &Workspace, output: &Output) -> Result<()> {
    let config_file = workspace.config_file();

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Run 'iamdb config init' to create one.");
        return Ok(());
    }

    let config = Config::load_from_file(config_file).map_err(|e| {
        color_eyre::eyre::eyre!(
            "Failed to load config from {}: {}",
            config_file.display(),
            e
        )
    })?;
    let passwords = workspace.password_store()?;
    let credentials = passwords.file();
    let password_display = match passwords.get(&config.remote.user) {
        Some(password) if full => password,
        Some(password) => mask_string(&password),
        None => "<not set>".to_string(),
    };
    let uri_display = config.remote.uri.as_deref().map(|uri| {
        if full {
            uri.to_string()
        } else {
            redact_uri(uri)
        }
    });

    if !output.is_human() {
        output.json(&json!({
            "config_file": config_file.display().to_string(),
            "credentials_file": credentials.path().display().to_string(),
            "dataset": {
                "basics": config.dataset.basics,
                "ratings": config.dataset.ratings,
                "title_types": config.dataset.title_types,
                "max_cache_age_hours": config.dataset.max_cache_age_hours,
                "cache_dir": workspace.paths().dataset_cache_dir().display().to_string(),
            },
            "watchlist": {
                "csv": config.watchlist.csv.as_ref().map(|p| p.display().to_string()),
                "movie_dirs": config
                    .watchlist
                    .movie_dirs
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>(),
            },
            "remote": {
                "server": config.remote.server,
                "user": config.remote.user,
                "database": config.remote.database,
                "collection": config.remote.collection,
                "no_auth": config.remote.no_auth,
                "srv": config.remote.srv,
                "uri": uri_display,
                "password": password_display,
            },
            "logging": {
                "file": config.logging.file.as_ref().map(|p| p.display().to_string()),
            },
        }));
        return Ok(());
    }

    if output.is_quiet() {
        return Ok(());
    }

    let mut info_table = Table::new();
    info_table.set_header(vec![
        Cell::new("Config File").add_attribute(Attribute::Bold),
        Cell::new(config_file.display().to_string()),
    ]);
    info_table.add_row(vec![
        Cell::new("Credentials File"),
        Cell::new(credentials.path().display().to_string()),
    ]);
    info_table.load_preset(comfy_table::presets::UTF8_FULL);
    info_table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}\n", info_table);

    let mut dataset = section("Dataset");
    dataset.add_row(vec![Cell::new("Basics"), Cell::new(&config.dataset.basics)]);
    dataset.add_row(vec![
        Cell::new("Ratings"),
        Cell::new(config.dataset.ratings.as_deref().unwrap_or("<none>")),
    ]);
    dataset.add_row(vec![
        Cell::new("Title Types"),
        Cell::new(config.dataset.title_types.join(", ")),
    ]);
    dataset.add_row(vec![
        Cell::new("Max Cache Age"),
        Cell::new(format!("{} hours", config.dataset.max_cache_age_hours)),
    ]);
    dataset.add_row(vec![
        Cell::new("Cache Directory"),
        Cell::new(workspace.paths().dataset_cache_dir().display().to_string()),
    ]);
    println!("{}\n", dataset);

    let mut watchlist = section("Watch List");
    watchlist.add_row(vec![
        Cell::new("CSV Log"),
        Cell::new(
            config
                .watchlist
                .csv
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<none>".to_string()),
        ),
    ]);
    watchlist.add_row(vec![
        Cell::new("Movie Directories"),
        Cell::new(display_paths(&config.watchlist.movie_dirs)),
    ]);
    println!("{}\n", watchlist);

    let mut remote = section("Remote Database");
    if let Some(uri) = &uri_display {
        remote.add_row(vec![Cell::new("URI"), Cell::new(uri)]);
    } else {
        remote.add_row(vec![Cell::new("Server"), Cell::new(&config.remote.server)]);
        remote.add_row(vec![Cell::new("SRV Lookup"), Cell::new(check_mark(config.remote.srv))]);
        remote.add_row(vec![
            Cell::new("Authentication"),
            Cell::new(check_mark(!config.remote.no_auth)),
        ]);
        remote.add_row(vec![Cell::new("User"), Cell::new(&config.remote.user)]);
        remote.add_row(vec![Cell::new("Password"), Cell::new(password_display)]);
    }
    remote.add_row(vec![Cell::new("Database"), Cell::new(&config.remote.database)]);
    remote.add_row(vec![Cell::new("Collection"), Cell::new(&config.remote.collection)]);
    println!("{}\n", remote);

    let mut logging = section("Logging");
    logging.add_row(vec![
        Cell::new("File"),
        Cell::new(
            config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<stderr>".to_string()),
        ),
    ]);
    println!("{}", logging);

    Ok(())
}

fn init_config(force: bool, workspace: &Workspace, output: &Output) -> Result<()> {
    let config_file = workspace.config_file().clone();
    let interactive = progress::is_interactive();

    if config_file.exists() && !force {
        if !interactive {
            return Err(color_eyre::eyre::eyre!(
                "Configuration file already exists at {}. Use --force to overwrite it.",
                config_file.display()
            ));
        }
        let overwrite = prompts::prompt_yes_no(
            &format!("{} already exists. Overwrite?", config_file.display()),
            false,
        )?;
        if !overwrite {
            output.info("Keeping existing configuration");
            return Ok(());
        }
    }

    let mut config = Config::default();
    if interactive {
        prompt_remote(&mut config)?;
        config.watchlist = prompt_watchlist()?;
        if prompts::prompt_yes_no("Write logs to a file instead of stderr?", false)? {
            config.logging.file = Some(workspace.paths().default_log_file());
        }
    } else {
        output.info("Not running interactively, writing default configuration");
    }

    workspace
        .paths()
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;
    if let Some(parent) = config_file.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to create {}: {}", parent.display(), e))?;
    }
    config.save_to_file(&config_file).map_err(|e| {
        color_eyre::eyre::eyre!("Failed to save config to {}: {}", config_file.display(), e)
    })?;
    output.success(format!("Configuration written to {}", config_file.display()));

    if config.validate_watchlist().is_err() {
        output.warn("No watch list configured yet; edit [watchlist] before running 'iamdb sync'.");
    }
    if config.needs_password() {
        output.info("Run 'iamdb config password' to store the database password.");
    }
    Ok(())
}

fn prompt_remote(config: &mut Config) -> Result<()> {
    let remote = &mut config.remote;
    remote.server = prompts::prompt_string("MongoDB server", Some(remote.server.as_str()))?;
    remote.srv = prompts::prompt_yes_no("Use SRV lookup (mongodb+srv)?", remote.srv)?;
    remote.no_auth = !prompts::prompt_yes_no("Does the server require a password?", true)?;
    if !remote.no_auth {
        remote.user = prompts::prompt_string("MongoDB user", Some(remote.user.as_str()))?;
    }
    remote.database = prompts::prompt_string("Database", Some(remote.database.as_str()))?;
    remote.collection = prompts::prompt_string("Collection", Some(remote.collection.as_str()))?;
    Ok(())
}

fn prompt_watchlist() -> Result<WatchlistConfig> {
    let csv =
        prompts::prompt_optional("Watch-log CSV file (leave empty for none)")?.map(PathBuf::from);
    let movie_dirs = prompts::prompt_optional("Movie directory (leave empty for none)")?
        .map(PathBuf::from)
        .into_iter()
        .collect();
    Ok(WatchlistConfig { csv, movie_dirs })
}

fn store_password(user: Option<String>, workspace: &Workspace, output: &Output) -> Result<()> {
    let user = match user {
        Some(user) => user,
        None => workspace.load_config(output)?.remote.user,
    };

    if !progress::is_interactive() {
        return Err(color_eyre::eyre::eyre!(
            "Cannot prompt for a password without a terminal. Set IAMDB_MONGODB_PASSWORD instead."
        ));
    }

    let password = prompts::prompt_new_password(&format!("Password for MongoDB user '{}'", user))?;
    if password.is_empty() {
        return Err(color_eyre::eyre::eyre!("Password cannot be empty"));
    }

    let location = workspace.save_password(&user, password)?;
    output.success(format!("Stored password for '{}' in {}", user, location));
    Ok(())
}
