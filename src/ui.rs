// UI layer: provides a simple interactive menu using `dialoguer`.
// The functions are small and synchronous; every outcome is rendered from
// the typed results of `ContentsClient`.

use crate::api::{self, ContentsClient};
use crate::config::{self, Credentials, EnvSettings, Settings};
use crate::error::Error;
use crate::models::{DirEntry, DirectoryRemoval};
use crate::transport::Transport;
use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use dialoguer::{Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MENU: [&str; 9] = [
    "List Directory",
    "Read/Download File",
    "Upload/Edit File (from local file)",
    "Delete File",
    "Create Directory",
    "Delete Directory",
    "Move/Rename File",
    "Activation Ping",
    "Exit",
];

/// The store counts every ping as two commits; keep it small.
const MAX_PINGS: u32 = 2;

/// Fill in whatever the environment did not provide by prompting. The last
/// used account/repository pair is offered as the default.
pub fn collect_settings(env: EnvSettings) -> Result<Settings> {
    if let Some(settings) = env.complete() {
        return Ok(settings);
    }

    println!("=== GitHub Repo Manager ===");
    println!("Generate a Personal Access Token: https://github.com/settings/tokens");
    println!("(Required scope: repo)\n");

    let profile = config::load_profile().unwrap_or_default();
    let account = match env.account.clone() {
        Some(account) => account,
        None => prompt_with_default("GitHub Username", &profile.account)?,
    };
    let repository = match env.repository.clone() {
        Some(repository) => repository,
        None => prompt_with_default("Repository Name", &profile.repository)?,
    };
    let token = match env.token.clone() {
        Some(token) => token,
        None => Password::new()
            .with_prompt("Personal Access Token (hidden)")
            .interact()?
            .trim()
            .to_string(),
    };

    Ok(Settings {
        api_url: env.api_url(),
        credentials: Credentials::new(account, repository, token),
    })
}

fn prompt_with_default(prompt: &str, default: &str) -> Result<String> {
    let mut input = Input::<String>::new();
    input.with_prompt(prompt);
    if !default.is_empty() {
        input.default(default.to_string());
    }
    Ok(input.interact_text()?.trim().to_string())
}

/// Main interactive menu. Checks the connection by listing the repository
/// root, then runs a select loop until the user chooses "Exit".
pub fn main_menu<T: Transport>(api: &ContentsClient<T>, credentials: &Credentials) -> Result<()> {
    let slug = credentials.slug();
    match with_spinner("Testing connection...", || api.list("")) {
        Ok(_) => {
            println!("Successfully connected to {}\n", slug);
            if let Err(e) = config::persist_profile(credentials) {
                tracing::warn!("could not remember profile: {:#}", e);
            }
        }
        Err(e) => {
            println!("Connection failed: {}", e);
            println!("Check your token, permissions, username, or repository name.");
            return Ok(());
        }
    }

    loop {
        pause()?;
        clear_screen()?;
        println!("=== {} ===", slug);
        let selection = Select::new().items(&MENU).default(0).interact()?;
        match selection {
            0 => handle_list(api)?,
            1 => handle_read(api)?,
            2 => handle_upload(api)?,
            3 => handle_delete(api)?,
            4 => handle_create_dir(api)?,
            5 => handle_delete_dir(api)?,
            6 => handle_move(api)?,
            7 => handle_ping(api)?,
            _ => {
                println!("Goodbye!");
                break;
            }
        }
    }
    Ok(())
}

fn handle_list<T: Transport>(api: &ContentsClient<T>) -> Result<()> {
    let path = optional_input("Path (leave empty for root)")?;
    match with_spinner("Listing...", || api.list(&path)) {
        Ok(entries) => {
            println!("\nContents:");
            for entry in &entries {
                println!("{}", format_entry(entry));
            }
        }
        Err(e) => report_error(&e),
    }
    Ok(())
}

fn handle_read<T: Transport>(api: &ContentsClient<T>) -> Result<()> {
    let path = required_input("File path to read/download")?;
    let local = optional_input("Local path to save (optional, leave empty to display)")?;

    if local.is_empty() {
        match with_spinner("Fetching...", || api.read_text(&path)) {
            Ok(text) => {
                println!("\n{}", "=".repeat(60));
                println!("{}", text);
                println!("{}", "=".repeat(60));
            }
            Err(Error::NotText { .. }) => {
                println!("{} is binary; give a local path to save it instead.", path)
            }
            Err(e) => report_error(&e),
        }
        return Ok(());
    }

    let local = PathBuf::from(local);
    match with_spinner("Downloading...", || api.download(&path, &local)) {
        Ok(size) => println!("Success: {} bytes saved to {}", size, local.display()),
        Err(e) => report_error(&e),
    }
    Ok(())
}

fn handle_upload<T: Transport>(api: &ContentsClient<T>) -> Result<()> {
    let repo_path = required_input("Target path in repo (e.g. folder/script.py)")?;
    let local = PathBuf::from(required_input("Local file path (source)")?);
    if !local.is_file() {
        println!("Local file not found!");
        return Ok(());
    }
    let default_message = format!("Update {}", file_name(&local));
    let message = message_or(&default_message)?;

    match with_spinner("Uploading...", || api.upload(&local, &repo_path, &message)) {
        Ok(outcome) if outcome.created => println!("Success: created {}", outcome.entry.path),
        Ok(outcome) => println!("Success: updated {}", outcome.entry.path),
        Err(e) => report_error(&e),
    }
    Ok(())
}

fn handle_delete<T: Transport>(api: &ContentsClient<T>) -> Result<()> {
    let path = required_input("File path to delete")?;
    let message = message_or(api::DEFAULT_DELETE_MESSAGE)?;
    match with_spinner("Deleting...", || api.delete(&path, &message)) {
        Ok(_) => println!("Success: {} deleted", path),
        Err(e) => report_error(&e),
    }
    Ok(())
}

fn handle_create_dir<T: Transport>(api: &ContentsClient<T>) -> Result<()> {
    let path = required_input("Directory to create (e.g. new-folder/subfolder)")?;
    match with_spinner("Creating...", || api.create_directory(&path)) {
        Ok(_) => println!("Success: {} created", path),
        Err(e) => report_error(&e),
    }
    Ok(())
}

fn handle_delete_dir<T: Transport>(api: &ContentsClient<T>) -> Result<()> {
    let path = required_input("Directory to delete (must be empty or contain only .gitkeep)")?;
    let message = message_or(api::DEFAULT_DIR_DELETE_MESSAGE)?;
    match with_spinner("Deleting...", || api.delete_directory(&path, &message)) {
        Ok(DirectoryRemoval::Removed(_)) => println!("Success: {} deleted", path),
        Ok(DirectoryRemoval::MarkerAbsent) => println!(
            "Info: {} in {} not found. Directory might be empty.",
            api::MARKER_FILE,
            path
        ),
        Err(e) => report_error(&e),
    }
    Ok(())
}

fn handle_move<T: Transport>(api: &ContentsClient<T>) -> Result<()> {
    let old_path = required_input("Old file path (source)")?;
    let new_path = required_input("New file path (target)")?;
    let message = optional_input("Commit message (empty = default)")?;
    let message = (!message.is_empty()).then_some(message);

    match with_spinner("Moving...", || {
        api.move_file(&old_path, &new_path, message.as_deref())
    }) {
        Ok(_) => println!("Success: File moved from {} to {}", old_path, new_path),
        Err(e) => report_error(&e),
    }
    Ok(())
}

fn handle_ping<T: Transport>(api: &ContentsClient<T>) -> Result<()> {
    let count: u32 = Input::new()
        .with_prompt(format!("Activation ping count (max {})", MAX_PINGS))
        .default(1)
        .interact_text()?;
    for _ in 0..count.min(MAX_PINGS) {
        match with_spinner("Pinging...", || api.ping()) {
            Ok(name) => println!("Pinged with {}", name),
            Err(e) => {
                report_error(&e);
                break;
            }
        }
    }
    Ok(())
}

/// Run `f` while a spinner is shown.
fn with_spinner<R>(message: &'static str, f: impl FnOnce() -> R) -> R {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = f();
    spinner.finish_and_clear();
    result
}

fn report_error(e: &Error) {
    println!("{}", describe_error(e));
}

/// One line for the user. A partial move gets a warning with the cleanup
/// the user has to do.
pub fn describe_error(e: &Error) -> String {
    match e {
        Error::PartialMove {
            from, to, source, ..
        } => format!(
            "Warning: File created at {}, but failed to delete old file {}. Delete manually. Error: {}",
            to, from, source
        ),
        Error::Conflict { path, .. } => format!(
            "Error: {} changed on the remote while it was being written. Try again.",
            path
        ),
        other => format!("Error: {}", other),
    }
}

pub fn format_entry(entry: &DirEntry) -> String {
    let icon = if entry.is_dir() { "DIR" } else { "FILE" };
    format!(" [{}] {}", icon, entry.name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn required_input(prompt: &str) -> Result<String> {
    let value: String = Input::new().with_prompt(prompt).interact_text()?;
    Ok(value.trim().to_string())
}

fn optional_input(prompt: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(value.trim().to_string())
}

fn message_or(default: &str) -> Result<String> {
    let message = optional_input("Commit message (empty = default)")?;
    Ok(if message.is_empty() {
        default.to_string()
    } else {
        message
    })
}

fn pause() -> Result<()> {
    let _: String = Input::new()
        .with_prompt("Press Enter to continue")
        .allow_empty(true)
        .interact_text()?;
    Ok(())
}

fn clear_screen() -> Result<()> {
    execute!(stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
    Ok(())
}
