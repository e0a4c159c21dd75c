//! savekeep: command line front end for the save system.
//!
//! Usage:
//!   savekeep [--root DIR] [--settings FILE] list
//!   savekeep [--root DIR] show
//!   savekeep [--root DIR] peek [PATH]
//!   savekeep [--root DIR] save [NAME]
//!   savekeep [--root DIR] load PATH
//!   savekeep [--root DIR] delete PATH
//!   savekeep [--root DIR] exit-save
//!   savekeep [--root DIR] continue
//!   savekeep [--root DIR] watch SECONDS
//!
//! `--root` points every save location at one directory instead of the
//! platform directories. Set `RUST_LOG=info` to see what the manager does.

use savekeep::{
    AutoSaveScheduler, HostPaths, LoadSelector, SaveManager, SettingsStore, SystemClock, SystemDirs,
};
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;

const APP_NAME: &str = "savekeep";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let root = flag_value(&args, "--root").map(PathBuf::from);
    let settings_path = flag_value(&args, "--settings")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_settings_path(root.as_ref()));
    let positional = positional_args(&args);

    let settings = SettingsStore::new(&settings_path).load_or_create()?;
    let mut manager = match &root {
        Some(root) => SaveManager::initialize(settings, HostPaths::all(root), SystemClock),
        None => SaveManager::initialize(settings, SystemDirs::new(APP_NAME), SystemClock),
    };

    let command = positional.first().map(String::as_str).unwrap_or("list");
    let argument = positional.get(1).map(String::as_str);

    match command {
        "list" => {
            let catalog = manager.rescan();
            println!("Manual saves:");
            for entry in catalog.manual() {
                println!("  {}", entry.file.name);
            }
            println!("Auto saves:");
            for entry in catalog.auto() {
                println!("  {}", entry.file.name);
            }
        }
        "show" => {
            if let Some(file) = manager.active_file() {
                println!("Active file: {}", file.path.display());
            }
            if let Some(record) = manager.active_record() {
                println!("{}", serde_json::to_string_pretty(record)?);
            }
        }
        "peek" => {
            let record = match argument {
                Some(path) => manager.read_save(&PathBuf::from(path))?,
                None => manager.read_most_recent()?,
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        "save" => {
            let path = match argument {
                Some(name) => manager.save_active_as(name, true)?,
                None => manager.save()?,
            };
            println!("Saved {}", path.display());
        }
        "load" => {
            let path = argument.ok_or("load needs a path")?;
            let record = manager.load(LoadSelector::Path(PathBuf::from(path)));
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        "delete" => {
            let path = argument.ok_or("delete needs a path")?;
            manager.delete(&PathBuf::from(path))?;
            println!("Deleted {}", path);
        }
        "exit-save" => {
            let path = manager.exit_save()?;
            println!("Saved {}", path.display());
        }
        "continue" => match manager.load_latest_exit_save() {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => println!("No exit save found"),
        },
        "watch" => {
            let seconds: u64 = argument.ok_or("watch needs a duration in seconds")?.parse()?;
            watch(manager, Duration::from_secs(seconds));
        }
        other => return Err(format!("unknown command: {}", other).into()),
    }

    Ok(())
}

/// Runs the auto-save timer for `duration`, then writes an exit save
fn watch(manager: SaveManager, duration: Duration) {
    let mut scheduler = AutoSaveScheduler::new(manager.into_shared());
    if !scheduler.start() {
        println!("Auto save is disabled in the settings");
        return;
    }

    thread::sleep(duration);
    scheduler.stop();

    let mut manager = scheduler.manager().lock().unwrap_or_else(PoisonError::into_inner);
    match manager.exit_save() {
        Ok(path) => println!("Saved {}", path.display()),
        Err(e) => eprintln!("Exit save failed: {}", e),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

/// Arguments that are neither flags nor flag values
fn positional_args(args: &[String]) -> Vec<String> {
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
        } else {
            positional.push(arg.clone());
        }
    }
    positional
}

fn default_settings_path(root: Option<&PathBuf>) -> PathBuf {
    match root {
        Some(root) => root.join("settings.json"),
        None => dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
            .join("settings.json"),
    }
}
