/// Time limit and watched-app commands
use anyhow::Result;
use clap::Subcommand;
use detox_storage::{Database, Settings};
use tabled::{Table, Tabled};

use super::helpers::split_app_ids;

#[derive(Subcommand, Debug)]
pub enum AppsAction {
    /// List watched apps
    List,
    /// Watch one or more apps
    Add {
        /// App ids, e.g. `firefox` or `com.apple.Safari`
        #[arg(required = true)]
        app_ids: Vec<String>,
    },
    /// Stop watching an app
    Remove {
        /// App id to remove
        app_id: String,
    },
    /// Stop watching all apps
    Clear,
}

#[derive(Tabled)]
struct WatchedAppRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "App ID")]
    app_id: String,
}

const RESTART_HINT: &str = "Changes apply the next time monitoring starts.";

/// Show or set the continuous-usage limit
pub fn limit_command(minutes: Option<u32>) -> Result<()> {
    let db = Database::new(None)?;
    let mut settings = db.get_settings()?;

    match minutes {
        None => println!("Time limit: {} minutes", settings.time_limit_minutes),
        Some(minutes) => {
            settings.set_time_limit(minutes);
            db.update_settings(&settings)?;
            if minutes == 0 {
                println!("The limit must be at least one minute.");
            }
            println!("Time limit set to {} minutes", settings.time_limit_minutes);
            println!("{RESTART_HINT}");
        }
    }

    Ok(())
}

pub fn apps_command(action: AppsAction) -> Result<()> {
    let db = Database::new(None)?;
    let mut settings = db.get_settings()?;

    match action {
        AppsAction::List => print_watched_apps(&settings),
        AppsAction::Add { app_ids } => {
            let mut added = 0;
            for app_id in split_app_ids(&app_ids) {
                if settings.watch_app(&app_id) {
                    println!("Watching '{app_id}'");
                    added += 1;
                } else {
                    println!("'{app_id}' is already watched");
                }
            }
            if added > 0 {
                db.update_settings(&settings)?;
                println!("{RESTART_HINT}");
            }
        }
        AppsAction::Remove { app_id } => {
            if settings.unwatch_app(&app_id) {
                db.update_settings(&settings)?;
                println!("Stopped watching '{app_id}'");
                println!("{RESTART_HINT}");
            } else {
                println!("'{app_id}' is not in the watch list");
            }
        }
        AppsAction::Clear => {
            let count = settings.watched_apps.len();
            settings.watched_apps.clear();
            db.update_settings(&settings)?;
            println!("Removed {count} watched app(s)");
        }
    }

    Ok(())
}

fn print_watched_apps(settings: &Settings) {
    if settings.watched_apps.is_empty() {
        println!("No watched apps. Add one with: detox apps add <APP_ID>");
        return;
    }

    let rows: Vec<WatchedAppRow> = settings
        .watched_apps
        .iter()
        .enumerate()
        .map(|(i, app_id)| WatchedAppRow {
            index: i + 1,
            app_id: app_id.clone(),
        })
        .collect();

    println!("Watched apps ({} minute limit)", settings.time_limit_minutes);
    println!("{}", Table::new(rows));
}
