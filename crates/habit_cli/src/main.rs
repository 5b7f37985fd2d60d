//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `habit_core` linkage.
//! - Optionally list habits stored at `HABIT_TRACKER_DB_PATH`.

use habit_core::db::open_db;
use habit_core::{HabitStore, SqliteHabitStore};
use std::process::ExitCode;

const DB_PATH_ENV: &str = "HABIT_TRACKER_DB_PATH";

fn main() -> ExitCode {
    println!("habit_core ping={}", habit_core::ping());
    println!("habit_core version={}", habit_core::core_version());

    let Some(path) = std::env::var_os(DB_PATH_ENV) else {
        return ExitCode::SUCCESS;
    };

    let habits = match open_db(&path) {
        Ok(conn) => {
            let store = SqliteHabitStore::new(&conn);
            store.list().map_err(|err| err.to_string())
        }
        Err(err) => Err(err.to_string()),
    };
    match habits {
        Ok(habits) => {
            println!("habits={}", habits.len());
            for habit in habits {
                println!(
                    "{} {} days={} reminder={}",
                    habit.id,
                    habit.color,
                    habit.weekdays.symbols().join(","),
                    if habit.reminder_enabled {
                        habit.reminder_time.format("%H:%M").to_string()
                    } else {
                        "off".to_string()
                    }
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to read habits: {err}");
            ExitCode::FAILURE
        }
    }
}
