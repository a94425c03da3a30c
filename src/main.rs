/// Command line entry point for the habit status engine
///
/// This file sets up logging, parses command line arguments and runs one
/// engine operation against the SQLite database. Logs go to stderr so that
/// stdout carries only command output.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use habit_status_engine::{HabitEngine, HabitId, HabitType, MutationOutcome, Schedule, Streak};

/// Get the default database path with robust fallback strategy
fn get_default_database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        dirs::home_dir().map(|mut p| {
            p.push(".habit_status");
            p
        }),
        dirs::data_dir().map(|mut p| {
            p.push("habit_status");
            p
        }),
        dirs::config_dir().map(|mut p| {
            p.push("habit_status");
            p
        }),
        std::env::current_dir().ok().map(|mut p| {
            p.push(".habit_status");
            p
        }),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if std::fs::create_dir_all(potential_path).is_ok() {
            // Test if we can write to this directory
            let test_file = potential_path.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file);
                return Ok(potential_path.join("habits.db"));
            }
        }
    }

    // Ultimate fallback: use a temporary directory
    let mut temp_path = std::env::temp_dir();
    temp_path.push("habit_status");
    std::fs::create_dir_all(&temp_path)?;
    temp_path.push("habits.db");

    tracing::warn!("Using temporary directory for database: {}", temp_path.display());
    Ok(temp_path)
}

/// Command line arguments for the habit status engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's home directory
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Evaluate as of this date instead of the local calendar date
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a habit from a JSON schedule (see `schema`)
    Create {
        name: String,
        /// Schedule as JSON
        #[arg(long)]
        schedule: String,
    },
    /// List every habit with its current deviation
    List,
    /// Add a vacation, open-ended when no end date is given
    Vacation {
        habit_id: String,
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
    /// Record how many times the habit was done on a date
    Complete {
        habit_id: String,
        date: NaiveDate,
        #[arg(long, default_value_t = 1.0)]
        times: f64,
    },
    /// Flip a date between done and not done
    Toggle { habit_id: String, date: NaiveDate },
    /// Settle past dates and refresh streaks
    Settle { habit_id: String },
    /// Show statuses for a date range, the last two weeks by default
    Status {
        habit_id: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Show stored streaks and the current one
    Streaks { habit_id: String },
    /// Print the JSON schema of a schedule
    Schema,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging based on command line flags
    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("habit_status_engine={0},habit_status={0}", log_level))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // The schema needs no database
    if let Command::Schema = args.command {
        return print_schema();
    }

    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => get_default_database_path()?,
    };
    info!("Using database at: {}", db_path.display());

    let today = args.today.unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut engine = HabitEngine::open(db_path)?;

    match args.command {
        Command::Create { name, schedule } => {
            let schedule: Schedule = serde_json::from_str(&schedule)?;
            let habit = engine.create_habit(&name, HabitType::YesNo, schedule)?;
            println!("Created habit '{}' with ID: {}", habit.name, habit.id);
        }
        Command::List => {
            for habit in engine.habits()? {
                println!(
                    "{}  {}  deviation {:+}",
                    habit.id, habit.name, habit.schedule_deviation
                );
            }
        }
        Command::Vacation { habit_id, start, end } => {
            let habit_id = HabitId::from_string(&habit_id)?;
            let vacation = engine.add_vacation(&habit_id, start, end, today)?;
            match vacation.end_date {
                Some(end) => println!("Vacation {} from {} to {}", vacation.id, start, end),
                None => println!("Vacation {} from {} until further notice", vacation.id, start),
            }
        }
        Command::Complete { habit_id, date, times } => {
            let habit_id = HabitId::from_string(&habit_id)?;
            let outcome = engine.set_completion(&habit_id, date, times, today)?;
            print_outcome(&outcome);
        }
        Command::Toggle { habit_id, date } => {
            let habit_id = HabitId::from_string(&habit_id)?;
            let outcome = engine.toggle(&habit_id, date, today)?;
            print_outcome(&outcome);
        }
        Command::Settle { habit_id } => {
            let habit_id = HabitId::from_string(&habit_id)?;
            let outcome = engine.settle(&habit_id, today)?;
            print_outcome(&outcome);
        }
        Command::Status { habit_id, from, to } => {
            let habit_id = HabitId::from_string(&habit_id)?;
            let to = to.unwrap_or(today);
            let from = from.unwrap_or(to - chrono::Duration::days(13));
            for (date, status) in engine.statuses_in(&habit_id, from, to, today)? {
                println!("{}  {}", date, status);
            }
        }
        Command::Streaks { habit_id } => {
            let habit_id = HabitId::from_string(&habit_id)?;
            let habit = engine.get_habit(&habit_id)?;
            for streak in engine.streaks(&habit_id)? {
                match streak.end_date {
                    Some(end) => println!("{} .. {}", streak.start_date, end),
                    None => println!("{} .. ongoing", streak.start_date),
                }
            }

            let today_status = engine.status_of(&habit_id, today, today)?;
            let length = engine
                .current_streak(&habit_id, today)?
                .map_or(0, |streak| {
                    streak.length_in_days(today, today_status, habit.schedule.end_date)
                });
            println!("{}", Streak::motivational_message(length));
        }
        Command::Schema => print_schema()?,
    }

    Ok(())
}

fn print_schema() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schemars::schema_for!(Schedule);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn print_outcome(outcome: &MutationOutcome) {
    if let (Some(date), Some(status)) = (outcome.date, outcome.status) {
        println!(
            "{}: {} ({} completed)",
            date,
            status,
            outcome.times_completed.unwrap_or(0.0)
        );
    }
    if let Some(reconciliation) = &outcome.reconciliation {
        println!(
            "{:?}: {} paid for {}",
            reconciliation.kind, reconciliation.payer, reconciliation.borrowed
        );
    }
    println!(
        "{} records written, {} deleted, {} streak changes, deviation {:+}",
        outcome.records_written,
        outcome.records_deleted,
        outcome.streaks_changed,
        outcome.schedule_deviation
    );
}
