use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;

use tickler_core::{
    builtin_templates, ClockTime, Frequency, OfficeWindow, RecurrenceRule, TicklerConfig,
    WeekdaySet,
};
use tickler_scheduler::SchedulerEngine;

#[derive(Parser)]
#[command(name = "tickler", about = "Recurring-reminder scheduler", version)]
struct Cli {
    /// Config file path (defaults to tickler.toml; TICKLER_* env overrides).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a reminder.
    Add {
        /// Title, e.g. "Drink Water". Optional when --template is given.
        title: Option<String>,

        /// Start from a built-in template (haircut, wash, water).
        #[arg(long)]
        template: Option<String>,

        /// Display glyph.
        #[arg(long, default_value = "⏰")]
        icon: String,

        /// hourly, daily, every3days, weekly or monthly.
        #[arg(long, default_value = "daily")]
        frequency: String,

        /// Time of day as HH:MM (ignored for hourly).
        #[arg(long, default_value = "09:00")]
        time: String,

        /// Allowed weekdays, 0=Sunday .. 6=Saturday (default: every day).
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<u8>>,

        /// Office-window start as HH:MM (hourly only).
        #[arg(long)]
        office_start: Option<String>,

        /// Office-window end as HH:MM, exclusive (hourly only).
        #[arg(long)]
        office_end: Option<String>,
    },

    /// List all reminders with their next due time.
    List,

    /// Edit a reminder; omitted flags keep their current value.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        frequency: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<u8>>,
        #[arg(long)]
        office_start: Option<String>,
        #[arg(long)]
        office_end: Option<String>,
    },

    /// Mark a reminder done (advances its next due time).
    Done { id: String },

    /// Delete a reminder.
    Rm { id: String },

    /// Show recent completions.
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Arm all timers and deliver due reminders to the terminal until Ctrl-C.
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tickler=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = TicklerConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({e}), using defaults");
        TicklerConfig::default()
    });

    let conn = Connection::open(&config.database.path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    match cli.command {
        Command::Add {
            title,
            template,
            icon,
            frequency,
            time,
            days,
            office_start,
            office_end,
        } => {
            let mut engine = SchedulerEngine::new(conn, None)?;
            let reminder = if let Some(name) = template {
                let template = builtin_templates()
                    .into_iter()
                    .find(|t| t.name == name)
                    .ok_or_else(|| anyhow::anyhow!("unknown template: {name}"))?;
                engine.create(
                    title.as_deref().unwrap_or(template.title),
                    template.icon,
                    template.rule,
                )?
            } else {
                let title = title.ok_or_else(|| anyhow::anyhow!("a title is required"))?;
                let rule = build_rule(&frequency, &time, days.as_deref(), office_start, office_end)?;
                engine.create(&title, &icon, rule)?
            };
            println!(
                "{} {} [{}] next due {}",
                reminder.icon, reminder.title, reminder.id, reminder.next_due
            );
        }

        Command::List => {
            let engine = SchedulerEngine::new(conn, None)?;
            let reminders = engine.list()?;
            if reminders.is_empty() {
                println!("no reminders");
            }
            for r in reminders {
                println!(
                    "{} {} [{}] {} days={:?} next due {} ({} done)",
                    r.icon,
                    r.title,
                    r.id,
                    r.rule.frequency,
                    r.rule.weekdays.days(),
                    r.next_due,
                    r.completed_count,
                );
            }
        }

        Command::Edit {
            id,
            title,
            icon,
            frequency,
            time,
            days,
            office_start,
            office_end,
        } => {
            let mut engine = SchedulerEngine::new(conn, None)?;
            let current = engine.get(&id)?;
            let rule = patch_rule(
                current.rule,
                frequency,
                time,
                days.as_deref(),
                office_start,
                office_end,
            )?;
            let updated = engine.update(&id, title, icon, Some(rule))?;
            println!(
                "{} {} next due {}",
                updated.icon, updated.title, updated.next_due
            );
        }

        Command::Done { id } => {
            let mut engine = SchedulerEngine::new(conn, None)?;
            let reminder = engine.toggle_complete(&id)?;
            println!(
                "{} {} done ({} total), next due {}",
                reminder.icon, reminder.title, reminder.completed_count, reminder.next_due
            );
        }

        Command::Rm { id } => {
            let mut engine = SchedulerEngine::new(conn, None)?;
            engine.remove(&id)?;
            println!("removed {id}");
        }

        Command::History { limit } => {
            let engine = SchedulerEngine::new(conn, None)?;
            let entries = engine.history(limit)?;
            if entries.is_empty() {
                println!("no history yet");
            }
            for e in entries {
                println!("{} {} {} at {}", e.completed_at, e.icon, e.title, e.id);
            }
        }

        Command::Run => run(conn, &config).await?,
    }

    Ok(())
}

/// Arm every reminder and print deliveries to the terminal until Ctrl-C.
async fn run(conn: Connection, config: &TicklerConfig) -> anyhow::Result<()> {
    let (fired_tx, mut fired_rx) = tokio::sync::mpsc::channel(config.delivery.buffer);
    let mut engine = SchedulerEngine::new(conn, Some(fired_tx))?;
    let armed = engine.arm_all()?;
    info!(count = armed, "watching reminders");

    tokio::spawn(async move {
        while let Some(r) = fired_rx.recv().await {
            println!("🔔 {} {} (next at {})", r.icon, r.title, r.next_due);
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    engine.run(shutdown_rx).await;
    Ok(())
}

fn build_rule(
    frequency: &str,
    time: &str,
    days: Option<&[u8]>,
    office_start: Option<String>,
    office_end: Option<String>,
) -> anyhow::Result<RecurrenceRule> {
    let frequency: Frequency = frequency.parse()?;
    let time_of_day: ClockTime = time.parse()?;
    let weekdays = match days {
        Some(days) => WeekdaySet::from_days(days)?,
        None => WeekdaySet::EVERY_DAY,
    };
    let office_hours = parse_window(office_start, office_end)?;
    Ok(RecurrenceRule {
        frequency,
        time_of_day,
        weekdays,
        office_hours,
    })
}

fn patch_rule(
    mut rule: RecurrenceRule,
    frequency: Option<String>,
    time: Option<String>,
    days: Option<&[u8]>,
    office_start: Option<String>,
    office_end: Option<String>,
) -> anyhow::Result<RecurrenceRule> {
    if let Some(frequency) = frequency {
        rule.frequency = frequency.parse()?;
    }
    if let Some(time) = time {
        rule.time_of_day = time.parse()?;
    }
    if let Some(days) = days {
        rule.weekdays = WeekdaySet::from_days(days)?;
    }
    if let Some(window) = parse_window(office_start, office_end)? {
        rule.office_hours = Some(window);
    }
    Ok(rule)
}

fn parse_window(
    start: Option<String>,
    end: Option<String>,
) -> anyhow::Result<Option<OfficeWindow>> {
    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(OfficeWindow {
            start: start.parse::<ClockTime>()?,
            end: end.parse::<ClockTime>()?,
        })),
        (None, None) => Ok(None),
        _ => anyhow::bail!("--office-start and --office-end must be given together"),
    }
}
