use clap::{Parser, Subcommand};
use fasttrack_core::fitbit::{
    authorize_url, parse_callback, save_token, stored_token, BrokerTokenExchange,
    FitbitWeightApi, TokenExchange,
};
use fasttrack_core::stage::stage;
use fasttrack_core::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fasttrack")]
#[command(about = "Intermittent fasting, weight and calorie tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a fast
    Start,

    /// End the current fast
    Stop,

    /// Show the current fast (default)
    Status,

    /// Follow the current fast, updating every tick
    Watch {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// List past fasts, most recent first
    History {
        /// Show at most this many sessions
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Write completed fasts to a CSV file
    Export {
        /// Destination CSV path
        path: PathBuf,
    },

    /// Weight history and Fitbit sync
    Weight {
        #[command(subcommand)]
        command: Option<WeightCommand>,
    },

    /// Daily calorie log
    Calories {
        #[command(subcommand)]
        command: Option<CalorieCommand>,
    },
}

#[derive(Subcommand)]
enum WeightCommand {
    /// Show weight history (default)
    Show,

    /// Print the Fitbit authorization URL
    Connect,

    /// Finish connecting with the code Fitbit sent back
    Callback {
        /// Authorization code from the redirect
        #[arg(long, required_unless_present = "url", conflicts_with = "url")]
        code: Option<String>,

        /// Full redirect URL, the code is read from its query string
        #[arg(long)]
        url: Option<String>,
    },

    /// Replace local weight history with the last window from Fitbit
    Sync,
}

#[derive(Subcommand)]
enum CalorieCommand {
    /// Show calorie history (default)
    Show,

    /// Record calories eaten today
    Add {
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Set the daily calorie target
    Target {
        target: u32,
    },
}

type Machine = FastingMachine<FileStore, SystemClock, ConsoleNotifier>;

fn main() -> Result<()> {
    // Initialize logging
    fasttrack_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    // Determine data directory
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let store_path = data_dir.join("store.json");

    match cli.command {
        Some(Commands::Start) => cmd_start(&store_path),
        Some(Commands::Stop) => cmd_stop(&store_path),
        Some(Commands::Status) | None => cmd_status(&store_path, &config),
        Some(Commands::Watch { ticks }) => cmd_watch(&store_path, &config, ticks),
        Some(Commands::History { limit }) => cmd_history(&store_path, limit),
        Some(Commands::Export { path }) => cmd_export(&store_path, &path),
        Some(Commands::Weight { command }) => match command.unwrap_or(WeightCommand::Show) {
            WeightCommand::Show => cmd_weight_show(&store_path),
            WeightCommand::Connect => cmd_weight_connect(&config),
            WeightCommand::Callback { code, url } => {
                cmd_weight_callback(&store_path, &config, code, url.as_deref())
            }
            WeightCommand::Sync => cmd_weight_sync(&store_path, &config),
        },
        Some(Commands::Calories { command }) => match command.unwrap_or(CalorieCommand::Show) {
            CalorieCommand::Show => cmd_calories_show(&store_path, &config),
            CalorieCommand::Add { amount } => cmd_calories_add(&store_path, &config, &amount),
            CalorieCommand::Target { target } => {
                cmd_calories_target(&store_path, &config, target)
            }
        },
    }
}

fn open_machine(store_path: &Path) -> Machine {
    FastingMachine::new(FileStore::open(store_path), SystemClock, ConsoleNotifier)
}

fn today_label() -> String {
    fasttrack_core::clock::month_day_label(chrono::Local::now().date_naive())
}

// ============================================================================
// Fasting
// ============================================================================

fn cmd_start(store_path: &Path) -> Result<()> {
    let mut machine = open_machine(store_path);
    match machine.start()? {
        StartOutcome::Started { .. } => {
            let first = stage(0);
            println!("  Stage: {} ({})", first.title, first.label);
        }
        StartOutcome::AlreadyFasting { start_time } => {
            let elapsed = elapsed_since(machine.clock(), start_time);
            println!("Already fasting ({} elapsed).", format_duration(elapsed));
        }
    }
    Ok(())
}

fn cmd_stop(store_path: &Path) -> Result<()> {
    let mut machine = open_machine(store_path);
    if let StopOutcome::NotFasting = machine.stop()? {
        println!("Not fasting - nothing to stop.");
    }
    Ok(())
}

fn cmd_status(store_path: &Path, config: &Config) -> Result<()> {
    let mut machine = open_machine(store_path);
    match machine.tick() {
        Some(sample) => display_sample(&sample, config.fasting.goal_hours),
        None => {
            println!("Not fasting.");
            println!("  Run `fasttrack start` to begin a fast.");
        }
    }
    Ok(())
}

fn cmd_watch(store_path: &Path, config: &Config, ticks: Option<u64>) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .map_err(|e| Error::Other(format!("Failed to install Ctrl-C handler: {}", e)))?;

    let mut machine = open_machine(store_path);
    if !machine.is_fasting() {
        println!("Not fasting.");
        return Ok(());
    }

    let interval = Duration::from_millis(config.fasting.tick_interval_ms);
    let mut count = 0u64;

    while running.load(Ordering::SeqCst) {
        // Another process may have stopped the fast
        machine.store_mut().reload();
        machine.resync();

        let Some(sample) = machine.tick() else {
            println!("\nFast ended.");
            break;
        };

        print!(
            "\r  {}  {:<22} {:>3.0}% of {}h",
            format_duration(sample.elapsed_secs),
            stage(sample.stage).title,
            progress_percent(sample.elapsed_secs, config.fasting.goal_hours).floor(),
            config.fasting.goal_hours
        );
        io::stdout().flush()?;

        count += 1;
        if ticks.is_some_and(|limit| count >= limit) {
            break;
        }
        std::thread::sleep(interval);
    }

    println!();
    tracing::debug!("Watch loop ended after {} ticks", count);
    Ok(())
}

fn cmd_history(store_path: &Path, limit: Option<usize>) -> Result<()> {
    let store = FileStore::open(store_path);
    let sessions = HistoryLog::load(&store).list();

    if sessions.is_empty() {
        println!("No fasting sessions recorded yet");
        return Ok(());
    }

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  FASTING HISTORY");
    println!("╰─────────────────────────────────────────╯");
    for session in sessions.iter().take(limit.unwrap_or(usize::MAX)) {
        let duration = match session.duration {
            Some(secs) => format_duration(secs),
            None => "In Progress".to_string(),
        };
        println!("  {:<12} {}", session.date, duration);
    }
    println!();
    Ok(())
}

fn cmd_export(store_path: &Path, path: &Path) -> Result<()> {
    let store = FileStore::open(store_path);
    let history = HistoryLog::load(&store);
    let count = export_history_csv(&history, path)?;

    println!("✓ Exported {} fasts", count);
    println!("  CSV: {}", path.display());
    Ok(())
}

fn elapsed_since(clock: &impl Clock, start_time: i64) -> u64 {
    (clock.now_millis().saturating_sub(start_time).max(0) / 1000) as u64
}

fn display_sample(sample: &TickSample, goal_hours: u32) {
    let current = stage(sample.stage);
    let percent = progress_percent(sample.elapsed_secs, goal_hours);

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  FASTING  {}", format_duration(sample.elapsed_secs));
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  {}% of {}h", percent.floor(), goal_hours);
    println!();
    println!("  {}  ({})", current.title, current.label);
    println!("  {}", current.description);
    println!();
}

// ============================================================================
// Weight
// ============================================================================

fn cmd_weight_show(store_path: &Path) -> Result<()> {
    let store = FileStore::open(store_path);
    let log = WeightLog::load(&store);

    let Some(latest) = log.latest() else {
        println!("No weight data yet.");
        println!("  Run `fasttrack weight connect` to link a Fitbit scale.");
        return Ok(());
    };

    println!("\n  Current: {:.1}", latest.weight);
    let total = log.total_change();
    if total < 0.0 {
        println!("  ↓ {:.1} since {}", total.abs(), log.entries()[0].date);
    } else if total > 0.0 {
        println!("  ↑ {:.1} since {}", total, log.entries()[0].date);
    } else {
        println!("  No change");
    }

    println!();
    for record in log.recent(3) {
        let change = if record.change < 0.0 {
            format!("↓ {:.1}", record.change.abs())
        } else if record.change > 0.0 {
            format!("↑ {:.1}", record.change)
        } else {
            String::new()
        };
        println!("  {}  {:>6.1}  {}", record.date, record.weight, change);
    }
    println!();
    Ok(())
}

fn cmd_weight_connect(config: &Config) -> Result<()> {
    let url = authorize_url(&config.fitbit)?;
    println!("Open this URL to connect your Fitbit account:\n");
    println!("  {}", url);
    println!("\nThen run `fasttrack weight callback <redirect-url>`.");
    Ok(())
}

fn cmd_weight_callback(
    store_path: &Path,
    config: &Config,
    code: Option<String>,
    url: Option<&str>,
) -> Result<()> {
    let code = match (code, url) {
        (Some(code), _) => code,
        (None, Some(url)) => parse_callback(url)?,
        (None, None) => return Err(Error::Validation("pass --code or --url".into())),
    };

    let exchange = BrokerTokenExchange::from_config(&config.fitbit)?;
    let response = exchange.exchange(&code)?;

    let mut store = FileStore::open(store_path);
    save_token(&mut store, &response, SystemClock.now_millis())?;

    println!("✓ Fitbit Connected");
    println!("  Your scale is now linked. Run `fasttrack weight sync`.");
    Ok(())
}

fn cmd_weight_sync(store_path: &Path, config: &Config) -> Result<()> {
    let mut store = FileStore::open(store_path);
    let token = stored_token(&store, SystemClock.now_millis()).ok_or_else(|| {
        Error::Sync("not connected to Fitbit, run `fasttrack weight connect`".into())
    })?;

    let today = chrono::Local::now().date_naive();
    let log = sync_weight(
        &mut store,
        &FitbitWeightApi::default(),
        &token,
        today,
        &config.fitbit.period,
    )?;

    println!("✓ Synced {} weight entries", log.len());
    Ok(())
}

// ============================================================================
// Calories
// ============================================================================

fn cmd_calories_show(store_path: &Path, config: &Config) -> Result<()> {
    let store = FileStore::open(store_path);
    let log = CalorieLog::load(&store, config.calories.default_target);

    println!("\n  Target:  {}", log.target());
    println!("  Average: {}", log.average());

    if log.latest().is_none() {
        println!("\n  No calories logged yet.");
        return Ok(());
    }

    println!();
    for record in log.recent(3) {
        let change = if record.change < 0 {
            format!("{} under", record.change.abs())
        } else if record.change > 0 {
            format!("{} over", record.change)
        } else {
            "on target".to_string()
        };
        println!("  {}  {:>5}  {}", record.date, record.calories, change);
    }
    println!();
    Ok(())
}

fn cmd_calories_add(store_path: &Path, config: &Config, amount: &str) -> Result<()> {
    let mut store = FileStore::open(store_path);
    let mut log = CalorieLog::load(&store, config.calories.default_target);

    let record = log.add_entry(&mut store, amount, &today_label())?;
    println!("✓ Calories Added");
    println!("  {} calories recorded for today.", record.calories);
    Ok(())
}

fn cmd_calories_target(store_path: &Path, config: &Config, target: u32) -> Result<()> {
    let mut store = FileStore::open(store_path);
    let mut log = CalorieLog::load(&store, config.calories.default_target);

    log.set_target(&mut store, target)?;
    println!("✓ Calorie Target Updated");
    println!("  Your daily target is now {} calories.", target);
    Ok(())
}
