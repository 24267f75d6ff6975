//! SUDEPmonitor CLI
//!
//! Browse cached user records and derive HRV and movement statistics.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sudep_monitor::{
    config::Config,
    core::{
        beat_interval_histogram, difference_histogram, DateKey, EventDetector, HrvAnalyzer,
        VarianceTable, ZeroDispersionPolicy,
    },
    BlockingFirebaseStore, JsonTreeStore, LocalCache, RemoteStore, SessionRecord, UserDirectory,
    UserRecord, VERSION,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sudep-monitor")]
#[command(version = VERSION)]
#[command(about = "Local cache and HRV analysis for SUDEPmonitor recordings", long_about = None)]
struct Cli {
    /// Read from a JSON export of the database instead of the remote store
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Cache directory (overrides the configured one)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List user ids known to the database
    Users,

    /// Show a user's profile, events and sessions
    User {
        id: String,

        /// Rebuild the cached record from the database
        #[arg(long)]
        reload: bool,
    },

    /// List a user's session dates
    Sessions {
        id: String,

        /// Print dates as dd.MM.yy hh:mm:ss
        #[arg(long)]
        readable: bool,
    },

    /// Print the CSI trace of a session
    Csi {
        id: String,

        /// Session date token (ddMMyyhhmmss)
        date: String,

        /// Window length in beats
        #[arg(long)]
        window: Option<usize>,

        /// Drop windows with zero SD1 instead of reporting a ratio of 1
        #[arg(long)]
        exclude_zero: bool,
    },

    /// Print Lorenz plot points (ms) and Poincaré descriptors of a session
    Lorenz { id: String, date: String },

    /// Flag high-variance movement in a session's accelerometer data
    Detect {
        id: String,
        date: String,

        /// Window length in seconds
        #[arg(long)]
        seconds: Option<f64>,

        /// Variance threshold (G²)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Histograms of accelerometer changes and beat intervals, as JSON
    Histogram {
        id: String,
        date: String,

        /// Block size for averaging differences before binning
        #[arg(long, default_value = "1")]
        block: usize,

        /// Number of histogram edges
        #[arg(long, default_value = "40")]
        edges: usize,
    },

    /// Write the mean accelerometer variance statistics of several sessions
    VarianceTable {
        id: String,

        /// Session date tokens
        #[arg(required = true)]
        dates: Vec<String>,

        /// Output file
        #[arg(long, short)]
        output: PathBuf,

        /// Window length in samples
        #[arg(long)]
        window: Option<usize>,
    },

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file and create
        /// the cache directory
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr, command output to stdout
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sudep_monitor=info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }

    if let Commands::Config { init } = cli.command {
        return cmd_config(&config, init);
    }

    let store = open_store(cli.snapshot.as_deref(), &config)?;
    let app = App {
        store: store.as_ref(),
        config: &config,
    };

    match cli.command {
        Commands::Users => cmd_users(&app),
        Commands::User { id, reload } => cmd_user(&app, &id, reload),
        Commands::Sessions { id, readable } => cmd_sessions(&app, &id, readable),
        Commands::Csi {
            id,
            date,
            window,
            exclude_zero,
        } => cmd_csi(&app, &id, &date, window, exclude_zero),
        Commands::Lorenz { id, date } => cmd_lorenz(&app, &id, &date),
        Commands::Detect {
            id,
            date,
            seconds,
            threshold,
        } => cmd_detect(&app, &id, &date, seconds, threshold),
        Commands::Histogram {
            id,
            date,
            block,
            edges,
        } => cmd_histogram(&app, &id, &date, block, edges),
        Commands::VarianceTable {
            id,
            dates,
            output,
            window,
        } => cmd_variance_table(&app, &id, &dates, &output, window),
        Commands::Config { .. } => Ok(()),
    }
}

/// Shared state for commands.
struct App<'a> {
    store: &'a dyn RemoteStore,
    config: &'a Config,
}

impl App<'_> {
    /// Get a user record, reading the user list only when the cache misses.
    fn user(&self, id: &str, reload: bool) -> Result<UserRecord> {
        let mut cache = LocalCache::new(&self.config.cache_dir, UserDirectory::default());
        if reload || !cache.contains(id) {
            let directory = UserDirectory::fetch(self.store).context("Failed to read user list")?;
            cache.set_directory(directory);
        }

        match cache.fetch(self.store, id, reload)? {
            Some(user) => Ok(user),
            None => bail!("User '{id}' does not exist in the database"),
        }
    }

    fn session(&self, id: &str, date: &str) -> Result<(UserRecord, DateKey)> {
        let user = self.user(id, false)?;
        let key = DateKey::parse(date)?;
        Ok((user, key))
    }
}

fn open_store(snapshot: Option<&Path>, config: &Config) -> Result<Box<dyn RemoteStore>> {
    match snapshot {
        Some(path) => {
            let store = JsonTreeStore::from_file(path)
                .with_context(|| format!("Failed to open snapshot {}", path.display()))?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(BlockingFirebaseStore::new(config.remote_config())?)),
    }
}

fn session_of<'u>(user: &'u UserRecord, key: &DateKey) -> Result<&'u SessionRecord> {
    user.session(key)
        .with_context(|| format!("No session at {}", key.format_readable()))
}

fn cmd_users(app: &App) -> Result<()> {
    let directory = UserDirectory::fetch(app.store).context("Failed to read user list")?;
    for id in directory.ids() {
        println!("{id}");
    }
    Ok(())
}

fn cmd_user(app: &App, id: &str, reload: bool) -> Result<()> {
    let user = app.user(id, reload)?;
    println!("{user}");
    Ok(())
}

fn cmd_sessions(app: &App, id: &str, readable: bool) -> Result<()> {
    let user = app.user(id, false)?;
    for date in &user.dates {
        let label = if readable {
            date.format_readable()
        } else {
            date.to_string()
        };
        match user.session(date) {
            Some(session) => println!("{label}\n{}", session.summary()),
            None => println!("{label}"),
        }
    }
    Ok(())
}

fn cmd_csi(
    app: &App,
    id: &str,
    date: &str,
    window: Option<usize>,
    exclude_zero: bool,
) -> Result<()> {
    let (user, key) = app.session(id, date)?;
    let heart = session_of(&user, &key)?
        .heart_data
        .as_present()
        .context("Session has no heart-rate data")?;

    let policy = if exclude_zero {
        ZeroDispersionPolicy::Exclude
    } else {
        app.config.zero_dispersion
    };
    let analyzer = HrvAnalyzer::new(window.unwrap_or(app.config.csi_window), policy);
    let trace = analyzer.csi_trace(heart)?;

    println!("time_s\tcsi");
    for (t, v) in trace.times.iter().zip(&trace.values) {
        println!("{t:.3}\t{v:.6}");
    }
    Ok(())
}

fn cmd_lorenz(app: &App, id: &str, date: &str) -> Result<()> {
    let (user, key) = app.session(id, date)?;
    let heart = session_of(&user, &key)?
        .heart_data
        .as_present()
        .context("Session has no heart-rate data")?;

    let analyzer = HrvAnalyzer::default();
    let summary = analyzer.poincare_summary(heart)?;
    println!(
        "# SD1 = {:.3} ms, SD2 = {:.3} ms, centroid = ({:.1}, {:.1}) ms",
        summary.sd1, summary.sd2, summary.centroid_x, summary.centroid_y
    );
    println!("rr_n_ms\trr_n1_ms");
    for (x, y) in analyzer.lorenz_points(heart) {
        println!("{x:.1}\t{y:.1}");
    }
    Ok(())
}

fn cmd_detect(
    app: &App,
    id: &str,
    date: &str,
    seconds: Option<f64>,
    threshold: Option<f64>,
) -> Result<()> {
    let (user, key) = app.session(id, date)?;
    let session = session_of(&user, &key)?;

    let detector = EventDetector::new(
        seconds.unwrap_or(app.config.detection_seconds),
        threshold.unwrap_or(app.config.variance_threshold),
    );
    let detection = detector
        .detect_session(session)?
        .context("Session has no accelerometer data")?;

    println!("Window: {} samples", detection.window);
    for axis in &detection.axes {
        println!("{}: {} flagged samples", axis.axis, axis.flagged_count());
        if let (Some(first), Some(last)) = (axis.flagged_times.first(), axis.flagged_times.last())
        {
            println!("\tfrom {first:.2} s to {last:.2} s");
        }
    }
    Ok(())
}

fn cmd_histogram(app: &App, id: &str, date: &str, block: usize, edges: usize) -> Result<()> {
    let (user, key) = app.session(id, date)?;
    let session = session_of(&user, &key)?;

    let mut out = serde_json::Map::new();
    if let Some(accel) = session.accel_data.as_present() {
        for (axis, signal) in accel.axes() {
            let dist = difference_histogram(signal, block, edges)
                .with_context(|| format!("Failed to summarize axis {axis}"))?;
            out.insert(axis.to_string(), serde_json::to_value(dist)?);
        }
    }
    if let Some(heart) = session.heart_data.as_present() {
        let dist = beat_interval_histogram(heart.heart_rate(), edges)
            .context("Failed to summarize beat intervals")?;
        out.insert("beats".to_string(), serde_json::to_value(dist)?);
    }

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_variance_table(
    app: &App,
    id: &str,
    dates: &[String],
    output: &Path,
    window: Option<usize>,
) -> Result<()> {
    let user = app.user(id, false)?;
    let mut table = VarianceTable::new(window.unwrap_or(app.config.variance_window));

    for date in dates {
        let key = DateKey::parse(date)?;
        let accel = session_of(&user, &key)?
            .accel_data
            .as_present()
            .with_context(|| format!("Session {} has no accelerometer data", key.format_readable()))?;
        table
            .push_session(accel)
            .with_context(|| format!("Session {}", key.format_readable()))?;
    }

    table
        .write_to(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} sessions to {}", table.sessions(), output.display());
    Ok(())
}

fn cmd_config(config: &Config, init: bool) -> Result<()> {
    if init {
        config.save().context("Failed to save configuration")?;
        config
            .ensure_directories()
            .context("Failed to create cache directory")?;
        println!("Initialized {}", Config::config_path().display());
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(config).unwrap_or_else(|_| "Error".to_string())
    );
    Ok(())
}
