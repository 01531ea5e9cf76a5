//! Speaking Console CLI
//!
//! Terminal front end for the IELTS speaking-practice console:
//! - Admin: login/logout, question counts, question bank CRUD, usage metrics
//! - Practice: read a part's questions with visit tracking

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use speaking_console::{
    config::generate_default_config, AdminConsole, Config, ConsoleContext, ConsoleSpeaker,
    LoggingConfig, Part, PartPage, Route,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const ADMIN_WARNING: &str =
    "This section is for admin use only. Proceed only if you have the credentials.";

/// Grace period for the visit beacon before the process exits
const BEACON_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "speaking-console")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "IELTS speaking practice console")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API origin, overrides config
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Acknowledge the admin-only warning without prompting
    #[arg(long, global = true)]
    pub proceed: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in as admin and store the token
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },

    /// Forget the stored admin token
    Logout,

    /// Show session and device status
    Status,

    /// Question totals per part
    Counts,

    /// List questions grouped by part
    Questions {
        /// Only this part
        part: Option<Part>,
    },

    /// Add a question
    Add { part: Part, question: String },

    /// Replace a question's text
    Edit {
        part: Part,
        id: u64,
        question: String,
    },

    /// Delete a question
    Delete { part: Part, id: u64 },

    /// Usage metrics dashboard
    Metrics,

    /// Practice a part interactively
    Practice { part: Part },

    /// List the practice pages
    Pages,

    /// Print this install's device id
    DeviceId,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, report) = match &cli.config {
        Some(path) => (Config::load_with_env(path)?, None),
        None => {
            let (config, report) = Config::discover(&Config::default_paths());
            (config, Some(report))
        }
    };
    if let Some(url) = &cli.api_url {
        config.api.url = url.clone();
    }

    init_tracing(&config.logging);
    if let Some(report) = report {
        report.log();
    }

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Wrote {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let ctx = ConsoleContext::from_config(config)?;

    match cli.command {
        Commands::Login { username, password } => {
            let mut console = open_admin(&ctx, cli.proceed)?;
            if !console.login(&username, &password).await {
                bail!(banner(&console));
            }
            println!("Logged in.");
        }

        Commands::Logout => {
            let mut console = ctx.admin_console();
            let route = console.logout();
            println!("Logged out. Back to {}", route);
        }

        Commands::Status => {
            let mut store = ctx.session_store();
            store.restore()?;
            let identity = ctx.device_identity()?;
            println!("API:        {}", ctx.config().api.url);
            println!("Admin:      {}", if store.session().token.is_some() { "token stored" } else { "not logged in" });
            println!("Device id:  {}", identity.device_id);
        }

        Commands::Counts => {
            let mut console = open_admin(&ctx, cli.proceed)?;
            if !console.load_counts().await {
                bail!(banner(&console));
            }
            let counts = console.bank().counts();
            for part in Part::ALL {
                println!("{}: {} questions", part.label(), counts.get(part));
            }
        }

        Commands::Questions { part } => {
            let mut console = open_admin(&ctx, cli.proceed)?;
            if !console.load_questions().await {
                bail!(banner(&console));
            }
            print_questions(&console, part);
        }

        Commands::Add { part, question } => {
            let mut console = open_admin(&ctx, cli.proceed)?;
            if !console.add_question(part, &question).await {
                bail!(banner(&console));
            }
            print_notice(&mut console);
        }

        Commands::Edit { part, id, question } => {
            let mut console = open_admin(&ctx, cli.proceed)?;
            if !console.edit_question(part, id, &question).await {
                bail!(banner(&console));
            }
            print_notice(&mut console);
        }

        Commands::Delete { part, id } => {
            let mut console = open_admin(&ctx, cli.proceed)?;
            if !console.delete_question(part, id).await {
                bail!(banner(&console));
            }
            print_notice(&mut console);
        }

        Commands::Metrics => {
            let mut console = open_admin(&ctx, cli.proceed)?;
            if !console.load_metrics().await {
                bail!(banner(&console));
            }
            print_metrics(&console);
        }

        Commands::Practice { part } => {
            practice(&ctx, part).await?;
        }

        Commands::Pages => {
            println!("IELTS Speaking Practice");
            for route in Route::landing_links() {
                if let Route::Part(part) = route {
                    println!("  {:<8} speaking-console practice {:<6} ({})", part.label(), part, route);
                }
            }
            println!("  {:<8} speaking-console --help ({})", "Admin", Route::Admin);
        }

        Commands::DeviceId => {
            println!("{}", ctx.device_identity()?.device_id);
        }

        Commands::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("speaking_console={}", config.level)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Restore the session and pass the admin-only warning
fn open_admin(ctx: &ConsoleContext, proceed: bool) -> anyhow::Result<AdminConsole> {
    let mut console = ctx.admin_console();
    if !console.restore() {
        bail!(banner(&console));
    }

    if !proceed {
        println!("Warning: {}", ADMIN_WARNING);
        print!("Proceed? [y/N] ");
        std::io::stdout().flush()?;

        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            bail!("Cancelled. Back to {}", Route::Landing);
        }
    }

    console.acknowledge_warning();
    Ok(console)
}

fn banner(console: &AdminConsole) -> String {
    console.error().unwrap_or("Unknown error").to_string()
}

fn print_notice(console: &mut AdminConsole) {
    if let Some(notice) = console.take_notice() {
        println!("{}", notice);
    }
}

fn print_questions(console: &AdminConsole, only: Option<Part>) {
    let groups = console.bank().groups();
    if groups.is_empty() {
        println!("No questions.");
        return;
    }

    for (part, entries) in groups {
        if only.is_some_and(|p| p != *part) {
            continue;
        }
        println!("{} Questions", part.as_str().to_uppercase());
        for entry in entries {
            println!("  [{:>4}] {}", entry.id, entry.question);
        }
    }
}

fn print_metrics(console: &AdminConsole) {
    let Some(snapshot) = console.metrics() else {
        return;
    };

    println!("Total Users:          {}", snapshot.total_users);
    println!("Total Visits:         {}", snapshot.total_visits);
    println!("Avg. Time Spent (s):  {:.1}", snapshot.average_time_spent);

    let chart = console.duration_chart();
    if !chart.is_empty() {
        println!();
        println!("Time Spent per User");
        let max = chart.iter().map(|p| p.value).fold(0.0_f64, f64::max);
        for point in &chart {
            let width = if max > 0.0 {
                ((point.value / max) * 40.0).round() as usize
            } else {
                0
            };
            println!("  {:<20} {:>8.0}s {}", point.label, point.value, "#".repeat(width));
        }
    }

    if !snapshot.recent_visits.is_empty() {
        println!();
        println!("Recent Visits");
        println!(
            "  {:>6}  {:<12} {:<36}  {:<6}  {:<20}  {:>8}",
            "Visit", "User", "Device", "Page", "Timestamp", "Duration"
        );
        for visit in &snapshot.recent_visits {
            println!(
                "  {:>6}  {:<12} {:<36}  {:<6}  {:<20}  {:>8}",
                visit.id,
                visit.user_id,
                visit.device_id,
                visit.page,
                visit.timestamp.as_deref().unwrap_or("-"),
                visit.duration.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            );
        }
    }
}

async fn practice(ctx: &ConsoleContext, part: Part) -> anyhow::Result<()> {
    let speaker = Arc::new(ConsoleSpeaker::stdout());
    let mut page = PartPage::mount(ctx.visit_tracker(), part, speaker).await;

    println!("{}", page.session().title());
    show_current(&page);
    println!("[n]ext  [p]revious  [s]peak  [x] stop  [q]uit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let session = page.session_mut();
        match line.trim() {
            "n" => {
                if session.next() {
                    show_current(&page);
                }
            }
            "p" => {
                if session.previous() {
                    show_current(&page);
                }
            }
            "s" => {
                session.speak();
                // Console speech completes as soon as it is printed
                session.speech_finished();
            }
            "x" => session.stop(),
            "q" => break,
            "" => {}
            other => println!("Unknown command: {}", other),
        }
    }

    if let Some(report) = page.unmount() {
        tracing::info!(
            part = %report.record.part,
            duration = report.record.duration_seconds,
            "Visit ended"
        );
        // The beacon is detached; give it a moment before the runtime shuts down
        if let Some(beacon) = report.beacon {
            let _ = tokio::time::timeout(BEACON_GRACE, beacon).await;
        }
    }

    println!("Back to {}", Route::Landing);
    Ok(())
}

fn show_current(page: &PartPage) {
    let session = page.session();
    println!("{}", session.progress());
    if let Some(question) = session.current() {
        println!("  {}", question);
    }
}
