#![allow(clippy::print_stdout, reason = "command output goes to stdout")]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deskfocus_lib::blocklist::{HostBlocker, HostsFileBlocker};
use deskfocus_lib::config::Config;
use deskfocus_lib::db::ActivityStore;
use deskfocus_lib::focus::SessionSummary;
use deskfocus_lib::validation::{split_list, validate_hostname};
use deskfocus_lib::{report, App};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

const WAIT_SLICE: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "deskfocus", version)]
#[command(about = "Log the focused window and run focus sessions that block distracting apps and websites")]
struct Args {
    #[arg(long, global = true, help = "Config file. Defaults to config.json in the platform config dir")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Sample the focused window until Enter is pressed")]
    Track,
    #[command(about = "Save focus settings and run a session until they end or Enter is pressed")]
    Focus(FocusArgs),
    #[command(about = "Show the focus settings in effect")]
    Settings,
    #[command(about = "Number of samples per day")]
    Report {
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    #[command(about = "Latest samples, newest first")]
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    #[command(about = "Remove block-list entries left behind by an interrupted session")]
    Unblock {
        #[arg(long, help = "Comma-separated hostnames")]
        sites: String,
    },
}

#[derive(clap::Args, Debug)]
struct FocusArgs {
    #[arg(long, help = "Start of the focus window, HH:MM")]
    start: String,
    #[arg(long, help = "End of the focus window, HH:MM")]
    end: String,
    #[arg(long, default_value = "", help = "Comma-separated window title substrings to minimize")]
    apps: String,
    #[arg(long, default_value = "", help = "Comma-separated hostnames to block")]
    sites: String,
    #[arg(long, help = "Session length in seconds instead of running until --end")]
    duration: Option<u64>,
    #[arg(long, help = "Leave the hosts file alone")]
    no_website_blocking: bool,
    #[arg(long, help = "Also sample the focused window during the session")]
    track: bool,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deskfocus=info,deskfocus_lib=info".into()),
        )
        .init();
}

/// Check if a line could be read. EOF and read errors do not count.
fn line_received(mut reader: impl BufRead) -> bool {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => {
            log::debug!("stdin closed, Enter will never arrive");
            false
        }
        Ok(_) => true,
        Err(e) => {
            log::debug!("Failed to read stdin: {e}");
            false
        }
    }
}

/// Fires once when Enter is pressed. When stdin is closed nothing is sent
/// and the channel disconnects.
fn enter_pressed() -> Receiver<()> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        if line_received(io::stdin().lock()) {
            let _ = tx.send(());
        }
    });
    rx
}

fn print_summary(summary: &SessionSummary) {
    println!(
        "Focus session ended ({:?}) after {} minute(s); unblocked: {}",
        summary.reason,
        (summary.ended_at - summary.started_at).num_minutes(),
        if summary.blocked_websites.is_empty() {
            "nothing".to_string()
        } else {
            summary.blocked_websites.join(", ")
        }
    );
}

fn track(config: &Config) -> Result<()> {
    let app = App::open(config, false)?;
    app.sampler.start_tracking();
    println!("Tracking the focused window. Press Enter to stop.");

    if enter_pressed().recv().is_err() {
        println!("stdin is closed; tracking until the process is stopped.");
        loop {
            thread::park();
        }
    }
    app.sampler.stop_tracking();

    let samples = app.sampler.recent_samples();
    println!("Logged {} sample(s).", samples.len());
    for sample in samples.iter().rev().take(5) {
        println!("{}  {}", sample.timestamp, sample.window_title);
    }
    Ok(())
}

fn focus(mut config: Config, args: &FocusArgs) -> Result<()> {
    if args.duration.is_some() {
        config.fixed_session_secs = args.duration;
    }
    let app = App::open(&config, !args.no_website_blocking)?;

    let settings = app
        .store
        .save_focus_settings(&args.start, &args.end, &args.apps, &args.sites)
        .context("Invalid focus settings")?;
    let state = app.focus.start_from_settings(&settings)?;
    if args.track {
        app.sampler.start_tracking();
    }

    if let Some(ends_at) = state.ends_at {
        println!(
            "Focus session running until {}. Press Enter to end it early.",
            ends_at.format("%H:%M:%S")
        );
    }

    let enter = enter_pressed();
    let summary = loop {
        if let Some(summary) = app.focus.wait_for_expiry(WAIT_SLICE) {
            break Some(summary);
        }
        // A closed stdin disconnects the channel; keep waiting for expiry.
        if enter.try_recv().is_ok() {
            break app.focus.end_session();
        }
    };

    app.sampler.stop_tracking();
    if let Some(summary) = summary {
        print_summary(&summary);
    }
    Ok(())
}

fn show_settings(config: &Config) -> Result<()> {
    let app = App::open(config, false)?;
    match app.store.latest_focus_settings()? {
        Some(settings) => println!("{}", serde_json::to_string_pretty(&settings)?),
        None => println!("No focus settings saved yet."),
    }
    Ok(())
}

fn show_report(config: &Config, json: bool) -> Result<()> {
    let app = App::open(config, false)?;
    let report = report::activity_report(app.store.as_ref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if report.days.is_empty() {
        println!("No activity logged yet.");
        return Ok(());
    }
    for day in &report.days {
        println!("{}  {:>6}", day.date, day.count);
    }
    println!("total       {:>6}", report.total_samples);
    Ok(())
}

fn show_recent(config: &Config, limit: usize) -> Result<()> {
    let app = App::open(config, false)?;
    for record in report::recent_activity(app.store.as_ref(), limit)? {
        println!("{}  {}", record.timestamp, record.window_title);
    }
    Ok(())
}

fn unblock(config: &Config, sites: &str) -> Result<()> {
    let blocker = HostsFileBlocker::new(&config.hosts_path, &config.redirect_ip);
    println!("Cleaning {}", blocker.path().display());
    for site in split_list(sites) {
        let host = validate_hostname(&site)?;
        let removed = blocker
            .unblock(&host)
            .with_context(|| format!("Failed to unblock {host}"))?;
        println!("{host}: removed {removed} entr{}", if removed == 1 { "y" } else { "ies" });
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    match args.command {
        Command::Track => track(&config),
        Command::Focus(focus_args) => focus(config, &focus_args),
        Command::Settings => show_settings(&config),
        Command::Report { json } => show_report(&config, json),
        Command::Recent { limit } => show_recent(&config, limit),
        Command::Unblock { sites } => unblock(&config, &sites),
    }
}
