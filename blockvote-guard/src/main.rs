use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use blockvote_guard::config::AppConfig;
use blockvote_guard::guard::lists::ModerationLists;
use blockvote_guard::guard::update::ListUpdater;
use blockvote_guard::guard::{sanitize_html, sanitize_poll_input, sanitize_question_input, CompiledLists, Moderator};
use blockvote_guard::limiter::identity::BrowserFingerprint;
use blockvote_guard::limiter::sweep::Sweeper;
use blockvote_guard::limiter::LimiterSet;
use blockvote_guard::{metrics, telemetry, Caller, GuardError, PollGate};
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "blockvote-guard", version, about = "Rate limiting and poll text checks for BlockVote")]
struct Args {
    /// Path to config.yaml (relative paths inside config are resolved against its directory)
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a new poll through the limiter, injection checks and moderation
    CheckPoll {
        #[arg(long)]
        wallet: Option<String>,
        #[arg(long)]
        question: String,
        #[arg(long = "option", required = true)]
        options: Vec<String>,
        /// Submit the same poll this many times
        #[arg(long, default_value_t = 1)]
        attempts: u32,
    },
    /// Attempt votes on a poll and show when the limiter kicks in
    Vote {
        #[arg(long)]
        wallet: Option<String>,
        #[arg(long)]
        poll_id: u64,
        #[arg(long, default_value_t = 1)]
        attempts: u32,
    },
    /// Moderate a single piece of text
    Moderate { text: String },
    /// Show what the sanitizers make of some text
    Sanitize { text: String },
    /// Fallback identifier for a browser without a wallet
    Fingerprint {
        #[arg(long)]
        user_agent: String,
        #[arg(long, default_value = "en-US")]
        language: String,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        tz_offset: i32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let cfg = AppConfig::load(&args.config)?;

    telemetry::init_tracing("blockvote-guard", &cfg.log_dir_path())?;

    let lists = match &cfg.moderation.lists_path {
        Some(p) => ModerationLists::load_from_file(p)?
            .compile()
            .with_context(|| format!("compile moderation lists: {}", p.display()))?,
        None => CompiledLists::builtin(),
    };
    let moderator = Moderator::new(lists);
    let limiters = LimiterSet::new(&cfg.limits)?;
    let gate = PollGate::new(limiters.clone(), moderator.clone());

    let sweeper = Sweeper::new(limiters, Duration::from_secs(cfg.sweep_interval_secs())).start();
    let updater = cfg.moderation.lists_path.clone().map(|p| {
        ListUpdater::new(moderator, p, Duration::from_secs(cfg.lists_hot_reload_secs())).start()
    });

    let ok = run(&gate, args.cmd)?;

    sweeper.stop().await;
    if let Some(u) = updater {
        u.stop().await;
    }

    if args.print_metrics {
        eprintln!("{}", metrics::gather_as_text()?);
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn run(gate: &PollGate, cmd: Command) -> anyhow::Result<bool> {
    match cmd {
        Command::CheckPoll { wallet, question, options, attempts } => {
            let caller = Caller { wallet, fingerprint: None };
            let mut last_ok = false;
            for attempt in 1..=attempts.max(1) {
                let out = match gate.create_poll(&caller, &question, options.as_slice()) {
                    Ok(poll) => json!({ "attempt": attempt, "ok": true, "poll": poll }),
                    Err(e) => error_json(attempt, &e),
                };
                last_ok = out["ok"].as_bool().unwrap_or(false);
                println!("{}", serde_json::to_string(&out)?);
            }
            Ok(last_ok)
        }

        Command::Vote { wallet, poll_id, attempts } => {
            let caller = Caller { wallet, fingerprint: None };
            let mut last_ok = false;
            for attempt in 1..=attempts.max(1) {
                let out = match gate.cast_vote(&caller, poll_id) {
                    Ok(ticket) => json!({ "attempt": attempt, "ok": true, "ticket": ticket }),
                    Err(e) => error_json(attempt, &e),
                };
                last_ok = out["ok"].as_bool().unwrap_or(false);
                println!("{}", serde_json::to_string(&out)?);
            }
            Ok(last_ok)
        }

        Command::Moderate { text } => {
            let r = gate.moderator().moderate_content(&text);
            println!("{}", serde_json::to_string_pretty(&r)?);
            Ok(r.is_allowed)
        }

        Command::Sanitize { text } => {
            let out = json!({
                "html": sanitize_html(&text),
                "poll": sanitize_poll_input(&text),
                "question": sanitize_question_input(&text),
                "suspicious": blockvote_guard::guard::detect_suspicious_patterns(&text),
                "urls_ok": blockvote_guard::guard::validate_urls_in_text(&text),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(true)
        }

        Command::Fingerprint { user_agent, language, width, height, tz_offset } => {
            let fp = BrowserFingerprint {
                user_agent,
                language,
                screen_width: width,
                screen_height: height,
                timezone_offset: tz_offset,
            };
            println!("{}", fp.identifier());
            Ok(true)
        }
    }
}

fn error_json(attempt: u32, e: &GuardError) -> serde_json::Value {
    let mut v = json!({
        "attempt": attempt,
        "ok": false,
        "kind": e.kind_str(),
        "message": e.to_string(),
    });
    match e {
        GuardError::Throttled { reset_time, .. } => {
            v["reset_time"] = json!(format_ts(*reset_time));
        }
        GuardError::Blocked { block_until, .. } => {
            v["block_until"] = json!(format_ts(*block_until));
        }
        GuardError::Rejected { flagged_words, .. } if !flagged_words.is_empty() => {
            v["flagged_words"] = json!(flagged_words);
        }
        _ => {}
    }
    v
}

fn format_ts(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}
