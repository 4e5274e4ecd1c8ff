//! `datastory-poll` -- follow a DataStory job from the terminal.
//!
//! Polls the job's status until it completes or fails, printing one line
//! per observed change. Exits `0` when the job completes, `1` otherwise.
//!
//! ```text
//! datastory-poll <job-id>
//! ```
//!
//! # Environment variables
//!
//! | Variable            | Required | Default                 | Description                         |
//! |---------------------|----------|-------------------------|-------------------------------------|
//! | `DATASTORY_API_URL` | no       | `http://localhost:3000` | API root                            |
//! | `DATASTORY_TOKEN`   | yes      | --                      | Bearer token                        |
//! | `POLL_INTERVAL_MS`  | no       | `2000`                  | Milliseconds between polls, > 0     |
//! | `AUTO_RETRY`        | no       | `false`                 | Retry failed jobs that allow it     |

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use datastory_core::status_view::JobStatusView;
use datastory_core::types::{JobId, StoryId};
use datastory_poller::{HttpStatusClient, PollError, PollObserver, PollOutcome, Poller, PollerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_INTERVAL_MS: u64 = 2000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "datastory_poller=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(PollOutcome::Completed { .. }) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("datastory-poll failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<PollOutcome> {
    let Some(arg) = std::env::args().nth(1) else {
        bail!("usage: datastory-poll <job-id>");
    };
    let job_id: JobId = arg
        .parse()
        .with_context(|| format!("'{arg}' is not a job id"))?;

    let api_url = std::env::var("DATASTORY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
    let token = std::env::var("DATASTORY_TOKEN").context("DATASTORY_TOKEN must be set")?;
    let interval_ms = match std::env::var("POLL_INTERVAL_MS") {
        Ok(raw) => parse_interval_ms(&raw)?,
        Err(_) => DEFAULT_INTERVAL_MS,
    };
    let auto_retry = std::env::var("AUTO_RETRY")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let client = HttpStatusClient::new(&api_url, token, REQUEST_TIMEOUT)
        .context("failed to build HTTP client")?;
    let poller = Poller::new(
        client,
        PollerConfig {
            interval: Duration::from_millis(interval_ms),
            ..PollerConfig::default()
        },
    );

    tracing::info!(job_id = %job_id, api_url = %api_url, interval_ms, auto_retry, "Polling job");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let mut console = Console {
        auto_retry,
        last: None,
    };
    let outcome = poller.watch(job_id, &mut console, &cancel).await;

    match &outcome {
        PollOutcome::Completed { .. } | PollOutcome::Failed(_) => {}
        PollOutcome::NotFound => println!("Job {job_id} not found"),
        PollOutcome::Forbidden => println!("Job {job_id} belongs to another user"),
        PollOutcome::Unauthorized => println!("Token rejected by {api_url}"),
        PollOutcome::Cancelled => println!("Stopped watching job {job_id}"),
    }
    Ok(outcome)
}

fn parse_interval_ms(raw: &str) -> anyhow::Result<u64> {
    let ms: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("POLL_INTERVAL_MS '{raw}' is not a number of milliseconds"))?;
    if ms == 0 {
        bail!("POLL_INTERVAL_MS must be greater than zero");
    }
    Ok(ms)
}

/// Prints status changes to stdout.
struct Console {
    auto_retry: bool,
    last: Option<(String, u8)>,
}

impl PollObserver for Console {
    fn on_status(&mut self, view: &JobStatusView) {
        let stage = view
            .current_stage
            .map(|s| s.to_string())
            .unwrap_or_else(|| view.status.to_string());
        let key = (stage, view.progress);
        if self.last.as_ref() != Some(&key) {
            println!("[{:>3}%] {}", view.progress, key.0);
            self.last = Some(key);
        }
    }

    fn on_poll_error(&mut self, error: &PollError) {
        println!("  (status unavailable: {error}; still waiting)");
    }

    fn on_completed(&mut self, _view: &JobStatusView) {
        println!("Story ready");
    }

    fn navigate_to_story(&mut self, story_id: StoryId) {
        println!("Story: {story_id}");
    }

    fn on_failed(&mut self, view: &JobStatusView) {
        if let Some(error) = &view.error {
            println!("Failed [{}]: {}", error.code, error.message);
        }
        if view.can_retry && !self.auto_retry {
            println!(
                "Retry available (attempt {}/{}); set AUTO_RETRY=true to retry",
                view.attempts, view.max_attempts
            );
        }
    }

    fn should_retry(&mut self, _view: &JobStatusView) -> bool {
        if self.auto_retry {
            self.last = None;
            println!("Retrying");
        }
        self.auto_retry
    }

    fn on_retry_deferred(&mut self, _error: &PollError) {
        println!("  (retry cooldown active; trying again shortly)");
    }

    fn on_retry_rejected(&mut self, error: &PollError) {
        println!("Retry rejected: {error}");
    }
}
