use crate::banner::inspect::list_inputs;
use crate::banner::{BrowserSession, ChromeSession, CourseChecker, CourseCode, Navigator};
use crate::cli::Command;
use crate::config::Config;
use crate::monitor::Monitor;
use crate::notify::SmsNotifier;
use crate::signals::{handle_shutdown_signals, shutdown_signal};
use crate::utils::fmt_duration;
use anyhow::{Context, bail};
use std::process::ExitCode;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

const TEST_SMS_BODY: &str = "TEST: seatwatch alerts are working";

/// Main application struct: the loaded configuration and the command to run.
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(self, command: Command) -> ExitCode {
        let result = match command {
            Command::Run => self.run_monitor().await,
            Command::Check { codes } => self.check_once(&codes).await,
            Command::TestSms => self.test_sms().await,
            Command::Inspect => self.inspect().await,
        };

        result.unwrap_or_else(|e| {
            error!(error = ?e, "command failed");
            ExitCode::FAILURE
        })
    }

    /// Check all configured courses every interval until a shutdown signal.
    async fn run_monitor(self) -> anyhow::Result<ExitCode> {
        let twilio = self
            .config
            .validate_monitor()
            .context("Invalid configuration")?;
        let notifier = SmsNotifier::new(twilio).context("Failed to create SMS notifier")?;

        let interval = self.config.interval();
        info!(
            courses = ?self.config.course_codes.iter().map(CourseCode::as_str).collect::<Vec<_>>(),
            interval = fmt_duration(interval),
            headless = self.config.headless,
            profile = ?self.config.chrome_profile_path,
            logged_in_by = if self.config.credentials().is_some() { "credentials" } else { "profile" },
            "monitor configuration loaded"
        );

        let monitor = Monitor::new(
            CourseChecker::new(self.config.check_settings()),
            self.config.course_codes.clone(),
            interval,
            self.config.checks_per_day(),
            self.config.chrome_options(),
            notifier,
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(async move { monitor.run(shutdown_rx).await });

        Ok(handle_shutdown_signals(task, shutdown_tx, self.config.shutdown_timeout).await)
    }

    /// One pass over `codes` (or the configured list), printed to stdout.
    async fn check_once(self, codes: &[String]) -> anyhow::Result<ExitCode> {
        self.config.validate_site().context("Invalid configuration")?;

        let codes: Vec<CourseCode> = if codes.is_empty() {
            self.config.course_codes.clone()
        } else {
            codes.iter().filter_map(|c| c.parse().ok()).collect()
        };
        if codes.is_empty() {
            bail!("no course codes given and COURSE_CODES is empty");
        }

        let session = ChromeSession::launch(&self.config.chrome_options())
            .await
            .context("Failed to launch browser")?;
        let checker = CourseChecker::new(self.config.check_settings());

        let outcome = tokio::select! {
            outcome = checker.check_all(&session, &codes) => Some(outcome),
            _ = shutdown_signal() => None,
        };
        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close browser session");
        }

        match outcome {
            Some(Ok(results)) => {
                for (code, seats) in results {
                    println!("{code}: {seats} seats");
                }
                Ok(ExitCode::SUCCESS)
            }
            Some(Err(e)) => Err(e).context("Browser session failed during check"),
            None => {
                info!("check interrupted");
                Ok(ExitCode::FAILURE)
            }
        }
    }

    async fn test_sms(self) -> anyhow::Result<ExitCode> {
        let twilio = self.config.twilio().context("Invalid configuration")?;
        info!(from = %twilio.from, to = %twilio.to, "sending test message");

        let notifier = SmsNotifier::new(twilio).context("Failed to create SMS notifier")?;
        let sid = notifier
            .send(TEST_SMS_BODY)
            .await
            .context("Failed to send test SMS")?;
        info!(sid = ?sid, "test message accepted");
        Ok(ExitCode::SUCCESS)
    }

    /// Navigate, log in, and list what the page offers.
    async fn inspect(self) -> anyhow::Result<ExitCode> {
        self.config.validate_site().context("Invalid configuration")?;

        let session = ChromeSession::launch(&self.config.chrome_options())
            .await
            .context("Failed to launch browser")?;
        let result = Self::inspect_page(&self.config, &session).await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close browser session");
        }
        result.map(|()| ExitCode::SUCCESS)
    }

    async fn inspect_page<S: BrowserSession>(config: &Config, session: &S) -> anyhow::Result<()> {
        let settings = config.check_settings();
        let navigator = Navigator::new(session, &settings);

        navigator.navigate(&settings.base_url).await?;
        if let Err(e) = navigator.ensure_logged_in().await {
            warn!(error = %e, "login failed, inspecting the page as is");
        }

        let url = session.current_url().await?;
        let state = navigator.page_state().await?;
        println!("url: {url}");
        println!("state: {state:?}");

        let inputs = list_inputs(session).await?;
        println!("inputs ({}):", inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            println!("  {i:>2}. {input}");
        }
        Ok(())
    }
}
