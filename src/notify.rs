//! SMS alerts through the Twilio REST API.

use crate::banner::CourseCode;
use crate::config::TwilioConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("request to Twilio failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Twilio rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// What happened to an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { sid: Option<String> },
    /// The same course and seat count was already reported.
    Duplicate,
}

/// Sends seat alerts. Implementations suppress repeats of an identical alert
/// until [`clear_cache`](Notifier::clear_cache) is called.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, code: &CourseCode, seats: u32) -> Result<Delivery, NotifyError>;
    fn clear_cache(&self);
}

pub fn alert_body(code: &CourseCode, seats: u32) -> String {
    format!("{code} available now! {seats} seats")
}

/// Alert keys already delivered, one per `(course, seat count)` pair.
#[derive(Debug, Default)]
pub struct SentCache {
    keys: Mutex<HashSet<String>>,
}

impl SentCache {
    fn key(code: &CourseCode, seats: u32) -> String {
        format!("{code}_{seats}")
    }

    pub fn contains(&self, code: &CourseCode, seats: u32) -> bool {
        self.lock().contains(&Self::key(code, seats))
    }

    pub fn insert(&self, code: &CourseCode, seats: u32) {
        self.lock().insert(Self::key(code, seats));
    }

    pub fn clear(&self) -> usize {
        let mut keys = self.lock();
        let cleared = keys.len();
        keys.clear();
        cleared
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Deserialize)]
struct MessageResponse {
    sid: Option<String>,
}

pub struct SmsNotifier {
    client: Client,
    config: TwilioConfig,
    api_base: String,
    sent: SentCache,
}

impl SmsNotifier {
    pub fn new(config: TwilioConfig) -> Result<Self, NotifyError> {
        Self::with_api_base(config, TWILIO_API_BASE)
    }

    pub fn with_api_base(config: TwilioConfig, api_base: &str) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("seatwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            config,
            api_base: api_base.trim_end_matches('/').to_string(),
            sent: SentCache::default(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base, self.config.account_sid
        )
    }

    /// Send `body` to the configured recipient, bypassing deduplication.
    pub async fn send(&self, body: &str) -> Result<Option<String>, NotifyError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("From", self.config.from.as_str()),
                ("To", self.config.to.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let sid = match response.json::<MessageResponse>().await {
            Ok(message) => message.sid,
            Err(e) => {
                debug!(error = ?e, "could not read message sid from response");
                None
            }
        };
        Ok(sid)
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    async fn notify(&self, code: &CourseCode, seats: u32) -> Result<Delivery, NotifyError> {
        if self.sent.contains(code, seats) {
            debug!(course = %code, seats, "alert already sent, skipping");
            return Ok(Delivery::Duplicate);
        }

        match self.send(&alert_body(code, seats)).await {
            Ok(sid) => {
                self.sent.insert(code, seats);
                info!(course = %code, seats, sid = ?sid, "alert sent");
                Ok(Delivery::Sent { sid })
            }
            Err(e) => {
                warn!(course = %code, seats, error = %e, "alert failed");
                Err(e)
            }
        }
    }

    fn clear_cache(&self) {
        let cleared = self.sent.clear();
        info!(cleared, "notification cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> CourseCode {
        raw.parse().unwrap()
    }

    fn config() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC0123".into(),
            auth_token: "secret".into(),
            from: "+15550001111".into(),
            to: "+15552223333".into(),
        }
    }

    #[test]
    fn test_alert_body() {
        assert_eq!(
            alert_body(&code("CSCI2020U"), 3),
            "CSCI2020U available now! 3 seats"
        );
    }

    #[test]
    fn test_sent_cache_keys_on_exact_seat_count() {
        let cache = SentCache::default();
        cache.insert(&code("CSCI2020U"), 3);
        assert!(cache.contains(&code("CSCI2020U"), 3));
        assert!(!cache.contains(&code("CSCI2020U"), 4));
        assert!(!cache.contains(&code("CSCI3090U"), 3));
        assert_eq!(cache.clear(), 1);
        assert!(!cache.contains(&code("CSCI2020U"), 3));
    }

    #[test]
    fn test_messages_url() {
        let notifier = SmsNotifier::with_api_base(config(), "http://localhost:9/base/").unwrap();
        assert_eq!(
            notifier.messages_url(),
            "http://localhost:9/base/Accounts/AC0123/Messages.json"
        );
    }

    #[tokio::test]
    async fn test_failed_send_is_not_cached() {
        // Nothing listens on the discard port.
        let notifier = SmsNotifier::with_api_base(config(), "http://127.0.0.1:9").unwrap();
        let result = notifier.notify(&code("CSCI2020U"), 2).await;
        assert!(result.is_err());
        assert!(!notifier.sent.contains(&code("CSCI2020U"), 2));
    }
}
