//! # Alert notification subscriber (SMTP).
//!
//! [`AlertMailer`] watches the event stream and mails every alert-class
//! event plus the shutdown notice: the supervisor's two notification
//! obligations (OS-interrupt notice, timeout notice) and the failure/panic
//! alerts all flow through here.
//!
//! Delivery uses the `lettre` async SMTP transport over STARTTLS. Send
//! failures are logged and never propagate: a broken mail relay must not be
//! able to fail a run.
//!
//! Settings come from straps; when `email_host` is absent the mailer is
//! simply not registered (see [`MailSettings::from_straps`]).

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::straps::Straps;

use super::Subscribe;

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender when `email_from` and `email_username` are both unset.
const DEFAULT_FROM_ADDRESS: &str = "jobvisor@localhost";

/// Error type for alert mail failures.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("message build error: {0}")]
    Build(String),
}

/// SMTP settings for the alert mailer.
#[derive(Debug, Clone)]
pub struct MailSettings {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port (defaults to 587).
    pub port: u16,
    /// Optional SMTP username.
    pub username: Option<String>,
    /// Optional SMTP password.
    pub password: Option<String>,
    /// RFC 5322 "From" address.
    pub from: String,
    /// Recipient address for every notification.
    pub to: String,
    /// Subject prefix, typically carrying the machine name.
    pub subject: String,
}

impl MailSettings {
    /// Reads mail settings from straps.
    ///
    /// Returns `Ok(None)` when `email_host` is absent: mail is not
    /// configured for this deployment and no mailer should be registered.
    /// When the host is present, `email_to` becomes required.
    ///
    /// | Strap | Required | Default |
    /// |---|---|---|
    /// | `email_host` | gates the mailer | none |
    /// | `email_to` | yes (when gated on) | none |
    /// | `email_port` | no | `587` |
    /// | `email_username` / `email_password` | no | none |
    /// | `email_from` | no | username, else `jobvisor@localhost` |
    /// | `email_alert_subject` | no | `jobvisor` |
    pub fn from_straps(straps: &Straps) -> Result<Option<Self>, crate::straps::StrapError> {
        let host = match straps.opt_strap("email_host") {
            Some(h) => h.to_string(),
            None => return Ok(None),
        };

        let username = straps.opt_strap("email_username").map(str::to_string);
        let from = straps
            .opt_strap("email_from")
            .map(str::to_string)
            .or_else(|| username.clone())
            .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string());

        Ok(Some(Self {
            host,
            port: straps
                .opt_strap_int("email_port")
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            username,
            password: straps.opt_strap("email_password").map(str::to_string),
            from,
            to: straps.strap("email_to")?.to_string(),
            subject: straps
                .opt_strap("email_alert_subject")
                .unwrap_or("jobvisor")
                .to_string(),
        }))
    }
}

/// Notification subscriber that mails alert-class events.
pub struct AlertMailer {
    settings: MailSettings,
}

impl AlertMailer {
    /// Creates a mailer with the given settings.
    pub fn new(settings: MailSettings) -> Self {
        Self { settings }
    }

    /// Assembles the MIME message. Split out so address parsing and message
    /// building stay testable without a relay.
    fn build_message(&self, subject: &str, body: String) -> Result<lettre::Message, MailError> {
        use lettre::message::header::ContentType;

        lettre::Message::builder()
            .from(self.settings.from.parse()?)
            .to(self.settings.to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MailError::Build(e.to_string()))
    }

    async fn send(&self, subject: &str, body: String) -> Result<(), MailError> {
        use lettre::{
            transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport,
            Tokio1Executor,
        };

        let email = self.build_message(subject, body)?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.host)?
                .port(self.settings.port);

        if let (Some(user), Some(pass)) = (&self.settings.username, &self.settings.password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to = %self.settings.to, subject, "notification email sent");
        Ok(())
    }
}

#[async_trait]
impl Subscribe for AlertMailer {
    async fn on_event(&self, event: &Event) {
        if !event.is_alert() && event.kind != EventKind::ShutdownRequested {
            return;
        }

        let (label, body) = describe(event);
        let subject = format!("{} - {}", self.settings.subject, label);
        if let Err(e) = self.send(&subject, body).await {
            tracing::warn!(error = %e, label, "alert email failed");
        }
    }

    fn name(&self) -> &'static str {
        "mailer"
    }

    fn queue_capacity(&self) -> usize {
        64
    }
}

/// Renders an event into a mail label and plain-text body.
fn describe(e: &Event) -> (&'static str, String) {
    let label = match e.kind {
        EventKind::ShutdownRequested => "interrupt notice",
        EventKind::TimeoutHit => "timeout notice",
        EventKind::JobFailed => "job failure",
        EventKind::JobPanicked => "job panic",
        EventKind::GraceExceeded => "grace exceeded",
        EventKind::CloseFailed => "close failure",
        _ => "notice",
    };

    let at: chrono::DateTime<chrono::Utc> = e.at.into();
    let mut body = format!("event: {label}\ntime: {}\n", at.to_rfc3339());
    if let Some(job) = &e.job {
        body.push_str(&format!("job: {job}\n"));
    }
    if let Some(reason) = &e.reason {
        body.push_str(&format!("reason: {reason}\n"));
    }
    if let Some(ms) = e.timeout_ms {
        body.push_str(&format!("timeout_ms: {ms}\n"));
    }
    if let Some(ms) = e.grace_ms {
        body.push_str(&format!("grace_ms: {ms}\n"));
    }
    body.push_str(&format!("seq: {}\n", e.seq));
    (label, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> MailSettings {
        MailSettings {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: Some("alerts@example.com".to_string()),
            password: Some("secret".to_string()),
            from: "alerts@example.com".to_string(),
            to: "oncall@example.com".to_string(),
            subject: "jobvisor on batch-01".to_string(),
        }
    }

    #[test]
    fn test_from_straps_none_without_host() {
        let straps = Straps::from_toml_str("machine_name = \"x\"").unwrap();
        assert!(MailSettings::from_straps(&straps).unwrap().is_none());
    }

    #[test]
    fn test_from_straps_requires_recipient() {
        let straps = Straps::from_toml_str("email_host = \"smtp.example.com\"").unwrap();
        assert!(MailSettings::from_straps(&straps).is_err());
    }

    #[test]
    fn test_from_straps_defaults() {
        let straps = Straps::from_toml_str(
            r#"
            email_host = "smtp.example.com"
            email_to = "oncall@example.com"
            email_username = "alerts@example.com"
            "#,
        )
        .unwrap();
        let settings = MailSettings::from_straps(&straps).unwrap().unwrap();
        assert_eq!(settings.port, DEFAULT_SMTP_PORT);
        assert_eq!(settings.from, "alerts@example.com");
        assert_eq!(settings.subject, "jobvisor");
    }

    #[test]
    fn test_build_message_accepts_valid_addresses() {
        let mailer = AlertMailer::new(settings());
        let msg = mailer.build_message("jobvisor - timeout notice", "body\n".to_string());
        assert!(msg.is_ok());
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let mut s = settings();
        s.to = "not-an-email".to_string();
        let mailer = AlertMailer::new(s);
        let err = mailer.build_message("x", "y".to_string()).unwrap_err();
        assert!(matches!(err, MailError::Address(_)));
    }

    #[test]
    fn test_describe_timeout_body() {
        let ev = Event::new(EventKind::TimeoutHit)
            .with_job("nightly-import")
            .with_timeout(Duration::from_secs(300));
        let (label, body) = describe(&ev);
        assert_eq!(label, "timeout notice");
        assert!(body.contains("job: nightly-import"));
        assert!(body.contains("timeout_ms: 300000"));
    }
}
