use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteEmail {
    pub to: String,
    pub reply_to: String,
    pub from_name: String,
    pub subject: String,
    pub html: String,
}

/// Outbound delivery of invitation emails.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InviteNotifier: Send + Sync {
    async fn send_invite(&self, email: &InviteEmail) -> Result<()>;
}

/// Posts invitation emails to an HTTP mail relay.
#[derive(Clone)]
pub struct MailRelayNotifier {
    client: Client,
    relay_url: Option<String>,
    relay_secret: Option<String>,
}

impl MailRelayNotifier {
    pub fn new(relay_url: Option<String>, relay_secret: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            relay_url,
            relay_secret,
        })
    }
}

#[async_trait]
impl InviteNotifier for MailRelayNotifier {
    async fn send_invite(&self, email: &InviteEmail) -> Result<()> {
        let Some(url) = self.relay_url.as_deref() else {
            tracing::warn!(to = %email.to, "mail relay not configured, skipping invitation email");
            return Ok(());
        };

        let mut req = self.client.post(url).json(email);
        if let Some(secret) = &self.relay_secret {
            req = req.header("X-Relay-Secret", secret);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "Mail relay responded {}: {}",
                status, body
            )));
        }
        tracing::info!(to = %email.to, "invitation email handed to relay");
        Ok(())
    }
}

/// `<frontend>/?invite=<token>&recruiter_code=<code>`
pub fn invitation_link(frontend_url: &str, token: &str, recruiter_code: &str) -> Result<String> {
    let mut url = url::Url::parse(frontend_url)
        .map_err(|e| Error::Config(format!("Invalid FRONTEND_URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("invite", token)
        .append_pair("recruiter_code", recruiter_code);
    Ok(url.to_string())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub fn render_invite_email(
    recipient: &str,
    recruiter_name: &str,
    recruiter_email: &str,
    from_name: &str,
    link: &str,
) -> InviteEmail {
    let name = escape_html(recruiter_name);
    let href = escape_html(link);
    let html = format!(
        r#"<html>
  <body>
    <h3>Hi there,</h3>
    <p>{name} has invited you to take a quiz on our platform.</p>
    <p>Please click the link below to begin:<br><a href="{href}">{href}</a></p>
    <p><strong>Note:</strong> this link also links you to {name}'s recruiter account and makes their assessments available to you.</p>
    <p>Good luck!</p>
  </body>
</html>"#
    );
    InviteEmail {
        to: recipient.to_string(),
        reply_to: recruiter_email.to_string(),
        from_name: format!("{} (via {})", recruiter_name, from_name),
        subject: format!("Quiz Invitation from {}", recruiter_name),
        html,
    }
}

/// Fire-and-forget: failures are logged and never reach the caller.
pub fn dispatch_invite(notifier: Arc<dyn InviteNotifier>, email: InviteEmail) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.send_invite(&email).await {
            tracing::error!(to = %email.to, error = %e, "failed to deliver invitation email");
        }
    })
}
