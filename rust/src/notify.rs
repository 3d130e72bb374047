//! Run log that doubles as the single end-of-run notification. Lines are
//! accumulated in memory and delivered once by [`RunLog::end`]: printed,
//! posted to a chat-bot webhook, or dropped, depending on the configured
//! target.

use serde_json::{json, Value};
use thiserror::Error;

use crate::http::{HttpError, Transport};

const SEPARATOR: &str = "= = = = = = = = = = = = = = = = = =";
const HEADER_FORMAT: &str = "%Y/%m/%d (%A) %H:%M:%S";

/// Setting value that disables delivery.
pub const IGNORE_TARGET: &str = "ignore";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook delivery failed: {0}")]
    Webhook(#[from] HttpError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    Suppressed,
    Stdout,
    Webhook(String),
}

impl DeliveryTarget {
    /// Maps the `BOT_URL` setting: unset or `ignore` suppresses delivery, an
    /// empty string prints locally, anything else is a webhook URL.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value {
            None | Some(IGNORE_TARGET) => DeliveryTarget::Suppressed,
            Some("") => DeliveryTarget::Stdout,
            Some(url) => DeliveryTarget::Webhook(url.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct RunLog {
    text: String,
    target: DeliveryTarget,
}

impl RunLog {
    /// Starts a log headed with the current local time.
    pub fn new(target: DeliveryTarget) -> Self {
        let header = chrono::Local::now().format(HEADER_FORMAT).to_string();
        Self::with_header(target, &header)
    }

    pub fn with_header(target: DeliveryTarget, header: &str) -> Self {
        Self {
            text: format!("{header}\n{SEPARATOR}"),
            target,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!(target: "partner_rs::notify", "{message}");
        self.text.push('\n');
        self.text.push_str(message);
    }

    /// Chat-bot webhook body for the accumulated text.
    pub fn webhook_body(&self, at_all: bool) -> Value {
        let mut body = json!({
            "msgtype": "text",
            "text": { "content": self.text },
        });
        if at_all {
            body["at"] = json!({ "isAtAll": "true" });
        }
        body
    }

    /// Closes the log with `message` and delivers it.
    pub fn end<T: Transport + ?Sized>(
        &mut self,
        message: &str,
        at_all: bool,
        transport: &T,
    ) -> Result<(), NotifyError> {
        self.text.push('\n');
        self.text.push_str(SEPARATOR);
        self.info(message);

        match &self.target {
            DeliveryTarget::Suppressed => {}
            DeliveryTarget::Stdout => println!("{}", self.text),
            DeliveryTarget::Webhook(url) => {
                transport.post_json(url, &self.webhook_body(at_all))?;
            }
        }
        Ok(())
    }
}
