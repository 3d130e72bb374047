//! Outbound HTTP for the orchestrator and the notifier.
//!
//! Cookies travel in an explicit [`Session`] passed to every call instead of
//! living in a shared client jar. [`Transport`] is the seam tests replace;
//! [`UreqTransport`] is the blocking implementation used in production.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("response from {url} is not json: {reason}")]
    Decode { url: String, reason: String },
}

/// Authenticated session state: the two cookies the service checks.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    music_u: String,
    csrf: String,
}

impl Session {
    pub fn new(music_u: impl Into<String>, csrf: impl Into<String>) -> Self {
        Self {
            music_u: music_u.into(),
            csrf: csrf.into(),
        }
    }

    pub fn csrf(&self) -> &str {
        &self.csrf
    }

    /// Value for the `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        format!("MUSIC_U={}; __csrf={}", self.music_u, self.csrf)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("music_u", &"<redacted>")
            .field("csrf", &"<redacted>")
            .finish()
    }
}

/// Blocking HTTP calls the run needs. Implementations must not retry.
pub trait Transport {
    /// `GET url` with the session cookies, decoding a JSON body.
    fn get_json(&self, session: &Session, url: &str) -> Result<Value, HttpError>;

    /// `POST url` with the session cookies and a form-encoded body.
    fn post_form(
        &self,
        session: &Session,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<Value, HttpError>;

    /// Unauthenticated `POST url` with a JSON body; the response is ignored.
    fn post_json(&self, url: &str, body: &Value) -> Result<(), HttpError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn map_call_error(url: &str, err: ureq::Error) -> HttpError {
    match err {
        ureq::Error::Status(status, _) => HttpError::Status {
            url: url.to_string(),
            status,
        },
        ureq::Error::Transport(t) => HttpError::Transport {
            url: url.to_string(),
            reason: format!("{t}"),
        },
    }
}

fn decode(url: &str, response: ureq::Response) -> Result<Value, HttpError> {
    response.into_json::<Value>().map_err(|e| HttpError::Decode {
        url: url.to_string(),
        reason: format!("{e}"),
    })
}

impl Transport for UreqTransport {
    fn get_json(&self, session: &Session, url: &str) -> Result<Value, HttpError> {
        tracing::debug!(%url, "GET");
        let response = self
            .agent
            .get(url)
            .set("Cookie", &session.cookie_header())
            .call()
            .map_err(|e| map_call_error(url, e))?;
        decode(url, response)
    }

    fn post_form(
        &self,
        session: &Session,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<Value, HttpError> {
        tracing::debug!(%url, "POST form");
        let response = self
            .agent
            .post(url)
            .set("Cookie", &session.cookie_header())
            .send_form(fields)
            .map_err(|e| map_call_error(url, e))?;
        decode(url, response)
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<(), HttpError> {
        tracing::debug!(%url, "POST json");
        self.agent
            .post(url)
            .send_json(body)
            .map_err(|e| map_call_error(url, e))?;
        Ok(())
    }
}
