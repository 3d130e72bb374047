//! Daily rating run: authenticate with stored cookies, read the day's task
//! and rate every song that is still unrated.
//!
//! Each step returns a [`BotError`] on failure and [`Bot::run`] collapses
//! them to a single success flag. Human-readable detail goes to the
//! [`RunLog`], which is what the operator eventually sees.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::{CredentialStore, Endpoints, CSRF_KEY, MUSIC_U_KEY};
use crate::crypto::{CipherConstants, CipherError, WeapiCipher};
use crate::http::{HttpError, Session, Transport};
use crate::notify::RunLog;
use crate::task::{
    score_and_tag, Profile, ProfileEnvelope, RatingResponse, SubmissionPayload, TaskEnvelope,
    TaskStatus, WireId, WorkItem,
};

/// Service-level code for an accepted rating.
pub const ACCEPTED_CODE: i64 = 200;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("missing credentials: {}", .0.join(", "))]
    Configuration(Vec<String>),
    #[error("session rejected: no profile returned")]
    Authentication,
    #[error("transport failure: {0}")]
    Transport(#[from] HttpError),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("cipher setup failed: {0}")]
    Cipher(#[from] CipherError),
    #[error("rating {item} failed: {reason}")]
    Submission { item: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    Authenticated,
    TaskChecked,
    Idle,
    Signing,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingOutcome {
    Accepted(u8),
    Rejected(i64),
}

/// Counts from one pass over the task's items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub skipped: usize,
}

pub struct Bot<'a, T: Transport + ?Sized, C: CredentialStore + ?Sized> {
    transport: &'a T,
    credentials: &'a C,
    log: &'a mut RunLog,
    endpoints: Endpoints,
    fixed_nonce: Option<String>,
    state: RunState,
}

impl<'a, T: Transport + ?Sized, C: CredentialStore + ?Sized> Bot<'a, T, C> {
    pub fn new(transport: &'a T, credentials: &'a C, log: &'a mut RunLog) -> Self {
        Self {
            transport,
            credentials,
            log,
            endpoints: Endpoints::default(),
            fixed_nonce: None,
            state: RunState::Uninitialized,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Uses `nonce` instead of a random one, making request bodies reproducible.
    pub fn with_fixed_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.fixed_nonce = Some(nonce.into());
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Runs every step in order. Returns `false` on the first fatal error,
    /// `true` otherwise, however many items were rated.
    pub fn run(&mut self) -> bool {
        match self.execute() {
            Ok(summary) => {
                tracing::info!(
                    accepted = summary.accepted,
                    rejected = summary.rejected,
                    skipped = summary.skipped,
                    state = ?self.state,
                    "run finished"
                );
                true
            }
            Err(err) => {
                self.state = RunState::Failed;
                tracing::warn!(error = %err, "run failed");
                match &err {
                    BotError::Transport(_)
                    | BotError::MalformedResponse(_)
                    | BotError::Cipher(_) => self.log.info(format!("run failed: {err}")),
                    // The failing step already logged these.
                    BotError::Configuration(_)
                    | BotError::Authentication
                    | BotError::Submission { .. } => {}
                }
                false
            }
        }
    }

    fn execute(&mut self) -> Result<SignSummary, BotError> {
        let session = self.load_credentials()?;
        self.verify_identity(&session)?;
        let status = self.fetch_task_status(&session)?;
        self.sign_all(&session, &status)
    }

    /// Builds the session from the two required cookies. Every missing or
    /// empty cookie is logged before the run is aborted.
    pub fn load_credentials(&mut self) -> Result<Session, BotError> {
        let mut missing = Vec::new();
        let mut lookup = |cookie: &str, key: &str| -> Option<String> {
            match self.credentials.get(key).filter(|v| !v.is_empty()) {
                Some(value) => Some(value),
                None => {
                    self.log.info(format!("cookie {cookie} is not set"));
                    missing.push(key.to_string());
                    None
                }
            }
        };
        let music_u = lookup("MUSIC_U", MUSIC_U_KEY);
        let csrf = lookup("__csrf", CSRF_KEY);

        match (music_u, csrf) {
            (Some(music_u), Some(csrf)) => Ok(Session::new(music_u, csrf)),
            _ => Err(BotError::Configuration(missing)),
        }
    }

    /// Fetches the account profile; a null profile means the cookies expired.
    pub fn verify_identity(&mut self, session: &Session) -> Result<Profile, BotError> {
        let body = self.transport.get_json(session, &self.endpoints.profile)?;
        let envelope: ProfileEnvelope = parse(body, "profile")?;
        match envelope.profile {
            Some(profile) => {
                self.log.info(format!("user: {}", profile.nickname));
                self.state = RunState::Authenticated;
                Ok(profile)
            }
            None => {
                self.log.info("could not load the user profile, refresh the cookies");
                Err(BotError::Authentication)
            }
        }
    }

    pub fn fetch_task_status(&mut self, session: &Session) -> Result<TaskStatus, BotError> {
        let body = self.transport.get_json(session, &self.endpoints.task)?;
        let status = parse::<TaskEnvelope>(body, "task status")?.data;
        if status.completed_count > status.total_count {
            return Err(BotError::MalformedResponse(format!(
                "completed count exceeds total {}",
                status.progress()
            )));
        }
        let verdict = if status.is_complete() { "done" } else { "pending" };
        self.log
            .info(format!("today's task: {verdict}{}", status.progress()));
        self.state = RunState::TaskChecked;
        Ok(status)
    }

    /// Rates every unrated item in order, stopping at the first failure.
    pub fn sign_all(&mut self, session: &Session, status: &TaskStatus) -> Result<SignSummary, BotError> {
        if status.is_complete() {
            self.state = RunState::Idle;
            return Ok(SignSummary::default());
        }

        self.log.info("rating...");
        let cipher = match &self.fixed_nonce {
            Some(nonce) => WeapiCipher::with_nonce(CipherConstants::default(), nonce.clone())?,
            None => WeapiCipher::new(CipherConstants::default())?,
        };
        self.state = RunState::Signing;

        let mut summary = SignSummary::default();
        for item in &status.items {
            if item.already_completed {
                let line = match item.prior_score {
                    Some(score) => format!("{} already rated: {}", item.label(), score as i64),
                    None => format!("{} already rated", item.label()),
                };
                self.log.info(line);
                summary.skipped += 1;
                continue;
            }
            match self.submit_rating(session, &cipher, &status.id, item)? {
                RatingOutcome::Accepted(_) => summary.accepted += 1,
                RatingOutcome::Rejected(_) => summary.rejected += 1,
            }
        }

        self.state = RunState::Done;
        Ok(summary)
    }

    /// Encrypts and posts one rating. Any failure is logged against the item
    /// and returned as [`BotError::Submission`].
    pub fn submit_rating(
        &mut self,
        session: &Session,
        cipher: &WeapiCipher,
        task_id: &WireId,
        item: &WorkItem,
    ) -> Result<RatingOutcome, BotError> {
        let (score, tags) = score_and_tag(item);
        let payload = SubmissionPayload::new(task_id, item, score, tags, session.csrf());

        match self.post_rating(session, cipher, &payload) {
            Ok(ACCEPTED_CODE) => {
                self.log.info(format!("{} rated: {score}", item.label()));
                Ok(RatingOutcome::Accepted(score))
            }
            Ok(code) => {
                self.log
                    .info(format!("{} not accepted (code {code})", item.label()));
                Ok(RatingOutcome::Rejected(code))
            }
            Err(reason) => {
                self.log
                    .info(format!("rating \"{}\" failed: {reason}", item.name));
                Err(BotError::Submission {
                    item: item.label(),
                    reason,
                })
            }
        }
    }

    fn post_rating(
        &self,
        session: &Session,
        cipher: &WeapiCipher,
        payload: &SubmissionPayload,
    ) -> Result<i64, String> {
        let request = cipher
            .build_encrypted_request(payload)
            .map_err(|e| format!("{e}"))?;
        let url = format!("{}?csrf_token={}", self.endpoints.evaluate, session.csrf());
        let body = self
            .transport
            .post_form(session, &url, &request.form_fields())
            .map_err(|e| format!("{e}"))?;
        let response: RatingResponse = parse(body, "rating").map_err(|e| format!("{e}"))?;
        Ok(response.code)
    }
}

fn parse<D: DeserializeOwned>(body: Value, what: &str) -> Result<D, BotError> {
    serde_json::from_value(body).map_err(|e| BotError::MalformedResponse(format!("{what}: {e}")))
}
