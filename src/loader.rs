//! Session loader - decides whether a fresh attempt may start

use crate::error::{PayloadError, StoreError};
use crate::question::{self, Question};
use crate::store::{self, QUESTIONS_KEY, STARTED_KEY, SessionStore};
use std::fmt;
use tracing::{info, warn};

#[derive(Debug)]
pub enum RedirectReason {
    /// The started flag was already set: a reload or second entry
    StaleSession,
    /// Nothing to take; setup has not run
    MissingPayload,
    MalformedPayload(PayloadError),
}

impl fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectReason::StaleSession => {
                write!(f, "this attempt was already started and cannot be resumed")
            }
            RedirectReason::MissingPayload => write!(f, "no pending test was found"),
            RedirectReason::MalformedPayload(e) => write!(f, "the pending test is unusable ({e})"),
        }
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    Ready(Vec<Question>),
    /// Back to setup; never retried
    Redirect(RedirectReason),
}

pub struct SessionLoader;

impl SessionLoader {
    pub fn load(store: &mut dyn SessionStore) -> Result<LoadOutcome, StoreError> {
        if store.get(STARTED_KEY).as_deref() == Some("true") {
            warn!("started flag present, discarding previous attempt");
            store::clear_session(store)?;
            return Ok(LoadOutcome::Redirect(RedirectReason::StaleSession));
        }

        let Some(raw) = store.get(QUESTIONS_KEY) else {
            return Ok(LoadOutcome::Redirect(RedirectReason::MissingPayload));
        };

        match question::parse_payload(&raw) {
            Ok(questions) => {
                store.set(STARTED_KEY, "true")?;
                info!(questions = questions.len(), "test loaded");
                Ok(LoadOutcome::Ready(questions))
            }
            Err(e) => {
                warn!(error = %e, "discarding malformed question payload");
                store::clear_session(store)?;
                Ok(LoadOutcome::Redirect(RedirectReason::MalformedPayload(e)))
            }
        }
    }
}
