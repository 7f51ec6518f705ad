//! Session controller - the mock-test state machine
//!
//! Owns the session context (questions, answers, countdown, violation
//! counter) and the injected store and screen. Every input reaches it as a
//! single [`SessionEvent`], so timer expiry, the violation threshold and a
//! manual submit are serialized and the first one to submit wins.

use crate::anticheat::{AntiCheatMonitor, Severity, Violation, ViolationKind};
use crate::answers::AnswerStore;
use crate::config::Config;
use crate::error::SessionError;
use crate::finalizer::{Finalizer, Screen, SubmissionInput, SubmissionRecord, SubmitReason};
use crate::loader::{LoadOutcome, RedirectReason, SessionLoader};
use crate::question::Question;
use crate::store::{END_TIME_KEY, SessionStore};
use crate::timer::{Countdown, TickOutcome};
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Question data not loaded yet
    Loading,
    /// Loaded, waiting for the user to accept the anti-cheat terms
    AwaitingStart,
    /// Timer running, monitor enabled
    Active,
    /// Threshold crossed, submission scheduled, countdown frozen
    AutoSubmitPending,
    /// Terminal
    Submitted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Loading => write!(f, "Loading"),
            Phase::AwaitingStart => write!(f, "Ready"),
            Phase::Active => write!(f, "In progress"),
            Phase::AutoSubmitPending => write!(f, "Submitting"),
            Phase::Submitted => write!(f, "Submitted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// User accepted the terms; starts the timer (needs a user gesture for fullscreen)
    Acknowledge,
    Tick,
    Violation(ViolationKind),
    Answer { index: usize, value: String },
    SubmitRequested,
    /// The post-threshold delay elapsed
    AutoSubmitDue,
}

/// What the controller did with an event
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Started {
        end_time: DateTime<Utc>,
    },
    Tick {
        remaining: u64,
    },
    Answered {
        index: usize,
    },
    Violation(Violation),
    /// Caller must deliver `AutoSubmitDue` after `after`
    AutoSubmitScheduled {
        violation: Violation,
        after: Duration,
    },
    Submitted {
        reason: SubmitReason,
        record: SubmissionRecord,
    },
    Ignored,
}

/// Per-attempt state, owned by the controller
#[derive(Debug)]
pub struct SessionContext {
    pub questions: Vec<Question>,
    pub answers: AnswerStore,
    pub countdown: Countdown,
    pub monitor: AntiCheatMonitor,
    pub difficulty: String,
}

/// Borrowed snapshot for rendering
pub struct SessionView<'a> {
    pub phase: Phase,
    pub questions: &'a [Question],
    pub answers: &'a AnswerStore,
    pub remaining: u64,
    pub violations: u32,
    pub threshold: u32,
    pub reason: Option<SubmitReason>,
}

pub struct SessionController<S: SessionStore, D: Screen> {
    phase: Phase,
    ctx: SessionContext,
    finalizer: Finalizer,
    reason: Option<SubmitReason>,
    store: S,
    screen: D,
}

impl<S: SessionStore, D: Screen> SessionController<S, D> {
    pub fn new(store: S, screen: D, config: &Config) -> Self {
        Self {
            phase: Phase::Loading,
            ctx: SessionContext {
                questions: Vec::new(),
                answers: AnswerStore::new(),
                countdown: Countdown::new(config.test.duration_secs),
                monitor: AntiCheatMonitor::new(config.anticheat.clone()),
                difficulty: config.test.difficulty.clone(),
            },
            finalizer: Finalizer::new(),
            reason: None,
            store,
            screen,
        }
    }

    /// Run the loader. Returns the reason when the attempt cannot start; the
    /// controller then stays in `Loading` and ignores every event.
    pub fn load(&mut self) -> Result<Option<RedirectReason>, SessionError> {
        if self.phase != Phase::Loading {
            return Ok(None);
        }
        match SessionLoader::load(&mut self.store)? {
            LoadOutcome::Ready(questions) => {
                self.ctx.questions = questions;
                self.phase = Phase::AwaitingStart;
                Ok(None)
            }
            LoadOutcome::Redirect(reason) => {
                info!(%reason, "attempt cannot start");
                Ok(Some(reason))
            }
        }
    }

    pub fn handle(&mut self, event: SessionEvent) -> Result<Notice, SessionError> {
        debug!(phase = %self.phase, ?event, "session event");
        match (self.phase, event) {
            (Phase::AwaitingStart, SessionEvent::Acknowledge) => self.start(),
            (Phase::Active, SessionEvent::Tick) => self.tick(),
            (Phase::Active | Phase::AutoSubmitPending, SessionEvent::Answer { index, value }) => {
                self.ctx.answers.set(index, value);
                Ok(Notice::Answered { index })
            }
            (Phase::Active | Phase::AutoSubmitPending, SessionEvent::Violation(kind)) => {
                Ok(self.violation(kind))
            }
            (Phase::Active | Phase::AutoSubmitPending, SessionEvent::SubmitRequested) => {
                self.submit(SubmitReason::Manual)
            }
            (Phase::AutoSubmitPending, SessionEvent::AutoSubmitDue) => {
                self.submit(SubmitReason::Violations)
            }
            _ => Ok(Notice::Ignored),
        }
    }

    fn start(&mut self) -> Result<Notice, SessionError> {
        if let Err(e) = self.screen.enter_fullscreen() {
            warn!(error = %e, "fullscreen unavailable");
        }

        let now = Utc::now();
        let end_time = i64::try_from(self.ctx.countdown.duration())
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        self.store.set(END_TIME_KEY, &end_time.to_rfc3339())?;

        self.ctx.monitor.enable();
        self.phase = Phase::Active;
        info!(
            duration_secs = self.ctx.countdown.duration(),
            questions = self.ctx.questions.len(),
            "test started"
        );
        Ok(Notice::Started { end_time })
    }

    fn tick(&mut self) -> Result<Notice, SessionError> {
        match self.ctx.countdown.tick() {
            TickOutcome::Running(remaining) => Ok(Notice::Tick { remaining }),
            TickOutcome::Expired => self.submit(SubmitReason::TimeUp),
        }
    }

    fn violation(&mut self, kind: ViolationKind) -> Notice {
        let Some(violation) = self.ctx.monitor.record(kind) else {
            return Notice::Ignored;
        };
        if violation.severity == Severity::AutoSubmit && self.phase == Phase::Active {
            self.phase = Phase::AutoSubmitPending;
            let after = self.ctx.monitor.policy().auto_submit_delay();
            info!(total = violation.total, ?after, "violation threshold reached");
            return Notice::AutoSubmitScheduled { violation, after };
        }
        Notice::Violation(violation)
    }

    fn submit(&mut self, reason: SubmitReason) -> Result<Notice, SessionError> {
        let input = SubmissionInput {
            questions: &self.ctx.questions,
            answers: &self.ctx.answers,
            countdown: &self.ctx.countdown,
            difficulty: &self.ctx.difficulty,
        };
        let result = self
            .finalizer
            .finalize(input, reason, &mut self.store, &mut self.screen);

        // Terminal even if persisting failed
        self.phase = Phase::Submitted;
        self.ctx.monitor.disable();

        match result? {
            Some(record) => {
                self.reason = Some(reason);
                Ok(Notice::Submitted { reason, record })
            }
            None => Ok(Notice::Ignored),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn is_submitted(&self) -> bool {
        self.finalizer.is_submitted()
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            phase: self.phase,
            questions: &self.ctx.questions,
            answers: &self.ctx.answers,
            remaining: self.ctx.countdown.remaining(),
            violations: self.ctx.monitor.count(),
            threshold: self.ctx.monitor.threshold(),
            reason: self.reason,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn screen_mut(&mut self) -> &mut D {
        &mut self.screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finalizer::NoScreen;
    use crate::question::SAMPLE_PAYLOAD;
    use crate::store::{MemoryStore, QUESTIONS_KEY, STARTED_KEY, SUBMISSION_KEY};

    fn loaded(duration_secs: u64) -> SessionController<MemoryStore, NoScreen> {
        let mut store = MemoryStore::new();
        store.set(QUESTIONS_KEY, SAMPLE_PAYLOAD).unwrap();
        store.set(STARTED_KEY, "false").unwrap();
        let mut config = Config::default();
        config.test.duration_secs = duration_secs;
        let mut controller = SessionController::new(store, NoScreen, &config);
        assert!(controller.load().unwrap().is_none());
        controller
    }

    #[test]
    fn test_nothing_runs_before_acknowledge() {
        let mut c = loaded(60);
        assert_eq!(c.phase(), Phase::AwaitingStart);
        assert_eq!(c.handle(SessionEvent::Tick).unwrap(), Notice::Ignored);
        assert_eq!(
            c.handle(SessionEvent::Violation(ViolationKind::Copy)).unwrap(),
            Notice::Ignored
        );
        assert_eq!(
            c.handle(SessionEvent::Answer {
                index: 0,
                value: "early".into()
            })
            .unwrap(),
            Notice::Ignored
        );
        assert_eq!(c.view().remaining, 60);
        assert_eq!(c.view().violations, 0);
        assert!(c.context().answers.get(0).is_none());
    }

    #[test]
    fn test_acknowledge_starts_once() {
        let mut c = loaded(60);
        assert!(matches!(
            c.handle(SessionEvent::Acknowledge).unwrap(),
            Notice::Started { .. }
        ));
        assert!(c.store().contains(END_TIME_KEY));
        assert_eq!(c.phase(), Phase::Active);
        assert_eq!(c.handle(SessionEvent::Acknowledge).unwrap(), Notice::Ignored);
        assert_eq!(
            c.handle(SessionEvent::Tick).unwrap(),
            Notice::Tick { remaining: 59 }
        );
    }

    #[test]
    fn test_pending_auto_submit_freezes_timer() {
        let mut c = loaded(60);
        c.handle(SessionEvent::Acknowledge).unwrap();
        for _ in 0..4 {
            c.handle(SessionEvent::Violation(ViolationKind::TabSwitch))
                .unwrap();
        }
        c.handle(SessionEvent::Tick).unwrap();
        let notice = c
            .handle(SessionEvent::Violation(ViolationKind::Paste))
            .unwrap();
        assert!(matches!(
            notice,
            Notice::AutoSubmitScheduled { after, .. } if after == Duration::from_secs(2)
        ));
        assert_eq!(c.phase(), Phase::AutoSubmitPending);

        assert_eq!(c.handle(SessionEvent::Tick).unwrap(), Notice::Ignored);
        // Further violations still count but do not reschedule
        assert!(matches!(
            c.handle(SessionEvent::Violation(ViolationKind::Cut)).unwrap(),
            Notice::Violation(Violation { total: 6, .. })
        ));

        let Notice::Submitted { reason, record } = c.handle(SessionEvent::AutoSubmitDue).unwrap()
        else {
            panic!("expected submission");
        };
        assert_eq!(reason, SubmitReason::Violations);
        assert_eq!(record.attempt_duration, 1);
        assert_eq!(c.view().reason, Some(SubmitReason::Violations));
    }

    #[test]
    fn test_submitted_is_terminal() {
        let mut c = loaded(60);
        c.handle(SessionEvent::Acknowledge).unwrap();
        c.handle(SessionEvent::Answer {
            index: 0,
            value: "a".into(),
        })
        .unwrap();
        assert!(matches!(
            c.handle(SessionEvent::SubmitRequested).unwrap(),
            Notice::Submitted {
                reason: SubmitReason::Manual,
                ..
            }
        ));

        for event in [
            SessionEvent::Tick,
            SessionEvent::SubmitRequested,
            SessionEvent::AutoSubmitDue,
            SessionEvent::Violation(ViolationKind::Copy),
            SessionEvent::Answer {
                index: 0,
                value: "changed".into(),
            },
        ] {
            assert_eq!(c.handle(event).unwrap(), Notice::Ignored);
        }
        assert_eq!(c.context().answers.get(0), Some("a"));
        assert_eq!(c.view().violations, 0);
        assert!(c.store().contains(SUBMISSION_KEY));
    }

    #[test]
    fn test_redirect_keeps_loading() {
        let mut c = SessionController::new(MemoryStore::new(), NoScreen, &Config::default());
        assert!(matches!(
            c.load().unwrap(),
            Some(RedirectReason::MissingPayload)
        ));
        assert_eq!(c.phase(), Phase::Loading);
        assert_eq!(c.handle(SessionEvent::Acknowledge).unwrap(), Notice::Ignored);
    }
}
