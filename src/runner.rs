//! Async event loop tying terminal input, the ticker and the auto-submit
//! deadline to the session controller.
//!
//! Everything funnels through one flume channel so the controller applies
//! one event at a time. The auto-submit deadline lives in the loop itself and
//! is polled with `tokio::select!` next to the channel.

use crate::anticheat::classify;
use crate::config::Config;
use crate::finalizer::{Screen, SubmissionRecord, SubmitReason};
use crate::loader::RedirectReason;
use crate::session::{Notice, Phase, SessionController, SessionEvent, SessionView};
use crate::store::SessionStore;
use crate::timer::{self, TICK};
use crate::tui::{TerminalScreen, Tui, UiAction};
use anyhow::Context;
use crossterm::event::{Event, EventStream, KeyEvent};
use futures_util::StreamExt;
use std::io;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Input to the runner loop
#[derive(Debug)]
pub enum LoopEvent {
    Session(SessionEvent),
    Terminal(Event),
}

impl From<SessionEvent> for LoopEvent {
    fn from(event: SessionEvent) -> Self {
        LoopEvent::Session(event)
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Submitted {
        reason: SubmitReason,
        record: SubmissionRecord,
    },
    /// Left before submitting; the attempt is forfeit
    Abandoned,
    Redirected(RedirectReason),
}

/// Whatever presents the session and turns keys into actions
pub trait Frontend {
    fn handle_key(&mut self, key: KeyEvent, view: &SessionView<'_>) -> UiAction;
    fn show_notice(&mut self, notice: &Notice, threshold: u32);
    fn show_error(&mut self, text: &str);
    fn draw(&mut self, view: &SessionView<'_>) -> io::Result<()>;

    /// Start reporting focus, paste and mouse events
    fn watch(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn unwatch(&mut self) {}
}

/// Run one attempt on the real terminal
pub async fn run<S: SessionStore>(store: S, config: &Config) -> anyhow::Result<RunOutcome> {
    // Terminal first: loading marks the attempt as started
    let mut tui = Tui::attach(config.ui.low_time_secs).context("preparing the terminal")?;
    let mut controller = SessionController::new(store, TerminalScreen::new(), config);
    if let Some(reason) = controller.load().context("loading the test")? {
        if let Err(e) = tui.restore() {
            warn!(error = %e, "could not restore the terminal");
        }
        return Ok(RunOutcome::Redirected(reason));
    }

    let (tx, rx) = flume::unbounded::<LoopEvent>();
    let input = spawn_input(tx.clone());

    let outcome = drive(&mut controller, &mut tui, tx, rx).await;

    input.abort();
    if let Err(e) = controller.screen_mut().exit_fullscreen() {
        debug!(error = %e, "could not leave alternate screen");
    }
    if let Err(e) = tui.restore() {
        warn!(error = %e, "could not restore the terminal");
    }
    outcome
}

/// Forward crossterm events into the loop until the stream ends
fn spawn_input(tx: flume::Sender<LoopEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = EventStream::new();
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    if tx.send_async(LoopEvent::Terminal(event)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "terminal input failed");
                    break;
                }
            }
        }
    })
}

/// Drive a loaded controller until the attempt ends.
///
/// `tx` feeds the ticker. The loop ends when the frontend quits or the
/// channel closes.
pub async fn drive<S: SessionStore, D: Screen>(
    controller: &mut SessionController<S, D>,
    frontend: &mut dyn Frontend,
    tx: flume::Sender<LoopEvent>,
    rx: flume::Receiver<LoopEvent>,
) -> anyhow::Result<RunOutcome> {
    let mut ticker: Option<JoinHandle<()>> = None;
    let mut auto_submit_deadline: Option<Instant> = None;
    let mut submitted: Option<(SubmitReason, SubmissionRecord)> = None;
    let threshold = controller.view().threshold;

    frontend.draw(&controller.view())?;

    let result = loop {
        let deadline = auto_submit_deadline;
        let timeout_fut = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        let event = tokio::select! {
            biased;

            _ = timeout_fut, if auto_submit_deadline.is_some() => {
                auto_submit_deadline = None;
                SessionEvent::AutoSubmitDue
            }

            received = rx.recv_async() => {
                let Ok(received) = received else {
                    break leave(controller, frontend, &mut submitted);
                };
                match received {
                    LoopEvent::Session(event) => event,
                    LoopEvent::Terminal(event) => {
                        match translate(controller, frontend, &event) {
                            UiAction::Session(event) => event,
                            UiAction::Redraw => {
                                frontend.draw(&controller.view())?;
                                continue;
                            }
                            UiAction::Quit => break leave(controller, frontend, &mut submitted),
                            UiAction::None => continue,
                        }
                    }
                }
            }
        };

        let notice = match controller.handle(event) {
            Ok(notice) => notice,
            Err(e) => {
                error!(error = %e, "session event failed");
                frontend.show_error(&format!("Could not save the session: {e}"));
                if controller.phase() == Phase::Submitted {
                    stop_ticker(&mut ticker);
                    frontend.unwatch();
                    frontend.draw(&controller.view())?;
                    break Err(anyhow::Error::new(e).context("submitting the test"));
                }
                frontend.draw(&controller.view())?;
                continue;
            }
        };

        match &notice {
            Notice::Started { end_time } => {
                ticker = Some(timer::spawn_ticker(tx.clone(), TICK));
                if let Err(e) = frontend.watch() {
                    warn!(error = %e, "violation reporting unavailable");
                }
                info!(%end_time, "countdown running");
            }
            Notice::AutoSubmitScheduled { after, .. } => {
                stop_ticker(&mut ticker);
                auto_submit_deadline = Some(Instant::now() + *after);
            }
            Notice::Submitted { reason, record } => {
                stop_ticker(&mut ticker);
                auto_submit_deadline = None;
                frontend.unwatch();
                submitted = Some((*reason, record.clone()));
            }
            Notice::Tick { .. }
            | Notice::Answered { .. }
            | Notice::Violation(_)
            | Notice::Ignored => {}
        }

        frontend.show_notice(&notice, threshold);
        frontend.draw(&controller.view())?;
    };

    stop_ticker(&mut ticker);
    frontend.unwatch();
    result
}

/// Violations first while monitoring, then keys
fn translate<S: SessionStore, D: Screen>(
    controller: &SessionController<S, D>,
    frontend: &mut dyn Frontend,
    event: &Event,
) -> UiAction {
    let monitoring = matches!(controller.phase(), Phase::Active | Phase::AutoSubmitPending);
    if monitoring {
        if let Some(kind) = classify(event) {
            return UiAction::Session(SessionEvent::Violation(kind));
        }
    }
    match event {
        Event::Key(key) => frontend.handle_key(*key, &controller.view()),
        Event::Resize(..) => UiAction::Redraw,
        _ => UiAction::None,
    }
}

/// End the loop. A scheduled auto-submit is carried out before leaving so
/// quitting cannot dodge it.
fn leave<S: SessionStore, D: Screen>(
    controller: &mut SessionController<S, D>,
    frontend: &mut dyn Frontend,
    submitted: &mut Option<(SubmitReason, SubmissionRecord)>,
) -> anyhow::Result<RunOutcome> {
    if controller.phase() == Phase::AutoSubmitPending {
        info!("leaving with an auto-submit pending, submitting now");
        let notice = controller
            .handle(SessionEvent::AutoSubmitDue)
            .context("submitting the test")?;
        frontend.show_notice(&notice, controller.view().threshold);
        if let Notice::Submitted { reason, record } = notice {
            *submitted = Some((reason, record));
        }
    }
    Ok(abandon_or_done(submitted))
}

fn abandon_or_done(submitted: &mut Option<(SubmitReason, SubmissionRecord)>) -> RunOutcome {
    match submitted.take() {
        Some((reason, record)) => RunOutcome::Submitted { reason, record },
        None => {
            info!("attempt abandoned");
            RunOutcome::Abandoned
        }
    }
}

fn stop_ticker(ticker: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = ticker.take() {
        handle.abort();
    }
}
