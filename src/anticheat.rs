//! Anti-cheat monitor - counts suspicious terminal behaviour
//!
//! Advisory, client-side enforcement only. A determined user can bypass it.
//!
//! Terminal events map onto violation kinds:
//! - focus lost → `tab_switch`
//! - bracketed paste or Ctrl+V → `paste`
//! - Ctrl+C → `copy`
//! - Ctrl+X → `cut`
//! - right mouse button → `right_click`

use crate::config::AntiCheatConfig;
use crossterm::event::{
    DisableBracketedPaste, DisableFocusChange, DisableMouseCapture, EnableBracketedPaste,
    EnableFocusChange, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEventKind,
};
use crossterm::execute;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, stdout};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    TabSwitch,
    Copy,
    Paste,
    Cut,
    RightClick,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 5] = [
        ViolationKind::TabSwitch,
        ViolationKind::Copy,
        ViolationKind::Paste,
        ViolationKind::Cut,
        ViolationKind::RightClick,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::TabSwitch => "tab_switch",
            ViolationKind::Copy => "copy",
            ViolationKind::Paste => "paste",
            ViolationKind::Cut => "cut",
            ViolationKind::RightClick => "right_click",
        }
    }

    /// Human wording used in warning banners
    pub fn describe(&self) -> &'static str {
        match self {
            ViolationKind::TabSwitch => "Leaving the test window",
            ViolationKind::Copy => "Copying",
            ViolationKind::Paste => "Pasting",
            ViolationKind::Cut => "Cutting",
            ViolationKind::RightClick => "Right-clicking",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the session reacts to a given violation total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Dismissible warning
    Warning,
    /// Last warning before submission
    FinalWarning,
    /// Session is submitted after the configured delay
    AutoSubmit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub total: u32,
    pub severity: Severity,
}

impl Violation {
    pub fn message(&self, threshold: u32) -> String {
        match self.severity {
            Severity::Warning => format!(
                "{} is not allowed during the test. Warning {} of {}.",
                self.kind.describe(),
                self.total,
                threshold.saturating_sub(1)
            ),
            Severity::FinalWarning => format!(
                "FINAL WARNING: {} is not allowed. One more violation submits your test.",
                self.kind.describe()
            ),
            Severity::AutoSubmit => format!(
                "{} violations detected. Your test is being submitted.",
                self.total
            ),
        }
    }
}

/// Violation counter with the warning policy. Disabled until the session
/// becomes active and again once it is submitted.
#[derive(Debug, Clone)]
pub struct AntiCheatMonitor {
    policy: AntiCheatConfig,
    count: u32,
    enabled: bool,
}

impl AntiCheatMonitor {
    pub fn new(policy: AntiCheatConfig) -> Self {
        Self {
            policy,
            count: 0,
            enabled: false,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = self.policy.enabled;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn threshold(&self) -> u32 {
        self.policy.threshold
    }

    pub fn policy(&self) -> &AntiCheatConfig {
        &self.policy
    }

    /// Count one observed event. Returns `None` while disabled.
    pub fn record(&mut self, kind: ViolationKind) -> Option<Violation> {
        if !self.enabled {
            debug!(%kind, "violation ignored, monitor disabled");
            return None;
        }
        self.count += 1;
        let severity = self.severity_for(self.count);
        warn!(%kind, total = self.count, ?severity, "anti-cheat violation");
        Some(Violation {
            kind,
            total: self.count,
            severity,
        })
    }

    fn severity_for(&self, total: u32) -> Severity {
        if total >= self.policy.threshold {
            Severity::AutoSubmit
        } else if total >= self.policy.final_warning_at {
            Severity::FinalWarning
        } else {
            Severity::Warning
        }
    }
}

/// Map a terminal event to the violation it represents, if any
pub fn classify(event: &Event) -> Option<ViolationKind> {
    match event {
        Event::FocusLost => Some(ViolationKind::TabSwitch),
        Event::Paste(_) => Some(ViolationKind::Paste),
        Event::Key(key)
            if key.kind != KeyEventKind::Release
                && key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('C') => Some(ViolationKind::Copy),
                KeyCode::Char('v') | KeyCode::Char('V') => Some(ViolationKind::Paste),
                KeyCode::Char('x') | KeyCode::Char('X') => Some(ViolationKind::Cut),
                _ => None,
            }
        }
        Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Right) => {
            Some(ViolationKind::RightClick)
        }
        _ => None,
    }
}

/// Terminal reporting needed by [`classify`]: focus changes, bracketed paste
/// and mouse buttons. Enabled on registration, disabled on drop.
pub struct TerminalSubscription {
    _private: (),
}

impl TerminalSubscription {
    pub fn register() -> io::Result<Self> {
        execute!(
            stdout(),
            EnableFocusChange,
            EnableBracketedPaste,
            EnableMouseCapture
        )?;
        debug!("anti-cheat terminal reporting enabled");
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalSubscription {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            DisableMouseCapture,
            DisableBracketedPaste,
            DisableFocusChange
        );
        debug!("anti-cheat terminal reporting disabled");
    }
}
