//! Status line shown above the current question

use crate::session::{Phase, SessionView};
use crate::timer::format_clock;
use unicode_width::UnicodeWidthStr;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StatusDisplayStyle {
    /// Use emojis and symbols
    Emoji,
    /// Use text labels, for terminals without emoji fonts
    Text,
}

impl StatusDisplayStyle {
    pub fn next(&self) -> Self {
        match self {
            StatusDisplayStyle::Emoji => StatusDisplayStyle::Text,
            StatusDisplayStyle::Text => StatusDisplayStyle::Emoji,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StatusDisplayStyle::Emoji => "Emoji",
            StatusDisplayStyle::Text => "Text",
        }
    }
}

#[derive(Clone, Debug)]
pub struct StatusBarState {
    pub phase: Phase,
    pub remaining: u64,
    pub low_time: bool,
    pub answered: usize,
    pub total: usize,
    pub violations: u32,
    pub threshold: u32,
    pub display_style: StatusDisplayStyle,
}

impl StatusBarState {
    pub fn from_view(view: &SessionView<'_>, low_time_secs: u64, style: StatusDisplayStyle) -> Self {
        Self {
            phase: view.phase,
            remaining: view.remaining,
            low_time: view.remaining <= low_time_secs,
            answered: view.answers.answered_count(view.questions.len()),
            total: view.questions.len(),
            violations: view.violations,
            threshold: view.threshold,
            display_style: style,
        }
    }

    /// Timer, red once time is low
    pub fn clock_string(&self) -> String {
        let clock = format_clock(self.remaining);
        let icon = match self.display_style {
            StatusDisplayStyle::Emoji => "⏱ ",
            StatusDisplayStyle::Text => "Time ",
        };
        if self.low_time {
            format!("\x1b[31m{icon}{clock}\x1b[90m")
        } else {
            format!("{icon}{clock}")
        }
    }

    pub fn violations_string(&self) -> String {
        let label = match self.display_style {
            StatusDisplayStyle::Emoji => "⚠",
            StatusDisplayStyle::Text => "Violations",
        };
        let text = format!("{} {}/{}", label, self.violations, self.threshold);
        if self.violations == 0 {
            text
        } else if self.violations + 1 >= self.threshold {
            format!("\x1b[31m{text}\x1b[90m")
        } else {
            format!("\x1b[33m{text}\x1b[90m")
        }
    }

    pub fn render_status(&self, term_width: Option<usize>) -> String {
        let content = match self.display_style {
            StatusDisplayStyle::Emoji => format!(
                "{} │ {} │ ✓ {}/{} │ {}",
                self.phase,
                self.clock_string(),
                self.answered,
                self.total,
                self.violations_string()
            ),
            StatusDisplayStyle::Text => format!(
                " \x1b[1m{}\x1b[0m\x1b[90m | {} | Answered: {}/{} | {}",
                self.phase,
                self.clock_string(),
                self.answered,
                self.total,
                self.violations_string()
            ),
        };

        // Center using the visible width only
        let padding = match term_width {
            Some(width) => {
                let visible = strip_ansi(&content).width();
                width.saturating_sub(visible) / 2
            }
            None => 0,
        };
        format!("\x1b[90m{}{}\x1b[0m", " ".repeat(padding), content)
    }
}

/// Drop `ESC [ ... m` colour sequences
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}
