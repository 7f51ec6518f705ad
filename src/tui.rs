//! Terminal UI for a running test: drawing and key handling

use crate::anticheat::{TerminalSubscription, Violation};
use crate::finalizer::{Screen, SubmitReason};
use crate::question::Question;
use crate::runner::Frontend;
use crate::session::{Notice, Phase, SessionEvent, SessionView};
use crate::status_bar::{StatusBarState, StatusDisplayStyle};
use crate::timer::format_clock;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use std::io::{self, Write, stdout};
use unicode_width::UnicodeWidthStr;

/// What a key press means to the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    Session(SessionEvent),
    Redraw,
    Quit,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Banner {
    Info(String),
    Warning(String),
    Danger(String),
}

/// Alternate screen standing in for browser fullscreen
#[derive(Debug, Default)]
pub struct TerminalScreen {
    alternate: bool,
}

impl TerminalScreen {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Screen for TerminalScreen {
    fn is_fullscreen(&self) -> bool {
        self.alternate
    }

    fn enter_fullscreen(&mut self) -> io::Result<()> {
        if !self.alternate {
            execute!(stdout(), EnterAlternateScreen)?;
            self.alternate = true;
        }
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> io::Result<()> {
        if self.alternate {
            self.alternate = false;
            execute!(stdout(), LeaveAlternateScreen)?;
        }
        Ok(())
    }
}

impl Drop for TerminalScreen {
    fn drop(&mut self) {
        let _ = self.exit_fullscreen();
    }
}

/// Navigation and editing state; everything else is read from the session view
pub struct Tui {
    current: usize,
    /// Highlighted option on a multiple-choice question
    option_cursor: usize,
    banner: Option<Banner>,
    low_time_secs: u64,
    display_style: StatusDisplayStyle,
    raw: bool,
    subscription: Option<TerminalSubscription>,
}

impl Tui {
    /// Headless state, no terminal changes
    pub fn new(low_time_secs: u64) -> Self {
        Self {
            current: 0,
            option_cursor: 0,
            banner: None,
            low_time_secs,
            display_style: StatusDisplayStyle::Emoji,
            raw: false,
            subscription: None,
        }
    }

    /// Put the terminal into raw mode for the test
    pub fn attach(low_time_secs: u64) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), cursor::Hide)?;
        let mut tui = Self::new(low_time_secs);
        tui.raw = true;
        Ok(tui)
    }

    pub fn restore(&mut self) -> io::Result<()> {
        self.subscription = None;
        if self.raw {
            self.raw = false;
            execute!(stdout(), cursor::Show, cursor::MoveToColumn(0))?;
            terminal::disable_raw_mode()?;
            println!();
        }
        Ok(())
    }

    pub fn current(&self) -> usize {
        self.current
    }

    // ========================================================================
    // Input
    // ========================================================================

    pub fn handle_key(&mut self, key: KeyEvent, view: &SessionView<'_>) -> UiAction {
        if key.kind == KeyEventKind::Release {
            return UiAction::None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match view.phase {
            Phase::Loading => UiAction::Quit,
            Phase::AwaitingStart => match key.code {
                KeyCode::Enter => UiAction::Session(SessionEvent::Acknowledge),
                KeyCode::Esc | KeyCode::Char('q') => UiAction::Quit,
                KeyCode::Char('c') if ctrl => UiAction::Quit,
                _ => UiAction::None,
            },
            Phase::Submitted => UiAction::Quit,
            Phase::Active | Phase::AutoSubmitPending => {
                if ctrl {
                    return match key.code {
                        KeyCode::Char('s') => UiAction::Session(SessionEvent::SubmitRequested),
                        KeyCode::Char('q') => UiAction::Quit,
                        _ => UiAction::None,
                    };
                }
                match key.code {
                    KeyCode::Esc => {
                        self.banner = None;
                        UiAction::Redraw
                    }
                    KeyCode::F(2) => {
                        self.display_style = self.display_style.next();
                        UiAction::Redraw
                    }
                    KeyCode::Left | KeyCode::BackTab => self.goto(self.current.saturating_sub(1), view),
                    KeyCode::Right | KeyCode::Tab => self.goto(self.current + 1, view),
                    _ => match view.questions.get(self.current) {
                        Some(Question::Mcq { options, .. }) => self.mcq_key(key.code, options.len(), view),
                        Some(Question::Open { .. }) => self.open_key(key.code, view),
                        None => UiAction::None,
                    },
                }
            }
        }
    }

    fn goto(&mut self, index: usize, view: &SessionView<'_>) -> UiAction {
        let last = view.questions.len().saturating_sub(1);
        let index = index.min(last);
        if index == self.current {
            return UiAction::None;
        }
        self.current = index;
        self.option_cursor = view
            .answers
            .get(index)
            .and_then(|a| view.questions[index].options().iter().position(|o| o == a))
            .unwrap_or(0);
        UiAction::Redraw
    }

    fn mcq_key(&mut self, code: KeyCode, len: usize, view: &SessionView<'_>) -> UiAction {
        if len == 0 {
            return UiAction::None;
        }
        let choose = |i: usize| {
            let value = view.questions[self.current].options()[i].clone();
            UiAction::Session(SessionEvent::Answer {
                index: self.current,
                value,
            })
        };
        match code {
            KeyCode::Up => {
                self.option_cursor = self.option_cursor.saturating_sub(1);
                UiAction::Redraw
            }
            KeyCode::Down => {
                self.option_cursor = (self.option_cursor + 1).min(len - 1);
                UiAction::Redraw
            }
            KeyCode::Enter | KeyCode::Char(' ') => choose(self.option_cursor),
            KeyCode::Char(c) => match c.to_digit(10) {
                Some(d) if d >= 1 && (d as usize) <= len => {
                    let i = d as usize - 1;
                    let action = choose(i);
                    self.option_cursor = i;
                    action
                }
                _ => UiAction::None,
            },
            _ => UiAction::None,
        }
    }

    fn open_key(&mut self, code: KeyCode, view: &SessionView<'_>) -> UiAction {
        let mut text = view.answers.get(self.current).unwrap_or_default().to_string();
        match code {
            KeyCode::Char(c) => text.push(c),
            KeyCode::Enter => text.push('\n'),
            KeyCode::Backspace => {
                if text.pop().is_none() {
                    return UiAction::None;
                }
            }
            _ => return UiAction::None,
        }
        UiAction::Session(SessionEvent::Answer {
            index: self.current,
            value: text,
        })
    }

    // ========================================================================
    // Notices
    // ========================================================================

    pub fn show_notice(&mut self, notice: &Notice, threshold: u32) {
        match notice {
            Notice::Violation(v) => self.banner = Some(violation_banner(v, threshold)),
            Notice::AutoSubmitScheduled { violation, .. } => {
                self.banner = Some(violation_banner(violation, threshold))
            }
            Notice::Started { .. } => {
                self.banner = Some(Banner::Info(
                    "Test started. Ctrl+S submits. Good luck!".to_string(),
                ))
            }
            Notice::Submitted { .. } => self.banner = None,
            Notice::Tick { .. } | Notice::Answered { .. } | Notice::Ignored => {}
        }
    }

    pub fn show_error(&mut self, text: &str) {
        self.banner = Some(Banner::Danger(text.to_string()));
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Lines for the current view, without cursor control
    pub fn render_lines(&self, view: &SessionView<'_>, width: usize) -> Vec<String> {
        match view.phase {
            Phase::Loading => vec!["Loading test...".to_string()],
            Phase::AwaitingStart => self.render_rules(view),
            Phase::Active | Phase::AutoSubmitPending => self.render_question(view, width),
            Phase::Submitted => render_submitted(view),
        }
    }

    fn render_rules(&self, view: &SessionView<'_>) -> Vec<String> {
        vec![
            "\x1b[1mMock Test\x1b[0m".to_string(),
            String::new(),
            format!(
                "{} questions, {} minutes.",
                view.questions.len(),
                view.remaining / 60
            ),
            String::new(),
            "During the test the following are recorded as violations:".to_string(),
            "  - leaving the terminal window".to_string(),
            "  - copy, cut and paste".to_string(),
            "  - right-clicking".to_string(),
            format!(
                "After {} violations the test is submitted automatically.",
                view.threshold
            ),
            "Reloading or leaving the test forfeits this attempt.".to_string(),
            String::new(),
            "\x1b[32mPress Enter to start in fullscreen\x1b[0m, Esc to leave.".to_string(),
        ]
    }

    fn render_question(&self, view: &SessionView<'_>, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let status = StatusBarState::from_view(view, self.low_time_secs, self.display_style);
        lines.push(status.render_status(Some(width)));
        lines.push(String::new());

        let Some(question) = view.questions.get(self.current) else {
            return lines;
        };
        let kind = if question.is_mcq() { "Multiple choice" } else { "Open" };
        lines.push(format!(
            "\x1b[1mQuestion {}\x1b[0m \x1b[90m/ {} · {}\x1b[0m",
            self.current + 1,
            view.questions.len(),
            kind
        ));
        lines.push(String::new());
        lines.extend(wrap(question.prompt(), width.max(20)));
        lines.push(String::new());

        match question {
            Question::Mcq { options, .. } => {
                let chosen = view.answers.get(self.current);
                for (i, option) in options.iter().enumerate() {
                    let pointer = if i == self.option_cursor { ">" } else { " " };
                    let mark = if chosen == Some(option.as_str()) { "(•)" } else { "( )" };
                    lines.push(format!("{pointer} {mark} {}. {option}", i + 1));
                }
            }
            Question::Open { .. } => {
                let answer = view.answers.get(self.current).unwrap_or_default();
                if answer.is_empty() {
                    lines.push("\x1b[90mType your answer here...\x1b[0m".to_string());
                } else {
                    for line in answer.split('\n') {
                        lines.extend(wrap(line, width.max(20)));
                    }
                }
                lines.push("\x1b[32m▏\x1b[0m".to_string());
            }
        }

        lines.push(String::new());
        lines.push(navigator(view, self.current));

        if let Some(banner) = &self.banner {
            lines.push(String::new());
            lines.push(match banner {
                Banner::Info(text) => format!("\x1b[36m{text}\x1b[0m"),
                Banner::Warning(text) => format!("\x1b[33m⚠ {text}\x1b[0m \x1b[90m(Esc to dismiss)\x1b[0m"),
                Banner::Danger(text) => format!("\x1b[31m⚠ {text}\x1b[0m"),
            });
        }

        lines.push(String::new());
        lines.push(
            "\x1b[90m←/→ question · ↑/↓ or 1-9 choose · Ctrl+S submit · F2 style · Ctrl+Q abandon\x1b[0m"
                .to_string(),
        );
        lines
    }

    pub fn draw(&mut self, view: &SessionView<'_>) -> io::Result<()> {
        let (width, height) = terminal::size().unwrap_or((80, 24));
        let lines = self.render_lines(view, width as usize);

        let mut out = stdout();
        queue!(out, cursor::MoveTo(0, 0), terminal::Clear(ClearType::All))?;
        for (row, line) in lines.iter().take(height as usize).enumerate() {
            queue!(
                out,
                cursor::MoveTo(0, row as u16),
                crossterm::style::Print(line)
            )?;
        }
        out.flush()
    }
}

impl Frontend for Tui {
    fn handle_key(&mut self, key: KeyEvent, view: &SessionView<'_>) -> UiAction {
        Tui::handle_key(self, key, view)
    }

    fn show_notice(&mut self, notice: &Notice, threshold: u32) {
        Tui::show_notice(self, notice, threshold)
    }

    fn show_error(&mut self, text: &str) {
        Tui::show_error(self, text)
    }

    fn draw(&mut self, view: &SessionView<'_>) -> io::Result<()> {
        Tui::draw(self, view)
    }

    fn watch(&mut self) -> io::Result<()> {
        if self.subscription.is_none() {
            self.subscription = Some(TerminalSubscription::register()?);
        }
        Ok(())
    }

    fn unwatch(&mut self) {
        self.subscription = None;
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

fn violation_banner(v: &Violation, threshold: u32) -> Banner {
    use crate::anticheat::Severity;
    let text = v.message(threshold);
    match v.severity {
        Severity::Warning => Banner::Warning(text),
        Severity::FinalWarning | Severity::AutoSubmit => Banner::Danger(text),
    }
}

fn render_submitted(view: &SessionView<'_>) -> Vec<String> {
    let headline = match view.reason {
        Some(SubmitReason::TimeUp) => "Time is up. Your test was submitted.",
        Some(SubmitReason::Violations) => "Your test was submitted due to repeated violations.",
        _ => "Test submitted!",
    };
    vec![
        format!("\x1b[32m✓ {headline}\x1b[0m"),
        String::new(),
        format!(
            "Answered {} of {} questions, {} remaining on the clock.",
            view.answers.answered_count(view.questions.len()),
            view.questions.len(),
            format_clock(view.remaining)
        ),
        "Run `mockprep results` to review your submission.".to_string(),
        String::new(),
        "\x1b[90mPress any key to exit.\x1b[0m".to_string(),
    ]
}

/// One cell per question, answered ones marked
fn navigator(view: &SessionView<'_>, current: usize) -> String {
    (0..view.questions.len())
        .map(|i| {
            if i == current {
                format!("\x1b[44m[{}]\x1b[0m", i + 1)
            } else if view.answers.is_answered(i) {
                format!("\x1b[32m[{}✓]\x1b[0m", i + 1)
            } else {
                format!("\x1b[90m[{}]\x1b[0m", i + 1)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Greedy word wrap by display width
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.width() + 1 + word.width() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}
