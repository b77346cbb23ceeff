use serde::Serialize;

/// A one-shot countdown in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    remaining: u32,
    expired: bool,
}

impl Countdown {
    pub fn new(seconds: u32) -> Self {
        Self {
            remaining: seconds,
            expired: false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Advances by one second. Returns `true` only on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.expired {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expired = true;
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    SessionExpired,
    QuestionExpired,
}

/// The whole-test and per-question countdowns of one session.
///
/// Driven by [`tick`](Self::tick), one call per elapsed second. Tests with no time limit
/// get no countdowns at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimers {
    session: Option<Countdown>,
    question: Option<Countdown>,
    running: bool,
}

impl SessionTimers {
    pub fn new(session_seconds: Option<u32>) -> Self {
        Self {
            session: session_seconds.filter(|s| *s > 0).map(Countdown::new),
            question: None,
            running: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self, question_seconds: u32) {
        if !self.is_enabled() {
            return;
        }
        self.running = true;
        self.reset_question(question_seconds);
    }

    /// Restarts the question countdown; called whenever the active question changes.
    pub fn reset_question(&mut self, seconds: u32) {
        if self.running {
            self.question = Some(Countdown::new(seconds.max(1)));
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn session_remaining(&self) -> Option<u32> {
        self.session.map(|c| c.remaining())
    }

    pub fn question_remaining(&self) -> Option<u32> {
        self.question.map(|c| c.remaining())
    }

    /// At most one event per tick; session expiry wins over question expiry and stops
    /// both countdowns.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.running {
            return None;
        }
        if let Some(session) = self.session.as_mut() {
            if session.tick() {
                self.stop();
                return Some(TimerEvent::SessionExpired);
            }
        }
        if let Some(question) = self.question.as_mut() {
            if question.tick() {
                return Some(TimerEvent::QuestionExpired);
            }
        }
        None
    }
}
