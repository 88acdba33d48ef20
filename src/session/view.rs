// src/session/view.rs

use serde::Serialize;

use super::engine::SessionPhase;
use super::scoring::Score;
use crate::models::{attempt::TestAttempt, question::PublicQuestion};

/// Snapshot of a session for rendering.
///
/// The answer key never appears here; `question` only carries text and options.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub phase: SessionPhase,
    pub test_title: Option<String>,
    pub current_index: usize,
    pub question_count: usize,
    pub question: Option<PublicQuestion>,
    pub answers: Vec<Option<usize>>,
    /// `None` until the test has loaded.
    pub remaining_seconds: Option<u32>,
    pub can_go_next: bool,
    pub can_go_previous: bool,
    pub can_submit: bool,
    pub last_error: Option<String>,
    pub score: Option<Score>,
    pub attempt: Option<TestAttempt>,
}

impl SessionView {
    /// View for a session that has no test loaded (loading or failed to load).
    pub fn empty(phase: SessionPhase) -> Self {
        Self {
            phase,
            test_title: None,
            current_index: 0,
            question_count: 0,
            question: None,
            answers: Vec::new(),
            remaining_seconds: None,
            can_go_next: false,
            can_go_previous: false,
            can_submit: false,
            last_error: None,
            score: None,
            attempt: None,
        }
    }

    /// 1-based position for display, e.g. "Question 2 of 5".
    pub fn position(&self) -> Option<(usize, usize)> {
        self.question.as_ref()?;
        Some((self.current_index + 1, self.question_count))
    }

    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    /// Remaining time as `m:ss`, or `--:--` before the test has loaded.
    pub fn clock(&self) -> String {
        match self.remaining_seconds {
            Some(secs) => format_clock(secs),
            None => "--:--".to_string(),
        }
    }
}

/// Formats seconds as `m:ss`. Minutes are not padded and may exceed 59.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pads_seconds_only() {
        assert_eq!(format_clock(300), "5:00");
        assert_eq!(format_clock(61), "1:01");
        assert_eq!(format_clock(9), "0:09");
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(7200), "120:00");
    }

    #[test]
    fn empty_view_has_placeholder_clock() {
        let view = SessionView::empty(SessionPhase::Loading);
        assert_eq!(view.clock(), "--:--");
        assert_eq!(view.position(), None);
        assert_eq!(view.answered(), 0);
    }
}
