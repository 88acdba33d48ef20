// src/session/engine.rs

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use super::backend::BackendError;
use super::scoring::{Score, score_answers};
use super::view::SessionView;
use crate::models::{
    attempt::{CreateAttemptRequest, TestAttempt},
    mock_test::MockTest,
    question::Question,
};

/// Lifecycle of one test-taking session.
///
/// `Completed`, `NotFound`, `Unauthorized` and `Unavailable` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Loading,
    InProgress,
    Submitting,
    Completed,
    NotFound,
    /// The question set was refused; the user has to sign in again.
    Unauthorized,
    /// Loading failed for another reason.
    Unavailable,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Completed
                | SessionPhase::NotFound
                | SessionPhase::Unauthorized
                | SessionPhase::Unavailable
        )
    }
}

/// What started a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("mock test not found or has no questions")]
    NotFound,
    #[error("mock test has no usable duration")]
    InvalidDuration,
    #[error("option {option} does not exist (question has {available} options)")]
    InvalidOption { option: usize, available: usize },
    #[error("question {} has not been answered", .index + 1)]
    Unanswered { index: usize },
    #[error("already at the last question")]
    AtLastQuestion,
    #[error("already at the first question")]
    AtFirstQuestion,
    #[error("{unanswered} question(s) still unanswered")]
    Incomplete { unanswered: usize },
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("the test has already been submitted")]
    AlreadyCompleted,
    #[error("no submission is in flight")]
    NoSubmissionInFlight,
    #[error("session is not active")]
    Inactive,
}

/// An attempt that has passed the latch and is waiting for the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub trigger: SubmitTrigger,
    pub score: Score,
    pub request: CreateAttemptRequest,
}

/// Result of one timer tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Session already completed; the timer should be torn down.
    Stopped,
    Running { remaining_seconds: u32 },
    /// The countdown hit zero and claimed the latch.
    Expired(PendingSubmission),
}

/// Client-side state machine for one mock test attempt.
///
/// Holds the fetched questions, one answer slot per question, and the
/// countdown. The `Submitting` phase is the submission latch: it is entered
/// exactly once per submission and only `finish_submission` leaves it.
#[derive(Debug, Clone)]
pub struct QuizSession {
    test: MockTest,
    questions: Vec<Question>,
    current: usize,
    answers: Vec<Option<usize>>,
    remaining_seconds: u32,
    expired: bool,
    phase: SessionPhase,
    attempt: Option<TestAttempt>,
    score: Option<Score>,
    last_error: Option<String>,
    failed_submissions: u32,
}

impl QuizSession {
    /// Starts a session over a fetched test and its questions.
    pub fn start(test: MockTest, questions: Vec<Question>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NotFound);
        }
        let remaining_seconds = match test.duration_seconds() {
            Some(secs) if secs > 0 => secs,
            _ => return Err(SessionError::InvalidDuration),
        };
        if questions.len() as i64 != i64::from(test.total_questions) {
            tracing::debug!(
                mock_test_id = test.id,
                declared = test.total_questions,
                fetched = questions.len(),
                "Declared question count differs from fetched set; using fetched"
            );
        }

        let answers = vec![None; questions.len()];
        Ok(Self {
            test,
            questions,
            current: 0,
            answers,
            remaining_seconds,
            expired: false,
            phase: SessionPhase::InProgress,
            attempt: None,
            score: None,
            last_error: None,
            failed_submissions: 0,
        })
    }

    pub fn test(&self) -> &MockTest {
        &self.test
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_completed(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    /// `true` once the countdown has reached zero.
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn unanswered(&self) -> usize {
        self.answers.iter().filter(|a| a.is_none()).count()
    }

    pub fn attempt(&self) -> Option<&TestAttempt> {
        self.attempt.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn failed_submissions(&self) -> u32 {
        self.failed_submissions
    }

    pub fn can_go_next(&self) -> bool {
        self.phase != SessionPhase::Completed
            && self.current + 1 < self.questions.len()
            && self.answers[self.current].is_some()
    }

    pub fn can_go_previous(&self) -> bool {
        self.phase != SessionPhase::Completed && self.current > 0
    }

    /// Manual submission needs every slot set, unless time already ran out.
    pub fn can_submit(&self) -> bool {
        self.phase == SessionPhase::InProgress && (self.expired || self.unanswered() == 0)
    }

    /// Records `option` for the current question, replacing any earlier choice.
    pub fn select_answer(&mut self, option: usize) -> Result<(), SessionError> {
        self.ensure_accepting_answers()?;
        let available = self.questions[self.current].option_count();
        if option >= available {
            return Err(SessionError::InvalidOption { option, available });
        }
        self.answers[self.current] = Some(option);
        Ok(())
    }

    /// Moves forward one question. The current one must be answered.
    pub fn go_to_next(&mut self) -> Result<usize, SessionError> {
        self.ensure_not_completed()?;
        if self.answers[self.current].is_none() {
            return Err(SessionError::Unanswered {
                index: self.current,
            });
        }
        if self.current + 1 >= self.questions.len() {
            return Err(SessionError::AtLastQuestion);
        }
        self.current += 1;
        Ok(self.current)
    }

    /// Moves back one question. Answers are kept.
    pub fn go_to_previous(&mut self) -> Result<usize, SessionError> {
        self.ensure_not_completed()?;
        if self.current == 0 {
            return Err(SessionError::AtFirstQuestion);
        }
        self.current -= 1;
        Ok(self.current)
    }

    /// Advances the countdown by one second.
    ///
    /// Reaching zero claims the latch with a timeout submission. If a manual
    /// submission already holds the latch, the expiry is recorded and that
    /// submission stands.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase == SessionPhase::Completed {
            return TickOutcome::Stopped;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 || self.expired {
            return TickOutcome::Running {
                remaining_seconds: self.remaining_seconds,
            };
        }

        self.expired = true;
        match self.begin_submission(SubmitTrigger::Timeout) {
            Ok(pending) => TickOutcome::Expired(pending),
            Err(_) => TickOutcome::Running {
                remaining_seconds: 0,
            },
        }
    }

    /// Claims the submission latch and grades the answers.
    ///
    /// Fails without side effects when a submission is in flight, the session
    /// is completed, or a manual submission is attempted with unanswered
    /// questions before time ran out.
    pub fn begin_submission(
        &mut self,
        trigger: SubmitTrigger,
    ) -> Result<PendingSubmission, SessionError> {
        match self.phase {
            SessionPhase::Completed => return Err(SessionError::AlreadyCompleted),
            SessionPhase::Submitting => return Err(SessionError::SubmissionInFlight),
            SessionPhase::InProgress => {}
            _ => return Err(SessionError::Inactive),
        }
        if trigger == SubmitTrigger::Manual && !self.expired {
            let unanswered = self.unanswered();
            if unanswered > 0 {
                return Err(SessionError::Incomplete { unanswered });
            }
        }

        let score = score_answers(&self.questions, &self.answers);
        let request = CreateAttemptRequest {
            user_id: None,
            mock_test_id: self.test.id,
            score: score.percent as i32,
            correct_answers: score.correct_answers as i32,
            total_questions: score.total_questions as i32,
            completed_at: Utc::now(),
        };

        self.phase = SessionPhase::Submitting;
        self.last_error = None;
        tracing::debug!(
            mock_test_id = self.test.id,
            ?trigger,
            correct = score.correct_answers,
            total = score.total_questions,
            "Submitting attempt"
        );

        Ok(PendingSubmission {
            trigger,
            score,
            request,
        })
    }

    /// Applies the recorder's answer to the in-flight submission.
    ///
    /// Success completes the session for good. Failure releases the latch and
    /// returns to `InProgress`; nothing is retried automatically.
    pub fn finish_submission(
        &mut self,
        result: Result<TestAttempt, BackendError>,
    ) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Submitting {
            return Err(SessionError::NoSubmissionInFlight);
        }
        match result {
            Ok(attempt) => {
                tracing::info!(
                    mock_test_id = self.test.id,
                    attempt_id = attempt.id,
                    score = attempt.score,
                    "Test completed"
                );
                self.score = Some(score_answers(&self.questions, &self.answers));
                self.attempt = Some(attempt);
                self.phase = SessionPhase::Completed;
            }
            Err(err) => {
                self.failed_submissions += 1;
                tracing::warn!(
                    mock_test_id = self.test.id,
                    failures = self.failed_submissions,
                    "Submission failed: {}",
                    err
                );
                self.last_error = Some(err.to_string());
                self.phase = SessionPhase::InProgress;
            }
        }
        Ok(())
    }

    /// Render snapshot of the session.
    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase,
            test_title: Some(self.test.title.clone()),
            current_index: self.current,
            question_count: self.questions.len(),
            question: Some(self.current_question().to_public()),
            answers: self.answers.clone(),
            remaining_seconds: Some(self.remaining_seconds),
            can_go_next: self.can_go_next(),
            can_go_previous: self.can_go_previous(),
            can_submit: self.can_submit(),
            last_error: self.last_error.clone(),
            score: self.score,
            attempt: self.attempt.clone(),
        }
    }

    fn ensure_not_completed(&self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Completed {
            return Err(SessionError::AlreadyCompleted);
        }
        Ok(())
    }

    fn ensure_accepting_answers(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::InProgress => Ok(()),
            SessionPhase::Submitting => Err(SessionError::SubmissionInFlight),
            SessionPhase::Completed => Err(SessionError::AlreadyCompleted),
            _ => Err(SessionError::Inactive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mock_test::Difficulty;

    fn mock_test(duration_minutes: i32, declared: i32) -> MockTest {
        MockTest {
            id: 1,
            title: "Sample".into(),
            description: "d".into(),
            duration_minutes,
            total_questions: declared,
            difficulty: Difficulty::Beginner,
            image_url: "https://img.example.com/x.png".into(),
            author_id: None,
            featured: false,
        }
    }

    fn questions(correct: &[usize]) -> Vec<Question> {
        correct
            .iter()
            .enumerate()
            .map(|(i, c)| Question {
                id: i as i64 + 1,
                mock_test_id: 1,
                text: format!("Q{}", i + 1),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_option: *c,
                explanation: String::new(),
            })
            .collect()
    }

    fn session(correct: &[usize]) -> QuizSession {
        QuizSession::start(mock_test(5, correct.len() as i32), questions(correct)).unwrap()
    }

    fn attempt_for(pending: &PendingSubmission) -> TestAttempt {
        TestAttempt {
            id: 1,
            user_id: 9,
            mock_test_id: pending.request.mock_test_id,
            score: pending.request.score,
            correct_answers: pending.request.correct_answers,
            total_questions: pending.request.total_questions,
            completed_at: pending.request.completed_at,
        }
    }

    fn answer_all(s: &mut QuizSession, answers: &[usize]) {
        for (i, a) in answers.iter().enumerate() {
            s.select_answer(*a).unwrap();
            if i + 1 < answers.len() {
                s.go_to_next().unwrap();
            }
        }
    }

    #[test]
    fn start_initializes_unset_slots_and_countdown() {
        for n in [1usize, 3, 50] {
            let s = session(&vec![0; n]);
            assert_eq!(s.answers().len(), n);
            assert!(s.answers().iter().all(Option::is_none));
            assert_eq!(s.remaining_seconds(), 300);
            assert_eq!(s.current_index(), 0);
            assert_eq!(s.phase(), SessionPhase::InProgress);
        }
    }

    #[test]
    fn empty_question_set_is_not_found() {
        let err = QuizSession::start(mock_test(5, 3), Vec::new()).unwrap_err();
        assert_eq!(err, SessionError::NotFound);
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        let err = QuizSession::start(mock_test(0, 1), questions(&[0])).unwrap_err();
        assert_eq!(err, SessionError::InvalidDuration);
    }

    #[test]
    fn overflowing_or_negative_duration_is_rejected() {
        for minutes in [i32::MAX, 71_582_789, -1] {
            let err = QuizSession::start(mock_test(minutes, 1), questions(&[0])).unwrap_err();
            assert_eq!(err, SessionError::InvalidDuration);
        }
    }

    #[test]
    fn fetched_count_wins_over_declared_count() {
        let mut s = QuizSession::start(mock_test(5, 10), questions(&[1, 1])).unwrap();
        answer_all(&mut s, &[1, 1]);
        let pending = s.begin_submission(SubmitTrigger::Manual).unwrap();
        assert_eq!(pending.request.total_questions, 2);
        assert_eq!(pending.request.score, 100);
    }

    #[test]
    fn select_answer_only_touches_current_slot_and_last_write_wins() {
        let mut s = session(&[0, 0, 0]);
        s.select_answer(1).unwrap();
        s.go_to_next().unwrap();
        s.select_answer(2).unwrap();
        s.select_answer(3).unwrap();
        assert_eq!(s.answers(), &[Some(1), Some(3), None]);
    }

    #[test]
    fn out_of_range_option_is_rejected() {
        let mut s = session(&[0]);
        let err = s.select_answer(4).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidOption {
                option: 4,
                available: 4
            }
        );
        assert_eq!(s.answers(), &[None]);
    }

    #[test]
    fn next_from_unanswered_question_changes_nothing() {
        let mut s = session(&[0, 0]);
        assert_eq!(s.go_to_next(), Err(SessionError::Unanswered { index: 0 }));
        assert_eq!(s.current_index(), 0);

        s.select_answer(0).unwrap();
        assert_eq!(s.go_to_next(), Ok(1));
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn next_is_refused_at_last_question() {
        let mut s = session(&[0]);
        s.select_answer(0).unwrap();
        assert_eq!(s.go_to_next(), Err(SessionError::AtLastQuestion));
        assert!(!s.can_go_next());
    }

    #[test]
    fn previous_keeps_answers_and_stops_at_first() {
        let mut s = session(&[0, 0]);
        assert_eq!(s.go_to_previous(), Err(SessionError::AtFirstQuestion));
        s.select_answer(2).unwrap();
        s.go_to_next().unwrap();
        assert_eq!(s.go_to_previous(), Ok(0));
        assert_eq!(s.answers(), &[Some(2), None]);
    }

    #[test]
    fn manual_submission_requires_every_answer() {
        let mut s = session(&[0, 0]);
        s.select_answer(0).unwrap();
        assert_eq!(
            s.begin_submission(SubmitTrigger::Manual),
            Err(SessionError::Incomplete { unanswered: 1 })
        );
        assert_eq!(s.phase(), SessionPhase::InProgress);
    }

    #[test]
    fn latch_rejects_second_submission_and_answer_changes() {
        let mut s = session(&[0]);
        s.select_answer(0).unwrap();
        s.begin_submission(SubmitTrigger::Manual).unwrap();

        assert_eq!(
            s.begin_submission(SubmitTrigger::Manual),
            Err(SessionError::SubmissionInFlight)
        );
        assert_eq!(s.select_answer(1), Err(SessionError::SubmissionInFlight));
        assert_eq!(s.phase(), SessionPhase::Submitting);
    }

    #[test]
    fn success_completes_exactly_once() {
        let mut s = session(&[0, 1, 1, 0, 3]);
        answer_all(&mut s, &[0, 1, 2, 0, 2]);
        let pending = s.begin_submission(SubmitTrigger::Manual).unwrap();
        assert_eq!(pending.request.correct_answers, 3);
        assert_eq!(pending.request.score, 60);

        s.finish_submission(Ok(attempt_for(&pending))).unwrap();
        assert!(s.is_completed());
        assert_eq!(s.attempt().map(|a| a.score), Some(60));

        assert_eq!(
            s.begin_submission(SubmitTrigger::Manual),
            Err(SessionError::AlreadyCompleted)
        );
        assert_eq!(
            s.finish_submission(Ok(attempt_for(&pending))),
            Err(SessionError::NoSubmissionInFlight)
        );
        assert_eq!(s.tick(), TickOutcome::Stopped);
        assert_eq!(s.select_answer(0), Err(SessionError::AlreadyCompleted));
    }

    #[test]
    fn failure_releases_latch_for_retry() {
        let mut s = session(&[0]);
        s.select_answer(0).unwrap();
        s.begin_submission(SubmitTrigger::Manual).unwrap();
        s.finish_submission(Err(BackendError::Transport("connection reset".into())))
            .unwrap();

        assert_eq!(s.phase(), SessionPhase::InProgress);
        assert!(!s.is_completed());
        assert_eq!(s.failed_submissions(), 1);
        assert!(s.last_error().unwrap().contains("connection reset"));

        let pending = s.begin_submission(SubmitTrigger::Manual).unwrap();
        assert_eq!(s.last_error(), None);
        s.finish_submission(Ok(attempt_for(&pending))).unwrap();
        assert!(s.is_completed());
    }

    #[test]
    fn countdown_expiry_submits_unanswered_test() {
        let mut s = QuizSession::start(mock_test(1, 1), questions(&[2])).unwrap();
        assert_eq!(s.remaining_seconds(), 60);

        for expected in (1..60).rev() {
            assert_eq!(
                s.tick(),
                TickOutcome::Running {
                    remaining_seconds: expected
                }
            );
        }
        let pending = match s.tick() {
            TickOutcome::Expired(p) => p,
            other => panic!("expected expiry, got {:?}", other),
        };
        assert_eq!(pending.trigger, SubmitTrigger::Timeout);
        assert_eq!(pending.request.correct_answers, 0);
        assert_eq!(pending.request.score, 0);
        assert_eq!(pending.request.total_questions, 1);
        assert_eq!(s.remaining_seconds(), 0);
        assert_eq!(s.phase(), SessionPhase::Submitting);

        // Further ticks stay clamped and never claim the latch again.
        assert_eq!(
            s.tick(),
            TickOutcome::Running {
                remaining_seconds: 0
            }
        );
    }

    #[test]
    fn expiry_during_manual_submission_does_not_double_submit() {
        let mut s = QuizSession::start(mock_test(1, 1), questions(&[0])).unwrap();
        s.select_answer(0).unwrap();
        for _ in 0..59 {
            s.tick();
        }
        s.begin_submission(SubmitTrigger::Manual).unwrap();
        assert_eq!(
            s.tick(),
            TickOutcome::Running {
                remaining_seconds: 0
            }
        );
        assert!(s.is_expired());
        assert_eq!(s.phase(), SessionPhase::Submitting);
    }

    #[test]
    fn after_expiry_failure_manual_retry_skips_completeness_check() {
        let mut s = QuizSession::start(mock_test(1, 2), questions(&[0, 0])).unwrap();
        for _ in 0..60 {
            s.tick();
        }
        s.finish_submission(Err(BackendError::Transport("down".into())))
            .unwrap();
        assert_eq!(s.phase(), SessionPhase::InProgress);
        assert!(s.can_submit());

        // No automatic resubmission from later ticks.
        assert_eq!(
            s.tick(),
            TickOutcome::Running {
                remaining_seconds: 0
            }
        );
        let pending = s.begin_submission(SubmitTrigger::Manual).unwrap();
        assert_eq!(pending.request.correct_answers, 0);
    }

    #[test]
    fn view_hides_answer_key() {
        let s = session(&[3]);
        let view = s.view();
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["question"].get("correctOption").is_none());
        assert_eq!(view.question_count, 1);
        assert_eq!(view.remaining_seconds, Some(300));
        assert!(!view.can_submit);
    }
}
