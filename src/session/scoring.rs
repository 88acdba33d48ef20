// src/session/scoring.rs

use serde::Serialize;

use crate::models::question::Question;

/// Outcome of grading one set of answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub correct_answers: u32,
    pub total_questions: u32,
    /// Percentage, rounded half up.
    pub percent: u32,
}

/// `correct / total * 100`, rounded half up, in integer arithmetic.
/// A zero total scores 0.
pub fn round_percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    ((correct * 200 + total) / (total * 2)) as u32
}

/// Grades `answers` positionally against `questions`.
///
/// The total is the number of questions, not of answers: unset slots and
/// missing trailing slots count as wrong.
pub fn score_answers(questions: &[Question], answers: &[Option<usize>]) -> Score {
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(i, q)| q.is_correct(answers.get(*i).copied().flatten()))
        .count() as u32;
    let total = questions.len() as u32;

    Score {
        correct_answers: correct,
        total_questions: total,
        percent: round_percent(correct, total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_percent(37, 50), 74);
        assert_eq!(round_percent(1, 3), 33);
        assert_eq!(round_percent(2, 3), 67);
        assert_eq!(round_percent(1, 8), 13);
        assert_eq!(round_percent(1, 200), 1);
        assert_eq!(round_percent(0, 7), 0);
        assert_eq!(round_percent(7, 7), 100);
    }

    #[test]
    fn zero_total_scores_zero() {
        assert_eq!(round_percent(0, 0), 0);
    }

    #[test]
    fn three_of_five_scores_sixty() {
        let qs = questions(&[0, 1, 1, 0, 3]);
        let answers = [Some(0), Some(1), Some(2), Some(0), Some(2)];
        let score = score_answers(&qs, &answers);
        assert_eq!(score.correct_answers, 3);
        assert_eq!(score.total_questions, 5);
        assert_eq!(score.percent, 60);

        let answers = [Some(0), Some(1), Some(2), Some(0), Some(3)];
        let score = score_answers(&qs, &answers);
        assert_eq!(score.correct_answers, 4);
        assert_eq!(score.percent, 80);
    }

    #[test]
    fn unset_and_missing_slots_count_as_wrong() {
        let qs = questions(&[0, 0, 0]);
        let score = score_answers(&qs, &[None, Some(0)]);
        assert_eq!(score.correct_answers, 1);
        assert_eq!(score.total_questions, 3);
        assert_eq!(score.percent, 33);
    }

    #[test]
    fn all_unset_scores_zero() {
        let qs = questions(&[2]);
        let score = score_answers(&qs, &[None]);
        assert_eq!(
            score,
            Score {
                correct_answers: 0,
                total_questions: 1,
                percent: 0
            }
        );
    }
}
