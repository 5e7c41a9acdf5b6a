//! Answer Evaluation
//!
//! Pure scoring of submitted answers against an answer key. Scoring never fails:
//! missing, malformed or unparsable submissions simply count as incorrect.

use crate::{
    math::{MathContent, exact_integer},
    quiz::QuizContent,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Raw user submissions keyed by question or problem index.
pub type SubmittedAnswers = BTreeMap<usize, String>;

/// The correct response for every index, derived once from fetched content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerKey {
    /// Correct option per question, compared as exact strings.
    Quiz(BTreeMap<usize, String>),
    /// Integer answer per problem, compared numerically.
    Math(BTreeMap<usize, i64>),
}

impl AnswerKey {
    pub fn for_quiz(quiz: &QuizContent) -> Self {
        AnswerKey::Quiz(
            quiz.questions()
                .iter()
                .enumerate()
                .map(|(idx, q)| (idx, q.correct_option.clone()))
                .collect(),
        )
    }

    pub fn for_math(math: &MathContent) -> Self {
        AnswerKey::Math(
            math.problems
                .iter()
                .enumerate()
                .map(|(idx, p)| (idx, p.answer()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            AnswerKey::Quiz(key) => key.len(),
            AnswerKey::Math(key) => key.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        match self {
            AnswerKey::Quiz(key) => key.contains_key(&index),
            AnswerKey::Math(key) => key.contains_key(&index),
        }
    }
}

/// Number of correct answers out of the key's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

/// Outcome for a single question after scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub index: usize,
    pub submitted: Option<String>,
    pub expected: String,
    pub correct: bool,
}

/// Counts the submissions that match the key under the key's comparison rule.
pub fn score(key: &AnswerKey, submitted: &SubmittedAnswers) -> Score {
    let correct = review(key, submitted).iter().filter(|v| v.correct).count();
    Score {
        correct,
        total: key.len(),
    }
}

/// Produces a verdict for every index of the key, in index order.
pub fn review(key: &AnswerKey, submitted: &SubmittedAnswers) -> Vec<Verdict> {
    match key {
        AnswerKey::Quiz(key) => key
            .iter()
            .map(|(&index, expected)| {
                let given = submitted.get(&index);
                Verdict {
                    index,
                    submitted: given.cloned(),
                    expected: expected.clone(),
                    correct: given == Some(expected),
                }
            })
            .collect(),
        AnswerKey::Math(key) => key
            .iter()
            .map(|(&index, &expected)| {
                let given = submitted.get(&index);
                Verdict {
                    index,
                    submitted: given.cloned(),
                    expected: expected.to_string(),
                    correct: given.is_some_and(|raw| numeric_match(raw, expected)),
                }
            })
            .collect(),
    }
}

/// Exact numeric comparison of raw input against an integer answer.
///
/// `"12"`, `" 12 "` and `"12.0"` all match 12; `""`, `"12.5"` and `"twelve"` do not.
fn numeric_match(raw: &str, expected: i64) -> bool {
    parse_integer(raw.trim()) == Some(expected)
}

fn parse_integer(raw: &str) -> Option<i64> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    // "12.0" and "12." are compared on their digits, never through a float.
    raw.split_once('.')
        .filter(|(_, fraction)| fraction.bytes().all(|b| b == b'0'))
        .and_then(|(whole, _)| whole.parse::<i64>().ok())
        .or_else(|| raw.parse::<f64>().ok().and_then(exact_integer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz_key(answers: &[&str]) -> AnswerKey {
        AnswerKey::Quiz(
            answers
                .iter()
                .enumerate()
                .map(|(i, a)| (i, a.to_string()))
                .collect(),
        )
    }

    fn submissions(pairs: &[(usize, &str)]) -> SubmittedAnswers {
        pairs.iter().map(|(i, v)| (*i, v.to_string())).collect()
    }

    #[test]
    fn test_no_submissions_scores_zero() {
        let key = quiz_key(&["B", "A", "C"]);
        assert_eq!(
            score(&key, &SubmittedAnswers::new()),
            Score {
                correct: 0,
                total: 3
            }
        );
    }

    #[test]
    fn test_perfect_quiz() {
        let key = quiz_key(&["B", "A", "C"]);
        let answers = submissions(&[(0, "B"), (1, "A"), (2, "C")]);
        assert_eq!(score(&key, &answers).correct, 3);
    }

    #[test]
    fn test_quiz_comparison_is_exact() {
        let key = quiz_key(&["Blue", "Red"]);
        let answers = submissions(&[(0, "blue"), (1, "Red ")]);
        assert_eq!(score(&key, &answers).correct, 0);
    }

    #[test]
    fn test_submissions_outside_key_are_ignored() {
        let key = quiz_key(&["A"]);
        let answers = submissions(&[(0, "A"), (7, "A")]);
        assert_eq!(
            score(&key, &answers),
            Score {
                correct: 1,
                total: 1
            }
        );
    }

    #[test]
    fn test_math_numeric_rules() {
        let key = AnswerKey::Math([(0, 12), (1, 3), (2, 0), (3, 7), (4, -4)].into());
        let answers =
            submissions(&[(0, " 12 "), (1, "3.0"), (2, ""), (3, "7.0000001"), (4, "-4")]);
        let verdicts = review(&key, &answers);
        let correct: Vec<bool> = verdicts.iter().map(|v| v.correct).collect();
        assert_eq!(correct, vec![true, true, false, false, true]);
        assert_eq!(score(&key, &answers).correct, 3);
    }

    #[test]
    fn test_math_large_answers_are_exact() {
        let key = AnswerKey::Math([(0, 9_007_199_254_740_993), (1, 9_007_199_254_740_993)].into());
        let answers = submissions(&[(0, "9007199254740992.0"), (1, "9007199254740993.00")]);
        let correct: Vec<bool> = review(&key, &answers).iter().map(|v| v.correct).collect();
        assert_eq!(correct, vec![false, true]);
    }

    #[test]
    fn test_math_unparsable_is_incorrect() {
        let key = AnswerKey::Math([(0, 5), (1, 6)].into_iter().collect());
        let answers = submissions(&[(0, "five"), (1, "NaN")]);
        assert_eq!(score(&key, &answers).correct, 0);
    }

    #[test]
    fn test_review_reports_missing_answers() {
        let key = AnswerKey::Math([(0, 5), (1, 6)].into_iter().collect());
        let answers = submissions(&[(1, "6")]);
        let verdicts = review(&key, &answers);
        assert_eq!(verdicts[0].submitted, None);
        assert_eq!(verdicts[0].expected, "5");
        assert!(!verdicts[0].correct);
        assert!(verdicts[1].correct);
    }
}
