use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("Question {index} lists option '{option}' more than once")]
    DuplicateOption { index: usize, option: String },
    #[error("Question {index}: correct option '{answer}' is not one of its options")]
    AnswerNotAnOption { index: usize, answer: String },
}

/// A multiple-choice question. Options are opaque tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: String,
}

/// A comprehension quiz generated from a story.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizContent {
    /// Identifier assigned by the content service; never interpreted.
    pub quiz_id: serde_json::Value,
    questions: Vec<QuizQuestion>,
}

impl QuizContent {
    /// Validates that options are unique and the correct option is among them.
    pub fn new(
        quiz_id: serde_json::Value,
        questions: Vec<QuizQuestion>,
    ) -> Result<Self, QuizError> {
        for (index, question) in questions.iter().enumerate() {
            let mut seen = HashSet::new();
            for option in &question.options {
                if !seen.insert(option.as_str()) {
                    return Err(QuizError::DuplicateOption {
                        index,
                        option: option.clone(),
                    });
                }
            }
            if !seen.contains(question.correct_option.as_str()) {
                return Err(QuizError::AnswerNotAnOption {
                    index,
                    answer: question.correct_option.clone(),
                });
            }
        }
        Ok(Self { quiz_id, questions })
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }
}
