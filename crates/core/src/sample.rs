//! Built-in sample content.
//!
//! `SampleContentClient` answers every content request locally. Stories,
//! routines and quizzes are deterministic; math problems are drawn at random
//! but always have exact integer answers.

use crate::{
    content::{ContentClient, ContentOperation, ContentServiceError},
    math::{MathContent, MathProblem, Operation},
    quiz::{QuizContent, QuizError, QuizQuestion},
    segmenter,
};
use async_trait::async_trait;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::sync::Mutex;

/// Problems per worksheet.
const PROBLEM_COUNT: usize = 5;

const FILLER_WORDS: [&str; 4] = ["Moon", "River", "Apple", "Kite"];

/// A `ContentClient` for development and integration testing.
pub struct SampleContentClient {
    rng: Mutex<StdRng>,
}

impl SampleContentClient {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// A client whose math worksheets are reproducible.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SampleContentClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Largest operand for addition and subtraction.
fn max_operand(age: u8) -> i64 {
    match age {
        0..=5 => 10,
        6..=8 => 20,
        _ => 100,
    }
}

/// Largest factor for multiplication and division.
fn max_factor(age: u8) -> i64 {
    match age {
        0..=5 => 5,
        6..=8 => 10,
        _ => 12,
    }
}

/// Draws operands so that the result is a non-negative integer.
fn draw_operands(rng: &mut StdRng, age: u8, operation: Operation) -> (i64, i64) {
    match operation {
        Operation::Addition => {
            let max = max_operand(age);
            (rng.random_range(1..=max), rng.random_range(1..=max))
        }
        Operation::Subtraction => {
            let left = rng.random_range(1..=max_operand(age));
            (left, rng.random_range(1..=left))
        }
        Operation::Multiplication => {
            let max = max_factor(age);
            (rng.random_range(1..=max), rng.random_range(1..=max))
        }
        Operation::Division => {
            let max = max_factor(age);
            let divisor = rng.random_range(1..=max);
            let quotient = rng.random_range(1..=max);
            (divisor * quotient, divisor)
        }
    }
}

/// Rotates `options` so the correct one does not always come first.
fn rotated(mut options: Vec<String>, by: usize) -> Vec<String> {
    if !options.is_empty() {
        let len = options.len();
        options.rotate_left(by % len);
    }
    options
}

fn sample_quiz(story_text: &str) -> Result<QuizContent, QuizError> {
    let mut questions = Vec::new();

    let sentence_count = segmenter::split_sentences(story_text).len();
    let counts = (sentence_count..sentence_count + 3)
        .map(|n| n.to_string())
        .collect();
    questions.push(QuizQuestion {
        prompt: "How many sentences does the story have?".to_string(),
        options: rotated(counts, sentence_count),
        correct_option: sentence_count.to_string(),
    });

    if let Some(first) = segmenter::split_words(story_text).into_iter().next() {
        let mut options = vec![first.clone()];
        options.extend(
            FILLER_WORDS
                .iter()
                .filter(|w| **w != first)
                .take(2)
                .map(|w| w.to_string()),
        );
        questions.push(QuizQuestion {
            prompt: "Which word does the story start with?".to_string(),
            options: rotated(options, first.len()),
            correct_option: first,
        });
    }

    QuizContent::new(serde_json::json!(format!("sample-{}", story_text.len())), questions)
}

#[async_trait]
impl ContentClient for SampleContentClient {
    async fn fetch_story(&self, age: u8, topic: &str) -> Result<String, ContentServiceError> {
        let topic = match topic.trim() {
            "" => "adventure",
            t => t,
        };
        Ok(format!(
            "Once upon a time, a curious {age}-year-old explorer went looking for {topic}. \
             Along the way, a friendly owl offered to help! \
             Together they learned that asking questions is the best way to discover new things."
        ))
    }

    async fn fetch_routine_words(&self, age: u8) -> Result<String, ContentServiceError> {
        let bedtime = if age < 8 { "seven" } else { "eight" };
        Ok(format!(
            "I wake up and brush my teeth. I eat breakfast with my family. \
             After school I play outside and read a book. I go to bed at {bedtime} o'clock."
        ))
    }

    async fn fetch_quiz(&self, story_text: &str) -> Result<QuizContent, ContentServiceError> {
        sample_quiz(story_text)
            .map_err(|e| ContentServiceError::malformed(ContentOperation::Quiz, e))
    }

    async fn fetch_math(
        &self,
        age: u8,
        operation: Operation,
    ) -> Result<MathContent, ContentServiceError> {
        let mut rng = self.rng.lock().await;
        let problems = (0..PROBLEM_COUNT)
            .map(|_| {
                let (left, right) = draw_operands(&mut rng, age, operation);
                MathProblem::from_operands(left, operation, right)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ContentServiceError::malformed(ContentOperation::Math, e))?;
        MathContent::new(operation, problems)
            .map_err(|e| ContentServiceError::malformed(ContentOperation::Math, e))
    }

    async fn translate(&self, text: &str) -> Result<String, ContentServiceError> {
        Ok(format!("(అనువాదం) {}", text))
    }
}
