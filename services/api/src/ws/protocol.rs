//! Defines the WebSocket message protocol between the browser client and the API server.

use kids_learning_core::{
    Mode,
    evaluator::Verdict,
    math::{MathProblem, Operation},
    narration::Utterance,
    quiz::QuizQuestion,
    segmenter::SentenceView,
    session::SessionError,
};
use serde::{Deserialize, Serialize};

/// An answer as typed or picked by the learner. Number inputs may arrive as JSON numbers.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Number(serde_json::Number),
}

impl AnswerValue {
    pub fn into_string(self) -> String {
        match self {
            AnswerValue::Text(text) => text,
            AnswerValue::Number(number) => number.to_string(),
        }
    }
}

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Requests a new story for the given age and topic.
    EnterStory {
        age: u8,
        #[serde(default)]
        topic: String,
    },
    /// Requests a daily-routine passage.
    EnterDailyRoutine { age: u8 },
    /// Requests a quiz. Without `source_text` the active story is used.
    EnterQuiz {
        #[serde(default)]
        source_text: Option<String>,
    },
    /// Requests a math worksheet.
    EnterMath { age: u8, operation: Operation },
    /// Translates the active story or routine.
    Translate,
    /// Reads the active story or routine aloud.
    ReadAloud,
    /// Spells a word aloud, letter by letter.
    SpellWord { word: String },
    /// Picks or types the answer for one question.
    RecordAnswer { index: usize, value: AnswerValue },
    /// Submits the answers for scoring.
    Submit,
}

/// A quiz question as shown before scoring; the correct option is withheld.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub prompt: String,
    pub options: Vec<String>,
}

impl From<&QuizQuestion> for QuestionView {
    fn from(question: &QuizQuestion) -> Self {
        Self {
            prompt: question.prompt.clone(),
            options: question.options.clone(),
        }
    }
}

/// A math problem laid out vertically; the answer is withheld.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProblemView {
    pub expression: String,
    pub top: i64,
    pub symbol: char,
    pub bottom: i64,
}

impl From<&MathProblem> for ProblemView {
    fn from(problem: &MathProblem) -> Self {
        let operands = problem.operands();
        Self {
            expression: problem.expression().to_string(),
            top: operands.left,
            symbol: operands.operation.display_symbol(),
            bottom: operands.right,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ContentService,
    InvalidPrecondition,
    NoActiveContent,
    InvalidState,
    BadRequest,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A transition was accepted and its content is being fetched.
    Loading { mode: Mode },
    /// A story or routine, segmented for interactive reading.
    Passage {
        mode: Mode,
        text: String,
        sentences: Vec<SentenceView>,
    },
    /// The translation of the active passage.
    Translation { text: String, sentences: Vec<String> },
    Quiz {
        quiz_id: serde_json::Value,
        questions: Vec<QuestionView>,
    },
    Math {
        operation: Operation,
        problems: Vec<ProblemView>,
    },
    AnswerRecorded { index: usize },
    /// The committed score with a verdict per question.
    Score {
        correct: usize,
        total: usize,
        review: Vec<Verdict>,
    },
    /// Speak the text aloud, cancelling whatever is being spoken.
    Speak(Utterance),
    Error {
        kind: ErrorKind,
        message: String,
        retryable: bool,
    },
}

impl ServerMessage {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            kind: ErrorKind::BadRequest,
            message: message.into(),
            retryable: false,
        }
    }
}

impl From<&SessionError> for ServerMessage {
    fn from(err: &SessionError) -> Self {
        let kind = match err {
            SessionError::ContentService(_) => ErrorKind::ContentService,
            SessionError::InvalidPrecondition(_) => ErrorKind::InvalidPrecondition,
            SessionError::NoActiveContent => ErrorKind::NoActiveContent,
            SessionError::InvalidState(_) => ErrorKind::InvalidState,
        };
        ServerMessage::Error {
            kind,
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}
