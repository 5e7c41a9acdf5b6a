//! Learning Session State Machine
//!
//! A `LearningSession` owns exactly one active mode and that mode's data. The
//! state is a tagged union, so committing a new mode drops every other mode's
//! content, answers, score and translation in one assignment.
//!
//! Transitions are split in two halves so a driver can keep serving events while
//! a fetch is in flight:
//!
//! 1. `request_*` validates preconditions and returns a [`PendingFetch`] tagged
//!    with a [`Ticket`].
//! 2. The driver executes the request and hands the result to [`LearningSession::apply`],
//!    which discards it if a newer request superseded the ticket.
//!
//! The `enter_*` methods chain both halves for sequential callers.

use crate::{
    Mode,
    content::{ContentClient, ContentOperation, ContentServiceError},
    evaluator::{self, AnswerKey, Score, SubmittedAnswers, Verdict},
    math::{MathContent, Operation},
    narration::{DEFAULT_LOCALE, NarrationPort, Utterance},
    quiz::QuizContent,
    segmenter,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Default locale used to narrate translations.
pub const DEFAULT_TRANSLATION_LOCALE: &str = "te-IN";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    ContentService(#[from] ContentServiceError),
    #[error("Invalid precondition: {0}")]
    InvalidPrecondition(String),
    #[error("No quiz or math content is active")]
    NoActiveContent,
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl SessionError {
    /// Only content service failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::ContentService(_))
    }
}

// --- Session State ---

/// Narrative text shown in Story or DailyRoutine mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Passage {
    pub text: String,
    pub translation: Option<String>,
}

impl Passage {
    fn new(text: String) -> Self {
        Self {
            text,
            translation: None,
        }
    }
}

pub type StoryContent = Passage;
pub type RoutineContent = Passage;

/// Answers and score for one gradable content instance.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSheet {
    key: AnswerKey,
    answers: SubmittedAnswers,
    score: Option<Score>,
}

impl AnswerSheet {
    fn new(key: AnswerKey) -> Self {
        Self {
            key,
            answers: SubmittedAnswers::new(),
            score: None,
        }
    }

    pub fn key(&self) -> &AnswerKey {
        &self.key
    }

    pub fn answers(&self) -> &SubmittedAnswers {
        &self.answers
    }

    pub fn score(&self) -> Option<Score> {
        self.score
    }

    /// Per-question verdicts, available once the sheet has been scored.
    pub fn review(&self) -> Option<Vec<Verdict>> {
        self.score.map(|_| evaluator::review(&self.key, &self.answers))
    }

    fn record(&mut self, index: usize, value: String) -> Result<(), SessionError> {
        if self.score.is_some() {
            return Err(SessionError::InvalidState(
                "answers are locked once a score is committed".to_string(),
            ));
        }
        if !self.key.contains(index) {
            return Err(SessionError::InvalidPrecondition(format!(
                "question {} does not exist (content has {})",
                index,
                self.key.len()
            )));
        }
        self.answers.insert(index, value);
        Ok(())
    }

    fn submit(&mut self) -> Score {
        *self
            .score
            .get_or_insert_with(|| evaluator::score(&self.key, &self.answers))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizActivity {
    pub content: QuizContent,
    pub sheet: AnswerSheet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MathActivity {
    pub content: MathContent,
    pub sheet: AnswerSheet,
}

/// Everything the session holds, one variant per mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    Story(StoryContent),
    DailyRoutine(RoutineContent),
    Quiz(QuizActivity),
    Math(MathActivity),
}

impl SessionState {
    pub fn mode(&self) -> Mode {
        match self {
            SessionState::Idle => Mode::None,
            SessionState::Story(_) => Mode::Story,
            SessionState::DailyRoutine(_) => Mode::DailyRoutine,
            SessionState::Quiz(_) => Mode::Quiz,
            SessionState::Math(_) => Mode::Math,
        }
    }

    /// The passage of the Story or DailyRoutine mode, if one is active.
    pub fn passage(&self) -> Option<&Passage> {
        match self {
            SessionState::Story(p) | SessionState::DailyRoutine(p) => Some(p),
            _ => None,
        }
    }

    fn passage_mut(&mut self) -> Option<&mut Passage> {
        match self {
            SessionState::Story(p) | SessionState::DailyRoutine(p) => Some(p),
            _ => None,
        }
    }

    pub fn sheet(&self) -> Option<&AnswerSheet> {
        match self {
            SessionState::Quiz(q) => Some(&q.sheet),
            SessionState::Math(m) => Some(&m.sheet),
            _ => None,
        }
    }

    fn sheet_mut(&mut self) -> Option<&mut AnswerSheet> {
        match self {
            SessionState::Quiz(q) => Some(&mut q.sheet),
            SessionState::Math(m) => Some(&mut m.sheet),
            _ => None,
        }
    }
}

// --- Fetch Protocol ---

/// A content request detached from the session, ready to run on any task.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchRequest {
    Story { age: u8, topic: String },
    DailyRoutine { age: u8 },
    Quiz { source_text: String },
    Math { age: u8, operation: Operation },
    Translation { text: String },
}

impl FetchRequest {
    pub async fn execute(self, client: &dyn ContentClient) -> Result<Fetched, ContentServiceError> {
        match self {
            FetchRequest::Story { age, topic } => {
                client.fetch_story(age, &topic).await.map(Fetched::Story)
            }
            FetchRequest::DailyRoutine { age } => client
                .fetch_routine_words(age)
                .await
                .map(Fetched::DailyRoutine),
            FetchRequest::Quiz { source_text } => {
                client.fetch_quiz(&source_text).await.map(Fetched::Quiz)
            }
            FetchRequest::Math { age, operation } => {
                client.fetch_math(age, operation).await.map(Fetched::Math)
            }
            FetchRequest::Translation { text } => {
                client.translate(&text).await.map(Fetched::Translation)
            }
        }
    }
}

/// Content returned by a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Story(String),
    DailyRoutine(String),
    Quiz(QuizContent),
    Math(MathContent),
    Translation(String),
}

impl Fetched {
    fn kind(&self) -> &'static str {
        match self {
            Fetched::Story(_) => "story",
            Fetched::DailyRoutine(_) => "daily routine",
            Fetched::Quiz(_) => "quiz",
            Fetched::Math(_) => "math",
            Fetched::Translation(_) => "translation",
        }
    }
}

/// Identifies the request a fetch result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ticket {
    /// A mode transition; valid while `generation` is the newest one issued.
    Transition { mode: Mode, generation: u64 },
    /// A translation of the passage committed at `epoch`.
    Translation { epoch: u64, sequence: u64 },
}

#[derive(Debug)]
pub struct PendingFetch {
    pub ticket: Ticket,
    pub request: FetchRequest,
}

/// What `apply` did with a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Committed(Mode),
    Translated,
    /// The ticket was superseded; the session was left untouched.
    Discarded,
}

// --- Session ---

/// The state machine behind one learner's session.
pub struct LearningSession {
    client: Arc<dyn ContentClient>,
    narrator: Arc<dyn NarrationPort>,
    translation_locale: String,
    state: SessionState,
    /// Bumped by every transition request.
    generation: u64,
    /// Bumped by every commit.
    epoch: u64,
    /// Bumped by every translation request.
    translation_sequence: u64,
}

impl LearningSession {
    pub fn new(client: Arc<dyn ContentClient>, narrator: Arc<dyn NarrationPort>) -> Self {
        Self {
            client,
            narrator,
            translation_locale: DEFAULT_TRANSLATION_LOCALE.to_string(),
            state: SessionState::Idle,
            generation: 0,
            epoch: 0,
            translation_sequence: 0,
        }
    }

    pub fn with_translation_locale(mut self, locale: impl Into<String>) -> Self {
        self.translation_locale = locale.into();
        self
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn story(&self) -> Option<&StoryContent> {
        match &self.state {
            SessionState::Story(p) => Some(p),
            _ => None,
        }
    }

    pub fn daily_routine(&self) -> Option<&RoutineContent> {
        match &self.state {
            SessionState::DailyRoutine(p) => Some(p),
            _ => None,
        }
    }

    pub fn quiz(&self) -> Option<&QuizActivity> {
        match &self.state {
            SessionState::Quiz(q) => Some(q),
            _ => None,
        }
    }

    pub fn math(&self) -> Option<&MathActivity> {
        match &self.state {
            SessionState::Math(m) => Some(m),
            _ => None,
        }
    }

    pub fn score(&self) -> Option<Score> {
        self.state.sheet().and_then(AnswerSheet::score)
    }

    // --- Transition requests ---

    fn next_transition(&mut self, mode: Mode, request: FetchRequest) -> PendingFetch {
        self.generation += 1;
        debug!(?mode, generation = self.generation, "Transition requested");
        PendingFetch {
            ticket: Ticket::Transition {
                mode,
                generation: self.generation,
            },
            request,
        }
    }

    /// Starts a Story transition. `age` must be within [`crate::SUPPORTED_AGES`];
    /// this is the caller's responsibility.
    pub fn request_story(&mut self, age: u8, topic: &str) -> PendingFetch {
        self.next_transition(
            Mode::Story,
            FetchRequest::Story {
                age,
                topic: topic.to_string(),
            },
        )
    }

    pub fn request_daily_routine(&mut self, age: u8) -> PendingFetch {
        self.next_transition(Mode::DailyRoutine, FetchRequest::DailyRoutine { age })
    }

    /// Starts a Quiz transition. Fails without issuing a request when there is
    /// no text to build the quiz from.
    pub fn request_quiz(&mut self, source_text: &str) -> Result<PendingFetch, SessionError> {
        if source_text.trim().is_empty() {
            return Err(SessionError::InvalidPrecondition(
                "a quiz needs story text to be generated from".to_string(),
            ));
        }
        Ok(self.next_transition(
            Mode::Quiz,
            FetchRequest::Quiz {
                source_text: source_text.to_string(),
            },
        ))
    }

    pub fn request_math(&mut self, age: u8, operation: Operation) -> PendingFetch {
        self.next_transition(Mode::Math, FetchRequest::Math { age, operation })
    }

    /// Starts translating the active passage, or returns `None` if there is none.
    pub fn request_translation(&mut self) -> Option<PendingFetch> {
        let text = self.state.passage()?.text.clone();
        self.translation_sequence += 1;
        Some(PendingFetch {
            ticket: Ticket::Translation {
                epoch: self.epoch,
                sequence: self.translation_sequence,
            },
            request: FetchRequest::Translation { text },
        })
    }

    // --- Commit ---

    fn is_current(&self, ticket: Ticket) -> bool {
        match ticket {
            Ticket::Transition { generation, .. } => generation == self.generation,
            Ticket::Translation { epoch, sequence } => {
                epoch == self.epoch && sequence == self.translation_sequence
            }
        }
    }

    /// Applies a fetch result.
    ///
    /// Superseded tickets are discarded whether the fetch succeeded or not. A
    /// failed current fetch leaves the session exactly as it was.
    pub fn apply(
        &mut self,
        ticket: Ticket,
        result: Result<Fetched, ContentServiceError>,
    ) -> Result<Outcome, SessionError> {
        if !self.is_current(ticket) {
            debug!(?ticket, "Discarding superseded fetch result");
            return Ok(Outcome::Discarded);
        }
        let fetched = result.inspect_err(|e| {
            error!(?ticket, error = %e, "Content fetch failed");
        })?;

        match ticket {
            Ticket::Transition { mode, .. } => {
                let next = match (mode, fetched) {
                    (Mode::Story, Fetched::Story(text)) => SessionState::Story(Passage::new(text)),
                    (Mode::DailyRoutine, Fetched::DailyRoutine(text)) => {
                        SessionState::DailyRoutine(Passage::new(text))
                    }
                    (Mode::Quiz, Fetched::Quiz(content)) => {
                        let sheet = AnswerSheet::new(AnswerKey::for_quiz(&content));
                        SessionState::Quiz(QuizActivity { content, sheet })
                    }
                    (Mode::Math, Fetched::Math(content)) => {
                        content.check().map_err(|e| {
                            ContentServiceError::malformed(ContentOperation::Math, e)
                        })?;
                        let sheet = AnswerSheet::new(AnswerKey::for_math(&content));
                        SessionState::Math(MathActivity { content, sheet })
                    }
                    (mode, other) => {
                        return Err(SessionError::InvalidState(format!(
                            "{:?} transition received {} content",
                            mode,
                            other.kind()
                        )));
                    }
                };
                self.reset_to(next);
                if let SessionState::Story(story) = &self.state {
                    let utterance = Utterance::new(story.text.clone(), DEFAULT_LOCALE);
                    self.narrator.speak(utterance);
                }
                Ok(Outcome::Committed(mode))
            }
            Ticket::Translation { .. } => {
                let translated = match fetched {
                    Fetched::Translation(text) => text,
                    other => {
                        return Err(SessionError::InvalidState(format!(
                            "translation received {} content",
                            other.kind()
                        )));
                    }
                };
                let Some(passage) = self.state.passage_mut() else {
                    return Ok(Outcome::Discarded);
                };
                passage.translation = Some(translated.clone());
                self.narrator
                    .speak(Utterance::new(translated, self.translation_locale.clone()));
                Ok(Outcome::Translated)
            }
        }
    }

    /// Replaces the whole session state. Every commit goes through here.
    fn reset_to(&mut self, next: SessionState) {
        let from = self.state.mode();
        self.state = next;
        self.epoch += 1;
        info!(?from, to = ?self.state.mode(), epoch = self.epoch, "Session mode committed");
    }

    async fn run(&mut self, pending: PendingFetch) -> Result<Outcome, SessionError> {
        let client = Arc::clone(&self.client);
        let result = pending.request.execute(client.as_ref()).await;
        self.apply(pending.ticket, result)
    }

    // --- Sequential transitions ---

    /// Fetches a story and makes it the active mode, narrating it.
    pub async fn enter_story(
        &mut self,
        age: u8,
        topic: &str,
    ) -> Result<&StoryContent, SessionError> {
        let pending = self.request_story(age, topic);
        self.run(pending).await?;
        self.story().ok_or_else(|| not_committed(Mode::Story))
    }

    /// Fetches a daily-routine passage. Unlike stories, it is not narrated.
    pub async fn enter_daily_routine(&mut self, age: u8) -> Result<&RoutineContent, SessionError> {
        let pending = self.request_daily_routine(age);
        self.run(pending).await?;
        self.daily_routine().ok_or_else(|| not_committed(Mode::DailyRoutine))
    }

    pub async fn enter_quiz(&mut self, source_text: &str) -> Result<&QuizContent, SessionError> {
        let pending = self.request_quiz(source_text)?;
        self.run(pending).await?;
        self.quiz()
            .map(|q| &q.content)
            .ok_or_else(|| not_committed(Mode::Quiz))
    }

    pub async fn enter_math(
        &mut self,
        age: u8,
        operation: Operation,
    ) -> Result<&MathContent, SessionError> {
        let pending = self.request_math(age, operation);
        self.run(pending).await?;
        self.math()
            .map(|m| &m.content)
            .ok_or_else(|| not_committed(Mode::Math))
    }

    /// Translates the active passage. Returns `Ok(None)` when no passage is active.
    pub async fn translate_active(&mut self) -> Result<Option<&str>, SessionError> {
        let Some(pending) = self.request_translation() else {
            return Ok(None);
        };
        self.run(pending).await?;
        Ok(self
            .state
            .passage()
            .and_then(|p| p.translation.as_deref()))
    }

    // --- Answers ---

    /// Records (or overwrites) the answer for question `index`.
    pub fn record_answer(
        &mut self,
        index: usize,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        let sheet = self.state.sheet_mut().ok_or(SessionError::NoActiveContent)?;
        sheet.record(index, value.into())
    }

    /// Scores the active quiz or worksheet. Repeated calls return the stored score.
    pub fn submit(&mut self) -> Result<Score, SessionError> {
        let mode = self.state.mode();
        let sheet = self.state.sheet_mut().ok_or(SessionError::NoActiveContent)?;
        let score = sheet.submit();
        info!(?mode, correct = score.correct, total = score.total, "Answers scored");
        Ok(score)
    }

    // --- Narration ---

    /// Narrates the whole active passage. Returns whether anything was spoken.
    pub fn read_aloud(&self) -> bool {
        match self.state.passage() {
            Some(passage) => {
                self.narrator
                    .speak(Utterance::new(passage.text.clone(), DEFAULT_LOCALE));
                true
            }
            None => false,
        }
    }

    /// Narrates a word letter by letter. Words without letters are not spoken.
    pub fn spell_word(&self, word: &str) -> bool {
        let spelling = segmenter::spelling_form(word);
        if spelling.is_empty() {
            return false;
        }
        self.narrator.speak(Utterance::new(spelling, DEFAULT_LOCALE));
        true
    }
}

fn not_committed(mode: Mode) -> SessionError {
    SessionError::InvalidState(format!("{:?} content was not committed", mode))
}
