//! Translates client messages into session operations and session changes into
//! server messages.
//!
//! Nothing here touches the socket or the network: content requests are handed
//! back to the connection loop as a `PendingFetch`, and their results come back
//! through [`handle_fetch_result`].

use super::protocol::{ClientMessage, ProblemView, QuestionView, ServerMessage};
use kids_learning_core::{
    Mode, SUPPORTED_AGES,
    content::ContentServiceError,
    segmenter,
    session::{Fetched, LearningSession, Outcome, PendingFetch, SessionError, SessionState, Ticket},
};
use tracing::info;

/// What the connection loop must do in response to one client message.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub replies: Vec<ServerMessage>,
    pub fetch: Option<PendingFetch>,
}

impl Dispatch {
    fn reply(message: ServerMessage) -> Self {
        Self {
            replies: vec![message],
            fetch: None,
        }
    }

    fn error(err: SessionError) -> Self {
        Self::reply(ServerMessage::from(&err))
    }

    fn fetch(mode: Mode, pending: PendingFetch) -> Self {
        Self {
            replies: vec![ServerMessage::Loading { mode }],
            fetch: Some(pending),
        }
    }
}

fn check_age(age: u8) -> Result<(), SessionError> {
    if SUPPORTED_AGES.contains(&age) {
        Ok(())
    } else {
        Err(SessionError::InvalidPrecondition(format!(
            "age must be between {} and {}, got {}",
            SUPPORTED_AGES.start(),
            SUPPORTED_AGES.end(),
            age
        )))
    }
}

/// Handles one message from the client.
pub fn handle_client_message(session: &mut LearningSession, msg: ClientMessage) -> Dispatch {
    match msg {
        ClientMessage::EnterStory { age, topic } => match check_age(age) {
            Ok(()) => Dispatch::fetch(Mode::Story, session.request_story(age, &topic)),
            Err(e) => Dispatch::error(e),
        },
        ClientMessage::EnterDailyRoutine { age } => match check_age(age) {
            Ok(()) => Dispatch::fetch(Mode::DailyRoutine, session.request_daily_routine(age)),
            Err(e) => Dispatch::error(e),
        },
        ClientMessage::EnterQuiz { source_text } => {
            let source_text = source_text
                .or_else(|| session.story().map(|story| story.text.clone()))
                .unwrap_or_default();
            match session.request_quiz(&source_text) {
                Ok(pending) => Dispatch::fetch(Mode::Quiz, pending),
                Err(e) => Dispatch::error(e),
            }
        }
        ClientMessage::EnterMath { age, operation } => match check_age(age) {
            Ok(()) => Dispatch::fetch(Mode::Math, session.request_math(age, operation)),
            Err(e) => Dispatch::error(e),
        },
        ClientMessage::Translate => match session.request_translation() {
            Some(pending) => Dispatch {
                replies: Vec::new(),
                fetch: Some(pending),
            },
            None => Dispatch::error(SessionError::InvalidPrecondition(
                "there is no story or routine to translate".to_string(),
            )),
        },
        ClientMessage::ReadAloud => {
            if session.read_aloud() {
                Dispatch::default()
            } else {
                Dispatch::error(SessionError::InvalidPrecondition(
                    "there is no story or routine to read".to_string(),
                ))
            }
        }
        ClientMessage::SpellWord { word } => {
            session.spell_word(&word);
            Dispatch::default()
        }
        ClientMessage::RecordAnswer { index, value } => {
            match session.record_answer(index, value.into_string()) {
                Ok(()) => Dispatch::reply(ServerMessage::AnswerRecorded { index }),
                Err(e) => Dispatch::error(e),
            }
        }
        ClientMessage::Submit => match session.submit() {
            Ok(score) => {
                let review = session
                    .state()
                    .sheet()
                    .and_then(|sheet| sheet.review())
                    .unwrap_or_default();
                Dispatch::reply(ServerMessage::Score {
                    correct: score.correct,
                    total: score.total,
                    review,
                })
            }
            Err(e) => Dispatch::error(e),
        },
    }
}

/// Applies a finished fetch and renders whatever changed.
pub fn handle_fetch_result(
    session: &mut LearningSession,
    ticket: Ticket,
    result: Result<Fetched, ContentServiceError>,
) -> Vec<ServerMessage> {
    match session.apply(ticket, result) {
        Ok(Outcome::Committed(mode)) => {
            info!(?mode, "Content committed");
            render_state(session.state()).into_iter().collect()
        }
        Ok(Outcome::Translated) => session
            .state()
            .passage()
            .and_then(|p| p.translation.as_deref())
            .map(|text| ServerMessage::Translation {
                text: text.to_string(),
                sentences: segmenter::split_sentences(text),
            })
            .into_iter()
            .collect(),
        Ok(Outcome::Discarded) => Vec::new(),
        Err(e) => vec![ServerMessage::from(&e)],
    }
}

/// Renders the content of the active mode.
pub fn render_state(state: &SessionState) -> Option<ServerMessage> {
    match state {
        SessionState::Idle => None,
        SessionState::Story(passage) | SessionState::DailyRoutine(passage) => {
            Some(ServerMessage::Passage {
                mode: state.mode(),
                text: passage.text.clone(),
                sentences: segmenter::segment(&passage.text),
            })
        }
        SessionState::Quiz(quiz) => Some(ServerMessage::Quiz {
            quiz_id: quiz.content.quiz_id.clone(),
            questions: quiz.content.questions().iter().map(QuestionView::from).collect(),
        }),
        SessionState::Math(math) => Some(ServerMessage::Math {
            operation: math.content.operation,
            problems: math.content.problems.iter().map(ProblemView::from).collect(),
        }),
    }
}
