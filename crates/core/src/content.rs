//! Content Service Client
//!
//! The content service generates stories, daily-routine passages, quizzes,
//! math worksheets and translations. Each call is a single JSON request and
//! response; nothing is retried or streamed.

use crate::{
    math::{MathContent, MathProblem, MathProblemError, Operation},
    quiz::{QuizContent, QuizError, QuizQuestion},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{fmt, time::Duration};
use tracing::debug;

/// The logical calls the content service supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOperation {
    Story,
    RoutineWords,
    Quiz,
    Math,
    Translate,
}

impl ContentOperation {
    /// Path segment of the endpoint serving this operation.
    pub fn endpoint(self) -> &'static str {
        match self {
            ContentOperation::Story => "story",
            ContentOperation::RoutineWords => "words",
            ContentOperation::Quiz => "quiz",
            ContentOperation::Math => "math",
            ContentOperation::Translate => "translate",
        }
    }
}

impl fmt::Display for ContentOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentErrorKind {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("service responded with status {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// A failed exchange with the content service, tagged with the attempted operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Content service '{operation}' request failed: {kind}")]
pub struct ContentServiceError {
    pub operation: ContentOperation,
    pub kind: ContentErrorKind,
}

impl ContentServiceError {
    pub fn new(operation: ContentOperation, kind: ContentErrorKind) -> Self {
        Self { operation, kind }
    }

    pub fn malformed(operation: ContentOperation, reason: impl fmt::Display) -> Self {
        Self::new(operation, ContentErrorKind::Malformed(reason.to_string()))
    }

    fn from_reqwest(operation: ContentOperation, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ContentErrorKind::Timeout
        } else if let Some(status) = err.status() {
            ContentErrorKind::Status(status.as_u16())
        } else if err.is_decode() {
            ContentErrorKind::Malformed(err.to_string())
        } else {
            ContentErrorKind::Transport(err.to_string())
        };
        Self { operation, kind }
    }
}

/// Defines the contract for any source of learning content.
///
/// The session only ever talks to this trait, so the remote service can be
/// swapped for the built-in sample content or a test double.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Generates a story for a child of `age` about `topic` (which may be empty).
    async fn fetch_story(&self, age: u8, topic: &str) -> Result<String, ContentServiceError>;

    /// Generates a short passage describing a daily routine.
    async fn fetch_routine_words(&self, age: u8) -> Result<String, ContentServiceError>;

    /// Generates comprehension questions about `story_text`.
    async fn fetch_quiz(&self, story_text: &str) -> Result<QuizContent, ContentServiceError>;

    /// Generates a worksheet for `operation`.
    async fn fetch_math(
        &self,
        age: u8,
        operation: Operation,
    ) -> Result<MathContent, ContentServiceError>;

    /// Translates `text` into the session's second language.
    async fn translate(&self, text: &str) -> Result<String, ContentServiceError>;
}

// --- Wire Format ---

#[derive(Serialize)]
struct StoryRequest<'a> {
    age: u8,
    topic: &'a str,
}

#[derive(Deserialize)]
struct StoryResponse {
    story: String,
}

#[derive(Serialize)]
struct WordsRequest {
    age: u8,
}

#[derive(Deserialize)]
struct WordsResponse {
    words: String,
}

#[derive(Serialize)]
struct QuizRequest<'a> {
    story: &'a str,
}

#[derive(Deserialize)]
struct WireQuestion {
    question: String,
    options: Vec<String>,
    answer: String,
}

#[derive(Deserialize)]
struct QuizResponse {
    #[serde(rename = "quizId", default)]
    quiz_id: serde_json::Value,
    questions: Vec<WireQuestion>,
}

impl QuizResponse {
    fn into_content(self) -> Result<QuizContent, QuizError> {
        let questions = self
            .questions
            .into_iter()
            .map(|q| QuizQuestion {
                prompt: q.question,
                options: q.options,
                correct_option: q.answer,
            })
            .collect();
        QuizContent::new(self.quiz_id, questions)
    }
}

#[derive(Serialize)]
struct MathRequest {
    age: u8,
    operation: Operation,
}

#[derive(Deserialize)]
struct WireProblem {
    question: String,
    answer: serde_json::Number,
}

#[derive(Deserialize)]
struct MathResponse {
    problems: Vec<WireProblem>,
}

impl MathResponse {
    fn into_content(self, operation: Operation) -> Result<MathContent, MathProblemError> {
        let problems = self
            .problems
            .into_iter()
            .map(|p| MathProblem::from_number(p.question, &p.answer))
            .collect::<Result<Vec<_>, _>>()?;
        MathContent::new(operation, problems)
    }
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translated: String,
}

// --- HTTP Implementation ---

/// An implementation of `ContentClient` that POSTs JSON to the content service.
pub struct HttpContentClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpContentClient {
    /// Creates a client for the service at `base_url`.
    ///
    /// Every request is bounded by `timeout`; expiry surfaces as
    /// [`ContentErrorKind::Timeout`].
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B, R>(
        &self,
        operation: ContentOperation,
        body: &B,
    ) -> Result<R, ContentServiceError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, operation.endpoint());
        debug!(%url, %operation, "Sending content request");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ContentServiceError::from_reqwest(operation, e))?;

        response
            .json::<R>()
            .await
            .map_err(|e| ContentServiceError::from_reqwest(operation, e))
    }
}

#[async_trait]
impl ContentClient for HttpContentClient {
    async fn fetch_story(&self, age: u8, topic: &str) -> Result<String, ContentServiceError> {
        let response: StoryResponse = self
            .post(ContentOperation::Story, &StoryRequest { age, topic })
            .await?;
        Ok(response.story)
    }

    async fn fetch_routine_words(&self, age: u8) -> Result<String, ContentServiceError> {
        let response: WordsResponse = self
            .post(ContentOperation::RoutineWords, &WordsRequest { age })
            .await?;
        Ok(response.words)
    }

    async fn fetch_quiz(&self, story_text: &str) -> Result<QuizContent, ContentServiceError> {
        let response: QuizResponse = self
            .post(ContentOperation::Quiz, &QuizRequest { story: story_text })
            .await?;
        response
            .into_content()
            .map_err(|e| ContentServiceError::malformed(ContentOperation::Quiz, e))
    }

    async fn fetch_math(
        &self,
        age: u8,
        operation: Operation,
    ) -> Result<MathContent, ContentServiceError> {
        let response: MathResponse = self
            .post(ContentOperation::Math, &MathRequest { age, operation })
            .await?;
        response
            .into_content(operation)
            .map_err(|e| ContentServiceError::malformed(ContentOperation::Math, e))
    }

    async fn translate(&self, text: &str) -> Result<String, ContentServiceError> {
        let response: TranslateResponse = self
            .post(ContentOperation::Translate, &TranslateRequest { text })
            .await?;
        Ok(response.translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    /// Reads one HTTP request and returns its body.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return String::from_utf8_lossy(&buf[header_end + 4..]).to_string();
                }
            }
        }
        String::new()
    }

    /// Serves a single canned response and hands back the request body it received.
    async fn serve_once(
        status: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request_body = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            request_body
        });
        (format!("http://{}", addr), handle)
    }

    fn client(base_url: &str) -> HttpContentClient {
        HttpContentClient::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_story_sends_age_and_topic() {
        let (url, server) = serve_once("200 OK", json!({"story": "A fox ran."}).to_string()).await;

        let story = client(&url).fetch_story(6, "forest").await.unwrap();
        assert_eq!(story, "A fox ran.");

        let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent, json!({"age": 6, "topic": "forest"}));
    }

    #[tokio::test]
    async fn test_fetch_quiz_builds_content() {
        let body = json!({
            "quizId": "abc",
            "questions": [
                {"question": "Who ran?", "options": ["A", "B"], "answer": "B"},
                {"question": "Where?", "options": ["A", "C"], "answer": "A"}
            ]
        });
        let (url, _server) = serve_once("200 OK", body.to_string()).await;

        let quiz = client(&url).fetch_quiz("A fox ran.").await.unwrap();
        assert_eq!(quiz.quiz_id, json!("abc"));
        assert_eq!(quiz.questions().len(), 2);
        assert_eq!(quiz.questions()[0].correct_option, "B");
    }

    #[tokio::test]
    async fn test_fetch_math_sends_operation_name() {
        let body = json!({"problems": [{"question": "12 / 4", "answer": 3}]});
        let (url, server) = serve_once("200 OK", body.to_string()).await;

        let math = client(&url).fetch_math(8, Operation::Division).await.unwrap();
        assert_eq!(math.operation, Operation::Division);
        assert_eq!(math.problems[0].answer(), 3);

        let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent, json!({"age": 8, "operation": "division"}));
    }

    #[tokio::test]
    async fn test_math_answers_keep_integer_precision() {
        let body = r#"{"problems": [
            {"question": "9007199254740993 - 0", "answer": 9007199254740993}
        ]}"#;
        let (url, _server) = serve_once("200 OK", body.to_string()).await;

        let math = client(&url).fetch_math(8, Operation::Subtraction).await.unwrap();
        assert_eq!(math.problems[0].answer(), 9_007_199_254_740_993);
    }

    #[tokio::test]
    async fn test_math_of_another_operation_is_malformed() {
        let body = json!({"problems": [{"question": "2 + 3", "answer": 5}]});
        let (url, _server) = serve_once("200 OK", body.to_string()).await;

        let err = client(&url).fetch_math(8, Operation::Division).await.unwrap_err();
        assert_eq!(err.operation, ContentOperation::Math);
        assert!(matches!(err.kind, ContentErrorKind::Malformed(_)));
    }

    #[tokio::test]
    async fn test_inconsistent_math_is_malformed() {
        let body = json!({"problems": [{"question": "2 + 2", "answer": 5}]});
        let (url, _server) = serve_once("200 OK", body.to_string()).await;

        let err = client(&url).fetch_math(8, Operation::Addition).await.unwrap_err();
        assert_eq!(err.operation, ContentOperation::Math);
        assert!(matches!(err.kind, ContentErrorKind::Malformed(_)));
    }

    #[tokio::test]
    async fn test_quiz_answer_outside_options_is_malformed() {
        let body = json!({
            "quizId": 1,
            "questions": [{"question": "Who?", "options": ["A", "B"], "answer": "Z"}]
        });
        let (url, _server) = serve_once("200 OK", body.to_string()).await;

        let err = client(&url).fetch_quiz("story").await.unwrap_err();
        assert!(matches!(err.kind, ContentErrorKind::Malformed(_)));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (url, _server) = serve_once("500 Internal Server Error", "{}".to_string()).await;

        let err = client(&url).translate("hello").await.unwrap_err();
        assert_eq!(
            err,
            ContentServiceError::new(ContentOperation::Translate, ContentErrorKind::Status(500))
        );
    }

    #[tokio::test]
    async fn test_missing_field_is_malformed() {
        let (url, _server) = serve_once("200 OK", json!({"text": "oops"}).to_string()).await;

        let err = client(&url).fetch_routine_words(5).await.unwrap_err();
        assert_eq!(err.operation, ContentOperation::RoutineWords);
        assert!(matches!(err.kind, ContentErrorKind::Malformed(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let client =
            HttpContentClient::new(format!("http://{}", addr), Duration::from_millis(100))
                .unwrap();
        let err = client.fetch_story(6, "forest").await.unwrap_err();
        assert_eq!(err.kind, ContentErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}/", addr))
            .fetch_story(6, "forest")
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ContentErrorKind::Transport(_)));
    }
}
