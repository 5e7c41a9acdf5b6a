//! Narration Port
//!
//! Speech is a one-way command: the session emits an [`Utterance`] and never
//! waits for, or learns about, the outcome. Each new utterance replaces the one
//! before it.

use serde::Serialize;
use tokio::sync::watch;
use tracing::warn;

/// Default narration locale.
pub const DEFAULT_LOCALE: &str = "en-US";
/// Speaking rate tuned for young listeners.
pub const SPEECH_RATE: f32 = 0.9;
/// Speaking pitch tuned for young listeners.
pub const SPEECH_PITCH: f32 = 0.8;

/// A single request to speak text aloud.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utterance {
    pub text: String,
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            locale: locale.into(),
            rate: SPEECH_RATE,
            pitch: SPEECH_PITCH,
        }
    }
}

/// Sink for speech commands. Implementations must not block and must not fail.
#[cfg_attr(test, mockall::automock)]
pub trait NarrationPort: Send + Sync {
    fn speak(&self, utterance: Utterance);
}

/// Publishes utterances on a `watch` channel so an undelivered utterance is
/// replaced by the next one.
pub struct WatchNarrator {
    tx: watch::Sender<Option<Utterance>>,
}

impl WatchNarrator {
    pub fn channel() -> (Self, watch::Receiver<Option<Utterance>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }
}

impl NarrationPort for WatchNarrator {
    fn speak(&self, utterance: Utterance) {
        if self.tx.send(Some(utterance)).is_err() {
            warn!("Narration dropped: no listener attached.");
        }
    }
}

/// Discards every utterance. Used when no speech backend is attached.
pub struct SilentNarrator;

impl NarrationPort for SilentNarrator {
    fn speak(&self, _utterance: Utterance) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_uses_tuned_voice() {
        let u = Utterance::new("Hello", DEFAULT_LOCALE);
        assert_eq!(u.locale, "en-US");
        assert_eq!(u.rate, SPEECH_RATE);
        assert_eq!(u.pitch, SPEECH_PITCH);
    }

    #[tokio::test]
    async fn test_watch_narrator_keeps_latest() {
        let (narrator, mut rx) = WatchNarrator::channel();
        narrator.speak(Utterance::new("first", DEFAULT_LOCALE));
        narrator.speak(Utterance::new("second", "te-IN"));

        rx.changed().await.unwrap();
        let latest = rx.borrow_and_update().clone().unwrap();
        assert_eq!(latest.text, "second");
        assert_eq!(latest.locale, "te-IN");
    }

    #[test]
    fn test_watch_narrator_without_listener_does_not_panic() {
        let (narrator, rx) = WatchNarrator::channel();
        drop(rx);
        narrator.speak(Utterance::new("nobody hears this", DEFAULT_LOCALE));
    }
}
