use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use skyserve_core::{
    preview, respond, AssistantReply, ChatMessage, ChatRole, Intent, SpokenLanguage,
    Transcript,
};
use skyserve_observability::AppMetrics;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssistantError {
    #[error("Voice input is not supported in this browser. Please type your message instead.")]
    VoiceUnavailable,
}

/// Speech-to-text capability. `listen` resolves with the final transcript,
/// or `None` when nothing was heard.
pub trait SpeechRecognizer: Send + Sync {
    fn is_available(&self) -> bool;
    async fn listen(&self, language: SpokenLanguage) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpeech;

impl SpeechRecognizer for NoSpeech {
    fn is_available(&self) -> bool {
        false
    }

    async fn listen(&self, _language: SpokenLanguage) -> Option<String> {
        None
    }
}

/// Hands out queued transcripts and remembers the language of each session.
#[derive(Debug, Default)]
pub struct ScriptedSpeech {
    transcripts: Mutex<VecDeque<String>>,
    languages: Mutex<Vec<SpokenLanguage>>,
}

impl ScriptedSpeech {
    pub fn new<I, T>(transcripts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            transcripts: Mutex::new(transcripts.into_iter().map(Into::into).collect()),
            languages: Mutex::new(Vec::new()),
        }
    }

    pub fn languages_heard(&self) -> Vec<SpokenLanguage> {
        self.languages.lock().clone()
    }
}

impl SpeechRecognizer for ScriptedSpeech {
    fn is_available(&self) -> bool {
        true
    }

    async fn listen(&self, language: SpokenLanguage) -> Option<String> {
        self.languages.lock().push(language);
        self.transcripts.lock().pop_front()
    }
}

/// Cosmetic pause before the assistant answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingDelay {
    pub min: Duration,
    pub max: Duration,
}

impl Default for TypingDelay {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(1000),
            max: Duration::from_millis(2000),
        }
    }
}

impl TypingDelay {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn pick(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "voice", rename_all = "snake_case")]
pub enum VoiceOutcome {
    /// A listening session was running and has been stopped.
    Stopped,
    /// The session ended without a transcript.
    NothingHeard,
    Sent { reply: AssistantReply },
}

#[derive(Debug, Default)]
struct VoiceState {
    listening: bool,
    session: u64,
}

pub struct ChatAssistant<V> {
    transcript: Mutex<Transcript>,
    city: Option<String>,
    language: Mutex<SpokenLanguage>,
    voice: Mutex<VoiceState>,
    typing: TypingDelay,
    speech: V,
    metrics: Arc<AppMetrics>,
    last_activity: Mutex<DateTime<Utc>>,
}

impl<V> ChatAssistant<V>
where
    V: SpeechRecognizer,
{
    pub fn new(speech: V, city: Option<String>, metrics: Arc<AppMetrics>) -> Self {
        let now = Utc::now();
        Self {
            transcript: Mutex::new(Transcript::with_welcome(now)),
            city: city.filter(|c| !c.trim().is_empty()),
            language: Mutex::new(SpokenLanguage::default()),
            voice: Mutex::new(VoiceState::default()),
            typing: TypingDelay::default(),
            speech,
            metrics,
            last_activity: Mutex::new(now),
        }
    }

    pub fn with_typing_delay(mut self, typing: TypingDelay) -> Self {
        self.typing = typing;
        self
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.transcript.lock().messages().to_vec()
    }

    pub fn language(&self) -> SpokenLanguage {
        *self.language.lock()
    }

    pub fn cycle_language(&self) -> SpokenLanguage {
        let mut language = self.language.lock();
        *language = language.next();
        *language
    }

    pub fn is_listening(&self) -> bool {
        self.voice.lock().listening
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock()
    }

    /// No message for at least `ttl` at `now`, and no voice session running.
    pub fn is_idle(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let idle = (now - self.last_activity())
            .to_std()
            .is_ok_and(|idle| idle >= ttl);
        idle && !self.is_listening()
    }

    /// Blank input is ignored and returns `None`.
    #[instrument(skip(self, text))]
    pub async fn send(&self, text: &str) -> Option<AssistantReply> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let now = Utc::now();
        *self.last_activity.lock() = now;
        self.transcript.lock().append(ChatRole::User, text, now);
        debug!(text = %preview(text, 80), "user message");

        let delay = self.typing.pick();
        debug!(delay_ms = delay.as_millis() as u64, "assistant typing");
        tokio::time::sleep(delay).await;

        let reply = respond(text, self.city.as_deref());
        self.transcript
            .lock()
            .append(ChatRole::Assistant, reply.text.clone(), Utc::now());

        self.metrics.inc_chat_reply(reply.intent == Intent::Fallback);
        info!(intent = ?reply.intent, navigation = ?reply.navigation, "assistant replied");
        Some(reply)
    }

    /// Starts a listening session, or stops the running one. A final
    /// transcript is sent as if typed.
    pub async fn toggle_voice(&self) -> Result<VoiceOutcome, AssistantError> {
        if !self.speech.is_available() {
            return Err(AssistantError::VoiceUnavailable);
        }

        let session = {
            let mut voice = self.voice.lock();
            if voice.listening {
                voice.listening = false;
                return Ok(VoiceOutcome::Stopped);
            }
            voice.listening = true;
            voice.session += 1;
            voice.session
        };

        let heard = self.speech.listen(self.language()).await;

        let still_current = {
            let mut voice = self.voice.lock();
            let current = voice.listening && voice.session == session;
            if current {
                voice.listening = false;
            }
            current
        };
        if !still_current {
            return Ok(VoiceOutcome::Stopped);
        }

        match heard {
            Some(transcript) => match self.send(&transcript).await {
                Some(reply) => Ok(VoiceOutcome::Sent { reply }),
                None => Ok(VoiceOutcome::NothingHeard),
            },
            None => Ok(VoiceOutcome::NothingHeard),
        }
    }
}
