pub mod alerts;
pub mod assistant;
pub mod booking;
pub mod payment;
pub mod reference;

pub use alerts::{AlertCenter, DEFAULT_ALERT_CHANCE, DEFAULT_ALERT_PERIOD};
pub use assistant::{
    AssistantError, ChatAssistant, NoSpeech, ScriptedSpeech, SpeechRecognizer, TypingDelay,
    VoiceOutcome,
};
pub use booking::{BookingAgent, BookingError, BookingSession, PayOutcome};
pub use payment::{
    CheckoutWidget, PaymentConfig, PaymentProcessor, PaymentRequest, PaymentResult,
    ScriptedWidget, UnavailableWidget, WidgetEvent, WidgetSetup,
};
pub use reference::{RandomReferenceGenerator, ReferenceGenerator, SequentialReferenceGenerator};
