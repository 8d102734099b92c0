use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_CITY_PHRASE: &str = "your destination";


pub const WELCOME_MESSAGE: &str = "Hello! I'm your Skyserve AI assistant. I can help you with flight bookings, check flight status, answer questions, or suggest hotels, rides, and restaurants at your destination. How can I assist you today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FlightStatus,
    Hotel,
    Transport,
    Restaurant,
    Booking,
    Gate,
    Delay,
    SpecialAssistance,
    Baggage,
    Refund,
    PaymentMethods,
    BoardingPass,
    Greeting,
    Thanks,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationTarget {
    MyBookings,
    Dashboard,
    Support,
    FlightStatus,
}

impl NavigationTarget {
    pub fn path(self) -> &'static str {
        match self {
            Self::MyBookings => "/my-bookings",
            Self::Dashboard => "/dashboard",
            Self::Support => "/support",
            Self::FlightStatus => "/flight-status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub intent: Intent,
    pub text: String,
    pub navigation: Option<NavigationTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuickAction {
    pub label: &'static str,
    pub query: &'static str,
}

pub const QUICK_ACTIONS: [QuickAction; 4] = [
    QuickAction {
        label: "Flight Status",
        query: "Check my flight status",
    },
    QuickAction {
        label: "Hotels",
        query: "Suggest hotels at my destination",
    },
    QuickAction {
        label: "Transport",
        query: "Book a ride from airport",
    },
    QuickAction {
        label: "Restaurants",
        query: "Recommend restaurants nearby",
    },
];

struct ReplyContext<'a> {
    user_text: &'a str,
    city: &'a str,
}

struct IntentRule {
    intent: Intent,
    keywords: &'static [&'static str],
    template: fn(&ReplyContext<'_>) -> String,
}

impl IntentRule {
    fn matches(&self, lower: &str) -> bool {
        contains_any(lower, self.keywords)
    }
}

// Evaluated top-down, first match wins.
const RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::FlightStatus,
        keywords: &["flight status", "my flight"],
        template: |_| {
            "I'd be happy to check your flight status! Please provide your booking reference or flight number (e.g., SK201) and I'll give you real-time updates including gate information, departure times, and any delays.".to_string()
        },
    },
    IntentRule {
        intent: Intent::Hotel,
        keywords: &["hotel", "accommodation", "stay"],
        template: |ctx| {
            format!(
                "Great choice! Here are my top hotel recommendations for {}:\n\n🏨 **Luxury**: The Ritz - From ₦450,000/night\n🏨 **Mid-range**: JW Marriott - From ₦180,000/night\n🏨 **Budget-friendly**: Premier Inn - From ₦85,000/night\n\nWould you like me to help you book any of these, or would you prefer more options?",
                ctx.city
            )
        },
    },
    IntentRule {
        intent: Intent::Transport,
        keywords: &["ride", "transport", "car", "taxi"],
        template: |_| {
            "I can help you arrange airport transport! We partner with several providers:\n\n🚗 **Luxury Sedan** - Mercedes E-Class - ₦45,000/day\n🚙 **SUV** - Range Rover Sport - ₦85,000/day\n🚕 **Economy** - Ford Focus - ₦18,000/day\n\nWould you like to book now or need a pickup from the airport?".to_string()
        },
    },
    IntentRule {
        intent: Intent::Restaurant,
        keywords: &["restaurant", "food", "eat", "dining"],
        template: |ctx| {
            format!(
                "Here are my top dining recommendations for {}:\n\n🍽️ **Fine Dining**: Sketch - $$$$, French/British\n🍽️ **Casual**: Dishoom - $$, Indian cuisine\n🍽️ **Local Favorite**: Nkoyo - $$, Nigerian cuisine\n\nWould you like directions or to make a reservation?",
                ctx.city
            )
        },
    },
    IntentRule {
        intent: Intent::Booking,
        keywords: &["book", "booking", "reserve"],
        template: |_| {
            "I can help you with bookings! Here's what I can assist with:\n\n✈️ Flight bookings and modifications\n🏨 Hotel reservations\n🚗 Car rentals and airport transfers\n🍽️ Restaurant reservations\n\nWhat would you like to book today?".to_string()
        },
    },
    IntentRule {
        intent: Intent::Gate,
        keywords: &["gate", "terminal"],
        template: |_| {
            "To check your departure gate, please provide your flight number or booking reference. Gate assignments are typically confirmed 45-60 minutes before departure. I'll also alert you if there are any gate changes!".to_string()
        },
    },
    IntentRule {
        intent: Intent::Delay,
        keywords: &["delay", "delayed", "on time"],
        template: |_| {
            "I can check if your flight is delayed! Please share your flight number (e.g., SK201) or booking reference, and I'll provide real-time status updates including any alternative flight suggestions if needed.".to_string()
        },
    },
    IntentRule {
        intent: Intent::SpecialAssistance,
        keywords: &["special assistance", "wheelchair", "disability"],
        template: |_| {
            "Skyserve is committed to accessibility! We offer:\n\n♿ Wheelchair assistance\n👁️ Visual impairment support\n🦻 Hearing assistance\n🧳 Extra baggage accommodation\n\nYou can request special assistance during booking or contact our support team 48 hours before your flight.".to_string()
        },
    },
    IntentRule {
        intent: Intent::Baggage,
        keywords: &["baggage", "luggage"],
        template: |_| {
            "Our baggage allowance:\n\n🧳 **Economy**: 23kg checked + 7kg carry-on\n💼 **Business**: 32kg checked + 10kg carry-on\n\nExtra bags can be added from My Bookings up to 24 hours before departure.".to_string()
        },
    },
    IntentRule {
        intent: Intent::Refund,
        keywords: &["refund", "cancel", "change my"],
        template: |_| {
            "You can modify or cancel your booking through 'My Bookings' or by contacting our support team. Refunds are returned to the original payment method. Please have your booking reference (e.g., SKA1B2C3) ready.".to_string()
        },
    },
    IntentRule {
        intent: Intent::PaymentMethods,
        keywords: &["payment", "pay with"],
        template: |_| {
            "We accept Paystack (card, bank transfer, or USSD), credit and debit cards (Visa, Mastercard, Verve), PayPal, and Stripe. All payments are secured with 256-bit SSL encryption.".to_string()
        },
    },
    IntentRule {
        intent: Intent::BoardingPass,
        keywords: &["boarding pass", "check-in", "check in"],
        template: |_| {
            "Online check-in opens 24 hours before departure. Once you check in, your e-boarding pass is sent to the email on your booking.".to_string()
        },
    },
    IntentRule {
        intent: Intent::Greeting,
        keywords: &["hello", "hi", "hey"],
        template: |_| {
            "Hello! 👋 Welcome to Skyserve! I'm here to make your travel experience seamless. I can help you with:\n\n• Flight searches and bookings\n• Real-time flight status\n• Hotel and transport recommendations\n• Restaurant suggestions\n• Special assistance requests\n\nHow can I help you today?".to_string()
        },
    },
    IntentRule {
        intent: Intent::Thanks,
        keywords: &["thank", "thanks"],
        template: |_| {
            "You're welcome! It's my pleasure to assist you. Is there anything else I can help you with? Safe travels! ✈️".to_string()
        },
    },
];

fn fallback_template(ctx: &ReplyContext<'_>) -> String {
    format!(
        "I understand you're asking about \"{}\". Let me help you with that!\n\nI can assist with:\n• Flight bookings and status\n• Gate and delay information\n• Hotel recommendations\n• Airport transport\n• Dining suggestions\n\nCould you please provide more details about what you need?",
        ctx.user_text
    )
}

const NAVIGATION_PHRASES: &[(&[&str], NavigationTarget)] = &[
    (&["show my bookings", "my bookings"], NavigationTarget::MyBookings),
    (&["open dashboard", "go to dashboard"], NavigationTarget::Dashboard),
    (&["contact support"], NavigationTarget::Support),
    (&["track my flight"], NavigationTarget::FlightStatus),
];

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// The ordered rule list as `(intent, keywords)`, earliest first.
pub fn rule_order() -> Vec<(Intent, &'static [&'static str])> {
    RULES.iter().map(|rule| (rule.intent, rule.keywords)).collect()
}

pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.matches(&lower))
        .map(|rule| rule.intent)
        .unwrap_or(Intent::Fallback)
}

pub fn reply(user_text: &str, city: Option<&str>) -> String {
    respond(user_text, city).text
}

/// Matching runs on the whitespace-normalised text; the fallback echoes
/// `user_text` as given.
pub fn respond(user_text: &str, city: Option<&str>) -> AssistantReply {
    let lower = normalize_text(user_text).to_lowercase();
    let ctx = ReplyContext {
        user_text,
        city: city
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_CITY_PHRASE),
    };

    let (intent, text) = match RULES.iter().find(|rule| rule.matches(&lower)) {
        Some(rule) => (rule.intent, (rule.template)(&ctx)),
        None => (Intent::Fallback, fallback_template(&ctx)),
    };

    AssistantReply {
        intent,
        text,
        navigation: navigation_for(&lower),
    }
}

pub fn navigation_for(text: &str) -> Option<NavigationTarget> {
    let lower = normalize_text(text).to_lowercase();
    NAVIGATION_PHRASES
        .iter()
        .find(|(phrases, _)| contains_any(&lower, phrases))
        .map(|(_, target)| *target)
}

/// First `max_graphemes` graphemes of `text`, with an ellipsis when cut.
pub fn preview(text: &str, max_graphemes: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head = graphemes.by_ref().take(max_graphemes).collect::<String>();
    if graphemes.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
