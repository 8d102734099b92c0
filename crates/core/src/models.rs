use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightType {
    Domestic,
    International,
}

impl FlightType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "domestic" | "local" => Some(Self::Domestic),
            "international" | "intl" => Some(Self::International),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Domestic => "domestic",
            Self::International => "international",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirportKind {
    Domestic,
    International,
    Both,
}

impl AirportKind {
    pub fn serves(self, flight_type: FlightType) -> bool {
        matches!(
            (self, flight_type),
            (Self::Both, _)
                | (Self::Domestic, FlightType::Domestic)
                | (Self::International, FlightType::International)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub kind: AirportKind,
}

impl Airport {
    /// Text shown in a search field once the airport is picked.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.city, self.code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cabin {
    Economy,
    Business,
    First,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightEndpoint {
    pub code: String,
    pub city: String,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: String,
    pub flight_number: String,
    pub airline: String,
    pub airline_code: String,
    pub departure: FlightEndpoint,
    pub arrival: FlightEndpoint,
    pub duration_minutes: u32,
    pub price: i64,
    pub currency: String,
    pub cabin: Cabin,
    pub seats_available: u32,
    pub amenities: Vec<String>,
    pub flight_type: FlightType,
}

impl Flight {
    pub fn duration_label(&self) -> String {
        format!("{}h {}m", self.duration_minutes / 60, self.duration_minutes % 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub city: String,
    pub address: String,
    pub rating: u8,
    pub price_per_night: i64,
    pub currency: String,
    pub amenities: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarRental {
    pub id: String,
    pub company: String,
    pub car_type: String,
    pub model: String,
    pub city: String,
    pub price_per_day: i64,
    pub currency: String,
    pub features: Vec<String>,
    pub seats: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eatery {
    pub id: String,
    pub name: String,
    pub city: String,
    pub cuisine: String,
    pub rating: f32,
    pub price_range: String,
    pub address: String,
    pub specialties: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassengerTitle {
    #[default]
    Mr,
    Mrs,
    Ms,
    Dr,
}

impl PassengerTitle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().trim_end_matches('.').to_lowercase().as_str() {
            "mr" => Some(Self::Mr),
            "mrs" => Some(Self::Mrs),
            "ms" => Some(Self::Ms),
            "dr" => Some(Self::Dr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mr => "Mr",
            Self::Mrs => "Mrs",
            Self::Ms => "Ms",
            Self::Dr => "Dr",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerInfo {
    pub title: PassengerTitle,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: String,
    pub special_assistance: Option<String>,
}

impl PassengerInfo {
    /// All five required fields are non-empty. No format checks.
    pub fn is_complete(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.phone,
            &self.date_of_birth,
        ]
        .iter()
        .all(|value| !value.is_empty())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassengerField {
    Title,
    FirstName,
    LastName,
    Email,
    Phone,
    DateOfBirth,
    SpecialAssistance,
}

impl PassengerField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "title" => Some(Self::Title),
            "first_name" | "firstname" => Some(Self::FirstName),
            "last_name" | "lastname" => Some(Self::LastName),
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "date_of_birth" | "dob" => Some(Self::DateOfBirth),
            "special_assistance" => Some(Self::SpecialAssistance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Paystack,
    Card,
    Paypal,
    Stripe,
}

/// How a payment method is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentChannel {
    NativeWidget,
    SimulatedDelay,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [Self::Paystack, Self::Card, Self::Paypal, Self::Stripe];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "paystack" => Some(Self::Paystack),
            "card" | "credit_card" | "debit_card" => Some(Self::Card),
            "paypal" => Some(Self::Paypal),
            "stripe" => Some(Self::Stripe),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Paystack => "paystack",
            Self::Card => "card",
            Self::Paypal => "paypal",
            Self::Stripe => "stripe",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Paystack => "Paystack",
            Self::Card => "Credit/Debit Card",
            Self::Paypal => "PayPal",
            Self::Stripe => "Stripe",
        }
    }

    pub fn channel(self) -> PaymentChannel {
        match self {
            Self::Paystack => PaymentChannel::NativeWidget,
            Self::Card | Self::Paypal | Self::Stripe => PaymentChannel::SimulatedDelay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub passengers: Vec<PassengerInfo>,
    pub payment_complete: bool,
    pub booking_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

pub const PAYMENT_STATUS_COMPLETED: &str = "completed";

/// Row handed to the persistence collaborator after a successful payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub user_id: String,
    pub flight_id: String,
    pub passenger_name: String,
    pub passenger_email: String,
    pub passenger_phone: String,
    pub special_assistance: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_status: String,
    pub total_amount: i64,
    pub booking_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBooking {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub booking: NewBooking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpokenLanguage {
    #[default]
    En,
    Ha,
    Yo,
}

impl SpokenLanguage {
    pub fn from_optional_str(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "ha" || v == "ha-ng" || v == "hausa" => Self::Ha,
            Some(v) if v == "yo" || v == "yo-ng" || v == "yoruba" => Self::Yo,
            _ => Self::En,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ha => "ha",
            Self::Yo => "yo",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Ha => "Hausa",
            Self::Yo => "Yoruba",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::En => Self::Ha,
            Self::Ha => Self::Yo,
            Self::Yo => Self::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Warning,
    Success,
    Delay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub flight_number: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub email_enabled: bool,
    pub whatsapp_enabled: bool,
    pub sms_enabled: bool,
    pub web_enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_enabled: true,
            whatsapp_enabled: false,
            sms_enabled: false,
            web_enabled: true,
        }
    }
}

/// Formats a whole-unit amount with thousands separators, e.g. `NGN 45,000`.
pub fn format_amount(amount: i64, currency: &str) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{currency} {sign}{grouped}")
}
