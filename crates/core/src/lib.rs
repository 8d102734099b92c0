pub mod airports;
pub mod alerts;
pub mod flights;
pub mod intent;
pub mod models;
pub mod reference;
pub mod search;
pub mod services;
pub mod transcript;
pub mod wizard;

pub use airports::{airport_by_code, airports_serving, all_airports, search_airports};
pub use alerts::{format_age, AlertFeed, MAX_NOTIFICATIONS};
pub use flights::{
    all_flights, flight_by_id, flight_status_search, flights_of_type, sort_flights,
    FlightStatusKind, FlightStatusRow, SortKey,
};
pub use intent::{
    classify, navigation_for, normalize_text, preview, reply, respond, rule_order, AssistantReply,
    Intent, NavigationTarget, QuickAction, QUICK_ACTIONS, WELCOME_MESSAGE,
};
pub use models::*;
pub use reference::{is_booking_reference, BOOKING_REFERENCE_PREFIX};
pub use search::{BookingLink, FlightSearchForm, LinkError, TripType};
pub use services::{cars_in, eateries_in, hotels_in};
pub use transcript::Transcript;
pub use wizard::{
    BookingDraft, BookingWizard, WizardError, WizardEvent, WizardStep, MAX_PASSENGERS,
};
