use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::form_urlencoded;
use url::Url;

use crate::airports::search_airports;
use crate::models::{Airport, FlightType};
use crate::wizard::MAX_PASSENGERS;

const BOOKING_PATH_PREFIX: &str = "/booking/";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    #[default]
    RoundTrip,
    OneWay,
}

impl TripType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "roundtrip" => Some(Self::RoundTrip),
            "oneway" => Some(Self::OneWay),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::RoundTrip => "roundtrip",
            Self::OneWay => "oneway",
        }
    }
}

/// Search form state: free text per side plus the airport picked from the
/// suggestion list. Only picked airports reach the query string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSearchForm {
    pub flight_type: FlightType,
    pub trip_type: TripType,
    pub from_text: String,
    pub to_text: String,
    pub from_airport: Option<Airport>,
    pub to_airport: Option<Airport>,
    pub depart_date: String,
    pub return_date: String,
    pub passengers: u32,
}

impl Default for FlightSearchForm {
    fn default() -> Self {
        Self::new(FlightType::Domestic)
    }
}

impl FlightSearchForm {
    pub fn new(flight_type: FlightType) -> Self {
        Self {
            flight_type,
            trip_type: TripType::RoundTrip,
            from_text: String::new(),
            to_text: String::new(),
            from_airport: None,
            to_airport: None,
            depart_date: String::new(),
            return_date: String::new(),
            passengers: 1,
        }
    }

    pub fn set_from_text(&mut self, text: impl Into<String>) {
        self.from_text = text.into();
    }

    pub fn set_to_text(&mut self, text: impl Into<String>) {
        self.to_text = text.into();
    }

    pub fn select_from(&mut self, airport: Airport) {
        self.from_text = airport.display_label();
        self.from_airport = Some(airport);
    }

    pub fn select_to(&mut self, airport: Airport) {
        self.to_text = airport.display_label();
        self.to_airport = Some(airport);
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.from_text, &mut self.to_text);
        std::mem::swap(&mut self.from_airport, &mut self.to_airport);
    }

    pub fn from_suggestions(&self) -> Vec<Airport> {
        search_airports(&self.from_text, Some(self.flight_type))
    }

    pub fn to_suggestions(&self) -> Vec<Airport> {
        search_airports(&self.to_text, Some(self.flight_type))
    }

    /// `type, from, to, date, passengers, tripType`, plus `returnDate` for a
    /// round trip with a return date set.
    pub fn to_query_string(&self) -> String {
        let code = |airport: &Option<Airport>| {
            airport
                .as_ref()
                .map(|a| a.code.clone())
                .unwrap_or_default()
        };

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer
            .append_pair("type", self.flight_type.as_code())
            .append_pair("from", &code(&self.from_airport))
            .append_pair("to", &code(&self.to_airport))
            .append_pair("date", &self.depart_date)
            .append_pair("passengers", &self.passengers.to_string())
            .append_pair("tripType", self.trip_type.as_code());
        if self.trip_type == TripType::RoundTrip && !self.return_date.is_empty() {
            serializer.append_pair("returnDate", &self.return_date);
        }
        serializer.finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("not a booking address: {0}")]
    NotABookingLink(String),
}

/// Flight id and passenger count carried by a `/booking/{id}?passengers=N`
/// address. The count is clamped to `1..=MAX_PASSENGERS`; the flight itself
/// is resolved again from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingLink {
    pub flight_id: String,
    pub passengers: u32,
}

impl BookingLink {
    pub fn new(flight_id: impl Into<String>, passengers: u32) -> Self {
        Self {
            flight_id: flight_id.into(),
            passengers: passengers.clamp(1, MAX_PASSENGERS as u32),
        }
    }

    pub fn parse(address: &str) -> Result<Self, LinkError> {
        let invalid = || LinkError::NotABookingLink(address.to_string());

        let url = Url::parse("http://skyserve.local")
            .and_then(|base| base.join(address.trim()))
            .map_err(|_| invalid())?;

        let flight_id = url
            .path()
            .strip_prefix(BOOKING_PATH_PREFIX)
            .map(|rest| rest.trim_end_matches('/'))
            .filter(|id| !id.is_empty() && !id.contains('/'))
            .ok_or_else(invalid)?
            .to_string();

        let passengers = url
            .query_pairs()
            .find(|(key, _)| key == "passengers")
            .and_then(|(_, value)| value.trim().parse::<u32>().ok())
            .unwrap_or(1);

        Ok(Self::new(flight_id, passengers))
    }

    pub fn to_path(&self) -> String {
        format!(
            "{BOOKING_PATH_PREFIX}{}?passengers={}",
            self.flight_id, self.passengers
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::airport_by_code;

    fn airport(code: &str) -> Airport {
        airport_by_code(code).expect("known airport")
    }

    #[test]
    fn selecting_sets_display_text() {
        let mut form = FlightSearchForm::new(FlightType::International);
        form.select_from(airport("LOS"));
        form.select_to(airport("LHR"));
        assert_eq!(form.from_text, "Lagos (LOS)");
        assert_eq!(form.to_text, "London (LHR)");
    }

    #[test]
    fn swap_exchanges_text_and_airport() {
        let mut form = FlightSearchForm::new(FlightType::International);
        form.select_from(airport("LOS"));
        form.set_to_text("dub");
        form.swap();

        assert_eq!(form.from_text, "dub");
        assert!(form.from_airport.is_none());
        assert_eq!(form.to_text, "Lagos (LOS)");
        assert_eq!(form.to_airport.map(|a| a.code), Some("LOS".to_string()));
    }

    #[test]
    fn suggestions_respect_flight_type() {
        let mut form = FlightSearchForm::new(FlightType::Domestic);
        form.set_from_text("enu");
        assert_eq!(form.from_suggestions().len(), 1);

        form.flight_type = FlightType::International;
        assert!(form.from_suggestions().is_empty());
    }

    #[test]
    fn query_string_includes_return_date_only_for_round_trips() {
        let mut form = FlightSearchForm::new(FlightType::International);
        form.select_from(airport("LOS"));
        form.select_to(airport("LHR"));
        form.depart_date = "2025-03-20".to_string();
        form.return_date = "2025-03-27".to_string();
        form.passengers = 2;

        assert_eq!(
            form.to_query_string(),
            "type=international&from=LOS&to=LHR&date=2025-03-20&passengers=2&tripType=roundtrip&returnDate=2025-03-27"
        );

        form.trip_type = TripType::OneWay;
        assert!(!form.to_query_string().contains("returnDate"));
    }

    #[test]
    fn unpicked_airports_serialize_empty() {
        let mut form = FlightSearchForm::default();
        form.set_from_text("Lagos");
        assert!(form.to_query_string().starts_with("type=domestic&from=&to=&"));
    }

    #[test]
    fn booking_link_defaults_to_one_passenger() {
        let link = BookingLink::parse("/booking/INT001").expect("link");
        assert_eq!(link, BookingLink::new("INT001", 1));

        let link = BookingLink::parse("/booking/DOM002?passengers=3").expect("link");
        assert_eq!(link.passengers, 3);
        assert_eq!(link.to_path(), "/booking/DOM002?passengers=3");

        let link = BookingLink::parse("/booking/DOM002?passengers=abc").expect("link");
        assert_eq!(link.passengers, 1);
    }

    #[test]
    fn booking_link_clamps_oversized_parties() {
        let link = BookingLink::parse("/booking/DOM001?passengers=4294967295").expect("link");
        assert_eq!(link.passengers, MAX_PASSENGERS as u32);

        let link = BookingLink::parse("/booking/DOM001?passengers=0").expect("link");
        assert_eq!(link.passengers, 1);
        assert_eq!(BookingLink::new("DOM001", 2_000_000).passengers, 9);
    }

    #[test]
    fn rejects_other_addresses() {
        assert!(BookingLink::parse("/search?type=domestic").is_err());
        assert!(BookingLink::parse("/booking/").is_err());
    }
}
