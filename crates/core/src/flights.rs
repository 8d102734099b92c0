use serde::{Deserialize, Serialize};

use crate::models::{Cabin, Flight, FlightEndpoint, FlightType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Price,
    Departure,
    Duration,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "price" => Some(Self::Price),
            "departure" | "time" => Some(Self::Departure),
            "duration" => Some(Self::Duration),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlightStatusKind {
    OnTime,
    Delayed,
    Boarding,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightStatusRow {
    pub flight: Flight,
    pub status: FlightStatusKind,
}

const STATUS_CYCLE: [FlightStatusKind; 5] = [
    FlightStatusKind::OnTime,
    FlightStatusKind::Delayed,
    FlightStatusKind::Boarding,
    FlightStatusKind::OnTime,
    FlightStatusKind::OnTime,
];

const DEFAULT_STATUS_ROWS: usize = 5;

struct FlightRow {
    id: &'static str,
    number: &'static str,
    from: (&'static str, &'static str, &'static str, &'static str),
    to: (&'static str, &'static str, &'static str, &'static str),
    minutes: u32,
    price: i64,
    cabin: Cabin,
    seats: u32,
    amenities: &'static [&'static str],
    flight_type: FlightType,
}

const FLIGHT_ROWS: &[FlightRow] = &[
    FlightRow {
        id: "DOM001",
        number: "SK102",
        from: ("LOS", "Lagos", "2025-03-15", "07:00"),
        to: ("ABV", "Abuja", "2025-03-15", "08:10"),
        minutes: 70,
        price: 85_000,
        cabin: Cabin::Economy,
        seats: 42,
        amenities: &["WiFi", "Snacks"],
        flight_type: FlightType::Domestic,
    },
    FlightRow {
        id: "DOM002",
        number: "SK305",
        from: ("LOS", "Lagos", "2025-03-15", "09:30"),
        to: ("PHC", "Port Harcourt", "2025-03-15", "10:35"),
        minutes: 65,
        price: 72_000,
        cabin: Cabin::Economy,
        seats: 18,
        amenities: &["Snacks"],
        flight_type: FlightType::Domestic,
    },
    FlightRow {
        id: "DOM003",
        number: "SK410",
        from: ("ABV", "Abuja", "2025-03-15", "06:45"),
        to: ("ENU", "Enugu", "2025-03-15", "07:45"),
        minutes: 60,
        price: 65_000,
        cabin: Cabin::Economy,
        seats: 27,
        amenities: &["Snacks"],
        flight_type: FlightType::Domestic,
    },
    FlightRow {
        id: "DOM004",
        number: "SK118",
        from: ("ABV", "Abuja", "2025-03-15", "13:15"),
        to: ("KAN", "Kano", "2025-03-15", "14:25"),
        minutes: 70,
        price: 58_000,
        cabin: Cabin::Economy,
        seats: 51,
        amenities: &["WiFi"],
        flight_type: FlightType::Domestic,
    },
    FlightRow {
        id: "DOM005",
        number: "SK512",
        from: ("LOS", "Lagos", "2025-03-15", "16:00"),
        to: ("CBQ", "Calabar", "2025-03-15", "17:20"),
        minutes: 80,
        price: 91_000,
        cabin: Cabin::Business,
        seats: 8,
        amenities: &["WiFi", "Meals", "Lounge Access"],
        flight_type: FlightType::Domestic,
    },
    FlightRow {
        id: "INT001",
        number: "SK201",
        from: ("LOS", "Lagos", "2025-03-20", "23:00"),
        to: ("LHR", "London", "2025-03-21", "05:30"),
        minutes: 390,
        price: 1_250_000,
        cabin: Cabin::Economy,
        seats: 64,
        amenities: &["WiFi", "Meals", "Entertainment"],
        flight_type: FlightType::International,
    },
    FlightRow {
        id: "INT002",
        number: "SK520",
        from: ("LOS", "Lagos", "2025-03-20", "21:40"),
        to: ("DXB", "Dubai", "2025-03-21", "06:10"),
        minutes: 450,
        price: 980_000,
        cabin: Cabin::Economy,
        seats: 33,
        amenities: &["WiFi", "Meals", "Entertainment"],
        flight_type: FlightType::International,
    },
    FlightRow {
        id: "INT003",
        number: "SK640",
        from: ("LOS", "Lagos", "2025-03-21", "22:15"),
        to: ("JFK", "New York", "2025-03-22", "05:45"),
        minutes: 690,
        price: 1_650_000,
        cabin: Cabin::Business,
        seats: 12,
        amenities: &["WiFi", "Gourmet Meals", "Entertainment", "Lie-flat Seats"],
        flight_type: FlightType::International,
    },
    FlightRow {
        id: "INT004",
        number: "SK230",
        from: ("LOS", "Lagos", "2025-03-18", "10:00"),
        to: ("ACC", "Accra", "2025-03-18", "10:55"),
        minutes: 55,
        price: 210_000,
        cabin: Cabin::Economy,
        seats: 40,
        amenities: &["Snacks"],
        flight_type: FlightType::International,
    },
    FlightRow {
        id: "INT005",
        number: "SK760",
        from: ("ABV", "Abuja", "2025-03-22", "20:30"),
        to: ("CDG", "Paris", "2025-03-23", "04:40"),
        minutes: 370,
        price: 1_400_000,
        cabin: Cabin::First,
        seats: 4,
        amenities: &["WiFi", "French Cuisine", "Entertainment"],
        flight_type: FlightType::International,
    },
];

fn endpoint(row: (&str, &str, &str, &str)) -> FlightEndpoint {
    let (code, city, date, time) = row;
    FlightEndpoint {
        code: code.to_string(),
        city: city.to_string(),
        date: date.to_string(),
        time: time.to_string(),
    }
}

pub fn all_flights() -> Vec<Flight> {
    FLIGHT_ROWS
        .iter()
        .map(|row| Flight {
            id: row.id.to_string(),
            flight_number: row.number.to_string(),
            airline: "Skyserve Airways".to_string(),
            airline_code: "SK".to_string(),
            departure: endpoint(row.from),
            arrival: endpoint(row.to),
            duration_minutes: row.minutes,
            price: row.price,
            currency: "NGN".to_string(),
            cabin: row.cabin,
            seats_available: row.seats,
            amenities: row.amenities.iter().map(|a| a.to_string()).collect(),
            flight_type: row.flight_type,
        })
        .collect()
}

pub fn flight_by_id(id: &str) -> Option<Flight> {
    all_flights().into_iter().find(|flight| flight.id == id)
}

pub fn flights_of_type(flight_type: FlightType) -> Vec<Flight> {
    all_flights()
        .into_iter()
        .filter(|flight| flight.flight_type == flight_type)
        .collect()
}

/// Stable sort; ties keep catalog order.
pub fn sort_flights(mut flights: Vec<Flight>, key: SortKey) -> Vec<Flight> {
    match key {
        SortKey::Price => flights.sort_by_key(|flight| flight.price),
        SortKey::Departure => flights.sort_by(|a, b| {
            (&a.departure.date, &a.departure.time).cmp(&(&b.departure.date, &b.departure.time))
        }),
        SortKey::Duration => flights.sort_by_key(|flight| flight.duration_minutes),
    }
    flights
}

/// Flights matching a number or either city. An empty query lists the first
/// few flights. Status is a display placeholder cycling by row position.
pub fn flight_status_search(query: &str) -> Vec<FlightStatusRow> {
    let lower = query.trim().to_lowercase();
    let flights = all_flights();

    let hits = if lower.is_empty() {
        flights.into_iter().take(DEFAULT_STATUS_ROWS).collect::<Vec<_>>()
    } else {
        flights
            .into_iter()
            .filter(|flight| {
                flight.flight_number.to_lowercase().contains(&lower)
                    || flight.departure.city.to_lowercase().contains(&lower)
                    || flight.arrival.city.to_lowercase().contains(&lower)
            })
            .collect()
    };

    hits.into_iter()
        .enumerate()
        .map(|(idx, flight)| FlightStatusRow {
            flight,
            status: STATUS_CYCLE[idx % STATUS_CYCLE.len()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(flights: &[Flight]) -> Vec<&str> {
        flights.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn sorts_by_price_ascending() {
        let sorted = sort_flights(flights_of_type(FlightType::Domestic), SortKey::Price);
        assert_eq!(ids(&sorted), vec!["DOM004", "DOM003", "DOM002", "DOM001", "DOM005"]);
    }

    #[test]
    fn sorts_by_duration_numerically() {
        let sorted = sort_flights(flights_of_type(FlightType::International), SortKey::Duration);
        assert_eq!(ids(&sorted), vec!["INT004", "INT005", "INT001", "INT002", "INT003"]);
    }

    #[test]
    fn sorts_by_departure() {
        let sorted = sort_flights(flights_of_type(FlightType::Domestic), SortKey::Departure);
        assert_eq!(ids(&sorted), vec!["DOM003", "DOM001", "DOM002", "DOM004", "DOM005"]);
    }

    #[test]
    fn status_search_defaults_to_first_five() {
        let rows = flight_status_search("  ");
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1].status, FlightStatusKind::Delayed);
        assert_eq!(rows[2].status, FlightStatusKind::Boarding);
    }

    #[test]
    fn status_search_matches_number_and_city() {
        let rows = flight_status_search("sk201");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].flight.arrival.city, "London");

        let rows = flight_status_search("abuja");
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn lookup_by_id() {
        let flight = flight_by_id("INT001").expect("flight");
        assert_eq!(flight.flight_number, "SK201");
        assert_eq!(flight.duration_label(), "6h 30m");
        assert!(flight_by_id("NOPE").is_none());
    }
}
