use crate::models::AirportKind::{Both, Domestic, International};
use crate::models::{Airport, AirportKind, FlightType};

const AIRPORT_ROWS: &[(&str, &str, &str, &str, AirportKind)] = &[
    ("LOS", "Murtala Muhammed International Airport", "Lagos", "Nigeria", Both),
    ("ABV", "Nnamdi Azikiwe International Airport", "Abuja", "Nigeria", Both),
    ("PHC", "Port Harcourt International Airport", "Port Harcourt", "Nigeria", Both),
    ("KAN", "Mallam Aminu Kano International Airport", "Kano", "Nigeria", Both),
    ("ENU", "Akanu Ibiam International Airport", "Enugu", "Nigeria", Domestic),
    ("CBQ", "Margaret Ekpo International Airport", "Calabar", "Nigeria", Domestic),
    ("BNI", "Benin Airport", "Benin City", "Nigeria", Domestic),
    ("ILR", "Ilorin International Airport", "Ilorin", "Nigeria", Domestic),
    ("LHR", "Heathrow Airport", "London", "United Kingdom", International),
    ("DXB", "Dubai International Airport", "Dubai", "UAE", International),
    ("JFK", "John F. Kennedy International Airport", "New York", "USA", International),
    ("CDG", "Charles de Gaulle Airport", "Paris", "France", International),
    ("JNB", "O.R. Tambo International Airport", "Johannesburg", "South Africa", International),
    ("ACC", "Kotoka International Airport", "Accra", "Ghana", International),
    ("ADD", "Bole International Airport", "Addis Ababa", "Ethiopia", International),
    ("CAI", "Cairo International Airport", "Cairo", "Egypt", International),
    ("NBO", "Jomo Kenyatta International Airport", "Nairobi", "Kenya", International),
    ("AMS", "Amsterdam Airport Schiphol", "Amsterdam", "Netherlands", International),
];

pub fn all_airports() -> Vec<Airport> {
    AIRPORT_ROWS
        .iter()
        .map(|(code, name, city, country, kind)| Airport {
            code: code.to_string(),
            name: name.to_string(),
            city: city.to_string(),
            country: country.to_string(),
            kind: *kind,
        })
        .collect()
}

pub fn airport_by_code(code: &str) -> Option<Airport> {
    all_airports()
        .into_iter()
        .find(|airport| airport.code.eq_ignore_ascii_case(code.trim()))
}

pub fn airports_serving(flight_type: FlightType) -> Vec<Airport> {
    all_airports()
        .into_iter()
        .filter(|airport| airport.kind.serves(flight_type))
        .collect()
}

/// Case-insensitive match on city, code or name, optionally narrowed to
/// airports that serve the given flight type. An empty query matches all.
pub fn search_airports(query: &str, flight_type: Option<FlightType>) -> Vec<Airport> {
    let lower = query.trim().to_lowercase();

    all_airports()
        .into_iter()
        .filter(|airport| {
            airport.city.to_lowercase().contains(&lower)
                || airport.code.to_lowercase().contains(&lower)
                || airport.name.to_lowercase().contains(&lower)
        })
        .filter(|airport| flight_type.map_or(true, |kind| airport.kind.serves(kind)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_matches_city_code_and_name() {
        let codes = |hits: Vec<Airport>| hits.into_iter().map(|a| a.code).collect::<Vec<_>>();

        assert_eq!(codes(search_airports("lagos", None)), vec!["LOS"]);
        assert_eq!(codes(search_airports("dxb", None)), vec!["DXB"]);
        assert_eq!(codes(search_airports("heathrow", None)), vec!["LHR"]);
    }

    #[test]
    fn domestic_filter_keeps_both_kinds() {
        let domestic = search_airports("", Some(FlightType::Domestic));
        assert!(domestic.iter().any(|a| a.code == "LOS"));
        assert!(domestic.iter().any(|a| a.code == "ENU"));
        assert!(domestic.iter().all(|a| a.kind != AirportKind::International));

        let international = search_airports("", Some(FlightType::International));
        assert!(international.iter().any(|a| a.code == "LOS"));
        assert!(!international.iter().any(|a| a.code == "ENU"));
    }

    #[test]
    fn lookup_by_code_ignores_case() {
        let airport = airport_by_code("phc").expect("airport");
        assert_eq!(airport.city, "Port Harcourt");
        assert_eq!(airport.kind, AirportKind::Both);
        assert!(airport_by_code("XXX").is_none());
    }
}
