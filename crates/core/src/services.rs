use crate::models::{CarRental, Eatery, Hotel};

struct HotelRow {
    id: &'static str,
    name: &'static str,
    city: &'static str,
    address: &'static str,
    rating: u8,
    price_per_night: i64,
    amenities: &'static [&'static str],
    description: &'static str,
}

struct CarRow {
    id: &'static str,
    company: &'static str,
    car_type: &'static str,
    model: &'static str,
    city: &'static str,
    price_per_day: i64,
    features: &'static [&'static str],
    seats: u8,
}

struct EateryRow {
    id: &'static str,
    name: &'static str,
    city: &'static str,
    cuisine: &'static str,
    rating: f32,
    price_range: &'static str,
    address: &'static str,
    specialties: &'static [&'static str],
}

const HOTELS: &[HotelRow] = &[
    HotelRow {
        id: "HTL001",
        name: "The Ritz London",
        city: "London",
        address: "150 Piccadilly, London W1J 9BR",
        rating: 5,
        price_per_night: 450_000,
        amenities: &["WiFi", "Spa", "Restaurant", "Room Service", "Concierge", "Gym"],
        description: "Iconic luxury hotel in the heart of London with world-class service.",
    },
    HotelRow {
        id: "HTL002",
        name: "Premier Inn Westminster",
        city: "London",
        address: "82-83 Eccleston Square, London SW1V 1PS",
        rating: 4,
        price_per_night: 85_000,
        amenities: &["WiFi", "Restaurant", "Bar", "24hr Reception"],
        description: "Comfortable and affordable hotel near Victoria Station.",
    },
    HotelRow {
        id: "HTL003",
        name: "Burj Al Arab Jumeirah",
        city: "Dubai",
        address: "Jumeirah Street, Dubai",
        rating: 5,
        price_per_night: 1_200_000,
        amenities: &["WiFi", "Private Beach", "Spa", "Helipad", "Butler Service", "Pool"],
        description: "The world's most luxurious hotel with iconic sail design.",
    },
    HotelRow {
        id: "HTL004",
        name: "JW Marriott Marquis",
        city: "Dubai",
        address: "Sheikh Zayed Road, Dubai",
        rating: 5,
        price_per_night: 180_000,
        amenities: &["WiFi", "Pool", "Spa", "Multiple Restaurants", "Gym"],
        description: "Twin-tower luxury hotel in the heart of Dubai.",
    },
    HotelRow {
        id: "HTL005",
        name: "Transcorp Hilton Abuja",
        city: "Abuja",
        address: "1 Aguiyi Ironsi Street, Maitama, Abuja",
        rating: 5,
        price_per_night: 95_000,
        amenities: &["WiFi", "Pool", "Spa", "Restaurant", "Gym", "Tennis Court"],
        description: "Premier 5-star hotel in Nigeria's capital city.",
    },
    HotelRow {
        id: "HTL006",
        name: "The Plaza Hotel",
        city: "New York",
        address: "768 5th Ave, New York, NY 10019",
        rating: 5,
        price_per_night: 680_000,
        amenities: &["WiFi", "Spa", "Restaurant", "Concierge", "Butler Service"],
        description: "Legendary luxury hotel overlooking Central Park.",
    },
    HotelRow {
        id: "HTL007",
        name: "Hôtel Plaza Athénée",
        city: "Paris",
        address: "25 Avenue Montaigne, 75008 Paris",
        rating: 5,
        price_per_night: 520_000,
        amenities: &["WiFi", "Spa", "Michelin Restaurant", "Concierge", "Garden"],
        description: "Iconic Parisian palace hotel on Avenue Montaigne.",
    },
];

const CARS: &[CarRow] = &[
    CarRow {
        id: "CAR001",
        company: "Hertz",
        car_type: "Luxury",
        model: "Mercedes E-Class",
        city: "London",
        price_per_day: 45_000,
        features: &["GPS", "Leather Seats", "Bluetooth", "Automatic"],
        seats: 5,
    },
    CarRow {
        id: "CAR002",
        company: "Enterprise",
        car_type: "Economy",
        model: "Ford Focus",
        city: "London",
        price_per_day: 18_000,
        features: &["GPS", "Bluetooth", "Manual"],
        seats: 5,
    },
    CarRow {
        id: "CAR003",
        company: "Budget",
        car_type: "Luxury SUV",
        model: "Range Rover Sport",
        city: "Dubai",
        price_per_day: 85_000,
        features: &["GPS", "Leather", "Panoramic Roof", "4WD", "Automatic"],
        seats: 5,
    },
    CarRow {
        id: "CAR004",
        company: "Avis Nigeria",
        car_type: "SUV",
        model: "Toyota Land Cruiser",
        city: "Abuja",
        price_per_day: 35_000,
        features: &["GPS", "Air Conditioning", "4WD", "Automatic"],
        seats: 7,
    },
    CarRow {
        id: "CAR005",
        company: "National",
        car_type: "Sedan",
        model: "Tesla Model 3",
        city: "New York",
        price_per_day: 55_000,
        features: &["Autopilot", "Electric", "Premium Audio", "GPS"],
        seats: 5,
    },
];

const EATERIES: &[EateryRow] = &[
    EateryRow {
        id: "EAT001",
        name: "Sketch",
        city: "London",
        cuisine: "French/British",
        rating: 4.8,
        price_range: "$$$$",
        address: "9 Conduit St, London W1S 2XG",
        specialties: &["Afternoon Tea", "Tasting Menu", "Michelin Starred"],
    },
    EateryRow {
        id: "EAT002",
        name: "Dishoom",
        city: "London",
        cuisine: "Indian",
        rating: 4.6,
        price_range: "$$",
        address: "12 Upper St Martin's Lane, London",
        specialties: &["Bacon Naan Roll", "Black Daal", "Chai"],
    },
    EateryRow {
        id: "EAT003",
        name: "At.mosphere",
        city: "Dubai",
        cuisine: "International",
        rating: 4.9,
        price_range: "$$$$",
        address: "Burj Khalifa, Level 122, Dubai",
        specialties: &["Fine Dining", "World's Highest Restaurant", "Sunset Views"],
    },
    EateryRow {
        id: "EAT004",
        name: "Nkoyo",
        city: "Abuja",
        cuisine: "Nigerian",
        rating: 4.5,
        price_range: "$$",
        address: "Transcorp Hilton, Abuja",
        specialties: &["Jollof Rice", "Suya", "Palm Wine"],
    },
    EateryRow {
        id: "EAT005",
        name: "Eleven Madison Park",
        city: "New York",
        cuisine: "American",
        rating: 4.9,
        price_range: "$$$$",
        address: "11 Madison Ave, New York, NY 10010",
        specialties: &["Plant-Based Tasting Menu", "Art Deco Setting"],
    },
    EateryRow {
        id: "EAT006",
        name: "Le Jules Verne",
        city: "Paris",
        cuisine: "French",
        rating: 4.7,
        price_range: "$$$$",
        address: "Eiffel Tower, Paris",
        specialties: &["Eiffel Tower Views", "Modern French", "Michelin Starred"],
    },
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn same_city(row_city: &str, city: &str) -> bool {
    row_city.eq_ignore_ascii_case(city.trim())
}

pub fn hotels_in(city: &str) -> Vec<Hotel> {
    HOTELS
        .iter()
        .filter(|row| same_city(row.city, city))
        .map(|row| Hotel {
            id: row.id.to_string(),
            name: row.name.to_string(),
            city: row.city.to_string(),
            address: row.address.to_string(),
            rating: row.rating,
            price_per_night: row.price_per_night,
            currency: "NGN".to_string(),
            amenities: owned(row.amenities),
            description: row.description.to_string(),
        })
        .collect()
}

pub fn cars_in(city: &str) -> Vec<CarRental> {
    CARS.iter()
        .filter(|row| same_city(row.city, city))
        .map(|row| CarRental {
            id: row.id.to_string(),
            company: row.company.to_string(),
            car_type: row.car_type.to_string(),
            model: row.model.to_string(),
            city: row.city.to_string(),
            price_per_day: row.price_per_day,
            currency: "NGN".to_string(),
            features: owned(row.features),
            seats: row.seats,
        })
        .collect()
}

pub fn eateries_in(city: &str) -> Vec<Eatery> {
    EATERIES
        .iter()
        .filter(|row| same_city(row.city, city))
        .map(|row| Eatery {
            id: row.id.to_string(),
            name: row.name.to_string(),
            city: row.city.to_string(),
            cuisine: row.cuisine.to_string(),
            rating: row.rating,
            price_range: row.price_range.to_string(),
            address: row.address.to_string(),
            specialties: owned(row.specialties),
        })
        .collect()
}
