use std::env;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use skyserve_agents::{
    BookingAgent, ChatAssistant, NoSpeech, PayOutcome, PaymentConfig, PaymentProcessor,
    RandomReferenceGenerator, ReferenceGenerator, UnavailableWidget,
};
use skyserve_core::{
    all_flights, cars_in, eateries_in, flight_status_search, flights_of_type, format_amount,
    hotels_in, search_airports, sort_flights, FlightType, Identity, PassengerField,
    PaymentMethod, SortKey, WizardEvent, MAX_PASSENGERS,
};
use skyserve_observability::{init_tracing, AppMetrics};
use skyserve_storage::Store;

#[derive(Debug, Parser)]
#[command(name = "skyserve")]
#[command(about = "Skyserve flight booking CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Talk to the FAQ assistant.
    Chat {
        #[arg(long)]
        city: Option<String>,
    },
    Airports {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long = "type")]
        flight_type: Option<String>,
    },
    Flights {
        #[arg(long = "type")]
        flight_type: Option<String>,
        #[arg(long, default_value = "price")]
        sort: String,
    },
    Status {
        #[arg(default_value = "")]
        query: String,
    },
    Services {
        city: String,
    },
    /// Walk through the booking form for one flight.
    Book {
        flight_id: String,
        #[arg(
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u8).range(1..=MAX_PASSENGERS as i64)
        )]
        passengers: u8,
        #[arg(long, default_value = "paystack")]
        method: String,
        #[arg(long, env = "SKYSERVE_USER_ID")]
        user: Option<String>,
    },
    Bookings {
        #[arg(long, env = "SKYSERVE_USER_ID")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("skyserve_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Chat { city } => run_chat(city).await?,
        Command::Airports { query, flight_type } => {
            let flight_type = parse_flight_type(flight_type.as_deref())?;
            let airports = search_airports(&query, flight_type);
            println!("{}", serde_json::to_string_pretty(&airports)?);
        }
        Command::Flights { flight_type, sort } => {
            let sort = SortKey::parse(&sort).context("invalid --sort value")?;
            let flights = match parse_flight_type(flight_type.as_deref())? {
                Some(flight_type) => flights_of_type(flight_type),
                None => all_flights(),
            };
            for flight in sort_flights(flights, sort) {
                println!(
                    "{:<7} {:<6} {} -> {}  {} {}  {}m  {}",
                    flight.id,
                    flight.flight_number,
                    flight.departure.code,
                    flight.arrival.code,
                    flight.departure.date,
                    flight.departure.time,
                    flight.duration_minutes,
                    format_amount(flight.price, &flight.currency),
                );
            }
        }
        Command::Status { query } => {
            let rows = flight_status_search(&query);
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Services { city } => {
            let payload = serde_json::json!({
                "city": city,
                "hotels": hotels_in(&city),
                "car_rentals": cars_in(&city),
                "eateries": eateries_in(&city),
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Command::Book {
            flight_id,
            passengers,
            method,
            user,
        } => {
            let method = PaymentMethod::parse(&method).context("invalid --method value")?;
            let agent = build_booking_agent().await?;
            run_booking(&agent, &flight_id, usize::from(passengers), method, user).await?;
        }
        Command::Bookings { user } => {
            let agent = build_booking_agent().await?;
            let identity = Identity {
                user_id: user,
                email: None,
            };
            let bookings = agent.bookings_for(&identity).await?;
            println!("{}", serde_json::to_string_pretty(&bookings)?);
        }
    }

    Ok(())
}

fn parse_flight_type(value: Option<&str>) -> Result<Option<FlightType>> {
    match value {
        None => Ok(None),
        Some(raw) => FlightType::parse(raw)
            .map(Some)
            .with_context(|| format!("invalid --type value: {raw}")),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn run_chat(city: Option<String>) -> Result<()> {
    let assistant = ChatAssistant::new(NoSpeech, city, AppMetrics::shared());

    if let Some(welcome) = assistant.messages().first() {
        println!("{}\n", welcome.text);
    }
    println!("type 'exit' to quit, 'lang' to switch voice language.");

    loop {
        let message = prompt(">")?;
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }
        if message.eq_ignore_ascii_case("lang") {
            let language = assistant.cycle_language();
            println!("voice language: {}\n", language.display_name());
            continue;
        }

        let Some(reply) = assistant.send(&message).await else {
            continue;
        };
        println!("\n{}\n", reply.text);
        if let Some(target) = reply.navigation {
            println!("(opening {})\n", target.path());
        }
    }

    Ok(())
}

async fn build_booking_agent() -> Result<BookingAgent<Store, UnavailableWidget>> {
    let store = if let Ok(database_url) = env::var("SKYSERVE_DATABASE_URL") {
        Store::sqlite(&database_url).await?
    } else {
        Store::memory()
    };

    let mut config = PaymentConfig::default();
    if let Some(millis) = env::var("SKYSERVE_PAYMENT_DELAY_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
    {
        config.simulated_delay = Duration::from_millis(millis);
    }

    let references: Arc<dyn ReferenceGenerator> = Arc::new(RandomReferenceGenerator);
    let payments = PaymentProcessor::new(UnavailableWidget, Arc::clone(&references), config);

    Ok(BookingAgent::new(
        Arc::new(store),
        payments,
        references,
        AppMetrics::shared(),
    ))
}

async fn run_booking(
    agent: &BookingAgent<Store, UnavailableWidget>,
    flight_id: &str,
    passengers: usize,
    method: PaymentMethod,
    user: Option<String>,
) -> Result<()> {
    let session = agent.open_session(flight_id, passengers)?;
    let flight = &session.flight;
    println!(
        "{} {} -> {} on {} at {}",
        flight.flight_number, flight.departure.city, flight.arrival.city, flight.departure.date, flight.departure.time
    );

    let fields = [
        ("Title (Mr/Mrs/Ms/Dr)", PassengerField::Title),
        ("First name", PassengerField::FirstName),
        ("Last name", PassengerField::LastName),
        ("Email", PassengerField::Email),
        ("Phone", PassengerField::Phone),
        ("Date of birth (YYYY-MM-DD)", PassengerField::DateOfBirth),
        ("Special assistance (optional)", PassengerField::SpecialAssistance),
    ];

    for index in 0..session.wizard().passenger_count() {
        println!("\nPassenger {}", index + 1);
        for (label, field) in fields {
            loop {
                let value = prompt(label)?;
                if field == PassengerField::Title && value.is_empty() {
                    break;
                }
                match session.apply(WizardEvent::UpdatePassenger { index, field, value }) {
                    Ok(_) => break,
                    Err(err) => println!("  {err}"),
                }
            }
        }
    }

    session
        .apply(WizardEvent::Continue)
        .context("passenger details are incomplete")?;
    session.apply(WizardEvent::SelectPaymentMethod(method))?;

    println!(
        "\nTotal: {} via {}",
        format_amount(session.total_amount(), &flight.currency),
        method.display_name()
    );
    let agree = prompt("Agree to the terms and conditions? [y/N]")?;
    if !agree.eq_ignore_ascii_case("y") && !agree.eq_ignore_ascii_case("yes") {
        bail!("terms and conditions must be accepted to pay");
    }
    session.apply(WizardEvent::SetAgreeTerms(true))?;

    let identity = user.map(|user_id| Identity {
        user_id,
        email: Some(session.wizard().lead_passenger().email.clone()),
    });

    println!("Processing payment...");
    match agent.pay(&session.id, identity.as_ref()).await? {
        PayOutcome::Confirmed {
            confirmation,
            persistence_warning,
        } => {
            println!("\nBooking confirmed: {}", confirmation.booking_reference);
            if let Some(warning) = persistence_warning {
                println!("note: {warning}");
            }
        }
        PayOutcome::Cancelled => println!("Payment was cancelled."),
        PayOutcome::AlreadyProcessing => println!("A payment is already in progress."),
    }

    Ok(())
}
