//! Ride offer/request demo.
//!
//! Plays the role of the two screens: the driver side offers a ride to a
//! passenger and lets the countdown time out; the passenger side requests a
//! driver and cancels partway through. Both run the exact same engine over
//! different catalogs.

use pedicab_negotiation::display::format_countdown;
use pedicab_negotiation::{
    Catalog, Counterparty, CounterpartyId, NegotiationConfig, NegotiationEngine, Notification,
    ProductionNegotiationEnvironment, Resolution,
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The driver screen's hardcoded passengers.
fn passenger_catalog() -> Catalog {
    Catalog::from_entries([
        Counterparty::new(1, "Maria Santos (4.9, Jollibee Branch -> School Campus)"),
        Counterparty::new(2, "Ana Garcia (4.7, Mall Entrance -> Home)"),
        Counterparty::new(3, "Sofia Rodriguez (4.8, Office Building -> Restaurant)"),
        Counterparty::new(4, "Isabella Martinez (4.6, Hospital -> Shopping Center)").unavailable(),
    ])
}

/// The passenger screen's hardcoded drivers.
fn driver_catalog() -> Catalog {
    Catalog::from_entries([
        Counterparty::new(1, "Juan Dela Cruz (4.8, Pedicab #123)"),
        Counterparty::new(2, "Pedro Santos (4.6, Pedicab #456)"),
        Counterparty::new(3, "Miguel Reyes (4.9, Pedicab #789)"),
        Counterparty::new(4, "Carlos Lopez (4.7, Pedicab #012)"),
    ])
}

fn label(catalog: &Catalog, id: CounterpartyId) -> &str {
    catalog
        .get(id)
        .map_or("unknown counterparty", |entry| entry.label.as_str())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ride_offer_demo=info,pedicab_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A real screen waits 30 s between 1 s ticks; the demo compresses the
    // clock so a full timeout plays out in about a second.
    let config = NegotiationConfig::new()
        .with_countdown_seconds(5)
        .with_tick_period(Duration::from_millis(200));

    driver_offers_a_ride(config).await;
    passenger_requests_a_ride(config).await;
}

/// Driver side: offer a ride and let the passenger's silence time it out.
async fn driver_offers_a_ride(config: NegotiationConfig) {
    println!("=== Find Passengers (driver side) ===\n");

    let passengers = passenger_catalog();
    let engine = NegotiationEngine::new(
        passengers.clone(),
        config,
        ProductionNegotiationEnvironment::system(),
    );
    let mut notifications = engine.subscribe();

    println!(
        "Available passengers: {} of {}",
        passengers.available_count(),
        passengers.len()
    );

    // Isabella is marked unavailable; the engine refuses the offer.
    let isabella = CounterpartyId::new(4);
    if let Err(rejection) = engine.select(isabella).await {
        println!("Cannot offer to {}: {rejection}", label(&passengers, isabella));
    }

    let maria = CounterpartyId::new(1);
    if let Err(rejection) = engine.select(maria).await {
        println!("Offer unexpectedly refused: {rejection}");
        return;
    }

    // One negotiation at a time: a second offer is refused while the first
    // countdown runs.
    if let Err(rejection) = engine.select(CounterpartyId::new(2)).await {
        println!("Second offer refused: {rejection}");
    }

    while let Ok(notification) = notifications.recv().await {
        match notification {
            Notification::Selected {
                id,
                remaining_seconds,
            } => {
                println!(
                    "Offering ride to {} [{}]",
                    label(&passengers, id),
                    format_countdown(remaining_seconds)
                );
            },
            Notification::Tick {
                remaining_seconds, ..
            } => {
                println!(
                    "Waiting for passenger response... [{}]",
                    format_countdown(remaining_seconds)
                );
            },
            Notification::Resolved { id, resolution } => {
                match resolution {
                    Resolution::TimedOut => println!(
                        "Offer timeout: {} did not respond in time. You can try another passenger.\n",
                        label(&passengers, id)
                    ),
                    _ => println!("Offer resolved: {resolution:?}\n"),
                }
                break;
            },
        }
    }
}

/// Passenger side: request a driver, then change your mind.
async fn passenger_requests_a_ride(config: NegotiationConfig) {
    println!("=== Manual Booking (passenger side) ===\n");

    let drivers = driver_catalog();
    let engine = NegotiationEngine::new(
        drivers.clone(),
        config,
        ProductionNegotiationEnvironment::system(),
    );
    let mut notifications = engine.subscribe();

    let juan = CounterpartyId::new(1);
    if let Err(rejection) = engine.select(juan).await {
        println!("Request unexpectedly refused: {rejection}");
        return;
    }

    let mut ticks = 0;
    while let Ok(notification) = notifications.recv().await {
        match notification {
            Notification::Selected {
                id,
                remaining_seconds,
            } => {
                println!(
                    "Requesting ride from {} [{}]",
                    label(&drivers, id),
                    format_countdown(remaining_seconds)
                );
            },
            Notification::Tick {
                remaining_seconds, ..
            } => {
                println!(
                    "Waiting for driver response... [{}]",
                    format_countdown(remaining_seconds)
                );
                ticks += 1;
                if ticks == 2 {
                    if let Err(rejection) = engine.cancel().await {
                        println!("Cancel refused: {rejection}");
                    }
                }
            },
            Notification::Resolved { id, resolution } => {
                match resolution {
                    Resolution::Cancelled => println!(
                        "Request to {} cancelled; countdown reset to [{}].",
                        label(&drivers, id),
                        format_countdown(engine.remaining_seconds().await)
                    ),
                    _ => println!("Request resolved: {resolution:?}"),
                }
                break;
            },
        }
    }
}
