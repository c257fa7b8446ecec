use crate::models::BusBookingRef;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub const TERMINALS: [&str; 5] = [
    "Central Bus Terminal",
    "Northgate Interchange",
    "Harbour Coach Station",
    "Airport Express Terminal",
    "Riverside Transit Hub",
];

pub const GATES: [char; 6] = ['A', 'B', 'C', 'D', 'E', 'F'];

pub const DESTINATIONS: [&str; 8] = [
    "Kandy",
    "Galle",
    "Jaffna",
    "Trincomalee",
    "Anuradhapura",
    "Matara",
    "Badulla",
    "Negombo",
];

pub const POPULAR_LOCATIONS: [&str; 4] = [
    "Central Bus Terminal - Gate A",
    "Central Bus Terminal - Gate C",
    "Northgate Interchange - Gate B",
    "Airport Express Terminal - Gate D",
];

pub const MAX_BAY: u8 = 20;

/// Source of the user's position and booking.
pub trait LocationProvider: Send {
    fn detect_location(&mut self) -> String;
    fn synthesize_booking(&mut self) -> BusBookingRef;
}

/// Mock acquisition drawing uniformly from the terminal and gate catalogs.
#[derive(Debug)]
pub struct RandomLocationProvider<R = StdRng> {
    rng: R,
}

impl RandomLocationProvider<StdRng> {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng + Send> LocationProvider for RandomLocationProvider<R> {
    fn detect_location(&mut self) -> String {
        let terminal = TERMINALS.choose(&mut self.rng).copied().unwrap_or(TERMINALS[0]);
        let gate = GATES.choose(&mut self.rng).copied().unwrap_or(GATES[0]);
        format!("{terminal} - Gate {gate}")
    }

    fn synthesize_booking(&mut self) -> BusBookingRef {
        let destination = DESTINATIONS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(DESTINATIONS[0]);
        let bay = self.rng.gen_range(1..=MAX_BAY);
        let hour = self.rng.gen_range(0..24);
        let minute = self.rng.gen_range(0..60);
        let route = self.rng.gen_range(1..=999);
        BusBookingRef {
            number: format!("EX-{route:03}"),
            destination: destination.to_string(),
            scheduled_time: format!("{hour:02}:{minute:02}"),
            bay,
        }
    }
}

/// Locations offered by the search box. An empty query yields the popular
/// list, otherwise every terminal gate whose name contains the query.
pub fn search_locations(query: &str) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return POPULAR_LOCATIONS.iter().map(|item| item.to_string()).collect();
    }
    TERMINALS
        .iter()
        .flat_map(|terminal| GATES.iter().map(move |gate| format!("{terminal} - Gate {gate}")))
        .filter(|candidate| candidate.to_lowercase().contains(&needle))
        .collect()
}

/// True for a `"{terminal} - Gate {letter}"` name from the catalogs.
pub fn is_catalog_location(location: &str) -> bool {
    location
        .split_once(" - Gate ")
        .is_some_and(|(terminal, gate)| {
            let mut letters = gate.chars();
            TERMINALS.contains(&terminal)
                && letters.next().is_some_and(|letter| GATES.contains(&letter))
                && letters.next().is_none()
        })
}
