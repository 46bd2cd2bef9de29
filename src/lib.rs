//! Stochastic simulation of viral population dynamics within a patient.
//!
//! Every time step each virus may be cleared, and each survivor may reproduce with a
//! probability that decreases with the population density. Treated patients can be
//! prescribed drugs; only viruses resistant to all of them reproduce, and offspring
//! resistances mutate.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod manager;
pub mod patient;
pub mod stats;
pub mod types;
pub mod utils;
pub mod virus;

pub use patient::{Patient, Prescriptions, TreatedPatient};
pub use virus::{ResistantVirus, Resistances, SimpleVirus, Virion};
