//! Virus particles.
//!
//! A particle is immutable once created: it is queried for clearance and reproduction
//! at every step, and reproduction produces a new particle rather than changing the parent.

use crate::utils::{check_prob, draw};
use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resistance state of a particle for each drug, keyed by drug name.
pub type Resistances = BTreeMap<String, bool>;

/// Behavior shared by all virus particles.
pub trait Virion {
    /// Maximum reproduction probability (reached at zero population density).
    fn max_birth_prob(&self) -> f64;

    /// Clearance probability per time step.
    fn clear_prob(&self) -> f64;

    /// Stochastically determine whether this particle is cleared at a time step.
    fn does_clear<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<bool> {
        draw(rng, self.clear_prob()).context("failed to draw clearance")
    }

    /// Reproduction probability at the given population density, clamped to `[0, 1]`.
    fn birth_prob(&self, pop_density: f64) -> f64 {
        (self.max_birth_prob() * (1.0 - pop_density)).clamp(0.0, 1.0)
    }
}

/// Virus particle without any drug resistance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleVirus {
    max_birth_prob: f64,
    clear_prob: f64,
}

impl SimpleVirus {
    /// Create a new `SimpleVirus`.
    ///
    /// # Errors
    /// Returns an error if either probability lies outside `[0, 1]`.
    pub fn new(max_birth_prob: f64, clear_prob: f64) -> Result<Self> {
        check_prob(max_birth_prob).context("invalid maximum birth probability")?;
        check_prob(clear_prob).context("invalid clearance probability")?;
        Ok(Self {
            max_birth_prob,
            clear_prob,
        })
    }

    /// Stochastically determine whether this particle reproduces at a time step.
    ///
    /// Reproduces with probability `max_birth_prob * (1 - pop_density)`.
    /// Returns the offspring, or `None` if there is no offspring.
    pub fn reproduce<R: Rng + ?Sized>(
        &self,
        pop_density: f64,
        rng: &mut R,
    ) -> Result<Option<Self>> {
        if !draw(rng, self.birth_prob(pop_density)).context("failed to draw birth")? {
            return Ok(None);
        }
        Ok(Some(self.clone()))
    }
}

impl Virion for SimpleVirus {
    fn max_birth_prob(&self) -> f64 {
        self.max_birth_prob
    }

    fn clear_prob(&self) -> f64 {
        self.clear_prob
    }
}

/// Virus particle which can be resistant to drugs and passes mutated resistances to its offspring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResistantVirus {
    max_birth_prob: f64,
    clear_prob: f64,
    resistances: Resistances,
    mut_prob: f64,
}

impl ResistantVirus {
    /// Create a new `ResistantVirus`.
    ///
    /// # Errors
    /// Returns an error if any probability lies outside `[0, 1]`.
    pub fn new(
        max_birth_prob: f64,
        clear_prob: f64,
        resistances: Resistances,
        mut_prob: f64,
    ) -> Result<Self> {
        check_prob(max_birth_prob).context("invalid maximum birth probability")?;
        check_prob(clear_prob).context("invalid clearance probability")?;
        check_prob(mut_prob).context("invalid mutation probability")?;
        Ok(Self {
            max_birth_prob,
            clear_prob,
            resistances,
            mut_prob,
        })
    }

    pub fn resistances(&self) -> &Resistances {
        &self.resistances
    }

    pub fn mut_prob(&self) -> f64 {
        self.mut_prob
    }

    /// Whether this particle is resistant to `drug`. Drugs missing from the map count as not resistant.
    pub fn is_resistant_to(&self, drug: &str) -> bool {
        self.resistances.get(drug).copied().unwrap_or(false)
    }

    /// Whether this particle is resistant to every drug in `drugs` (true for no drugs).
    pub fn is_resistant_to_all<I, S>(&self, drugs: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        drugs
            .into_iter()
            .all(|drug| self.is_resistant_to(drug.as_ref()))
    }

    /// Stochastically determine whether this particle reproduces at a time step.
    ///
    /// The particle only reproduces if it is resistant to all `active_drugs`, and then with
    /// probability `max_birth_prob * (1 - pop_density)`. For each drug in the resistance map,
    /// a resistant parent passes the resistance on with probability `1 - mut_prob` and a
    /// non-resistant parent gives a resistant offspring with probability `mut_prob`.
    pub fn reproduce<I, S, R>(
        &self,
        pop_density: f64,
        active_drugs: I,
        rng: &mut R,
    ) -> Result<Option<Self>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        if !self.is_resistant_to_all(active_drugs) {
            return Ok(None);
        }
        if !draw(rng, self.birth_prob(pop_density)).context("failed to draw birth")? {
            return Ok(None);
        }

        let mut resistances = Resistances::new();
        for (drug, &resistant) in &self.resistances {
            let prob_resistant = if resistant {
                1.0 - self.mut_prob
            } else {
                self.mut_prob
            };
            let resistant_new = draw(rng, prob_resistant)
                .with_context(|| format!("failed to draw resistance to {drug:?}"))?;
            resistances.insert(drug.clone(), resistant_new);
        }

        Ok(Some(Self {
            max_birth_prob: self.max_birth_prob,
            clear_prob: self.clear_prob,
            resistances,
            mut_prob: self.mut_prob,
        }))
    }
}

impl Virion for ResistantVirus {
    fn max_birth_prob(&self) -> f64 {
        self.max_birth_prob
    }

    fn clear_prob(&self) -> f64 {
        self.clear_prob
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    const N_TRIALS: usize = 1000;

    fn resistances(entries: &[(&str, bool)]) -> Resistances {
        entries
            .iter()
            .map(|&(drug, resistant)| (drug.to_string(), resistant))
            .collect()
    }

    #[test]
    fn clearance_boundaries() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let never = SimpleVirus::new(0.5, 0.0).unwrap();
        let always = SimpleVirus::new(0.5, 1.0).unwrap();
        for _ in 0..N_TRIALS {
            assert!(!never.does_clear(&mut rng).unwrap());
            assert!(always.does_clear(&mut rng).unwrap());
        }
    }

    #[test]
    fn zero_birth_prob_never_reproduces() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let virus = SimpleVirus::new(0.0, 0.0).unwrap();
        for _ in 0..N_TRIALS {
            assert!(virus.reproduce(0.0, &mut rng).unwrap().is_none());
        }
    }

    #[test]
    fn full_density_stops_reproduction() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let virus = SimpleVirus::new(1.0, 0.0).unwrap();
        for _ in 0..N_TRIALS {
            assert!(virus.reproduce(1.0, &mut rng).unwrap().is_none());
            assert!(virus.reproduce(1.5, &mut rng).unwrap().is_none());
        }
        assert_eq!(virus.birth_prob(1.5), 0.0);
    }

    #[test]
    fn offspring_keeps_parameters() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let virus = SimpleVirus::new(1.0, 0.25).unwrap();
        let child = virus
            .reproduce(0.0, &mut rng)
            .unwrap()
            .expect("birth probability is one");
        assert_eq!(child, virus);
    }

    #[test]
    fn invalid_probabilities_are_rejected() {
        assert!(SimpleVirus::new(1.5, 0.0).is_err());
        assert!(SimpleVirus::new(0.5, -0.1).is_err());
        assert!(ResistantVirus::new(0.5, 0.5, Resistances::new(), 2.0).is_err());
        assert!(ResistantVirus::new(f64::NAN, 0.5, Resistances::new(), 0.0).is_err());
    }

    #[test]
    fn missing_drug_is_not_resistant() {
        let virus = ResistantVirus::new(1.0, 0.0, resistances(&[("a", true)]), 0.0).unwrap();
        assert!(virus.is_resistant_to("a"));
        assert!(!virus.is_resistant_to("b"));
        assert!(virus.is_resistant_to_all(["a"]));
        assert!(!virus.is_resistant_to_all(["a", "b"]));
        assert!(virus.is_resistant_to_all(Vec::<String>::new()));
    }

    #[test]
    fn non_resistant_virus_never_reproduces_under_drug() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let virus = ResistantVirus::new(
            1.0,
            0.0,
            resistances(&[("guttagonol", false), ("grimpex", true)]),
            0.5,
        )
        .unwrap();
        for _ in 0..N_TRIALS {
            assert!(
                virus
                    .reproduce(0.0, ["guttagonol"], &mut rng)
                    .unwrap()
                    .is_none()
            );
            assert!(
                virus
                    .reproduce(0.0, ["grimpex", "guttagonol"], &mut rng)
                    .unwrap()
                    .is_none()
            );
        }
    }

    #[test]
    fn no_active_drugs_allows_reproduction() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let virus = ResistantVirus::new(1.0, 0.0, resistances(&[("x", false)]), 0.0).unwrap();
        let no_drugs: [&str; 0] = [];
        assert!(virus.reproduce(0.0, no_drugs, &mut rng).unwrap().is_some());
    }

    #[test]
    fn zero_mut_prob_copies_resistances() {
        let mut rng = ChaCha12Rng::seed_from_u64(6);
        let virus = ResistantVirus::new(
            1.0,
            0.0,
            resistances(&[("a", true), ("b", false), ("c", true)]),
            0.0,
        )
        .unwrap();
        let no_drugs: [&str; 0] = [];
        for _ in 0..N_TRIALS {
            let child = virus.reproduce(0.0, no_drugs, &mut rng).unwrap().unwrap();
            assert_eq!(child, virus);
        }
    }

    #[test]
    fn unit_mut_prob_swaps_resistances() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let virus =
            ResistantVirus::new(1.0, 0.0, resistances(&[("a", true), ("b", false)]), 1.0).unwrap();
        let no_drugs: [&str; 0] = [];
        for _ in 0..N_TRIALS {
            let child = virus.reproduce(0.0, no_drugs, &mut rng).unwrap().unwrap();
            assert!(!child.is_resistant_to("a"));
            assert!(child.is_resistant_to("b"));
            assert_eq!(child.mut_prob(), 1.0);
            assert_eq!(child.max_birth_prob(), 1.0);
            assert_eq!(child.clear_prob(), 0.0);
        }
    }

    #[test]
    fn mutation_frequency_matches_mut_prob() {
        let mut rng = ChaCha12Rng::seed_from_u64(8);
        let virus = ResistantVirus::new(1.0, 0.0, resistances(&[("a", false)]), 0.2).unwrap();
        let no_drugs: [&str; 0] = [];
        let n_resistant = (0..10 * N_TRIALS)
            .filter_map(|_| virus.reproduce(0.0, no_drugs, &mut rng).unwrap())
            .filter(|child| child.is_resistant_to("a"))
            .count();
        let freq = n_resistant as f64 / (10 * N_TRIALS) as f64;
        assert!((freq - 0.2).abs() < 0.03, "frequency was {freq}");
    }
}
