//! Patients hosting a virus population.

use crate::utils::check_num;
use crate::virus::{ResistantVirus, SimpleVirus, Virion};
use anyhow::{Context, Result};
use rand::Rng;
use std::collections::BTreeSet;

/// Set of drugs administered to a patient.
pub type Prescriptions = BTreeSet<String>;

/// Advance a virus population by a single time step.
///
/// First every particle is tested for clearance, then the population density of the
/// survivors is computed once, and finally every survivor attempts to reproduce at that
/// density. Offspring are appended after the survivors and do not act in this step.
fn update_population<V, R, F>(
    viruses: &mut Vec<V>,
    max_pop: usize,
    rng: &mut R,
    mut reproduce: F,
) -> Result<()>
where
    V: Virion,
    R: Rng + ?Sized,
    F: FnMut(&V, f64, &mut R) -> Result<Option<V>>,
{
    let cleared = viruses
        .iter()
        .map(|virus| virus.does_clear(&mut *rng))
        .collect::<Result<Vec<_>>>()
        .context("failed to select cleared viruses")?;
    let mut cleared = cleared.into_iter();
    viruses.retain(|_| !cleared.next().unwrap_or(false));

    let n_surv = viruses.len();
    let pop_density = n_surv as f64 / max_pop as f64;

    let mut offspring = Vec::with_capacity(n_surv);
    for virus in viruses.iter() {
        let child =
            reproduce(virus, pop_density, &mut *rng).context("failed to reproduce virus")?;
        if let Some(child) = child {
            offspring.push(child);
        }
    }

    viruses.append(&mut offspring);
    Ok(())
}

fn check_max_pop(max_pop: usize) -> Result<()> {
    check_num(max_pop, 1..).context("invalid maximum population")
}

/// Patient that takes no drugs. Its viruses have no drug resistance.
#[derive(Debug, Clone)]
pub struct Patient {
    viruses: Vec<SimpleVirus>,
    max_pop: usize,
}

impl Patient {
    /// Create a new `Patient` with an initial virus population.
    ///
    /// # Errors
    /// Returns an error if `max_pop` is zero.
    pub fn new(viruses: Vec<SimpleVirus>, max_pop: usize) -> Result<Self> {
        check_max_pop(max_pop)?;
        Ok(Self { viruses, max_pop })
    }

    pub fn viruses(&self) -> &[SimpleVirus] {
        &self.viruses
    }

    pub fn max_pop(&self) -> usize {
        self.max_pop
    }

    pub fn total_pop(&self) -> usize {
        self.viruses.len()
    }

    /// Update the virus population for a single time step and return the new total population.
    pub fn update<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize> {
        update_population(&mut self.viruses, self.max_pop, rng, |virus, pop_density, rng| {
            virus.reproduce(pop_density, rng)
        })?;
        Ok(self.total_pop())
    }
}

/// Patient that can be prescribed drugs. Its viruses can acquire resistance to them.
#[derive(Debug, Clone)]
pub struct TreatedPatient {
    viruses: Vec<ResistantVirus>,
    max_pop: usize,
    pres_drugs: Prescriptions,
}

impl TreatedPatient {
    /// Create a new `TreatedPatient` with an initial virus population and no drugs.
    ///
    /// # Errors
    /// Returns an error if `max_pop` is zero.
    pub fn new(viruses: Vec<ResistantVirus>, max_pop: usize) -> Result<Self> {
        check_max_pop(max_pop)?;
        Ok(Self {
            viruses,
            max_pop,
            pres_drugs: Prescriptions::new(),
        })
    }

    pub fn viruses(&self) -> &[ResistantVirus] {
        &self.viruses
    }

    pub fn max_pop(&self) -> usize {
        self.max_pop
    }

    pub fn total_pop(&self) -> usize {
        self.viruses.len()
    }

    /// Administer a drug for all subsequent time steps. Has no effect if already prescribed.
    pub fn add_prescription(&mut self, drug: &str) {
        if self.pres_drugs.insert(drug.to_string()) {
            log::debug!("prescribed {drug:?}");
        }
    }

    pub fn prescriptions(&self) -> &Prescriptions {
        &self.pres_drugs
    }

    /// Number of viruses resistant to every drug in `drugs` (the whole population for no drugs).
    pub fn resist_pop<I, S>(&self, drugs: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let drugs: Vec<S> = drugs.into_iter().collect();
        self.viruses
            .iter()
            .filter(|virus| virus.is_resistant_to_all(&drugs))
            .count()
    }

    /// Update the virus population for a single time step and return the new total population.
    ///
    /// Only viruses resistant to all prescribed drugs can reproduce.
    pub fn update<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize> {
        let pres_drugs = &self.pres_drugs;
        update_population(&mut self.viruses, self.max_pop, rng, |virus, pop_density, rng| {
            virus.reproduce(pop_density, pres_drugs, rng)
        })?;
        Ok(self.total_pop())
    }
}
