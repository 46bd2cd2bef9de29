use crate::config::{Config, TreatmentConfig};
use crate::patient::{Patient, TreatedPatient};
use crate::types::{Record, Trajectory};
use crate::virus::{ResistantVirus, SimpleVirus};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;

/// Patient simulated by an [`Engine`].
#[derive(Debug, Clone)]
pub enum Host {
    Untreated(Patient),
    Treated {
        patient: TreatedPatient,
        treatment: TreatmentConfig,
    },
}

impl Host {
    pub fn total_pop(&self) -> usize {
        match self {
            Host::Untreated(patient) => patient.total_pop(),
            Host::Treated { patient, .. } => patient.total_pop(),
        }
    }
}

/// Simulation engine for a single trial.
///
/// Holds the configuration, the patient, and the random number generator of the trial.
pub struct Engine {
    cfg: Config,
    host: Host,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` for trial `i_trial` with the configured initial condition.
    ///
    /// With a configured seed the generator is seeded from it and uses `i_trial` as its
    /// stream, so every trial is reproducible on its own. Otherwise it is seeded from the OS.
    pub fn generate_initial_condition(cfg: Config, i_trial: usize) -> Result<Self> {
        let rng = match cfg.output.seed {
            Some(seed) => {
                let mut rng = ChaCha12Rng::seed_from_u64(seed);
                rng.set_stream(i_trial as u64);
                rng
            }
            None => ChaCha12Rng::try_from_os_rng().context("failed to seed generator")?,
        };

        let n_viruses = cfg.init.n_viruses;
        let host = match &cfg.treatment {
            None => {
                let virus = SimpleVirus::new(cfg.model.max_birth_prob, cfg.model.clear_prob)
                    .context("failed to create initial virus")?;
                let patient = Patient::new(vec![virus; n_viruses], cfg.model.max_pop)
                    .context("failed to create patient")?;
                Host::Untreated(patient)
            }
            Some(treatment) => {
                let virus = ResistantVirus::new(
                    cfg.model.max_birth_prob,
                    cfg.model.clear_prob,
                    treatment.resistances.clone(),
                    treatment.mut_prob,
                )
                .context("failed to create initial virus")?;
                let patient = TreatedPatient::new(vec![virus; n_viruses], cfg.model.max_pop)
                    .context("failed to create patient")?;
                Host::Treated {
                    patient,
                    treatment: treatment.clone(),
                }
            }
        };

        Ok(Self { cfg, host, rng })
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Perform the trial and return the record of every step.
    pub fn run_trial(&mut self) -> Result<Trajectory> {
        let n_steps = self.cfg.output.n_steps;
        let mut trajectory = Vec::with_capacity(n_steps);

        for step in 0..n_steps {
            trajectory.push(
                self.perform_step(step)
                    .with_context(|| format!("failed to perform step {step}"))?,
            );

            if (step + 1) % (n_steps / 10).max(1) == 0 {
                let progress = 100.0 * (step + 1) as f64 / n_steps as f64;
                log::info!("completed {progress:06.2}%");
            }
        }

        Ok(trajectory)
    }

    fn perform_step(&mut self, step: usize) -> Result<Record> {
        match &mut self.host {
            Host::Untreated(patient) => {
                let total_pop = patient
                    .update(&mut self.rng)
                    .context("failed to update patient")?;
                Ok(Record {
                    step,
                    total_pop,
                    resist_pop: None,
                })
            }
            Host::Treated { patient, treatment } => {
                // Prescriptions scheduled for this step act on its update.
                for pres in treatment.prescriptions.iter().filter(|pres| pres.step == step) {
                    patient.add_prescription(&pres.drug);
                }

                let total_pop = patient
                    .update(&mut self.rng)
                    .context("failed to update patient")?;
                Ok(Record {
                    step,
                    total_pop,
                    resist_pop: Some(patient.resist_pop(treatment.drugs())),
                })
            }
        }
    }
}
