use crate::utils::{check_num, check_prob};
use crate::virus::Resistances;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Virus and patient parameters.
    pub model: ModelConfig,
    /// Initial condition.
    pub init: InitConfig,
    /// Drug treatment. Without it the patient is untreated and viruses have no resistances.
    #[serde(default)]
    pub treatment: Option<TreatmentConfig>,
    /// Trial and output parameters.
    pub output: OutputConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Maximum reproduction probability of each virus.
    pub max_birth_prob: f64,
    /// Clearance probability of each virus.
    pub clear_prob: f64,
    /// Maximum virus population of the patient.
    pub max_pop: usize,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Initial number of viruses.
    pub n_viruses: usize,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TreatmentConfig {
    /// Mutation probability of each virus.
    pub mut_prob: f64,
    /// Initial resistance of every virus to each drug.
    pub resistances: Resistances,
    /// Drugs to administer and the step at which each one is added.
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Prescription {
    /// Step before which the drug is added.
    pub step: usize,
    /// Drug name.
    pub drug: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of independent trials per run.
    pub n_trials: usize,
    /// Number of time steps per trial.
    pub n_steps: usize,
    /// Base seed of the random number generators (taken from the OS if absent).
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        check_prob(self.model.max_birth_prob).context("invalid maximum birth probability")?;
        check_prob(self.model.clear_prob).context("invalid clearance probability")?;
        check_num(self.model.max_pop, 1..10_000_000).context("invalid maximum population")?;

        check_num(self.init.n_viruses, 1..10_000_000)
            .context("invalid initial number of viruses")?;

        if let Some(treatment) = &self.treatment {
            treatment
                .validate(self.output.n_steps)
                .context("invalid treatment")?;
        }

        check_num(self.output.n_trials, 1..10_000).context("invalid number of trials")?;
        check_num(self.output.n_steps, 1..1_000_000).context("invalid number of steps")?;

        Ok(())
    }
}

impl TreatmentConfig {
    fn validate(&self, n_steps: usize) -> Result<()> {
        check_prob(self.mut_prob).context("invalid mutation probability")?;
        for (i_pres, pres) in self.prescriptions.iter().enumerate() {
            check_num(pres.step, 0..n_steps)
                .with_context(|| format!("invalid step of prescription {i_pres}"))?;
            if !self.resistances.contains_key(&pres.drug) {
                bail!("prescribed drug {:?} has no resistance entry", pres.drug);
            }
        }
        Ok(())
    }

    /// Drugs of the resistance template, used to count fully resistant viruses.
    pub fn drugs(&self) -> impl Iterator<Item = &str> {
        self.resistances.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNTREATED: &str = r#"
[model]
max_birth_prob = 0.1
clear_prob = 0.05
max_pop = 1000

[init]
n_viruses = 100

[output]
n_trials = 4
n_steps = 300
seed = 42
"#;

    const TREATED: &str = r#"
[model]
max_birth_prob = 0.1
clear_prob = 0.05
max_pop = 1000

[init]
n_viruses = 100

[treatment]
mut_prob = 0.005
resistances = { guttagonol = false, grimpex = false }
prescriptions = [ { step = 150, drug = "guttagonol" } ]

[output]
n_trials = 4
n_steps = 300
"#;

    #[test]
    fn parses_untreated_config() {
        let cfg = Config::from_toml(UNTREATED).unwrap();
        assert_eq!(cfg.model.max_pop, 1000);
        assert_eq!(cfg.output.seed, Some(42));
        assert!(cfg.treatment.is_none());
    }

    #[test]
    fn parses_treated_config() {
        let cfg = Config::from_toml(TREATED).unwrap();
        let treatment = cfg.treatment.unwrap();
        assert_eq!(treatment.prescriptions.len(), 1);
        assert_eq!(treatment.drugs().collect::<Vec<_>>(), ["grimpex", "guttagonol"]);
        assert_eq!(cfg.output.seed, None);
    }

    #[test]
    fn rejects_invalid_values() {
        let zero_max_pop = UNTREATED.replace("max_pop = 1000", "max_pop = 0");
        assert!(Config::from_toml(&zero_max_pop).is_err());

        let bad_prob = UNTREATED.replace("clear_prob = 0.05", "clear_prob = 1.5");
        assert!(Config::from_toml(&bad_prob).is_err());

        let late_pres = TREATED.replace("step = 150", "step = 300");
        assert!(Config::from_toml(&late_pres).is_err());

        let unknown_drug = TREATED.replace("drug = \"guttagonol\"", "drug = \"srinol\"");
        assert!(Config::from_toml(&unknown_drug).is_err());
    }
}
