use crate::config::Config;
use crate::stats::{Accumulator, AccumulatorReport};
use crate::types::{Record, Trajectory};
use anyhow::{Context, Result, bail};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Averages over all trials of a run, one entry per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results {
    pub n_trials: usize,
    pub total_pop: Vec<AccumulatorReport>,
    pub resist_pop: Option<Vec<AccumulatorReport>>,
}

/// Per-step accumulators of the virus counts across trials.
pub struct Analyzer {
    cfg: Config,
    n_trials: usize,
    total_acc_vec: Vec<Accumulator>,
    resist_acc_vec: Vec<Accumulator>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let n_steps = cfg.output.n_steps;
        Self {
            cfg,
            n_trials: 0,
            total_acc_vec: vec![Accumulator::new(); n_steps],
            resist_acc_vec: vec![Accumulator::new(); n_steps],
        }
    }

    pub fn add_trajectory(&mut self, trajectory: &[Record]) -> Result<()> {
        let n_steps = self.total_acc_vec.len();
        if trajectory.len() != n_steps {
            bail!(
                "trajectory must have {n_steps} records, but has {}",
                trajectory.len()
            );
        }

        for (i_step, record) in trajectory.iter().enumerate() {
            self.total_acc_vec[i_step].add(record.total_pop as f64);
            if let Some(resist_pop) = record.resist_pop {
                self.resist_acc_vec[i_step].add(resist_pop as f64);
            }
        }
        self.n_trials += 1;

        Ok(())
    }

    /// Read every trajectory of a run from a file.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for i_trial in 0..self.cfg.output.n_trials {
            let trajectory: Trajectory = decode::from_read(&mut reader)
                .with_context(|| format!("failed to read trajectory {i_trial}"))?;
            self.add_trajectory(&trajectory)
                .with_context(|| format!("failed to add trajectory {i_trial}"))?;
        }
        Ok(())
    }

    pub fn results(&self) -> Results {
        let treated = self.cfg.treatment.is_some();
        Results {
            n_trials: self.n_trials,
            total_pop: self.total_acc_vec.iter().map(|acc| acc.report()).collect(),
            resist_pop: treated
                .then(|| self.resist_acc_vec.iter().map(|acc| acc.report()).collect()),
        }
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let results = self.results();
        if let Some(last) = results.total_pop.last() {
            log::info!("final total population: {:.2} ± {:.2}", last.mean, last.std_dev);
        }
        if let Some(last) = results.resist_pop.as_ref().and_then(|vec| vec.last()) {
            log::info!("final resistant population: {:.2} ± {:.2}", last.mean, last.std_dev);
        }

        encode::write_named(&mut writer, &results).context("failed to serialize results")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load results previously written by [`Analyzer::save_results`].
    pub fn load_results<P: AsRef<Path>>(file: P) -> Result<Results> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        decode::from_read(&mut reader).context("failed to deserialize results")
    }
}
