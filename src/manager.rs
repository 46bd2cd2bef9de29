use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::Engine;
use crate::types::Trajectory;
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::encode;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Layout of a simulation directory: `config.toml` and one `run-NNNN` directory per run.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Create a new run directory and perform every trial of it.
    pub fn create_run(&self) -> Result<PathBuf> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let trajectories = self.run_trials().context("failed to run trials")?;

        let file = self.trajectories_file(run_idx);
        let file = File::create(&file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        for trajectory in &trajectories {
            encode::write(&mut writer, trajectory).context("failed to serialize trajectory")?;
        }
        writer.flush().context("failed to flush writer stream")?;

        Ok(run_dir)
    }

    #[cfg(not(feature = "parallel"))]
    fn run_trials(&self) -> Result<Vec<Trajectory>> {
        (0..self.cfg.output.n_trials)
            .map(|i_trial| self.run_trial(i_trial))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn run_trials(&self) -> Result<Vec<Trajectory>> {
        (0..self.cfg.output.n_trials)
            .into_par_iter()
            .map(|i_trial| self.run_trial(i_trial))
            .collect()
    }

    fn run_trial(&self, i_trial: usize) -> Result<Trajectory> {
        let mut engine = Engine::generate_initial_condition(self.cfg.clone(), i_trial)
            .context("failed to generate initial condition")?;
        let trajectory = engine
            .run_trial()
            .with_context(|| format!("failed to run trial {i_trial}"))?;
        log::info!(
            "completed trial {i_trial} with {} viruses",
            engine.host().total_pop()
        );
        Ok(trajectory)
    }

    /// Average the trajectories of every run and save the results next to them.
    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let mut analyzer = Analyzer::new(self.cfg.clone());

            analyzer
                .add_file(self.trajectories_file(run_idx))
                .context("failed to add file")?;

            analyzer
                .save_results(self.results_file(run_idx))
                .context("failed to save results")?;
            log::info!("analyzed {:?}", self.run_dir(run_idx));
        }

        Ok(())
    }

    /// Remove every run directory.
    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    pub fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    pub fn trajectories_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("trajectories.msgpack")
    }

    pub fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.msgpack")
    }
}
