//! # Scheduler
//!
//! Runs one per-project operation over a whole selection of projects, either
//! one at a time or on a bounded pool of worker threads.
//!
//! ## Sequential mode
//!
//! Projects run in manifest order on the calling thread. Each result is handed
//! to a reporting callback as soon as it is known, so the caller can print
//! per-project output. With fail-fast enabled (the default), the first failure
//! stops the run and the remaining projects are counted as not started.
//!
//! ## Parallel mode
//!
//! A fixed number of long-lived workers pull project indices from a bounded
//! work channel and push `(index, result)` pairs onto a results channel. The
//! calling thread feeds the work channel, then drains the results channel
//! until every worker has exited. A failure, or a panic inside the operation,
//! is recorded but never stops the other workers: the batch always runs to
//! completion. The only shared
//! mutable state is an atomic completion counter that drives the progress bar.
//!
//! No two workers ever touch the same repository, because a `ProjectSet`
//! guarantees unique paths. If no worker thread can be spawned, the scheduler
//! falls back to sequential execution of the same operation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel as chan;
use indicatif::ProgressBar;
use log::{debug, warn};

use crate::engine::Outcome;
use crate::error::{Error, Result};
use crate::manifest::ResolvedProject;

/// Worker count used when parallel mode is requested without a number.
pub const DEFAULT_JOBS: usize = 4;

/// Aggregated outcome of one batch, in manifest order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Projects the operation completed on, with what it did.
    pub succeeded: Vec<(String, Outcome)>,
    /// Projects the operation did not apply to, with the reason.
    pub skipped: Vec<(String, String)>,
    /// Projects the operation failed on.
    pub failed: Vec<(String, Error)>,
    /// Projects never started because a sequential run stopped early.
    pub not_started: usize,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn changed(&self) -> usize {
        self.succeeded.iter().filter(|(_, o)| o.is_changed()).count()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len() + self.not_started
    }

    fn record(&mut self, name: String, result: Result<Outcome>) {
        match result {
            Ok(Outcome::Skipped(reason)) => self.skipped.push((name, reason)),
            Ok(outcome) => self.succeeded.push((name, outcome)),
            Err(e) => self.failed.push((name, e)),
        }
    }
}

#[derive(Clone)]
pub struct Scheduler {
    jobs: Option<usize>,
    fail_fast: bool,
    progress: ProgressBar,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::sequential()
    }
}

impl Scheduler {
    pub fn sequential() -> Self {
        Self {
            jobs: None,
            fail_fast: true,
            progress: ProgressBar::hidden(),
        }
    }

    /// A pool of `jobs` workers; zero is treated as one.
    pub fn parallel(jobs: usize) -> Self {
        Self {
            jobs: Some(jobs.max(1)),
            ..Self::sequential()
        }
    }

    /// Sequential for `None`, parallel otherwise.
    pub fn from_jobs(jobs: Option<usize>) -> Self {
        match jobs {
            Some(n) => Self::parallel(n),
            None => Self::sequential(),
        }
    }

    /// Whether a sequential run stops at the first failure.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Progress bar advanced once per finished project in parallel mode.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn jobs(&self) -> Option<usize> {
        self.jobs
    }

    pub fn is_parallel(&self) -> bool {
        self.jobs.is_some()
    }

    /// Run `op` on every project and collect the results.
    ///
    /// `report` is called for each project in sequential mode only; parallel
    /// runs stay quiet apart from the progress bar.
    pub fn run<F, R>(&self, projects: &[ResolvedProject], op: F, report: R) -> BatchReport
    where
        F: Fn(&ResolvedProject) -> Result<Outcome> + Sync,
        R: FnMut(&ResolvedProject, &Result<Outcome>),
    {
        match self.jobs {
            Some(jobs) if projects.len() > 1 => match self.run_parallel(projects, jobs, &op) {
                Some(report) => report,
                None => {
                    warn!("could not start worker threads, running sequentially");
                    self.run_sequential(projects, &op, report)
                }
            },
            _ => self.run_sequential(projects, &op, report),
        }
    }

    fn run_sequential<F, R>(&self, projects: &[ResolvedProject], op: &F, mut report: R) -> BatchReport
    where
        F: Fn(&ResolvedProject) -> Result<Outcome>,
        R: FnMut(&ResolvedProject, &Result<Outcome>),
    {
        let mut batch = BatchReport::default();
        for (index, project) in projects.iter().enumerate() {
            let result = op(project);
            report(project, &result);
            let failed = result.is_err();
            batch.record(project.name.clone(), result);

            if failed && self.fail_fast {
                batch.not_started = projects.len() - index - 1;
                debug!("stopping after failure in {}", project.name);
                break;
            }
        }
        batch
    }

    /// Returns `None` when not a single worker could be spawned.
    fn run_parallel<F>(&self, projects: &[ResolvedProject], jobs: usize, op: &F) -> Option<BatchReport>
    where
        F: Fn(&ResolvedProject) -> Result<Outcome> + Sync,
    {
        let (work_tx, work_rx) = chan::bounded::<usize>(jobs);
        let (result_tx, result_rx) = chan::unbounded::<(usize, Result<Outcome>)>();
        let completed = AtomicUsize::new(0);
        self.progress.set_length(projects.len() as u64);

        let results = thread::scope(|scope| {
            let completed = &completed;
            let progress = &self.progress;
            let mut workers = 0;

            for id in 0..jobs.min(projects.len()) {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("herder-worker-{}", id))
                    .spawn_scoped(scope, move || {
                        for index in work_rx.iter() {
                            let project = &projects[index];
                            let result = panic::catch_unwind(AssertUnwindSafe(|| op(project)))
                                .unwrap_or_else(|payload| {
                                    Err(Error::WorkerPanic {
                                        project: project.name.clone(),
                                        message: panic_message(payload.as_ref()),
                                    })
                                });
                            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                            progress.set_position(done as u64);
                            if result_tx.send((index, result)).is_err() {
                                break;
                            }
                        }
                    });
                match spawned {
                    Ok(_) => workers += 1,
                    Err(e) => {
                        warn!("failed to spawn worker {}: {}", id, e);
                        break;
                    }
                }
            }
            if workers == 0 {
                return None;
            }
            debug!("running {} projects on {} workers", projects.len(), workers);

            // Only the workers hold these now, so the channels close when they finish
            drop(work_rx);
            drop(result_tx);

            for index in 0..projects.len() {
                if work_tx.send(index).is_err() {
                    break;
                }
            }
            drop(work_tx);

            Some(result_rx.iter().collect::<Vec<_>>())
        })?;

        self.progress.finish_and_clear();

        let mut ordered: Vec<Option<Result<Outcome>>> = projects.iter().map(|_| None).collect();
        for (index, result) in results {
            ordered[index] = Some(result);
        }

        let mut batch = BatchReport::default();
        for (project, result) in projects.iter().zip(ordered) {
            match result {
                Some(result) => batch.record(project.name.clone(), result),
                None => batch.not_started += 1,
            }
        }
        Some(batch)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
