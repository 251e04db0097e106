//! Concurrent sketching of many inputs.
//!
//! Every input is an independent unit of work run on a dedicated rayon
//! pool. Transient failures are retried, inputs with format problems are
//! skipped, and the first unrecoverable failure is latched: once it is set
//! no new input starts and no retry is attempted, but work already running
//! finishes.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use getset::CopyGetters;
use log::{debug, error, info, warn};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use typed_builder::TypedBuilder;

use crate::cmd::ComputeParameters;
use crate::sketch::Sketch;
use crate::Error;

#[derive(Debug, Clone, TypedBuilder, CopyGetters)]
pub struct BatchConfig {
    /// Size of the worker pool.
    #[getset(get_copy = "pub")]
    #[builder(default = rayon::current_num_threads())]
    workers: usize,

    /// Attempts per input, the first one included.
    #[getset(get_copy = "pub")]
    #[builder(default = 5)]
    max_attempts: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig::builder().build()
    }
}

/// A sequence file and the label its sketch gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceInput {
    pub name: String,
    pub path: PathBuf,
}

impl SequenceInput {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(name: S, path: P) -> SequenceInput {
        SequenceInput {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Parse a `path[,label]` line. Without a label the file name is used.
    pub fn from_line(line: &str) -> Result<SequenceInput, Error> {
        let line: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let mut fields = line.split(',');

        let path = match fields.next() {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => {
                return Err(Error::InvalidParameter {
                    name: "input".into(),
                    message: "empty path".into(),
                })
            }
        };

        let name = match fields.next() {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| line.clone()),
        };

        Ok(SequenceInput { name, path })
    }

    /// Read a list file, one input per line. Blank lines and lines starting
    /// with `#` are ignored.
    pub fn read_list<P: AsRef<Path>>(path: P) -> Result<Vec<SequenceInput>, Error> {
        let reader = BufReader::new(File::open(path)?);
        let mut inputs = vec![];
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            inputs.push(SequenceInput::from_line(trimmed)?);
        }
        Ok(inputs)
    }
}

impl fmt::Display for SequenceInput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

#[derive(Debug)]
pub struct BatchReport<T> {
    /// Finished results, in no particular order.
    pub sketches: Vec<T>,
    /// Inputs given up on, with the reason.
    pub skipped: Vec<(String, Error)>,
    /// Inputs never tried because a failure was latched.
    pub not_started: usize,
}

impl BatchReport<Sketch> {
    /// Save every sketch as `<dir>/<name>.sketch`. Path separators in
    /// the name are replaced by `_`, so every file lands directly in `dir`.
    pub fn save_hex<P: AsRef<Path>>(&self, dir: P) -> Result<(), Error> {
        let dir = dir.as_ref();
        for sketch in &self.sketches {
            let name = sketch.name().unwrap_or("unnamed");
            debug!("saving {}", name);
            sketch.save_hex(dir.join(sketch_file_name(name)))?;
        }
        Ok(())
    }
}

fn sketch_file_name(name: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| if std::path::is_separator(c) { '_' } else { c })
        .collect();
    format!("{}.sketch", name)
}

enum Outcome<T> {
    Done(T),
    Skipped(Error),
    Abandoned,
    Failed,
}

pub struct BatchSketcher {
    config: BatchConfig,
}

impl BatchSketcher {
    pub fn new(config: BatchConfig) -> BatchSketcher {
        BatchSketcher { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run `f` over every input.
    ///
    /// Returns the latched error if an unrecoverable failure happened.
    pub fn run<I, T, F>(&self, inputs: &[I], f: F) -> Result<BatchReport<T>, Error>
    where
        I: fmt::Display + Sync,
        T: Send,
        F: Fn(&I) -> Result<T, Error> + Sync,
    {
        if self.config.workers == 0 || self.config.max_attempts == 0 {
            return Err(Error::InvalidParameter {
                name: "batch".into(),
                message: "workers and max_attempts must be positive".into(),
            });
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| Error::Internal {
                message: e.to_string(),
            })?;

        let latch: OnceCell<Error> = OnceCell::new();
        let results = Mutex::new(Vec::with_capacity(inputs.len()));
        let skipped = Mutex::new(vec![]);
        let not_started = AtomicUsize::new(0);

        info!(
            "processing {} inputs with {} workers",
            inputs.len(),
            self.config.workers
        );

        pool.install(|| {
            inputs.par_iter().for_each(|input| {
                if latch.get().is_some() {
                    not_started.fetch_add(1, Ordering::SeqCst);
                    return;
                }

                match self.process(input, &f, &latch) {
                    Outcome::Done(t) => lock(&results).push(t),
                    Outcome::Skipped(e) => lock(&skipped).push((input.to_string(), e)),
                    Outcome::Abandoned => {
                        not_started.fetch_add(1, Ordering::SeqCst);
                    }
                    Outcome::Failed => (),
                }
            });
        });

        let report = BatchReport {
            sketches: into_inner(results),
            skipped: into_inner(skipped),
            not_started: not_started.into_inner(),
        };

        if let Some(e) = latch.into_inner() {
            error!(
                "batch stopped: {} finished, {} not started",
                report.sketches.len(),
                report.not_started
            );
            return Err(e);
        }

        info!(
            "batch finished: {} done, {} skipped",
            report.sketches.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Sketch every sequence file with the same parameters.
    pub fn sketch_files(
        &self,
        inputs: &[SequenceInput],
        params: &ComputeParameters,
    ) -> Result<BatchReport<Sketch>, Error> {
        params.validate()?;
        self.run(inputs, |input| {
            Sketch::from_path(Some(input.name.clone()), &input.path, params)
        })
    }

    fn process<I, T, F>(&self, input: &I, f: &F, latch: &OnceCell<Error>) -> Outcome<T>
    where
        I: fmt::Display,
        F: Fn(&I) -> Result<T, Error>,
    {
        let max_attempts = self.config.max_attempts;

        for attempt in 1..=max_attempts {
            if attempt > 1 && latch.get().is_some() {
                debug!("{}: not retrying, batch is stopping", input);
                return Outcome::Abandoned;
            }

            let result = panic::catch_unwind(AssertUnwindSafe(|| f(input)))
                .unwrap_or_else(|payload| {
                    Err(Error::Panic {
                        message: panic_message(payload.as_ref()),
                    })
                });

            match result {
                Ok(t) => return Outcome::Done(t),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        "{}: attempt {}/{} failed: {}",
                        input, attempt, max_attempts, e
                    );
                }
                Err(e) if e.is_transient() || e.is_item_local() => {
                    warn!("skipping {}: {}", input, e);
                    return Outcome::Skipped(e);
                }
                Err(e) => {
                    error!("{}: unrecoverable error: {}", input, e);
                    // first writer wins
                    let _ = latch.set(e);
                    return Outcome::Failed;
                }
            }
        }

        Outcome::Abandoned
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn into_inner<T>(m: Mutex<T>) -> T {
    m.into_inner().unwrap_or_else(|e| e.into_inner())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
