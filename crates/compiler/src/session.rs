//! Search session orchestration: loads the flag universe, wires the compiler
//! evaluator into the search engine and persists the report.

use crate::pipeline::{BuildConfig, CompilerEvaluator};
use anyhow::{Context, Result};
use flagforge_model::{CancelToken, FlagUniverse};
use flagforge_search::{RunAborted, RunReport, SearchConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Flag universe JSON (`{"executable", "version", "opts"}`).
    pub flags_path: PathBuf,
    pub search: SearchConfig,
    pub build: BuildConfig,
    /// Explicit report path; overrides the numbered results layout.
    pub output: Option<PathBuf>,
    pub results_root: PathBuf,
}

impl SessionOptions {
    pub fn new(flags_path: impl Into<PathBuf>, build: BuildConfig) -> Self {
        Self {
            flags_path: flags_path.into(),
            search: SearchConfig::default(),
            build,
            output: None,
            results_root: PathBuf::from("data/results"),
        }
    }
}

/// Numbered run directories under `<root>/<strategy>/<n>/`.
#[derive(Debug, Clone)]
pub struct ResultsStore {
    root: PathBuf,
}

impl ResultsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// One more than the highest numeric run directory for `strategy`, or 0.
    pub fn next_run_index(&self, strategy: &str) -> Result<usize> {
        let dir = self.root.join(strategy);
        if !dir.exists() {
            return Ok(0);
        }
        let mut next = 0;
        for entry in fs::read_dir(&dir).with_context(|| format!("listing {}", dir.display()))? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(idx) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<usize>().ok())
            {
                next = next.max(idx + 1);
            }
        }
        Ok(next)
    }

    /// Create the next run directory and return the report path inside it.
    pub fn allocate(&self, strategy: &str, flags_path: &Path) -> Result<PathBuf> {
        let idx = self.next_run_index(strategy)?;
        let dir = self.root.join(strategy).join(idx.to_string());
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(dir.join(report_file_name(flags_path)))
    }
}

/// `<flags-stem>_results.json`.
pub fn report_file_name(flags_path: &Path) -> String {
    let stem = flags_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "flags".to_string());
    format!("{stem}_results.json")
}

/// A finished session: the report and where it was written.
#[derive(Debug)]
pub struct SessionOutcome {
    pub report: RunReport,
    pub path: PathBuf,
}

pub struct SearchSession {
    options: SessionOptions,
    universe: FlagUniverse,
    evaluator: CompilerEvaluator,
    store: ResultsStore,
    cancel: CancelToken,
}

impl SearchSession {
    pub fn new(options: SessionOptions, cancel: CancelToken) -> Result<Self> {
        let universe = FlagUniverse::load(&options.flags_path).with_context(|| {
            format!("loading flag universe from {}", options.flags_path.display())
        })?;
        options
            .search
            .validate(universe.len())
            .context("invalid search configuration")?;
        let evaluator = CompilerEvaluator::new(options.build.clone(), &universe)?
            .with_cancel(cancel.clone());
        let store = ResultsStore::new(&options.results_root);

        info!(
            flags = universe.len(),
            compiler = %evaluator.compiler().display(),
            version = universe.version.as_deref().unwrap_or("unknown"),
            "loaded flag universe"
        );

        Ok(Self {
            options,
            universe,
            evaluator,
            store,
            cancel,
        })
    }

    pub fn universe(&self) -> &FlagUniverse {
        &self.universe
    }

    pub fn evaluator(&self) -> &CompilerEvaluator {
        &self.evaluator
    }

    /// Run the search and write its report. Aborted runs still write their
    /// partial report before the error is returned.
    pub fn run(&self) -> Result<SessionOutcome> {
        match flagforge_search::run(
            &self.options.search,
            &self.universe,
            &self.evaluator,
            &self.cancel,
        ) {
            Ok(report) => {
                let path = self.save(&report)?;
                Ok(SessionOutcome { report, path })
            }
            Err(RunAborted { error, partial }) => {
                if let Some(partial) = partial {
                    let path = self.save(&partial)?;
                    warn!(path = %path.display(), "wrote partial report");
                }
                Err(anyhow::Error::new(error).context("search aborted"))
            }
        }
    }

    fn save(&self, report: &RunReport) -> Result<PathBuf> {
        let path = match &self.options.output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                path.clone()
            }
            None => self
                .store
                .allocate(&report.strategy, &self.options.flags_path)?,
        };
        report
            .save(&path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!(path = %path.display(), "report saved");
        Ok(path)
    }
}
