//! Build-and-run pipeline: compiles the target sources with a candidate flag
//! list in a scratch directory and times the resulting artifact.

use anyhow::{ensure, Context, Result};
use flagforge_model::{CancelToken, Evaluator, FlagUniverse, Outcome, SearchError, SearchResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use tempfile::TempDir;
use tracing::{debug, warn};

/// How often a supervised child is checked for cancellation.
const CANCEL_CHECK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Compiler executable. `None` uses the flag universe's executable.
    pub compiler: Option<PathBuf>,
    /// Arguments placed before the candidate flags.
    pub base_args: Vec<String>,
    /// Source files, copied into each scratch directory by file name.
    pub sources: Vec<PathBuf>,
    /// Artifact the compiler is expected to produce.
    pub artifact: String,
    pub run_args: Vec<String>,
    pub warmup_runs: usize,
    pub runs: usize,
    /// Wall-clock limit per artifact execution.
    pub timeout: Option<Duration>,
    /// Parent for scratch directories. `None` uses the system temp dir.
    pub work_root: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            compiler: None,
            base_args: Vec::new(),
            sources: Vec::new(),
            artifact: "a.out".to_string(),
            run_args: Vec::new(),
            warmup_runs: 0,
            runs: 1,
            timeout: None,
            work_root: None,
        }
    }
}

impl BuildConfig {
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    pub fn with_compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = Some(compiler.into());
        self
    }

    pub fn with_base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    pub fn with_run_args(mut self, args: Vec<String>) -> Self {
        self.run_args = args;
        self
    }

    pub fn with_runs(mut self, warmup_runs: usize, runs: usize) -> Self {
        self.warmup_runs = warmup_runs;
        self.runs = runs.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.sources.is_empty(), "at least one source file is required");
        ensure!(self.runs > 0, "runs must be > 0");
        ensure!(!self.artifact.is_empty(), "artifact name must not be empty");
        for source in &self.sources {
            ensure!(
                source.file_name().is_some(),
                "source path {} has no file name",
                source.display()
            );
        }
        Ok(())
    }
}

/// How a supervised child process ended.
enum Exit {
    Status(ExitStatus, Duration),
    TimedOut,
}

/// Evaluator that shells out to a real compiler.
#[derive(Debug)]
pub struct CompilerEvaluator {
    config: BuildConfig,
    compiler: PathBuf,
    cancel: CancelToken,
}

impl CompilerEvaluator {
    pub fn new(mut config: BuildConfig, universe: &FlagUniverse) -> Result<Self> {
        config.validate()?;
        if let Some(root) = &config.work_root {
            fs::create_dir_all(root)
                .with_context(|| format!("creating work root {}", root.display()))?;
            config.work_root = Some(
                root.canonicalize()
                    .with_context(|| format!("resolving work root {}", root.display()))?,
            );
        }
        let mut compiler = match (&config.compiler, &universe.executable) {
            (Some(compiler), _) => compiler.clone(),
            (None, Some(executable)) => PathBuf::from(executable),
            (None, None) => anyhow::bail!(
                "no compiler given and the flag universe does not name an executable"
            ),
        };
        // Children run inside scratch directories, so a relative path such as
        // `./cc` must be pinned now. Bare names stay on PATH lookup.
        if compiler.is_relative() && compiler.components().count() > 1 {
            compiler = compiler
                .canonicalize()
                .with_context(|| format!("resolving compiler {}", compiler.display()))?;
        }
        Ok(Self {
            config,
            compiler,
            cancel: CancelToken::new(),
        })
    }

    /// Kill in-flight children and fail with `Interrupted` once `cancel` is set.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn compiler(&self) -> &Path {
        &self.compiler
    }

    fn scratch_dir(&self) -> SearchResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("flagforge-");
        let dir = match &self.config.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(|e| SearchError::unavailable(format!("cannot create scratch directory: {e}")))
    }

    /// Copy sources into `dir`, returning their file names.
    fn stage_sources(&self, dir: &Path) -> SearchResult<Vec<String>> {
        self.config
            .sources
            .iter()
            .map(|source| {
                let name = source.file_name().ok_or_else(|| {
                    SearchError::unavailable(format!("{} has no file name", source.display()))
                })?;
                fs::copy(source, dir.join(name)).map_err(|e| {
                    SearchError::unavailable(format!("cannot copy {}: {e}", source.display()))
                })?;
                Ok(name.to_string_lossy().into_owned())
            })
            .collect()
    }

    fn compile(&self, dir: &Path, flags: &[String], sources: &[String]) -> SearchResult<bool> {
        debug!(
            compiler = %self.compiler.display(),
            flags = %flags.join(" "),
            "compiling candidate"
        );
        let child = Command::new(&self.compiler)
            .args(&self.config.base_args)
            .args(flags)
            .args(sources)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                SearchError::unavailable(format!(
                    "cannot run compiler {}: {e}",
                    self.compiler.display()
                ))
            })?;

        match supervise(child, None, &self.cancel)? {
            Exit::Status(status, _) => Ok(status.success()),
            Exit::TimedOut => Ok(false),
        }
    }

    /// One execution of the artifact; `None` on a non-zero exit, a signal or
    /// a timeout.
    fn execute(&self, dir: &Path, artifact: &Path) -> SearchResult<Option<Duration>> {
        self.cancel.check()?;
        let child = match Command::new(artifact)
            .args(&self.config.run_args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(artifact = %artifact.display(), error = %e, "artifact failed to start");
                return Ok(None);
            }
        };

        match supervise(child, self.config.timeout, &self.cancel)? {
            Exit::Status(status, elapsed) if status.success() => Ok(Some(elapsed)),
            Exit::Status(status, _) => {
                warn!(%status, "artifact exited unsuccessfully");
                Ok(None)
            }
            Exit::TimedOut => {
                warn!(timeout = ?self.config.timeout, "artifact timed out");
                Ok(None)
            }
        }
    }
}

impl Evaluator for CompilerEvaluator {
    fn name(&self) -> &str {
        "compiler"
    }

    fn evaluate(&self, flags: &[String]) -> SearchResult<Outcome> {
        self.cancel.check()?;
        let dir = self.scratch_dir()?;
        let sources = self.stage_sources(dir.path())?;

        if !self.compile(dir.path(), flags, &sources)? {
            debug!(flags = %flags.join(" "), "build failed");
            return Ok(Outcome::BuildFailure);
        }
        let artifact = dir.path().join(&self.config.artifact);
        if !artifact.is_file() {
            debug!(artifact = %artifact.display(), "compiler produced no artifact");
            return Ok(Outcome::BuildFailure);
        }

        for _ in 0..self.config.warmup_runs {
            if self.execute(dir.path(), &artifact)?.is_none() {
                return Ok(Outcome::RuntimeError);
            }
        }

        let mut samples = Vec::with_capacity(self.config.runs);
        for _ in 0..self.config.runs {
            match self.execute(dir.path(), &artifact)? {
                Some(elapsed) => samples.push(elapsed.as_secs_f64()),
                None => return Ok(Outcome::RuntimeError),
            }
        }

        let (mean, stdev) = mean_and_stdev(&samples);
        let outcome = Outcome::success(mean, flags.to_vec());
        Ok(match stdev {
            Some(stdev) => outcome.with_stdev(stdev),
            None => outcome,
        })
    }
}

/// Mean and sample standard deviation; the deviation needs two samples.
fn mean_and_stdev(samples: &[f64]) -> (f64, Option<f64>) {
    if samples.is_empty() {
        return (0.0, None);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    if samples.len() < 2 {
        return (mean, None);
    }
    let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, Some(var.sqrt()))
}

/// Wait for `child` on a helper thread, which stamps the exit time as soon as
/// `wait` returns. The calling thread kills the child's process tree on
/// cancellation or once `timeout` has passed.
fn supervise(
    mut child: Child,
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> SearchResult<Exit> {
    let start = Instant::now();
    let pid = child.id();
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        scope.spawn(move || {
            let status = child.wait();
            let _ = tx.send((status, Instant::now()));
        });

        loop {
            let slice = match timeout {
                Some(limit) => limit.saturating_sub(start.elapsed()).min(CANCEL_CHECK),
                None => CANCEL_CHECK,
            };
            match rx.recv_timeout(slice) {
                Ok((Ok(status), exited)) => {
                    return Ok(Exit::Status(status, exited.saturating_duration_since(start)))
                }
                Ok((Err(e), _)) => {
                    return Err(SearchError::unavailable(format!("cannot wait on child: {e}")))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SearchError::unavailable("child waiter exited without a status"))
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if cancel.is_cancelled() {
                kill_process_tree(pid);
                return Err(SearchError::Interrupted);
            }
            if timeout.is_some_and(|limit| start.elapsed() >= limit) {
                kill_process_tree(pid);
                return Ok(Exit::TimedOut);
            }
        }
    })
}

/// SIGKILL `pid` and every descendant, children first.
fn kill_process_tree(pid: u32) {
    let root = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for (pid, process) in sys.processes() {
        if let Some(parent) = process.parent() {
            children.entry(parent).or_default().push(*pid);
        }
    }

    let mut tree = vec![root];
    let mut idx = 0;
    while let Some(pid) = tree.get(idx).copied() {
        if let Some(kids) = children.get(&pid) {
            tree.extend(kids.iter().copied());
        }
        idx += 1;
    }

    for pid in tree.into_iter().rev() {
        if let Some(process) = sys.process(pid) {
            if process.kill_with(Signal::Kill) != Some(true) {
                let _ = process.kill();
            }
        }
    }
}
