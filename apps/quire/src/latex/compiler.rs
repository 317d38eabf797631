//! Compile runner — turns LaTeX source into a persisted PDF.
//!
//! # Job protocol
//! 1. Create a scoped working directory, unique per job.
//! 2. Write `document.tex` into it.
//! 3. Run the engine `passes` times, each under a wall-clock timeout. Only the last
//!    pass's failure is terminal; earlier passes may fail while still producing the
//!    auxiliary files the next pass needs.
//! 4. Require `document.pdf` to exist and start with `%PDF-`, whatever the exit code said.
//! 5. Copy the PDF into the artifact store.
//! 6. Remove the working directory. This happens on every exit path: `JobWorkspace`
//!    closes explicitly, and the inner `TempDir` removes itself on drop if the job
//!    future is dropped mid-flight.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::latex::artifacts::ArtifactStore;

pub const DEFAULT_PASSES: u8 = 2;
pub const MAX_PASSES: u8 = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

const JOB_SOURCE: &str = "document.tex";
const JOB_PDF: &str = "document.pdf";
const JOB_LOG: &str = "document.log";
const CONSOLE_LOG: &str = "console.log";
const PDF_MAGIC: &[u8; 5] = b"%PDF-";
/// Only the tail of an engine log is kept; errors are reported at the end.
const LOG_TAIL_BYTES: usize = 16 * 1024;

// ────────────────────────────────────────────────────────────────────────────
// Engine & options
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Pdflatex,
    Xelatex,
    Lualatex,
}

impl Engine {
    /// Executable name looked up on `PATH`.
    pub fn program(self) -> &'static str {
        match self {
            Engine::Pdflatex => "pdflatex",
            Engine::Xelatex => "xelatex",
            Engine::Lualatex => "lualatex",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdflatex" => Ok(Engine::Pdflatex),
            "xelatex" => Ok(Engine::Xelatex),
            "lualatex" => Ok(Engine::Lualatex),
            other => Err(format!(
                "unknown LaTeX engine '{other}' (expected pdflatex, xelatex or lualatex)"
            )),
        }
    }
}

/// Per-job settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub engine: Engine,
    /// Number of engine runs; values below 1 run once.
    pub passes: u8,
    /// Wall-clock limit for each pass.
    pub timeout: Duration,
    /// Artifact name; generated from the timestamp when absent.
    pub output_name: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            engine: Engine::default(),
            passes: DEFAULT_PASSES,
            timeout: DEFAULT_TIMEOUT,
            output_name: None,
        }
    }
}

/// Handle to a successfully compiled and persisted PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledArtifact {
    pub job_id: Uuid,
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub passes_run: u8,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Failure category, for callers deciding whether to retry, alert or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompileErrorKind {
    CompileTimeout,
    CompileProcessFailed,
    CompileArtifactMissing,
    CompileSpawnError,
    CompileWorkspace,
}

/// Engine logs carried here may contain filesystem paths. They are for operators
/// and must not be shown to end users.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{engine} timed out after {timeout_ms}ms on final pass {pass}")]
    Timeout {
        engine: Engine,
        pass: u8,
        timeout_ms: u64,
        log: Option<String>,
    },

    #[error("{engine} exited with status {exit_code:?} on final pass {pass}")]
    ProcessFailed {
        engine: Engine,
        pass: u8,
        exit_code: Option<i32>,
        log: Option<String>,
    },

    #[error("{engine} finished without producing a valid PDF")]
    ArtifactMissing { engine: Engine, log: Option<String> },

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("compile workspace error: {0}")]
    Workspace(#[source] io::Error),
}

impl CompileError {
    pub fn kind(&self) -> CompileErrorKind {
        match self {
            CompileError::Timeout { .. } => CompileErrorKind::CompileTimeout,
            CompileError::ProcessFailed { .. } => CompileErrorKind::CompileProcessFailed,
            CompileError::ArtifactMissing { .. } => CompileErrorKind::CompileArtifactMissing,
            CompileError::Spawn { .. } => CompileErrorKind::CompileSpawnError,
            CompileError::Workspace(_) => CompileErrorKind::CompileWorkspace,
        }
    }

    /// Tail of the engine's log, when one was captured.
    pub fn log(&self) -> Option<&str> {
        match self {
            CompileError::Timeout { log, .. }
            | CompileError::ProcessFailed { log, .. }
            | CompileError::ArtifactMissing { log, .. } => log.as_deref(),
            CompileError::Spawn { .. } | CompileError::Workspace(_) => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Compiler seam
// ────────────────────────────────────────────────────────────────────────────

/// Turns a complete document source into a persisted artifact.
///
/// Default: `LatexCompiler`. Handlers depend on this trait so the process-spawning
/// runner can be swapped for a stub.
#[async_trait]
pub trait DocumentCompiler: Send + Sync {
    async fn compile(
        &self,
        source: String,
        options: CompileOptions,
    ) -> Result<CompiledArtifact, CompileError>;
}

/// Process-level settings shared by every job.
#[derive(Debug, Clone, Default)]
pub struct CompilerSettings {
    /// Parent directory for per-job working directories (system temp dir if unset).
    pub work_root: Option<PathBuf>,
    /// Executable used instead of the engine's default program name.
    pub program_override: Option<PathBuf>,
    /// Maximum number of jobs running at once.
    pub max_concurrent: usize,
}

#[derive(Clone)]
pub struct LatexCompiler {
    settings: Arc<CompilerSettings>,
    artifacts: ArtifactStore,
    permits: Arc<Semaphore>,
}

impl LatexCompiler {
    pub fn new(settings: CompilerSettings, artifacts: ArtifactStore) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));
        Self {
            settings: Arc::new(settings),
            artifacts,
            permits,
        }
    }

    fn program(&self, engine: Engine) -> PathBuf {
        self.settings
            .program_override
            .clone()
            .unwrap_or_else(|| PathBuf::from(engine.program()))
    }

    /// Runs one compile job end to end. See the module docs for the protocol.
    pub async fn compile_source(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompiledArtifact, CompileError> {
        let _permit = self.permits.acquire().await.map_err(|_| {
            CompileError::Workspace(io::Error::other("compile queue is closed"))
        })?;

        let job_id = Uuid::new_v4();
        let started_at = Instant::now();
        let workspace = JobWorkspace::create(self.settings.work_root.as_deref(), job_id)?;

        let result = self.run_job(job_id, workspace.path(), source, options).await;
        workspace.close();

        match &result {
            Ok(artifact) => info!(
                job_id = %job_id,
                engine = %options.engine,
                passes = artifact.passes_run,
                artifact = %artifact.name,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "Compile job succeeded"
            ),
            Err(err) => warn!(
                job_id = %job_id,
                engine = %options.engine,
                kind = ?err.kind(),
                error = %err,
                log_tail = err.log().unwrap_or(""),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "Compile job failed"
            ),
        }
        result
    }

    async fn run_job(
        &self,
        job_id: Uuid,
        dir: &Path,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompiledArtifact, CompileError> {
        tokio::fs::write(dir.join(JOB_SOURCE), source)
            .await
            .map_err(CompileError::Workspace)?;

        let program = self.program(options.engine);
        let passes = options.passes.max(1);

        for pass in 1..=passes {
            let is_last = pass == passes;
            let outcome = run_pass(&program, dir, options.timeout).await?;
            debug!(job_id = %job_id, pass, outcome = ?outcome, "Engine pass finished");

            match outcome {
                PassOutcome::Succeeded => {}
                PassOutcome::Failed { exit_code } if is_last => {
                    return Err(CompileError::ProcessFailed {
                        engine: options.engine,
                        pass,
                        exit_code,
                        log: read_log(dir).await,
                    });
                }
                PassOutcome::TimedOut if is_last => {
                    return Err(CompileError::Timeout {
                        engine: options.engine,
                        pass,
                        timeout_ms: options.timeout.as_millis() as u64,
                        log: read_log(dir).await,
                    });
                }
                PassOutcome::Failed { exit_code } => warn!(
                    job_id = %job_id,
                    pass,
                    exit_code = ?exit_code,
                    "Intermediate engine pass failed; continuing"
                ),
                PassOutcome::TimedOut => warn!(
                    job_id = %job_id,
                    pass,
                    "Intermediate engine pass timed out; continuing"
                ),
            }
        }

        let pdf = dir.join(JOB_PDF);
        if !is_pdf(&pdf).await {
            return Err(CompileError::ArtifactMissing {
                engine: options.engine,
                log: read_log(dir).await,
            });
        }

        let stored = self
            .artifacts
            .persist(&pdf, options.output_name.as_deref())
            .await
            .map_err(CompileError::Workspace)?;

        Ok(CompiledArtifact {
            job_id,
            name: stored.name,
            path: stored.path,
            size_bytes: stored.size_bytes,
            passes_run: passes,
        })
    }
}

#[async_trait]
impl DocumentCompiler for LatexCompiler {
    async fn compile(
        &self,
        source: String,
        options: CompileOptions,
    ) -> Result<CompiledArtifact, CompileError> {
        self.compile_source(&source, &options).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Job workspace
// ────────────────────────────────────────────────────────────────────────────

/// Exclusive working directory for one job. Never shared, never reused.
struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    fn create(root: Option<&Path>, job_id: Uuid) -> Result<Self, CompileError> {
        let prefix = format!("quire-{}-", job_id.simple());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(CompileError::Workspace)?;
        Ok(Self { dir })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the directory, logging (not failing) if removal goes wrong.
    fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(err) = self.dir.close() {
            warn!(dir = %path.display(), error = %err, "Failed to remove compile workspace");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine passes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassOutcome {
    Succeeded,
    Failed { exit_code: Option<i32> },
    TimedOut,
}

async fn run_pass(program: &Path, dir: &Path, limit: Duration) -> Result<PassOutcome, CompileError> {
    // Console output goes to a file in the workspace rather than a pipe, so a
    // stray grandchild holding the descriptor cannot stall the job.
    let console = std::fs::File::create(dir.join(CONSOLE_LOG)).map_err(CompileError::Workspace)?;
    let console_err = console.try_clone().map_err(CompileError::Workspace)?;

    let mut child = Command::new(program)
        .arg("-interaction=nonstopmode")
        .arg("-halt-on-error")
        .arg("-file-line-error")
        .arg(JOB_SOURCE)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(console))
        .stderr(Stdio::from(console_err))
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CompileError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

    let waited = tokio::time::timeout(limit, child.wait()).await;
    match waited {
        Ok(Ok(status)) if status.success() => Ok(PassOutcome::Succeeded),
        Ok(Ok(status)) => Ok(PassOutcome::Failed {
            exit_code: status.code(),
        }),
        Ok(Err(err)) => Err(CompileError::Workspace(err)),
        Err(_elapsed) => {
            if let Err(err) = child.kill().await {
                warn!(error = %err, "Failed to kill timed-out engine process");
            }
            Ok(PassOutcome::TimedOut)
        }
    }
}

async fn is_pdf(path: &Path) -> bool {
    let Ok(mut file) = tokio::fs::File::open(path).await else {
        return false;
    };
    let mut magic = [0u8; 5];
    file.read_exact(&mut magic).await.is_ok() && &magic == PDF_MAGIC
}

/// Engine log tail: `document.log` if the engine wrote one, else console output.
async fn read_log(dir: &Path) -> Option<String> {
    for name in [JOB_LOG, CONSOLE_LOG] {
        if let Ok(bytes) = tokio::fs::read(dir.join(name)).await {
            if !bytes.is_empty() {
                return Some(tail(&String::from_utf8_lossy(&bytes), LOG_TAIL_BYTES));
            }
        }
    }
    None
}

fn tail(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
