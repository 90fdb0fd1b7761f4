//! Python execution through a long-lived interpreter process.
//!
//! The interpreter runs a small driver that speaks line-delimited JSON on its
//! standard streams: one `{"ready": ..}` line at startup, then one reply per
//! request, matched by id. Snippet source travels as data and is handed to
//! `exec` as the `user_code` global, never spliced into interpreter source.
//!
//! The driver moves the protocol onto private descriptors at startup, so a
//! snippet writing to the real stdout cannot inject lines into the channel.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use facet::Facet;
use playdoc_config::RuntimeSettings;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::engine::{ExecutionResult, NO_OUTPUT_MESSAGE};
use crate::loader::{RuntimeAsset, RuntimeLoader};
use crate::{Error, Result};

const DRIVER: &str = include_str!("driver.py");

#[derive(Debug, Facet)]
struct Ready {
    ready: bool,
    version: String,
}

#[derive(Debug, Facet)]
struct Request {
    id: u64,
    source: String,
}

#[derive(Debug, Facet)]
struct Reply {
    id: u64,
    error: bool,
    message: String,
}

/// How to start the Python interpreter.
#[derive(Debug, Clone)]
pub struct PythonAsset {
    command: String,
    load_timeout: Duration,
}

impl PythonAsset {
    pub fn new(command: impl Into<String>, load_timeout: Duration) -> Self {
        Self {
            command: command.into(),
            load_timeout,
        }
    }

    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        Self::new(
            settings.python.clone(),
            Duration::from_secs(settings.load_timeout_secs),
        )
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    async fn start(&self) -> Result<PythonRuntime> {
        let mut child = Command::new(&self.command)
            .arg("-u")
            .arg("-c")
            .arg(DRIVER)
            .arg(NO_OUTPUT_MESSAGE)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Protocol("interpreter stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Protocol("interpreter stdout unavailable".to_string()))?;
        let mut stdout = BufReader::new(stdout).lines();

        let line = tokio::time::timeout(self.load_timeout, stdout.next_line())
            .await
            .map_err(|_| Error::LoadTimeout {
                secs: self.load_timeout.as_secs(),
            })??
            .ok_or_else(|| {
                Error::Protocol("interpreter exited before reporting ready".to_string())
            })?;

        let ready: Ready = facet_json::from_str(&line)
            .map_err(|e| Error::Protocol(format!("unexpected ready line {line:?}: {e}")))?;
        if !ready.ready {
            return Err(Error::Protocol("interpreter reported not ready".to_string()));
        }

        tracing::debug!(command = %self.command, version = %ready.version, "Python driver started");

        Ok(PythonRuntime {
            version: ready.version,
            io: Mutex::new(DriverIo {
                _child: child,
                stdin,
                stdout,
                next_id: 0,
            }),
        })
    }
}

impl RuntimeAsset for PythonAsset {
    type Runtime = PythonRuntime;

    fn name(&self) -> &'static str {
        "python"
    }

    fn load(&self) -> Pin<Box<dyn Future<Output = Result<PythonRuntime>> + Send + '_>> {
        Box::pin(self.start())
    }
}

struct DriverIo {
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

/// A ready Python interpreter. Runs are serialized.
pub struct PythonRuntime {
    version: String,
    io: Mutex<DriverIo>,
}

impl PythonRuntime {
    /// Interpreter version, e.g. `3.12.1`
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Execute `source` in a fresh namespace.
    ///
    /// Replies left over from a run whose caller stopped waiting are skipped.
    pub async fn run(&self, source: &str) -> Result<ExecutionResult> {
        let mut io = self.io.lock().await;
        io.next_id += 1;
        let id = io.next_id;

        let mut request = facet_json::to_string(&Request {
            id,
            source: source.to_string(),
        })
        .map_err(|e| Error::Protocol(format!("failed to encode request: {e}")))?;
        request.push('\n');

        io.stdin.write_all(request.as_bytes()).await?;
        io.stdin.flush().await?;

        let reply = loop {
            let line = io
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| Error::Protocol("interpreter exited during run".to_string()))?;

            let parsed: std::result::Result<Reply, _> = facet_json::from_str(&line);
            match parsed {
                Ok(reply) if reply.id == id => break reply,
                Ok(reply) => {
                    tracing::debug!(expected = id, got = reply.id, "skipping stale python reply");
                }
                Err(_) => tracing::warn!(line = %line, "skipping non-protocol line from python"),
            }
        };
        drop(io);

        let message = match reply.message.strip_suffix('\n') {
            Some(trimmed) => trimmed.to_string(),
            None => reply.message,
        };

        Ok(ExecutionResult {
            output: message,
            is_error: reply.error,
        })
    }
}

static PYTHON_LOADER: OnceLock<Arc<RuntimeLoader<PythonAsset>>> = OnceLock::new();

/// The process-wide Python loader. The first caller's settings win.
pub fn python_loader(settings: &RuntimeSettings) -> Arc<RuntimeLoader<PythonAsset>> {
    PYTHON_LOADER
        .get_or_init(|| Arc::new(RuntimeLoader::new(PythonAsset::from_settings(settings))))
        .clone()
}
