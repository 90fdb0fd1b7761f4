//! One output contract over both execution paths.

use std::cell::{Cell, OnceCell, RefCell};
use std::sync::Arc;

use crate::javascript::JsHost;
use crate::loader::{RuntimeLoader, RuntimeState};
use crate::python::PythonAsset;

/// Output when a run printed nothing and produced no value
pub const NO_OUTPUT_MESSAGE: &str = "Code executed successfully, no output";

/// Prefix of JavaScript error output
pub const JS_ERROR_PREFIX: &str = "Error: ";

/// The languages snippets can be executed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptLanguage {
    JavaScript,
    Python,
}

impl ScriptLanguage {
    /// Map a fence tag (canonical or long form) to a language.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "js" | "javascript" => Some(Self::JavaScript),
            "py" | "python" => Some(Self::Python),
            _ => None,
        }
    }

    /// The canonical tag.
    pub fn tag(self) -> &'static str {
        match self {
            Self::JavaScript => "js",
            Self::Python => "py",
        }
    }
}

/// The normalized outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub output: String,
    pub is_error: bool,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: false,
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: true,
        }
    }
}

/// Clears the in-flight flag however the run ends.
struct InFlight<'a>(&'a Cell<bool>);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Runs snippets for one session and holds its latest result.
///
/// Runs are strictly serialized: a request that arrives while another run is
/// in flight is dropped, not queued.
pub struct Executor {
    python: Arc<RuntimeLoader<PythonAsset>>,
    js: OnceCell<JsHost>,
    running: Cell<bool>,
    has_error: Cell<bool>,
    output: RefCell<String>,
}

impl Executor {
    pub fn new(python: Arc<RuntimeLoader<PythonAsset>>) -> Self {
        Self {
            python,
            js: OnceCell::new(),
            running: Cell::new(false),
            has_error: Cell::new(false),
            output: RefCell::new(String::new()),
        }
    }

    pub fn output(&self) -> String {
        self.output.borrow().clone()
    }

    pub fn has_error(&self) -> bool {
        self.has_error.get()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Whether `language` can run right now without waiting on a load.
    pub fn is_ready(&self, language: ScriptLanguage) -> bool {
        match language {
            ScriptLanguage::JavaScript => true,
            ScriptLanguage::Python => self.python.state() == RuntimeState::Ready,
        }
    }

    /// Label of the run button.
    pub fn run_label(&self, language: ScriptLanguage) -> &'static str {
        if self.is_running() {
            "Running..."
        } else if !self.is_ready(language) {
            "Loading..."
        } else {
            "Run"
        }
    }

    /// Make sure the runtime for `language` is loaded.
    ///
    /// A failed load becomes this session's error output.
    pub async fn prepare(&self, language: ScriptLanguage) -> bool {
        if language != ScriptLanguage::Python {
            return true;
        }
        match self.python.ensure_ready().await {
            Ok(_) => true,
            Err(e) => {
                self.finish(ExecutionResult::error(e.to_string()));
                false
            }
        }
    }

    /// Run `source`. Returns whether the request was dispatched.
    pub async fn run(&self, language: ScriptLanguage, source: &str) -> bool {
        if self.is_running() {
            tracing::debug!(language = language.tag(), "run ignored: already running");
            return false;
        }
        if !self.is_ready(language) {
            tracing::debug!(language = language.tag(), "run ignored: runtime not ready");
            return false;
        }

        let _in_flight = InFlight::enter(&self.running);
        self.has_error.set(false);

        let result = match language {
            ScriptLanguage::JavaScript => self.run_javascript(source),
            ScriptLanguage::Python => self.run_python(source).await,
        };

        tracing::debug!(
            language = language.tag(),
            is_error = result.is_error,
            "run finished"
        );
        self.finish(result);
        true
    }

    fn finish(&self, result: ExecutionResult) {
        self.has_error.set(result.is_error);
        *self.output.borrow_mut() = result.output;
    }

    fn run_javascript(&self, source: &str) -> ExecutionResult {
        if let Some(host) = self.js.get() {
            return host.evaluate(source);
        }
        match JsHost::new() {
            Ok(host) => self.js.get_or_init(|| host).evaluate(source),
            Err(e) => ExecutionResult::error(format!("{JS_ERROR_PREFIX}{e}")),
        }
    }

    async fn run_python(&self, source: &str) -> ExecutionResult {
        let Some(python) = self.python.handle() else {
            return ExecutionResult::error("python runtime is not loaded");
        };
        match python.run(source).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "python run failed");
                if e.is_fatal() {
                    self.python.invalidate(&python);
                }
                ExecutionResult::error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn loader(command: &str) -> Arc<RuntimeLoader<PythonAsset>> {
        Arc::new(RuntimeLoader::new(PythonAsset::new(
            command,
            Duration::from_secs(30),
        )))
    }

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_language_tags() {
        assert_eq!(ScriptLanguage::from_tag("js"), Some(ScriptLanguage::JavaScript));
        assert_eq!(ScriptLanguage::from_tag("python"), Some(ScriptLanguage::Python));
        assert_eq!(ScriptLanguage::from_tag("ts"), None);
        assert_eq!(ScriptLanguage::Python.tag(), "py");
    }

    #[tokio::test]
    async fn test_javascript_scenarios() {
        let exec = Executor::new(loader("python3"));

        assert!(exec.run(ScriptLanguage::JavaScript, "1 + 2").await);
        assert_eq!(exec.output(), "3");
        assert!(!exec.has_error());

        assert!(exec.run(ScriptLanguage::JavaScript, "console.log(\"hi\")").await);
        assert_eq!(exec.output(), "hi");

        assert!(exec.run(ScriptLanguage::JavaScript, "throw new Error(\"boom\")").await);
        assert!(exec.output().contains("boom"));
        assert!(exec.has_error());

        // The error flag is cleared by the next run
        assert!(exec.run(ScriptLanguage::JavaScript, "'ok'").await);
        assert!(!exec.has_error());
        assert!(!exec.is_running());
    }

    #[tokio::test]
    async fn test_python_before_ready_is_ignored() {
        let exec = Executor::new(loader("python3"));
        assert!(exec.run(ScriptLanguage::JavaScript, "'previous'").await);

        assert!(!exec.run(ScriptLanguage::Python, "print(1)").await);
        assert_eq!(exec.output(), "previous");
        assert_eq!(exec.run_label(ScriptLanguage::Python), "Loading...");
        assert_eq!(exec.run_label(ScriptLanguage::JavaScript), "Run");
    }

    #[tokio::test]
    async fn test_failed_load_becomes_error_output() {
        let exec = Executor::new(loader("playdoc-no-such-python"));
        assert!(!exec.prepare(ScriptLanguage::Python).await);
        assert!(exec.has_error());
        assert!(exec.output().contains("runtime unavailable"));
        assert!(exec.prepare(ScriptLanguage::JavaScript).await);
    }

    #[tokio::test]
    async fn test_python_scenarios() {
        if !python_available() {
            eprintln!("python3 not available, skipping");
            return;
        }
        let exec = Executor::new(loader("python3"));
        assert!(exec.prepare(ScriptLanguage::Python).await);
        assert_eq!(exec.run_label(ScriptLanguage::Python), "Run");

        assert!(exec.run(ScriptLanguage::Python, "print(1+1)").await);
        assert_eq!(exec.output(), "2");
        assert!(!exec.has_error());

        assert!(exec.run(ScriptLanguage::Python, "raise ValueError('bad')").await);
        assert_eq!(exec.output(), "ValueError: bad");
        assert!(exec.has_error());
    }

    #[tokio::test]
    async fn test_dead_interpreter_is_replaced() {
        if !python_available() {
            eprintln!("python3 not available, skipping");
            return;
        }
        let python = loader("python3");
        let exec = Executor::new(python.clone());
        assert!(exec.prepare(ScriptLanguage::Python).await);

        assert!(exec.run(ScriptLanguage::Python, "import os\nos._exit(3)").await);
        assert!(exec.has_error());
        assert!(exec.output().contains("interpreter exited"));
        assert_eq!(python.state(), RuntimeState::Unloaded);

        assert!(exec.prepare(ScriptLanguage::Python).await);
        assert!(exec.run(ScriptLanguage::Python, "print(1)").await);
        assert_eq!(exec.output(), "1");
        assert!(!exec.has_error());
    }

    #[tokio::test]
    async fn test_second_run_while_in_flight_is_dropped() {
        if !python_available() {
            eprintln!("python3 not available, skipping");
            return;
        }
        let exec = Executor::new(loader("python3"));
        assert!(exec.prepare(ScriptLanguage::Python).await);

        let (first, second) = tokio::join!(
            exec.run(
                ScriptLanguage::Python,
                "import time\ntime.sleep(0.2)\nprint('first')"
            ),
            async {
                tokio::task::yield_now().await;
                let label = exec.run_label(ScriptLanguage::Python);
                (label, exec.run(ScriptLanguage::JavaScript, "'second'").await)
            }
        );

        assert!(first);
        assert_eq!(second, ("Running...", false));
        assert_eq!(exec.output(), "first");
        assert!(!exec.is_running());
    }
}
