//! Snippet execution for playdoc.
//!
//! JavaScript is evaluated in-process on QuickJS; Python runs in an
//! interpreter process that is started on first demand and shared by every
//! session through a [`RuntimeLoader`]. Both paths report through the same
//! [`ExecutionResult`], and an [`Executor`] applies the per-session run gate.

mod engine;
mod error;
mod javascript;
mod loader;
mod python;

pub use engine::{ExecutionResult, Executor, JS_ERROR_PREFIX, NO_OUTPUT_MESSAGE, ScriptLanguage};
pub use error::{Error, Result};
pub use javascript::{JsHost, format_arg, inspect};
pub use loader::{RuntimeAsset, RuntimeLoader, RuntimeState};
pub use python::{PythonAsset, PythonRuntime, python_loader};
