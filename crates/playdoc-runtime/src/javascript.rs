//! In-process JavaScript evaluation on QuickJS.

use std::cell::RefCell;
use std::rc::Rc;

use rquickjs::function::{Rest, This};
use rquickjs::{
    Array, CatchResultExt, CaughtError, Context, Ctx, Function, Object, Runtime, Type, Value,
};

use crate::engine::{ExecutionResult, JS_ERROR_PREFIX, NO_OUTPUT_MESSAGE};
use crate::{Error, Result};

/// Nesting depth past which objects print as `[Object]` / `[Array]`
const MAX_INSPECT_DEPTH: usize = 5;

const CONSOLE_METHODS: [&str; 5] = ["log", "info", "warn", "error", "debug"];

/// Where `console.*` calls end up.
///
/// While a [`ConsoleCapture`] is active lines are buffered; otherwise they go
/// to the log.
#[derive(Clone, Default)]
struct ConsoleSink {
    captured: Rc<RefCell<Option<Vec<String>>>>,
}

impl ConsoleSink {
    fn write(&self, method: &str, line: String) {
        match self.captured.borrow_mut().as_mut() {
            Some(buffer) => buffer.push(line),
            None => tracing::info!(target: "playdoc::console", method, "{}", line),
        }
    }

    fn is_capturing(&self) -> bool {
        self.captured.borrow().is_some()
    }
}

/// Redirects console output into a buffer until dropped.
///
/// Whatever was in place before is restored on drop, on every exit path.
struct ConsoleCapture<'a> {
    sink: &'a ConsoleSink,
    previous: Option<Vec<String>>,
}

impl<'a> ConsoleCapture<'a> {
    fn begin(sink: &'a ConsoleSink) -> Self {
        let previous = sink.captured.replace(Some(Vec::new()));
        Self { sink, previous }
    }

    /// Stop capturing and return the captured lines.
    fn finish(self) -> Vec<String> {
        self.sink.captured.borrow_mut().take().unwrap_or_default()
    }
}

impl Drop for ConsoleCapture<'_> {
    fn drop(&mut self) {
        *self.sink.captured.borrow_mut() = self.previous.take();
    }
}

/// A QuickJS runtime evaluating snippets for one session.
///
/// Every evaluation gets a fresh global scope, so re-running a snippet that
/// declares `let x` does not collide with the previous run.
pub struct JsHost {
    runtime: Runtime,
    console: ConsoleSink,
}

impl JsHost {
    pub fn new() -> Result<Self> {
        let runtime = Runtime::new().map_err(|e| Error::JavaScript(e.to_string()))?;
        Ok(Self {
            runtime,
            console: ConsoleSink::default(),
        })
    }

    /// Evaluate `source` and normalize what it printed or produced.
    pub fn evaluate(&self, source: &str) -> ExecutionResult {
        let context = match Context::full(&self.runtime) {
            Ok(context) => context,
            Err(e) => return ExecutionResult::error(format!("{JS_ERROR_PREFIX}{e}")),
        };

        let capture = ConsoleCapture::begin(&self.console);

        let outcome: std::result::Result<Option<String>, String> = context.with(|ctx| {
            install_console(&ctx, &self.console).map_err(|e| e.to_string())?;
            match ctx.eval::<Value, _>(source).catch(&ctx) {
                Ok(value) if value.is_undefined() => Ok(None),
                Ok(value) => Ok(Some(format_arg(&value))),
                Err(err) => Err(describe(err)),
            }
        });

        // Promise callbacks still print into the capture
        self.drain_jobs();

        let mut lines = capture.finish();

        match outcome {
            Ok(value) => {
                if lines.is_empty() {
                    lines.extend(value);
                }
                for line in &lines {
                    tracing::debug!(target: "playdoc::console", "{}", line);
                }
                if lines.is_empty() {
                    ExecutionResult::success(NO_OUTPUT_MESSAGE)
                } else {
                    ExecutionResult::success(lines.join("\n"))
                }
            }
            Err(message) => ExecutionResult::error(format!("{JS_ERROR_PREFIX}{message}")),
        }
    }

    fn drain_jobs(&self) {
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => continue,
                Ok(false) => break,
                Err(_) => tracing::debug!("pending javascript job threw"),
            }
        }
    }
}

fn install_console<'js>(ctx: &Ctx<'js>, sink: &ConsoleSink) -> rquickjs::Result<()> {
    let console = Object::new(ctx.clone())?;
    for method in CONSOLE_METHODS {
        let sink = sink.clone();
        let func = Function::new(ctx.clone(), move |args: Rest<Value<'js>>| {
            let line = args.0.iter().map(format_arg).collect::<Vec<_>>().join(" ");
            sink.write(method, line);
        })?;
        console.set(method, func)?;
    }
    ctx.globals().set("console", console)
}

fn describe(err: CaughtError<'_>) -> String {
    match err {
        CaughtError::Exception(exception) => exception.message().unwrap_or_default(),
        CaughtError::Value(value) => format_arg(&value),
        CaughtError::Error(e) => e.to_string(),
    }
}

fn is_primitive(value: &Value<'_>) -> bool {
    matches!(
        value.type_of(),
        Type::Uninitialized
            | Type::Undefined
            | Type::Null
            | Type::Bool
            | Type::Int
            | Type::Float
            | Type::String
            | Type::Symbol
            | Type::BigInt
    )
}

/// Format one console argument: primitives by string conversion, everything
/// else through [`inspect`].
pub fn format_arg(value: &Value<'_>) -> String {
    if is_primitive(value) {
        js_string(value)
    } else {
        inspect(value)
    }
}

/// Structural, object-inspect style rendering of a value.
///
/// `{ a: 1, b: 'x' }`, `[ 1, 2 ]`, `[Function: f]`, `[Error: boom]`,
/// `Map (1) {'a' => 1}`, `Set (2) {1, 2}`. Dates and regular expressions
/// print as their string form.
pub fn inspect(value: &Value<'_>) -> String {
    inspect_at(value, 0)
}

fn inspect_at(value: &Value<'_>, depth: usize) -> String {
    match value.type_of() {
        Type::String => quote(&js_string(value)),
        Type::BigInt => format!("{}n", js_string(value)),
        Type::Function | Type::Constructor => {
            let name = value
                .as_object()
                .and_then(|o| o.get::<_, String>("name").ok())
                .filter(|n| !n.is_empty());
            match name {
                Some(name) => format!("[Function: {name}]"),
                None => "[Function (anonymous)]".to_string(),
            }
        }
        Type::Exception => format!("[{}]", js_string(value)),
        Type::Array => {
            if depth >= MAX_INSPECT_DEPTH {
                return "[Array]".to_string();
            }
            let Some(array) = value.as_array() else {
                return js_string(value);
            };
            let items: Vec<String> = array
                .iter::<Value>()
                .map(|item| match item {
                    Ok(item) => inspect_at(&item, depth + 1),
                    Err(_) => "undefined".to_string(),
                })
                .collect();
            if items.is_empty() {
                "[]".to_string()
            } else {
                format!("[ {} ]", items.join(", "))
            }
        }
        Type::Object => {
            match builtin_tag(value).as_deref() {
                Some("Date" | "RegExp") => return js_string(value),
                Some(tag @ ("Map" | "Set")) => return inspect_collection(tag, value, depth),
                _ => {}
            }
            if depth >= MAX_INSPECT_DEPTH {
                return "[Object]".to_string();
            }
            let Some(object) = value.as_object() else {
                return js_string(value);
            };
            let entries: Vec<String> = object
                .props::<String, Value>()
                .filter_map(|prop| prop.ok())
                .map(|(key, v)| format!("{}: {}", format_key(&key), inspect_at(&v, depth + 1)))
                .collect();
            if entries.is_empty() {
                "{}".to_string()
            } else {
                format!("{{ {} }}", entries.join(", "))
            }
        }
        _ => js_string(value),
    }
}

/// `Map`, `Set`, `Date`... from `Object.prototype.toString`.
fn builtin_tag(value: &Value<'_>) -> Option<String> {
    let to_string: Function = value
        .ctx()
        .globals()
        .get::<_, Object>("Object")
        .and_then(|object| object.get::<_, Object>("prototype"))
        .and_then(|prototype| prototype.get("toString"))
        .ok()?;
    let tag: String = to_string.call((This(value.clone()),)).ok()?;
    tag.strip_prefix("[object ")?
        .strip_suffix(']')
        .map(str::to_string)
}

/// `Map (n) {k => v, ...}` or `Set (n) {a, ...}`, walked through `Array.from`.
fn inspect_collection(tag: &str, value: &Value<'_>, depth: usize) -> String {
    if depth >= MAX_INSPECT_DEPTH {
        return format!("[{tag}]");
    }
    let items: Option<Array> = value
        .ctx()
        .globals()
        .get::<_, Object>("Array")
        .and_then(|array| array.get::<_, Function>("from"))
        .and_then(|from| from.call((value.clone(),)))
        .ok();
    let Some(items) = items else {
        return js_string(value);
    };

    let entries: Vec<String> = items
        .iter::<Value>()
        .filter_map(|item| item.ok())
        .map(|item| match (tag, item.as_array()) {
            ("Map", Some(pair)) => {
                let key = pair.get::<Value>(0).map(|k| inspect_at(&k, depth + 1));
                let v = pair.get::<Value>(1).map(|v| inspect_at(&v, depth + 1));
                format!(
                    "{} => {}",
                    key.unwrap_or_else(|_| "undefined".to_string()),
                    v.unwrap_or_else(|_| "undefined".to_string())
                )
            }
            _ => inspect_at(&item, depth + 1),
        })
        .collect();
    format!("{tag} ({}) {{{}}}", entries.len(), entries.join(", "))
}

/// `String(value)`, as the page would compute it.
fn js_string(value: &Value<'_>) -> String {
    value
        .ctx()
        .globals()
        .get::<_, Function>("String")
        .and_then(|string| string.call::<_, String>((value.clone(),)))
        .unwrap_or_else(|_| "[unprintable]".to_string())
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn format_key(key: &str) -> String {
    let mut chars = key.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if identifier {
        key.to_string()
    } else {
        quote(key)
    }
}

impl std::fmt::Debug for JsHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsHost")
            .field("capturing", &self.console.is_capturing())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> ExecutionResult {
        JsHost::new().unwrap().evaluate(source)
    }

    #[test]
    fn test_expression_value_becomes_output() {
        let result = eval("1 + 2");
        assert_eq!(result.output, "3");
        assert!(!result.is_error);
    }

    #[test]
    fn test_console_log_is_captured() {
        let result = eval("console.log(\"hi\")");
        assert_eq!(result.output, "hi");
        assert!(!result.is_error);
    }

    #[test]
    fn test_thrown_error_sets_flag() {
        let result = eval("throw new Error(\"boom\")");
        assert!(result.is_error);
        assert!(result.output.contains("boom"));
        assert_eq!(result.output, "Error: boom");
    }

    #[test]
    fn test_thrown_non_error_value() {
        let result = eval("throw 'plain'");
        assert!(result.is_error);
        assert_eq!(result.output, "Error: plain");
    }

    #[test]
    fn test_collections_show_their_entries() {
        assert_eq!(eval("new Map([['a', 1], ['b', [2]]])").output, "Map (2) {'a' => 1, 'b' => [ 2 ]}");
        assert_eq!(eval("new Set([1, 'x'])").output, "Set (2) {1, 'x'}");
        assert_eq!(eval("console.log('m', new Map())").output, "m Map (0) {}");
        assert_eq!(eval("({ tags: new Set(['t']) })").output, "{ tags: Set (1) {'t'} }");
    }

    #[test]
    fn test_dates_and_regexps_print_as_strings() {
        let date = eval("new Date(0)").output;
        assert!(date.contains("1970") || date.contains("1969"), "{date}");
        assert_ne!(date, "{}");
        assert_eq!(eval("/a+b/g").output, "/a+b/g");
        assert_eq!(eval("new Date(NaN)").output, "Invalid Date");
    }

    #[test]
    fn test_no_output() {
        let result = eval("let x = 1;");
        assert_eq!(result.output, NO_OUTPUT_MESSAGE);
        assert!(!result.is_error);
    }

    #[test]
    fn test_console_output_wins_over_value() {
        let result = eval("console.log('a'); console.warn('b', 2); 42");
        assert_eq!(result.output, "a\nb 2");
    }

    #[test]
    fn test_arguments_are_inspected() {
        let result = eval("console.log('obj', { a: 1, b: 'x' }, [1, [2]], null, undefined)");
        assert_eq!(result.output, "obj { a: 1, b: 'x' } [ 1, [ 2 ] ] null undefined");
    }

    #[test]
    fn test_object_result_is_inspected() {
        assert_eq!(eval("({ 'a-b': [], c: {} })").output, "{ 'a-b': [], c: {} }");
        assert_eq!(eval("function f() {}; f").output, "[Function: f]");
        assert_eq!(eval("new Error('x')").output, "[Error: x]");
    }

    #[test]
    fn test_deep_nesting_is_elided() {
        let result = eval("({ a: { b: { c: { d: { e: { f: 1 } } } } } })");
        assert_eq!(result.output, "{ a: { b: { c: { d: { e: [Object] } } } } }");
    }

    #[test]
    fn test_runs_do_not_share_globals() {
        let host = JsHost::new().unwrap();
        assert_eq!(host.evaluate("let a = 1; a").output, "1");
        assert_eq!(host.evaluate("let a = 2; a").output, "2");
    }

    #[test]
    fn test_capture_is_released_after_error() {
        let host = JsHost::new().unwrap();
        let result = host.evaluate("console.log('before'); throw new Error('x')");
        assert_eq!(result.output, "Error: x");
        assert!(!host.console.is_capturing());
    }

    #[test]
    fn test_promise_callbacks_are_captured() {
        let result = eval("Promise.resolve(5).then(v => console.log('got', v)); undefined");
        assert_eq!(result.output, "got 5");
    }
}
