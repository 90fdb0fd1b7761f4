//! Completion sources for the executable languages.
//!
//! Each source is a fixed list of common built-ins. A source only answers
//! when the cursor sits inside a word, or when completion was requested
//! explicitly.

/// Marker inside a template where the cursor lands after insertion.
pub const CURSOR_MARKER: &str = "${1}";

/// Category tag of a completion option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Variable,
    Function,
}

impl CompletionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionKind::Variable => "variable",
            CompletionKind::Function => "function",
        }
    }
}

/// A single suggested symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub label: &'static str,
    pub kind: CompletionKind,
    /// Human-readable description
    pub info: &'static str,
    /// Insertable snippet; `${1}` marks the argument position
    pub template: Option<&'static str>,
}

impl Completion {
    const fn variable(label: &'static str, info: &'static str) -> Self {
        Self {
            label,
            kind: CompletionKind::Variable,
            info,
            template: None,
        }
    }

    const fn function(label: &'static str, template: &'static str, info: &'static str) -> Self {
        Self {
            label,
            kind: CompletionKind::Function,
            info,
            template: Some(template),
        }
    }

    /// Text to insert, and the cursor offset within it.
    pub fn insertion(&self) -> (String, usize) {
        match self.template {
            Some(template) => match template.find(CURSOR_MARKER) {
                Some(at) => (template.replacen(CURSOR_MARKER, "", 1), at),
                None => (template.to_string(), template.len()),
            },
            None => (self.label.to_string(), self.label.len()),
        }
    }
}

/// Where and why completion was requested.
#[derive(Debug, Clone, Copy)]
pub struct CompletionContext<'a> {
    /// Whole document
    pub text: &'a str,
    /// Cursor byte offset
    pub pos: usize,
    /// True when the user asked for completion rather than typed
    pub explicit: bool,
}

impl<'a> CompletionContext<'a> {
    pub fn new(text: &'a str, pos: usize, explicit: bool) -> Self {
        Self {
            text,
            pos,
            explicit,
        }
    }

    /// The run of word characters (`[A-Za-z0-9_]`) ending at the cursor.
    pub fn word_before(&self) -> (usize, &'a str) {
        let head = &self.text[..self.pos];
        let from = head
            .char_indices()
            .rev()
            .take_while(|(_, c)| is_word_char(*c))
            .last()
            .map(|(i, _)| i)
            .unwrap_or(self.pos);
        (from, &head[from..])
    }
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Options offered for the word starting at `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    /// Start of the word being completed
    pub from: usize,
    pub options: Vec<Completion>,
}

impl CompletionResult {
    /// Keep the options whose label starts with `typed`, at most `max` of them.
    pub fn narrowed(mut self, typed: &str, max: usize) -> Self {
        self.options.retain(|o| o.label.starts_with(typed));
        self.options.truncate(max);
        self
    }
}

/// A completion source: context in, options out.
pub type CompletionSource = fn(&CompletionContext<'_>) -> Option<CompletionResult>;

const JAVASCRIPT: &[Completion] = &[
    Completion::variable("console", "Console object for debugging output"),
    Completion::function("console.log", "console.log(${1})", "Print a message to the console"),
    Completion::function("console.error", "console.error(${1})", "Print an error to the console"),
    Completion::function("console.warn", "console.warn(${1})", "Print a warning to the console"),
    Completion::variable("Math", "Math constants and functions"),
    Completion::function("Math.random", "Math.random()", "Random number between 0 and 1"),
    Completion::function("Math.floor", "Math.floor(${1})", "Round down to an integer"),
    Completion::function("JSON.parse", "JSON.parse(${1})", "Parse a JSON string"),
    Completion::function("JSON.stringify", "JSON.stringify(${1})", "Serialize a value to JSON"),
];

const PYTHON: &[Completion] = &[
    Completion::function("print", "print(${1})", "Print to standard output"),
    Completion::function("len", "len(${1})", "Length of an object"),
    Completion::function("range", "range(${1})", "Sequence of numbers"),
    Completion::function("int", "int(${1})", "Convert to an integer"),
    Completion::function("str", "str(${1})", "Convert to a string"),
    Completion::function("list", "list(${1})", "Create a list"),
];

fn complete_from(ctx: &CompletionContext<'_>, options: &[Completion]) -> Option<CompletionResult> {
    let (from, word) = ctx.word_before();
    if word.is_empty() && !ctx.explicit {
        return None;
    }
    Some(CompletionResult {
        from,
        options: options.to_vec(),
    })
}

/// Built-ins of JavaScript (also used for TypeScript).
pub fn javascript_completions(ctx: &CompletionContext<'_>) -> Option<CompletionResult> {
    complete_from(ctx, JAVASCRIPT)
}

/// Built-ins of Python.
pub fn python_completions(ctx: &CompletionContext<'_>) -> Option<CompletionResult> {
    complete_from(ctx, PYTHON)
}
