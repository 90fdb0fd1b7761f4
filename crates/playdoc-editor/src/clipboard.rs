//! Clipboard sinks for copy-to-clipboard.

use std::sync::Mutex;

use crate::EditorError;

/// Somewhere the editor's text can be copied to.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), EditorError>;
}

/// The operating system clipboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), EditorError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| EditorError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(text)
            .map_err(|e| EditorError::Clipboard(e.to_string()))
    }
}

/// An in-process clipboard, for headless use.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), EditorError> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|e| EditorError::Clipboard(e.to_string()))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}
