/// Indentation-aware string builder for emitting JS source code.
use serde_json::Value;

pub struct CodeWriter {
    buf: String,
    depth: usize,
    /// Suffix for the next generated local name.
    next_id: usize,
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            depth: 0,
            next_id: 0,
        }
    }

    /// Write a line at the current indentation level.
    pub fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.buf.push('\n');
            return;
        }
        self.write_indent();
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    /// Write each line of `text`, re-indented to the current level.
    pub fn lines(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    /// Open a block: write `text {` and increase indent.
    pub fn open(&mut self, text: &str) {
        self.write_indent();
        self.buf.push_str(text);
        self.buf.push_str(" {\n");
        self.depth += 1;
    }

    /// Open a bare `{` block scope.
    pub fn block(&mut self) {
        self.write_indent();
        self.buf.push_str("{\n");
        self.depth += 1;
    }

    /// Close a block: decrease indent and write `}`.
    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.write_indent();
        self.buf.push_str("}\n");
    }

    /// Close with a continuation: `} else {`, `} else if (...) {`, etc.
    pub fn close_open(&mut self, text: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.write_indent();
        self.buf.push_str("} ");
        self.buf.push_str(text);
        self.buf.push_str(" {\n");
        self.depth += 1;
    }

    /// A local name unique within the module: `n1`, `ev2`, `k3`, ...
    pub fn fresh(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    /// Current indentation depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Consume and return the built string.
    pub fn finish(self) -> String {
        self.buf
    }

    fn write_indent(&mut self) {
        for _ in 0..self.depth {
            self.buf.push_str("  ");
        }
    }
}

/// A JS double-quoted string literal for `s`. JSON string syntax is a
/// subset of JS string syntax, so serde_json does the escaping.
pub fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}
