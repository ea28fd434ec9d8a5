//! Cell evaluation on a single persistent Lua state.
//!
//! This module provides the `CellEvaluator` struct which owns the kernel's
//! Lua state and executes one cell at a time, capturing everything the cell
//! prints. Bindings persist across cells for the life of the evaluator.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::Utc;
use mlua::{Lua, Value};
use tokio::sync::mpsc;

use crate::errors::{KernelError, Result};

/// Rebinds `print` and `io.write` to the capture sink. Runs once at
/// evaluator construction; the raw emit hook is removed from globals so
/// cells can only reach it through the rebound functions.
const BOOTSTRAP: &str = r#"
local emit = __emit
__emit = nil

function print(...)
    local n = select('#', ...)
    local parts = {}
    for i = 1, n do
        parts[i] = tostring(select(i, ...))
    end
    emit(table.concat(parts, '\t'), true)
end

io.write = function(...)
    local n = select('#', ...)
    for i = 1, n do
        emit(tostring(select(i, ...)), false)
    end
end
"#;

/// Result of one successfully executed cell.
#[derive(Debug, Clone)]
pub struct CellOutcome {
    pub outputs: Vec<String>,
    pub duration_ms: u64,
    pub finished_at: i64,
}

/// Captures cell output, assembling partial `io.write` fragments into
/// complete lines. Lines are recorded and optionally streamed live.
#[derive(Default)]
struct OutputSink {
    lines: Vec<String>,
    partial: String,
    stream: Option<mpsc::UnboundedSender<String>>,
}

impl OutputSink {
    fn start(&mut self, stream: Option<mpsc::UnboundedSender<String>>) {
        self.lines.clear();
        self.partial.clear();
        self.stream = stream;
    }

    fn emit(&mut self, text: &str, newline: bool) {
        self.partial.push_str(text);
        if newline {
            self.partial.push('\n');
        }
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            self.push_line(line.trim_end_matches('\n').to_string());
        }
    }

    fn push_line(&mut self, line: String) {
        if let Some(tx) = &self.stream {
            let _ = tx.send(line.clone());
        }
        self.lines.push(line);
    }

    /// Flush any trailing partial line, detach the stream, and return the
    /// captured output.
    fn finish(&mut self) -> Vec<String> {
        if !self.partial.is_empty() {
            let rest = std::mem::take(&mut self.partial);
            self.push_line(rest);
        }
        self.stream = None;
        std::mem::take(&mut self.lines)
    }
}

/// Evaluator for notebook cells.
///
/// Manages a single Lua state that persists across all cells of one
/// notebook run. Each cell chunk is named `cell[<index>]` so Lua errors
/// and tracebacks attribute failures to the originating cell.
pub struct CellEvaluator {
    lua: Lua,
    sink: Rc<RefCell<OutputSink>>,
    baseline: HashSet<String>,
}

impl CellEvaluator {
    /// Create a new evaluator with a fresh Lua state.
    pub fn new() -> Result<Self> {
        let lua = Lua::new();
        let sink = Rc::new(RefCell::new(OutputSink::default()));

        let emit_sink = Rc::clone(&sink);
        let emit = lua
            .create_function(move |_, (text, newline): (String, bool)| {
                emit_sink.borrow_mut().emit(&text, newline);
                Ok(())
            })
            .map_err(lua_error)?;
        lua.globals().set("__emit", emit).map_err(lua_error)?;

        // Suspends the session for the given number of milliseconds. The
        // session runs one cell at a time, so blocking the thread here is
        // exactly the sequential suspension notebook semantics call for.
        let sleep = lua
            .create_function(|_, ms: u64| {
                std::thread::sleep(Duration::from_millis(ms));
                Ok(())
            })
            .map_err(lua_error)?;
        lua.globals().set("sleep_ms", sleep).map_err(lua_error)?;

        lua.load(BOOTSTRAP)
            .set_name("bootstrap")
            .exec()
            .map_err(lua_error)?;

        let baseline = global_names(&lua).map_err(lua_error)?;

        Ok(Self {
            lua,
            sink,
            baseline,
        })
    }

    /// Execute one cell, capturing its output.
    ///
    /// When `stream` is provided, complete output lines are sent on it as
    /// they are produced, in addition to being collected in the outcome.
    pub fn execute_cell(
        &self,
        index: usize,
        source: &str,
        stream: Option<mpsc::UnboundedSender<String>>,
    ) -> Result<CellOutcome> {
        self.sink.borrow_mut().start(stream);
        let started = Instant::now();

        let result = self
            .lua
            .load(source)
            .set_name(format!("cell[{}]", index))
            .exec();

        let outputs = self.sink.borrow_mut().finish();

        match result {
            Ok(()) => Ok(CellOutcome {
                outputs,
                duration_ms: started.elapsed().as_millis() as u64,
                finished_at: Utc::now().timestamp_millis(),
            }),
            Err(e) => {
                let (message, traceback) = split_lua_error(&e);
                Err(KernelError::Cell {
                    index,
                    message,
                    traceback,
                })
            }
        }
    }

    /// Read a global binding, serialized as JSON. Returns `None` when the
    /// binding does not exist.
    pub fn inspect(&self, name: &str) -> Result<Option<String>> {
        let value: Value = self.lua.globals().get(name).map_err(lua_error)?;
        if value.is_nil() {
            return Ok(None);
        }
        let json = serde_json::to_string(&value).map_err(|e| KernelError::Serialize {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(json))
    }

    /// Names of globals defined by executed cells, sorted. Bindings that
    /// existed before the first cell ran (the standard library, the capture
    /// hooks) are excluded.
    pub fn user_globals(&self) -> Result<Vec<String>> {
        let current = global_names(&self.lua).map_err(lua_error)?;
        let mut names: Vec<String> = current.difference(&self.baseline).cloned().collect();
        names.sort();
        Ok(names)
    }
}

fn lua_error(e: mlua::Error) -> KernelError {
    KernelError::Lua(e.to_string())
}

/// Collect the string keys of the globals table.
fn global_names(lua: &Lua) -> mlua::Result<HashSet<String>> {
    let mut names = HashSet::new();
    for pair in lua.globals().pairs::<Value, Value>() {
        let (key, _) = pair?;
        if let Value::String(s) = key {
            names.insert(s.to_str()?.to_string());
        }
    }
    Ok(names)
}

/// Split a Lua error into its message and the traceback, when one is
/// attached. The message keeps the `cell[<index>]:<line>` prefix so the
/// originating cell stays visible.
fn split_lua_error(e: &mlua::Error) -> (String, Option<String>) {
    let rendered = e.to_string();
    match rendered.find("\nstack traceback:") {
        Some(pos) => (
            rendered[..pos].trim_end().to_string(),
            Some(rendered[pos + 1..].to_string()),
        ),
        None => (rendered, None),
    }
}

#[cfg(test)]
mod tests;
