//! Programmatic notebook creation with builder pattern

use std::path::{Path, PathBuf};

use lectern_harness::{Cell, CellKind, NotebookDocument, NOTEBOOK_EXT};

/// Builder for creating test notebooks
pub struct NotebookBuilder {
    cells: Vec<Cell>,
}

impl NotebookBuilder {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    /// Append a code cell
    pub fn code(mut self, source: &str) -> Self {
        self.cells.push(Cell {
            kind: CellKind::Code,
            source: source.to_string(),
            tag: None,
        });
        self
    }

    /// Append a tagged code cell
    pub fn code_tagged(mut self, tag: &str, source: &str) -> Self {
        self.cells.push(Cell {
            kind: CellKind::Code,
            source: source.to_string(),
            tag: Some(tag.to_string()),
        });
        self
    }

    /// Append a markdown cell (never executed)
    pub fn markdown(mut self, source: &str) -> Self {
        self.cells.push(Cell {
            kind: CellKind::Markdown,
            source: source.to_string(),
            tag: None,
        });
        self
    }

    pub fn build(self) -> NotebookDocument {
        NotebookDocument { cells: self.cells }
    }

    /// Write the notebook to `<dir>/<identifier>.nb.json` and return the path
    pub fn write_to(&self, dir: &Path, identifier: &str) -> std::io::Result<PathBuf> {
        let document = NotebookDocument {
            cells: self.cells.clone(),
        };
        let path = dir.join(format!("{}.{}", identifier, NOTEBOOK_EXT));
        let contents = serde_json::to_string_pretty(&document).map_err(std::io::Error::other)?;
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

impl Default for NotebookBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Cell source that suspends the kernel for the given milliseconds
pub fn sleeping_cell(ms: u64) -> String {
    format!("sleep_ms({})", ms)
}

/// Cell source that raises with the given message
pub fn raising_cell(message: &str) -> String {
    format!("error('{}')", message)
}

#[cfg(test)]
mod tests;
