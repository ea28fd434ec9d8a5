//! Notebook document model.
//!
//! A notebook is a JSON file holding an ordered list of cells. Only code
//! cells execute; markdown cells are carried for authorship but skipped by
//! the harness.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{HarnessError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Code,
    Markdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub kind: CellKind,
    pub source: String,
    /// Optional label for looking the cell up from test bodies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotebookDocument {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

impl NotebookDocument {
    /// Load and parse a notebook document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| HarnessError::DocumentRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&raw).map_err(|source| HarnessError::DocumentParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a notebook document, reporting the JSON path of any offending field
    pub fn parse(
        raw: &str,
    ) -> std::result::Result<Self, serde_path_to_error::Error<serde_json::Error>> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(&mut deserializer)
    }

    /// Code cells with their document positions, in execution order
    pub fn code_cells(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.kind == CellKind::Code)
    }
}
