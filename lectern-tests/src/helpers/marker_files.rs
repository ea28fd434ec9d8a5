//! Cell execution verification using marker files

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Helper for proving which cells ran via marker files
#[derive(Clone)]
pub struct MarkerFileHelper {
    base_dir: PathBuf,
}

impl MarkerFileHelper {
    /// Create a new marker file helper with the given base directory
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    /// Get the path to a marker file
    pub fn marker_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.marker", name))
    }

    /// Cell source that creates the marker file when executed
    pub fn marker_cell(&self, name: &str) -> String {
        let path = self.marker_path(name);
        format!(
            "local f = assert(io.open('{}', 'w'))\nf:write('ok')\nf:close()",
            path.display()
        )
    }

    /// Check if a marker file exists
    pub fn marker_exists(&self, name: &str) -> bool {
        self.marker_path(name).exists()
    }

    /// Wait for a marker file to appear
    pub async fn wait_for_marker(&self, name: &str, timeout: Duration) -> bool {
        let marker_path = self.marker_path(name);
        let start = Instant::now();

        while start.elapsed() < timeout {
            if marker_path.exists() {
                return true;
            }
            sleep(Duration::from_millis(50)).await;
        }

        false
    }
}
