//! Run-scoped context shared by the pipeline components
//!
//! One [`RunContext`] lives for the duration of a document transform. It owns
//! the scratch directory all diagrams write into; files are keyed by the
//! block's unique id, so concurrent diagrams can never collide. The directory
//! is created at run start and purged when the context is dropped, unless an
//! explicit directory was supplied or the caller asked to keep it.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use super::config::FilterConfig;
use super::error::FilterError;
use super::types::BlockId;

enum Scratch {
    /// Auto-created temporary directory, removed on drop
    Temp(TempDir),
    /// Caller-supplied (or kept) directory, left in place
    Persistent(PathBuf),
}

/// Run-scoped state: the scratch directory and diagnostic verbosity
pub struct RunContext {
    scratch: Scratch,
    verbose: bool,
}

impl RunContext {
    /// Create the context for one run, materializing the scratch directory
    pub fn new(config: &FilterConfig) -> Result<Self, FilterError> {
        let scratch = match &config.scratch_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Scratch::Persistent(dir.clone())
            }
            None => {
                let tempdir = tempfile::Builder::new().prefix("scrimshaw-").tempdir()?;
                if config.keep_scratch {
                    Scratch::Persistent(tempdir.into_path())
                } else {
                    Scratch::Temp(tempdir)
                }
            }
        };
        let context = Self {
            scratch,
            verbose: config.verbose,
        };
        debug!(scratch = %context.scratch_dir().display(), "Created run context");
        Ok(context)
    }

    /// The scratch directory for this run
    pub fn scratch_dir(&self) -> &Path {
        match &self.scratch {
            Scratch::Temp(dir) => dir.path(),
            Scratch::Persistent(path) => path,
        }
    }

    /// Scratch path for one diagram's file with the given extension
    pub fn block_path(&self, id: &BlockId, extension: &str) -> PathBuf {
        self.scratch_dir().join(format!("{}.{}", id, extension))
    }

    /// Whether per-attempt diagnostics should be surfaced
    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_scratch_removed_on_drop() {
        let config = FilterConfig::default();
        let dir;
        {
            let context = RunContext::new(&config).unwrap();
            dir = context.scratch_dir().to_path_buf();
            assert!(dir.is_dir());
        }
        assert!(!dir.exists());
    }

    #[test]
    fn test_explicit_scratch_survives_drop() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = parent.path().join("work");
        let config = FilterConfig {
            scratch_dir: Some(scratch.clone()),
            ..FilterConfig::default()
        };
        {
            let context = RunContext::new(&config).unwrap();
            assert_eq!(context.scratch_dir(), scratch.as_path());
        }
        assert!(scratch.is_dir());
    }

    #[test]
    fn test_block_paths_are_keyed_by_id() {
        let config = FilterConfig::default();
        let context = RunContext::new(&config).unwrap();
        let a = BlockId::new();
        let b = BlockId::new();
        assert_ne!(context.block_path(&a, "svg"), context.block_path(&b, "svg"));
        assert_ne!(context.block_path(&a, "svg"), context.block_path(&a, "png"));
    }
}
