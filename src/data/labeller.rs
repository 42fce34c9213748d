//! Labels derived from the directory an item lives in.

use crate::error::{Error, Result};
use std::path::Path;

/// Labels a file by the name of an ancestor directory
///
/// Level 1 is the immediate parent, level 2 its parent, and so on.
///
/// # Example
///
/// ```rust
/// use afinar::data::ParentLabeller;
///
/// let labeller = ParentLabeller::new(1);
/// assert_eq!(labeller.label("train/cats/001.jpg").unwrap(), "cats");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLabeller {
    level: usize,
}

impl ParentLabeller {
    /// Labeller reading the ancestor `level` steps up
    pub fn new(level: usize) -> Self {
        Self { level }
    }

    /// Configured level
    pub fn level(&self) -> usize {
        self.level
    }

    /// Name of the ancestor directory of `path` at the configured level
    ///
    /// # Errors
    /// Returns `Config` when the level is 0 and `InsufficientDepth` when the
    /// path has fewer named ancestors than the level.
    pub fn label(&self, path: impl AsRef<Path>) -> Result<String> {
        if self.level == 0 {
            return Err(Error::config("level", "must be at least 1"));
        }
        let path = path.as_ref();
        let mut current = path;
        for _ in 0..self.level {
            match current.parent() {
                Some(parent) if parent.file_name().is_some() => current = parent,
                _ => {
                    return Err(Error::InsufficientDepth {
                        path: path.to_path_buf(),
                        level: self.level,
                        available: named_ancestors(path),
                    })
                }
            }
        }
        current
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InsufficientDepth {
                path: path.to_path_buf(),
                level: self.level,
                available: named_ancestors(path),
            })
    }
}

impl Default for ParentLabeller {
    fn default() -> Self {
        Self::new(1)
    }
}

fn named_ancestors(path: &Path) -> usize {
    path.ancestors().skip(1).take_while(|a| a.file_name().is_some()).count()
}
