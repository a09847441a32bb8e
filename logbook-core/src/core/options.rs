//! Explicit configuration for an export run.

use std::path::PathBuf;

use crate::{LogbookError, Result};

/// Mode for exported files when nothing else is configured (`rw-rw----`).
pub const DEFAULT_PERMISSIONS: u32 = 0o660;

/// Everything the export engine needs to know about where and how to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Directory that receives `index.html` and the `YYYY/` subtrees.
    pub root: PathBuf,
    /// Clear existing content instead of refusing to export over it.
    pub force: bool,
    /// Unix mode for written files; directories additionally get `0o100`.
    pub permissions: u32,
}

impl ExportOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            force: false,
            permissions: DEFAULT_PERMISSIONS,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Parses a three-digit octal permission string such as `"660"`.
///
/// # Errors
///
/// Returns [`LogbookError::InvalidPermissions`] unless the input is exactly
/// three octal digits.
pub fn parse_permissions(value: &str) -> Result<u32> {
    if value.len() != 3 {
        return Err(LogbookError::InvalidPermissions(format!(
            "{value:?} is not three octal digits"
        )));
    }

    value.chars().try_fold(0u32, |acc, c| match c.to_digit(8) {
        Some(digit) => Ok(acc * 8 + digit),
        None => Err(LogbookError::InvalidPermissions(format!(
            "{c:?} is not an octal digit"
        ))),
    })
}
