//! Loading machine definitions from files, strings and directories.

use crate::parser::parse;
use crate::program::Definition;
use crate::types::AutomatonError;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of machine definitions.
pub const DEFINITION_EXTENSION: &str = "aut";

/// Loads and parses `.aut` definitions.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a single definition from `path`.
    ///
    /// # Returns
    ///
    /// * `Err(AutomatonError::FileError)` if the file cannot be read.
    /// * `Err(AutomatonError::ParseError)` or `ValidationError` if its content is invalid.
    pub fn load_program(path: &Path) -> Result<Definition, AutomatonError> {
        let content = fs::read_to_string(path).map_err(|e| {
            AutomatonError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        log::debug!("loading definition from {}", path.display());
        parse(&content)
    }

    pub fn load_program_from_string(content: &str) -> Result<Definition, AutomatonError> {
        parse(content)
    }

    /// Loads every `.aut` file in `directory`, sorted by path.
    ///
    /// Sub-directories and files with other extensions are skipped. Each element is either
    /// the loaded definition with its path, or the error that prevented loading it.
    pub fn load_programs(directory: &Path) -> Vec<Result<(PathBuf, Definition), AutomatonError>> {
        if !directory.exists() {
            return vec![Err(AutomatonError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(AutomatonError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut paths = Vec::new();
        let mut results = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(e) => results.push(Err(AutomatonError::FileError(format!(
                    "Failed to read directory entry: {}",
                    e
                )))),
            }
        }
        paths.sort();

        for path in paths {
            if path.is_dir() || path.extension().is_none_or(|ext| ext != DEFINITION_EXTENSION) {
                continue;
            }

            results.push(match Self::load_program(&path) {
                Ok(definition) => Ok((path, definition)),
                Err(e) => Err(AutomatonError::FileError(format!(
                    "Failed to load program from {}: {}",
                    path.display(),
                    e
                ))),
            });
        }

        results
    }
}
