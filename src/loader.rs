use std::path::{Component, Path, PathBuf};

use log::debug;
use thiserror::Error;

/// Named values exposed by a loaded file.
pub type Symbols = toml::Table;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not read {}: {source}", path.display())]
    IO {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not load {} as `{unit}`: {source}", path.display())]
    Toml {
        path: PathBuf,
        unit: String,
        source: toml::de::Error,
    },
    #[error("`{symbol}` is not defined in {}", path.display())]
    MissingSymbol { symbol: String, path: PathBuf },
    #[error("File path {} must be relative to the repository root", path.display())]
    InvalidPath { path: PathBuf },
}

/// Turns the file at `path` into named symbols.
pub trait ContentLoader {
    fn load(&self, path: &Path, unit_name: &str) -> Result<Symbols, LoadError>;
}

/// Loads a TOML document; its top-level keys are the symbols.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlLoader;

impl ContentLoader for TomlLoader {
    fn load(&self, path: &Path, unit_name: &str) -> Result<Symbols, LoadError> {
        debug!("Loading {} from {}", unit_name, path.display());
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::IO {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| LoadError::Toml {
            path: path.to_path_buf(),
            unit: unit_name.to_string(),
            source,
        })
    }
}

/// Keeps only `imports`, in the order given. Every requested name must exist.
pub fn select(mut symbols: Symbols, imports: &[String], path: &Path) -> Result<Symbols, LoadError> {
    let mut selected = Symbols::new();
    for symbol in imports {
        let value = symbols
            .remove(symbol)
            .ok_or_else(|| LoadError::MissingSymbol {
                symbol: symbol.clone(),
                path: path.to_path_buf(),
            })?;
        selected.insert(symbol.clone(), value);
    }
    Ok(selected)
}

/// Checks that `file_path` names something inside a checkout.
pub fn check_relative(file_path: &Path) -> Result<(), LoadError> {
    let escapes = file_path.components().any(|component| {
        matches!(
            component,
            Component::RootDir | Component::Prefix(_) | Component::ParentDir
        )
    });
    if escapes || file_path.as_os_str().is_empty() {
        Err(LoadError::InvalidPath {
            path: file_path.to_path_buf(),
        })
    } else {
        Ok(())
    }
}

/// Name a loaded unit is known by: the file name without its extension.
pub fn unit_name(file_path: &Path) -> String {
    file_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}
