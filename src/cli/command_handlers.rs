use std::path::Path;

use anyhow::Context;
use log::warn;

use crate::{Gimport, ImportOptions};

/// Handler to import command
/// Loads `file_path` from the resolved revision and prints the symbols as TOML
pub fn do_import(
    gimport: &Gimport,
    repospec: &str,
    file_path: &Path,
    options: &ImportOptions,
    dry_run: bool,
) -> anyhow::Result<()> {
    let imported = gimport.import(repospec, file_path, options)?;
    if dry_run {
        return Ok(());
    }
    if let Some(warning) = &imported.reclaim_warning {
        warn!("Cache entry was not fully removed: {}", warning);
    }

    let output = toml::to_string(&imported.symbols)
        .with_context(|| format!("Could not print symbols of {}", imported.file.display()))?;
    print!("{}", output);
    Ok(())
}

/// Handler to resolve command
pub fn do_resolve(gimport: &Gimport, repospec: &str) -> anyhow::Result<()> {
    let spec = gimport.decompose(repospec)?;
    let resolved = gimport.divine(&spec)?;
    match &resolved.ref_name {
        Some(ref_name) => println!("{}\t{}", resolved.commit, ref_name),
        None => println!("{}", resolved.commit),
    }
    Ok(())
}

/// Handler to checkout command
pub fn do_checkout(gimport: &Gimport, repospec: &str) -> anyhow::Result<()> {
    let (_, _, path) = gimport.checkout(repospec)?;
    println!("{}", path.display());
    Ok(())
}

/// Handler to clear-cache command
pub fn do_clear_cache(gimport: &Gimport) -> anyhow::Result<()> {
    gimport.clear_cache()?;
    Ok(())
}
