use std::path::Path;

use anyhow::{Context, Result};

/// Split a comma-separated profile list, dropping blank entries.
pub fn parse_profiles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}

/// One URL per line; blank lines and `#` comments are ignored.
pub fn parse_list_urls(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Load the list of definition URLs, failing if the file yields none.
pub fn load_list_urls(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let urls = parse_list_urls(&contents);
    if urls.is_empty() {
        anyhow::bail!("{} is empty or has no valid URLs", path.display());
    }
    Ok(urls)
}

/// Load variables from an env file into the process environment.
///
/// A missing file is not an error. Variables that are already set keep
/// their value. Returns whether a file was loaded.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e).with_context(|| format!("failed to load {}", path.display())),
    }
}
