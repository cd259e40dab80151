//! Init command - write a starter baseline.toml

use crate::config::{CONFIG_FILENAME, STARTER_CONFIG};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

/// Run the init command
pub fn run(path: &Path) -> Result<()> {
    let root = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }

    let config_path = root.join(CONFIG_FILENAME);
    if config_path.exists() {
        println!(
            "{} Already initialized at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, STARTER_CONFIG)
        .with_context(|| format!("Failed to create {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(CONFIG_FILENAME).cyan()
    );

    println!("\nNext steps:");
    println!("  {} Point `traffic` at your analytics export", style("1.").dim());
    println!(
        "  {} Run {}",
        style("2.").dim(),
        style("baseline-gate scan --traffic traffic.csv").cyan()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path()).unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), STARTER_CONFIG);

        std::fs::write(&path, "threshold = 0.5\n").unwrap();
        run(dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "threshold = 0.5\n");
    }

    #[test]
    fn test_init_missing_path() {
        assert!(run(Path::new("/definitely/not/here")).is_err());
    }
}
