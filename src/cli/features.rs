//! Features command - list the tracked feature catalogue

use crate::config::load_project_config;
use crate::models::Browser;
use crate::registry::FeatureRegistry;
use anyhow::Result;
use console::style;
use std::path::Path;

/// Run the features command
pub fn run(path: &Path) -> Result<()> {
    let registry = load_project_config(path).registry();
    print!("{}", render(&registry));
    Ok(())
}

fn render(registry: &FeatureRegistry) -> String {
    let mut out = format!("\n{}\n\n", style("Tracked features").bold());
    for feature in registry.features() {
        out.push_str(&format!(
            "  {} {}\n",
            style(&feature.id).cyan().bold(),
            style(format!("({})", feature.title)).dim()
        ));
        if !feature.dataset_keys.is_empty() {
            out.push_str(&format!("    dataset:  {}\n", feature.dataset_keys.join(", ")));
        }
        if let Some(fallback) = registry.fallback(&feature.id) {
            let versions = Browser::ALL
                .iter()
                .map(|b| match fallback.get(*b) {
                    Some(major) => format!("{} {}", b, major),
                    None => format!("{} ?", b),
                })
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("    fallback: {}\n", versions));
        }
        if let Some(mdn) = &feature.mdn {
            out.push_str(&format!("    {}\n", style(mdn).dim()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_catalogue() {
        console::set_colors_enabled(false);
        let out = render(FeatureRegistry::builtin());
        assert!(out.contains("  has ("));
        assert!(out.contains("dataset:  css.selectors.has"));
        assert!(out.contains("fallback: chrome 105, firefox 121, safari 15, edge 105"));
        assert!(out.contains("view-transitions"));
        assert!(out.contains("abortsignal-timeout"));
    }
}
