//! Run outputs: the `bumped` action output and a human summary

use crate::bump::VersionMap;
use crate::domain::Tag;
use crate::error::Result;
use console::style;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Name of the action output carrying the new versions
pub const BUMPED_OUTPUT: &str = "bumped";

/// JSON object of component to version string
pub fn bumped_json(versions: &VersionMap) -> Result<String> {
    let bumped: BTreeMap<&str, String> = versions
        .iter()
        .map(|(component, version)| (component.as_str(), version.to_string()))
        .collect();
    Ok(serde_json::to_string(&bumped)?)
}

/// Append `bumped=<json>` to the action output file
pub fn write_action_output(path: &Path, versions: &VersionMap) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}={}", BUMPED_OUTPUT, bumped_json(versions)?)?;
    Ok(())
}

/// Publish the `bumped` output: stdout always, plus `$GITHUB_OUTPUT` when set
pub fn publish(versions: &VersionMap) -> Result<()> {
    if let Some(path) = std::env::var_os("GITHUB_OUTPUT").filter(|p| !p.is_empty()) {
        write_action_output(Path::new(&path), versions)?;
    }
    println!("{}={}", BUMPED_OUTPUT, bumped_json(versions)?);
    Ok(())
}

/// Render the human summary of a run
pub fn format_summary(versions: &VersionMap, tags: &[Tag]) -> String {
    if versions.is_empty() {
        return format!("{} No version changes", style("→").yellow());
    }

    let mut lines = vec![format!("{}", style("Released versions:").bold())];
    for (component, version) in versions {
        let name = if component.is_empty() {
            "(whole repository)"
        } else {
            component.as_str()
        };
        let tag = tags
            .iter()
            .find(|tag| &tag.component == component)
            .map(|tag| format!(" [{}]", style(&tag.name).cyan()))
            .unwrap_or_default();
        lines.push(format!(
            "  {} {}: {}{}",
            style("✓").green(),
            name,
            style(version).green(),
            tag
        ));
    }
    lines.join("\n")
}

pub fn display_summary(versions: &VersionMap, tags: &[Tag]) {
    eprintln!("{}", format_summary(versions, tags));
}

/// Report a failed run; inside Actions this becomes an error annotation
pub fn display_error(message: &str) {
    if std::env::var_os("GITHUB_ACTIONS").is_some() {
        println!("::error::{}", escape_command_data(message));
    }
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Escape the data part of a workflow command.
///
/// `%` goes first so the escapes added for line breaks stay intact.
pub fn escape_command_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
