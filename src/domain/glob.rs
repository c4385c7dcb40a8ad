use crate::error::{ReleaseError, Result};
use regex::Regex;

/// Component globs (e.g. `services/*,libs/*`) compiled into one regex.
///
/// Each glob's first `*` captures the component name; further `*`s match
/// any run of non-separator characters without capturing. The regex is
/// anchored at the start of a repository-relative path only, so files below
/// a component directory also match.
#[derive(Debug, Clone)]
pub struct ComponentGlobs {
    source: String,
    re: Regex,
}

impl ComponentGlobs {
    /// Compile a comma-separated glob list. Returns `Ok(None)` when the list
    /// is empty, which disables new-component detection.
    pub fn parse(globs: &str) -> Result<Option<Self>> {
        let patterns: Vec<&str> = globs
            .split(',')
            .map(str::trim)
            .filter(|glob| !glob.is_empty())
            .collect();

        if patterns.is_empty() {
            return Ok(None);
        }

        let alternatives = patterns
            .iter()
            .map(|glob| glob_to_pattern(glob))
            .collect::<Result<Vec<_>>>()?;

        let re = Regex::new(&format!("^(?:{})", alternatives.join("|")))
            .map_err(|e| ReleaseError::config(format!("Invalid component globs '{}': {}", globs, e)))?;

        Ok(Some(ComponentGlobs {
            source: globs.to_string(),
            re,
        }))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The component a repository path belongs to, if any
    pub fn component_of(&self, path: &str) -> Option<String> {
        let caps = self.re.captures(path)?;
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str().to_string())
    }
}

fn glob_to_pattern(glob: &str) -> Result<String> {
    let mut parts = glob.split('*');
    let head = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();

    if rest.is_empty() {
        return Err(ReleaseError::config(format!(
            "Component glob '{}' has no '*' to name the component",
            glob
        )));
    }

    let mut pattern = regex::escape(head);
    for (i, part) in rest.iter().enumerate() {
        pattern.push_str(if i == 0 { "([^/]*)" } else { "[^/]*" });
        pattern.push_str(&regex::escape(part));
    }
    Ok(pattern)
}
