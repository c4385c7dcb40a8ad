use crate::domain::template::Template;
use crate::domain::version::VersionBump;
use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::warn;

/// Bump label naming pattern (e.g. `${component}/${bumpType}`)
#[derive(Debug, Clone)]
pub struct BumpLabelFormat {
    template: Template,
    matcher: Regex,
}

impl BumpLabelFormat {
    /// Compile a bump label template into a renderer and matcher.
    ///
    /// The template must contain `${bumpType}`; `${component}` is optional and
    /// labels matched without it apply to the whole repository.
    pub fn new(template: Template) -> Result<Self> {
        if !template.has_field("bumpType") {
            return Err(ReleaseError::config(format!(
                "Bump label format '{}' must contain ${{bumpType}}",
                template.source()
            )));
        }

        let matcher = template.to_regex(&[
            ("component", "(?P<component>.+)"),
            ("bumpType", "(?P<bumpType>major|minor|patch)"),
        ])?;

        Ok(BumpLabelFormat { template, matcher })
    }

    pub fn parse(source: &str) -> Result<Self> {
        Self::new(Template::parse(source))
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Extract `(component, bump)` from a label name, if it is a bump label
    pub fn match_label(&self, label: &str) -> Option<(String, VersionBump)> {
        let caps = self.matcher.captures(label)?;
        let component = caps
            .name("component")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let bump = caps.name("bumpType")?.as_str().parse().ok()?;
        Some((component, bump))
    }

    /// Render the label name for a component and bump type
    pub fn render(&self, component: &str, bump: VersionBump) -> Result<String> {
        self.template
            .render(&[("component", component), ("bumpType", bump.as_str())])
    }
}

/// Map each bump label on a pull request to its component.
///
/// Labels that do not match the format are ignored. When several labels name
/// the same component the last one in label order wins.
pub fn find_bumps(labels: &[String], format: &BumpLabelFormat) -> BTreeMap<String, VersionBump> {
    let mut bumps = BTreeMap::new();

    for label in labels {
        let Some((component, bump)) = format.match_label(label) else {
            continue;
        };

        if let Some(previous) = bumps.insert(component.clone(), bump) {
            if previous != bump {
                warn!(
                    component = %component,
                    previous = %previous,
                    chosen = %bump,
                    "Conflicting bump labels, using the last one"
                );
            }
        }
    }

    bumps
}

/// Colours for the three bump labels created per new component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPalette {
    pub major: String,
    pub minor: String,
    pub patch: String,
}

impl Default for LabelPalette {
    fn default() -> Self {
        LabelPalette {
            major: "00a396".to_string(),
            minor: "66e0d7".to_string(),
            patch: "f2fcfc".to_string(),
        }
    }
}

impl LabelPalette {
    /// Build a palette from exactly three 6-digit hex colours in
    /// major, minor, patch order
    pub fn from_colors(colors: &[String]) -> Result<Self> {
        let [major, minor, patch] = colors else {
            return Err(ReleaseError::config(format!(
                "Expected 3 label colors, got {}",
                colors.len()
            )));
        };

        for color in [major, minor, patch] {
            let hex = color.trim_start_matches('#');
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ReleaseError::config(format!(
                    "Invalid label color '{}'",
                    color
                )));
            }
        }

        let clean = |c: &String| c.trim_start_matches('#').to_lowercase();
        Ok(LabelPalette {
            major: clean(major),
            minor: clean(minor),
            patch: clean(patch),
        })
    }

    pub fn color_for(&self, bump: VersionBump) -> &str {
        match bump {
            VersionBump::Major => &self.major,
            VersionBump::Minor => &self.minor,
            VersionBump::Patch | VersionBump::None => &self.patch,
        }
    }
}

/// A label to create on the hosting platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpec {
    pub name: String,
    pub color: String,
    pub description: String,
}

impl LabelSpec {
    /// The major, minor and patch labels for a newly discovered component
    pub fn for_component(
        component: &str,
        format: &BumpLabelFormat,
        palette: &LabelPalette,
    ) -> Result<Vec<LabelSpec>> {
        VersionBump::LABELLED
            .iter()
            .map(|&bump| {
                Ok(LabelSpec {
                    name: format.render(component, bump)?,
                    color: palette.color_for(bump).to_string(),
                    description: format!("{} SemVer bump to `{}`", bump, component),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_bumps_by_component() {
        let format = BumpLabelFormat::parse("release/${component}/${bumpType}").unwrap();
        let bumps = find_bumps(
            &labels(&["release/api/minor", "release/web/patch", "bug"]),
            &format,
        );

        assert_eq!(bumps.len(), 2);
        assert_eq!(bumps.get("api"), Some(&VersionBump::Minor));
        assert_eq!(bumps.get("web"), Some(&VersionBump::Patch));
    }

    #[test]
    fn test_find_bumps_without_component_uses_whole_repository() {
        let format = BumpLabelFormat::parse("${bumpType}").unwrap();
        let bumps = find_bumps(&labels(&["major", "documentation"]), &format);

        assert_eq!(bumps.len(), 1);
        assert_eq!(bumps.get(""), Some(&VersionBump::Major));
    }

    #[test]
    fn test_find_bumps_last_label_wins() {
        let format = BumpLabelFormat::parse("${component}/${bumpType}").unwrap();
        let bumps = find_bumps(&labels(&["api/major", "api/patch"]), &format);
        assert_eq!(bumps.get("api"), Some(&VersionBump::Patch));
    }

    #[test]
    fn test_match_rejects_unknown_bump_type() {
        let format = BumpLabelFormat::parse("${component}/${bumpType}").unwrap();
        assert_eq!(format.match_label("api/huge"), None);
        assert_eq!(format.match_label("api/none"), None);
        assert_eq!(format.match_label("api/minor-ish"), None);
    }

    #[test]
    fn test_matcher_accepts_everything_it_renders() {
        let format = BumpLabelFormat::parse("bump(${component}): ${bumpType}").unwrap();
        for component in ["api", "web/ui", "a.b"] {
            for bump in VersionBump::LABELLED {
                let label = format.render(component, bump).unwrap();
                assert_eq!(
                    format.match_label(&label),
                    Some((component.to_string(), bump)),
                    "label {}",
                    label
                );
            }
        }
    }

    #[test]
    fn test_format_requires_bump_type() {
        assert!(BumpLabelFormat::parse("${component}").is_err());
    }

    #[test]
    fn test_palette_from_colors() {
        let palette = LabelPalette::from_colors(&labels(&["#FF0000", "00ff00", "0000ff"])).unwrap();
        assert_eq!(palette.major, "ff0000");
        assert_eq!(palette.color_for(VersionBump::Minor), "00ff00");

        assert!(LabelPalette::from_colors(&labels(&["ff0000"])).is_err());
        assert!(LabelPalette::from_colors(&labels(&["ff0000", "00ff00", "blue"])).is_err());
    }

    #[test]
    fn test_label_specs_for_component() {
        let format = BumpLabelFormat::parse("${component}/${bumpType}").unwrap();
        let specs = LabelSpec::for_component("api", &format, &LabelPalette::default()).unwrap();

        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["api/major", "api/minor", "api/patch"]);
        assert_eq!(specs[0].color, "00a396");
        assert_eq!(specs[1].color, "66e0d7");
        assert_eq!(specs[2].color, "f2fcfc");
        assert_eq!(specs[2].description, "patch SemVer bump to `api`");
    }
}
