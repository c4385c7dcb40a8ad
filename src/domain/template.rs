//! `${name}` templates shared by bump labels and tag names
//!
//! A template plays two roles: it renders a string from field values, and it
//! compiles into an anchored regex where each placeholder becomes a caller
//! supplied capture pattern.

use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A parsed `${name}` format string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder regex is valid"))
}

impl Template {
    /// Split a format string into literal text and `${name}` placeholders
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in placeholder_re().captures_iter(&source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(source[last..whole.start()].to_string()));
            }
            segments.push(Segment::Field(caps[1].to_string()));
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Literal(source[last..].to_string()));
        }

        Template { source, segments }
    }

    /// The original format string
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the placeholders, in order of appearance
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields().any(|field| field == name)
    }

    /// Substitute every placeholder with its value from `values`.
    ///
    /// Fails with [`ReleaseError::MissingField`] if a placeholder has no value.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => out.push_str(lookup(values, name)?),
            }
        }
        Ok(out)
    }

    /// Compile into an anchored regex, escaping literal text and replacing
    /// each placeholder with the pattern given for it in `patterns`.
    pub fn to_regex(&self, patterns: &[(&str, &str)]) -> Result<Regex> {
        let mut pattern = String::from("^");
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Field(name) => pattern.push_str(lookup(patterns, name)?),
            }
        }
        pattern.push('$');

        Regex::new(&pattern).map_err(|e| {
            ReleaseError::config(format!("Template '{}' is not usable: {}", self.source, e))
        })
    }
}

fn lookup<'a>(values: &[(&str, &'a str)], name: &str) -> Result<&'a str> {
    values
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| *value)
        .ok_or_else(|| ReleaseError::MissingField(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_fields() {
        let template = Template::parse("release/${component}/${bumpType}");
        let rendered = template
            .render(&[("component", "api"), ("bumpType", "minor")])
            .unwrap();
        assert_eq!(rendered, "release/api/minor");
    }

    #[test]
    fn test_render_ignores_extra_values() {
        let template = Template::parse("v${version}");
        let rendered = template
            .render(&[("component", ""), ("version", "1.0.0")])
            .unwrap();
        assert_eq!(rendered, "v1.0.0");
    }

    #[test]
    fn test_render_missing_field_fails() {
        let template = Template::parse("${component}-v${version}");
        let err = template.render(&[("component", "api")]).unwrap_err();
        assert!(matches!(err, ReleaseError::MissingField(name) if name == "version"));
    }

    #[test]
    fn test_fields_in_order() {
        let template = Template::parse("${a}x${b}y${a}");
        assert_eq!(template.fields().collect::<Vec<_>>(), vec!["a", "b", "a"]);
        assert!(template.has_field("b"));
        assert!(!template.has_field("c"));
    }

    #[test]
    fn test_unterminated_placeholder_is_literal() {
        let template = Template::parse("tag-${version");
        assert_eq!(template.fields().count(), 0);
        assert_eq!(template.render(&[]).unwrap(), "tag-${version");
    }

    #[test]
    fn test_to_regex_escapes_literals_and_anchors() {
        let template = Template::parse("[bump] ${component}.${bumpType}");
        let re = template
            .to_regex(&[("component", "(.+)"), ("bumpType", "(major|minor|patch)")])
            .unwrap();

        assert!(re.is_match("[bump] api.minor"));
        assert!(!re.is_match("xbump] api.minor"));
        assert!(!re.is_match("[bump] api.minor trailing"));
        assert!(!re.is_match("[bump] api-minor"));
    }

    #[test]
    fn test_to_regex_missing_pattern_fails() {
        let template = Template::parse("${component}/${flavour}");
        assert!(matches!(
            template.to_regex(&[("component", "(.+)")]),
            Err(ReleaseError::MissingField(name)) if name == "flavour"
        ));
    }
}
