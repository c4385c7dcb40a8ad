use crate::domain::template::Template;
use crate::domain::version::Version;
use crate::error::{ReleaseError, Result};

/// A release tag for one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub component: String,
    pub version: Version,
}

impl Tag {
    /// Fully qualified ref name (e.g. `refs/tags/api-v1.2.3`)
    pub fn ref_name(&self) -> String {
        format!("refs/tags/{}", self.name)
    }
}

/// Tag naming pattern (e.g. `${component}-v${version}`)
#[derive(Debug, Clone)]
pub struct TagFormat {
    template: Template,
}

impl TagFormat {
    /// Create a tag format; the template must contain `${version}`
    pub fn new(template: Template) -> Result<Self> {
        if !template.has_field("version") {
            return Err(ReleaseError::config(format!(
                "Tag format '{}' must contain ${{version}}",
                template.source()
            )));
        }
        Ok(TagFormat { template })
    }

    pub fn parse(source: &str) -> Result<Self> {
        Self::new(Template::parse(source))
    }

    /// Render the tag for a component at a version.
    ///
    /// The whole repository (`""`) renders with an empty component, so a
    /// format like `${component}v${version}` yields `v1.2.3` for it.
    pub fn render(&self, component: &str, version: &Version) -> Result<Tag> {
        let version_text = version.to_string();
        let name = self
            .template
            .render(&[("component", component), ("version", &version_text)])?;

        Ok(Tag {
            name,
            component: component.to_string(),
            version: *version,
        })
    }
}
