//! Environment profiles: what a known document variant looks like.

use node_locator::{NodeRole, NodeRoleSpec};
use regex::Regex;
use serde::Serialize;
use sitelens_core_types::{DocumentHost, QueryError, SiteId};

use crate::errors::ProfileError;

/// Closed display metadata for a profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProfileMetadata {
    pub display_name: String,
    pub vendor: Option<String>,
    pub homepage: Option<String>,
}

/// One structural heuristic contributing to the detection score.
#[derive(Clone, Debug)]
pub enum MarkerCheck {
    /// The expression matches at least one node.
    Selector(String),
    /// The token appears in the document title or body text.
    TextToken(String),
    /// The first node matched by `selector` carries `name` with a value matching `pattern`.
    Attribute {
        selector: String,
        name: String,
        pattern: Regex,
    },
}

impl MarkerCheck {
    pub fn selector(expression: impl Into<String>) -> Self {
        MarkerCheck::Selector(expression.into())
    }

    pub fn text(token: impl Into<String>) -> Self {
        MarkerCheck::TextToken(token.into())
    }

    pub fn attribute(
        selector: impl Into<String>,
        name: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, ProfileError> {
        let pattern = Regex::new(pattern).map_err(|source| ProfileError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(MarkerCheck::Attribute {
            selector: selector.into(),
            name: name.into(),
            pattern,
        })
    }

    pub fn evaluate(&self, host: &dyn DocumentHost) -> Result<bool, QueryError> {
        match self {
            MarkerCheck::Selector(expression) => Ok(host.query(expression)?.is_some()),
            MarkerCheck::TextToken(token) => {
                for scope in ["title", "body"] {
                    if let Some(node) = host.query(scope)? {
                        if node.text_content().contains(token.as_str()) {
                            return Ok(true);
                        }
                    }
                }
                Ok(false)
            }
            MarkerCheck::Attribute {
                selector,
                name,
                pattern,
            } => Ok(host
                .query(selector)?
                .and_then(|node| node.attribute(name))
                .map(|value| pattern.is_match(&value))
                .unwrap_or(false)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            MarkerCheck::Selector(expression) => format!("selector {expression}"),
            MarkerCheck::TextToken(token) => format!("text '{token}'"),
            MarkerCheck::Attribute { selector, name, .. } => format!("{selector}[{name}]"),
        }
    }
}

/// Immutable description of one recognisable document variant.
#[derive(Clone, Debug)]
pub struct EnvironmentProfile {
    id: SiteId,
    metadata: ProfileMetadata,
    url_patterns: Vec<Regex>,
    input: NodeRoleSpec,
    submit: NodeRoleSpec,
    container: NodeRoleSpec,
    injection_point: NodeRoleSpec,
    markers: Vec<MarkerCheck>,
}

impl EnvironmentProfile {
    pub fn builder(id: impl Into<SiteId>) -> ProfileBuilder {
        ProfileBuilder::new(id.into())
    }

    pub fn id(&self) -> &SiteId {
        &self.id
    }

    pub fn metadata(&self) -> &ProfileMetadata {
        &self.metadata
    }

    pub fn url_patterns(&self) -> &[Regex] {
        &self.url_patterns
    }

    pub fn markers(&self) -> &[MarkerCheck] {
        &self.markers
    }

    pub fn role(&self, role: NodeRole) -> &NodeRoleSpec {
        match role {
            NodeRole::Input => &self.input,
            NodeRole::Submit => &self.submit,
            NodeRole::Container => &self.container,
            NodeRole::InjectionPoint => &self.injection_point,
        }
    }

    pub fn matches_url(&self, url: &str) -> bool {
        self.url_patterns.iter().any(|pattern| pattern.is_match(url))
    }
}

pub struct ProfileBuilder {
    id: SiteId,
    metadata: ProfileMetadata,
    patterns: Vec<String>,
    input: Option<NodeRoleSpec>,
    submit: Option<NodeRoleSpec>,
    container: Option<NodeRoleSpec>,
    injection_point: Option<NodeRoleSpec>,
    markers: Vec<MarkerCheck>,
}

impl ProfileBuilder {
    fn new(id: SiteId) -> Self {
        let metadata = ProfileMetadata {
            display_name: id.to_string(),
            ..Default::default()
        };
        Self {
            id,
            metadata,
            patterns: Vec::new(),
            input: None,
            submit: None,
            container: None,
            injection_point: None,
            markers: Vec::new(),
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.display_name = name.into();
        self
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.metadata.vendor = Some(vendor.into());
        self
    }

    pub fn homepage(mut self, homepage: impl Into<String>) -> Self {
        self.metadata.homepage = Some(homepage.into());
        self
    }

    pub fn url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn role(mut self, role: NodeRole, spec: NodeRoleSpec) -> Self {
        let slot = match role {
            NodeRole::Input => &mut self.input,
            NodeRole::Submit => &mut self.submit,
            NodeRole::Container => &mut self.container,
            NodeRole::InjectionPoint => &mut self.injection_point,
        };
        *slot = Some(spec);
        self
    }

    pub fn marker(mut self, marker: MarkerCheck) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn build(self) -> Result<EnvironmentProfile, ProfileError> {
        if self.patterns.is_empty() {
            return Err(ProfileError::NoPatterns {
                profile: self.id.to_string(),
            });
        }
        let url_patterns = self
            .patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ProfileError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let id = self.id;
        let missing = |role: NodeRole| ProfileError::MissingRole {
            profile: id.to_string(),
            role: role.name().to_string(),
        };
        Ok(EnvironmentProfile {
            input: self.input.ok_or_else(|| missing(NodeRole::Input))?,
            submit: self.submit.ok_or_else(|| missing(NodeRole::Submit))?,
            container: self.container.ok_or_else(|| missing(NodeRole::Container))?,
            injection_point: self
                .injection_point
                .ok_or_else(|| missing(NodeRole::InjectionPoint))?,
            id,
            metadata: self.metadata,
            url_patterns,
            markers: self.markers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_fixture::HtmlDocument;

    fn roles(builder: ProfileBuilder) -> ProfileBuilder {
        NodeRole::all().into_iter().fold(builder, |builder, role| {
            builder.role(role, NodeRoleSpec::new(format!("#{role}"), role.name()))
        })
    }

    #[test]
    fn build_requires_patterns_and_roles() {
        let err = EnvironmentProfile::builder("x").build().unwrap_err();
        assert!(matches!(err, ProfileError::NoPatterns { .. }));

        let err = EnvironmentProfile::builder("x")
            .url_pattern("^https://x/")
            .role(NodeRole::Input, NodeRoleSpec::new("#i", "input"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ProfileError::MissingRole { ref role, .. } if role == "submit"));

        let err = roles(EnvironmentProfile::builder("x").url_pattern("(unclosed"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ProfileError::InvalidPattern { .. }));
    }

    #[test]
    fn profile_matches_urls_and_exposes_roles() {
        let profile = roles(
            EnvironmentProfile::builder("siteA")
                .display_name("Site A")
                .url_pattern(r"^https://a\.example/"),
        )
        .build()
        .unwrap();
        assert!(profile.matches_url("https://a.example/chat"));
        assert!(!profile.matches_url("https://b.example/"));
        assert_eq!(profile.role(NodeRole::Submit).primary, "#submit");
        assert_eq!(profile.metadata().display_name, "Site A");
    }

    #[test]
    fn marker_checks_evaluate_against_document() {
        let doc = HtmlDocument::new(
            "https://a.example/",
            r#"<html><head><title>Alpha Chat</title>
               <meta property="og:site_name" content="AlphaChat"></head>
               <body><div id="root"></div></body></html>"#,
        );
        assert!(MarkerCheck::selector("#root").evaluate(&doc).unwrap());
        assert!(!MarkerCheck::selector("#nope").evaluate(&doc).unwrap());
        assert!(MarkerCheck::text("Alpha").evaluate(&doc).unwrap());
        assert!(!MarkerCheck::text("Beta").evaluate(&doc).unwrap());
        let attr = MarkerCheck::attribute("meta[property=\"og:site_name\"]", "content", "(?i)alphachat")
            .unwrap();
        assert!(attr.evaluate(&doc).unwrap());
        assert!(MarkerCheck::selector("<<").evaluate(&doc).is_err());
    }
}
