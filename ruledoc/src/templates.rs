//! Embedded section templates
//!
//! This module contains the section templates compiled into the binary.

use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

/// Embedded template catalog
const BUILTIN_TEMPLATES: &str = include_str!("templates/sections.toml");

/// A template for a newly inserted section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SectionTemplate {
    /// Template identifier (e.g., "heading-body")
    pub id: String,
    /// Alternative names accepted on lookup
    #[serde(default)]
    pub aliases: Vec<String>,
    /// One-line description for listings
    #[serde(default)]
    pub description: String,
    /// Markdown body of the new section
    pub body: String,
}

impl SectionTemplate {
    /// Empty-bodied template used when the requested name is unknown
    pub fn blank(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            aliases: Vec::new(),
            description: String::new(),
            body: String::new(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.id.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Errors that can occur when reading a template catalog
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Catalog is not valid TOML
    #[error("TOML parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Two templates share an id or alias
    #[error("Template name '{0}' is defined more than once")]
    DuplicateName(String),
}

#[derive(Debug, Deserialize)]
struct TemplateCatalog {
    #[serde(default)]
    templates: Vec<SectionTemplate>,
}

/// Parse a template catalog
///
/// # Parameters
/// * `content` - TOML text with a `[[templates]]` array
///
/// # Returns
/// * `Ok(Vec<SectionTemplate>)` - Templates in catalog order
/// * `Err(TemplateError)` - Invalid TOML, or an id/alias used twice
pub fn parse_templates(content: &str) -> Result<Vec<SectionTemplate>, TemplateError> {
    let catalog: TemplateCatalog = toml::from_str(content)?;

    let mut names = HashSet::new();
    for template in &catalog.templates {
        for name in std::iter::once(&template.id).chain(&template.aliases) {
            if !names.insert(name.to_lowercase()) {
                return Err(TemplateError::DuplicateName(name.clone()));
            }
        }
    }

    Ok(catalog.templates)
}

/// Get all built-in templates
pub fn get_all_templates() -> Result<Vec<SectionTemplate>, TemplateError> {
    parse_templates(BUILTIN_TEMPLATES)
}

/// Get a built-in template by id or alias (case-insensitive)
///
/// # Returns
/// * `Ok(Some(SectionTemplate))` - Template found
/// * `Ok(None)` - No template with that name
/// * `Err(TemplateError)` - The embedded catalog is invalid
pub fn get_template(name: &str) -> Result<Option<SectionTemplate>, TemplateError> {
    Ok(get_all_templates()?.into_iter().find(|t| t.matches(name)))
}

/// Resolve a template name, falling back to a blank template for unknown names
pub fn resolve_template(name: &str) -> Result<SectionTemplate, TemplateError> {
    Ok(get_template(name)?.unwrap_or_else(|| {
        log::warn!("Unknown section template '{}', inserting a blank section", name);
        SectionTemplate::blank(name)
    }))
}
