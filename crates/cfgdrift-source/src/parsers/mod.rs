//! Text parsers for configuration files
//!
//! Flattens configuration text into dotted keys:
//! - `.properties` files via [`PropertiesParser`]
//! - `.yml` / `.yaml` files via [`YamlLikeParser`]
//!
//! Also classifies file names into the image-level categories
//! (`application*` / `bootstrap*`).

use crate::source::Category;
use indexmap::IndexMap;

mod properties;
mod yaml;

pub use properties::PropertiesParser;
pub use yaml::YamlLikeParser;

/// Flat key/value output of a text parser, in discovery order
pub type FlatProperties = IndexMap<String, String>;

/// Parser trait for flattening configuration text
///
/// Parsers are infallible: lines they cannot interpret are skipped.
pub trait TextParser: Send + Sync + 'static {
    /// Parse content into dotted keys
    fn parse(&self, content: &str) -> FlatProperties;

    /// Supported file extensions (without dot, lowercase)
    fn extensions(&self) -> &[&str];

    /// Check if this parser handles the given file name
    fn can_parse(&self, name: &str) -> bool {
        extension_of(name)
            .map(|ext| self.extensions().contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

static PROPERTIES: PropertiesParser = PropertiesParser;
static YAML: YamlLikeParser = YamlLikeParser;

/// Find the parser for a file name
#[must_use]
pub fn parser_for(name: &str) -> Option<&'static dyn TextParser> {
    let parsers: [&'static dyn TextParser; 2] = [&PROPERTIES, &YAML];
    parsers.into_iter().find(|p| p.can_parse(name))
}

/// A recognized configuration file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFileName {
    /// `Application` or `Bootstrap`
    pub category: Category,
    /// Profile suffix (`application-prod.yml` → `prod`)
    pub profile: Option<String>,
}

impl ConfigFileName {
    /// Classify a path or archive entry name
    ///
    /// Returns `None` for anything that is not `application*` or `bootstrap*`
    /// with a `.yml`, `.yaml` or `.properties` extension.
    #[must_use]
    pub fn classify(name: &str) -> Option<Self> {
        let base = base_name(name).to_ascii_lowercase();
        parser_for(&base)?;
        let (category, prefix) = if base.starts_with("application") {
            (Category::Application, "application")
        } else if base.starts_with("bootstrap") {
            (Category::Bootstrap, "bootstrap")
        } else {
            return None;
        };
        let profile = base[prefix.len()..]
            .strip_prefix('-')
            .and_then(|rest| rest.split_once('.'))
            .map(|(profile, _)| profile.to_string())
            .filter(|profile| !profile.is_empty());
        Some(Self { category, profile })
    }
}

/// Text after the last path separator
#[must_use]
pub fn base_name(name: &str) -> &str {
    name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name)
}

fn extension_of(name: &str) -> Option<String> {
    base_name(name)
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Remove one pair of matching surrounding quotes
pub(crate) fn strip_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}
