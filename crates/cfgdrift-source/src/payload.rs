//! Raw payload shapes
//!
//! An instance's configuration arrives in one of three shapes. [`RawPayload`]
//! is the tagged union over them; [`RawPayload::from_json`] inspects a JSON
//! document and picks the variant so callers never pre-normalize.

use crate::error::ParseError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// A raw configuration payload of one instance
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Actuator-style environment dump
    Actuator(ActuatorPayload),
    /// Config server environment response
    ConfigServer(ConfigServerPayload),
    /// Text files collected from the image (classpath, archives, filesystem)
    TextBundle(TextBundle),
}

impl RawPayload {
    /// Detect the shape of a JSON document and decode it
    ///
    /// A backend envelope (`{workloadName, payload: {...}}`) is unwrapped first.
    ///
    /// # Errors
    /// - `ParseError::InvalidJson` if the detected shape fails to decode
    /// - `ParseError::UnrecognizedShape` if no shape matches
    pub fn from_json(value: Value) -> Result<Self, ParseError> {
        let value = unwrap_envelope(value);

        if let Some(node) = actuator_node(&value) {
            return Ok(Self::Actuator(serde_json::from_value(node.clone())?));
        }
        if is_config_server(&value) {
            return Ok(Self::ConfigServer(serde_json::from_value(value)?));
        }
        if is_agent_report(&value) {
            let report: AgentReport = serde_json::from_value(value)?;
            return Ok(Self::TextBundle(report.into_bundle()));
        }

        Err(ParseError::UnrecognizedShape(describe_shape(&value)))
    }

    /// Short variant name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Actuator(_) => "actuator",
            Self::ConfigServer(_) => "config-server",
            Self::TextBundle(_) => "text-bundle",
        }
    }
}

impl FromStr for RawPayload {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(serde_json::from_str(s)?)
    }
}

/// Actuator environment dump: `{activeProfiles, propertySources: [{name, properties}]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActuatorPayload {
    /// Profiles reported active by the instance
    #[serde(default)]
    pub active_profiles: Vec<String>,
    /// Sources, already in the instance's own precedence order
    #[serde(default)]
    pub property_sources: Vec<ActuatorSource>,
}

/// One actuator property source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorSource {
    /// Source name as reported by the instance
    pub name: String,
    /// Raw properties (values usually wrapped as `{value, origin}`)
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
}

/// Config server response: `{name, profiles, label, propertySources: [{name, source}]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigServerPayload {
    /// Application name the server resolved for
    #[serde(default)]
    pub name: Option<String>,
    /// Profiles the server resolved for
    #[serde(default)]
    pub profiles: Vec<String>,
    /// Repository label
    #[serde(default)]
    pub label: Option<String>,
    /// Documents, highest precedence first
    #[serde(default)]
    pub property_sources: Vec<ConfigServerSource>,
}

/// One config server document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigServerSource {
    /// Document name (usually a repository path or URL)
    pub name: String,
    /// Flat properties
    #[serde(default)]
    pub source: IndexMap<String, Value>,
}

/// Where a text blob was found
///
/// Declaration order is merge precedence: classpath beats archive beats filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlobOrigin {
    /// Inline classpath resource
    Classpath,
    /// Entry inside a build archive
    Archive,
    /// Plain file on the instance filesystem
    Filesystem,
}

/// One collected configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlob {
    /// File or entry name used for classification
    pub name: String,
    /// Human-readable location (URL, path, `archive!entry`)
    pub location: String,
    /// Origin channel
    pub origin: BlobOrigin,
    /// File content
    pub content: String,
    /// Whether the collector cut the content short
    #[serde(default)]
    pub truncated: bool,
}

impl TextBlob {
    /// Create a blob whose location equals its name
    pub fn new(name: impl Into<String>, origin: BlobOrigin, content: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            location: name.clone(),
            name,
            origin,
            content: content.into(),
            truncated: false,
        }
    }

    /// Set the location
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Mark as truncated
    #[must_use]
    pub fn truncated(mut self) -> Self {
        self.truncated = true;
        self
    }
}

/// Raw config server exchange recorded by a collector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigServerResponse {
    /// Request URL
    #[serde(default)]
    pub url: Option<String>,
    /// HTTP status
    #[serde(default)]
    pub status: Option<u16>,
    /// Response body (JSON text)
    #[serde(default)]
    pub content: Option<String>,
    /// Transport error
    #[serde(default)]
    pub error: Option<String>,
}

impl ConfigServerResponse {
    /// Whether anything was recorded at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.status.is_none()
            && self.content.is_none()
            && self.error.is_none()
    }
}

/// Files and config server exchange collected from inside an instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBundle {
    /// Collected files in discovery order
    pub blobs: Vec<TextBlob>,
    /// Config server exchange, if the instance uses one
    #[serde(default)]
    pub config_server: Option<ConfigServerResponse>,
    /// Active profiles, when the collector could see them
    #[serde(default)]
    pub active_profiles: Option<Vec<String>>,
}

/// Split a profile list on `,` / `;`
#[must_use]
pub fn split_profiles(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == ';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.contains_key("workloadName")
                && map.get("payload").is_some_and(Value::is_object) =>
        {
            map.remove("payload").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn actuator_node(value: &Value) -> Option<&Value> {
    let candidates = [
        Some(value),
        value.get("details"),
        value.pointer("/components/env/details"),
    ];
    candidates.into_iter().flatten().find(|node| {
        let has_properties = node
            .get("propertySources")
            .and_then(Value::as_array)
            .is_some_and(|sources| sources.iter().any(|s| s.get("properties").is_some()));
        has_properties
            || (node.get("activeProfiles").is_some() && node.get("propertySources").is_some())
    })
}

fn is_config_server(value: &Value) -> bool {
    let has_source = value
        .get("propertySources")
        .and_then(Value::as_array)
        .is_some_and(|sources| sources.iter().any(|s| s.get("source").is_some()));
    has_source || (value.get("profiles").is_some() && value.get("propertySources").is_some())
}

fn is_agent_report(value: &Value) -> bool {
    ["classpathResources", "files", "jarResources", "configServer"]
        .iter()
        .any(|key| value.get(key).is_some())
}

fn describe_shape(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(8).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        Value::Array(_) => "array".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Null => "null".to_string(),
    }
}

/// In-process collector report
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentReport {
    #[serde(default)]
    environment: BTreeMap<String, String>,
    #[serde(default)]
    system_properties: BTreeMap<String, String>,
    #[serde(default)]
    classpath_resources: IndexMap<String, Vec<AgentResource>>,
    #[serde(default)]
    files: AgentFiles,
    #[serde(default)]
    jar_resources: AgentJars,
    #[serde(default)]
    config_server: Option<ConfigServerResponse>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentResource {
    name: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Default, Deserialize)]
struct AgentFiles {
    #[serde(default)]
    matches: Vec<AgentFile>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentFile {
    path: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Default, Deserialize)]
struct AgentJars {
    #[serde(default)]
    matches: Vec<AgentJar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentJar {
    jar_path: String,
    #[serde(default)]
    entries: Vec<AgentJarEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentJarEntry {
    name: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    truncated: bool,
}

impl AgentReport {
    fn into_bundle(self) -> TextBundle {
        let active_profiles = self.active_profiles();
        let mut blobs = Vec::new();

        for resource in self.classpath_resources.into_values().flatten() {
            if resource.content.is_empty() {
                continue;
            }
            let location = resource
                .location
                .unwrap_or_else(|| format!("classpath:{}", resource.name));
            blobs.push(TextBlob {
                name: resource.name,
                location,
                origin: BlobOrigin::Classpath,
                content: resource.content,
                truncated: resource.truncated,
            });
        }

        for jar in self.jar_resources.matches {
            for entry in jar.entries {
                if entry.content.is_empty() {
                    continue;
                }
                blobs.push(TextBlob {
                    location: format!("{}!{}", jar.jar_path, entry.name),
                    name: entry.name,
                    origin: BlobOrigin::Archive,
                    content: entry.content,
                    truncated: entry.truncated,
                });
            }
        }

        for file in self.files.matches {
            if file.content.is_empty() {
                continue;
            }
            blobs.push(TextBlob {
                name: file.path.clone(),
                location: file.path,
                origin: BlobOrigin::Filesystem,
                content: file.content,
                truncated: file.truncated,
            });
        }

        TextBundle {
            blobs,
            config_server: self.config_server.filter(|cs| !cs.is_empty()),
            active_profiles,
        }
    }

    fn active_profiles(&self) -> Option<Vec<String>> {
        let raw = ["SPRING_PROFILES_ACTIVE", "SPRING_CLOUD_CONFIG_PROFILE"]
            .iter()
            .filter_map(|key| self.environment.get(*key))
            .chain(self.system_properties.get("spring.profiles.active"))
            .find(|value| !value.trim().is_empty())?;
        let profiles = split_profiles(raw);
        (!profiles.is_empty()).then_some(profiles)
    }
}
