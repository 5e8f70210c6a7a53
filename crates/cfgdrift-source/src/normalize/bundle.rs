use super::{normalize_config_server, order_combined, NormalizeOptions};
use crate::error::ParsePayloadWarning;
use crate::parsers::{parser_for, ConfigFileName, FlatProperties};
use crate::payload::{
    split_profiles, BlobOrigin, ConfigServerPayload, ConfigServerResponse, TextBundle,
};
use crate::source::{Category, NormalizedSources, PropertySource};
use indexmap::IndexMap;
use serde_json::Value;

/// Keys a file uses to declare the profiles it applies to
const PROFILE_GUARD_KEYS: [&str; 2] = ["spring.config.activate.on-profile", "spring.profiles"];

/// A parsed image-level file waiting to be merged
struct ParsedFile<'a> {
    origin: BlobOrigin,
    file: ConfigFileName,
    location: &'a str,
    values: FlatProperties,
}

/// Normalize files and config server exchange collected from an instance
///
/// Image files are merged per class into `image:application` and
/// `image:bootstrap`. Within a class, classpath beats archive beats
/// filesystem, and later origins only fill keys that are still absent.
#[must_use]
pub fn normalize_bundle(bundle: &TextBundle, options: &NormalizeOptions) -> NormalizedSources {
    let mut warnings = Vec::new();
    let active_profiles = options
        .active_profiles
        .clone()
        .or_else(|| bundle.active_profiles.clone())
        .filter(|profiles| !profiles.is_empty());

    let mut sources = bundle
        .config_server
        .as_ref()
        .map(|response| config_server_sources(response, &options.workload_name, &mut warnings))
        .unwrap_or_default();

    let mut parsed = Vec::new();
    for blob in &bundle.blobs {
        let Some(file) = ConfigFileName::classify(&blob.name) else {
            continue;
        };
        let Some(parser) = parser_for(&blob.name) else {
            continue;
        };
        if blob.truncated {
            warnings.push(ParsePayloadWarning::Truncated {
                origin: blob.location.clone(),
            });
        }
        let values = parser.parse(&blob.content);
        if let Some(profiles) = &active_profiles {
            if !applies_to(&file, &values, profiles) {
                tracing::debug!(location = %blob.location, "skipping file for inactive profile");
                continue;
            }
        }
        parsed.push(ParsedFile {
            origin: blob.origin,
            file,
            location: &blob.location,
            values,
        });
    }

    // Profile-specific files shadow the default file of the same origin
    parsed.sort_by_key(|p| (p.origin, p.file.profile.is_none()));

    for (category, name) in [
        (Category::Application, "image:application"),
        (Category::Bootstrap, "image:bootstrap"),
    ] {
        let mut merged: IndexMap<String, Value> = IndexMap::new();
        for file in parsed.iter().filter(|p| p.file.category == category) {
            tracing::trace!(
                location = file.location,
                keys = file.values.len(),
                "merging image file"
            );
            for (key, value) in &file.values {
                merged
                    .entry(key.clone())
                    .or_insert_with(|| Value::String(value.clone()));
            }
        }
        if !merged.is_empty() {
            sources.push(PropertySource::new(name, category, merged));
        }
    }

    NormalizedSources {
        sources: order_combined(sources),
        warnings,
        active_profiles: active_profiles.unwrap_or_default(),
    }
}

fn config_server_sources(
    response: &ConfigServerResponse,
    workload_name: &str,
    warnings: &mut Vec<ParsePayloadWarning>,
) -> Vec<PropertySource> {
    if let Some(error) = response.error.as_deref().filter(|e| !e.trim().is_empty()) {
        warnings.push(ParsePayloadWarning::ConfigServerUnavailable {
            url: response.url.clone(),
            detail: error.to_string(),
        });
        return Vec::new();
    }
    if let Some(status) = response.status.filter(|s| !(200..300).contains(s)) {
        warnings.push(ParsePayloadWarning::ConfigServerUnavailable {
            url: response.url.clone(),
            detail: format!("HTTP {status}"),
        });
        return Vec::new();
    }
    let Some(content) = response.content.as_deref().filter(|c| !c.trim().is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<ConfigServerPayload>(content) {
        Ok(payload) => normalize_config_server(&payload, workload_name),
        Err(err) => {
            let origin = response.url.as_deref().unwrap_or("configServer");
            warnings.push(ParsePayloadWarning::malformed_json(origin, err.to_string()));
            Vec::new()
        }
    }
}

/// Whether a file applies under the given active profiles
fn applies_to(file: &ConfigFileName, values: &FlatProperties, active: &[String]) -> bool {
    let is_active = |profile: &str| active.iter().any(|a| a.eq_ignore_ascii_case(profile));

    if let Some(profile) = &file.profile {
        if !is_active(profile) {
            return false;
        }
    }

    let guard = PROFILE_GUARD_KEYS
        .iter()
        .find_map(|key| values.get(*key))
        .map(|raw| split_profiles(raw))
        .unwrap_or_default();
    guard.is_empty() || guard.iter().any(|p| is_active(p))
}
