use super::order_combined;
use crate::payload::ConfigServerPayload;
use crate::source::{Category, PropertySource};

const SHARED_NAME: &str = "application";
const DOCUMENT_EXTENSIONS: [&str; 4] = [".yml", ".yaml", ".properties", ".json"];

/// Classify config server documents against a workload name
///
/// Documents named after neither the workload nor `application` are dropped.
/// A top-level `name` in the payload replaces `workload_name` unless it is
/// the shared `application` name itself.
#[must_use]
pub fn normalize_config_server(
    payload: &ConfigServerPayload,
    workload_name: &str,
) -> Vec<PropertySource> {
    let workload = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case(SHARED_NAME))
        .unwrap_or(workload_name);

    let sources = payload
        .property_sources
        .iter()
        .filter_map(|source| {
            let Some(category) = classify_config_source(&source.name, workload) else {
                tracing::debug!(
                    source = %source.name,
                    workload,
                    "dropping unclassified config server document"
                );
                return None;
            };
            Some(PropertySource::new(
                source.name.clone(),
                category,
                source.source.iter().map(|(k, v)| (k.clone(), v.clone())),
            ))
        })
        .collect();

    order_combined(sources)
}

/// Category of one config server document name
///
/// Compares the document stem (file name without directory or extension,
/// lowercased) against `{workload}` / `{workload}-{profile}` first, then
/// against `application` / `application-{profile}`.
#[must_use]
pub fn classify_config_source(source_name: &str, workload_name: &str) -> Option<Category> {
    let stem = document_stem(source_name);
    let workload = workload_name.trim().to_ascii_lowercase();

    if !workload.is_empty() && names_document(&stem, &workload) {
        Some(Category::ConfigWorkload)
    } else if names_document(&stem, SHARED_NAME) {
        Some(Category::ConfigApp)
    } else {
        None
    }
}

fn names_document(stem: &str, name: &str) -> bool {
    stem == name
        || stem
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with('-'))
}

fn document_stem(source_name: &str) -> String {
    let trimmed = source_name.trim().trim_end_matches(|c: char| matches!(c, ']' | '\'' | '"'));
    let tail = trimmed
        .rsplit(|c: char| c == '/' || c == '\\' || c == ':')
        .next()
        .unwrap_or(trimmed)
        .to_ascii_lowercase();
    DOCUMENT_EXTENSIONS
        .iter()
        .find_map(|ext| tail.strip_suffix(ext))
        .map_or_else(|| tail.clone(), str::to_string)
}
