use super::NormalizeOptions;
use crate::payload::ActuatorPayload;
use crate::source::{Category, NormalizedSources, PropertySource};

/// Pass actuator sources through verbatim
///
/// The instance already reports its sources in precedence order. Sources
/// with no properties are rejected.
#[must_use]
pub fn normalize_actuator(
    payload: &ActuatorPayload,
    options: &NormalizeOptions,
) -> NormalizedSources {
    let sources = payload
        .property_sources
        .iter()
        .filter(|source| !source.properties.is_empty())
        .map(|source| {
            PropertySource::new(
                source.name.clone(),
                Category::Other,
                source.properties.iter().map(|(k, v)| (k.clone(), v.clone())),
            )
            .with_label("Actuator")
        })
        .collect();

    NormalizedSources {
        sources,
        warnings: Vec::new(),
        active_profiles: options
            .active_profiles
            .clone()
            .unwrap_or_else(|| payload.active_profiles.clone()),
    }
}
