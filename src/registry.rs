use crate::error::{ClientError, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registry {
    pub default: String,
    pub models: Vec<RegistryEntry>,
}

const REGISTRY_JSON: &str = include_str!("../models/registry.json");

/// Parse the embedded catalog of separation models the service ships.
pub fn registry() -> Result<Registry> {
    Ok(serde_json::from_str(REGISTRY_JSON)?)
}

/// Resolve a user-supplied model name against the registry.
///
/// An empty name resolves to the registry default; an unknown name is
/// rejected before any network call is made.
pub fn resolve_model(model_name: &str) -> Result<String> {
    let reg = registry()?;
    let target = if model_name.is_empty() {
        reg.default
    } else {
        model_name.to_string()
    };

    reg.models
        .into_iter()
        .find(|m| m.name == target)
        .map(|m| m.name)
        .ok_or_else(|| ClientError::Registry(format!("Model `{target}` not found in registry")))
}
