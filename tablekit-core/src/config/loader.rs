use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

/// Load and flatten a YAML file; a missing file contributes nothing.
pub(crate) fn load_yaml_file(
    path: &Path,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    load_yaml_str(&content, values)
}

pub(crate) fn load_yaml_str(
    content: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot-separated keys.
fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, ConfigValue>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => format!("{other:?}"),
                };
                let full_key = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_yaml(&full_key, v, out);
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
            }
        }
    }
}

/// Environment name of a config key: `database.max_connections` is
/// `DATABASE_MAX_CONNECTIONS`.
pub(crate) fn env_name(key: &str) -> String {
    key.to_uppercase().replace('.', "_")
}

/// Overlay environment variables onto `values`.
///
/// A variable overrides the existing key whose [`env_name`] it matches, so
/// underscores inside key segments survive. Other variables land under
/// their lowercased name with `_` read as `.`.
pub(crate) fn overlay_env(
    vars: impl IntoIterator<Item = (String, String)>,
    values: &mut HashMap<String, ConfigValue>,
) {
    let known: HashMap<String, String> = values
        .keys()
        .map(|key| (env_name(key), key.clone()))
        .collect();
    for (name, value) in vars {
        let key = match known.get(&name) {
            Some(key) => key.clone(),
            None => name.to_lowercase().replace('_', "."),
        };
        values.insert(key, ConfigValue::String(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_prefers_existing_keys() {
        let mut values = HashMap::new();
        values.insert("database.max_connections".to_string(), ConfigValue::Integer(10));
        overlay_env(
            [
                ("DATABASE_MAX_CONNECTIONS".to_string(), "3".to_string()),
                ("DATABASE_URL".to_string(), "postgres://db/app".to_string()),
            ],
            &mut values,
        );
        assert!(matches!(
            values.get("database.max_connections"),
            Some(ConfigValue::String(v)) if v == "3"
        ));
        assert!(matches!(
            values.get("database.url"),
            Some(ConfigValue::String(v)) if v == "postgres://db/app"
        ));
        assert!(!values.contains_key("database.max.connections"));
    }

    #[test]
    fn test_sequences_are_kept_whole() {
        let mut values = HashMap::new();
        load_yaml_str("hosts:\n  - a\n  - b\n", &mut values).unwrap();
        assert!(matches!(values.get("hosts"), Some(ConfigValue::List(items)) if items.len() == 2));
    }
}
