//! Metadata: the key-value payload carried by every binding.

use std::collections::HashMap;

use super::Value;
use crate::{Error, Result};

/// A map of metadata keys to values.
pub type Metadata = HashMap<String, Value>;

/// Maximum nesting depth of containers inside metadata, counting the
/// top-level map as depth 1.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Build a metadata map from (key, value) pairs.
pub fn meta<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Metadata
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Convert a vector of (key, value) pairs into a `Value::Map`.
impl<K, V> From<Vec<(K, V)>> for Value
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        Value::Map(meta(pairs))
    }
}

/// Validate metadata and return its normalized form.
///
/// Keys are trimmed and must be non-empty and unique after trimming.
/// Floats must be finite. Containers may nest at most `max_depth` levels.
pub fn normalize(metadata: Metadata, max_depth: usize) -> Result<Metadata> {
    let mut normalized = Metadata::with_capacity(metadata.len());
    for (key, value) in metadata {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("metadata keys must be non-empty".into()));
        }
        check_value(trimmed, &value, 1, max_depth)?;
        if normalized.insert(trimmed.to_string(), value).is_some() {
            return Err(Error::Validation(format!("duplicate metadata key '{trimmed}'")));
        }
    }
    Ok(normalized)
}

/// Check values only: finite floats and the nesting bound. Keys are taken
/// as they are.
pub fn check_values(metadata: &Metadata, max_depth: usize) -> Result<()> {
    metadata
        .iter()
        .try_for_each(|(key, value)| check_value(key, value, 1, max_depth))
}

fn check_value(path: &str, value: &Value, depth: usize, max_depth: usize) -> Result<()> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(Error::Validation(format!(
            "metadata value at '{path}' is not a finite number"
        ))),
        Value::List(items) => {
            let depth = nested(path, depth, max_depth)?;
            for (i, item) in items.iter().enumerate() {
                check_value(&format!("{path}[{i}]"), item, depth, max_depth)?;
            }
            Ok(())
        }
        Value::Map(map) => {
            let depth = nested(path, depth, max_depth)?;
            for (key, item) in map {
                check_value(&format!("{path}.{key}"), item, depth, max_depth)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn nested(path: &str, depth: usize, max_depth: usize) -> Result<usize> {
    let depth = depth + 1;
    if depth > max_depth {
        return Err(Error::Validation(format!(
            "metadata at '{path}' exceeds maximum nesting depth of {max_depth}"
        )));
    }
    Ok(depth)
}

/// Resolve a field name against metadata.
///
/// Tries the exact key, then the key without a `metadata.` prefix, then a
/// dotted path through nested maps.
pub fn lookup<'a>(metadata: &'a Metadata, field: &str) -> Option<&'a Value> {
    if let Some(value) = metadata.get(field) {
        return Some(value);
    }
    let path = field.strip_prefix("metadata.").unwrap_or(field);
    if let Some(value) = metadata.get(path) {
        return Some(value);
    }

    let mut parts = path.split('.');
    let mut current = metadata.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Map(map) => map.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}
