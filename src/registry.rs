// Named data-shape declarations used by the request validator
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::error::RegistrationError;

/// Accumulated dictionary of named schema declarations. Assembled
/// incrementally during registration; read-only afterwards. Merging adds
/// properties to the map, it never replaces the map wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistry {
    pub models: Map<String, Value>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_models(models: Map<String, Value>) -> Self {
        Self { models }
    }

    /// Merge a name→schema map into the registry. A later declaration with
    /// the same name wins for that name; unrelated names are preserved.
    pub fn merge(&mut self, models: Map<String, Value>) {
        for (name, schema) in models {
            self.models.insert(name, schema);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.models.get(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Load every model declaration file in a directory. Each `*.yaml`,
    /// `*.yml` or `*.json` file must contain a name→schema mapping; files
    /// are read in name order so later files win on duplicate names.
    pub fn load_dir(dir: &Path) -> Result<Map<String, Value>, RegistrationError> {
        let load_error = |path: &Path, message: String| RegistrationError::ResourceLoad {
            path: path.display().to_string(),
            message,
        };

        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| load_error(dir, e.to_string()))?
            .collect::<Result<_, _>>()
            .map_err(|e| load_error(dir, e.to_string()))?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut models = Map::new();
        for entry in entries {
            let path = entry.path();
            let extension = path.extension().and_then(|e| e.to_str());
            let parsed: Map<String, Value> = match extension {
                Some("yaml") | Some("yml") => {
                    let raw = std::fs::read_to_string(&path)
                        .map_err(|e| load_error(&path, e.to_string()))?;
                    serde_yaml::from_str(&raw)
                        .map_err(|e| load_error(&path, e.to_string()))?
                }
                Some("json") => {
                    let raw = std::fs::read_to_string(&path)
                        .map_err(|e| load_error(&path, e.to_string()))?;
                    serde_json::from_str(&raw)
                        .map_err(|e| load_error(&path, e.to_string()))?
                }
                _ => continue,
            };
            for (name, schema) in parsed {
                models.insert(name, schema);
            }
        }
        Ok(models)
    }
}

/// Handle shared between the registrar and the chains it builds, so chains
/// wired early observe models registered by later resources. Written only
/// during the single-pass startup registration; the request path takes
/// uncontended read locks and clones.
#[derive(Debug, Clone, Default)]
pub struct SharedModels(Arc<RwLock<ModelRegistry>>);

impl SharedModels {
    pub fn new(registry: ModelRegistry) -> Self {
        Self(Arc::new(RwLock::new(registry)))
    }

    pub fn merge(&self, models: Map<String, Value>) {
        self.0.write().expect("model registry lock").merge(models);
    }

    /// An owned copy of the registry as of now. The validator mutates its
    /// copy freely without corrupting the shared set.
    pub fn snapshot(&self) -> ModelRegistry {
        self.0.read().expect("model registry lock").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn models(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(name, schema)| (name.to_string(), schema.clone()))
            .collect()
    }

    #[test]
    fn merge_extends_rather_than_replaces() {
        let mut registry = ModelRegistry::new();
        registry.merge(models(&[("module1", json!({"id": "Module1"}))]));
        registry.merge(models(&[("module2", json!({"id": "Module2"}))]));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("module1"), Some(&json!({"id": "Module1"})));
    }

    #[test]
    fn merge_overwrites_same_name_only() {
        let mut registry = ModelRegistry::new();
        registry.merge(models(&[("a", json!(1)), ("b", json!(2))]));
        registry.merge(models(&[("a", json!(3))]));
        assert_eq!(registry.get("a"), Some(&json!(3)));
        assert_eq!(registry.get("b"), Some(&json!(2)));
    }

    #[test]
    fn shared_snapshot_is_detached() {
        let shared = SharedModels::new(ModelRegistry::new());
        let before = shared.snapshot();
        shared.merge(models(&[("late", json!({}))]));
        assert!(before.is_empty());
        assert_eq!(shared.snapshot().len(), 1);
    }
}
