//! Adapter resolution: logical adapter names to spawn commands.
//!
//! A pure lookup table: no protocol logic lives here. Builtins cover
//! the node and debugpy bridges; deployments overlay or add entries
//! from a TOML table.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::DapError;

/// How to launch one debug adapter, plus static hints merged into its
/// launch arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterSpec {
    /// Executable to spawn.
    pub command: String,
    /// Base arguments.
    pub args: Vec<String>,
    /// Static key/value hints merged into every `launch` request for
    /// this adapter (e.g. a pythonPath).
    pub launch_hints: serde_json::Map<String, serde_json::Value>,
}

/// Registry of known adapters keyed by logical name.
#[derive(Debug, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, AdapterSpec>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    adapters: HashMap<String, AdapterEntry>,
}

#[derive(Debug, Deserialize)]
struct AdapterEntry {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    launch_hints: toml::Table,
}

impl AdapterRegistry {
    /// Registry with the builtin node and python entries.
    pub fn with_builtins() -> Self {
        let mut adapters = HashMap::new();
        adapters.insert(
            "node".to_string(),
            AdapterSpec {
                command: "js-debug-adapter".into(),
                args: Vec::new(),
                launch_hints: serde_json::Map::new(),
            },
        );
        let mut python_hints = serde_json::Map::new();
        python_hints.insert("pythonPath".into(), serde_json::json!("python3"));
        adapters.insert(
            "python".to_string(),
            AdapterSpec {
                command: "python3".into(),
                args: vec!["-m".into(), "debugpy.adapter".into()],
                launch_hints: python_hints,
            },
        );
        Self { adapters }
    }

    /// Look up an adapter by logical name.
    pub fn resolve(&self, name: &str) -> Result<&AdapterSpec, DapError> {
        self.adapters
            .get(name)
            .ok_or_else(|| DapError::UnknownAdapter(name.to_string()))
    }

    /// Names of all registered adapters.
    pub fn names(&self) -> Vec<&str> {
        self.adapters.keys().map(|k| k.as_str()).collect()
    }

    /// Register or replace an adapter.
    pub fn insert(&mut self, name: impl Into<String>, spec: AdapterSpec) {
        self.adapters.insert(name.into(), spec);
    }

    /// Overlay entries parsed from a TOML document:
    ///
    /// ```toml
    /// [adapters.node]
    /// command = "/opt/js-debug/dap"
    /// args = ["--stdio"]
    ///
    /// [adapters.node.launch_hints]
    /// runtimeExecutable = "node"
    /// ```
    pub fn apply_toml_str(&mut self, content: &str) -> Result<(), DapError> {
        let file: RegistryFile =
            toml::from_str(content).map_err(|e| DapError::Config(e.to_string()))?;
        for (name, entry) in file.adapters {
            let hints = toml_table_to_json(entry.launch_hints)?;
            self.adapters.insert(
                name,
                AdapterSpec {
                    command: entry.command,
                    args: entry.args,
                    launch_hints: hints,
                },
            );
        }
        Ok(())
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn toml_table_to_json(
    table: toml::Table,
) -> Result<serde_json::Map<String, serde_json::Value>, DapError> {
    let value = serde_json::to_value(table).map_err(|e| DapError::Config(e.to_string()))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(DapError::Config("launch_hints must be a table".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_builtins_present() {
        let registry = AdapterRegistry::with_builtins();
        let node = registry.resolve("node").unwrap();
        assert_eq!(node.command, "js-debug-adapter");

        let python = registry.resolve("python").unwrap();
        assert_eq!(python.command, "python3");
        assert_eq!(python.args, vec!["-m", "debugpy.adapter"]);
        assert_eq!(python.launch_hints["pythonPath"], "python3");
    }

    #[test]
    fn adapter_unknown_name() {
        let registry = AdapterRegistry::with_builtins();
        let err = registry.resolve("ruby").unwrap_err();
        assert!(matches!(err, DapError::UnknownAdapter(name) if name == "ruby"));
    }

    #[test]
    fn adapter_toml_overlay_replaces_builtin() {
        let mut registry = AdapterRegistry::with_builtins();
        registry
            .apply_toml_str(
                r#"
                [adapters.node]
                command = "/opt/js-debug/dap"
                args = ["--stdio"]

                [adapters.node.launch_hints]
                runtimeExecutable = "node"
                "#,
            )
            .unwrap();
        let node = registry.resolve("node").unwrap();
        assert_eq!(node.command, "/opt/js-debug/dap");
        assert_eq!(node.args, vec!["--stdio"]);
        assert_eq!(node.launch_hints["runtimeExecutable"], "node");
    }

    #[test]
    fn adapter_toml_adds_new_entry() {
        let mut registry = AdapterRegistry::with_builtins();
        registry
            .apply_toml_str(
                r#"
                [adapters.go]
                command = "dlv"
                args = ["dap"]
                "#,
            )
            .unwrap();
        let go = registry.resolve("go").unwrap();
        assert_eq!(go.command, "dlv");
        assert!(go.launch_hints.is_empty());
        // Builtins survive the overlay.
        assert!(registry.resolve("python").is_ok());
    }

    #[test]
    fn adapter_toml_parse_error() {
        let mut registry = AdapterRegistry::with_builtins();
        let err = registry.apply_toml_str("not = [valid").unwrap_err();
        assert!(matches!(err, DapError::Config(_)));
    }
}
