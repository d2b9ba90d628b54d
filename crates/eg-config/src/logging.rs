use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// `[logging]` section. Every field has a default, so the section is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global filter, e.g. `"info"`.
    pub level: String,
    /// Per-module overrides, e.g. `{ eg_core = "debug" }`.
    pub modules: HashMap<String, String>,
    /// Optional log file. Relative paths are resolved against the config
    /// file's directory.
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            modules: HashMap::new(),
            file: None,
            format: LogFormat::Plain,
        }
    }
}

impl LoggingConfig {
    /// Render `level` plus module overrides as an `EnvFilter` directive
    /// string. Modules are sorted so the output is stable.
    pub fn directives(&self) -> String {
        let mut modules: Vec<_> = self.modules.iter().collect();
        modules.sort();
        let mut out = self.level.clone();
        for (module, level) in modules {
            out.push(',');
            out.push_str(module);
            out.push('=');
            out.push_str(level);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}
