//! Service configuration read from the environment

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Command used to launch the CalculiX solver
    pub ccx_path: String,
    /// Directory receiving copies of every `.inp` and `.dat`, when set
    pub debug_export: Option<PathBuf>,
    /// Reject unsupported keywords instead of keeping them
    pub strict: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8084,
            ccx_path: "ccx".to_string(),
            debug_export: None,
            strict: false,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unparsable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid PORT value {:?}", raw);
                defaults.port
            }),
            None => defaults.port,
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            ccx_path: lookup("CALCULIX_PATH").unwrap_or_else(resolve_ccx_path),
            debug_export: lookup("CALCULIX_DEBUG_EXPORT").map(PathBuf::from),
            strict: lookup("DECK_STRICT")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.strict),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Prefer a repo-local solver binary if present, falling back to `ccx` on PATH.
/// The executor runs ccx from a temp working directory, so relative paths are
/// made absolute when possible.
pub fn resolve_ccx_path() -> String {
    let candidate = if Path::new("./bin/ccx").exists() {
        "./bin/ccx".to_string()
    } else {
        "ccx".to_string()
    };
    std::fs::canonicalize(&candidate)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or(candidate)
}
