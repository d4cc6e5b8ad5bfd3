//! # Configuration
//!
//! A minimal string key/value store that mirrors Feathers' `app.set()` /
//! `app.get()` API. Keys are dotted (`uploads.dir`, `http.port`).
//!
//! ```rust
//! use desk_core::DeskApp;
//! let app = DeskApp::<(), ()>::new();
//!
//! app.set("uploads.dir", "uploads");
//! assert_eq!(app.get("uploads.dir"), Some("uploads".to_string()));
//! ```
//!
//! Environment overlays use a prefix and double underscores as separators:
//! `MEDIADESK__UPLOADS__DIR=/srv/media` becomes `uploads.dir`.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DeskConfig {
    values: HashMap<String, String>,
}

impl DeskConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Overlay every `{prefix}A__B=value` pair as `a.b = value`.
    ///
    /// Returns the number of keys that were set.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_pairs(prefix, std::env::vars())
    }

    pub(crate) fn load_pairs<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut count = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                if stripped.is_empty() {
                    continue;
                }
                let normalized = normalize_env_key(stripped);
                self.values.insert(normalized, value);
                count += 1;
            }
        }
        count
    }

    pub fn snapshot(&self) -> DeskConfigSnapshot {
        DeskConfigSnapshot::new(self.values.clone())
    }
}

// UPLOADS__PUBLIC_BASE_URL -> uploads.publicBaseUrl
fn normalize_env_key(raw: &str) -> String {
    raw.split("__")
        .map(|segment| {
            let mut out = String::with_capacity(segment.len());
            let mut upper_next = false;
            for ch in segment.chars() {
                if ch == '_' {
                    upper_next = true;
                } else if upper_next {
                    out.extend(ch.to_uppercase());
                    upper_next = false;
                } else {
                    out.extend(ch.to_lowercase());
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Read-only copy of the config handed to hooks.
#[derive(Debug, Clone, Default)]
pub struct DeskConfigSnapshot {
    map: HashMap<String, String>,
}

impl DeskConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }
}
