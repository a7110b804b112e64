//! Template manifest: maps `name.type` keys to files under the template directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// File extensions considered template sources.
const TEMPLATE_EXTENSIONS: &[&str] = &["hbs", "html", "txt"];

/// Extension stripped from file names when computing keys.
const ENGINE_EXTENSION: &str = ".hbs";

/// Check if a directory entry is a template source file
fn is_template_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry
            .path()
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
            .unwrap_or(false)
}

/// Compute the lookup key for a path relative to the template root.
///
/// `auth/welcome.html.hbs` -> `auth/welcome.html`
fn relative_key(relative: &Path) -> Option<String> {
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    let joined = parts.join("/");

    Some(
        joined
            .strip_suffix(ENGINE_EXTENSION)
            .map(str::to_string)
            .unwrap_or(joined),
    )
}

fn basename_key(relative_key: &str) -> &str {
    relative_key
        .rsplit_once('/')
        .map(|(_, base)| base)
        .unwrap_or(relative_key)
}

/// Exact-match index of the template files available at startup.
///
/// Every file is reachable by its relative key; the first file in walk order
/// (sorted by file name) also claims its basename key.
#[derive(Debug, Clone, Default)]
pub struct TemplateManifest {
    entries: HashMap<String, PathBuf>,
}

impl TemplateManifest {
    /// A manifest with no templates (no directory configured)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Walk `root` recursively and index every template file.
    pub fn scan(root: &Path) -> Self {
        let mut manifest = Self::empty();

        if !root.is_dir() {
            warn!(path = %root.display(), "Template directory not found; file templates disabled");
            return manifest;
        }

        let files = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(is_template_file);

        for entry in files {
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let Some(key) = relative_key(relative) else {
                continue;
            };

            let base = basename_key(&key).to_string();
            if base != key {
                manifest
                    .entries
                    .entry(base)
                    .or_insert_with(|| entry.path().to_path_buf());
            }
            manifest.entries.insert(key, entry.path().to_path_buf());
        }

        debug!(
            path = %root.display(),
            templates = manifest.entries.len(),
            "Template manifest built"
        );

        manifest
    }

    /// Look up the file registered for `key`
    pub fn get(&self, key: &str) -> Option<&Path> {
        self.entries.get(key).map(PathBuf::as_path)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All registered keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
