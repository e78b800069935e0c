use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{scene::ContentInstance, Result};

/// Maps scan codes to content and instantiates content by identifier.
pub trait ContentLookup {
    /// Content identifier registered for a scan code.
    fn lookup(&self, scan_code: &str) -> Option<String>;

    /// Creates a fresh instance, or `None` when the identifier no longer
    /// resolves.
    fn instantiate(&self, content_id: &str) -> Option<ContentInstance>;
}

/// One row of the product table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub scan_code: String,
    pub content_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    entries: Vec<CatalogEntry>,
}

/// Registry of every piece of content the browser can show.
#[derive(Debug, Default)]
pub struct ContentCatalog {
    by_scan_code: HashMap<String, String>,
    content_ids: HashMap<String, usize>,
}

impl ContentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `{"entries": [{"scan_code": .., "content_id": ..}]}`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&raw)?;
        let mut catalog = Self::new();
        for entry in file.entries {
            catalog.register(entry);
        }
        tracing::info!(path = %path.display(), entries = catalog.len(), "loaded content catalog");
        Ok(catalog)
    }

    pub fn register(&mut self, entry: CatalogEntry) {
        if let Some(previous) = self
            .by_scan_code
            .insert(entry.scan_code, entry.content_id.clone())
        {
            self.forget_content(&previous);
        }
        *self.content_ids.entry(entry.content_id).or_insert(0) += 1;
    }

    pub fn with_entry(mut self, scan_code: &str, content_id: &str) -> Self {
        self.register(CatalogEntry {
            scan_code: scan_code.to_string(),
            content_id: content_id.to_string(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.by_scan_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_scan_code.is_empty()
    }

    fn forget_content(&mut self, content_id: &str) {
        if let Some(count) = self.content_ids.get_mut(content_id) {
            *count -= 1;
            if *count == 0 {
                self.content_ids.remove(content_id);
            }
        }
    }
}

impl ContentLookup for ContentCatalog {
    fn lookup(&self, scan_code: &str) -> Option<String> {
        self.by_scan_code.get(scan_code).cloned()
    }

    fn instantiate(&self, content_id: &str) -> Option<ContentInstance> {
        self.content_ids
            .contains_key(content_id)
            .then(|| ContentInstance::new(content_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_codes() {
        let catalog = ContentCatalog::new().with_entry("4901234567894", "kettle");

        assert_eq!(catalog.lookup("4901234567894").as_deref(), Some("kettle"));
        let content = catalog.instantiate("kettle").unwrap();
        assert_eq!(content.content_id(), "kettle");
    }

    #[test]
    fn unknown_codes_and_content_do_not_resolve() {
        let catalog = ContentCatalog::new().with_entry("1", "kettle");

        assert!(catalog.lookup("2").is_none());
        assert!(catalog.instantiate("toaster").is_none());
    }

    #[test]
    fn re_registering_a_code_drops_stale_content() {
        let mut catalog = ContentCatalog::new().with_entry("1", "kettle");
        catalog.register(CatalogEntry {
            scan_code: "1".to_string(),
            content_id: "toaster".to_string(),
        });

        assert!(catalog.instantiate("kettle").is_none());
        assert!(catalog.instantiate("toaster").is_some());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn loads_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{ "entries": [ { "scan_code": "1", "content_id": "kettle" } ] }"#,
        )
        .unwrap();

        let catalog = ContentCatalog::load(&path).unwrap();
        assert_eq!(catalog.lookup("1").as_deref(), Some("kettle"));
    }
}
