//! Stalkerware indicator store
//!
//! Read-only lookup of known stalkerware domains, application identifiers
//! and URL schemes, each associated with a product label. Membership tests
//! are the only runtime operation; updates happen out of band and are
//! applied as an atomic swap of the underlying table, so readers never see
//! a partially updated state.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{Error, Result};

/// Built-in indicator set
///
/// Compiled from publicly documented stalkerware infrastructure. The
/// external data feed replaces this table wholesale at refresh time.
static BUILTIN: Lazy<Arc<IndicatorTable>> = Lazy::new(|| {
    let table = IndicatorTable::new();

    for (domain, product) in [
        ("mspyonline.com", "mSpy"),
        ("mspy.com", "mSpy"),
        ("flexispy.com", "FlexiSPY"),
        ("portal.flexispy.com", "FlexiSPY"),
        ("cocospy.com", "Cocospy"),
        ("spyzie.com", "Spyzie"),
        ("hoverwatch.com", "Hoverwatch"),
        ("thetruthspy.com", "TheTruthSpy"),
        ("my.thetruthspy.com", "TheTruthSpy"),
        ("spyic.com", "Spyic"),
        ("ikeymonitor.com", "iKeyMonitor"),
        ("xnspy.com", "XNSPY"),
        ("cp.xnspy.com", "XNSPY"),
        ("spyera.com", "SPYERA"),
        ("highstermobile.com", "Highster Mobile"),
        ("mobile-tracker-free.com", "Mobile Tracker Free"),
    ] {
        table.add_domain(domain, product);
    }

    for (app, product) in [
        ("com.mspy.lite", "mSpy"),
        ("com.flexispy.android", "FlexiSPY"),
        ("com.cocospy.android", "Cocospy"),
        ("com.spyzie.client", "Spyzie"),
        ("com.hoverwatch.android", "Hoverwatch"),
        ("com.thetruthspy.app", "TheTruthSpy"),
        ("com.ikeymonitor.android", "iKeyMonitor"),
        ("com.xnspy.client", "XNSPY"),
    ] {
        table.add_app(app, product);
    }

    for (scheme, product) in [
        ("mspy", "mSpy"),
        ("flexispy", "FlexiSPY"),
        ("truthspy", "TheTruthSpy"),
    ] {
        table.add_scheme(scheme, product);
    }

    Arc::new(table)
});

/// One immutable generation of the indicator set
///
/// Built in full, then frozen behind an `Arc` and swapped into the store.
#[derive(Debug, Default)]
pub struct IndicatorTable {
    /// Domain -> product label
    domains: DashMap<String, String>,
    /// Application identifier -> product label
    apps: DashMap<String, String>,
    /// URL scheme -> product label
    schemes: DashMap<String, String>,
}

impl IndicatorTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a domain indicator
    pub fn add_domain(&self, domain: &str, product: &str) {
        let domain = domain.trim().to_lowercase();
        if !domain.is_empty() {
            self.domains.insert(domain, product.trim().to_string());
        }
    }

    /// Add an application identifier indicator
    pub fn add_app(&self, app: &str, product: &str) {
        let app = app.trim().to_lowercase();
        if !app.is_empty() {
            self.apps.insert(app, product.trim().to_string());
        }
    }

    /// Add a URL scheme indicator
    pub fn add_scheme(&self, scheme: &str, product: &str) {
        let scheme = scheme.trim().trim_end_matches("://").to_lowercase();
        if !scheme.is_empty() {
            self.schemes.insert(scheme, product.trim().to_string());
        }
    }

    /// Total entries across all indicator classes
    pub fn len(&self) -> usize {
        self.domains.len() + self.apps.len() + self.schemes.len()
    }

    /// Whether the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up the product label for a hostname
    ///
    /// Also checks parent domains, so "api.flexispy.com" matches a
    /// "flexispy.com" entry.
    pub fn product_for_domain(&self, hostname: &str) -> Option<String> {
        let hostname = hostname.trim().to_lowercase();

        if let Some(label) = self.domains.get(&hostname) {
            return Some(label.value().clone());
        }

        let mut current = hostname.as_str();
        while let Some(pos) = current.find('.') {
            current = &current[pos + 1..];
            if let Some(label) = self.domains.get(current) {
                return Some(label.value().clone());
            }
        }

        None
    }

    /// All `(domain, product)` pairs in the table
    pub fn domain_entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .domains
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Parse one indicator line into the table
    ///
    /// Returns `false` for comments and blank lines. Line format:
    /// `entry[,product]` where `entry` is a bare domain or carries an
    /// `app:`/`scheme:` prefix.
    pub fn apply_line(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return false;
        }

        let (entry, product) = match line.split_once(',') {
            Some((entry, product)) => (entry.trim(), product.trim()),
            None => (line, "Unknown"),
        };

        if let Some(app) = entry.strip_prefix("app:") {
            self.add_app(app, product);
        } else if let Some(scheme) = entry.strip_prefix("scheme:") {
            self.add_scheme(scheme, product);
        } else {
            self.add_domain(entry, product);
        }
        true
    }

    /// Copy every entry into another table
    fn copy_into(&self, target: &IndicatorTable) {
        for e in self.domains.iter() {
            target.domains.insert(e.key().clone(), e.value().clone());
        }
        for e in self.apps.iter() {
            target.apps.insert(e.key().clone(), e.value().clone());
        }
        for e in self.schemes.iter() {
            target.schemes.insert(e.key().clone(), e.value().clone());
        }
    }
}

/// Thread-safe indicator store with atomic table replacement
///
/// All lookups read the current table through one `Arc` load; `replace`
/// installs a fully built table in a single swap.
pub struct IndicatorStore {
    table: RwLock<Arc<IndicatorTable>>,
}

impl Default for IndicatorStore {
    fn default() -> Self {
        Self::builtin()
    }
}

impl IndicatorStore {
    /// Create a store with an empty table
    pub fn empty() -> Self {
        Self {
            table: RwLock::new(Arc::new(IndicatorTable::new())),
        }
    }

    /// Create a store seeded with the built-in indicator set
    pub fn builtin() -> Self {
        Self {
            table: RwLock::new(Arc::clone(&BUILTIN)),
        }
    }

    /// Create a store from an indicator file
    ///
    /// File format, one entry per line:
    /// - `domain.example.com,Product Label`
    /// - `app:com.example.client,Product Label`
    /// - `scheme:example,Product Label`
    /// - Lines starting with `#` are comments; the label defaults to
    ///   "Unknown" when omitted.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self::empty();
        store.load_file(path)?;
        Ok(store)
    }

    /// Load an indicator file and atomically swap it in
    ///
    /// Returns the number of entries loaded. The previous table stays
    /// visible to readers until the new one is complete.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::indicator_file(path.display().to_string(), e.to_string()))?;

        let table = IndicatorTable::new();
        for line in content.lines() {
            table.apply_line(line);
        }

        let count = table.len();
        if count == 0 {
            return Err(Error::indicator_file(
                path.display().to_string(),
                "no indicator entries found",
            ));
        }

        self.replace(table);
        info!(count, path = %path.display(), "Loaded indicator table");
        Ok(count)
    }

    /// Atomically install a new table generation
    pub fn replace(&self, table: IndicatorTable) {
        *self.table.write() = Arc::new(table);
    }

    /// Add entries on top of the current table, as one atomic swap
    ///
    /// Returns the number of lines applied.
    pub fn extend_with_entries<S: AsRef<str>>(&self, lines: &[S]) -> usize {
        if lines.is_empty() {
            return 0;
        }

        let table = IndicatorTable::new();
        self.snapshot().copy_into(&table);

        let applied = lines
            .iter()
            .filter(|line| table.apply_line(line.as_ref()))
            .count();
        self.replace(table);
        applied
    }

    /// Current table generation
    pub fn snapshot(&self) -> Arc<IndicatorTable> {
        Arc::clone(&self.table.read())
    }

    /// Whether a hostname matches a known indicator domain
    pub fn is_known_domain(&self, hostname: &str) -> bool {
        self.snapshot().product_for_domain(hostname).is_some()
    }

    /// Whether a URL scheme matches a known indicator scheme
    pub fn is_known_scheme(&self, scheme: &str) -> bool {
        let scheme = scheme.trim().trim_end_matches("://").to_lowercase();
        self.snapshot().schemes.contains_key(&scheme)
    }

    /// Whether an application identifier matches a known indicator app
    pub fn is_known_app(&self, app: &str) -> bool {
        let app = app.trim().to_lowercase();
        self.snapshot().apps.contains_key(&app)
    }

    /// Product label for a hostname, walking parent domains
    pub fn product_for_domain(&self, hostname: &str) -> Option<String> {
        self.snapshot().product_for_domain(hostname)
    }

    /// Product label for an application identifier
    pub fn product_for_app(&self, app: &str) -> Option<String> {
        let app = app.trim().to_lowercase();
        self.snapshot().apps.get(&app).map(|label| label.value().clone())
    }

    /// Total entries in the current table
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the current table is empty
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_populated() {
        let store = IndicatorStore::builtin();
        assert!(!store.is_empty());
        assert!(store.is_known_domain("flexispy.com"));
        assert!(store.is_known_app("com.mspy.lite"));
        assert!(store.is_known_scheme("mspy"));
    }

    #[test]
    fn test_parent_domain_match() {
        let store = IndicatorStore::builtin();
        assert!(store.is_known_domain("api.flexispy.com"));
        assert!(store.is_known_domain("deep.sub.flexispy.com"));
        assert!(!store.is_known_domain("notflexispy.com"));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let store = IndicatorStore::builtin();
        assert!(store.is_known_domain("FlexiSpy.COM"));
        assert!(store.is_known_app("COM.MSPY.LITE"));
    }

    #[test]
    fn test_product_label() {
        let store = IndicatorStore::builtin();
        assert_eq!(
            store.product_for_domain("portal.flexispy.com").as_deref(),
            Some("FlexiSPY")
        );
        assert_eq!(store.product_for_domain("example.com"), None);
    }

    #[test]
    fn test_scheme_normalization() {
        let store = IndicatorStore::builtin();
        assert!(store.is_known_scheme("mspy://"));
        assert!(!store.is_known_scheme("https"));
    }

    #[test]
    fn test_atomic_replace() {
        let store = IndicatorStore::builtin();
        let before = store.snapshot();

        let table = IndicatorTable::new();
        table.add_domain("replacement.example", "Test Product");
        store.replace(table);

        assert!(store.is_known_domain("replacement.example"));
        assert!(!store.is_known_domain("flexispy.com"));
        // The old generation is still intact for holders of the snapshot
        assert!(before.product_for_domain("flexispy.com").is_some());
    }

    #[test]
    fn test_load_file_roundtrip() {
        let dir = std::env::temp_dir().join("vigil-indicator-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("indicators.txt");
        std::fs::write(
            &path,
            "# test indicators\n\
             tracker.example.com,TrackerPro\n\
             app:com.tracker.example,TrackerPro\n\
             scheme:trackit,TrackerPro\n\
             bare-entry.example.net\n",
        )
        .unwrap();

        let store = IndicatorStore::from_file(&path).unwrap();
        assert_eq!(store.len(), 4);
        assert!(store.is_known_domain("tracker.example.com"));
        assert!(store.is_known_app("com.tracker.example"));
        assert!(store.is_known_scheme("trackit"));
        assert_eq!(
            store.product_for_domain("bare-entry.example.net").as_deref(),
            Some("Unknown")
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_extend_with_entries() {
        let store = IndicatorStore::builtin();
        let before = store.len();

        let applied = store.extend_with_entries(&[
            "# a comment",
            "extra.example.org,ExtraWare",
            "app:com.extra.example,ExtraWare",
        ]);
        assert_eq!(applied, 2);
        assert_eq!(store.len(), before + 2);
        assert!(store.is_known_domain("extra.example.org"));
        // Existing entries survive the extension
        assert!(store.is_known_domain("flexispy.com"));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = IndicatorStore::from_file("/nonexistent/indicators.txt");
        assert!(result.is_err());
    }
}
