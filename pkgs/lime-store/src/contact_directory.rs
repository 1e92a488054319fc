//! Contact directory loaded from the exported `mid,profile_name` CSV

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info};

static QUOTED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^"([^"]+)","([^"]+)"$"#).expect("quoted contact pattern is valid")
});

/// Resolves member ids to display names
pub trait ContactLookup {
    fn lookup(&self, mid: &str) -> Option<String>;
}

/// In-memory id → display name table
#[derive(Default)]
pub struct ContactDirectory {
    names: RwLock<HashMap<String, String>>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from CSV text
    pub fn from_csv(csv: &str) -> Self {
        let directory = Self::new();
        directory.load_csv(csv);
        directory
    }

    /// Replace the directory contents with the entries of a CSV export
    ///
    /// The first line is a header. `"mid","name"` lines are preferred; other
    /// lines fall back to splitting on the first comma.
    pub fn load_csv(&self, csv: &str) -> usize {
        let mut names = HashMap::new();

        for line in csv.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = QUOTED_LINE.captures(line) {
                names.insert(caps[1].to_string(), caps[2].to_string());
                continue;
            }

            if let Some((mid, name)) = line.split_once(',') {
                names.insert(strip_quotes(mid).to_string(), strip_quotes(name).to_string());
            } else {
                debug!("Skipping contact line without a name column");
            }
        }

        let count = names.len();
        *self.names.write() = names;
        info!("Loaded {} contacts", count);
        count
    }

    pub fn get(&self, mid: &str) -> Option<String> {
        self.names.read().get(mid).cloned()
    }

    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }

    pub fn clear(&self) {
        self.names.write().clear();
    }
}

impl ContactLookup for ContactDirectory {
    fn lookup(&self, mid: &str) -> Option<String> {
        self.get(mid)
    }
}

impl ContactLookup for HashMap<String, String> {
    fn lookup(&self, mid: &str) -> Option<String> {
        self.get(mid).cloned()
    }
}

fn strip_quotes(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_lines() {
        let directory = ContactDirectory::from_csv(
            "mid,profile_name\n\"u0001\",\"Alice\"\r\n\"u0002\",\"Bob\"\n",
        );
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.lookup("u0001").as_deref(), Some("Alice"));
        assert_eq!(directory.lookup("u0002").as_deref(), Some("Bob"));
    }

    #[test]
    fn test_unquoted_fallback_keeps_commas_in_name() {
        let directory = ContactDirectory::from_csv("mid,profile_name\nu0003,Carol, Jr.\n");
        assert_eq!(directory.lookup("u0003").as_deref(), Some("Carol, Jr."));
    }

    #[test]
    fn test_mixed_quoting() {
        let directory = ContactDirectory::from_csv("mid,profile_name\n\"u0004\",Dave\n");
        assert_eq!(directory.lookup("u0004").as_deref(), Some("Dave"));
    }

    #[test]
    fn test_header_and_blank_lines_ignored() {
        let directory = ContactDirectory::from_csv("mid,profile_name\n\n   \nbroken\n");
        assert!(directory.is_empty());
        assert_eq!(directory.lookup("mid"), None);
    }

    #[test]
    fn test_reload_replaces_entries() {
        let directory = ContactDirectory::from_csv("h\nu1,One\n");
        directory.load_csv("h\nu2,Two\n");
        assert_eq!(directory.lookup("u1"), None);
        assert_eq!(directory.lookup("u2").as_deref(), Some("Two"));
    }
}
