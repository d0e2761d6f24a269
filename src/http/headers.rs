use std::collections::HashMap;

/// A single stored header: the name as it was last written, and its value.
///
/// The value is `None` for a header line that carried no `:` at all.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    value: Option<String>,
}

/// Header map with case-insensitive names.
///
/// Inserting a name that is already present replaces the previous value
/// (last occurrence wins); there is never more than one value per name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: HashMap<String, Entry>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a header.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.insert_raw(name.into(), Some(value.into()));
    }

    /// Inserts a header whose value may be absent.
    pub fn insert_raw(&mut self, name: String, value: Option<String>) {
        self.entries
            .insert(name.to_ascii_lowercase(), Entry { name, value });
    }

    /// Returns the value for `name`, ignoring case.
    ///
    /// A header stored without a value is reported as `None`; use
    /// [`Headers::contains`] to tell it apart from a missing header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .and_then(|e| e.value.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries
            .remove(&name.to_ascii_lowercase())
            .and_then(|e| e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .values()
            .map(|e| (e.name.as_str(), e.value.as_deref()))
    }

    /// Parses one header line and stores it.
    ///
    /// The line is split on the first `:` and both halves are trimmed. A line
    /// without `:` is stored under the whole trimmed line with no value.
    /// Blank lines are ignored. Returns the stored name and value.
    pub fn parse_line(&mut self, line: &str) -> Option<(String, Option<String>)> {
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name.trim(), Some(value.trim().to_string())),
            None => (line.trim(), None),
        };

        if name.is_empty() {
            return None;
        }

        self.insert_raw(name.to_string(), value.clone());
        Some((name.to_string(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");

        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn last_value_wins() {
        let mut headers = Headers::new();
        headers.parse_line("X-Thing: one");
        headers.parse_line("x-thing: two");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-Thing"), Some("two"));
    }

    #[test]
    fn line_without_colon_has_no_value() {
        let mut headers = Headers::new();
        headers.parse_line("  BrokenHeader  ");

        assert!(headers.contains("BrokenHeader"));
        assert_eq!(headers.get("BrokenHeader"), None);
    }

    #[test]
    fn value_split_on_first_colon_only() {
        let mut headers = Headers::new();
        headers.parse_line("Host: example.com:8080");

        assert_eq!(headers.get("host"), Some("example.com:8080"));
    }

    #[test]
    fn blank_line_ignored() {
        let mut headers = Headers::new();
        assert!(headers.parse_line("   ").is_none());
        assert!(headers.is_empty());
    }
}
