//! Ordered multi-value maps used for canonical headers and query parameters.
//!
//! # Overview
//! The upstream gateways deliver headers and query parameters in two
//! representations: a single-valued map and a multi-valued map-of-lists.
//! Internally the crate keeps exactly one representation, a [`MultiMap`]:
//! insertion-ordered, multiple values per key, and (for headers) key lookup
//! that ignores ASCII case while the original key spelling is kept for
//! output. The single-vs-multi duality lives entirely in
//! [`codec`](crate::codec), never in the canonical request or response.

/// One key with all of its values, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    values: Vec<String>,
}

/// An insertion-ordered map from a key to one or more values.
///
/// # Example
/// ```
/// use lambda_api_proxy::multimap::MultiMap;
///
/// let mut headers = MultiMap::case_insensitive();
/// headers.append("Set-Cookie", "a=1");
/// headers.append("Set-Cookie", "b=2");
/// assert_eq!(headers.get("set-cookie"), Some("a=1"));
/// assert_eq!(headers.get_all("SET-COOKIE"), ["a=1", "b=2"]);
/// // the spelling used on first insertion is what comes back out
/// assert_eq!(headers.keys().collect::<Vec<_>>(), ["Set-Cookie"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiMap {
    entries: Vec<Entry>,
    ignore_ascii_case: bool,
}

impl MultiMap {
    /// Creates an empty map with case-sensitive keys, suitable for query
    /// parameters.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            ignore_ascii_case: false,
        }
    }

    /// Creates an empty map whose key lookup ignores ASCII case, suitable
    /// for headers. The spelling used on first insertion is preserved.
    pub fn case_insensitive() -> Self {
        Self {
            entries: Vec::new(),
            ignore_ascii_case: true,
        }
    }

    fn matches(&self, entry: &str, name: &str) -> bool {
        if self.ignore_ascii_case {
            entry.eq_ignore_ascii_case(name)
        } else {
            entry == name
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| self.matches(&entry.name, name))
    }

    /// Appends `value` to the values of `name`, creating the key at the end
    /// of the map if it is not present yet.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        match self.position(name) {
            Some(index) => self.entries[index].values.push(value.into()),
            None => self.entries.push(Entry {
                name: name.to_string(),
                values: vec![value.into()],
            }),
        }
    }

    /// Replaces all values of `name` with the single `value`, keeping the
    /// key's position (and original spelling) if it already exists.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        match self.position(name) {
            Some(index) => {
                self.entries[index].values.clear();
                self.entries[index].values.push(value.into());
            }
            None => self.entries.push(Entry {
                name: name.to_string(),
                values: vec![value.into()],
            }),
        }
    }

    /// Removes `name` and returns its values, if present.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name)
            .map(|index| self.entries.remove(index).values)
    }

    /// The first value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .map(|index| self.entries[index].values[0].as_str())
    }

    /// The last value of `name`.
    pub fn last(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|index| self.entries[index].values.last())
            .map(String::as_str)
    }

    /// All values of `name`, empty if the key is absent.
    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(index) => &self.entries[index].values,
            None => &[],
        }
    }

    /// Whether `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Keys in insertion order, with their original spelling.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// `(key, values)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.values.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MultiMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::MultiMap;

    #[test]
    fn insertion_order_preserved() {
        let mut map = MultiMap::new();
        map.append("z", "3");
        map.append("a", "1");
        map.append("m", "2");
        assert_eq!(map.keys().collect::<Vec<_>>(), ["z", "a", "m"]);
    }

    #[test]
    fn append_accumulates_values() {
        let mut map = MultiMap::new();
        map.append("key", "a");
        map.append("key", "b");
        assert_eq!(map.get("key"), Some("a"));
        assert_eq!(map.last("key"), Some("b"));
        assert_eq!(map.get_all("key"), ["a", "b"]);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn set_replaces_values_in_place() {
        let mut map = MultiMap::new();
        map.append("first", "1");
        map.append("second", "2");
        map.append("second", "3");
        map.set("second", "only");
        assert_eq!(map.get_all("second"), ["only"]);
        assert_eq!(map.keys().collect::<Vec<_>>(), ["first", "second"]);
    }

    #[test]
    fn case_insensitive_lookup_keeps_original_spelling() {
        let mut map = MultiMap::case_insensitive();
        map.append("Content-Type", "text/plain");
        map.append("CONTENT-TYPE", "text/html");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("content-type"), Some("text/plain"));
        assert_eq!(map.keys().collect::<Vec<_>>(), ["Content-Type"]);
    }

    #[test]
    fn case_sensitive_keys_stay_distinct() {
        let mut map = MultiMap::new();
        map.append("key", "lower");
        map.append("Key", "upper");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("Key"), Some("upper"));
    }

    #[test]
    fn remove_returns_values() {
        let mut map = MultiMap::case_insensitive();
        map.append("Set-Cookie", "a=1");
        map.append("Set-Cookie", "b=2");
        assert_eq!(
            map.remove("set-cookie"),
            Some(vec!["a=1".to_string(), "b=2".to_string()])
        );
        assert!(map.is_empty());
        assert_eq!(map.remove("set-cookie"), None);
    }

    #[test]
    fn missing_key_yields_empty_slice() {
        let map = MultiMap::new();
        assert!(map.get_all("absent").is_empty());
        assert_eq!(map.get("absent"), None);
        assert!(!map.contains("absent"));
    }
}
