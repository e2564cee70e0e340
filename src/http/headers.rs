//! Case-insensitive, order-preserving header storage.

use smallvec::SmallVec;

/// Maximum inline header entries before heap allocation.
/// Most messages carry ≤16 distinct header names.
pub const MAX_INLINE_HEADERS: usize = 16;

/// One header name with all of its values, in the order they were added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    /// Name exactly as it was supplied.
    pub name: String,
    pub values: Vec<String>,
}

/// Header collection used by requests and responses.
///
/// Lookups compare names with ASCII case folding; enumeration returns names
/// in the case they were supplied. Cloning copies every entry, so a clone never
/// shares storage with the original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: SmallVec<[HeaderEntry; MAX_INLINE_HEADERS]>,
}

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// All values for `name`; empty when absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(i) => &self.entries[i].values,
            None => &[],
        }
    }

    /// Values for `name` joined with `", "` for reading.
    #[must_use]
    pub fn line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    /// Replace every value of `name`. The stored name takes the new casing.
    pub fn set(&mut self, name: &str, values: Vec<String>) {
        match self.position(name) {
            Some(i) => {
                let entry = &mut self.entries[i];
                entry.name = name.to_string();
                entry.values = values;
            }
            None => self.entries.push(HeaderEntry {
                name: name.to_string(),
                values,
            }),
        }
    }

    /// Append values to `name`, creating the entry if needed.
    pub fn append(&mut self, name: &str, values: Vec<String>) {
        match self.position(name) {
            Some(i) => self.entries[i].values.extend(values),
            None => self.entries.push(HeaderEntry {
                name: name.to_string(),
                values,
            }),
        }
    }

    /// Remove `name`. Absent names are ignored.
    pub fn remove(&mut self, name: &str) {
        if let Some(i) = self.position(name) {
            self.entries.remove(i);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name.as_ref(), vec![value.into()]);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_but_keeps_supplied_name() {
        let mut headers = Headers::new();
        headers.set("X-Trace-Id", vec!["abc".into()]);
        assert!(headers.contains("x-trace-id"));
        assert_eq!(headers.get("X-TRACE-ID"), ["abc".to_string()]);
        assert_eq!(headers.iter().next().map(|e| e.name.as_str()), Some("X-Trace-Id"));
    }

    #[test]
    fn append_and_line() {
        let headers: Headers = [("Accept", "text/html"), ("accept", "application/json")]
            .into_iter()
            .collect();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.line("ACCEPT"), "text/html, application/json");
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut headers = Headers::new();
        headers.remove("x-missing");
        assert!(headers.is_empty());
    }
}
