//! Read-only view of the cookies sent with an edge request.

use serde::Serialize;

/// Immutable cookie store parsed from a `Cookie:` request header.
///
/// Entries keep the order in which they appeared in the header. When a name
/// appears more than once, lookups return the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadonlyCookies {
    entries: Vec<(String, String)>,
}

impl ReadonlyCookies {
    /// Parse a `Cookie:` header value (`a=1; b=2`).
    ///
    /// Pairs without a `=` and pairs with an empty name are skipped. Values
    /// may themselves contain `=`; only the first one separates name from value.
    pub fn parse(header: &str) -> Self {
        let entries = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect();
        Self { entries }
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ReadonlyCookies {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_trims_whitespace() {
        let cookies = ReadonlyCookies::parse("theme=dark;  Edgebus-Session=abc123 ; lang=en");
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies.get("theme"), Some("dark"));
        assert_eq!(cookies.get("Edgebus-Session"), Some("abc123"));
        assert_eq!(cookies.get("lang"), Some("en"));
        assert!(cookies.has("lang"));
        assert!(!cookies.has("missing"));
    }

    #[test]
    fn value_may_contain_equals() {
        let cookies = ReadonlyCookies::parse("token=a=b=c");
        assert_eq!(cookies.get("token"), Some("a=b=c"));
    }

    #[test]
    fn skips_malformed_pairs() {
        let cookies = ReadonlyCookies::parse("novalue; =orphan; ok=1;;");
        assert_eq!(cookies.keys().collect::<Vec<_>>(), vec!["ok"]);
    }

    #[test]
    fn empty_header_is_empty_store() {
        let cookies = ReadonlyCookies::parse("");
        assert!(cookies.is_empty());
        assert_eq!(cookies.get("anything"), None);
    }

    #[test]
    fn first_occurrence_wins() {
        let cookies = ReadonlyCookies::parse("id=first; id=second");
        assert_eq!(cookies.get("id"), Some("first"));
        assert_eq!(cookies.values().collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn iterates_in_header_order() {
        let cookies = ReadonlyCookies::parse("b=2; a=1");
        let pairs: Vec<_> = (&cookies).into_iter().collect();
        assert_eq!(pairs, vec![("b", "2"), ("a", "1")]);
    }
}
