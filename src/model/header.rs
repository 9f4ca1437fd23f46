//! Ordered, case-insensitive header multimap.

/// A header name with every value it was given, in order of appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    /// Name as written in the message (original case).
    pub name: String,
    /// Unfolded raw values, in the order they appeared.
    pub values: Vec<String>,
}

/// Header multimap preserving the position of every occurrence.
///
/// Names compare ASCII case-insensitively. A name may repeat (`Received`
/// usually does) and every occurrence is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one occurrence.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Extend the most recent value (folded continuation line).
    pub(crate) fn append_to_last(&mut self, text: &str) -> bool {
        match self.entries.last_mut() {
            Some((_, value)) => {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(text);
                true
            }
            None => false,
        }
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`, in order.
    pub fn get_all<'a, 'b>(&'a self, name: &'b str) -> impl Iterator<Item = &'a str> + 'b
    where
        'a: 'b,
    {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every `(name, value)` occurrence in original order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Occurrences grouped by name, ordered by each name's first appearance.
    pub fn fields(&self) -> Vec<HeaderField> {
        let mut fields: Vec<HeaderField> = Vec::new();
        for (name, value) in &self.entries {
            match fields
                .iter_mut()
                .find(|f| f.name.eq_ignore_ascii_case(name))
            {
                Some(field) => field.values.push(value.clone()),
                None => fields.push(HeaderField {
                    name: name.clone(),
                    values: vec![value.clone()],
                }),
            }
        }
        fields
    }

    /// Number of occurrences (not distinct names).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut map = HeaderMap::new();
        map.push("Content-Type", "text/plain");
        assert_eq!(map.get("content-type"), Some("text/plain"));
        assert_eq!(map.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(map.get("content-id").is_none());
    }

    #[test]
    fn test_values_outlive_the_queried_name() {
        let mut map = HeaderMap::new();
        map.push("Received", "from a");
        map.push("Subject", "hi");

        let subject = {
            let name = String::from("subject");
            map.get(&name)
        };
        let received: Vec<&str> = {
            let name = String::from("RECEIVED");
            map.get_all(&name).collect()
        };
        assert_eq!(subject, Some("hi"));
        assert_eq!(received, vec!["from a"]);
    }

    #[test]
    fn test_repeated_names_keep_order() {
        let mut map = HeaderMap::new();
        map.push("Received", "from a");
        map.push("Subject", "hi");
        map.push("received", "from b");
        let received: Vec<&str> = map.get_all("Received").collect();
        assert_eq!(received, vec!["from a", "from b"]);

        let fields = map.fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "Received");
        assert_eq!(fields[0].values, vec!["from a", "from b"]);
        assert_eq!(fields[1].name, "Subject");
    }

    #[test]
    fn test_append_to_last_without_entries() {
        let mut map = HeaderMap::new();
        assert!(!map.append_to_last("orphan"));
        map.push("Subject", "part one");
        assert!(map.append_to_last("part two"));
        assert_eq!(map.get("subject"), Some("part one part two"));
    }
}
