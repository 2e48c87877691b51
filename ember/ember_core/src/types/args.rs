//! Root-process argument data.

use serde::{Deserialize, Serialize};

/// Ordered, immutable list of byte-string arguments handed to the root
/// process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgList(Vec<Vec<u8>>);

impl ArgList {
    /// Create an empty argument list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list has no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Argument at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.0.get(index).map(Vec::as_slice)
    }

    /// Iterate over the arguments in order.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(Vec::as_slice)
    }

    /// Lossy UTF-8 view of the arguments, for logging.
    pub fn to_strings_lossy(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|arg| String::from_utf8_lossy(arg).into_owned())
            .collect()
    }
}

impl FromIterator<Vec<u8>> for ArgList {
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Ordered key/value environment passed as the second root argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment(Vec<(String, String)>);

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an entry, keeping insertion order.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_list_order() {
        let args: ArgList = vec![b"-sname".to_vec(), b"node".to_vec()]
            .into_iter()
            .collect();

        assert_eq!(args.len(), 2);
        assert_eq!(args.get(0), Some(&b"-sname"[..]));
        assert_eq!(args.get(1), Some(&b"node"[..]));
        assert_eq!(args.to_strings_lossy(), vec!["-sname", "node"]);
    }

    #[test]
    fn test_environment_lookup() {
        let env = Environment::new().with("HOME", "/root").with("HOME", "/tmp");
        assert_eq!(env.get("HOME"), Some("/root"));
        assert_eq!(env.get("PATH"), None);
        assert_eq!(env.len(), 2);
    }
}
