use crate::value::Value;
use std::collections::HashMap;

/// Mapping from identifier to value visible at a command call site.
///
/// The dispatcher only ever reads from it; the interpreter owns the mutable
/// copy and hands out snapshots (see [`Value::Bindings`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    vars: HashMap<String, Value>,
}

impl Bindings {
    /// Create an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value bound to `key`, if any.
    pub fn get_var(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Set or override a binding.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<Value>) {
        self.vars.insert(key.into(), val.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Names in sorted order, for stable listings.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_set_and_get_var() {
        let mut env = Bindings::new();

        // initially absent
        assert_eq!(env.get_var("SOME_RANDOM_NAME_12345"), None);

        env.set_var("x", 42);

        assert_eq!(env.get_var("x"), Some(&Value::Int(42)));
        assert!(env.contains("x"));
    }

    #[test]
    fn test_bindings_names_sorted() {
        let env: Bindings = [("b", 1), ("a", 2)].into_iter().collect();
        assert_eq!(env.names(), vec!["a", "b"]);
        assert_eq!(env.len(), 2);
    }
}
