use serde_json::Value;
use std::{
    collections::{hash_map::Iter, HashMap},
    fmt::{Display, Write},
};

/// Flat key to string data that a view is rendered with.
///
/// Keys are matched against `{{key}}`, `{|key|}` and `{!key!}` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tags {
    data: HashMap<String, String>,
}

impl Tags {
    /// Create a new, empty [`Tags`].
    ///
    /// # Examples
    ///
    /// ```
    /// use vellum::Tags;
    ///
    /// let tags = Tags::new();
    /// assert!(tags.is_empty());
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Inserts a key-value pair into the [`Tags`].
    ///
    /// If the key already exists, the value is overwritten.
    ///
    /// # Examples
    ///
    /// ```
    /// use vellum::Tags;
    ///
    /// let mut tags = Tags::new();
    /// tags.insert("count", 4);
    ///
    /// assert_eq!(tags.get("count"), Some("4"));
    /// ```
    #[inline]
    pub fn insert<S, T>(&mut self, key: S, value: T)
    where
        S: Into<String>,
        T: Display,
    {
        self.data.insert(key.into(), value.to_string());
    }

    /// Inserts a key-value pair into the [`Tags`].
    ///
    /// Returns the `Tags`, so additional methods may be chained.
    ///
    /// # Examples
    ///
    /// ```
    /// use vellum::Tags;
    ///
    /// let tags = Tags::new().with("name", "taylor").with("age", 30);
    /// assert_eq!(tags.len(), 2);
    /// ```
    #[inline]
    pub fn with<S, T>(mut self, key: S, value: T) -> Self
    where
        S: Into<String>,
        T: Display,
    {
        self.insert(key, value);
        self
    }

    /// Flatten a JSON object into [`Tags`].
    ///
    /// Strings are taken verbatim, `null` becomes an empty string, and any
    /// other value is written as compact text. A value that is not an object
    /// produces empty `Tags`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vellum::Tags;
    /// use serde_json::json;
    ///
    /// let tags = Tags::from_value(&json!({ "name": "taylor", "seen": null, "ids": [1, 2] }));
    ///
    /// assert_eq!(tags.get("name"), Some("taylor"));
    /// assert_eq!(tags.get("seen"), Some(""));
    /// assert_eq!(tags.get("ids"), Some("[1, 2]"));
    /// ```
    pub fn from_value(value: &Value) -> Self {
        let mut tags = Self::new();
        if let Value::Object(object) = value {
            for (key, value) in object {
                tags.data.insert(key.clone(), flatten(value));
            }
        }
        tags
    }

    /// Returns the value corresponding to the key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Returns the number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if no keys are present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over every key-value pair, in arbitrary order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, String, String> {
        self.data.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Tags
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for Tags {
    fn from(data: HashMap<String, String>) -> Self {
        Self { data }
    }
}

/// Return the flat text form of a [`Value`].
fn flatten(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(string) => string.clone(),
        _ => {
            let mut buffer = String::new();
            write_value(&mut buffer, value);
            buffer
        }
    }
}

/// Write the given Value to the buffer.
///
/// Nested strings are written without quotes.
fn write_value(buffer: &mut String, value: &Value) {
    // Writing to a String cannot fail.
    let _ = match value {
        Value::Null => write!(buffer, "null"),
        Value::Bool(bool) => write!(buffer, "{bool}"),
        Value::Number(number) => write!(buffer, "{number}"),
        Value::String(string) => write!(buffer, "{string}"),
        Value::Array(array) => {
            buffer.push('[');
            for (n, item) in array.iter().enumerate() {
                if n > 0 {
                    buffer.push_str(", ");
                }
                write_value(buffer, item);
            }
            write!(buffer, "]")
        }
        Value::Object(object) => {
            buffer.push('{');
            for (n, (key, value)) in object.iter().enumerate() {
                if n > 0 {
                    buffer.push_str(", ");
                }
                let _ = write!(buffer, "{key}: ");
                write_value(buffer, value);
            }
            write!(buffer, "}}")
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert() {
        let mut tags = Tags::new();
        tags.insert("one", "two");

        assert_eq!(tags.get("one"), Some("two"));
        assert_eq!(tags.get("three"), None);
    }

    #[test]
    fn test_insert_fluent() {
        assert!(Tags::new()
            .with("three", "four")
            .get("three")
            .is_some_and(|t| t == "four"))
    }

    #[test]
    fn test_from_value_scalars() {
        let tags = Tags::from_value(&json!({ "n": 1.5, "ok": true }));

        assert_eq!(tags.get("n"), Some("1.5"));
        assert_eq!(tags.get("ok"), Some("true"));
    }

    #[test]
    fn test_from_value_nested() {
        let tags = Tags::from_value(&json!({ "user": { "name": "taylor", "tags": ["a", "b"] } }));

        assert_eq!(tags.get("user"), Some("{name: taylor, tags: [a, b]}"));
    }

    #[test]
    fn test_from_value_not_object() {
        assert!(Tags::from_value(&json!([1, 2])).is_empty());
    }

    #[test]
    fn test_from_iter() {
        let tags: Tags = [("a", "1"), ("b", "2")].into_iter().collect();

        assert_eq!(tags.len(), 2);
    }
}
