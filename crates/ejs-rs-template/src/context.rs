//! Template values and the bindings record.
//!
//! Provides [`Value`], the dynamic value type embedded code operates on, and
//! [`Context`], the caller-supplied name → value record a template is rendered
//! against.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ejs_rs_core::error::EjsError;
use serde::Serialize;

/// A dynamic value produced or consumed by embedded template code.
///
/// The semantics follow the JavaScript flavour of the template language:
/// `null` renders as an empty string, empty collections are truthy, and
/// numbers are either exact integers or floats.
#[derive(Debug, Clone)]
pub enum Value {
    /// The absence of a value (`null` / `undefined`).
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit integer.
    Integer(i64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A string value.
    String(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A key-value mapping, ordered by key.
    Dict(BTreeMap<String, Value>),
}

impl Value {
    /// Returns `true` if this value is truthy.
    ///
    /// - `null` and `false` are falsy
    /// - `0`, `0.0` and `NaN` are falsy
    /// - the empty string is falsy
    /// - everything else, including empty lists and dicts, is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::List(_) | Self::Dict(_) => true,
        }
    }

    /// Converts this value to the string it renders as (without escaping).
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::String(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(Self::to_display_string)
                .collect::<Vec<_>>()
                .join(","),
            Self::Dict(_) => self.to_json().to_string(),
        }
    }

    /// Returns a short name for this value's type, used in error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) | Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Dict(_) => "object",
        }
    }

    /// Reads a named property (`value.name`).
    ///
    /// `length` is available on strings, lists and dicts; dict keys and list
    /// indices resolve to their entries; anything else is `null`.
    pub fn member(&self, name: &str) -> Self {
        match (self, name) {
            (Self::String(s), "length") => Self::from(s.chars().count()),
            (Self::List(l), "length") => Self::from(l.len()),
            (Self::Dict(d), key) => d.get(key).cloned().unwrap_or_else(|| {
                if key == "length" {
                    Self::from(d.len())
                } else {
                    Self::Null
                }
            }),
            (Self::List(l), key) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| l.get(i).cloned())
                .unwrap_or(Self::Null),
            _ => Self::Null,
        }
    }

    /// Reads a computed property (`value[key]`).
    pub fn index(&self, key: &Self) -> Self {
        match (self, key) {
            (Self::List(l), Self::Integer(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| l.get(i).cloned())
                .unwrap_or(Self::Null),
            (Self::String(s), Self::Integer(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map_or(Self::Null, |c| Self::String(c.to_string())),
            (_, key) => self.member(&key.to_display_string()),
        }
    }

    /// Attempts to convert this value to an f64.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(i) => Some(*i as f64),
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            Self::String(s) => s.trim().parse::<f64>().ok(),
            Self::Null => Some(0.0),
            Self::List(_) | Self::Dict(_) => None,
        }
    }

    /// Attempts to convert this value to an i64, truncating floats.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Self::String(s) => s.trim().parse::<i64>().ok(),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Returns the string contents if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the length of a string, list or dict.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::List(l) => Some(l.len()),
            Self::Dict(d) => Some(d.len()),
            _ => None,
        }
    }

    /// Returns `true` if this is an empty string or collection.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|l| l == 0)
    }

    /// Converts this value to JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::json!(i),
            Self::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, Into::into)
            }
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Dict(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Formats a float the way the template language prints numbers:
/// integral values without a fractional part, `NaN`, and `Infinity`.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        f.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            #[allow(clippy::cast_precision_loss)]
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                (*a as f64) == *b
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            _ => false,
        }
    }
}

// -- From implementations --

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        i64::try_from(i).map_or(Self::Null, Self::Integer)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => Self::List(arr.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Dict(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// The bindings record a template is rendered against.
///
/// Every key is reachable from embedded code as `locals.key`. Unless scope
/// binding is disabled at compile time, it is also reachable as a bare name.
///
/// # Examples
///
/// ```
/// use ejs_rs_template::context::{Context, Value};
///
/// let mut ctx = Context::new();
/// ctx.set("name", "World");
/// assert_eq!(ctx.get("name"), Some(&Value::from("World")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    /// Creates a new empty bindings record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if `json` is not an object.
    pub fn from_json(json: serde_json::Value) -> Result<Self, EjsError> {
        match Value::from(json) {
            Value::Dict(values) => Ok(Self { values }),
            other => Err(EjsError::SerializationError(format!(
                "bindings must be an object, got {}",
                other.type_name()
            ))),
        }
    }

    /// Builds a record from any serializable struct or map.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if serialization fails or does not produce an object.
    pub fn from_serialize<T: Serialize>(data: &T) -> Result<Self, EjsError> {
        Self::from_json(serde_json::to_value(data)?)
    }

    /// Sets a binding, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Looks up a binding by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns `true` if a binding with this name exists.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies every binding of `other` into this record, `other` winning on conflicts.
    pub fn merge(&mut self, other: &Self) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }

    /// Returns the whole record as a dict value (what `locals` evaluates to).
    pub fn to_value(&self) -> Value {
        Value::Dict(self.values.clone())
    }
}

/// An escape function applied to `<%= %>` output.
pub type EscapeFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Returns the default escape function, [`escape_html`].
pub fn default_escape() -> EscapeFn {
    Arc::new(escape_html)
}

/// Escapes HTML special characters in a string.
///
/// Replaces `&`, `<`, `>`, `"`, and `'` with their HTML entity equivalents.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from("hi").to_display_string(), "hi");
        assert_eq!(Value::from(42i64).to_display_string(), "42");
        assert_eq!(Value::Float(3.0).to_display_string(), "3");
        assert_eq!(Value::Float(2.5).to_display_string(), "2.5");
        assert_eq!(Value::Float(f64::INFINITY).to_display_string(), "Infinity");
        assert_eq!(Value::Bool(true).to_display_string(), "true");
        assert_eq!(Value::Null.to_display_string(), "");
    }

    #[test]
    fn test_list_display_joins_with_commas() {
        let v = Value::from(vec![Value::from(1i64), Value::Null, Value::from("x")]);
        assert_eq!(v.to_display_string(), "1,,x");
    }

    #[test]
    fn test_dict_display_is_json() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::from(1i64));
        assert_eq!(Value::Dict(map).to_display_string(), r#"{"a":1}"#);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Float(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::List(vec![]).is_truthy());
        assert!(Value::Dict(BTreeMap::new()).is_truthy());
    }

    #[test]
    fn test_equality_crosses_numeric_kinds() {
        assert_eq!(Value::Integer(2), Value::Float(2.0));
        assert_ne!(Value::Integer(2), Value::from("2"));
        assert_eq!(Value::Null, Value::Null);
    }

    #[test]
    fn test_member_access() {
        let v = Value::from(serde_json::json!({"user": {"name": "Ann"}, "tags": ["a", "b"]}));
        assert_eq!(v.member("user").member("name"), Value::from("Ann"));
        assert_eq!(v.member("tags").member("length"), Value::Integer(2));
        assert_eq!(v.member("tags").index(&Value::Integer(1)), Value::from("b"));
        assert_eq!(v.member("missing"), Value::Null);
        assert_eq!(Value::from("héllo").member("length"), Value::Integer(5));
    }

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(Value::from(serde_json::json!(4)), Value::Integer(4));
        assert_eq!(Value::from(serde_json::json!(1.5)), Value::Float(1.5));
    }

    #[test]
    fn test_context_from_json_requires_object() {
        assert!(Context::from_json(serde_json::json!([1, 2])).is_err());
        let ctx = Context::from_json(serde_json::json!({"a": 1})).unwrap();
        assert_eq!(ctx.get("a"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_context_from_serialize() {
        #[derive(Serialize)]
        struct Page {
            title: String,
            count: u32,
        }
        let ctx = Context::from_serialize(&Page {
            title: "Home".into(),
            count: 3,
        })
        .unwrap();
        assert_eq!(ctx.get("title"), Some(&Value::from("Home")));
        assert_eq!(ctx.get("count"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_context_merge_and_to_value() {
        let mut a = Context::new();
        a.set("x", 1i64);
        let mut b = Context::new();
        b.set("x", 2i64);
        b.set("y", true);
        a.merge(&b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.to_value().member("x"), Value::Integer(2));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>bold</b>"), "&lt;b&gt;bold&lt;/b&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("\"q\""), "&quot;q&quot;");
        assert_eq!(escape_html("it's"), "it&#39;s");
    }
}
