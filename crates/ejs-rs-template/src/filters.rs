//! Built-in template filters.
//!
//! Filters are reached from templates through the pipe syntax
//! (`<%=: items | first | upcase %>`) or directly as `filters.name(value, args...)`.
//! Each filter is registered by name in a [`FilterRegistry`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use ejs_rs_core::error::EjsError;

use crate::context::{escape_html, Value};

/// A template filter function.
///
/// Takes a value and optional arguments, and returns a transformed value.
pub trait Filter: Send + Sync {
    /// Returns the filter name.
    fn name(&self) -> &str;

    /// Applies the filter to a value with the given arguments.
    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError>;
}

type FilterFn = dyn Fn(&Value, &[Value]) -> Result<Value, EjsError> + Send + Sync;

/// A filter backed by a closure, created by [`FilterRegistry::register_fn`].
struct FnFilter {
    name: String,
    func: Box<FilterFn>,
}

impl Filter for FnFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        (self.func)(value, args)
    }
}

/// A registry of available template filters.
///
/// Cloning a registry is cheap: filters are shared, so a clone can be extended
/// without affecting the original.
#[derive(Clone)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
    /// Creates a new empty filter registry.
    pub fn new() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Registers a filter, replacing any filter with the same name.
    pub fn register(&mut self, filter: Box<dyn Filter>) {
        self.filters
            .insert(filter.name().to_string(), Arc::from(filter));
    }

    /// Registers a closure as a filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use ejs_rs_template::context::Value;
    /// use ejs_rs_template::filters::FilterRegistry;
    ///
    /// let mut registry = FilterRegistry::new();
    /// registry.register_fn("shout", |v, _| Ok(Value::from(format!("{v}!"))));
    /// let out = registry.apply("shout", &Value::from("hi"), &[]).unwrap();
    /// assert_eq!(out, Value::from("hi!"));
    /// ```
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EjsError> + Send + Sync + 'static,
    {
        let name = name.into();
        self.filters.insert(
            name.clone(),
            Arc::new(FnFilter {
                name,
                func: Box::new(func),
            }),
        );
    }

    /// Returns `true` if a filter with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Applies a named filter to a value.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the filter is unknown or rejects its input.
    pub fn apply(&self, name: &str, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| EjsError::RenderError(format!("Unknown filter: '{name}'")))?;
        filter.apply(value, args)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("FilterRegistry")
            .field("filters", &names)
            .finish()
    }
}

/// Returns the default filter registry with all built-in filters.
pub fn default_registry() -> &'static FilterRegistry {
    static REGISTRY: OnceLock<FilterRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut r = FilterRegistry::new();
        register_all(&mut r);
        r
    })
}

/// Registers all built-in filters.
fn register_all(r: &mut FilterRegistry) {
    // Collection filters
    r.register(Box::new(FirstFilter));
    r.register(Box::new(LastFilter));
    r.register(Box::new(SizeFilter("size")));
    r.register(Box::new(SizeFilter("length")));
    r.register(Box::new(SortFilter));
    r.register(Box::new(SortByFilter));
    r.register(Box::new(JoinFilter));
    r.register(Box::new(MapFilter));
    r.register(Box::new(ReverseFilter));
    r.register(Box::new(GetFilter));

    // String filters
    r.register(Box::new(CapitalizeFilter));
    r.register(Box::new(LowerFilter("downcase")));
    r.register(Box::new(LowerFilter("lower")));
    r.register(Box::new(UpperFilter("upcase")));
    r.register(Box::new(UpperFilter("upper")));
    r.register(Box::new(TruncateFilter));
    r.register(Box::new(TruncateWordsFilter));
    r.register(Box::new(ReplaceFilter));
    r.register(Box::new(PrependFilter));
    r.register(Box::new(AppendFilter));
    r.register(Box::new(JsonFilter));
    r.register(Box::new(EscapeFilter));

    // Arithmetic filters
    r.register(Box::new(ArithmeticFilter("plus")));
    r.register(Box::new(ArithmeticFilter("minus")));
    r.register(Box::new(ArithmeticFilter("times")));
    r.register(Box::new(ArithmeticFilter("divided_by")));
}

/// Returns the first argument, or a render error naming the filter.
fn required_arg<'a>(filter: &str, args: &'a [Value]) -> Result<&'a Value, EjsError> {
    args.first()
        .ok_or_else(|| EjsError::RenderError(format!("Filter '{filter}' requires an argument")))
}

// ============================================================
// Collection filters
// ============================================================

struct FirstFilter;
impl Filter for FirstFilter {
    fn name(&self) -> &str {
        "first"
    }
    fn apply(&self, value: &Value, _args: &[Value]) -> Result<Value, EjsError> {
        match value {
            Value::List(list) => Ok(list.first().cloned().unwrap_or(Value::Null)),
            Value::String(s) => Ok(s
                .chars()
                .next()
                .map_or(Value::Null, |c| Value::String(c.to_string()))),
            _ => Ok(Value::Null),
        }
    }
}

struct LastFilter;
impl Filter for LastFilter {
    fn name(&self) -> &str {
        "last"
    }
    fn apply(&self, value: &Value, _args: &[Value]) -> Result<Value, EjsError> {
        match value {
            Value::List(list) => Ok(list.last().cloned().unwrap_or(Value::Null)),
            Value::String(s) => Ok(s
                .chars()
                .last()
                .map_or(Value::Null, |c| Value::String(c.to_string()))),
            _ => Ok(Value::Null),
        }
    }
}

/// `size` and `length`: the length of a string, list or dict.
struct SizeFilter(&'static str);
impl Filter for SizeFilter {
    fn name(&self) -> &str {
        self.0
    }
    fn apply(&self, value: &Value, _args: &[Value]) -> Result<Value, EjsError> {
        Ok(Value::from(value.len().unwrap_or(0)))
    }
}

/// Orders values: numbers numerically, everything else by display string.
fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a, b) {
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => a
            .as_float()
            .unwrap_or(0.0)
            .total_cmp(&b.as_float().unwrap_or(0.0)),
        _ => a.to_display_string().cmp(&b.to_display_string()),
    }
}

struct SortFilter;
impl Filter for SortFilter {
    fn name(&self) -> &str {
        "sort"
    }
    fn apply(&self, value: &Value, _args: &[Value]) -> Result<Value, EjsError> {
        match value {
            Value::List(list) => {
                let mut sorted = list.clone();
                sorted.sort_by(compare_values);
                Ok(Value::List(sorted))
            }
            _ => Ok(value.clone()),
        }
    }
}

struct SortByFilter;
impl Filter for SortByFilter {
    fn name(&self) -> &str {
        "sort_by"
    }
    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        let key = required_arg(self.name(), args)?.to_display_string();
        match value {
            Value::List(list) => {
                let mut sorted = list.clone();
                sorted.sort_by(|a, b| compare_values(&a.member(&key), &b.member(&key)));
                Ok(Value::List(sorted))
            }
            _ => Ok(value.clone()),
        }
    }
}

struct JoinFilter;
impl Filter for JoinFilter {
    fn name(&self) -> &str {
        "join"
    }
    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        let separator = args
            .first()
            .map_or_else(|| ",".to_string(), Value::to_display_string);
        match value {
            Value::List(list) => {
                let joined = list
                    .iter()
                    .map(Value::to_display_string)
                    .collect::<Vec<_>>()
                    .join(&separator);
                Ok(Value::String(joined))
            }
            _ => Ok(value.clone()),
        }
    }
}

struct MapFilter;
impl Filter for MapFilter {
    fn name(&self) -> &str {
        "map"
    }
    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        let key = required_arg(self.name(), args)?.to_display_string();
        match value {
            Value::List(list) => Ok(Value::List(list.iter().map(|v| v.member(&key)).collect())),
            _ => Ok(Value::Null),
        }
    }
}

struct ReverseFilter;
impl Filter for ReverseFilter {
    fn name(&self) -> &str {
        "reverse"
    }
    fn apply(&self, value: &Value, _args: &[Value]) -> Result<Value, EjsError> {
        match value {
            Value::List(list) => Ok(Value::List(list.iter().rev().cloned().collect())),
            Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
            _ => Ok(value.clone()),
        }
    }
}

struct GetFilter;
impl Filter for GetFilter {
    fn name(&self) -> &str {
        "get"
    }
    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        Ok(value.index(required_arg(self.name(), args)?))
    }
}

// ============================================================
// String filters
// ============================================================

struct CapitalizeFilter;
impl Filter for CapitalizeFilter {
    fn name(&self) -> &str {
        "capitalize"
    }
    fn apply(&self, value: &Value, _args: &[Value]) -> Result<Value, EjsError> {
        let s = value.to_display_string();
        let mut chars = s.chars();
        let result = match chars.next() {
            Some(c) => format!("{}{}", c.to_uppercase(), chars.as_str()),
            None => String::new(),
        };
        Ok(Value::String(result))
    }
}

/// `downcase` and `lower`.
struct LowerFilter(&'static str);
impl Filter for LowerFilter {
    fn name(&self) -> &str {
        self.0
    }
    fn apply(&self, value: &Value, _args: &[Value]) -> Result<Value, EjsError> {
        Ok(Value::String(value.to_display_string().to_lowercase()))
    }
}

/// `upcase` and `upper`.
struct UpperFilter(&'static str);
impl Filter for UpperFilter {
    fn name(&self) -> &str {
        self.0
    }
    fn apply(&self, value: &Value, _args: &[Value]) -> Result<Value, EjsError> {
        Ok(Value::String(value.to_display_string().to_uppercase()))
    }
}

/// `truncate:len[,suffix]` keeps the first `len` characters, appending `suffix`
/// only when something was cut.
struct TruncateFilter;
impl Filter for TruncateFilter {
    fn name(&self) -> &str {
        "truncate"
    }
    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        let s = value.to_display_string();
        let max_len = required_arg(self.name(), args)?
            .as_integer()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        if s.chars().count() <= max_len {
            return Ok(Value::String(s));
        }
        let mut truncated: String = s.chars().take(max_len).collect();
        if let Some(suffix) = args.get(1) {
            truncated.push_str(&suffix.to_display_string());
        }
        Ok(Value::String(truncated))
    }
}

struct TruncateWordsFilter;
impl Filter for TruncateWordsFilter {
    fn name(&self) -> &str {
        "truncate_words"
    }
    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        let s = value.to_display_string();
        let max_words = required_arg(self.name(), args)?
            .as_integer()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        let words: Vec<&str> = s.split(' ').filter(|w| !w.is_empty()).collect();
        Ok(Value::String(
            words.into_iter().take(max_words).collect::<Vec<_>>().join(" "),
        ))
    }
}

/// `replace:pattern,substitution` replaces the first occurrence of `pattern`.
struct ReplaceFilter;
impl Filter for ReplaceFilter {
    fn name(&self) -> &str {
        "replace"
    }
    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        let s = value.to_display_string();
        let pattern = required_arg(self.name(), args)?.to_display_string();
        let substitution = args.get(1).map(Value::to_display_string).unwrap_or_default();
        Ok(Value::String(s.replacen(&pattern, &substitution, 1)))
    }
}

struct PrependFilter;
impl Filter for PrependFilter {
    fn name(&self) -> &str {
        "prepend"
    }
    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        let item = required_arg(self.name(), args)?;
        match value {
            Value::List(list) => {
                let mut out = Vec::with_capacity(list.len() + 1);
                out.push(item.clone());
                out.extend(list.iter().cloned());
                Ok(Value::List(out))
            }
            _ => Ok(Value::String(format!("{item}{value}"))),
        }
    }
}

struct AppendFilter;
impl Filter for AppendFilter {
    fn name(&self) -> &str {
        "append"
    }
    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        let item = required_arg(self.name(), args)?;
        match value {
            Value::List(list) => {
                let mut out = list.clone();
                out.push(item.clone());
                Ok(Value::List(out))
            }
            _ => Ok(Value::String(format!("{value}{item}"))),
        }
    }
}

struct JsonFilter;
impl Filter for JsonFilter {
    fn name(&self) -> &str {
        "json"
    }
    fn apply(&self, value: &Value, _args: &[Value]) -> Result<Value, EjsError> {
        Ok(Value::String(value.to_json().to_string()))
    }
}

struct EscapeFilter;
impl Filter for EscapeFilter {
    fn name(&self) -> &str {
        "escape"
    }
    fn apply(&self, value: &Value, _args: &[Value]) -> Result<Value, EjsError> {
        Ok(Value::String(escape_html(&value.to_display_string())))
    }
}

// ============================================================
// Arithmetic filters
// ============================================================

/// `plus`, `minus`, `times` and `divided_by`. Integer operands stay integral
/// unless the result overflows or a division is inexact.
struct ArithmeticFilter(&'static str);
impl Filter for ArithmeticFilter {
    fn name(&self) -> &str {
        self.0
    }
    fn apply(&self, value: &Value, args: &[Value]) -> Result<Value, EjsError> {
        let rhs = required_arg(self.0, args)?;
        if let (Some(a), Some(b)) = (integral(value), integral(rhs)) {
            let exact = match self.0 {
                "plus" => a.checked_add(b),
                "minus" => a.checked_sub(b),
                "times" => a.checked_mul(b),
                _ if a.checked_rem(b) == Some(0) => a.checked_div(b),
                _ => None,
            };
            if let Some(n) = exact {
                return Ok(Value::Integer(n));
            }
        }
        let (Some(a), Some(b)) = (value.as_float(), rhs.as_float()) else {
            return Err(EjsError::RenderError(format!(
                "Filter '{}' expects numbers, got {} and {}",
                self.0,
                value.type_name(),
                rhs.type_name()
            )));
        };
        Ok(Value::Float(match self.0 {
            "plus" => a + b,
            "minus" => a - b,
            "times" => a * b,
            _ => a / b,
        }))
    }
}

/// Reads a value as an exact integer, accepting integral strings.
fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_filter(name: &str, value: Value, args: Vec<Value>) -> Value {
        default_registry().apply(name, &value, &args).unwrap()
    }

    fn list(items: &[&str]) -> Value {
        Value::from(items.iter().map(|s| Value::from(*s)).collect::<Vec<_>>())
    }

    #[test]
    fn test_first_and_last() {
        assert_eq!(apply_filter("first", list(&["a", "b"]), vec![]), Value::from("a"));
        assert_eq!(apply_filter("last", list(&["a", "b"]), vec![]), Value::from("b"));
        assert_eq!(apply_filter("first", Value::from("xyz"), vec![]), Value::from("x"));
        assert_eq!(apply_filter("last", Value::List(vec![]), vec![]), Value::Null);
    }

    #[test]
    fn test_case_filters() {
        assert_eq!(apply_filter("upcase", Value::from("hi"), vec![]), Value::from("HI"));
        assert_eq!(apply_filter("upper", Value::from("hi"), vec![]), Value::from("HI"));
        assert_eq!(apply_filter("downcase", Value::from("HI"), vec![]), Value::from("hi"));
        assert_eq!(apply_filter("lower", Value::from("HI"), vec![]), Value::from("hi"));
        assert_eq!(
            apply_filter("capitalize", Value::from("hello world"), vec![]),
            Value::from("Hello world")
        );
    }

    #[test]
    fn test_size_and_length() {
        assert_eq!(apply_filter("size", list(&["a", "b", "c"]), vec![]), Value::Integer(3));
        assert_eq!(apply_filter("length", Value::from("four"), vec![]), Value::Integer(4));
        assert_eq!(apply_filter("length", Value::Null, vec![]), Value::Integer(0));
    }

    #[test]
    fn test_sort() {
        let nums = Value::from(vec![3i64, 10, 2]);
        assert_eq!(apply_filter("sort", nums, vec![]), Value::from(vec![2i64, 3, 10]));
        assert_eq!(
            apply_filter("sort", list(&["pear", "apple"]), vec![]),
            list(&["apple", "pear"])
        );
    }

    #[test]
    fn test_sort_by_and_map() {
        let people = Value::from(serde_json::json!([
            {"name": "Tobi", "age": 3},
            {"name": "Loki", "age": 1}
        ]));
        let sorted = apply_filter("sort_by", people, vec![Value::from("age")]);
        let names = apply_filter("map", sorted, vec![Value::from("name")]);
        assert_eq!(names, list(&["Loki", "Tobi"]));
    }

    #[test]
    fn test_join() {
        assert_eq!(
            apply_filter("join", list(&["a", "b"]), vec![Value::from(", ")]),
            Value::from("a, b")
        );
        assert_eq!(apply_filter("join", list(&["a", "b"]), vec![]), Value::from("a,b"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(
            apply_filter("truncate", Value::from("Hello World"), vec![Value::Integer(5)]),
            Value::from("Hello")
        );
        assert_eq!(
            apply_filter(
                "truncate",
                Value::from("Hello World"),
                vec![Value::Integer(5), Value::from("...")]
            ),
            Value::from("Hello...")
        );
        assert_eq!(
            apply_filter("truncate", Value::from("Hi"), vec![Value::Integer(5), Value::from("...")]),
            Value::from("Hi")
        );
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(
            apply_filter("truncate_words", Value::from("one two  three"), vec![Value::Integer(2)]),
            Value::from("one two")
        );
    }

    #[test]
    fn test_replace_first_occurrence() {
        assert_eq!(
            apply_filter(
                "replace",
                Value::from("a:b a:b"),
                vec![Value::from("a:b"), Value::from("c")]
            ),
            Value::from("c a:b")
        );
    }

    #[test]
    fn test_prepend_append() {
        assert_eq!(
            apply_filter("prepend", Value::from("world"), vec![Value::from("hello ")]),
            Value::from("hello world")
        );
        assert_eq!(
            apply_filter("append", list(&["a"]), vec![Value::from("b")]),
            list(&["a", "b"])
        );
    }

    #[test]
    fn test_reverse_and_get() {
        assert_eq!(apply_filter("reverse", list(&["a", "b"]), vec![]), list(&["b", "a"]));
        assert_eq!(apply_filter("reverse", Value::from("abc"), vec![]), Value::from("cba"));
        let user = Value::from(serde_json::json!({"name": "Ann"}));
        assert_eq!(apply_filter("get", user, vec![Value::from("name")]), Value::from("Ann"));
    }

    #[test]
    fn test_json_and_escape() {
        let v = Value::from(serde_json::json!({"a": [1, "x"]}));
        assert_eq!(apply_filter("json", v, vec![]), Value::from(r#"{"a":[1,"x"]}"#));
        assert_eq!(
            apply_filter("escape", Value::from("<a>"), vec![]),
            Value::from("&lt;a&gt;")
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(apply_filter("plus", Value::Integer(2), vec![Value::Integer(3)]), Value::Integer(5));
        assert_eq!(apply_filter("minus", Value::from("10"), vec![Value::Integer(3)]), Value::Integer(7));
        assert_eq!(apply_filter("times", Value::Float(1.5), vec![Value::Integer(2)]), Value::Float(3.0));
        assert_eq!(
            apply_filter("divided_by", Value::Integer(10), vec![Value::Integer(2)]),
            Value::Integer(5)
        );
        assert_eq!(
            apply_filter("divided_by", Value::Integer(7), vec![Value::Integer(2)]),
            Value::Float(3.5)
        );
    }

    #[test]
    fn test_divided_by_overflow_and_zero() {
        assert_eq!(
            apply_filter("divided_by", Value::Integer(i64::MIN), vec![Value::Integer(-1)]),
            Value::Float(9_223_372_036_854_775_808.0)
        );
        assert_eq!(
            apply_filter("divided_by", Value::Integer(1), vec![Value::Integer(0)]),
            Value::Float(f64::INFINITY)
        );
        assert_eq!(
            apply_filter("plus", Value::Integer(i64::MAX), vec![Value::Integer(1)]),
            Value::Float(9_223_372_036_854_775_808.0)
        );
    }

    #[test]
    fn test_arithmetic_rejects_non_numbers() {
        let err = default_registry()
            .apply("plus", &Value::List(vec![]), &[Value::Integer(1)])
            .unwrap_err();
        assert!(err.to_string().contains("expects numbers"));
    }

    #[test]
    fn test_missing_argument() {
        let err = default_registry()
            .apply("truncate", &Value::from("x"), &[])
            .unwrap_err();
        assert!(err.to_string().contains("requires an argument"));
    }

    #[test]
    fn test_unknown_filter() {
        let result = default_registry().apply("nonexistent", &Value::Null, &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_register_fn_on_clone_leaves_default_untouched() {
        let mut registry = default_registry().clone();
        registry.register_fn("double", |v, _| {
            Ok(Value::from(v.as_integer().unwrap_or(0) * 2))
        });
        assert!(registry.contains("double"));
        assert!(registry.contains("first"));
        assert!(!default_registry().contains("double"));
        assert_eq!(
            registry.apply("double", &Value::Integer(21), &[]).unwrap(),
            Value::Integer(42)
        );
    }
}
