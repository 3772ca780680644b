//! Interpreter for parsed templates.
//!
//! Executes a [`Program`] against a bindings record. Names resolve through
//! the local frames first (declarations, loop variables, callback parameters),
//! then through the bindings record when scope binding is on. `locals`
//! always names the whole record. `filters.name(...)` calls into the filter
//! registry and `escape(...)` into the template's escape function.
//!
//! With line tracing on, the first failing statement decorates the error with
//! its template line and source window (see [`crate::trace`]).

use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use ejs_rs_core::error::EjsError;

use crate::context::{Context, EscapeFn, Value};
use crate::filters::FilterRegistry;
use crate::parser::{AssignOp, BinaryOp, Expr, Origin, Program, Stmt, StmtKind, UnaryOp};
use crate::trace::annotate;

/// Runs `program` and returns its output.
///
/// # Errors
///
/// Returns `RenderError` (wrapped in `Traced` when `compile_debug` is set) for
/// undefined names, bad operands, unknown filters or methods, and filter
/// failures.
pub fn execute(
    program: &Program,
    bindings: &Context,
    filters: &FilterRegistry,
    escape: &EscapeFn,
    compile_debug: bool,
) -> Result<String, EjsError> {
    let mut interpreter = Interpreter {
        bindings,
        locals: OnceCell::new(),
        filters,
        escape: &**escape,
        scope_binding: program.scope_binding,
        compile_debug,
        origin: &program.origin,
        frames: vec![HashMap::new()],
        out: String::new(),
    };
    interpreter.exec_all(&program.body)?;
    Ok(interpreter.out)
}

fn render_error(message: impl Into<String>) -> EjsError {
    EjsError::RenderError(message.into())
}

struct Interpreter<'p> {
    bindings: &'p Context,
    locals: OnceCell<Value>,
    filters: &'p FilterRegistry,
    escape: &'p (dyn Fn(&str) -> String + Send + Sync),
    scope_binding: bool,
    compile_debug: bool,
    origin: &'p Origin,
    frames: Vec<HashMap<String, Value>>,
    out: String,
}

impl<'p> Interpreter<'p> {
    fn exec_all(&mut self, stmts: &'p [Stmt]) -> Result<(), EjsError> {
        for stmt in stmts {
            self.exec(stmt)?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &'p Stmt) -> Result<(), EjsError> {
        match self.exec_kind(&stmt.kind) {
            Err(e) if self.compile_debug => Err(annotate(
                e,
                &self.origin.source,
                self.origin.filename.as_deref(),
                stmt.line,
            )),
            other => other,
        }
    }

    fn exec_kind(&mut self, kind: &'p StmtKind) -> Result<(), EjsError> {
        match kind {
            StmtKind::Text(text) => self.out.push_str(text),
            StmtKind::Output { expr, escape } => {
                let text = self.eval(expr)?.to_display_string();
                if *escape {
                    self.out.push_str(&(self.escape)(&text));
                } else {
                    self.out.push_str(&text);
                }
            }
            StmtKind::Invoke(program) => {
                let caller = self.origin;
                self.origin = &program.origin;
                self.frames.push(HashMap::new());
                let result = self.exec_all(&program.body);
                self.frames.pop();
                self.origin = caller;
                result?;
            }
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Declare(decls) => {
                for (name, init) in decls {
                    let value = match init {
                        Some(expr) => self.eval(expr)?,
                        None => Value::Null,
                    };
                    self.declare(name, value);
                }
            }
            StmtKind::Assign { target, op, value } => {
                let rhs = self.eval(value)?;
                let new = match op {
                    AssignOp::Set => rhs,
                    AssignOp::Add => binary(BinaryOp::Add, &self.eval(target)?, &rhs)?,
                    AssignOp::Sub => binary(BinaryOp::Sub, &self.eval(target)?, &rhs)?,
                };
                self.assign(target, new)?;
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.is_truthy() {
                    self.exec_all(then)?;
                } else if let Some(otherwise) = otherwise {
                    self.exec_all(otherwise)?;
                }
            }
            StmtKind::ForOf {
                var,
                iterable,
                body,
            } => {
                let items = match self.eval(iterable)? {
                    Value::List(items) => items,
                    Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                    other => return Err(render_error(format!("{} is not iterable", other.type_name()))),
                };
                for item in items {
                    self.declare(var, item);
                    self.exec_all(body)?;
                }
            }
            StmtKind::ForIn { var, object, body } => {
                let keys: Vec<Value> = match self.eval(object)? {
                    Value::Dict(map) => map.into_keys().map(Value::String).collect(),
                    value => (0..value.len().unwrap_or(0))
                        .map(|i| Value::String(i.to_string()))
                        .collect(),
                };
                for key in keys {
                    self.declare(var, key);
                    self.exec_all(body)?;
                }
            }
            StmtKind::ForC {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.exec(init)?;
                }
                loop {
                    if let Some(cond) = cond {
                        if !self.eval(cond)?.is_truthy() {
                            break;
                        }
                    }
                    self.exec_all(body)?;
                    if let Some(update) = update {
                        self.exec(update)?;
                    }
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval(cond)?.is_truthy() {
                    self.exec_all(body)?;
                }
            }
            StmtKind::Block(stmts) => self.exec_all(stmts)?,
        }
        Ok(())
    }

    // -- names --

    fn is_local(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains_key(name))
    }

    fn lookup(&self, name: &str) -> Result<Value, EjsError> {
        if let Some(value) = self.frames.iter().rev().find_map(|frame| frame.get(name)) {
            return Ok(value.clone());
        }
        if self.scope_binding {
            if let Some(value) = self.bindings.get(name) {
                return Ok(value.clone());
            }
        }
        if name == "locals" {
            return Ok(self
                .locals
                .get_or_init(|| self.bindings.to_value())
                .clone());
        }
        Err(render_error(format!("{name} is not defined")))
    }

    fn declare(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    /// Updates the innermost existing binding, or creates a template-level one.
    fn set_var(&mut self, name: &str, value: Value) {
        if let Some(slot) = self
            .frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(name))
        {
            *slot = value;
        } else if let Some(global) = self.frames.first_mut() {
            global.insert(name.to_string(), value);
        }
    }

    fn assign(&mut self, target: &'p Expr, value: Value) -> Result<(), EjsError> {
        let mut path = Vec::new();
        let mut node = target;
        let root = loop {
            match node {
                Expr::Ident(name) => break name,
                Expr::Member { object, name } => {
                    path.push(Value::String(name.clone()));
                    node = object;
                }
                Expr::Index { object, index } => {
                    path.push(self.eval(index)?);
                    node = object;
                }
                _ => return Err(render_error("Invalid assignment target")),
            }
        };
        if path.is_empty() {
            self.set_var(root, value);
            return Ok(());
        }
        path.reverse();
        let mut current = self.lookup(root)?;
        set_path(&mut current, &path, value)?;
        self.set_var(root, current);
        Ok(())
    }

    // -- expressions --

    fn eval(&mut self, expr: &'p Expr) -> Result<Value, EjsError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => self.lookup(name),
            Expr::Array(items) => Ok(Value::List(self.eval_args(items)?)),
            Expr::Object(props) => {
                let mut map = BTreeMap::new();
                for (key, expr) in props {
                    map.insert(key.clone(), self.eval(expr)?);
                }
                Ok(Value::Dict(map))
            }
            Expr::Member { object, name } => {
                let object = self.eval(object)?;
                read_property(&object, &Value::String(name.clone()))
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let key = self.eval(index)?;
                read_property(&object, &key)
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::Function { .. } => Err(render_error(
                "Functions can only be passed as callbacks",
            )),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => match value {
                        Value::Integer(i) => i.checked_neg().map_or(Value::Float(-(i as f64)), Value::Integer),
                        other => Value::Float(-to_number(&other)?),
                    },
                    UnaryOp::Plus => match value {
                        Value::Integer(i) => Value::Integer(i),
                        other => Value::Float(to_number(&other)?),
                    },
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }
            Expr::Logical { and, left, right } => {
                let left = self.eval(left)?;
                if *and == left.is_truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    fn eval_args(&mut self, args: &'p [Expr]) -> Result<Vec<Value>, EjsError> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn call(&mut self, callee: &'p Expr, args: &'p [Expr]) -> Result<Value, EjsError> {
        match callee {
            Expr::Member { object, name }
                if matches!(&**object, Expr::Ident(o) if o == "filters") && !self.is_local("filters") =>
            {
                let mut values = self.eval_args(args)?.into_iter();
                let value = values.next().unwrap_or(Value::Null);
                let rest: Vec<Value> = values.collect();
                self.filters.apply(name, &value, &rest)
            }
            Expr::Ident(name) if name == "escape" && !self.is_local(name) => {
                let value = self.eval_args(args)?.into_iter().next().unwrap_or(Value::Null);
                Ok(Value::String((self.escape)(&value.to_display_string())))
            }
            Expr::Member { object, name } => {
                let target = self.eval(object)?;
                self.call_method(target, name, args)
            }
            Expr::Ident(name) => Err(render_error(format!("{name} is not a function"))),
            _ => Err(render_error("Expression is not a function")),
        }
    }

    fn call_method(&mut self, target: Value, name: &str, args: &'p [Expr]) -> Result<Value, EjsError> {
        if matches!(target, Value::Null) {
            return Err(render_error(format!("Cannot read property '{name}' of null")));
        }
        if name == "forEach" {
            if let Value::List(items) = target {
                return self.for_each(items, args);
            }
        }
        let values = self.eval_args(args)?;
        let arg = |i: usize| values.get(i).cloned().unwrap_or(Value::Null);
        let result = match (&target, name) {
            (Value::String(s), "toUpperCase") => Some(Value::String(s.to_uppercase())),
            (Value::String(s), "toLowerCase") => Some(Value::String(s.to_lowercase())),
            (Value::String(s), "trim") => Some(Value::String(s.trim().to_string())),
            (Value::String(s), "split") => Some(split(s, values.first())),
            (Value::String(s), "indexOf") => {
                let needle = arg(0).to_display_string();
                Some(s.find(&needle).map_or(Value::Integer(-1), |byte| {
                    Value::from(s[..byte].chars().count())
                }))
            }
            (Value::String(s), "replace") => Some(Value::String(s.replacen(
                &arg(0).to_display_string(),
                &arg(1).to_display_string(),
                1,
            ))),
            (Value::String(s), "slice") => {
                let chars: Vec<char> = s.chars().collect();
                let (start, end) = slice_bounds(chars.len(), &values);
                Some(Value::String(chars[start..end].iter().collect()))
            }
            (Value::List(items), "join") => {
                let sep = values
                    .first()
                    .map_or_else(|| ",".to_string(), Value::to_display_string);
                Some(Value::String(
                    items
                        .iter()
                        .map(Value::to_display_string)
                        .collect::<Vec<_>>()
                        .join(&sep),
                ))
            }
            (Value::List(items), "indexOf") => {
                let needle = arg(0);
                Some(
                    items
                        .iter()
                        .position(|item| *item == needle)
                        .map_or(Value::Integer(-1), Value::from),
                )
            }
            (Value::List(items), "slice") => {
                let (start, end) = slice_bounds(items.len(), &values);
                Some(Value::List(items[start..end].to_vec()))
            }
            (Value::List(items), "concat") => {
                let mut out = items.clone();
                for value in &values {
                    match value {
                        Value::List(more) => out.extend(more.iter().cloned()),
                        other => out.push(other.clone()),
                    }
                }
                Some(Value::List(out))
            }
            (Value::Integer(_) | Value::Float(_), "toFixed") => {
                let digits = arg(0)
                    .as_integer()
                    .and_then(|d| usize::try_from(d).ok())
                    .unwrap_or(0)
                    .min(100);
                Some(Value::String(format!("{:.*}", digits, to_number(&target)?)))
            }
            (_, "toString") => Some(Value::String(target.to_display_string())),
            _ => None,
        };
        result.ok_or_else(|| render_error(format!("{}.{name} is not a function", target.type_name())))
    }

    fn for_each(&mut self, items: Vec<Value>, args: &'p [Expr]) -> Result<Value, EjsError> {
        let Some(Expr::Function { params, body }) = args.first() else {
            return Err(render_error("forEach expects a function"));
        };
        for (index, item) in items.into_iter().enumerate() {
            let mut frame = HashMap::new();
            if let Some(param) = params.first() {
                frame.insert(param.clone(), item);
            }
            if let Some(param) = params.get(1) {
                frame.insert(param.clone(), Value::from(index));
            }
            self.frames.push(frame);
            let result = self.exec_all(body);
            self.frames.pop();
            result?;
        }
        Ok(Value::Null)
    }
}

/// Reads `object[key]`, failing on `null` like property access in JavaScript.
fn read_property(object: &Value, key: &Value) -> Result<Value, EjsError> {
    if matches!(object, Value::Null) {
        return Err(render_error(format!(
            "Cannot read property '{}' of null",
            key.to_display_string()
        )));
    }
    Ok(object.index(key))
}

/// Writes `value` at `path` inside `target`, creating missing dict entries.
/// A list grows by at most one element, at its end.
fn set_path(target: &mut Value, path: &[Value], value: Value) -> Result<(), EjsError> {
    let Some((key, rest)) = path.split_first() else {
        *target = value;
        return Ok(());
    };
    match target {
        Value::Dict(map) => {
            let slot = map.entry(key.to_display_string()).or_insert(Value::Null);
            set_path(slot, rest, value)
        }
        Value::List(items) => {
            let index = key
                .as_integer()
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| render_error(format!("Invalid list index '{key}'")))?;
            if index == items.len() {
                items.push(Value::Null);
            }
            let len = items.len();
            let slot = items.get_mut(index).ok_or_else(|| {
                render_error(format!("List index {index} is out of range for length {len}"))
            })?;
            set_path(slot, rest, value)
        }
        other => Err(render_error(format!(
            "Cannot set property '{key}' of {}",
            other.type_name()
        ))),
    }
}

/// Converts a value to a number for arithmetic.
fn to_number(value: &Value) -> Result<f64, EjsError> {
    match value {
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => Ok(s.trim().parse().unwrap_or(f64::NAN)),
        Value::List(_) | Value::Dict(_) => Err(render_error(format!(
            "Cannot use {} as a number",
            value.type_name()
        ))),
        other => Ok(other.as_float().unwrap_or(f64::NAN)),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EjsError> {
    Ok(match op {
        BinaryOp::Add
            if matches!(left, Value::String(_) | Value::List(_) | Value::Dict(_))
                || matches!(right, Value::String(_) | Value::List(_) | Value::Dict(_)) =>
        {
            Value::String(format!("{left}{right}"))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, left, right)?
        }
        BinaryOp::StrictEq => Value::Bool(left == right),
        BinaryOp::StrictNotEq => Value::Bool(left != right),
        BinaryOp::Eq => Value::Bool(loose_eq(left, right)),
        BinaryOp::NotEq => Value::Bool(!loose_eq(left, right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => to_number(left)?.partial_cmp(&to_number(right)?),
            };
            Value::Bool(ordering.is_some_and(|o| match op {
                BinaryOp::Lt => o == Ordering::Less,
                BinaryOp::LtEq => o != Ordering::Greater,
                BinaryOp::Gt => o == Ordering::Greater,
                _ => o != Ordering::Less,
            }))
        }
    })
}

/// Integer arithmetic when exact, floating point otherwise.
fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EjsError> {
    if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
        let exact = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            BinaryOp::Div if a.checked_rem(*b) == Some(0) => a.checked_div(*b),
            BinaryOp::Rem => a.checked_rem(*b),
            _ => None,
        };
        if let Some(n) = exact {
            return Ok(Value::Integer(n));
        }
    }
    let (a, b) = (to_number(left)?, to_number(right)?);
    Ok(Value::Float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
    }))
}

/// `==` semantics: `null` equals only `null`; mixed scalars compare as numbers.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(_), Value::Integer(_) | Value::Float(_) | Value::Bool(_))
        | (Value::Integer(_) | Value::Float(_) | Value::Bool(_), Value::String(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => match (to_number(left), to_number(right)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        },
        _ => left == right,
    }
}

/// `String.prototype.split` for a plain string separator.
fn split(s: &str, separator: Option<&Value>) -> Value {
    match separator.map(Value::to_display_string) {
        None => Value::List(vec![Value::String(s.to_string())]),
        Some(sep) if sep.is_empty() => Value::List(s.chars().map(|c| Value::String(c.to_string())).collect()),
        Some(sep) => Value::List(s.split(&sep).map(Value::from).collect()),
    }
}

/// Resolves `slice(start, end)` arguments, with negative indices counting
/// from the end.
fn slice_bounds(len: usize, args: &[Value]) -> (usize, usize) {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let resolve = |value: Option<&Value>, default: i64| {
        let i = value.and_then(Value::as_integer).unwrap_or(default);
        let i = if i < 0 { (len_i + i).max(0) } else { i.min(len_i) };
        usize::try_from(i).unwrap_or(0)
    };
    let start = resolve(args.first(), 0);
    let end = resolve(args.get(1), len_i);
    (start, end.max(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::default_escape;
    use crate::filters::default_registry;
    use crate::loaders::StringLoader;
    use crate::options::CompileOptions;
    use crate::parser::parse_buffer;
    use crate::scanner::scan;

    fn run_with(source: &str, data: serde_json::Value, options: &CompileOptions) -> Result<String, EjsError> {
        let buffer = scan(source, options, &StringLoader::new())?;
        let program = parse_buffer(&buffer)?;
        let ctx = Context::from_json(data)?;
        execute(&program, &ctx, default_registry(), &default_escape(), options.compile_debug)
    }

    fn run(source: &str, data: serde_json::Value) -> String {
        run_with(source, data, &CompileOptions::default()).unwrap()
    }

    fn run_err(source: &str, data: serde_json::Value) -> EjsError {
        run_with(source, data, &CompileOptions::default()).unwrap_err()
    }

    #[test]
    fn test_escaped_and_raw_output() {
        let data = serde_json::json!({"html": "<b>"});
        assert_eq!(run("<%= html %>|<%- html %>", data), "&lt;b&gt;|<b>");
    }

    #[test]
    fn test_arithmetic_and_concatenation() {
        let out = run(
            "<%= 1 + 2 %> <%= 'a' + 1 %> <%= 7 / 2 %> <%= 6 / 3 %> <%= 7 % 3 %> <%= -n %>",
            serde_json::json!({"n": 4}),
        );
        assert_eq!(out, "3 a1 3.5 2 1 -4");
    }

    #[test]
    fn test_integer_overflow_promotes_to_float() {
        let data = serde_json::json!({"max": i64::MAX, "min": i64::MIN});
        assert_eq!(run("<%= max + 1 %>", data.clone()), "9223372036854775808");
        assert_eq!(run("<%= min - 1 %>", data.clone()), "-9223372036854775808");
        assert_eq!(run("<%= max * 2 %>", data.clone()), "18446744073709551616");
        assert_eq!(run("<%= min / -1 %>", data.clone()), "9223372036854775808");
        assert_eq!(run("<%=: min | divided_by:-1 %>", data.clone()), "9223372036854775808");
        assert_eq!(run("<%= -9223372036854775807 - 1 === min %>", data.clone()), "true");
        assert_eq!(run("<%= min % -1 == 0 %>", data), "true");
    }

    #[test]
    fn test_division_edge_cases() {
        let data = serde_json::json!({});
        assert_eq!(run("<%= 1 / 0 %>", data.clone()), "Infinity");
        assert_eq!(run("<%= -1 / 0 %>", data.clone()), "-Infinity");
        assert_eq!(run("<%= 0 / 0 %>", data.clone()), "NaN");
        assert_eq!(run("<%= 5 % 0 %>", data.clone()), "NaN");
        assert_eq!(run("<%= 6 / -3 %>", data.clone()), "-2");
        assert_eq!(run("<%= 7 / -2 %>", data.clone()), "-3.5");
        assert_eq!(run("<%= -7 % 3 %>", data), "-1");
    }

    #[test]
    fn test_list_index_assignment() {
        let data = serde_json::json!({});
        let out = run("<% var l = [1]; l[0] = 5; l[1] = 6; %><%= l.join(',') %>", data.clone());
        assert_eq!(out, "5,6");

        let err = run_err("<% var l = []; l[9223372036854775807] = 1 %>ok", data.clone());
        assert!(err.to_string().contains("out of range"), "{err}");
        let err = run_err("<% var l = [1]; l[10000000000] = 1 %>ok", data);
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn test_comparisons() {
        let out = run(
            "<%= 1 < 2 %> <%= 'b' > 'a' %> <%= 1 == '1' %> <%= 1 === '1' %> <%= null == 0 %>",
            serde_json::json!({}),
        );
        assert_eq!(out, "true true true false false");
    }

    #[test]
    fn test_if_else() {
        let src = "<% if (user) { %>Hi <%= user.name %><% } else { %>anon<% } %>";
        assert_eq!(run(src, serde_json::json!({"user": {"name": "Ann"}})), "Hi Ann");
        assert_eq!(run(src, serde_json::json!({"user": null})), "anon");
    }

    #[test]
    fn test_for_each_with_index() {
        let src = "<% items.forEach(function(item, i){ %><%= i %>:<%= item %> <% }) %>";
        assert_eq!(run(src, serde_json::json!({"items": ["a", "b"]})), "0:a 1:b ");
    }

    #[test]
    fn test_loops() {
        let data = serde_json::json!({"items": [1, 2], "obj": {"x": 1, "y": 2}});
        assert_eq!(run("<% for (var n of items) { %><%= n %><% } %>", data.clone()), "12");
        assert_eq!(run("<% for (k in obj) { %><%= k %><% } %>", data.clone()), "xy");
        assert_eq!(run("<% for (var i = 0; i < 3; i++) { %><%= i %><% } %>", data.clone()), "012");
        assert_eq!(run("<% var j = 3; while (j > 0) { j -= 1 %><%= j %><% } %>", data), "210");
    }

    #[test]
    fn test_declarations_and_assignment() {
        let src = "<% var o = {a: 1}; o.b = [1]; o.b[1] = 2; var s = 'x'; s += 'y' %><%= o.b.join('-') %><%= s %>";
        assert_eq!(run(src, serde_json::json!({})), "1-2xy");
    }

    #[test]
    fn test_string_methods() {
        let out = run(
            "<%= s.toUpperCase() %>|<%= s.split(' ').join(',') %>|<%= s.indexOf('b') %>|<%= s.slice(-3) %>|<%= s.replace('a', 'A') %>|<%= s.length %>|<%= ' t '.trim() %>",
            serde_json::json!({"s": "a bc a"}),
        );
        assert_eq!(out, "A BC A|a,bc,a|2|c a|A bc a|6|t");
    }

    #[test]
    fn test_list_and_number_methods() {
        let out = run(
            "<%= l.indexOf(2) %>|<%= l.slice(1).join() %>|<%= l.concat([4], 5).length %>|<%= n.toFixed(2) %>|<%= l %>",
            serde_json::json!({"l": [1, 2, 3], "n": 3.14159}),
        );
        assert_eq!(out, "1|2,3|5|3.14|1,2,3");
    }

    #[test]
    fn test_logical_and_conditional() {
        let out = run(
            "<%= name || 'anon' %> <%= name && name.length %> <%= n > 1 ? 'many' : 'one' %>",
            serde_json::json!({"name": "", "n": 2}),
        );
        assert_eq!(out, "anon  many");
    }

    #[test]
    fn test_locals_and_scope_binding() {
        let data = serde_json::json!({"name": "Ann"});
        assert_eq!(run("<%= locals.name %>", data.clone()), "Ann");
        let options = CompileOptions::default().with_scope_binding(false);
        assert_eq!(run_with("<%= locals.name %>", data.clone(), &options).unwrap(), "Ann");
        let err = run_with("<%= name %>", data, &options).unwrap_err();
        assert!(err.root().to_string().contains("name is not defined"));
    }

    #[test]
    fn test_filters_and_escape_calls() {
        let out = run(
            "<%- filters.upcase(name) %> <%- escape('<') %> <%=: items | first | capitalize %>",
            serde_json::json!({"name": "ann", "items": ["bob", "cy"]}),
        );
        assert_eq!(out, "ANN &lt; Bob");
    }

    #[test]
    fn test_unknown_filter_is_render_error() {
        let err = run_err("<%=: x | nope %>", serde_json::json!({"x": 1}));
        assert!(matches!(err.root(), EjsError::RenderError(m) if m.contains("nope")));
    }

    #[test]
    fn test_traced_error_names_line() {
        let src = "one\ntwo\n<%= missing %>\nfour";
        let options = CompileOptions::default().with_filename("views/x.ejs");
        let err = run_with(src, serde_json::json!({}), &options).unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.path(), Some("views/x.ejs"));
        let msg = err.to_string();
        assert!(msg.contains(" >> 3| <%= missing %>"));
        assert!(msg.contains("    4| four"));
        assert!(msg.ends_with("missing is not defined"));
    }

    #[test]
    fn test_error_inside_callback_reports_inner_line() {
        let src = "<% items.forEach(function(item){ %>\n<%= item.name.first %>\n<% }) %>";
        let err = run_err(src, serde_json::json!({"items": [{"name": null}]}));
        assert_eq!(err.line(), Some(2));
        assert!(err.root().to_string().contains("Cannot read property 'first' of null"));
    }

    #[test]
    fn test_untraced_error() {
        let options = CompileOptions::default().with_compile_debug(false);
        let err = run_with("<%= missing %>", serde_json::json!({}), &options).unwrap_err();
        assert!(matches!(err, EjsError::RenderError(_)));
    }

    #[test]
    fn test_unknown_method() {
        let err = run_err("<%= n.nope() %>", serde_json::json!({"n": 1}));
        assert!(err.root().to_string().contains("number.nope is not a function"));
    }

    #[test]
    fn test_slice_bounds() {
        assert_eq!(slice_bounds(5, &[]), (0, 5));
        assert_eq!(slice_bounds(5, &[Value::Integer(-2)]), (3, 5));
        assert_eq!(slice_bounds(5, &[Value::Integer(4), Value::Integer(2)]), (4, 4));
    }
}
