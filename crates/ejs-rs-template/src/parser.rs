//! Parser for embedded template code.
//!
//! Lowers a [`CodeBuffer`] into a token stream (code tokens interleaved with
//! emission tokens) and parses it with a recursive-descent parser into a
//! [`Program`]: a list of [`Stmt`]s over [`Expr`] trees that the interpreter
//! executes.

use std::sync::Arc;

use ejs_rs_core::error::EjsError;

use crate::buffer::{CodeBuffer, Fragment};
use crate::context::Value;
use crate::lexer::{tokenize, Token, TokenKind};

/// Where a program came from, used to contextualise render errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    /// The template file, if known.
    pub filename: Option<String>,
    /// The full template source line numbers refer to.
    pub source: Arc<str>,
}

/// A parsed template, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Source of the template.
    pub origin: Origin,
    /// Top-level statements.
    pub body: Vec<Stmt>,
    /// Whether bare names resolve against the bindings record.
    pub scope_binding: bool,
}

/// A statement with the template line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// 1-based template line.
    pub line: usize,
    /// The statement itself.
    pub kind: StmtKind,
}

/// The statement forms of the embedded language.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Append literal text.
    Text(String),
    /// Append the value of an expression, optionally escaped.
    Output {
        /// The value to print.
        expr: Expr,
        /// Whether to pass it through the escape function.
        escape: bool,
    },
    /// Run an included file or inline block and append its output.
    Invoke(Arc<Program>),
    /// Evaluate an expression for its effects.
    Expr(Expr),
    /// `var`/`let`/`const` declarations.
    Declare(Vec<(String, Option<Expr>)>),
    /// `target = value`, `target += value`, `target -= value`.
    Assign {
        /// An identifier, member or index expression.
        target: Expr,
        /// The assignment operator.
        op: AssignOp,
        /// The right-hand side.
        value: Expr,
    },
    /// `if (cond) ... else ...`
    If {
        /// The condition.
        cond: Expr,
        /// Taken when the condition is truthy.
        then: Vec<Stmt>,
        /// Taken otherwise.
        otherwise: Option<Vec<Stmt>>,
    },
    /// `for (x of list)`
    ForOf {
        /// The loop variable.
        var: String,
        /// The iterated value.
        iterable: Expr,
        /// The loop body.
        body: Vec<Stmt>,
    },
    /// `for (key in object)`
    ForIn {
        /// The loop variable.
        var: String,
        /// The object whose keys (or list whose indices) are iterated.
        object: Expr,
        /// The loop body.
        body: Vec<Stmt>,
    },
    /// `for (init; cond; update)`
    ForC {
        /// Runs once before the loop.
        init: Option<Box<Stmt>>,
        /// Checked before each iteration; absent means forever.
        cond: Option<Expr>,
        /// Runs after each iteration.
        update: Option<Box<Stmt>>,
        /// The loop body.
        body: Vec<Stmt>,
    },
    /// `while (cond)`
    While {
        /// The condition.
        cond: Expr,
        /// The loop body.
        body: Vec<Stmt>,
    },
    /// `{ ... }`
    Block(Vec<Stmt>),
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Set,
    /// `+=`
    Add,
    /// `-=`
    Sub,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `+`
    Plus,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// Expressions of the embedded language.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Value),
    /// A bare name.
    Ident(String),
    /// `[a, b]`
    Array(Vec<Expr>),
    /// `{ key: value }`
    Object(Vec<(String, Expr)>),
    /// `object.name`
    Member {
        /// The object.
        object: Box<Expr>,
        /// The property name.
        name: String,
    },
    /// `object[index]`
    Index {
        /// The object.
        object: Box<Expr>,
        /// The computed key.
        index: Box<Expr>,
    },
    /// `callee(args)`
    Call {
        /// The called expression.
        callee: Box<Expr>,
        /// The arguments.
        args: Vec<Expr>,
    },
    /// `function (a, b) { ... }` or `(a, b) => ...`
    Function {
        /// Parameter names.
        params: Vec<String>,
        /// The body.
        body: Arc<Vec<Stmt>>,
    },
    /// A prefix operator.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
    },
    /// An arithmetic or comparison operator.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `&&` (`and == true`) or `||`, short-circuiting.
    Logical {
        /// `true` for `&&`.
        and: bool,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `cond ? then : otherwise`
    Conditional {
        /// The condition.
        cond: Box<Expr>,
        /// Value when truthy.
        then: Box<Expr>,
        /// Value when falsy.
        otherwise: Box<Expr>,
    },
}

/// Parses a scanned code buffer into an executable program.
///
/// Included files and inline blocks are parsed recursively into their own
/// programs, each keeping its own origin.
///
/// # Errors
///
/// Returns a `TemplateSyntaxError` whose message ends with ` in <filename>`,
/// or ` while compiling ejs` when the buffer has no filename.
pub fn parse_buffer(buffer: &CodeBuffer) -> Result<Program, EjsError> {
    let tokens = lower(buffer)?;
    let body = Parser::new(tokens)
        .parse_program()
        .map_err(|e| locate(e, buffer.filename()))?;
    Ok(Program {
        origin: Origin {
            filename: buffer.filename().map(str::to_string),
            source: Arc::clone(buffer.source()),
        },
        body,
        scope_binding: buffer.scope_binding(),
    })
}

/// Appends the compiling file to a syntax error message.
fn locate(err: EjsError, filename: Option<&str>) -> EjsError {
    match err {
        EjsError::TemplateSyntaxError(msg) => EjsError::TemplateSyntaxError(match filename {
            Some(name) => format!("{msg} in {name}"),
            None => format!("{msg} while compiling ejs"),
        }),
        other => other,
    }
}

/// Turns the buffer's fragments into one token stream.
fn lower(buffer: &CodeBuffer) -> Result<Vec<Token>, EjsError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    for fragment in buffer.fragments() {
        match fragment {
            Fragment::Text(text) => tokens.push(Token::new(TokenKind::Text(text.clone()), line)),
            Fragment::Escaped { code, line: l } | Fragment::Raw { code, line: l } => {
                line = *l;
                let escape = matches!(fragment, Fragment::Escaped { .. });
                tokens.push(Token::new(TokenKind::OutputStart { escape }, line));
                tokens.extend(tokenize(code, line).map_err(|e| locate(e, buffer.filename()))?);
                tokens.push(Token::new(TokenKind::OutputEnd, line));
            }
            Fragment::Statement { code, line: l } => {
                line = *l;
                tokens.extend(tokenize(code, line).map_err(|e| locate(e, buffer.filename()))?);
                tokens.push(Token::new(TokenKind::Op(";"), line));
            }
            Fragment::Unit(unit) => {
                let program = parse_buffer(unit)?;
                tokens.push(Token::new(TokenKind::Invoke(Arc::new(program)), line));
            }
        }
    }
    let end = tokens.last().map_or(1, |t| t.line);
    tokens.push(Token::new(TokenKind::Eof, end));
    Ok(tokens)
}

/// Describes a token for error messages.
fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("'{name}'"),
        TokenKind::Integer(i) => format!("'{i}'"),
        TokenKind::Float(f) => format!("'{f}'"),
        TokenKind::Str(s) => format!("string '{s}'"),
        TokenKind::Op(op) => format!("'{op}'"),
        TokenKind::Text(_) => "template text".to_string(),
        TokenKind::OutputStart { .. } => "output tag".to_string(),
        TokenKind::OutputEnd => "end of output tag".to_string(),
        TokenKind::Invoke(_) => "include".to_string(),
        TokenKind::Eof => "end of template".to_string(),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.peek().is_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: &str) -> EjsError {
        let token = self.peek();
        EjsError::TemplateSyntaxError(format!(
            "{message}, found {} on line {}",
            describe(&token.kind),
            token.line
        ))
    }

    fn expect_op(&mut self, op: &str) -> Result<(), EjsError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected '{op}'")))
        }
    }

    fn expect_ident(&mut self) -> Result<String, EjsError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("Expected identifier")),
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>, EjsError> {
        let mut body = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            if let Some(stmt) = self.parse_statement()? {
                body.push(stmt);
            }
        }
        Ok(body)
    }

    /// Parses one statement; `None` for an empty statement.
    fn parse_statement(&mut self) -> Result<Option<Stmt>, EjsError> {
        let token = self.peek().clone();
        let line = token.line;
        let kind = match token.kind {
            TokenKind::Op(";") => {
                self.advance();
                return Ok(None);
            }
            TokenKind::Text(text) => {
                self.advance();
                StmtKind::Text(text)
            }
            TokenKind::OutputStart { escape } => {
                self.advance();
                let expr = self.parse_expression()?;
                if self.peek().kind != TokenKind::OutputEnd {
                    return Err(self.error("Expected end of output tag"));
                }
                self.advance();
                StmtKind::Output { expr, escape }
            }
            TokenKind::Invoke(program) => {
                self.advance();
                StmtKind::Invoke(program)
            }
            TokenKind::Op("{") => {
                self.advance();
                StmtKind::Block(self.parse_block_rest()?)
            }
            TokenKind::Ident(word) => match word.as_str() {
                "if" => self.parse_if()?,
                "for" => self.parse_for()?,
                "while" => {
                    self.advance();
                    self.expect_op("(")?;
                    let cond = self.parse_expression()?;
                    self.expect_op(")")?;
                    let body = self.parse_body()?;
                    StmtKind::While { cond, body }
                }
                _ => {
                    let kind = self.parse_simple()?;
                    self.eat_op(";");
                    kind
                }
            },
            _ => {
                let kind = self.parse_simple()?;
                self.eat_op(";");
                kind
            }
        };
        Ok(Some(Stmt { line, kind }))
    }

    /// Parses statements up to and including the closing `}`.
    fn parse_block_rest(&mut self) -> Result<Vec<Stmt>, EjsError> {
        let mut body = Vec::new();
        loop {
            if self.eat_op("}") {
                return Ok(body);
            }
            if self.peek().kind == TokenKind::Eof {
                return Err(self.error("Expected '}'"));
            }
            if let Some(stmt) = self.parse_statement()? {
                body.push(stmt);
            }
        }
    }

    /// Parses the body of a control structure: a block or a single statement.
    fn parse_body(&mut self) -> Result<Vec<Stmt>, EjsError> {
        if self.eat_op("{") {
            return self.parse_block_rest();
        }
        Ok(self.parse_statement()?.into_iter().collect())
    }

    fn parse_if(&mut self) -> Result<StmtKind, EjsError> {
        self.advance();
        self.expect_op("(")?;
        let cond = self.parse_expression()?;
        self.expect_op(")")?;
        let then = self.parse_body()?;
        let otherwise = if self.peek().is_ident("else") {
            self.advance();
            Some(self.parse_body()?)
        } else {
            None
        };
        Ok(StmtKind::If {
            cond,
            then,
            otherwise,
        })
    }

    fn parse_for(&mut self) -> Result<StmtKind, EjsError> {
        self.advance();
        self.expect_op("(")?;

        let declares = ["var", "let", "const"]
            .iter()
            .any(|kw| self.peek().is_ident(kw));
        let name_offset = usize::from(declares);
        if let TokenKind::Ident(var) = &self.peek_at(name_offset).kind {
            let keyword = self.peek_at(name_offset + 1);
            if keyword.is_ident("of") || keyword.is_ident("in") {
                let var = var.clone();
                let is_of = keyword.is_ident("of");
                self.pos += name_offset + 2;
                let iterable = self.parse_expression()?;
                self.expect_op(")")?;
                let body = self.parse_body()?;
                return Ok(if is_of {
                    StmtKind::ForOf {
                        var,
                        iterable,
                        body,
                    }
                } else {
                    StmtKind::ForIn {
                        var,
                        object: iterable,
                        body,
                    }
                });
            }
        }

        let init = if self.peek().is_op(";") {
            None
        } else {
            let line = self.peek().line;
            Some(Box::new(Stmt {
                line,
                kind: self.parse_simple()?,
            }))
        };
        self.expect_op(";")?;
        let cond = if self.peek().is_op(";") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_op(";")?;
        let update = if self.peek().is_op(")") {
            None
        } else {
            let line = self.peek().line;
            Some(Box::new(Stmt {
                line,
                kind: self.parse_simple()?,
            }))
        };
        self.expect_op(")")?;
        let body = self.parse_body()?;
        Ok(StmtKind::ForC {
            init,
            cond,
            update,
            body,
        })
    }

    /// Parses a declaration, assignment, increment or expression statement
    /// without its trailing `;`.
    fn parse_simple(&mut self) -> Result<StmtKind, EjsError> {
        if ["var", "let", "const"].iter().any(|kw| self.peek().is_ident(kw)) {
            self.advance();
            let mut decls = Vec::new();
            loop {
                let name = self.expect_ident()?;
                let init = if self.eat_op("=") {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                decls.push((name, init));
                if !self.eat_op(",") {
                    break;
                }
            }
            return Ok(StmtKind::Declare(decls));
        }

        for (prefix, op) in [("++", AssignOp::Add), ("--", AssignOp::Sub)] {
            if self.eat_op(prefix) {
                let target = self.parse_unary()?;
                return self.increment(target, op);
            }
        }

        let expr = self.parse_expression()?;
        let op = match &self.peek().kind {
            TokenKind::Op("=") => Some(AssignOp::Set),
            TokenKind::Op("+=") => Some(AssignOp::Add),
            TokenKind::Op("-=") => Some(AssignOp::Sub),
            TokenKind::Op("++") => {
                self.advance();
                return self.increment(expr, AssignOp::Add);
            }
            TokenKind::Op("--") => {
                self.advance();
                return self.increment(expr, AssignOp::Sub);
            }
            _ => None,
        };
        match op {
            Some(op) => {
                Self::check_target(&expr).map_err(|msg| self.error(msg))?;
                self.advance();
                let value = self.parse_expression()?;
                Ok(StmtKind::Assign {
                    target: expr,
                    op,
                    value,
                })
            }
            None => Ok(StmtKind::Expr(expr)),
        }
    }

    fn increment(&self, target: Expr, op: AssignOp) -> Result<StmtKind, EjsError> {
        Self::check_target(&target).map_err(|msg| self.error(msg))?;
        Ok(StmtKind::Assign {
            target,
            op,
            value: Expr::Literal(Value::Integer(1)),
        })
    }

    fn check_target(expr: &Expr) -> Result<(), &'static str> {
        match expr {
            Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. } => Ok(()),
            _ => Err("Invalid assignment target"),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, EjsError> {
        let cond = self.parse_or()?;
        if !self.eat_op("?") {
            return Ok(cond);
        }
        let then = self.parse_expression()?;
        self.expect_op(":")?;
        let otherwise = self.parse_expression()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, EjsError> {
        let mut left = self.parse_and()?;
        while self.eat_op("||") {
            let right = self.parse_and()?;
            left = Expr::Logical {
                and: false,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EjsError> {
        let mut left = self.parse_equality()?;
        while self.eat_op("&&") {
            let right = self.parse_equality()?;
            left = Expr::Logical {
                and: true,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Parses a left-associative chain of the given operators.
    fn parse_binary(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, EjsError>,
    ) -> Result<Expr, EjsError> {
        let mut left = next(self)?;
        'chain: loop {
            for (text, op) in ops {
                if self.eat_op(text) {
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'chain;
                }
            }
            return Ok(left);
        }
    }

    fn parse_equality(&mut self) -> Result<Expr, EjsError> {
        self.parse_binary(
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNotEq),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::NotEq),
            ],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, EjsError> {
        self.parse_binary(
            &[
                ("<=", BinaryOp::LtEq),
                (">=", BinaryOp::GtEq),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, EjsError> {
        self.parse_binary(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EjsError> {
        self.parse_binary(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, EjsError> {
        let op = match &self.peek().kind {
            TokenKind::Op("!") => UnaryOp::Not,
            TokenKind::Op("-") => UnaryOp::Neg,
            TokenKind::Op("+") => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, EjsError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_op(".") {
                let name = self.expect_ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    name,
                };
            } else if self.eat_op("[") {
                let index = self.parse_expression()?;
                self.expect_op("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat_op("(") {
                let args = self.parse_list(")", Self::parse_expression)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parses comma-separated items up to and including `close`.
    fn parse_list<T>(
        &mut self,
        close: &str,
        item: fn(&mut Self) -> Result<T, EjsError>,
    ) -> Result<Vec<T>, EjsError> {
        let mut items = Vec::new();
        while !self.eat_op(close) {
            items.push(item(self)?);
            if !self.eat_op(",") {
                self.expect_op(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr, EjsError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Integer(i) => {
                self.advance();
                Ok(Expr::Literal(Value::Integer(i)))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::Literal(Value::Float(f)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            TokenKind::Op("[") => {
                self.advance();
                Ok(Expr::Array(self.parse_list("]", Self::parse_expression)?))
            }
            TokenKind::Op("{") => {
                self.advance();
                Ok(Expr::Object(self.parse_list("}", Self::parse_property)?))
            }
            TokenKind::Op("(") => {
                if self.arrow_ahead() {
                    self.advance();
                    let params = self.parse_list(")", Self::expect_ident)?;
                    return self.parse_arrow_body(params);
                }
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_op(")")?;
                Ok(expr)
            }
            TokenKind::Ident(name) => {
                self.advance();
                match name.as_str() {
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                    "function" => {
                        if matches!(self.peek().kind, TokenKind::Ident(_)) {
                            self.advance();
                        }
                        self.expect_op("(")?;
                        let params = self.parse_list(")", Self::expect_ident)?;
                        self.expect_op("{")?;
                        let body = self.parse_block_rest()?;
                        Ok(Expr::Function {
                            params,
                            body: Arc::new(body),
                        })
                    }
                    _ if self.peek().is_op("=>") => self.parse_arrow_body(vec![name]),
                    _ => Ok(Expr::Ident(name)),
                }
            }
            _ => Err(self.error("Unexpected token")),
        }
    }

    fn parse_property(&mut self) -> Result<(String, Expr), EjsError> {
        let key = match &self.peek().kind {
            TokenKind::Ident(k) | TokenKind::Str(k) => k.clone(),
            TokenKind::Integer(i) => i.to_string(),
            _ => return Err(self.error("Expected property name")),
        };
        self.advance();
        self.expect_op(":")?;
        Ok((key, self.parse_expression()?))
    }

    /// Checks whether the `(` at the cursor opens an arrow function's parameters.
    fn arrow_ahead(&self) -> bool {
        let mut offset = 1;
        loop {
            let token = self.peek_at(offset);
            match &token.kind {
                TokenKind::Op(")") => return self.peek_at(offset + 1).is_op("=>"),
                TokenKind::Ident(_) | TokenKind::Op(",") => offset += 1,
                _ => return false,
            }
        }
    }

    fn parse_arrow_body(&mut self, params: Vec<String>) -> Result<Expr, EjsError> {
        self.expect_op("=>")?;
        let body = if self.eat_op("{") {
            self.parse_block_rest()?
        } else {
            let line = self.peek().line;
            vec![Stmt {
                line,
                kind: StmtKind::Expr(self.parse_expression()?),
            }]
        };
        Ok(Expr::Function {
            params,
            body: Arc::new(body),
        })
    }
}
