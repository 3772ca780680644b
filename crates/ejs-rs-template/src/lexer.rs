//! Tokenizer for embedded template code.
//!
//! Statement and expression fragments found between the template delimiters
//! are split into [`Token`]s here. The parser interleaves them with the
//! emission tokens ([`TokenKind::Text`], [`TokenKind::OutputStart`], ...)
//! produced while lowering a code buffer, so a control structure may open in
//! one tag and close in another.

use std::sync::Arc;

use ejs_rs_core::error::EjsError;

use crate::parser::Program;

/// Operators and punctuation, longest first so that `===` wins over `==`.
const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "=>", "+=", "-=", "++", "--", "+", "-",
    "*", "/", "%", "<", ">", "!", "=", "(", ")", "[", "]", "{", "}", ",", ".", ":", ";", "?",
];

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// An identifier or keyword.
    Ident(String),
    /// An integer literal.
    Integer(i64),
    /// A floating point literal.
    Float(f64),
    /// A string literal, escapes already decoded.
    Str(String),
    /// An operator or punctuation mark.
    Op(&'static str),
    /// Literal template text to append to the output.
    Text(String),
    /// Start of an output expression; `escape` selects `<%=` over `<%-`.
    OutputStart {
        /// Whether the value is passed through the escape function.
        escape: bool,
    },
    /// End of an output expression.
    OutputEnd,
    /// An included file or inline block, already compiled.
    Invoke(Arc<Program>),
    /// End of input.
    Eof,
}

/// A token with the template line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What was read.
    pub kind: TokenKind,
    /// 1-based line in the template source.
    pub line: usize,
}

impl Token {
    /// Creates a token.
    pub const fn new(kind: TokenKind, line: usize) -> Self {
        Self { kind, line }
    }

    /// Returns `true` if this is the operator `op`.
    pub fn is_op(&self, op: &str) -> bool {
        matches!(&self.kind, TokenKind::Op(o) if *o == op)
    }

    /// Returns `true` if this is the identifier or keyword `word`.
    pub fn is_ident(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(w) if w == word)
    }
}

/// Tokenizes a fragment of embedded code that starts on template line `line`.
///
/// # Errors
///
/// Returns a `TemplateSyntaxError` for unterminated strings or comments and
/// for characters outside the grammar.
pub fn tokenize(code: &str, line: usize) -> Result<Vec<Token>, EjsError> {
    let chars: Vec<char> = code.chars().collect();
    let mut tokens = Vec::new();
    let mut line = line;
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c == '\n' {
            line += 1;
            pos += 1;
            continue;
        }
        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        // Comments
        if c == '/' && chars.get(pos + 1) == Some(&'/') {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }
        if c == '/' && chars.get(pos + 1) == Some(&'*') {
            let start_line = line;
            pos += 2;
            loop {
                match chars.get(pos) {
                    None => {
                        return Err(EjsError::TemplateSyntaxError(format!(
                            "Unterminated comment starting on line {start_line}"
                        )))
                    }
                    Some('*') if chars.get(pos + 1) == Some(&'/') => {
                        pos += 2;
                        break;
                    }
                    Some('\n') => line += 1,
                    Some(_) => {}
                }
                pos += 1;
            }
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(pos + 1).is_some_and(char::is_ascii_digit)) {
            let (kind, next) = read_number(&chars, pos, line)?;
            tokens.push(Token::new(kind, line));
            pos = next;
            continue;
        }

        if c == '"' || c == '\'' {
            let (text, next, lines) = read_string(&chars, pos, line)?;
            tokens.push(Token::new(TokenKind::Str(text), line));
            line += lines;
            pos = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            let start = pos;
            while pos < chars.len()
                && (chars[pos].is_alphanumeric() || chars[pos] == '_' || chars[pos] == '$')
            {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            tokens.push(Token::new(TokenKind::Ident(word), line));
            continue;
        }

        if let Some(op) = OPERATORS
            .iter()
            .find(|op| op.chars().enumerate().all(|(i, oc)| chars.get(pos + i) == Some(&oc)))
        {
            tokens.push(Token::new(TokenKind::Op(*op), line));
            pos += op.len();
            continue;
        }

        return Err(EjsError::TemplateSyntaxError(format!(
            "Unexpected character '{c}' on line {line}"
        )));
    }

    Ok(tokens)
}

/// Reads a number literal starting at `start`.
fn read_number(chars: &[char], start: usize, line: usize) -> Result<(TokenKind, usize), EjsError> {
    let mut pos = start;
    let mut is_float = false;
    while pos < chars.len() {
        let c = chars[pos];
        if c.is_ascii_digit() {
            pos += 1;
        } else if c == '.' && !is_float && chars.get(pos + 1).is_some_and(char::is_ascii_digit) {
            is_float = true;
            pos += 1;
        } else if (c == 'e' || c == 'E')
            && chars
                .get(pos + 1)
                .is_some_and(|n| n.is_ascii_digit() || *n == '-' || *n == '+')
        {
            is_float = true;
            pos += 2;
        } else {
            break;
        }
    }
    let text: String = chars[start..pos].iter().collect();
    let invalid = || EjsError::TemplateSyntaxError(format!("Invalid number '{text}' on line {line}"));
    let kind = if is_float {
        TokenKind::Float(text.parse().map_err(|_| invalid())?)
    } else {
        match text.parse::<i64>() {
            Ok(i) => TokenKind::Integer(i),
            Err(_) => TokenKind::Float(text.parse().map_err(|_| invalid())?),
        }
    };
    Ok((kind, pos))
}

/// Reads a quoted string starting at `start`, returning the decoded text,
/// the position after the closing quote and the number of newlines crossed.
fn read_string(
    chars: &[char],
    start: usize,
    line: usize,
) -> Result<(String, usize, usize), EjsError> {
    let quote = chars[start];
    let mut out = String::new();
    let mut pos = start + 1;
    let mut lines = 0;
    loop {
        let Some(&c) = chars.get(pos) else {
            return Err(EjsError::TemplateSyntaxError(format!(
                "Unterminated string on line {line}"
            )));
        };
        pos += 1;
        match c {
            c if c == quote => return Ok((out, pos, lines)),
            '\\' => {
                let Some(&esc) = chars.get(pos) else {
                    continue;
                };
                pos += 1;
                match esc {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    '\n' => lines += 1,
                    other => out.push(other),
                }
            }
            '\n' => {
                lines += 1;
                out.push('\n');
            }
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(code: &str) -> Vec<TokenKind> {
        tokenize(code, 1).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_identifiers_and_operators() {
        assert_eq!(
            kinds("a === b && !c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Op("==="),
                TokenKind::Ident("b".into()),
                TokenKind::Op("&&"),
                TokenKind::Op("!"),
                TokenKind::Ident("c".into()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 .5 1e3"),
            vec![
                TokenKind::Integer(1),
                TokenKind::Float(2.5),
                TokenKind::Float(0.5),
                TokenKind::Float(1000.0),
            ]
        );
    }

    #[test]
    fn test_member_access_after_integer() {
        assert_eq!(
            kinds("x.length"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Op("."),
                TokenKind::Ident("length".into()),
            ]
        );
    }

    #[test]
    fn test_strings_with_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\nb""#),
            vec![TokenKind::Str("it's".into()), TokenKind::Str("a\nb".into())]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a // rest\n/* block\n */ b"),
            vec![TokenKind::Ident("a".into()), TokenKind::Ident("b".into())]
        );
    }

    #[test]
    fn test_line_tracking() {
        let tokens = tokenize("a\n\nb", 4).unwrap();
        assert_eq!(tokens[0].line, 4);
        assert_eq!(tokens[1].line, 6);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("'abc", 3).unwrap_err();
        assert!(err.to_string().contains("Unterminated string on line 3"));
    }

    #[test]
    fn test_unexpected_character() {
        assert!(tokenize("a # b", 1).is_err());
    }
}
