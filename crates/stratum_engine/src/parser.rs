//! Parser for the configuration language.
//!
//! Supported subset: blocks with string or bare labels, `name = expr`
//! attributes, string/number/bool/null literals, lists, objects, `var.NAME`
//! and `TYPE.NAME.ATTR` references, `"${var.NAME}"` interpolation and `#`,
//! `//`, `/* */` comments. Newlines are insignificant.

use std::collections::BTreeMap;

use crate::config::{Expr, TemplatePart};
use crate::diagnostics::Diagnostic;
use crate::value::Value;

/// Source position, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub expr: Expr,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: String,
    pub labels: Vec<String>,
    pub body: Body,
    pub pos: Pos,
}

/// Attributes and nested blocks, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    pub attributes: Vec<Attribute>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
enum StrPart {
    Text(String),
    Interp(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(Vec<StrPart>),
    Number(f64),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Equals,
    Colon,
    Comma,
    Dot,
    Eof,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Ident(name) => format!("identifier {name:?}"),
            Tok::Str(_) => "string".into(),
            Tok::Number(n) => format!("number {n}"),
            Tok::LBrace => "'{'".into(),
            Tok::RBrace => "'}'".into(),
            Tok::LBracket => "'['".into(),
            Tok::RBracket => "']'".into(),
            Tok::Equals => "'='".into(),
            Tok::Colon => "':'".into(),
            Tok::Comma => "','".into(),
            Tok::Dot => "'.'".into(),
            Tok::Eof => "end of file".into(),
        }
    }
}

fn error_at(file: &str, pos: Pos, summary: impl Into<String>) -> Diagnostic {
    Diagnostic::error(summary).with_subject(format!("{file}:{}:{}", pos.line, pos.col))
}

struct Lexer<'a> {
    file: &'a str,
    chars: Vec<char>,
    i: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(file: &'a str, source: &str) -> Self {
        Self {
            file,
            chars: source.chars().collect(),
            i: 0,
            line: 1,
            col: 1,
        }
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            col: self.col,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.i).copied()
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.get(self.i + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.i += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) -> Result<(), Diagnostic> {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('#'), _) | (Some('/'), Some('/')) => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.pos();
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_second()) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(error_at(self.file, start, "Unterminated block comment"));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn tokens(mut self) -> Result<Vec<(Tok, Pos)>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let pos = self.pos();
            let Some(c) = self.peek() else {
                tokens.push((Tok::Eof, pos));
                return Ok(tokens);
            };
            let tok = match c {
                '{' | '}' | '[' | ']' | '=' | ':' | ',' | '.' => {
                    self.bump();
                    match c {
                        '{' => Tok::LBrace,
                        '}' => Tok::RBrace,
                        '[' => Tok::LBracket,
                        ']' => Tok::RBracket,
                        '=' => Tok::Equals,
                        ':' => Tok::Colon,
                        ',' => Tok::Comma,
                        _ => Tok::Dot,
                    }
                }
                '"' => self.string(pos)?,
                '-' if self.peek_second().is_some_and(|d| d.is_ascii_digit()) => self.number(pos)?,
                c if c.is_ascii_digit() => self.number(pos)?,
                c if c.is_alphabetic() || c == '_' => self.ident(),
                '<' if self.peek_second() == Some('<') => {
                    return Err(error_at(self.file, pos, "Heredoc strings are not supported"));
                }
                other => {
                    return Err(error_at(self.file, pos, format!("Invalid character {other:?}")));
                }
            };
            tokens.push((tok, pos));
        }
    }

    fn ident(&mut self) -> Tok {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Tok::Ident(name)
    }

    fn number(&mut self, pos: Pos) -> Result<Tok, Diagnostic> {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Tok::Number(n)),
            _ => Err(error_at(self.file, pos, format!("Invalid number literal {text:?}"))
                .with_detail("numbers must be finite")),
        }
    }

    fn string(&mut self, pos: Pos) -> Result<Tok, Diagnostic> {
        self.bump();
        let mut parts = Vec::new();
        let mut text = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(error_at(self.file, pos, "Unterminated string")),
                Some('"') => break,
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        other => {
                            return Err(error_at(
                                self.file,
                                pos,
                                format!("Invalid escape sequence \\{}", other.unwrap_or(' ')),
                            ));
                        }
                    };
                    text.push(escaped);
                }
                Some('$') if self.peek() == Some('$') && self.peek_second() == Some('{') => {
                    self.bump();
                    text.push('$');
                }
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    if !text.is_empty() {
                        parts.push(StrPart::Text(std::mem::take(&mut text)));
                    }
                    let mut inner = String::new();
                    loop {
                        match self.bump() {
                            None | Some('\n') => {
                                return Err(error_at(self.file, pos, "Unterminated interpolation"));
                            }
                            Some('}') => break,
                            Some(c) => inner.push(c),
                        }
                    }
                    parts.push(StrPart::Interp(inner.trim().to_string()));
                }
                Some(c) => text.push(c),
            }
        }
        if !text.is_empty() || parts.is_empty() {
            parts.push(StrPart::Text(text));
        }
        Ok(Tok::Str(parts))
    }
}

struct Parser<'a> {
    file: &'a str,
    tokens: Vec<(Tok, Pos)>,
    i: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Tok {
        &self.tokens[self.i.min(self.tokens.len() - 1)].0
    }

    fn pos(&self) -> Pos {
        self.tokens[self.i.min(self.tokens.len() - 1)].1
    }

    fn next(&mut self) -> (Tok, Pos) {
        let idx = self.i.min(self.tokens.len() - 1);
        self.i += 1;
        self.tokens[idx].clone()
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        error_at(
            self.file,
            self.pos(),
            format!("Expected {expected}, found {}", self.peek().describe()),
        )
    }

    fn body(&mut self, nested: bool) -> Result<Body, Diagnostic> {
        let mut body = Body::default();
        loop {
            match self.peek() {
                Tok::Eof if nested => return Err(self.unexpected("'}' to close the block")),
                Tok::Eof => return Ok(body),
                Tok::RBrace if nested => {
                    self.next();
                    return Ok(body);
                }
                Tok::Ident(name) => {
                    let name = name.clone();
                    let pos = self.pos();
                    self.next();
                    if *self.peek() == Tok::Equals {
                        self.next();
                        let expr = self.expr()?;
                        body.attributes.push(Attribute { name, expr, pos });
                    } else {
                        let labels = self.labels()?;
                        if *self.peek() != Tok::LBrace {
                            return Err(self.unexpected("'=' or a block"));
                        }
                        self.next();
                        let inner = self.body(true)?;
                        body.blocks.push(Block {
                            kind: name,
                            labels,
                            body: inner,
                            pos,
                        });
                    }
                }
                _ => return Err(self.unexpected("an attribute or block")),
            }
        }
    }

    fn labels(&mut self) -> Result<Vec<String>, Diagnostic> {
        let mut labels = Vec::new();
        loop {
            match self.peek().clone() {
                Tok::Str(parts) => {
                    let pos = self.pos();
                    self.next();
                    match parts.as_slice() {
                        [StrPart::Text(text)] => labels.push(text.clone()),
                        _ => return Err(error_at(self.file, pos, "Block labels cannot be interpolated")),
                    }
                }
                Tok::Ident(name) => {
                    self.next();
                    labels.push(name);
                }
                _ => return Ok(labels),
            }
        }
    }

    fn expr(&mut self) -> Result<Expr, Diagnostic> {
        let pos = self.pos();
        match self.next().0 {
            Tok::Str(parts) => self.template(parts, pos),
            Tok::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Tok::Ident(word) => match word.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                _ => self.traversal(word, pos),
            },
            Tok::LBracket => self.list(),
            Tok::LBrace => self.object(),
            _ => {
                self.i -= 1;
                Err(self.unexpected("an expression"))
            }
        }
    }

    fn traversal(&mut self, root: String, pos: Pos) -> Result<Expr, Diagnostic> {
        let mut steps = vec![root];
        while *self.peek() == Tok::Dot {
            self.next();
            match self.next().0 {
                Tok::Ident(step) => steps.push(step),
                _ => {
                    self.i -= 1;
                    return Err(self.unexpected("an attribute name after '.'"));
                }
            }
        }
        reference(&steps).ok_or_else(|| {
            error_at(
                self.file,
                pos,
                format!("Invalid reference {:?}", steps.join(".")),
            )
            .with_detail("expected var.NAME or TYPE.NAME.ATTRIBUTE")
        })
    }

    fn template(&self, parts: Vec<StrPart>, pos: Pos) -> Result<Expr, Diagnostic> {
        let interp = |source: &str| -> Result<String, Diagnostic> {
            let steps: Vec<String> = source.split('.').map(|s| s.trim().to_string()).collect();
            match reference(&steps) {
                Some(Expr::Variable(name)) => Ok(name),
                _ => Err(error_at(self.file, pos, format!("Unsupported interpolation \"${{{source}}}\""))
                    .with_detail("only var.NAME can be interpolated")),
            }
        };

        match parts.as_slice() {
            [StrPart::Text(text)] => Ok(Expr::Literal(Value::String(text.clone()))),
            [StrPart::Interp(source)] => Ok(Expr::Variable(interp(source)?)),
            _ => parts
                .iter()
                .map(|part| match part {
                    StrPart::Text(text) => Ok(TemplatePart::Text(text.clone())),
                    StrPart::Interp(source) => interp(source).map(TemplatePart::Variable),
                })
                .collect::<Result<_, _>>()
                .map(Expr::Template),
        }
    }

    fn list(&mut self) -> Result<Expr, Diagnostic> {
        let mut items = Vec::new();
        loop {
            if *self.peek() == Tok::RBracket {
                self.next();
                return Ok(Expr::List(items));
            }
            items.push(self.expr()?);
            match self.peek() {
                Tok::Comma => {
                    self.next();
                }
                Tok::RBracket => {}
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
    }

    fn object(&mut self) -> Result<Expr, Diagnostic> {
        let mut fields = BTreeMap::new();
        loop {
            let key = match self.peek().clone() {
                Tok::RBrace => {
                    self.next();
                    return Ok(Expr::Object(fields));
                }
                Tok::Ident(name) => name,
                Tok::Str(parts) => match parts.as_slice() {
                    [StrPart::Text(text)] => text.clone(),
                    _ => return Err(self.unexpected("a plain object key")),
                },
                _ => return Err(self.unexpected("an object key")),
            };
            self.next();
            if !matches!(self.peek(), Tok::Equals | Tok::Colon) {
                return Err(self.unexpected("'=' or ':'"));
            }
            self.next();
            let value = self.expr()?;
            fields.insert(key, value);
            if *self.peek() == Tok::Comma {
                self.next();
            }
        }
    }
}

fn reference(steps: &[String]) -> Option<Expr> {
    match steps {
        [root, name] if root == "var" => Some(Expr::Variable(name.clone())),
        [resource_type, name, attribute] if resource_type != "var" => Some(Expr::ResourceAttribute {
            address: format!("{resource_type}.{name}"),
            attribute: attribute.clone(),
        }),
        _ => None,
    }
}

/// Parse one source file. `file` only labels diagnostics.
pub fn parse(file: &str, source: &str) -> Result<Body, Diagnostic> {
    let tokens = Lexer::new(file, source).tokens()?;
    Parser { file, tokens, i: 0 }.body(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blocks_and_attributes() {
        let source = r#"
            # region to deploy to
            variable "region" {
              default = "eu-west-1"
            }

            resource "null_resource" "web" {
              triggers = {
                region = var.region
                name   = "web-${var.region}"
              }
              count_hint = 2 // ignored by the engine
              tags = ["a", "b",]

              provisioner "echo" {
                message = "created"
              }
            }
        "#;

        let body = parse("main.tf", source).unwrap();

        assert_eq!(body.blocks.len(), 2);
        let variable = &body.blocks[0];
        assert_eq!(variable.kind, "variable");
        assert_eq!(variable.labels, vec!["region"]);

        let resource = &body.blocks[1];
        assert_eq!(resource.labels, vec!["null_resource", "web"]);
        assert_eq!(resource.body.attributes.len(), 3);
        assert_eq!(resource.body.blocks[0].kind, "provisioner");

        let Expr::Object(triggers) = &resource.body.attributes[0].expr else {
            panic!("triggers should be an object");
        };
        assert_eq!(triggers["region"], Expr::Variable("region".into()));
        assert_eq!(
            triggers["name"],
            Expr::Template(vec![
                TemplatePart::Text("web-".into()),
                TemplatePart::Variable("region".into()),
            ])
        );
    }

    #[test]
    fn test_parse_resource_reference() {
        let body = parse("main.tf", "output \"id\" { value = null_resource.web.id }").unwrap();

        assert_eq!(
            body.blocks[0].body.attributes[0].expr,
            Expr::ResourceAttribute {
                address: "null_resource.web".into(),
                attribute: "id".into(),
            }
        );
    }

    #[test]
    fn test_parse_error_has_position() {
        let err = parse("main.tf", "resource \"a\" \"b\" {\n  x = \n}").unwrap_err();

        assert_eq!(err.subject.as_deref(), Some("main.tf:3:1"));
        assert!(err.summary.contains("Expected an expression"));
    }

    #[test]
    fn test_parse_unclosed_block() {
        let err = parse("main.tf", "variable \"a\" {").unwrap_err();

        assert!(err.summary.contains("'}'"));
    }

    #[test]
    fn test_parse_rejects_unsupported_interpolation() {
        let err = parse("main.tf", "x = \"${upper(var.a)}\"").unwrap_err();

        assert!(err.summary.contains("Unsupported interpolation"));
    }

    #[test]
    fn test_parse_negative_and_float_numbers() {
        let body = parse("main.tf", "a = -3\nb = 2.5").unwrap();

        assert_eq!(body.attributes[0].expr, Expr::Literal(Value::Number(-3.0)));
        assert_eq!(body.attributes[1].expr, Expr::Literal(Value::Number(2.5)));
    }

    #[test]
    fn test_parse_rejects_overflowing_number() {
        let err = parse("main.tf", "triggers = { x = 1e999 }").unwrap_err();

        assert!(err.summary.starts_with("Invalid number literal"));
        assert_eq!(err.subject.as_deref(), Some("main.tf:1:18"));
    }
}
