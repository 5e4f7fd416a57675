//! A parser for the message literals used as aggregate option values.

use std::{iter::Peekable, str::CharIndices};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Message {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Field {
    pub name: FieldName,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldName {
    Ident(String),
    Extension(String),
    Any(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldValue {
    Scalar(Scalar),
    ScalarList(Vec<Scalar>),
    Message(Message),
    MessageList(Vec<Message>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar {
    String(Vec<u8>),
    Ident { negative: bool, ident: String },
    Int { negative: bool, value: u64 },
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(u64),
    Float(f64),
    String(Vec<u8>),
    Punct(char),
}

/// Parses the body of a message literal, without the enclosing braces.
pub(crate) fn parse(text: &str) -> Result<Message, String> {
    let mut parser = Parser {
        tokens: tokenize(text)?.into_iter().peekable(),
    };
    let message = parser.parse_message(None)?;
    match parser.tokens.next() {
        None => Ok(message),
        Some(token) => Err(format!("unexpected {}", token)),
    }
}

struct Parser {
    tokens: Peekable<std::vec::IntoIter<Token>>,
}

impl Parser {
    fn parse_message(&mut self, terminator: Option<char>) -> Result<Message, String> {
        let mut fields = Vec::new();
        loop {
            match self.tokens.peek() {
                Some(Token::Ident(_) | Token::Punct('[')) => fields.push(self.parse_field()?),
                Some(Token::Punct(ch)) if Some(*ch) == terminator => break,
                None if terminator.is_none() => break,
                Some(token) => return Err(format!("expected a field name, found {}", token)),
                None => return Err("unexpected end of message literal".to_owned()),
            }
        }
        Ok(Message { fields })
    }

    fn parse_field(&mut self) -> Result<Field, String> {
        let name = self.parse_field_name()?;

        let colon = self.eat(':');
        let value = match self.tokens.peek() {
            Some(Token::Punct('{' | '<')) => FieldValue::Message(self.parse_message_value()?),
            Some(Token::Punct('[')) => {
                if !colon {
                    return Err(format!("expected ':' after field '{}'", name));
                }
                self.tokens.next();
                self.parse_list()?
            }
            Some(_) => {
                if !colon {
                    return Err(format!("expected ':' after field '{}'", name));
                }
                FieldValue::Scalar(self.parse_scalar()?)
            }
            None => return Err("unexpected end of message literal".to_owned()),
        };

        if !self.eat(',') {
            self.eat(';');
        }

        Ok(Field { name, value })
    }

    fn parse_field_name(&mut self) -> Result<FieldName, String> {
        match self.tokens.next() {
            Some(Token::Ident(ident)) => Ok(FieldName::Ident(ident)),
            Some(Token::Punct('[')) => {
                let name = self.parse_full_ident()?;
                if self.eat('/') {
                    let type_name = self.parse_full_ident()?;
                    self.expect(']')?;
                    Ok(FieldName::Any(name, type_name))
                } else {
                    self.expect(']')?;
                    Ok(FieldName::Extension(name))
                }
            }
            Some(token) => Err(format!("expected a field name, found {}", token)),
            None => Err("unexpected end of message literal".to_owned()),
        }
    }

    fn parse_full_ident(&mut self) -> Result<String, String> {
        let mut name = String::new();
        if self.eat('.') {
            name.push('.');
        }
        loop {
            match self.tokens.next() {
                Some(Token::Ident(ident)) => name.push_str(&ident),
                Some(token) => return Err(format!("expected an identifier, found {}", token)),
                None => return Err("unexpected end of message literal".to_owned()),
            }
            if !self.eat('.') {
                return Ok(name);
            }
            name.push('.');
        }
    }

    fn parse_message_value(&mut self) -> Result<Message, String> {
        let terminator = match self.tokens.next() {
            Some(Token::Punct('{')) => '}',
            Some(Token::Punct('<')) => '>',
            _ => return Err("expected '{' or '<'".to_owned()),
        };
        let message = self.parse_message(Some(terminator))?;
        self.expect(terminator)?;
        Ok(message)
    }

    fn parse_list(&mut self) -> Result<FieldValue, String> {
        if self.eat(']') {
            return Ok(FieldValue::ScalarList(Vec::new()));
        }

        let value = if matches!(self.tokens.peek(), Some(Token::Punct('{' | '<'))) {
            let mut messages = vec![self.parse_message_value()?];
            while self.eat(',') {
                messages.push(self.parse_message_value()?);
            }
            FieldValue::MessageList(messages)
        } else {
            let mut scalars = vec![self.parse_scalar()?];
            while self.eat(',') {
                scalars.push(self.parse_scalar()?);
            }
            FieldValue::ScalarList(scalars)
        };
        self.expect(']')?;
        Ok(value)
    }

    fn parse_scalar(&mut self) -> Result<Scalar, String> {
        let negative = self.eat('-');
        match self.tokens.next() {
            Some(Token::String(mut value)) if !negative => {
                while let Some(Token::String(next)) = self.tokens.peek() {
                    value.extend_from_slice(next);
                    self.tokens.next();
                }
                Ok(Scalar::String(value))
            }
            Some(Token::Ident(ident)) => Ok(Scalar::Ident { negative, ident }),
            Some(Token::Int(value)) => Ok(Scalar::Int { negative, value }),
            Some(Token::Float(value)) => Ok(Scalar::Float(if negative { -value } else { value })),
            Some(token) => Err(format!("expected a value, found {}", token)),
            None => Err("unexpected end of message literal".to_owned()),
        }
    }

    fn eat(&mut self, punct: char) -> bool {
        if self.tokens.peek() == Some(&Token::Punct(punct)) {
            self.tokens.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: char) -> Result<(), String> {
        match self.tokens.next() {
            Some(Token::Punct(ch)) if ch == punct => Ok(()),
            Some(token) => Err(format!("expected '{}', found {}", punct, token)),
            None => Err(format!("expected '{}'", punct)),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        match ch {
            _ if ch.is_whitespace() => {
                chars.next();
            }
            '#' => {
                while let Some((_, ch)) = chars.next() {
                    if ch == '\n' {
                        break;
                    }
                }
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let end = take_while(text, &mut chars, |ch| ch.is_ascii_alphanumeric() || ch == '_');
                tokens.push(Token::Ident(text[start..end].to_owned()));
            }
            '0'..='9' => tokens.push(number(text, start, &mut chars)?),
            '.' if matches!(text[start + 1..].chars().next(), Some('0'..='9')) => {
                tokens.push(number(text, start, &mut chars)?)
            }
            '"' | '\'' => {
                chars.next();
                tokens.push(Token::String(string(ch, &mut chars)?));
            }
            '{' | '}' | '<' | '>' | '[' | ']' | ':' | ',' | ';' | '.' | '/' | '-' => {
                chars.next();
                tokens.push(Token::Punct(ch));
            }
            _ => return Err(format!("unexpected character '{}'", ch)),
        }
    }

    Ok(tokens)
}

/// Consumes characters matching `pred`, returning the offset of the first one that doesn't.
fn take_while(
    text: &str,
    chars: &mut Peekable<CharIndices<'_>>,
    pred: impl Fn(char) -> bool,
) -> usize {
    while let Some(&(index, ch)) = chars.peek() {
        if !pred(ch) {
            return index;
        }
        chars.next();
    }
    text.len()
}

fn number(
    text: &str,
    start: usize,
    chars: &mut Peekable<CharIndices<'_>>,
) -> Result<Token, String> {
    let end = take_while(text, chars, |ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '_');
    let end = if text[start..end].ends_with(['e', 'E']) {
        // Exponent sign
        match chars.peek() {
            Some(&(_, '+' | '-')) => {
                chars.next();
                take_while(text, chars, |ch| ch.is_ascii_digit())
            }
            _ => end,
        }
    } else {
        end
    };
    let literal = &text[start..end];

    if let Some(hex) = literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(Token::Int)
            .map_err(|_| format!("invalid integer '{}'", literal));
    }

    let is_float = literal.contains(['.', 'e', 'E']) || literal.ends_with(['f', 'F']);
    if is_float {
        let literal = literal.trim_end_matches(['f', 'F']);
        return literal
            .parse()
            .map(Token::Float)
            .map_err(|_| format!("invalid number '{}'", literal));
    }

    if literal.len() > 1 && literal.starts_with('0') {
        return u64::from_str_radix(&literal[1..], 8)
            .map(Token::Int)
            .map_err(|_| format!("invalid integer '{}'", literal));
    }

    literal
        .parse()
        .map(Token::Int)
        .map_err(|_| format!("invalid integer '{}'", literal))
}

fn string(quote: char, chars: &mut Peekable<CharIndices<'_>>) -> Result<Vec<u8>, String> {
    let mut result = Vec::new();
    loop {
        let ch = match chars.next() {
            Some((_, ch)) if ch == quote => return Ok(result),
            Some((_, '\n')) | None => return Err("unterminated string".to_owned()),
            Some((_, ch)) => ch,
        };

        if ch != '\\' {
            let mut buf = [0; 4];
            result.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        match chars.next().map(|(_, ch)| ch) {
            Some('a') => result.push(0x07),
            Some('b') => result.push(0x08),
            Some('f') => result.push(0x0c),
            Some('n') => result.push(b'\n'),
            Some('r') => result.push(b'\r'),
            Some('t') => result.push(b'\t'),
            Some('v') => result.push(0x0b),
            Some(ch @ ('\\' | '\'' | '"' | '?')) => result.push(ch as u8),
            Some('x' | 'X') => {
                let mut value = 0u32;
                for _ in 0..2 {
                    match chars.peek().and_then(|&(_, ch)| ch.to_digit(16)) {
                        Some(digit) => {
                            value = value * 16 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                result.push(value as u8);
            }
            Some(ch @ '0'..='7') => {
                let mut value = ch.to_digit(8).unwrap_or_default();
                for _ in 0..2 {
                    match chars.peek().and_then(|&(_, ch)| ch.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if value > 0xff {
                    return Err("octal escape out of range".to_owned());
                }
                result.push(value as u8);
            }
            Some(ch) => return Err(format!("invalid escape '\\{}'", ch)),
            None => return Err("unterminated string".to_owned()),
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(ident) => write!(f, "'{}'", ident),
            Token::Int(value) => write!(f, "'{}'", value),
            Token::Float(value) => write!(f, "'{}'", value),
            Token::String(_) => write!(f, "a string"),
            Token::Punct(ch) => write!(f, "'{}'", ch),
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldName::Ident(ident) => f.write_str(ident),
            FieldName::Extension(name) => write!(f, "[{}]", name),
            FieldName::Any(domain, name) => write!(f, "[{}/{}]", domain, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_message() {
        let message = parse("number: 1 full_name: \".foo.bar\" type: 'string' sub { a: -2.5 }").unwrap();
        assert_eq!(
            message,
            Message {
                fields: vec![
                    Field {
                        name: FieldName::Ident("number".to_owned()),
                        value: FieldValue::Scalar(Scalar::Int {
                            negative: false,
                            value: 1
                        }),
                    },
                    Field {
                        name: FieldName::Ident("full_name".to_owned()),
                        value: FieldValue::Scalar(Scalar::String(b".foo.bar".to_vec())),
                    },
                    Field {
                        name: FieldName::Ident("type".to_owned()),
                        value: FieldValue::Scalar(Scalar::String(b"string".to_vec())),
                    },
                    Field {
                        name: FieldName::Ident("sub".to_owned()),
                        value: FieldValue::Message(Message {
                            fields: vec![Field {
                                name: FieldName::Ident("a".to_owned()),
                                value: FieldValue::Scalar(Scalar::Float(-2.5)),
                            }],
                        }),
                    },
                ],
            }
        );
    }

    #[test]
    fn extension_and_lists() {
        let message = parse("[foo.ext]: [1, 0x10, 010] list: [<a: true>, {a: false}];").unwrap();
        assert_eq!(message.fields.len(), 2);
        assert_eq!(message.fields[0].name, FieldName::Extension("foo.ext".to_owned()));
        assert_eq!(
            message.fields[0].value,
            FieldValue::ScalarList(vec![
                Scalar::Int {
                    negative: false,
                    value: 1
                },
                Scalar::Int {
                    negative: false,
                    value: 16
                },
                Scalar::Int {
                    negative: false,
                    value: 8
                },
            ])
        );
        assert!(matches!(&message.fields[1].value, FieldValue::MessageList(list) if list.len() == 2));
    }

    #[test]
    fn string_escapes() {
        let message = parse(r#"s: "a\n\x41\101" "b""#).unwrap();
        assert_eq!(
            message.fields[0].value,
            FieldValue::Scalar(Scalar::String(b"a\nAAb".to_vec()))
        );
    }

    #[test]
    fn errors() {
        assert_eq!(parse("a 1").unwrap_err(), "expected ':' after field 'a'");
        assert_eq!(parse("a: }").unwrap_err(), "expected a value, found '}'");
        assert_eq!(parse("a { b: 1").unwrap_err(), "unexpected end of message literal");
        assert!(parse("a: \"foo").is_err());
    }
}
