//! buildsys::xmlrpc
//!
//! Minimal XML-RPC codec for talking to the build system hub.
//!
//! Requests are rendered directly; responses are read with `quick-xml`
//! into a [`Value`] tree. The hub's `nil` extension (`<nil/>`, `<ex:nil/>`)
//! is understood.

use std::collections::BTreeMap;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Errors from decoding a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum XmlRpcError {
    #[error("fault {code}: {message}")]
    Fault { code: i64, message: String },

    #[error("invalid XML-RPC response: {0}")]
    Invalid(String),
}

/// An XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Member of a struct value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }

    fn write(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::Nil => out.push_str("<nil/>"),
            Value::Bool(b) => {
                out.push_str(if *b { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" })
            }
            Value::Int(i) => out.push_str(&format!("<int>{}</int>", i)),
            Value::Double(d) => out.push_str(&format!("<double>{}</double>", d)),
            Value::Str(s) => {
                out.push_str("<string>");
                out.push_str(&escape(s.as_str()));
                out.push_str("</string>");
            }
            Value::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.write(out);
                }
                out.push_str("</data></array>");
            }
            Value::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    out.push_str("<member><name>");
                    out.push_str(&escape(name.as_str()));
                    out.push_str("</name>");
                    value.write(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
        }
        out.push_str("</value>");
    }
}

/// Render a method call.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        param.write(&mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out
}

/// Decode a method response into its single return value.
///
/// # Errors
///
/// - [`XmlRpcError::Fault`] if the response is a fault
/// - [`XmlRpcError::Invalid`] if the document is not a method response
pub fn decode_response(xml: &str) -> Result<Value, XmlRpcError> {
    let tokens = tokenize(xml)?;
    let mut parser = Parser { tokens, pos: 0 };

    parser.open("methodResponse")?;
    match parser.peek() {
        Some(Token::Open(name)) if name == "fault" => {
            parser.open("fault")?;
            let fault = parser.value()?;
            let code = fault.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
            let message = fault
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            Err(XmlRpcError::Fault { code, message })
        }
        _ => {
            parser.open("params")?;
            parser.open("param")?;
            let value = parser.value()?;
            parser.close("param")?;
            parser.close("params")?;
            parser.close("methodResponse")?;
            Ok(value)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Empty(String),
    Text(String),
}

fn tokenize(xml: &str) -> Result<Vec<Token>, XmlRpcError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let name = |raw: &[u8]| String::from_utf8_lossy(raw).into_owned();
    let mut tokens = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => tokens.push(Token::Open(name(e.local_name().as_ref()))),
            Ok(Event::End(e)) => tokens.push(Token::Close(name(e.local_name().as_ref()))),
            Ok(Event::Empty(e)) => tokens.push(Token::Empty(name(e.local_name().as_ref()))),
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| XmlRpcError::Invalid(e.to_string()))?;
                tokens.push(Token::Text(text.into_owned()));
            }
            Ok(Event::CData(c)) => tokens.push(Token::Text(name(&c.into_inner()))),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(XmlRpcError::Invalid(e.to_string())),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn unexpected(&self, expected: &str) -> XmlRpcError {
        XmlRpcError::Invalid(format!(
            "expected {} at token {}, found {:?}",
            expected,
            self.pos,
            self.tokens.get(self.pos)
        ))
    }

    fn open(&mut self, tag: &str) -> Result<(), XmlRpcError> {
        match self.peek() {
            Some(Token::Open(name)) if name == tag => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected(&format!("<{}>", tag))),
        }
    }

    fn close(&mut self, tag: &str) -> Result<(), XmlRpcError> {
        match self.peek() {
            Some(Token::Close(name)) if name == tag => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected(&format!("</{}>", tag))),
        }
    }

    /// Text content up to `</tag>`; empty if the element has none.
    fn text_until(&mut self, tag: &str) -> Result<String, XmlRpcError> {
        let text = match self.peek() {
            Some(Token::Text(_)) => match self.next() {
                Some(Token::Text(text)) => text,
                _ => String::new(),
            },
            _ => String::new(),
        };
        self.close(tag)?;
        Ok(text)
    }

    fn value(&mut self) -> Result<Value, XmlRpcError> {
        if let Some(Token::Empty(name)) = self.peek() {
            if name == "value" {
                self.pos += 1;
                return Ok(Value::Str(String::new()));
            }
        }
        self.open("value")?;

        let value = match self.next() {
            Some(Token::Text(text)) => {
                self.close("value")?;
                return Ok(Value::Str(text));
            }
            Some(Token::Close(name)) if name == "value" => return Ok(Value::Str(String::new())),
            Some(Token::Empty(name)) => match name.as_str() {
                "nil" => Value::Nil,
                "string" => Value::Str(String::new()),
                "array" => Value::Array(Vec::new()),
                "struct" => Value::Struct(BTreeMap::new()),
                other => return Err(XmlRpcError::Invalid(format!("empty <{}/>", other))),
            },
            Some(Token::Open(name)) => self.typed(&name)?,
            other => {
                return Err(XmlRpcError::Invalid(format!(
                    "unexpected {:?} in <value>",
                    other
                )))
            }
        };

        self.close("value")?;
        Ok(value)
    }

    fn typed(&mut self, tag: &str) -> Result<Value, XmlRpcError> {
        match tag {
            "int" | "i4" | "i8" => {
                let text = self.text_until(tag)?;
                text.trim()
                    .parse()
                    .map(Value::Int)
                    .map_err(|_| XmlRpcError::Invalid(format!("bad integer '{}'", text)))
            }
            "boolean" => {
                let text = self.text_until(tag)?;
                match text.trim() {
                    "1" => Ok(Value::Bool(true)),
                    "0" => Ok(Value::Bool(false)),
                    other => Err(XmlRpcError::Invalid(format!("bad boolean '{}'", other))),
                }
            }
            "double" => {
                let text = self.text_until(tag)?;
                text.trim()
                    .parse()
                    .map(Value::Double)
                    .map_err(|_| XmlRpcError::Invalid(format!("bad double '{}'", text)))
            }
            "string" | "dateTime.iso8601" | "base64" => self.text_until(tag).map(Value::Str),
            "nil" => {
                self.close(tag)?;
                Ok(Value::Nil)
            }
            "array" => {
                let mut items = Vec::new();
                match self.next() {
                    Some(Token::Empty(name)) if name == "data" => {}
                    Some(Token::Open(name)) if name == "data" => {
                        while !matches!(self.peek(), Some(Token::Close(n)) if n == "data") {
                            items.push(self.value()?);
                        }
                        self.close("data")?;
                    }
                    _ => return Err(self.unexpected("<data>")),
                }
                self.close("array")?;
                Ok(Value::Array(items))
            }
            "struct" => {
                let mut members = BTreeMap::new();
                while !matches!(self.peek(), Some(Token::Close(n)) if n == "struct") {
                    self.open("member")?;
                    self.open("name")?;
                    let key = self.text_until("name")?;
                    let value = self.value()?;
                    self.close("member")?;
                    members.insert(key, value);
                }
                self.close("struct")?;
                Ok(Value::Struct(members))
            }
            other => Err(XmlRpcError::Invalid(format!("unknown type <{}>", other))),
        }
    }
}
