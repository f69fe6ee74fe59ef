//! XML-RPC value model and codec
//!
//! Only the subset of the protocol a package index speaks is covered: method
//! calls are encoded to bytes, method responses are decoded from a streamed
//! reader. A `<fault>` response decodes to `QuarryError::XmlRpcFault`.

use std::collections::BTreeMap;
use std::io::BufRead;

use base64::{engine::general_purpose, Engine as _};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::IndexResult;
use quarry_core::error::QuarryError;

/// A single XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Boolean(bool),
    String(String),
    Double(f64),
    /// `dateTime.iso8601`, kept verbatim
    DateTime(String),
    Base64(Vec<u8>),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Member lookup on a struct value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_struct()?.get(key)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Double(_) => "double",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Nil => "nil",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Struct(value)
    }
}

/// Encode a `methodCall` document
pub fn encode_call(method: &str, params: &[Value]) -> Vec<u8> {
    let mut out = String::from("<?xml version='1.0'?>\n<methodCall>\n");
    out.push_str(&format!("<methodName>{}</methodName>\n<params>\n", escape(method)));
    for param in params {
        out.push_str("<param>\n");
        write_value(&mut out, param);
        out.push_str("\n</param>\n");
    }
    out.push_str("</params>\n</methodCall>\n");
    out.into_bytes()
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(n) if i32::try_from(*n).is_ok() => out.push_str(&format!("<int>{}</int>", n)),
        // Apache extension for values outside the i4 range
        Value::Int(n) => out.push_str(&format!("<i8>{}</i8>", n)),
        Value::Boolean(b) => out.push_str(&format!("<boolean>{}</boolean>", u8::from(*b))),
        Value::String(s) => out.push_str(&format!("<string>{}</string>", escape(s.as_str()))),
        Value::Double(d) => out.push_str(&format!("<double>{:?}</double>", d)),
        Value::DateTime(s) => out.push_str(&format!(
            "<dateTime.iso8601>{}</dateTime.iso8601>",
            escape(s.as_str())
        )),
        Value::Base64(bytes) => out.push_str(&format!(
            "<base64>{}</base64>",
            general_purpose::STANDARD.encode(bytes)
        )),
        Value::Array(items) => {
            out.push_str("<array><data>\n");
            for item in items {
                write_value(out, item);
                out.push('\n');
            }
            out.push_str("</data></array>");
        },
        Value::Struct(members) => {
            out.push_str("<struct>\n");
            for (name, member) in members {
                out.push_str(&format!("<member>\n<name>{}</name>\n", escape(name.as_str())));
                write_value(out, member);
                out.push_str("\n</member>\n");
            }
            out.push_str("</struct>");
        },
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

/// Decode a streamed `methodResponse` into its params
pub fn decode_response<R: BufRead>(source: R) -> IndexResult<Vec<Value>> {
    let mut decoder = Decoder::new(source);
    decoder.expect_open("methodResponse")?;

    let params = match decoder.next_significant()? {
        Token::Open(tag) if tag == "params" => {
            let mut params = Vec::new();
            loop {
                match decoder.next_significant()? {
                    Token::Open(tag) if tag == "param" => {
                        params.push(decoder.expect_value()?);
                        decoder.expect_close("param")?;
                    },
                    Token::Close(tag) if tag == "params" => break,
                    other => return Err(unexpected(&other, "<param>")),
                }
            }
            params
        },
        Token::Leaf(tag) if tag == "params" => Vec::new(),
        Token::Open(tag) if tag == "fault" => {
            let fault = decoder.expect_value()?;
            return Err(fault_error(&fault));
        },
        other => return Err(unexpected(&other, "<params> or <fault>")),
    };

    decoder.expect_close("methodResponse")?;
    Ok(params)
}

fn fault_error(fault: &Value) -> QuarryError {
    QuarryError::XmlRpcFault {
        code: fault.get("faultCode").and_then(Value::as_i64).unwrap_or(0),
        message: fault
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or("unknown fault")
            .to_string(),
    }
}

/// Owned view of the XML events the decoder cares about
#[derive(Debug)]
enum Token {
    Open(String),
    Close(String),
    /// Self-closing element such as `<nil/>`
    Leaf(String),
    Text(String),
    Eof,
}

fn unexpected(token: &Token, expected: &str) -> QuarryError {
    let found = match token {
        Token::Open(tag) => format!("<{}>", tag),
        Token::Close(tag) => format!("</{}>", tag),
        Token::Leaf(tag) => format!("<{}/>", tag),
        Token::Text(text) => format!("text {:?}", text),
        Token::Eof => "end of document".to_string(),
    };
    QuarryError::decode(format!("expected {}, found {}", expected, found))
}

struct Decoder<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> Decoder<R> {
    fn new(source: R) -> Self {
        Self {
            reader: Reader::from_reader(source),
            buf: Vec::new(),
        }
    }

    fn next_token(&mut self) -> IndexResult<Token> {
        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| QuarryError::decode(e.to_string()))?;

            let token = match event {
                Event::Start(e) => Token::Open(tag_name(e.local_name().as_ref())),
                Event::End(e) => Token::Close(tag_name(e.local_name().as_ref())),
                Event::Empty(e) => Token::Leaf(tag_name(e.local_name().as_ref())),
                Event::Text(e) => Token::Text(
                    e.unescape()
                        .map_err(|e| QuarryError::decode(e.to_string()))?
                        .into_owned(),
                ),
                Event::CData(e) => {
                    Token::Text(String::from_utf8_lossy(&e.into_inner()).into_owned())
                },
                Event::Eof => Token::Eof,
                // Declarations, comments, processing instructions
                _ => continue,
            };
            return Ok(token);
        }
    }

    /// Next token that is not inter-element whitespace
    fn next_significant(&mut self) -> IndexResult<Token> {
        loop {
            match self.next_token()? {
                Token::Text(text) if text.trim().is_empty() => continue,
                token => return Ok(token),
            }
        }
    }

    fn expect_open(&mut self, name: &str) -> IndexResult<()> {
        match self.next_significant()? {
            Token::Open(tag) if tag == name => Ok(()),
            other => Err(unexpected(&other, &format!("<{}>", name))),
        }
    }

    fn expect_close(&mut self, name: &str) -> IndexResult<()> {
        match self.next_significant()? {
            Token::Close(tag) if tag == name => Ok(()),
            other => Err(unexpected(&other, &format!("</{}>", name))),
        }
    }

    fn expect_value(&mut self) -> IndexResult<Value> {
        match self.next_significant()? {
            Token::Open(tag) if tag == "value" => self.value_body(),
            Token::Leaf(tag) if tag == "value" => Ok(Value::String(String::new())),
            other => Err(unexpected(&other, "<value>")),
        }
    }

    /// Contents of a `<value>` whose start tag was consumed
    fn value_body(&mut self) -> IndexResult<Value> {
        // Untyped content is a string.
        let mut text = String::new();
        loop {
            match self.next_token()? {
                Token::Text(chunk) => text.push_str(&chunk),
                Token::Close(tag) if tag == "value" => return Ok(Value::String(text)),
                Token::Open(tag) => {
                    let value = self.typed(&tag)?;
                    self.expect_close("value")?;
                    return Ok(value);
                },
                Token::Leaf(tag) => {
                    let value = empty_typed(&tag)?;
                    self.expect_close("value")?;
                    return Ok(value);
                },
                other => return Err(unexpected(&other, "a value")),
            }
        }
    }

    fn typed(&mut self, tag: &str) -> IndexResult<Value> {
        match tag {
            "string" => Ok(Value::String(self.text_until(tag)?)),
            "int" | "i4" | "i8" => {
                let text = self.text_until(tag)?;
                text.trim()
                    .parse()
                    .map(Value::Int)
                    .map_err(|_| QuarryError::decode(format!("bad <{}> value {:?}", tag, text)))
            },
            "boolean" => match self.text_until(tag)?.trim() {
                "1" => Ok(Value::Boolean(true)),
                "0" => Ok(Value::Boolean(false)),
                other => Err(QuarryError::decode(format!("bad <boolean> value {:?}", other))),
            },
            "double" => {
                let text = self.text_until(tag)?;
                text.trim()
                    .parse()
                    .map(Value::Double)
                    .map_err(|_| QuarryError::decode(format!("bad <double> value {:?}", text)))
            },
            "dateTime.iso8601" => Ok(Value::DateTime(self.text_until(tag)?.trim().to_string())),
            "base64" => {
                let text: String = self
                    .text_until(tag)?
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                general_purpose::STANDARD
                    .decode(text)
                    .map(Value::Base64)
                    .map_err(|e| QuarryError::decode(format!("bad <base64> value: {}", e)))
            },
            "nil" => {
                self.expect_close("nil")?;
                Ok(Value::Nil)
            },
            "array" => self.array_body(),
            "struct" => self.struct_body(),
            other => Err(QuarryError::decode(format!("unknown value type <{}>", other))),
        }
    }

    /// Character data up to the closing `</tag>`
    fn text_until(&mut self, tag: &str) -> IndexResult<String> {
        let mut text = String::new();
        loop {
            match self.next_token()? {
                Token::Text(chunk) => text.push_str(&chunk),
                Token::Close(name) if name == tag => return Ok(text),
                other => return Err(unexpected(&other, &format!("</{}>", tag))),
            }
        }
    }

    fn array_body(&mut self) -> IndexResult<Value> {
        let mut items = Vec::new();
        match self.next_significant()? {
            Token::Open(tag) if tag == "data" => loop {
                match self.next_significant()? {
                    Token::Open(tag) if tag == "value" => items.push(self.value_body()?),
                    Token::Leaf(tag) if tag == "value" => items.push(Value::String(String::new())),
                    Token::Close(tag) if tag == "data" => break,
                    other => return Err(unexpected(&other, "<value> or </data>")),
                }
            },
            Token::Leaf(tag) if tag == "data" => {},
            other => return Err(unexpected(&other, "<data>")),
        }
        self.expect_close("array")?;
        Ok(Value::Array(items))
    }

    fn struct_body(&mut self) -> IndexResult<Value> {
        let mut members = BTreeMap::new();
        loop {
            match self.next_significant()? {
                Token::Open(tag) if tag == "member" => {
                    self.expect_open("name")?;
                    let name = self.text_until("name")?;
                    let value = self.expect_value()?;
                    self.expect_close("member")?;
                    members.insert(name, value);
                },
                Token::Close(tag) if tag == "struct" => return Ok(Value::Struct(members)),
                other => return Err(unexpected(&other, "<member> or </struct>")),
            }
        }
    }
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Value for a self-closing type element (`<string/>`, `<nil/>`, ...)
fn empty_typed(tag: &str) -> IndexResult<Value> {
    match tag {
        "string" => Ok(Value::String(String::new())),
        "nil" => Ok(Value::Nil),
        "base64" => Ok(Value::Base64(Vec::new())),
        "array" => Ok(Value::Array(Vec::new())),
        "struct" => Ok(Value::Struct(BTreeMap::new())),
        other => Err(QuarryError::decode(format!("empty <{}/> carries no value", other))),
    }
}
