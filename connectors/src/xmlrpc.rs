//! Minimal XML-RPC codec, just enough to talk to Odoo's external API.
//!
//! Calls are rendered as strings. Responses are read into a small element
//! tree with `quick-xml` and then interpreted as a [`Value`] or a fault.
use std::collections::BTreeMap;
use std::fmt::Write;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::{ConnectorError, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// XML-RPC has no notion of null, services answer `false` instead
    #[must_use]
    pub fn is_falsy(&self) -> bool {
        matches!(self, Value::Bool(false) | Value::Nil | Value::Int(0))
            || self.as_array().is_some_and(<[Value]>::is_empty)
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::Int(i) => {
                let _ = write!(out, "<int>{i}</int>");
            }
            Value::Bool(b) => {
                let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
            }
            Value::Double(d) => {
                let _ = write!(out, "<double>{d}</double>");
            }
            Value::String(s) => {
                let _ = write!(out, "<string>{}</string>", escape(s.as_str()));
            }
            Value::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.write_xml(out);
                }
                out.push_str("</data></array>");
            }
            Value::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    let _ = write!(out, "<member><name>{}</name>", escape(name.as_str()));
                    value.write_xml(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
            Value::Nil => out.push_str("<nil/>"),
        }
        out.push_str("</value>");
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

/// Renders a `methodCall` document
#[must_use]
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from(r#"<?xml version="1.0"?><methodCall><methodName>"#);
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        param.write_xml(&mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn malformed(what: impl Into<String>) -> ConnectorError {
    ConnectorError::MalformedResponse(what.into())
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

fn parse_tree(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = vec![Element::default()];

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(format!("invalid XML: {e}")))?;
        match event {
            Event::Start(start) => stack.push(Element {
                name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                ..Default::default()
            }),
            Event::Empty(empty) => {
                let element = Element {
                    name: String::from_utf8_lossy(empty.name().as_ref()).into_owned(),
                    ..Default::default()
                };
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| malformed("unbalanced XML"))?;
                let parent = stack.last_mut().ok_or_else(|| malformed("unbalanced XML"))?;
                parent.children.push(element);
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&text));
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::GeneralRef(reference) => {
                let name = String::from_utf8_lossy(&reference).into_owned();
                let resolved =
                    resolve_entity(&name).ok_or_else(|| malformed(format!("unknown entity &{name};")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push(resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(malformed("unterminated XML document"));
    }
    stack
        .pop()
        .and_then(|root| root.children.into_iter().next())
        .ok_or_else(|| malformed("empty XML document"))
}

fn parse_number<T: std::str::FromStr>(element: &Element) -> Result<T> {
    element
        .text
        .trim()
        .parse::<T>()
        .map_err(|_| malformed(format!("bad <{}> '{}'", element.name, element.text)))
}

fn decode_value(value: &Element) -> Result<Value> {
    // A bare <value> holds a string
    let Some(typed) = value.children.first() else {
        return Ok(Value::String(value.text.clone()));
    };
    match typed.name.as_str() {
        "int" | "i4" | "i8" => Ok(Value::Int(parse_number(typed)?)),
        "double" => Ok(Value::Double(parse_number(typed)?)),
        "boolean" => Ok(Value::Bool(typed.text.trim() == "1")),
        "string" | "dateTime.iso8601" | "base64" => Ok(Value::String(typed.text.clone())),
        "nil" => Ok(Value::Nil),
        "array" => {
            let data = typed
                .child("data")
                .ok_or_else(|| malformed("array without <data>"))?;
            data.children
                .iter()
                .filter(|c| c.name == "value")
                .map(decode_value)
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member
                    .child("name")
                    .ok_or_else(|| malformed("member without <name>"))?;
                let value = member
                    .child("value")
                    .ok_or_else(|| malformed("member without <value>"))?;
                members.insert(name.text.clone(), decode_value(value)?);
            }
            Ok(Value::Struct(members))
        }
        other => Err(malformed(format!("unknown XML-RPC type <{other}>"))),
    }
}

/// Reads a `methodResponse` document. A `<fault>` becomes
/// [`ConnectorError::RpcFault`].
///
/// # Errors
/// On faults and on documents which are not XML-RPC responses
pub fn decode_response(xml: &str) -> Result<Value> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(malformed(format!("expected <methodResponse>, got <{}>", root.name)));
    }

    if let Some(fault) = root.child("fault") {
        let value = fault
            .child("value")
            .ok_or_else(|| malformed("fault without <value>"))?;
        let members = decode_value(value)?;
        let members = members
            .as_struct()
            .ok_or_else(|| malformed("fault is not a struct"))?;
        let code = members.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
        let message = match members.get("faultString") {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        return Err(ConnectorError::RpcFault { code, message });
    }

    let value = root
        .child("params")
        .and_then(|p| p.child("param"))
        .and_then(|p| p.child("value"))
        .ok_or_else(|| malformed("response without <params>"))?;
    decode_value(value)
}
