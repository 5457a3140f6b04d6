//! Parsed YAML document model with source marks.
//!
//! The schema compiler needs shared, read-only nodes that know their source
//! line and return an explicit "undefined" for missing lookups, so the
//! saphyr-parser event stream is materialised into a small arena:
//! [`Document`] owns the node records, [`NodeRef`] is a `Copy` handle with
//! the document's lifetime. Anchors and aliases resolve to the same record.
//! Only the first document of a multi-document stream is retained.

use std::collections::HashMap;

use saphyr_parser::{Event, Parser, ScalarStyle, ScanError, Span};

/// Tag kind of a node. `Undefined` is what a missing lookup yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Scalar,
    Sequence,
    Map,
    Undefined,
}

#[derive(Debug)]
enum Value {
    Null,
    /// Textual boolean. Only a plain `true`/`false` spelling lands here;
    /// quoted forms stay scalars and numeric stand-ins are not booleans.
    Bool(String),
    /// Scalar text plus whether the source spelling was plain (unquoted).
    Scalar(String, bool),
    Sequence(Vec<usize>),
    Map(Vec<(usize, usize)>),
}

#[derive(Debug)]
struct NodeData {
    value: Value,
    line: usize,
}

#[derive(Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{0}")]
    Scan(#[from] ScanError),
    #[error("alias at line {line} references an unknown anchor")]
    UnknownAnchor { line: usize },
}

impl Document {
    pub fn parse(text: &str) -> Result<Document, LoadError> {
        let mut builder = Builder::default();
        for item in Parser::new_from_str(text) {
            if builder.done() {
                break;
            }
            let (event, span) = item?;
            builder.event(event, span)?;
        }
        Ok(Document {
            nodes: builder.nodes,
            root: builder.root,
        })
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            doc: self,
            id: self.root.unwrap_or(UNDEFINED),
        }
    }
}

const UNDEFINED: usize = usize::MAX;

enum Frame {
    Sequence(usize),
    Map { id: usize, key: Option<usize> },
}

#[derive(Default)]
struct Builder {
    nodes: Vec<NodeData>,
    stack: Vec<Frame>,
    anchors: HashMap<usize, usize>,
    root: Option<usize>,
}

impl Builder {
    /// The first document is complete; ignore the rest of the stream.
    fn done(&self) -> bool {
        self.root.is_some() && self.stack.is_empty()
    }

    fn event(&mut self, event: Event, span: Span) -> Result<(), LoadError> {
        let line = span.start.line();
        match event {
            Event::Scalar(text, style, anchor, _tag) => {
                let id = self.push(classify_scalar(&text, style), line);
                self.record_anchor(anchor, id);
                self.attach(id);
            }
            Event::SequenceStart(anchor, _tag) => {
                let id = self.push(Value::Sequence(Vec::new()), line);
                self.record_anchor(anchor, id);
                self.stack.push(Frame::Sequence(id));
            }
            Event::SequenceEnd => {
                if let Some(Frame::Sequence(id)) = self.stack.pop() {
                    self.attach(id);
                }
            }
            Event::MappingStart(anchor, _tag) => {
                let id = self.push(Value::Map(Vec::new()), line);
                self.record_anchor(anchor, id);
                self.stack.push(Frame::Map { id, key: None });
            }
            Event::MappingEnd => {
                if let Some(Frame::Map { id, .. }) = self.stack.pop() {
                    self.attach(id);
                }
            }
            Event::Alias(anchor) => {
                let id = *self
                    .anchors
                    .get(&anchor)
                    .ok_or(LoadError::UnknownAnchor { line })?;
                self.attach(id);
            }
            _ => {}
        }
        Ok(())
    }

    fn push(&mut self, value: Value, line: usize) -> usize {
        self.nodes.push(NodeData { value, line });
        self.nodes.len() - 1
    }

    fn record_anchor(&mut self, anchor: usize, id: usize) {
        if anchor != 0 {
            self.anchors.insert(anchor, id);
        }
    }

    fn attach(&mut self, id: usize) {
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(id);
                }
            }
            Some(Frame::Sequence(seq)) => {
                let seq = *seq;
                if let Value::Sequence(items) = &mut self.nodes[seq].value {
                    items.push(id);
                }
            }
            Some(Frame::Map { id: map, key }) => match key.take() {
                None => *key = Some(id),
                Some(k) => {
                    let map = *map;
                    if let Value::Map(pairs) = &mut self.nodes[map].value {
                        pairs.push((k, id));
                    }
                }
            },
        }
    }
}

fn classify_scalar(text: &str, style: ScalarStyle) -> Value {
    let plain = matches!(style, ScalarStyle::Plain);
    if plain {
        match text {
            "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
            "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => {
                return Value::Bool(text.to_string())
            }
            _ => {}
        }
    }
    Value::Scalar(text.to_string(), plain)
}

/// Shared read-only handle into a [`Document`]. Missing lookups yield a
/// handle whose kind is [`Kind::Undefined`] rather than an error.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: usize,
}

impl<'a> NodeRef<'a> {
    fn data(self) -> Option<&'a NodeData> {
        self.doc.nodes.get(self.id)
    }

    fn undefined(self) -> NodeRef<'a> {
        NodeRef {
            doc: self.doc,
            id: UNDEFINED,
        }
    }

    pub fn kind(self) -> Kind {
        match self.data().map(|d| &d.value) {
            None => Kind::Undefined,
            Some(Value::Null) => Kind::Null,
            Some(Value::Bool(_)) => Kind::Bool,
            Some(Value::Scalar(..)) => Kind::Scalar,
            Some(Value::Sequence(_)) => Kind::Sequence,
            Some(Value::Map(_)) => Kind::Map,
        }
    }

    pub fn is_defined(self) -> bool {
        self.kind() != Kind::Undefined
    }

    /// 1-based source line of the node's first token; 0 when undefined.
    pub fn line(self) -> usize {
        self.data().map(|d| d.line).unwrap_or(0)
    }

    /// Scalar text. Empty for containers, nulls and undefined handles.
    pub fn scalar(self) -> &'a str {
        match self.data().map(|d| &d.value) {
            Some(Value::Bool(s)) | Some(Value::Scalar(s, _)) => s,
            _ => "",
        }
    }

    pub fn len(self) -> usize {
        match self.data().map(|d| &d.value) {
            Some(Value::Sequence(items)) => items.len(),
            Some(Value::Map(pairs)) => pairs.len(),
            _ => 0,
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Map lookup by scalar key text; `Undefined` on a miss or a non-map.
    pub fn get(self, key: &str) -> NodeRef<'a> {
        if let Some(Value::Map(pairs)) = self.data().map(|d| &d.value) {
            for &(k, v) in pairs {
                let kref = NodeRef { doc: self.doc, id: k };
                if kref.kind() != Kind::Sequence
                    && kref.kind() != Kind::Map
                    && kref.scalar() == key
                {
                    return NodeRef { doc: self.doc, id: v };
                }
            }
        }
        self.undefined()
    }

    /// Sequence element by position; `Undefined` out of range or non-sequence.
    pub fn at(self, index: usize) -> NodeRef<'a> {
        if let Some(Value::Sequence(items)) = self.data().map(|d| &d.value) {
            if let Some(&id) = items.get(index) {
                return NodeRef { doc: self.doc, id };
            }
        }
        self.undefined()
    }

    /// Key/value pairs of a map, in document order. Empty for non-maps.
    pub fn entries(self) -> impl Iterator<Item = (NodeRef<'a>, NodeRef<'a>)> + 'a {
        let pairs: &'a [(usize, usize)] = match self.data().map(|d| &d.value) {
            Some(Value::Map(pairs)) => pairs,
            _ => &[],
        };
        let doc = self.doc;
        pairs
            .iter()
            .map(move |&(k, v)| (NodeRef { doc, id: k }, NodeRef { doc, id: v }))
    }

    /// Elements of a sequence, in document order. Empty for non-sequences.
    pub fn items(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let items: &'a [usize] = match self.data().map(|d| &d.value) {
            Some(Value::Sequence(items)) => items,
            _ => &[],
        };
        let doc = self.doc;
        items.iter().map(move |&id| NodeRef { doc, id })
    }

    /// Flow-style YAML re-serialisation, used to embed enum values in the
    /// generated source. Plain scalars stay bare so that `a`, `1` and `true`
    /// round-trip as themselves; anything that would re-parse differently is
    /// double-quoted.
    pub fn to_yaml(self) -> String {
        match self.data().map(|d| &d.value) {
            None | Some(Value::Null) => "~".to_string(),
            Some(Value::Bool(s)) => s.clone(),
            Some(Value::Scalar(s, plain)) => {
                if *plain && !needs_quotes(s) {
                    s.clone()
                } else {
                    quote(s)
                }
            }
            Some(Value::Sequence(_)) => {
                let inner: Vec<String> = self.items().map(|n| n.to_yaml()).collect();
                format!("[{}]", inner.join(", "))
            }
            Some(Value::Map(_)) => {
                let inner: Vec<String> = self
                    .entries()
                    .map(|(k, v)| format!("{}: {}", k.to_yaml(), v.to_yaml()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
        }
    }
}

/// A plain scalar still needs quoting in flow context if it carries flow
/// indicators or boundary whitespace.
fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.starts_with(char::is_whitespace)
        || s.ends_with(char::is_whitespace)
        || s.contains(|c| matches!(c, ',' | '[' | ']' | '{' | '}' | ':' | '#' | '"' | '\n'))
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::parse(text).expect("parse failed")
    }

    #[test]
    fn kinds_and_marks() {
        let d = doc("type: object\nrequired:\n  - a\n  - b\nflag: true\nnothing: ~\n");
        let root = d.root();
        assert_eq!(root.kind(), Kind::Map);
        assert_eq!(root.line(), 1);
        assert_eq!(root.get("type").kind(), Kind::Scalar);
        assert_eq!(root.get("type").scalar(), "object");
        let required = root.get("required");
        assert_eq!(required.kind(), Kind::Sequence);
        assert_eq!(required.line(), 3);
        assert_eq!(required.len(), 2);
        assert_eq!(required.at(0).scalar(), "a");
        assert_eq!(required.at(1).line(), 4);
        assert_eq!(root.get("flag").kind(), Kind::Bool);
        assert_eq!(root.get("flag").scalar(), "true");
        assert_eq!(root.get("nothing").kind(), Kind::Null);
    }

    #[test]
    fn missing_lookup_is_undefined() {
        let d = doc("a: 1\n");
        let root = d.root();
        assert!(!root.get("b").is_defined());
        assert_eq!(root.get("b").kind(), Kind::Undefined);
        assert_eq!(root.get("b").get("c").kind(), Kind::Undefined);
        assert_eq!(root.get("a").at(3).kind(), Kind::Undefined);
    }

    #[test]
    fn quoted_booleans_stay_scalars() {
        let d = doc("a: \"true\"\nb: true\n");
        assert_eq!(d.root().get("a").kind(), Kind::Scalar);
        assert_eq!(d.root().get("b").kind(), Kind::Bool);
    }

    #[test]
    fn map_iteration_preserves_document_order() {
        let d = doc("zee: 1\nalpha: 2\nmid: 3\n");
        let keys: Vec<&str> = d.root().entries().map(|(k, _)| k.scalar()).collect();
        assert_eq!(keys, ["zee", "alpha", "mid"]);
    }

    #[test]
    fn aliases_share_one_node() {
        let d = doc("a: &x {k: v}\nb: *x\n");
        let root = d.root();
        assert_eq!(root.get("b").kind(), Kind::Map);
        assert_eq!(root.get("b").get("k").scalar(), "v");
        assert_eq!(root.get("a").line(), root.get("b").line());
    }

    #[test]
    fn unknown_alias_is_an_error() {
        // the parser may reject the alias itself; either way the load fails
        assert!(Document::parse("a: *nope\n").is_err());
    }

    #[test]
    fn empty_input_has_no_root() {
        let d = doc("");
        assert!(!d.root().is_defined());
    }

    #[test]
    fn yaml_forms_round_trip_bare() {
        let d = doc("e:\n  - a\n  - 1\n  - true\n");
        let forms: Vec<String> = d.root().get("e").items().map(|n| n.to_yaml()).collect();
        assert_eq!(forms, ["a", "1", "true"]);
    }

    #[test]
    fn yaml_forms_quote_when_needed() {
        let d = doc("a: \"has, comma\"\nb: \"1\"\nm: {x: 1}\ns: [p, q]\n");
        assert_eq!(d.root().get("a").to_yaml(), "\"has, comma\"");
        // a quoted "1" must not re-parse as a number
        assert_eq!(d.root().get("b").to_yaml(), "\"1\"");
        assert_eq!(d.root().get("m").to_yaml(), "{x: 1}");
        assert_eq!(d.root().get("s").to_yaml(), "[p, q]");
    }
}
