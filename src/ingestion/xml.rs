//! XML row source.
//!
//! The document is parsed into a small owned element tree. Records are the elements selected by
//! [`XmlOptions::record_path`]. Columns are the caller's explicit [`XmlColumn`]s, followed (when
//! [`XmlOptions::infer_columns`] is on) by the distinct child tags of the first
//! [`XmlOptions::sample_size`] records, in first-seen order.
//!
//! Path expressions are a small XPath subset:
//!
//! - `a/b` is relative to the record element, `/a/b` starts at the document, `//a/b` matches `a`
//!   anywhere
//! - a step is an element name (namespace prefix ignored), `*`, or `.`
//! - the last step may be `@attr` or `text()`

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};

use crate::error::{ReaderError, ReaderResult};
use crate::reader::{Reader, ReaderOptions, RowSource};
use crate::types::Value;

/// Default number of records examined when inferring columns.
pub const DEFAULT_XML_SAMPLE_SIZE: usize = 10;

/// A caller-declared XML column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlColumn {
    /// Column name, used as-is.
    pub name: String,
    /// Path expression relative to the record element; defaults to the child element `name`.
    pub path: Option<String>,
}

impl XmlColumn {
    /// Column read from the child element of the same name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    /// Column read from a custom path expression.
    pub fn with_path(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
        }
    }
}

/// Options for XML documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlOptions {
    /// Path selecting record elements (default `/*/*`: every child of the document element).
    pub record_path: String,
    /// Explicit columns; always placed before inferred ones.
    pub columns: Vec<XmlColumn>,
    /// Add a column for every unclaimed child tag seen in the sampled records.
    pub infer_columns: bool,
    /// Number of records sampled for inference.
    pub sample_size: usize,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            record_path: "/*/*".to_string(),
            columns: Vec::new(),
            infer_columns: true,
            sample_size: DEFAULT_XML_SAMPLE_SIZE,
        }
    }
}

/// One parsed element: local name, attributes, direct text, and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local name (namespace prefix removed).
    pub name: String,
    /// Attributes by local name, in document order.
    pub attributes: Vec<(String, String)>,
    /// Concatenated direct text content.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Attribute value by local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn descendants<'a>(&'a self, out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            out.push(child);
            child.descendants(out);
        }
    }
}

/// Parse a document. The returned node is a nameless document node whose only child is the
/// document element.
pub fn parse_document(input: &str) -> ReaderResult<XmlElement> {
    let mut reader = quick_xml::Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = vec![XmlElement::default()];
    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(element_from(&e)?),
            Event::Empty(e) => {
                let el = element_from(&e)?;
                attach(&mut stack, el)?;
            }
            Event::End(_) => {
                let el = stack.pop().filter(|_| !stack.is_empty()).ok_or_else(|| {
                    ReaderError::MalformedInput {
                        message: "unbalanced closing tag".to_string(),
                    }
                })?;
                attach(&mut stack, el)?;
            }
            Event::Text(t) => push_text(&mut stack, &t.unescape()?),
            Event::CData(c) => push_text(&mut stack, &String::from_utf8_lossy(&c.into_inner())),
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(ReaderError::MalformedInput {
            message: format!("{} unclosed element(s) at end of document", stack.len() - 1),
        });
    }
    let doc = stack.pop().unwrap_or_default();
    if doc.children.is_empty() {
        return Err(ReaderError::MalformedInput {
            message: "document has no root element".to_string(),
        });
    }
    Ok(doc)
}

fn element_from(e: &BytesStart<'_>) -> ReaderResult<XmlElement> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        attributes.push((key, attr.unescape_value()?.into_owned()));
    }
    Ok(XmlElement {
        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        attributes,
        ..XmlElement::default()
    })
}

fn attach(stack: &mut [XmlElement], el: XmlElement) -> ReaderResult<()> {
    let depth = stack.len();
    let parent = stack.last_mut().ok_or_else(|| ReaderError::MalformedInput {
        message: "element outside of document".to_string(),
    })?;
    // Only the document element may sit directly under the document node.
    if depth == 1 && !parent.children.is_empty() {
        return Err(ReaderError::MalformedInput {
            message: "document has more than one root element".to_string(),
        });
    }
    parent.children.push(el);
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: &str) {
    if let Some(top) = stack.last_mut() {
        top.text.push_str(text);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Relative,
    Root,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Child(String),
    Any,
    SelfNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Terminal {
    Element,
    Attribute(String),
    Text,
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlPath {
    expression: String,
    anchor: Anchor,
    steps: Vec<Step>,
    terminal: Terminal,
}

impl XmlPath {
    /// Compile an expression.
    pub fn parse(expression: &str) -> ReaderResult<Self> {
        let invalid = |message: &str| ReaderError::InvalidPath {
            expression: expression.to_string(),
            message: message.to_string(),
        };

        let expr = expression.trim();
        let (anchor, rest) = if let Some(rest) = expr.strip_prefix("//") {
            (Anchor::Descendant, rest)
        } else if let Some(rest) = expr.strip_prefix('/') {
            (Anchor::Root, rest)
        } else {
            (Anchor::Relative, expr)
        };
        if rest.is_empty() {
            return Err(invalid("expression selects nothing"));
        }

        let segments: Vec<&str> = rest.split('/').collect();
        let mut steps = Vec::with_capacity(segments.len());
        let mut terminal = Terminal::Element;
        for (i, seg) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            let seg = seg.trim();
            if seg.is_empty() {
                return Err(invalid("empty step"));
            }
            if let Some(attr) = seg.strip_prefix('@') {
                if !last {
                    return Err(invalid("attribute step must be last"));
                }
                terminal = Terminal::Attribute(local_part(attr, &invalid)?);
            } else if seg == "text()" {
                if !last {
                    return Err(invalid("text() must be last"));
                }
                terminal = Terminal::Text;
            } else if seg == "." {
                steps.push(Step::SelfNode);
            } else if seg == "*" {
                steps.push(Step::Any);
            } else {
                steps.push(Step::Child(local_part(seg, &invalid)?));
            }
        }
        if anchor == Anchor::Descendant && !matches!(steps.first(), Some(Step::Child(_) | Step::Any)) {
            return Err(invalid("'//' must be followed by an element step"));
        }

        Ok(Self {
            expression: expression.to_string(),
            anchor,
            steps,
            terminal,
        })
    }

    /// The source expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The tag of a plain one-step relative element path such as `title`.
    fn single_child_tag(&self) -> Option<&str> {
        match (self.anchor, self.steps.as_slice(), &self.terminal) {
            (Anchor::Relative, [Step::Child(tag)], Terminal::Element) => Some(tag),
            _ => None,
        }
    }

    /// Elements selected by the element steps, in document order.
    fn select<'a>(&self, context: &'a XmlElement, doc: &'a XmlElement) -> Vec<&'a XmlElement> {
        let mut steps = self.steps.iter();
        let mut current: Vec<&XmlElement> = match self.anchor {
            Anchor::Relative => vec![context],
            Anchor::Root => vec![doc],
            Anchor::Descendant => {
                let mut all = Vec::new();
                doc.descendants(&mut all);
                match steps.next() {
                    Some(step) => all.into_iter().filter(|el| step_matches(step, el)).collect(),
                    None => all,
                }
            }
        };

        for step in steps {
            current = match step {
                Step::SelfNode => current,
                _ => current
                    .into_iter()
                    .flat_map(|el| el.children.iter())
                    .filter(|child| step_matches(step, child))
                    .collect(),
            };
        }
        current
    }

    /// Value of the first match.
    fn evaluate(&self, context: &XmlElement, doc: &XmlElement) -> Value {
        let selected = self.select(context, doc);
        let found = match &self.terminal {
            Terminal::Element | Terminal::Text => selected.first().map(|el| el.text.as_str()),
            Terminal::Attribute(name) => selected.iter().find_map(|el| el.attribute(name)),
        };
        text_value(found)
    }
}

fn step_matches(step: &Step, el: &XmlElement) -> bool {
    match step {
        Step::Child(name) => el.name == *name,
        Step::Any | Step::SelfNode => true,
    }
}

fn local_part(name: &str, invalid: &dyn Fn(&str) -> ReaderError) -> ReaderResult<String> {
    let local = name.rsplit(':').next().unwrap_or(name);
    let valid = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(local.to_string())
    } else {
        Err(invalid(&format!("invalid name '{name}'")))
    }
}

fn text_value(text: Option<&str>) -> Value {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Value::Utf8(t.to_string()),
        _ => Value::Null,
    }
}

/// Column name for an element tag: namespace removed, `-` `.` `:` replaced with `_`.
pub fn sanitize_tag(tag: &str) -> String {
    let local = tag.rsplit(':').next().unwrap_or(tag);
    local.replace(['-', '.', ':'], "_")
}

struct ExplicitColumn {
    name: String,
    path: XmlPath,
}

/// Raw rows from an XML document.
pub struct XmlSource {
    doc: XmlElement,
    records: Vec<XmlElement>,
    explicit: Vec<ExplicitColumn>,
    inferred: Vec<String>,
    infer: bool,
    sample_size: usize,
    pos: usize,
}

impl XmlSource {
    /// Parse a document held in memory.
    pub fn from_xml_str(input: &str, options: &XmlOptions) -> ReaderResult<Self> {
        let record_path = XmlPath::parse(&options.record_path)?;
        if record_path.terminal != Terminal::Element {
            return Err(ReaderError::InvalidPath {
                expression: options.record_path.clone(),
                message: "record path must select elements".to_string(),
            });
        }
        let explicit = options
            .columns
            .iter()
            .map(|c| {
                let expr = c.path.as_deref().unwrap_or(&c.name);
                Ok(ExplicitColumn {
                    name: c.name.clone(),
                    path: XmlPath::parse(expr)?,
                })
            })
            .collect::<ReaderResult<Vec<_>>>()?;

        let doc = parse_document(input)?;
        let records = record_path
            .select(&doc, &doc)
            .into_iter()
            .cloned()
            .collect();

        Ok(Self {
            doc,
            records,
            explicit,
            inferred: Vec::new(),
            infer: options.infer_columns,
            sample_size: options.sample_size,
            pos: 0,
        })
    }

    /// Parse a document from a stream.
    pub fn from_reader<R: Read>(mut input: R, options: &XmlOptions) -> ReaderResult<Self> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        Self::from_xml_str(&text, options)
    }

    /// Open and parse an XML file.
    pub fn from_path(path: impl AsRef<Path>, options: &XmlOptions) -> ReaderResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_xml_str(&text, options)
    }

    /// Number of matched record elements.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

impl RowSource for XmlSource {
    fn format_name(&self) -> &'static str {
        "xml"
    }

    fn read_headers(&mut self) -> ReaderResult<Vec<String>> {
        if self.records.is_empty() {
            return Err(ReaderError::EmptyInput {
                message: "record path matched no elements".to_string(),
            });
        }

        let mut claimed: HashSet<String> = HashSet::new();
        for col in &self.explicit {
            claimed.insert(col.name.clone());
            if let Some(tag) = col.path.single_child_tag() {
                claimed.insert(sanitize_tag(tag));
            }
        }

        self.inferred.clear();
        if self.infer {
            for record in self.records.iter().take(self.sample_size) {
                for child in &record.children {
                    let tag = sanitize_tag(&child.name);
                    if claimed.insert(tag.clone()) {
                        self.inferred.push(tag);
                    }
                }
            }
        }

        let headers: Vec<String> = self
            .explicit
            .iter()
            .map(|c| c.name.clone())
            .chain(self.inferred.iter().cloned())
            .collect();
        if headers.is_empty() {
            return Err(ReaderError::NoKeys {
                message: "no explicit columns and no child elements in sampled records".to_string(),
            });
        }
        Ok(headers)
    }

    fn next_row(&mut self) -> Option<ReaderResult<Vec<Value>>> {
        let record = self.records.get(self.pos)?;
        self.pos += 1;

        let mut row: Vec<Value> = Vec::with_capacity(self.explicit.len() + self.inferred.len());
        row.extend(self.explicit.iter().map(|c| c.path.evaluate(record, &self.doc)));
        row.extend(self.inferred.iter().map(|tag| {
            let child = record.children.iter().find(|c| sanitize_tag(&c.name) == *tag);
            text_value(child.map(|c| c.text.as_str()))
        }));
        Some(Ok(row))
    }

    fn skip_rows(&mut self, n: usize) -> ReaderResult<usize> {
        let skipped = n.min(self.records.len() - self.pos);
        self.pos += skipped;
        Ok(skipped)
    }
}

/// Open an XML file as a [`Reader`].
pub fn read_xml_from_path(
    path: impl AsRef<Path>,
    xml_options: &XmlOptions,
    options: ReaderOptions,
) -> ReaderResult<Reader<XmlSource>> {
    let path = path.as_ref();
    let source = XmlSource::from_path(path, xml_options)?;
    Ok(Reader::new(source, options).with_source_label(path.display().to_string()))
}

/// Build a [`Reader`] over an in-memory XML document.
pub fn read_xml_from_str(
    input: &str,
    xml_options: &XmlOptions,
    options: ReaderOptions,
) -> ReaderResult<Reader<XmlSource>> {
    Ok(Reader::new(XmlSource::from_xml_str(input, xml_options)?, options))
}
