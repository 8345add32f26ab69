use core::fmt;

// Template AST definition.
//
// A parsed template is a flat sequence of nodes; elements own their children
// so the tree is acyclic by construction. Attribute values keep both the raw
// source text (for verbatim re-emission) and a parsed sub-tree, because an
// attribute value may itself contain tags that must be evaluated before the
// attribute can be consumed.

/// One node of a parsed response template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text between tags.
    Text(String),
    /// `<!-- ... -->`; produces no output.
    Comment(String),
    /// `<![CDATA[ ... ]]>`; emitted verbatim, never interpreted.
    Data(String),
    /// A tag with attributes and (unless self-closing) children.
    Element(Element),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
    pub self_closing: bool,
}

/// A single `name="value"` attribute.
///
/// `raw` is the attribute value exactly as written; `value` is the same text
/// parsed as template markup, consumed on demand by handlers that allow
/// nested tags in their attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub raw: String,
    pub value: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    /// Looks up an attribute by name, case-insensitively.
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// The opening tag as markup text, attributes included. Used where
    /// evaluated children must be wrapped back into the original tag.
    pub fn open_markup(&self) -> String {
        let mut out = format!("<{}", self.name);
        for attr in &self.attrs {
            out.push_str(&format!(" {}=\"{}\"", attr.name, attr.raw));
        }
        out.push('>');
        out
    }

    /// Renders the opening tag, attributes included, without the closing `>`.
    fn fmt_open(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for attr in &self.attrs {
            write!(f, " {}=\"{}\"", attr.name, attr.raw)?;
        }
        Ok(())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_open(f)?;
        if self.self_closing {
            return write!(f, "/>");
        }
        write!(f, ">")?;
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        write!(f, "</{}>", self.name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => write!(f, "{}", text),
            Node::Comment(content) => write!(f, "<!--{}-->", content),
            Node::Data(content) => write!(f, "<![CDATA[{}]]>", content),
            Node::Element(element) => write!(f, "{}", element),
        }
    }
}

/// Re-renders a node sequence as markup text.
///
/// Used by the literal-preservation default case and by the learning tags,
/// which must carry unresolved subtrees forward as source text.
pub fn render(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        out.push_str(&node.to_string());
    }
    out
}
