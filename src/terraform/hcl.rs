//! Minimal HCL document tree
//!
//! Generated code is built as typed nodes and serialized in one place,
//! so escaping and ordering live here instead of being scattered through
//! string interpolation at every call site.

/// An attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Quoted, escaped string literal
    Str(String),
    Bool(bool),
    Num(i64),
    /// Unquoted expression, e.g. a resource reference
    Raw(String),
    /// Heredoc with the body and closing tag at column zero
    Heredoc { tag: &'static str, body: String },
    /// `{ key = value, .. }` in insertion order
    Map(Vec<(String, Expr)>),
    /// `[value, ..]`
    List(Vec<Expr>),
    /// Function call, e.g. `jsonencode({..})`
    Call { name: &'static str, arg: Box<Expr> },
}

impl Expr {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw(value.into())
    }

    fn write(&self, out: &mut String, indent: usize) {
        match self {
            Expr::Str(value) => {
                out.push('"');
                out.push_str(&escape(value));
                out.push('"');
            }
            Expr::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
            Expr::Num(value) => out.push_str(&value.to_string()),
            Expr::Raw(value) => out.push_str(value),
            Expr::Heredoc { tag, body } => {
                out.push_str("<<");
                out.push_str(tag);
                out.push('\n');
                out.push_str(body);
                if !body.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(tag);
            }
            Expr::Map(entries) => {
                if entries.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push_str("{\n");
                for (key, value) in entries {
                    push_indent(out, indent + 1);
                    out.push_str(&quote_key(key));
                    out.push_str(" = ");
                    value.write(out, indent + 1);
                    out.push('\n');
                }
                push_indent(out, indent);
                out.push('}');
            }
            Expr::List(items) => {
                if items.is_empty() {
                    out.push_str("[]");
                    return;
                }
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write(out, indent);
                }
                out.push(']');
            }
            Expr::Call { name, arg } => {
                out.push_str(name);
                out.push('(');
                arg.write(out, indent);
                out.push(')');
            }
        }
    }
}

/// A body element: either an attribute or a nested block
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Attr { name: String, value: Expr },
    Block(Block),
}

/// A block with a keyword, quoted labels, and a body
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    kind: String,
    labels: Vec<String>,
    items: Vec<Item>,
}

impl Block {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            labels: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.items.push(Item::Attr {
            name: name.into(),
            value,
        });
        self
    }

    pub fn block(mut self, block: Block) -> Self {
        self.items.push(Item::Block(block));
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }

    fn write(&self, out: &mut String, indent: usize) {
        push_indent(out, indent);
        out.push_str(&self.kind);
        for label in &self.labels {
            out.push_str(" \"");
            out.push_str(&escape(label));
            out.push('"');
        }
        out.push_str(" {\n");
        for item in &self.items {
            match item {
                Item::Attr { name, value } => {
                    push_indent(out, indent + 1);
                    out.push_str(name);
                    out.push_str(" = ");
                    value.write(out, indent + 1);
                    out.push('\n');
                }
                Item::Block(block) => {
                    block.write(out, indent + 1);
                }
            }
        }
        push_indent(out, indent);
        out.push_str("}\n");
    }
}

/// Escape a string for a quoted HCL literal, including the `${` and
/// `%{` template introducers
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("$$"),
            '%' if chars.peek() == Some(&'{') => out.push_str("%%"),
            c => out.push(c),
        }
    }
    out
}

/// Map keys stay bare when they are valid identifiers and get quoted
/// otherwise
fn quote_key(key: &str) -> String {
    let mut chars = key.chars();
    let bare = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        _ => false,
    };
    if bare {
        key.to_string()
    } else {
        format!("\"{}\"", escape(key))
    }
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str("  ");
    }
}
