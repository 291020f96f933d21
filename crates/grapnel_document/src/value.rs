//! Supplied values: literals and variable references written in the
//! query text, lifted out of the syntax tree into an owned form.

use grapnel_core::{SourceLocation, SourceText};
use grapnel_syntax::{NodeId, SyntaxKind, SyntaxTree};

/// A value supplied in the document: an argument value, a default value,
/// or a nested piece of either.
///
/// Each value carries its own source location, so messages about a
/// nested list item or object field point at that item, not at the
/// enclosing argument.
#[derive(Debug, Clone, PartialEq)]
pub enum SuppliedValue {
    Int(i64, SourceLocation),
    Float(f64, SourceLocation),
    Str(String, SourceLocation),
    Bool(bool, SourceLocation),
    Null(SourceLocation),
    Enum(String, SourceLocation),
    Variable(String, SourceLocation),
    List(Vec<SuppliedValue>, SourceLocation),
    Object(Vec<(String, SuppliedValue)>, SourceLocation),
}

/// A literal that cannot be represented, e.g. an integer out of range.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedValue {
    pub text: String,
    pub location: SourceLocation,
}

impl SuppliedValue {
    /// Where the value's literal text starts.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        match self {
            Self::Int(_, l)
            | Self::Float(_, l)
            | Self::Str(_, l)
            | Self::Bool(_, l)
            | Self::Null(l)
            | Self::Enum(_, l)
            | Self::Variable(_, l)
            | Self::List(_, l)
            | Self::Object(_, l) => *l,
        }
    }

    /// A short kind name for messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(..) => "integer",
            Self::Float(..) => "float",
            Self::Str(..) => "string",
            Self::Bool(..) => "boolean",
            Self::Null(_) => "null",
            Self::Enum(..) => "enum value",
            Self::Variable(..) => "variable",
            Self::List(..) => "list",
            Self::Object(..) => "input object",
        }
    }

    /// Lifts a value node out of the syntax tree.
    ///
    /// The lexer already guarantees well-formed literals, so the only
    /// failure left is an integer outside the `i64` range.
    pub fn from_syntax(
        tree: &SyntaxTree,
        node: NodeId,
        source: &SourceText,
    ) -> Result<SuppliedValue, MalformedValue> {
        let n = tree.node(node);
        let span = n.primary;
        let text = source.slice(span);
        let at = source.location(span.start);

        match n.kind {
            SyntaxKind::IntValue => match text.parse::<i64>() {
                Ok(v) => Ok(Self::Int(v, at)),
                Err(_) => Err(MalformedValue {
                    text: text.to_string(),
                    location: at,
                }),
            },
            SyntaxKind::FloatValue => match text.parse::<f64>() {
                Ok(v) => Ok(Self::Float(v, at)),
                Err(_) => Err(MalformedValue {
                    text: text.to_string(),
                    location: at,
                }),
            },
            SyntaxKind::StringValue => Ok(Self::Str(unquote(text), at)),
            SyntaxKind::BooleanValue => Ok(Self::Bool(text == "true", at)),
            SyntaxKind::NullValue => Ok(Self::Null(at)),
            SyntaxKind::EnumValue => Ok(Self::Enum(text.to_string(), at)),
            SyntaxKind::Variable => Ok(Self::Variable(text.to_string(), at)),
            SyntaxKind::ListValue => {
                let mut items = Vec::new();
                for child in tree.children(node) {
                    items.push(Self::from_syntax(tree, child, source)?);
                }
                Ok(Self::List(items, at))
            }
            SyntaxKind::ObjectValue => {
                let mut fields = Vec::new();
                for child in tree.children(node) {
                    let name = source.slice(tree.node(child).primary).to_string();
                    let value_node = tree
                        .children(child)
                        .next()
                        .expect("object field has a value");
                    fields.push((name, Self::from_syntax(tree, value_node, source)?));
                }
                Ok(Self::Object(fields, at))
            }
            other => unreachable!("not a value node: {other:?}"),
        }
    }

    /// Collects the names of all variables referenced in this value.
    pub fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Variable(name, _) => out.push(name),
            Self::List(items, _) => {
                for item in items {
                    item.collect_variables(out);
                }
            }
            Self::Object(fields, _) => {
                for (_, value) in fields {
                    value.collect_variables(out);
                }
            }
            _ => {}
        }
    }
}

/// Strips quotes and resolves escapes in a string literal.
fn unquote(text: &str) -> String {
    if let Some(inner) = text
        .strip_prefix("\"\"\"")
        .and_then(|t| t.strip_suffix("\"\"\""))
    {
        return dedent_block(inner);
    }
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if let Some(c) = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                {
                    out.push(c);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Removes common indentation and blank edge lines from block string
/// content.
fn dedent_block(inner: &str) -> String {
    let lines: Vec<&str> = inner.split('\n').collect();

    let common = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut result: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            result.push((*line).to_string());
        } else {
            result.push(line.get(common.min(line.len())..).unwrap_or("").to_string());
        }
    }

    while result.first().is_some_and(|l| l.trim().is_empty()) {
        result.remove(0);
    }
    while result.last().is_some_and(|l| l.trim().is_empty()) {
        result.pop();
    }
    result.join("\n")
}
