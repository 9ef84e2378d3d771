//! Layout template language
//!
//! Skins are plain HTML with a few placeholders:
//! - `{{ name }}` inserts an HTML-escaped value (`app_title`, `script_path`,
//!   `skin_style_path`)
//! - `{{#each style_paths}} ... {{/each}}` repeats its body per item, with
//!   `{{ this }}` bound to the current item
//!
//! Templates are parsed from source on every request, so errors are reported
//! as values and turned into a 500 by the caller.

use thiserror::Error;

use super::LayoutContext;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const EACH: &str = "#each ";
const END_EACH: &str = "/each";
const ITEM: &str = "this";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed tag at byte {0}")]
    UnclosedTag(usize),
    #[error("empty tag at byte {0}")]
    EmptyTag(usize),
    #[error("{{{{/each}}}} without matching {{{{#each}}}} at byte {0}")]
    UnexpectedEnd(usize),
    #[error("{{{{#each {0}}}}} is never closed")]
    UnclosedBlock(String),
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("unknown list '{0}'")]
    UnknownList(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Var(String),
    Each { list: String, body: Vec<Node> },
}

/// A parsed layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTemplate {
    nodes: Vec<Node>,
}

impl LayoutTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        // Innermost open block last; the root is the bottom frame
        let mut frames: Vec<(Option<String>, Vec<Node>)> = vec![(None, Vec::new())];
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            push_text(&mut frames, &rest[..start]);

            let tag_start = offset + start;
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open
                .find(CLOSE)
                .ok_or(TemplateError::UnclosedTag(tag_start))?;
            let tag = after_open[..end].trim();

            if tag.is_empty() {
                return Err(TemplateError::EmptyTag(tag_start));
            } else if let Some(list) = tag.strip_prefix(EACH) {
                frames.push((Some(list.trim().to_string()), Vec::new()));
            } else if tag == END_EACH {
                if frames.len() < 2 {
                    return Err(TemplateError::UnexpectedEnd(tag_start));
                }
                if let Some((Some(list), body)) = frames.pop() {
                    current(&mut frames).push(Node::Each { list, body });
                }
            } else {
                current(&mut frames).push(Node::Var(tag.to_string()));
            }

            let consumed = start + OPEN.len() + end + CLOSE.len();
            rest = &rest[consumed..];
            offset += consumed;
        }
        push_text(&mut frames, rest);

        if frames.len() > 1 {
            let list = frames.pop().and_then(|(list, _)| list).unwrap_or_default();
            return Err(TemplateError::UnclosedBlock(list));
        }

        let nodes = frames.pop().map(|(_, nodes)| nodes).unwrap_or_default();
        Ok(Self { nodes })
    }

    pub fn render(&self, ctx: &LayoutContext) -> Result<String, TemplateError> {
        let mut out = String::new();
        render_nodes(&self.nodes, ctx, None, &mut out)?;
        Ok(out)
    }
}

fn current(frames: &mut [(Option<String>, Vec<Node>)]) -> &mut Vec<Node> {
    let last = frames.len() - 1;
    &mut frames[last].1
}

fn push_text(frames: &mut [(Option<String>, Vec<Node>)], text: &str) {
    if !text.is_empty() {
        current(frames).push(Node::Text(text.to_string()));
    }
}

fn render_nodes(
    nodes: &[Node],
    ctx: &LayoutContext,
    item: Option<&str>,
    out: &mut String,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(name) => {
                let value = if name == ITEM { item } else { ctx.scalar(name) };
                let value = value.ok_or_else(|| TemplateError::UnknownVariable(name.clone()))?;
                escape_html(value, out);
            }
            Node::Each { list, body } => {
                let items = ctx
                    .list(list)
                    .ok_or_else(|| TemplateError::UnknownList(list.clone()))?;
                for entry in items {
                    render_nodes(body, ctx, Some(entry.as_str()), out)?;
                }
            }
        }
    }
    Ok(())
}

/// Escape a value for use in HTML text and quoted attributes
fn escape_html(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}
