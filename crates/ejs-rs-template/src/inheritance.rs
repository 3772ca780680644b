//! Layout inheritance.
//!
//! A template whose first non-whitespace content is an extend tag names a
//! parent layout:
//!
//! ```text
//! <%+ layouts/base %>
//! <%block title%>Home<%/block%>
//! <%block scripts append%><script src="home.js"></script><%/block%>
//! ```
//!
//! Resolution loads the parent, collects the blocks both templates define,
//! merges each child block into the parent's block of the same name according
//! to its mode, and returns the parent text with every block tag replaced by
//! its merged content. Child content outside blocks is dropped.
//!
//! Block modes:
//!
//! | mode      | result                  |
//! |-----------|-------------------------|
//! | (none)    | child replaces parent   |
//! | `prepend` | child, then parent      |
//! | `append`  | parent, then child      |
//!
//! When the parent itself extends another layout, merged blocks keep their
//! block tags so the next level can merge them again.

use std::collections::HashMap;

use ejs_rs_core::error::EjsError;

use crate::include::{resolve_path, strip_quotes};
use crate::loaders::TemplateLoader;
use crate::options::CompileOptions;

/// How a child block combines with the parent block of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockMode {
    /// The child content replaces the parent content.
    #[default]
    Replace,
    /// The child content is placed before the parent content.
    Prepend,
    /// The child content is placed after the parent content.
    Append,
}

impl BlockMode {
    /// Reads the optional second token of a block tag.
    pub fn from_word(word: Option<&str>) -> Self {
        match word {
            Some("prepend") => Self::Prepend,
            Some("append") => Self::Append,
            _ => Self::Replace,
        }
    }
}

/// A child block override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildBlock {
    /// How the override combines with the parent.
    pub mode: BlockMode,
    /// The trimmed block content.
    pub content: String,
}

/// Parent and child block definitions for one extend resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTable {
    parent: HashMap<String, String>,
    child: HashMap<String, ChildBlock>,
}

impl BlockTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a parent block's default content.
    pub fn add_parent(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.parent.insert(name.into(), content.into());
    }

    /// Records a child override.
    pub fn add_child(&mut self, name: impl Into<String>, mode: BlockMode, content: impl Into<String>) {
        self.child.insert(
            name.into(),
            ChildBlock {
                mode,
                content: content.into(),
            },
        );
    }

    /// Checks that every child block overrides a block the parent defines.
    ///
    /// # Errors
    ///
    /// Returns `TemplateSyntaxError` naming the first unknown block.
    pub fn validate(&self) -> Result<(), EjsError> {
        let mut names: Vec<&String> = self.child.keys().collect();
        names.sort();
        match names.into_iter().find(|name| !self.parent.contains_key(*name)) {
            Some(name) => Err(EjsError::TemplateSyntaxError(format!(
                "The child template contains a block '{name}' which is not in the layout template"
            ))),
            None => Ok(()),
        }
    }

    /// Returns the merged content for a parent block.
    pub fn merged(&self, name: &str) -> Option<String> {
        let parent = self.parent.get(name)?;
        Some(match self.child.get(name) {
            None => parent.clone(),
            Some(child) => match child.mode {
                BlockMode::Replace => child.content.clone(),
                BlockMode::Prepend => format!("{}{parent}", child.content),
                BlockMode::Append => format!("{parent}{}", child.content),
            },
        })
    }
}

/// A block found in template text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BlockSpan {
    /// Byte offset of the opening tag.
    start: usize,
    /// Byte offset just past the closing tag.
    end: usize,
    /// The opening tag body, e.g. `title append`.
    tag: String,
    /// The trimmed content between the tags.
    content: String,
}

impl BlockSpan {
    fn name(&self) -> &str {
        self.tag.split_whitespace().next().unwrap_or_default()
    }

    fn mode(&self) -> BlockMode {
        BlockMode::from_word(self.tag.split_whitespace().nth(1))
    }
}

/// The result of resolving one extend level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The parent text with merged blocks substituted.
    pub source: String,
    /// The parent's path, which becomes the template's filename.
    pub filename: String,
}

/// Returns `true` if `source` starts with an extend tag.
pub fn is_extending(source: &str, open: &str) -> bool {
    source.trim_start().starts_with(&format!("{open}+"))
}

/// Resolves one level of layout inheritance.
///
/// # Errors
///
/// - `ConfigurationError` when `filename` is `None`
/// - `TemplateDoesNotExist` when the parent cannot be loaded
/// - `TemplateSyntaxError` for malformed tags or a child block unknown to the parent
pub fn resolve_extend(
    source: &str,
    filename: Option<&str>,
    options: &CompileOptions,
    loader: &dyn TemplateLoader,
) -> Result<Resolved, EjsError> {
    let filename = filename.ok_or_else(|| {
        EjsError::ConfigurationError("filename option is required for extends".to_string())
    })?;
    let (open, close) = (options.open.as_str(), options.close.as_str());

    let Some(after_marker) = source
        .trim_start()
        .strip_prefix(open)
        .and_then(|rest| rest.strip_prefix('+'))
    else {
        return Err(EjsError::TemplateSyntaxError(format!(
            "{filename} does not start with an extend tag"
        )));
    };
    let tag_end = after_marker.find(close).ok_or_else(|| {
        EjsError::TemplateSyntaxError(format!("Could not find matching close tag for extend in {filename}"))
    })?;
    let reference = strip_quotes(after_marker[..tag_end].trim());
    let child_body = &after_marker[tag_end + close.len()..];

    let parent_path = resolve_path(reference, filename, &options.extension);
    tracing::debug!(child = filename, parent = %parent_path, "resolving layout");
    let parent_text = loader.load(&parent_path)?;

    let parent_blocks = find_blocks(&parent_text, open, close)?;
    let child_blocks = find_blocks(child_body, open, close)?;

    let mut table = BlockTable::new();
    for block in &parent_blocks {
        table.add_parent(block.name(), block.content.clone());
    }
    for block in &child_blocks {
        table.add_child(block.name(), block.mode(), block.content.clone());
    }
    table.validate()?;

    let keep_tags = is_extending(&parent_text, open);
    let mut merged = String::with_capacity(parent_text.len());
    let mut cursor = 0;
    for block in &parent_blocks {
        merged.push_str(&parent_text[cursor..block.start]);
        let content = table.merged(block.name()).unwrap_or_default();
        if keep_tags {
            merged.push_str(&format!(
                "{open}block {}{close}{content}{open}/block{close}",
                block.tag.trim()
            ));
        } else {
            merged.push_str(&content);
        }
        cursor = block.end;
    }
    merged.push_str(&parent_text[cursor..]);

    Ok(Resolved {
        source: merged,
        filename: parent_path,
    })
}

/// Finds every `<%block name [mode]%>...<%/block%>` in `text`.
fn find_blocks(text: &str, open: &str, close: &str) -> Result<Vec<BlockSpan>, EjsError> {
    let block_open = format!("{open}block");
    let block_close = format!("{open}/block");
    let mut blocks = Vec::new();
    let mut search = 0;

    while let Some(rel) = text[search..].find(&block_open) {
        let start = search + rel;
        let tag_start = start + block_open.len();
        if !text[tag_start..]
            .chars()
            .next()
            .is_some_and(char::is_whitespace)
        {
            search = tag_start;
            continue;
        }
        let tag_len = text[tag_start..].find(close).ok_or_else(|| {
            EjsError::TemplateSyntaxError("Could not find matching close tag for block".to_string())
        })?;
        let tag = text[tag_start..tag_start + tag_len].to_string();
        let content_start = tag_start + tag_len + close.len();
        let content_len = text[content_start..].find(&block_close).ok_or_else(|| {
            EjsError::TemplateSyntaxError(format!("Block '{}' is not closed", tag.trim()))
        })?;
        let content_end = content_start + content_len;
        let end_tag = content_end + block_close.len();
        let end = text[end_tag..]
            .find(close)
            .map(|i| end_tag + i + close.len())
            .ok_or_else(|| {
                EjsError::TemplateSyntaxError("Could not find matching close tag for /block".to_string())
            })?;
        blocks.push(BlockSpan {
            start,
            end,
            tag,
            content: text[content_start..content_end].trim().to_string(),
        });
        search = end;
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::StringLoader;

    fn resolve(child: &str, parent: &str) -> Result<Resolved, EjsError> {
        let loader = StringLoader::new();
        loader.add("views/layout.ejs", parent);
        resolve_extend(
            child,
            Some("views/page.ejs"),
            &CompileOptions::default(),
            &loader,
        )
    }

    const LAYOUT: &str = "<title><%block title%>Site<%/block%></title>";

    #[test]
    fn test_is_extending() {
        assert!(is_extending("  \n<%+ layout %>", "<%"));
        assert!(!is_extending("x <%+ layout %>", "<%"));
        assert!(is_extending("{{+ layout }}", "{{"));
    }

    #[test]
    fn test_merge_modes() {
        let cases = [
            ("<%block title%>Home<%/block%>", "<title>Home</title>"),
            ("<%block title prepend%>Home | <%/block%>", "<title>Home |Site</title>"),
            ("<%block title append%> | Home<%/block%>", "<title>Site| Home</title>"),
            ("", "<title>Site</title>"),
        ];
        for (blocks, expected) in cases {
            let child = format!("<%+ layout %>\n{blocks}");
            let resolved = resolve(&child, LAYOUT).unwrap();
            assert_eq!(resolved.source, expected, "for {blocks:?}");
            assert_eq!(resolved.filename, "views/layout.ejs");
        }
    }

    #[test]
    fn test_quoted_parent_reference() {
        let resolved = resolve("<%+ 'layout.ejs' %>", LAYOUT).unwrap();
        assert_eq!(resolved.source, "<title>Site</title>");
    }

    #[test]
    fn test_unknown_child_block() {
        let err = resolve("<%+ layout %><%block body%>x<%/block%>", LAYOUT).unwrap_err();
        assert!(err.to_string().contains("'body' which is not in the layout template"));
    }

    #[test]
    fn test_requires_filename() {
        let err = resolve_extend(
            "<%+ layout %>",
            None,
            &CompileOptions::default(),
            &StringLoader::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EjsError::ConfigurationError(_)));
    }

    #[test]
    fn test_missing_parent() {
        let err = resolve_extend(
            "<%+ nowhere %>",
            Some("page.ejs"),
            &CompileOptions::default(),
            &StringLoader::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EjsError::TemplateDoesNotExist(_)));
    }

    #[test]
    fn test_unclosed_block() {
        let err = resolve("<%+ layout %>", "<%block title%>Site").unwrap_err();
        assert!(err.to_string().contains("not closed"));
    }

    #[test]
    fn test_keeps_tags_when_parent_extends() {
        let parent = "<%+ base %><%block title append%>Mid<%/block%>";
        let resolved = resolve("<%+ layout %><%block title%>Leaf<%/block%>", parent).unwrap();
        assert_eq!(resolved.source, "<%+ base %><%block title append%>Leaf<%/block%>");
    }

    #[test]
    fn test_block_table() {
        let mut table = BlockTable::new();
        table.add_parent("a", "P");
        table.add_child("a", BlockMode::Append, "C");
        assert_eq!(table.merged("a").as_deref(), Some("PC"));
        assert_eq!(table.merged("missing"), None);
        assert!(table.validate().is_ok());
        table.add_child("b", BlockMode::Replace, "x");
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_block_word_boundary() {
        let blocks = find_blocks("<%blockquote%> <%block a%>x<%/block%>", "<%", "%>").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name(), "a");
    }
}
