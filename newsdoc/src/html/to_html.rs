//! Content-state → HTML generation.
//!
//! Generation is infallible: malformed side-channel data (unknown entities,
//! unparsable annotation notes, bad cell JSON) degrades to the closest
//! sensible output and logs a warning, it never aborts the document.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::content::entity::{EmbedData, EntityKind, MediaData, MediaKind, TableData};
use crate::content::{BlockType, ContentBlock, ContentState, StyleRange};
use crate::html::inline::{EntityWrapper, StyleWrapper, escape_attr, escape_char, escape_text};

/// Atomic block families the generator can be told to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AtomicKind {
    Table,
    Media,
    Embed,
}

impl FromStr for AtomicKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(AtomicKind::Table),
            "media" => Ok(AtomicKind::Media),
            "embed" => Ok(AtomicKind::Embed),
            other => Err(format!("unknown atomic kind '{}'", other)),
        }
    }
}

impl fmt::Display for AtomicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicKind::Table => write!(f, "table"),
            AtomicKind::Media => write!(f, "media"),
            AtomicKind::Embed => write!(f, "embed"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeneratorOptions {
    /// Atomic kinds to omit from the output entirely.
    pub disabled: BTreeSet<AtomicKind>,
}

/// Render a content state as an HTML fragment.
pub fn to_html(state: &ContentState, options: &GeneratorOptions) -> String {
    let mut generator = Generator {
        state,
        options,
        out: String::new(),
        lists: Vec::new(),
        last_depth: 0,
    };
    for block in &state.blocks {
        generator.block(block);
    }
    generator.flush_lists();
    generator.out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

struct Generator<'a> {
    state: &'a ContentState,
    options: &'a GeneratorOptions,
    out: String,
    /// Currently open list wrappers, outermost first. Whenever this is
    /// non-empty an `<li>` is open at the innermost level.
    lists: Vec<ListKind>,
    last_depth: usize,
}

impl Generator<'_> {
    fn block(&mut self, block: &ContentBlock) {
        match block.block_type {
            BlockType::Atomic => {
                self.flush_lists();
                self.atomic(block);
            }
            BlockType::UnorderedListItem => self.list_item(block, ListKind::Unordered),
            BlockType::OrderedListItem => self.list_item(block, ListKind::Ordered),
            BlockType::Unstyled => {
                self.flush_lists();
                // Empty paragraphs are dropped rather than rendered as
                // <p></p>; annotated empties still render.
                if block.is_blank() {
                    return;
                }
                self.simple_block(block, "p");
            }
            BlockType::Header(level) => {
                self.flush_lists();
                let tag = format!("h{}", level.clamp(1, 6));
                self.simple_block(block, &tag);
            }
            BlockType::Blockquote => {
                self.flush_lists();
                self.simple_block(block, "quote");
            }
        }
    }

    fn simple_block(&mut self, block: &ContentBlock, tag: &str) {
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
        let inner = render_inline(block, self.state);
        self.out.push_str(&inner);
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    fn list_item(&mut self, block: &ContentBlock, kind: ListKind) {
        let depth = block.depth;

        if self.lists.is_empty() {
            self.open_list(kind);
        } else if depth > self.last_depth {
            for _ in 0..depth - self.last_depth {
                self.open_list(kind);
            }
        } else {
            if depth < self.last_depth {
                // Never close the outermost wrapper here; a shallower item
                // still belongs to some list.
                let to_close = (self.last_depth - depth).min(self.lists.len() - 1);
                for _ in 0..to_close {
                    self.close_list();
                }
            }
            match self.lists.last() {
                Some(&open) if open == kind => self.out.push_str("</li><li>"),
                _ => {
                    self.close_list();
                    self.open_list(kind);
                }
            }
        }
        self.last_depth = depth;

        let inner = render_inline(block, self.state);
        self.out.push_str(&inner);
    }

    fn open_list(&mut self, kind: ListKind) {
        self.lists.push(kind);
        self.out.push('<');
        self.out.push_str(kind.tag());
        self.out.push_str("><li>");
    }

    fn close_list(&mut self) {
        if let Some(kind) = self.lists.pop() {
            self.out.push_str("</li></");
            self.out.push_str(kind.tag());
            self.out.push('>');
        }
    }

    fn flush_lists(&mut self) {
        while !self.lists.is_empty() {
            self.close_list();
        }
        self.last_depth = 0;
    }

    fn atomic(&mut self, block: &ContentBlock) {
        let Some(key) = block.atomic_entity() else {
            tracing::warn!("atomic block without entity, skipping");
            return;
        };
        match self.state.entity(key).map(|e| &e.kind) {
            Some(EntityKind::Table(data)) => {
                if !self.options.disabled.contains(&AtomicKind::Table) {
                    self.table(data);
                }
            }
            Some(EntityKind::Media(data)) => {
                if !self.options.disabled.contains(&AtomicKind::Media) {
                    self.media(data);
                }
            }
            Some(EntityKind::Embed(data)) => {
                if !self.options.disabled.contains(&AtomicKind::Embed) {
                    self.embed(data);
                }
            }
            Some(EntityKind::Link { .. }) => {
                tracing::warn!(key = key.0, "atomic block references a link entity, skipping");
            }
            None => {
                tracing::warn!(key = key.0, "atomic block references unknown entity, skipping");
            }
        }
    }

    fn table(&mut self, data: &TableData) {
        self.out.push_str("<table><tbody>");
        for row in 0..data.num_rows {
            self.out.push_str("<tr>");
            for col in 0..data.num_cols {
                self.out.push_str("<td>");
                let cell = data
                    .cells
                    .get(row)
                    .and_then(|r| r.get(col))
                    .map(String::as_str)
                    .unwrap_or("");
                self.out.push_str(&render_cell(cell, self.options));
                self.out.push_str("</td>");
            }
            self.out.push_str("</tr>");
        }
        self.out.push_str("</tbody></table>");
    }

    fn media(&mut self, data: &MediaData) {
        self.out.push_str("<figure class=\"media-block\">");
        match data.kind {
            MediaKind::Image => {
                self.out.push_str("<img");
                self.media_attrs(data);
                self.out.push_str(" />");
            }
            kind => {
                self.out.push('<');
                self.out.push_str(kind.tag());
                self.media_attrs(data);
                self.out.push_str(" controls></");
                self.out.push_str(kind.tag());
                self.out.push('>');
            }
        }
        if let Some(description) = data.description.as_deref() {
            if !description.is_empty() {
                self.out.push_str("<figcaption>");
                self.out.push_str(&escape_text(description));
                self.out.push_str("</figcaption>");
            }
        }
        self.out.push_str("</figure>");
    }

    /// Embed markup is emitted raw. A description re-wraps it in a figure
    /// with a figcaption so the parser lifts it back out.
    fn embed(&mut self, data: &EmbedData) {
        self.out.push_str("<div class=\"embed-block\">");
        match data.description.as_deref() {
            Some(description) if !description.is_empty() => {
                self.out.push_str("<figure>");
                self.out.push_str(&data.html);
                self.out.push_str("<figcaption>");
                self.out.push_str(&escape_text(description));
                self.out.push_str("</figcaption></figure>");
            }
            _ => self.out.push_str(&data.html),
        }
        self.out.push_str("</div>");
    }

    fn media_attrs(&mut self, data: &MediaData) {
        if let Some(src) = data.src.as_deref() {
            self.out.push_str(" src=\"");
            self.out.push_str(&escape_attr(src));
            self.out.push('"');
        }
        if let Some(alt) = data.alt.as_deref() {
            self.out.push_str(" alt=\"");
            self.out.push_str(&escape_attr(alt));
            self.out.push('"');
        }
    }
}

/// A table cell holds a serialized sub-document; render it recursively.
/// Undecodable cells render as empty.
fn render_cell(cell_json: &str, options: &GeneratorOptions) -> String {
    if cell_json.is_empty() {
        return String::new();
    }
    match serde_json::from_str::<ContentState>(cell_json) {
        Ok(state) => to_html(&state, options),
        Err(error) => {
            tracing::warn!(%error, "table cell holds undecodable sub-document");
            String::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Inline rendering
// ---------------------------------------------------------------------------

/// Render a block's text with style tags, entity tags, and the annotation
/// overlay. Annotation spans close any open style/entity tags at their
/// boundaries so the output stays well nested.
fn render_inline(block: &ContentBlock, state: &ContentState) -> String {
    let ranges = annotation_ranges(block);
    let mut next_range = ranges.into_iter().peekable();
    let mut open_annotation: Option<&StyleRange> = None;

    let mut out = String::new();
    let mut styles = StyleWrapper::new();
    let mut entity = EntityWrapper::new();

    let empty_meta = crate::content::CharacterMetadata::default();
    for (i, ch) in block.text.chars().enumerate() {
        let meta = block.chars.get(i).unwrap_or(&empty_meta);

        if open_annotation.is_none() {
            if let Some(range) = next_range.peek() {
                if range.offset == i {
                    styles.finish(&mut out);
                    entity.finish(&mut out);
                    out.push_str("<span class=\"annotation-tag\">");
                    open_annotation = next_range.next();
                }
            }
        }

        entity.transition(meta.entity, &state.entities, &mut out);
        styles.transition(&meta.styles, &mut out);
        if ch == '\n' {
            out.push_str("<br>");
        } else {
            escape_char(ch, &mut out);
        }

        if let Some(range) = open_annotation {
            if range.offset + range.length == i + 1 {
                styles.finish(&mut out);
                entity.finish(&mut out);
                close_annotation(range, block, &mut out);
                open_annotation = None;
            }
        }
    }

    styles.finish(&mut out);
    entity.finish(&mut out);
    if let Some(range) = open_annotation {
        // Range ran past the block's text; close it so tags stay balanced.
        close_annotation(range, block, &mut out);
    }
    out
}

/// Annotation ranges for a block, sorted by offset, with zero-length,
/// out-of-bounds, and overlapping ranges dropped. Only one annotation is
/// open at a time. Ranges come from deserialized data and are untrusted;
/// anything that cannot map onto the block's characters is skipped.
fn annotation_ranges(block: &ContentBlock) -> Vec<&StyleRange> {
    let char_count = block.chars.len();
    let mut ranges: Vec<&StyleRange> = block
        .data
        .inline_style_ranges
        .iter()
        .filter(|r| r.is_annotation() && r.length > 0)
        .collect();
    ranges.sort_by_key(|r| (r.offset, r.length));

    let mut kept: Vec<&StyleRange> = Vec::with_capacity(ranges.len());
    let mut covered_until = 0;
    for range in ranges {
        let Some(end) = range.offset.checked_add(range.length) else {
            tracing::warn!(style = %range.style, "annotation range overflows, skipping");
            continue;
        };
        if range.offset >= char_count {
            tracing::warn!(style = %range.style, "annotation range starts past block text, skipping");
            continue;
        }
        if !kept.is_empty() && range.offset < covered_until {
            tracing::warn!(style = %range.style, "overlapping annotation range, skipping");
            continue;
        }
        covered_until = end;
        kept.push(range);
    }
    kept
}

fn close_annotation(range: &StyleRange, block: &ContentBlock, out: &mut String) {
    out.push_str("</span><span class=\"annotation-toggle-icon\"></span>");
    out.push_str(&annotation_note(range, block));
}

/// The note body attached to an annotation: the `msg` payload is a JSON
/// sub-document whose blocks render as annotation-content paragraphs. Any
/// failure along the way renders an empty note.
fn annotation_note(range: &StyleRange, block: &ContentBlock) -> String {
    let Some(note) = block.data.highlights.get(&range.style) else {
        tracing::warn!(style = %range.style, "annotation range without note payload");
        return String::new();
    };
    let state: ContentState = match serde_json::from_str(&note.msg) {
        Ok(state) => state,
        Err(error) => {
            tracing::warn!(style = %range.style, %error, "annotation note is not a document");
            return String::new();
        }
    };
    let mut out = String::new();
    for note_block in &state.blocks {
        out.push_str("<p class=\"annotation-content\">");
        out.push_str(&escape_text(&note_block.text));
        out.push_str("</p>");
    }
    out
}
