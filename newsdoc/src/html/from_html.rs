//! HTML → content-state conversion.
//!
//! The converter leans on html5ever for everything it understands natively
//! (block tags, inline marks, links) and pre-extracts the constructs it does
//! not: `<table>` elements, elements flagged with the `media-block` class,
//! and embed markup (figures, iframes, scripts, loose media elements).
//! Those subtrees are stored in indexed side tables and replaced in the DOM
//! with placeholder `<figure>` nodes carrying a sentinel token, so the
//! generic conversion sees only content it can handle. Afterwards every
//! atomic block whose text is a sentinel is rebuilt wholesale from the
//! stored markup.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{QualName, local_name, namespace_url, ns, parse_document};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

use crate::content::entity::{
    EmbedData, EntityKind, EntityMap, MediaData, MediaKind, Mutability, TableData,
};
use crate::content::{BlockType, CharacterMetadata, ContentBlock, ContentState, InlineStyle};
use crate::html::error::ParseError;
use crate::html::{
    FIGURE_SENTINEL_PREFIX, IFRAME_SENTINEL_PREFIX, MEDIA_SENTINEL_PREFIX,
    SCRIPT_SENTINEL_PREFIX, TABLE_SENTINEL_PREFIX, sentinel_index,
};

/// Convert an HTML fragment into a content state.
///
/// Empty (or whitespace-only) input yields a single empty unstyled block.
/// Errors indicate broken sentinel bookkeeping and are fatal for the whole
/// document; there is no per-block recovery.
pub fn from_html(html: &str) -> Result<ContentState, ParseError> {
    if html.trim().is_empty() {
        return Ok(ContentState::from_text(""));
    }
    HtmlParser::default().parse(html)
}

/// Holds the side tables populated by the pruning passes.
#[derive(Default)]
struct HtmlParser {
    tables: Vec<String>,
    media: Vec<String>,
    figures: Vec<String>,
    iframes: Vec<String>,
    scripts: Vec<String>,
}

impl HtmlParser {
    fn parse(&mut self, html: &str) -> Result<ContentState, ParseError> {
        let dom = parse_dom(html);
        let root = find_element(&dom.document, "body").unwrap_or_else(|| dom.document.clone());

        self.prune(&root)?;

        let mut converter = BlockConverter::new();
        converter.walk(&root, &InlineContext::default());
        let state = converter.finish();

        self.rebuild_atomics(state)
    }

    /// Extract everything the generic conversion cannot handle, in priority
    /// order. Tables keep their inner HTML; media blocks, iframes, scripts,
    /// and loose media elements keep their outer HTML. Generic figures run
    /// before the iframe/script passes so a figure-wrapped embed keeps its
    /// markup in one piece.
    fn prune(&mut self, root: &Handle) -> Result<(), ParseError> {
        prune_pass(
            root,
            &|n| element_name(n) == Some("table"),
            true,
            &mut self.tables,
            TABLE_SENTINEL_PREFIX,
        )?;
        prune_pass(
            root,
            &|n| has_class(n, "media-block"),
            false,
            &mut self.media,
            MEDIA_SENTINEL_PREFIX,
        )?;
        prune_pass(
            root,
            &|n| element_name(n) == Some("figure") && !is_placeholder(n),
            true,
            &mut self.figures,
            FIGURE_SENTINEL_PREFIX,
        )?;
        prune_pass(
            root,
            &|n| element_name(n) == Some("iframe"),
            false,
            &mut self.iframes,
            IFRAME_SENTINEL_PREFIX,
        )?;
        prune_pass(
            root,
            &|n| element_name(n) == Some("script"),
            false,
            &mut self.scripts,
            SCRIPT_SENTINEL_PREFIX,
        )?;
        // Media elements outside a media block are imported as embeds.
        prune_pass(
            root,
            &|n| matches!(element_name(n), Some("img" | "video" | "audio")),
            false,
            &mut self.figures,
            FIGURE_SENTINEL_PREFIX,
        )?;
        Ok(())
    }

    /// Swap sentinel-carrying atomic blocks for fully rebuilt table/media
    /// blocks. Atomic blocks with unrecognized text are downgraded to
    /// paragraphs.
    fn rebuild_atomics(&self, mut state: ContentState) -> Result<ContentState, ParseError> {
        let blocks = std::mem::take(&mut state.blocks);
        let mut rebuilt = Vec::with_capacity(blocks.len());

        for block in blocks {
            if block.block_type != BlockType::Atomic {
                rebuilt.push(block);
                continue;
            }
            if let Some(index) = sentinel_index(&block.text, TABLE_SENTINEL_PREFIX) {
                let data = self.rebuild_table(index, &block.text)?;
                let key = state.add_entity(EntityKind::Table(data), Mutability::Mutable);
                rebuilt.push(ContentBlock::atomic(key));
            } else if let Some(index) = sentinel_index(&block.text, MEDIA_SENTINEL_PREFIX) {
                let data = self.rebuild_media(index, &block.text)?;
                let key = state.add_entity(EntityKind::Media(data), Mutability::Mutable);
                rebuilt.push(ContentBlock::atomic(key));
            } else if let Some(index) = sentinel_index(&block.text, FIGURE_SENTINEL_PREFIX) {
                let data = self.rebuild_figure(index, &block.text)?;
                let key = state.add_entity(EntityKind::Embed(data), Mutability::Mutable);
                rebuilt.push(ContentBlock::atomic(key));
            } else if let Some(index) = sentinel_index(&block.text, IFRAME_SENTINEL_PREFIX) {
                let data = rebuild_embed(&self.iframes, index, &block.text)?;
                let key = state.add_entity(EntityKind::Embed(data), Mutability::Mutable);
                rebuilt.push(ContentBlock::atomic(key));
            } else if let Some(index) = sentinel_index(&block.text, SCRIPT_SENTINEL_PREFIX) {
                let data = rebuild_embed(&self.scripts, index, &block.text)?;
                let key = state.add_entity(EntityKind::Embed(data), Mutability::Mutable);
                rebuilt.push(ContentBlock::atomic(key));
            } else {
                tracing::warn!(text = %block.text, "atomic block without sentinel, keeping as paragraph");
                rebuilt.push(ContentBlock::from_text(BlockType::Unstyled, block.text.trim()));
            }
        }

        state.blocks = rebuilt;
        Ok(state)
    }

    fn rebuild_table(&self, index: usize, token: &str) -> Result<TableData, ParseError> {
        let html = self.tables.get(index).ok_or_else(|| ParseError::MissingSentinel {
            token: token.trim().to_string(),
        })?;

        // The side table stores the table's inner HTML; without the <table>
        // context html5ever would drop the row tags entirely.
        let dom = parse_dom(&format!("<table>{}</table>", html));
        let rows = collect_elements(&dom.document, "tr");

        let num_rows = rows.len();
        // Column count comes from the first row only. Ragged rows are padded
        // or truncated to match it.
        let num_cols = rows
            .first()
            .map(|row| collect_cells(row).len())
            .unwrap_or(0);

        let mut cells = Vec::with_capacity(num_rows);
        for row in &rows {
            let row_cells = collect_cells(row);
            let mut encoded = Vec::with_capacity(num_cols);
            for col in 0..num_cols {
                let cell_state = match row_cells.get(col) {
                    Some(cell) => {
                        let inner = serialize_node(cell, true)?;
                        from_html(&inner)?
                    }
                    None => ContentState::empty(),
                };
                let json = serde_json::to_string(&cell_state)
                    .map_err(|e| ParseError::CellEncode(e.to_string()))?;
                encoded.push(json);
            }
            cells.push(encoded);
        }

        Ok(TableData {
            num_rows,
            num_cols,
            cells,
        })
    }

    fn rebuild_media(&self, index: usize, token: &str) -> Result<MediaData, ParseError> {
        let html = self.media.get(index).ok_or_else(|| ParseError::MissingSentinel {
            token: token.trim().to_string(),
        })?;

        let dom = parse_dom(html);

        // Priority order: img, then video, then audio. A missing media
        // element yields absent attributes, never an error.
        let (kind, element) = [
            (MediaKind::Image, "img"),
            (MediaKind::Video, "video"),
            (MediaKind::Audio, "audio"),
        ]
        .iter()
        .find_map(|&(kind, tag)| find_element(&dom.document, tag).map(|el| (kind, Some(el))))
        .unwrap_or((MediaKind::Image, None));

        let src = element.as_ref().and_then(|el| attr_value(el, "src"));
        let alt = element.as_ref().and_then(|el| attr_value(el, "alt"));
        let description = find_element(&dom.document, "figcaption").map(|el| {
            let mut text = String::new();
            collect_text(&el, &mut text);
            text.trim().to_string()
        });

        Ok(MediaData {
            kind,
            src,
            alt,
            description,
        })
    }

    /// A figure embed keeps its markup raw. The figcaption is lifted out as
    /// the description and removed from the stored HTML.
    fn rebuild_figure(&self, index: usize, token: &str) -> Result<EmbedData, ParseError> {
        let html = self.figures.get(index).ok_or_else(|| ParseError::MissingSentinel {
            token: token.trim().to_string(),
        })?;

        let dom = parse_dom(html);
        let root = find_element(&dom.document, "body").unwrap_or_else(|| dom.document.clone());

        let description = find_element(&root, "figcaption").map(|caption| {
            let mut text = String::new();
            collect_text(&caption, &mut text);
            detach(&caption);
            text.trim().to_string()
        });

        Ok(EmbedData {
            html: serialize_node(&root, true)?,
            description: description.filter(|d| !d.is_empty()),
        })
    }
}

/// Iframe and script embeds carry their stored outer HTML verbatim; scripts
/// in particular must not go through a re-parse, which would hoist them out
/// of the fragment.
fn rebuild_embed(store: &[String], index: usize, token: &str) -> Result<EmbedData, ParseError> {
    let html = store.get(index).ok_or_else(|| ParseError::MissingSentinel {
        token: token.trim().to_string(),
    })?;
    Ok(EmbedData {
        html: html.clone(),
        description: None,
    })
}

// ---------------------------------------------------------------------------
// Generic DOM -> block conversion
// ---------------------------------------------------------------------------

/// Inline context inherited down the tree: the active style set and entity.
#[derive(Debug, Clone, Default)]
struct InlineContext {
    styles: BTreeSet<InlineStyle>,
    entity: Option<crate::content::entity::EntityKey>,
}

impl InlineContext {
    fn with_style(&self, style: InlineStyle) -> Self {
        let mut next = self.clone();
        next.styles.insert(style);
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ListScope {
    Unordered,
    Ordered,
}

struct BlockConverter {
    blocks: Vec<ContentBlock>,
    entities: EntityMap,
    current: Option<ContentBlock>,
    list_stack: Vec<ListScope>,
}

impl BlockConverter {
    fn new() -> Self {
        BlockConverter {
            blocks: Vec::new(),
            entities: EntityMap::empty(),
            current: None,
            list_stack: Vec::new(),
        }
    }

    fn walk(&mut self, node: &Handle, cx: &InlineContext) {
        match &node.data {
            NodeData::Text { contents } => {
                self.append_text(&contents.borrow(), cx);
            }
            NodeData::Element { name, .. } => {
                let tag: &str = &name.local;
                match tag {
                    "p" | "div" => self.block_element(node, BlockType::Unstyled, cx),
                    "h1" => self.block_element(node, BlockType::Header(1), cx),
                    "h2" => self.block_element(node, BlockType::Header(2), cx),
                    "h3" => self.block_element(node, BlockType::Header(3), cx),
                    "h4" => self.block_element(node, BlockType::Header(4), cx),
                    "h5" => self.block_element(node, BlockType::Header(5), cx),
                    "h6" => self.block_element(node, BlockType::Header(6), cx),
                    "blockquote" | "quote" => self.block_element(node, BlockType::Blockquote, cx),
                    "ul" => self.list_element(node, ListScope::Unordered, cx),
                    "ol" => self.list_element(node, ListScope::Ordered, cx),
                    "li" => self.list_item(node, cx),
                    "figure" => self.figure(node),
                    "a" => self.anchor(node, cx),
                    "b" | "strong" => self.walk_children(node, &cx.with_style(InlineStyle::Bold)),
                    "i" | "em" => self.walk_children(node, &cx.with_style(InlineStyle::Italic)),
                    "u" => self.walk_children(node, &cx.with_style(InlineStyle::Underline)),
                    "s" | "del" => {
                        self.walk_children(node, &cx.with_style(InlineStyle::Strikethrough))
                    }
                    "sub" => self.walk_children(node, &cx.with_style(InlineStyle::Subscript)),
                    "sup" => self.walk_children(node, &cx.with_style(InlineStyle::Superscript)),
                    "br" => self.append_char('\n', cx),
                    "style" => {}
                    _ => self.walk_children(node, cx),
                }
            }
            NodeData::Comment { .. } | NodeData::Doctype { .. } => {}
            _ => self.walk_children(node, cx),
        }
    }

    fn walk_children(&mut self, node: &Handle, cx: &InlineContext) {
        for child in node.children.borrow().iter() {
            self.walk(child, cx);
        }
    }

    fn block_element(&mut self, node: &Handle, block_type: BlockType, cx: &InlineContext) {
        self.finish_current();
        self.current = Some(ContentBlock::new(block_type));
        self.walk_children(node, cx);
        self.finish_current();
    }

    fn list_element(&mut self, node: &Handle, scope: ListScope, cx: &InlineContext) {
        // A nested list closes the li block it sits inside; its items become
        // deeper siblings.
        self.finish_current();
        self.list_stack.push(scope);
        self.walk_children(node, cx);
        self.list_stack.pop();
    }

    fn list_item(&mut self, node: &Handle, cx: &InlineContext) {
        self.finish_current();
        let block_type = match self.list_stack.last() {
            Some(ListScope::Ordered) => BlockType::OrderedListItem,
            _ => BlockType::UnorderedListItem,
        };
        let mut block = ContentBlock::new(block_type);
        block.depth = self.list_stack.len().saturating_sub(1);
        self.current = Some(block);
        self.walk_children(node, cx);
        self.finish_current();
    }

    /// Figures become atomic candidates carrying their text content; the
    /// post-processing pass decides what they really are.
    fn figure(&mut self, node: &Handle) {
        self.finish_current();
        let mut text = String::new();
        collect_text(node, &mut text);
        self.blocks
            .push(ContentBlock::from_text(BlockType::Atomic, text.trim()));
    }

    fn anchor(&mut self, node: &Handle, cx: &InlineContext) {
        match attr_value(node, "href") {
            Some(href) => {
                let key = self.entities.insert(crate::content::entity::Entity {
                    kind: EntityKind::Link {
                        href,
                        target: attr_value(node, "target"),
                    },
                    mutability: Mutability::Mutable,
                });
                let mut next = cx.clone();
                next.entity = Some(key);
                self.walk_children(node, &next);
            }
            None => self.walk_children(node, cx),
        }
    }

    /// Append text with HTML whitespace collapsing. Text arriving outside
    /// any block element opens an implicit paragraph.
    fn append_text(&mut self, text: &str, cx: &InlineContext) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                let current_ends_in_space = self
                    .current
                    .as_ref()
                    .map(|b| b.text.is_empty() || b.text.ends_with(' '))
                    .unwrap_or(true);
                if !current_ends_in_space {
                    self.append_char(' ', cx);
                }
            } else {
                self.append_char(ch, cx);
            }
        }
    }

    fn append_char(&mut self, ch: char, cx: &InlineContext) {
        let block = self
            .current
            .get_or_insert_with(|| ContentBlock::new(BlockType::Unstyled));
        block.push_char(
            ch,
            CharacterMetadata {
                styles: cx.styles.clone(),
                entity: cx.entity,
            },
        );
    }

    fn finish_current(&mut self) {
        if let Some(mut block) = self.current.take() {
            while block.text.ends_with(|c: char| c.is_whitespace()) {
                block.text.pop();
                block.chars.pop();
            }
            self.blocks.push(block);
        }
    }

    fn finish(mut self) -> ContentState {
        self.finish_current();
        if self.blocks.is_empty() {
            self.blocks.push(ContentBlock::new(BlockType::Unstyled));
        }
        ContentState {
            blocks: self.blocks,
            entities: self.entities,
        }
    }
}

// ---------------------------------------------------------------------------
// DOM helpers
// ---------------------------------------------------------------------------

fn parse_dom(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

fn element_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&name.local),
        _ => None,
    }
}

fn attr_value(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attr_name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn has_class(node: &Handle, class: &str) -> bool {
    attr_value(node, "class")
        .map(|v| v.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// Depth-first search for the first element with the given tag name.
fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    if element_name(node) == Some(tag) {
        return Some(node.clone());
    }
    for child in node.children.borrow().iter() {
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

/// Collect all elements with the given tag name, in document order.
fn collect_elements(node: &Handle, tag: &str) -> Vec<Handle> {
    let mut out = Vec::new();
    fn go(node: &Handle, tag: &str, out: &mut Vec<Handle>) {
        if element_name(node) == Some(tag) {
            out.push(node.clone());
        }
        for child in node.children.borrow().iter() {
            go(child, tag, out);
        }
    }
    go(node, tag, &mut out);
    out
}

fn collect_cells(row: &Handle) -> Vec<Handle> {
    let mut cells = collect_elements(row, "th");
    cells.extend(collect_elements(row, "td"));
    // Keep document order across the two tag names.
    cells.sort_by_key(|cell| cell_position(row, cell));
    cells
}

/// Position of a cell among the row's direct children, for ordering mixed
/// th/td rows.
fn cell_position(row: &Handle, cell: &Handle) -> usize {
    row.children
        .borrow()
        .iter()
        .position(|c| Rc::ptr_eq(c, cell))
        .unwrap_or(usize::MAX)
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

/// Serialize a node back to HTML, either its children only (inner HTML) or
/// the node itself (outer HTML).
fn serialize_node(node: &Handle, inner: bool) -> Result<String, ParseError> {
    let mut buf = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: if inner {
            TraversalScope::ChildrenOnly(None)
        } else {
            TraversalScope::IncludeNode
        },
        ..Default::default()
    };
    let serializable: SerializableHandle = node.clone().into();
    serialize(&mut buf, &serializable, opts).map_err(|e| ParseError::Serialize(e.to_string()))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Walk the tree replacing every node the matcher accepts with a sentinel
/// placeholder, storing its serialized HTML (inner or outer). Matched
/// subtrees are not descended into.
fn prune_pass(
    node: &Handle,
    matches: &dyn Fn(&Handle) -> bool,
    inner: bool,
    store: &mut Vec<String>,
    prefix: &str,
) -> Result<(), ParseError> {
    let mut children = node.children.borrow_mut();
    for slot in children.iter_mut() {
        if matches(slot) {
            let index = store.len();
            store.push(serialize_node(slot, inner)?);
            replace_with_placeholder(node, slot, prefix, index);
        } else {
            prune_pass(slot, matches, inner, store, prefix)?;
        }
    }
    Ok(())
}

/// Placeholder figures inserted by earlier pruning passes carry sentinel
/// text and must not be re-extracted.
fn is_placeholder(node: &Handle) -> bool {
    let mut text = String::new();
    collect_text(node, &mut text);
    text.trim().starts_with("BLOCK_")
}

fn detach(node: &Handle) {
    if let Some(parent) = node.parent.take().and_then(|weak| weak.upgrade()) {
        parent.children.borrow_mut().retain(|c| !Rc::ptr_eq(c, node));
    }
}

fn replace_with_placeholder(parent: &Handle, slot: &mut Handle, prefix: &str, index: usize) {
    let token = format!("{}{}", prefix, index);
    let text = Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(token.as_str())),
    });
    let figure = Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), local_name!("figure")),
        attrs: RefCell::new(Vec::new()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    });
    text.parent.set(Some(Rc::downgrade(&figure)));
    figure.children.borrow_mut().push(text);
    figure.parent.set(Some(Rc::downgrade(parent)));
    *slot = figure;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paragraphs_become_unstyled_blocks() {
        let state = from_html("<p>one</p><p>two</p>").unwrap();
        assert_eq!(state.blocks.len(), 2);
        assert_eq!(state.blocks[0].text, "one");
        assert_eq!(state.blocks[1].block_type, BlockType::Unstyled);
    }

    #[test]
    fn headings_carry_their_level() {
        let state = from_html("<h3>title</h3>").unwrap();
        assert_eq!(state.blocks[0].block_type, BlockType::Header(3));
        assert_eq!(state.blocks[0].text, "title");
    }

    #[test]
    fn inline_styles_are_per_character() {
        let state = from_html("<p>a<b>b</b>c</p>").unwrap();
        let block = &state.blocks[0];
        assert_eq!(block.text, "abc");
        assert!(block.chars[0].styles.is_empty());
        assert!(block.chars[1].styles.contains(&InlineStyle::Bold));
        assert!(block.chars[2].styles.is_empty());
    }

    #[test]
    fn links_share_one_entity_across_their_span() {
        let state = from_html("<p><a href=\"https://example.com\">hi</a></p>").unwrap();
        let block = &state.blocks[0];
        let key = block.chars[0].entity.expect("entity on first char");
        assert_eq!(block.chars[1].entity, Some(key));
        match &state.entity(key).unwrap().kind {
            EntityKind::Link { href, .. } => assert_eq!(href, "https://example.com"),
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn nested_list_depth_tracks_wrappers() {
        let state =
            from_html("<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>").unwrap();
        let depths: Vec<(String, usize)> = state
            .blocks
            .iter()
            .map(|b| (b.text.clone(), b.depth))
            .collect();
        assert_eq!(
            depths,
            vec![
                ("a".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 0)
            ]
        );
        assert!(state.blocks.iter().all(|b| b.is_list_item()));
    }

    #[test]
    fn ordered_lists_are_distinguished() {
        let state = from_html("<ol><li>a</li></ol>").unwrap();
        assert_eq!(state.blocks[0].block_type, BlockType::OrderedListItem);
    }

    #[test]
    fn table_is_extracted_and_rebuilt() {
        let html = "<table><tbody><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></tbody></table>";
        let state = from_html(html).unwrap();
        let atomic = state
            .blocks
            .iter()
            .find(|b| b.block_type == BlockType::Atomic)
            .expect("atomic block");
        let key = atomic.atomic_entity().expect("table entity");
        match &state.entity(key).unwrap().kind {
            EntityKind::Table(data) => {
                assert_eq!(data.num_rows, 2);
                assert_eq!(data.num_cols, 2);
                let cell: ContentState = serde_json::from_str(&data.cells[1][0]).unwrap();
                assert_eq!(cell.blocks[0].text, "c");
            }
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn ragged_table_uses_first_row_column_count() {
        let html = "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td></tr></table>";
        let state = from_html(html).unwrap();
        let key = state.blocks[0].atomic_entity().unwrap();
        match &state.entity(key).unwrap().kind {
            EntityKind::Table(data) => {
                assert_eq!(data.num_cols, 2);
                let padded: ContentState = serde_json::from_str(&data.cells[1][1]).unwrap();
                assert!(padded.is_empty());
            }
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn media_block_captures_src_alt_and_description() {
        let html = "<figure class=\"media-block\"><img src=\"x.jpg\" alt=\"pin alt\" /><figcaption>pin desc</figcaption></figure>";
        let state = from_html(html).unwrap();
        let key = state.blocks[0].atomic_entity().unwrap();
        match &state.entity(key).unwrap().kind {
            EntityKind::Media(data) => {
                assert_eq!(data.kind, MediaKind::Image);
                assert_eq!(data.src.as_deref(), Some("x.jpg"));
                assert_eq!(data.alt.as_deref(), Some("pin alt"));
                assert_eq!(data.description.as_deref(), Some("pin desc"));
            }
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn media_block_without_media_element_yields_absent_attributes() {
        let html = "<div class=\"media-block\"><span>placeholder</span></div>";
        let state = from_html(html).unwrap();
        let key = state.blocks[0].atomic_entity().unwrap();
        match &state.entity(key).unwrap().kind {
            EntityKind::Media(data) => {
                assert_eq!(data.src, None);
                assert_eq!(data.alt, None);
                assert_eq!(data.description, None);
            }
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn video_is_found_when_no_img_present() {
        let html = "<div class=\"media-block\"><video src=\"clip.mp4\"></video></div>";
        let state = from_html(html).unwrap();
        let key = state.blocks[0].atomic_entity().unwrap();
        match &state.entity(key).unwrap().kind {
            EntityKind::Media(data) => {
                assert_eq!(data.kind, MediaKind::Video);
                assert_eq!(data.src.as_deref(), Some("clip.mp4"));
            }
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn iframe_becomes_an_embed_entity() {
        let state = from_html("<p>x</p><iframe src=\"https://e.example/v\"></iframe>").unwrap();
        let key = state.blocks[1].atomic_entity().unwrap();
        match &state.entity(key).unwrap().kind {
            EntityKind::Embed(data) => {
                assert_eq!(data.html, "<iframe src=\"https://e.example/v\"></iframe>");
                assert_eq!(data.description, None);
            }
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn figure_embed_lifts_caption_into_description() {
        let html = "<figure><iframe src=\"x\"></iframe><figcaption>cap</figcaption></figure>";
        let state = from_html(html).unwrap();
        let key = state.blocks[0].atomic_entity().unwrap();
        match &state.entity(key).unwrap().kind {
            EntityKind::Embed(data) => {
                assert_eq!(data.html, "<iframe src=\"x\"></iframe>");
                assert_eq!(data.description.as_deref(), Some("cap"));
            }
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn script_inside_markup_becomes_an_embed() {
        let state = from_html("<div>before<script>var x = 1;</script></div>").unwrap();
        let atomic = state
            .blocks
            .iter()
            .find(|b| b.block_type == BlockType::Atomic)
            .expect("atomic block");
        let key = atomic.atomic_entity().unwrap();
        match &state.entity(key).unwrap().kind {
            EntityKind::Embed(data) => {
                assert_eq!(data.html, "<script>var x = 1;</script>");
            }
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn loose_image_is_imported_as_embed() {
        let state = from_html("<p>before <img src=\"a.jpg\"> after</p>").unwrap();
        let texts: Vec<&str> = state.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["before", " ", "after"]);
        let key = state.blocks[1].atomic_entity().unwrap();
        match &state.entity(key).unwrap().kind {
            EntityKind::Embed(data) => assert_eq!(data.html, "<img src=\"a.jpg\">"),
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn media_block_class_wins_over_figure_embed() {
        let html = "<figure class=\"media-block\"><img src=\"x.jpg\" /></figure>";
        let state = from_html(html).unwrap();
        let key = state.blocks[0].atomic_entity().unwrap();
        assert!(matches!(
            &state.entity(key).unwrap().kind,
            EntityKind::Media(_)
        ));
    }

    #[test]
    fn empty_input_yields_one_empty_block() {
        let state = from_html("").unwrap();
        assert_eq!(state.blocks.len(), 1);
        assert_eq!(state.blocks[0].text, "");
        let state = from_html("   \n ").unwrap();
        assert_eq!(state.blocks.len(), 1);
    }

    #[test]
    fn whitespace_between_blocks_is_ignored() {
        let state = from_html("<p>a</p>\n   <p>b</p>").unwrap();
        assert_eq!(state.blocks.len(), 2);
    }

    #[test]
    fn quote_tag_parses_as_blockquote() {
        let state = from_html("<quote>said so</quote>").unwrap();
        assert_eq!(state.blocks[0].block_type, BlockType::Blockquote);
        assert_eq!(state.blocks[0].text, "said so");
    }
}
