//! Per-character inline rendering state for the generator: a style wrapper
//! and an entity wrapper that each diff the current character's metadata
//! against the previous character's and emit only the tags that changed.

use std::collections::BTreeSet;

use crate::content::InlineStyle;
use crate::content::entity::{EntityKey, EntityKind, EntityMap};

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        escape_char(ch, &mut out);
    }
    out
}

pub fn escape_char(ch: char, out: &mut String) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        _ => out.push(ch),
    }
}

pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("&quot;"),
            _ => escape_char(ch, &mut out),
        }
    }
    out
}

fn style_tag(style: InlineStyle) -> &'static str {
    match style {
        InlineStyle::Bold => "b",
        InlineStyle::Italic => "i",
        InlineStyle::Underline => "u",
        InlineStyle::Strikethrough => "s",
        InlineStyle::Subscript => "sub",
        InlineStyle::Superscript => "sup",
    }
}

/// Tracks the stack of currently open inline style tags. Transitions close
/// the styles that ended (popping anything stacked above them so the output
/// stays well nested) and open the styles that began.
#[derive(Debug, Default)]
pub struct StyleWrapper {
    open: Vec<InlineStyle>,
}

impl StyleWrapper {
    pub fn new() -> Self {
        StyleWrapper::default()
    }

    pub fn transition(&mut self, next: &BTreeSet<InlineStyle>, out: &mut String) {
        // Pop down to the deepest style that ended.
        if let Some(first_dead) = self.open.iter().position(|s| !next.contains(s)) {
            while self.open.len() > first_dead {
                if let Some(style) = self.open.pop() {
                    out.push_str("</");
                    out.push_str(style_tag(style));
                    out.push('>');
                }
            }
        }

        // Open new styles, including any survivors popped above.
        for &style in next {
            if !self.open.contains(&style) {
                out.push('<');
                out.push_str(style_tag(style));
                out.push('>');
                self.open.push(style);
            }
        }
    }

    /// Close everything still open. Called at block end so output is well
    /// formed even if bookkeeping went inconsistent mid-block.
    pub fn finish(&mut self, out: &mut String) {
        while let Some(style) = self.open.pop() {
            out.push_str("</");
            out.push_str(style_tag(style));
            out.push('>');
        }
    }
}

/// Tracks the currently open entity tag (links render as `<a>`; other
/// entity kinds have no inline form).
#[derive(Debug, Default)]
pub struct EntityWrapper {
    current: Option<EntityKey>,
    open_tag: bool,
}

impl EntityWrapper {
    pub fn new() -> Self {
        EntityWrapper::default()
    }

    pub fn transition(
        &mut self,
        next: Option<EntityKey>,
        entities: &EntityMap,
        out: &mut String,
    ) {
        if next == self.current {
            return;
        }
        self.close(out);
        self.current = next;

        let Some(key) = next else { return };
        match entities.get(key).map(|e| &e.kind) {
            Some(EntityKind::Link { href, target }) => {
                out.push_str("<a href=\"");
                out.push_str(&escape_attr(href));
                out.push('"');
                if let Some(target) = target {
                    out.push_str(" target=\"");
                    out.push_str(&escape_attr(target));
                    out.push('"');
                }
                out.push('>');
                self.open_tag = true;
            }
            Some(_) => {}
            None => {
                tracing::warn!(key = key.0, "character references unknown entity");
            }
        }
    }

    pub fn finish(&mut self, out: &mut String) {
        self.close(out);
        self.current = None;
    }

    fn close(&mut self, out: &mut String) {
        if self.open_tag {
            out.push_str("</a>");
            self.open_tag = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::entity::{Entity, Mutability};

    fn styles(list: &[InlineStyle]) -> BTreeSet<InlineStyle> {
        list.iter().copied().collect()
    }

    #[test]
    fn opens_and_closes_adjacent_styles() {
        let mut wrapper = StyleWrapper::new();
        let mut out = String::new();

        wrapper.transition(&styles(&[InlineStyle::Bold]), &mut out);
        out.push('a');
        wrapper.transition(&styles(&[InlineStyle::Italic]), &mut out);
        out.push('b');
        wrapper.finish(&mut out);

        assert_eq!(out, "<b>a</b><i>b</i>");
    }

    #[test]
    fn unchanged_styles_emit_nothing() {
        let mut wrapper = StyleWrapper::new();
        let mut out = String::new();
        let bold = styles(&[InlineStyle::Bold]);

        wrapper.transition(&bold, &mut out);
        out.push('a');
        wrapper.transition(&bold, &mut out);
        out.push('b');
        wrapper.finish(&mut out);

        assert_eq!(out, "<b>ab</b>");
    }

    #[test]
    fn inner_style_close_reopens_survivors() {
        let mut wrapper = StyleWrapper::new();
        let mut out = String::new();

        // b+i where b opened first, then i drops while b continues
        wrapper.transition(&styles(&[InlineStyle::Bold]), &mut out);
        out.push('a');
        wrapper.transition(&styles(&[InlineStyle::Bold, InlineStyle::Italic]), &mut out);
        out.push('b');
        wrapper.transition(&styles(&[InlineStyle::Bold]), &mut out);
        out.push('c');
        wrapper.finish(&mut out);

        assert_eq!(out, "<b>a<i>b</i>c</b>");
    }

    #[test]
    fn outer_style_close_restacks_inner() {
        let mut wrapper = StyleWrapper::new();
        let mut out = String::new();

        wrapper.transition(&styles(&[InlineStyle::Bold, InlineStyle::Italic]), &mut out);
        out.push('a');
        // Bold ends but italic continues: bold is under italic on the stack
        wrapper.transition(&styles(&[InlineStyle::Italic]), &mut out);
        out.push('b');
        wrapper.finish(&mut out);

        assert_eq!(out, "<b><i>a</i></b><i>b</i>");
    }

    #[test]
    fn link_entity_wraps_its_span() {
        let mut entities = EntityMap::empty();
        let key = entities.insert(Entity {
            kind: EntityKind::Link {
                href: "https://example.com/?a=1&b=2".to_string(),
                target: None,
            },
            mutability: Mutability::Mutable,
        });

        let mut wrapper = EntityWrapper::new();
        let mut out = String::new();
        wrapper.transition(Some(key), &entities, &mut out);
        out.push('x');
        wrapper.transition(None, &entities, &mut out);
        out.push('y');
        wrapper.finish(&mut out);

        assert_eq!(out, "<a href=\"https://example.com/?a=1&amp;b=2\">x</a>y");
    }

    #[test]
    fn escaping_covers_markup_characters() {
        assert_eq!(escape_text("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }
}
