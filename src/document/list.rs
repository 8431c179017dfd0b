//! Ordered and unordered lists.

use super::Paragraph;

/// How list items are marked.
///
/// Ordered lists number their items with decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MarkerStyle {
    #[default]
    Ordered,
    Unordered,
}

/// One list entry wrapping exactly one paragraph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListItem {
    pub paragraph: Paragraph,
}

impl ListItem {
    pub fn new(paragraph: Paragraph) -> Self {
        Self { paragraph }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct List {
    pub items: Vec<ListItem>,
    pub marker: MarkerStyle,
}

impl List {
    pub fn new(marker: MarkerStyle) -> Self {
        Self {
            items: Vec::new(),
            marker,
        }
    }

    pub fn push(&mut self, paragraph: Paragraph) {
        self.items.push(ListItem::new(paragraph));
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.items.iter().map(|item| &item.paragraph)
    }
}
