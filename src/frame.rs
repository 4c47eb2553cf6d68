//! Tree preparation – the walk that runs once before any layout work.
//!
//! It borrows the [`DocumentTree`], numbers every node in pre-order, resolves
//! every text run's font name against the [`FontTable`] and records whether
//! the document uses page tokens at all (which decides between one and two
//! pagination passes). Unknown fonts fail here, before a page exists.

use crate::error::ComposeError;
use crate::fonts::{FaceId, FontTable};
use crate::style::{Color, EffectiveStyle};
use crate::tree::*;

/// A prepared node: the borrowed tree node plus its id and resolved faces.
#[derive(Debug)]
pub struct Frame<'t> {
    /// Pre-order index, unique within the document.
    pub id: usize,
    pub kind: FrameKind<'t>,
}

#[derive(Debug)]
pub enum FrameKind<'t> {
    Row {
        spacing: f32,
        items: Vec<(RowSizing, Frame<'t>)>,
    },
    Column {
        spacing: f32,
        items: Vec<Frame<'t>>,
    },
    Box {
        decoration: &'t Decoration,
        child: Box<Frame<'t>>,
    },
    Text {
        runs: Vec<PreparedRun<'t>>,
        align: TextAlign,
    },
    Placeholder,
    Image(&'t ImageNode),
    PageBreak,
    Empty,
}

#[derive(Debug, Clone, Copy)]
pub struct PreparedRun<'t> {
    pub content: &'t RunContent,
    pub style: &'t EffectiveStyle,
    pub face: FaceId,
}

#[derive(Debug)]
pub struct PreparedPage<'t> {
    pub size: Option<PageSize>,
    pub margin: Option<Edges>,
    pub background: Option<Color>,
    pub header: Option<Frame<'t>>,
    pub content: Option<Frame<'t>>,
    pub footer: Option<Frame<'t>>,
}

#[derive(Debug)]
pub struct PreparedDocument<'t> {
    pub metadata: &'t DocumentMetadata,
    pub pages: Vec<PreparedPage<'t>>,
    /// Total number of frames; ids are `0..node_count`.
    pub node_count: usize,
    pub has_page_tokens: bool,
}

struct Preparer<'f> {
    fonts: &'f FontTable,
    next_id: usize,
    has_page_tokens: bool,
}

impl<'f> Preparer<'f> {
    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn slot<'t>(&mut self, node: Option<&'t LayoutNode>) -> Result<Frame<'t>, ComposeError> {
        match node {
            Some(node) => self.frame(node),
            None => Ok(Frame {
                id: self.next_id(),
                kind: FrameKind::Empty,
            }),
        }
    }

    fn frame<'t>(&mut self, node: &'t LayoutNode) -> Result<Frame<'t>, ComposeError> {
        let id = self.next_id();
        let kind = match node {
            LayoutNode::Row(row) => {
                let mut items = Vec::with_capacity(row.items.len());
                for item in &row.items {
                    items.push((item.sizing, self.slot(item.child.as_ref())?));
                }
                FrameKind::Row {
                    spacing: row.spacing,
                    items,
                }
            }
            LayoutNode::Column(col) => {
                let mut items = Vec::with_capacity(col.items.len());
                for item in &col.items {
                    items.push(self.slot(item.as_ref())?);
                }
                FrameKind::Column {
                    spacing: col.spacing,
                    items,
                }
            }
            LayoutNode::Box(b) => FrameKind::Box {
                decoration: &b.decoration,
                child: Box::new(self.frame(&b.child)?),
            },
            LayoutNode::Text(text) => {
                let mut runs = Vec::with_capacity(text.runs.len());
                for run in &text.runs {
                    let face = self.fonts.resolve(&run.style.font)?;
                    self.has_page_tokens |= run.content.is_page_token();
                    runs.push(PreparedRun {
                        content: &run.content,
                        style: &run.style,
                        face,
                    });
                }
                FrameKind::Text {
                    runs,
                    align: text.align,
                }
            }
            LayoutNode::Placeholder => FrameKind::Placeholder,
            LayoutNode::Image(img) => FrameKind::Image(img),
            LayoutNode::PageBreak => FrameKind::PageBreak,
            LayoutNode::Empty => FrameKind::Empty,
        };
        Ok(Frame { id, kind })
    }
}

/// Resolve fonts and number nodes.
pub fn prepare<'t>(
    tree: &'t DocumentTree,
    fonts: &FontTable,
) -> Result<PreparedDocument<'t>, ComposeError> {
    let mut preparer = Preparer {
        fonts,
        next_id: 0,
        has_page_tokens: false,
    };

    let mut pages = Vec::with_capacity(tree.pages.len());
    for page in &tree.pages {
        let header = page.header.as_ref().map(|n| preparer.frame(n)).transpose()?;
        let content = page.content.as_ref().map(|n| preparer.frame(n)).transpose()?;
        let footer = page.footer.as_ref().map(|n| preparer.frame(n)).transpose()?;
        pages.push(PreparedPage {
            size: page.size,
            margin: page.margin,
            background: page.background,
            header,
            content,
            footer,
        });
    }

    log::debug!(
        "prepared {} frame(s), page tokens: {}",
        preparer.next_id,
        preparer.has_page_tokens
    );

    Ok(PreparedDocument {
        metadata: &tree.metadata,
        pages,
        node_count: preparer.next_id,
        has_page_tokens: preparer.has_page_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(font: &str, content: RunContent) -> LayoutNode {
        LayoutNode::Text(TextNode {
            runs: vec![TextRun {
                content,
                style: EffectiveStyle {
                    font: font.to_string(),
                    ..EffectiveStyle::default()
                },
            }],
            align: TextAlign::Left,
        })
    }

    fn tree(content: LayoutNode, footer: Option<LayoutNode>) -> DocumentTree {
        DocumentTree {
            metadata: DocumentMetadata::default(),
            pages: vec![PageNode {
                content: Some(content),
                footer,
                ..PageNode::default()
            }],
        }
    }

    #[test]
    fn ids_are_preorder() {
        let doc = tree(
            LayoutNode::Column(ColumnNode {
                spacing: 0.0,
                items: vec![
                    Some(text("Helvetica", RunContent::Literal("a".into()))),
                    None,
                    Some(LayoutNode::PageBreak),
                ],
            }),
            None,
        );
        let fonts = FontTable::with_builtin_faces();
        let prepared = prepare(&doc, &fonts).unwrap();
        assert_eq!(prepared.node_count, 4);
        let Some(Frame {
            id: 0,
            kind: FrameKind::Column { items, .. },
        }) = &prepared.pages[0].content
        else {
            panic!("expected column at id 0");
        };
        let ids: Vec<usize> = items.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(!prepared.has_page_tokens);
    }

    #[test]
    fn unknown_font_fails_before_layout() {
        let doc = tree(text("Helvetica", RunContent::Literal("x".into())), None);
        let err = prepare(&doc, &FontTable::new()).unwrap_err();
        assert!(matches!(err, ComposeError::UnresolvedFont { name } if name == "Helvetica"));
    }

    #[test]
    fn page_tokens_are_detected() {
        let doc = tree(
            LayoutNode::Empty,
            Some(text("Courier", RunContent::TotalPages)),
        );
        let prepared = prepare(&doc, &FontTable::with_builtin_faces()).unwrap();
        assert!(prepared.has_page_tokens);
    }
}
