//! Layout tree – the abstract, unpositioned description of a document
//! produced by the [`builder`](crate::builder) API and consumed by the
//! [`pagination`](crate::pagination) engine.
//!
//! Every child is owned by exactly one parent and builders only ever append,
//! so the tree is acyclic by construction.

use serde::{Deserialize, Serialize};

use crate::style::{Color, EffectiveStyle};

/// A composed document: metadata plus one or more page sections.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTree {
    pub metadata: DocumentMetadata,
    pub pages: Vec<PageNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: Option<String>,
    pub subject: Option<String>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            title: "invoice-forge output".to_string(),
            author: None,
            subject: None,
        }
    }
}

/// Page size in PDF points (1 pt = 1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    // A4: 210mm × 297mm = 595.28 × 841.89 points
    pub const A4: Self = Self {
        width: 595.28,
        height: 841.89,
    };
    pub const LETTER: Self = Self {
        width: 612.0,
        height: 792.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// The same size with width and height swapped so that width ≥ height.
    pub fn landscape(self) -> Self {
        Self {
            width: self.width.max(self.height),
            height: self.width.min(self.height),
        }
    }
}

/// Per-side lengths in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub const fn all(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub const fn symmetric(vertical: f32, horizontal: f32) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// One page section: every page it produces shares its size, margin,
/// header and footer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageNode {
    /// Falls back to the pipeline's default page size.
    pub size: Option<PageSize>,
    /// Falls back to the pipeline's default margin.
    pub margin: Option<Edges>,
    pub background: Option<Color>,
    pub header: Option<LayoutNode>,
    pub content: Option<LayoutNode>,
    pub footer: Option<LayoutNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    /// Horizontal arrangement; atomic across page breaks.
    Row(RowNode),
    /// Vertical stack; splits across pages between items.
    Column(ColumnNode),
    /// Single-child decorator.
    Box(BoxNode),
    Text(TextNode),
    /// Grey stand-in box for content that is not designed yet.
    Placeholder,
    Image(ImageNode),
    /// Ends the current page when reached inside a column.
    PageBreak,
    Empty,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowNode {
    pub spacing: f32,
    pub items: Vec<RowItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowItem {
    pub sizing: RowSizing,
    pub child: Option<LayoutNode>,
}

/// How a row item's width is determined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowSizing {
    /// Share of the width left after constant and auto items.
    Relative(f32),
    /// Fixed width in points.
    Constant(f32),
    /// The child's intrinsic width.
    Auto,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnNode {
    pub spacing: f32,
    /// `None` marks an item slot that was opened but never filled.
    pub items: Vec<Option<LayoutNode>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxNode {
    pub decoration: Decoration,
    pub child: Box<LayoutNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decoration {
    Padding(Edges),
    Align(Alignment),
    Constrain(SizeConstraints),
    Background(Color),
    Border(Border),
    /// Named location; copied onto the placed box.
    Section(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

/// Unset axes keep the child at the start edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Alignment {
    pub horizontal: Option<HorizontalAlign>,
    pub vertical: Option<VerticalAlign>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SizeConstraints {
    pub width: Option<f32>,
    pub height: Option<f32>,
    /// Fraction of the available width, in (0, 1].
    pub relative_width: Option<f32>,
    pub min_width: Option<f32>,
    pub max_width: Option<f32>,
    pub min_height: Option<f32>,
    pub max_height: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Border {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextNode {
    pub runs: Vec<TextRun>,
    pub align: TextAlign,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub content: RunContent,
    pub style: EffectiveStyle,
}

/// Literal text or a page token resolved during pagination.
#[derive(Debug, Clone, PartialEq)]
pub enum RunContent {
    Literal(String),
    CurrentPageNumber,
    TotalPages,
}

impl RunContent {
    pub fn is_page_token(&self) -> bool {
        !matches!(self, RunContent::Literal(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A raster image given as a base64 data URI.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageNode {
    pub src: String,
    pub px_width: u32,
    pub px_height: u32,
}

impl LayoutNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + match self {
            LayoutNode::Row(row) => row
                .items
                .iter()
                .filter_map(|item| item.child.as_ref())
                .map(LayoutNode::node_count)
                .sum(),
            LayoutNode::Column(col) => col
                .items
                .iter()
                .flatten()
                .map(LayoutNode::node_count)
                .sum(),
            LayoutNode::Box(b) => b.child.node_count(),
            _ => 0,
        }
    }
}
