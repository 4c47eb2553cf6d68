//! Fluent composition API.
//!
//! A [`Document`] composes itself into a [`DocumentContainer`]; each page
//! exposes three single-slot [`Container`]s (header, content, footer).
//! Decorator calls on a container queue up and are materialised, outermost
//! first, when a terminal call (`text`, `row`, `column`, ...) fills the slot.
//! Multi-child containers hand out one fresh slot per `item` call.

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::error::ComposeError;
use crate::style::{Color, EffectiveStyle};
use crate::tree::*;

/// Something that can describe itself as a layout tree.
pub trait Document {
    fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata::default()
    }

    fn compose(&self, document: &mut DocumentContainer) -> Result<(), ComposeError>;
}

/// Run a document's composition and collect the resulting tree.
pub fn compose_document<D: Document + ?Sized>(document: &D) -> Result<DocumentTree, ComposeError> {
    let mut container = DocumentContainer::default();
    document.compose(&mut container)?;
    log::debug!("composed {} page section(s)", container.pages.len());
    Ok(DocumentTree {
        metadata: document.metadata(),
        pages: container.pages,
    })
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

pub(crate) fn positive(constraint: &'static str, value: f32) -> Result<f32, ComposeError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ComposeError::constraint(constraint, value))
    }
}

pub(crate) fn non_negative(constraint: &'static str, value: f32) -> Result<f32, ComposeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ComposeError::constraint(constraint, value))
    }
}

/// `min <= fixed <= max` over whichever bounds are set.
fn check_bounds(
    fixed: Option<f32>,
    min: Option<f32>,
    max: Option<f32>,
    messages: [&'static str; 3],
) -> Result<(), ComposeError> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ComposeError::constraint(messages[0], min));
        }
    }
    if let Some(value) = fixed {
        if min.is_some_and(|min| value < min) {
            return Err(ComposeError::constraint(messages[1], value));
        }
        if max.is_some_and(|max| value > max) {
            return Err(ComposeError::constraint(messages[2], value));
        }
    }
    Ok(())
}

fn check_edges(constraint: &'static str, edges: Edges) -> Result<Edges, ComposeError> {
    for v in [edges.top, edges.right, edges.bottom, edges.left] {
        non_negative(constraint, v)?;
    }
    Ok(edges)
}

// ---------------------------------------------------------------------------
// Document & page
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct DocumentContainer {
    pages: Vec<PageNode>,
}

impl DocumentContainer {
    /// Add a page section.
    pub fn page<F>(&mut self, f: F) -> Result<(), ComposeError>
    where
        F: FnOnce(&mut PageBuilder) -> Result<(), ComposeError>,
    {
        let mut page = PageBuilder {
            node: PageNode::default(),
        };
        f(&mut page)?;
        self.pages.push(page.node);
        Ok(())
    }
}

pub struct PageBuilder {
    node: PageNode,
}

impl PageBuilder {
    pub fn size(&mut self, size: PageSize) -> Result<(), ComposeError> {
        positive("page width", size.width)?;
        positive("page height", size.height)?;
        self.node.size = Some(size);
        Ok(())
    }

    pub fn margin(&mut self, value: f32) -> Result<(), ComposeError> {
        self.margin_edges(Edges::all(value))
    }

    pub fn margin_vertical(&mut self, value: f32) -> Result<(), ComposeError> {
        let current = self.node.margin.unwrap_or_default();
        self.margin_edges(Edges {
            top: value,
            bottom: value,
            ..current
        })
    }

    pub fn margin_horizontal(&mut self, value: f32) -> Result<(), ComposeError> {
        let current = self.node.margin.unwrap_or_default();
        self.margin_edges(Edges {
            left: value,
            right: value,
            ..current
        })
    }

    pub fn margin_edges(&mut self, edges: Edges) -> Result<(), ComposeError> {
        self.node.margin = Some(check_edges("margin", edges)?);
        Ok(())
    }

    pub fn background(&mut self, color: Color) {
        self.node.background = Some(color);
    }

    /// Repeated at the top of every page of this section.
    pub fn header(&mut self) -> Container<'_> {
        Container::new(&mut self.node.header, "header")
    }

    /// Flowing content; split across as many pages as needed.
    pub fn content(&mut self) -> Container<'_> {
        Container::new(&mut self.node.content, "content")
    }

    /// Repeated at the bottom of every page of this section.
    pub fn footer(&mut self) -> Container<'_> {
        Container::new(&mut self.node.footer, "footer")
    }
}

// ---------------------------------------------------------------------------
// Single-slot container
// ---------------------------------------------------------------------------

/// Handle to one empty slot in the tree.
///
/// Decorators return the same handle; terminal calls consume it.
#[must_use = "a container does nothing until a terminal call fills it"]
pub struct Container<'a> {
    slot: &'a mut Option<LayoutNode>,
    slot_name: &'static str,
    decorations: Vec<Decoration>,
}

impl<'a> Container<'a> {
    fn new(slot: &'a mut Option<LayoutNode>, slot_name: &'static str) -> Self {
        Self {
            slot,
            slot_name,
            decorations: Vec::new(),
        }
    }

    fn decorate(mut self, decoration: Decoration) -> Self {
        self.decorations.push(decoration);
        self
    }

    fn align(mut self, alignment: Alignment) -> Self {
        if let Some(Decoration::Align(current)) = self.decorations.last_mut() {
            current.horizontal = alignment.horizontal.or(current.horizontal);
            current.vertical = alignment.vertical.or(current.vertical);
            return self;
        }
        self.decorate(Decoration::Align(alignment))
    }

    fn constrain(
        mut self,
        update: impl FnOnce(&mut SizeConstraints),
    ) -> Result<Self, ComposeError> {
        let merge = matches!(self.decorations.last(), Some(Decoration::Constrain(_)));
        if !merge {
            self.decorations
                .push(Decoration::Constrain(SizeConstraints::default()));
        }
        if let Some(Decoration::Constrain(c)) = self.decorations.last_mut() {
            update(c);
            check_bounds(
                c.width,
                c.min_width,
                c.max_width,
                ["min width above max width", "width below min width", "width above max width"],
            )?;
            check_bounds(
                c.height,
                c.min_height,
                c.max_height,
                ["min height above max height", "height below min height", "height above max height"],
            )?;
        }
        Ok(self)
    }

    // -- decorators --------------------------------------------------------

    pub fn padding(self, value: f32) -> Result<Self, ComposeError> {
        self.padding_edges(Edges::all(value))
    }

    pub fn padding_vertical(self, value: f32) -> Result<Self, ComposeError> {
        self.padding_edges(Edges::symmetric(value, 0.0))
    }

    pub fn padding_horizontal(self, value: f32) -> Result<Self, ComposeError> {
        self.padding_edges(Edges::symmetric(0.0, value))
    }

    pub fn padding_edges(self, edges: Edges) -> Result<Self, ComposeError> {
        let edges = check_edges("padding", edges)?;
        Ok(self.decorate(Decoration::Padding(edges)))
    }

    pub fn align_left(self) -> Self {
        self.align(Alignment {
            horizontal: Some(HorizontalAlign::Left),
            vertical: None,
        })
    }

    pub fn align_center(self) -> Self {
        self.align(Alignment {
            horizontal: Some(HorizontalAlign::Center),
            vertical: None,
        })
    }

    pub fn align_right(self) -> Self {
        self.align(Alignment {
            horizontal: Some(HorizontalAlign::Right),
            vertical: None,
        })
    }

    pub fn align_top(self) -> Self {
        self.align(Alignment {
            horizontal: None,
            vertical: Some(VerticalAlign::Top),
        })
    }

    pub fn align_middle(self) -> Self {
        self.align(Alignment {
            horizontal: None,
            vertical: Some(VerticalAlign::Middle),
        })
    }

    pub fn align_bottom(self) -> Self {
        self.align(Alignment {
            horizontal: None,
            vertical: Some(VerticalAlign::Bottom),
        })
    }

    pub fn width(self, value: f32) -> Result<Self, ComposeError> {
        let value = positive("width", value)?;
        self.constrain(|c| c.width = Some(value))
    }

    pub fn height(self, value: f32) -> Result<Self, ComposeError> {
        let value = positive("height", value)?;
        self.constrain(|c| c.height = Some(value))
    }

    /// Width as a fraction of the available width.
    pub fn relative_width(self, fraction: f32) -> Result<Self, ComposeError> {
        if !(fraction.is_finite() && fraction > 0.0 && fraction <= 1.0) {
            return Err(ComposeError::constraint("relative width", fraction));
        }
        self.constrain(|c| c.relative_width = Some(fraction))
    }

    pub fn min_width(self, value: f32) -> Result<Self, ComposeError> {
        let value = non_negative("min width", value)?;
        self.constrain(|c| c.min_width = Some(value))
    }

    pub fn max_width(self, value: f32) -> Result<Self, ComposeError> {
        let value = positive("max width", value)?;
        self.constrain(|c| c.max_width = Some(value))
    }

    pub fn min_height(self, value: f32) -> Result<Self, ComposeError> {
        let value = non_negative("min height", value)?;
        self.constrain(|c| c.min_height = Some(value))
    }

    pub fn max_height(self, value: f32) -> Result<Self, ComposeError> {
        let value = positive("max height", value)?;
        self.constrain(|c| c.max_height = Some(value))
    }

    pub fn background(self, color: Color) -> Self {
        self.decorate(Decoration::Background(color))
    }

    pub fn border(self, width: f32, color: Color) -> Result<Self, ComposeError> {
        let width = positive("border width", width)?;
        Ok(self.decorate(Decoration::Border(Border { width, color })))
    }

    /// Tag the placed box with a name (visible in the page layout).
    pub fn section(self, name: impl Into<String>) -> Self {
        self.decorate(Decoration::Section(name.into()))
    }

    // -- terminals ---------------------------------------------------------

    fn fill(self, node: LayoutNode) -> Result<(), ComposeError> {
        if self.slot.is_some() {
            return Err(ComposeError::MultipleChildren {
                slot: self.slot_name,
            });
        }
        let node = self
            .decorations
            .into_iter()
            .rev()
            .fold(node, |child, decoration| {
                LayoutNode::Box(BoxNode {
                    decoration,
                    child: Box::new(child),
                })
            });
        *self.slot = Some(node);
        Ok(())
    }

    /// Hand the container to a composing function.
    pub fn element<F>(self, f: F) -> Result<(), ComposeError>
    where
        F: FnOnce(Container<'a>) -> Result<(), ComposeError>,
    {
        f(self)
    }

    /// Single-run text.
    pub fn text(self, content: impl Into<String>, style: &EffectiveStyle) -> Result<(), ComposeError> {
        style.validate()?;
        self.fill(LayoutNode::Text(TextNode {
            runs: vec![TextRun {
                content: RunContent::Literal(content.into()),
                style: style.clone(),
            }],
            align: TextAlign::Left,
        }))
    }

    /// Multi-run text, possibly with page tokens.
    pub fn text_runs<F>(self, f: F) -> Result<(), ComposeError>
    where
        F: FnOnce(&mut TextBuilder),
    {
        let mut text = TextBuilder::default();
        f(&mut text);
        for run in &text.node.runs {
            run.style.validate()?;
        }
        self.fill(LayoutNode::Text(text.node))
    }

    pub fn row<F>(self, f: F) -> Result<(), ComposeError>
    where
        F: FnOnce(&mut RowBuilder) -> Result<(), ComposeError>,
    {
        let mut row = RowBuilder::default();
        f(&mut row)?;
        self.fill(LayoutNode::Row(row.node))
    }

    pub fn column<F>(self, f: F) -> Result<(), ComposeError>
    where
        F: FnOnce(&mut ColumnBuilder) -> Result<(), ComposeError>,
    {
        let mut column = ColumnBuilder::default();
        f(&mut column)?;
        self.fill(LayoutNode::Column(column.node))
    }

    pub fn placeholder(self) -> Result<(), ComposeError> {
        self.fill(LayoutNode::Placeholder)
    }

    /// Image from a `data:<mime>;base64,<data>` URI; decoded now to learn its size.
    pub fn image(self, data_uri: &str) -> Result<(), ComposeError> {
        let bytes = decode_data_uri(data_uri).map_err(ComposeError::InvalidImage)?;
        let img = ::image::load_from_memory(&bytes)
            .map_err(|e| ComposeError::InvalidImage(format!("decode error: {e}")))?;
        let (px_width, px_height) = (img.width(), img.height());
        if px_width == 0 || px_height == 0 {
            return Err(ComposeError::InvalidImage("image has no pixels".to_string()));
        }
        self.fill(LayoutNode::Image(ImageNode {
            src: data_uri.to_string(),
            px_width,
            px_height,
        }))
    }

    pub fn page_break(self) -> Result<(), ComposeError> {
        self.fill(LayoutNode::PageBreak)
    }

    /// Fill the slot with nothing (decorations still apply).
    pub fn empty(self) -> Result<(), ComposeError> {
        self.fill(LayoutNode::Empty)
    }
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
pub fn decode_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let rest = src.strip_prefix("data:").ok_or_else(|| {
        let preview: String = src.chars().take(80).collect();
        format!(
            "image src must be a base64 data URI \
             (e.g. `data:image/png;base64,...`). Got: {preview:?}"
        )
    })?;
    let comma_pos = rest
        .find(',')
        .ok_or_else(|| "invalid data URI: missing `,` separator between header and data".to_string())?;
    let header = &rest[..comma_pos];
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(rest[comma_pos + 1..].trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

// ---------------------------------------------------------------------------
// Multi-slot containers
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ColumnBuilder {
    node: ColumnNode,
}

impl ColumnBuilder {
    /// Vertical gap between consecutive items on the same page.
    pub fn spacing(&mut self, value: f32) -> Result<(), ComposeError> {
        self.node.spacing = non_negative("spacing", value)?;
        Ok(())
    }

    /// Open a new item slot at the bottom of the column.
    pub fn item(&mut self) -> Container<'_> {
        self.node.items.push(None);
        let idx = self.node.items.len() - 1;
        Container::new(&mut self.node.items[idx], "column item")
    }
}

#[derive(Debug, Default)]
pub struct RowBuilder {
    node: RowNode,
}

impl RowBuilder {
    /// Horizontal gap between items.
    pub fn spacing(&mut self, value: f32) -> Result<(), ComposeError> {
        self.node.spacing = non_negative("spacing", value)?;
        Ok(())
    }

    /// Item taking a `weight` share of the remaining width.
    pub fn relative_item(&mut self, weight: f32) -> Result<Container<'_>, ComposeError> {
        let weight = positive("relative weight", weight)?;
        Ok(self.push(RowSizing::Relative(weight)))
    }

    /// Item of a fixed width.
    pub fn constant_item(&mut self, width: f32) -> Result<Container<'_>, ComposeError> {
        let width = positive("constant width", width)?;
        Ok(self.push(RowSizing::Constant(width)))
    }

    /// Item as wide as its content.
    pub fn auto_item(&mut self) -> Container<'_> {
        self.push(RowSizing::Auto)
    }

    fn push(&mut self, sizing: RowSizing) -> Container<'_> {
        self.node.items.push(RowItem {
            sizing,
            child: None,
        });
        let idx = self.node.items.len() - 1;
        Container::new(&mut self.node.items[idx].child, "row item")
    }
}

#[derive(Debug, Default)]
pub struct TextBuilder {
    node: TextNode,
}

impl TextBuilder {
    pub fn span(&mut self, content: impl Into<String>, style: &EffectiveStyle) -> &mut Self {
        self.push(RunContent::Literal(content.into()), style)
    }

    /// Number of the page this text lands on.
    pub fn current_page_number(&mut self, style: &EffectiveStyle) -> &mut Self {
        self.push(RunContent::CurrentPageNumber, style)
    }

    /// Total number of pages in the document.
    pub fn total_pages(&mut self, style: &EffectiveStyle) -> &mut Self {
        self.push(RunContent::TotalPages, style)
    }

    pub fn align(&mut self, align: TextAlign) -> &mut Self {
        self.node.align = align;
        self
    }

    fn push(&mut self, content: RunContent, style: &EffectiveStyle) -> &mut Self {
        self.node.runs.push(TextRun {
            content,
            style: style.clone(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doc<F>(F);

    impl<F> Document for Doc<F>
    where
        F: Fn(&mut DocumentContainer) -> Result<(), ComposeError>,
    {
        fn compose(&self, document: &mut DocumentContainer) -> Result<(), ComposeError> {
            (self.0)(document)
        }
    }

    fn compose<F>(f: F) -> Result<DocumentTree, ComposeError>
    where
        F: Fn(&mut DocumentContainer) -> Result<(), ComposeError>,
    {
        compose_document(&Doc(f))
    }

    #[test]
    fn decorations_wrap_outermost_first() {
        let tree = compose(|d| {
            d.page(|p| {
                p.content()
                    .padding(5.0)?
                    .background(Color::WHITE)
                    .text("hi", &EffectiveStyle::default())
            })
        })
        .unwrap();

        let content = tree.pages[0].content.as_ref().unwrap();
        let LayoutNode::Box(outer) = content else {
            panic!("expected padding box, got {content:?}");
        };
        assert_eq!(outer.decoration, Decoration::Padding(Edges::all(5.0)));
        let LayoutNode::Box(inner) = outer.child.as_ref() else {
            panic!("expected background box");
        };
        assert_eq!(inner.decoration, Decoration::Background(Color::WHITE));
        assert!(matches!(inner.child.as_ref(), LayoutNode::Text(_)));
    }

    #[test]
    fn consecutive_alignments_merge() {
        let tree = compose(|d| d.page(|p| p.content().align_center().align_middle().placeholder()))
            .unwrap();
        let Some(LayoutNode::Box(b)) = &tree.pages[0].content else {
            panic!("expected alignment box");
        };
        assert_eq!(
            b.decoration,
            Decoration::Align(Alignment {
                horizontal: Some(HorizontalAlign::Center),
                vertical: Some(VerticalAlign::Middle),
            })
        );
        assert!(matches!(b.child.as_ref(), LayoutNode::Placeholder));
    }

    #[test]
    fn second_header_is_rejected() {
        let err = compose(|d| {
            d.page(|p| {
                p.header().placeholder()?;
                p.header().placeholder()
            })
        })
        .unwrap_err();
        assert!(matches!(err, ComposeError::MultipleChildren { slot: "header" }));
    }

    #[test]
    fn invalid_constraints_fail_at_build_time() {
        for result in [
            compose(|d| d.page(|p| p.content().height(0.0)?.empty())),
            compose(|d| d.page(|p| p.content().width(-10.0)?.empty())),
            compose(|d| d.page(|p| p.content().padding(-1.0)?.empty())),
            compose(|d| d.page(|p| p.content().relative_width(1.5)?.empty())),
            compose(|d| d.page(|p| p.content().min_height(50.0)?.max_height(10.0)?.empty())),
            compose(|d| d.page(|p| p.content().height(f32::NAN)?.empty())),
            compose(|d| d.page(|p| p.content().height(50.0)?.max_height(10.0)?.empty())),
            compose(|d| d.page(|p| p.content().min_height(80.0)?.height(50.0)?.empty())),
            compose(|d| d.page(|p| p.content().max_width(40.0)?.width(100.0)?.empty())),
            compose(|d| {
                let tiny = EffectiveStyle {
                    size: -4.0,
                    ..EffectiveStyle::default()
                };
                d.page(|p| p.content().text("x", &tiny))
            }),
            compose(|d| {
                let flat = EffectiveStyle {
                    line_height: 0.0,
                    ..EffectiveStyle::default()
                };
                d.page(|p| p.content().text_runs(|t| {
                    t.span("x", &flat);
                }))
            }),
            compose(|d| d.page(|p| p.margin(-5.0))),
            compose(|d| {
                d.page(|p| p.content().row(|r| r.constant_item(0.0)?.placeholder()))
            }),
        ] {
            assert!(
                matches!(result, Err(ComposeError::InvalidConstraint { .. })),
                "expected InvalidConstraint, got {result:?}"
            );
        }
    }

    #[test]
    fn size_constraints_merge_into_one_box() {
        let tree = compose(|d| d.page(|p| p.content().width(100.0)?.height(50.0)?.placeholder()))
            .unwrap();
        let Some(LayoutNode::Box(b)) = &tree.pages[0].content else {
            panic!("expected constraint box");
        };
        let Decoration::Constrain(c) = &b.decoration else {
            panic!("expected constraints");
        };
        assert_eq!((c.width, c.height), (Some(100.0), Some(50.0)));
        assert!(matches!(b.child.as_ref(), LayoutNode::Placeholder));
    }

    #[test]
    fn column_and_row_items_are_explicit() {
        let style = EffectiveStyle::default();
        let tree = compose(|d| {
            d.page(|p| {
                p.content().column(|col| {
                    col.spacing(4.0)?;
                    col.item().text("a", &style)?;
                    col.item().row(|row| {
                        row.relative_item(2.0)?.text("left", &style)?;
                        row.constant_item(100.0)?.placeholder()?;
                        row.auto_item().text("right", &style)
                    })?;
                    let _unfilled = col.item();
                    Ok(())
                })
            })
        })
        .unwrap();

        let Some(LayoutNode::Column(col)) = &tree.pages[0].content else {
            panic!("expected column");
        };
        assert_eq!(col.items.len(), 3);
        assert!(col.items[2].is_none());
        let Some(LayoutNode::Row(row)) = &col.items[1] else {
            panic!("expected row");
        };
        assert_eq!(row.items[0].sizing, RowSizing::Relative(2.0));
        assert_eq!(row.items[1].sizing, RowSizing::Constant(100.0));
        assert_eq!(row.items[2].sizing, RowSizing::Auto);
    }

    #[test]
    fn text_runs_keep_page_tokens_unresolved() {
        let style = EffectiveStyle::default();
        let tree = compose(|d| {
            d.page(|p| {
                p.footer().text_runs(|t| {
                    t.current_page_number(&style)
                        .span(" / ", &style)
                        .total_pages(&style)
                        .align(TextAlign::Center);
                })
            })
        })
        .unwrap();
        let Some(LayoutNode::Text(text)) = &tree.pages[0].footer else {
            panic!("expected text");
        };
        assert_eq!(text.runs.len(), 3);
        assert_eq!(text.runs[0].content, RunContent::CurrentPageNumber);
        assert_eq!(text.runs[2].content, RunContent::TotalPages);
        assert_eq!(text.align, TextAlign::Center);
    }

    #[test]
    fn image_requires_decodable_data_uri() {
        const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAQAAAACCAIAAADwyuo0AAAAEElEQVR4nGP4z8AARwzIHABvqgf5gNwAKAAAAABJRU5ErkJggg==";
        let tree = compose(|d| d.page(|p| p.content().image(PNG))).unwrap();
        let Some(LayoutNode::Image(img)) = &tree.pages[0].content else {
            panic!("expected image");
        };
        assert_eq!((img.px_width, img.px_height), (4, 2));

        let err = compose(|d| d.page(|p| p.content().image("photo.jpg"))).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidImage(_)));
        let err = compose(|d| d.page(|p| p.content().image("data:image/png;base64,AAAA")))
            .unwrap_err();
        assert!(matches!(err, ComposeError::InvalidImage(_)));
    }
}
