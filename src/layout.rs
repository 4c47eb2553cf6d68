//! Layout engine – measures and places prepared frames.
//!
//! Layout is two-phase per page. [`Layouter::measure`] is a pure bottom-up
//! size query returning a [`SpacePlan`]; [`Layouter::place`] walks top-down,
//! emits page-absolute [`LayoutBox`]es and advances [`Progress`] for content
//! that continues on the next page. Both make the same decisions for the same
//! inputs, so a parent can measure a child and then place it into exactly the
//! measured space.
//!
//! Only columns split across pages, and only between items. Rows and leaves
//! are atomic. Row item widths are solved with Taffy's flexbox algorithm.

use taffy::prelude::*;

use crate::error::PaginationError;
use crate::fonts::FontTable;
use crate::frame::{Frame, FrameKind};
use crate::page_layout::{ImageContent, LayoutBox, TextBlock};
use crate::style::Color;
use crate::text::{align_lines, block_size, layout_text, PageNumbers};
use crate::tree::{
    Decoration, Edges, HorizontalAlign, RowSizing, SizeConstraints, VerticalAlign,
};

/// Tolerance for float comparisons against available space.
const EPSILON: f32 = 0.001;

/// Height a placeholder takes when nothing constrains it.
pub const PLACEHOLDER_HEIGHT: f32 = 40.0;

/// Fill colour of placeholder boxes.
pub const PLACEHOLDER_COLOR: Color = Color::GREY_LIGHTEN_1;

/// Width × height in points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

impl Extent {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A page-absolute rectangle, origin top-left.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Area {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Area {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    fn shrink(&self, e: &Edges) -> Self {
        Self {
            x: self.x + e.left,
            y: self.y + e.top,
            width: (self.width - e.horizontal()).max(0.0),
            height: (self.height - e.vertical()).max(0.0),
        }
    }
}

/// Answer to "how much of you fits in this space?".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpacePlan {
    /// Nothing (left) to draw.
    Empty,
    /// Everything that remains fits.
    Full(Extent),
    /// Some of what remains fits; the rest continues on the next page.
    Partial(Extent),
    /// Nothing fits; `required` is the height needed to make progress.
    Wrap { required: f32 },
}

impl SpacePlan {
    pub fn extent(&self) -> Option<Extent> {
        match self {
            SpacePlan::Full(e) | SpacePlan::Partial(e) => Some(*e),
            SpacePlan::Empty => Some(Extent::ZERO),
            SpacePlan::Wrap { .. } => None,
        }
    }

    /// Whether the frame has nothing left after being placed with this plan.
    pub fn completes(&self) -> bool {
        matches!(self, SpacePlan::Empty | SpacePlan::Full(_))
    }
}

/// Per-frame continuation state.
///
/// For a column the value is the index of the first item not yet fully
/// placed; for a page break it is 1 once the break has been taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    cursors: Vec<usize>,
}

impl Progress {
    pub fn new(node_count: usize) -> Self {
        Self {
            cursors: vec![0; node_count],
        }
    }

    fn get(&self, id: usize) -> usize {
        self.cursors.get(id).copied().unwrap_or(0)
    }

    fn set(&mut self, id: usize, value: usize) {
        if let Some(cursor) = self.cursors.get_mut(id) {
            *cursor = value;
        }
    }
}

fn clamp(value: f32, min: Option<f32>, max: Option<f32>) -> f32 {
    let value = max.map_or(value, |m| value.min(m));
    min.map_or(value, |m| value.max(m))
}

fn taffy_error(e: impl std::fmt::Display) -> PaginationError {
    PaginationError::Layout(e.to_string())
}

/// Measures and places frames for one page.
pub struct Layouter<'a> {
    fonts: &'a FontTable,
    numbers: PageNumbers,
}

impl<'a> Layouter<'a> {
    pub fn new(fonts: &'a FontTable, numbers: PageNumbers) -> Self {
        Self { fonts, numbers }
    }

    /// How much of `frame` fits into `available`.
    ///
    /// With `force` set the frame must make progress even if that means
    /// exceeding the available height: the first pending atomic unit is
    /// reported at its full size.
    pub fn measure(
        &self,
        frame: &Frame<'_>,
        available: Extent,
        progress: &Progress,
        force: bool,
    ) -> Result<SpacePlan, PaginationError> {
        let plan = match &frame.kind {
            FrameKind::Empty => SpacePlan::Empty,
            FrameKind::PageBreak => {
                if progress.get(frame.id) == 0 {
                    SpacePlan::Partial(Extent::ZERO)
                } else {
                    SpacePlan::Empty
                }
            }
            FrameKind::Placeholder => {
                let width = if available.width.is_finite() {
                    available.width
                } else {
                    PLACEHOLDER_HEIGHT
                };
                self.atomic(Extent::new(width, PLACEHOLDER_HEIGHT), available, force)
            }
            FrameKind::Image(img) => {
                let width = if available.width.is_finite() {
                    available.width
                } else {
                    img.px_width as f32
                };
                let height = width * img.px_height as f32 / img.px_width.max(1) as f32;
                self.atomic(Extent::new(width, height), available, force)
            }
            FrameKind::Text { runs, .. } => {
                let lines = layout_text(runs, self.fonts, available.width, self.numbers);
                if lines.is_empty() {
                    SpacePlan::Empty
                } else {
                    let (width, height) = block_size(&lines);
                    self.atomic(Extent::new(width, height), available, force)
                }
            }
            FrameKind::Column { spacing, items } => {
                self.measure_column(frame.id, *spacing, items, available, progress, force)?
            }
            FrameKind::Row { spacing, items } => {
                self.measure_row(*spacing, items, available, progress, force)?
            }
            FrameKind::Box { decoration, child } => {
                self.measure_box(decoration, child, available, progress, force)?
            }
        };
        Ok(plan)
    }

    fn atomic(&self, size: Extent, available: Extent, force: bool) -> SpacePlan {
        if !force && size.height > available.height + EPSILON {
            SpacePlan::Wrap {
                required: size.height,
            }
        } else {
            SpacePlan::Full(size)
        }
    }

    fn measure_column(
        &self,
        id: usize,
        spacing: f32,
        items: &[Frame<'_>],
        available: Extent,
        progress: &Progress,
        force: bool,
    ) -> Result<SpacePlan, PaginationError> {
        let mut used = 0.0f32;
        let mut width = 0.0f32;
        let mut placed_any = false;

        for item in items.iter().skip(progress.get(id)) {
            let gap = if placed_any { spacing } else { 0.0 };
            let remaining = Extent::new(available.width, (available.height - used - gap).max(0.0));
            match self.measure(item, remaining, progress, force && !placed_any)? {
                SpacePlan::Empty => continue,
                SpacePlan::Full(size) => {
                    used += gap + size.height;
                    width = width.max(size.width);
                    placed_any = true;
                }
                SpacePlan::Partial(size) => {
                    used += gap + size.height;
                    width = width.max(size.width);
                    return Ok(SpacePlan::Partial(Extent::new(width, used)));
                }
                SpacePlan::Wrap { required } => {
                    return Ok(if placed_any {
                        SpacePlan::Partial(Extent::new(width, used))
                    } else {
                        SpacePlan::Wrap { required }
                    });
                }
            }
        }

        Ok(if placed_any {
            SpacePlan::Full(Extent::new(width, used))
        } else {
            SpacePlan::Empty
        })
    }

    fn measure_row(
        &self,
        spacing: f32,
        items: &[(RowSizing, Frame<'_>)],
        available: Extent,
        progress: &Progress,
        force: bool,
    ) -> Result<SpacePlan, PaginationError> {
        if items.is_empty() {
            return Ok(SpacePlan::Empty);
        }
        let widths = self.row_widths(spacing, items, available.width, progress)?;
        // A forced row is laid out at its full height.
        let height_limit = if force {
            f32::INFINITY
        } else {
            available.height
        };

        let mut height = 0.0f32;
        let mut blocked = false;
        let mut any_content = false;
        for ((_, child), &width) in items.iter().zip(&widths) {
            match self.measure(child, Extent::new(width, height_limit), progress, false)? {
                SpacePlan::Empty => {}
                SpacePlan::Full(size) => {
                    height = height.max(size.height);
                    any_content = true;
                }
                SpacePlan::Partial(size) if force => {
                    height = height.max(size.height);
                    any_content = true;
                }
                SpacePlan::Partial(_) | SpacePlan::Wrap { .. } => blocked = true,
            }
        }

        if blocked {
            let mut required = 0.0f32;
            for ((_, child), &width) in items.iter().zip(&widths) {
                let full = self.measure(child, Extent::new(width, f32::INFINITY), progress, false)?;
                required = required.max(full.extent().map_or(0.0, |e| e.height));
            }
            return Ok(SpacePlan::Wrap { required });
        }
        if !any_content {
            return Ok(SpacePlan::Empty);
        }

        let gaps = spacing * items.len().saturating_sub(1) as f32;
        let total = widths.iter().sum::<f32>() + gaps;
        Ok(SpacePlan::Full(Extent::new(total, height)))
    }

    /// Solve row item widths with a single-line flexbox.
    fn row_widths(
        &self,
        spacing: f32,
        items: &[(RowSizing, Frame<'_>)],
        available_width: f32,
        progress: &Progress,
    ) -> Result<Vec<f32>, PaginationError> {
        let mut taffy: TaffyTree<()> = TaffyTree::new();
        taffy.disable_rounding();

        let mut nodes = Vec::with_capacity(items.len());
        for (sizing, child) in items {
            let style = match *sizing {
                RowSizing::Constant(width) => Style {
                    size: Size {
                        width: Dimension::Length(width),
                        height: Dimension::Auto,
                    },
                    flex_shrink: 0.0,
                    ..Default::default()
                },
                RowSizing::Relative(weight) => Style {
                    flex_grow: weight,
                    flex_shrink: 1.0,
                    flex_basis: Dimension::Length(0.0),
                    min_size: Size {
                        width: Dimension::Length(0.0),
                        height: Dimension::Auto,
                    },
                    ..Default::default()
                },
                RowSizing::Auto => {
                    let intrinsic = self
                        .measure(child, Extent::new(available_width, f32::INFINITY), progress, false)?
                        .extent()
                        .map_or(0.0, |e| e.width);
                    Style {
                        size: Size {
                            width: Dimension::Length(intrinsic),
                            height: Dimension::Auto,
                        },
                        flex_shrink: 0.0,
                        ..Default::default()
                    }
                }
            };
            nodes.push(taffy.new_leaf(style).map_err(taffy_error)?);
        }

        let finite = available_width.is_finite();
        let root_style = Style {
            display: taffy::Display::Flex,
            flex_direction: taffy::FlexDirection::Row,
            gap: Size {
                width: LengthPercentage::Length(spacing),
                height: LengthPercentage::Length(0.0),
            },
            size: Size {
                width: if finite {
                    Dimension::Length(available_width)
                } else {
                    Dimension::Auto
                },
                height: Dimension::Auto,
            },
            ..Default::default()
        };
        let root = taffy
            .new_with_children(root_style, &nodes)
            .map_err(taffy_error)?;
        taffy
            .compute_layout(
                root,
                Size {
                    width: if finite {
                        AvailableSpace::Definite(available_width)
                    } else {
                        AvailableSpace::MaxContent
                    },
                    height: AvailableSpace::MaxContent,
                },
            )
            .map_err(taffy_error)?;

        nodes
            .iter()
            .map(|&node| {
                taffy
                    .layout(node)
                    .map(|l| l.size.width)
                    .map_err(taffy_error)
            })
            .collect()
    }

    fn measure_box(
        &self,
        decoration: &Decoration,
        child: &Frame<'_>,
        available: Extent,
        progress: &Progress,
        force: bool,
    ) -> Result<SpacePlan, PaginationError> {
        match decoration {
            Decoration::Padding(e) => {
                let inner = Extent::new(
                    (available.width - e.horizontal()).max(0.0),
                    (available.height - e.vertical()).max(0.0),
                );
                let plan = match self.measure(child, inner, progress, force)? {
                    SpacePlan::Empty => SpacePlan::Empty,
                    SpacePlan::Full(s) => SpacePlan::Full(Extent::new(
                        s.width + e.horizontal(),
                        s.height + e.vertical(),
                    )),
                    SpacePlan::Partial(s) => SpacePlan::Partial(Extent::new(
                        s.width + e.horizontal(),
                        s.height + e.vertical(),
                    )),
                    SpacePlan::Wrap { required } => SpacePlan::Wrap {
                        required: required + e.vertical(),
                    },
                };
                Ok(match plan {
                    SpacePlan::Full(s) | SpacePlan::Partial(s)
                        if !force && s.height > available.height + EPSILON =>
                    {
                        SpacePlan::Wrap { required: s.height }
                    }
                    other => other,
                })
            }
            Decoration::Constrain(c) => self.measure_constrained(c, child, available, progress, force),
            Decoration::Align(_)
            | Decoration::Background(_)
            | Decoration::Border(_)
            | Decoration::Section(_) => self.measure(child, available, progress, force),
        }
    }

    /// Width a constrained box takes out of `available_width`, if it fixes one.
    fn fixed_width(c: &SizeConstraints, available_width: f32) -> Option<f32> {
        c.width
            .or_else(|| {
                c.relative_width
                    .filter(|_| available_width.is_finite())
                    .map(|f| available_width * f)
            })
            .map(|w| clamp(w, c.min_width, c.max_width).min(available_width))
    }

    fn child_limits(c: &SizeConstraints, available: Extent) -> Extent {
        let width = Self::fixed_width(c, available.width)
            .unwrap_or_else(|| c.max_width.map_or(available.width, |m| m.min(available.width)));
        let height = c
            .height
            .unwrap_or_else(|| c.max_height.map_or(available.height, |m| m.min(available.height)));
        Extent::new(width, height)
    }

    fn bounds_height(c: &SizeConstraints) -> bool {
        c.height.or(c.max_height).is_some()
    }

    fn measure_constrained(
        &self,
        c: &SizeConstraints,
        child: &Frame<'_>,
        available: Extent,
        progress: &Progress,
        force: bool,
    ) -> Result<SpacePlan, PaginationError> {
        if !force {
            if let Some(h) = c.height.or(c.min_height) {
                if h > available.height + EPSILON {
                    return Ok(SpacePlan::Wrap { required: h });
                }
            }
        }

        let limits = Self::child_limits(c, available);
        let fixed_width = Self::fixed_width(c, available.width);
        let size_of = |s: Extent| {
            Extent::new(
                fixed_width.unwrap_or_else(|| clamp(s.width, c.min_width, c.max_width)),
                c.height
                    .unwrap_or_else(|| clamp(s.height, c.min_height, c.max_height)),
            )
        };

        // A height bound that fits clips the child instead of wrapping the box.
        let clips = Self::bounds_height(c) && limits.height <= available.height + EPSILON;

        Ok(match self.measure(child, limits, progress, force || clips)? {
            SpacePlan::Empty => {
                let size = size_of(Extent::ZERO);
                if size.width > 0.0 || size.height > 0.0 {
                    SpacePlan::Full(size)
                } else {
                    SpacePlan::Empty
                }
            }
            SpacePlan::Full(s) => SpacePlan::Full(size_of(s)),
            SpacePlan::Partial(s) if clips => SpacePlan::Full(size_of(s)),
            SpacePlan::Partial(s) => SpacePlan::Partial(size_of(s)),
            SpacePlan::Wrap { required } if clips => {
                SpacePlan::Full(size_of(Extent::new(limits.width, required)))
            }
            SpacePlan::Wrap { required } => SpacePlan::Wrap {
                required: required.max(c.height.unwrap_or(0.0)),
            },
        })
    }

    /// Place `frame` into `area` and return the boxes it produced.
    ///
    /// `area` is normally the extent reported by [`measure`](Self::measure)
    /// for the same progress and `force`.
    pub fn place(
        &self,
        frame: &Frame<'_>,
        area: Area,
        progress: &mut Progress,
        force: bool,
    ) -> Result<Vec<LayoutBox>, PaginationError> {
        let boxes = match &frame.kind {
            FrameKind::Empty => Vec::new(),
            FrameKind::PageBreak => {
                progress.set(frame.id, 1);
                Vec::new()
            }
            FrameKind::Placeholder => {
                let mut lb = LayoutBox::new(area.x, area.y, area.width, area.height);
                lb.placeholder = true;
                lb.background = Some(PLACEHOLDER_COLOR);
                vec![lb]
            }
            FrameKind::Image(img) => {
                let height = area.width * img.px_height as f32 / img.px_width.max(1) as f32;
                let mut lb = LayoutBox::new(area.x, area.y, area.width, height);
                lb.image = Some(ImageContent {
                    src: img.src.clone(),
                    px_width: img.px_width,
                    px_height: img.px_height,
                });
                vec![lb]
            }
            FrameKind::Text { runs, align } => {
                let mut lines = layout_text(runs, self.fonts, area.width, self.numbers);
                if lines.is_empty() {
                    Vec::new()
                } else {
                    align_lines(&mut lines, area.width, *align);
                    let (_, height) = block_size(&lines);
                    let mut lb = LayoutBox::new(area.x, area.y, area.width, height.max(area.height));
                    lb.text = Some(TextBlock { lines });
                    vec![lb]
                }
            }
            FrameKind::Column { spacing, items } => {
                self.place_column(frame.id, *spacing, items, area, progress, force)?
            }
            FrameKind::Row { spacing, items } => {
                self.place_row(*spacing, items, area, progress, force)?
            }
            FrameKind::Box { decoration, child } => {
                self.place_box(decoration, child, area, progress, force)?
            }
        };
        Ok(boxes)
    }

    fn place_column(
        &self,
        id: usize,
        spacing: f32,
        items: &[Frame<'_>],
        area: Area,
        progress: &mut Progress,
        force: bool,
    ) -> Result<Vec<LayoutBox>, PaginationError> {
        let start = progress.get(id);
        let mut y = area.y;
        let mut placed_any = false;
        let mut children = Vec::new();

        for (idx, item) in items.iter().enumerate().skip(start) {
            let gap = if placed_any { spacing } else { 0.0 };
            let remaining = Extent::new(area.width, (area.y + area.height - y - gap).max(0.0));
            let item_force = force && !placed_any;
            let plan = self.measure(item, remaining, progress, item_force)?;
            let size = match plan {
                SpacePlan::Empty => {
                    progress.set(id, idx + 1);
                    continue;
                }
                SpacePlan::Wrap { .. } => break,
                SpacePlan::Full(size) | SpacePlan::Partial(size) => size,
            };

            y += gap;
            let item_area = Area::new(area.x, y, area.width, size.height);
            children.extend(self.place(item, item_area, progress, item_force)?);
            y += size.height;
            placed_any = true;

            if !plan.completes() {
                break;
            }
            progress.set(id, idx + 1);
        }

        Ok(vec![LayoutBox::container(
            area.x,
            area.y,
            area.width,
            y - area.y,
            children,
        )])
    }

    fn place_row(
        &self,
        spacing: f32,
        items: &[(RowSizing, Frame<'_>)],
        area: Area,
        progress: &mut Progress,
        force: bool,
    ) -> Result<Vec<LayoutBox>, PaginationError> {
        let widths = self.row_widths(spacing, items, area.width, progress)?;
        let mut x = area.x;
        let mut children = Vec::new();
        for ((_, child), width) in items.iter().zip(widths) {
            let cell = Area::new(x, area.y, width, area.height);
            children.extend(self.place(child, cell, progress, force)?);
            x += width + spacing;
        }
        Ok(vec![LayoutBox::container(
            area.x,
            area.y,
            area.width,
            area.height,
            children,
        )])
    }

    fn place_box(
        &self,
        decoration: &Decoration,
        child: &Frame<'_>,
        area: Area,
        progress: &mut Progress,
        force: bool,
    ) -> Result<Vec<LayoutBox>, PaginationError> {
        match decoration {
            Decoration::Padding(e) => self.place(child, area.shrink(e), progress, force),
            Decoration::Align(alignment) => {
                let Some(size) = self
                    .measure(child, area.extent(), progress, force)?
                    .extent()
                else {
                    return Ok(Vec::new());
                };
                let (x, width) = match alignment.horizontal {
                    None => (area.x, area.width),
                    Some(HorizontalAlign::Left) => (area.x, size.width),
                    Some(HorizontalAlign::Center) => {
                        (area.x + ((area.width - size.width) / 2.0).max(0.0), size.width)
                    }
                    Some(HorizontalAlign::Right) => {
                        (area.x + (area.width - size.width).max(0.0), size.width)
                    }
                };
                let (y, height) = match alignment.vertical {
                    None => (area.y, area.height),
                    Some(VerticalAlign::Top) => (area.y, size.height),
                    Some(VerticalAlign::Middle) => {
                        (area.y + ((area.height - size.height) / 2.0).max(0.0), size.height)
                    }
                    Some(VerticalAlign::Bottom) => {
                        (area.y + (area.height - size.height).max(0.0), size.height)
                    }
                };
                self.place(child, Area::new(x, y, width, height), progress, force)
            }
            Decoration::Constrain(c) => {
                let limits = Self::child_limits(c, area.extent());
                let inner = Area::new(
                    area.x,
                    area.y,
                    limits.width.min(area.width),
                    c.height.unwrap_or(area.height).min(limits.height),
                );
                self.place(child, inner, progress, force || Self::bounds_height(c))
            }
            Decoration::Background(color) => {
                let mut lb = LayoutBox::new(area.x, area.y, area.width, area.height);
                lb.background = Some(*color);
                lb.children = self.place(child, area, progress, force)?;
                Ok(vec![lb])
            }
            Decoration::Border(border) => {
                let mut lb = LayoutBox::new(area.x, area.y, area.width, area.height);
                lb.border = Some(*border);
                lb.children = self.place(child, area, progress, force)?;
                Ok(vec![lb])
            }
            Decoration::Section(name) => {
                let mut lb = LayoutBox::new(area.x, area.y, area.width, area.height);
                lb.section = Some(name.clone());
                lb.children = self.place(child, area, progress, force)?;
                Ok(vec![lb])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::prepare;
    use crate::style::EffectiveStyle;
    use crate::tree::*;

    const NUMBERS: PageNumbers = PageNumbers {
        current: 1,
        total: 1,
    };

    fn doc(content: LayoutNode) -> DocumentTree {
        DocumentTree {
            metadata: DocumentMetadata::default(),
            pages: vec![PageNode {
                content: Some(content),
                ..PageNode::default()
            }],
        }
    }

    fn fixed(height: f32) -> LayoutNode {
        LayoutNode::Box(BoxNode {
            decoration: Decoration::Constrain(SizeConstraints {
                height: Some(height),
                ..SizeConstraints::default()
            }),
            child: Box::new(LayoutNode::Placeholder),
        })
    }

    fn text(s: &str) -> LayoutNode {
        LayoutNode::Text(TextNode {
            runs: vec![TextRun {
                content: RunContent::Literal(s.to_string()),
                style: EffectiveStyle {
                    size: 10.0,
                    ..EffectiveStyle::default()
                },
            }],
            align: TextAlign::Left,
        })
    }

    fn column(items: Vec<LayoutNode>, spacing: f32) -> LayoutNode {
        LayoutNode::Column(ColumnNode {
            spacing,
            items: items.into_iter().map(Some).collect(),
        })
    }

    #[test]
    fn column_splits_between_items() {
        let tree = doc(column(vec![fixed(100.0), fixed(100.0), fixed(100.0)], 10.0));
        let fonts = FontTable::with_builtin_faces();
        let prepared = prepare(&tree, &fonts).unwrap();
        let frame = prepared.pages[0].content.as_ref().unwrap();
        let layouter = Layouter::new(&fonts, NUMBERS);
        let mut progress = Progress::new(prepared.node_count);
        let available = Extent::new(200.0, 250.0);

        let plan = layouter.measure(frame, available, &progress, false).unwrap();
        assert_eq!(plan, SpacePlan::Partial(Extent::new(200.0, 210.0)));

        let area = Area::new(0.0, 0.0, 200.0, 210.0);
        let boxes = layouter.place(frame, area, &mut progress, false).unwrap();
        assert_eq!(boxes[0].children.len(), 2);
        assert!((boxes[0].children[1].y - 110.0).abs() < 0.01);

        // Second page: only the last item remains, without leading spacing.
        let plan = layouter.measure(frame, available, &progress, false).unwrap();
        assert_eq!(plan, SpacePlan::Full(Extent::new(200.0, 100.0)));
    }

    #[test]
    fn too_tall_item_wraps_unless_forced() {
        let tree = doc(column(vec![fixed(300.0)], 0.0));
        let fonts = FontTable::with_builtin_faces();
        let prepared = prepare(&tree, &fonts).unwrap();
        let frame = prepared.pages[0].content.as_ref().unwrap();
        let layouter = Layouter::new(&fonts, NUMBERS);
        let progress = Progress::new(prepared.node_count);

        let available = Extent::new(100.0, 200.0);
        assert_eq!(
            layouter.measure(frame, available, &progress, false).unwrap(),
            SpacePlan::Wrap { required: 300.0 }
        );
        assert_eq!(
            layouter.measure(frame, available, &progress, true).unwrap(),
            SpacePlan::Full(Extent::new(100.0, 300.0))
        );
    }

    #[test]
    fn page_break_ends_the_page_once() {
        let tree = doc(column(vec![text("a"), LayoutNode::PageBreak, text("b")], 0.0));
        let fonts = FontTable::with_builtin_faces();
        let prepared = prepare(&tree, &fonts).unwrap();
        let frame = prepared.pages[0].content.as_ref().unwrap();
        let layouter = Layouter::new(&fonts, NUMBERS);
        let mut progress = Progress::new(prepared.node_count);
        let available = Extent::new(300.0, 500.0);

        let plan = layouter.measure(frame, available, &progress, false).unwrap();
        assert!(matches!(plan, SpacePlan::Partial(_)));
        let size = plan.extent().unwrap();
        layouter
            .place(frame, Area::new(0.0, 0.0, 300.0, size.height), &mut progress, false)
            .unwrap();

        let plan = layouter.measure(frame, available, &progress, false).unwrap();
        assert!(matches!(plan, SpacePlan::Full(_)));
    }

    #[test]
    fn row_widths_follow_sizing() {
        let row = LayoutNode::Row(RowNode {
            spacing: 10.0,
            items: vec![
                RowItem {
                    sizing: RowSizing::Relative(1.0),
                    child: Some(LayoutNode::Placeholder),
                },
                RowItem {
                    sizing: RowSizing::Constant(100.0),
                    child: Some(LayoutNode::Placeholder),
                },
                RowItem {
                    sizing: RowSizing::Relative(3.0),
                    child: Some(LayoutNode::Placeholder),
                },
                RowItem {
                    sizing: RowSizing::Auto,
                    child: Some(text("abcd")),
                },
            ],
        });
        let tree = doc(row);
        let fonts = FontTable::with_builtin_faces();
        let prepared = prepare(&tree, &fonts).unwrap();
        let frame = prepared.pages[0].content.as_ref().unwrap();
        let layouter = Layouter::new(&fonts, NUMBERS);
        let mut progress = Progress::new(prepared.node_count);

        // 520 - 3 gaps - 100 constant - 20 auto = 370 shared 1:3.
        let boxes = layouter
            .place(frame, Area::new(0.0, 0.0, 520.0, 40.0), &mut progress, false)
            .unwrap();
        let cells: Vec<(f32, f32)> = boxes[0].children.iter().map(|b| (b.x, b.width)).collect();
        let expected = [(0.0, 92.5), (102.5, 100.0), (212.5, 277.5), (500.0, 20.0)];
        for ((x, w), (ex, ew)) in cells.iter().zip(expected) {
            assert!((x - ex).abs() < 0.01, "x {x} != {ex}");
            assert!((w - ew).abs() < 0.01, "w {w} != {ew}");
        }
    }

    #[test]
    fn rows_are_atomic() {
        let row = LayoutNode::Row(RowNode {
            spacing: 0.0,
            items: vec![
                RowItem {
                    sizing: RowSizing::Relative(1.0),
                    child: Some(column(vec![fixed(50.0), fixed(50.0)], 0.0)),
                },
                RowItem {
                    sizing: RowSizing::Relative(1.0),
                    child: Some(fixed(20.0)),
                },
            ],
        });
        let tree = doc(row);
        let fonts = FontTable::with_builtin_faces();
        let prepared = prepare(&tree, &fonts).unwrap();
        let frame = prepared.pages[0].content.as_ref().unwrap();
        let layouter = Layouter::new(&fonts, NUMBERS);
        let progress = Progress::new(prepared.node_count);

        let plan = layouter
            .measure(frame, Extent::new(200.0, 80.0), &progress, false)
            .unwrap();
        assert_eq!(plan, SpacePlan::Wrap { required: 100.0 });
    }

    #[test]
    fn padding_and_alignment() {
        let node = LayoutNode::Box(BoxNode {
            decoration: Decoration::Padding(Edges::all(10.0)),
            child: Box::new(LayoutNode::Box(BoxNode {
                decoration: Decoration::Align(Alignment {
                    horizontal: Some(HorizontalAlign::Center),
                    vertical: None,
                }),
                child: Box::new(text("abcd")),
            })),
        });
        let tree = doc(node);
        let fonts = FontTable::with_builtin_faces();
        let prepared = prepare(&tree, &fonts).unwrap();
        let frame = prepared.pages[0].content.as_ref().unwrap();
        let layouter = Layouter::new(&fonts, NUMBERS);
        let mut progress = Progress::new(prepared.node_count);

        let plan = layouter
            .measure(frame, Extent::new(220.0, 500.0), &progress, false)
            .unwrap();
        assert_eq!(plan, SpacePlan::Full(Extent::new(40.0, 32.0)));

        let boxes = layouter
            .place(frame, Area::new(0.0, 0.0, 220.0, 32.0), &mut progress, false)
            .unwrap();
        // Inner width 200, text 20 wide, centred.
        assert!((boxes[0].x - 100.0).abs() < 0.01);
        assert!((boxes[0].y - 10.0).abs() < 0.01);
    }

    #[test]
    fn background_and_section_wrap_children() {
        let node = LayoutNode::Box(BoxNode {
            decoration: Decoration::Section("card".to_string()),
            child: Box::new(LayoutNode::Box(BoxNode {
                decoration: Decoration::Background(Color::GREY_LIGHTEN_3),
                child: Box::new(fixed(30.0)),
            })),
        });
        let tree = doc(node);
        let fonts = FontTable::with_builtin_faces();
        let prepared = prepare(&tree, &fonts).unwrap();
        let frame = prepared.pages[0].content.as_ref().unwrap();
        let layouter = Layouter::new(&fonts, NUMBERS);
        let mut progress = Progress::new(prepared.node_count);

        let boxes = layouter
            .place(frame, Area::new(5.0, 5.0, 100.0, 30.0), &mut progress, false)
            .unwrap();
        assert_eq!(boxes[0].section.as_deref(), Some("card"));
        let bg = &boxes[0].children[0];
        assert_eq!(bg.background, Some(Color::GREY_LIGHTEN_3));
        assert!(bg.children[0].placeholder);
    }

    #[test]
    fn images_fit_width_and_keep_aspect() {
        let image = LayoutNode::Image(ImageNode {
            src: "data:image/png;base64,".to_string(),
            px_width: 4,
            px_height: 2,
        });
        let tree = doc(image);
        let fonts = FontTable::with_builtin_faces();
        let prepared = prepare(&tree, &fonts).unwrap();
        let frame = prepared.pages[0].content.as_ref().unwrap();
        let layouter = Layouter::new(&fonts, NUMBERS);
        let progress = Progress::new(prepared.node_count);

        assert_eq!(
            layouter
                .measure(frame, Extent::new(100.0, 100.0), &progress, false)
                .unwrap(),
            SpacePlan::Full(Extent::new(100.0, 50.0))
        );
        assert_eq!(
            layouter
                .measure(frame, Extent::new(100.0, 40.0), &progress, false)
                .unwrap(),
            SpacePlan::Wrap { required: 50.0 }
        );
    }

    fn bounded(height: Option<f32>, max_height: Option<f32>, child: LayoutNode) -> LayoutNode {
        LayoutNode::Box(BoxNode {
            decoration: Decoration::Constrain(SizeConstraints {
                height,
                max_height,
                ..SizeConstraints::default()
            }),
            child: Box::new(child),
        })
    }

    #[test]
    fn height_bound_clips_taller_content() {
        // Eight 12pt lines inside a 50pt box.
        let tall = "a\nb\nc\nd\ne\nf\ng\nh";
        let fonts = FontTable::with_builtin_faces();
        let layouter = Layouter::new(&fonts, NUMBERS);
        let available = Extent::new(300.0, 800.0);

        let tree = doc(column(vec![text("first"), bounded(Some(50.0), None, text(tall))], 0.0));
        let prepared = prepare(&tree, &fonts).unwrap();
        let frame = prepared.pages[0].content.as_ref().unwrap();
        let mut progress = Progress::new(prepared.node_count);
        let plan = layouter.measure(frame, available, &progress, false).unwrap();
        assert!(matches!(plan, SpacePlan::Full(e) if (e.height - 62.0).abs() < 0.01));

        let boxes = layouter
            .place(frame, Area::new(0.0, 0.0, 300.0, 62.0), &mut progress, false)
            .unwrap();
        assert_eq!(boxes[0].children.len(), 2);
        assert!((boxes[0].children[1].y - 12.0).abs() < 0.01);

        let tree = doc(bounded(None, Some(30.0), text(tall)));
        let prepared = prepare(&tree, &fonts).unwrap();
        let frame = prepared.pages[0].content.as_ref().unwrap();
        let progress = Progress::new(prepared.node_count);
        let plan = layouter.measure(frame, available, &progress, false).unwrap();
        assert!(matches!(plan, SpacePlan::Full(e) if (e.height - 30.0).abs() < 0.01));
    }

    #[test]
    fn fixed_height_that_does_not_fit_still_wraps() {
        let tree = doc(bounded(Some(50.0), None, text("short")));
        let fonts = FontTable::with_builtin_faces();
        let prepared = prepare(&tree, &fonts).unwrap();
        let frame = prepared.pages[0].content.as_ref().unwrap();
        let layouter = Layouter::new(&fonts, NUMBERS);
        let progress = Progress::new(prepared.node_count);

        assert_eq!(
            layouter
                .measure(frame, Extent::new(300.0, 40.0), &progress, false)
                .unwrap(),
            SpacePlan::Wrap { required: 50.0 }
        );
    }
}
