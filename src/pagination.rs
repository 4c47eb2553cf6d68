//! Pagination – splits prepared page sections into physical pages.
//!
//! Handles:
//! - header and footer repeated on every page, re-measured per page
//! - content flowing through as many pages as it needs
//! - forced placement of content taller than a fresh page
//! - page tokens, via a second pass once the total is known

use serde::{Deserialize, Serialize};

use crate::error::PaginationError;
use crate::fonts::FontTable;
use crate::frame::{Frame, PreparedDocument};
use crate::layout::{Area, Extent, Layouter, Progress, SpacePlan};
use crate::page_layout::{Diagnostic, LayoutBox, LayoutDocument, PageLayout, Region};
use crate::text::PageNumbers;
use crate::tree::{Edges, PageSize};

/// Default page margins in points.
pub const PAGE_MARGIN_PT: f32 = 40.0;

/// Default upper bound on the number of pages in one document.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// What to do when content cannot fit even a fresh page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Place it anyway, overflowing the page, and record a [`Diagnostic`].
    #[default]
    Flag,
    /// Abort with [`PaginationError::Overflow`].
    Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationOptions {
    /// Size of sections that do not set one.
    pub page_size: PageSize,
    /// Margin of sections that do not set one.
    pub margin: Edges,
    pub overflow: OverflowPolicy,
    pub max_pages: usize,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin: Edges::all(PAGE_MARGIN_PT),
            overflow: OverflowPolicy::Flag,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Lay out a prepared document into pages.
///
/// Documents with page tokens are laid out twice: first with the running
/// page number standing in for the total, then with the total from the
/// first pass. If the second pass yields a different page count the run
/// fails with [`PaginationError::Divergence`]; it never iterates further.
pub fn paginate(
    doc: &PreparedDocument<'_>,
    fonts: &FontTable,
    options: &PaginationOptions,
) -> Result<LayoutDocument, PaginationError> {
    let first = run_pass(doc, fonts, options, None)?;
    let layout = if doc.has_page_tokens {
        let estimated = first.pages.len();
        log::debug!("pass 1 produced {estimated} page(s); re-running with known total");
        let second = run_pass(doc, fonts, options, Some(estimated))?;
        if second.pages.len() != estimated {
            return Err(PaginationError::Divergence {
                estimated,
                actual: second.pages.len(),
            });
        }
        second
    } else {
        first
    };

    for d in &layout.diagnostics {
        log::warn!(
            "{:?} on page {} overflows: needs {:.1}pt, {:.1}pt available",
            d.region,
            d.page,
            d.required,
            d.available
        );
    }
    log::debug!("paginated into {} page(s)", layout.pages.len());
    Ok(layout)
}

/// State shared by the regions of one page.
struct PageRun<'a> {
    layouter: Layouter<'a>,
    options: &'a PaginationOptions,
    number: usize,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl PageRun<'_> {
    /// Measure a region, forcing placement when nothing fits.
    fn plan(
        &mut self,
        frame: &Frame<'_>,
        available: Extent,
        progress: &Progress,
        region: Region,
    ) -> Result<(SpacePlan, bool), PaginationError> {
        let plan = self.layouter.measure(frame, available, progress, false)?;
        let SpacePlan::Wrap { required } = plan else {
            return Ok((plan, false));
        };
        if self.options.overflow == OverflowPolicy::Fail {
            return Err(PaginationError::Overflow {
                page: self.number,
                required,
                available: available.height,
            });
        }
        self.diagnostics.push(Diagnostic {
            page: self.number,
            region,
            required,
            available: available.height,
        });
        let forced = self.layouter.measure(frame, available, progress, true)?;
        Ok((forced, true))
    }

    /// Lay out a header or footer with fresh progress; returns its height and box.
    fn repeated(
        &mut self,
        frame: Option<&Frame<'_>>,
        node_count: usize,
        area: Area,
        region: Region,
        at_bottom: bool,
    ) -> Result<(f32, Option<LayoutBox>), PaginationError> {
        let Some(frame) = frame else {
            return Ok((0.0, None));
        };
        let mut progress = Progress::new(node_count);
        let (plan, force) = self.plan(
            frame,
            Extent::new(area.width, area.height),
            &progress,
            region,
        )?;
        let height = plan.extent().map_or(0.0, |e| e.height);
        let y = if at_bottom {
            area.y + area.height - height
        } else {
            area.y
        };
        let region_area = Area::new(area.x, y, area.width, height);
        let children = self
            .layouter
            .place(frame, region_area, &mut progress, force)?;
        Ok((
            height,
            Some(LayoutBox::container(area.x, y, area.width, height, children)),
        ))
    }
}

fn run_pass(
    doc: &PreparedDocument<'_>,
    fonts: &FontTable,
    options: &PaginationOptions,
    total: Option<usize>,
) -> Result<LayoutDocument, PaginationError> {
    let mut out = LayoutDocument::new(doc.metadata.title.clone());
    out.author = doc.metadata.author.clone();
    out.subject = doc.metadata.subject.clone();
    let mut diagnostics = Vec::new();

    for (section_idx, section) in doc.pages.iter().enumerate() {
        let size = section.size.unwrap_or(options.page_size);
        let margin = section.margin.unwrap_or(options.margin);
        let inner = Area::new(
            margin.left,
            margin.top,
            (size.width - margin.horizontal()).max(0.0),
            (size.height - margin.vertical()).max(0.0),
        );
        let mut progress = Progress::new(doc.node_count);

        loop {
            let number = out.pages.len() + 1;
            if number > options.max_pages {
                return Err(PaginationError::PageLimitExceeded {
                    limit: options.max_pages,
                });
            }
            let numbers = PageNumbers {
                current: number,
                total: total.unwrap_or(number),
            };
            let mut run = PageRun {
                layouter: Layouter::new(fonts, numbers),
                options,
                number,
                diagnostics: &mut diagnostics,
            };

            let (header_h, header) = run.repeated(
                section.header.as_ref(),
                doc.node_count,
                inner,
                Region::Header,
                false,
            )?;
            let below_header = Area::new(
                inner.x,
                inner.y + header_h,
                inner.width,
                (inner.height - header_h).max(0.0),
            );
            let (footer_h, footer) = run.repeated(
                section.footer.as_ref(),
                doc.node_count,
                below_header,
                Region::Footer,
                true,
            )?;
            let content_area = Area::new(
                inner.x,
                below_header.y,
                inner.width,
                (below_header.height - footer_h).max(0.0),
            );

            let (content, done) = match &section.content {
                Some(frame) => {
                    let (plan, force) = run.plan(
                        frame,
                        Extent::new(content_area.width, content_area.height),
                        &progress,
                        Region::Content,
                    )?;
                    let height = plan.extent().map_or(0.0, |e| e.height);
                    let placed = Area::new(content_area.x, content_area.y, content_area.width, height);
                    let children = run.layouter.place(frame, placed, &mut progress, force)?;
                    let region = LayoutBox::container(
                        content_area.x,
                        content_area.y,
                        content_area.width,
                        content_area.height.max(height),
                        children,
                    );
                    (Some(region), plan.completes())
                }
                None => (None, true),
            };

            log::debug!(
                "section {} page {}: header {:.1}pt, footer {:.1}pt, content area {:.1}pt",
                section_idx,
                number,
                header_h,
                footer_h,
                content_area.height
            );
            out.pages.push(PageLayout {
                number,
                width: size.width,
                height: size.height,
                background: section.background,
                header,
                content,
                footer,
            });
            if done {
                break;
            }
        }
    }

    out.diagnostics = diagnostics;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::prepare;
    use crate::style::EffectiveStyle;
    use crate::tree::*;

    fn fixed(height: f32) -> Option<LayoutNode> {
        Some(LayoutNode::Box(BoxNode {
            decoration: Decoration::Constrain(SizeConstraints {
                height: Some(height),
                ..SizeConstraints::default()
            }),
            child: Box::new(LayoutNode::Placeholder),
        }))
    }

    fn tree(items: Vec<Option<LayoutNode>>, footer: Option<LayoutNode>) -> DocumentTree {
        DocumentTree {
            metadata: DocumentMetadata::default(),
            pages: vec![PageNode {
                size: Some(PageSize::new(300.0, 400.0)),
                margin: Some(Edges::all(0.0)),
                content: Some(LayoutNode::Column(ColumnNode {
                    spacing: 0.0,
                    items,
                })),
                footer,
                ..PageNode::default()
            }],
        }
    }

    fn page_numbers_footer() -> LayoutNode {
        let style = EffectiveStyle::default();
        LayoutNode::Text(TextNode {
            runs: vec![
                TextRun {
                    content: RunContent::CurrentPageNumber,
                    style: style.clone(),
                },
                TextRun {
                    content: RunContent::Literal(" / ".into()),
                    style: style.clone(),
                },
                TextRun {
                    content: RunContent::TotalPages,
                    style,
                },
            ],
            align: TextAlign::Center,
        })
    }

    fn run(tree: &DocumentTree, options: &PaginationOptions) -> Result<LayoutDocument, PaginationError> {
        let fonts = FontTable::with_builtin_faces();
        let prepared = prepare(tree, &fonts).unwrap();
        paginate(&prepared, &fonts, options)
    }

    #[test]
    fn content_flows_across_pages() {
        let doc = run(&tree(vec![fixed(150.0); 5], None), &PaginationOptions::default()).unwrap();
        assert_eq!(doc.pages.len(), 3);
        assert_eq!(doc.pages.iter().map(|p| p.number).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn page_tokens_resolve_to_final_total() {
        let doc = run(
            &tree(vec![fixed(150.0); 5], Some(page_numbers_footer())),
            &PaginationOptions::default(),
        )
        .unwrap();
        assert_eq!(doc.pages.len(), 3);
        for page in &doc.pages {
            assert_eq!(
                page.region_text(Region::Footer),
                format!("{} / 3", page.number)
            );
            let footer = page.footer.as_ref().unwrap();
            assert!((footer.bottom() - 400.0).abs() < 0.01);
        }
    }

    #[test]
    fn oversized_item_is_flagged_or_fails() {
        let doc = run(&tree(vec![fixed(500.0), fixed(10.0)], None), &PaginationOptions::default())
            .unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.diagnostics.len(), 1);
        assert_eq!(doc.diagnostics[0].page, 1);
        assert_eq!(doc.diagnostics[0].region, Region::Content);
        assert!((doc.diagnostics[0].required - 500.0).abs() < 0.01);

        let strict = PaginationOptions {
            overflow: OverflowPolicy::Fail,
            ..PaginationOptions::default()
        };
        let err = run(&tree(vec![fixed(500.0)], None), &strict).unwrap_err();
        assert!(matches!(err, PaginationError::Overflow { page: 1, .. }));
    }

    #[test]
    fn page_limit_is_enforced() {
        let limited = PaginationOptions {
            max_pages: 2,
            ..PaginationOptions::default()
        };
        let err = run(&tree(vec![fixed(300.0); 3], None), &limited).unwrap_err();
        assert_eq!(err, PaginationError::PageLimitExceeded { limit: 2 });
    }

    #[test]
    fn empty_content_still_yields_a_page() {
        let doc = run(&tree(Vec::new(), Some(page_numbers_footer())), &PaginationOptions::default())
            .unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].region_text(Region::Footer), "1 / 1");
    }

    fn card(name: &str, height: f32) -> Option<LayoutNode> {
        Some(LayoutNode::Box(BoxNode {
            decoration: Decoration::Section(name.to_string()),
            child: Box::new(fixed(height)?),
        }))
    }

    fn sections(page: &PageLayout) -> Vec<&str> {
        let mut names = Vec::new();
        if let Some(content) = &page.content {
            content.visit(&mut |b| {
                if let Some(name) = &b.section {
                    names.push(name.as_str());
                }
            });
        }
        names
    }

    #[test]
    fn nested_column_resumes_on_next_page() {
        let inner = LayoutNode::Column(ColumnNode {
            spacing: 0.0,
            items: vec![card("b", 150.0), card("c", 150.0)],
        });
        let doc = run(
            &tree(vec![card("a", 150.0), Some(inner), card("d", 50.0)], None),
            &PaginationOptions::default(),
        )
        .unwrap();

        assert_eq!(doc.pages.len(), 2);
        assert_eq!(sections(&doc.pages[0]), vec!["a", "b"]);
        assert_eq!(sections(&doc.pages[1]), vec!["c", "d"]);
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn fixed_height_box_with_taller_text_stays_on_page() {
        let lines = LayoutNode::Text(TextNode {
            runs: vec![TextRun {
                content: RunContent::Literal("1\n2\n3\n4\n5\n6\n7\n8".into()),
                style: EffectiveStyle::default(),
            }],
            align: TextAlign::Left,
        });
        let boxed = LayoutNode::Box(BoxNode {
            decoration: Decoration::Constrain(SizeConstraints {
                height: Some(50.0),
                ..SizeConstraints::default()
            }),
            child: Box::new(lines),
        });
        let doc = run(&tree(vec![card("first", 20.0), Some(boxed)], None), &PaginationOptions::default())
            .unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert!(doc.diagnostics.is_empty());
    }
}
