//! Pipeline – ties together composition, pagination and emission into
//! single function calls.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Deserialize;

use crate::builder::{compose_document, non_negative, positive, Document};
use crate::emit::{DocumentEmitter, EmitSummary};
use crate::error::{ComposeError, EmitError, ForgeError};
use crate::fonts::FontTable;
use crate::frame::prepare;
use crate::page_layout::LayoutDocument;
use crate::pagination::{paginate, PaginationOptions, DEFAULT_MAX_PAGES, PAGE_MARGIN_PT};
use crate::render::PdfEmitter;
use crate::tree::{DocumentTree, Edges, PageSize};

pub use crate::pagination::OverflowPolicy;

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Settings for one generation run.
///
/// Page size and margin are defaults: a page section that sets its own wins.
/// Missing fields in a settings file take their default value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// Overrides the document's own title when set.
    pub title: Option<String>,
    /// Page size in points before orientation (default: A4).
    pub page_size: PageSize,
    /// Page margin in points (default: 40).
    pub margin: f32,
    pub orientation: PageOrientation,
    pub overflow: OverflowPolicy,
    pub max_pages: usize,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            title: None,
            page_size: PageSize::A4,
            margin: PAGE_MARGIN_PT,
            orientation: PageOrientation::Portrait,
            overflow: OverflowPolicy::Flag,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl DocumentSettings {
    /// Create an A4 landscape config.
    pub fn a4_landscape() -> Self {
        Self {
            orientation: PageOrientation::Landscape,
            ..Self::default()
        }
    }

    /// Load settings from JSON. Out-of-range values are rejected as data errors.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let settings: Self = serde_json::from_str(json)?;
        settings
            .validate()
            .map_err(<serde_json::Error as serde::de::Error>::custom)?;
        Ok(settings)
    }

    /// Page dimensions positive, margin non-negative and leaving room for
    /// content, at least one page allowed.
    pub fn validate(&self) -> Result<(), ComposeError> {
        positive("page width", self.page_size.width)?;
        positive("page height", self.page_size.height)?;
        non_negative("margin", self.margin)?;
        let narrowest = self.page_size.width.min(self.page_size.height);
        if 2.0 * self.margin >= narrowest {
            return Err(ComposeError::constraint("margin leaves no content area", self.margin));
        }
        if self.max_pages == 0 {
            return Err(ComposeError::constraint("max pages", 0.0));
        }
        Ok(())
    }

    /// Effective page size after applying orientation.
    pub fn effective_page_size(&self) -> PageSize {
        match self.orientation {
            PageOrientation::Portrait => self.page_size,
            PageOrientation::Landscape => self.page_size.landscape(),
        }
    }

    pub fn pagination_options(&self) -> PaginationOptions {
        PaginationOptions {
            page_size: self.effective_page_size(),
            margin: Edges::all(self.margin),
            overflow: self.overflow,
            max_pages: self.max_pages,
        }
    }
}

/// Compose a document into its layout tree.
pub fn compose<D: Document + ?Sized>(document: &D) -> Result<DocumentTree, ForgeError> {
    Ok(compose_document(document)?)
}

/// Resolve fonts and paginate a composed tree.
pub fn layout(
    tree: &DocumentTree,
    fonts: &FontTable,
    settings: &DocumentSettings,
) -> Result<LayoutDocument, ForgeError> {
    settings.validate()?;
    let prepared = prepare(tree, fonts)?;
    let mut doc = paginate(&prepared, fonts, &settings.pagination_options())?;
    if let Some(title) = &settings.title {
        doc.title = title.clone();
    }
    Ok(doc)
}

/// Compose and paginate without emitting anything – useful for testing.
pub fn compute_layout<D: Document + ?Sized>(
    document: &D,
    fonts: &FontTable,
    settings: &DocumentSettings,
) -> Result<LayoutDocument, ForgeError> {
    let tree = compose(document)?;
    layout(&tree, fonts, settings)
}

/// Full pipeline: document → PDF bytes on `sink`.
///
/// Returns the page layout alongside the emission summary.
pub fn generate_pdf<D: Document + ?Sized>(
    document: &D,
    fonts: &FontTable,
    settings: &DocumentSettings,
    sink: &mut dyn Write,
) -> Result<(LayoutDocument, EmitSummary), ForgeError> {
    let layout = compute_layout(document, fonts, settings)?;
    let summary = PdfEmitter::new(fonts).emit(&layout, sink)?;
    log::debug!(
        "emitted {} page(s), {} font(s), {} image(s), {} bytes",
        summary.pages,
        summary.fonts,
        summary.images,
        summary.bytes
    );
    Ok((layout, summary))
}

/// [`generate_pdf`] into a file, creating parent directories as needed.
pub fn write_pdf_file<D: Document + ?Sized>(
    document: &D,
    fonts: &FontTable,
    settings: &DocumentSettings,
    path: &Path,
) -> Result<(LayoutDocument, EmitSummary), ForgeError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(EmitError::SinkWrite)?;
        }
    }
    let mut file = fs::File::create(path).map_err(EmitError::SinkWrite)?;
    generate_pdf(document, fonts, settings, &mut file)
}
