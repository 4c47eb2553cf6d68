//! # invoice-forge – declarative document composition and pagination
//!
//! Documents are described with a fluent builder and turned into paginated
//! PDFs. The pipeline stages are:
//!
//! 1. **Compose** – a [`Document`] builds a layout tree ([`builder`], [`tree`])
//!    with text styles from a registry ([`style`])
//! 2. **Prepare** – number nodes and resolve fonts ([`frame`], [`fonts`])
//! 3. **Paginate** – measure and place content page by page, repeating
//!    header and footer and resolving page numbers ([`layout`], [`text`],
//!    [`pagination`]) into a frozen page description ([`page_layout`])
//! 4. **Emit** – write PDF via printpdf ([`render`]) or JSON ([`emit`])
//!
//! The invoice demo ([`invoice`]) composes an [`InvoiceModel`](model::InvoiceModel)
//! filled by an [`InvoiceSource`](datasource::InvoiceSource).

pub mod builder;
pub mod datasource;
pub mod emit;
pub mod error;
pub mod fonts;
pub mod frame;
pub mod invoice;
pub mod layout;
pub mod model;
pub mod page_layout;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod style;
pub mod text;
pub mod tree;

// Re-exports for convenience
pub use builder::{compose_document, Container, Document, DocumentContainer};
pub use emit::{DocumentEmitter, EmitSummary, JsonEmitter};
pub use error::ForgeError;
pub use fonts::FontTable;
pub use invoice::InvoiceDocument;
pub use page_layout::LayoutDocument;
pub use pipeline::{generate_pdf, write_pdf_file, DocumentSettings, OverflowPolicy, PageOrientation};
pub use render::PdfEmitter;
pub use style::StyleRegistry;
