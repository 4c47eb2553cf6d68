//! The invoice document: composes an [`InvoiceModel`] into a layout tree.
//!
//! Header: invoice number and dates on the left, a logo placeholder on the
//! right. Content: the two parties, one card per order item, the subtotal
//! and the comments. Footer: `current / total` page numbers.

use crate::builder::{Container, Document, DocumentContainer};
use crate::error::{ComposeError, ForgeError};
use crate::model::{format_money, Address, InvoiceModel, OrderItem};
use crate::style::{Color, EffectiveStyle, StyleRegistry, TextStyle};
use crate::tree::{DocumentMetadata, TextAlign};

/// Font name every invoice style refers to.
pub const INVOICE_FONT: &str = "Roboto";

/// Section name of each order-item card.
pub const ITEM_SECTION: &str = "item";

pub const PAGE_MARGIN: f32 = 50.0;
pub const ITEM_CARD_HEIGHT: f32 = 200.0;
const LOGO_WIDTH: f32 = 100.0;
const LOGO_HEIGHT: f32 = 50.0;
const CONTENT_PADDING: f32 = 40.0;

/// Styles used by the invoice, all rooted at [`INVOICE_FONT`].
pub fn invoice_styles() -> Result<StyleRegistry, ComposeError> {
    let mut styles = StyleRegistry::with_root(EffectiveStyle {
        font: INVOICE_FONT.to_string(),
        ..EffectiveStyle::default()
    });
    styles.register("body", None, TextStyle::new())?;
    styles.register(
        "title",
        Some("body"),
        TextStyle::new().size(20.0).semibold().color(Color::BLUE_MEDIUM),
    )?;
    styles.register("label", Some("body"), TextStyle::new().semibold())?;
    styles.register("item", Some("body"), TextStyle::new().size(16.0))?;
    styles.register("item-name", Some("item"), TextStyle::new().semibold())?;
    styles.register(
        "muted",
        Some("body"),
        TextStyle::new().size(10.0).color(Color::GREY_DARKEN_2),
    )?;
    Ok(styles)
}

/// An invoice ready for composition.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    model: InvoiceModel,
    styles: StyleRegistry,
}

impl InvoiceDocument {
    /// Validate the model and set up the invoice styles.
    pub fn new(model: InvoiceModel) -> Result<Self, ForgeError> {
        model.validate()?;
        Ok(Self {
            model,
            styles: invoice_styles()?,
        })
    }

    pub fn model(&self) -> &InvoiceModel {
        &self.model
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    fn compose_header(&self, container: Container<'_>) -> Result<(), ComposeError> {
        let title = self.styles.get("title")?;
        let label = self.styles.get("label")?;
        let body = self.styles.get("body")?;
        let model = &self.model;

        container.row(|row| {
            row.relative_item(1.0)?.column(|col| {
                col.item()
                    .text(format!("Invoice #{}", model.invoice_number), &title)?;
                col.item().text_runs(|t| {
                    t.span("Issue date: ", &label)
                        .span(model.issue_date.format("%d/%m/%Y").to_string(), &body);
                })?;
                col.item().text_runs(|t| {
                    t.span("Due date: ", &label)
                        .span(model.due_date.format("%d/%m/%Y").to_string(), &body);
                })
            })?;
            row.constant_item(LOGO_WIDTH)?
                .height(LOGO_HEIGHT)?
                .placeholder()
        })
    }

    fn compose_content(&self, container: Container<'_>) -> Result<(), ComposeError> {
        container.padding_vertical(CONTENT_PADDING)?.column(|col| {
            col.spacing(5.0)?;
            col.item().element(|c| self.compose_parties(c))?;
            for item in &self.model.items {
                col.item().element(|c| self.compose_item(c, item))?;
            }
            col.item().element(|c| self.compose_subtotal(c))?;
            if !self.model.comments.trim().is_empty() {
                col.item().element(|c| self.compose_comments(c))?;
            }
            Ok(())
        })
    }

    fn compose_parties(&self, container: Container<'_>) -> Result<(), ComposeError> {
        container.padding_vertical(10.0)?.row(|row| {
            row.spacing(20.0)?;
            row.relative_item(1.0)?
                .element(|c| self.compose_address(c, "From", &self.model.seller_address))?;
            row.relative_item(1.0)?
                .element(|c| self.compose_address(c, "For", &self.model.customer_address))
        })
    }

    fn compose_address(
        &self,
        container: Container<'_>,
        heading: &str,
        address: &Address,
    ) -> Result<(), ComposeError> {
        let label = self.styles.get("label")?;
        let body = self.styles.get("body")?;
        container.column(|col| {
            col.item()
                .border(0.5, Color::GREY_MEDIUM)?
                .padding_vertical(2.0)?
                .text(heading, &label)?;
            for line in address.display_lines() {
                col.item().text(line, &body)?;
            }
            Ok(())
        })
    }

    fn compose_item(&self, container: Container<'_>, item: &OrderItem) -> Result<(), ComposeError> {
        let name = self.styles.get("item-name")?;
        let body = self.styles.get("item")?;
        container
            .section(ITEM_SECTION)
            .background(Color::GREY_LIGHTEN_3)
            .height(ITEM_CARD_HEIGHT)?
            .align_center()
            .align_middle()
            .text_runs(|t| {
                t.span(format!("{}\n", item.name), &name)
                    .span(
                        format!(
                            "{} \u{d7} {} = {}",
                            item.quantity,
                            format_money(item.unit_price),
                            format_money(item.line_total())
                        ),
                        &body,
                    )
                    .align(TextAlign::Center);
            })
    }

    fn compose_subtotal(&self, container: Container<'_>) -> Result<(), ComposeError> {
        let label = self.styles.get("label")?;
        let title = self.styles.derive("label", &TextStyle::new().size(14.0))?;
        container.padding_vertical(5.0)?.text_runs(|t| {
            t.span("Subtotal: ", &label)
                .span(format_money(self.model.subtotal()), &title)
                .align(TextAlign::Right);
        })
    }

    fn compose_comments(&self, container: Container<'_>) -> Result<(), ComposeError> {
        let label = self.styles.get("label")?;
        let muted = self.styles.get("muted")?;
        container
            .background(Color::GREY_LIGHTEN_3)
            .padding(10.0)?
            .column(|col| {
                col.spacing(5.0)?;
                col.item().text("Comments", &label)?;
                col.item().text(self.model.comments.clone(), &muted)
            })
    }

    fn compose_footer(&self, container: Container<'_>) -> Result<(), ComposeError> {
        let body = self.styles.get("body")?;
        container.align_center().text_runs(|t| {
            t.current_page_number(&body)
                .span(" / ", &body)
                .total_pages(&body)
                .align(TextAlign::Center);
        })
    }
}

impl Document for InvoiceDocument {
    fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            title: format!("Invoice #{}", self.model.invoice_number),
            author: self.model.seller_address.company_name.clone(),
            subject: Some("Invoice".to_string()),
        }
    }

    fn compose(&self, document: &mut DocumentContainer) -> Result<(), ComposeError> {
        document.page(|page| {
            page.margin(PAGE_MARGIN)?;
            page.header().element(|c| self.compose_header(c))?;
            // An invoice without lines is just its header and footer.
            if !self.model.items.is_empty() {
                page.content().element(|c| self.compose_content(c))?;
            }
            page.footer().element(|c| self.compose_footer(c))
        })
    }
}
