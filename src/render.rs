//! PDF emitter – turns a [`LayoutDocument`] into PDF bytes using
//! `printpdf` (v0.8 ops-based API).
//!
//! Fonts and images are registered once per document in first-seen order,
//! however many fragments or boxes refer to them. Output is byte-stable:
//! resource ids come from registration order, dates are pinned to the Unix
//! epoch and the document id is a digest of the layout.

use std::collections::HashMap;
use std::io::Write;

use printpdf::*;
use sha2::{Digest, Sha256};

use crate::builder::decode_data_uri;
use crate::emit::{DocumentEmitter, EmitSummary};
use crate::error::EmitError;
use crate::fonts::{BuiltinFace, FaceSource, FontTable};
use crate::layout::PLACEHOLDER_COLOR;
use crate::page_layout::{LayoutBox, LayoutDocument, TextFragment};
use crate::style::Color as Paint;
use crate::tree::PageSize;

const PT_TO_MM: f32 = 0.352778;

/// Emits PDF, resolving fragment font names against a [`FontTable`].
#[derive(Debug, Clone, Copy)]
pub struct PdfEmitter<'f> {
    fonts: &'f FontTable,
}

/// How a font name is written into the PDF.
#[derive(Debug, Clone)]
enum PdfFace {
    Builtin(BuiltinFace),
    Embedded(FontId),
}

/// A registered XObject together with the pixel size of its source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

struct Resources<'d> {
    fonts: HashMap<&'d str, PdfFace>,
    images: HashMap<&'d str, ImageResource>,
}

impl<'f> PdfEmitter<'f> {
    pub fn new(fonts: &'f FontTable) -> Self {
        Self { fonts }
    }

    /// Render to an in-memory buffer.
    pub fn render(&self, doc: &LayoutDocument) -> Result<(Vec<u8>, EmitSummary), EmitError> {
        let document_id = layout_digest(doc)?;
        let mut pdf = PdfDocument::new(&doc.title);
        stamp_info(&mut pdf.metadata.info, doc, &document_id);
        let resources = self.register_resources(doc, &mut pdf)?;

        let mut pages = Vec::with_capacity(doc.pages.len().max(1));
        for page in &doc.pages {
            let mut ops = Vec::new();
            if let Some(bg) = page.background.filter(|c| !c.is_transparent()) {
                ops.push(Op::SetFillColor { col: pdf_color(bg) });
                ops.push(fill(corners(0.0, page.height, page.width, page.height)));
            }
            for (_, region) in page.regions() {
                render_box(&mut ops, region, page.height, &resources);
            }
            pages.push(PdfPage::new(
                Mm(page.width * PT_TO_MM),
                Mm(page.height * PT_TO_MM),
                ops,
            ));
            log::debug!("rendered page {}", page.number);
        }

        // Ensure at least one page.
        if pages.is_empty() {
            pages.push(PdfPage::new(
                Mm(PageSize::A4.width * PT_TO_MM),
                Mm(PageSize::A4.height * PT_TO_MM),
                Vec::new(),
            ));
        }
        let page_count = pages.len();

        pdf.with_pages(pages);
        let mut warnings = Vec::new();
        let mut bytes = pdf.save(&PdfSaveOptions::default(), &mut warnings);
        stamp_trailer_id(&mut bytes, &document_id);
        for warning in &warnings {
            log::debug!("printpdf: {warning:?}");
        }

        let summary = EmitSummary {
            pages: page_count,
            fonts: resources.fonts.len(),
            images: resources.images.len(),
            bytes: bytes.len(),
        };
        Ok((bytes, summary))
    }

    fn register_resources<'d>(
        &self,
        doc: &'d LayoutDocument,
        pdf: &mut PdfDocument,
    ) -> Result<Resources<'d>, EmitError> {
        let mut font_names: Vec<&'d str> = Vec::new();
        let mut image_srcs: Vec<&'d str> = Vec::new();
        for page in &doc.pages {
            for (_, region) in page.regions() {
                region.visit(&mut |b| {
                    if let Some(text) = &b.text {
                        for fragment in text.lines.iter().flat_map(|l| &l.fragments) {
                            if !font_names.contains(&fragment.font.as_str()) {
                                font_names.push(fragment.font.as_str());
                            }
                        }
                    }
                    if let Some(img) = &b.image {
                        if !image_srcs.contains(&img.src.as_str()) {
                            image_srcs.push(img.src.as_str());
                        }
                    }
                });
            }
        }

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();

        let mut fonts = HashMap::new();
        for name in font_names {
            let face = self
                .fonts
                .by_name(name)
                .ok_or_else(|| EmitError::UnresolvedFont {
                    name: name.to_string(),
                })?;
            let pdf_face = match &face.source {
                FaceSource::Builtin(builtin) => PdfFace::Builtin(*builtin),
                FaceSource::Embedded(bytes) => {
                    let parsed = ParsedFont::from_bytes(bytes, 0, &mut warnings).ok_or_else(
                        || EmitError::UnresolvedFont {
                            name: name.to_string(),
                        },
                    )?;
                    let id = FontId(format!("F{}", pdf.resources.fonts.map.len() + 1));
                    pdf.resources.fonts.map.insert(id.clone(), parsed);
                    PdfFace::Embedded(id)
                }
            };
            log::debug!("registered font resource '{name}'");
            fonts.insert(name, pdf_face);
        }

        let mut images = HashMap::new();
        for src in image_srcs {
            let bytes = match decode_data_uri(src) {
                Ok(b) => b,
                Err(e) => {
                    log::warn!("Skipping image: {e}");
                    continue;
                }
            };
            let raw = match RawImage::decode_from_bytes(&bytes, &mut warnings) {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Skipping image: PDF encode error: {e}");
                    continue;
                }
            };
            let (px_width, px_height) = (raw.width as u32, raw.height as u32);
            let xobj_id = XObjectId(format!("Im{}", images.len() + 1));
            pdf.resources
                .xobjects
                .map
                .insert(xobj_id.clone(), XObject::Image(raw));
            images.insert(
                src,
                ImageResource {
                    xobj_id,
                    px_width,
                    px_height,
                },
            );
        }

        Ok(Resources { fonts, images })
    }
}

/// Hex SHA-256 of the layout's JSON form, 64 characters.
fn layout_digest(doc: &LayoutDocument) -> Result<String, EmitError> {
    let json = serde_json::to_vec(doc).map_err(EmitError::Serialize)?;
    Ok(Sha256::digest(&json)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

fn stamp_info(info: &mut PdfDocumentInfo, doc: &LayoutDocument, document_id: &str) {
    if let Ok(epoch) = OffsetDateTime::from_unix_timestamp(0) {
        info.creation_date = epoch;
        info.modification_date = epoch;
        info.metadata_date = epoch;
    }
    info.author = doc.author.clone().unwrap_or_default();
    info.subject = doc.subject.clone().unwrap_or_default();
    info.creator = env!("CARGO_PKG_NAME").to_string();
    info.producer = env!("CARGO_PKG_NAME").to_string();
    info.identifier = document_id.to_string();
}

/// Overwrite the trailer `/ID[(..)(..)]` strings with the two halves of
/// `document_id`.
///
/// printpdf fills both with 32 letters from a process-wide counter. Only an
/// exact match of that shape is rewritten, and lengths are kept so xref
/// offsets stay valid.
fn stamp_trailer_id(bytes: &mut [u8], document_id: &str) {
    const KEY: &[u8] = b"/ID[(";
    const ID_LEN: usize = 32;
    const SPAN: usize = KEY.len() + 2 * ID_LEN + 4;
    let first = KEY.len();
    let second = first + ID_LEN + 2;

    let id = document_id.as_bytes();
    if id.len() < 2 * ID_LEN {
        return;
    }
    let is_id = |w: &[u8]| {
        w.starts_with(KEY)
            && &w[second - 2..second] == b")("
            && w.ends_with(b")]")
            && w[first..first + ID_LEN]
                .iter()
                .chain(&w[second..second + ID_LEN])
                .all(u8::is_ascii_uppercase)
    };
    let Some(start) = bytes.windows(SPAN).rposition(is_id) else {
        log::debug!("no trailer /ID to stamp");
        return;
    };
    bytes[start + first..start + first + ID_LEN].copy_from_slice(&id[..ID_LEN]);
    bytes[start + second..start + second + ID_LEN].copy_from_slice(&id[ID_LEN..2 * ID_LEN]);
}

impl DocumentEmitter for PdfEmitter<'_> {
    fn emit(&self, doc: &LayoutDocument, sink: &mut dyn Write) -> Result<EmitSummary, EmitError> {
        let (bytes, summary) = self.render(doc)?;
        sink.write_all(&bytes).map_err(EmitError::SinkWrite)?;
        sink.flush().map_err(EmitError::SinkWrite)?;
        Ok(summary)
    }
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{00A0}' => 0x20,
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0x9F range; printpdf passes
    // these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

fn builtin_font(face: BuiltinFace, bold: bool, italic: bool) -> BuiltinFont {
    match (face, bold, italic) {
        (BuiltinFace::Helvetica, true, true) => BuiltinFont::HelveticaBoldOblique,
        (BuiltinFace::Helvetica, true, false) => BuiltinFont::HelveticaBold,
        (BuiltinFace::Helvetica, false, true) => BuiltinFont::HelveticaOblique,
        (BuiltinFace::Helvetica, false, false) => BuiltinFont::Helvetica,
        (BuiltinFace::Times, true, true) => BuiltinFont::TimesBoldItalic,
        (BuiltinFace::Times, true, false) => BuiltinFont::TimesBold,
        (BuiltinFace::Times, false, true) => BuiltinFont::TimesItalic,
        (BuiltinFace::Times, false, false) => BuiltinFont::TimesRoman,
        (BuiltinFace::Courier, true, true) => BuiltinFont::CourierBoldOblique,
        (BuiltinFace::Courier, true, false) => BuiltinFont::CourierBold,
        (BuiltinFace::Courier, false, true) => BuiltinFont::CourierOblique,
        (BuiltinFace::Courier, false, false) => BuiltinFont::Courier,
    }
}

fn pdf_color(c: Paint) -> Color {
    Color::Rgb(Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Rectangle corners in PDF space, counter-clockwise from bottom-left.
fn corners(x: f32, pdf_top: f32, width: f32, height: f32) -> Vec<LinePoint> {
    let (x1, y1, x2, y2) = (x, pdf_top - height, x + width, pdf_top);
    vec![point(x1, y1), point(x2, y1), point(x2, y2), point(x1, y2)]
}

fn fill(points: Vec<LinePoint>) -> Op {
    Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing { points }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    }
}

/// Recursively render a LayoutBox and its children into PDF ops.
fn render_box(ops: &mut Vec<Op>, lbox: &LayoutBox, page_height: f32, res: &Resources<'_>) {
    // PDF coordinate system: origin at bottom-left.
    let pdf_y = page_height - lbox.y;

    let paint = lbox
        .background
        .filter(|c| !c.is_transparent())
        .or(lbox.placeholder.then_some(PLACEHOLDER_COLOR));
    if let Some(bg) = paint {
        ops.push(Op::SetFillColor { col: pdf_color(bg) });
        ops.push(fill(corners(lbox.x, pdf_y, lbox.width, lbox.height)));
    }

    if let Some(border) = &lbox.border {
        ops.push(Op::SetOutlineColor {
            col: pdf_color(border.color),
        });
        ops.push(Op::SetOutlineThickness {
            pt: Pt(border.width),
        });
        ops.push(Op::DrawLine {
            line: Line {
                points: corners(lbox.x, pdf_y, lbox.width, lbox.height),
                is_closed: true,
            },
        });
    }

    if let Some(text) = &lbox.text {
        for line in &text.lines {
            let baseline_y = pdf_y - line.y_offset - line.baseline;
            for fragment in &line.fragments {
                if fragment.text.trim().is_empty() {
                    continue;
                }
                write_fragment(ops, fragment, lbox.x + fragment.x_offset, baseline_y, res);
            }
        }
    }

    if let Some(img) = &lbox.image {
        if let Some(image) = res.images.get(img.src.as_str()) {
            // translate_y = bottom edge of the image in PDF coordinates.
            let img_bottom_y = pdf_y - lbox.height;
            // At dpi=72 printpdf renders 1 px = 1 pt.
            let scale_x = if image.px_width > 0 {
                lbox.width / image.px_width as f32
            } else {
                1.0
            };
            let scale_y = if image.px_height > 0 {
                lbox.height / image.px_height as f32
            } else {
                1.0
            };
            ops.push(Op::UseXobject {
                id: image.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(lbox.x)),
                    translate_y: Some(Pt(img_bottom_y)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }

    for child in &lbox.children {
        render_box(ops, child, page_height, res);
    }
}

fn write_fragment(
    ops: &mut Vec<Op>,
    fragment: &TextFragment,
    x: f32,
    baseline_y: f32,
    res: &Resources<'_>,
) {
    // Fonts were all resolved while registering resources.
    let Some(face) = res.fonts.get(fragment.font.as_str()) else {
        return;
    };

    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(x),
            y: Pt(baseline_y),
        },
    });
    ops.push(Op::SetFillColor {
        col: pdf_color(fragment.color),
    });
    match face {
        PdfFace::Builtin(builtin) => {
            let font = builtin_font(*builtin, fragment.weight.is_bold(), fragment.italic);
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(fragment.size),
                font,
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(to_winlatin(&fragment.text))],
                font,
            });
        }
        PdfFace::Embedded(id) => {
            ops.push(Op::SetFontSize {
                size: Pt(fragment.size),
                font: id.clone(),
            });
            ops.push(Op::WriteText {
                items: vec![TextItem::Text(fragment.text.clone())],
                font: id.clone(),
            });
        }
    }
    ops.push(Op::EndTextSection);
}
