//! Page layout – the "frozen" output of pagination and the input of every
//! emitter. It encodes exactly what goes on each page, in page-absolute
//! points with the origin at the top-left corner.

use serde::{Deserialize, Serialize};

use crate::style::{Color, FontWeight};
use crate::tree::Border;

/// A complete paginated document ready for emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "LayoutDocument::default_title")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Ordered list of pages.
    pub pages: Vec<PageLayout>,
    /// Recoverable layout problems, e.g. forced overflow.
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

/// One physical page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// 1-based, global across page sections.
    pub number: usize,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
    pub header: Option<LayoutBox>,
    pub content: Option<LayoutBox>,
    pub footer: Option<LayoutBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    /// Position relative to page top-left, in points.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageContent>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Top of the line relative to the top of the box.
    pub y_offset: f32,
    pub height: f32,
    /// Baseline relative to the top of the line.
    pub baseline: f32,
    pub width: f32,
    pub fragments: Vec<TextFragment>,
}

/// A run of text in a single style on a single line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    /// X offset within the box (alignment applied).
    pub x_offset: f32,
    pub width: f32,
    pub font: String,
    pub size: f32,
    pub weight: FontWeight,
    pub italic: bool,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Base64 data URI.
    pub src: String,
    pub px_width: u32,
    pub px_height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Header,
    Content,
    Footer,
}

/// Content that could not fit a fresh page and was placed anyway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub page: usize,
    pub region: Region,
    pub required: f32,
    pub available: f32,
}

impl LayoutDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
            subject: None,
            pages: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn default_title() -> String {
        "invoice-forge output".to_string()
    }

    /// Serialise to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl PageLayout {
    /// Header, content and footer boxes, in that order.
    pub fn regions(&self) -> impl Iterator<Item = (Region, &LayoutBox)> {
        [
            (Region::Header, self.header.as_ref()),
            (Region::Content, self.content.as_ref()),
            (Region::Footer, self.footer.as_ref()),
        ]
        .into_iter()
        .filter_map(|(region, b)| b.map(|b| (region, b)))
    }

    /// All text in a region, lines joined with `\n`.
    pub fn region_text(&self, region: Region) -> String {
        let mut lines = Vec::new();
        if let Some((_, b)) = self.regions().find(|(r, _)| *r == region) {
            b.visit(&mut |lb| {
                if let Some(text) = &lb.text {
                    lines.extend(text.lines.iter().map(TextLine::text));
                }
            });
        }
        lines.join("\n")
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            section: None,
            background: None,
            border: None,
            text: None,
            image: None,
            placeholder: false,
            children: Vec::new(),
        }
    }

    /// Empty container box wrapping `children`.
    pub fn container(x: f32, y: f32, width: f32, height: f32, children: Vec<LayoutBox>) -> Self {
        Self {
            children,
            ..Self::new(x, y, width, height)
        }
    }

    /// Pre-order traversal of this box and its descendants.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a LayoutBox)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }

    /// Boxes tagged with a section name, in pre-order.
    pub fn sections(&self) -> Vec<&LayoutBox> {
        let mut found = Vec::new();
        self.visit(&mut |b| {
            if b.section.is_some() {
                found.push(b);
            }
        });
        found
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

impl TextLine {
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageLayout {
        let mut text_box = LayoutBox::new(10.0, 20.0, 100.0, 12.0);
        text_box.section = Some("item".to_string());
        text_box.text = Some(TextBlock {
            lines: vec![TextLine {
                y_offset: 0.0,
                height: 12.0,
                baseline: 9.0,
                width: 20.0,
                fragments: vec![TextFragment {
                    text: "Hi".to_string(),
                    x_offset: 0.0,
                    width: 20.0,
                    font: "Helvetica".to_string(),
                    size: 10.0,
                    weight: FontWeight::NORMAL,
                    italic: false,
                    color: Color::BLACK,
                }],
            }],
        });
        PageLayout {
            number: 1,
            width: 200.0,
            height: 300.0,
            background: None,
            header: None,
            content: Some(LayoutBox::container(0.0, 0.0, 200.0, 300.0, vec![text_box])),
            footer: None,
        }
    }

    #[test]
    fn json_round_trip() {
        let mut doc = LayoutDocument::new("Test");
        doc.pages.push(page());
        doc.diagnostics.push(Diagnostic {
            page: 1,
            region: Region::Content,
            required: 400.0,
            available: 300.0,
        });
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"region\": \"content\""));
        assert!(!json.contains("\"placeholder\""));
        let back = LayoutDocument::from_json(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn title_defaults_when_missing() {
        let doc = LayoutDocument::from_json(r#"{"pages": []}"#).unwrap();
        assert_eq!(doc.title, "invoice-forge output");
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn sections_and_region_text() {
        let page = page();
        let content = page.content.as_ref().unwrap();
        assert_eq!(content.sections().len(), 1);
        assert_eq!(page.region_text(Region::Content), "Hi");
        assert_eq!(page.region_text(Region::Footer), "");
        assert_eq!(page.regions().count(), 1);
    }
}
