//! Style registry – named, inheritable text styles resolved to a flat
//! [`EffectiveStyle`] at composition time.
//!
//! A [`TextStyle`] is a partial override set; [`resolve`] merges overrides
//! onto a base left to right, the rightmost set attribute winning. Font
//! families stay symbolic here and are checked against the
//! [`FontTable`](crate::fonts::FontTable) when the tree is prepared for layout.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ComposeError;

/// Font name used when no style sets one.
pub const DEFAULT_FONT: &str = "Helvetica";
pub const DEFAULT_FONT_SIZE: f32 = 12.0;
pub const DEFAULT_LINE_HEIGHT: f32 = 1.2;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    // Material palette entries used by the invoice layout.
    pub const BLUE_MEDIUM: Self = Self::rgb(0.129, 0.588, 0.953);
    pub const GREY_LIGHTEN_3: Self = Self::rgb(0.933, 0.933, 0.933);
    pub const GREY_LIGHTEN_1: Self = Self::rgb(0.741, 0.741, 0.741);
    pub const GREY_MEDIUM: Self = Self::rgb(0.620, 0.620, 0.620);
    pub const GREY_DARKEN_2: Self = Self::rgb(0.380, 0.380, 0.380);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()? as f32 / 255.0;
            Some(Self::rgb(r, g, b))
        } else if hex.len() == 3 {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()? as f32 / 255.0;
            Some(Self::rgb(r, g, b))
        } else {
            None
        }
    }
}

/// CSS-style numeric font weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const THIN: Self = Self(100);
    pub const LIGHT: Self = Self(300);
    pub const NORMAL: Self = Self(400);
    pub const MEDIUM: Self = Self(500);
    pub const SEMIBOLD: Self = Self(600);
    pub const BOLD: Self = Self(700);
    pub const BLACK: Self = Self(900);

    /// Whether a face with only regular/bold variants should use bold.
    pub fn is_bold(self) -> bool {
        self >= Self::SEMIBOLD
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// Fully resolved style of a text run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveStyle {
    pub font: String,
    pub size: f32,
    pub weight: FontWeight,
    pub italic: bool,
    pub color: Color,
    pub line_height: f32,
}

impl EffectiveStyle {
    /// Font size and line height must be finite and positive.
    pub fn validate(&self) -> Result<(), ComposeError> {
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(ComposeError::constraint("font size", self.size));
        }
        if !(self.line_height.is_finite() && self.line_height > 0.0) {
            return Err(ComposeError::constraint("line height", self.line_height));
        }
        Ok(())
    }
}

impl Default for EffectiveStyle {
    fn default() -> Self {
        Self {
            font: DEFAULT_FONT.to_string(),
            size: DEFAULT_FONT_SIZE,
            weight: FontWeight::NORMAL,
            italic: false,
            color: Color::BLACK,
            line_height: DEFAULT_LINE_HEIGHT,
        }
    }
}

/// Partial style: unset attributes are inherited from the base it is resolved on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextStyle {
    pub font: Option<String>,
    pub size: Option<f32>,
    pub weight: Option<FontWeight>,
    pub italic: Option<bool>,
    pub color: Option<Color>,
    pub line_height: Option<f32>,
}

impl TextStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn font(mut self, family: impl Into<String>) -> Self {
        self.font = Some(family.into());
        self
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn weight(mut self, weight: FontWeight) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn semibold(self) -> Self {
        self.weight(FontWeight::SEMIBOLD)
    }

    pub fn bold(self) -> Self {
        self.weight(FontWeight::BOLD)
    }

    pub fn italic(mut self) -> Self {
        self.italic = Some(true);
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn line_height(mut self, factor: f32) -> Self {
        self.line_height = Some(factor);
        self
    }

    /// Resolve against [`EffectiveStyle::default`].
    pub fn effective(&self) -> EffectiveStyle {
        resolve(&EffectiveStyle::default(), &[self])
    }
}

/// Merge `overrides` onto `base`, left to right; the rightmost set attribute wins.
///
/// `base` is never modified.
pub fn resolve(base: &EffectiveStyle, overrides: &[&TextStyle]) -> EffectiveStyle {
    let mut style = base.clone();
    for o in overrides {
        if let Some(font) = &o.font {
            style.font = font.clone();
        }
        if let Some(size) = o.size {
            style.size = size;
        }
        if let Some(weight) = o.weight {
            style.weight = weight;
        }
        if let Some(italic) = o.italic {
            style.italic = italic;
        }
        if let Some(color) = o.color {
            style.color = color;
        }
        if let Some(line_height) = o.line_height {
            style.line_height = line_height;
        }
    }
    style
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Named styles with single inheritance.
///
/// Each entry is stored already resolved against its base, so lookups are a
/// clone. A base must be registered before the styles deriving from it, which
/// keeps inheritance chains acyclic.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    root: EffectiveStyle,
    styles: HashMap<String, EffectiveStyle>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::with_root(EffectiveStyle::default())
    }

    /// Registry whose base-less styles derive from `root`.
    pub fn with_root(root: EffectiveStyle) -> Self {
        Self {
            root,
            styles: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: &str,
        base: Option<&str>,
        overrides: TextStyle,
    ) -> Result<(), ComposeError> {
        if self.styles.contains_key(name) {
            return Err(ComposeError::DuplicateStyle {
                name: name.to_string(),
            });
        }
        let resolved = {
            let base_style = match base {
                Some(base_name) => self.lookup(base_name)?,
                None => &self.root,
            };
            resolve(base_style, &[&overrides])
        };
        resolved.validate()?;
        log::debug!("registered style '{name}' (base: {base:?})");
        self.styles.insert(name.to_string(), resolved);
        Ok(())
    }

    /// Resolved copy of a named style.
    pub fn get(&self, name: &str) -> Result<EffectiveStyle, ComposeError> {
        self.lookup(name).cloned()
    }

    /// A named style with further overrides applied on top.
    pub fn derive(&self, name: &str, overrides: &TextStyle) -> Result<EffectiveStyle, ComposeError> {
        let style = resolve(self.lookup(name)?, &[overrides]);
        style.validate()?;
        Ok(style)
    }

    pub fn root(&self) -> &EffectiveStyle {
        &self.root
    }

    pub fn contains(&self, name: &str) -> bool {
        self.styles.contains_key(name)
    }

    fn lookup(&self, name: &str) -> Result<&EffectiveStyle, ComposeError> {
        self.styles.get(name).ok_or_else(|| ComposeError::UnknownStyle {
            name: name.to_string(),
        })
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rightmost_override_wins() {
        let a = TextStyle::new().size(10.0).font("A");
        let b = TextStyle::new().size(20.0);
        let s = resolve(&EffectiveStyle::default(), &[&a, &b]);
        assert_eq!(s.size, 20.0);
        assert_eq!(s.font, "A");
        assert_eq!(s.weight, FontWeight::NORMAL);
    }

    #[test]
    fn resolve_leaves_base_untouched() {
        let base = EffectiveStyle::default();
        let _ = resolve(&base, &[&TextStyle::new().bold().color(Color::WHITE)]);
        assert_eq!(base, EffectiveStyle::default());
    }

    #[test]
    fn registry_inherits_from_base() {
        let mut reg = StyleRegistry::new();
        reg.register("body", None, TextStyle::new().font("Roboto").size(10.0))
            .unwrap();
        reg.register("title", Some("body"), TextStyle::new().size(20.0).semibold())
            .unwrap();

        let title = reg.get("title").unwrap();
        assert_eq!(title.font, "Roboto");
        assert_eq!(title.size, 20.0);
        assert!(title.weight.is_bold());
        assert_eq!(reg.get("body").unwrap().size, 10.0);
    }

    #[test]
    fn registry_rejects_unknown_base_and_duplicates() {
        let mut reg = StyleRegistry::new();
        assert!(matches!(
            reg.register("x", Some("missing"), TextStyle::new()),
            Err(ComposeError::UnknownStyle { .. })
        ));
        reg.register("x", None, TextStyle::new()).unwrap();
        assert!(matches!(
            reg.register("x", None, TextStyle::new()),
            Err(ComposeError::DuplicateStyle { .. })
        ));
        assert!(matches!(reg.get("nope"), Err(ComposeError::UnknownStyle { .. })));
    }

    #[test]
    fn registry_rejects_degenerate_sizes() {
        let mut reg = StyleRegistry::new();
        for overrides in [
            TextStyle::new().size(0.0),
            TextStyle::new().size(f32::NAN),
            TextStyle::new().line_height(-1.0),
        ] {
            assert!(matches!(
                reg.register("bad", None, overrides),
                Err(ComposeError::InvalidConstraint { .. })
            ));
        }
        reg.register("body", None, TextStyle::new()).unwrap();
        assert!(matches!(
            reg.derive("body", &TextStyle::new().size(-3.0)),
            Err(ComposeError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn derive_applies_overrides() {
        let mut reg = StyleRegistry::new();
        reg.register("body", None, TextStyle::new().size(9.0)).unwrap();
        let s = reg.derive("body", &TextStyle::new().italic()).unwrap();
        assert!(s.italic);
        assert_eq!(s.size, 9.0);
    }

    #[test]
    fn color_from_hex() {
        let c = Color::from_hex("#ff8800").unwrap();
        assert!((c.r - 1.0).abs() < 0.01);
        assert!((c.g - 0.533).abs() < 0.01);
        assert!((c.b - 0.0).abs() < 0.01);
        assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("#12"), None);
    }
}
