//! Font table and text measurement using `ttf-parser`.
//!
//! Fonts are registered under symbolic names. A name maps either to one of
//! the PDF base-14 families (no bytes, heuristic metrics) or to TrueType /
//! OpenType bytes whose glyph advances are measured exactly. Nothing is ever
//! substituted for a missing name: lookups fail with
//! [`ComposeError::UnresolvedFont`] and the caller decides what to do.

use std::collections::HashMap;
use std::io::Read;

use crate::error::ComposeError;

/// Index of a face inside a [`FontTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceId(pub(crate) usize);

/// PDF base-14 families usable without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFace {
    Helvetica,
    Times,
    Courier,
}

#[derive(Debug, Clone)]
pub enum FaceSource {
    Builtin(BuiltinFace),
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    Embedded(Vec<u8>),
}

/// A registered face with its vertical metrics.
#[derive(Debug, Clone)]
pub struct FontFace {
    pub name: String,
    pub source: FaceSource,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
}

impl FontFace {
    fn builtin(name: &str, face: BuiltinFace) -> Self {
        Self {
            name: name.to_string(),
            source: FaceSource::Builtin(face),
            units_per_em: 1000.0,
            ascender: 750.0,
            descender: -250.0,
        }
    }

    /// Ascender in points at `font_size`.
    pub fn ascender_pt(&self, font_size: f32) -> f32 {
        self.ascender * font_size / self.units_per_em
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.source, FaceSource::Embedded(_))
    }
}

/// Symbolic font name → face.
///
/// Read-only once composition starts; share it by reference across runs.
#[derive(Debug, Clone, Default)]
pub struct FontTable {
    faces: Vec<FontFace>,
    by_name: HashMap<String, usize>,
}

impl FontTable {
    /// An empty table: every font name must be registered explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-populated with "Helvetica", "Times" and "Courier".
    pub fn with_builtin_faces() -> Self {
        let mut table = Self::new();
        table.register_builtin("Helvetica", BuiltinFace::Helvetica);
        table.register_builtin("Times", BuiltinFace::Times);
        table.register_builtin("Courier", BuiltinFace::Courier);
        table
    }

    pub fn register_builtin(&mut self, name: &str, face: BuiltinFace) -> FaceId {
        self.insert(FontFace::builtin(name, face))
    }

    /// Register a TTF/OTF font from bytes.
    pub fn register(&mut self, name: &str, bytes: Vec<u8>) -> Result<FaceId, ComposeError> {
        let (units_per_em, ascender, descender) = {
            let face = ttf_parser::Face::parse(&bytes, 0).map_err(|e| ComposeError::FontParse {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            (
                face.units_per_em() as f32,
                face.ascender() as f32,
                face.descender() as f32,
            )
        };

        Ok(self.insert(FontFace {
            name: name.to_string(),
            source: FaceSource::Embedded(bytes),
            units_per_em,
            ascender,
            descender,
        }))
    }

    /// Register a font read from a byte stream.
    pub fn register_from_reader<R: Read>(
        &mut self,
        name: &str,
        mut reader: R,
    ) -> Result<FaceId, ComposeError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| ComposeError::FontLoad {
                name: name.to_string(),
                source,
            })?;
        self.register(name, bytes)
    }

    fn insert(&mut self, face: FontFace) -> FaceId {
        if let Some(&idx) = self.by_name.get(&face.name) {
            log::debug!("replacing font '{}'", face.name);
            self.faces[idx] = face;
            return FaceId(idx);
        }
        let idx = self.faces.len();
        log::debug!("registered font '{}' (embedded: {})", face.name, face.is_embedded());
        self.by_name.insert(face.name.clone(), idx);
        self.faces.push(face);
        FaceId(idx)
    }

    /// Look up a face id by name.
    pub fn resolve(&self, name: &str) -> Result<FaceId, ComposeError> {
        self.by_name
            .get(name)
            .map(|&idx| FaceId(idx))
            .ok_or_else(|| ComposeError::UnresolvedFont {
                name: name.to_string(),
            })
    }

    pub fn face(&self, id: FaceId) -> &FontFace {
        &self.faces[id.0]
    }

    pub fn by_name(&self, name: &str) -> Option<&FontFace> {
        self.by_name.get(name).map(|&idx| &self.faces[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Measure the width of a string at a given font size (in pt).
    ///
    /// Embedded faces sum glyph advances. Builtin faces use an average
    /// character width heuristic: 0.5 × size (0.55 bold), 0.6 × size for Courier.
    pub fn measure_text_width(&self, id: FaceId, text: &str, font_size: f32, bold: bool) -> f32 {
        let data = self.face(id);
        let chars = text.chars().count() as f32;

        match &data.source {
            FaceSource::Builtin(BuiltinFace::Courier) => chars * font_size * 0.6,
            FaceSource::Builtin(_) => {
                let avg = if bold { 0.55 } else { 0.5 };
                chars * font_size * avg
            }
            FaceSource::Embedded(bytes) => match ttf_parser::Face::parse(bytes, 0) {
                Ok(face) => {
                    let scale = font_size / data.units_per_em;
                    text.chars()
                        .map(|ch| match face.glyph_index(ch) {
                            Some(gid) => face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale,
                            // Fallback for missing glyph
                            None => font_size * 0.5,
                        })
                        .sum()
                }
                Err(_) => chars * font_size * 0.5,
            },
        }
    }
}
