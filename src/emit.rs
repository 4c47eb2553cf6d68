//! Emitters turn a finished [`LayoutDocument`] into bytes on a sink.

use std::io::Write;

use crate::error::EmitError;
use crate::page_layout::LayoutDocument;

/// Writes a paginated document to an output sink.
pub trait DocumentEmitter {
    fn emit(&self, doc: &LayoutDocument, sink: &mut dyn Write) -> Result<EmitSummary, EmitError>;
}

/// What an emitter wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub pages: usize,
    /// Distinct font resources.
    pub fonts: usize,
    /// Distinct image resources.
    pub images: usize,
    pub bytes: usize,
}

/// Writes the page description as pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEmitter;

impl DocumentEmitter for JsonEmitter {
    fn emit(&self, doc: &LayoutDocument, sink: &mut dyn Write) -> Result<EmitSummary, EmitError> {
        let json = doc.to_json().map_err(EmitError::Serialize)?;
        sink.write_all(json.as_bytes()).map_err(EmitError::SinkWrite)?;
        sink.flush().map_err(EmitError::SinkWrite)?;

        let mut fonts = Vec::new();
        let mut images = Vec::new();
        for page in &doc.pages {
            for (_, region) in page.regions() {
                region.visit(&mut |b| {
                    if let Some(text) = &b.text {
                        for fragment in text.lines.iter().flat_map(|l| &l.fragments) {
                            if !fonts.contains(&fragment.font.as_str()) {
                                fonts.push(fragment.font.as_str());
                            }
                        }
                    }
                    if let Some(img) = &b.image {
                        if !images.contains(&img.src.as_str()) {
                            images.push(img.src.as_str());
                        }
                    }
                });
            }
        }

        Ok(EmitSummary {
            pages: doc.pages.len(),
            fonts: fonts.len(),
            images: images.len(),
            bytes: json.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_emission_reads_back() {
        let doc = LayoutDocument::new("Round");
        let mut out = Vec::new();
        let summary = JsonEmitter.emit(&doc, &mut out).unwrap();
        assert_eq!(summary.pages, 0);
        assert_eq!(summary.bytes, out.len());
        let back = LayoutDocument::from_json(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn sink_failure_keeps_io_source() {
        let err = JsonEmitter
            .emit(&LayoutDocument::new("x"), &mut BrokenSink)
            .unwrap_err();
        let EmitError::SinkWrite(source) = err else {
            panic!("expected SinkWrite, got {err:?}");
        };
        assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
    }
}
