//! TrueType body font for exports
//!
//! Built-in Helvetica only covers Latin-1. A configured TrueType font is
//! embedded instead and measured with its own advances, so replies in
//! other scripts survive the export.

use super::metrics::FontMetrics;
use super::ExportError;
use std::path::Path;
use ttf_parser::{Face, GlyphId};

/// Validated font file, parsed again per export
#[derive(Debug, Clone)]
pub struct BodyFont {
    name: String,
    bytes: Vec<u8>,
}

impl BodyFont {
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ExportError::Font(format!("{}: {e}", path.display())))?;
        let name = path
            .file_stem()
            .map_or_else(|| "body font".to_string(), |s| s.to_string_lossy().into_owned());
        Self::from_bytes(name, bytes)
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ExportError> {
        let name = name.into();
        let face = Face::parse(&bytes, 0).map_err(|e| ExportError::Font(format!("{name}: {e}")))?;
        tracing::info!(
            font = %name,
            glyphs = face.number_of_glyphs(),
            "Loaded export body font"
        );
        Ok(Self { name, bytes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn metrics(&self) -> Result<TrueTypeMetrics<'_>, ExportError> {
        let face = Face::parse(&self.bytes, 0)
            .map_err(|e| ExportError::Font(format!("{}: {e}", self.name)))?;
        Ok(TrueTypeMetrics { face })
    }
}

pub struct TrueTypeMetrics<'a> {
    face: Face<'a>,
}

impl TrueTypeMetrics<'_> {
    /// Glyph id `c` is drawn with; missing glyphs fall back to `.notdef`
    pub fn glyph(&self, c: char) -> GlyphId {
        self.face.glyph_index(c).unwrap_or(GlyphId(0))
    }
}

impl FontMetrics for TrueTypeMetrics<'_> {
    fn advance(&self, c: char) -> f32 {
        let units = self.face.glyph_hor_advance(self.glyph(c)).unwrap_or(0);
        f32::from(units) * 1000.0 / f32::from(self.face.units_per_em())
    }
}
