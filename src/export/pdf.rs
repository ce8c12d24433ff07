//! PDF sink for a finished layout

use super::font::BodyFont;
use super::layout::{Layout, PageGeometry, TextStyle};
use super::metrics::pdf_safe;
use super::ExportError;
use printpdf::{BuiltinFont, Color, Mm, PdfDocument, PdfLayerReference, Rgb};
use std::borrow::Cow;

const LAYER_NAME: &str = "Transcript";

fn label_color() -> Color {
    Color::Rgb(Rgb::new(0.0, 102.0 / 255.0, 204.0 / 255.0, None))
}

fn body_color() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn pdf_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(e.to_string())
}

/// Text as it goes into the content stream
///
/// Only body text can use the embedded font; titles and labels are always
/// built-in Helvetica Bold.
fn drawable(style: TextStyle, text: &str, embedded_body: bool) -> Cow<'_, str> {
    if style == TextStyle::Body && embedded_body {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(pdf_safe(text))
    }
}

/// Draw every placement and serialize the document
pub fn render(
    layout: &Layout,
    geometry: &PageGeometry,
    title: &str,
    body_font: Option<&BodyFont>,
) -> Result<Vec<u8>, ExportError> {
    let width = Mm(geometry.page_width);
    let height = Mm(geometry.page_height);

    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, LAYER_NAME);
    let regular = match body_font {
        Some(font) => doc.add_external_font(font.bytes()).map_err(pdf_error)?,
        None => doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?,
    };
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    let mut layers: Vec<PdfLayerReference> = vec![doc.get_page(first_page).get_layer(first_layer)];
    for _ in 1..layout.pages {
        let (page, layer) = doc.add_page(width, height, LAYER_NAME);
        layers.push(doc.get_page(page).get_layer(layer));
    }

    for placement in &layout.placements {
        let layer = layers
            .get(placement.page)
            .ok_or_else(|| ExportError::Pdf(format!("placement on missing page {}", placement.page)))?;

        let (font, color, size) = match placement.style {
            TextStyle::Title => (&bold, body_color(), geometry.heading_font_size),
            TextStyle::Label => (&bold, label_color(), geometry.font_size),
            TextStyle::Body => (&regular, body_color(), geometry.font_size),
        };

        layer.set_fill_color(color);
        // PDF origin is bottom-left
        layer.use_text(
            drawable(placement.style, &placement.text, body_font.is_some()),
            size,
            Mm(placement.x),
            Mm(geometry.page_height - placement.y),
            font,
        );
    }

    drop(layers);
    doc.save_to_bytes().map_err(pdf_error)
}
