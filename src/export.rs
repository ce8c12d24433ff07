//! Transcript export
//!
//! Snapshots the display surface, never the conversation history, so what
//! gets exported is exactly what the reader saw.

mod font;
mod layout;
mod metrics;
mod pdf;

pub use font::BodyFont;
#[cfg(test)]
pub(crate) use font::test_fonts;

use crate::render::plain_text;
use crate::transcript::RenderedMessage;
use chrono::{DateTime, Local};
use layout::{layout, ExportEntry, Heading, PageGeometry};
use metrics::Helvetica;
use thiserror::Error;

/// Download name for exported transcripts
pub const EXPORT_FILE_NAME: &str = "dsa-chat.pdf";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),
    #[error("Unusable body font {0}")]
    Font(String),
}

/// Labelled plain-text entries in display order, placeholders skipped
fn entries(messages: &[RenderedMessage]) -> Vec<ExportEntry> {
    messages
        .iter()
        .filter(|m| !m.typing)
        .map(|m| ExportEntry {
            label: m.author.label(),
            text: plain_text(&m.html),
        })
        .collect()
}

fn heading(now: DateTime<Local>) -> Heading {
    Heading {
        title: "DSA Dost chat history".to_string(),
        subtitle: format!("Exported on: {}", now.format("%Y-%m-%d %H:%M:%S")),
    }
}

/// Lay out and render the transcript as a PDF
///
/// Body text uses `body_font` when given. Without one it falls back to
/// built-in Helvetica, which can only draw Latin-1.
pub fn export_pdf(
    messages: &[RenderedMessage],
    now: DateTime<Local>,
    body_font: Option<&BodyFont>,
) -> Result<Vec<u8>, ExportError> {
    let geometry = PageGeometry::a4();
    let entries = entries(messages);
    let heading = heading(now);
    let layout = match body_font {
        Some(font) => layout(Some(&heading), &entries, &geometry, &font.metrics()?),
        None => layout(Some(&heading), &entries, &geometry, &Helvetica),
    };
    let title = format!("DSA Dost chat export {}", now.format("%Y-%m-%d %H:%M"));

    tracing::info!(
        messages = entries.len(),
        pages = layout.pages,
        font = body_font.map_or("Helvetica", BodyFont::name),
        "Exporting transcript"
    );

    pdf::render(&layout, &geometry, &title, body_font)
}
