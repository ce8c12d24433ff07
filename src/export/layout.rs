//! Flow layout of transcript entries onto fixed-size pages
//!
//! Each entry is a label line followed by its wrapped text. The page-bottom
//! check runs before every line is placed, so a long message breaks across
//! pages instead of running off the bottom. A label only goes where its
//! first text line also fits. An optional heading (title plus export
//! time) opens the first page.

use super::metrics::{wrap_text, FontMetrics};

/// Page geometry in millimetres (y grows downward from the top edge)
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub left_margin: f32,
    pub top_margin: f32,
    /// Lines may start at or above this offset
    pub bottom_limit: f32,
    pub content_width: f32,
    /// Label baseline to first text line
    pub label_gap: f32,
    pub line_height: f32,
    /// Last text line to the next label
    pub message_gap: f32,
    pub font_size: f32,
    pub heading_font_size: f32,
}

impl PageGeometry {
    pub fn a4() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            left_margin: 10.0,
            top_margin: 20.0,
            bottom_limit: 270.0,
            content_width: 180.0,
            label_gap: 7.0,
            line_height: 7.0,
            message_gap: 10.0,
            font_size: 12.0,
            heading_font_size: 16.0,
        }
    }
}

/// One message to lay out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub label: &'static str,
    pub text: String,
}

/// Title block above the first message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub title: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Title,
    Label,
    Body,
}

/// A positioned run of text
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Zero-based page index
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub style: TextStyle,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub pages: usize,
    pub placements: Vec<Placement>,
}

/// Export-only cursor, fresh for every layout run
struct PageCursor {
    page: usize,
    y: f32,
}

impl PageCursor {
    fn break_page(&mut self, geometry: &PageGeometry) {
        self.page += 1;
        self.y = geometry.top_margin;
    }
}

pub fn layout(
    heading: Option<&Heading>,
    entries: &[ExportEntry],
    geometry: &PageGeometry,
    metrics: &dyn FontMetrics,
) -> Layout {
    let mut cursor = PageCursor {
        page: 0,
        y: geometry.top_margin,
    };
    let mut placements = Vec::new();

    if let Some(heading) = heading {
        placements.push(Placement {
            page: 0,
            x: geometry.left_margin,
            y: cursor.y,
            style: TextStyle::Title,
            text: heading.title.clone(),
        });
        cursor.y += geometry.label_gap;
        placements.push(Placement {
            page: 0,
            x: geometry.left_margin,
            y: cursor.y,
            style: TextStyle::Body,
            text: heading.subtitle.clone(),
        });
        cursor.y += geometry.message_gap;
    }

    for entry in entries {
        if cursor.y + geometry.label_gap > geometry.bottom_limit {
            cursor.break_page(geometry);
        }
        placements.push(Placement {
            page: cursor.page,
            x: geometry.left_margin,
            y: cursor.y,
            style: TextStyle::Label,
            text: entry.label.to_string(),
        });
        cursor.y += geometry.label_gap;

        let mut last_line_y = cursor.y;
        for line in wrap_text(&entry.text, geometry.content_width, geometry.font_size, metrics) {
            if cursor.y > geometry.bottom_limit {
                cursor.break_page(geometry);
            }
            placements.push(Placement {
                page: cursor.page,
                x: geometry.left_margin,
                y: cursor.y,
                style: TextStyle::Body,
                text: line,
            });
            last_line_y = cursor.y;
            cursor.y += geometry.line_height;
        }

        cursor.y = last_line_y + geometry.message_gap;
    }

    Layout {
        pages: cursor.page + 1,
        placements,
    }
}
