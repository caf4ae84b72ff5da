//! Summary image: a fixed 600×400 PNG listing the store size and the top countries by estimated GDP.
//!
//! The line layout is produced by [`summary_lines`]; [`PngSummaryRenderer`] draws it with
//! Plotters' bitmap backend and encodes the buffer as PNG.

pub mod text;
pub mod util;

use crate::models::TopEntry;
use chrono::{DateTime, Utc};
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use plotters::prelude::*;
use plotters::style::FontStyle;
use plotters_bitmap::BitMapBackend;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use text::fit_entry_line;
use util::{format_gdp, format_timestamp};

pub const WIDTH: u32 = 600;
pub const HEIGHT: u32 = 400;

const TITLE_PX: u32 = 18;
const BODY_PX: u32 = 14;
const ENTRY_X: i32 = 40;
const MARGIN_X: i32 = 20;

/// Fonts tried, in order, when no explicit font path is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no usable TrueType font found (configure one with COUNTRY_RATES_FONT)")]
    FontUnavailable,

    #[error("invalid font file {0}")]
    InvalidFont(PathBuf),

    #[error("drawing failed: {0}")]
    Draw(String),

    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Turns the refresh snapshot into image bytes.
pub trait SummaryRenderer: Send + Sync {
    fn render(
        &self,
        total: usize,
        top: &[TopEntry],
        rendered_at: DateTime<Utc>,
    ) -> Result<Vec<u8>, RenderError>;
}

/// Text lines of the summary, top to bottom.
pub fn summary_lines(total: usize, top: &[TopEntry], rendered_at: DateTime<Utc>) -> Vec<String> {
    let mut lines = Vec::with_capacity(top.len() + 4);
    lines.push("Country Summary".to_string());
    lines.push(format!("Total Countries: {total}"));
    lines.push("Top 5 Countries by Estimated GDP:".to_string());
    let max_px = (WIDTH as i32 - ENTRY_X - MARGIN_X) as u32;
    for entry in top {
        lines.push(fit_entry_line(
            &entry.name,
            &format_gdp(entry.estimated_gdp),
            BODY_PX,
            max_px,
        ));
    }
    lines.push(format!("Last Refreshed: {}", format_timestamp(rendered_at)));
    lines
}

/// Locate a font: the explicit path if given, otherwise the first existing system font.
pub fn discover_font(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(p) => p.is_file().then(|| p.to_path_buf()),
        None => SYSTEM_FONTS
            .iter()
            .map(|p| PathBuf::from(*p))
            .find(|p| p.is_file()),
    }
}

/// Font registered with Plotters, if any. Registration happens at most once per process.
static REGISTERED_FONT: Mutex<Option<PathBuf>> = Mutex::new(None);

/// The font file Plotters currently draws the summary with.
pub fn registered_font() -> Option<PathBuf> {
    REGISTERED_FONT
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Register the summary font with Plotters once per process.
///
/// Plotters keeps one font table per process, so the first successfully registered font
/// wins; a later renderer configured with another path draws with the first font.
fn ensure_font_registered(explicit: Option<&Path>) -> Result<(), RenderError> {
    let mut registered = REGISTERED_FONT.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(current) = registered.as_deref() {
        if let Some(other) = explicit.filter(|p| *p != current) {
            log::warn!(
                "font {} ignored; summary already uses {}",
                other.display(),
                current.display()
            );
        }
        return Ok(());
    }
    let path = discover_font(explicit).ok_or(RenderError::FontUnavailable)?;
    let bytes = std::fs::read(&path).map_err(|_| RenderError::InvalidFont(path.clone()))?;
    // Plotters keeps a `'static` reference to registered font data.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    plotters::style::register_font("sans-serif", FontStyle::Normal, bytes)
        .map_err(|_| RenderError::InvalidFont(path.clone()))?;
    log::debug!("registered summary font {}", path.display());
    *registered = Some(path);
    Ok(())
}

/// Draws the summary with Plotters and encodes it as PNG.
#[derive(Debug, Clone, Default)]
pub struct PngSummaryRenderer {
    font_path: Option<PathBuf>,
}

impl PngSummaryRenderer {
    pub fn new(font_path: Option<PathBuf>) -> Self {
        Self { font_path }
    }

    /// Whether a font can be found for rendering.
    pub fn has_font(&self) -> bool {
        registered_font().is_some() || discover_font(self.font_path.as_deref()).is_some()
    }
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

impl SummaryRenderer for PngSummaryRenderer {
    fn render(
        &self,
        total: usize,
        top: &[TopEntry],
        rendered_at: DateTime<Utc>,
    ) -> Result<Vec<u8>, RenderError> {
        ensure_font_registered(self.font_path.as_deref())?;
        let lines = summary_lines(total, top, rendered_at);

        let mut buf = vec![255u8; (WIDTH * HEIGHT * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (WIDTH, HEIGHT)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let title = ("sans-serif", TITLE_PX).into_font().color(&BLACK);
            let body = ("sans-serif", BODY_PX).into_font().color(&BLACK);

            // Title, total, header, entries, then the timestamp after a gap.
            let mut y = 22;
            let mut iter = lines.iter();
            if let Some(line) = iter.next() {
                root.draw_text(line, &title, (MARGIN_X, y)).map_err(draw_err)?;
                y += 40;
            }
            if let Some(line) = iter.next() {
                root.draw_text(line, &body, (MARGIN_X, y)).map_err(draw_err)?;
                y += 30;
            }
            if let Some(line) = iter.next() {
                root.draw_text(line, &body, (MARGIN_X, y)).map_err(draw_err)?;
                y += 25;
            }
            for line in iter.by_ref().take(top.len()) {
                root.draw_text(line, &body, (ENTRY_X, y)).map_err(draw_err)?;
                y += 20;
            }
            if let Some(line) = iter.next() {
                y += 30;
                root.draw_text(line, &body, (MARGIN_X, y)).map_err(draw_err)?;
            }
            root.present().map_err(draw_err)?;
        }

        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(&buf, WIDTH, HEIGHT, image::ColorType::Rgb8)?;
        Ok(png)
    }
}
