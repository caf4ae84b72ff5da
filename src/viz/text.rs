//! Text measurement and truncation for fixed-width summary lines.

/// Heuristic: estimate pixel width of text (Plotters has no built-in text measuring).
pub fn estimate_text_width_px(text: &str, font_px: u32) -> u32 {
    ((text.chars().count() as f32) * (font_px as f32) * 0.60).ceil() as u32
}

/// Truncate to fit `max_px`, ending with a single ellipsis when anything was cut.
pub fn truncate_to_width(text: &str, font_px: u32, max_px: u32) -> String {
    if estimate_text_width_px(text, font_px) <= max_px {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        out.push('…');
        let fits = estimate_text_width_px(&out, font_px) <= max_px;
        out.pop();
        if !fits {
            out.pop();
            break;
        }
    }
    out.push('…');
    out
}

/// Build `- <name> (<gdp>)`, shortening only the name when the line would overflow.
pub fn fit_entry_line(name: &str, gdp: &str, font_px: u32, max_px: u32) -> String {
    let full = format!("- {name} ({gdp})");
    if estimate_text_width_px(&full, font_px) <= max_px {
        return full;
    }
    let frame = estimate_text_width_px(&format!("-  ({gdp})"), font_px);
    let short = truncate_to_width(name, font_px, max_px.saturating_sub(frame));
    format!("- {short} ({gdp})")
}
