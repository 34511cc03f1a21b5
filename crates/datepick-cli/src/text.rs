//! Plain-text rendering of a picker's calendar nodes.

use std::collections::BTreeSet;

use datepick_core::Picker;
use datepick_core::dom::class;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const COLUMNS: usize = 7;
const CELL_WIDTH: usize = 4;

/// Fits `text` into `width` display columns, right-aligned.
fn fit(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    format!("{}{out}", " ".repeat(width - used))
}

fn center(text: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(text);
    if w >= width {
        return text.to_string();
    }
    let left = (width - w) / 2;
    format!("{}{text}", " ".repeat(left))
}

fn markers(classes: &BTreeSet<String>) -> (char, char) {
    let has = |c: &str| classes.contains(c);
    if has(class::SELECTED) || has(class::RANGE_START) || has(class::RANGE_END) {
        ('[', ']')
    } else if has(class::RANGE_MIDDLE) {
        ('=', '=')
    } else if has(class::TODAY) {
        ('(', ')')
    } else if has(class::EVENT) {
        (' ', '*')
    } else if has(class::DISABLED) {
        (' ', '-')
    } else {
        (' ', ' ')
    }
}

fn cell(text: &str, classes: &BTreeSet<String>) -> String {
    let (left, right) = markers(classes);
    format!("{left}{}{right}", fit(text, CELL_WIDTH - 2))
}

/// Title, status, weekday header and the visible grid rows.
pub fn render_calendar(picker: &Picker) -> datepick_core::Result<String> {
    let title = format!("{} {}", picker.month_label()?, picker.year_label()?);
    let mut lines = vec![center(&title, COLUMNS * CELL_WIDTH)];

    let visibility = if picker.is_calendar_showing()? {
        "shown"
    } else {
        "hidden"
    };
    let mut status = vec![visibility.to_string()];
    if picker.is_overlay_showing()? {
        status.push("overlay".to_string());
    }
    match picker.selected_date()? {
        Some(day) => status.push(format!("selected {day}")),
        None => status.push("selected -".to_string()),
    }
    if let Ok(range) = picker.get_range() {
        let side = |d: Option<chrono::NaiveDate>| d.map_or("-".to_string(), |d| d.to_string());
        status.push(format!("range {}..{}", side(range.start), side(range.end)));
    }
    lines.push(status.join(", "));

    let header: String = picker
        .weekday_labels()?
        .iter()
        .map(|label| format!(" {} ", fit(label, CELL_WIDTH - 2)))
        .collect();
    lines.push(header.trim_end().to_string());

    let visible: Vec<String> = picker
        .cells()?
        .into_iter()
        .filter(|(_, classes)| !classes.contains(class::HIDDEN))
        .map(|(text, classes)| cell(&text, &classes))
        .collect();
    for row in visible.chunks(COLUMNS) {
        lines.push(row.concat().trim_end().to_string());
    }
    Ok(lines.join("\n"))
}
