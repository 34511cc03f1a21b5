//! Render reconciler.
//!
//! [`classify`] is a pure function of picker state; [`apply`] writes its
//! result into the pooled nodes. Every class in the cell contract is written
//! on every pass, set or cleared, so nothing stale survives a month change and
//! a second pass over unchanged state touches nothing.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::date;
use crate::dom::{Document, class};
use crate::view::{DAY_CELLS, LEADING_CELLS, TRAILING_CELLS, ViewHandles};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CellClasses {
    pub empty: bool,
    pub outside_month: bool,
    pub disabled: bool,
    pub selected: bool,
    pub range_start: bool,
    pub range_end: bool,
    pub range_middle: bool,
    pub today: bool,
    pub weekend: bool,
    pub event: bool,
}

impl CellClasses {
    pub fn flags(&self) -> [(&'static str, bool); 10] {
        [
            (class::EMPTY, self.empty),
            (class::OUTSIDE_MONTH, self.outside_month),
            (class::DISABLED, self.disabled),
            (class::SELECTED, self.selected),
            (class::RANGE_START, self.range_start),
            (class::RANGE_END, self.range_end),
            (class::RANGE_MIDDLE, self.range_middle),
            (class::TODAY, self.today),
            (class::WEEKEND, self.weekend),
            (class::EVENT, self.event),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub date: Option<NaiveDate>,
    pub text: String,
    pub hidden: bool,
    pub classes: CellClasses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthLayout {
    pub month_label: String,
    pub year_label: String,
    pub cells: Vec<CellView>,
}

impl MonthLayout {
    pub fn day(&self, n: u32) -> Option<&CellView> {
        let n = usize::try_from(n).ok()?;
        if n == 0 || n > DAY_CELLS {
            return None;
        }
        self.cells.get(LEADING_CELLS + n - 1)
    }
}

/// Everything the classifier looks at.
pub struct RenderInput<'a> {
    pub current: NaiveDate,
    pub selected: Option<NaiveDate>,
    /// Both endpoints of a range pair, present only when both sides have a
    /// selection.
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub today: NaiveDate,
    pub start_day: u8,
    pub show_all_dates: bool,
    pub events: &'a BTreeSet<NaiveDate>,
    pub month_label: &'a str,
    pub disabled: &'a dyn Fn(NaiveDate) -> bool,
}

pub fn classify(input: &RenderInput<'_>) -> MonthLayout {
    let anchor = date::month_anchor(input.current);
    let month_days = date::days_in_month(anchor.year(), anchor.month()) as usize;
    let offset = date::leading_offset(anchor, input.start_day) as usize;
    let trailing = (7 - (offset + month_days) % 7) % 7;

    let mut cells = Vec::with_capacity(LEADING_CELLS + DAY_CELLS + TRAILING_CELLS);

    // Leading slots are right-aligned against day 1.
    for slot in 0..LEADING_CELLS {
        let back = LEADING_CELLS - slot;
        if back > offset {
            cells.push(CellView {
                hidden: true,
                ..CellView::default()
            });
            continue;
        }
        match date::add_days(anchor, -(back as i64)) {
            Some(day) => cells.push(outside_cell(day, input)),
            None => cells.push(CellView {
                hidden: true,
                ..CellView::default()
            }),
        }
    }

    for n in 1..=DAY_CELLS {
        let day = (n <= month_days)
            .then(|| date::add_days(anchor, n as i64 - 1))
            .flatten();
        match day {
            Some(day) => cells.push(day_cell(day, input)),
            None => cells.push(CellView {
                hidden: true,
                ..CellView::default()
            }),
        }
    }

    let last = date::last_day_of_month(anchor.year(), anchor.month());
    for slot in 0..TRAILING_CELLS {
        let day = (slot < trailing && input.show_all_dates)
            .then(|| last.and_then(|last| date::add_days(last, slot as i64 + 1)))
            .flatten();
        match day {
            Some(day) => cells.push(outside_cell(day, input)),
            None => cells.push(CellView {
                hidden: true,
                ..CellView::default()
            }),
        }
    }

    MonthLayout {
        month_label: input.month_label.to_string(),
        year_label: anchor.year().to_string(),
        cells,
    }
}

fn day_cell(day: NaiveDate, input: &RenderInput<'_>) -> CellView {
    let disabled = (input.disabled)(day);
    let mut classes = CellClasses {
        disabled,
        selected: input.selected == Some(day) && !disabled,
        today: day == input.today,
        weekend: date::is_weekend(day),
        event: input.events.contains(&day),
        ..CellClasses::default()
    };

    // A one-day range gets no start/end halo.
    if let Some((start, end)) = input.range
        && start != end
    {
        classes.range_start = day == start;
        classes.range_end = day == end;
        classes.range_middle = start < day && day < end;
    }

    CellView {
        date: Some(day),
        text: day.day().to_string(),
        hidden: false,
        classes,
    }
}

fn outside_cell(day: NaiveDate, input: &RenderInput<'_>) -> CellView {
    if !input.show_all_dates {
        return CellView {
            classes: CellClasses {
                empty: true,
                ..CellClasses::default()
            },
            ..CellView::default()
        };
    }
    CellView {
        date: Some(day),
        text: day.day().to_string(),
        hidden: false,
        classes: CellClasses {
            outside_month: true,
            today: day == input.today,
            weekend: date::is_weekend(day),
            event: input.events.contains(&day),
            ..CellClasses::default()
        },
    }
}

/// Writes `layout` into the pooled nodes. Returns whether any cell changed.
pub fn apply(doc: &mut Document, view: &ViewHandles, layout: &MonthLayout) -> bool {
    doc.set_text(view.month_label, &layout.month_label);
    doc.set_text(view.year_label, &layout.year_label);

    let before = doc.revision();
    for (node, cell) in view.cells.iter().zip(&layout.cells) {
        doc.set_class(*node, class::HIDDEN, cell.hidden);
        doc.set_class(*node, class::DAY, cell.date.is_some() && !cell.classes.outside_month);
        for (name, on) in cell.classes.flags() {
            doc.set_class(*node, name, on);
        }
        doc.set_text(*node, &cell.text);
        match cell.date {
            Some(day) => {
                doc.set_attr(*node, "data-date", &day.format(date::ISO_DATE_FORMAT).to_string());
            }
            None => {
                doc.remove_attr(*node, "data-date");
            }
        }
    }
    doc.revision() != before
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chrome<'a> {
    pub calendar_showing: bool,
    pub overlay_showing: bool,
    pub overlay_year: &'a str,
    pub current_month: u32,
}

/// Container visibility and the year/month overlay.
pub fn apply_chrome(doc: &mut Document, view: &ViewHandles, chrome: Chrome<'_>) {
    doc.set_class(view.container, class::HIDDEN, !chrome.calendar_showing);
    doc.set_class(view.container, class::OVERLAY_OPEN, chrome.overlay_showing);
    doc.set_class(view.overlay, class::OVERLAY_HIDDEN, !chrome.overlay_showing);
    doc.set_value(view.overlay_input, chrome.overlay_year);
    doc.set_class(view.overlay_submit, class::DISABLED, chrome.overlay_year.len() != 4);
    for (idx, node) in view.overlay_months.iter().enumerate() {
        doc.set_class(*node, class::SELECTED, idx as u32 + 1 == chrome.current_month);
    }
}
