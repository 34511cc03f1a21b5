//! Builds a picker's node tree once. Nothing here is ever rebuilt; the
//! reconciler only flips classes, text and values on these handles.

use std::collections::HashMap;

use crate::dom::{Document, NodeId, class};
use crate::options::ResolvedOptions;

pub const LEADING_CELLS: usize = 6;
pub const DAY_CELLS: usize = 31;
pub const TRAILING_CELLS: usize = 6;
pub const POOL_SIZE: usize = LEADING_CELLS + DAY_CELLS + TRAILING_CELLS;

/// What a clicked node means to the picker that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Cell(usize),
    PrevArrow,
    NextArrow,
    MonthLabel,
    YearLabel,
    OverlayInput,
    OverlaySubmit,
    OverlayClose,
    OverlayMonth(u32),
}

#[derive(Debug, Clone)]
pub struct ViewHandles {
    pub container: NodeId,
    pub controls: NodeId,
    pub prev: NodeId,
    pub next: NodeId,
    pub month_label: NodeId,
    pub year_label: NodeId,
    pub weekdays: Vec<NodeId>,
    pub grid: NodeId,
    pub cells: Vec<NodeId>,
    pub overlay: NodeId,
    pub overlay_input: NodeId,
    pub overlay_submit: NodeId,
    pub overlay_close: NodeId,
    pub overlay_months: Vec<NodeId>,
    roles: HashMap<NodeId, Role>,
}

impl ViewHandles {
    pub fn role(&self, node: NodeId) -> Option<Role> {
        self.roles.get(&node).copied()
    }

    pub fn day_cells(&self) -> &[NodeId] {
        &self.cells[LEADING_CELLS..LEADING_CELLS + DAY_CELLS]
    }
}

struct Builder<'a> {
    doc: &'a mut Document,
    roles: HashMap<NodeId, Role>,
}

impl Builder<'_> {
    fn node(&mut self, parent: NodeId, tag: &str, classes: &[&str]) -> NodeId {
        let node = self.doc.create_element(tag);
        for c in classes {
            self.doc.set_class(node, c, true);
        }
        self.doc.append_child(parent, node);
        node
    }

    fn with_role(&mut self, node: NodeId, role: Role) -> NodeId {
        self.roles.insert(node, role);
        node
    }
}

/// Creates the calendar under `parent`. The container is appended last so a
/// backend mirroring mutations sees one complete subtree arrive.
#[tracing::instrument(skip(doc, opts))]
pub fn build(doc: &mut Document, parent: NodeId, opts: &ResolvedOptions) -> ViewHandles {
    let container = doc.create_element("div");
    let mut b = Builder {
        doc,
        roles: HashMap::new(),
    };
    b.doc.set_class(container, class::CALENDAR, true);
    b.doc.set_class(container, opts.position.class(), true);

    let controls = b.node(container, "div", &["dp-controls"]);
    let prev = b.node(controls, "div", &["dp-arrow", "dp-prev"]);
    b.with_role(prev, Role::PrevArrow);
    let month_year = b.node(controls, "div", &["dp-month-year"]);
    let month_label = b.node(month_year, "span", &["dp-month"]);
    b.with_role(month_label, Role::MonthLabel);
    let year_label = b.node(month_year, "span", &["dp-year"]);
    b.with_role(year_label, Role::YearLabel);
    let next = b.node(controls, "div", &["dp-arrow", "dp-next"]);
    b.with_role(next, Role::NextArrow);

    let header = b.node(container, "div", &["dp-weekdays"]);
    let weekdays = opts
        .weekday_header()
        .iter()
        .map(|label| {
            let cell = b.node(header, "div", &["dp-weekday"]);
            b.doc.set_text(cell, label);
            cell
        })
        .collect();

    let grid = b.node(container, "div", &["dp-squares"]);
    let cells = (0..POOL_SIZE)
        .map(|idx| {
            let cell = b.node(grid, "div", &["dp-square", class::HIDDEN]);
            b.with_role(cell, Role::Cell(idx))
        })
        .collect();

    let overlay = b.node(container, "div", &["dp-overlay", class::OVERLAY_HIDDEN]);
    let overlay_row = b.node(overlay, "div", &["dp-overlay-row"]);
    let overlay_input = b.node(overlay_row, "input", &["dp-overlay-year"]);
    b.doc.set_attr(overlay_input, "placeholder", &opts.overlay_placeholder);
    b.doc.set_attr(overlay_input, "inputmode", "numeric");
    b.with_role(overlay_input, Role::OverlayInput);
    let overlay_close = b.node(overlay_row, "div", &["dp-overlay-close"]);
    b.doc.set_text(overlay_close, "\u{2715}");
    b.with_role(overlay_close, Role::OverlayClose);
    let months_grid = b.node(overlay, "div", &["dp-overlay-months"]);
    let overlay_months = opts
        .overlay_months
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let button = b.node(months_grid, "div", &["dp-overlay-month"]);
            b.doc.set_text(button, label);
            b.with_role(button, Role::OverlayMonth(idx as u32 + 1))
        })
        .collect();
    let overlay_submit = b.node(overlay, "div", &["dp-submit", class::DISABLED]);
    b.doc.set_text(overlay_submit, &opts.overlay_button);
    b.with_role(overlay_submit, Role::OverlaySubmit);

    b.doc.append_child(parent, container);
    let roles = b.roles;

    ViewHandles {
        container,
        controls,
        prev,
        next,
        month_label,
        year_label,
        weekdays,
        grid,
        cells,
        overlay,
        overlay_input,
        overlay_submit,
        overlay_close,
        overlay_months,
        roles,
    }
}
