use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::date;
use crate::dom::NodeId;
use crate::options::{PairId, ResolvedOptions, View};
use crate::view::ViewHandles;

/// Identifies a picker inside its registry. Keys are never reused, so a key
/// that no longer resolves means the picker was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PickerKey(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairLink {
    pub id: PairId,
    pub is_first: bool,
}

/// Authoritative mutable state of one calendar surface.
pub(crate) struct PickerState {
    pub opts: ResolvedOptions,
    pub current_date: NaiveDate,
    pub selected_date: Option<NaiveDate>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub disabled_dates: BTreeSet<NaiveDate>,
    pub no_weekends: bool,
    pub always_show: bool,
    pub is_calendar_showing: bool,
    pub is_overlay_showing: bool,
    pub pair: Option<PairLink>,
    /// Element the picker was attached to (the input, or the container host).
    pub host: NodeId,
    pub input: Option<NodeId>,
    pub view: ViewHandles,
    /// Text typed into the overlay year field.
    pub overlay_year: String,
}

impl PickerState {
    pub fn new(
        opts: ResolvedOptions,
        host: NodeId,
        input: Option<NodeId>,
        view: ViewHandles,
    ) -> Self {
        let always_show = opts.always_show;
        Self {
            current_date: opts.start_date,
            selected_date: None,
            min_date: opts.min_date,
            max_date: opts.max_date,
            disabled_dates: opts.disabled_dates.clone(),
            no_weekends: opts.no_weekends,
            always_show,
            is_calendar_showing: always_show,
            is_overlay_showing: always_show
                && opts.default_view == View::Overlay
                && !opts.disable_year_overlay,
            pair: None,
            host,
            input,
            view,
            overlay_year: String::new(),
            opts,
        }
    }

    /// Rules that belong to this instance alone: the explicit list, weekends
    /// and the custom disabler. Bounds are checked by the registry because a
    /// range sibling can tighten them.
    pub fn is_disabled_locally(&self, day: NaiveDate) -> bool {
        self.disabled_dates.contains(&day)
            || (self.no_weekends && date::is_weekend(day))
            || self.opts.disabler.as_ref().is_some_and(|f| f(day))
    }

    pub fn month_label(&self) -> &str {
        let idx = self.current_date.month0() as usize;
        self.opts.months[idx].as_str()
    }

    pub fn formatted_selection(&self) -> String {
        self.selected_date
            .map(|d| self.opts.format(d))
            .unwrap_or_default()
    }
}

pub fn within(day: NaiveDate, min: Option<NaiveDate>, max: Option<NaiveDate>) -> bool {
    min.is_none_or(|m| day >= m) && max.is_none_or(|m| day <= m)
}

/// Read-only copy of a picker's state, for snapshots and backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub current_date: NaiveDate,
    pub selected_date: Option<NaiveDate>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub disabled_dates: Vec<NaiveDate>,
    pub no_weekends: bool,
    pub always_show: bool,
    pub is_calendar_showing: bool,
    pub is_overlay_showing: bool,
    pub pair: Option<PairLink>,
    pub calendar_container: NodeId,
}

impl From<&PickerState> for Snapshot {
    fn from(state: &PickerState) -> Self {
        Self {
            current_date: state.current_date,
            selected_date: state.selected_date,
            min_date: state.min_date,
            max_date: state.max_date,
            disabled_dates: state.disabled_dates.iter().copied().collect(),
            no_weekends: state.no_weekends,
            always_show: state.always_show,
            is_calendar_showing: state.is_calendar_showing,
            is_overlay_showing: state.is_overlay_showing,
            pair: state.pair,
            calendar_container: state.view.container,
        }
    }
}
