//! State transitions. Each one mutates, re-renders, then queues its
//! notifications; delivery happens after the registry borrow is released.

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::date;
use crate::error::{Error, Result};
use crate::events::{Cause, Pending, Trigger};
use crate::options::View;
use crate::registry::Inner;
use crate::state::{PickerKey, within};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bound {
    Min,
    Max,
}

impl Inner {
    fn notify_select(
        &mut self,
        key: PickerKey,
        cause: Cause,
        prev: Option<NaiveDate>,
        new: Option<NaiveDate>,
    ) {
        if let Some(cb) = self
            .pickers
            .get(&key)
            .and_then(|s| s.opts.callbacks.on_select.clone())
        {
            self.pending.push(Pending::Select {
                cb,
                key,
                cause,
                prev,
                new,
            });
        }
    }

    fn notify_month_change(
        &mut self,
        key: PickerKey,
        cause: Cause,
        prev: NaiveDate,
        new: NaiveDate,
    ) {
        if let Some(cb) = self
            .pickers
            .get(&key)
            .and_then(|s| s.opts.callbacks.on_month_change.clone())
        {
            self.pending.push(Pending::MonthChange {
                cb,
                key,
                cause,
                prev,
                new,
            });
        }
    }

    fn notify_visibility(&mut self, key: PickerKey, cause: Cause, shown: bool) {
        let cb = self.pickers.get(&key).and_then(|s| {
            if shown {
                s.opts.callbacks.on_show.clone()
            } else {
                s.opts.callbacks.on_hide.clone()
            }
        });
        if let Some(cb) = cb {
            self.pending.push(Pending::Visibility { cb, key, cause });
        }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn navigate(&mut self, key: PickerKey, to: NaiveDate, cause: Cause) {
        let Some(state) = self.pickers.get_mut(&key) else {
            return;
        };
        let prev = state.current_date;
        let next = date::month_anchor(to);
        state.current_date = next;
        self.render(key);

        if date::same_month(prev, next) {
            debug!(%next, "navigate stayed in the same month");
        } else {
            self.notify_month_change(key, cause, prev, next);
        }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn select_date(
        &mut self,
        key: PickerKey,
        day: Option<NaiveDate>,
        change_calendar: bool,
        cause: Cause,
    ) {
        if let Some(d) = day
            && self.is_disabled(key, d)
        {
            debug!(day = %d, "refusing to select a disabled date");
            return;
        }
        let Some(state) = self.pickers.get_mut(&key) else {
            return;
        };

        let prev = state.selected_date;
        state.selected_date = day;

        let mut month_change = None;
        if change_calendar && let Some(d) = day {
            let before = state.current_date;
            let next = date::month_anchor(d);
            state.current_date = next;
            if !date::same_month(before, next) {
                month_change = Some((before, next));
            }
        }

        if let Some(sibling) = self.sibling_of(key) {
            self.render(sibling);
        }
        self.render(key);

        if let Some((before, next)) = month_change {
            self.notify_month_change(key, cause, before, next);
        }
        self.notify_select(key, cause, prev, day);
    }

    /// Applies a min or max bound to the picker and its sibling. Rejected
    /// before any mutation when it would invert the bounds.
    #[tracing::instrument(skip(self))]
    pub(crate) fn set_bound(
        &mut self,
        key: PickerKey,
        bound: Bound,
        value: Option<NaiveDate>,
        cause: Cause,
    ) -> Result<()> {
        let state = self.pickers.get(&key).ok_or(Error::Removed)?;
        let (min, max) = match bound {
            Bound::Min => (value, state.max_date),
            Bound::Max => (state.min_date, value),
        };
        if let (Some(min), Some(max)) = (min, max)
            && min > max
        {
            return Err(Error::BoundOrder { min, max });
        }

        let targets: Vec<PickerKey> = std::iter::once(key).chain(self.sibling_of(key)).collect();
        let mut cleared = Vec::new();
        for target in &targets {
            let Some(state) = self.pickers.get_mut(target) else {
                continue;
            };
            state.min_date = min;
            state.max_date = max;
            if let Some(selected) = state.selected_date
                && !within(selected, min, max)
            {
                debug!(?target, %selected, "bound change cleared the selection");
                state.selected_date = None;
                cleared.push((*target, selected));
            }
        }

        for target in targets.iter().rev() {
            self.render(*target);
        }
        for (target, prev) in cleared {
            self.notify_select(target, cause, Some(prev), None);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn show(&mut self, key: PickerKey, cause: Cause) {
        let Some(state) = self.pickers.get_mut(&key) else {
            return;
        };
        if state.is_calendar_showing {
            return;
        }
        state.is_calendar_showing = true;
        state.is_overlay_showing =
            state.opts.default_view == View::Overlay && !state.opts.disable_year_overlay;
        state.overlay_year.clear();
        self.render(key);
        self.notify_visibility(key, cause, true);
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn hide(&mut self, key: PickerKey, cause: Cause) {
        let Some(state) = self.pickers.get_mut(&key) else {
            return;
        };
        if state.always_show || !state.is_calendar_showing {
            return;
        }
        state.is_calendar_showing = false;
        state.is_overlay_showing = false;
        state.overlay_year.clear();
        self.render(key);
        self.notify_visibility(key, cause, false);
    }

    pub(crate) fn toggle_calendar(&mut self, key: PickerKey, cause: Cause) {
        let showing = self
            .pickers
            .get(&key)
            .is_some_and(|s| s.is_calendar_showing);
        if showing {
            self.hide(key, cause);
        } else {
            self.show(key, cause);
        }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn toggle_overlay(&mut self, key: PickerKey) {
        let Some(state) = self.pickers.get_mut(&key) else {
            return;
        };
        if !state.is_calendar_showing {
            debug!("overlay toggle ignored while the calendar is hidden");
            return;
        }
        if !state.is_overlay_showing && state.opts.disable_year_overlay {
            debug!("year overlay is disabled");
            return;
        }
        state.is_overlay_showing = !state.is_overlay_showing;
        state.overlay_year.clear();
        self.render(key);
    }

    /// Keeps at most four digits of what was typed into the overlay.
    pub(crate) fn set_overlay_year(&mut self, key: PickerKey, raw: &str) {
        let Some(state) = self.pickers.get_mut(&key) else {
            return;
        };
        state.overlay_year = raw.chars().filter(char::is_ascii_digit).take(4).collect();
        self.render(key);
    }

    fn typed_year(&self, key: PickerKey) -> Option<i32> {
        let state = self.pickers.get(&key)?;
        if state.overlay_year.len() != 4 {
            return None;
        }
        state.overlay_year.parse().ok()
    }

    fn close_overlay(&mut self, key: PickerKey) {
        if let Some(state) = self.pickers.get_mut(&key) {
            state.is_overlay_showing = false;
            state.overlay_year.clear();
        }
    }

    pub(crate) fn submit_overlay(&mut self, key: PickerKey) {
        let Some(year) = self.typed_year(key) else {
            debug!("overlay submit needs a four digit year");
            return;
        };
        let Some(target) = self
            .pickers
            .get(&key)
            .and_then(|s| date::first_day_of_month(year, s.current_date.month()))
        else {
            return;
        };
        self.close_overlay(key);
        self.navigate(key, target, Cause::user(Trigger::OverlaySubmit));
    }

    pub(crate) fn pick_overlay_month(&mut self, key: PickerKey, month: u32) {
        let Some(current_year) = self.pickers.get(&key).map(|s| s.current_date.year()) else {
            return;
        };
        let year = self.typed_year(key).unwrap_or(current_year);
        let Some(target) = date::first_day_of_month(year, month) else {
            return;
        };
        self.close_overlay(key);
        self.navigate(key, target, Cause::user(Trigger::OverlayMonthClick));
    }
}
