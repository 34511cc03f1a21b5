use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use chrono::NaiveDate;

use crate::dom::NodeId;
use crate::error::{Error, Result};
use crate::events::{Cause, Trigger};
use crate::mutate::Bound;
use crate::options::PairId;
use crate::pair::DateRange;
use crate::registry::{Inner, Shared, flush};
use crate::state::{PairLink, PickerKey, PickerState, Snapshot};
use crate::view::DAY_CELLS;

/// Public handle to one picker.
///
/// Every getter and method runs through the same two guards (`read` and
/// `write`), which fail with [`Error::Removed`] once the picker is gone.
/// Getters return copies; nothing hands out references into picker state.
#[derive(Clone)]
pub struct Picker {
    shared: Shared,
    key: PickerKey,
}

impl std::fmt::Debug for Picker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Picker").field("key", &self.key).finish()
    }
}

impl PartialEq for Picker {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared) && self.key == other.key
    }
}

impl Eq for Picker {}

impl Picker {
    pub(crate) fn from_parts(shared: Shared, key: PickerKey) -> Self {
        Self { shared, key }
    }

    pub fn key(&self) -> PickerKey {
        self.key
    }

    fn read<T>(&self, f: impl FnOnce(&Inner, &PickerState) -> T) -> Result<T> {
        let inner = self.shared.borrow();
        let state = inner.pickers.get(&self.key).ok_or(Error::Removed)?;
        Ok(f(&*inner, state))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Inner, PickerKey) -> Result<T>) -> Result<T> {
        let result = {
            let mut inner = self.shared.borrow_mut();
            if !inner.pickers.contains_key(&self.key) {
                return Err(Error::Removed);
            }
            let mark = inner.pending.len();
            let result = f(&mut *inner, self.key);
            if result.is_err() {
                inner.pending.truncate(mark);
            }
            result
        };
        flush(&self.shared);
        result
    }

    pub fn is_removed(&self) -> bool {
        !self.shared.borrow().pickers.contains_key(&self.key)
    }

    pub fn calendar_container(&self) -> Result<NodeId> {
        self.read(|_, s| s.view.container)
    }

    pub fn input(&self) -> Result<Option<NodeId>> {
        self.read(|_, s| s.input)
    }

    pub fn current_date(&self) -> Result<NaiveDate> {
        self.read(|_, s| s.current_date)
    }

    pub fn selected_date(&self) -> Result<Option<NaiveDate>> {
        self.read(|_, s| s.selected_date)
    }

    pub fn min_date(&self) -> Result<Option<NaiveDate>> {
        self.read(|_, s| s.min_date)
    }

    pub fn max_date(&self) -> Result<Option<NaiveDate>> {
        self.read(|_, s| s.max_date)
    }

    /// Bounds including the range sibling's selection.
    pub fn effective_bounds(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        self.read(|inner, _| inner.effective_bounds(self.key))
    }

    pub fn disabled_dates(&self) -> Result<BTreeSet<NaiveDate>> {
        self.read(|_, s| s.disabled_dates.clone())
    }

    pub fn no_weekends(&self) -> Result<bool> {
        self.read(|_, s| s.no_weekends)
    }

    pub fn always_show(&self) -> Result<bool> {
        self.read(|_, s| s.always_show)
    }

    pub fn is_calendar_showing(&self) -> Result<bool> {
        self.read(|_, s| s.is_calendar_showing)
    }

    pub fn is_overlay_showing(&self) -> Result<bool> {
        self.read(|_, s| s.is_overlay_showing)
    }

    /// Whether `day` can be selected right now.
    pub fn is_disabled(&self, day: NaiveDate) -> Result<bool> {
        self.read(|inner, _| inner.is_disabled(self.key, day))
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        self.read(|_, s| Snapshot::from(s))
    }

    /// Node of the cell showing day `n` of the displayed month.
    pub fn day_cell(&self, n: u32) -> Result<Option<NodeId>> {
        self.read(|_, s| {
            let n = n as usize;
            (1..=DAY_CELLS)
                .contains(&n)
                .then(|| s.view.day_cells()[n - 1])
        })
    }

    /// Classes currently on the cell showing day `n`.
    pub fn day_classes(&self, n: u32) -> Result<BTreeSet<String>> {
        let cell = self.day_cell(n)?;
        self.read(|inner, _| cell.map(|c| inner.doc.classes(c)).unwrap_or_default())
    }

    /// Classes of every pooled cell, keyed by pool index.
    pub fn cell_classes(&self) -> Result<BTreeMap<usize, BTreeSet<String>>> {
        self.read(|inner, s| {
            s.view
                .cells
                .iter()
                .enumerate()
                .map(|(idx, node)| (idx, inner.doc.classes(*node)))
                .collect()
        })
    }

    /// Text and classes of every pooled cell, in pool order.
    pub fn cells(&self) -> Result<Vec<(String, BTreeSet<String>)>> {
        self.read(|inner, s| {
            s.view
                .cells
                .iter()
                .map(|node| (inner.doc.text(*node).to_string(), inner.doc.classes(*node)))
                .collect()
        })
    }

    pub fn weekday_labels(&self) -> Result<Vec<String>> {
        self.read(|inner, s| {
            s.view
                .weekdays
                .iter()
                .map(|node| inner.doc.text(*node).to_string())
                .collect()
        })
    }

    pub fn month_label(&self) -> Result<String> {
        self.read(|inner, s| inner.doc.text(s.view.month_label).to_string())
    }

    pub fn year_label(&self) -> Result<String> {
        self.read(|inner, s| inner.doc.text(s.view.year_label).to_string())
    }

    pub fn overlay_input(&self) -> Result<NodeId> {
        self.read(|_, s| s.view.overlay_input)
    }

    pub fn overlay_submit(&self) -> Result<NodeId> {
        self.read(|_, s| s.view.overlay_submit)
    }

    pub fn overlay_month(&self, month: u32) -> Result<Option<NodeId>> {
        self.read(|_, s| {
            let idx = usize::try_from(month).ok()?.checked_sub(1)?;
            s.view.overlay_months.get(idx).copied()
        })
    }

    /// Arrow and label nodes: `(prev, month, year, next)`.
    pub fn controls(&self) -> Result<(NodeId, NodeId, NodeId, NodeId)> {
        self.read(|_, s| (s.view.prev, s.view.month_label, s.view.year_label, s.view.next))
    }

    /// Re-runs the reconciler with the current state.
    pub fn render(&self) -> Result<()> {
        self.write(|inner, key| {
            inner.render(key);
            Ok(())
        })
    }

    #[tracing::instrument(skip(self), fields(key = ?self.key))]
    pub fn navigate(&self, date: NaiveDate) -> Result<()> {
        self.write(|inner, key| {
            inner.navigate(key, date, Cause::imperative(Trigger::Navigate));
            Ok(())
        })
    }

    /// Selects `date` (or clears the selection with `None`). Selecting a date
    /// that is currently disabled leaves the state unchanged.
    #[tracing::instrument(skip(self), fields(key = ?self.key))]
    pub fn select_date(&self, date: Option<NaiveDate>, change_calendar: bool) -> Result<()> {
        self.write(|inner, key| {
            inner.select_date(
                key,
                date,
                change_calendar,
                Cause::imperative(Trigger::SelectDate),
            );
            Ok(())
        })
    }

    #[tracing::instrument(skip(self), fields(key = ?self.key))]
    pub fn set_min(&self, date: Option<NaiveDate>) -> Result<()> {
        self.write(|inner, key| {
            inner.set_bound(key, Bound::Min, date, Cause::imperative(Trigger::SetMin))
        })
    }

    #[tracing::instrument(skip(self), fields(key = ?self.key))]
    pub fn set_max(&self, date: Option<NaiveDate>) -> Result<()> {
        self.write(|inner, key| {
            inner.set_bound(key, Bound::Max, date, Cause::imperative(Trigger::SetMax))
        })
    }

    pub fn show(&self) -> Result<()> {
        self.write(|inner, key| {
            inner.show(key, Cause::imperative(Trigger::Show));
            Ok(())
        })
    }

    pub fn hide(&self) -> Result<()> {
        self.write(|inner, key| {
            inner.hide(key, Cause::imperative(Trigger::Hide));
            Ok(())
        })
    }

    pub fn toggle_calendar(&self) -> Result<()> {
        self.write(|inner, key| {
            inner.toggle_calendar(key, Cause::imperative(Trigger::ToggleCalendar));
            Ok(())
        })
    }

    pub fn toggle_overlay(&self) -> Result<()> {
        self.write(|inner, key| {
            inner.toggle_overlay(key);
            Ok(())
        })
    }

    pub fn remove(&self) -> Result<()> {
        self.remove_with(|| {})
    }

    /// Detaches the calendar and unlinks a range sibling, then runs `done`.
    pub fn remove_with(&self, done: impl FnOnce()) -> Result<()> {
        self.write(|inner, key| {
            inner.remove(key);
            Ok(())
        })?;
        done();
        Ok(())
    }

    fn pair_link(&self) -> Result<PairLink> {
        self.read(|_, s| s.pair)?.ok_or(Error::NotPaired)
    }

    pub fn id(&self) -> Result<PairId> {
        Ok(self.pair_link()?.id)
    }

    pub fn is_first(&self) -> Result<bool> {
        Ok(self.pair_link()?.is_first)
    }

    pub fn is_paired(&self) -> Result<bool> {
        self.read(|_, s| s.pair.is_some())
    }

    pub fn sibling(&self) -> Result<Picker> {
        let key = self
            .read(|inner, _| inner.sibling_of(self.key))?
            .ok_or(Error::NotPaired)?;
        Ok(Picker::from_parts(self.shared.clone(), key))
    }

    /// `start` is the first side's selection and `end` the second's, whichever
    /// side this is called on.
    pub fn get_range(&self) -> Result<DateRange> {
        self.read(|inner, _| inner.range(self.key))?
            .ok_or(Error::NotPaired)
    }

    pub fn remove_pair(&self) -> Result<()> {
        self.remove_pair_with(|| {})
    }

    pub fn remove_pair_with(&self, done: impl FnOnce()) -> Result<()> {
        self.write(|inner, key| {
            let sibling = inner.sibling_of(key).ok_or(Error::NotPaired)?;
            inner.remove(sibling);
            inner.remove(key);
            Ok(())
        })?;
        done();
        Ok(())
    }
}
