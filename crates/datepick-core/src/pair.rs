//! Range linkage between two pickers sharing a [`PairId`].
//!
//! The sibling relation lives only in the registry's pair table; each side
//! stores its id and whether it is first, never a reference to the other.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::options::PairId;
use crate::registry::{Inner, PairSlots};
use crate::state::{PairLink, PickerKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Inner {
    /// The first picker already holding `id`, or an error when both slots are
    /// taken.
    pub(crate) fn pair_capacity(&self, id: PairId) -> Result<Option<PickerKey>> {
        match self.pairs.get(&id) {
            None => Ok(None),
            Some(PairSlots {
                first: Some(_),
                second: Some(_),
            }) => Err(Error::PairFull(id.0)),
            Some(slots) => Ok(slots.first.or(slots.second)),
        }
    }

    pub(crate) fn link(&mut self, key: PickerKey, id: PairId) {
        let slots = self.pairs.entry(id).or_default();
        let is_first = slots.first.is_none();
        if is_first {
            slots.first = Some(key);
        } else {
            slots.second = Some(key);
        }
        if let Some(state) = self.pickers.get_mut(&key) {
            state.pair = Some(PairLink { id, is_first });
        }
        debug!(?key, %id, is_first, "linked range picker");
    }

    /// Drops `key` from its pair and turns the other side back into a single
    /// picker. Returns that other side.
    pub(crate) fn unlink(&mut self, key: PickerKey) -> Option<PickerKey> {
        let link = self.pickers.get_mut(&key)?.pair.take()?;
        let slots = self.pairs.remove(&link.id)?;
        let other = if link.is_first {
            slots.second
        } else {
            slots.first
        };
        if let Some(state) = other.and_then(|k| self.pickers.get_mut(&k)) {
            state.pair = None;
        }
        debug!(?key, id = %link.id, ?other, "unlinked range picker");
        other
    }

    pub(crate) fn sibling_of(&self, key: PickerKey) -> Option<PickerKey> {
        let link = self.pickers.get(&key)?.pair?;
        let slots = self.pairs.get(&link.id)?;
        if link.is_first {
            slots.second
        } else {
            slots.first
        }
    }

    /// Bounds after the sibling's selection has been layered on top: the first
    /// side cannot pass the second side's date and vice versa.
    pub(crate) fn effective_bounds(
        &self,
        key: PickerKey,
    ) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let Some(state) = self.pickers.get(&key) else {
            return (None, None);
        };
        let (mut min, mut max) = (state.min_date, state.max_date);
        let sibling_selection = self
            .sibling_of(key)
            .and_then(|k| self.pickers.get(&k))
            .and_then(|s| s.selected_date);

        if let (Some(link), Some(other)) = (state.pair, sibling_selection) {
            if link.is_first {
                max = Some(max.map_or(other, |m| m.min(other)));
            } else {
                min = Some(min.map_or(other, |m| m.max(other)));
            }
        }
        (min, max)
    }

    pub(crate) fn range(&self, key: PickerKey) -> Option<DateRange> {
        let link = self.pickers.get(&key)?.pair?;
        let slots = self.pairs.get(&link.id)?;
        let selected = |k: Option<PickerKey>| {
            k.and_then(|k| self.pickers.get(&k))
                .and_then(|s| s.selected_date)
        };
        Some(DateRange {
            start: selected(slots.first),
            end: selected(slots.second),
        })
    }

    /// Both endpoints, only when both sides have a selection.
    pub(crate) fn range_endpoints(&self, key: PickerKey) -> Option<(NaiveDate, NaiveDate)> {
        let range = self.range(key)?;
        Some((range.start?, range.end?))
    }
}
