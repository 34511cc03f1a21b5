use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use chrono::Datelike;
use tracing::{debug, info};

use crate::date::{self, Clock};
use crate::dom::{self, Document, Mutation, NodeId, NodeKind, Selector, class};
use crate::error::{Error, Result};
use crate::events::{Cause, Pending, Trigger};
use crate::options::{Options, PairId};
use crate::picker::Picker;
use crate::render::{self, Chrome, RenderInput};
use crate::state::{PickerKey, PickerState, within};
use crate::view::{self, DAY_CELLS, LEADING_CELLS, Role};

pub(crate) type Shared = Rc<RefCell<Inner>>;

/// Where to attach a picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Selector(String),
    Node(NodeId),
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Target::Selector(value.to_string())
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        Target::Selector(value)
    }
}

impl From<NodeId> for Target {
    fn from(value: NodeId) -> Self {
        Target::Node(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other,
}

impl Key {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            _ => Key::Other,
        }
    }
}

/// User interaction delivered by a backend's single document-level listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomEvent {
    Click { target: NodeId },
    Input { target: NodeId, text: String },
    KeyDown { target: NodeId, key: Key },
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PairSlots {
    pub first: Option<PickerKey>,
    pub second: Option<PickerKey>,
}

pub(crate) struct Inner {
    pub doc: Document,
    pub pickers: BTreeMap<PickerKey, PickerState>,
    /// Host element -> picker, so an element never gets two pickers.
    pub attached: HashMap<NodeId, PickerKey>,
    pub pairs: HashMap<PairId, PairSlots>,
    pub pending: Vec<Pending>,
    pub clock: Clock,
    document_listener: bool,
    frame_queue: BTreeSet<NodeId>,
    next_key: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hit {
    Input,
    Inside(Option<Role>),
}

impl Inner {
    fn new(doc: Document, clock: Clock) -> Self {
        Self {
            doc,
            pickers: BTreeMap::new(),
            attached: HashMap::new(),
            pairs: HashMap::new(),
            pending: Vec::new(),
            clock,
            document_listener: false,
            frame_queue: BTreeSet::new(),
            next_key: 0,
        }
    }

    fn resolve_target(&self, target: &Target) -> Result<NodeId> {
        let node = match target {
            Target::Selector(raw) => {
                let selector = Selector::parse(raw).ok_or(Error::EmptySelector)?;
                self.doc
                    .query(&selector)
                    .ok_or_else(|| Error::SelectorNotFound(raw.clone()))?
            }
            Target::Node(node) => {
                if !self.doc.exists(*node) {
                    return Err(Error::SelectorNotFound(format!("{node:?}")));
                }
                *node
            }
        };

        if self.doc.kind(node) == Some(NodeKind::ShadowRoot) {
            return Err(Error::UnsupportedRoot);
        }
        let tag = self.doc.tag(node).unwrap_or_default();
        if tag != "input" && dom::is_void_tag(tag) {
            return Err(Error::VoidElement(tag.to_string()));
        }
        if self.attached.contains_key(&node) {
            return Err(Error::AlreadyAttached);
        }
        Ok(node)
    }

    #[tracing::instrument(skip(self, options))]
    pub(crate) fn create(&mut self, target: &Target, options: Options) -> Result<PickerKey> {
        let host = self.resolve_target(target)?;
        let opts = options.resolve(self.clock.today())?;

        let existing_first = match opts.id {
            Some(id) => self.pair_capacity(id)?,
            None => None,
        };

        let is_input = self.doc.tag(host) == Some("input");
        let parent = if is_input {
            self.doc.parent(host).unwrap_or_else(|| self.doc.body())
        } else {
            host
        };

        let view = view::build(&mut self.doc, parent, &opts);
        let key = PickerKey(self.next_key);
        self.next_key += 1;

        let pair_id = opts.id;
        let mut state = PickerState::new(opts, host, is_input.then_some(host), view);
        if let Some(first) = existing_first.and_then(|k| self.pickers.get(&k)) {
            if state.min_date.is_some_and(|m| Some(m) != first.min_date)
                || state.max_date.is_some_and(|m| Some(m) != first.max_date)
            {
                tracing::warn!("range sibling bounds differ; keeping the first picker's bounds");
            }
            state.min_date = first.min_date;
            state.max_date = first.max_date;
        }
        self.pickers.insert(key, state);
        self.attached.insert(host, key);

        if let Some(id) = pair_id {
            self.link(key, id);
        }

        let initial = self
            .pickers
            .get(&key)
            .and_then(|s| s.opts.checked_selection(|d| self.is_disabled(key, d)));
        if let Some(state) = self.pickers.get_mut(&key) {
            state.selected_date = initial;
        }

        if !self.document_listener {
            self.document_listener = true;
            info!("installed document click listener");
        }

        if let Some(sibling) = self.sibling_of(key) {
            self.render(sibling);
        }
        self.render(key);

        info!(?key, ?host, paired = pair_id.is_some(), "created datepicker");
        Ok(key)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove(&mut self, key: PickerKey) {
        let remaining = self.unlink(key);
        let Some(state) = self.pickers.remove(&key) else {
            return;
        };
        self.doc.destroy(state.view.container);
        self.attached.remove(&state.host);
        self.frame_queue.remove(&state.view.container);
        info!(?key, sibling = ?remaining, "removed datepicker");

        if self.pickers.is_empty() && self.document_listener {
            self.document_listener = false;
            info!("removed document click listener");
        }
    }

    pub(crate) fn is_disabled(&self, key: PickerKey, day: chrono::NaiveDate) -> bool {
        let Some(state) = self.pickers.get(&key) else {
            return true;
        };
        let (min, max) = self.effective_bounds(key);
        state.is_disabled_locally(day) || !within(day, min, max)
    }

    /// Reconciles one picker's nodes with its state.
    pub(crate) fn render(&mut self, key: PickerKey) {
        let today = self.clock.today();
        let (min, max) = self.effective_bounds(key);
        let range = self.range_endpoints(key);
        let Some(state) = self.pickers.get(&key) else {
            return;
        };

        let disabled = |d| state.is_disabled_locally(d) || !within(d, min, max);
        let layout = render::classify(&RenderInput {
            current: state.current_date,
            selected: state.selected_date,
            range,
            today,
            start_day: state.opts.start_day,
            show_all_dates: state.opts.show_all_dates,
            events: &state.opts.events,
            month_label: state.month_label(),
            disabled: &disabled,
        });

        let cells_changed = render::apply(&mut self.doc, &state.view, &layout);
        render::apply_chrome(
            &mut self.doc,
            &state.view,
            Chrome {
                calendar_showing: state.is_calendar_showing,
                overlay_showing: state.is_overlay_showing,
                overlay_year: &state.overlay_year,
                current_month: state.current_date.month(),
            },
        );
        if let Some(input) = state.input {
            self.doc.set_value(input, &state.formatted_selection());
        }

        if cells_changed {
            self.doc.set_class(state.view.container, class::NO_TRANSITION, true);
            self.frame_queue.insert(state.view.container);
        }
        debug!(?key, cells_changed, "rendered datepicker");
    }

    fn owner_of(&self, target: NodeId) -> Option<(PickerKey, Hit)> {
        self.pickers.iter().find_map(|(key, state)| {
            if state.input == Some(target) {
                Some((*key, Hit::Input))
            } else if self.doc.contains(state.view.container, target) {
                Some((*key, Hit::Inside(state.view.role(target))))
            } else {
                None
            }
        })
    }

    /// Date shown by pooled cell `idx`, if it is a selectable day of the
    /// displayed month.
    fn cell_date(&self, key: PickerKey, idx: usize) -> Option<chrono::NaiveDate> {
        let state = self.pickers.get(&key)?;
        let n = idx.checked_sub(LEADING_CELLS)? + 1;
        let anchor = state.current_date;
        if n > DAY_CELLS || n > date::days_in_month(anchor.year(), anchor.month()) as usize {
            return None;
        }
        date::add_days(anchor, n as i64 - 1)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn dispatch(&mut self, event: DomEvent) {
        if !self.document_listener {
            return;
        }
        match event {
            DomEvent::Click { target } => self.handle_click(target),
            DomEvent::Input { target, text } => {
                if let Some((key, Hit::Inside(Some(Role::OverlayInput)))) = self.owner_of(target) {
                    self.set_overlay_year(key, &text);
                }
            }
            DomEvent::KeyDown { target, key } => self.handle_key(target, key),
        }
    }

    fn handle_click(&mut self, target: NodeId) {
        let owner = self.owner_of(target);
        let owner_key = owner.map(|(key, _)| key);
        let others: Vec<PickerKey> = self
            .pickers
            .keys()
            .copied()
            .filter(|k| Some(*k) != owner_key)
            .collect();
        for other in others {
            self.hide(other, Cause::user(Trigger::OutsideClick));
        }

        let Some((key, hit)) = owner else {
            return;
        };
        let overlay_open = self
            .pickers
            .get(&key)
            .is_some_and(|s| s.is_overlay_showing);

        match hit {
            Hit::Input => self.show(key, Cause::user(Trigger::InputClick)),
            Hit::Inside(Some(Role::Cell(idx))) if !overlay_open => self.click_day(key, idx),
            Hit::Inside(Some(Role::PrevArrow)) if !overlay_open => self.step_month(key, -1),
            Hit::Inside(Some(Role::NextArrow)) if !overlay_open => self.step_month(key, 1),
            Hit::Inside(Some(Role::MonthLabel | Role::YearLabel)) => self.toggle_overlay(key),
            Hit::Inside(Some(Role::OverlayMonth(month))) if overlay_open => {
                self.pick_overlay_month(key, month);
            }
            Hit::Inside(Some(Role::OverlaySubmit)) if overlay_open => self.submit_overlay(key),
            Hit::Inside(Some(Role::OverlayClose)) if overlay_open => self.toggle_overlay(key),
            Hit::Inside(_) => {}
        }
    }

    fn click_day(&mut self, key: PickerKey, idx: usize) {
        let Some(day) = self.cell_date(key, idx) else {
            return;
        };
        if self.is_disabled(key, day) {
            debug!(%day, "ignoring click on disabled day");
            return;
        }
        let already = self
            .pickers
            .get(&key)
            .is_some_and(|s| s.selected_date == Some(day));
        let cause = Cause::user(Trigger::DayClick);
        if already {
            self.select_date(key, None, false, cause);
        } else {
            self.select_date(key, Some(day), false, cause);
            self.hide(key, cause);
        }
    }

    fn step_month(&mut self, key: PickerKey, months: i32) {
        let Some(current) = self.pickers.get(&key).map(|s| s.current_date) else {
            return;
        };
        self.navigate(
            key,
            date::shift_months(current, months),
            Cause::user(Trigger::ArrowClick),
        );
    }

    fn handle_key(&mut self, target: NodeId, key_pressed: Key) {
        let Some((key, hit)) = self.owner_of(target) else {
            return;
        };
        let overlay_open = self
            .pickers
            .get(&key)
            .is_some_and(|s| s.is_overlay_showing);
        match key_pressed {
            Key::Enter if hit == Hit::Inside(Some(Role::OverlayInput)) => self.submit_overlay(key),
            Key::Escape if overlay_open => self.toggle_overlay(key),
            Key::Escape => self.hide(key, Cause::user(Trigger::Keydown)),
            _ => {}
        }
    }

    fn run_frame(&mut self) -> usize {
        let queued = std::mem::take(&mut self.frame_queue);
        for node in &queued {
            self.doc.set_class(*node, class::NO_TRANSITION, false);
        }
        queued.len()
    }
}

/// Delivers queued notifications. Runs with no borrow held so callbacks can
/// call back into any picker.
pub(crate) fn flush(shared: &Shared) {
    loop {
        let batch = std::mem::take(&mut shared.borrow_mut().pending);
        if batch.is_empty() {
            break;
        }
        for pending in batch {
            pending.deliver(shared);
        }
    }
}

/// The picker registry for one page (or one test).
#[derive(Clone)]
pub struct Datepickers {
    shared: Shared,
}

impl std::fmt::Debug for Datepickers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.borrow();
        f.debug_struct("Datepickers")
            .field("pickers", &inner.pickers.len())
            .field("document_listener", &inner.document_listener)
            .field("clock", &inner.clock)
            .finish()
    }
}

impl Default for Datepickers {
    fn default() -> Self {
        Self::new()
    }
}

impl Datepickers {
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    pub fn with_document(doc: Document) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Inner::new(doc, Clock::default()))),
        }
    }

    pub fn with_clock(self, clock: Clock) -> Self {
        self.shared.borrow_mut().clock = clock;
        self
    }

    pub fn set_clock(&self, clock: Clock) {
        self.shared.borrow_mut().clock = clock;
    }

    pub fn today(&self) -> chrono::NaiveDate {
        self.shared.borrow().clock.today()
    }

    pub fn document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.shared.borrow().doc)
    }

    pub fn document_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.shared.borrow_mut().doc)
    }

    /// Builds a picker on `target`. Fails before touching the document when
    /// the target or options are invalid.
    pub fn create(&self, target: impl Into<Target>, options: Options) -> Result<Picker> {
        let target = target.into();
        let key = self.shared.borrow_mut().create(&target, options)?;
        flush(&self.shared);
        Ok(Picker::from_parts(self.shared.clone(), key))
    }

    pub fn dispatch(&self, event: DomEvent) {
        self.shared.borrow_mut().dispatch(event);
        flush(&self.shared);
    }

    pub fn click(&self, target: NodeId) {
        self.dispatch(DomEvent::Click { target });
    }

    /// Clears the transition-suppressing class queued by the last renders.
    /// Backends call this from their animation-frame hook.
    pub fn run_frame(&self) -> usize {
        self.shared.borrow_mut().run_frame()
    }

    pub fn needs_frame(&self) -> bool {
        !self.shared.borrow().frame_queue.is_empty()
    }

    pub fn has_document_listener(&self) -> bool {
        self.shared.borrow().document_listener
    }

    pub fn len(&self) -> usize {
        self.shared.borrow().pickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pickers(&self) -> Vec<Picker> {
        let keys: Vec<PickerKey> = self.shared.borrow().pickers.keys().copied().collect();
        keys.into_iter()
            .map(|key| Picker::from_parts(self.shared.clone(), key))
            .collect()
    }

    /// Picker attached to `element`, if any.
    pub fn picker_for(&self, element: NodeId) -> Option<Picker> {
        let key = self.shared.borrow().attached.get(&element).copied()?;
        Some(Picker::from_parts(self.shared.clone(), key))
    }

    /// Empty unless the registry was built on [`Document::with_mutation_log`].
    pub fn take_mutations(&self) -> Vec<Mutation> {
        self.shared.borrow_mut().doc.take_mutations()
    }
}
