//! Browser bindings: the core registry drives an in-memory document whose
//! mutation log is mirrored onto the page, and one set of document-level
//! listeners feeds user input back.

mod mirror;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use datepick_core::config::PickerSpec;
use datepick_core::{
    Clock, Datepickers, Document, DomEvent, Error, Key, NodeId, Picker, Target, date,
};
use gloo::events::EventListener;
use gloo::render::{AnimationFrame, request_animation_frame};
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, HtmlInputElement, KeyboardEvent};

use crate::mirror::Mirror;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_tracing::set_as_global_default();
    info!("datepick web bindings loaded");
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

struct Bridge {
    pickers: Datepickers,
    mirror: RefCell<Mirror>,
    listeners: RefCell<Vec<EventListener>>,
    frame: RefCell<Option<AnimationFrame>>,
    frame_pending: Cell<bool>,
}

impl Bridge {
    /// Pushes pending document changes to the page, keeps the listeners in
    /// step with the registry and schedules the frame tick.
    fn sync(self: &Rc<Self>) -> Result<(), JsValue> {
        let mutations = self.pickers.take_mutations();
        if !mutations.is_empty() {
            debug!(count = mutations.len(), "mirroring mutations");
            self.mirror.borrow_mut().apply(mutations)?;
        }

        let installed = !self.listeners.borrow().is_empty();
        if self.pickers.has_document_listener() && !installed {
            self.install_listeners()?;
        } else if !self.pickers.has_document_listener() && installed {
            self.listeners.borrow_mut().clear();
            info!("removed page listeners");
        }

        if self.pickers.needs_frame() && !self.frame_pending.get() {
            self.frame_pending.set(true);
            let weak = Rc::downgrade(self);
            let handle = request_animation_frame(move |_| {
                if let Some(bridge) = weak.upgrade() {
                    bridge.frame_pending.set(false);
                    bridge.pickers.run_frame();
                    if let Err(err) = bridge.sync() {
                        warn!(?err, "failed to mirror frame tick");
                    }
                }
            });
            *self.frame.borrow_mut() = Some(handle);
        }
        Ok(())
    }

    fn target_node(&self, event: &Event) -> NodeId {
        let mirror = self.mirror.borrow();
        event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| mirror.node_of(&el))
            .unwrap_or_else(|| self.pickers.document(|doc| doc.body()))
    }

    fn handle(self: &Rc<Self>, event: DomEvent) {
        self.pickers.dispatch(event);
        if let Err(err) = self.sync() {
            warn!(?err, "failed to mirror event result");
        }
    }

    fn install_listeners(self: &Rc<Self>) -> Result<(), JsValue> {
        let document = gloo::utils::document();
        let listen = |kind: &'static str, map: fn(&Bridge, &Event) -> Option<DomEvent>| {
            let weak: Weak<Bridge> = Rc::downgrade(self);
            EventListener::new(&document, kind, move |event| {
                if let Some(bridge) = weak.upgrade()
                    && let Some(dom_event) = map(&bridge, event)
                {
                    bridge.handle(dom_event);
                }
            })
        };

        let listeners = vec![
            listen("click", |bridge, event| {
                Some(DomEvent::Click {
                    target: bridge.target_node(event),
                })
            }),
            listen("input", |bridge, event| {
                let input = event.target()?.dyn_into::<HtmlInputElement>().ok()?;
                Some(DomEvent::Input {
                    target: bridge.target_node(event),
                    text: input.value(),
                })
            }),
            listen("keydown", |bridge, event| {
                let key = event.dyn_ref::<KeyboardEvent>()?.key();
                Some(DomEvent::KeyDown {
                    target: bridge.target_node(event),
                    key: Key::from_name(&key),
                })
            }),
        ];
        *self.listeners.borrow_mut() = listeners;
        info!("installed page listeners");
        Ok(())
    }
}

/// Registry for one page.
#[wasm_bindgen]
pub struct WebDatepickers {
    bridge: Rc<Bridge>,
}

#[wasm_bindgen]
impl WebDatepickers {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WebDatepickers, JsValue> {
        let document = gloo::utils::document();
        let body: Element = gloo::utils::body().into();
        let pickers = Datepickers::with_document(Document::with_mutation_log()).with_clock(
            Clock::Custom(Rc::new(|| chrono::Local::now().date_naive())),
        );
        let core_body = pickers.document(|doc| doc.body());
        let mirror = Mirror::new(document, body, core_body)?;
        Ok(Self {
            bridge: Rc::new(Bridge {
                pickers,
                mirror: RefCell::new(mirror),
                listeners: RefCell::new(Vec::new()),
                frame: RefCell::new(None),
                frame_pending: Cell::new(false),
            }),
        })
    }

    /// Attaches a picker described by a TOML table (`target = "#start"`, then
    /// the same keys a picker file accepts). `on_select` receives the new date
    /// as `YYYY-MM-DD` (or `null`) and the trigger name.
    pub fn attach(
        &self,
        spec: &str,
        on_select: Option<js_sys::Function>,
    ) -> Result<WebPicker, JsValue> {
        let spec: PickerSpec = toml::from_str(spec).map_err(js_error)?;
        let mut options = spec.to_options().map_err(|e| js_error(format!("{e:#}")))?;
        if let Some(callback) = on_select {
            options = options.on_select(move |event| {
                let date = event
                    .new_date
                    .map(|d| JsValue::from_str(&d.format(date::ISO_DATE_FORMAT).to_string()))
                    .unwrap_or(JsValue::NULL);
                let trigger = JsValue::from_str(&format!("{:?}", event.trigger));
                if let Err(err) = callback.call2(&JsValue::NULL, &date, &trigger) {
                    warn!(?err, "onSelect callback threw");
                }
            });
        }

        let bridge = &self.bridge;
        if spec.target.trim().is_empty() {
            return Err(js_error(Error::EmptySelector));
        }
        let host = gloo::utils::document()
            .query_selector(&spec.target)?
            .ok_or_else(|| js_error(Error::SelectorNotFound(spec.target.clone())))?;

        // Flush what is pending, then adopt without replaying the adoption.
        bridge.sync()?;
        let node = bridge
            .pickers
            .document_mut(|doc| bridge.mirror.borrow_mut().adopt(doc, &host))?;
        bridge.pickers.take_mutations();

        let picker = bridge
            .pickers
            .create(Target::Node(node), options)
            .map_err(js_error)?;
        bridge.sync()?;
        Ok(WebPicker {
            bridge: bridge.clone(),
            picker,
        })
    }

    #[wasm_bindgen(getter)]
    pub fn count(&self) -> usize {
        self.bridge.pickers.len()
    }
}

#[wasm_bindgen]
pub struct WebPicker {
    bridge: Rc<Bridge>,
    picker: Picker,
}

fn parse(raw: Option<String>) -> Result<Option<chrono::NaiveDate>, JsValue> {
    raw.map(|r| date::parse_iso_date(&r)).transpose().map_err(js_error)
}

fn iso(day: Option<chrono::NaiveDate>) -> Option<String> {
    day.map(|d| d.format(date::ISO_DATE_FORMAT).to_string())
}

impl WebPicker {
    fn run(&self, f: impl FnOnce(&Picker) -> datepick_core::Result<()>) -> Result<(), JsValue> {
        f(&self.picker).map_err(js_error)?;
        self.bridge.sync()
    }
}

#[wasm_bindgen]
impl WebPicker {
    #[wasm_bindgen(js_name = selectDate)]
    pub fn select_date(&self, day: Option<String>, change_calendar: bool) -> Result<(), JsValue> {
        let day = parse(day)?;
        self.run(|p| p.select_date(day, change_calendar))
    }

    pub fn navigate(&self, day: String) -> Result<(), JsValue> {
        let day = date::parse_iso_date(&day).map_err(js_error)?;
        self.run(|p| p.navigate(day))
    }

    #[wasm_bindgen(js_name = setMin)]
    pub fn set_min(&self, day: Option<String>) -> Result<(), JsValue> {
        let day = parse(day)?;
        self.run(|p| p.set_min(day))
    }

    #[wasm_bindgen(js_name = setMax)]
    pub fn set_max(&self, day: Option<String>) -> Result<(), JsValue> {
        let day = parse(day)?;
        self.run(|p| p.set_max(day))
    }

    pub fn show(&self) -> Result<(), JsValue> {
        self.run(Picker::show)
    }

    pub fn hide(&self) -> Result<(), JsValue> {
        self.run(Picker::hide)
    }

    #[wasm_bindgen(js_name = toggleCalendar)]
    pub fn toggle_calendar(&self) -> Result<(), JsValue> {
        self.run(Picker::toggle_calendar)
    }

    #[wasm_bindgen(js_name = toggleOverlay)]
    pub fn toggle_overlay(&self) -> Result<(), JsValue> {
        self.run(Picker::toggle_overlay)
    }

    pub fn remove(&self) -> Result<(), JsValue> {
        self.run(Picker::remove)
    }

    #[wasm_bindgen(js_name = removePair)]
    pub fn remove_pair(&self) -> Result<(), JsValue> {
        self.run(Picker::remove_pair)
    }

    #[wasm_bindgen(getter, js_name = selectedDate)]
    pub fn selected_date(&self) -> Result<Option<String>, JsValue> {
        self.picker.selected_date().map(iso).map_err(js_error)
    }

    #[wasm_bindgen(getter, js_name = currentDate)]
    pub fn current_date(&self) -> Result<String, JsValue> {
        let current = self.picker.current_date().map_err(js_error)?;
        Ok(current.format(date::ISO_DATE_FORMAT).to_string())
    }

    #[wasm_bindgen(getter, js_name = isCalendarShowing)]
    pub fn is_calendar_showing(&self) -> Result<bool, JsValue> {
        self.picker.is_calendar_showing().map_err(js_error)
    }

    /// `[start, end]` of a range pair.
    #[wasm_bindgen(js_name = getRange)]
    pub fn get_range(&self) -> Result<js_sys::Array, JsValue> {
        let range = self.picker.get_range().map_err(js_error)?;
        let side = |d| iso(d).map_or(JsValue::NULL, |s| JsValue::from_str(&s));
        Ok(js_sys::Array::of2(&side(range.start), &side(range.end)))
    }

    /// The calendar container element on the page.
    #[wasm_bindgen(getter, js_name = calendarContainer)]
    pub fn calendar_container(&self) -> Result<Option<Element>, JsValue> {
        let node = self.picker.calendar_container().map_err(js_error)?;
        Ok(self.bridge.mirror.borrow().element(node).cloned())
    }
}
