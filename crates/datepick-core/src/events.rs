use std::rc::Rc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::picker::Picker;
use crate::registry::Shared;
use crate::state::PickerKey;

/// What caused a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    DayClick,
    ArrowClick,
    OverlayMonthClick,
    OverlaySubmit,
    InputClick,
    OutsideClick,
    Keydown,
    Navigate,
    SelectDate,
    SetMin,
    SetMax,
    Show,
    Hide,
    ToggleCalendar,
}

/// How it was caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerType {
    User,
    Imperative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cause {
    pub trigger: Trigger,
    pub trigger_type: TriggerType,
}

impl Cause {
    pub const fn user(trigger: Trigger) -> Self {
        Self {
            trigger,
            trigger_type: TriggerType::User,
        }
    }

    pub const fn imperative(trigger: Trigger) -> Self {
        Self {
            trigger,
            trigger_type: TriggerType::Imperative,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectEvent {
    pub trigger: Trigger,
    pub trigger_type: TriggerType,
    pub instance: Picker,
    pub prev_date: Option<NaiveDate>,
    pub new_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct MonthChangeEvent {
    pub trigger: Trigger,
    pub trigger_type: TriggerType,
    pub instance: Picker,
    pub prev_date: NaiveDate,
    pub new_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct VisibilityEvent {
    pub trigger: Trigger,
    pub trigger_type: TriggerType,
    pub instance: Picker,
}

pub type Callback<E> = Rc<dyn Fn(&E)>;

#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_select: Option<Callback<SelectEvent>>,
    pub on_show: Option<Callback<VisibilityEvent>>,
    pub on_hide: Option<Callback<VisibilityEvent>>,
    pub on_month_change: Option<Callback<MonthChangeEvent>>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_select", &self.on_select.is_some())
            .field("on_show", &self.on_show.is_some())
            .field("on_hide", &self.on_hide.is_some())
            .field("on_month_change", &self.on_month_change.is_some())
            .finish()
    }
}

/// A notification waiting to be delivered once the registry borrow is released.
pub(crate) enum Pending {
    Select {
        cb: Callback<SelectEvent>,
        key: PickerKey,
        cause: Cause,
        prev: Option<NaiveDate>,
        new: Option<NaiveDate>,
    },
    MonthChange {
        cb: Callback<MonthChangeEvent>,
        key: PickerKey,
        cause: Cause,
        prev: NaiveDate,
        new: NaiveDate,
    },
    Visibility {
        cb: Callback<VisibilityEvent>,
        key: PickerKey,
        cause: Cause,
    },
}

impl Pending {
    pub(crate) fn deliver(self, shared: &Shared) {
        match self {
            Pending::Select {
                cb,
                key,
                cause,
                prev,
                new,
            } => cb(&SelectEvent {
                trigger: cause.trigger,
                trigger_type: cause.trigger_type,
                instance: Picker::from_parts(shared.clone(), key),
                prev_date: prev,
                new_date: new,
            }),
            Pending::MonthChange {
                cb,
                key,
                cause,
                prev,
                new,
            } => cb(&MonthChangeEvent {
                trigger: cause.trigger,
                trigger_type: cause.trigger_type,
                instance: Picker::from_parts(shared.clone(), key),
                prev_date: prev,
                new_date: new,
            }),
            Pending::Visibility { cb, key, cause } => cb(&VisibilityEvent {
                trigger: cause.trigger,
                trigger_type: cause.trigger_type,
                instance: Picker::from_parts(shared.clone(), key),
            }),
        }
    }
}
