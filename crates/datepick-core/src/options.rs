use std::collections::BTreeSet;
use std::rc::Rc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::date;
use crate::error::{Error, Result};
use crate::events::{Callbacks, MonthChangeEvent, SelectEvent, VisibilityEvent};

pub const DEFAULT_DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
pub const DEFAULT_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];
pub const DEFAULT_OVERLAY_BUTTON: &str = "Submit";
pub const DEFAULT_OVERLAY_PLACEHOLDER: &str = "4-digit year";

pub type Formatter = Rc<dyn Fn(NaiveDate) -> String>;
pub type Disabler = Rc<dyn Fn(NaiveDate) -> bool>;

/// Links exactly two pickers into a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairId(pub u64);

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
    Center,
}

impl Position {
    pub fn class(self) -> &'static str {
        match self {
            Position::TopRight => "dp-pos-tr",
            Position::TopLeft => "dp-pos-tl",
            Position::BottomRight => "dp-pos-br",
            Position::BottomLeft => "dp-pos-bl",
            Position::Center => "dp-pos-c",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    #[default]
    Calendar,
    Overlay,
}

#[derive(Clone, Default)]
pub struct Options {
    pub start_date: Option<NaiveDate>,
    pub selected_date: Option<NaiveDate>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub disabled_dates: Vec<NaiveDate>,
    pub events: Vec<NaiveDate>,
    pub no_weekends: bool,
    pub always_show: bool,
    pub show_all_dates: bool,
    pub start_day: i64,
    pub id: Option<PairId>,
    pub position: Position,
    pub default_view: View,
    pub disable_year_overlay: bool,
    pub custom_days: Option<Vec<String>>,
    pub custom_months: Option<Vec<String>>,
    pub custom_overlay_months: Option<Vec<String>>,
    pub overlay_button: Option<String>,
    pub overlay_placeholder: Option<String>,
    pub disabler: Option<Disabler>,
    pub formatter: Option<Formatter>,
    pub callbacks: Callbacks,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("start_date", &self.start_date)
            .field("selected_date", &self.selected_date)
            .field("min_date", &self.min_date)
            .field("max_date", &self.max_date)
            .field("disabled_dates", &self.disabled_dates)
            .field("no_weekends", &self.no_weekends)
            .field("always_show", &self.always_show)
            .field("start_day", &self.start_day)
            .field("id", &self.id)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

impl Options {
    pub fn on_select(mut self, f: impl Fn(&SelectEvent) + 'static) -> Self {
        self.callbacks.on_select = Some(Rc::new(f));
        self
    }

    pub fn on_show(mut self, f: impl Fn(&VisibilityEvent) + 'static) -> Self {
        self.callbacks.on_show = Some(Rc::new(f));
        self
    }

    pub fn on_hide(mut self, f: impl Fn(&VisibilityEvent) + 'static) -> Self {
        self.callbacks.on_hide = Some(Rc::new(f));
        self
    }

    pub fn on_month_change(mut self, f: impl Fn(&MonthChangeEvent) + 'static) -> Self {
        self.callbacks.on_month_change = Some(Rc::new(f));
        self
    }

    pub fn formatter(mut self, f: impl Fn(NaiveDate) -> String + 'static) -> Self {
        self.formatter = Some(Rc::new(f));
        self
    }

    pub fn disabler(mut self, f: impl Fn(NaiveDate) -> bool + 'static) -> Self {
        self.disabler = Some(Rc::new(f));
        self
    }

    /// Validates and fills in defaults. `today` seeds `start_date` when neither
    /// it nor `selected_date` is given.
    #[tracing::instrument(skip(self))]
    pub fn resolve(self, today: NaiveDate) -> Result<ResolvedOptions> {
        if !(0..=6).contains(&self.start_day) {
            return Err(Error::StartDayOutOfRange(self.start_day));
        }
        if let (Some(min), Some(max)) = (self.min_date, self.max_date)
            && min > max
        {
            return Err(Error::MinAfterMax { min, max });
        }

        let days = labels("custom_days", self.custom_days, &DEFAULT_DAYS)?;
        let months = labels("custom_months", self.custom_months, &DEFAULT_MONTHS)?;
        let short_months = DEFAULT_MONTHS.map(|m| m[..3].to_string());
        let overlay_months = match self.custom_overlay_months {
            Some(custom) => labels("custom_overlay_months", Some(custom), &DEFAULT_MONTHS)?,
            None => short_months,
        };

        let start_date = self
            .start_date
            .or(self.selected_date)
            .unwrap_or(today);

        Ok(ResolvedOptions {
            start_date: date::month_anchor(start_date),
            selected_date: self.selected_date,
            min_date: self.min_date,
            max_date: self.max_date,
            disabled_dates: self.disabled_dates.into_iter().collect(),
            events: self.events.into_iter().collect(),
            no_weekends: self.no_weekends,
            always_show: self.always_show,
            show_all_dates: self.show_all_dates,
            start_day: self.start_day as u8,
            id: self.id,
            position: self.position,
            default_view: self.default_view,
            disable_year_overlay: self.disable_year_overlay,
            days,
            months,
            overlay_months,
            overlay_button: self
                .overlay_button
                .unwrap_or_else(|| DEFAULT_OVERLAY_BUTTON.to_string()),
            overlay_placeholder: self
                .overlay_placeholder
                .unwrap_or_else(|| DEFAULT_OVERLAY_PLACEHOLDER.to_string()),
            disabler: self.disabler,
            formatter: self.formatter,
            callbacks: self.callbacks,
        })
    }
}

fn labels<const N: usize>(
    option: &'static str,
    custom: Option<Vec<String>>,
    defaults: &[&str; N],
) -> Result<[String; N]> {
    let Some(custom) = custom else {
        return Ok(defaults.map(str::to_string));
    };
    let found = custom.len();
    <[String; N]>::try_from(custom).map_err(|_| Error::InvalidLabels {
        option,
        expected: N,
        found,
    })
}

/// Options after validation, with every default filled in.
#[derive(Clone)]
pub struct ResolvedOptions {
    pub start_date: NaiveDate,
    pub selected_date: Option<NaiveDate>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub disabled_dates: BTreeSet<NaiveDate>,
    pub events: BTreeSet<NaiveDate>,
    pub no_weekends: bool,
    pub always_show: bool,
    pub show_all_dates: bool,
    pub start_day: u8,
    pub id: Option<PairId>,
    pub position: Position,
    pub default_view: View,
    pub disable_year_overlay: bool,
    pub days: [String; 7],
    pub months: [String; 12],
    pub overlay_months: [String; 12],
    pub overlay_button: String,
    pub overlay_placeholder: String,
    pub disabler: Option<Disabler>,
    pub formatter: Option<Formatter>,
    pub callbacks: Callbacks,
}

impl ResolvedOptions {
    /// Weekday header labels rotated so column 0 is `start_day`.
    pub fn weekday_header(&self) -> [String; 7] {
        let start = usize::from(self.start_day);
        std::array::from_fn(|col| self.days[(start + col) % 7].clone())
    }

    pub fn format(&self, value: NaiveDate) -> String {
        match &self.formatter {
            Some(f) => f(value),
            None => date::format_display(value),
        }
    }

    /// Drops the initial selection when it is not selectable under the
    /// resolved constraints.
    pub(crate) fn checked_selection(
        &self,
        disabled: impl Fn(NaiveDate) -> bool,
    ) -> Option<NaiveDate> {
        let selected = self.selected_date?;
        if disabled(selected) {
            warn!(%selected, "initial selected date is disabled; ignoring it");
            return None;
        }
        Some(selected)
    }
}
