//! TOML page descriptions: host elements to create and pickers to attach.

use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, info};

use crate::date::{self, Clock};
use crate::dom::Selector;
use crate::error::Result;
use crate::options::{Options, PairId, Position, View};
use crate::picker::Picker;
use crate::registry::Datepickers;

pub const TIMEZONE_ENV_VAR: &str = "DATEPICK_TIMEZONE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PickerFile {
    pub timezone: Option<String>,
    pub today: Option<String>,
    #[serde(default, rename = "element")]
    pub elements: Vec<ElementSpec>,
    #[serde(default, rename = "picker")]
    pub pickers: Vec<PickerSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementSpec {
    pub id: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    /// `id` of an earlier element; the body when absent.
    pub parent: Option<String>,
    #[serde(default)]
    pub class: Vec<String>,
}

fn default_tag() -> String {
    "div".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PickerSpec {
    pub target: String,
    pub start_date: Option<String>,
    pub selected_date: Option<String>,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
    #[serde(default)]
    pub disabled_dates: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub no_weekends: bool,
    #[serde(default)]
    pub always_show: bool,
    #[serde(default)]
    pub show_all_dates: bool,
    #[serde(default)]
    pub start_day: i64,
    pub id: Option<u64>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub default_view: View,
    #[serde(default)]
    pub disable_year_overlay: bool,
    pub custom_days: Option<Vec<String>>,
    pub custom_months: Option<Vec<String>>,
    pub custom_overlay_months: Option<Vec<String>>,
    pub overlay_button: Option<String>,
    pub overlay_placeholder: Option<String>,
    /// strftime pattern for the attached input.
    pub format: Option<String>,
}

fn parse_opt(raw: Option<&String>) -> Result<Option<NaiveDate>> {
    raw.map(|r| date::parse_iso_date(r)).transpose()
}

fn parse_all(raw: &[String]) -> Result<Vec<NaiveDate>> {
    raw.iter().map(|r| date::parse_iso_date(r)).collect()
}

impl PickerSpec {
    /// Typed options. Callbacks are left empty for the caller to attach.
    pub fn to_options(&self) -> anyhow::Result<Options> {
        let mut options = Options {
            start_date: parse_opt(self.start_date.as_ref())?,
            selected_date: parse_opt(self.selected_date.as_ref())?,
            min_date: parse_opt(self.min_date.as_ref())?,
            max_date: parse_opt(self.max_date.as_ref())?,
            disabled_dates: parse_all(&self.disabled_dates)?,
            events: parse_all(&self.events)?,
            no_weekends: self.no_weekends,
            always_show: self.always_show,
            show_all_dates: self.show_all_dates,
            start_day: self.start_day,
            id: self.id.map(PairId),
            position: self.position,
            default_view: self.default_view,
            disable_year_overlay: self.disable_year_overlay,
            custom_days: self.custom_days.clone(),
            custom_months: self.custom_months.clone(),
            custom_overlay_months: self.custom_overlay_months.clone(),
            overlay_button: self.overlay_button.clone(),
            overlay_placeholder: self.overlay_placeholder.clone(),
            ..Options::default()
        };

        if let Some(pattern) = &self.format {
            if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                return Err(anyhow!("invalid date format `{pattern}` for {}", self.target));
            }
            let pattern = pattern.clone();
            options = options.formatter(move |d| d.format(&pattern).to_string());
        }
        Ok(options)
    }
}

impl PickerFile {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("failed to parse picker file")
    }

    #[tracing::instrument]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file = Self::from_toml_str(&text)
            .with_context(|| format!("in {}", path.display()))?;
        info!(
            file = %path.display(),
            elements = file.elements.len(),
            pickers = file.pickers.len(),
            "loaded picker file"
        );
        Ok(file)
    }

    /// Pinned `today` when given, otherwise the configured timezone.
    pub fn clock(&self) -> anyhow::Result<Clock> {
        if let Some(raw) = &self.today {
            return Ok(Clock::Fixed(date::parse_iso_date(raw)?));
        }
        Ok(Clock::Zone(resolve_timezone(self.timezone.as_deref())))
    }

    /// Creates the elements, then the pickers, in file order.
    pub fn build(&self, pickers: &Datepickers) -> anyhow::Result<Vec<Picker>> {
        self.build_with(pickers, |_, options| options)
    }

    /// Like [`PickerFile::build`], letting `decorate` attach callbacks to the
    /// options of the picker at each index.
    pub fn build_with(
        &self,
        pickers: &Datepickers,
        decorate: impl Fn(usize, Options) -> Options,
    ) -> anyhow::Result<Vec<Picker>> {
        for element in &self.elements {
            let parent = match &element.parent {
                Some(parent) => {
                    let selector = Selector::Id(parent.clone());
                    pickers
                        .document(|doc| doc.query(&selector))
                        .ok_or_else(|| anyhow!("parent `{parent}` of `{}` not found", element.id))?
                }
                None => pickers.document(|doc| doc.body()),
            };
            pickers.document_mut(|doc| {
                let node = doc.create_element(&element.tag);
                doc.set_attr(node, "id", &element.id);
                for class in &element.class {
                    doc.set_class(node, class, true);
                }
                doc.append_child(parent, node);
            });
            debug!(id = %element.id, tag = %element.tag, "created host element");
        }

        self.pickers
            .iter()
            .enumerate()
            .map(|(idx, spec)| {
                let options = decorate(idx, spec.to_options()?);
                pickers
                    .create(spec.target.as_str(), options)
                    .with_context(|| format!("failed to create picker on {}", spec.target))
            })
            .collect()
    }
}

/// `DATEPICK_TIMEZONE`, then the file's `timezone`, then UTC.
pub fn resolve_timezone(from_file: Option<&str>) -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR)
        && let Some(tz) = date::parse_timezone(&raw, TIMEZONE_ENV_VAR)
    {
        return tz;
    }
    if let Some(raw) = from_file
        && let Some(tz) = date::parse_timezone(raw, "picker file")
    {
        return tz;
    }
    chrono_tz::UTC
}
