use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use anyhow::{Context, anyhow, bail};
use chrono::NaiveDate;
use datepick_core::config::PickerFile;
use datepick_core::date;
use datepick_core::{Clock, Datepickers, DomEvent, Key, Options, Picker, Trigger, TriggerType};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::text;

/// Part of a picker a `click` lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Day(u32),
    Prev,
    Next,
    Month,
    Year,
    Input,
    OverlayMonth(u32),
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select {
        picker: usize,
        date: Option<NaiveDate>,
        jump: bool,
    },
    Navigate {
        picker: usize,
        date: NaiveDate,
    },
    Min {
        picker: usize,
        date: Option<NaiveDate>,
    },
    Max {
        picker: usize,
        date: Option<NaiveDate>,
    },
    Show(usize),
    Hide(usize),
    Toggle(usize),
    Overlay(usize),
    Click {
        picker: usize,
        part: Part,
    },
    ClickOutside,
    Type {
        picker: usize,
        text: String,
    },
    Press {
        picker: usize,
        key: Key,
    },
    Remove(usize),
    RemovePair(usize),
    Frame,
    Print(Option<usize>),
}

fn index(raw: Option<&str>) -> anyhow::Result<usize> {
    let raw = raw.ok_or_else(|| anyhow!("missing picker index"))?;
    raw.parse()
        .with_context(|| format!("invalid picker index `{raw}`"))
}

fn date_arg(raw: Option<&str>) -> anyhow::Result<NaiveDate> {
    let raw = raw.ok_or_else(|| anyhow!("missing date"))?;
    Ok(date::parse_iso_date(raw)?)
}

fn optional_date(raw: Option<&str>) -> anyhow::Result<Option<NaiveDate>> {
    match raw {
        Some("none") => Ok(None),
        other => date_arg(other).map(Some),
    }
}

fn number(raw: Option<&str>, what: &str) -> anyhow::Result<u32> {
    let raw = raw.ok_or_else(|| anyhow!("missing {what}"))?;
    raw.parse()
        .with_context(|| format!("invalid {what} `{raw}`"))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| anyhow!("empty command"))?;
        let command = match verb {
            "select" => {
                let picker = index(words.next())?;
                let date = optional_date(words.next())?;
                let jump = match words.next() {
                    None => false,
                    Some("jump") => true,
                    Some(other) => bail!("expected `jump`, got `{other}`"),
                };
                Command::Select { picker, date, jump }
            }
            "navigate" => Command::Navigate {
                picker: index(words.next())?,
                date: date_arg(words.next())?,
            },
            "min" => Command::Min {
                picker: index(words.next())?,
                date: optional_date(words.next())?,
            },
            "max" => Command::Max {
                picker: index(words.next())?,
                date: optional_date(words.next())?,
            },
            "show" => Command::Show(index(words.next())?),
            "hide" => Command::Hide(index(words.next())?),
            "toggle" => Command::Toggle(index(words.next())?),
            "overlay" => Command::Overlay(index(words.next())?),
            "click" => match words.next() {
                Some("outside") => Command::ClickOutside,
                raw => {
                    let picker = index(raw)?;
                    let part = match words.next() {
                        Some("day") => Part::Day(number(words.next(), "day")?),
                        Some("prev") => Part::Prev,
                        Some("next") => Part::Next,
                        Some("month") => Part::Month,
                        Some("year") => Part::Year,
                        Some("input") => Part::Input,
                        Some("overlay-month") => {
                            Part::OverlayMonth(number(words.next(), "month")?)
                        }
                        Some("submit") => Part::Submit,
                        Some(other) => bail!("unknown click target `{other}`"),
                        None => bail!("missing click target"),
                    };
                    Command::Click { picker, part }
                }
            },
            "type" => {
                let picker = index(words.next())?;
                Command::Type {
                    picker,
                    text: words.by_ref().collect::<Vec<_>>().join(" "),
                }
            }
            "press" => {
                let picker = index(words.next())?;
                let name = words.next().ok_or_else(|| anyhow!("missing key"))?;
                let key = match Key::from_name(name) {
                    Key::Other => bail!("unsupported key `{name}`"),
                    key => key,
                };
                Command::Press { picker, key }
            }
            "remove" => Command::Remove(index(words.next())?),
            "remove-pair" => Command::RemovePair(index(words.next())?),
            "frame" => Command::Frame,
            "print" => Command::Print(words.next().map(|raw| index(Some(raw))).transpose()?),
            other => bail!("unknown command `{other}`"),
        };
        if let Some(extra) = words.next() {
            bail!("unexpected argument `{extra}` after `{verb}`");
        }
        Ok(command)
    }
}

/// Parses a script: one command per line or per `;`, `#` starts a comment.
pub fn parse_script(source: &str) -> anyhow::Result<Vec<Command>> {
    source
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(|line| line.split(';'))
        .map(str::trim)
        .filter(|cmd| !cmd.is_empty())
        .map(|cmd| {
            cmd.parse::<Command>()
                .with_context(|| format!("in command `{cmd}`"))
        })
        .collect()
}

pub fn load_script(path: &Path) -> anyhow::Result<Vec<Command>> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_script(&source).with_context(|| format!("in {}", path.display()))
}

/// A notification observed while running the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventLine {
    pub picker: usize,
    pub event: &'static str,
    pub trigger: Trigger,
    pub trigger_type: TriggerType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<NaiveDate>,
}

impl std::fmt::Display for EventLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "event: picker {} {} {:?}/{:?}",
            self.picker, self.event, self.trigger, self.trigger_type
        )?;
        if self.prev.is_some() || self.new.is_some() {
            let show = |d: Option<NaiveDate>| d.map_or("-".to_string(), |d| d.to_string());
            write!(f, " {} -> {}", show(self.prev), show(self.new))?;
        }
        Ok(())
    }
}

type EventLog = Rc<RefCell<Vec<EventLine>>>;

fn observe(idx: usize, options: Options, log: &EventLog) -> Options {
    let (select, month, show, hide) = (log.clone(), log.clone(), log.clone(), log.clone());
    options
        .on_select(move |e| {
            select.borrow_mut().push(EventLine {
                picker: idx,
                event: "select",
                trigger: e.trigger,
                trigger_type: e.trigger_type,
                prev: e.prev_date,
                new: e.new_date,
            });
        })
        .on_month_change(move |e| {
            month.borrow_mut().push(EventLine {
                picker: idx,
                event: "month-change",
                trigger: e.trigger,
                trigger_type: e.trigger_type,
                prev: Some(e.prev_date),
                new: Some(e.new_date),
            });
        })
        .on_show(move |e| {
            show.borrow_mut().push(EventLine {
                picker: idx,
                event: "show",
                trigger: e.trigger,
                trigger_type: e.trigger_type,
                prev: None,
                new: None,
            });
        })
        .on_hide(move |e| {
            hide.borrow_mut().push(EventLine {
                picker: idx,
                event: "hide",
                trigger: e.trigger,
                trigger_type: e.trigger_type,
                prev: None,
                new: None,
            });
        })
}

/// A page of pickers driven by script commands.
pub struct Session {
    pickers: Datepickers,
    handles: Vec<Picker>,
    events: EventLog,
    format: OutputFormat,
}

impl Session {
    /// Builds the page described by `file`. An empty file gets one picker on
    /// the body.
    #[tracing::instrument(skip(file))]
    pub fn open(
        file: &PickerFile,
        today: Option<NaiveDate>,
        format: OutputFormat,
    ) -> anyhow::Result<Self> {
        let clock = match today {
            Some(day) => Clock::Fixed(day),
            None => file.clock()?,
        };
        let pickers = Datepickers::new().with_clock(clock);
        let events: EventLog = Rc::default();

        let handles = if file.pickers.is_empty() {
            debug!("no pickers configured, attaching one to the body");
            let options = observe(0, Options::default(), &events);
            vec![pickers.create("body", options)?]
        } else {
            file.build_with(&pickers, |idx, options| observe(idx, options, &events))?
        };
        info!(pickers = handles.len(), today = %pickers.today(), "opened session");

        Ok(Self {
            pickers,
            handles,
            events,
            format,
        })
    }

    pub fn pickers(&self) -> &Datepickers {
        &self.pickers
    }

    fn picker(&self, idx: usize) -> anyhow::Result<&Picker> {
        self.handles
            .get(idx)
            .ok_or_else(|| anyhow!("no picker at index {idx}"))
    }

    fn node_for(&self, idx: usize, part: Part) -> anyhow::Result<datepick_core::NodeId> {
        let picker = self.picker(idx)?;
        let (prev, month, year, next) = picker.controls()?;
        let node = match part {
            Part::Day(n) => picker.day_cell(n)?,
            Part::Prev => Some(prev),
            Part::Next => Some(next),
            Part::Month => Some(month),
            Part::Year => Some(year),
            Part::Input => picker.input()?,
            Part::OverlayMonth(m) => picker.overlay_month(m)?,
            Part::Submit => Some(picker.overlay_submit()?),
        };
        node.ok_or_else(|| anyhow!("picker {idx} has no {part:?}"))
    }

    pub fn execute(&self, command: &Command, out: &mut impl Write) -> anyhow::Result<()> {
        debug!(?command, "executing");
        match command {
            Command::Select { picker, date, jump } => {
                self.picker(*picker)?.select_date(*date, *jump)?
            }
            Command::Navigate { picker, date } => self.picker(*picker)?.navigate(*date)?,
            Command::Min { picker, date } => self.picker(*picker)?.set_min(*date)?,
            Command::Max { picker, date } => self.picker(*picker)?.set_max(*date)?,
            Command::Show(idx) => self.picker(*idx)?.show()?,
            Command::Hide(idx) => self.picker(*idx)?.hide()?,
            Command::Toggle(idx) => self.picker(*idx)?.toggle_calendar()?,
            Command::Overlay(idx) => self.picker(*idx)?.toggle_overlay()?,
            Command::Click { picker, part } => {
                let node = self.node_for(*picker, *part)?;
                self.pickers.click(node);
            }
            Command::ClickOutside => {
                let body = self.pickers.document(|doc| doc.body());
                self.pickers.click(body);
            }
            Command::Type { picker, text } => {
                let target = self.picker(*picker)?.overlay_input()?;
                self.pickers.dispatch(DomEvent::Input {
                    target,
                    text: text.clone(),
                });
            }
            Command::Press { picker, key } => {
                let picker = self.picker(*picker)?;
                let target = if picker.is_overlay_showing()? {
                    picker.overlay_input()?
                } else {
                    picker.calendar_container()?
                };
                self.pickers.dispatch(DomEvent::KeyDown { target, key: *key });
            }
            Command::Remove(idx) => self.picker(*idx)?.remove()?,
            Command::RemovePair(idx) => self.picker(*idx)?.remove_pair()?,
            Command::Frame => {
                let cleared = self.pickers.run_frame();
                debug!(cleared, "ran frame");
            }
            Command::Print(Some(idx)) => self.print(*idx, out)?,
            Command::Print(None) => {
                for (idx, picker) in self.handles.iter().enumerate() {
                    if !picker.is_removed() {
                        self.print(idx, out)?;
                    }
                }
            }
        }
        self.drain_events(out)
    }

    fn drain_events(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let events = std::mem::take(&mut *self.events.borrow_mut());
        for event in events {
            match self.format {
                OutputFormat::Text => writeln!(out, "{event}")?,
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&event)?)?,
            }
        }
        Ok(())
    }

    fn print(&self, idx: usize, out: &mut impl Write) -> anyhow::Result<()> {
        let picker = self.picker(idx)?;
        match self.format {
            OutputFormat::Text => writeln!(out, "{}\n", text::render_calendar(picker)?)?,
            OutputFormat::Json => {
                let snapshot = picker.snapshot()?;
                writeln!(
                    out,
                    "{}",
                    serde_json::to_string(&serde_json::json!({
                        "picker": idx,
                        "state": snapshot,
                    }))?
                )?;
            }
        }
        Ok(())
    }

    /// Runs every command, then prints every live picker.
    pub fn run(&self, commands: &[Command], out: &mut impl Write) -> anyhow::Result<()> {
        self.drain_events(out)?;
        for (n, command) in commands.iter().enumerate() {
            self.execute(command, out)
                .with_context(|| format!("command {} ({command:?}) failed", n + 1))?;
        }
        if !commands.iter().any(|c| matches!(c, Command::Print(_))) {
            self.execute(&Command::Print(None), out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn run(file: &PickerFile, script: &str, format: OutputFormat) -> anyhow::Result<String> {
        let session = Session::open(file, Some(ymd(2023, 2, 14)), format)?;
        let mut out = Vec::new();
        session.run(&parse_script(script)?, &mut out)?;
        Ok(String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn parses_commands() {
        let commands = parse_script(
            "select 0 2023-02-05 jump # jump there\nclick 1 day 4; press 0 Escape\nprint",
        )
        .expect("parse");
        assert_eq!(
            commands,
            vec![
                Command::Select {
                    picker: 0,
                    date: Some(ymd(2023, 2, 5)),
                    jump: true,
                },
                Command::Click {
                    picker: 1,
                    part: Part::Day(4),
                },
                Command::Press {
                    picker: 0,
                    key: Key::Escape,
                },
                Command::Print(None),
            ]
        );
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(parse_script("select zero 2023-02-05").is_err());
        assert!(parse_script("select 0 02/05/2023").is_err());
        assert!(parse_script("click 0 sideways").is_err());
        assert!(parse_script("press 0 Tab").is_err());
        assert!(parse_script("show 0 now").is_err());
        assert!(parse_script("teleport").is_err());
    }

    #[test]
    fn text_session_reports_events_and_calendar() {
        let out = run(
            &PickerFile::default(),
            "show 0; click 0 day 5",
            OutputFormat::Text,
        )
        .expect("run");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "event: picker 0 show Show/Imperative");
        assert_eq!(
            lines[1],
            "event: picker 0 select DayClick/User - -> 2023-02-05"
        );
        assert_eq!(lines[2], "event: picker 0 hide DayClick/User");
        assert!(out.contains("February 2023"));
        assert!(out.contains("hidden, selected 2023-02-05"));
    }

    #[test]
    fn json_session_prints_snapshots() {
        let page = PickerFile::from_toml_str(concat!(
            "[[element]]\nid = \"a\"\ntag = \"input\"\n\n",
            "[[picker]]\ntarget = \"#a\"\nno_weekends = true\n",
        ))
        .expect("page");
        let out = run(&page, "select 0 2023-02-06; print 0", OutputFormat::Json).expect("run");
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "select");
        assert_eq!(lines[0]["trigger"], "selectDate");
        assert_eq!(lines[1]["state"]["selected_date"], "2023-02-06");
        assert_eq!(lines[1]["state"]["no_weekends"], true);
    }

    #[test]
    fn failing_command_names_its_position() {
        let err = run(
            &PickerFile::default(),
            "min 0 2023-02-10; max 0 2023-02-05",
            OutputFormat::Text,
        )
        .err()
        .expect("error");
        assert!(format!("{err:#}").contains("command 2"));
    }

    #[test]
    fn removed_pickers_are_not_printed() {
        let out = run(&PickerFile::default(), "remove 0", OutputFormat::Text).expect("run");
        assert!(out.is_empty());
    }
}
