use std::cell::RefCell;
use std::rc::Rc;

use chrono::{Datelike, NaiveDate};
use datepick_core::dom::class;
use datepick_core::{
    Clock, Datepickers, Document, DomEvent, Error, Key, NodeId, Options, Picker, Trigger,
    TriggerType,
};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn page() -> Datepickers {
    Datepickers::new().with_clock(Clock::Fixed(ymd(2023, 2, 14)))
}

fn add_input(pickers: &Datepickers, id: &str) -> NodeId {
    pickers.document_mut(|doc| {
        let body = doc.body();
        let input = doc.create_element("input");
        doc.set_attr(input, "id", id);
        doc.append_child(body, input);
        input
    })
}

fn day(picker: &Picker, n: u32) -> NodeId {
    picker
        .day_cell(n)
        .expect("live picker")
        .expect("day in pool")
}

#[test]
fn clicking_a_day_selects_and_hides() {
    let pickers = page();
    let input = add_input(&pickers, "when");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let picker = pickers
        .create(
            "#when",
            Options::default().on_select(move |e| {
                log.borrow_mut()
                    .push((e.trigger, e.trigger_type, e.prev_date, e.new_date));
            }),
        )
        .expect("create");

    pickers.click(input);
    assert!(picker.is_calendar_showing().expect("showing"));

    pickers.click(day(&picker, 5));
    assert_eq!(picker.selected_date().expect("selected"), Some(ymd(2023, 2, 5)));
    assert_eq!(pickers.document(|doc| doc.value(input).to_string()), "Sun Feb 05 2023");
    assert!(picker
        .day_classes(5)
        .expect("classes")
        .contains(class::SELECTED));
    assert!(!picker.is_calendar_showing().expect("hidden"));
    assert_eq!(
        *seen.borrow(),
        vec![(Trigger::DayClick, TriggerType::User, None, Some(ymd(2023, 2, 5)))]
    );
}

#[test]
fn clicking_the_selected_day_deselects() {
    let pickers = page();
    let picker = pickers
        .create(
            "body",
            Options {
                selected_date: Some(ymd(2023, 2, 8)),
                always_show: true,
                ..Options::default()
            },
        )
        .expect("create");

    pickers.click(day(&picker, 8));
    assert_eq!(picker.selected_date().expect("selected"), None);
    assert!(!picker
        .day_classes(8)
        .expect("classes")
        .contains(class::SELECTED));
    assert!(picker.is_calendar_showing().expect("always shown"));
}

#[test]
fn inverted_bounds_are_rejected_without_mutation() {
    let pickers = page();
    let picker = pickers.create("body", Options::default()).expect("create");

    picker.set_min(Some(ymd(2023, 2, 10))).expect("set min");
    let err = picker.set_max(Some(ymd(2023, 2, 5))).err();
    assert_eq!(
        err,
        Some(Error::BoundOrder {
            min: ymd(2023, 2, 10),
            max: ymd(2023, 2, 5),
        })
    );
    assert_eq!(picker.max_date().expect("max"), None);
    assert_eq!(picker.min_date().expect("min"), Some(ymd(2023, 2, 10)));
    assert!(picker.day_classes(9).expect("classes").contains(class::DISABLED));
    assert!(!picker.day_classes(10).expect("classes").contains(class::DISABLED));
}

#[test]
fn min_after_max_fails_construction() {
    let pickers = page();
    let err = pickers
        .create(
            "body",
            Options {
                min_date: Some(ymd(2023, 3, 1)),
                max_date: Some(ymd(2023, 2, 1)),
                ..Options::default()
            },
        )
        .err()
        .expect("rejected");
    assert!(err.is_construction());
    assert!(pickers.is_empty());
}

#[test]
fn tightening_a_bound_clears_an_out_of_range_selection() {
    let pickers = page();
    let cleared = Rc::new(RefCell::new(Vec::new()));
    let log = cleared.clone();
    let picker = pickers
        .create(
            "body",
            Options {
                selected_date: Some(ymd(2023, 2, 3)),
                ..Options::default()
            }
            .on_select(move |e| log.borrow_mut().push((e.trigger, e.prev_date, e.new_date))),
        )
        .expect("create");

    picker.set_min(Some(ymd(2023, 2, 10))).expect("set min");
    assert_eq!(picker.selected_date().expect("selected"), None);
    assert_eq!(
        *cleared.borrow(),
        vec![(Trigger::SetMin, Some(ymd(2023, 2, 3)), None)]
    );
}

#[test]
fn weekends_cannot_be_clicked_when_disabled() {
    let pickers = page();
    let fired = Rc::new(RefCell::new(0));
    let count = fired.clone();
    let picker = pickers
        .create(
            "body",
            Options {
                no_weekends: true,
                ..Options::default()
            }
            .on_select(move |_| *count.borrow_mut() += 1),
        )
        .expect("create");

    // 2023-02-04 is a Saturday.
    pickers.click(day(&picker, 4));
    assert_eq!(picker.selected_date().expect("selected"), None);
    assert_eq!(*fired.borrow(), 0);

    picker.select_date(Some(ymd(2023, 2, 5)), false).expect("select");
    assert_eq!(picker.selected_date().expect("selected"), None);
    assert!(picker.day_classes(4).expect("classes").contains(class::WEEKEND));
    assert!(picker.day_classes(4).expect("classes").contains(class::DISABLED));
}

#[test]
fn month_change_fires_once_per_real_change() {
    let pickers = page();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let log = changes.clone();
    let picker = pickers
        .create(
            "body",
            Options::default().on_month_change(move |e| {
                log.borrow_mut().push((e.trigger, e.prev_date, e.new_date))
            }),
        )
        .expect("create");

    let (_, _, _, next) = picker.controls().expect("controls");
    pickers.click(next);
    assert_eq!(picker.current_date().expect("current"), ymd(2023, 3, 1));
    assert_eq!(picker.month_label().expect("label"), "March");

    picker.navigate(ymd(2023, 3, 20)).expect("same month");
    assert_eq!(
        *changes.borrow(),
        vec![(Trigger::ArrowClick, ymd(2023, 2, 1), ymd(2023, 3, 1))]
    );
}

#[test]
fn the_last_month_of_the_calendar_renders_and_stops() {
    let pickers = page();
    let changes = Rc::new(RefCell::new(0));
    let log = changes.clone();
    let picker = pickers
        .create(
            "body",
            Options::default().on_month_change(move |_| *log.borrow_mut() += 1),
        )
        .expect("create");

    picker.select_date(Some(NaiveDate::MAX), true).expect("select");
    let last = picker.current_date().expect("current");
    assert_eq!(last.month(), 12);
    let selected = picker.day_classes(31).expect("classes");
    assert!(selected.contains(class::SELECTED));
    assert!(!selected.contains(class::HIDDEN));
    assert!(!picker.day_classes(2).expect("classes").contains(class::HIDDEN));
    assert_eq!(*changes.borrow(), 1);

    let (_, _, _, next) = picker.controls().expect("controls");
    pickers.click(next);
    assert_eq!(picker.current_date().expect("current"), last);
    assert_eq!(picker.selected_date().expect("selected"), Some(NaiveDate::MAX));
    assert_eq!(*changes.borrow(), 1);
}

#[test]
fn select_with_change_calendar_reports_month_then_select() {
    let pickers = page();
    let order = Rc::new(RefCell::new(Vec::new()));
    let (months, selects) = (order.clone(), order.clone());
    let picker = pickers
        .create(
            "body",
            Options::default()
                .on_month_change(move |_| months.borrow_mut().push("month"))
                .on_select(move |_| selects.borrow_mut().push("select")),
        )
        .expect("create");

    picker.select_date(Some(ymd(2024, 7, 4)), true).expect("select");
    assert_eq!(picker.current_date().expect("current"), ymd(2024, 7, 1));
    assert_eq!(*order.borrow(), vec!["month", "select"]);
}

#[test]
fn render_is_idempotent() {
    let pickers = Datepickers::with_document(Document::with_mutation_log())
        .with_clock(Clock::Fixed(ymd(2023, 2, 14)));
    let picker = pickers
        .create(
            "body",
            Options {
                selected_date: Some(ymd(2023, 2, 20)),
                events: vec![ymd(2023, 2, 22)],
                ..Options::default()
            },
        )
        .expect("create");
    assert!(!pickers.take_mutations().is_empty());
    let before = picker.cell_classes().expect("classes");

    picker.render().expect("render");
    assert!(pickers.take_mutations().is_empty());
    assert_eq!(picker.cell_classes().expect("classes"), before);
    assert!(picker.day_classes(22).expect("classes").contains(class::EVENT));
    assert!(picker.day_classes(14).expect("classes").contains(class::TODAY));
}

#[test]
fn removed_picker_refuses_every_operation() {
    let pickers = page();
    let picker = pickers.create("body", Options::default()).expect("create");
    let container = picker.calendar_container().expect("container");

    let done = Rc::new(RefCell::new(false));
    let flag = done.clone();
    picker.remove_with(move || *flag.borrow_mut() = true).expect("remove");
    assert!(*done.borrow());
    assert!(!pickers.document(|doc| doc.is_connected(container)));
    assert!(picker.is_removed());

    let gone = Some(Error::Removed);
    assert_eq!(picker.current_date().err(), gone);
    assert_eq!(picker.selected_date().err(), gone);
    assert_eq!(picker.min_date().err(), gone);
    assert_eq!(picker.max_date().err(), gone);
    assert_eq!(picker.effective_bounds().err(), gone);
    assert_eq!(picker.disabled_dates().err(), gone);
    assert_eq!(picker.no_weekends().err(), gone);
    assert_eq!(picker.always_show().err(), gone);
    assert_eq!(picker.is_calendar_showing().err(), gone);
    assert_eq!(picker.is_overlay_showing().err(), gone);
    assert_eq!(picker.is_disabled(ymd(2023, 2, 1)).err(), gone);
    assert_eq!(picker.calendar_container().err(), gone);
    assert_eq!(picker.input().err(), gone);
    assert!(picker.snapshot().is_err_and(|e| e == Error::Removed));
    assert_eq!(picker.day_cell(1).err(), gone);
    assert_eq!(picker.cells().err(), gone);
    assert_eq!(picker.controls().err(), gone);
    assert_eq!(picker.month_label().err(), gone);

    assert_eq!(picker.render().err(), gone);
    assert_eq!(picker.navigate(ymd(2023, 5, 1)).err(), gone);
    assert_eq!(picker.select_date(Some(ymd(2023, 2, 5)), true).err(), gone);
    assert_eq!(picker.set_min(Some(ymd(2023, 2, 1))).err(), gone);
    assert_eq!(picker.set_max(None).err(), gone);
    assert_eq!(picker.show().err(), gone);
    assert_eq!(picker.hide().err(), gone);
    assert_eq!(picker.toggle_calendar().err(), gone);
    assert_eq!(picker.toggle_overlay().err(), gone);
    assert_eq!(picker.remove().err(), gone);

    // Range-only members report the removal, not a missing pair.
    assert_eq!(picker.id().err(), gone);
    assert_eq!(picker.is_first().err(), gone);
    assert_eq!(picker.is_paired().err(), gone);
    assert_eq!(picker.sibling().err(), gone);
    assert_eq!(picker.get_range().err(), gone);
    assert_eq!(picker.remove_pair().err(), gone);
    assert!(pickers.picker_for(pickers.document(|doc| doc.body())).is_none());
}

#[test]
fn create_remove_cycles_do_not_grow_the_document() {
    let pickers = page();
    let baseline = pickers.document(|doc| doc.node_count());

    for _ in 0..50 {
        let picker = pickers.create("body", Options::default()).expect("create");
        picker.navigate(ymd(2024, 1, 1)).expect("navigate");
        picker.remove().expect("remove");
    }
    assert_eq!(pickers.document(|doc| doc.node_count()), baseline);

    let picker = pickers.create("body", Options::default()).expect("create");
    for month in 1..=12 {
        picker.navigate(ymd(2024, month, 1)).expect("navigate");
    }
    assert_eq!(pickers.document(|doc| doc.pending_mutations()), 0);
}

#[test]
fn visibility_state_machine() {
    let pickers = page();
    let events = Rc::new(RefCell::new(Vec::new()));
    let (shown, hidden) = (events.clone(), events.clone());
    let picker = pickers
        .create(
            "body",
            Options::default()
                .on_show(move |e| shown.borrow_mut().push(("show", e.trigger)))
                .on_hide(move |e| hidden.borrow_mut().push(("hide", e.trigger))),
        )
        .expect("create");
    let container = picker.calendar_container().expect("container");
    assert!(pickers.document(|doc| doc.has_class(container, class::HIDDEN)));

    picker.show().expect("show");
    picker.show().expect("show again");
    assert!(!pickers.document(|doc| doc.has_class(container, class::HIDDEN)));
    picker.toggle_calendar().expect("toggle");
    picker.hide().expect("hide again");

    assert_eq!(
        *events.borrow(),
        vec![("show", Trigger::Show), ("hide", Trigger::ToggleCalendar)]
    );
}

#[test]
fn always_show_ignores_hide() {
    let pickers = page();
    let picker = pickers
        .create(
            "body",
            Options {
                always_show: true,
                ..Options::default()
            },
        )
        .expect("create");
    picker.hide().expect("hide");
    assert!(picker.is_calendar_showing().expect("showing"));
}

#[test]
fn outside_click_hides_open_pickers() {
    let pickers = page();
    let a = add_input(&pickers, "a");
    let b = add_input(&pickers, "b");
    let first = pickers.create(a, Options::default()).expect("first");
    let second = pickers.create(b, Options::default()).expect("second");

    pickers.click(a);
    pickers.click(b);
    assert!(!first.is_calendar_showing().expect("first"));
    assert!(second.is_calendar_showing().expect("second"));

    let body = pickers.document(|doc| doc.body());
    pickers.click(body);
    assert!(!second.is_calendar_showing().expect("second"));
}

#[test]
fn escape_closes_overlay_then_calendar() {
    let pickers = page();
    let picker = pickers.create("body", Options::default()).expect("create");
    picker.show().expect("show");
    picker.toggle_overlay().expect("overlay");
    let target = picker.overlay_input().expect("input");

    pickers.dispatch(DomEvent::KeyDown {
        target,
        key: Key::Escape,
    });
    assert!(!picker.is_overlay_showing().expect("overlay"));
    assert!(picker.is_calendar_showing().expect("calendar"));

    pickers.dispatch(DomEvent::KeyDown {
        target: picker.calendar_container().expect("container"),
        key: Key::from_name("Escape"),
    });
    assert!(!picker.is_calendar_showing().expect("calendar"));
}

#[test]
fn overlay_jumps_to_typed_year_and_month() {
    let pickers = page();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let log = changes.clone();
    let picker = pickers
        .create(
            "body",
            Options::default().on_month_change(move |e| log.borrow_mut().push(e.trigger)),
        )
        .expect("create");
    picker.show().expect("show");

    let (_, month, _, _) = picker.controls().expect("controls");
    pickers.click(month);
    assert!(picker.is_overlay_showing().expect("overlay"));

    // Arrows are inert while the overlay is up.
    let (prev, _, _, _) = picker.controls().expect("controls");
    pickers.click(prev);
    assert_eq!(picker.current_date().expect("current"), ymd(2023, 2, 1));

    let input = picker.overlay_input().expect("input");
    let submit = picker.overlay_submit().expect("submit");
    pickers.dispatch(DomEvent::Input {
        target: input,
        text: "20".into(),
    });
    assert!(pickers.document(|doc| doc.has_class(submit, class::DISABLED)));
    pickers.dispatch(DomEvent::Input {
        target: input,
        text: "2025x9".into(),
    });
    assert!(!pickers.document(|doc| doc.has_class(submit, class::DISABLED)));
    assert_eq!(pickers.document(|doc| doc.value(input).to_string()), "2025");

    let june = picker.overlay_month(6).expect("live").expect("june");
    pickers.click(june);
    assert_eq!(picker.current_date().expect("current"), ymd(2025, 6, 1));
    assert!(!picker.is_overlay_showing().expect("overlay"));
    assert_eq!(picker.year_label().expect("year"), "2025");
    assert_eq!(*changes.borrow(), vec![Trigger::OverlayMonthClick]);
}

#[test]
fn enter_submits_the_overlay_year() {
    let pickers = page();
    let picker = pickers.create("body", Options::default()).expect("create");
    picker.show().expect("show");
    picker.toggle_overlay().expect("overlay");
    let input = picker.overlay_input().expect("input");

    pickers.dispatch(DomEvent::Input {
        target: input,
        text: "1999".into(),
    });
    pickers.dispatch(DomEvent::KeyDown {
        target: input,
        key: Key::Enter,
    });
    assert_eq!(picker.current_date().expect("current"), ymd(1999, 2, 1));
    assert!(!picker.is_overlay_showing().expect("overlay"));
}

#[test]
fn disabled_year_overlay_stays_closed() {
    let pickers = page();
    let picker = pickers
        .create(
            "body",
            Options {
                always_show: true,
                disable_year_overlay: true,
                ..Options::default()
            },
        )
        .expect("create");
    let (_, _, year, _) = picker.controls().expect("controls");
    pickers.click(year);
    picker.toggle_overlay().expect("toggle");
    assert!(!picker.is_overlay_showing().expect("overlay"));
}

#[test]
fn element_takes_one_picker() {
    let pickers = page();
    let input = add_input(&pickers, "once");
    pickers.create(input, Options::default()).expect("first");
    assert_eq!(
        pickers.create("#once", Options::default()).err(),
        Some(Error::AlreadyAttached)
    );
    assert_eq!(pickers.len(), 1);
}

#[test]
fn callbacks_may_reenter_the_picker() {
    let pickers = page();
    let picker = pickers
        .create(
            "body",
            Options::default().on_select(|e| {
                if let Some(date) = e.new_date {
                    e.instance.navigate(date).expect("navigate from callback");
                }
            }),
        )
        .expect("create");

    picker.select_date(Some(ymd(2023, 9, 9)), false).expect("select");
    assert_eq!(picker.current_date().expect("current"), ymd(2023, 9, 1));
}

#[test]
fn custom_start_day_and_labels() {
    let pickers = page();
    let picker = pickers
        .create(
            "body",
            Options {
                start_day: 1,
                custom_months: Some(
                    [
                        "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct",
                        "Nov", "Dic",
                    ]
                    .map(String::from)
                    .to_vec(),
                ),
                ..Options::default()
            },
        )
        .expect("create");
    assert_eq!(picker.month_label().expect("label"), "Feb");

    // February 2023 starts on a Wednesday: two leading slots with a Monday start.
    let cells = picker.cell_classes().expect("classes");
    let empty = cells
        .values()
        .filter(|c| c.contains(class::EMPTY) && !c.contains(class::HIDDEN))
        .count();
    assert_eq!(empty, 2);

    let err = pickers
        .create(
            "#nothing-here",
            Options {
                custom_days: Some(vec!["Mo".into()]),
                ..Options::default()
            },
        )
        .err();
    assert_eq!(err, Some(Error::SelectorNotFound("#nothing-here".into())));
}
