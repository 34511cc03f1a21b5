use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use datepick_core::dom::class;
use datepick_core::{Clock, DateRange, Datepickers, Error, NodeId, Options, PairId, Picker};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn range_page(first: Options, second: Options) -> (Datepickers, Picker, Picker) {
    let pickers = Datepickers::new().with_clock(Clock::Fixed(ymd(2023, 2, 1)));
    let (start, end) = pickers.document_mut(|doc| {
        let body = doc.body();
        let start = doc.create_element("input");
        let end = doc.create_element("input");
        doc.append_child(body, start);
        doc.append_child(body, end);
        (start, end)
    });
    let first = pickers
        .create(
            start,
            Options {
                id: Some(PairId(1)),
                ..first
            },
        )
        .expect("first");
    let second = pickers
        .create(
            end,
            Options {
                id: Some(PairId(1)),
                ..second
            },
        )
        .expect("second");
    (pickers, first, second)
}

#[test]
fn siblings_point_at_each_other() {
    let (_pickers, first, second) = range_page(Options::default(), Options::default());

    assert_eq!(first.sibling().expect("sibling"), second);
    assert_eq!(second.sibling().expect("sibling"), first);
    assert!(first.is_first().expect("first"));
    assert!(!second.is_first().expect("second"));
    assert_eq!(first.id().expect("id"), second.id().expect("id"));
}

#[test]
fn first_selection_floors_the_second_side() {
    let (_pickers, first, second) = range_page(Options::default(), Options::default());

    first.select_date(Some(ymd(2023, 2, 15)), false).expect("select");
    assert_eq!(second.min_date().expect("min"), None);
    assert_eq!(
        second.effective_bounds().expect("bounds"),
        (Some(ymd(2023, 2, 15)), None)
    );
    for n in 1..=14 {
        assert!(second.is_disabled(ymd(2023, 2, n)).expect("disabled"), "day {n}");
        assert!(second.day_classes(n).expect("classes").contains(class::DISABLED));
    }
    assert!(!second.is_disabled(ymd(2023, 2, 15)).expect("enabled"));

    second.select_date(Some(ymd(2023, 2, 10)), false).expect("noop");
    assert_eq!(second.selected_date().expect("selected"), None);
}

#[test]
fn second_selection_caps_the_first_side() {
    let (pickers, first, second) = range_page(Options::default(), Options::default());

    let cell: NodeId = second.day_cell(20).expect("live").expect("cell");
    pickers.click(cell);
    assert_eq!(second.selected_date().expect("selected"), Some(ymd(2023, 2, 20)));
    assert!(first.day_classes(21).expect("classes").contains(class::DISABLED));
    assert!(!first.day_classes(20).expect("classes").contains(class::DISABLED));
}

#[test]
fn range_classes_mark_both_calendars() {
    let (_pickers, first, second) = range_page(Options::default(), Options::default());
    first.select_date(Some(ymd(2023, 2, 6)), false).expect("start");
    second.select_date(Some(ymd(2023, 2, 9)), false).expect("end");

    let expected = DateRange {
        start: Some(ymd(2023, 2, 6)),
        end: Some(ymd(2023, 2, 9)),
    };
    assert_eq!(first.get_range().expect("range"), expected);
    assert_eq!(second.get_range().expect("range"), expected);

    for picker in [&first, &second] {
        assert!(picker.day_classes(6).expect("classes").contains(class::RANGE_START));
        assert!(picker.day_classes(7).expect("classes").contains(class::RANGE_MIDDLE));
        assert!(picker.day_classes(8).expect("classes").contains(class::RANGE_MIDDLE));
        assert!(picker.day_classes(9).expect("classes").contains(class::RANGE_END));
        assert!(!picker.day_classes(10).expect("classes").contains(class::RANGE_MIDDLE));
    }
}

#[test]
fn one_day_range_has_no_halo() {
    let (_pickers, first, second) = range_page(Options::default(), Options::default());
    first.select_date(Some(ymd(2023, 2, 6)), false).expect("start");
    second.select_date(Some(ymd(2023, 2, 6)), false).expect("end");

    let classes = first.day_classes(6).expect("classes");
    assert!(classes.contains(class::SELECTED));
    assert!(!classes.contains(class::RANGE_START));
    assert!(!classes.contains(class::RANGE_END));
}

#[test]
fn bounds_are_shared_across_the_pair() {
    let (_pickers, first, second) = range_page(
        Options {
            min_date: Some(ymd(2023, 2, 3)),
            ..Options::default()
        },
        Options::default(),
    );
    assert_eq!(second.min_date().expect("inherited"), Some(ymd(2023, 2, 3)));

    second.set_max(Some(ymd(2023, 2, 25))).expect("max");
    assert_eq!(first.max_date().expect("max"), Some(ymd(2023, 2, 25)));
}

#[test]
fn a_tighter_bound_clears_only_the_side_it_excludes() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let (on_first, on_second) = (events.clone(), events.clone());
    let (_pickers, first, second) = range_page(
        Options::default().on_select(move |e| {
            on_first.borrow_mut().push(("first", e.prev_date, e.new_date))
        }),
        Options::default().on_select(move |e| {
            on_second.borrow_mut().push(("second", e.prev_date, e.new_date))
        }),
    );
    first.select_date(Some(ymd(2023, 2, 15)), false).expect("first");
    second.select_date(Some(ymd(2023, 2, 20)), false).expect("second");
    events.borrow_mut().clear();

    first.set_max(Some(ymd(2023, 2, 18))).expect("max");

    assert_eq!(first.selected_date().expect("first"), Some(ymd(2023, 2, 15)));
    assert_eq!(second.selected_date().expect("second"), None);
    assert_eq!(second.max_date().expect("shared"), Some(ymd(2023, 2, 18)));
    assert_eq!(*events.borrow(), vec![("second", Some(ymd(2023, 2, 20)), None)]);
    assert_eq!(
        first.get_range().expect("range"),
        DateRange {
            start: Some(ymd(2023, 2, 15)),
            end: None,
        }
    );
    assert!(second.day_classes(19).expect("classes").contains(class::DISABLED));
    assert!(!second.day_classes(20).expect("classes").contains(class::SELECTED));
}

#[test]
fn third_picker_cannot_join_a_full_pair() {
    let (pickers, _first, _second) = range_page(Options::default(), Options::default());
    let err = pickers
        .create(
            "body",
            Options {
                id: Some(PairId(1)),
                ..Options::default()
            },
        )
        .err();
    assert_eq!(err, Some(Error::PairFull(1)));
    assert_eq!(pickers.len(), 2);
}

#[test]
fn removing_one_side_leaves_a_plain_picker() {
    let (pickers, first, second) = range_page(Options::default(), Options::default());
    first.select_date(Some(ymd(2023, 2, 15)), false).expect("select");
    first.remove().expect("remove");

    assert_eq!(first.get_range(), Err(Error::Removed));
    assert_eq!(first.id(), Err(Error::Removed));
    assert_eq!(first.sibling().err(), Some(Error::Removed));
    assert_eq!(first.remove_pair(), Err(Error::Removed));
    assert!(!second.is_paired().expect("paired"));
    assert_eq!(second.sibling(), Err(Error::NotPaired));
    assert_eq!(second.get_range(), Err(Error::NotPaired));

    // The survivor's nodes keep the old floor until it renders again.
    assert!(second.day_classes(2).expect("classes").contains(class::DISABLED));
    assert!(!second.is_disabled(ymd(2023, 2, 2)).expect("enabled"));
    second.render().expect("render");
    assert!(!second.day_classes(2).expect("classes").contains(class::DISABLED));

    // The old floor from the removed side no longer applies.
    second.select_date(Some(ymd(2023, 2, 2)), false).expect("select");
    assert_eq!(second.selected_date().expect("selected"), Some(ymd(2023, 2, 2)));

    // The id is free again.
    let third = pickers
        .create(
            "body",
            Options {
                id: Some(PairId(1)),
                ..Options::default()
            },
        )
        .expect("reuse id");
    assert!(third.is_first().expect("first"));
}

#[test]
fn remove_pair_takes_both_sides() {
    let (pickers, first, second) = range_page(Options::default(), Options::default());
    let done = Rc::new(RefCell::new(0));
    let count = done.clone();
    second
        .remove_pair_with(move || *count.borrow_mut() += 1)
        .expect("remove pair");

    assert_eq!(*done.borrow(), 1);
    assert!(first.is_removed());
    assert!(second.is_removed());
    assert!(pickers.is_empty());
    assert!(!pickers.has_document_listener());
}

#[test]
fn plain_pickers_have_no_range_api() {
    let pickers = Datepickers::new().with_clock(Clock::Fixed(ymd(2023, 2, 1)));
    let picker = pickers.create("body", Options::default()).expect("create");
    assert_eq!(picker.sibling(), Err(Error::NotPaired));
    assert_eq!(picker.id(), Err(Error::NotPaired));
    assert_eq!(picker.remove_pair(), Err(Error::NotPaired));
    assert!(!picker.is_removed());
}
