#![allow(dead_code)]

use proptest::prelude::*;
use stride_core::date::CalendarDate;
use stride_core::model::{CompletionEvent, DependencyEdge, Task};

/// Days are drawn from a fixed two-month window so gaps and runs both show up.
pub const WINDOW_DAYS: u32 = 60;

pub fn base_date() -> CalendarDate {
    CalendarDate::from_ymd(2024, 1, 1).expect("valid base date")
}

pub fn day(offset: u32) -> CalendarDate {
    let mut date = base_date();
    for _ in 0..offset {
        date = date.succ().expect("date in range");
    }
    date
}

pub fn arb_day() -> impl Strategy<Value = CalendarDate> {
    (0..WINDOW_DAYS).prop_map(day)
}

pub fn arb_events() -> impl Strategy<Value = Vec<CompletionEvent>> {
    prop::collection::vec(arb_day(), 0..40).prop_map(|days| {
        days.into_iter()
            .map(|date| CompletionEvent::new("h", date))
            .collect()
    })
}

pub fn task_name(i: usize) -> String {
    format!("t{i}")
}

/// Tasks `t0..tn` with random completion flags.
pub fn arb_tasks(max: usize) -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(any::<bool>(), 1..=max).prop_map(|flags| {
        flags
            .into_iter()
            .enumerate()
            .map(|(i, done)| Task::new(task_name(i), done))
            .collect()
    })
}

/// Candidate edges between `t0..t(max-1)`, self-loops and cycles included.
pub fn arb_edges(max: usize) -> impl Strategy<Value = Vec<DependencyEdge>> {
    prop::collection::vec((0..max, 0..max), 0..(max * 2)).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(a, b)| DependencyEdge::new(task_name(a), task_name(b)))
            .collect()
    })
}
