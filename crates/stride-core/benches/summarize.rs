use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use stride_core::aggregate::{Snapshot, TaskBoard, summarize_snapshot};
use stride_core::config::EngineConfig;
use stride_core::date::CalendarDate;
use stride_core::graph::CyclePolicy;
use stride_core::model::{CompletionEvent, DependencyEdge, Habit, HabitId, Task, TaskId};

struct Tier {
    name: &'static str,
    habits: usize,
    days: usize,
    tasks: usize,
}

const TIERS: [Tier; 3] = [
    Tier {
        name: "small",
        habits: 5,
        days: 30,
        tasks: 50,
    },
    Tier {
        name: "medium",
        habits: 20,
        days: 365,
        tasks: 500,
    },
    Tier {
        name: "large",
        habits: 50,
        days: 1_000,
        tasks: 5_000,
    },
];

fn base() -> CalendarDate {
    CalendarDate::from_ymd(2022, 1, 1).expect("valid date")
}

fn build_snapshot(tier: &Tier) -> (Snapshot, CalendarDate) {
    let mut dates = Vec::with_capacity(tier.days);
    let mut date = base();
    for _ in 0..tier.days {
        dates.push(date);
        date = date.succ().expect("in range");
    }
    let as_of = *dates.last().expect("at least one day");

    let habits: Vec<Habit> = (0..tier.habits)
        .map(|h| Habit {
            id: HabitId::new(format!("h{h}")),
            goal_id: None,
        })
        .collect();

    // Each habit skips every (h + 2)-th day so runs have varied lengths.
    let events: Vec<CompletionEvent> = (0..tier.habits)
        .flat_map(|h| {
            dates
                .iter()
                .enumerate()
                .filter(move |(i, _)| i % (h + 2) != 0)
                .map(move |(_, d)| CompletionEvent::new(format!("h{h}"), *d))
        })
        .collect();

    let tasks: Vec<Task> = (0..tier.tasks)
        .map(|i| Task::new(format!("t{i}"), i % 3 == 0))
        .collect();

    // A forward-only fan-in keeps the graph acyclic.
    let edges: Vec<DependencyEdge> = (1..tier.tasks)
        .flat_map(|i| {
            [i / 2, i.saturating_sub(1)]
                .into_iter()
                .filter(move |&j| j != i)
                .map(move |j| DependencyEdge::new(format!("t{j}"), format!("t{i}")))
        })
        .collect();

    (
        Snapshot {
            habits,
            events,
            tasks,
            edges,
            goals: Vec::new(),
        },
        as_of,
    )
}

fn bench_summarize_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot.summarize");
    let config = EngineConfig::default();

    for tier in &TIERS {
        let (snapshot, as_of) = build_snapshot(tier);
        group.throughput(Throughput::Elements(
            (snapshot.events.len() + snapshot.edges.len()) as u64,
        ));
        group.bench_with_input(BenchmarkId::from_parameter(tier.name), &snapshot, |b, s| {
            b.iter(|| black_box(summarize_snapshot(s, as_of, &config)));
        });
    }

    group.finish();
}

fn bench_task_completion(c: &mut Criterion) {
    let mut group = c.benchmark_group("board.complete");

    for tier in &TIERS {
        let (snapshot, _) = build_snapshot(tier);
        let board = TaskBoard::new(&snapshot.tasks, &snapshot.edges, CyclePolicy::Reject);
        let ready = board.ready_tasks();
        let Some(target) = ready.first().cloned() else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(tier.name), &target, |b, t: &TaskId| {
            b.iter(|| {
                let mut board = board.clone();
                black_box(board.apply_task_completion(t, true).expect("ready task"))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_summarize_snapshot, bench_task_completion);
criterion_main!(benches);
