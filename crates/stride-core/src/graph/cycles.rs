//! Cycle detection for the task dependency graph.
//!
//! # Overview
//!
//! A cycle of "blocks" edges makes every task on it permanently blocked:
//! each one waits on another in the loop. [`detect_cycle_on_add`] runs before
//! an edge is inserted and returns the cycle the edge would close.
//! [`find_all_cycles`] scans a whole edge set, for stores that accepted
//! edges before cycle rejection existed.
//!
//! # Direction
//!
//! Paths follow the "blocks" direction: in `[a, b, c, a]`, `a` blocks `b`,
//! `b` blocks `c`, and `c` blocks `a`.
//!
//! # Complexity
//!
//! Both checks are a depth-first search visiting each task and edge at most
//! once: O(V+E).

#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
)]

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::dependency::DependencyGraph;
use crate::model::TaskId;

// ---------------------------------------------------------------------------
// CycleWarning
// ---------------------------------------------------------------------------

/// A dependency cycle, reported together with the edge that closes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleWarning {
    /// Tasks forming the loop in "blocks" order. The first and last entries
    /// are the same task. Adding edge B→A on top of A→B yields `[B, A, B]`.
    pub cycle_path: Vec<TaskId>,

    /// Blocking end of the closing edge.
    pub blocking: TaskId,

    /// Dependent end of the closing edge.
    pub dependent: TaskId,
}

impl CycleWarning {
    /// Number of distinct tasks in the cycle.
    pub fn cycle_len(&self) -> usize {
        self.cycle_path.len().saturating_sub(1)
    }

    pub fn is_self_loop(&self) -> bool {
        self.blocking == self.dependent
    }

    /// Two tasks blocking each other.
    pub fn is_mutual_block(&self) -> bool {
        self.cycle_len() == 2
    }
}

impl fmt::Display for CycleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_self_loop() {
            write!(
                f,
                "cycle detected: self-loop on '{}' (task blocks itself)",
                self.blocking
            )
        } else if self.is_mutual_block() {
            write!(
                f,
                "cycle detected: mutual block between '{}' and '{}'",
                self.blocking, self.dependent
            )
        } else {
            let path_display = self
                .cycle_path
                .iter()
                .map(TaskId::as_str)
                .collect::<Vec<_>>()
                .join(" → ");
            write!(
                f,
                "cycle detected ({} tasks): {}",
                self.cycle_len(),
                path_display
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Core detection
// ---------------------------------------------------------------------------

/// Would adding "`blocking` blocks `dependent`" close a cycle?
///
/// True when `dependent` already reaches `blocking` through existing
/// edges, i.e. `dependent` transitively blocks `blocking`.
pub fn detect_cycle_on_add(
    graph: &DependencyGraph,
    blocking: &TaskId,
    dependent: &TaskId,
) -> Option<CycleWarning> {
    if blocking == dependent {
        return Some(CycleWarning {
            cycle_path: vec![blocking.clone(), blocking.clone()],
            blocking: blocking.clone(),
            dependent: dependent.clone(),
        });
    }

    let mut visited: HashSet<&TaskId> = HashSet::new();
    let mut parent_map: HashMap<&TaskId, &TaskId> = HashMap::new();

    if !dfs_find_path(graph, dependent, blocking, &mut visited, &mut parent_map) {
        return None;
    }

    // Walk back from `blocking` to `dependent`, then flip into blocks order.
    let mut chain = vec![blocking];
    let mut current = blocking;
    while current != dependent {
        match parent_map.get(current) {
            Some(&parent) => {
                chain.push(parent);
                current = parent;
            }
            None => break,
        }
    }
    chain.reverse();

    let mut cycle_path = Vec::with_capacity(chain.len() + 1);
    cycle_path.push(blocking.clone());
    cycle_path.extend(chain.into_iter().cloned());

    Some(CycleWarning {
        cycle_path,
        blocking: blocking.clone(),
        dependent: dependent.clone(),
    })
}

/// Every cycle reachable in the graph, one per back edge found.
pub fn find_all_cycles(graph: &DependencyGraph) -> Vec<CycleWarning> {
    let mut warnings = Vec::new();
    let mut color: HashMap<&TaskId, Color> = HashMap::new();
    let mut parent_map: HashMap<&TaskId, &TaskId> = HashMap::new();

    let tasks = graph.task_ids();
    for &task in &tasks {
        color.insert(task, Color::White);
    }

    for &task in &tasks {
        if color.get(task) == Some(&Color::White) {
            dfs_all_cycles(graph, task, &mut color, &mut parent_map, &mut warnings);
        }
    }

    warnings
}

/// `true` as soon as any cycle is found.
pub fn has_cycles(graph: &DependencyGraph) -> bool {
    let mut color: HashMap<&TaskId, Color> = HashMap::new();

    let tasks = graph.task_ids();
    for &task in &tasks {
        color.insert(task, Color::White);
    }

    tasks.iter().any(|&task| {
        color.get(task) == Some(&Color::White) && dfs_has_cycle(graph, task, &mut color)
    })
}

// ---------------------------------------------------------------------------
// DFS internals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not yet visited.
    White,
    /// On the DFS stack.
    Gray,
    /// Fully processed.
    Black,
}

fn dfs_find_path<'a>(
    graph: &'a DependencyGraph,
    current: &'a TaskId,
    target: &TaskId,
    visited: &mut HashSet<&'a TaskId>,
    parent_map: &mut HashMap<&'a TaskId, &'a TaskId>,
) -> bool {
    if current == target {
        return true;
    }
    if !visited.insert(current) {
        return false;
    }

    for next in graph.dependent_ids(current) {
        if !visited.contains(next) {
            parent_map.insert(next, current);
            if dfs_find_path(graph, next, target, visited, parent_map) {
                return true;
            }
        }
    }

    false
}

fn dfs_all_cycles<'a>(
    graph: &'a DependencyGraph,
    node: &'a TaskId,
    color: &mut HashMap<&'a TaskId, Color>,
    parent_map: &mut HashMap<&'a TaskId, &'a TaskId>,
    warnings: &mut Vec<CycleWarning>,
) {
    color.insert(node, Color::Gray);

    for next in graph.dependent_ids(node) {
        match color.get(next) {
            Some(Color::White) => {
                parent_map.insert(next, node);
                dfs_all_cycles(graph, next, color, parent_map, warnings);
            }
            Some(Color::Gray) => {
                // Back edge: `node` blocks `next`, which is still on the stack.
                let mut chain = Vec::new();
                let mut cur = node;
                while cur != next {
                    chain.push(cur.clone());
                    match parent_map.get(cur) {
                        Some(&parent) => cur = parent,
                        None => break,
                    }
                }
                chain.reverse();

                let mut cycle_path = Vec::with_capacity(chain.len() + 2);
                cycle_path.push(next.clone());
                cycle_path.extend(chain);
                cycle_path.push(next.clone());

                warnings.push(CycleWarning {
                    cycle_path,
                    blocking: node.clone(),
                    dependent: next.clone(),
                });
            }
            _ => {}
        }
    }

    color.insert(node, Color::Black);
}

fn dfs_has_cycle<'a>(
    graph: &'a DependencyGraph,
    node: &'a TaskId,
    color: &mut HashMap<&'a TaskId, Color>,
) -> bool {
    color.insert(node, Color::Gray);

    for next in graph.dependent_ids(node) {
        match color.get(next) {
            Some(Color::White) => {
                if dfs_has_cycle(graph, next, color) {
                    return true;
                }
            }
            Some(Color::Gray) => return true,
            _ => {}
        }
    }

    color.insert(node, Color::Black);
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
