//! Graph executor
//!
//! Runs every ready node of a [`TaskGraph`] on its own scoped thread and
//! unlocks dependents as completions arrive. A failed node marks all of its
//! transitive dependents as skipped; independent branches keep running.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{Context, NodeId, TaskGraph, TaskKind};
use crate::ui;
use crossbeam::channel;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

/// Final state of one node
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeeded(Duration),
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Pending,
    Running,
    Done(Outcome),
}

/// Per-node results of a run, in graph order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<(TaskKind, Outcome)>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, outcome)| matches!(outcome, Outcome::Succeeded(_)))
    }

    pub fn failed(&self) -> Vec<TaskKind> {
        self.filter(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn skipped(&self) -> Vec<TaskKind> {
        self.filter(|o| matches!(o, Outcome::Skipped))
    }

    pub fn succeeded(&self) -> Vec<TaskKind> {
        self.filter(|o| matches!(o, Outcome::Succeeded(_)))
    }

    fn filter(&self, keep: impl Fn(&Outcome) -> bool) -> Vec<TaskKind> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| keep(outcome))
            .map(|(task, _)| *task)
            .collect()
    }

    /// Convert into an error when anything failed or was skipped
    pub fn into_result(self) -> ExecutionResult<RunReport> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ExecutionError::TasksFailed {
                failed: self.failed().len(),
                skipped: self.skipped().len(),
            })
        }
    }
}

/// Executes task graphs within a context
pub struct Executor<'a> {
    ctx: &'a Context,
}

impl<'a> Executor<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Executor { ctx }
    }

    /// Run `graph`, calling `run` for every node whose dependencies succeeded
    pub fn run<F>(&self, graph: &TaskGraph, run: F) -> RunReport
    where
        F: Fn(TaskKind) -> ExecutionResult<()> + Sync,
    {
        let mut states = vec![State::Pending; graph.len()];
        let mut remaining: Vec<usize> = (0..graph.len())
            .map(|id| graph.dependencies(id).len())
            .collect();
        let run = &run;

        thread::scope(|scope| {
            let (done_tx, done_rx) = channel::unbounded::<(NodeId, Outcome)>();
            let mut running = 0usize;

            let spawn = |id: NodeId, states: &mut Vec<State>, running: &mut usize| {
                states[id] = State::Running;
                *running += 1;
                let tx = done_tx.clone();
                let task = graph.task(id);
                scope.spawn(move || {
                    let started = Instant::now();
                    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| run(task))) {
                        Ok(Ok(())) => Outcome::Succeeded(started.elapsed()),
                        Ok(Err(e)) => Outcome::Failed(e.to_string()),
                        Err(_) => Outcome::Failed(ExecutionError::Panicked(task.to_string()).to_string()),
                    };
                    let _ = tx.send((id, outcome));
                });
            };

            for id in graph.roots() {
                spawn(id, &mut states, &mut running);
            }

            while running > 0 {
                let Ok((id, outcome)) = done_rx.recv() else {
                    break;
                };
                running -= 1;

                match &outcome {
                    Outcome::Failed(message) => {
                        self.ctx.print_error(&format!(
                            "{} failed: {}",
                            ui::task(graph.task(id).name()),
                            message
                        ));
                        for blocked in graph.downstream(id) {
                            if states[blocked] == State::Pending {
                                self.ctx.print_task_skip(
                                    graph.task(blocked).name(),
                                    &format!("'{}' failed", graph.task(id)),
                                );
                                states[blocked] = State::Done(Outcome::Skipped);
                            }
                        }
                    }
                    _ => {
                        for &next in graph.dependents(id) {
                            remaining[next] -= 1;
                            if remaining[next] == 0 && states[next] == State::Pending {
                                spawn(next, &mut states, &mut running);
                            }
                        }
                    }
                }

                states[id] = State::Done(outcome);
            }
        });

        RunReport {
            outcomes: states
                .into_iter()
                .enumerate()
                .map(|(id, state)| {
                    let outcome = match state {
                        State::Done(outcome) => outcome,
                        State::Pending | State::Running => Outcome::Skipped,
                    };
                    (graph.task(id), outcome)
                })
                .collect(),
        }
    }
}
