// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::warn;
use parking_lot::{Condvar, Mutex};

use graph::{CallError, Scope};

use crate::{ProgressObserver, Section};

#[derive(Default)]
struct ScopeState {
    total: usize,
    running: usize,
    completed: usize,
    failed: usize,
}

impl ScopeState {
    fn to_progress_string(&self) -> String {
        let all_done = self.completed + self.failed == self.total;
        let started = self.completed + self.failed + self.running > 0;
        let mut progress = if all_done || !started {
            format!("{} / {}", self.completed, self.total)
        } else {
            format!("({} + {}) / {}", self.completed, self.running, self.total)
        };
        if self.failed > 0 {
            let _ = write!(progress, "; {} failed", self.failed);
        }
        progress
    }
}

struct ProgressState {
    scopes: BTreeMap<(Section, Scope), ScopeState>,
    exceptions: Vec<(Scope, String)>,
    rendered_exceptions: usize,
    dirty: bool,
    stopped: bool,
}

struct Shared {
    state: Mutex<ProgressState>,
    wake: Condvar,
}

///
/// Prints progress to stdout, re-rendering at most once per
/// `min_update_interval` and at least once per `max_update_interval` while
/// anything is happening. A final render happens on stop.
///
pub struct ConsoleObserver {
    shared: Arc<Shared>,
    min_update_interval: Duration,
    max_update_interval: Duration,
    renderer: Mutex<Option<JoinHandle<()>>>,
    started_at: Instant,
}

impl ConsoleObserver {
    pub fn new() -> ConsoleObserver {
        ConsoleObserver::with_intervals(Duration::from_secs(30), Duration::from_secs(300))
    }

    pub fn with_intervals(
        min_update_interval: Duration,
        max_update_interval: Duration,
    ) -> ConsoleObserver {
        ConsoleObserver {
            shared: Arc::new(Shared {
                state: Mutex::new(ProgressState {
                    scopes: BTreeMap::new(),
                    exceptions: Vec::new(),
                    rendered_exceptions: 0,
                    dirty: false,
                    stopped: false,
                }),
                wake: Condvar::new(),
            }),
            min_update_interval,
            max_update_interval,
            renderer: Mutex::new(None),
            started_at: Instant::now(),
        }
    }

    fn update(&self, section: Section, scope: &Scope, apply: impl FnOnce(&mut ScopeState)) {
        let mut state = self.shared.state.lock();
        apply(state.scopes.entry((section, scope.clone())).or_default());
        state.dirty = true;
    }
}

impl ProgressObserver for ConsoleObserver {
    fn start(&self) {
        let shared = Arc::clone(&self.shared);
        let min_update_interval = self.min_update_interval;
        let max_update_interval = self.max_update_interval;
        let started_at = self.started_at;
        let handle = std::thread::Builder::new()
            .name("progress-render".to_owned())
            .spawn(move || {
                let mut last_render = Instant::now();
                let mut state = shared.state.lock();
                loop {
                    if state.stopped {
                        render(&mut state, started_at);
                        return;
                    }
                    let _ = shared.wake.wait_for(&mut state, min_update_interval);
                    if state.stopped {
                        render(&mut state, started_at);
                        return;
                    }
                    let due = (state.dirty && last_render.elapsed() >= min_update_interval)
                        || last_render.elapsed() >= max_update_interval;
                    if due {
                        render(&mut state, started_at);
                        last_render = Instant::now();
                    }
                }
            });
        match handle {
            Ok(handle) => *self.renderer.lock() = Some(handle),
            Err(error) => warn!("failed to spawn the progress renderer: {error}"),
        }
    }

    fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            state.stopped = true;
            self.shared.wake.notify_all();
        }
        if let Some(handle) = self.renderer.lock().take() {
            let _ = handle.join();
        }
    }

    fn increment_total(&self, section: Section, scope: &Scope, amount: usize) {
        self.update(section, scope, |entry| entry.total += amount);
    }

    fn increment_running(&self, section: Section, scope: &Scope) {
        self.update(section, scope, |entry| entry.running += 1);
    }

    fn increment_completed(&self, section: Section, scope: &Scope) {
        self.update(section, scope, |entry| {
            entry.running -= 1;
            entry.completed += 1;
        });
    }

    fn increment_failed(&self, section: Section, scope: &Scope, error: &CallError) {
        let mut message = error.to_string();
        if let Some(cause) = std::error::Error::source(error) {
            let _ = write!(message, "\n{cause}");
        }
        let mut state = self.shared.state.lock();
        let entry = state.scopes.entry((section, scope.clone())).or_default();
        entry.running -= 1;
        entry.failed += 1;
        state.exceptions.push((scope.clone(), message));
        state.dirty = true;
    }
}

impl Default for ConsoleObserver {
    fn default() -> ConsoleObserver {
        ConsoleObserver::new()
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let total_seconds = elapsed.as_secs();
    format!(
        "{}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

fn render(state: &mut ProgressState, started_at: Instant) {
    let mut output = format!(
        "jobgraph; elapsed {}; updated {}\n",
        format_elapsed(started_at.elapsed()),
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    );
    for section in [Section::Stale, Section::Run] {
        let entries: Vec<_> = state
            .scopes
            .iter()
            .filter(|((entry_section, _), _)| *entry_section == section)
            .collect();
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(output, "  {section}:");
        for ((_, scope), scope_state) in entries {
            let _ = writeln!(output, "    {}; {}", scope_state.to_progress_string(), scope);
        }
    }
    if state.rendered_exceptions < state.exceptions.len() {
        let _ = writeln!(output, "\n  new exceptions:");
        for index in state.rendered_exceptions..state.exceptions.len() {
            let (scope, message) = &state.exceptions[index];
            let _ = writeln!(output, "    exception {}; {}", index + 1, scope);
            for line in message.lines() {
                let _ = writeln!(output, "      {line}");
            }
        }
        state.rendered_exceptions = state.exceptions.len();
    }
    state.dirty = false;

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    let _ = stdout.write_all(output.as_bytes());
    let _ = stdout.flush();
}
