// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use graph::{CallError, Scope, Tag};

use crate::{CompositeObserver, ConsoleObserver, NullObserver, ProgressObserver, Section};

#[derive(Default)]
struct CountingObserver {
    starts: AtomicUsize,
    stops: AtomicUsize,
    events: AtomicUsize,
}

impl ProgressObserver for CountingObserver {
    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_total(&self, _: Section, _: &Scope, _: usize) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_running(&self, _: Section, _: &Scope) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_completed(&self, _: Section, _: &Scope) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self, _: Section, _: &Scope, _: &CallError) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn composite_fans_out_to_all_members() {
    let first = Arc::new(CountingObserver::default());
    let second = Arc::new(CountingObserver::default());
    let composite = CompositeObserver::new(vec![first.clone(), second.clone()]);

    let scope = Scope::new(vec![Tag::from("part")]);
    composite.start();
    composite.increment_total(Section::Run, &scope, 3);
    composite.increment_running(Section::Run, &scope);
    composite.increment_completed(Section::Run, &scope);
    composite.stop();

    for observer in [&first, &second] {
        assert_eq!(observer.starts.load(Ordering::SeqCst), 1);
        assert_eq!(observer.stops.load(Ordering::SeqCst), 1);
        assert_eq!(observer.events.load(Ordering::SeqCst), 3);
    }
}

#[test]
fn null_observer_accepts_events() {
    let observer = NullObserver;
    let scope = Scope::empty();
    observer.start();
    observer.increment_total(Section::Stale, &scope, 1);
    observer.increment_running(Section::Stale, &scope);
    observer.increment_completed(Section::Stale, &scope);
    observer.stop();
}

#[test]
fn console_observer_start_stop_is_clean() {
    let observer = ConsoleObserver::with_intervals(
        std::time::Duration::from_millis(1),
        std::time::Duration::from_millis(5),
    );
    let scope = Scope::new(vec![Tag::from("report")]);
    observer.start();
    observer.increment_total(Section::Run, &scope, 2);
    observer.increment_running(Section::Run, &scope);
    observer.increment_completed(Section::Run, &scope);
    observer.increment_running(Section::Run, &scope);
    observer.increment_completed(Section::Run, &scope);
    observer.stop();
}

#[test]
fn section_display_names() {
    assert_eq!(Section::Stale.to_string(), "stale");
    assert_eq!(Section::Run.to_string(), "run");
}
