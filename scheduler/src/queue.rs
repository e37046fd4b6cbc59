// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Blocking work queues with `join` semantics.
//!
//! Every `put` must eventually be matched by a `task_done`; `join` blocks
//! until that holds. Workers therefore mark items done in a drop guard so
//! the accounting survives any failure while processing.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use fnv::FnvHashMap;
use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use graph::NodeId;

/// A queue item: a node to process, or the sentinel telling a worker to
/// shut down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Item {
    Node(NodeId),
    Done,
}

struct PrioritizedItem {
    key: Reverse<i64>,
    item: Item,
}

impl PartialEq for PrioritizedItem {
    fn eq(&self, other: &PrioritizedItem) -> bool {
        self.key == other.key
    }
}

impl Eq for PrioritizedItem {}

impl PartialOrd for PrioritizedItem {
    fn partial_cmp(&self, other: &PrioritizedItem) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedItem {
    fn cmp(&self, other: &PrioritizedItem) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

enum Policy {
    /// Plain FIFO; used where scheduling order cannot matter.
    Fifo(VecDeque<Item>),
    /// Online Fisher-Yates shuffle.
    Random { items: Vec<Item>, rng: StdRng },
    /// Min-heap over planner priorities. Unknown items (and the sentinel)
    /// get priority -1, so shutdown beats work.
    Priority {
        heap: BinaryHeap<PrioritizedItem>,
        priorities: FnvHashMap<NodeId, usize>,
    },
}

impl Policy {
    fn push(&mut self, item: Item) {
        match self {
            Policy::Fifo(items) => items.push_back(item),
            Policy::Random { items, rng } => {
                items.push(item);
                let swap_with = rng.random_range(0..items.len());
                let last = items.len() - 1;
                items.swap(swap_with, last);
            }
            Policy::Priority { heap, priorities } => {
                let key = match item {
                    Item::Done => -1,
                    Item::Node(id) => priorities.get(&id).map_or(-1, |p| *p as i64),
                };
                heap.push(PrioritizedItem {
                    key: Reverse(key),
                    item,
                });
            }
        }
    }

    fn pop(&mut self) -> Option<Item> {
        match self {
            Policy::Fifo(items) => items.pop_front(),
            Policy::Random { items, .. } => items.pop(),
            Policy::Priority { heap, .. } => heap.pop().map(|prioritized| prioritized.item),
        }
    }
}

struct QueueState {
    policy: Policy,
    unfinished: usize,
}

///
/// A blocking multi-producer multi-consumer queue with unfinished-task
/// accounting, in one of three scheduling flavours.
///
pub struct WorkQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    all_done: Condvar,
}

impl WorkQueue {
    fn with_policy(policy: Policy) -> WorkQueue {
        WorkQueue {
            state: Mutex::new(QueueState {
                policy,
                unfinished: 0,
            }),
            not_empty: Condvar::new(),
            all_done: Condvar::new(),
        }
    }

    pub fn fifo() -> WorkQueue {
        WorkQueue::with_policy(Policy::Fifo(VecDeque::new()))
    }

    pub fn random() -> WorkQueue {
        WorkQueue::with_policy(Policy::Random {
            items: Vec::new(),
            rng: StdRng::from_os_rng(),
        })
    }

    pub fn with_priorities(priorities: FnvHashMap<NodeId, usize>) -> WorkQueue {
        WorkQueue::with_policy(Policy::Priority {
            heap: BinaryHeap::new(),
            priorities,
        })
    }

    pub fn put(&self, item: Item) {
        let mut state = self.state.lock();
        state.policy.push(item);
        state.unfinished += 1;
        self.not_empty.notify_one();
    }

    /// Blocks until an item is available.
    pub fn get(&self) -> Item {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.policy.pop() {
                return item;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Marks one previously gotten item as finished.
    pub fn task_done(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.unfinished > 0, "task_done without a matching put");
        state.unfinished -= 1;
        if state.unfinished == 0 {
            self.all_done.notify_all();
        }
    }

    /// Blocks until every put item has been marked done.
    pub fn join(&self) {
        let mut state = self.state.lock();
        while state.unfinished > 0 {
            self.all_done.wait(&mut state);
        }
    }
}
