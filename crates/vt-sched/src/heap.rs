//! `PriorityQueue` — array-backed binary heap with pluggable ordering.
//!
//! # Layout
//!
//! The backing `Vec` uses 1-based indexing: slot 0 is permanently vacant, a
//! node at index `i` has children at `2i` and `2i + 1` and its parent at
//! `i / 2`.  One unused slot buys sift loops free of `±1` arithmetic.
//!
//! # Ordering
//!
//! Direction and comparator are fixed at construction.  `a` *has priority
//! over* `b` when the comparator orders it toward the configured direction
//! (`Less` for [`HeapDirection::MinFirst`], `Greater` for
//! [`HeapDirection::MaxFirst`]).  Equal elements never have priority over
//! each other, so dequeue order among ties is unspecified.

use std::cmp::Ordering;

const DEFAULT_CAPACITY: usize = 8;
const DEFAULT_GROWTH_FACTOR: usize = 4;

/// Which end of the ordering is served first.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HeapDirection {
    /// `dequeue` yields the smallest element first.
    MinFirst,
    /// `dequeue` yields the largest element first.
    MaxFirst,
}

type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send>;

/// Array-backed binary heap serving elements in comparator order.
pub struct PriorityQueue<T> {
    /// 1-based storage; `entries[0]` is never occupied.
    entries:       Vec<Option<T>>,
    len:           usize,
    direction:     HeapDirection,
    compare:       Comparator<T>,
    growth_factor: usize,
}

impl<T> PriorityQueue<T> {
    /// Heap over `T`'s natural ordering.
    pub fn new(direction: HeapDirection) -> Self
    where
        T: Ord + 'static,
    {
        Self::with_comparator(direction, Ord::cmp)
    }

    /// Heap ordered by an external comparator.
    pub fn with_comparator<F>(direction: HeapDirection, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + 'static,
    {
        Self::with_capacity(direction, DEFAULT_CAPACITY, compare)
    }

    /// Heap with an explicit initial capacity.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn with_capacity<F>(direction: HeapDirection, capacity: usize, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + 'static,
    {
        assert!(capacity >= 1, "priority queue capacity must be at least 1");
        PriorityQueue {
            entries:       std::iter::repeat_with(|| None).take(capacity + 1).collect(),
            len:           0,
            direction,
            compare:       Box::new(compare),
            growth_factor: DEFAULT_GROWTH_FACTOR,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The element that would be dequeued next, or `None` on an empty heap.
    pub fn peek(&self) -> Option<&T> {
        self.entries.get(1).and_then(Option::as_ref)
    }

    /// Insert `value`, keeping the heap invariant.
    pub fn enqueue(&mut self, value: T) {
        if self.len == self.entries.len() - 1 {
            self.grow();
        }
        self.len += 1;
        self.entries[self.len] = Some(value);
        self.sift_up(self.len);
    }

    /// Remove and return the highest-priority element, or `None` on an
    /// empty heap.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let result = self.entries[1].take();
        let last = self.entries[self.len].take();
        self.len -= 1;
        if self.len > 0 {
            self.entries[1] = last;
            self.sift_down(1);
        }
        result
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Does the element at `a` have priority over the one at `b`?
    fn beats(&self, a: usize, b: usize) -> bool {
        let target = match self.direction {
            HeapDirection::MinFirst => Ordering::Less,
            HeapDirection::MaxFirst => Ordering::Greater,
        };
        let x = self.entries[a].as_ref().expect("occupied heap slot");
        let y = self.entries[b].as_ref().expect("occupied heap slot");
        (self.compare)(x, y) == target
    }

    /// Bubble the element at `i` up until its parent has priority over it.
    fn sift_up(&mut self, mut i: usize) {
        while i > 1 {
            let parent = i / 2;
            if self.beats(parent, i) {
                break;
            }
            self.entries.swap(parent, i);
            i = parent;
        }
    }

    /// Push the element at `i` down, always descending toward the
    /// prioritised child, until neither child has priority over it.
    fn sift_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i;
            if left > self.len {
                break;
            }
            let right = left + 1;
            let favoured = if right <= self.len && self.beats(right, left) {
                right
            } else {
                left
            };
            if !self.beats(favoured, i) {
                break;
            }
            self.entries.swap(i, favoured);
            i = favoured;
        }
    }

    /// Grow the backing array by `growth_factor`.  Existing entries keep
    /// their indices, so growth never reorders the heap.
    fn grow(&mut self) {
        let new_capacity = (self.entries.len() - 1) * self.growth_factor;
        self.entries.resize_with(new_capacity + 1, || None);
    }
}
