use cascade_core::Vertex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Queue entry for the distance-ordered heaps.
#[derive(Debug, Clone)]
pub struct QueueEntry<V> {
    pub distance: f64,
    pub vertex: V,
}

impl<V: Vertex> PartialEq for QueueEntry<V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<V: Vertex> Eq for QueueEntry<V> {}

impl<V: Vertex> PartialOrd for QueueEntry<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V: Vertex> Ord for QueueEntry<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap; lower vertex id wins ties
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Min-priority queue of `(distance, vertex)` pairs.
///
/// There is no decrease-key: callers push again and discard stale entries
/// when they are popped.
#[derive(Debug, Clone)]
pub struct MinQueue<V> {
    heap: BinaryHeap<QueueEntry<V>>,
}

impl<V: Vertex> Default for MinQueue<V> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }
}

impl<V: Vertex> MinQueue<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, distance: f64, vertex: V) {
        self.heap.push(QueueEntry { distance, vertex });
    }

    pub fn pop(&mut self) -> Option<(f64, V)> {
        self.heap.pop().map(|entry| (entry.distance, entry.vertex))
    }

    pub fn peek(&self) -> Option<(f64, &V)> {
        self.heap.peek().map(|entry| (entry.distance, &entry.vertex))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
