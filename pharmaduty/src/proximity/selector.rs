//! Bounded k-nearest selection.
//!
//! Ranks a candidate set of points of interest by great-circle distance
//! from an origin and returns the k closest without sorting the full set.
//! A bounded max-heap of size k keeps the current worst selection on top;
//! once the heap is full each remaining candidate only pays a comparison
//! against that worst entry, and a replacement costs O(log k). For n
//! candidates this is O(n log k) instead of the O(n log n) full sort.
//!
//! Ties in distance keep candidate input order (the heap key is the
//! (distance, input index) pair), so results are deterministic for a
//! given input sequence.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::coord::{distance_km, Coordinate};

/// Types with a ranking coordinate.
///
/// Implemented by whatever record the caller wants ranked; the selector
/// reads the coordinate and passes the record through untouched.
pub trait Locatable {
    /// The coordinate this record is ranked by.
    fn coordinate(&self) -> Coordinate;
}

/// One ranked selection result.
///
/// Produced fresh on every invocation; the distance is recomputed from
/// the origin at selection time, never cached across calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPoint<T> {
    /// The candidate record, passed through untouched.
    pub point: T,
    /// Great-circle distance from the origin in kilometers.
    pub distance_km: f64,
}

/// Heap entry ordered worst-first: greater distance, then later input
/// index for equal distances.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    distance_km: f64,
    index: usize,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_km
            .total_cmp(&other.distance_km)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Select the k candidates nearest to `origin`, ascending by distance.
///
/// # Arguments
///
/// * `origin` - Point distances are measured from
/// * `candidates` - Candidate records; read-only, cloned into the result
/// * `k` - Maximum number of results (`0` yields an empty result)
/// * `max_radius_km` - When supplied, results beyond this distance are
///   dropped after selection. Deciding what an empty or thinned result
///   means ("no usable coverage near this origin") is the caller's
///   policy, not an error here.
///
/// # Returns
///
/// At most `min(k, candidates.len())` ranked points, sorted ascending by
/// distance with ties in candidate input order.
pub fn select_nearest<T: Locatable + Clone>(
    origin: Coordinate,
    candidates: &[T],
    k: usize,
    max_radius_km: Option<f64>,
) -> Vec<RankedPoint<T>> {
    if k == 0 || candidates.is_empty() {
        return Vec::new();
    }

    // Worst-on-top bounded heap of the best k seen so far.
    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k);

    for (index, candidate) in candidates.iter().enumerate() {
        let entry = HeapEntry {
            distance_km: distance_km(origin, candidate.coordinate()),
            index,
        };

        if heap.len() < k {
            heap.push(entry);
        } else if let Some(worst) = heap.peek() {
            if entry < *worst {
                heap.pop();
                heap.push(entry);
            }
        }
    }

    let mut selected = heap.into_vec();
    selected.sort_unstable();

    selected
        .into_iter()
        .map(|entry| RankedPoint {
            point: candidates[entry.index].clone(),
            distance_km: entry.distance_km,
        })
        .filter(|ranked| max_radius_km.map_or(true, |radius| ranked.distance_km <= radius))
        .collect()
}
