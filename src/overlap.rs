//! Overlap resolution for hits against the same reference subject
//!
//! Hits are swept per subject in coordinate order; when two retained intervals overlap
//! beyond the limit, the higher bitscore survives (the earlier row on ties). Sweeps repeat
//! until the record count stops changing.

use crate::hits::HitRecord;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;

/// How much two intervals may overlap before the weaker one is dropped
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlapLimit {
    /// Overlap in bases
    Bases(u64),
    /// Overlap as a fraction of the shorter interval
    Fraction(f64),
}

impl Default for OverlapLimit {
    fn default() -> Self {
        OverlapLimit::Bases(10)
    }
}

/// A closed subject interval with its score
struct Interval {
    begin: u64,
    end: u64,
    score: f64,
}

impl Interval {
    fn length(&self) -> u64 {
        self.end - self.begin + 1
    }

    fn overlap_len(&self, other: &Interval) -> u64 {
        let overlap_start = self.begin.max(other.begin);
        let overlap_end = self.end.min(other.end);

        if overlap_start > overlap_end {
            0
        } else {
            overlap_end - overlap_start + 1
        }
    }

    fn conflicts(&self, other: &Interval, limit: OverlapLimit) -> bool {
        let overlap_len = self.overlap_len(other);
        if overlap_len == 0 {
            return false;
        }

        match limit {
            OverlapLimit::Bases(max) => overlap_len > max,
            OverlapLimit::Fraction(max) => {
                let min_len = self.length().min(other.length());
                overlap_len as f64 / min_len as f64 > max
            }
        }
    }
}

/// Sort key: subject, start, end, then bitscore descending.
/// `sort_by` is stable, so equal keys keep their table order.
fn sweep_order<S: Ord>(a: &HitRecord<S>, b: &HitRecord<S>) -> Ordering {
    let (a_begin, a_end) = a.subject_span();
    let (b_begin, b_end) = b.subject_span();
    a.subject
        .cmp(&b.subject)
        .then(a_begin.cmp(&b_begin))
        .then(a_end.cmp(&b_end))
        .then(OrderedFloat(b.bitscore).cmp(&OrderedFloat(a.bitscore)))
}

/// One sweep over `order`, row indices sorted by `sweep_order`. Each hit is compared with
/// the retained intervals on its subject that are still open at its start position.
/// Returns the surviving indices, still in sweep order.
fn sweep<S: Ord>(hits: &[HitRecord<S>], order: Vec<usize>, limit: OverlapLimit) -> Vec<usize> {
    let intervals: Vec<Interval> = order
        .iter()
        .map(|&row| {
            let (begin, end) = hits[row].subject_span();
            Interval {
                begin,
                end,
                score: hits[row].bitscore,
            }
        })
        .collect();

    let mut keep = vec![true; order.len()];
    let mut active: Vec<usize> = Vec::new();

    for idx in 0..order.len() {
        if idx > 0 && hits[order[idx]].subject != hits[order[idx - 1]].subject {
            active.clear();
        }

        let current = &intervals[idx];
        active.retain(|&open| intervals[open].end >= current.begin);

        // Earlier rows win ties
        let beaten = active.iter().any(|&open| {
            intervals[open].score >= current.score && intervals[open].conflicts(current, limit)
        });
        if beaten {
            keep[idx] = false;
            continue;
        }

        active.retain(|&open| {
            if intervals[open].conflicts(current, limit) {
                keep[open] = false;
                false
            } else {
                true
            }
        });
        active.push(idx);
    }

    order
        .into_iter()
        .zip(keep)
        .filter_map(|(row, kept)| kept.then_some(row))
        .collect()
}

/// Remove overlapping hits on the same subject, keeping the highest-scoring
/// non-overlapping set. Survivors are returned in their input table order.
pub fn resolve_overlaps<S: Clone + Ord>(hits: &[HitRecord<S>], limit: OverlapLimit) -> Vec<HitRecord<S>> {
    let mut order: Vec<usize> = (0..hits.len()).collect();
    order.sort_by(|&a, &b| sweep_order(&hits[a], &hits[b]));

    let mut passes = 0;
    loop {
        let before = order.len();
        order = sweep(hits, order, limit);
        passes += 1;
        if order.len() == before {
            break;
        }
    }

    order.sort_unstable();
    log::debug!(
        "Overlap resolution kept {} of {} hits after {} pass(es)",
        order.len(),
        hits.len(),
        passes
    );
    order.into_iter().map(|row| hits[row].clone()).collect()
}
