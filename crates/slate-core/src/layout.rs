//! Overlap resolution for the day-by-time grid.
//!
//! Every view (weekly, finals, preview) feeds its intervals through
//! [`resolve`], which divides each day lane into fractional sub-columns so
//! that concurrently overlapping items never share one. The algorithm is an
//! incremental heuristic, not an interval-graph coloring: shorter intervals
//! are placed first, each new interval takes the rightmost column of its
//! overlap group, and the group's shared width only ever grows.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Half-open `[start, end)` range in minutes of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub start: u16,
    pub end: u16,
}

impl Period {
    pub fn new(start: u16, end: u16) -> Self {
        debug_assert!(start < end, "period {start}-{end} has no duration");
        Self { start, end }
    }

    pub fn duration(&self) -> u16 {
        self.end - self.start
    }

    /// Strict on both sides: touching endpoints do not overlap.
    pub fn overlaps(&self, other: Period) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Key used to deduplicate identical periods of one item on one day.
    pub fn key(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// One placeable item occurrence: an identity, the day lanes it recurs on,
/// and its time range. A logical item (section, event) may contribute several
/// of these with different periods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceableInterval {
    pub id: String,
    pub day_keys: BTreeSet<String>,
    pub period: Period,
}

impl PlaceableInterval {
    pub fn new(
        id: impl Into<String>,
        day_keys: impl IntoIterator<Item = String>,
        period: Period,
    ) -> Self {
        Self {
            id: id.into(),
            day_keys: day_keys.into_iter().collect(),
            period,
        }
    }
}

/// Resolved horizontal slot for one `(item, day, period)` occurrence.
///
/// `column_index` is assigned once, at placement, and never changes;
/// `column_count` is widened in place as the overlap group grows, which is
/// what makes earlier members narrow and drift left while the newest member
/// always lands in the rightmost slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementInfo {
    pub period: Period,
    pub id: String,
    pub column_index: usize,
    pub column_count: usize,
}

/// `item id -> day key -> period key -> placement`. Built fresh by every
/// [`resolve`] call and owned by that one layout pass.
pub type PositionIndex = BTreeMap<String, BTreeMap<String, BTreeMap<String, PlacementInfo>>>;

#[derive(Debug)]
struct Record {
    id: String,
    period: Period,
    column_index: usize,
    column_count: usize,
}

/// Computes a [`PositionIndex`] for the given intervals.
///
/// Intervals are processed in duration-ascending order (stable, so equal
/// durations keep input order) and each day lane is resolved independently.
/// Input is assumed validated: callers drop TBA/invalid periods before
/// reaching this point.
pub fn resolve(intervals: &[PlaceableInterval]) -> PositionIndex {
    let mut ordered: Vec<&PlaceableInterval> = intervals.iter().collect();
    ordered.sort_by_key(|iv| iv.period.duration());

    let mut arena: Vec<Record> = Vec::new();
    let mut days: BTreeMap<String, Vec<usize>> = BTreeMap::new();

    for iv in ordered {
        debug_assert!(!iv.day_keys.is_empty(), "interval {} has no days", iv.id);
        debug_assert!(iv.period.start < iv.period.end, "interval {} has no duration", iv.id);

        for day in &iv.day_keys {
            place(&mut arena, days.entry(day.clone()).or_default(), iv);
        }
    }

    trace!(
        intervals = intervals.len(),
        placements = arena.len(),
        days = days.len(),
        "resolved layout"
    );

    let mut index = PositionIndex::new();
    for (day, slots) in &days {
        for &slot in slots {
            let rec = &arena[slot];
            index
                .entry(rec.id.clone())
                .or_default()
                .entry(day.clone())
                .or_default()
                .insert(
                    rec.period.key(),
                    PlacementInfo {
                        period: rec.period,
                        id: rec.id.clone(),
                        column_index: rec.column_index,
                        column_count: rec.column_count,
                    },
                );
        }
    }
    index
}

/// Places one interval occurrence into a single day lane.
fn place(arena: &mut Vec<Record>, day_slots: &mut Vec<usize>, iv: &PlaceableInterval) {
    let overlapping: Vec<usize> = day_slots
        .iter()
        .copied()
        .filter(|&slot| arena[slot].period.overlaps(iv.period))
        .collect();

    let new_count = overlapping
        .iter()
        .map(|&slot| arena[slot].column_count + 1)
        .max()
        .unwrap_or(1);

    // Widen the whole connected overlap component to the new count. The
    // closure is chased against the stored periods of visited records, so a
    // chain A~B~C is unified even when A and C never overlap directly. Each
    // id is visited at most once per call.
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut stack = overlapping;
    while let Some(slot) = stack.pop() {
        if !seen.insert(arena[slot].id.clone()) {
            continue;
        }
        arena[slot].column_count = new_count;
        let visited_period = arena[slot].period;

        for &other in day_slots.iter() {
            if !seen.contains(&arena[other].id) && arena[other].period.overlaps(visited_period) {
                stack.push(other);
            }
        }
    }

    let record = Record {
        id: iv.id.clone(),
        period: iv.period,
        column_index: new_count - 1,
        column_count: new_count,
    };

    // Same (id, period) on the same day replaces the earlier entry.
    let duplicate = day_slots
        .iter()
        .copied()
        .find(|&slot| arena[slot].id == iv.id && arena[slot].period == iv.period);

    match duplicate {
        Some(slot) => arena[slot] = record,
        None => {
            day_slots.push(arena.len());
            arena.push(record);
        }
    }
}

/// Flattens the index into every placement recorded for one day lane.
pub fn placements_for_day<'a>(index: &'a PositionIndex, day: &str) -> Vec<&'a PlacementInfo> {
    let mut out = Vec::new();
    for by_day in index.values() {
        if let Some(by_period) = by_day.get(day) {
            out.extend(by_period.values());
        }
    }
    out
}
