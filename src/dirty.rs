//! Dirty-rectangle tracking
//!
//! Once per frame the tracker compares each surface to the snapshot last
//! reported to the host and produces a short list of changed rectangles.
//!
//! ## Algorithm
//!
//! 1. Only the surface's write hint is scanned, in square blocks of
//!    [`DirtyRectConfig::block_size`] pixels aligned to the surface origin.
//!    Every block whose pixels differ from the snapshot becomes a candidate.
//! 2. Candidates are merged pairwise until stable. Two rectangles merge when
//!    they overlap, or when the area of their union is at most
//!    [`DirtyRectConfig::merge_overhead`] times the sum of their areas.
//!    Overdrawing a few unchanged pixels is cheaper for the host than
//!    uploading many tiny regions.
//! 3. If the candidates or the merged result exceed the configured limits,
//!    the whole surface is reported as one rectangle instead.
//!
//! After a reconfiguration or an explicit [`DirtyRectTracker::force_full_redraw`]
//! the next pass reports exactly the full surface without diffing.

use tracing::{debug, trace};

use crate::config::DirtyRectConfig;
use crate::surface::{DirtyRect, TextureSurface};

/// Caller-owned, fixed-capacity output for one surface's dirty rectangles.
#[derive(Debug, Clone)]
pub struct DirtyRectBuffer {
    rects: Vec<DirtyRect>,
    capacity: usize,
}

impl DirtyRectBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { rects: Vec::with_capacity(capacity), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn as_slice(&self) -> &[DirtyRect] {
        &self.rects
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Replace the contents with `rects`, or with `full` if they do not fit.
    ///
    /// Returns `false` when the collapse to `full` happened.
    pub fn fill(&mut self, rects: &[DirtyRect], full: DirtyRect) -> bool {
        self.rects.clear();
        if rects.len() > self.capacity {
            self.set_full(full);
            return false;
        }
        self.rects.extend_from_slice(rects);
        true
    }

    pub fn set_full(&mut self, full: DirtyRect) {
        self.rects.clear();
        if !full.is_empty() {
            self.rects.push(full);
        }
    }
}

/// Per-surface dirty-rectangle state.
#[derive(Debug, Clone)]
pub struct DirtyRectTracker {
    config: DirtyRectConfig,
    force_full: bool,
    last_token: Option<u64>,
    candidates: Vec<DirtyRect>,
}

impl DirtyRectTracker {
    /// A new tracker reports the full surface on its first pass.
    pub fn new(config: DirtyRectConfig) -> Self {
        Self {
            config,
            force_full: true,
            last_token: None,
            candidates: Vec::with_capacity(config.max_rects),
        }
    }

    pub fn config(&self) -> &DirtyRectConfig {
        &self.config
    }

    /// Report the full surface on the next pass.
    pub fn force_full_redraw(&mut self) {
        self.force_full = true;
    }

    pub fn full_redraw_pending(&self) -> bool {
        self.force_full
    }

    /// Token of the most recent pass.
    pub fn last_token(&self) -> Option<u64> {
        self.last_token
    }

    /// Compute the rectangles changed since the previous pass into `out`.
    ///
    /// The snapshot is brought up to date as part of the pass, so a second
    /// call for the same `token` without pixel writes in between reports
    /// nothing. Returns the number of rectangles written.
    pub fn compute_dirty_rects(
        &mut self,
        token: u64,
        surface: &mut TextureSurface,
        out: &mut DirtyRectBuffer,
    ) -> usize {
        let full = surface.bounds();
        let repeated = self.last_token == Some(token);
        self.last_token = Some(token);

        if self.force_full {
            self.force_full = false;
            surface.take_touched();
            surface.sync_full_snapshot();
            out.set_full(full);
            debug!(surface = surface.name(), token, "Full surface redraw");
            return out.len();
        }

        let Some(hint) = surface.take_touched().and_then(|t| t.clip(&full)) else {
            out.clear();
            return 0;
        };

        if !self.collect_changed_blocks(surface, &hint) {
            surface.sync_snapshot(&hint);
            out.set_full(full);
            debug!(
                surface = surface.name(),
                token,
                limit = self.config.max_candidate_rects,
                "Too many changed blocks, collapsing to full surface"
            );
            return out.len();
        }
        surface.sync_snapshot(&hint);

        merge_dirty_rects(&mut self.candidates, self.config.merge_overhead);
        if !out.fill(&self.candidates, full) {
            debug!(
                surface = surface.name(),
                token,
                rects = self.candidates.len(),
                capacity = out.capacity(),
                "Dirty rects exceed capacity, collapsing to full surface"
            );
        }

        trace!(surface = surface.name(), token, repeated, rects = out.len(), "Dirty rects computed");
        out.len()
    }

    /// Fill `candidates` with the changed blocks inside `hint`.
    ///
    /// Returns `false` once more than `max_candidate_rects` blocks changed.
    fn collect_changed_blocks(&mut self, surface: &TextureSurface, hint: &DirtyRect) -> bool {
        self.candidates.clear();
        let block = self.config.block_size.max(1);
        let bounds = surface.bounds();

        let first_x = hint.x / block * block;
        let first_y = hint.y / block * block;

        let mut y = first_y;
        while y < hint.bottom() {
            let mut x = first_x;
            while x < hint.right() {
                let cell = DirtyRect::new(x, y, block, block);
                // The hint is inside the surface so the clip always succeeds.
                if let Some(cell) = cell.clip(&bounds) {
                    if surface.region_changed(&cell) {
                        if self.candidates.len() == self.config.max_candidate_rects {
                            return false;
                        }
                        self.candidates.push(cell);
                    }
                }
                x += block;
            }
            y += block;
        }
        true
    }
}

/// Merge `rects` in place until no pair qualifies for merging.
///
/// A pair merges when it overlaps or when
/// `area(union) <= overhead * (area(a) + area(b))`. The result is free of
/// overlaps.
pub fn merge_dirty_rects(rects: &mut Vec<DirtyRect>, overhead: f32) {
    let overhead = f64::from(overhead);
    let mut merged_any = true;
    while merged_any {
        merged_any = false;
        let mut i = 0;
        while i < rects.len() {
            let mut j = i + 1;
            while j < rects.len() {
                if should_merge(&rects[i], &rects[j], overhead) {
                    rects[i] = rects[i].union(&rects[j]);
                    rects.swap_remove(j);
                    merged_any = true;
                    // rects[i] grew; earlier partners may now qualify.
                    j = i + 1;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }
}

fn should_merge(a: &DirtyRect, b: &DirtyRect, overhead: f64) -> bool {
    if a.intersects(b) {
        return true;
    }
    let union = a.union(b).area() as f64;
    union <= overhead * (a.area() + b.area()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(block_size: u32, max_rects: usize) -> DirtyRectConfig {
        DirtyRectConfig { block_size, max_rects, ..DirtyRectConfig::default() }
    }

    /// Surface and tracker with the initial full redraw already consumed.
    fn settled(width: u32, height: u32, config: DirtyRectConfig) -> (TextureSurface, DirtyRectTracker, DirtyRectBuffer) {
        let mut surface = TextureSurface::new("test", width, height);
        let mut tracker = DirtyRectTracker::new(config);
        let mut out = DirtyRectBuffer::with_capacity(config.max_rects);
        tracker.compute_dirty_rects(0, &mut surface, &mut out);
        (surface, tracker, out)
    }

    #[test]
    fn neighbouring_blocks_merge_into_one() {
        let mut rects = vec![DirtyRect::new(0, 0, 4, 4), DirtyRect::new(5, 0, 4, 4)];
        merge_dirty_rects(&mut rects, 2.0);
        assert_eq!(rects, [DirtyRect::new(0, 0, 9, 4)]);
    }

    #[test]
    fn distant_blocks_stay_separate() {
        let mut rects = vec![DirtyRect::new(0, 0, 2, 2), DirtyRect::new(100, 100, 2, 2)];
        merge_dirty_rects(&mut rects, 2.0);
        assert_eq!(rects.len(), 2);
    }

    #[test]
    fn crossing_rects_merge_despite_overhead() {
        let mut rects = vec![DirtyRect::new(0, 50, 100, 1), DirtyRect::new(50, 0, 1, 100)];
        merge_dirty_rects(&mut rects, 1.0);
        assert_eq!(rects, [DirtyRect::new(0, 0, 100, 100)]);
    }

    #[test]
    fn merge_cascades_through_grown_rects() {
        let mut rects = vec![
            DirtyRect::new(0, 0, 4, 4),
            DirtyRect::new(20, 0, 4, 4),
            DirtyRect::new(4, 0, 4, 4),
            DirtyRect::new(8, 0, 12, 4),
        ];
        merge_dirty_rects(&mut rects, 1.0);
        assert_eq!(rects, [DirtyRect::new(0, 0, 24, 4)]);
    }

    #[test]
    fn first_pass_reports_full_surface() {
        let mut surface = TextureSurface::new("tacho", 100, 40);
        let mut tracker = DirtyRectTracker::new(DirtyRectConfig::default());
        let mut out = DirtyRectBuffer::with_capacity(32);

        surface.set_pixel(3, 3, 0xFF);
        assert_eq!(tracker.compute_dirty_rects(1, &mut surface, &mut out), 1);
        assert_eq!(out.as_slice(), [DirtyRect::new(0, 0, 100, 40)]);
    }

    #[test]
    fn same_token_twice_reports_nothing_the_second_time() {
        let (mut surface, mut tracker, mut out) = settled(64, 64, config(16, 32));
        surface.fill_rect(DirtyRect::new(0, 0, 10, 10), 0xAA);

        assert_eq!(tracker.compute_dirty_rects(7, &mut surface, &mut out), 1);
        assert_eq!(out.as_slice(), [DirtyRect::new(0, 0, 16, 16)]);

        assert_eq!(tracker.compute_dirty_rects(7, &mut surface, &mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn rewriting_identical_pixels_is_not_a_change() {
        let (mut surface, mut tracker, mut out) = settled(32, 32, config(8, 32));
        surface.clear(0);
        assert_eq!(tracker.compute_dirty_rects(1, &mut surface, &mut out), 0);
    }

    #[test]
    fn forced_redraw_reports_full_surface_once() {
        let (mut surface, mut tracker, mut out) = settled(48, 48, config(16, 32));
        tracker.force_full_redraw();

        assert_eq!(tracker.compute_dirty_rects(1, &mut surface, &mut out), 1);
        assert_eq!(out.as_slice(), [surface.bounds()]);
        assert_eq!(tracker.compute_dirty_rects(2, &mut surface, &mut out), 0);
    }

    #[test]
    fn far_apart_changes_report_two_blocks() {
        let (mut surface, mut tracker, mut out) = settled(256, 256, config(16, 32));
        surface.set_pixel(1, 1, 5);
        surface.set_pixel(250, 250, 5);

        assert_eq!(tracker.compute_dirty_rects(1, &mut surface, &mut out), 2);
        let mut rects = out.as_slice().to_vec();
        rects.sort_by_key(|r| (r.y, r.x));
        assert_eq!(rects, [DirtyRect::new(0, 0, 16, 16), DirtyRect::new(240, 240, 16, 16)]);
    }

    #[test]
    fn edge_blocks_are_clipped_to_the_surface() {
        let (mut surface, mut tracker, mut out) = settled(20, 20, config(16, 32));
        surface.set_pixel(19, 19, 1);

        tracker.compute_dirty_rects(1, &mut surface, &mut out);
        assert_eq!(out.as_slice(), [DirtyRect::new(16, 16, 4, 4)]);
    }

    #[test]
    fn overflowing_capacity_collapses_to_full_surface() {
        let (mut surface, mut tracker, mut out) = settled(512, 512, config(4, 2));
        for i in 0..3 {
            surface.set_pixel(i * 200, i * 200, 9);
        }

        assert_eq!(tracker.compute_dirty_rects(1, &mut surface, &mut out), 1);
        assert_eq!(out.as_slice(), [DirtyRect::new(0, 0, 512, 512)]);
    }

    #[test]
    fn too_many_candidates_collapse_without_merging() {
        let cfg = DirtyRectConfig { block_size: 1, max_rects: 2, max_candidate_rects: 4, ..DirtyRectConfig::default() };
        let (mut surface, mut tracker, mut out) = settled(16, 16, cfg);
        for i in 0..5 {
            surface.set_pixel(i * 3, 0, 1);
        }

        tracker.compute_dirty_rects(1, &mut surface, &mut out);
        assert_eq!(out.as_slice(), [surface.bounds()]);
        // The snapshot caught up, so nothing is reported again.
        assert_eq!(tracker.compute_dirty_rects(2, &mut surface, &mut out), 0);
    }

    prop_compose! {
        fn arb_rect()(x in 0u32..256, y in 0u32..256, w in 1u32..32, h in 1u32..32) -> DirtyRect {
            DirtyRect::new(x, y, w, h)
        }
    }

    proptest! {
        #[test]
        fn prop_merged_rects_never_overlap_and_cover_inputs(
            input in prop::collection::vec(arb_rect(), 0..40),
            overhead in 1.0f32..4.0,
        ) {
            let mut rects = input.clone();
            merge_dirty_rects(&mut rects, overhead);

            prop_assert!(rects.len() <= input.len());
            for (i, a) in rects.iter().enumerate() {
                for b in &rects[i + 1..] {
                    prop_assert!(!a.intersects(b));
                }
            }
            for original in &input {
                prop_assert!(rects.iter().any(|r| r.contains(original)));
            }
        }

        #[test]
        fn prop_every_changed_pixel_is_reported(
            writes in prop::collection::vec((0u32..96, 0u32..64, 1u32..u32::MAX), 1..30),
            block in 1u32..20,
        ) {
            let (mut surface, mut tracker, mut out) = settled(96, 64, config(block, 32));
            for &(x, y, color) in &writes {
                surface.set_pixel(x, y, color);
            }
            tracker.compute_dirty_rects(1, &mut surface, &mut out);

            for &(x, y, _) in &writes {
                let pixel = DirtyRect::new(x, y, 1, 1);
                prop_assert!(out.as_slice().iter().any(|r| r.contains(&pixel)));
            }
            prop_assert!(out.len() <= 32);
        }
    }
}
