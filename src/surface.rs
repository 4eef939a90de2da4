//! Texture surfaces and rectangle geometry
//!
//! A [`TextureSurface`] is the pixel buffer one widget renders into. Besides
//! the live pixels it keeps the snapshot that was last reported to the host,
//! and a write hint: the bounding box of every write since the last dirty-rect
//! pass. The tracker only diffs blocks inside that hint.

use serde::{Deserialize, Serialize};

/// Host screen resolution in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle in surface-local pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirtyRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DirtyRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// One past the last column.
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the last row.
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Smallest rectangle enclosing both.
    pub fn union(&self, other: &DirtyRect) -> DirtyRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        DirtyRect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// True when the rectangles share at least one pixel.
    pub fn intersects(&self, other: &DirtyRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains(&self, other: &DirtyRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Intersection, or `None` if they do not overlap.
    pub fn clip(&self, bounds: &DirtyRect) -> Option<DirtyRect> {
        let x = self.x.max(bounds.x);
        let y = self.y.max(bounds.y);
        let right = self.right().min(bounds.right());
        let bottom = self.bottom().min(bounds.bottom());
        (x < right && y < bottom).then(|| DirtyRect::new(x, y, right - x, bottom - y))
    }
}

/// Pixel buffer of one widget, in 32-bit ARGB.
#[derive(Debug, Clone)]
pub struct TextureSurface {
    name: String,
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    snapshot: Vec<u32>,
    touched: Option<DirtyRect>,
}

impl TextureSurface {
    /// Allocate a transparent surface.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            name: name.into(),
            width,
            height,
            pixels: vec![0; len],
            snapshot: vec![0; len],
            touched: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The whole surface as a rectangle.
    pub fn bounds(&self) -> DirtyRect {
        DirtyRect::new(0, 0, self.width, self.height)
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Raw write access. Marks the entire surface as touched.
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        self.touch(self.bounds());
        &mut self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.pixels[self.index(x, y)])
    }

    /// Write one pixel. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: u32) {
        if x < self.width && y < self.height {
            let index = self.index(x, y);
            self.pixels[index] = color;
            self.touch(DirtyRect::new(x, y, 1, 1));
        }
    }

    /// Fill `rect`, clipped to the surface.
    pub fn fill_rect(&mut self, rect: DirtyRect, color: u32) {
        let Some(clipped) = rect.clip(&self.bounds()) else {
            return;
        };
        for y in clipped.y..clipped.bottom() {
            let start = self.index(clipped.x, y);
            self.pixels[start..start + clipped.width as usize].fill(color);
        }
        self.touch(clipped);
    }

    /// Fill the whole surface.
    pub fn clear(&mut self, color: u32) {
        self.fill_rect(self.bounds(), color);
    }

    /// Bounding box of writes since the last [`take_touched`](Self::take_touched).
    pub fn touched(&self) -> Option<DirtyRect> {
        self.touched
    }

    pub(crate) fn take_touched(&mut self) -> Option<DirtyRect> {
        self.touched.take()
    }

    pub(crate) fn touch(&mut self, rect: DirtyRect) {
        if rect.is_empty() {
            return;
        }
        self.touched = Some(match self.touched {
            Some(existing) => existing.union(&rect),
            None => rect,
        });
    }

    /// Pixels as last reported to the host.
    pub fn snapshot(&self) -> &[u32] {
        &self.snapshot
    }

    /// Whether the `rect` region differs from the snapshot. `rect` must lie inside the surface.
    pub(crate) fn region_changed(&self, rect: &DirtyRect) -> bool {
        (rect.y..rect.bottom()).any(|y| {
            let start = self.index(rect.x, y);
            let end = start + rect.width as usize;
            self.pixels[start..end] != self.snapshot[start..end]
        })
    }

    /// Copy the `rect` region of the live pixels into the snapshot.
    pub(crate) fn sync_snapshot(&mut self, rect: &DirtyRect) {
        for y in rect.y..rect.bottom() {
            let start = self.index(rect.x, y);
            let end = start + rect.width as usize;
            self.snapshot[start..end].copy_from_slice(&self.pixels[start..end]);
        }
    }

    pub(crate) fn sync_full_snapshot(&mut self) {
        self.snapshot.copy_from_slice(&self.pixels);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        fn arb_rect()(x in 0u32..200, y in 0u32..200, w in 0u32..100, h in 0u32..100) -> DirtyRect {
            DirtyRect::new(x, y, w, h)
        }
    }

    proptest! {
        #[test]
        fn prop_union_contains_both(a in arb_rect(), b in arb_rect()) {
            let u = a.union(&b);
            prop_assert!(u.contains(&a));
            prop_assert!(u.contains(&b));
            prop_assert!(u.area() >= a.area().max(b.area()));
        }

        #[test]
        fn prop_clip_stays_inside_both(a in arb_rect(), b in arb_rect()) {
            if let Some(c) = a.clip(&b) {
                prop_assert!(a.contains(&c));
                prop_assert!(b.contains(&c));
                prop_assert!(a.intersects(&b));
            } else {
                prop_assert!(!a.intersects(&b));
            }
        }
    }

    #[test]
    fn adjacent_rects_do_not_intersect() {
        let a = DirtyRect::new(0, 0, 4, 4);
        assert!(!a.intersects(&DirtyRect::new(4, 0, 4, 4)));
        assert!(a.intersects(&DirtyRect::new(3, 3, 4, 4)));
    }

    #[test]
    fn writes_grow_the_touched_hint() {
        let mut surface = TextureSurface::new("speedometer", 64, 32);
        assert_eq!(surface.touched(), None);

        surface.set_pixel(2, 3, 0xFFFF_FFFF);
        surface.fill_rect(DirtyRect::new(60, 30, 10, 10), 0xFF00_0000);
        surface.set_pixel(100, 100, 1);

        assert_eq!(surface.touched(), Some(DirtyRect::new(2, 3, 62, 29)));
        assert_eq!(surface.pixel(63, 31), Some(0xFF00_0000));
        assert_eq!(surface.pixel(64, 0), None);
    }

    #[test]
    fn snapshot_tracks_synced_regions_only() {
        let mut surface = TextureSurface::new("gear", 8, 8);
        surface.clear(7);
        let left = DirtyRect::new(0, 0, 4, 8);

        assert!(surface.region_changed(&left));
        surface.sync_snapshot(&left);
        assert!(!surface.region_changed(&left));
        assert!(surface.region_changed(&DirtyRect::new(4, 0, 4, 8)));

        assert_eq!(surface.take_touched(), Some(surface.bounds()));
        assert_eq!(surface.touched(), None);
    }
}
