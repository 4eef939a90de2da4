//! Export buffers read by the host after a render status
//!
//! Two kinds of pre-allocated byte buffers, both encoded with the host byte order:
//!
//! - [`TextureInfoExport`]: one entry per managed surface. Rewritten only when
//!   the topology changes (reconfiguration, visibility toggle), which is what
//!   status `RenderAndPublishTextureInfo` tells the host to re-read.
//! - [`DirtyRectExport`]: per surface, the rectangle count followed by a
//!   fixed number of `(x, y, w, h)` slots.
//!
//! ```text
//! texture info:  count i32, then per surface
//!                x i32  y i32  width i32  height i32  visible u8  name [u8; 32]
//! dirty rects:   count i32, then capacity * (x i32  y i32  w i32  h i32)
//! ```

use crate::capsule::ByteOrder;
use crate::capsule::codec::{SIZE_BYTE, SIZE_INT};
use crate::dirty::DirtyRectBuffer;
use crate::surface::DirtyRect;

pub const TEXTURE_NAME_LEN: usize = 32;
pub const TEXTURE_ENTRY_SIZE: usize = 4 * SIZE_INT + SIZE_BYTE + TEXTURE_NAME_LEN;
pub const RECT_SIZE: usize = 4 * SIZE_INT;

/// What the host needs to composite one surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub visible: bool,
}

fn put_u32(bytes: &mut [u8], offset: usize, value: u32, order: &ByteOrder) {
    bytes[offset..offset + SIZE_INT].copy_from_slice(&order.write_u32(value));
}

fn get_u32(bytes: &[u8], offset: usize, order: &ByteOrder) -> u32 {
    let mut word = [0u8; SIZE_INT];
    word.copy_from_slice(&bytes[offset..offset + SIZE_INT]);
    order.read_u32(word)
}

/// Texture metadata for every managed surface.
#[derive(Debug, Clone)]
pub struct TextureInfoExport {
    order: ByteOrder,
    bytes: Vec<u8>,
}

impl TextureInfoExport {
    pub fn new(order: ByteOrder) -> Self {
        let mut export = Self { order, bytes: Vec::new() };
        export.publish(&[]);
        export
    }

    /// Rewrite the buffer for `textures`.
    pub fn publish(&mut self, textures: &[TextureInfo]) {
        let order = self.order;
        self.bytes.clear();
        self.bytes.resize(SIZE_INT + textures.len() * TEXTURE_ENTRY_SIZE, 0);
        put_u32(&mut self.bytes, 0, textures.len() as u32, &order);

        for (i, texture) in textures.iter().enumerate() {
            let base = SIZE_INT + i * TEXTURE_ENTRY_SIZE;
            put_u32(&mut self.bytes, base, texture.x as u32, &order);
            put_u32(&mut self.bytes, base + SIZE_INT, texture.y as u32, &order);
            put_u32(&mut self.bytes, base + 2 * SIZE_INT, texture.width, &order);
            put_u32(&mut self.bytes, base + 3 * SIZE_INT, texture.height, &order);
            self.bytes[base + 4 * SIZE_INT] = u8::from(texture.visible);

            let name_start = base + 4 * SIZE_INT + SIZE_BYTE;
            let copied = texture.name.len().min(TEXTURE_NAME_LEN - 1);
            self.bytes[name_start..name_start + copied].copy_from_slice(&texture.name.as_bytes()[..copied]);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn texture_count(&self) -> usize {
        get_u32(&self.bytes, 0, &self.order) as usize
    }

    /// Decode entry `index` back out of the buffer.
    pub fn texture(&self, index: usize) -> Option<TextureInfo> {
        if index >= self.texture_count() {
            return None;
        }
        let base = SIZE_INT + index * TEXTURE_ENTRY_SIZE;
        let name_start = base + 4 * SIZE_INT + SIZE_BYTE;
        let name_bytes = &self.bytes[name_start..name_start + TEXTURE_NAME_LEN];
        let name_end = name_bytes.iter().position(|&b| b == 0).unwrap_or(TEXTURE_NAME_LEN);

        Some(TextureInfo {
            name: String::from_utf8_lossy(&name_bytes[..name_end]).into_owned(),
            x: get_u32(&self.bytes, base, &self.order) as i32,
            y: get_u32(&self.bytes, base + SIZE_INT, &self.order) as i32,
            width: get_u32(&self.bytes, base + 2 * SIZE_INT, &self.order),
            height: get_u32(&self.bytes, base + 3 * SIZE_INT, &self.order),
            visible: self.bytes[base + 4 * SIZE_INT] != 0,
        })
    }
}

/// Fixed-size dirty-rectangle export for one surface.
#[derive(Debug, Clone)]
pub struct DirtyRectExport {
    order: ByteOrder,
    capacity: usize,
    bytes: Box<[u8]>,
}

impl DirtyRectExport {
    pub fn new(capacity: usize, order: ByteOrder) -> Self {
        Self { order, capacity, bytes: vec![0u8; SIZE_INT + capacity * RECT_SIZE].into_boxed_slice() }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Encode `rects`. Its capacity never exceeds this export's.
    pub fn publish(&mut self, rects: &DirtyRectBuffer) {
        let order = self.order;
        let count = rects.len().min(self.capacity);
        put_u32(&mut self.bytes, 0, count as u32, &order);
        for (i, rect) in rects.as_slice()[..count].iter().enumerate() {
            let base = SIZE_INT + i * RECT_SIZE;
            put_u32(&mut self.bytes, base, rect.x, &order);
            put_u32(&mut self.bytes, base + SIZE_INT, rect.y, &order);
            put_u32(&mut self.bytes, base + 2 * SIZE_INT, rect.width, &order);
            put_u32(&mut self.bytes, base + 3 * SIZE_INT, rect.height, &order);
        }
    }

    /// Publish an empty rectangle list.
    pub fn clear(&mut self) {
        let order = self.order;
        put_u32(&mut self.bytes, 0, 0, &order);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn rect_count(&self) -> usize {
        get_u32(&self.bytes, 0, &self.order) as usize
    }

    /// Decode the published rectangles.
    pub fn rects(&self) -> Vec<DirtyRect> {
        (0..self.rect_count().min(self.capacity))
            .map(|i| {
                let base = SIZE_INT + i * RECT_SIZE;
                DirtyRect::new(
                    get_u32(&self.bytes, base, &self.order),
                    get_u32(&self.bytes, base + SIZE_INT, &self.order),
                    get_u32(&self.bytes, base + 2 * SIZE_INT, &self.order),
                    get_u32(&self.bytes, base + 3 * SIZE_INT, &self.order),
                )
            })
            .collect()
    }
}
