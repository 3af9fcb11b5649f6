use crate::terrain::Color;
use crate::tracer::ColumnSink;
use image::Rgba;
use std::ops::{Range, RangeInclusive};

pub struct FrameBuffer<'a> {
    pixels: &'a mut [u8],
    width: usize,
    height: usize,
    pitch: usize,
    bytes_per_pixel: usize,
}

impl<'a> FrameBuffer<'a> {
    pub fn new(
        pixels: &'a mut [u8],
        width: usize,
        height: usize,
        pitch: usize,
        bytes_per_pixel: usize,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(width > 0 && height > 0, "framebuffer must not be empty ({width}x{height})");
        anyhow::ensure!(bytes_per_pixel >= 4, "need at least 4 bytes per pixel, got {bytes_per_pixel}");
        anyhow::ensure!(
            pitch >= width * bytes_per_pixel,
            "pitch {pitch} is shorter than a row of {width} pixels"
        );
        let required = (height - 1) * pitch + width * bytes_per_pixel;
        anyhow::ensure!(
            pixels.len() >= required,
            "framebuffer holds {} bytes, {}x{} needs {}",
            pixels.len(),
            width,
            height,
            required
        );

        Ok(Self {
            pixels,
            width,
            height,
            pitch,
            bytes_per_pixel,
        })
    }

    /// Tightly packed 32-bit pixels.
    pub fn packed(pixels: &'a mut [u8], width: usize, height: usize) -> anyhow::Result<Self> {
        Self::new(pixels, width, height, width * 4, 4)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let pos = y * self.pitch + x * self.bytes_per_pixel;
        let px = &self.pixels[pos..pos + 4];
        Some(Rgba([px[2], px[1], px[0], px[3]]))
    }

    /// Writes one pixel; coordinates outside the surface are ignored.
    pub fn set_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let pos = y as usize * self.pitch + x as usize * self.bytes_per_pixel;
        self.pixels[pos..pos + 4].copy_from_slice(&bgra(color));
    }

    pub(crate) fn target(&mut self) -> FrameTarget {
        FrameTarget {
            ptr: self.pixels.as_mut_ptr(),
            len: self.pixels.len(),
            width: self.width,
            height: self.height,
            pitch: self.pitch,
            bytes_per_pixel: self.bytes_per_pixel,
        }
    }
}

fn bgra(color: Color) -> [u8; 4] {
    let [r, g, b, a] = color.0;
    [b, g, r, a]
}

/// Valid only while the dispatcher that produced it waits on the frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameTarget {
    ptr: *mut u8,
    len: usize,
    pub(crate) width: usize,
    pub(crate) height: usize,
    pitch: usize,
    bytes_per_pixel: usize,
}

// Sent to workers together with a disjoint column range; see ColumnWriter.
unsafe impl Send for FrameTarget {}

pub(crate) struct ColumnWriter {
    target: FrameTarget,
    columns: RangeInclusive<usize>,
}

impl ColumnWriter {
    /// # Safety
    ///
    /// The buffer behind `target` must stay alive and untouched by its owner
    /// until this writer is dropped, and no other live writer may cover any
    /// column in `columns`.
    pub(crate) unsafe fn new(target: FrameTarget, columns: RangeInclusive<usize>) -> Self {
        assert!(
            *columns.end() < target.width,
            "column range {columns:?} exceeds framebuffer width {}",
            target.width
        );
        Self { target, columns }
    }

    fn put(&mut self, x: usize, y: usize, color: Color) {
        assert!(self.columns.contains(&x), "column {x} outside writer range {:?}", self.columns);
        if y >= self.target.height {
            return;
        }
        let pos = y * self.target.pitch + x * self.target.bytes_per_pixel;
        debug_assert!(pos + 4 <= self.target.len);
        let bytes = bgra(color);
        // SAFETY: pos is in bounds (checked against the layout in FrameBuffer::new)
        // and column x belongs exclusively to this writer for the frame.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.target.ptr.add(pos), 4);
        }
    }
}

impl ColumnSink for ColumnWriter {
    fn fill(&mut self, x: usize, rows: Range<i32>, color: Color) {
        let top = rows.start.max(0);
        let bottom = rows.end.min(self.target.height as i32);
        for y in top..bottom {
            self.put(x, y as usize, color);
        }
    }
}
