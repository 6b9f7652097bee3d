// THEORY:
// A snapshot is a top-down picture of the ring at one tick: faint markers for the
// configured slots, and one disc per live figure placed at its commanded
// orientation. The disc grows with the figure's reveal level and is coloured by
// its visual variant, so a sequence of snapshots shows rises, collapses and
// variant hand-offs at a glance.

use crate::presentation::EasedEntity;
use anyhow::Context;
use image::ImageEncoder;
use ring_slots::SlotId;
use std::path::{Path, PathBuf};

const BACKGROUND: [u8; 4] = [18, 18, 26, 255];
const SLOT_MARKER: [u8; 4] = [90, 90, 110, 255];
const PALETTE: [[u8; 4]; 6] = [
    [230, 159, 0, 255],
    [86, 180, 233, 255],
    [0, 158, 115, 255],
    [240, 228, 66, 255],
    [213, 94, 0, 255],
    [204, 121, 167, 255],
];

pub struct SnapshotWriter {
    dir: PathBuf,
    size: u32,
    slots: Vec<SlotId>,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, slots: Vec<SlotId>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;
        Ok(Self { dir, size: 256, slots })
    }

    /// RGBA8 pixels of the ring with the given figures drawn on it.
    pub fn render<'a>(&self, figures: impl IntoIterator<Item = &'a EasedEntity>) -> Vec<u8> {
        let mut buffer: Vec<u8> = BACKGROUND.repeat((self.size * self.size) as usize);

        for slot in &self.slots {
            let (x, y) = self.ring_point(slot.as_f32());
            self.fill_disc(&mut buffer, x, y, 3.0, SLOT_MARKER);
        }

        for figure in figures {
            let Some(orientation) = figure.orientation() else { continue };
            let colour = figure
                .variant()
                .map(|token| PALETTE[token.index() % PALETTE.len()])
                .unwrap_or(SLOT_MARKER);
            let (x, y) = self.ring_point(orientation);
            self.fill_disc(&mut buffer, x, y, 4.0 + figure.level() * 14.0, colour);
        }
        buffer
    }

    pub fn write<'a>(&self, index: u64, figures: impl IntoIterator<Item = &'a EasedEntity>) -> anyhow::Result<PathBuf> {
        let buffer = self.render(figures);
        let path = self.dir.join(format!("ring_{index:05}.png"));
        let output = std::fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let encoder = image::codecs::png::PngEncoder::new(output);
        encoder.write_image(&buffer, self.size, self.size, image::ExtendedColorType::Rgba8)?;
        Ok(path)
    }

    /// Pixel position of an angle on the ring (0° to the right, counter-clockwise).
    fn ring_point(&self, degrees: f32) -> (f32, f32) {
        let centre = self.size as f32 / 2.0;
        let radius = self.size as f32 * 0.38;
        let theta = degrees.to_radians();
        (centre + radius * theta.cos(), centre - radius * theta.sin())
    }

    fn fill_disc(&self, buffer: &mut [u8], cx: f32, cy: f32, radius: f32, colour: [u8; 4]) {
        let size = self.size as i64;
        let (x0, x1) = ((cx - radius).floor() as i64, (cx + radius).ceil() as i64);
        let (y0, y1) = ((cy - radius).floor() as i64, (cy + radius).ceil() as i64);
        for y in y0.max(0)..=y1.min(size - 1) {
            for x in x0.max(0)..=x1.min(size - 1) {
                let (dx, dy) = (x as f32 - cx, y as f32 - cy);
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let offset = ((y * size + x) * 4) as usize;
                buffer[offset..offset + 4].copy_from_slice(&colour);
            }
        }
    }
}
