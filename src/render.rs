//! Conversion of normalized grids to displayable pixels.
//!
//! Grids with three channels are read as RGB; any other channel count is
//! shown as gray from channel 0.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::grid::Grid;

/// Minimum brightness of wall cells, so unlit walls stay visible.
const WALL_FLOOR: u8 = 30;

/// Convert a float value (0.0-1.0) to a byte (0-255)
#[inline]
pub fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Byte color of one cell.
#[inline]
fn cell_bytes(grid: &Grid, x: usize, y: usize) -> (u8, u8, u8) {
    match grid.cell(x, y) {
        [r, g, b] => (to_byte(*r), to_byte(*g), to_byte(*b)),
        cell => {
            let v = to_byte(cell.first().copied().unwrap_or(0.0));
            (v, v, v)
        }
    }
}

/// Pack a grid into `0x00RRGGBB` pixels, each cell filling `scale` x `scale` pixels.
///
/// Cells where `walls` (single channel) reaches `wall_threshold` are lifted to a
/// dark gray minimum.
pub fn pack_rgb(grid: &Grid, walls: Option<(&Grid, f32)>, scale: usize) -> Vec<u32> {
    let (width, height) = (grid.width(), grid.height());
    let row_len = width * scale;
    let mut buffer = vec![0u32; row_len * height * scale];

    for gy in 0..height {
        for gx in 0..width {
            let (mut r, mut g, mut b) = cell_bytes(grid, gx, gy);
            let is_wall = walls.is_some_and(|(w, threshold)| w.get(gx, gy, 0) >= threshold);
            if is_wall {
                (r, g, b) = (r.max(WALL_FLOOR), g.max(WALL_FLOOR), b.max(WALL_FLOOR));
            }
            let color = ((r as u32) << 16) | ((g as u32) << 8) | b as u32;

            for sy in 0..scale {
                let start = (gy * scale + sy) * row_len + gx * scale;
                buffer[start..start + scale].fill(color);
            }
        }
    }
    buffer
}

/// Save a normalized grid to a PPM (P3) file
pub fn save_ppm(grid: &Grid, filename: impl AsRef<Path>, scale: usize) -> io::Result<()> {
    let file = File::create(filename)?;
    write_ppm(&mut BufWriter::new(file), grid, scale)
}

/// Write a normalized grid as PPM (P3) text.
pub fn write_ppm(out: &mut impl Write, grid: &Grid, scale: usize) -> io::Result<()> {
    let img_width = grid.width() * scale;
    let img_height = grid.height() * scale;

    writeln!(out, "P3")?;
    writeln!(out, "{} {}", img_width, img_height)?;
    writeln!(out, "255")?;

    for img_y in 0..img_height {
        for img_x in 0..img_width {
            let (r, g, b) = cell_bytes(grid, img_x / scale, img_y / scale);
            write!(out, "{} {} {} ", r, g, b)?;
        }
        writeln!(out)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::grid::Shape;

    #[test]
    fn bytes_are_clamped() {
        assert_eq!(to_byte(-1.0), 0);
        assert_eq!(to_byte(0.5), 127);
        assert_eq!(to_byte(2.0), 255);
        assert_eq!(to_byte(f32::NAN), 0);
    }

    #[test]
    fn pack_scales_cells() {
        let grid = Grid::from_vec(Shape::new(2, 1, 3), vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]).unwrap();
        let buffer = pack_rgb(&grid, None, 2);
        assert_eq!(
            buffer,
            vec![0xFF0000, 0xFF0000, 0x0000FF, 0x0000FF, 0xFF0000, 0xFF0000, 0x0000FF, 0x0000FF]
        );
    }

    #[test]
    fn pack_marks_walls_and_grays_single_channel() {
        let grid = Grid::from_vec(Shape::new(2, 1, 1), vec![0.0, 1.0]).unwrap();
        let walls = Grid::from_vec(Shape::new(2, 1, 1), vec![1.0, 0.0]).unwrap();
        let buffer = pack_rgb(&grid, Some((&walls, 0.5)), 1);
        assert_eq!(buffer, vec![0x1E1E1E, 0xFFFFFF]);
    }

    #[test]
    fn ppm_text() {
        let grid = Grid::from_vec(Shape::new(1, 1, 3), vec![1.0, 0.0, 1.0]).unwrap();
        let mut out = Vec::new();
        write_ppm(&mut out, &grid, 1).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "P3\n1 1\n255\n255 0 255 \n");
    }
}
