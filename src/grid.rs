//! Flat row-major grids and the identity tokens that let caches tell them apart.
//!
//! Every grid in a frame shares one `(width, height)` plane and stores its values
//! as `index = (y * width + x) * channels + c`, which keeps neighbouring cells of
//! a row adjacent in memory.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{InputError, LightingError};

/// Dimensions of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl Shape {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Shape {
            width,
            height,
            channels,
        }
    }

    /// Single-channel shape with the same plane.
    pub fn plane(self) -> Self {
        self.with_channels(1)
    }

    pub fn with_channels(self, channels: usize) -> Self {
        Shape { channels, ..self }
    }

    /// Number of cells in the plane.
    pub fn cells(self) -> usize {
        self.width * self.height
    }

    /// Number of stored values.
    pub fn len(self) -> usize {
        self.cells() * self.channels
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn contains(self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// A dense grid of `f32` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    shape: Shape,
    data: Vec<f32>,
}

impl Grid {
    pub fn zeros(shape: Shape) -> Self {
        Self::filled(shape, 0.0)
    }

    pub fn filled(shape: Shape, value: f32) -> Self {
        Grid {
            shape,
            data: vec![value; shape.len()],
        }
    }

    /// Wrap an existing buffer, which must hold exactly `shape.len()` values.
    pub fn from_vec(shape: Shape, data: Vec<f32>) -> Result<Self, LightingError> {
        if data.len() != shape.len() {
            return Err(InputError::DataLength {
                shape,
                found: data.len(),
            }
            .into());
        }
        Ok(Grid { shape, data })
    }

    /// Convert a nested `[x][y]` grid into a single-channel flat grid.
    pub fn from_columns(columns: &[Vec<f32>]) -> Result<Self, LightingError> {
        let width = columns.len();
        let height = columns.first().map_or(0, Vec::len);
        let shape = Shape::new(width, height, 1);
        let mut grid = Grid::zeros(shape);
        for (x, column) in columns.iter().enumerate() {
            if column.len() != height {
                return Err(LightingError::shape_mismatch(
                    shape,
                    Shape::new(width, column.len(), 1),
                ));
            }
            for (y, &value) in column.iter().enumerate() {
                grid.data[y * width + x] = value;
            }
        }
        Ok(grid)
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn width(&self) -> usize {
        self.shape.width
    }

    pub fn height(&self) -> usize {
        self.shape.height
    }

    pub fn channels(&self) -> usize {
        self.shape.channels
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.shape.width + x) * self.shape.channels
    }

    /// Value at `(x, y)` in channel `c`. Panics when out of range, like slice indexing.
    #[inline]
    pub fn get(&self, x: usize, y: usize, c: usize) -> f32 {
        self.data[self.offset(x, y) + c]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, c: usize, value: f32) {
        let i = self.offset(x, y) + c;
        self.data[i] = value;
    }

    /// All channels of one cell.
    pub fn cell(&self, x: usize, y: usize) -> &[f32] {
        let i = self.offset(x, y);
        &self.data[i..i + self.shape.channels]
    }

    /// Largest stored value, or 0.0 for an empty grid.
    pub fn max_value(&self) -> f32 {
        self.data
            .iter()
            .copied()
            .reduce(f32::max)
            .unwrap_or(0.0)
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    pub fn check_shape(&self, expected: Shape) -> Result<(), LightingError> {
        if self.shape != expected {
            return Err(LightingError::shape_mismatch(expected, self.shape));
        }
        Ok(())
    }

    /// Elementwise `self += other`.
    pub fn add_assign(&mut self, other: &Grid) -> Result<(), LightingError> {
        other.check_shape(self.shape)?;
        for (a, &b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
        Ok(())
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Grid {
        Grid {
            shape: self.shape,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Multiply every channel of each cell by the matching cell of a single-channel grid.
    pub fn scale_by_plane(&self, plane: &Grid) -> Result<Grid, LightingError> {
        plane.check_shape(self.shape.plane())?;
        let channels = self.shape.channels;
        let mut out = self.clone();
        if channels == 0 {
            return Ok(out);
        }
        for (cell, &factor) in out.data.chunks_exact_mut(channels).zip(&plane.data) {
            cell.iter_mut().for_each(|v| *v *= factor);
        }
        Ok(out)
    }
}

/// Identity of a published grid.
///
/// Tokens come from a process-wide counter and are never handed out twice, so two
/// grids with equal contents but separate origins always compare unequal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridId(u64);

static NEXT_GRID_ID: AtomicU64 = AtomicU64::new(1);

impl GridId {
    fn next() -> Self {
        GridId(NEXT_GRID_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An immutable, reference-counted grid carrying its identity.
///
/// Cloning shares the grid and keeps the identity; wrapping a new [`Grid`] always
/// mints a new one.
#[derive(Debug, Clone)]
pub struct SharedGrid {
    id: GridId,
    grid: Arc<Grid>,
}

impl SharedGrid {
    pub fn new(grid: Grid) -> Self {
        SharedGrid {
            id: GridId::next(),
            grid: Arc::new(grid),
        }
    }

    pub fn id(&self) -> GridId {
        self.id
    }
}

impl From<Grid> for SharedGrid {
    fn from(grid: Grid) -> Self {
        SharedGrid::new(grid)
    }
}

impl Deref for SharedGrid {
    type Target = Grid;

    fn deref(&self) -> &Grid {
        &self.grid
    }
}
