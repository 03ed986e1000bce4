//! Error types shared by every stage of the lighting pipeline.

use crate::grid::Shape;

/// Failure of a lighting computation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LightingError {
    /// The caller broke a precondition. Retrying with the same input fails the same way.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// More occluding spans resolved to one angular slot than the buffer can hold.
    /// The visibility grid for this frame cannot be trusted and was not produced.
    #[error(
        "occlusion buffer overflow: slot {slot} of {resolution} needs more than {capacity} spans"
    )]
    AlgorithmOverflow {
        slot: usize,
        resolution: usize,
        capacity: usize,
    },
}

/// The ways an input can be rejected.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("no grids were supplied")]
    Empty,

    #[error("grid shape {found} does not match {expected}")]
    ShapeMismatch { expected: Shape, found: Shape },

    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    #[error("{found} values cannot fill a {shape} grid")]
    DataLength { shape: Shape, found: usize },

    #[error("unknown map glyph {glyph:?} at line {line}, column {column}")]
    UnknownGlyph {
        glyph: char,
        line: usize,
        column: usize,
    },

    #[error("{name} must be {requirement}, got {value}")]
    InvalidParameter {
        name: &'static str,
        requirement: &'static str,
        value: f32,
    },

    #[error("no block type with id {0}")]
    UnknownBlock(usize),

    #[error("map line {line} has {found} cells, expected {expected}")]
    RaggedMap {
        line: usize,
        expected: usize,
        found: usize,
    },
}

impl LightingError {
    pub(crate) fn out_of_bounds(x: i64, y: i64, shape: Shape) -> Self {
        InputError::OutOfBounds {
            x,
            y,
            width: shape.width,
            height: shape.height,
        }
        .into()
    }

    pub(crate) fn invalid_parameter(
        name: &'static str,
        requirement: &'static str,
        value: f32,
    ) -> Self {
        InputError::InvalidParameter {
            name,
            requirement,
            value,
        }
        .into()
    }

    pub(crate) fn shape_mismatch(expected: Shape, found: Shape) -> Self {
        InputError::ShapeMismatch { expected, found }.into()
    }
}
