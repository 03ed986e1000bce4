//! Block types and the terrain map built from them.
//!
//! The opacity grid consumed by the visibility solver is derived from the
//! block at each cell and is republished (with a new identity) whenever the
//! map is edited.

use crate::error::{InputError, LightingError};
use crate::grid::{Grid, Shape, SharedGrid};

/// Index into a [`BlockTypes`] table.
pub type BlockId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct BlockType {
    pub name: String,
    pub glyph: char,
    pub walkable: bool,
    /// 0.0 = transparent, 1.0 = blocks sight completely.
    pub opacity: f32,
}

impl BlockType {
    pub fn new(name: &str, glyph: char, walkable: bool, opacity: f32) -> Self {
        BlockType {
            name: name.to_string(),
            glyph,
            walkable,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }
}

/// Table of block types; ids are positions in the table.
#[derive(Debug, Clone)]
pub struct BlockTypes {
    types: Vec<BlockType>,
}

impl Default for BlockTypes {
    fn default() -> Self {
        BlockTypes {
            types: vec![
                BlockType::new("void", ' ', false, 0.0),
                BlockType::new("path", '.', true, 0.0),
                BlockType::new("wall", '#', false, 1.0),
            ],
        }
    }
}

impl BlockTypes {
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.types.get(id)
    }

    pub fn id_of(&self, name: &str) -> Option<BlockId> {
        self.types.iter().position(|bt| bt.name == name)
    }

    pub fn by_glyph(&self, glyph: char) -> Option<BlockId> {
        self.types.iter().position(|bt| bt.glyph == glyph)
    }

    /// Append a block type and return its id.
    pub fn add(&mut self, block_type: BlockType) -> BlockId {
        self.types.push(block_type);
        self.types.len() - 1
    }
}

/// The landscape: one block per cell.
#[derive(Debug, Clone)]
pub struct Terrain {
    width: usize,
    height: usize,
    blocks: Vec<BlockId>,
    types: BlockTypes,
    opacity: SharedGrid,
}

impl Terrain {
    /// A `width` x `height` map filled with `fill`.
    pub fn new(
        width: usize,
        height: usize,
        fill: BlockId,
        types: BlockTypes,
    ) -> Result<Self, LightingError> {
        if types.get(fill).is_none() {
            return Err(unknown_block(fill));
        }
        Ok(Self::from_blocks(width, height, vec![fill; width * height], types))
    }

    /// Parse a map with one row per line; the first line is `y = 0`.
    ///
    /// Empty lines are skipped.
    pub fn from_ascii(map: &str, types: BlockTypes) -> Result<Self, LightingError> {
        let mut width = None;
        let mut height = 0;
        let mut blocks = Vec::new();
        for (line_no, line) in map.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let row_len = line.chars().count();
            let expected = *width.get_or_insert(row_len);
            if row_len != expected {
                return Err(InputError::RaggedMap {
                    line: line_no + 1,
                    expected,
                    found: row_len,
                }
                .into());
            }
            for (column, glyph) in line.chars().enumerate() {
                let id = types.by_glyph(glyph).ok_or(InputError::UnknownGlyph {
                    glyph,
                    line: line_no + 1,
                    column: column + 1,
                })?;
                blocks.push(id);
            }
            height += 1;
        }
        Ok(Self::from_blocks(width.unwrap_or(0), height, blocks, types))
    }

    fn from_blocks(width: usize, height: usize, blocks: Vec<BlockId>, types: BlockTypes) -> Self {
        let opacity = derive_opacity(width, height, &blocks, &types);
        Terrain {
            width,
            height,
            blocks,
            types,
            opacity,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.width, self.height, 1)
    }

    pub fn block_types(&self) -> &BlockTypes {
        &self.types
    }

    pub fn block_at(&self, x: usize, y: usize) -> Option<&BlockType> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.types.get(self.blocks[y * self.width + x])
    }

    pub fn is_walkable(&self, x: usize, y: usize) -> bool {
        self.block_at(x, y).is_some_and(|bt| bt.walkable)
    }

    /// Replace one block. The opacity grid is re-derived under a new identity.
    pub fn set_block(&mut self, x: usize, y: usize, id: BlockId) -> Result<(), LightingError> {
        if x >= self.width || y >= self.height {
            return Err(LightingError::out_of_bounds(x as i64, y as i64, self.shape()));
        }
        if self.types.get(id).is_none() {
            return Err(unknown_block(id));
        }
        self.blocks[y * self.width + x] = id;
        self.opacity = derive_opacity(self.width, self.height, &self.blocks, &self.types);
        Ok(())
    }

    /// Per-cell opacity in [0, 1].
    pub fn opacity(&self) -> &SharedGrid {
        &self.opacity
    }
}

fn derive_opacity(
    width: usize,
    height: usize,
    blocks: &[BlockId],
    types: &BlockTypes,
) -> SharedGrid {
    let mut grid = Grid::zeros(Shape::new(width, height, 1));
    for (value, &id) in grid.data_mut().iter_mut().zip(blocks) {
        *value = types.get(id).map_or(0.0, |bt| bt.opacity);
    }
    SharedGrid::new(grid)
}

fn unknown_block(id: BlockId) -> LightingError {
    InputError::UnknownBlock(id).into()
}
