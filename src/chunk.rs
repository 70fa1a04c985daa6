//! Splitting images into square tiles and joining them back together.

use itertools::Itertools;

use crate::image::draw::Canvas;
use crate::image::{Color, Image, Rect};
use crate::{Error, Result};

/// A row-major grid of image tiles produced by [`split`].
///
/// Grids made by [`split`] hold `chunk_size` by `chunk_size` pixel tiles, except for the last
/// column and the last row, which hold the remainder and may be smaller.
#[derive(Debug, Clone)]
pub struct ChunkGrid {
    chunk_size: u32,
    rows: Vec<Vec<Image>>,
}

impl ChunkGrid {
    /// Assembles a grid from preexisting tiles. The grid is only validated by [`join`].
    ///
    /// `chunk_size` records the size the tiles were cut with. [`join`] derives the chunk size from
    /// the first tile instead.
    pub fn new(chunk_size: u32, rows: Vec<Vec<Image>>) -> Self {
        Self { chunk_size, rows }
    }

    #[inline]
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    #[inline]
    pub fn rows(&self) -> &[Vec<Image>] {
        &self.rows
    }

    /// Returns the number of tile rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of tiles in the first row.
    pub fn num_columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn into_rows(self) -> Vec<Vec<Image>> {
        self.rows
    }
}

/// Splits `image` into tiles of at most `chunk_size` by `chunk_size` pixels.
///
/// Tiles are cropped out of `image` and keep its pixel format, scale and orientation tag.
///
/// # Errors
///
/// Fails if `chunk_size` is 0.
pub fn split(image: &Image, chunk_size: u32) -> Result<ChunkGrid> {
    if chunk_size == 0 {
        return Err(Error::mismatch("chunk size", "at least 1", 0).logged());
    }

    let step = chunk_size as usize;
    let rows = (0..image.height())
        .step_by(step)
        .map(|y| {
            (0..image.width())
                .step_by(step)
                .map(|x| {
                    let w = chunk_size.min(image.width() - x);
                    let h = chunk_size.min(image.height() - y);
                    image.crop(Rect::from_top_left(x, y, w, h))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let grid = ChunkGrid::new(chunk_size, rows);
    log::trace!(
        "split {image:?} into {}x{} grid of {chunk_size}px chunks",
        grid.num_columns(),
        grid.num_rows(),
    );
    Ok(grid)
}

/// Reassembles a [`ChunkGrid`] into one image.
///
/// The size of the first tile is the chunk size: the result is `columns * chunk_width` by
/// `rows * chunk_height` pixels, and every tile is drawn at its grid-aligned offset. When the
/// tiles in the last row or column are smaller, the uncovered remainder is filled
/// with [`Color::NULL`].
/// The declared [`ChunkGrid::chunk_size`] is not consulted.
///
/// The grid must be rectangular. Every tile must have the width of the tile at the top of its
/// column and the height of the tile at the start of its row. Tiles that are not in the last row
/// or column must be exactly chunk sized, the others at most that large. The result uses the
/// pixel format, scale and orientation of the first tile.
///
/// # Errors
///
/// Fails with [`Error::InvalidGrid`] if the grid is empty or violates the rules above.
pub fn join(grid: &ChunkGrid) -> Result<Image> {
    let first = grid
        .rows
        .first()
        .and_then(|row| row.first())
        .ok_or_else(|| Error::InvalidGrid("grid contains no tiles".into()).logged())?;
    let (chunk_w, chunk_h) = (first.width(), first.height());

    if !grid.rows.iter().map(Vec::len).all_equal() {
        return Err(Error::InvalidGrid("rows have different lengths".into()).logged());
    }

    let widths = grid.rows[0].iter().map(Image::width).collect::<Vec<_>>();
    let heights = grid
        .rows
        .iter()
        .map(|row| row[0].height())
        .collect::<Vec<_>>();
    check_sizes(&widths, chunk_w, "column")?;
    check_sizes(&heights, chunk_h, "row")?;

    for (row, &height) in grid.rows.iter().zip(&heights) {
        for (tile, &width) in row.iter().zip(&widths) {
            if tile.width() != width || tile.height() != height {
                return Err(Error::InvalidGrid(format!(
                    "tile {tile:?} does not match its {width}x{height} grid cell"
                ))
                .logged());
            }
        }
    }

    let canvas_size = u32::try_from(widths.len())
        .ok()
        .and_then(|cols| cols.checked_mul(chunk_w))
        .zip(
            u32::try_from(heights.len())
                .ok()
                .and_then(|rows| rows.checked_mul(chunk_h)),
        )
        .ok_or_else(|| Error::InvalidGrid("joined image is too large".into()).logged())?;
    log::trace!(
        "joining {}x{} grid of {chunk_w}x{chunk_h} chunks into {}x{}",
        widths.len(),
        heights.len(),
        canvas_size.0,
        canvas_size.1,
    );

    let mut canvas = Canvas::new(canvas_size, first.format(), Color::NULL)?;
    for (row, y) in grid.rows.iter().zip((0..).step_by(chunk_h as usize)) {
        for (tile, x) in row.iter().zip((0..).step_by(chunk_w as usize)) {
            canvas.draw_at(tile, x, y);
        }
    }

    canvas.finish(first.scale(), first.orientation())
}

fn check_sizes(sizes: &[u32], chunk_size: u32, what: &str) -> Result<()> {
    let Some((last, interior)) = sizes.split_last() else {
        return Ok(());
    };
    if let Some(size) = interior.iter().find(|&&size| size != chunk_size) {
        return Err(Error::InvalidGrid(format!(
            "interior {what} is {size}px, expected the chunk size {chunk_size}px"
        ))
        .logged());
    }
    if *last > chunk_size {
        return Err(Error::InvalidGrid(format!(
            "last {what} is {last}px, larger than the chunk size {chunk_size}px"
        ))
        .logged());
    }
    Ok(())
}
