use anyhow::Result;
use clonal_common::{Agent, Snapshot};

/// Number of chunks along one side of the grid.
pub const CHUNKS_PER_SIDE: usize = 10;

/// Side of the square grid implied by `n` agents (integer square root).
pub fn grid_side(n: usize) -> usize {
    let mut side = (n as f64).sqrt().floor() as usize;
    // Correct float rounding at perfect squares
    while (side + 1) * (side + 1) <= n {
        side += 1;
    }
    while side * side > n {
        side -= 1;
    }
    side
}

/// Chunk side length for a grid of `n` agents: `floor(floor(sqrt(n)) / 10)`.
#[inline(always)]
pub fn chunk_side(n: usize) -> usize {
    grid_side(n) / CHUNKS_PER_SIDE
}

/// Lazily yields the agents of each chunk, chunk origins in row-major order.
///
/// A chunk at origin `(x, y)` holds agents with `x <= xcor < x + side` and
/// `y - 0.5 <= ycor < y + side - 0.5`; the half-cell offset keeps the raised
/// sites of a hexagonal layout in the chunk of their column.
#[derive(Debug, Clone)]
pub struct GridChunks<'a> {
    agents: &'a [Agent],
    grid_side: usize,
    chunk_side: usize,
    origin_x: usize,
    origin_y: usize,
}

impl<'a> GridChunks<'a> {
    pub fn chunk_side(&self) -> usize {
        self.chunk_side
    }

    pub fn grid_side(&self) -> usize {
        self.grid_side
    }
}

impl<'a> Iterator for GridChunks<'a> {
    type Item = Vec<&'a Agent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.origin_x >= self.grid_side {
            return None;
        }

        let x_min = self.origin_x as f64;
        let x_max = (self.origin_x + self.chunk_side) as f64;
        let y_min = self.origin_y as f64 - 0.5;
        let y_max = (self.origin_y + self.chunk_side) as f64 - 0.5;

        let chunk = self
            .agents
            .iter()
            .filter(|a| a.x >= x_min && a.x < x_max && a.y >= y_min && a.y < y_max)
            .collect();

        // Advance to the next origin
        self.origin_y += self.chunk_side;
        if self.origin_y >= self.grid_side {
            self.origin_y = 0;
            self.origin_x += self.chunk_side;
        }

        Some(chunk)
    }
}

/// Splits a snapshot into square chunks for local statistics.
///
/// The grid is assumed square; a non-square agent count is reported and the
/// partition proceeds on the integer square root. Grids with fewer than 10
/// sites per side cannot be chunked.
pub fn grid_chunks(snapshot: &Snapshot) -> Result<GridChunks<'_>> {
    let n = snapshot.len();
    let side = grid_side(n);
    if side * side != n {
        log::warn!(
            "Agent count {} is not a perfect square; partitioning a {}x{} grid.",
            n, side, side
        );
    }

    let chunk = chunk_side(n);
    if chunk == 0 {
        anyhow::bail!(
            "grid side {} is too small to split into {} chunks per side",
            side,
            CHUNKS_PER_SIDE
        );
    }

    Ok(GridChunks {
        agents: snapshot.agents(),
        grid_side: side,
        chunk_side: chunk,
        origin_x: 0,
        origin_y: 0,
    })
}
