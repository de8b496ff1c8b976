//! Uniform-grid spatial index for broad-phase queries.
//!
//! The scene bounding box is partitioned into equally sized cells; each cell
//! stores the indices of every entity whose bounding box touches it. Queries
//! return candidate sets only; callers refine with exact geometric tests.

use crate::geometry::{BoundingBox, Vec2};

/// Broad-phase index over `u32` entity ids.
#[derive(Debug, Clone)]
pub struct GridIndex {
    bounds: BoundingBox,
    cell_size: f64,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<u32>>,
}

impl GridIndex {
    /// Create an empty index covering `bounds` with roughly `cell_size`-sized
    /// cells. The box is padded slightly so boundary entities always fall
    /// inside.
    pub fn new(mut bounds: BoundingBox, cell_size: f64) -> Self {
        if !bounds.is_valid() {
            bounds = BoundingBox {
                min: Vec2::default(),
                max: Vec2::default(),
            };
        }
        bounds.expand(cell_size.max(1e-9) * 0.01 + 1e-9);
        let cell_size = cell_size.max(1e-9);
        let cols = (bounds.width() / cell_size).ceil().max(1.0) as usize;
        let rows = (bounds.height() / cell_size).ceil().max(1.0) as usize;
        Self {
            bounds,
            cell_size,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
        }
    }

    #[inline]
    fn cell_coords(&self, p: Vec2) -> (usize, usize) {
        let cx = ((p.x - self.bounds.min.x) / self.cell_size).floor();
        let cy = ((p.y - self.bounds.min.y) / self.cell_size).floor();
        let cx = (cx.max(0.0) as usize).min(self.cols - 1);
        let cy = (cy.max(0.0) as usize).min(self.rows - 1);
        (cx, cy)
    }

    /// Register an entity by its bounding box.
    pub fn insert(&mut self, id: u32, bb: &BoundingBox) {
        let (x0, y0) = self.cell_coords(bb.min);
        let (x1, y1) = self.cell_coords(bb.max);
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                self.cells[cy * self.cols + cx].push(id);
            }
        }
    }

    /// Register a point entity.
    pub fn insert_point(&mut self, id: u32, p: Vec2) {
        let (cx, cy) = self.cell_coords(p);
        self.cells[cy * self.cols + cx].push(id);
    }

    /// Collect candidate entity ids for a query box. Candidates may repeat
    /// when an entity spans several cells; `visit` each id and dedup on the
    /// caller side when exact tests are expensive.
    pub fn query(&self, bb: &BoundingBox, mut visit: impl FnMut(u32)) {
        if !bb.intersects(&self.bounds) {
            return;
        }
        let (x0, y0) = self.cell_coords(bb.min);
        let (x1, y1) = self.cell_coords(bb.max);
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                for &id in &self.cells[cy * self.cols + cx] {
                    visit(id);
                }
            }
        }
    }

    /// Deduplicated candidate list for a query box.
    pub fn query_dedup(&self, bb: &BoundingBox) -> Vec<u32> {
        let mut out = Vec::new();
        self.query(bb, |id| out.push(id));
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Candidates within `radius` of `p` (box query; refine exactly).
    pub fn query_around(&self, p: Vec2, radius: f64) -> Vec<u32> {
        let mut bb = BoundingBox::from_points([p]);
        bb.expand(radius);
        self.query_dedup(&bb)
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }
}
