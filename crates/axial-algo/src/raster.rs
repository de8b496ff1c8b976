//! Raster compare pipeline: rasterize weighted lines, blur, difference,
//! vectorize threshold bands.

use axial_core::geometry::{BoundingBox, Vec2};
use axial_core::{check_cancel, EngineError, EngineResult, ProgressSink};
use serde::{Deserialize, Serialize};

/// Difference formula. Only the normalized form is supported; the legacy
/// relative-percent mode is rejected as bad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompareMode {
    Normalized = 0,
}

impl CompareMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Normalized),
            _ => None,
        }
    }
}

/// A rectangular float grid with a planar bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Raster {
    pub bounds: BoundingBox,
    pub width: u32,
    pub height: u32,
    pub pixel_size: f64,
    /// Row-major, `width` floats per row, row 0 at the bottom.
    pub data: Vec<f32>,
}

impl Raster {
    fn new(bounds: BoundingBox, pixel_size: f64) -> EngineResult<Self> {
        let width = (bounds.width() / pixel_size).ceil().max(1.0) as u64;
        let height = (bounds.height() / pixel_size).ceil().max(1.0) as u64;
        if width.checked_mul(height).map_or(true, |n| n > 1 << 31) {
            return Err(EngineError::MemoryLimit(format!(
                "raster of {width}x{height} pixels exceeds the internal cap"
            )));
        }
        Ok(Self {
            bounds,
            width: width as u32,
            height: height as u32,
            pixel_size,
            data: vec![0.0; (width * height) as usize],
        })
    }

    #[inline]
    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    fn at_mut(&mut self, x: u32, y: u32) -> &mut f32 {
        &mut self.data[(y * self.width + x) as usize]
    }

    /// World position of a pixel corner.
    #[inline]
    pub fn corner(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new(
            self.bounds.min.x + x as f64 * self.pixel_size,
            self.bounds.min.y + y as f64 * self.pixel_size,
        )
    }
}

/// Accumulate `value · length-inside-pixel` for one segment, walking the
/// pixel-grid crossings exactly.
fn splat_segment(raster: &mut Raster, p0: Vec2, p1: Vec2, value: f32) {
    let length = p0.distance(p1);
    if length <= f64::EPSILON {
        return;
    }
    let inv = 1.0 / raster.pixel_size;
    let to_grid = |p: Vec2| -> Vec2 {
        Vec2::new(
            (p.x - raster.bounds.min.x) * inv,
            (p.y - raster.bounds.min.y) * inv,
        )
    };
    let a = to_grid(p0);
    let b = to_grid(p1);
    let mut ts: Vec<f64> = vec![0.0, 1.0];
    for (start, end) in [(a.x, b.x), (a.y, b.y)] {
        let (lo, hi) = (start.min(end), start.max(end));
        let mut line = lo.ceil();
        while line < hi {
            if (end - start).abs() > f64::EPSILON {
                ts.push((line - start) / (end - start));
            }
            line += 1.0;
        }
    }
    ts.sort_by(f64::total_cmp);
    ts.dedup_by(|x, y| (*x - *y).abs() < 1e-12);
    for pair in ts.windows(2) {
        let (t0, t1) = (pair[0], pair[1]);
        if t1 <= t0 {
            continue;
        }
        let mid = 0.5 * (t0 + t1);
        let gx = a.x + (b.x - a.x) * mid;
        let gy = a.y + (b.y - a.y) * mid;
        let x = (gx.floor().max(0.0) as u32).min(raster.width - 1);
        let y = (gy.floor().max(0.0) as u32).min(raster.height - 1);
        *raster.at_mut(x, y) += value * ((t1 - t0) * length) as f32;
    }
}

/// Separable gaussian blur with standard deviation `sigma` (world units).
fn gaussian_blur(raster: &mut Raster, sigma: f64) {
    if sigma <= 0.0 {
        return;
    }
    let sigma_px = sigma / raster.pixel_size;
    let kernel_radius = (sigma_px * 3.0).ceil() as i64;
    if kernel_radius < 1 {
        return;
    }
    let mut kernel: Vec<f64> = (-kernel_radius..=kernel_radius)
        .map(|i| (-(i as f64).powi(2) / (2.0 * sigma_px * sigma_px)).exp())
        .collect();
    let total: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= total;
    }

    let (w, h) = (raster.width as i64, raster.height as i64);
    let mut pass = vec![0.0f32; raster.data.len()];
    // Horizontal pass.
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0f64;
            for (ki, &k) in kernel.iter().enumerate() {
                let sx = x + ki as i64 - kernel_radius;
                if (0..w).contains(&sx) {
                    sum += k * raster.data[(y * w + sx) as usize] as f64;
                }
            }
            pass[(y * w + x) as usize] = sum as f32;
        }
    }
    // Vertical pass.
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0f64;
            for (ki, &k) in kernel.iter().enumerate() {
                let sy = y + ki as i64 - kernel_radius;
                if (0..h).contains(&sy) {
                    sum += k * pass[(sy * w + x) as usize] as f64;
                }
            }
            raster.data[(y * w + x) as usize] = sum as f32;
        }
    }
}

/// Compare two weighted line sets: rasterize both, blur, and produce the
/// normalized difference raster together with its value range.
pub fn compare_results(
    lines1: &[(Vec2, Vec2)],
    values1: &[f32],
    lines2: &[(Vec2, Vec2)],
    values2: &[f32],
    mode: CompareMode,
    pixel_size: f64,
    blur_radius: f64,
    progress: &dyn ProgressSink,
) -> EngineResult<(Raster, f32, f32)> {
    let CompareMode::Normalized = mode;
    if lines1.len() != values1.len() || lines2.len() != values2.len() {
        return Err(EngineError::BadInput(
            "line and value counts do not match".into(),
        ));
    }
    if lines1.is_empty() && lines2.is_empty() {
        return Err(EngineError::BadInput("no lines to compare".into()));
    }
    if pixel_size <= 0.0 {
        return Err(EngineError::BadInput("pixel size must be positive".into()));
    }

    let mut bounds = BoundingBox::empty();
    for &(a, b) in lines1.iter().chain(lines2) {
        bounds.grow(a);
        bounds.grow(b);
    }
    bounds.expand(3.0 * blur_radius.max(0.0) + pixel_size);

    let mut raster_a = Raster::new(bounds, pixel_size)?;
    let mut raster_b = Raster::new(bounds, pixel_size)?;
    for (&(p0, p1), &v) in lines1.iter().zip(values1) {
        splat_segment(&mut raster_a, p0, p1, v);
    }
    check_cancel(progress, Some("Rasterizing"), 0.3)?;
    for (&(p0, p1), &v) in lines2.iter().zip(values2) {
        splat_segment(&mut raster_b, p0, p1, v);
    }
    check_cancel(progress, Some("Blurring"), 0.5)?;

    gaussian_blur(&mut raster_a, blur_radius);
    gaussian_blur(&mut raster_b, blur_radius);
    check_cancel(progress, Some("Comparing"), 0.8)?;

    const EPS: f32 = 1e-12;
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut out = raster_a.clone();
    for i in 0..out.data.len() {
        let a = raster_a.data[i];
        let b = raster_b.data[i];
        let denom = a.abs().max(b.abs()).max(EPS);
        let v = (b - a) / denom;
        out.data[i] = v;
        min = min.min(v);
        max = max.max(v);
    }
    Ok((out, min, max))
}

/// Vectorize the pixels whose value falls inside `[low, high)` into closed
/// polygons (pixel-corner loops), one list per supplied range.
pub fn raster_to_polygons(
    raster: &Raster,
    ranges: &[(f32, f32)],
    progress: &dyn ProgressSink,
) -> EngineResult<Vec<Vec<Vec<Vec2>>>> {
    let mut out = Vec::with_capacity(ranges.len());
    for (ri, &(low, high)) in ranges.iter().enumerate() {
        let inside = |x: i64, y: i64| -> bool {
            if x < 0 || y < 0 || x >= raster.width as i64 || y >= raster.height as i64 {
                return false;
            }
            let v = raster.at(x as u32, y as u32);
            v >= low && v < high
        };

        // Boundary edges between inside and outside pixels, keyed by start
        // corner, oriented so the inside is on the left. A corner can carry
        // two outgoing edges where regions touch diagonally.
        let mut edges: hashbrown::HashMap<(i64, i64), Vec<(i64, i64)>> =
            hashbrown::HashMap::new();
        let mut push_edge =
            |edges: &mut hashbrown::HashMap<(i64, i64), Vec<(i64, i64)>>,
             from: (i64, i64),
             to: (i64, i64)| {
                edges.entry(from).or_default().push(to);
            };
        for y in 0..raster.height as i64 {
            for x in 0..raster.width as i64 {
                if !inside(x, y) {
                    continue;
                }
                if !inside(x, y - 1) {
                    push_edge(&mut edges, (x, y), (x + 1, y));
                }
                if !inside(x + 1, y) {
                    push_edge(&mut edges, (x + 1, y), (x + 1, y + 1));
                }
                if !inside(x, y + 1) {
                    push_edge(&mut edges, (x + 1, y + 1), (x, y + 1));
                }
                if !inside(x - 1, y) {
                    push_edge(&mut edges, (x, y + 1), (x, y));
                }
            }
        }

        // Stitch edges into loops.
        let mut polygons: Vec<Vec<Vec2>> = Vec::new();
        let mut take = |edges: &mut hashbrown::HashMap<(i64, i64), Vec<(i64, i64)>>,
                        from: (i64, i64)|
         -> Option<(i64, i64)> {
            let list = edges.get_mut(&from)?;
            let to = list.pop();
            if list.is_empty() {
                edges.remove(&from);
            }
            to
        };
        loop {
            let Some((&start, _)) = edges.iter().next() else {
                break;
            };
            let mut ring: Vec<Vec2> = Vec::new();
            let mut current = start;
            loop {
                ring.push(raster.corner(current.0 as u32, current.1 as u32));
                match take(&mut edges, current) {
                    Some(next) => current = next,
                    None => break,
                }
                if current == start {
                    break;
                }
            }
            if ring.len() >= 3 {
                // Drop collinear run-on corners.
                let mut simplified: Vec<Vec2> = Vec::with_capacity(ring.len());
                for i in 0..ring.len() {
                    let prev = ring[(i + ring.len() - 1) % ring.len()];
                    let here = ring[i];
                    let next = ring[(i + 1) % ring.len()];
                    if here.sub(prev).cross(next.sub(here)).abs() > 1e-12 {
                        simplified.push(here);
                    }
                }
                if simplified.len() >= 3 {
                    polygons.push(simplified);
                }
            }
        }
        out.push(polygons);
        check_cancel(
            progress,
            Some("Vectorizing"),
            (ri + 1) as f32 / ranges.len().max(1) as f32,
        )?;
    }
    Ok(out)
}
