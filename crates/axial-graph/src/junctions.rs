//! Standalone junction enumeration across map layers.
//!
//! A junction qualifies where a layer-0 line crosses a layer-1 line, or
//! where three or more lines of the *same* layer meet in one point (two
//! same-layer lines crossing is ordinary network continuity, not a
//! junction). Unlink points suppress junctions within tolerance.

use axial_core::geometry::{segment_intersection, BoundingBox, Vec2};
use axial_core::{check_cancel, EngineError, EngineResult, GridIndex, ProgressSink};
use hashbrown::HashMap;

/// One input layer: coordinates plus index pairs.
#[derive(Debug, Clone, Copy)]
pub struct JunctionLayer<'a> {
    pub coords: &'a [Vec2],
    pub pairs: &'a [(u32, u32)],
}

impl<'a> JunctionLayer<'a> {
    fn line(&self, i: usize) -> EngineResult<(Vec2, Vec2)> {
        let (a, b) = self.pairs[i];
        let p0 = *self.coords.get(a as usize).ok_or_else(|| {
            EngineError::BadInput(format!("line {i} references coordinate {a} out of range"))
        })?;
        let p1 = *self.coords.get(b as usize).ok_or_else(|| {
            EngineError::BadInput(format!("line {i} references coordinate {b} out of range"))
        })?;
        Ok((p0, p1))
    }
}

const TOLERANCE: f64 = 1e-3;

#[inline]
fn snap_key(p: Vec2) -> (i64, i64) {
    (
        (p.x / TOLERANCE).round() as i64,
        (p.y / TOLERANCE).round() as i64,
    )
}

/// Enumerate junction points for one or two layers.
pub fn find_layer_junctions(
    layer0: JunctionLayer<'_>,
    layer1: Option<JunctionLayer<'_>>,
    unlinks: &[Vec2],
    progress: &dyn ProgressSink,
) -> EngineResult<Vec<Vec2>> {
    if layer0.pairs.is_empty() {
        return Err(EngineError::BadInput("layer 0 has no lines".into()));
    }

    // Meeting points keyed by snapped position; counts distinct lines per
    // layer so the ≥3 same-layer rule can be applied.
    let mut meetings: HashMap<(i64, i64), (Vec2, Vec<(u8, u32)>)> = HashMap::new();
    let mut record = |p: Vec2, layer: u8, line: u32| {
        let entry = meetings.entry(snap_key(p)).or_insert((p, Vec::new()));
        if !entry.1.contains(&(layer, line)) {
            entry.1.push((layer, line));
        }
    };

    // Same-layer shared points (endpoints and interior crossings).
    for (layer_id, layer) in [(0u8, Some(layer0)), (1u8, layer1)] {
        let Some(layer) = layer else { continue };
        for i in 0..layer.pairs.len() {
            let (a0, a1) = layer.line(i)?;
            record(a0, layer_id, i as u32);
            record(a1, layer_id, i as u32);
            for j in i + 1..layer.pairs.len() {
                let (b0, b1) = layer.line(j)?;
                if let Some((ta, _)) = segment_intersection(a0, a1, b0, b1) {
                    let p = axial_core::geometry::point_on_segment(a0, a1, ta);
                    record(p, layer_id, i as u32);
                    record(p, layer_id, j as u32);
                }
            }
            if i % 512 == 0 {
                check_cancel(progress, Some("Scanning layers"), 0.4)?;
            }
        }
    }

    // Cross-layer crossings.
    if let Some(layer1) = layer1 {
        let mut bounds = BoundingBox::empty();
        for i in 0..layer1.pairs.len() {
            let (p0, p1) = layer1.line(i)?;
            bounds.grow(p0);
            bounds.grow(p1);
        }
        if bounds.is_valid() {
            let mut grid = GridIndex::new(bounds, (bounds.width().max(bounds.height()) / 16.0).max(1.0));
            for i in 0..layer1.pairs.len() {
                let (p0, p1) = layer1.line(i)?;
                grid.insert(i as u32, &BoundingBox::from_points([p0, p1]));
            }
            for i in 0..layer0.pairs.len() {
                let (a0, a1) = layer0.line(i)?;
                let bb = BoundingBox::from_points([a0, a1]);
                for j in grid.query_dedup(&bb) {
                    let (b0, b1) = layer1.line(j as usize)?;
                    if let Some((ta, _)) = segment_intersection(a0, a1, b0, b1) {
                        let p = axial_core::geometry::point_on_segment(a0, a1, ta);
                        let entry = meetings.entry(snap_key(p)).or_insert((p, Vec::new()));
                        // Cross-layer marker qualifies regardless of counts.
                        entry.1.push((2, u32::MAX));
                    }
                }
                if i % 512 == 0 {
                    check_cancel(progress, Some("Crossing layers"), 0.8)?;
                }
            }
        }
    }

    let mut out: Vec<Vec2> = Vec::new();
    'meetings: for (_, (position, incidence)) in meetings {
        let cross_layer = incidence.iter().any(|&(layer, _)| layer == 2);
        let layer0_lines = incidence.iter().filter(|&&(layer, _)| layer == 0).count();
        let layer1_lines = incidence.iter().filter(|&&(layer, _)| layer == 1).count();
        if !(cross_layer || layer0_lines >= 3 || layer1_lines >= 3) {
            continue;
        }
        for unlink in unlinks {
            if unlink.distance(position) <= TOLERANCE {
                continue 'meetings;
            }
        }
        out.push(position);
    }
    out.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axial_core::NullProgress;

    fn layer<'a>(coords: &'a [Vec2], pairs: &'a [(u32, u32)]) -> JunctionLayer<'a> {
        JunctionLayer { coords, pairs }
    }

    #[test]
    fn test_two_layers_crossing() {
        let c0 = [Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0)];
        let p0 = [(0u32, 1u32)];
        let c1 = [Vec2::new(1.0, 1.0), Vec2::new(1.0, -1.0)];
        let p1 = [(0u32, 1u32)];

        let found =
            find_layer_junctions(layer(&c0, &p0), Some(layer(&c1, &p1)), &[], &NullProgress)
                .unwrap();
        assert_eq!(found, vec![Vec2::new(1.0, 0.0)]);

        let unlinked = find_layer_junctions(
            layer(&c0, &p0),
            Some(layer(&c1, &p1)),
            &[Vec2::new(1.0, 0.0)],
            &NullProgress,
        )
        .unwrap();
        assert!(unlinked.is_empty());
    }

    #[test]
    fn test_two_same_layer_lines_do_not_qualify() {
        let c = [Vec2::new(-1.0, 0.0), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)];
        let p = [(0u32, 1u32), (1, 2)];
        let found = find_layer_junctions(layer(&c, &p), None, &[], &NullProgress).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_three_same_layer_lines_qualify() {
        let c = [
            Vec2::new(-1.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
        ];
        let p = [(0u32, 1u32), (1, 2), (1, 3)];
        let found = find_layer_junctions(layer(&c, &p), None, &[], &NullProgress).unwrap();
        assert_eq!(found, vec![Vec2::new(0.0, 0.0)]);
    }
}
