//! Score normalizations, applied as post-passes (vector in, vector out).
//!
//! Formulas follow the established space-syntax conventions; the guarded
//! denominators pass values through unchanged where a node has too few
//! reachable neighbors for the formula to be meaningful.

/// Linear (min, max) → (0, 1). A constant input maps to all zeros.
pub fn standard_normalize(values: &[f32], out: &mut [f32]) {
    assert_eq!(values.len(), out.len());
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    let range = max - min;
    if values.is_empty() || range <= 0.0 {
        out.fill(0.0);
        return;
    }
    for (o, &v) in out.iter_mut().zip(values) {
        *o = (v - min) / range;
    }
}

/// Choice normalization by pair count: `value / ((N-1)(N-2))`, passthrough
/// when fewer than three nodes were reached.
pub fn choice_normalize(values: &[f32], node_counts: &[u32], out: &mut [f32]) {
    for i in 0..values.len() {
        let n = node_counts[i] as f64;
        let denom = (n - 1.0) * (n - 2.0);
        out[i] = if denom > 0.0 {
            (values[i] as f64 / denom) as f32
        } else {
            values[i]
        };
    }
}

/// Syntax (NACH-style) normalization: `log10(value+1) / log10(TD+2)`.
pub fn syntax_normalize(values: &[f32], total_depths: &[f32], out: &mut [f32]) {
    for i in 0..values.len() {
        let td = total_depths[i] as f64;
        out[i] = ((values[i] as f64 + 1.0).log10() / (td + 2.0).log10()) as f32;
    }
}

/// Angular integration normalization: `(N-1)/(TD+1)`.
pub fn angular_integration_normalize(node_counts: &[u32], total_depths: &[f32], out: &mut [f32]) {
    for i in 0..node_counts.len() {
        out[i] = ((node_counts[i] as f64 - 1.0) / (total_depths[i] as f64 + 1.0)) as f32;
    }
}

/// Length-weighted variant: `TW/(TDW+1)` with TW excluding the origin.
pub fn angular_integration_normalize_weight(
    total_weights: &[f32],
    total_depth_weights: &[f32],
    out: &mut [f32],
) {
    for i in 0..total_weights.len() {
        out[i] = (total_weights[i] as f64 / (total_depth_weights[i] as f64 + 1.0)) as f32;
    }
}

/// Syntax variant of angular integration: `N^1.2/(TD+1)`.
pub fn angular_integration_syntax_normalize(
    node_counts: &[u32],
    total_depths: &[f32],
    out: &mut [f32],
) {
    for i in 0..node_counts.len() {
        out[i] = ((node_counts[i] as f64).powf(1.2) / (total_depths[i] as f64 + 1.0)) as f32;
    }
}

/// Length-weighted syntax variant: `TW^1.2/(TDW+1)`.
pub fn angular_integration_syntax_normalize_weight(
    total_weights: &[f32],
    total_depth_weights: &[f32],
    out: &mut [f32],
) {
    for i in 0..total_weights.len() {
        out[i] =
            ((total_weights[i] as f64).powf(1.2) / (total_depth_weights[i] as f64 + 1.0)) as f32;
    }
}

/// Hillier integration: `N²/(TD+1)`.
pub fn angular_integration_hillier_normalize(
    node_counts: &[u32],
    total_depths: &[f32],
    out: &mut [f32],
) {
    for i in 0..node_counts.len() {
        let n = node_counts[i] as f64;
        out[i] = (n * n / (total_depths[i] as f64 + 1.0)) as f32;
    }
}

/// Length-weighted Hillier variant: `TW²/(TDW+1)`.
pub fn angular_integration_hillier_normalize_weight(
    total_weights: &[f32],
    total_depth_weights: &[f32],
    out: &mut [f32],
) {
    for i in 0..total_weights.len() {
        let tw = total_weights[i] as f64;
        out[i] = (tw * tw / (total_depth_weights[i] as f64 + 1.0)) as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roughly(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(&x, &y)| if y == 0.0 { x.abs() < 1e-4 } else { ((x - y) / y).abs() < 1e-4 })
    }

    #[test]
    fn test_standard_normalize() {
        let values = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let mut out = [0.0f32; 5];
        standard_normalize(&values, &mut out);
        assert_eq!(out, [0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_standard_normalize_constant() {
        let values = [2.0f32; 3];
        let mut out = [1.0f32; 3];
        standard_normalize(&values, &mut out);
        assert_eq!(out, [0.0; 3]);
    }

    #[test]
    fn test_choice_normalize() {
        let values = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let counts = [1u32, 2, 3, 4, 5];
        let mut out = [0.0f32; 5];
        choice_normalize(&values, &counts, &mut out);
        assert!(roughly(&out, &[1.0, 2.0, 1.5, 4.0 / 6.0, 5.0 / 12.0]));
    }

    #[test]
    fn test_syntax_normalize() {
        let values = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let tds = [5.0f32, 4.0, 3.0, 2.0, 1.0];
        let mut out = [0.0f32; 5];
        syntax_normalize(&values, &tds, &mut out);
        for i in 0..5 {
            let expect = ((values[i] as f64 + 1.0).log10() / (tds[i] as f64 + 2.0).log10()) as f32;
            assert!((out[i] - expect).abs() < 1e-6);
        }
    }

    #[test]
    fn test_angular_integration_normalizations() {
        // Square fixture: N=4, TD=4 → 3/5; TW=9, TDW=12 → 9/13.
        let mut out = [0.0f32; 1];
        angular_integration_normalize(&[4], &[4.0], &mut out);
        assert!((out[0] - 0.6).abs() < 1e-6);
        angular_integration_normalize_weight(&[9.0], &[12.0], &mut out);
        assert!((out[0] - 9.0 / 13.0).abs() < 1e-6);
        angular_integration_syntax_normalize(&[4], &[4.0], &mut out);
        assert!((out[0] - (4.0f64.powf(1.2) / 5.0) as f32).abs() < 1e-6);
        angular_integration_hillier_normalize(&[5], &[0.0], &mut out);
        assert!((out[0] - 25.0).abs() < 1e-6);
    }
}
