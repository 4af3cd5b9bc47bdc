//! Grouping finder patterns into symbol candidates.
//!
//! Patterns are binned by module size, every right-angled triple inside a
//! bin (plus its neighbour) becomes a candidate, and candidates are ranked
//! by how square and size-consistent they look.
use super::finder::FinderPattern;
use crate::models::Point;

/// Three ordered finder centres and the symbol size they imply
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolGeometry {
    /// Top-left finder centre (the right-angle corner)
    pub top_left: Point,
    /// Top-right finder centre
    pub top_right: Point,
    /// Bottom-left finder centre
    pub bottom_left: Point,
    /// Module size measured across the symbol
    pub module_size: f32,
    /// Modules per side (21, 25, ... 177)
    pub dimension: usize,
}

impl SymbolGeometry {
    /// Outer corners of the symbol (TL, TR, BR, BL).
    ///
    /// Finder centres sit 3.5 modules inside the symbol edge; the fourth
    /// corner completes the parallelogram.
    pub fn outer_corners(&self) -> [Point; 4] {
        let span = (self.dimension as f32 - 7.0).max(1.0);
        let (tl, tr, bl) = (self.top_left, self.top_right, self.bottom_left);
        let dx = Point::new((tr.x - tl.x) / span, (tr.y - tl.y) / span);
        let dy = Point::new((bl.x - tl.x) / span, (bl.y - tl.y) / span);
        let at = |base: Point, kx: f32, ky: f32| {
            Point::new(base.x + kx * dx.x + ky * dy.x, base.y + kx * dx.y + ky * dy.y)
        };
        let br = Point::new(tr.x + bl.x - tl.x, tr.y + bl.y - tl.y);
        [
            at(tl, -3.5, -3.5),
            at(tr, 3.5, -3.5),
            at(br, 3.5, 3.5),
            at(bl, -3.5, 3.5),
        ]
    }
}

/// Rank-ordered candidate geometries, best first, at most `max_groups`
pub fn candidate_geometries(patterns: &[FinderPattern], max_groups: usize) -> Vec<SymbolGeometry> {
    let mut groups = group_finder_patterns(patterns);
    score_and_trim_groups(&mut groups, patterns, max_groups);
    groups
        .iter()
        .filter_map(|g| order_finder_patterns(&patterns[g[0]], &patterns[g[1]], &patterns[g[2]]))
        .collect()
}

fn order_finder_patterns(
    a: &FinderPattern,
    b: &FinderPattern,
    c: &FinderPattern,
) -> Option<SymbolGeometry> {
    let patterns = [a, b, c];

    if patterns.iter().any(|p| p.module_size < 1.0) {
        return None;
    }

    // Find the right-angle corner (top-left)
    let mut best_idx = 0usize;
    let mut best_cos = f32::INFINITY;
    for i in 0..3 {
        let p = &patterns[i].center;
        let p1 = &patterns[(i + 1) % 3].center;
        let p2 = &patterns[(i + 2) % 3].center;

        let v1x = p1.x - p.x;
        let v1y = p1.y - p.y;
        let v2x = p2.x - p.x;
        let v2y = p2.y - p.y;
        let dot = v1x * v2x + v1y * v2y;
        let denom = (v1x * v1x + v1y * v1y).sqrt() * (v2x * v2x + v2y * v2y).sqrt();
        if denom == 0.0 {
            continue;
        }
        let cos = (dot / denom).abs();
        if cos < best_cos {
            best_cos = cos;
            best_idx = i;
        }
    }

    let tl = patterns[best_idx];
    let p1 = patterns[(best_idx + 1) % 3];
    let p2 = patterns[(best_idx + 2) % 3];

    // With y pointing down, TR is clockwise from BL around TL
    let cross = (p1.center.x - tl.center.x) * (p2.center.y - tl.center.y)
        - (p1.center.y - tl.center.y) * (p2.center.x - tl.center.x);
    let (tr, bl) = if cross > 0.0 { (p1, p2) } else { (p2, p1) };

    let avg_module = (tl.module_size + tr.module_size + bl.module_size) / 3.0;
    let d_tr = tl.center.distance(&tr.center);
    let d_bl = tl.center.distance(&bl.center);

    let dim1 = estimate_dimension_from_distance(d_tr, avg_module)?;
    let dim2 = estimate_dimension_from_distance(d_bl, avg_module)?;
    let dimension = if dim1 == dim2 {
        dim1
    } else if dim1.abs_diff(dim2) <= 4 {
        // Snap the average back onto the 4k+1 lattice
        let mean = (dim1 + dim2) as f32 / 2.0;
        let version = ((mean - 17.0) / 4.0).round().max(1.0) as usize;
        17 + 4 * version
    } else {
        return None;
    };

    let module_size = (d_tr + d_bl) / 2.0 / (dimension as f32 - 7.0);
    let module_ratio = module_size / avg_module;
    if !(0.7..=1.3).contains(&module_ratio) {
        return None;
    }

    Some(SymbolGeometry {
        top_left: tl.center,
        top_right: tr.center,
        bottom_left: bl.center,
        module_size,
        dimension,
    })
}

fn estimate_dimension_from_distance(distance: f32, module_size: f32) -> Option<usize> {
    if module_size <= 0.0 {
        return None;
    }
    let raw_dim = distance / module_size + 7.0;
    if raw_dim < 19.0 {
        return None;
    }
    let version = ((raw_dim - 17.0) / 4.0).round() as i32;
    if !(1..=40).contains(&version) {
        return None;
    }
    Some(17 + 4 * version as usize)
}

/// Finder triples that could belong to one symbol
fn group_finder_patterns(patterns: &[FinderPattern]) -> Vec<[usize; 3]> {
    if patterns.len() < 3 {
        return Vec::new();
    }

    let mut indexed: Vec<(usize, f32)> = patterns
        .iter()
        .enumerate()
        .map(|(i, p)| (i, p.module_size))
        .collect();
    indexed.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut bins: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut bin_min = 0.0f32;
    let bin_ratio = 1.25f32;

    for (idx, size) in indexed {
        if current.is_empty() {
            current.push(idx);
            bin_min = size;
            continue;
        }

        if size <= bin_min * bin_ratio {
            current.push(idx);
        } else {
            bins.push(current);
            current = vec![idx];
            bin_min = size;
        }
    }
    if !current.is_empty() {
        bins.push(current);
    }

    // Try each bin and its neighbor to allow slight size mismatch
    let mut all_groups = Vec::new();
    for i in 0..bins.len() {
        let mut indices = bins[i].clone();
        if i + 1 < bins.len() {
            indices.extend_from_slice(&bins[i + 1]);
        }
        if indices.len() < 3 {
            continue;
        }
        for group in build_groups(patterns, &indices) {
            let mut key = group;
            key.sort_unstable();
            if !all_groups.contains(&key) {
                all_groups.push(key);
            }
        }
    }

    all_groups
}

fn build_groups(patterns: &[FinderPattern], indices: &[usize]) -> Vec<[usize; 3]> {
    let mut groups = Vec::new();

    for idx_i in 0..indices.len() {
        let i = indices[idx_i];
        for idx_j in (idx_i + 1)..indices.len() {
            let j = indices[idx_j];
            for &k in indices.iter().skip(idx_j + 1) {
                let pi = &patterns[i];
                let pj = &patterns[j];
                let pk = &patterns[k];

                let sizes = [pi.module_size, pj.module_size, pk.module_size];
                let min_size = sizes.iter().fold(f32::INFINITY, |a, &b| a.min(b));
                let max_size = sizes.iter().fold(0.0f32, |a, &b| a.max(b));
                if max_size / min_size > 2.0 {
                    continue;
                }

                let d_ij = pi.center.distance(&pj.center);
                let d_ik = pi.center.distance(&pk.center);
                let d_jk = pj.center.distance(&pk.center);

                let distances = [d_ij, d_ik, d_jk];
                let min_d = distances.iter().fold(f32::INFINITY, |a, &b| a.min(b));
                let max_d = distances.iter().fold(0.0f32, |a, &b| a.max(b));

                let avg_module = (pi.module_size + pj.module_size + pk.module_size) / 3.0;
                if min_d < avg_module * 2.5 {
                    continue;
                }
                if max_d / min_d > 5.0 {
                    continue;
                }

                if best_cosine(d_ij, d_ik, d_jk) >= 0.4 {
                    continue;
                }

                groups.push([i, j, k]);
            }
        }
    }

    groups
}

/// Smallest |cos| among the triangle's three angles
fn best_cosine(d01: f32, d02: f32, d12: f32) -> f32 {
    let a2 = d01 * d01;
    let b2 = d02 * d02;
    let c2 = d12 * d12;
    let cos_0 = ((a2 + b2 - c2) / (2.0 * d01 * d02)).abs();
    let cos_1 = ((a2 + c2 - b2) / (2.0 * d01 * d12)).abs();
    let cos_2 = ((b2 + c2 - a2) / (2.0 * d02 * d12)).abs();
    cos_0.min(cos_1).min(cos_2)
}

fn score_and_trim_groups(groups: &mut Vec<[usize; 3]>, patterns: &[FinderPattern], max_groups: usize) {
    let mut scored: Vec<(f32, [usize; 3])> = groups
        .iter()
        .map(|g| (group_score(patterns, g), *g))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    scored.truncate(max_groups);
    *groups = scored.into_iter().map(|(_, g)| g).collect();
}

/// Lower is better: size consistency, leg regularity, squareness
fn group_score(patterns: &[FinderPattern], group: &[usize; 3]) -> f32 {
    let p0 = &patterns[group[0]];
    let p1 = &patterns[group[1]];
    let p2 = &patterns[group[2]];

    let sizes = [p0.module_size, p1.module_size, p2.module_size];
    let min_size = sizes.iter().fold(f32::INFINITY, |a, &b| a.min(b));
    let max_size = sizes.iter().fold(0.0f32, |a, &b| a.max(b));
    let size_ratio = max_size / min_size;

    let d01 = p0.center.distance(&p1.center);
    let d02 = p0.center.distance(&p2.center);
    let d12 = p1.center.distance(&p2.center);
    let mut legs = [d01, d02, d12];
    legs.sort_by(f32::total_cmp);
    // Two short legs should match for a square symbol
    let leg_ratio = legs[1] / legs[0];
    let distortion = legs[2] / legs[0];

    size_ratio * 2.0 + leg_ratio + distortion + best_cosine(d01, d02, d12)
}
