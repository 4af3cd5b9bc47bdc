//! Finder pattern detection using 1:1:3:1:1 ratio scanning.
//!
//! Each row hit is confirmed by a vertical cross-check through its centre
//! and refined by a horizontal one, so the reported centre is accurate on
//! both axes. Hits from neighbouring rows inside the same centre stone are
//! averaged into one pattern.
use crate::models::{BitMatrix, Point};

/// Upper bound on row hits examined per scan line
const MAX_PATTERNS_PER_ROW: usize = 32;
/// Patterns handed to grouping, strongest first
const MAX_PATTERNS: usize = 24;

/// Centre of a finder pattern and its estimated module size in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPattern {
    /// Centre of the 3x3 stone
    pub center: Point,
    /// Estimated module size
    pub module_size: f32,
    /// Scan lines that confirmed this pattern
    pub count: usize,
}

impl FinderPattern {
    /// New pattern confirmed by a single scan line
    pub fn new(x: f32, y: f32, module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            module_size,
            count: 1,
        }
    }

    fn about_equals(&self, other: &FinderPattern) -> bool {
        let tolerance = self.module_size.max(other.module_size);
        (self.center.x - other.center.x).abs() <= tolerance
            && (self.center.y - other.center.y).abs() <= tolerance
            && (self.module_size - other.module_size).abs() <= tolerance * 0.5 + 1.0
    }

    fn combine(&self, other: &FinderPattern) -> FinderPattern {
        let total = (self.count + other.count) as f32;
        let (a, b) = (self.count as f32, other.count as f32);
        FinderPattern {
            center: Point::new(
                (self.center.x * a + other.center.x * b) / total,
                (self.center.y * a + other.center.y * b) / total,
            ),
            module_size: (self.module_size * a + other.module_size * b) / total,
            count: self.count + other.count,
        }
    }
}

/// Row-scanning finder detector
pub struct FinderDetector;

impl FinderDetector {
    /// All confirmed finder patterns, most strongly supported first
    pub fn detect(matrix: &BitMatrix) -> Vec<FinderPattern> {
        let width = matrix.width();
        let height = matrix.height();
        let mut candidates = Vec::new();

        for y in 0..height {
            // Skip rows without edges
            if !Self::has_significant_edges(matrix, y, width) {
                continue;
            }
            candidates.extend(Self::scan_row(matrix, y, width));
        }

        let mut merged = Self::merge_candidates(candidates);
        // Single-line hits are mostly text and noise
        merged.retain(|p| p.count >= 2);
        merged.sort_by(|a, b| b.count.cmp(&a.count));
        merged.truncate(MAX_PATTERNS);
        merged
    }

    /// Check if row has enough edge transitions to potentially contain patterns
    fn has_significant_edges(matrix: &BitMatrix, y: usize, width: usize) -> bool {
        let mut transitions = 0;
        let sample_step = 2;
        let mut prev_color = matrix.get(0, y);

        for x in (sample_step..width).step_by(sample_step) {
            let color = matrix.get(x, y);
            if color != prev_color {
                transitions += 1;
                prev_color = color;
                if transitions >= 4 {
                    return true;
                }
            }
        }
        false
    }

    fn scan_row(matrix: &BitMatrix, y: usize, width: usize) -> Vec<FinderPattern> {
        let mut candidates = Vec::new();
        let mut run_lengths: Vec<usize> = Vec::new();
        let mut run_colors: Vec<bool> = Vec::new();
        let mut run_start = 0usize;
        let mut current_color = matrix.get(0, y);

        for x in 1..=width {
            let color = if x < width { matrix.get(x, y) } else { !current_color };
            if color == current_color {
                continue;
            }
            run_lengths.push(x - run_start);
            run_colors.push(current_color);
            run_start = x;
            current_color = color;

            if run_colors.len() < 5 {
                continue;
            }
            let end_idx = run_colors.len();
            let colors = &run_colors[end_idx - 5..end_idx];
            let lengths = &run_lengths[end_idx - 5..end_idx];

            // Pattern should be: black-white-black-white-black
            if !(colors[0] && !colors[1] && colors[2] && !colors[3] && colors[4]) {
                continue;
            }
            let Some(unit) = Self::check_ratios(lengths) else {
                continue;
            };
            let center_x = x as f32 - lengths[4] as f32 - lengths[3] as f32 - lengths[2] as f32 / 2.0;
            if let Some(pattern) = Self::confirm(matrix, center_x, y, lengths[2], unit) {
                candidates.push(pattern);
                if candidates.len() >= MAX_PATTERNS_PER_ROW {
                    break;
                }
            }
        }

        candidates
    }

    /// Module size if the five runs fit 1:1:3:1:1
    fn check_ratios(lengths: &[usize]) -> Option<f32> {
        if lengths.len() != 5 || lengths.contains(&0) {
            return None;
        }
        let total: usize = lengths.iter().sum();
        if total < 7 {
            return None;
        }
        let unit = total as f32 / 7.0;
        let tolerance = unit / 2.0;
        let outer_ok = [0, 1, 3, 4]
            .iter()
            .all(|&i| (lengths[i] as f32 - unit).abs() < tolerance);
        let centre_ok = (lengths[2] as f32 - 3.0 * unit).abs() < 3.0 * tolerance;
        (outer_ok && centre_ok).then_some(unit)
    }

    /// Vertical then horizontal cross-check through a row hit
    fn confirm(
        matrix: &BitMatrix,
        center_x: f32,
        y: usize,
        max_run: usize,
        row_unit: f32,
    ) -> Option<FinderPattern> {
        let cx = center_x as usize;
        let (center_y, v_total) =
            cross_check(matrix.height(), y, max_run, |i| matrix.get(cx, i))?;
        let row_total = row_unit * 7.0;
        if (v_total as f32 - row_total).abs() * 5.0 >= row_total * 2.0 {
            return None;
        }
        let cy = center_y as usize;
        let (refined_x, h_total) =
            cross_check(matrix.width(), cx, max_run, |i| matrix.get(i, cy))?;
        let module_size = (v_total + h_total) as f32 / 14.0;
        Some(FinderPattern::new(refined_x, center_y, module_size))
    }

    fn merge_candidates(candidates: Vec<FinderPattern>) -> Vec<FinderPattern> {
        let mut merged: Vec<FinderPattern> = Vec::new();

        for candidate in candidates {
            match merged.iter_mut().find(|existing| existing.about_equals(&candidate)) {
                Some(existing) => *existing = existing.combine(&candidate),
                None => merged.push(candidate),
            }
        }

        merged
    }
}

/// Walk outwards from `start` along one line and measure the five runs.
///
/// Returns the sub-pixel centre of the middle run and the total pattern
/// length, or `None` if the runs do not fit 1:1:3:1:1.
fn cross_check(
    len: usize,
    start: usize,
    max_run: usize,
    dark: impl Fn(usize) -> bool,
) -> Option<(f32, usize)> {
    if start >= len || !dark(start) {
        return None;
    }
    let mut counts = [0usize; 5];

    let mut i = start as isize;
    while i >= 0 && dark(i as usize) {
        counts[2] += 1;
        i -= 1;
    }
    while i >= 0 && !dark(i as usize) && counts[1] <= max_run {
        counts[1] += 1;
        i -= 1;
    }
    if i < 0 || counts[1] > max_run {
        return None;
    }
    while i >= 0 && dark(i as usize) && counts[0] <= max_run {
        counts[0] += 1;
        i -= 1;
    }
    if counts[0] > max_run {
        return None;
    }

    let mut j = start + 1;
    while j < len && dark(j) {
        counts[2] += 1;
        j += 1;
    }
    while j < len && !dark(j) && counts[3] <= max_run {
        counts[3] += 1;
        j += 1;
    }
    if j == len || counts[3] > max_run {
        return None;
    }
    while j < len && dark(j) && counts[4] <= max_run {
        counts[4] += 1;
        j += 1;
    }
    if counts[4] > max_run {
        return None;
    }

    FinderDetector::check_ratios(&counts)?;
    let center = j as f32 - counts[4] as f32 - counts[3] as f32 - counts[2] as f32 / 2.0;
    Some((center, counts.iter().sum()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Draw a 7x7-module finder pattern with its top-left at (ox, oy)
    fn draw_finder(matrix: &mut BitMatrix, ox: usize, oy: usize, unit: usize) {
        for my in 0..7 {
            for mx in 0..7 {
                let ring = mx == 0 || mx == 6 || my == 0 || my == 6;
                let stone = (2..=4).contains(&mx) && (2..=4).contains(&my);
                if ring || stone {
                    for py in 0..unit {
                        for px in 0..unit {
                            matrix.set(ox + mx * unit + px, oy + my * unit + py, true);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_single_finder_centre() {
        let mut matrix = BitMatrix::new(60, 60);
        draw_finder(&mut matrix, 10, 12, 4);

        let patterns = FinderDetector::detect(&matrix);
        assert_eq!(patterns.len(), 1, "{patterns:?}");
        let p = patterns[0];
        assert!((p.center.x - 24.0).abs() < 1.0, "x = {}", p.center.x);
        assert!((p.center.y - 26.0).abs() < 1.0, "y = {}", p.center.y);
        assert!((p.module_size - 4.0).abs() < 0.5);
        assert!(p.count >= 2);
    }

    #[test]
    fn test_three_finders_found() {
        let mut matrix = BitMatrix::new(140, 140);
        draw_finder(&mut matrix, 8, 8, 4);
        draw_finder(&mut matrix, 100, 8, 4);
        draw_finder(&mut matrix, 8, 100, 4);

        let patterns = FinderDetector::detect(&matrix);
        assert_eq!(patterns.len(), 3);
        for (x, y) in [(22.0, 22.0), (114.0, 22.0), (22.0, 114.0)] {
            assert!(
                patterns
                    .iter()
                    .any(|p| p.center.distance(&Point::new(x, y)) < 1.5),
                "missing finder at ({x}, {y}): {patterns:?}"
            );
        }
    }

    #[test]
    fn test_plain_stripes_rejected() {
        // Horizontal 1:1:3:1:1 stripes fail the vertical cross-check
        let matrix = BitMatrix::from_fn(60, 60, |x, _| {
            matches!(x, 10..=12 | 16..=24 | 28..=30)
        });
        assert!(FinderDetector::detect(&matrix).is_empty());
    }

    #[test]
    fn test_check_ratios() {
        assert_eq!(FinderDetector::check_ratios(&[3, 3, 9, 3, 3]), Some(3.0));
        assert!(FinderDetector::check_ratios(&[3, 3, 10, 2, 3]).is_some());
        assert!(FinderDetector::check_ratios(&[3, 3, 3, 3, 3]).is_none());
        assert!(FinderDetector::check_ratios(&[1, 0, 3, 1, 1]).is_none());
        assert!(FinderDetector::check_ratios(&[6, 3, 9, 3, 3]).is_none());
    }

    #[test]
    fn test_cross_check_measures_runs() {
        let line = [false, true, true, false, false, true, true, true, true, true, true, false, false, true, true, false];
        let (center, total) = cross_check(line.len(), 7, 6, |i| line[i]).unwrap();
        assert_eq!(total, 14);
        assert!((center - 8.0).abs() < 1e-6);
    }
}
