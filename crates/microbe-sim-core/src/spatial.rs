//! Uniform-grid spatial index over the organism population.
//!
//! Buckets hold indices into the population vec (plus a position copy for the
//! exact-distance filter), never references, so rebuild-per-tick is a plain
//! clear-and-refill and queries run against one consistent snapshot per tick.

#[derive(Clone, Copy, Debug)]
struct GridEntry {
    index: usize,
    position: [f64; 2],
}

#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cell_size: f64,
    cols: usize,
    rows: usize,
    buckets: Vec<Vec<GridEntry>>,
}

impl SpatialGrid {
    pub fn new(width: f64, height: f64, cell_size: f64) -> Self {
        assert!(width > 0.0 && height > 0.0, "world dimensions must be positive");
        assert!(cell_size > 0.0, "cell_size must be positive");
        let cols = (width / cell_size).ceil().max(1.0) as usize;
        let rows = (height / cell_size).ceil().max(1.0) as usize;
        Self {
            cell_size,
            cols,
            rows,
            buckets: vec![Vec::new(); cols * rows],
        }
    }

    /// O(n) refill from a position snapshot. Positions outside the world
    /// clamp into the edge buckets.
    pub fn rebuild(&mut self, positions: impl Iterator<Item = (usize, [f64; 2])>) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        for (index, position) in positions {
            let (col, row) = self.bucket_coords(position[0], position[1]);
            self.buckets[row * self.cols + col].push(GridEntry { index, position });
        }
    }

    /// Population indices within `radius` (inclusive) of `center`, sorted.
    /// Visits only the buckets overlapping the query circle's bounding box,
    /// then filters by exact Euclidean distance. `exclude` skips the querying
    /// organism's own index.
    pub fn query_within(&self, center: [f64; 2], radius: f64, exclude: Option<usize>) -> Vec<usize> {
        debug_assert!(radius >= 0.0, "radius cannot be negative");
        let (min_col, min_row) = self.bucket_coords(center[0] - radius, center[1] - radius);
        let (max_col, max_row) = self.bucket_coords(center[0] + radius, center[1] + radius);
        let r_sq = radius * radius;

        let mut result = Vec::new();
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                for entry in &self.buckets[row * self.cols + col] {
                    if Some(entry.index) == exclude {
                        continue;
                    }
                    let dx = entry.position[0] - center[0];
                    let dy = entry.position[1] - center[1];
                    if dx * dx + dy * dy <= r_sq {
                        result.push(entry.index);
                    }
                }
            }
        }
        result.sort_unstable();
        result
    }

    fn bucket_coords(&self, x: f64, y: f64) -> (usize, usize) {
        let col = ((x / self.cell_size).max(0.0) as usize).min(self.cols - 1);
        let row = ((y / self.cell_size).max(0.0) as usize).min(self.rows - 1);
        (col, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use rand::Rng;

    fn grid_with(positions: &[[f64; 2]]) -> SpatialGrid {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        grid.rebuild(positions.iter().enumerate().map(|(i, p)| (i, *p)));
        grid
    }

    #[test]
    fn query_finds_indices_within_radius() {
        let grid = grid_with(&[[5.0, 5.0], [6.0, 5.0], [50.0, 50.0]]);
        assert_eq!(grid.query_within([5.0, 5.0], 2.0, None), vec![0, 1]);
    }

    #[test]
    fn query_excludes_self() {
        let grid = grid_with(&[[5.0, 5.0], [6.0, 5.0]]);
        assert_eq!(grid.query_within([5.0, 5.0], 2.0, Some(0)), vec![1]);
    }

    #[test]
    fn query_radius_is_inclusive() {
        let grid = grid_with(&[[0.0, 0.0], [3.0, 4.0]]);
        assert_eq!(grid.query_within([0.0, 0.0], 5.0, Some(0)), vec![1]);
        assert!(grid.query_within([0.0, 0.0], 4.99, Some(0)).is_empty());
    }

    #[test]
    fn query_spans_bucket_boundaries() {
        // 9.9 and 10.1 land in adjacent buckets but are 0.2 apart.
        let grid = grid_with(&[[9.9, 50.0], [10.1, 50.0]]);
        assert_eq!(grid.query_within([9.9, 50.0], 1.0, Some(0)), vec![1]);
    }

    #[test]
    fn rebuild_replaces_previous_contents() {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        grid.rebuild([(0usize, [5.0, 5.0])].into_iter());
        grid.rebuild([(1usize, [5.0, 5.0])].into_iter());
        assert_eq!(grid.query_within([5.0, 5.0], 1.0, None), vec![1]);
    }

    #[test]
    fn out_of_bounds_positions_clamp_into_edge_buckets() {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        grid.rebuild([(0usize, [150.0, -20.0])].into_iter());
        assert_eq!(grid.query_within([150.0, -20.0], 1.0, None), vec![0]);
    }

    #[test]
    fn matches_brute_force_for_random_population() {
        let mut rng = create_rng(12);
        let n = 50;
        let positions: Vec<[f64; 2]> = (0..n)
            .map(|_| [rng.random::<f64>() * 100.0, rng.random::<f64>() * 100.0])
            .collect();
        let grid = grid_with(&positions);

        for _ in 0..20 {
            let center = [rng.random::<f64>() * 100.0, rng.random::<f64>() * 100.0];
            let radius = rng.random::<f64>() * 30.0;
            let mut expected: Vec<usize> = positions
                .iter()
                .enumerate()
                .filter(|(_, p)| {
                    let dx = p[0] - center[0];
                    let dy = p[1] - center[1];
                    dx * dx + dy * dy <= radius * radius
                })
                .map(|(i, _)| i)
                .collect();
            expected.sort_unstable();
            assert_eq!(grid.query_within(center, radius, None), expected);
        }
    }
}
