use glam::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::grid::SpatialHashGrid;

/// Fixed-capacity per-particle neighbor lists.
///
/// Storage is `capacity * max_neighbours` indices allocated up front. When a
/// particle has more candidates than fit, the farthest ones are dropped.
pub struct NeighborList {
    max_neighbours: usize,
    counts: Vec<u32>,
    indices: Vec<u32>,
}

impl NeighborList {
    pub fn new(capacity: usize, max_neighbours: usize) -> Self {
        Self {
            max_neighbours,
            counts: vec![0; capacity],
            indices: vec![0; capacity * max_neighbours],
        }
    }

    #[inline]
    pub fn max_neighbours(&self) -> usize {
        self.max_neighbours
    }

    /// Neighbors of particle `i` found by the last build.
    #[inline]
    pub fn neighbors(&self, i: usize) -> &[u32] {
        let start = i * self.max_neighbours;
        &self.indices[start..start + self.counts[i] as usize]
    }

    #[inline]
    pub fn count(&self, i: usize) -> usize {
        self.counts[i] as usize
    }

    /// Rebuild the lists of the `active` particles from a grid built on the
    /// same positions. Candidates farther than `radius` are ignored.
    pub fn build(
        &mut self,
        grid: &SpatialHashGrid,
        positions: &[Vec3],
        active: &[u32],
        is_active: impl Fn(usize) -> bool + Sync,
        radius: f32,
    ) {
        let max = self.max_neighbours;
        self.counts.fill(0);
        if max == 0 {
            return;
        }
        let radius_sq = radius * radius;

        let gather = |i: usize, slots: &mut [u32]| -> u32 {
            let pos_i = positions[i];
            let mut candidates: Vec<(f32, u32)> = Vec::new();
            grid.query_neighbors(pos_i, |j| {
                if j as usize == i {
                    return;
                }
                let d2 = (positions[j as usize] - pos_i).length_squared();
                if d2 <= radius_sq {
                    candidates.push((d2, j));
                }
            });
            if candidates.len() > max {
                candidates.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
                candidates.truncate(max);
            }
            for (slot, &(_, j)) in slots.iter_mut().zip(candidates.iter()) {
                *slot = j;
            }
            candidates.len() as u32
        };

        #[cfg(feature = "parallel")]
        {
            self.indices
                .par_chunks_mut(max)
                .zip(self.counts.par_iter_mut())
                .enumerate()
                .for_each(|(i, (slots, count))| {
                    if is_active(i) {
                        *count = gather(i, slots);
                    }
                });
            let _ = active;
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = &is_active;
            for &i in active {
                let i = i as usize;
                let slots = &mut self.indices[i * max..(i + 1) * max];
                self.counts[i] = gather(i, slots);
            }
        }
    }
}
