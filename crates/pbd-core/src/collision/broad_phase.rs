use std::collections::HashMap;

use glam::Vec3;

use crate::collider_group::ColliderGroup;
use crate::shapes::Aabb;

/// Colliders spanning more cells than this along any axis skip the grid and
/// are tested against every query.
const MAX_CELL_SPAN: i32 = 8;

/// Uniform grid over collider world bounds.
#[derive(Default)]
pub struct ColliderBroadPhase {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<(i32, i32, i32), Vec<u32>>,
    large: Vec<u32>,
    bounds: Vec<Option<Aabb>>,
}

impl ColliderBroadPhase {
    pub fn new() -> Self {
        Self::default()
    }

    /// World bounds of collider `index` as of the last build.
    pub fn collider_bounds(&self, index: usize) -> Option<Aabb> {
        self.bounds.get(index).copied().flatten()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Rebuild from the current collider poses.
    pub fn build(&mut self, group: &ColliderGroup) {
        self.cells.clear();
        self.large.clear();
        self.bounds.clear();
        self.bounds
            .extend((0..group.get_collider_count()).map(|i| group.collider_aabb(i)));

        // Cell size follows the mean collider extent.
        let (sum, n) = self
            .bounds
            .iter()
            .flatten()
            .fold((0.0, 0usize), |(s, n), b| (s + (b.max - b.min).max_element(), n + 1));
        if n == 0 {
            return;
        }
        self.cell_size = (sum / n as f32).max(0.1);
        self.inv_cell_size = 1.0 / self.cell_size;

        for (i, b) in self.bounds.iter().enumerate() {
            let Some(b) = b else { continue };
            let (lo, hi) = (self.cell(b.min), self.cell(b.max));
            let span = (hi.0 - lo.0).max(hi.1 - lo.1).max(hi.2 - lo.2);
            if span > MAX_CELL_SPAN {
                self.large.push(i as u32);
                continue;
            }
            for z in lo.2..=hi.2 {
                for y in lo.1..=hi.1 {
                    for x in lo.0..=hi.0 {
                        self.cells.entry((x, y, z)).or_default().push(i as u32);
                    }
                }
            }
        }
    }

    fn cell(&self, p: Vec3) -> (i32, i32, i32) {
        let c = (p * self.inv_cell_size).floor();
        (c.x as i32, c.y as i32, c.z as i32)
    }

    /// Visit every collider whose bounds overlap `query`, each once.
    pub fn query(&self, query: &Aabb, mut f: impl FnMut(u32)) {
        let mut seen: Vec<u32> = Vec::new();
        let mut visit = |c: u32| {
            if seen.contains(&c) {
                return;
            }
            seen.push(c);
            if let Some(b) = self.collider_bounds(c as usize) {
                if b.overlaps(query) {
                    f(c);
                }
            }
        };

        if !self.cells.is_empty() {
            let (lo, hi) = (self.cell(query.min), self.cell(query.max));
            let span = (hi.0 - lo.0).max(hi.1 - lo.1).max(hi.2 - lo.2);
            if span > MAX_CELL_SPAN {
                // Query larger than the grid resolution: check everything.
                for list in self.cells.values() {
                    list.iter().for_each(|&c| visit(c));
                }
            } else {
                for z in lo.2..=hi.2 {
                    for y in lo.1..=hi.1 {
                        for x in lo.0..=hi.0 {
                            if let Some(list) = self.cells.get(&(x, y, z)) {
                                list.iter().for_each(|&c| visit(c));
                            }
                        }
                    }
                }
            }
        }
        for &c in &self.large {
            visit(c);
        }
    }
}
