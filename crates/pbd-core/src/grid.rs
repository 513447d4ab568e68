use glam::Vec3;

/// Hashed uniform grid over a subset of particle slots.
///
/// Built in linear time by counting sort (per-slot counts, prefix sum,
/// scatter). Only the indices handed to [`SpatialHashGrid::build`] are
/// inserted, so inactive slots of the particle buffer never show up in
/// queries.
pub struct SpatialHashGrid {
    cell_size: f32,
    inv_cell_size: f32,
    table_size: usize,
    /// Particles per table slot; reused as scatter cursor during build.
    slot_count: Vec<u32>,
    /// First entry of each table slot in `entries`.
    slot_start: Vec<u32>,
    /// Inserted particle indices grouped by table slot.
    entries: Vec<u32>,
    /// Table slot of each inserted particle, in insertion order.
    inserted_slots: Vec<u32>,
}

impl SpatialHashGrid {
    /// `cell_size` must be at least the largest distance that will be
    /// queried; `max_particles` only reserves storage.
    pub fn new(cell_size: f32, table_size: usize, max_particles: usize) -> Self {
        let table_size = table_size.max(1);
        let cell_size = cell_size.max(1e-4);
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            table_size,
            slot_count: vec![0u32; table_size],
            slot_start: vec![0u32; table_size],
            entries: Vec::with_capacity(max_particles),
            inserted_slots: Vec::with_capacity(max_particles),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Change the cell size. Takes effect on the next build.
    pub fn set_cell_size(&mut self, cell_size: f32) {
        self.cell_size = cell_size.max(1e-4);
        self.inv_cell_size = 1.0 / self.cell_size;
    }

    /// Insert the particles named by `indices` at their `positions`.
    pub fn build(&mut self, positions: &[Vec3], indices: &[u32]) {
        self.slot_count.fill(0);
        self.inserted_slots.clear();

        for &i in indices {
            let (cx, cy, cz) = self.cell_coords(positions[i as usize]);
            let h = self.hash_cell(cx, cy, cz);
            self.inserted_slots.push(h as u32);
            self.slot_count[h] += 1;
        }

        self.slot_start[0] = 0;
        for k in 1..self.table_size {
            self.slot_start[k] = self.slot_start[k - 1] + self.slot_count[k - 1];
        }

        // Reuse slot_count as scatter offsets.
        self.slot_count.fill(0);

        self.entries.clear();
        self.entries.resize(indices.len(), 0);
        for (slot, &i) in indices.iter().enumerate() {
            let h = self.inserted_slots[slot] as usize;
            let idx = self.slot_start[h] + self.slot_count[h];
            self.entries[idx as usize] = i;
            self.slot_count[h] += 1;
        }
    }

    /// Report every particle stored in the 3x3x3 block of cells around
    /// `pos`. No distance filtering happens here. Cells that share a table
    /// slot are visited once, so no particle is reported twice.
    pub fn query_neighbors<F: FnMut(u32)>(&self, pos: Vec3, mut callback: F) {
        let (cx, cy, cz) = self.cell_coords(pos);
        let mut visited = [usize::MAX; 27];
        let mut n = 0;
        for dx in -1..=1_i32 {
            for dy in -1..=1_i32 {
                for dz in -1..=1_i32 {
                    let h = self.hash_cell(cx + dx, cy + dy, cz + dz);
                    if visited[..n].contains(&h) {
                        continue;
                    }
                    visited[n] = h;
                    n += 1;
                    let start = self.slot_start[h] as usize;
                    let end = start + self.slot_count[h] as usize;
                    for idx in start..end {
                        callback(self.entries[idx]);
                    }
                }
            }
        }
    }

    #[inline]
    fn hash_cell(&self, cx: i32, cy: i32, cz: i32) -> usize {
        let h = (cx as u32)
            .wrapping_mul(73856093)
            ^ (cy as u32).wrapping_mul(19349663)
            ^ (cz as u32).wrapping_mul(83492791);
        (h as usize) % self.table_size
    }

    #[inline]
    fn cell_coords(&self, pos: Vec3) -> (i32, i32, i32) {
        (
            (pos.x * self.inv_cell_size).floor() as i32,
            (pos.y * self.inv_cell_size).floor() as i32,
            (pos.z * self.inv_cell_size).floor() as i32,
        )
    }
}
