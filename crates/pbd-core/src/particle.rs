use glam::Vec3;

/// Per-particle phase: a collision group id in the low 24 bits plus
/// behavior flags in the high bits.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Phase(pub i32);

impl Phase {
    /// Particle collides with other particles of its own group.
    pub const SELF_COLLIDE: i32 = 1 << 24;
    /// Particle belongs to a fluid and takes part in density constraints.
    pub const FLUID: i32 = 1 << 25;

    const GROUP_MASK: i32 = 0x00ff_ffff;

    pub fn new(group: i32, flags: i32) -> Self {
        Phase((group & Self::GROUP_MASK) | (flags & !Self::GROUP_MASK))
    }

    #[inline]
    pub fn group(self) -> i32 {
        self.0 & Self::GROUP_MASK
    }

    #[inline]
    pub fn is_fluid(self) -> bool {
        self.0 & Self::FLUID != 0
    }

    #[inline]
    pub fn self_collides(self) -> bool {
        self.0 & Self::SELF_COLLIDE != 0
    }
}

/// Encode a group id and flag bits into a raw phase value.
pub fn make_phase(group: i32, flags: i32) -> i32 {
    Phase::new(group, flags).0
}

/// An explicit set of active slots in a fixed-capacity buffer.
///
/// Membership is kept both as a dense index list (iteration order is
/// activation order) and as per-slot flags for O(1) lookups.
#[derive(Clone, Debug, Default)]
pub struct ActiveSet {
    indices: Vec<u32>,
    flags: Vec<bool>,
}

impl ActiveSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            flags: vec![false; capacity],
        }
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    /// Replace the set. Out-of-range and duplicate indices are dropped.
    /// Returns the resulting size.
    pub fn set(&mut self, indices: &[i32]) -> usize {
        for &i in &self.indices {
            self.flags[i as usize] = false;
        }
        self.indices.clear();
        self.insert(indices);
        self.indices.len()
    }

    /// Add slots. Already active ones are left alone.
    /// Returns how many slots became active.
    pub fn insert(&mut self, indices: &[i32]) -> usize {
        let mut added = 0;
        for &i in indices {
            let Some(flag) = usize::try_from(i).ok().and_then(|i| self.flags.get_mut(i)) else {
                continue;
            };
            if !*flag {
                *flag = true;
                self.indices.push(i as u32);
                added += 1;
            }
        }
        added
    }

    /// Remove slots, returning how many were active.
    pub fn remove(&mut self, indices: &[i32]) -> usize {
        let mut removed = 0;
        for &i in indices {
            let Some(flag) = usize::try_from(i).ok().and_then(|i| self.flags.get_mut(i)) else {
                continue;
            };
            if *flag {
                *flag = false;
                removed += 1;
            }
        }
        if removed > 0 {
            let flags = &self.flags;
            self.indices.retain(|&i| flags[i as usize]);
        }
        removed
    }
}

/// Length of a particle's collision ignore list.
pub const MAX_IGNORED_PARTICLES: usize = 4;

/// SoA particle storage with a fixed capacity.
///
/// Every buffer is allocated once at `capacity` entries. Which slots take part
/// in the simulation is decided only by the explicit active index list, never
/// by the contents of the data buffers.
pub struct ParticleSet {
    capacity: usize,
    pub position: Vec<Vec3>,
    /// Positions at the start of the last substep (interpolation source).
    pub previous: Vec<Vec3>,
    /// Predicted positions for constraint solving
    pub predicted: Vec<Vec3>,
    /// Positions handed to rendering consumers.
    pub render_position: Vec<Vec3>,
    pub velocity: Vec<Vec3>,
    /// Vorticity vector for vorticity confinement
    pub vorticity: Vec<Vec3>,
    /// 0 = kinematic (infinite mass).
    pub inv_mass: Vec<f32>,
    pub radius: Vec<f32>,
    pub phase: Vec<Phase>,
    /// Index into the solver's collision materials, -1 for the default.
    pub material: Vec<i32>,
    /// Index into the solver's fluid materials, -1 for the default.
    pub fluid_material: Vec<i32>,
    /// Fluid surface normal (color field gradient).
    pub normal: Vec<Vec3>,
    /// Current SPH density estimate
    pub density: Vec<f32>,
    /// PBF Lagrange multiplier (fluid solver)
    pub lambda: Vec<f32>,
    /// Accumulated position corrections (Jacobi)
    pub corrections: Vec<Vec3>,
    /// Number of corrections per particle (for averaging)
    pub correction_counts: Vec<u32>,
    /// Particles this one never collides with; unused slots hold -1.
    pub ignored: Vec<[i32; MAX_IGNORED_PARTICLES]>,
    active: ActiveSet,
}

impl ParticleSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            position: vec![Vec3::ZERO; capacity],
            previous: vec![Vec3::ZERO; capacity],
            predicted: vec![Vec3::ZERO; capacity],
            render_position: vec![Vec3::ZERO; capacity],
            velocity: vec![Vec3::ZERO; capacity],
            vorticity: vec![Vec3::ZERO; capacity],
            inv_mass: vec![1.0; capacity],
            radius: vec![0.05; capacity],
            phase: vec![Phase::default(); capacity],
            material: vec![-1; capacity],
            fluid_material: vec![-1; capacity],
            normal: vec![Vec3::ZERO; capacity],
            density: vec![0.0; capacity],
            lambda: vec![0.0; capacity],
            corrections: vec![Vec3::ZERO; capacity],
            correction_counts: vec![0u32; capacity],
            ignored: vec![[-1; MAX_IGNORED_PARTICLES]; capacity],
            active: ActiveSet::new(capacity),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Indices of the particles currently simulated.
    #[inline]
    pub fn active(&self) -> &[u32] {
        self.active.indices()
    }

    #[inline]
    pub fn is_active(&self, index: usize) -> bool {
        self.active.contains(index)
    }

    /// Replace the active set. Out-of-range and duplicate indices are dropped.
    /// Returns the resulting number of active particles.
    pub fn set_active(&mut self, indices: &[i32]) -> usize {
        self.active.set(indices)
    }

    /// Add particles to the active set. Returns how many became active.
    pub fn activate(&mut self, indices: &[i32]) -> usize {
        self.active.insert(indices)
    }

    /// Remove particles from the active set, keeping their data.
    /// Returns how many particles became inactive.
    pub fn deactivate(&mut self, indices: &[i32]) -> usize {
        self.active.remove(indices)
    }

    /// Whether either particle lists the other in its ignore list.
    #[inline]
    pub fn ignores(&self, a: usize, b: usize) -> bool {
        self.ignored[a].contains(&(b as i32)) || self.ignored[b].contains(&(a as i32))
    }

    /// Zero the Jacobi accumulation buffers of the active particles.
    pub fn reset_corrections(&mut self) {
        for &i in self.active.indices() {
            let i = i as usize;
            self.corrections[i] = Vec3::ZERO;
            self.correction_counts[i] = 0;
        }
    }

    /// Apply averaged corrections scaled by the over-relaxation factor, then
    /// zero the accumulators.
    pub fn apply_corrections(&mut self, sor_factor: f32) {
        for &i in self.active.indices() {
            let i = i as usize;
            let n = self.correction_counts[i];
            if n > 0 {
                self.predicted[i] += self.corrections[i] * (sor_factor / n as f32);
                self.corrections[i] = Vec3::ZERO;
                self.correction_counts[i] = 0;
            }
        }
    }
}
