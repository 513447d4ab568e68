//! Benchmarks for the particle solver.

use std::sync::{Arc, RwLock};

use criterion::{criterion_group, criterion_main, Criterion};
use glam::Vec3;
use pbd_core::shapes::SphereShape;
use pbd_core::{Collider, ColliderGroup, ShapeType, Solver};

const DT: f32 = 1.0 / 60.0;

/// A `cols` x `rows` cloth patch hanging from its top row, with structural
/// distance constraints and a sphere below it.
fn cloth_patch(cols: usize, rows: usize) -> Solver {
    let n = cols * rows;
    let spacing = 0.1;
    let mut solver = Solver::new(n, 0, 32);

    let mut positions = Vec::with_capacity(n * 4);
    let mut inv_masses = Vec::with_capacity(n);
    for r in 0..rows {
        for c in 0..cols {
            positions.extend_from_slice(&[c as f32 * spacing, 2.0, r as f32 * spacing, 1.0]);
            inv_masses.push(if r == 0 { 0.0 } else { 1.0 });
        }
    }
    solver.set_particle_positions(&positions, n, 0);
    solver.set_particle_inverse_masses(&inv_masses, n, 0);
    let active: Vec<i32> = (0..n as i32).collect();
    solver.set_active_particles(&active);

    let mut indices = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let i = (r * cols + c) as i32;
            if c + 1 < cols {
                indices.extend_from_slice(&[i, i + 1]);
            }
            if r + 1 < rows {
                indices.extend_from_slice(&[i, i + cols as i32]);
            }
        }
    }
    let count = indices.len() / 2;
    solver.set_distance_constraints(&indices, &vec![spacing; count], &vec![1.0; count * 2], count, 0);

    let mut group = ColliderGroup::new();
    let center = Vec3::new(cols as f32 * spacing * 0.5, 1.0, rows as f32 * spacing * 0.5);
    group.set_sphere_shapes(&[SphereShape::new(center, 0.5)], 1, 0);
    group.set_colliders(&[Collider::new(ShapeType::Sphere, 0)], 1, 0);
    solver.set_collider_group(Some(Arc::new(RwLock::new(group))));
    solver
}

fn bench_cloth_substeps(c: &mut Criterion) {
    c.bench_function("cloth_32x32_60_substeps", |b| {
        b.iter(|| {
            let mut solver = cloth_patch(32, 32);
            for _ in 0..60 {
                solver.add_simulation_time(DT);
                solver.update_solver(DT);
            }
            solver.get_bounds()
        });
    });
}

fn bench_particle_pile(c: &mut Criterion) {
    c.bench_function("pile_1000_particles_30_substeps", |b| {
        b.iter(|| {
            let n = 1000;
            let mut solver = Solver::new(n, 0, 32);
            let positions: Vec<f32> = (0..n)
                .flat_map(|i| {
                    let (x, y, z) = (i % 10, i / 100, (i / 10) % 10);
                    [x as f32 * 0.09, y as f32 * 0.09, z as f32 * 0.09, 1.0]
                })
                .collect();
            solver.set_particle_positions(&positions, n, 0);
            let phases: Vec<i32> = (0..n as i32).collect();
            solver.set_particle_phases(&phases, n, 0);
            solver.set_active_particles(&phases);
            for _ in 0..30 {
                solver.add_simulation_time(DT);
                solver.update_solver(DT);
            }
            solver.get_active_particle_count()
        });
    });
}

criterion_group!(benches, bench_cloth_substeps, bench_particle_pile);
criterion_main!(benches);
