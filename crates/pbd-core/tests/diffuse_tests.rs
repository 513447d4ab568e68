use glam::Vec3;
use pbd_core::diffuse::DiffuseParticles;
use pbd_core::grid::SpatialHashGrid;
use pbd_core::particle::ParticleSet;
use pbd_core::{make_phase, Phase, Solver};

const DT: f32 = 1.0 / 60.0;
const GRAVITY: f32 = -9.81;

fn vec_at(records: &[f32], i: usize) -> Vec3 {
    Vec3::new(records[i * 4], records[i * 4 + 1], records[i * 4 + 2])
}

/// One fluid particle at the origin moving along +x, diffuse particles
/// next to it and far away.
fn solver_with_fluid(fluid_phase: i32) -> Solver {
    let mut solver = Solver::new(1, 3, 8);
    solver.set_particle_positions(&[0.0, 0.0, 0.0, 1.0], 1, 0);
    solver.set_particle_velocities(&[1.0, 0.0, 0.0, 0.0], 1, 0);
    solver.set_particle_phases(&[fluid_phase], 1, 0);
    solver.set_active_particles(&[0]);

    let diffuse = [0.1, 0.0, 0.0, 1.0, 10.0, 0.0, 0.0, 1.0, -5.0, 0.0, 0.0, 1.0];
    assert_eq!(solver.set_diffuse_particle_positions(&diffuse, 3, 0), 3);
    assert_eq!(solver.set_active_diffuse_particles(&[0, 1]), 2);
    solver
}

fn step(solver: &mut Solver) {
    solver.add_simulation_time(DT);
    assert!(solver.update_solver(DT));
}

#[test]
fn test_diffuse_particle_follows_nearby_fluid() {
    let mut solver = solver_with_fluid(make_phase(0, Phase::FLUID));
    step(&mut solver);

    let mut velocities = [0.0f32; 12];
    solver.get_diffuse_particle_velocities(&mut velocities, 3, 0);
    let near = vec_at(&velocities, 0);
    assert!((near.x - 1.0).abs() < 1e-4, "near velocity {:?}", near);
    assert!((near.y - GRAVITY * DT).abs() < 1e-4, "takes the fluid's fall speed");

    let mut counts = [-1i32; 3];
    assert_eq!(solver.get_diffuse_particle_neighbour_counts(&mut counts, 3, 0), 3);
    assert_eq!(&counts[..2], &[1, 0]);
}

#[test]
fn test_isolated_diffuse_particle_is_ballistic() {
    let mut solver = solver_with_fluid(make_phase(0, Phase::FLUID));
    step(&mut solver);

    let mut velocities = [0.0f32; 12];
    let mut positions = [0.0f32; 12];
    solver.get_diffuse_particle_velocities(&mut velocities, 3, 0);
    solver.get_diffuse_particle_positions(&mut positions, 3, 0);

    let far_v = vec_at(&velocities, 1);
    let far_p = vec_at(&positions, 1);
    assert!((far_v - Vec3::new(0.0, GRAVITY * DT, 0.0)).length() < 1e-6, "{:?}", far_v);
    assert!((far_p - Vec3::new(10.0, GRAVITY * DT * DT, 0.0)).length() < 1e-6, "{:?}", far_p);
    assert_eq!(positions[7], 1.0, "points carry w = 1");
    assert_eq!(velocities[7], 0.0, "directions carry w = 0");
}

#[test]
fn test_non_fluid_particles_do_not_carry_diffuse() {
    let mut solver = solver_with_fluid(make_phase(0, 0));
    step(&mut solver);

    let mut counts = [-1i32; 1];
    solver.get_diffuse_particle_neighbour_counts(&mut counts, 1, 0);
    assert_eq!(counts[0], 0);

    let mut velocities = [0.0f32; 4];
    solver.get_diffuse_particle_velocities(&mut velocities, 1, 0);
    assert!(velocities[0].abs() < 1e-6, "solid neighbour velocity ignored");
    assert!((velocities[1] - GRAVITY * DT).abs() < 1e-6);
}

#[test]
fn test_inactive_diffuse_particles_are_untouched() {
    let mut solver = solver_with_fluid(make_phase(0, Phase::FLUID));
    step(&mut solver);

    let mut positions = [0.0f32; 4];
    solver.get_diffuse_particle_positions(&mut positions, 1, 2);
    assert_eq!(vec_at(&positions, 0), Vec3::new(-5.0, 0.0, 0.0));
    assert_eq!(solver.get_active_diffuse_particle_count(), 2);

    assert_eq!(solver.activate_diffuse_particles(&[2, 2, 7]), 1);
    assert_eq!(solver.deactivate_diffuse_particles(&[0, 1]), 2);
    assert_eq!(solver.get_active_diffuse_particle_count(), 1);
}

#[test]
fn test_diffuse_access_clamps() {
    let mut solver = Solver::new(1, 2, 8);
    let data = [0.5f32; 4 * 3];
    assert_eq!(solver.max_diffuse_particles(), 2);
    assert_eq!(solver.set_diffuse_particle_positions(&data, 3, 0), 2);
    assert_eq!(solver.set_diffuse_particle_velocities(&data, 3, 1), 1);
    assert_eq!(solver.set_diffuse_particle_velocities(&data, 1, 2), 0);

    let mut counts = [0i32; 4];
    assert_eq!(solver.get_diffuse_particle_neighbour_counts(&mut counts, 4, 0), 2);
}

#[test]
fn test_advect_averages_fluid_velocities() {
    let mut fluid = ParticleSet::new(2);
    fluid.position[0] = Vec3::ZERO;
    fluid.position[1] = Vec3::new(0.2, 0.0, 0.0);
    fluid.velocity[0] = Vec3::new(0.0, 2.0, 0.0);
    fluid.phase[0] = Phase::new(0, Phase::FLUID);
    fluid.phase[1] = Phase::new(0, Phase::FLUID);
    fluid.set_active(&[0, 1]);

    let mut grid = SpatialHashGrid::new(0.5, 64, 2);
    grid.build(&fluid.position, fluid.active());

    let mut diffuse = DiffuseParticles::new(1);
    diffuse.position[0] = Vec3::new(0.1, 0.0, 0.0);
    diffuse.set_active(&[0]);
    diffuse.advect(&fluid, &grid, 0.5, Vec3::new(0.0, -9.81, 0.0), 0.1);

    assert_eq!(diffuse.neighbour_count(0), 2);
    assert!((diffuse.velocity[0] - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-3, "{:?}", diffuse.velocity[0]);
    assert!((diffuse.position[0] - Vec3::new(0.1, 0.1, 0.0)).length() < 1e-3);
}
