use glam::Vec3;
use pbd_core::{make_phase, Phase, Solver};
use proptest::prelude::*;

const CAPACITY: usize = 16;

fn finite() -> impl Strategy<Value = f32> {
    -1000.0f32..1000.0
}

/// Records of 4 floats with an arbitrary `w`.
fn records(max: usize) -> impl Strategy<Value = Vec<f32>> {
    (1..=max).prop_flat_map(|n| prop::collection::vec(finite(), n * 4))
}

fn xyz_of(records: &[f32]) -> Vec<[f32; 3]> {
    records.chunks_exact(4).map(|r| [r[0], r[1], r[2]]).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: vectors read back as written, with w normalized.
    #[test]
    fn test_vector_round_trip(data in records(CAPACITY), offset in 0usize..CAPACITY) {
        let mut solver = Solver::new(CAPACITY, 0, 8);
        let num = data.len() / 4;
        let expected = num.min(CAPACITY - offset);

        prop_assert_eq!(solver.set_particle_positions(&data, num, offset), expected);
        prop_assert_eq!(solver.set_particle_velocities(&data, num, offset), expected);
        prop_assert_eq!(solver.set_particle_vorticities(&data, num, offset), expected);

        let mut out = vec![0.0f32; expected * 4];
        let want = &xyz_of(&data)[..expected];

        prop_assert_eq!(solver.get_particle_positions(&mut out, expected, offset), expected);
        prop_assert_eq!(&xyz_of(&out)[..], want);
        prop_assert!(out.chunks_exact(4).all(|r| r[3] == 1.0), "points carry w = 1");

        solver.get_renderable_particle_positions(&mut out, expected, offset);
        prop_assert_eq!(&xyz_of(&out)[..], want, "teleport resets render positions");

        solver.get_particle_velocities(&mut out, expected, offset);
        prop_assert_eq!(&xyz_of(&out)[..], want);
        prop_assert!(out.chunks_exact(4).all(|r| r[3] == 0.0), "directions carry w = 0");

        solver.get_particle_vorticities(&mut out, expected, offset);
        prop_assert_eq!(&xyz_of(&out)[..], want);
    }

    /// Property: activation is idempotent and the count matches the
    /// distinct in-range indices.
    #[test]
    fn test_activation_idempotent(indices in prop::collection::vec(-4i32..24, 0..32)) {
        let mut solver = Solver::new(CAPACITY, 0, 8);
        let mut distinct: Vec<i32> = indices
            .iter()
            .copied()
            .filter(|&i| (0..CAPACITY as i32).contains(&i))
            .collect();
        distinct.sort_unstable();
        distinct.dedup();

        prop_assert_eq!(solver.activate_particles(&indices), distinct.len());
        prop_assert_eq!(solver.activate_particles(&indices), 0);
        prop_assert_eq!(solver.get_active_particle_count(), distinct.len());

        prop_assert_eq!(solver.deactivate_particles(&indices), distinct.len());
        prop_assert_eq!(solver.deactivate_particles(&indices), 0);
        prop_assert_eq!(solver.get_active_particle_count(), 0);
    }
}

#[test]
fn test_access_clamps_to_capacity() {
    let mut solver = Solver::new(4, 0, 8);
    let data = [1.0f32; 4 * 6];

    assert_eq!(solver.set_particle_positions(&data, 6, 0), 4, "clamped to capacity");
    assert_eq!(solver.set_particle_positions(&data, 6, 3), 1, "clamped to capacity after offset");
    assert_eq!(solver.set_particle_positions(&data, 2, 9), 0, "offset past the end writes nothing");
    assert_eq!(solver.set_particle_positions(&data[..7], 2, 0), 1, "partial record is not written");

    let mut out = [0.0f32; 8];
    assert_eq!(solver.get_particle_positions(&mut out, 4, 0), 2, "clamped to the output buffer");
    assert_eq!(solver.max_particles(), 4);
}

#[test]
fn test_scalar_buffers() {
    let mut solver = Solver::new(4, 0, 8);
    assert_eq!(solver.set_particle_inverse_masses(&[1.0, -2.0, 0.5], 3, 1), 3);
    let mut masses = [9.0f32; 4];
    solver.get_particle_inverse_masses(&mut masses, 4, 0);
    assert_eq!(masses, [1.0, 1.0, 0.0, 0.5], "negative inverse mass becomes kinematic");

    solver.set_particle_solid_radii(&[0.2, 0.3], 2, 2);
    let mut radii = [0.0f32; 2];
    solver.get_particle_solid_radii(&mut radii, 2, 2);
    assert_eq!(radii, [0.2, 0.3]);
}

#[test]
fn test_phases_round_trip() {
    let mut solver = Solver::new(3, 0, 8);
    let phases = [
        make_phase(1, 0),
        make_phase(2, Phase::SELF_COLLIDE),
        make_phase(3, Phase::FLUID | Phase::SELF_COLLIDE),
    ];
    assert_eq!(solver.set_particle_phases(&phases, 3, 0), 3);

    let mut out = [0i32; 3];
    solver.get_particle_phases(&mut out, 3, 0);
    assert_eq!(out, phases);

    let fluid = Phase(out[2]);
    assert_eq!(fluid.group(), 3);
    assert!(fluid.is_fluid() && fluid.self_collides());
    assert!(!Phase(out[0]).self_collides());
}

#[test]
fn test_active_set_replacement() {
    let mut solver = Solver::new(8, 0, 8);
    assert_eq!(solver.set_active_particles(&[0, 1, 2, 2, 42]), 3);
    assert_eq!(solver.set_active_particles(&[5]), 1, "replaces the previous set");
    assert_eq!(solver.get_active_particle_count(), 1);
    assert_eq!(solver.particles().active(), &[5]);
    assert!(solver.particles().is_active(5));
    assert!(!solver.particles().is_active(0));
}

#[test]
fn test_inactive_data_is_preserved() {
    let mut solver = Solver::new(2, 0, 8);
    solver.set_particle_positions(&[0.0, 0.0, 0.0, 1.0, 3.0, 4.0, 5.0, 1.0], 2, 0);
    solver.set_active_particles(&[0]);
    solver.add_simulation_time(1.0 / 60.0);
    solver.update_solver(1.0 / 60.0);

    let mut out = [0.0f32; 4];
    solver.get_particle_positions(&mut out, 1, 1);
    assert_eq!(Vec3::new(out[0], out[1], out[2]), Vec3::new(3.0, 4.0, 5.0));
}
