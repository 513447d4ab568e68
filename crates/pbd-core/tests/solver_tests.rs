use std::sync::{Arc, RwLock};

use glam::{Quat, Vec3};
use pbd_core::shapes::SphereShape;
use pbd_core::{
    Collider, ColliderGroup, ConstraintParameters, ConstraintType, EvaluationOrder, Interpolation, Mode, Rigidbody,
    ShapeType, Solver, SolverError, SolverParameters,
};

const DT: f32 = 1.0 / 60.0;

fn flat4(points: &[Vec3]) -> Vec<f32> {
    points.iter().flat_map(|p| [p.x, p.y, p.z, 1.0]).collect()
}

fn position(solver: &Solver, i: usize) -> Vec3 {
    let mut out = [0.0f32; 4];
    solver.get_particle_positions(&mut out, 1, i);
    Vec3::new(out[0], out[1], out[2])
}

fn velocity(solver: &Solver, i: usize) -> Vec3 {
    let mut out = [0.0f32; 4];
    solver.get_particle_velocities(&mut out, 1, i);
    Vec3::new(out[0], out[1], out[2])
}

fn zero_gravity() -> SolverParameters {
    SolverParameters {
        gravity: Vec3::ZERO,
        ..Default::default()
    }
}

/// Solver with `points` active, unit inverse masses and no gravity.
fn solver_with(points: &[Vec3]) -> Solver {
    let mut solver = Solver::new(points.len(), 0, 16);
    solver.set_solver_parameters(zero_gravity());
    solver.set_particle_positions(&flat4(points), points.len(), 0);
    solver.set_particle_inverse_masses(&vec![1.0; points.len()], points.len(), 0);
    let indices: Vec<i32> = (0..points.len() as i32).collect();
    solver.set_active_particles(&indices);
    solver
}

fn step(solver: &mut Solver) {
    solver.add_simulation_time(DT);
    assert!(solver.update_solver(DT), "accumulated time should pay for a substep");
}

fn sphere_group(center: Vec3, radius: f32) -> Arc<RwLock<ColliderGroup>> {
    let mut group = ColliderGroup::new();
    group.set_sphere_shapes(&[SphereShape::new(Vec3::ZERO, radius)], 1, 0);
    let collider = Collider::new(ShapeType::Sphere, 0).with_pose(center, Quat::IDENTITY);
    group.set_colliders(&[collider], 1, 0);
    Arc::new(RwLock::new(group))
}

#[test]
fn test_distance_constraint_converges_to_rest_length() {
    let mut solver = solver_with(&[Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0)]);
    assert_eq!(solver.set_distance_constraints(&[0, 1], &[1.0], &[1.0, 1.0], 1, 0), 1);

    for _ in 0..50 {
        step(&mut solver);
    }

    let separation = (position(&solver, 0) - position(&solver, 1)).length();
    assert!(
        (separation - 1.0).abs() < 1e-3,
        "separation should converge to 1.0, got {}",
        separation
    );
}

#[test]
fn test_sphere_collider_pushes_particle_out() {
    let mut solver = solver_with(&[Vec3::new(0.0, 0.0, 0.5)]);
    solver.set_particle_solid_radii(&[0.1], 1, 0);
    solver.set_particle_velocities(&[0.0; 4], 1, 0);
    solver.set_collider_group(Some(sphere_group(Vec3::ZERO, 1.0)));

    step(&mut solver);

    let dist = position(&solver, 0).length();
    assert!(dist >= 1.1 - 1e-4, "particle should rest outside the sphere, dist={}", dist);

    assert_eq!(solver.get_collision_count(), 1);
    let mut indices = [-1i32; 1];
    assert_eq!(solver.get_collision_indices(&mut indices), 1);
    assert_eq!(indices[0], 0);
    let mut normals = [0.0f32; 4];
    solver.get_collision_normals(&mut normals);
    assert!(normals[2] > 0.99, "contact normal should point along +z: {:?}", normals);
    let mut impulses = [0.0f32; 1];
    solver.get_collision_normal_impulses(&mut impulses);
    assert!(impulses[0] > 0.0, "penetration should produce a normal impulse");
}

#[test]
fn test_accumulator_pays_only_for_whole_substeps() {
    let mut solver = solver_with(&[Vec3::ZERO]);
    assert!(!solver.update_solver(DT), "no time accumulated yet");

    solver.add_simulation_time(DT * 1.5);
    assert!(solver.update_solver(DT));
    assert!(!solver.update_solver(DT), "half a substep left");
    assert!((solver.accumulated_time() - DT * 0.5).abs() < 1e-6);

    solver.add_simulation_time(DT * 0.5);
    assert!(solver.update_solver(DT), "leftover carries into the next frame");

    solver.add_simulation_time(-1.0);
    solver.add_simulation_time(f32::NAN);
    assert!(solver.accumulated_time() < 1e-5, "invalid time is ignored");
}

#[test]
fn test_constraints_order_round_trip() {
    let mut solver = Solver::new(4, 0, 8);
    assert_eq!(solver.get_constraints_order(), [0, 1, 2, 3, 4, 5, 6, 7]);

    let order = [4, 3, 5, 0, 1, 2, 6, 7];
    solver.set_constraints_order(&order).unwrap();
    assert_eq!(solver.get_constraints_order(), order);

    assert_eq!(
        solver.set_constraints_order(&[4, 4, 5, 0, 1, 2, 6, 7]),
        Err(SolverError::InvalidConstraintOrder)
    );
    assert_eq!(solver.get_constraints_order(), order, "rejected order keeps the previous one");
}

#[test]
fn test_position_interpolation_blends_by_leftover_time() {
    let mut solver = solver_with(&[Vec3::ZERO]);
    solver.set_solver_parameters(SolverParameters {
        interpolation: Interpolation::Interpolate,
        ..zero_gravity()
    });
    solver.set_particle_velocities(&[1.0, 0.0, 0.0, 0.0], 1, 0);

    solver.add_simulation_time(DT * 1.5);
    assert!(solver.update_solver(DT));
    solver.apply_position_interpolation(DT);

    let mut render = [0.0f32; 4];
    solver.get_renderable_particle_positions(&mut render, 1, 0);
    assert!((position(&solver, 0).x - DT).abs() < 1e-6);
    assert!(
        (render[0] - DT * 0.5).abs() < 1e-5,
        "render position should sit halfway through the substep, got {}",
        render[0]
    );

    solver.set_solver_parameters(zero_gravity());
    solver.apply_position_interpolation(DT);
    solver.get_renderable_particle_positions(&mut render, 1, 0);
    assert_eq!(render[0], position(&solver, 0).x, "without interpolation render equals physics");
}

#[test]
fn test_slow_particles_sleep() {
    let mut solver = solver_with(&[Vec3::ZERO]);
    solver.set_particle_velocities(&[0.01, 0.0, 0.0, 0.0], 1, 0);

    for _ in 0..3 {
        step(&mut solver);
    }

    assert_eq!(position(&solver, 0), Vec3::ZERO, "sleeping particle keeps its position");
    assert!(
        (velocity(&solver, 0).x - 0.01).abs() < 1e-5,
        "sleeping particle keeps its velocity, got {:?}",
        velocity(&solver, 0)
    );
}

#[test]
fn test_sleeping_particle_wakes_under_gravity_at_small_substeps() {
    let substep = 1.0 / 240.0;
    let mut solver = solver_with(&[Vec3::ZERO]);
    solver.set_solver_parameters(SolverParameters::default());

    // The first substep's velocity is below the default sleep threshold.
    for _ in 0..240 {
        solver.add_simulation_time(substep);
        assert!(solver.update_solver(substep));
    }

    let y = position(&solver, 0).y;
    assert!(y < -1.0, "a second of free fall should drop the particle well below -1, y={}", y);
}

#[test]
fn test_gravity_moves_free_particles_only() {
    let mut solver = solver_with(&[Vec3::ZERO, Vec3::X]);
    solver.set_solver_parameters(SolverParameters::default());
    solver.set_particle_inverse_masses(&[1.0, 0.0], 2, 0);

    step(&mut solver);

    assert!(position(&solver, 0).y < 0.0, "free particle falls");
    assert_eq!(position(&solver, 1), Vec3::X, "kinematic particle ignores gravity");
}

#[test]
fn test_inactive_particles_are_not_simulated() {
    let mut solver = solver_with(&[Vec3::ZERO, Vec3::X]);
    solver.set_solver_parameters(SolverParameters::default());
    assert_eq!(solver.deactivate_particles(&[1]), 1);

    step(&mut solver);

    assert!(position(&solver, 0).y < 0.0);
    assert_eq!(position(&solver, 1), Vec3::X, "deactivated particle keeps its data");
}

#[test]
fn test_mode_2d_flattens_motion() {
    let mut solver = solver_with(&[Vec3::ZERO]);
    solver.set_solver_parameters(SolverParameters {
        mode: Mode::Mode2D,
        ..zero_gravity()
    });
    solver.set_particle_velocities(&[1.0, 0.0, 3.0, 0.0], 1, 0);

    step(&mut solver);

    assert_eq!(position(&solver, 0).z, 0.0);
    assert_eq!(velocity(&solver, 0).z, 0.0);
    assert!(position(&solver, 0).x > 0.0);
}

#[test]
fn test_bounds_cover_active_particles() {
    let mut solver = solver_with(&[Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0)]);
    solver.set_particle_solid_radii(&[0.5, 0.5], 2, 0);

    let bounds = solver.get_bounds();
    assert_eq!(bounds.min, Vec3::splat(-0.5));
    assert_eq!(bounds.max, Vec3::new(1.5, 2.5, 3.5));

    solver.set_active_particles(&[]);
    assert!(solver.get_bounds().is_empty());
}

#[test]
fn test_pin_follows_world_point_and_collider() {
    let mut solver = solver_with(&[Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
    let group = sphere_group(Vec3::new(0.0, 2.0, 0.0), 0.1);
    solver.set_collider_group(Some(group.clone()));

    let written = solver.set_pin_constraints(
        &[0, 1],
        &[-1, 0],
        &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        &[1.0, 1.0],
        2,
        0,
    );
    assert_eq!(written, 2);

    step(&mut solver);

    assert!((position(&solver, 0) - Vec3::X).length() < 1e-4, "world pin");
    assert!(
        (position(&solver, 1) - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-4,
        "collider pin follows the collider pose: {:?}",
        position(&solver, 1)
    );
}

#[test]
fn test_contact_pushes_linked_rigidbody() {
    let mut solver = solver_with(&[Vec3::new(0.0, 1.05, 0.0)]);
    solver.set_particle_solid_radii(&[0.1], 1, 0);

    let group = sphere_group(Vec3::ZERO, 1.0);
    {
        let mut g = group.write().unwrap();
        let body = Rigidbody {
            inverse_mass: 1.0,
            ..Default::default()
        };
        g.set_rigidbodies(&[body], 1, 0);
        let mut collider = g.colliders()[0];
        collider.rigidbody_index = 0;
        g.set_colliders(&[collider], 1, 0);
    }
    solver.set_collider_group(Some(group.clone()));

    step(&mut solver);

    let g = group.read().unwrap();
    let mut bodies = [Rigidbody::default()];
    g.get_rigidbodies(&mut bodies, 1, 0);
    assert!(
        bodies[0].linear_velocity.y < 0.0,
        "the body should be pushed away from the particle: {:?}",
        bodies[0].linear_velocity
    );
    assert!(position(&solver, 0).y > 1.05, "the particle is pushed out");
}

#[test]
fn test_detached_collider_group_stops_collisions() {
    let mut solver = solver_with(&[Vec3::new(0.0, 0.0, 0.5)]);
    solver.set_particle_solid_radii(&[0.1], 1, 0);
    solver.set_collider_group(Some(sphere_group(Vec3::ZERO, 1.0)));
    solver.set_collider_group(None);

    step(&mut solver);

    assert_eq!(solver.get_collision_count(), 0);
    assert_eq!(position(&solver, 0), Vec3::new(0.0, 0.0, 0.5));
}

#[test]
fn test_group_parameters_are_per_type() {
    let mut solver = Solver::new(4, 0, 8);
    let mut params = solver.get_constraint_group_parameters(ConstraintType::Bending);
    params.iterations = 7;
    solver.set_constraint_group_parameters(ConstraintType::Bending, params);

    assert_eq!(solver.get_constraint_group_parameters(ConstraintType::Bending).iterations, 7);
    assert_eq!(solver.get_constraint_group_parameters(ConstraintType::Distance).iterations, 3);
    assert!(!solver.get_density_parameters().enabled, "density starts disabled");
}

#[test]
fn test_disabled_group_is_skipped() {
    let mut solver = solver_with(&[Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0)]);
    solver.set_distance_constraints(&[0, 1], &[1.0], &[1.0, 1.0], 1, 0);
    let mut params = solver.get_constraint_group_parameters(ConstraintType::Distance);
    params.enabled = false;
    solver.set_constraint_group_parameters(ConstraintType::Distance, params);

    step(&mut solver);

    assert_eq!((position(&solver, 0) - position(&solver, 1)).length(), 2.0);
}

#[test]
fn test_pin_pulls_linked_rigidbody() {
    let mut solver = solver_with(&[Vec3::new(0.1, 0.0, 0.0)]);
    solver.set_collision_parameters(ConstraintParameters::new(false, EvaluationOrder::Sequential, 3));

    let group = sphere_group(Vec3::ZERO, 0.01);
    {
        let mut g = group.write().unwrap();
        let body = Rigidbody {
            inverse_mass: 1.0,
            inverse_inertia: Vec3::ONE,
            ..Default::default()
        };
        g.set_rigidbodies(&[body], 1, 0);
        let mut collider = g.colliders()[0];
        collider.rigidbody_index = 0;
        g.set_colliders(&[collider], 1, 0);
    }
    solver.set_collider_group(Some(group.clone()));
    assert_eq!(solver.set_pin_constraints(&[0], &[0], &[0.0; 4], &[1.0], 1, 0), 1);

    step(&mut solver);

    let g = group.read().unwrap();
    let mut bodies = [Rigidbody::default()];
    g.get_rigidbodies(&mut bodies, 1, 0);
    let body = bodies[0];
    let particle = velocity(&solver, 0);
    assert!(particle.x < 0.0, "the particle is pulled toward the pin point: {:?}", particle);
    assert!(body.linear_velocity.x > 0.0, "the body is pulled toward the particle: {:?}", body.linear_velocity);
    assert!(
        (particle.x + body.linear_velocity.x).abs() < 1e-3,
        "equal masses trade equal and opposite momentum: particle {:?}, body {:?}",
        particle,
        body.linear_velocity
    );
    assert!(
        body.angular_velocity.length() < 1e-6,
        "a pin at the center of mass applies no torque: {:?}",
        body.angular_velocity
    );
    assert!(position(&solver, 0).x > 1e-3, "the body takes half of every correction");
}

/// Kinematic particle 0 and particle 1 held by a rest-0.5 distance
/// constraint and a half-stiffness world pin at its start point.
fn pin_against_distance(order: &[i32]) -> f32 {
    let mut solver = solver_with(&[Vec3::ZERO, Vec3::X]);
    solver.set_particle_inverse_masses(&[0.0, 1.0], 2, 0);
    solver.set_distance_constraints(&[0, 1], &[0.5], &[1.0, 1.0], 1, 0);
    solver.set_pin_constraints(&[1], &[-1], &[1.0, 0.0, 0.0, 0.0], &[0.5], 1, 0);
    solver.set_constraints_order(order).unwrap();

    step(&mut solver);

    position(&solver, 1).x
}

#[test]
fn test_constraint_order_decides_which_type_wins() {
    let distance_last = pin_against_distance(&[0, 1, 2, 3, 4, 5, 6, 7]);
    let pin_last = pin_against_distance(&[0, 4, 2, 3, 1, 5, 6, 7]);

    assert!(
        (distance_last - 0.5).abs() < 1e-4,
        "distance solved after the pin restores the rest length, x={}",
        distance_last
    );
    assert!(
        pin_last > 0.6 && pin_last < 1.0,
        "pin solved after the distance drags the particle back toward its point, x={}",
        pin_last
    );
}
