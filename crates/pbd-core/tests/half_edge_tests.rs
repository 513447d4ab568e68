use glam::Vec3;
use pbd_core::half_edge::{Face, HalfEdge, Vertex};
use pbd_core::{HalfEdgeMesh, SolverError};

const TETRA_VERTICES: [f32; 12] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
/// Outward winding.
const TETRA_TRIANGLES: [i32; 12] = [0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3];

fn tetrahedron() -> HalfEdgeMesh {
    let mut mesh = HalfEdgeMesh::new();
    mesh.generate(&TETRA_VERTICES, &TETRA_TRIANGLES, 4, 4, Vec3::ONE)
        .expect("tetrahedron is a valid closed mesh");
    mesh
}

#[test]
fn test_tetrahedron_topology() {
    let mesh = tetrahedron();
    assert_eq!(mesh.vertices().len(), 4);
    assert_eq!(mesh.faces().len(), 4);
    assert_eq!(mesh.half_edges().len(), 12, "3 per face, 2 per edge");

    for (i, he) in mesh.half_edges().iter().enumerate() {
        assert_eq!(he.index, i as i32);
        assert!(he.pair >= 0, "closed mesh has no border half-edge");
        let pair = &mesh.half_edges()[he.pair as usize];
        assert_eq!(pair.pair, i as i32, "pair of pair is the half-edge itself");

        let next = &mesh.half_edges()[he.next_half_edge as usize];
        assert_eq!(pair.origin, next.origin, "pair runs the same edge backwards");
        assert_eq!(next.face, he.face);
        let third = &mesh.half_edges()[next.next_half_edge as usize];
        assert_eq!(third.next_half_edge, i as i32, "faces are 3-cycles");
    }

    for v in mesh.vertices() {
        let he = &mesh.half_edges()[v.half_edge as usize];
        assert_eq!(he.origin, v.index, "vertex half-edge starts at the vertex");
    }
}

#[test]
fn test_tetrahedron_info() {
    let info = tetrahedron().info();
    assert!(info.closed);
    assert!(!info.non_manifold);
    assert_eq!(info.border_edge_count, 0);
    assert!((info.volume - 1.0 / 6.0).abs() < 1e-6, "volume {}", info.volume);
    let expected_area = 1.5 + 3.0f32.sqrt() / 2.0;
    assert!((info.area - expected_area).abs() < 1e-5, "area {}", info.area);
}

#[test]
fn test_open_quad_has_border() {
    let mut mesh = HalfEdgeMesh::new();
    let vertices = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    mesh.generate(&vertices, &[0, 1, 2, 0, 2, 3], 4, 2, Vec3::ONE).unwrap();

    let info = mesh.info();
    assert!(!info.closed);
    assert_eq!(info.border_edge_count, 4);
    assert_eq!(mesh.half_edges().iter().filter(|h| h.pair >= 0).count(), 2, "one shared diagonal");
    assert!((info.area - 1.0).abs() < 1e-6);
}

#[test]
fn test_coincident_vertices_are_welded() {
    // Every face carries its own copy of its corners.
    let corners: Vec<f32> = TETRA_TRIANGLES
        .iter()
        .flat_map(|&v| TETRA_VERTICES[v as usize * 3..v as usize * 3 + 3].to_vec())
        .collect();
    let triangles: Vec<i32> = (0..12).collect();

    let mut mesh = HalfEdgeMesh::new();
    mesh.generate(&corners, &triangles, 12, 4, Vec3::splat(2.0)).unwrap();

    assert_eq!(mesh.vertices().len(), 4);
    assert!(mesh.info().closed, "welding stitches the faces together");
    assert!((mesh.info().volume - 8.0 / 6.0).abs() < 1e-5, "scale applies to positions");
    assert_eq!(mesh.welded_index(0), mesh.welded_index(3), "both copies of vertex 0");
    assert_eq!(mesh.welded_index(12), None);
}

#[test]
fn test_invalid_input_leaves_mesh_unchanged() {
    let mut mesh = tetrahedron();
    let vertices = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];

    let fan = [0, 1, 2, 1, 0, 3, 0, 1, 4];
    assert!(matches!(
        mesh.generate(&vertices, &fan, 5, 3, Vec3::ONE),
        Err(SolverError::NonManifoldEdge { .. })
    ));

    assert_eq!(
        mesh.generate(&vertices, &[0, 0, 1], 5, 1, Vec3::ONE),
        Err(SolverError::DegenerateTriangle { triangle: 0 })
    );
    let collinear = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0];
    assert_eq!(
        mesh.generate(&collinear, &[0, 1, 2], 3, 1, Vec3::ONE),
        Err(SolverError::DegenerateTriangle { triangle: 0 })
    );

    assert_eq!(
        mesh.generate(&vertices, &[0, 1, 7], 5, 1, Vec3::ONE),
        Err(SolverError::VertexOutOfRange { index: 7, count: 5 })
    );
    assert_eq!(
        mesh.generate(&vertices, &[0, 1, -1], 5, 1, Vec3::ONE),
        Err(SolverError::VertexOutOfRange { index: -1, count: 5 })
    );
    assert!(matches!(
        mesh.generate(&vertices[..6], &[0, 1, 2], 3, 1, Vec3::ONE),
        Err(SolverError::InsufficientData { .. })
    ));
    assert!(matches!(
        mesh.generate(&vertices, &[0, 1], 5, 1, Vec3::ONE),
        Err(SolverError::InsufficientData { .. })
    ));

    assert_eq!(mesh.half_edges().len(), 12, "failed generation keeps the previous mesh");
    assert!(mesh.info().closed);
}

#[test]
fn test_normals_and_orientations_are_unit() {
    let mesh = tetrahedron();
    let positions = mesh.positions();
    let normals = mesh.area_weighted_normals(&positions);
    assert_eq!(normals.len(), 4);
    for n in &normals {
        assert!((n.length() - 1.0).abs() < 1e-5);
    }
    // The far corner's normal points away from the origin.
    assert!(normals[1].dot(Vec3::ONE) > 0.0);
    assert!(normals[0].dot(Vec3::ONE) < 0.0);

    let orientations = mesh.vertex_orientations(&positions);
    for (q, n) in orientations.iter().zip(&normals) {
        assert!(q.is_normalized());
        assert!((*q * Vec3::Y - *n).length() < 1e-4, "local y maps to the vertex normal");
    }
}

#[test]
fn test_normals_follow_deformed_positions() {
    let mut mesh = HalfEdgeMesh::new();
    mesh.generate(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], &[0, 1, 2], 3, 1, Vec3::ONE)
        .unwrap();
    let flipped = [Vec3::ZERO, Vec3::Y, Vec3::X];
    for n in mesh.area_weighted_normals(&flipped) {
        assert!((n + Vec3::Z).length() < 1e-6, "normal {:?}", n);
    }
}

#[test]
fn test_bulk_records_round_trip() {
    let source = tetrahedron();
    let mut copy = HalfEdgeMesh::new();
    assert_eq!(copy.set_vertices(source.vertices(), 4, 0), 4);
    assert_eq!(copy.set_half_edges(source.half_edges(), 12, 0), 12);
    assert_eq!(copy.set_faces(source.faces(), 4, 0), 4);
    assert_eq!(copy.info(), source.info());

    let mut vertices = [Vertex { index: 0, half_edge: 0, position: [0.0; 3] }; 2];
    assert_eq!(copy.get_vertices(&mut vertices, 2, 3), 1);
    assert_eq!(vertices[0], source.vertices()[3]);

    let mut half_edges = [HalfEdge { index: 0, index_in_face: 0, face: 0, next_half_edge: 0, pair: 0, origin: 0 }; 12];
    assert_eq!(copy.get_half_edges(&mut half_edges, 12, 0), 12);
    assert_eq!(&half_edges[..], source.half_edges());

    let mut faces = [Face { index: 0, half_edge: 0 }; 4];
    assert_eq!(copy.get_faces(&mut faces, 4, 0), 4);
    assert_eq!(source.half_edge_bytes().len(), 12 * std::mem::size_of::<HalfEdge>());
}
