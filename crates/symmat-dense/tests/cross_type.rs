//! Mixing fixed-size, runtime-sized, view and scalar operands.

use symmat_dense::{
    AsExpr, Bindings, DynMatrix, FixedMatrix, Matrix3, Shape, SpatialMatrix, SpatialVector,
    SymError, SymScalar, Vector3,
};

fn skew(v: &Vector3) -> Matrix3 {
    let mut s = Matrix3::zeros();
    let x = v.at(0, 0).unwrap();
    let y = v.at(1, 0).unwrap();
    let z = v.at(2, 0).unwrap();
    s.set(0, 1, &-&z).unwrap();
    s.set(0, 2, &y).unwrap();
    s.set(1, 0, &z).unwrap();
    s.set(1, 2, &-&x).unwrap();
    s.set(2, 0, &-&y).unwrap();
    s.set(2, 1, &x).unwrap();
    s
}

#[test]
fn skew_matrix_times_vector_is_cross_product() {
    let a = Vector3::symbol("a");
    let b = Vector3::from_rows([[0.0], [0.0], [1.0]]);
    let cross: Vector3 = (&skew(&a) * &b).unwrap();

    let bindings = Bindings::new().with(a.expr(), &[1.0, 0.0, 0.0]).unwrap();
    assert_eq!(cross.eval(&bindings).unwrap(), vec![0.0, -1.0, 0.0]);
}

#[test]
fn spatial_blocks_round_trip_through_dyn() {
    let rot = Matrix3::identity();
    let mut x = DynMatrix::zero(6, 6);
    x.set_block(0, 0, &rot).unwrap();
    x.set_block(3, 3, &rot).unwrap();
    x.set_block(3, 0, &(&rot * 2.0).unwrap()).unwrap();

    let xs = SpatialMatrix::from_dyn(&x).unwrap();
    let lower: Matrix3 = x.fixed_block::<3, 3>(3, 0).unwrap();
    assert_eq!(lower.at(1, 1).unwrap().to_f64().unwrap(), 2.0);

    let v = SpatialVector::from_rows([[1.0], [0.0], [0.0], [0.0], [0.0], [0.0]]);
    let moved: SpatialVector = (&xs * &v).unwrap();
    assert_eq!(moved.to_vec().unwrap(), vec![1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
}

#[test]
fn mixed_operands_promote_to_dyn() {
    let f = FixedMatrix::<2, 2>::identity();
    let mut d = DynMatrix::identity(3);
    let s = SymScalar::new(0.5);

    let with_dyn = (&f * &DynMatrix::from_row_slice(2, 1, &[3.0, 4.0]).unwrap()).unwrap();
    assert_eq!(with_dyn.shape(), Shape::new(2, 1));

    let view = d.block_mut(0, 0, 2, 2).unwrap();
    let with_view: DynMatrix = (&f - &view).unwrap();
    let view_first: DynMatrix = (&view * &s).unwrap();
    assert_eq!(with_view.to_vec().unwrap(), vec![0.0; 4]);
    assert_eq!(view_first.to_vec().unwrap(), vec![0.5, 0.0, 0.0, 0.5]);

    let cell = d.at_mut(2, 2).unwrap();
    let scaled = (&s * &cell).unwrap();
    assert_eq!(scaled.to_vec().unwrap(), vec![0.5]);
}

#[test]
fn fixed_and_dyn_compare_structurally() {
    let f = Matrix3::symbol("R");
    let d = f.to_dyn();
    assert!(f == d);
    assert!(d == f);
    assert!(d.is_equal(&f));
    assert!(!d.is_equal(&Matrix3::symbol("R")));
}

#[test]
fn scalar_assignments_reject_blocks() {
    let mut m = DynMatrix::zero(3, 3);
    let err = m.at_mut(0, 0).unwrap().set(&Vector3::zeros()).unwrap_err();
    assert!(matches!(err, SymError::ShapeMismatch { .. }));
    assert_eq!(m.to_vec().unwrap(), vec![0.0; 9]);
}

#[test]
fn capability_trait_reports_shapes() {
    fn shape_of(x: &impl AsExpr) -> Shape {
        x.shape()
    }

    let mut d = DynMatrix::zero(4, 2);
    assert_eq!(shape_of(&1.0), Shape::scalar());
    assert_eq!(shape_of(&SymScalar::symbol("k")), Shape::scalar());
    assert_eq!(shape_of(&SpatialVector::zeros()), Shape::new(6, 1));
    assert_eq!(shape_of(&d), Shape::new(4, 2));
    assert_eq!(shape_of(&d.block_mut(1, 0, 3, 2).unwrap()), Shape::new(3, 2));
}
