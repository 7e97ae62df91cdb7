//! # Collision Step
//!
//! Box/sphere intersection and the per-frame resting response.
//!
//! The response is not a solver: each frame every sphere is classified from
//! scratch as either free or resting on the highest box it touches, and
//! [`SceneObject::update_transform`] does the rest.

use cgmath::Vector3;

use crate::{
    geometry::Bounds,
    scene::{PhysicsState, Scene, SceneObject},
};

/// `radius²` minus the squared distance from `center` to `bounds`.
///
/// Positive means the sphere reaches into the box.
pub fn box_sphere_overlap(bounds: &Bounds, center: Vector3<f32>, radius: f32) -> f32 {
    let mut remaining = radius * radius;

    for axis in 0..3 {
        let c = center[axis];
        if c < bounds.min[axis] {
            remaining -= (bounds.min[axis] - c).powi(2);
        } else if c > bounds.max[axis] {
            remaining -= (c - bounds.max[axis]).powi(2);
        }
    }

    remaining
}

/// True when `box_object` is a box variant, `sphere` is a sphere, both are
/// enabled with collision on, and they overlap by a strictly positive amount.
pub fn intersects_box_sphere(box_object: &SceneObject, sphere: &SceneObject) -> bool {
    if !participates(box_object) || !participates(sphere) {
        return false;
    }
    let (Some(_), Some(radius)) = (box_object.box_shape(), sphere.sphere_radius()) else {
        return false;
    };

    box_sphere_overlap(&box_object.bounds(), sphere.position(), radius) > 0.0
}

fn participates(object: &SceneObject) -> bool {
    object.flags.enabled && object.flags.collision
}

/// Height a sphere rests at on top of `bounds`.
///
/// Contact needs a strictly positive overlap, so a sphere placed exactly at
/// this height is free on the next step. It drops a sub-millimetre distance
/// and snaps back, alternating between free and resting.
pub fn resting_height(bounds: &Bounds, radius: f32) -> f32 {
    bounds.max.y + radius
}

/// Reclassifies every object as free or resting. Returns how many are resting.
pub fn step(scene: &mut Scene) -> usize {
    let states: Vec<PhysicsState> = scene
        .iter()
        .map(|object| {
            let Some(radius) = object.sphere_radius() else {
                return PhysicsState::Free;
            };

            scene
                .iter()
                .filter(|other| intersects_box_sphere(other, object))
                .map(|other| resting_height(&other.bounds(), radius))
                .max_by(|a, b| a.total_cmp(b))
                .map_or(PhysicsState::Free, PhysicsState::Resting)
        })
        .collect();

    let mut resting = 0;
    for (object, state) in scene.iter_mut().zip(states) {
        if matches!(state, PhysicsState::Resting(_)) {
            resting += 1;
        }
        object.set_physics_state(state);
    }
    resting
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn unit_box(center: Vector3<f32>, size: Vector3<f32>) -> SceneObject {
        SceneObject::new_box("box", center, size)
    }

    #[test]
    fn test_touching_exactly_is_not_intersecting() {
        let cube = unit_box(Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 2.0, 2.0));
        let ball = SceneObject::new_sphere("ball", Vector3::new(2.0, 0.0, 0.0), 1.0);
        assert_eq!(box_sphere_overlap(&cube.bounds(), ball.position(), 1.0), 0.0);
        assert!(!intersects_box_sphere(&cube, &ball));

        let ball = SceneObject::new_sphere("ball", Vector3::new(1.5, 0.0, 0.0), 1.0);
        assert!(intersects_box_sphere(&cube, &ball));
    }

    #[test]
    fn test_center_inside_box_intersects() {
        let cube = unit_box(Vector3::new(0.0, 0.0, 0.0), Vector3::new(4.0, 4.0, 4.0));
        let ball = SceneObject::new_sphere("ball", Vector3::new(0.5, -0.5, 1.0), 0.1);
        assert!(intersects_box_sphere(&cube, &ball));
    }

    #[test]
    fn test_flags_disable_intersection() {
        let mut cube = unit_box(Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 2.0, 2.0));
        let mut ball = SceneObject::new_sphere("ball", Vector3::new(0.0, 1.5, 0.0), 1.0);
        assert!(intersects_box_sphere(&cube, &ball));

        cube.flags.collision = false;
        assert!(!intersects_box_sphere(&cube, &ball));
        cube.flags.collision = true;

        ball.flags.collision = false;
        assert!(!intersects_box_sphere(&cube, &ball));
        ball.flags.collision = true;

        cube.flags.enabled = false;
        assert!(!intersects_box_sphere(&cube, &ball));
    }

    #[test]
    fn test_wrong_variants_never_intersect() {
        let a = SceneObject::new_sphere("a", Vector3::new(0.0, 0.0, 0.0), 1.0);
        let b = SceneObject::new_sphere("b", Vector3::new(0.5, 0.0, 0.0), 1.0);
        assert!(!intersects_box_sphere(&a, &b));
    }

    #[test]
    fn test_symmetric_under_axis_permutation() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let rotate = |v: Vector3<f32>| Vector3::new(v.y, v.z, v.x);

        for _ in 0..500 {
            let center = Vector3::new(
                rng.random_range(-3.0..3.0),
                rng.random_range(-3.0..3.0),
                rng.random_range(-3.0..3.0),
            );
            let size = Vector3::new(
                rng.random_range(0.1..3.0),
                rng.random_range(0.1..3.0),
                rng.random_range(0.1..3.0),
            );
            let sphere_center = Vector3::new(
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
            );
            let radius = rng.random_range(0.1..2.0);

            let expected = intersects_box_sphere(
                &unit_box(center, size),
                &SceneObject::new_sphere("s", sphere_center, radius),
            );

            let (mut c, mut s, mut p) = (center, size, sphere_center);
            for _ in 0..2 {
                c = rotate(c);
                s = rotate(s);
                p = rotate(p);
                let permuted =
                    intersects_box_sphere(&unit_box(c, s), &SceneObject::new_sphere("s", p, radius));
                assert_eq!(expected, permuted, "box {center:?} {size:?} sphere {sphere_center:?} r {radius}");
            }
        }
    }

    #[test]
    fn test_step_rests_on_highest_box() {
        let mut scene = Scene::new();
        scene.add_object(unit_box(Vector3::new(0.0, -0.5, 0.0), Vector3::new(10.0, 1.0, 10.0)));
        scene.add_object(unit_box(Vector3::new(0.0, 0.25, 0.0), Vector3::new(1.0, 0.5, 1.0)));
        let ball = scene.add_object(SceneObject::new_sphere("ball", Vector3::new(0.0, 0.9, 0.0), 0.5));

        assert_eq!(step(&mut scene), 1);
        assert_eq!(scene.get(ball).unwrap().physics_state(), PhysicsState::Resting(1.0));
        assert_eq!(scene.get(0).unwrap().physics_state(), PhysicsState::Free);

        scene.update_transforms(0.016);
        assert_eq!(scene.get(ball).unwrap().position().y, 1.0);
    }

    #[test]
    fn test_step_frees_sphere_when_box_disabled() {
        let mut scene = Scene::new();
        scene.add_object(unit_box(Vector3::new(0.0, -0.5, 0.0), Vector3::new(10.0, 1.0, 10.0)));
        let ball = scene.add_object(SceneObject::new_sphere("ball", Vector3::new(0.0, 0.4, 0.0), 0.5));

        step(&mut scene);
        assert!(matches!(scene.get(ball).unwrap().physics_state(), PhysicsState::Resting(_)));

        scene.get_mut(0).unwrap().flags.enabled = false;
        assert_eq!(step(&mut scene), 0);
        assert_eq!(scene.get(ball).unwrap().physics_state(), PhysicsState::Free);

        scene.update_transforms(0.1);
        assert!(scene.get(ball).unwrap().position().y < 0.4);
    }

    #[test]
    fn test_sphere_at_resting_height_is_free_next_step() {
        let mut scene = Scene::new();
        scene.add_object(unit_box(Vector3::new(0.0, -0.5, 0.0), Vector3::new(10.0, 1.0, 10.0)));
        let ball = scene.add_object(SceneObject::new_sphere("ball", Vector3::new(0.0, 0.4, 0.0), 0.5));

        assert_eq!(step(&mut scene), 1);
        scene.update_transforms(0.016);
        assert_eq!(scene.get(ball).unwrap().position().y, 0.5);

        assert_eq!(step(&mut scene), 0);
        assert_eq!(scene.get(ball).unwrap().physics_state(), PhysicsState::Free);
        scene.update_transforms(0.016);
        assert!(scene.get(ball).unwrap().position().y < 0.5);

        assert_eq!(step(&mut scene), 1);
    }
}
