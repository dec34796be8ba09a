use meshloss_normalize::Vertex;
use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};
use rand::Rng;
use std::f64::consts::PI;

/// 回転 + 平行移動
#[derive(Clone, Debug, PartialEq)]
pub struct RigidTransform {
    pub isometry: Isometry3<f64>,
}

impl RigidTransform {
    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self { isometry: Isometry3::from_parts(Translation3::from(translation), rotation) }
    }

    /// 一様ランダムな回転 (Shoemake) と [0,10)^3 の平行移動
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let u1: f64 = rng.gen();
        let u2: f64 = rng.gen();
        let u3: f64 = rng.gen();
        let a = (1.0 - u1).sqrt();
        let b = u1.sqrt();
        let q = Quaternion::new(
            b * (2.0 * PI * u3).cos(),
            a * (2.0 * PI * u2).sin(),
            a * (2.0 * PI * u2).cos(),
            b * (2.0 * PI * u3).sin(),
        );
        let translation = Vector3::new(rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()) * 10.0;
        Self::new(UnitQuaternion::from_quaternion(q), translation)
    }

    pub fn apply(&self, vertices: &[Vertex]) -> Vec<Vertex> {
        vertices
            .iter()
            .map(|v| {
                let p = self.isometry.transform_point(&Point3::new(v[0], v[1], v[2]));
                [p.x, p.y, p.z]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dist(a: &Vertex, b: &Vertex) -> f64 {
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
    }

    #[test]
    fn preserves_distances() {
        let mut rng = StdRng::seed_from_u64(3);
        let t = RigidTransform::random(&mut rng);
        let src = vec![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [-4.0, 0.5, 2.0]];
        let moved = t.apply(&src);
        for i in 0..src.len() {
            for j in 0..src.len() {
                assert_relative_eq!(dist(&src[i], &src[j]), dist(&moved[i], &moved[j]), epsilon = 1e-12);
            }
        }
        let tr = t.isometry.translation.vector;
        assert!(tr.iter().all(|&c| (0.0..10.0).contains(&c)));
        assert_relative_eq!(t.isometry.rotation.quaternion().norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn identity_leaves_points() {
        let t = RigidTransform::new(UnitQuaternion::identity(), Vector3::new(1.0, 0.0, -1.0));
        assert_eq!(t.apply(&[[1.0, 2.0, 3.0]]), vec![[2.0, 2.0, 2.0]]);
    }
}
