use log::debug;
use thiserror::Error;

/// 頂点座標 (x, y, z)
pub type Vertex = [f64; 3];

/// 幅ゼロの軸に使う代替レンジ
pub const RANGE_EPSILON: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("no data: vertex set is empty")]
    Empty,
}

pub type Result<T> = std::result::Result<T, NormalizeError>;

/// 正規化の方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Framing {
    /// 軸ごとに [0,1] へ線形変換
    MinMax,
    /// 重心を原点に、最大距離で割って単位球に収める。出力は [-1,1]
    UnitSphere,
}

/// 逆変換に必要なパラメータ
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NormalizationFrame {
    MinMax { min: Vertex, max: Vertex },
    UnitSphere { centroid: Vertex, scale: f64 },
}

/// AABB: Axis-Aligned Bounding Box
/// 全頂点を内包する直方体の最小座標と最大座標を返す
pub fn aabb_min_max(positions: &[Vertex]) -> Result<(Vertex, Vertex)> {
    if positions.is_empty() {
        return Err(NormalizeError::Empty);
    }
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for p in positions {
        for a in 0..3 {
            if p[a] < min[a] { min[a] = p[a]; }
            if p[a] > max[a] { max[a] = p[a]; }
        }
    }
    Ok((min, max))
}

/// 重心
pub fn centroid(positions: &[Vertex]) -> Result<Vertex> {
    if positions.is_empty() {
        return Err(NormalizeError::Empty);
    }
    let mut sum = [0.0f64; 3];
    for p in positions {
        for a in 0..3 {
            sum[a] += p[a];
        }
    }
    let n = positions.len() as f64;
    Ok([sum[0] / n, sum[1] / n, sum[2] / n])
}

#[inline]
fn guarded_range(min: &Vertex, max: &Vertex) -> Vertex {
    let mut range = [0.0; 3];
    for a in 0..3 {
        let r = max[a] - min[a];
        range[a] = if r == 0.0 { RANGE_EPSILON } else { r };
    }
    range
}

impl Framing {
    pub fn name(&self) -> &'static str {
        match self {
            Framing::MinMax => "min-max",
            Framing::UnitSphere => "unit-sphere",
        }
    }

    /// 正規化。フレームは入力から一度だけ計算する
    pub fn forward(&self, vertices: &[Vertex]) -> Result<(Vec<Vertex>, NormalizationFrame)> {
        let frame = match self {
            Framing::MinMax => {
                let (min, max) = aabb_min_max(vertices)?;
                NormalizationFrame::MinMax { min, max }
            }
            Framing::UnitSphere => {
                let c = centroid(vertices)?;
                let mut scale = 0.0f64;
                for p in vertices {
                    let d = ((p[0] - c[0]).powi(2) + (p[1] - c[1]).powi(2) + (p[2] - c[2]).powi(2)).sqrt();
                    if d > scale { scale = d; }
                }
                // 全頂点が重心と一致する場合
                if scale == 0.0 { scale = 1.0; }
                NormalizationFrame::UnitSphere { centroid: c, scale }
            }
        };
        debug!("{} frame: {:?}", self.name(), frame);
        Ok((frame.apply(vertices), frame))
    }

    pub fn inverse(&self, normalized: &[Vertex], frame: &NormalizationFrame) -> Vec<Vertex> {
        frame.inverse(normalized)
    }
}

impl NormalizationFrame {
    pub fn framing(&self) -> Framing {
        match self {
            NormalizationFrame::MinMax { .. } => Framing::MinMax,
            NormalizationFrame::UnitSphere { .. } => Framing::UnitSphere,
        }
    }

    /// 既存フレームで正規化する
    pub fn apply(&self, vertices: &[Vertex]) -> Vec<Vertex> {
        match *self {
            NormalizationFrame::MinMax { min, max } => {
                let range = guarded_range(&min, &max);
                vertices
                    .iter()
                    .map(|p| {
                        [
                            (p[0] - min[0]) / range[0],
                            (p[1] - min[1]) / range[1],
                            (p[2] - min[2]) / range[2],
                        ]
                    })
                    .collect()
            }
            NormalizationFrame::UnitSphere { centroid: c, scale } => vertices
                .iter()
                .map(|p| [(p[0] - c[0]) / scale, (p[1] - c[1]) / scale, (p[2] - c[2]) / scale])
                .collect(),
        }
    }

    /// 逆変換
    pub fn inverse(&self, normalized: &[Vertex]) -> Vec<Vertex> {
        match *self {
            NormalizationFrame::MinMax { min, max } => {
                let range = guarded_range(&min, &max);
                normalized
                    .iter()
                    .map(|p| {
                        [
                            p[0] * range[0] + min[0],
                            p[1] * range[1] + min[1],
                            p[2] * range[2] + min[2],
                        ]
                    })
                    .collect()
            }
            NormalizationFrame::UnitSphere { centroid: c, scale } => normalized
                .iter()
                .map(|p| [p[0] * scale + c[0], p[1] * scale + c[1], p[2] * scale + c[2]])
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> Vec<Vertex> {
        vec![[0.0, 1.0, 2.0], [10.0, 20.0, 30.0], [-1.0, 0.5, 100.0], [3.5, -7.25, 4.0]]
    }

    #[test]
    fn min_max_maps_to_unit_cube() {
        let (norm, frame) = Framing::MinMax.forward(&sample()).unwrap();
        for p in &norm {
            for a in 0..3 {
                assert!((0.0..=1.0).contains(&p[a]), "{} out of range", p[a]);
            }
        }
        assert_eq!(norm[2][0], 0.0);
        assert_eq!(norm[1][0], 1.0);
        assert_eq!(frame, NormalizationFrame::MinMax { min: [-1.0, -7.25, 2.0], max: [10.0, 20.0, 100.0] });
    }

    #[test]
    fn unit_sphere_fits_in_ball() {
        let (norm, frame) = Framing::UnitSphere.forward(&sample()).unwrap();
        let mut max_len = 0.0f64;
        for p in &norm {
            let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            max_len = max_len.max(len);
        }
        assert_abs_diff_eq!(max_len, 1.0, epsilon = 1e-12);
        assert_eq!(frame.framing(), Framing::UnitSphere);
    }

    #[test]
    fn roundtrip_both_framings() {
        let src = sample();
        for framing in [Framing::MinMax, Framing::UnitSphere] {
            let (norm, frame) = framing.forward(&src).unwrap();
            let restored = framing.inverse(&norm, &frame);
            for (p, r) in src.iter().zip(restored.iter()) {
                for a in 0..3 {
                    assert_abs_diff_eq!(p[a], r[a], epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn flat_axis_uses_epsilon() {
        let src = vec![[0.0, 1.0, 5.0], [2.0, 3.0, 5.0]];
        let (norm, frame) = Framing::MinMax.forward(&src).unwrap();
        assert!(norm.iter().all(|p| p[2] == 0.0));
        let restored = frame.inverse(&norm);
        assert_eq!(restored[0][2], 5.0);
        assert_eq!(restored[1][2], 5.0);
    }

    #[test]
    fn coincident_points_use_unit_scale() {
        let src = vec![[1.5, -2.0, 3.0]; 4];
        let (norm, frame) = Framing::UnitSphere.forward(&src).unwrap();
        assert_eq!(frame, NormalizationFrame::UnitSphere { centroid: [1.5, -2.0, 3.0], scale: 1.0 });
        assert!(norm.iter().all(|p| *p == [0.0, 0.0, 0.0]));
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(Framing::MinMax.forward(&[]).unwrap_err(), NormalizeError::Empty);
        assert_eq!(Framing::UnitSphere.forward(&[]).unwrap_err(), NormalizeError::Empty);
    }
}
