//! 近傍密度に応じた頂点ごとの解像度割り当て
//!
//! 入力は [0,1]^3 に写した座標。半径 `radius` 内の頂点数 (自身を含む) を数え、
//! その分布の `percentile` 分位点を超える頂点に `dense_resolution` を、
//! それ以外に `base_resolution` を割り当てる。

use log::info;
use meshloss_normalize::Vertex;
use meshloss_quantize::Resolution;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DensityError {
    #[error("no data: vertex set is empty")]
    Empty,
    #[error("neighbor radius must be positive and finite, got {0}")]
    InvalidRadius(f64),
    #[error("percentile must lie in [0, 100], got {0}")]
    InvalidPercentile(f64),
    #[error("resolution must be at least 2, got {0}")]
    InvalidResolution(u32),
}

pub type Result<T> = std::result::Result<T, DensityError>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DensityParams {
    pub radius: f64,
    pub percentile: f64,
    pub base_resolution: u32,
    pub dense_resolution: u32,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self { radius: 0.05, percentile: 75.0, base_resolution: 1024, dense_resolution: 2048 }
    }
}

impl DensityParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(DensityError::InvalidRadius(self.radius));
        }
        if !(0.0..=100.0).contains(&self.percentile) {
            return Err(DensityError::InvalidPercentile(self.percentile));
        }
        for r in [self.base_resolution, self.dense_resolution] {
            if r < 2 {
                return Err(DensityError::InvalidResolution(r));
            }
        }
        Ok(())
    }
}

/// 密度解析の結果
#[derive(Clone, Debug)]
pub struct DensityMap {
    pub neighbor_counts: Vec<usize>,
    pub threshold: f64,
    pub resolutions: Vec<u32>,
}

impl DensityMap {
    pub fn is_dense(&self, i: usize) -> bool {
        self.neighbor_counts[i] as f64 > self.threshold
    }

    pub fn dense_count(&self) -> usize {
        (0..self.neighbor_counts.len()).filter(|&i| self.is_dense(i)).count()
    }

    pub fn base_count(&self) -> usize {
        self.neighbor_counts.len() - self.dense_count()
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::PerVertex(self.resolutions.clone())
    }
}

/// 一辺 `radius` のボクセルに頂点を振り分けるハッシュグリッド
struct SpatialGrid {
    inv: f64,
    min: Vertex,
    cells: HashMap<[i64; 3], Vec<usize>>,
}

impl SpatialGrid {
    fn build(points: &[Vertex], radius: f64, min: Vertex) -> Self {
        // 丸め誤差で隣接セルの外に出ないよう少し大きめに取る
        let inv = 1.0 / (radius * (1.0 + 1e-9));
        let mut grid = SpatialGrid { inv, min, cells: HashMap::new() };
        for (i, p) in points.iter().enumerate() {
            let key = grid.cell(p);
            grid.cells.entry(key).or_default().push(i);
        }
        grid
    }

    #[inline]
    fn cell(&self, p: &Vertex) -> [i64; 3] {
        [
            ((p[0] - self.min[0]) * self.inv).floor() as i64,
            ((p[1] - self.min[1]) * self.inv).floor() as i64,
            ((p[2] - self.min[2]) * self.inv).floor() as i64,
        ]
    }

    /// p から距離 r2 (二乗) 以内の頂点数。周囲 27 セルだけ見る
    fn count_within(&self, points: &[Vertex], p: &Vertex, r2: f64) -> usize {
        let c = self.cell(p);
        let mut count = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.cells.get(&[c[0] + dx, c[1] + dy, c[2] + dz]) else {
                        continue;
                    };
                    count += bucket
                        .iter()
                        .filter(|&&j| {
                            let q = &points[j];
                            (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) + (p[2] - q[2]).powi(2) <= r2
                        })
                        .count();
                }
            }
        }
        count
    }
}

/// 各頂点の半径 `radius` 内にある頂点数 (自身を含む、境界上も含む)
pub fn neighbor_counts(points: &[Vertex], radius: f64) -> Result<Vec<usize>> {
    if points.is_empty() {
        return Err(DensityError::Empty);
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(DensityError::InvalidRadius(radius));
    }
    let mut min = [f64::INFINITY; 3];
    for p in points {
        for a in 0..3 {
            min[a] = min[a].min(p[a]);
        }
    }
    let grid = SpatialGrid::build(points, radius, min);
    let r2 = radius * radius;
    Ok(points.iter().map(|p| grid.count_within(points, p, r2)).collect())
}

/// 線形補間による分位点 (numpy の既定と同じ)
pub fn percentile(values: &[usize], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(DensityError::Empty);
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(DensityError::InvalidPercentile(q));
    }
    let mut sorted: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// 密度から頂点ごとの解像度を決める
pub fn adaptive_resolutions(points: &[Vertex], params: &DensityParams) -> Result<DensityMap> {
    params.validate()?;
    let neighbor_counts = neighbor_counts(points, params.radius)?;
    let threshold = percentile(&neighbor_counts, params.percentile)?;
    let resolutions: Vec<u32> = neighbor_counts
        .iter()
        .map(|&c| if c as f64 > threshold { params.dense_resolution } else { params.base_resolution })
        .collect();

    let map = DensityMap { neighbor_counts, threshold, resolutions };
    info!("density threshold {:.2}: dense {} | base {}", threshold, map.dense_count(), map.base_count());
    Ok(map)
}
