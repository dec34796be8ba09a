use meshloss_normalize::Vertex;
use serde::Serialize;
use thiserror::Error;

/// ヒストグラムの既定ビン数
pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricsError {
    #[error("no data: vertex set is empty")]
    Empty,
    #[error("shape mismatch: original has {expected} vertices, reconstructed has {found}")]
    ShapeMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, MetricsError>;

fn check_shapes(original: &[Vertex], reconstructed: &[Vertex]) -> Result<()> {
    if original.len() != reconstructed.len() {
        return Err(MetricsError::ShapeMismatch { expected: original.len(), found: reconstructed.len() });
    }
    if original.is_empty() {
        return Err(MetricsError::Empty);
    }
    Ok(())
}

/// 頂点ごとの二乗ユークリッド誤差
pub fn per_vertex_squared_error(original: &[Vertex], reconstructed: &[Vertex]) -> Result<Vec<f64>> {
    check_shapes(original, reconstructed)?;
    Ok(original
        .iter()
        .zip(reconstructed)
        .map(|(p, q)| (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) + (p[2] - q[2]).powi(2))
        .collect())
}

/// MSE
pub fn mse(original: &[Vertex], reconstructed: &[Vertex]) -> Result<f64> {
    let errors = per_vertex_squared_error(original, reconstructed)?;
    Ok(errors.iter().sum::<f64>() / errors.len() as f64)
}

/// 軸ごとの MSE
pub fn per_axis_mse(original: &[Vertex], reconstructed: &[Vertex]) -> Result<[f64; 3]> {
    check_shapes(original, reconstructed)?;
    let mut sum = [0.0f64; 3];
    for (p, q) in original.iter().zip(reconstructed) {
        for a in 0..3 {
            sum[a] += (p[a] - q[a]).powi(2);
        }
    }
    let n = original.len() as f64;
    Ok([sum[0] / n, sum[1] / n, sum[2] / n])
}

/// 再構成誤差のまとめ。比較ごとに作り直す
#[derive(Clone, Debug, Serialize)]
pub struct ErrorReport {
    pub per_vertex: Vec<f64>,
    pub mse: f64,
    pub per_axis_mse: [f64; 3],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// ビン i の左端
    pub fn bin_start(&self, i: usize) -> f64 {
        self.min + (self.max - self.min) * i as f64 / self.counts.len() as f64
    }
}

impl ErrorReport {
    pub fn compare(original: &[Vertex], reconstructed: &[Vertex]) -> Result<Self> {
        let per_vertex = per_vertex_squared_error(original, reconstructed)?;
        let mse = per_vertex.iter().sum::<f64>() / per_vertex.len() as f64;
        let per_axis_mse = per_axis_mse(original, reconstructed)?;
        Ok(Self { per_vertex, mse, per_axis_mse })
    }

    pub fn max_error(&self) -> f64 {
        self.per_vertex.iter().copied().fold(0.0, f64::max)
    }

    /// 等幅ヒストグラム。最大値は最後のビンに入れる
    pub fn histogram(&self, bins: usize) -> Histogram {
        let bins = bins.max(1);
        let min = self.per_vertex.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.per_vertex.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut counts = vec![0usize; bins];
        let width = max - min;
        for &e in &self.per_vertex {
            let i = if width > 0.0 { (((e - min) / width) * bins as f64) as usize } else { 0 };
            counts[i.min(bins - 1)] += 1;
        }
        Histogram { min, max, counts }
    }
}

/// 頂点群の基本統計 (標準偏差は母標準偏差)
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VertexStats {
    pub count: usize,
    pub min: Vertex,
    pub max: Vertex,
    pub mean: Vertex,
    pub std: Vertex,
}

pub fn describe(vertices: &[Vertex]) -> Result<VertexStats> {
    if vertices.is_empty() {
        return Err(MetricsError::Empty);
    }
    let n = vertices.len() as f64;
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    let mut mean = [0.0f64; 3];
    for p in vertices {
        for a in 0..3 {
            min[a] = min[a].min(p[a]);
            max[a] = max[a].max(p[a]);
            mean[a] += p[a];
        }
    }
    for m in &mut mean {
        *m /= n;
    }
    let mut var = [0.0f64; 3];
    for p in vertices {
        for a in 0..3 {
            var[a] += (p[a] - mean[a]).powi(2);
        }
    }
    let std = [(var[0] / n).sqrt(), (var[1] / n).sqrt(), (var[2] / n).sqrt()];
    Ok(VertexStats { count: vertices.len(), min, max, mean, std })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn per_vertex_and_mean() {
        let a = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];
        let b = vec![[1.0, 0.0, 0.0], [1.0, 3.0, 1.0]];
        assert_eq!(per_vertex_squared_error(&a, &b).unwrap(), vec![1.0, 4.0]);
        assert_eq!(mse(&a, &b).unwrap(), 2.5);
        assert_eq!(per_axis_mse(&a, &b).unwrap(), [0.5, 2.0, 0.0]);
    }

    #[test]
    fn per_axis_sums_to_mse() {
        let a = vec![[0.1, 0.2, 0.3], [4.0, -1.0, 2.5], [7.0, 7.0, 7.0]];
        let b = vec![[0.0, 0.25, 0.5], [3.5, -1.5, 2.0], [7.1, 6.8, 7.3]];
        let report = ErrorReport::compare(&a, &b).unwrap();
        let axis_sum: f64 = report.per_axis_mse.iter().sum();
        assert_relative_eq!(axis_sum, report.mse, max_relative = 1e-12);
        assert_eq!(report.per_vertex.len(), 3);
    }

    #[test]
    fn mismatch_and_empty_fail() {
        let a = vec![[0.0, 0.0, 0.0]];
        assert_eq!(mse(&a, &[]).unwrap_err(), MetricsError::ShapeMismatch { expected: 1, found: 0 });
        assert_eq!(per_axis_mse(&[], &[]).unwrap_err(), MetricsError::Empty);
        assert!(ErrorReport::compare(&[], &[]).is_err());
    }

    #[test]
    fn histogram_counts_every_vertex() {
        let report = ErrorReport { per_vertex: vec![0.0, 0.1, 0.2, 0.2, 1.0], mse: 0.3, per_axis_mse: [0.1; 3] };
        let h = report.histogram(10);
        assert_eq!(h.counts.iter().sum::<usize>(), 5);
        assert_eq!(h.counts[0], 1);
        assert_eq!(h.counts[9], 1);
        assert_eq!(h.bin_start(5), 0.5);
        assert_eq!(report.max_error(), 1.0);

        let flat = ErrorReport { per_vertex: vec![0.0; 4], mse: 0.0, per_axis_mse: [0.0; 3] };
        assert_eq!(flat.histogram(DEFAULT_HISTOGRAM_BINS).counts[0], 4);
    }

    #[test]
    fn describe_matches_population_std() {
        let stats = describe(&[[0.0, 2.0, -1.0], [2.0, 2.0, 1.0]]).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, [0.0, 2.0, -1.0]);
        assert_eq!(stats.max, [2.0, 2.0, 1.0]);
        assert_eq!(stats.mean, [1.0, 2.0, 0.0]);
        assert_eq!(stats.std, [1.0, 0.0, 1.0]);
        assert_eq!(describe(&[]).unwrap_err(), MetricsError::Empty);
    }
}
