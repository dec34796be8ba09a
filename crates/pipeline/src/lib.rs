//! 正規化 → 量子化 → 逆量子化 → 逆正規化 → 誤差評価 をまとめたパイプライン
//!
//! 量子化器は [0,1]^3 の座標しか受け取らない。単位球正規化の出力は [-1,1] なので、
//! 量子化の前後で [`to_unit_cube`] / [`from_unit_cube`] を一度ずつ通す。

mod config;
mod rigid;

pub use config::PipelineConfig;
pub use rigid::RigidTransform;

use log::debug;
use meshloss_density::{adaptive_resolutions, DensityError, DensityMap};
use meshloss_metrics::{ErrorReport, MetricsError};
use meshloss_normalize::{Framing, NormalizationFrame, NormalizeError, Vertex};
use meshloss_quantize::{dequantize_positions, quantize_positions, QuantizeError, QuantizedPositions, Resolution};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Quantize(#[from] QuantizeError),
    #[error(transparent)]
    Density(#[from] DensityError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// 一様量子化か、密度に応じた頂点ごとの量子化か
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    Uniform,
    Adaptive,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Uniform => "uniform",
            Mode::Adaptive => "adaptive",
        }
    }
}

/// [-1,1] → [0,1]
pub fn to_unit_cube(points: &[Vertex]) -> Vec<Vertex> {
    points.iter().map(|p| [(p[0] + 1.0) / 2.0, (p[1] + 1.0) / 2.0, (p[2] + 1.0) / 2.0]).collect()
}

/// [0,1] → [-1,1]
pub fn from_unit_cube(points: &[Vertex]) -> Vec<Vertex> {
    points.iter().map(|p| [p[0] * 2.0 - 1.0, p[1] * 2.0 - 1.0, p[2] * 2.0 - 1.0]).collect()
}

/// 正規化後の座標を量子化器の入力空間へ。min-max はそのまま
fn enter_quantizer_space(framing: Framing, normalized: &[Vertex]) -> Vec<Vertex> {
    match framing {
        Framing::MinMax => normalized.to_vec(),
        Framing::UnitSphere => to_unit_cube(normalized),
    }
}

fn leave_quantizer_space(framing: Framing, dequantized: Vec<Vertex>) -> Vec<Vertex> {
    match framing {
        Framing::MinMax => dequantized,
        Framing::UnitSphere => from_unit_cube(&dequantized),
    }
}

/// 1 回の実行結果
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub framing: Framing,
    pub mode: Mode,
    pub frame: NormalizationFrame,
    /// 正規化直後の座標 (min-max は [0,1]、単位球は [-1,1])
    pub normalized: Vec<Vertex>,
    pub quantized: QuantizedPositions,
    pub reconstructed: Vec<Vertex>,
    pub report: ErrorReport,
    pub density: Option<DensityMap>,
}

impl PipelineOutput {
    pub fn mse(&self) -> f64 {
        self.report.mse
    }
}

/// 標準の 3 通り
#[derive(Clone, Debug)]
pub struct StandardRuns {
    pub min_max: PipelineOutput,
    pub unit_sphere: PipelineOutput,
    pub adaptive: PipelineOutput,
}

/// 剛体変換に対する不変性の比較
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct InvarianceReport {
    pub unit_sphere_uniform_original: f64,
    pub unit_sphere_uniform_transformed: f64,
    pub unit_sphere_adaptive_original: f64,
    pub unit_sphere_adaptive_transformed: f64,
    pub min_max_original: f64,
    pub min_max_transformed: f64,
}

impl InvarianceReport {
    /// 単位球・一様量子化での MSE の差
    pub fn invariance_difference(&self) -> f64 {
        (self.unit_sphere_uniform_original - self.unit_sphere_uniform_transformed).abs()
    }

    pub fn min_max_difference(&self) -> f64 {
        (self.min_max_original - self.min_max_transformed).abs()
    }

    /// 一様に対する適応量子化の改善率 (%)。一様の誤差が 0 なら 0
    pub fn adaptive_improvement_percent(&self) -> f64 {
        let uniform = self.unit_sphere_uniform_original;
        if uniform == 0.0 {
            return 0.0;
        }
        (uniform - self.unit_sphere_adaptive_original) / uniform * 100.0
    }
}

#[derive(Clone, Debug)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self { config: PipelineConfig::default() }
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, vertices: &[Vertex], framing: Framing, mode: Mode) -> Result<PipelineOutput> {
        self.run_inner(vertices, framing, mode, self.config.base_resolution)
    }

    /// 設定を無視して解像度を指定する一様量子化
    pub fn run_uniform(&self, vertices: &[Vertex], framing: Framing, resolution: u32) -> Result<PipelineOutput> {
        self.run_inner(vertices, framing, Mode::Uniform, resolution)
    }

    fn run_inner(&self, vertices: &[Vertex], framing: Framing, mode: Mode, uniform: u32) -> Result<PipelineOutput> {
        let (normalized, frame) = framing.forward(vertices)?;
        let unit = enter_quantizer_space(framing, &normalized);

        let (resolution, density) = match mode {
            Mode::Uniform => (Resolution::Uniform(uniform), None),
            Mode::Adaptive => {
                let map = adaptive_resolutions(&unit, &self.config.density_params())?;
                (map.resolution(), Some(map))
            }
        };

        let quantized = quantize_positions(&unit, &resolution)?;
        let dequantized = leave_quantizer_space(framing, dequantize_positions(&quantized)?);
        let reconstructed = frame.inverse(&dequantized);
        let report = ErrorReport::compare(vertices, &reconstructed)?;
        debug!("{}/{}: {} vertices, mse {:.6e}", framing.name(), mode.name(), vertices.len(), report.mse);

        Ok(PipelineOutput { framing, mode, frame, normalized, quantized, reconstructed, report, density })
    }

    /// min-max 一様、単位球一様、単位球適応
    pub fn run_standard(&self, vertices: &[Vertex]) -> Result<StandardRuns> {
        Ok(StandardRuns {
            min_max: self.run(vertices, Framing::MinMax, Mode::Uniform)?,
            unit_sphere: self.run(vertices, Framing::UnitSphere, Mode::Uniform)?,
            adaptive: self.run(vertices, Framing::UnitSphere, Mode::Adaptive)?,
        })
    }

    pub fn invariance_study(&self, vertices: &[Vertex], transform: &RigidTransform) -> Result<InvarianceReport> {
        let original = self.run_standard(vertices)?;
        self.invariance_from_runs(&original, vertices, transform)
    }

    /// 元メッシュの結果は `original` を使い回し、変換後のメッシュだけ実行する
    pub fn invariance_from_runs(
        &self,
        original: &StandardRuns,
        vertices: &[Vertex],
        transform: &RigidTransform,
    ) -> Result<InvarianceReport> {
        let moved = transform.apply(vertices);
        let transformed = self.run_standard(&moved)?;
        Ok(InvarianceReport {
            unit_sphere_uniform_original: original.unit_sphere.mse(),
            unit_sphere_uniform_transformed: transformed.unit_sphere.mse(),
            unit_sphere_adaptive_original: original.adaptive.mse(),
            unit_sphere_adaptive_transformed: transformed.adaptive.mse(),
            min_max_original: original.min_max.mse(),
            min_max_transformed: transformed.min_max.mse(),
        })
    }
}
