use meshloss_density::DensityParams;
use serde::{Deserialize, Serialize};

use crate::{PipelineError, Result};

/// パイプライン設定
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 一様量子化および疎な頂点の解像度
    pub base_resolution: u32,
    /// 密な頂点の解像度
    pub dense_resolution: u32,
    /// 密度推定の近傍半径 (単位立方体内)
    pub density_radius: f64,
    /// 密度しきい値の分位点
    pub density_percentile: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_resolution: 1024,
            dense_resolution: 2048,
            density_radius: 0.05,
            density_percentile: 75.0,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.density_params().validate()?;
        if self.dense_resolution < self.base_resolution {
            return Err(PipelineError::InvalidConfig(format!(
                "dense resolution {} is below base resolution {}",
                self.dense_resolution, self.base_resolution
            )));
        }
        Ok(())
    }

    pub fn density_params(&self) -> DensityParams {
        DensityParams {
            radius: self.density_radius,
            percentile: self.density_percentile,
            base_resolution: self.base_resolution,
            dense_resolution: self.dense_resolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshloss_density::DensityError;

    #[test]
    fn defaults() {
        let c = PipelineConfig::default();
        assert_eq!(c.base_resolution, 1024);
        assert_eq!(c.dense_resolution, 2048);
        assert_eq!(c.density_radius, 0.05);
        assert_eq!(c.density_percentile, 75.0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_resolutions() {
        let c = PipelineConfig { base_resolution: 4096, ..PipelineConfig::default() };
        assert!(matches!(c.validate(), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_bad_density_params() {
        let c = PipelineConfig { density_percentile: -1.0, ..PipelineConfig::default() };
        assert!(matches!(
            c.validate(),
            Err(PipelineError::Density(DensityError::InvalidPercentile(_)))
        ));
    }
}
