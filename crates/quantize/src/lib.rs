use meshloss_normalize::Vertex;
use serde::Serialize;
use thiserror::Error;

/// 量子化コード (軸ごとに 0..=resolution-1)
pub type QuantizedCode = [u32; 3];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuantizeError {
    #[error("no data: vertex set is empty")]
    Empty,
    #[error("resolution must be at least 2, got {0}")]
    InvalidResolution(u32),
    #[error("shape mismatch: expected {expected} resolutions, found {found}")]
    ShapeMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, QuantizeError>;

/// グリッド解像度: 全頂点共通か、頂点ごとか
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Resolution {
    Uniform(u32),
    PerVertex(Vec<u32>),
}

#[derive(Clone, Debug, Serialize)]
pub struct QuantizedPositions {
    pub codes: Vec<QuantizedCode>,
    pub resolution: Resolution,
}

impl Resolution {
    /// 頂点 i の解像度。validate 済みであること
    #[inline]
    fn for_vertex(&self, i: usize) -> u32 {
        match self {
            Resolution::Uniform(r) => *r,
            Resolution::PerVertex(rs) => rs[i],
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, Resolution::PerVertex(_))
    }

    /// 頂点数との整合と下限 2 をチェック
    pub fn validate(&self, vertex_count: usize) -> Result<()> {
        match self {
            Resolution::Uniform(r) => {
                if *r < 2 {
                    return Err(QuantizeError::InvalidResolution(*r));
                }
            }
            Resolution::PerVertex(rs) => {
                if rs.len() != vertex_count {
                    return Err(QuantizeError::ShapeMismatch { expected: vertex_count, found: rs.len() });
                }
                if let Some(&r) = rs.iter().find(|&&r| r < 2) {
                    return Err(QuantizeError::InvalidResolution(r));
                }
            }
        }
        Ok(())
    }
}

/// floor(x * (r - 1))。四捨五入ではなく切り捨て。r >= 2 は呼び出し側で検証済み
#[inline]
fn quantize_value(x: f64, resolution: u32) -> u32 {
    let steps = (resolution - 1) as f64;
    let t = (x * steps).clamp(0.0, steps);
    t.floor() as u32
}

/// バケットの下端を返す
#[inline]
fn dequantize_value(code: u32, resolution: u32) -> f64 {
    code as f64 / (resolution - 1) as f64
}

/// [0,1]^3 の座標を量子化
pub fn quantize_positions(positions: &[Vertex], resolution: &Resolution) -> Result<QuantizedPositions> {
    if positions.is_empty() {
        return Err(QuantizeError::Empty);
    }
    resolution.validate(positions.len())?;

    let mut codes = Vec::with_capacity(positions.len());
    for (i, p) in positions.iter().enumerate() {
        let r = resolution.for_vertex(i);
        codes.push([quantize_value(p[0], r), quantize_value(p[1], r), quantize_value(p[2], r)]);
    }
    Ok(QuantizedPositions { codes, resolution: resolution.clone() })
}

/// 復号。結果は [0,1]^3
pub fn dequantize_positions(q: &QuantizedPositions) -> Result<Vec<Vertex>> {
    if q.codes.is_empty() {
        return Err(QuantizeError::Empty);
    }
    q.resolution.validate(q.codes.len())?;
    Ok(q.codes
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let r = q.resolution.for_vertex(i);
            [dequantize_value(c[0], r), dequantize_value(c[1], r), dequantize_value(c[2], r)]
        })
        .collect())
}
