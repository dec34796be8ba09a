use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use meshloss_format::ObjMesh;
use meshloss_metrics::{describe, Histogram, VertexStats};
use meshloss_normalize::Vertex;
use meshloss_pipeline::{
    InvarianceReport, Pipeline, PipelineConfig, PipelineOutput, RigidTransform,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// メッシュ頂点の量子化誤差を評価する
#[derive(Parser, Debug)]
#[command(name = "meshloss", version)]
struct Args {
    /// 入力 OBJ ファイル
    #[arg(required = true)]
    meshes: Vec<PathBuf>,

    /// JSON の設定ファイル
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    base_resolution: Option<u32>,

    #[arg(long)]
    dense_resolution: Option<u32>,

    /// 密度推定の近傍半径
    #[arg(long)]
    radius: Option<f64>,

    /// 密度しきい値の分位点
    #[arg(long)]
    percentile: Option<f64>,

    /// 剛体変換の乱数シード
    #[arg(long)]
    seed: Option<u64>,

    /// 正規化・再構成した OBJ の出力先
    #[arg(long)]
    export_dir: Option<PathBuf>,

    #[arg(long, default_value_t = meshloss_metrics::DEFAULT_HISTOGRAM_BINS)]
    histogram_bins: usize,

    /// 結果を JSON で出力
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct MeshSummary {
    mesh: String,
    stats: VertexStats,
    mse_min_max: f64,
    mse_unit_sphere: f64,
    mse_adaptive: f64,
    per_axis_min_max: [f64; 3],
    per_axis_unit_sphere: [f64; 3],
    dense_vertices: usize,
    base_vertices: usize,
    histogram_min_max: Histogram,
    histogram_unit_sphere: Histogram,
    invariance: InvarianceReport,
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(r) = args.base_resolution { config.base_resolution = r; }
    if let Some(r) = args.dense_resolution { config.dense_resolution = r; }
    if let Some(r) = args.radius { config.density_radius = r; }
    if let Some(p) = args.percentile { config.density_percentile = p; }
    Ok(config)
}

fn export(
    dir: &Path,
    stem: &str,
    mesh: &ObjMesh,
    outputs: &[(&str, &PipelineOutput)],
) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (tag, out) in outputs {
        let codes: Vec<Vertex> = out
            .quantized
            .codes
            .iter()
            .map(|c| [c[0] as f64, c[1] as f64, c[2] as f64])
            .collect();
        let stages = [("norm", &out.normalized), ("quant", &codes), ("recon", &out.reconstructed)];
        for (kind, vertices) in stages {
            let path = dir.join(format!("{}_{}_{}.obj", stem, kind, tag));
            mesh.save(&path, vertices).with_context(|| format!("writing {}", path.display()))?;
        }
    }
    Ok(())
}

fn print_stats(stats: &VertexStats) {
    println!("  vertices: {}", stats.count);
    println!("  min:  {:.3?}", stats.min);
    println!("  max:  {:.3?}", stats.max);
    println!("  mean: {:.3?}", stats.mean);
    println!("  std:  {:.3?}", stats.std);
}

fn fmt_axes(a: &[f64; 3]) -> String {
    format!("[{:.3e}, {:.3e}, {:.3e}]", a[0], a[1], a[2])
}

fn print_invariance(r: &InvarianceReport) {
    println!("  | pipeline           | original         | transformed      |");
    println!("  |--------------------|-----------------:|-----------------:|");
    let rows = [
        ("min-max uniform    ", r.min_max_original, r.min_max_transformed),
        ("unit-sphere uniform", r.unit_sphere_uniform_original, r.unit_sphere_uniform_transformed),
        (
            "unit-sphere adapt. ",
            r.unit_sphere_adaptive_original,
            r.unit_sphere_adaptive_transformed,
        ),
    ];
    for (label, original, transformed) in rows {
        println!("  | {}| {:.10e} | {:.10e} |", label, original, transformed);
    }
    println!("  invariance difference: {:.10e}", r.invariance_difference());
    println!("  adaptive improvement:  {:.2}%", r.adaptive_improvement_percent());
}

fn process(
    path: &Path,
    pipeline: &Pipeline,
    rng: &mut StdRng,
    args: &Args,
) -> Result<Option<MeshSummary>> {
    let mesh = ObjMesh::load(path).with_context(|| format!("loading {}", path.display()))?;
    if mesh.vertices.is_empty() {
        warn!("skipping {}: no vertices", path.display());
        return Ok(None);
    }
    let name = path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    info!("processing {} ({} vertices)", name, mesh.vertices.len());

    let stats = describe(&mesh.vertices)?;
    let runs = pipeline.run_standard(&mesh.vertices)?;
    let transform = RigidTransform::random(rng);
    let invariance = pipeline.invariance_from_runs(&runs, &mesh.vertices, &transform)?;
    let (dense_vertices, base_vertices) = runs
        .adaptive
        .density
        .as_ref()
        .map(|d| (d.dense_count(), d.base_count()))
        .unwrap_or((0, mesh.vertices.len()));

    if let Some(dir) = &args.export_dir {
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let outputs = [
            ("minmax", &runs.min_max),
            ("unitsphere", &runs.unit_sphere),
            ("adaptive", &runs.adaptive),
        ];
        export(dir, &stem, &mesh, &outputs)?;
    }

    if !args.json {
        println!("=== {} ===", name);
        print_stats(&stats);
        for (label, out) in [("min-max:    ", &runs.min_max), ("unit-sphere:", &runs.unit_sphere)] {
            let axes = fmt_axes(&out.report.per_axis_mse);
            println!("  MSE {}  {:.8e}  per axis {}", label, out.mse(), axes);
        }
        println!(
            "  MSE adaptive:     {:.8e}  dense {} | base {}",
            runs.adaptive.mse(),
            dense_vertices,
            base_vertices
        );
        print_invariance(&invariance);
    }

    Ok(Some(MeshSummary {
        mesh: name,
        stats,
        mse_min_max: runs.min_max.mse(),
        mse_unit_sphere: runs.unit_sphere.mse(),
        mse_adaptive: runs.adaptive.mse(),
        per_axis_min_max: runs.min_max.report.per_axis_mse,
        per_axis_unit_sphere: runs.unit_sphere.report.per_axis_mse,
        dense_vertices,
        base_vertices,
        histogram_min_max: runs.min_max.report.histogram(args.histogram_bins),
        histogram_unit_sphere: runs.unit_sphere.report.histogram(args.histogram_bins),
        invariance,
    }))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(&args)?;
    let pipeline = Pipeline::new(config).context("invalid pipeline config")?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut summaries = Vec::new();
    for path in &args.meshes {
        match process(path, &pipeline, &mut rng, &args) {
            Ok(Some(summary)) => summaries.push(summary),
            Ok(None) => {}
            Err(e) => warn!("failed on {}: {:#}", path.display(), e),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        println!("processed {} of {} meshes", summaries.len(), args.meshes.len());
    }
    Ok(())
}
