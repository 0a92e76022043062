use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Deserialize;
use virial_cluster::{f_bond, hard_sphere, Bond, Centre, Cluster, HardSphere, ModelSpec, SiteSite};
use virial_mcmc::{default_file_name, run_with_extras, OverlapConfig};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML run file.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for the report and persisted preference.
    #[arg(long)]
    pub out: PathBuf,
}

/// YAML layout accepted by `virial-sim run`.
#[derive(Debug, Deserialize)]
struct RunFile {
    /// Hard-sphere diameter of the reference system.
    #[serde(default = "default_reference_sigma")]
    reference_sigma: f64,
    /// Target model; applied site-site when molecules have several sites.
    model: ModelSpec,
    /// Further models observed alongside the target.
    #[serde(default)]
    extra_models: Vec<ModelSpec>,
    /// Sampler settings.
    overlap: OverlapConfig,
}

fn default_reference_sigma() -> f64 {
    1.0
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let file = load_run_file(&args.config)?;
    let config = &file.overlap;
    config.validate()?;

    let reference = Cluster::biconnected(
        config.points,
        f_bond(HardSphere {
            sigma: file.reference_sigma,
        }),
    )?;
    let target = Cluster::biconnected(config.points, model_bond(&file.model, config))?;
    let extra_targets = file
        .extra_models
        .iter()
        .map(|model| Cluster::biconnected(config.points, model_bond(model, config)))
        .collect::<Result<Vec<_>, _>>()?;
    let reference_integral = hard_sphere::reference_value(config.points, file.reference_sigma)?;

    let preference_file = config
        .calibration
        .file
        .clone()
        .unwrap_or_else(|| args.out.join(default_file_name(config.points, config.temperature)));
    let report = run_with_extras(
        config,
        &reference,
        &target,
        &extra_targets,
        Some(reference_integral),
        Some(preference_file),
    )?;

    let report_path = args.out.join("report.json");
    fs::write(&report_path, report.to_json()?)?;
    log::info!("report written to {}", report_path.display());
    fs::copy(&args.config, args.out.join("config.yaml")).ok();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "ratio": report.ratio,
            "ratio_error": report.ratio_error,
            "full_value": report.full_value,
            "full_value_error": report.full_value_error,
            "extra_full_values": report
                .extra_targets
                .iter()
                .map(|extra| extra.full_value)
                .collect::<Vec<_>>(),
            "diagnostics": report.diagnostics.len(),
        }))?
    );
    Ok(())
}

fn model_bond(model: &ModelSpec, config: &OverlapConfig) -> Bond {
    if config.molecule.sites > 1 {
        f_bond(SiteSite { site: model.build() })
    } else {
        f_bond(Centre(model.build()))
    }
}

fn load_run_file(path: &Path) -> Result<RunFile, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let file: RunFile = serde_yaml::from_str(&contents)?;
    Ok(file)
}
