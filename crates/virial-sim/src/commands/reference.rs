use std::error::Error;

use clap::Args;
use serde_json::json;
use virial_cluster::hard_sphere;

#[derive(Args, Debug)]
pub struct ReferenceArgs {
    /// Number of points (virial order).
    #[arg(long)]
    pub points: usize,
    /// Hard-sphere diameter.
    #[arg(long, default_value_t = 1.0)]
    pub sigma: f64,
}

pub fn run(args: &ReferenceArgs) -> Result<(), Box<dyn Error>> {
    let value = hard_sphere::reference_value(args.points, args.sigma)?;
    let body = json!({
        "points": args.points,
        "sigma": args.sigma,
        "value": value,
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
