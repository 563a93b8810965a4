use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use rzp_array::{synthesize_array, Beamline, Error};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "rzp-array",
    about = "Reflection zone-plate array synthesis for RML beamline files"
)]
struct Opt {
    /// Path to the RML beamline description
    file: PathBuf,
    /// Name of the zone-plate object to clone
    #[structopt(short, long, default_value = "Reflection Zoneplate")]
    element: String,
    /// Number of zone-plates in the array
    #[structopt(short = "n", long)]
    count: usize,
    /// Angular increment between neighboring zone-plates [rad]
    #[structopt(short, long)]
    gamma: f64,
    /// Shared source origin override [mm]
    #[structopt(long, number_of_values = 3, allow_hyphen_values = true)]
    source: Option<Vec<f64>>,
}

/// `beamline.rml` with N=20 becomes `beamline_rzp20.rml`
fn output_path(input: &Path, count: usize) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("beamline");
    input.with_file_name(format!("{stem}_rzp{count}.rml"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let beamline = Beamline::load(&opt.file)?;
    let source = opt
        .source
        .as_ref()
        .map(|s| Vector3::new(s[0], s[1], s[2]));
    let beamline = match synthesize_array(beamline, &opt.element, opt.count, opt.gamma, source) {
        Ok(beamline) => beamline,
        Err(Error::Array(err)) => {
            log::warn!("{}; nothing to do", err);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    beamline.save(output_path(&opt.file, opt.count))?;
    Ok(())
}
