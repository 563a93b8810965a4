mod array;
mod error;
mod geometry;
mod pose;
mod rewrite;
mod rml;

pub use array::{ArrayError, ArraySpec};
pub use error::Error;
pub use geometry::{project_onto_plane, rotate_about_y, Frame};
pub use pose::{extract_pose, Pose, PoseError};
pub use rewrite::{build_group, replace_object, RewriteError};
pub use rml::{Beamline, Group, Node, Object, Param, ParamValue, RmlError};

use nalgebra::Vector3;

/// Full transform: replaces the element named `element_name` by a group of
/// `count` clones placed `gamma` radians apart around the shared source
/// (world origin unless overridden). The group is built in memory before the
/// document is touched, so a failure leaves no half-rewritten document.
pub fn synthesize_array(
    mut beamline: Beamline,
    element_name: &str,
    count: usize,
    gamma: f64,
    source: Option<Vector3<f64>>,
) -> Result<Beamline, Error> {
    let template = beamline
        .object(element_name)
        .cloned()
        .ok_or_else(|| PoseError::MissingElement(element_name.to_owned()))?;
    let reference = extract_pose(&beamline, element_name)?;
    let mut spec = ArraySpec::new(reference, count, gamma)?;
    if let Some(source) = source {
        spec = spec.source_origin(source);
    }
    let pivot = spec.pivot();
    log::info!(
        "Placing {} x `{}` about pivot [{:.4},{:.4},{:.4}], {:.4} rad apart",
        count,
        element_name,
        pivot.x,
        pivot.y,
        pivot.z,
        gamma
    );
    let group = build_group(&spec.synthesize(), &template);
    replace_object(&mut beamline, element_name, group)?;
    Ok(beamline)
}
