use nalgebra::Vector3;

use crate::pose::{
    Pose, POSE_PARAMS, WORLD_POSITION, WORLD_X_DIRECTION, WORLD_Y_DIRECTION, WORLD_Z_DIRECTION,
};
use crate::rml::{Beamline, Group, Node, Object, ParamValue};

#[derive(thiserror::Error, Debug)]
pub enum RewriteError {
    #[error("element `{0}` vanished from the beamline before removal")]
    ObjectVanished(String),
}

fn vec3_value(v: &Vector3<f64>) -> ParamValue {
    ParamValue::Vec3([v.x.to_string(), v.y.to_string(), v.z.to_string()])
}

fn set_vector(object: &mut Object, id: &str, v: &Vector3<f64>) {
    if let Some(param) = object.param_mut(id) {
        param.value = vec3_value(v);
    }
}

/// One clone of the template, renamed by index with its pose overwritten
fn clone_with_pose(template: &Object, index: usize, pose: &Pose) -> Object {
    let mut object = template.clone();
    object.name = format!("{} {}", template.name, index + 1);
    set_vector(&mut object, WORLD_POSITION, &pose.position);
    set_vector(&mut object, WORLD_X_DIRECTION, &pose.frame.x);
    set_vector(&mut object, WORLD_Y_DIRECTION, &pose.frame.y);
    set_vector(&mut object, WORLD_Z_DIRECTION, &pose.frame.z);
    object
}

/// Builds the array group: the template's own pose parameters followed by
/// one renamed clone per pose, in pose order
pub fn build_group(poses: &[Pose], template: &Object) -> Group {
    Group {
        params: POSE_PARAMS
            .into_iter()
            .filter_map(|id| template.param(id).cloned())
            .collect(),
        objects: poses
            .iter()
            .enumerate()
            .map(|(index, pose)| clone_with_pose(template, index, pose))
            .collect(),
    }
}

/// Inserts `group` right after the beamline's first node (the light source)
/// and removes the original element
pub fn replace_object(
    beamline: &mut Beamline,
    original: &str,
    group: Group,
) -> Result<(), RewriteError> {
    let at = beamline.nodes.len().min(1);
    beamline.nodes.insert(at, Node::Group(group));
    let index = beamline
        .nodes
        .iter()
        .position(|node| matches!(node, Node::Object(object) if object.name == original))
        .ok_or_else(|| RewriteError::ObjectVanished(original.to_owned()))?;
    beamline.nodes.remove(index);
    Ok(())
}
