use nalgebra::Vector3;

use crate::geometry::Frame;
use crate::rml::{Beamline, Object, ParamValue};

/// Parameter ids of the four world vectors defining an element placement
pub const WORLD_POSITION: &str = "worldPosition";
pub const WORLD_X_DIRECTION: &str = "worldXdirection";
pub const WORLD_Y_DIRECTION: &str = "worldYdirection";
pub const WORLD_Z_DIRECTION: &str = "worldZdirection";
pub const POSE_PARAMS: [&str; 4] = [
    WORLD_POSITION,
    WORLD_X_DIRECTION,
    WORLD_Y_DIRECTION,
    WORLD_Z_DIRECTION,
];

#[derive(thiserror::Error, Debug)]
pub enum PoseError {
    #[error("no element named `{0}` in the beamline")]
    MissingElement(String),
    #[error("element `{element}` has no `{param}` vector")]
    MissingParam { element: String, param: String },
    #[error("`{param}` of element `{element}`: `{component}` is not a number")]
    Malformed {
        element: String,
        param: String,
        component: String,
    },
}

/// Placement of one optical element in the shared world coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub frame: Frame,
}

/// Reads the position and the three world direction vectors of the named
/// element. Does not mutate the document.
pub fn extract_pose(beamline: &Beamline, element_name: &str) -> Result<Pose, PoseError> {
    let object = beamline
        .object(element_name)
        .ok_or_else(|| PoseError::MissingElement(element_name.to_owned()))?;
    Ok(Pose {
        position: world_vector(object, WORLD_POSITION)?,
        frame: Frame {
            x: world_vector(object, WORLD_X_DIRECTION)?,
            y: world_vector(object, WORLD_Y_DIRECTION)?,
            z: world_vector(object, WORLD_Z_DIRECTION)?,
        },
    })
}

fn world_vector(object: &Object, id: &str) -> Result<Vector3<f64>, PoseError> {
    let missing = || PoseError::MissingParam {
        element: object.name.clone(),
        param: id.to_owned(),
    };
    match &object.param(id).ok_or_else(missing)?.value {
        ParamValue::Vec3(components) => {
            let mut parsed = [0f64; 3];
            for (slot, component) in parsed.iter_mut().zip(components) {
                *slot = component
                    .trim()
                    .parse()
                    .map_err(|_| PoseError::Malformed {
                        element: object.name.clone(),
                        param: id.to_owned(),
                        component: component.clone(),
                    })?;
            }
            Ok(Vector3::from_column_slice(&parsed))
        }
        // a scalar or nested value where a vector belongs
        _ => Err(missing()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beamline(pose_params: &str) -> Beamline {
        Beamline::parse(&format!(
            r#"<lab><version>1.12</version><beamline>
                 <object name="Point Source" type="Point Source">
                   <param id="numberRays" enabled="T">200</param>
                 </object>
                 <object name="Reflection Zoneplate" type="Reflection Zoneplate">
                   <param id="totalWidth" enabled="T">0.183</param>
                   {pose_params}
                 </object>
               </beamline></lab>"#
        ))
        .unwrap()
    }

    fn vec3(id: &str, x: &str, y: &str, z: &str) -> String {
        format!(r#"<param id="{id}" enabled="F"><x>{x}</x><y>{y}</y><z>{z}</z></param>"#)
    }

    fn full_pose_params() -> String {
        [
            vec3(WORLD_POSITION, "0", "0", "90"),
            vec3(WORLD_X_DIRECTION, "1", "0", "0"),
            vec3(WORLD_Y_DIRECTION, "0", "0.999263", "-0.0383878"),
            vec3(WORLD_Z_DIRECTION, "0", "0.0383878", "0.999263"),
        ]
        .join("")
    }

    #[test]
    fn extracts_position_and_frame() {
        let beamline = beamline(&full_pose_params());
        let pose = extract_pose(&beamline, "Reflection Zoneplate").unwrap();
        assert_eq!(pose.position, Vector3::new(0., 0., 90.));
        assert_eq!(pose.frame.x, Vector3::new(1., 0., 0.));
        assert_eq!(pose.frame.y, Vector3::new(0., 0.999263, -0.0383878));
        assert_eq!(pose.frame.z, Vector3::new(0., 0.0383878, 0.999263));
    }

    #[test]
    fn unknown_element_is_reported_by_name() {
        let beamline = beamline(&full_pose_params());
        match extract_pose(&beamline, "Plane Mirror") {
            Err(PoseError::MissingElement(name)) => assert_eq!(name, "Plane Mirror"),
            other => panic!("expected a missing element error, got {other:?}"),
        }
    }

    #[test]
    fn absent_direction_is_reported_by_id() {
        let params = [
            vec3(WORLD_POSITION, "0", "0", "90"),
            vec3(WORLD_X_DIRECTION, "1", "0", "0"),
            vec3(WORLD_Z_DIRECTION, "0", "0", "1"),
        ]
        .join("");
        match extract_pose(&beamline(&params), "Reflection Zoneplate") {
            Err(PoseError::MissingParam { element, param }) => {
                assert_eq!(element, "Reflection Zoneplate");
                assert_eq!(param, WORLD_Y_DIRECTION);
            }
            other => panic!("expected a missing param error, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_component_is_reported() {
        let params = [
            vec3(WORLD_POSITION, "0", "zero", "90"),
            vec3(WORLD_X_DIRECTION, "1", "0", "0"),
            vec3(WORLD_Y_DIRECTION, "0", "1", "0"),
            vec3(WORLD_Z_DIRECTION, "0", "0", "1"),
        ]
        .join("");
        match extract_pose(&beamline(&params), "Reflection Zoneplate") {
            Err(PoseError::Malformed {
                param, component, ..
            }) => {
                assert_eq!(param, WORLD_POSITION);
                assert_eq!(component, "zero");
            }
            other => panic!("expected a malformed component error, got {other:?}"),
        }
    }

    #[test]
    fn scalar_where_a_vector_belongs_is_incomplete() {
        let params = [
            r#"<param id="worldPosition" enabled="F">90</param>"#.to_owned(),
            vec3(WORLD_X_DIRECTION, "1", "0", "0"),
            vec3(WORLD_Y_DIRECTION, "0", "1", "0"),
            vec3(WORLD_Z_DIRECTION, "0", "0", "1"),
        ]
        .join("");
        assert!(matches!(
            extract_pose(&beamline(&params), "Reflection Zoneplate"),
            Err(PoseError::MissingParam { .. })
        ));
    }
}
