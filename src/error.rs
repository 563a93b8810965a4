use crate::{array::ArrayError, pose::PoseError, rewrite::RewriteError, rml::RmlError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `rml` module")]
    Rml(#[from] RmlError),
    #[error("Error in the `pose` module")]
    Pose(#[from] PoseError),
    #[error("Error in the `array` module")]
    Array(#[from] ArrayError),
    #[error("Error in the `rewrite` module")]
    Rewrite(#[from] RewriteError),
}
