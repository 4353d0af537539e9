//! Error types for SDF loading, tree reconstruction, and flattening

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while converting an SDF document.
///
/// Everything except [`SdfError::UnsupportedVersion`], [`SdfError::NotSdf`]
/// and [`SdfError::Xml`] may be downgraded to a diagnostic when the caller
/// loads with `allow_partial`.
#[derive(Error, Debug)]
pub enum SdfError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse XML in {path}: {message}")]
    Xml { path: String, message: String },

    #[error("{path} is not an SDF document (root element is <{found}>)")]
    NotSdf { path: String, found: String },

    #[error("Unsupported SDF version {version} in {path} (only 1.4 is supported)")]
    UnsupportedVersion { path: String, version: String },

    #[error("Invalid element in {path}: expected <{expected}>, found <{found}>")]
    MalformedElement {
        path: String,
        expected: &'static str,
        found: String,
    },

    #[error("Missing required element <{element}> in {context}")]
    MissingElement {
        element: &'static str,
        context: String,
    },

    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        attribute: &'static str,
        element: String,
    },

    #[error("Invalid value '{value}' for <{element}>: {message}")]
    InvalidValue {
        element: String,
        value: String,
        message: String,
    },

    #[error("Unknown joint type '{joint_type}' on joint '{joint}'")]
    UnknownJointType { joint: String, joint_type: String },

    #[error("Cannot resolve include '{uri}': {message}")]
    InvalidInclude { uri: String, message: String },

    #[error("Include of {path} recursively includes itself")]
    RecursiveInclude { path: PathBuf },

    #[error("Link '{link}' is the child of both '{first}' and '{second}'")]
    MultipleParentJoints {
        link: String,
        first: String,
        second: String,
    },

    #[error("Joint graph contains a cycle through link '{link}'")]
    JointCycle { link: String },

    #[error("World pose of '{entity}' read before pose propagation")]
    PoseNotComputed { entity: String },

    #[error("No top-level model named '{name}'")]
    ModelNotFound { name: String },

    #[error("Document contains no model")]
    NoModel,

    #[error("Failed to serialize URDF: {0}")]
    Serialize(String),
}

impl SdfError {
    /// Whether this error must abort the whole conversion regardless of
    /// partial tolerance.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SdfError::UnsupportedVersion { .. } | SdfError::NotSdf { .. } | SdfError::Xml { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SdfError>;
