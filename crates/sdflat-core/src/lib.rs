//! sdflat Core - SDF model loading and URDF flattening
//!
//! This crate turns an SDF 1.4 document, with its nested models and
//! `<include>`d model files, into a single flat URDF kinematic tree:
//! - Loading SDF documents and resolving `model://` includes
//! - Scoped `::` name resolution across nested models
//! - Kinematic tree reconstruction (joint endpoints, root link)
//! - World pose propagation and relative origin computation
//! - URDF serialization

pub mod error;
pub mod flatten;
pub mod loader;
pub mod model;
pub mod pose;
mod propagate;
mod scope;
pub mod tree;
pub mod urdf;
mod xml;

pub use error::{Result, SdfError};
pub use flatten::{FlatElement, FlatJoint, FlatLink, FlatTree};
pub use loader::{Diagnostic, LoadOptions, SdfDocument};
pub use model::{Joint, JointId, JointType, Link, LinkId, Model, ModelId, ModelTree};
pub use pose::{Pose, Transform};
pub use tree::{Endpoint, UnresolvedReference};
pub use urdf::{UrdfOptions, UrdfRobot};
