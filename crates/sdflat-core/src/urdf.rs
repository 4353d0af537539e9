//! URDF serialization of a flattened tree

use quick_xml::se::Serializer;
use serde::Serialize;
use std::path::Path;

use crate::error::{Result, SdfError};
use crate::flatten::{FlatElement, FlatJoint, FlatLink, FlatTree};
use crate::model::Axis;
use crate::pose::{Pose, Transform};

/// Decimal places kept in emitted origins
pub const DEFAULT_PRECISION: u32 = 5;

/// Formatting options for the URDF writer
#[derive(Debug, Clone, Copy)]
pub struct UrdfOptions {
    pub precision: u32,
    /// Spaces per nesting level, 0 for a single line
    pub indent: usize,
}

impl Default for UrdfOptions {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            indent: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UrdfOrigin {
    #[serde(rename = "@xyz")]
    pub xyz: String,
    #[serde(rename = "@rpy")]
    pub rpy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrdfLinkRef {
    #[serde(rename = "@link")]
    pub link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrdfAxis {
    #[serde(rename = "@xyz")]
    pub xyz: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrdfLimit {
    #[serde(rename = "@lower")]
    pub lower: f64,
    #[serde(rename = "@upper")]
    pub upper: f64,
    #[serde(rename = "@effort")]
    pub effort: f64,
    #[serde(rename = "@velocity")]
    pub velocity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrdfLink {
    #[serde(rename = "@name")]
    pub name: String,
    pub origin: UrdfOrigin,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrdfJoint {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@type")]
    pub joint_type: String,
    pub parent: UrdfLinkRef,
    pub child: UrdfLinkRef,
    pub origin: UrdfOrigin,
    pub axis: UrdfAxis,
    pub limit: UrdfLimit,
}

#[derive(Debug, Clone, Serialize)]
pub enum UrdfElement {
    #[serde(rename = "link")]
    Link(UrdfLink),
    #[serde(rename = "joint")]
    Joint(UrdfJoint),
}

/// Root `<robot>` document
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "robot")]
pub struct UrdfRobot {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "$value")]
    pub elements: Vec<UrdfElement>,
    /// Options the document was built with; also used when writing it
    #[serde(skip)]
    pub options: UrdfOptions,
}

impl UrdfRobot {
    /// Build the URDF document for a flattened tree, rounding origins to
    /// `options.precision` places
    pub fn from_flat(tree: &FlatTree, options: &UrdfOptions) -> Self {
        let precision = options.precision;
        let elements = tree
            .elements
            .iter()
            .map(|element| match element {
                FlatElement::Link(link) => UrdfElement::Link(convert_link(link, precision)),
                FlatElement::Joint(joint) => UrdfElement::Joint(convert_joint(joint, precision)),
            })
            .collect();
        Self {
            name: tree.name.clone(),
            elements,
            options: *options,
        }
    }

    /// Serialize to XML string
    pub fn to_xml(&self) -> Result<String> {
        let mut body = String::new();
        let mut serializer = Serializer::with_root(&mut body, Some("robot"))
            .map_err(|e| SdfError::Serialize(e.to_string()))?;
        if self.options.indent > 0 {
            serializer.indent(' ', self.options.indent);
        }
        self.serialize(serializer)
            .map_err(|e| SdfError::Serialize(e.to_string()))?;
        Ok(format!("<?xml version='1.0'?>\n{}\n", body))
    }

    /// Write to file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let xml = self.to_xml()?;
        std::fs::write(path, xml).map_err(|source| SdfError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn convert_link(link: &FlatLink, precision: u32) -> UrdfLink {
    UrdfLink {
        name: link.name.clone(),
        origin: origin(&link.origin, precision),
    }
}

fn convert_joint(joint: &FlatJoint, precision: u32) -> UrdfJoint {
    UrdfJoint {
        name: joint.name.clone(),
        joint_type: joint.joint_type.to_string(),
        parent: UrdfLinkRef {
            link: joint.parent.clone(),
        },
        child: UrdfLinkRef {
            link: joint.child.clone(),
        },
        origin: origin(&joint.origin, precision),
        axis: UrdfAxis {
            xyz: format_values(joint.axis.xyz.as_slice(), None),
        },
        limit: limit(&joint.axis),
    }
}

fn limit(axis: &Axis) -> UrdfLimit {
    UrdfLimit {
        lower: axis.lower_limit,
        upper: axis.upper_limit,
        effort: axis.effort_limit,
        velocity: axis.velocity_limit,
    }
}

fn origin(transform: &Transform, precision: u32) -> UrdfOrigin {
    let pose = Pose::from_transform(transform);
    UrdfOrigin {
        xyz: format_values(&pose.xyz(), Some(precision)),
        rpy: format_values(&pose.rpy(), Some(precision)),
    }
}

/// Round to `precision + 1` places, then truncate to `precision` places.
/// Negative zero comes out as zero.
pub fn rounded(value: f64, precision: u32) -> f64 {
    let fine = 10f64.powi(precision as i32 + 1);
    let coarse = 10f64.powi(precision as i32);
    let value = (value * fine).round() / fine;
    (value * coarse).trunc() / coarse + 0.0
}

fn format_values(values: &[f64], precision: Option<u32>) -> String {
    values
        .iter()
        .map(|&v| match precision {
            Some(p) => rounded(v, p),
            None => v + 0.0,
        })
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
