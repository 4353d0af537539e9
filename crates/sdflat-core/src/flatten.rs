//! Flattening the nested model tree into a single-level kinematic tree.
//!
//! Every link and joint gets a `::`-qualified name and an origin relative to
//! its tree parent instead of the world frame.

use crate::error::{Result, SdfError};
use crate::model::{qualify, Axis, JointId, JointType, LinkId, ModelId, ModelTree};
use crate::pose::Transform;

/// A link of the flattened tree
#[derive(Debug, Clone, PartialEq)]
pub struct FlatLink {
    pub name: String,
    pub origin: Transform,
}

/// A joint of the flattened tree
#[derive(Debug, Clone, PartialEq)]
pub struct FlatJoint {
    pub name: String,
    pub joint_type: JointType,
    /// Flat name of the parent link
    pub parent: String,
    /// Flat name of the child link
    pub child: String,
    pub origin: Transform,
    pub axis: Axis,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlatElement {
    Link(FlatLink),
    Joint(FlatJoint),
}

/// Flattened tree in emission order
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTree {
    /// Name of the top-level model
    pub name: String,
    pub elements: Vec<FlatElement>,
}

impl FlatTree {
    pub fn links(&self) -> impl Iterator<Item = &FlatLink> {
        self.elements.iter().filter_map(|e| match e {
            FlatElement::Link(l) => Some(l),
            FlatElement::Joint(_) => None,
        })
    }

    pub fn joints(&self) -> impl Iterator<Item = &FlatJoint> {
        self.elements.iter().filter_map(|e| match e {
            FlatElement::Joint(j) => Some(j),
            FlatElement::Link(_) => None,
        })
    }

    pub fn link(&self, name: &str) -> Option<&FlatLink> {
        self.links().find(|l| l.name == name)
    }

    pub fn joint(&self, name: &str) -> Option<&FlatJoint> {
        self.joints().find(|j| j.name == name)
    }
}

impl ModelTree {
    /// Emit the flattened tree. Requires [`ModelTree::build_tree`] and
    /// [`ModelTree::calculate_absolute_pose`] to have run.
    pub fn flatten(&self) -> Result<FlatTree> {
        let mut elements = Vec::new();
        self.flatten_model(self.root(), "", &mut elements)?;
        Ok(FlatTree {
            name: self.name().to_string(),
            elements,
        })
    }

    fn flatten_model(&self, model: ModelId, prefix: &str, out: &mut Vec<FlatElement>) -> Result<()> {
        let m = self.model(model);
        let full_prefix = qualify(prefix, &m.name);

        for &jid in m.joints() {
            let joint = self.joint(jid);
            out.push(FlatElement::Joint(FlatJoint {
                name: qualify(&full_prefix, &joint.name),
                joint_type: joint.emitted_type(),
                parent: qualify(&full_prefix, &joint.parent),
                child: qualify(&full_prefix, &joint.child),
                origin: self.joint_origin(jid)?,
                axis: joint.axis.clone(),
            }));
        }

        for &lid in m.links() {
            out.push(FlatElement::Link(FlatLink {
                name: qualify(&full_prefix, &self.link(lid).name),
                origin: self.link_origin(lid)?,
            }));
        }

        for &sub in m.submodels() {
            self.flatten_model(sub, &full_prefix, out)?;
        }
        Ok(())
    }

    /// Origin of a link relative to its parent joint.
    ///
    /// The root link is placed at its world pose. A link whose parent joint
    /// lives in another model instance (the joint crosses an include) is
    /// placed at identity.
    pub fn link_origin(&self, id: LinkId) -> Result<Transform> {
        let link = self.link(id);
        let link_world = self.link_world(id)?;
        match link.tree_parent_joint() {
            Some(jid) if self.joint(jid).model() == link.model() => {
                Ok(self.joint_world(jid)?.inverse() * link_world)
            }
            Some(_) => Ok(Transform::identity()),
            None => Ok(*link_world),
        }
    }

    /// Origin of a joint relative to its parent link.
    ///
    /// When the parent link belongs to another model instance the joint is
    /// placed at the child link instead of at its own pose. A joint whose
    /// parent link did not resolve keeps its world pose.
    pub fn joint_origin(&self, id: JointId) -> Result<Transform> {
        let joint = self.joint(id);
        let joint_world = self.joint_world(id)?;
        let Some(parent) = joint.tree_parent_link() else {
            return Ok(*joint_world);
        };
        let parent_inv = self.link_world(parent)?.inverse();

        if self.link(parent).model() == joint.model() {
            return Ok(parent_inv * joint_world);
        }
        match joint.tree_child_link() {
            Some(child) => Ok(parent_inv * self.link_world(child)?),
            None => Ok(parent_inv * joint_world),
        }
    }

    fn link_world(&self, id: LinkId) -> Result<&Transform> {
        self.link(id)
            .pose_world()
            .ok_or_else(|| SdfError::PoseNotComputed {
                entity: self.link_flat_name(id),
            })
    }

    fn joint_world(&self, id: JointId) -> Result<&Transform> {
        self.joint(id)
            .pose_world()
            .ok_or_else(|| SdfError::PoseNotComputed {
                entity: self.joint_flat_name(id),
            })
    }
}
