//! SDF document model
//!
//! One [`ModelTree`] owns every model, link, and joint reachable from a
//! top-level `<model>` (nested models and includes included). Entities refer
//! to each other through typed indices into the tree's arenas, so the
//! link/joint and model/parent back-references are plain lookups.

use nalgebra::Vector3;
use std::fmt;
use std::path::PathBuf;

use crate::pose::{self, Transform};

/// Index of a model inside its [`ModelTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub(crate) usize);

/// Index of a link inside its [`ModelTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub(crate) usize);

/// Index of a joint inside its [`ModelTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(pub(crate) usize);

/// Join a scope prefix and a name with `::`
pub fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}::{name}")
    }
}

/// Joint kinds understood in SDF 1.4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointType {
    Revolute,
    Revolute2,
    Prismatic,
    Ball,
    Universal,
    Screw,
    Gearbox,
    Fixed,
}

impl JointType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "revolute" => Some(JointType::Revolute),
            "revolute2" => Some(JointType::Revolute2),
            "prismatic" => Some(JointType::Prismatic),
            "ball" => Some(JointType::Ball),
            "universal" => Some(JointType::Universal),
            "screw" => Some(JointType::Screw),
            "gearbox" => Some(JointType::Gearbox),
            "fixed" => Some(JointType::Fixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JointType::Revolute => "revolute",
            JointType::Revolute2 => "revolute2",
            JointType::Prismatic => "prismatic",
            JointType::Ball => "ball",
            JointType::Universal => "universal",
            JointType::Screw => "screw",
            JointType::Gearbox => "gearbox",
            JointType::Fixed => "fixed",
        }
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Joint axis and its limits
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub xyz: Vector3<f64>,
    pub lower_limit: f64,
    pub upper_limit: f64,
    pub effort_limit: f64,
    pub velocity_limit: f64,
}

impl Default for Axis {
    fn default() -> Self {
        Self {
            xyz: Vector3::zeros(),
            lower_limit: 0.0,
            upper_limit: 0.0,
            effort_limit: 0.0,
            velocity_limit: 0.0,
        }
    }
}

/// Symmetric inertia tensor components
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Inertia {
    pub ixx: f64,
    pub ixy: f64,
    pub ixz: f64,
    pub iyy: f64,
    pub iyz: f64,
    pub izz: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inertial {
    pub pose: Transform,
    pub mass: f64,
    pub inertia: Inertia,
}

impl Default for Inertial {
    fn default() -> Self {
        Self {
            pose: Transform::identity(),
            mass: 0.0,
            inertia: Inertia::default(),
        }
    }
}

/// Shape of a collision or visual element
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Geometry {
    Box {
        size: Vector3<f64>,
    },
    Cylinder {
        radius: f64,
        length: f64,
    },
    Sphere {
        radius: f64,
    },
    Mesh {
        uri: String,
        scale: Vector3<f64>,
    },
    #[default]
    None,
}

/// A collision or visual element of a link
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPart {
    pub name: String,
    pub pose: Transform,
    pub geometry: Geometry,
}

impl Default for LinkPart {
    fn default() -> Self {
        Self {
            name: String::new(),
            pose: Transform::identity(),
            geometry: Geometry::None,
        }
    }
}

/// A `<model>`, either authored inline or loaded through `<include>`
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    /// Pose relative to the parent model (include offset already applied)
    pub pose: Transform,
    /// File the model was loaded from, for included models
    pub source: Option<PathBuf>,
    pub(crate) parent: Option<ModelId>,
    pub(crate) links: Vec<LinkId>,
    pub(crate) joints: Vec<JointId>,
    pub(crate) submodels: Vec<ModelId>,
    pub(crate) root_link: Option<LinkId>,
    pub(crate) pose_world: Option<Transform>,
}

impl Model {
    pub fn parent(&self) -> Option<ModelId> {
        self.parent
    }

    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    pub fn joints(&self) -> &[JointId] {
        &self.joints
    }

    pub fn submodels(&self) -> &[ModelId] {
        &self.submodels
    }

    /// Root link of the kinematic tree; only set on the top-level model
    pub fn root_link(&self) -> Option<LinkId> {
        self.root_link
    }

    pub fn pose_world(&self) -> Option<&Transform> {
        self.pose_world.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct Link {
    pub name: String,
    pub pose: Transform,
    pub inertial: Inertial,
    pub collision: LinkPart,
    pub visual: LinkPart,
    pub(crate) model: ModelId,
    pub(crate) pose_world: Option<Transform>,
    pub(crate) tree_parent_joint: Option<JointId>,
    pub(crate) tree_child_joints: Vec<JointId>,
}

impl Link {
    pub fn new(name: impl Into<String>, pose: Transform) -> Self {
        Self {
            name: name.into(),
            pose,
            inertial: Inertial::default(),
            collision: LinkPart::default(),
            visual: LinkPart::default(),
            model: ModelId(0),
            pose_world: None,
            tree_parent_joint: None,
            tree_child_joints: Vec::new(),
        }
    }

    /// Model that owns this link
    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn pose_world(&self) -> Option<&Transform> {
        self.pose_world.as_ref()
    }

    pub fn tree_parent_joint(&self) -> Option<JointId> {
        self.tree_parent_joint
    }

    pub fn tree_child_joints(&self) -> &[JointId] {
        &self.tree_child_joints
    }
}

#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub joint_type: JointType,
    pub pose: Transform,
    /// Parent link reference as authored, relative to the owning model
    pub parent: String,
    /// Child link reference as authored, relative to the owning model
    pub child: String,
    pub axis: Axis,
    pub(crate) model: ModelId,
    pub(crate) pose_world: Option<Transform>,
    pub(crate) tree_parent_link: Option<LinkId>,
    pub(crate) tree_child_link: Option<LinkId>,
}

impl Joint {
    pub fn new(
        name: impl Into<String>,
        joint_type: JointType,
        parent: impl Into<String>,
        child: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            joint_type,
            pose: Transform::identity(),
            parent: parent.into(),
            child: child.into(),
            axis: Axis::default(),
            model: ModelId(0),
            pose_world: None,
            tree_parent_link: None,
            tree_child_link: None,
        }
    }

    /// Model that owns this joint
    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn pose_world(&self) -> Option<&Transform> {
        self.pose_world.as_ref()
    }

    pub fn tree_parent_link(&self) -> Option<LinkId> {
        self.tree_parent_link
    }

    pub fn tree_child_link(&self) -> Option<LinkId> {
        self.tree_child_link
    }

    /// Joint type as it appears in the flattened output.
    ///
    /// A revolute joint whose limits are both zero cannot move and is
    /// emitted as fixed.
    pub fn emitted_type(&self) -> JointType {
        if self.joint_type == JointType::Revolute
            && self.axis.lower_limit == 0.0
            && self.axis.upper_limit == 0.0
        {
            JointType::Fixed
        } else {
            self.joint_type
        }
    }
}

/// Arena sizes at some point during loading
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    models: usize,
    links: usize,
    joints: usize,
}

/// Arena holding one top-level model and everything nested in it
#[derive(Debug, Clone)]
pub struct ModelTree {
    models: Vec<Model>,
    links: Vec<Link>,
    joints: Vec<Joint>,
}

impl ModelTree {
    /// Create a tree whose top-level model has the given name and pose
    pub fn new(name: impl Into<String>, pose: Transform) -> Self {
        let mut tree = Self {
            models: Vec::new(),
            links: Vec::new(),
            joints: Vec::new(),
        };
        tree.push_model(None, name.into(), pose, None);
        tree
    }

    /// The top-level model
    pub fn root(&self) -> ModelId {
        ModelId(0)
    }

    /// Add an empty submodel under `parent`
    pub fn add_submodel(
        &mut self,
        parent: ModelId,
        name: impl Into<String>,
        pose: Transform,
        source: Option<PathBuf>,
    ) -> ModelId {
        let id = self.push_model(Some(parent), name.into(), pose, source);
        self.models[parent.0].submodels.push(id);
        id
    }

    fn push_model(
        &mut self,
        parent: Option<ModelId>,
        name: String,
        pose: Transform,
        source: Option<PathBuf>,
    ) -> ModelId {
        let id = ModelId(self.models.len());
        self.models.push(Model {
            name,
            pose,
            source,
            parent,
            links: Vec::new(),
            joints: Vec::new(),
            submodels: Vec::new(),
            root_link: None,
            pose_world: None,
        });
        id
    }

    /// Record the arena sizes so a failed load can be undone
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            models: self.models.len(),
            links: self.links.len(),
            joints: self.joints.len(),
        }
    }

    /// Drop every entity added since `checkpoint`
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.models.truncate(checkpoint.models.max(1));
        self.links.truncate(checkpoint.links);
        self.joints.truncate(checkpoint.joints);
        for model in &mut self.models {
            model.submodels.retain(|id| id.0 < checkpoint.models);
            model.links.retain(|id| id.0 < checkpoint.links);
            model.joints.retain(|id| id.0 < checkpoint.joints);
        }
    }

    pub fn add_link(&mut self, model: ModelId, mut link: Link) -> LinkId {
        let id = LinkId(self.links.len());
        link.model = model;
        self.links.push(link);
        self.models[model.0].links.push(id);
        id
    }

    pub fn add_joint(&mut self, model: ModelId, mut joint: Joint) -> JointId {
        let id = JointId(self.joints.len());
        joint.model = model;
        self.joints.push(joint);
        self.models[model.0].joints.push(id);
        id
    }

    pub fn model(&self, id: ModelId) -> &Model {
        &self.models[id.0]
    }

    pub fn model_mut(&mut self, id: ModelId) -> &mut Model {
        &mut self.models[id.0]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn joint(&self, id: JointId) -> &Joint {
        &self.joints[id.0]
    }

    pub(crate) fn link_mut(&mut self, id: LinkId) -> &mut Link {
        &mut self.links[id.0]
    }

    pub(crate) fn joint_mut(&mut self, id: JointId) -> &mut Joint {
        &mut self.joints[id.0]
    }

    pub fn name(&self) -> &str {
        &self.models[0].name
    }

    /// Root link of the kinematic tree, once the tree has been built
    pub fn root_link(&self) -> Option<LinkId> {
        self.models[0].root_link
    }

    pub fn link_ids(&self) -> impl Iterator<Item = LinkId> {
        (0..self.links.len()).map(LinkId)
    }

    pub fn joint_ids(&self) -> impl Iterator<Item = JointId> {
        (0..self.joints.len()).map(JointId)
    }

    /// `::`-joined names from the top-level model down to `model`, inclusive
    pub fn model_prefix(&self, model: ModelId) -> String {
        let mut names = Vec::new();
        let mut current = Some(model);
        while let Some(id) = current {
            let m = &self.models[id.0];
            names.push(m.name.as_str());
            current = m.parent;
        }
        names.reverse();
        names.join("::")
    }

    /// Fully qualified flat name of a link (`base::sub::wheel`)
    pub fn link_flat_name(&self, id: LinkId) -> String {
        let link = self.link(id);
        qualify(&self.model_prefix(link.model), &link.name)
    }

    /// Fully qualified flat name of a joint
    pub fn joint_flat_name(&self, id: JointId) -> String {
        let joint = self.joint(id);
        qualify(&self.model_prefix(joint.model), &joint.name)
    }

    /// Name of `link` as seen from `scope`: the chain of model names between
    /// them followed by the link name. `None` if the link is not nested
    /// inside `scope`.
    pub fn relative_link_name(&self, scope: ModelId, link: LinkId) -> Option<String> {
        let link = self.link(link);
        let mut names = vec![link.name.as_str()];
        let mut current = link.model;
        while current != scope {
            let m = &self.models[current.0];
            names.push(m.name.as_str());
            current = m.parent?;
        }
        names.reverse();
        Some(names.join("::"))
    }

    /// Find a top-level or nested model by its flat name
    pub fn find_model(&self, flat_name: &str) -> Option<ModelId> {
        (0..self.models.len())
            .map(ModelId)
            .find(|&id| self.model_prefix(id) == flat_name)
    }

    /// Find a link by its flat name
    pub fn find_link(&self, flat_name: &str) -> Option<LinkId> {
        self.link_ids().find(|&id| self.link_flat_name(id) == flat_name)
    }

    /// Find a joint by its flat name
    pub fn find_joint(&self, flat_name: &str) -> Option<JointId> {
        self.joint_ids()
            .find(|&id| self.joint_flat_name(id) == flat_name)
    }

    fn fmt_model(&self, f: &mut fmt::Formatter<'_>, id: ModelId, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let model = self.model(id);
        writeln!(f, "{indent}model {}", model.name)?;
        writeln!(f, "{indent}  pose: {}", pose::describe(&model.pose))?;
        if let Some(world) = model.pose_world() {
            writeln!(f, "{indent}  pose_world: {}", pose::describe(world))?;
        }
        if let Some(root) = model.root_link {
            writeln!(f, "{indent}  root_link: {}", self.link_flat_name(root))?;
        }
        for &lid in &model.links {
            let link = self.link(lid);
            writeln!(f, "{indent}  link {}", link.name)?;
            writeln!(f, "{indent}    pose: {}", pose::describe(&link.pose))?;
            if let Some(world) = link.pose_world() {
                writeln!(f, "{indent}    pose_world: {}", pose::describe(world))?;
            }
        }
        for &jid in &model.joints {
            let joint = self.joint(jid);
            writeln!(
                f,
                "{indent}  joint {} ({}) {} -> {}",
                joint.name, joint.joint_type, joint.parent, joint.child
            )?;
            writeln!(f, "{indent}    pose: {}", pose::describe(&joint.pose))?;
            if let Some(world) = joint.pose_world() {
                writeln!(f, "{indent}    pose_world: {}", pose::describe(world))?;
            }
        }
        for &sub in &model.submodels {
            self.fmt_model(f, sub, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ModelTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_model(f, self.root(), 0)
    }
}
