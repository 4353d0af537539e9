//! SDF document loading
//!
//! Reads an SDF 1.4 document (and every model it includes) into one
//! [`ModelTree`] per top-level model, then builds each tree's kinematic
//! structure and world poses so the result is ready to flatten.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, SdfError};
use crate::model::{
    Axis, Geometry, Inertia, Inertial, Joint, JointType, Link, LinkPart, ModelId, ModelTree,
};
use crate::pose::{self, Transform};
use crate::tree::UnresolvedReference;
use crate::xml::Element;

/// The only SDF version accepted
pub const SUPPORTED_VERSION: &str = "1.4";

const MODEL_URI_SCHEME: &str = "model://";
const MODEL_FILE_NAME: &str = "model.sdf";
const DEFAULT_WORLD_NAME: &str = "__default__";

/// Options controlling how a document is loaded
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Local model repository substituted for `model://` in include URIs
    pub model_path: PathBuf,
    /// Skip malformed subtrees (recording them as diagnostics) instead of
    /// failing the whole load
    pub allow_partial: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            allow_partial: false,
        }
    }
}

/// `~/.gazebo/models`, or `.gazebo/models` when `HOME` is unset
pub fn default_model_path() -> PathBuf {
    expand_home("~/.gazebo/models")
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest.trim_start_matches('/')),
        (Some(rest), None) => PathBuf::from(rest.trim_start_matches('/')),
        (None, _) => PathBuf::from(path),
    }
}

/// Map an include URI to the `model.sdf` it refers to
pub fn resolve_model_uri(uri: &str, model_path: &Path) -> PathBuf {
    match uri.strip_prefix(MODEL_URI_SCHEME) {
        Some(name) => model_path.join(name).join(MODEL_FILE_NAME),
        None => Path::new(uri).join(MODEL_FILE_NAME),
    }
}

/// Something that went wrong without aborting the load
#[derive(Debug)]
pub enum Diagnostic {
    /// A subtree was dropped because of this error (partial loads only)
    Skipped(SdfError),
    /// A joint endpoint did not resolve to a link
    Unresolved(UnresolvedReference),
}

/// A loaded SDF document
#[derive(Debug)]
pub struct SdfDocument {
    pub version: String,
    /// Name of the `<world>`, `__default__` if there is none
    pub world_name: String,
    /// One tree per top-level model: world includes first, then inline
    /// models
    pub models: Vec<ModelTree>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SdfDocument {
    /// Load an SDF file
    pub fn from_file(path: &Path, options: &LoadOptions) -> Result<Self> {
        let content = read_file(path)?;
        let mut loader = Loader::new(options);
        loader.include_stack.push(path.to_path_buf());
        loader.load_document(&content, &path.display().to_string())
    }

    /// Load an SDF document from a string. Includes are resolved against
    /// `options.model_path` only.
    pub fn from_xml(xml: &str, options: &LoadOptions) -> Result<Self> {
        Loader::new(options).load_document(xml, "<string>")
    }

    /// Top-level model by name, or the first one when `name` is `None`
    pub fn model(&self, name: Option<&str>) -> Result<&ModelTree> {
        match name {
            Some(name) => self
                .models
                .iter()
                .find(|m| m.name() == name)
                .ok_or_else(|| SdfError::ModelNotFound {
                    name: name.to_string(),
                }),
            None => self.models.first().ok_or(SdfError::NoModel),
        }
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &UnresolvedReference> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::Unresolved(u) => Some(u),
            Diagnostic::Skipped(_) => None,
        })
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| SdfError::Io {
        path: path.to_path_buf(),
        source,
    })
}

struct Loader<'a> {
    options: &'a LoadOptions,
    /// Files currently being loaded, outermost first
    include_stack: Vec<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Loader<'a> {
    fn new(options: &'a LoadOptions) -> Self {
        Self {
            options,
            include_stack: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Keep going past a failed subtree when partial results are allowed
    fn recover<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.options.allow_partial && !e.is_fatal() => {
                warn!(error = %e, "Skipping malformed element");
                self.diagnostics.push(Diagnostic::Skipped(e));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn load_document(mut self, xml: &str, path: &str) -> Result<SdfDocument> {
        let root = parse_sdf_root(xml, path)?;
        let version = root.attr("version").unwrap_or_default().to_string();

        let mut models = Vec::new();
        let mut world_name = DEFAULT_WORLD_NAME.to_string();

        let scope = match root.child("world") {
            Some(world) => {
                if let Some(name) = world.attr("name") {
                    world_name = name.to_string();
                }
                for include in world.children_named("include") {
                    let result = self.load_top_level_include(include);
                    if let Some(tree) = self.recover(result)? {
                        models.push(tree);
                    }
                }
                world
            }
            None => &root,
        };

        for model in scope.children_named("model") {
            let result = self.load_top_level_model(model, path);
            if let Some(tree) = self.recover(result)? {
                models.push(tree);
            }
        }

        let mut diagnostics = self.diagnostics;
        for tree in &mut models {
            let unresolved = tree.build_tree()?;
            diagnostics.extend(unresolved.into_iter().map(Diagnostic::Unresolved));
            tree.calculate_absolute_pose();
        }

        Ok(SdfDocument {
            version,
            world_name,
            models,
            diagnostics,
        })
    }

    fn load_top_level_model(&mut self, element: &Element, path: &str) -> Result<ModelTree> {
        let name = required_attr(element, "name")?;
        let mut tree = ModelTree::new(name, element_pose(element)?);
        let top = tree.root();
        self.load_model_children(&mut tree, top, element, path)?;
        Ok(tree)
    }

    fn load_top_level_include(&mut self, element: &Element) -> Result<ModelTree> {
        let include = IncludeRef::from_element(element, &self.options.model_path)?;
        let mut tree = ModelTree::new(String::new(), Transform::identity());
        let top = tree.root();
        self.load_include_into(&mut tree, top, &include)?;
        Ok(tree)
    }

    /// Load `<link>`, `<joint>`, `<include>` and nested `<model>` children
    /// of a model element, in document order
    fn load_model_children(
        &mut self,
        tree: &mut ModelTree,
        model: ModelId,
        element: &Element,
        path: &str,
    ) -> Result<()> {
        for child in &element.children {
            match child.name.as_str() {
                "link" => {
                    let result = load_link(child);
                    if let Some(link) = self.recover(result)? {
                        tree.add_link(model, link);
                    }
                }
                "joint" => {
                    let result = self.load_joint(child);
                    if let Some(joint) = self.recover(result)? {
                        tree.add_joint(model, joint);
                    }
                }
                "include" => {
                    let result = self.load_include(tree, model, child);
                    self.recover(result)?;
                }
                "model" => {
                    let result = self.load_nested_model(tree, model, child, path);
                    self.recover(result)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn load_nested_model(
        &mut self,
        tree: &mut ModelTree,
        parent: ModelId,
        element: &Element,
        path: &str,
    ) -> Result<()> {
        let name = required_attr(element, "name")?;
        let pose = element_pose(element)?;
        let checkpoint = tree.checkpoint();
        let sub = tree.add_submodel(parent, name, pose, None);
        debug!(model = %tree.model_prefix(sub), "Loading nested model");
        let result = self.load_model_children(tree, sub, element, path);
        if result.is_err() {
            tree.rollback(checkpoint);
        }
        result
    }

    fn load_include(&mut self, tree: &mut ModelTree, parent: ModelId, element: &Element) -> Result<()> {
        let include = IncludeRef::from_element(element, &self.options.model_path)?;
        let checkpoint = tree.checkpoint();
        let sub = tree.add_submodel(parent, String::new(), Transform::identity(), None);
        let result = self.load_include_into(tree, sub, &include);
        if result.is_err() {
            tree.rollback(checkpoint);
        }
        result
    }

    /// Load an included model file into the already-created model `target`
    fn load_include_into(
        &mut self,
        tree: &mut ModelTree,
        target: ModelId,
        include: &IncludeRef,
    ) -> Result<()> {
        let path = &include.path;
        if self.include_stack.iter().any(|p| p == path) {
            return Err(SdfError::RecursiveInclude { path: path.clone() });
        }

        let content = read_file(path)?;
        let path_label = path.display().to_string();
        let root = parse_sdf_root(&content, &path_label)?;
        let element = root.child("model").ok_or_else(|| SdfError::MalformedElement {
            path: path_label.clone(),
            expected: "model",
            found: root
                .children
                .first()
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "nothing".to_string()),
        })?;

        let file_name = required_attr(element, "name")?;
        let file_pose = element_pose(element)?;
        {
            let model = tree.model_mut(target);
            model.name = include.name.clone().unwrap_or(file_name);
            // The include offset is applied on top of the model's own pose
            model.pose = include.pose * file_pose;
            model.source = Some(path.clone());
        }
        debug!(uri = %include.uri, path = %path_label, model = %tree.model_prefix(target), "Loading included model");

        self.include_stack.push(path.clone());
        let result = self.load_model_children(tree, target, element, &path_label);
        self.include_stack.pop();
        result
    }

    fn load_joint(&mut self, element: &Element) -> Result<Joint> {
        let name = required_attr(element, "name")?;
        let type_name = required_attr(element, "type")?;
        let joint_type = JointType::parse(&type_name).ok_or_else(|| SdfError::UnknownJointType {
            joint: name.clone(),
            joint_type: type_name.clone(),
        })?;

        let parent = element.child_text("parent").unwrap_or_default();
        let child = element.child_text("child").unwrap_or_default();
        let mut joint = Joint::new(name, joint_type, parent, child);
        joint.pose = element_pose(element)?;

        if let Some(axis) = element.child("axis") {
            let result = load_axis(axis, &joint.name);
            if let Some(axis) = self.recover(result)? {
                joint.axis = axis;
            }
        }
        Ok(joint)
    }
}

/// Target of an `<include>` element
#[derive(Debug, Clone)]
struct IncludeRef {
    uri: String,
    path: PathBuf,
    name: Option<String>,
    pose: Transform,
}

impl IncludeRef {
    fn from_element(element: &Element, model_path: &Path) -> Result<Self> {
        let uri = element
            .child_text("uri")
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SdfError::MissingElement {
                element: "uri",
                context: "<include>".to_string(),
            })?
            .to_string();
        if let Some((scheme, _)) = uri.split_once("://") {
            if MODEL_URI_SCHEME.strip_suffix("://") != Some(scheme) {
                return Err(SdfError::InvalidInclude {
                    message: format!("unsupported URI scheme '{}'", scheme),
                    uri,
                });
            }
        }
        Ok(Self {
            path: resolve_model_uri(&uri, model_path),
            name: element.child_text("name").map(str::to_string),
            pose: element_pose(element)?,
            uri,
        })
    }
}

/// Parse a document and check that it is an SDF of the supported version
fn parse_sdf_root(xml: &str, path: &str) -> Result<Element> {
    let root = Element::parse(xml).map_err(|message| SdfError::Xml {
        path: path.to_string(),
        message,
    })?;
    if root.name != "sdf" {
        return Err(SdfError::NotSdf {
            path: path.to_string(),
            found: root.name,
        });
    }
    let version = root.attr("version").unwrap_or_default();
    let supported = version
        .trim()
        .parse::<f64>()
        .ok()
        .zip(SUPPORTED_VERSION.parse::<f64>().ok())
        .is_some_and(|(v, s)| v == s);
    if !supported {
        return Err(SdfError::UnsupportedVersion {
            path: path.to_string(),
            version: version.to_string(),
        });
    }
    Ok(root)
}

fn required_attr(element: &Element, attribute: &'static str) -> Result<String> {
    element
        .attr(attribute)
        .map(str::to_string)
        .ok_or_else(|| SdfError::MissingAttribute {
            attribute,
            element: element.name.clone(),
        })
}

fn invalid(element: &str, value: &str, message: String) -> SdfError {
    SdfError::InvalidValue {
        element: element.to_string(),
        value: value.to_string(),
        message,
    }
}

/// `<pose>` child of `element`, identity when absent or empty
fn element_pose(element: &Element) -> Result<Transform> {
    match element.child_text("pose") {
        Some(text) if !text.is_empty() => {
            pose::parse_transform(text).map_err(|m| invalid("pose", text, m))
        }
        _ => Ok(Transform::identity()),
    }
}

/// Numeric child of `element`, `default` when absent
fn child_f64(element: &Element, name: &str, default: f64) -> Result<f64> {
    match element.child_text(name) {
        Some(text) => text
            .parse::<f64>()
            .map_err(|e| invalid(name, text, e.to_string())),
        None => Ok(default),
    }
}

fn child_vector3(
    element: &Element,
    name: &str,
    default: nalgebra::Vector3<f64>,
) -> Result<nalgebra::Vector3<f64>> {
    match element.child_text(name) {
        Some(text) => pose::parse_vector3(text).map_err(|m| invalid(name, text, m)),
        None => Ok(default),
    }
}

fn load_link(element: &Element) -> Result<Link> {
    let name = required_attr(element, "name")?;
    let mut link = Link::new(name, element_pose(element)?);

    if let Some(inertial) = element.child("inertial") {
        link.inertial = load_inertial(inertial)?;
    }
    if let Some(collision) = element.child("collision") {
        link.collision = load_link_part(collision)?;
    }
    if let Some(visual) = element.child("visual") {
        link.visual = load_link_part(visual)?;
    }
    Ok(link)
}

fn load_axis(element: &Element, joint: &str) -> Result<Axis> {
    let xyz = child_vector3(element, "xyz", nalgebra::Vector3::zeros())?;
    let limit = element.child("limit").ok_or_else(|| SdfError::MissingElement {
        element: "limit",
        context: format!("axis of joint '{joint}'"),
    })?;
    Ok(Axis {
        xyz,
        lower_limit: child_f64(limit, "lower", 0.0)?,
        upper_limit: child_f64(limit, "upper", 0.0)?,
        effort_limit: child_f64(limit, "effort", 0.0)?,
        velocity_limit: child_f64(limit, "velocity", 0.0)?,
    })
}

fn load_inertial(element: &Element) -> Result<Inertial> {
    let inertia = match element.child("inertia") {
        Some(i) => Inertia {
            ixx: child_f64(i, "ixx", 0.0)?,
            ixy: child_f64(i, "ixy", 0.0)?,
            ixz: child_f64(i, "ixz", 0.0)?,
            iyy: child_f64(i, "iyy", 0.0)?,
            iyz: child_f64(i, "iyz", 0.0)?,
            izz: child_f64(i, "izz", 0.0)?,
        },
        None => Inertia::default(),
    };
    Ok(Inertial {
        pose: element_pose(element)?,
        mass: child_f64(element, "mass", 0.0)?,
        inertia,
    })
}

fn load_link_part(element: &Element) -> Result<LinkPart> {
    let geometry = match element.child("geometry") {
        Some(g) => load_geometry(g)?,
        None => Geometry::None,
    };
    Ok(LinkPart {
        name: element.attr("name").unwrap_or_default().to_string(),
        pose: element_pose(element)?,
        geometry,
    })
}

/// First recognised shape inside `<geometry>`, with SDF 1.4 defaults for
/// omitted dimensions
fn load_geometry(element: &Element) -> Result<Geometry> {
    let one = nalgebra::Vector3::repeat(1.0);
    if let Some(b) = element.child("box") {
        return Ok(Geometry::Box {
            size: child_vector3(b, "size", one)?,
        });
    }
    if let Some(c) = element.child("cylinder") {
        return Ok(Geometry::Cylinder {
            radius: child_f64(c, "radius", 1.0)?,
            length: child_f64(c, "length", 1.0)?,
        });
    }
    if let Some(s) = element.child("sphere") {
        return Ok(Geometry::Sphere {
            radius: child_f64(s, "radius", 1.0)?,
        });
    }
    if let Some(m) = element.child("mesh") {
        let uri = m
            .child_text("uri")
            .ok_or_else(|| SdfError::MissingElement {
                element: "uri",
                context: "<mesh>".to_string(),
            })?
            .to_string();
        return Ok(Geometry::Mesh {
            uri,
            scale: child_vector3(m, "scale", one)?,
        });
    }
    Ok(Geometry::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;
    use approx::assert_relative_eq;
    use std::fs;

    fn options(model_path: &Path) -> LoadOptions {
        LoadOptions {
            model_path: model_path.to_path_buf(),
            allow_partial: false,
        }
    }

    fn write_model(repo: &Path, name: &str, body: &str) {
        let dir = repo.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("model.sdf"), body).unwrap();
    }

    fn assert_transform_eq(a: &Transform, b: &Transform) {
        assert_relative_eq!(a.to_homogeneous(), b.to_homogeneous(), epsilon = 1e-12);
    }

    const WHEEL: &str = r#"<?xml version='1.0'?>
<sdf version="1.4">
    <model name="wheel">
        <pose>0 0 0.1 0 0 0</pose>
        <link name="hub">
            <pose>0.2 0 0 0 0 0</pose>
        </link>
    </model>
</sdf>"#;

    #[test]
    fn test_parse_link_details() {
        let xml = r#"<?xml version='1.0'?>
<sdf version="1.4">
    <model name="base">
        <link name="body">
            <pose>1 2 3 0 0 0</pose>
            <inertial>
                <pose>0 0 0.5 0 0 0</pose>
                <mass>2.5</mass>
                <inertia><ixx>0.1</ixx><iyy>0.2</iyy><izz>0.3</izz></inertia>
            </inertial>
            <collision name="col">
                <geometry><box><size>1 2 3</size></box></geometry>
            </collision>
            <visual name="vis">
                <pose>0 0 1 0 0 0</pose>
                <geometry><mesh><uri>model://base/meshes/body.dae</uri></mesh></geometry>
            </visual>
        </link>
        <link name="arm">
            <visual name="v"><geometry><cylinder><radius>0.1</radius><length>0.4</length></cylinder></geometry></visual>
            <collision name="c"><geometry><sphere><radius>0.3</radius></sphere></geometry></collision>
        </link>
    </model>
</sdf>"#;

        let doc = SdfDocument::from_xml(xml, &LoadOptions::default()).unwrap();
        let tree = doc.model(None).unwrap();
        let body = tree.link(tree.find_link("base::body").unwrap());

        assert_eq!(body.inertial.mass, 2.5);
        assert_eq!(body.inertial.inertia.iyy, 0.2);
        assert_eq!(body.inertial.inertia.ixy, 0.0);
        assert_relative_eq!(body.inertial.pose.translation.vector.z, 0.5);
        assert_eq!(
            body.collision.geometry,
            Geometry::Box {
                size: nalgebra::Vector3::new(1.0, 2.0, 3.0)
            }
        );
        assert_eq!(
            body.visual.geometry,
            Geometry::Mesh {
                uri: "model://base/meshes/body.dae".to_string(),
                scale: nalgebra::Vector3::repeat(1.0),
            }
        );
        assert_eq!(body.visual.name, "vis");

        let arm = tree.link(tree.find_link("base::arm").unwrap());
        assert_eq!(arm.visual.geometry, Geometry::Cylinder { radius: 0.1, length: 0.4 });
        assert_eq!(arm.collision.geometry, Geometry::Sphere { radius: 0.3 });
    }

    #[test]
    fn test_parse_joint_and_axis() {
        let xml = r#"<sdf version="1.4">
    <model name="base">
        <link name="a"/>
        <link name="b"/>
        <joint name="j" type="prismatic">
            <pose>0 0 1 0 0 0</pose>
            <parent>a</parent>
            <child>b</child>
            <axis>
                <xyz>0 0 1</xyz>
                <limit><lower>-0.5</lower><upper>0.5</upper><effort>10</effort><velocity>2</velocity></limit>
            </axis>
        </joint>
    </model>
</sdf>"#;

        let doc = SdfDocument::from_xml(xml, &LoadOptions::default()).unwrap();
        let tree = doc.model(Some("base")).unwrap();
        let joint = tree.joint(tree.find_joint("base::j").unwrap());
        assert_eq!(joint.joint_type, JointType::Prismatic);
        assert_eq!(joint.parent, "a");
        assert_eq!(joint.child, "b");
        assert_eq!(joint.axis.xyz, nalgebra::Vector3::z());
        assert_eq!(joint.axis.lower_limit, -0.5);
        assert_eq!(joint.axis.upper_limit, 0.5);
        assert_eq!(joint.axis.effort_limit, 10.0);
        assert_eq!(joint.axis.velocity_limit, 2.0);
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let xml = r#"<sdf version="1.6"><model name="m"><link name="l"/></model></sdf>"#;
        let err = SdfDocument::from_xml(xml, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SdfError::UnsupportedVersion { ref version, .. } if version == "1.6"));

        // Partial tolerance does not apply to the version check
        let lenient = LoadOptions {
            allow_partial: true,
            ..LoadOptions::default()
        };
        assert!(SdfDocument::from_xml(xml, &lenient).is_err());
    }

    #[test]
    fn test_rejects_non_sdf_root() {
        let xml = r#"<robot name="r"><link name="l"/></robot>"#;
        let err = SdfDocument::from_xml(xml, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SdfError::NotSdf { ref found, .. } if found == "robot"));
    }

    #[test]
    fn test_world_includes_come_before_inline_models() {
        let repo = tempfile::tempdir().unwrap();
        write_model(repo.path(), "wheel", WHEEL);

        let xml = r#"<sdf version="1.4">
    <world name="garage">
        <model name="inline"><link name="l"/></model>
        <include>
            <uri>model://wheel</uri>
            <name>spare</name>
            <pose>1 0 0 0 0 0</pose>
        </include>
    </world>
</sdf>"#;

        let doc = SdfDocument::from_xml(xml, &options(repo.path())).unwrap();
        assert_eq!(doc.world_name, "garage");
        let names: Vec<&str> = doc.models.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["spare", "inline"]);

        // Include pose is applied on top of the file's own model pose
        let spare = doc.model(Some("spare")).unwrap();
        let hub = spare.link(spare.find_link("spare::hub").unwrap());
        let expected = Pose::from_array([1.2, 0.0, 0.1, 0.0, 0.0, 0.0]).to_transform();
        assert_transform_eq(hub.pose_world().unwrap(), &expected);
        assert_eq!(spare.root_link(), spare.find_link("spare::hub"));
    }

    #[test]
    fn test_nested_include_becomes_submodel() {
        let repo = tempfile::tempdir().unwrap();
        write_model(repo.path(), "wheel", WHEEL);

        let xml = r#"<sdf version="1.4">
    <model name="cart">
        <link name="body"/>
        <include>
            <uri>model://wheel</uri>
            <pose>0 1 0 0 0 0</pose>
        </include>
        <joint name="axle" type="revolute">
            <parent>body</parent>
            <child>wheel::hub</child>
        </joint>
    </model>
</sdf>"#;

        let doc = SdfDocument::from_xml(xml, &options(repo.path())).unwrap();
        let tree = doc.model(None).unwrap();
        let wheel = tree.find_model("cart::wheel").unwrap();
        assert_eq!(
            tree.model(wheel).source.as_deref(),
            Some(repo.path().join("wheel").join("model.sdf").as_path())
        );

        let hub = tree.find_link("cart::wheel::hub").unwrap();
        let axle = tree.find_joint("cart::axle").unwrap();
        assert_eq!(tree.link(hub).tree_parent_joint(), Some(axle));
        assert_eq!(tree.root_link(), tree.find_link("cart::body"));
        assert_eq!(doc.unresolved().count(), 0);
    }

    #[test]
    fn test_nested_model_poses_compose() {
        let xml = r#"<sdf version="1.4">
    <model name="M">
        <pose>1 0 0 0 0 1.5707963267948966</pose>
        <model name="S">
            <pose>1 0 0 0 0 0</pose>
            <link name="L"><pose>0 0 1 0 0 0</pose></link>
        </model>
    </model>
</sdf>"#;

        let doc = SdfDocument::from_xml(xml, &LoadOptions::default()).unwrap();
        let tree = doc.model(None).unwrap();
        let link = tree.link(tree.find_link("M::S::L").unwrap());
        let t = link.pose_world().unwrap().translation.vector;
        assert_relative_eq!(t.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(t.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(t.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_include_without_model_is_malformed() {
        let repo = tempfile::tempdir().unwrap();
        write_model(
            repo.path(),
            "empty_world",
            r#"<sdf version="1.4"><world name="w"/></sdf>"#,
        );

        let xml = r#"<sdf version="1.4">
    <model name="m">
        <link name="l"/>
        <include><uri>model://empty_world</uri></include>
    </model>
</sdf>"#;

        let err = SdfDocument::from_xml(xml, &options(repo.path())).unwrap_err();
        assert!(matches!(
            err,
            SdfError::MalformedElement { expected: "model", ref found, .. } if found == "world"
        ));
    }

    #[test]
    fn test_missing_include_fails_fast_with_path() {
        let repo = tempfile::tempdir().unwrap();
        let xml = r#"<sdf version="1.4">
    <model name="m">
        <include><uri>model://nowhere</uri></include>
    </model>
</sdf>"#;

        let err = SdfDocument::from_xml(xml, &options(repo.path())).unwrap_err();
        match err {
            SdfError::Io { path, .. } => assert!(path.ends_with("nowhere/model.sdf")),
            other => panic!("expected IO error, got {other:?}"),
        }
    }

    #[test]
    fn test_include_with_foreign_uri_scheme() {
        let repo = tempfile::tempdir().unwrap();
        let xml = r#"<sdf version="1.4">
    <model name="m">
        <include><uri>http://example.com/wheel</uri></include>
    </model>
</sdf>"#;

        let err = SdfDocument::from_xml(xml, &options(repo.path())).unwrap_err();
        assert!(matches!(err, SdfError::InvalidInclude { ref uri, .. } if uri == "http://example.com/wheel"));
    }

    #[test]
    fn test_include_version_mismatch_aborts_even_when_partial() {
        let repo = tempfile::tempdir().unwrap();
        write_model(
            repo.path(),
            "new",
            r#"<sdf version="1.6"><model name="new"><link name="l"/></model></sdf>"#,
        );
        let xml = r#"<sdf version="1.4">
    <model name="m"><include><uri>model://new</uri></include></model>
</sdf>"#;
        let lenient = LoadOptions {
            model_path: repo.path().to_path_buf(),
            allow_partial: true,
        };
        assert!(matches!(
            SdfDocument::from_xml(xml, &lenient),
            Err(SdfError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_recursive_include_is_rejected() {
        let repo = tempfile::tempdir().unwrap();
        write_model(
            repo.path(),
            "loop",
            r#"<sdf version="1.4">
    <model name="loop">
        <link name="l"/>
        <include><uri>model://loop</uri></include>
    </model>
</sdf>"#,
        );
        let xml = r#"<sdf version="1.4">
    <model name="m"><include><uri>model://loop</uri></include></model>
</sdf>"#;

        assert!(matches!(
            SdfDocument::from_xml(xml, &options(repo.path())),
            Err(SdfError::RecursiveInclude { .. })
        ));
    }

    #[test]
    fn test_same_model_included_twice() {
        let repo = tempfile::tempdir().unwrap();
        write_model(repo.path(), "wheel", WHEEL);
        let xml = r#"<sdf version="1.4">
    <model name="cart">
        <link name="body"/>
        <include><uri>model://wheel</uri><name>left</name></include>
        <include><uri>model://wheel</uri><name>right</name></include>
    </model>
</sdf>"#;

        let doc = SdfDocument::from_xml(xml, &options(repo.path())).unwrap();
        let tree = doc.model(None).unwrap();
        assert!(tree.find_link("cart::left::hub").is_some());
        assert!(tree.find_link("cart::right::hub").is_some());
    }

    #[test]
    fn test_axis_without_limit() {
        let xml = r#"<sdf version="1.4">
    <model name="m">
        <link name="a"/>
        <link name="b"/>
        <joint name="j" type="revolute">
            <parent>a</parent>
            <child>b</child>
            <axis><xyz>0 0 1</xyz></axis>
        </joint>
    </model>
</sdf>"#;

        let err = SdfDocument::from_xml(xml, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SdfError::MissingElement { element: "limit", .. }));

        // Tolerated: the joint survives with a default axis and the problem
        // is reported
        let lenient = LoadOptions {
            allow_partial: true,
            ..LoadOptions::default()
        };
        let doc = SdfDocument::from_xml(xml, &lenient).unwrap();
        let tree = doc.model(None).unwrap();
        let joint = tree.joint(tree.find_joint("m::j").unwrap());
        assert_eq!(joint.axis, Axis::default());
        assert!(doc
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Skipped(SdfError::MissingElement { element: "limit", .. }))));
    }

    #[test]
    fn test_partial_load_skips_broken_subtrees() {
        let xml = r#"<sdf version="1.4">
    <model name="m">
        <link name="a"/>
        <link name="b"><pose>1 2</pose></link>
        <joint name="bad" type="hinge"><parent>a</parent><child>b</child></joint>
        <include><uri>model://missing</uri></include>
    </model>
</sdf>"#;

        assert!(SdfDocument::from_xml(xml, &LoadOptions::default()).is_err());

        let repo = tempfile::tempdir().unwrap();
        let lenient = LoadOptions {
            model_path: repo.path().to_path_buf(),
            allow_partial: true,
        };
        let doc = SdfDocument::from_xml(xml, &lenient).unwrap();
        let tree = doc.model(None).unwrap();
        assert!(tree.find_link("m::a").is_some());
        assert!(tree.find_link("m::b").is_none());
        assert!(tree.find_joint("m::bad").is_none());
        assert!(tree.model(tree.root()).submodels().is_empty());

        let skipped = doc
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::Skipped(_)))
            .count();
        assert_eq!(skipped, 3);
    }

    #[test]
    fn test_unresolved_references_become_diagnostics() {
        let xml = r#"<sdf version="1.4">
    <model name="m">
        <link name="a"/>
        <joint name="j" type="fixed"><parent>a</parent><child>ghost</child></joint>
    </model>
</sdf>"#;

        let doc = SdfDocument::from_xml(xml, &LoadOptions::default()).unwrap();
        let unresolved: Vec<_> = doc.unresolved().collect();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].reference, "ghost");
        assert_eq!(unresolved[0].joint, "m::j");
    }

    #[test]
    fn test_model_selection() {
        let xml = r#"<sdf version="1.4">
    <model name="first"><link name="a"/></model>
    <model name="second"><link name="b"/></model>
</sdf>"#;

        let doc = SdfDocument::from_xml(xml, &LoadOptions::default()).unwrap();
        assert_eq!(doc.world_name, "__default__");
        assert_eq!(doc.model(None).unwrap().name(), "first");
        assert_eq!(doc.model(Some("second")).unwrap().name(), "second");
        assert!(matches!(
            doc.model(Some("third")),
            Err(SdfError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_model_uri() {
        let repo = Path::new("/opt/models");
        assert_eq!(
            resolve_model_uri("model://wheel", repo),
            PathBuf::from("/opt/models/wheel/model.sdf")
        );
        assert_eq!(
            resolve_model_uri("/srv/robots/arm", repo),
            PathBuf::from("/srv/robots/arm/model.sdf")
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("robot.sdf");
        fs::write(&path, WHEEL).unwrap();

        let doc = SdfDocument::from_file(&path, &options(dir.path())).unwrap();
        assert_eq!(doc.version, "1.4");
        assert_eq!(doc.model(None).unwrap().name(), "wheel");

        let err = SdfDocument::from_file(&dir.path().join("missing.sdf"), &options(dir.path()))
            .unwrap_err();
        assert!(err.to_string().contains("missing.sdf"));
    }
}
