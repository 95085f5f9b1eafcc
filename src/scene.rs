use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::{CameraMovement, CameraSettings};
use crate::input::{KeyBindings, KeyCode};

/// Errors raised while reading a scene description.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("invalid scene XML")]
    Xml(#[from] roxmltree::Error),
    #[error("<{0}> tag is missing")]
    MissingTag(&'static str),
    #[error("<{tag}> expects three numbers, got {value:?}")]
    Vector { tag: &'static str, value: String },
    #[error("<{tag}> is not a number: {value:?}")]
    Number { tag: &'static str, value: String },
    #[error("<bindings> has no movement named <{0}>")]
    UnknownMovement(String),
    #[error("<{movement}> binds unknown key {key:?}")]
    UnknownKey { movement: &'static str, key: String },
}

/// Runtime representation of a scene: camera setup, key bindings, cubes
/// and lights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Scene {
    pub camera: CameraSettings,
    #[serde(default)]
    pub bindings: KeyBindings,
    pub objects: Vec<SceneObject>,
    pub lights: Vec<Light>,
    #[serde(default)]
    pub directional: Option<DirectionalLight>,
}

impl Scene {
    /// Parses a `<scene>` document. Every tag except object names is optional.
    pub fn from_xml(xml: &str) -> Result<Self, SceneError> {
        let document = Document::parse(xml)?;
        let root = document.root_element();

        let camera = match root.children().find(|n| n.has_tag_name("camera")) {
            Some(node) => parse_camera(&node)?,
            None => CameraSettings::default(),
        };
        let bindings = match root.children().find(|n| n.has_tag_name("bindings")) {
            Some(node) => parse_bindings(&node)?,
            None => KeyBindings::default(),
        };

        let mut objects = Vec::new();
        for node in root.children().filter(|n| n.has_tag_name("object")) {
            let defaults = SceneObject::default();
            objects.push(SceneObject {
                name: optional_text(&node, "name").ok_or(SceneError::MissingTag("name"))?,
                position: parse_vec3(&node, "position", defaults.position)?,
                rotation: parse_vec3(&node, "rotation", defaults.rotation)?,
                scale: parse_vec3(&node, "scale", defaults.scale)?,
                color: parse_color(&node, "color", defaults.color)?,
            });
        }

        let mut lights = Vec::new();
        for node in root.children().filter(|n| n.has_tag_name("light")) {
            let defaults = Light::default();
            lights.push(Light {
                position: parse_vec3(&node, "position", defaults.position)?,
                color: parse_color(&node, "color", defaults.color)?,
                intensity: parse_f32(&node, "intensity", defaults.intensity)?,
                attenuation: parse_vec3(&node, "attenuation", defaults.attenuation)?,
            });
        }

        let directional = match root.children().find(|n| n.has_tag_name("directional")) {
            Some(node) => {
                let defaults = DirectionalLight::default();
                Some(DirectionalLight {
                    direction: parse_vec3(&node, "direction", defaults.direction)?,
                    color: parse_color(&node, "color", defaults.color)?,
                    intensity: parse_f32(&node, "intensity", defaults.intensity)?,
                })
            }
            None => None,
        };

        Ok(Self {
            camera,
            bindings,
            objects,
            lights,
            directional,
        })
    }

    /// Ten crates scattered in front of the camera, a single white lamp and
    /// a dim sun.
    pub fn demo() -> Self {
        const POSITIONS: [[f32; 3]; 10] = [
            [0.0, 0.0, 0.0],
            [2.0, 5.0, -15.0],
            [-1.5, -2.2, -2.5],
            [-3.8, -2.0, -12.3],
            [2.4, -0.4, -3.5],
            [-1.7, 3.0, -7.5],
            [1.3, -2.0, -2.5],
            [1.5, 2.0, -2.5],
            [1.5, 0.2, -1.5],
            [-1.3, 1.0, -1.5],
        ];
        let objects = POSITIONS
            .iter()
            .enumerate()
            .map(|(i, position)| SceneObject {
                name: format!("Cube{i}"),
                position: Vec3::from_array(*position),
                rotation: Vec3::new(20.0 * i as f32, 10.0 * i as f32, 6.0 * i as f32),
                color: Vec3::new(210.0, 180.0, 140.0) / 255.0,
                ..SceneObject::default()
            })
            .collect();
        Self {
            camera: CameraSettings::default(),
            bindings: KeyBindings::default(),
            objects,
            lights: vec![Light {
                position: Vec3::new(1.2, 1.0, 2.0),
                ..Light::default()
            }],
            directional: Some(DirectionalLight::default()),
        }
    }
}

/// Cube placed in the world. Rotation is XYZ Euler degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    #[serde(default = "default_color")]
    pub color: Vec3,
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: default_scale(),
            color: default_color(),
        }
    }
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

/// Point light, drawn as a small lamp cube.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Constant, linear and quadratic falloff terms.
    #[serde(default = "default_attenuation")]
    pub attenuation: Vec3,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::new(3.0, 5.0, -3.0),
            color: Vec3::ONE,
            intensity: 1.0,
            attenuation: default_attenuation(),
        }
    }
}

/// Range of roughly 50 units.
fn default_attenuation() -> Vec3 {
    Vec3::new(1.0, 0.09, 0.032)
}

/// Light arriving from one direction everywhere, like the sun.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.2, -1.0, -0.3),
            color: Vec3::ONE,
            intensity: 0.4,
        }
    }
}

fn parse_camera(node: &Node<'_, '_>) -> Result<CameraSettings, SceneError> {
    let defaults = CameraSettings::default();
    Ok(CameraSettings {
        position: parse_vec3(node, "position", defaults.position)?,
        yaw: parse_f32(node, "yaw", defaults.yaw)?,
        pitch: parse_f32(node, "pitch", defaults.pitch)?,
        fov: parse_f32(node, "fov", defaults.fov)?,
        speed: parse_f32(node, "speed", defaults.speed)?,
        sensitivity: parse_f32(node, "sensitivity", defaults.sensitivity)?,
        zoom_sensitivity: parse_f32(node, "zoom-sensitivity", defaults.zoom_sensitivity)?,
        near: parse_f32(node, "near", defaults.near)?,
        far: parse_f32(node, "far", defaults.far)?,
    })
}

/// Each child names a movement and lists the keys that replace its default
/// keys, e.g. `<forward>W Up</forward>`. An empty element unbinds it.
fn parse_bindings(node: &Node<'_, '_>) -> Result<KeyBindings, SceneError> {
    let mut bindings = KeyBindings::default();
    for child in node.children().filter(Node::is_element) {
        let tag = child.tag_name().name();
        let movement = CameraMovement::from_name(tag)
            .ok_or_else(|| SceneError::UnknownMovement(tag.to_string()))?;
        bindings.clear(movement);
        for name in child.text().unwrap_or_default().split_whitespace() {
            let key = KeyCode::from_name(name).ok_or_else(|| SceneError::UnknownKey {
                movement: movement.name(),
                key: name.to_string(),
            })?;
            bindings.bind(key, movement);
        }
    }
    Ok(bindings)
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_triplet(node: &Node<'_, '_>, tag: &'static str) -> Result<Option<Vec3>, SceneError> {
    let Some(value) = optional_text(node, tag) else {
        return Ok(None);
    };
    let numbers: Option<Vec<f32>> = value.split_whitespace().map(finite).collect();
    match numbers.as_deref() {
        Some([x, y, z]) => Ok(Some(Vec3::new(*x, *y, *z))),
        _ => Err(SceneError::Vector { tag, value }),
    }
}

fn parse_vec3(node: &Node<'_, '_>, tag: &'static str, default: Vec3) -> Result<Vec3, SceneError> {
    Ok(parse_triplet(node, tag)?.unwrap_or(default))
}

fn parse_color(node: &Node<'_, '_>, tag: &'static str, default: Vec3) -> Result<Vec3, SceneError> {
    Ok(parse_triplet(node, tag)?
        .map(|rgb| rgb / 255.0)
        .unwrap_or(default))
}

fn parse_f32(node: &Node<'_, '_>, tag: &'static str, default: f32) -> Result<f32, SceneError> {
    match optional_text(node, tag) {
        Some(value) => finite(&value).ok_or(SceneError::Number { tag, value }),
        None => Ok(default),
    }
}

/// Parses a number, treating `NaN` and infinities as malformed.
fn finite(text: &str) -> Option<f32> {
    text.parse::<f32>().ok().filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NamedKey;

    const SAMPLE: &str = r#"
    <scene>
        <camera>
            <position>1 2 5</position>
            <yaw>-45</yaw>
            <fov>30</fov>
            <zoom-sensitivity>0.5</zoom-sensitivity>
        </camera>
        <object>
            <name>Crate</name>
            <position>0 -1 0</position>
            <color>255 128 0</color>
        </object>
        <light>
            <intensity>2.5</intensity>
            <position>0 5 0</position>
        </light>
        <light>
            <position>4 0 0</position>
            <color>255 0 0</color>
            <attenuation>1 0.7 1.8</attenuation>
        </light>
        <directional>
            <direction>0 -1 0</direction>
        </directional>
    </scene>
    "#;

    #[test]
    fn parse_scene_populates_camera_objects_and_lights() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        assert_eq!(scene.camera.position, Vec3::new(1.0, 2.0, 5.0));
        assert_eq!(scene.camera.yaw, -45.0);
        assert_eq!(scene.camera.fov, 30.0);
        assert_eq!(scene.camera.zoom_sensitivity, 0.5);
        assert_eq!(scene.camera.speed, CameraSettings::default().speed);

        assert_eq!(scene.objects.len(), 1);
        let crate_object = &scene.objects[0];
        assert_eq!(crate_object.name, "Crate");
        assert_eq!(crate_object.position, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(crate_object.scale, Vec3::ONE);
        assert_eq!(crate_object.color, Vec3::new(1.0, 128.0 / 255.0, 0.0));

        assert_eq!(scene.lights.len(), 2);
        let light = scene.lights[0];
        assert_eq!(light.position, Vec3::new(0.0, 5.0, 0.0));
        assert!((light.intensity - 2.5).abs() < f32::EPSILON);
        assert_eq!(light.color, Vec3::ONE);
        assert_eq!(light.attenuation, Vec3::new(1.0, 0.09, 0.032));
        let red = scene.lights[1];
        assert_eq!(red.color, Vec3::X);
        assert_eq!(red.attenuation, Vec3::new(1.0, 0.7, 1.8));

        let sun = scene.directional.unwrap();
        assert_eq!(sun.direction, Vec3::NEG_Y);
        assert_eq!(sun.intensity, DirectionalLight::default().intensity);
    }

    #[test]
    fn camera_section_is_optional() {
        let scene = Scene::from_xml("<scene/>").unwrap();
        assert_eq!(scene.camera, CameraSettings::default());
        assert_eq!(scene.bindings, KeyBindings::default());
        assert!(scene.objects.is_empty());
        assert!(scene.directional.is_none());
    }

    #[test]
    fn bindings_replace_only_the_listed_movements() {
        let scene = Scene::from_xml(
            "<scene><bindings><forward>W Up</forward><down>LeftCtrl</down><up/></bindings></scene>",
        )
        .unwrap();
        let mut expected = KeyBindings::default();
        expected.bind(KeyCode::Named(NamedKey::Up), CameraMovement::Forward);
        expected.clear(CameraMovement::Down);
        expected.bind(KeyCode::Named(NamedKey::LeftCtrl), CameraMovement::Down);
        expected.clear(CameraMovement::Up);
        assert_eq!(scene.bindings, expected);
    }

    #[test]
    fn bad_bindings_are_errors() {
        let err = Scene::from_xml("<scene><bindings><jump>Space</jump></bindings></scene>")
            .unwrap_err();
        assert_eq!(err.to_string(), "<bindings> has no movement named <jump>");
        let err = Scene::from_xml("<scene><bindings><left>Banana</left></bindings></scene>")
            .unwrap_err();
        assert_eq!(err.to_string(), "<left> binds unknown key \"Banana\"");
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<scene><object><position>0 0 0</position></object></scene>";
        assert!(matches!(
            Scene::from_xml(bad),
            Err(SceneError::MissingTag("name"))
        ));
    }

    #[test]
    fn short_vector_is_an_error() {
        let bad = "<scene><camera><position>1 2</position></camera></scene>";
        assert!(matches!(
            Scene::from_xml(bad),
            Err(SceneError::Vector { tag: "position", .. })
        ));
    }

    #[test]
    fn bad_number_is_an_error() {
        let bad = "<scene><camera><fov>wide</fov></camera></scene>";
        let err = Scene::from_xml(bad).unwrap_err();
        assert_eq!(err.to_string(), "<fov> is not a number: \"wide\"");
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let err = Scene::from_xml("<scene><camera><fov>NaN</fov></camera></scene>").unwrap_err();
        assert_eq!(err.to_string(), "<fov> is not a number: \"NaN\"");
        assert!(matches!(
            Scene::from_xml("<scene><camera><pitch>inf</pitch></camera></scene>"),
            Err(SceneError::Number { tag: "pitch", .. })
        ));
        assert!(matches!(
            Scene::from_xml("<scene><camera><position>0 NaN 3</position></camera></scene>"),
            Err(SceneError::Vector { tag: "position", .. })
        ));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(matches!(Scene::from_xml("<scene>"), Err(SceneError::Xml(_))));
    }

    #[test]
    fn demo_scene_has_ten_cubes() {
        let scene = Scene::demo();
        assert_eq!(scene.objects.len(), 10);
        assert_eq!(scene.lights.len(), 1);
    }
}
