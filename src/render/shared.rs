use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::app::FrameGlobals;
use crate::scene::{Light, Scene, SceneObject};

/// Scale applied to the cube drawn at each light position.
pub(crate) const LAMP_SCALE: f32 = 0.2;
/// Point lights the shader evaluates; extra scene lights are drawn but unlit.
pub(crate) const MAX_POINT_LIGHTS: usize = 4;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub(crate) struct PointLightUniform {
    pub position: [f32; 4],
    /// rgb color, w intensity
    pub color: [f32; 4],
    /// constant, linear, quadratic
    pub attenuation: [f32; 4],
}

impl PointLightUniform {
    fn new(light: &Light) -> Self {
        Self {
            position: light.position.extend(1.0).into(),
            color: light.color.extend(light.intensity).into(),
            attenuation: light.attenuation.extend(0.0).into(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct GlobalUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// xyz direction the light travels, w 1.0 when present
    pub sun_direction: [f32; 4],
    /// rgb color, w intensity
    pub sun_color: [f32; 4],
    pub point_lights: [PointLightUniform; MAX_POINT_LIGHTS],
    /// x is the number of valid `point_lights`
    pub point_light_count: [u32; 4],
    /// xyz position, w 1.0 when the flashlight is on
    pub flash_position: [f32; 4],
    /// xyz direction, w inner cutoff cosine
    pub flash_direction: [f32; 4],
    /// outer cutoff cosine, then constant/linear/quadratic attenuation
    pub flash_params: [f32; 4],
}

impl GlobalUniform {
    pub fn new(globals: &FrameGlobals, scene: &Scene) -> Self {
        let (flash_position, flash_direction, flash_params): ([f32; 4], [f32; 4], [f32; 4]) =
            match globals.flashlight {
                Some(flash) => (
                    flash.position.extend(1.0).into(),
                    flash.direction.extend(flash.inner_cutoff).into(),
                    [
                        flash.outer_cutoff,
                        flash.attenuation.x,
                        flash.attenuation.y,
                        flash.attenuation.z,
                    ],
                ),
                None => ([0.0; 4], [0.0; 4], [0.0; 4]),
            };
        let (sun_direction, sun_color): ([f32; 4], [f32; 4]) = match scene.directional {
            Some(sun) => (
                sun.direction.normalize_or_zero().extend(1.0).into(),
                sun.color.extend(sun.intensity).into(),
            ),
            None => ([0.0; 4], [0.0; 4]),
        };

        let mut point_lights = [PointLightUniform::default(); MAX_POINT_LIGHTS];
        let count = scene.lights.len().min(MAX_POINT_LIGHTS);
        for (slot, light) in point_lights.iter_mut().zip(&scene.lights) {
            *slot = PointLightUniform::new(light);
        }

        Self {
            view: globals.view.to_cols_array_2d(),
            projection: globals.projection.to_cols_array_2d(),
            camera_position: globals.camera_position.extend(1.0).into(),
            sun_direction,
            sun_color,
            point_lights,
            point_light_count: [count as u32, 0, 0, 0],
            flash_position,
            flash_direction,
            flash_params,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct ObjectConstants {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub color: [f32; 4],
    /// x is 1.0 for unlit lamp cubes
    pub params: [f32; 4],
}

impl ObjectConstants {
    pub fn for_object(object: &SceneObject) -> Self {
        Self::from_model(object_model_matrix(object), object.color, false)
    }

    pub fn for_lamp(light: &Light) -> Self {
        let model = Mat4::from_translation(light.position) * Mat4::from_scale(Vec3::splat(LAMP_SCALE));
        Self::from_model(model, light.color, true)
    }

    fn from_model(model: Mat4, color: Vec3, emissive: bool) -> Self {
        let normal = Mat3::from_mat4(model).inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
            color: color.extend(1.0).into(),
            params: [if emissive { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

pub(crate) fn object_model_matrix(object: &SceneObject) -> Mat4 {
    let translation = Mat4::from_translation(object.position);
    let rotation = Mat4::from_rotation_z(object.rotation.z.to_radians())
        * Mat4::from_rotation_y(object.rotation.y.to_radians())
        * Mat4::from_rotation_x(object.rotation.x.to_radians());
    let scale = Mat4::from_scale(object.scale);
    translation * rotation * scale
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

pub(crate) const SHADER: &str = r#"
struct PointLight {
    position: vec4<f32>,
    color: vec4<f32>,
    attenuation: vec4<f32>,
}

struct GlobalUniform {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    camera_position: vec4<f32>,
    sun_direction: vec4<f32>,
    sun_color: vec4<f32>,
    point_lights: array<PointLight, 4>,
    point_light_count: vec4<u32>,
    flash_position: vec4<f32>,
    flash_direction: vec4<f32>,
    flash_params: vec4<f32>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    color: vec4<f32>,
    params: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = globals.projection * globals.view * world_position;
    out.world_pos = world_position.xyz;

    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;

    out.normal = normalize(world_normal);
    return out;
}

fn phong(normal: vec3<f32>, light_dir: vec3<f32>, view_dir: vec3<f32>) -> f32 {
    let diffuse = max(dot(normal, light_dir), 0.0);
    let reflect_dir = reflect(-light_dir, normal);
    let specular = pow(max(dot(view_dir, reflect_dir), 0.0), 32.0) * 0.5;
    return diffuse + specular;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    if (object.params.x > 0.5) {
        return vec4<f32>(object.color.rgb, 1.0);
    }

    let normal = normalize(input.normal);
    let view_dir = normalize(globals.camera_position.xyz - input.world_pos);

    var lighting = vec3<f32>(0.05);

    if (globals.sun_direction.w > 0.5) {
        let sun_dir = normalize(-globals.sun_direction.xyz);
        lighting += phong(normal, sun_dir, view_dir) * globals.sun_color.w * globals.sun_color.rgb;
    }

    for (var i = 0u; i < globals.point_light_count.x; i = i + 1u) {
        let light = globals.point_lights[i];
        let to_light = light.position.xyz - input.world_pos;
        let dist = length(to_light);
        let attenuation = 1.0 / (light.attenuation.x
            + light.attenuation.y * dist
            + light.attenuation.z * dist * dist);
        let shade = 0.1 + phong(normal, normalize(to_light), view_dir);
        lighting += shade * attenuation * light.color.w * light.color.rgb;
    }

    if (globals.flash_position.w > 0.5) {
        let to_light = globals.flash_position.xyz - input.world_pos;
        let flash_dir = normalize(to_light);
        let theta = dot(flash_dir, normalize(-globals.flash_direction.xyz));
        let inner = globals.flash_direction.w;
        let outer = globals.flash_params.x;
        let cone = clamp((theta - outer) / (inner - outer), 0.0, 1.0);
        let dist = length(to_light);
        let attenuation = 1.0 / (globals.flash_params.y
            + globals.flash_params.z * dist
            + globals.flash_params.w * dist * dist);
        lighting += vec3<f32>(phong(normal, flash_dir, view_dir) * cone * attenuation);
    }

    return vec4<f32>(lighting * object.color.rgb, object.color.a);
}
"#;

pub(crate) const CUBE_VERTICES: &[f32] = &[
    // positions        // normals
    -0.5, -0.5, 0.5, 0.0, 0.0, 1.0, 0.5, -0.5, 0.5, 0.0, 0.0, 1.0, 0.5, 0.5, 0.5, 0.0, 0.0, 1.0,
    -0.5, 0.5, 0.5, 0.0, 0.0, 1.0, -0.5, -0.5, -0.5, 0.0, 0.0, -1.0, 0.5, -0.5, -0.5, 0.0, 0.0,
    -1.0, 0.5, 0.5, -0.5, 0.0, 0.0, -1.0, -0.5, 0.5, -0.5, 0.0, 0.0, -1.0, -0.5, -0.5, -0.5, -1.0,
    0.0, 0.0, -0.5, -0.5, 0.5, -1.0, 0.0, 0.0, -0.5, 0.5, 0.5, -1.0, 0.0, 0.0, -0.5, 0.5, -0.5,
    -1.0, 0.0, 0.0, 0.5, -0.5, -0.5, 1.0, 0.0, 0.0, 0.5, -0.5, 0.5, 1.0, 0.0, 0.0, 0.5, 0.5, 0.5,
    1.0, 0.0, 0.0, 0.5, 0.5, -0.5, 1.0, 0.0, 0.0, -0.5, -0.5, -0.5, 0.0, -1.0, 0.0, 0.5, -0.5,
    -0.5, 0.0, -1.0, 0.0, 0.5, -0.5, 0.5, 0.0, -1.0, 0.0, -0.5, -0.5, 0.5, 0.0, -1.0, 0.0, -0.5,
    0.5, -0.5, 0.0, 1.0, 0.0, 0.5, 0.5, -0.5, 0.0, 1.0, 0.0, 0.5, 0.5, 0.5, 0.0, 1.0, 0.0, -0.5,
    0.5, 0.5, 0.0, 1.0, 0.0,
];

pub(crate) const CUBE_INDICES: &[u32] = &[
    0, 1, 2, 0, 2, 3, // front
    4, 6, 5, 4, 7, 6, // back
    8, 9, 10, 8, 10, 11, // left
    12, 14, 13, 12, 15, 14, // right
    16, 18, 17, 16, 19, 18, // bottom
    20, 21, 22, 20, 22, 23, // top
];
