/// WGSL shader for lit meshes, wireframe and normal lines, and points.
///
/// Lighting is metallic-roughness with up to 8 directional lights, the first
/// 4 of which may carry a shadow map layer. Output is gamma encoded.
pub const SCENE_SHADER: &str = r#"
const PI: f32 = 3.14159265;
const MAX_LIGHTS: u32 = 8u;

struct Light {
    // xyz: travel direction, w: shadow layer or -1
    direction: vec4<f32>,
    radiance: vec4<f32>,
    view_proj: mat4x4<f32>,
};

struct Globals {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    ambient: vec4<f32>,
    // width, height, point size, light count
    viewport: vec4<f32>,
    lights: array<Light, 8>,
};

struct Draw {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    base_color: vec4<f32>,
    // metallic, roughness, unlit, unused
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;
@group(0) @binding(1)
var shadow_maps: texture_depth_2d_array;
@group(0) @binding(2)
var shadow_sampler: sampler_comparison;

@group(1) @binding(0)
var<uniform> draw: Draw;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world = draw.model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = globals.view_proj * world;
    out.world_pos = world.xyz;
    out.world_normal = (draw.normal_matrix * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.color = vertex.color;
    return out;
}

@vertex
fn vs_point(@builtin(vertex_index) corner: u32, vertex: VertexInput) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let world = draw.model * vec4<f32>(vertex.position, 1.0);
    var clip = globals.view_proj * world;
    let offset = corners[corner] * globals.viewport.z / globals.viewport.xy;
    clip = vec4<f32>(clip.xy + offset * clip.w, clip.zw);

    var out: VertexOutput;
    out.clip_position = clip;
    out.world_pos = world.xyz;
    out.world_normal = vec3<f32>(0.0, 0.0, 0.0);
    out.color = vertex.color;
    return out;
}

fn srgb_to_linear(c: vec3<f32>) -> vec3<f32> {
    return pow(c, vec3<f32>(2.2));
}

fn linear_to_srgb(c: vec3<f32>) -> vec3<f32> {
    return pow(c, vec3<f32>(1.0 / 2.2));
}

fn distribution_ggx(n_dot_h: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    return a2 / (PI * d * d);
}

fn visibility_smith(n_dot_l: f32, n_dot_v: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let gl = n_dot_v * sqrt(n_dot_l * n_dot_l * (1.0 - a2) + a2);
    let gv = n_dot_l * sqrt(n_dot_v * n_dot_v * (1.0 - a2) + a2);
    return 0.5 / max(gl + gv, 1e-5);
}

fn fresnel_schlick(f0: vec3<f32>, v_dot_h: f32) -> vec3<f32> {
    return f0 + (vec3<f32>(1.0) - f0) * pow(1.0 - v_dot_h, 5.0);
}

fn shadow_factor(light: Light, world_pos: vec3<f32>, n_dot_l: f32) -> f32 {
    let layer = i32(light.direction.w);
    if (layer < 0) {
        return 1.0;
    }
    let p = light.view_proj * vec4<f32>(world_pos, 1.0);
    let ndc = p.xyz / p.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    if (uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 || ndc.z > 1.0) {
        return 1.0;
    }
    let bias = max(0.005 * (1.0 - n_dot_l), 0.0005);
    return textureSampleCompareLevel(shadow_maps, shadow_sampler, uv, layer, ndc.z - bias);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let base = draw.base_color * vec4<f32>(srgb_to_linear(in.color.rgb), in.color.a);
    if (draw.params.z > 0.5) {
        return vec4<f32>(linear_to_srgb(base.rgb), base.a);
    }

    let n = normalize(in.world_normal);
    let v = normalize(globals.camera_pos.xyz - in.world_pos);
    let metallic = clamp(draw.params.x, 0.0, 1.0);
    let roughness = clamp(draw.params.y, 0.04, 1.0);
    let alpha = roughness * roughness;
    let f0 = mix(vec3<f32>(0.04), base.rgb, metallic);
    let c_diff = mix(base.rgb * 0.96, vec3<f32>(0.0), metallic);
    let n_dot_v = clamp(abs(dot(n, v)), 1e-4, 1.0);

    var color = globals.ambient.rgb * base.rgb;
    let count = min(u32(globals.viewport.w), MAX_LIGHTS);
    for (var i = 0u; i < count; i = i + 1u) {
        let light = globals.lights[i];
        let l = normalize(-light.direction.xyz);
        let n_dot_l = dot(n, l);
        if (n_dot_l <= 0.0) {
            continue;
        }
        let h = normalize(l + v);
        let n_dot_h = clamp(dot(n, h), 0.0, 1.0);
        let v_dot_h = clamp(dot(v, h), 0.0, 1.0);

        let f = fresnel_schlick(f0, v_dot_h);
        let diffuse = (vec3<f32>(1.0) - f) * c_diff / PI;
        let specular = f * visibility_smith(n_dot_l, n_dot_v, alpha) * distribution_ggx(n_dot_h, alpha);
        let shadow = shadow_factor(light, in.world_pos, n_dot_l);
        color += (diffuse + specular) * light.radiance.rgb * n_dot_l * shadow;
    }

    return vec4<f32>(linear_to_srgb(color), base.a);
}
"#;

/// WGSL shader for rendering shadow-map depth from a light's point of view.
pub const SHADOW_SHADER: &str = r#"
struct ShadowPass {
    view_proj: mat4x4<f32>,
};

struct Draw {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    base_color: vec4<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> pass_uniforms: ShadowPass;

@group(1) @binding(0)
var<uniform> draw: Draw;

@vertex
fn vs_shadow(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return pass_uniforms.view_proj * draw.model * vec4<f32>(position, 1.0);
}
"#;

/// WGSL shader copying depth texels into an `R32Uint` color target, for
/// adapters that cannot copy depth textures to buffers.
pub const DEPTH_RESOLVE_SHADER: &str = r#"
@group(0) @binding(0)
var depth_texture: texture_depth_2d;

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    return vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
}

@fragment
fn fs_depth_bits(@builtin(position) frag: vec4<f32>) -> @location(0) u32 {
    let depth = textureLoad(depth_texture, vec2<i32>(frag.xy), 0);
    return bitcast<u32>(depth);
}
"#;
