//! Parallel CPU rasterizer (C5, spec §4.5).
//!
//! Clips each triangle in clip space, projects to screen space, culls
//! backfaces, then scans its screen-space bounding box with a
//! perspective-correct barycentric test, row-partitioning the scan across a
//! [`JobSystem`] when the triangle is large enough to be worth it.

use glam::{Affine3A, Mat4, Vec2, Vec3, Vec4};

use crate::job::{parallel_for_rows, JobSystem};
use crate::raster::clip::{clip_polygon, fan_triangulate, RasterVertex};
use crate::raster::shader::{FragmentIn, ShaderProgram, ShaderUniforms, ShaderVertex, VertexOut};
use crate::registry::Mesh;

/// Which winding order a backface is, mirroring the original's
/// `RasterizerCullMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterizerCullMode {
    None,
    #[default]
    Back,
    Front,
}

/// Tunables for [`rasterize_mesh`].
#[derive(Debug, Clone, Copy)]
pub struct RasterizerConfig {
    pub cull_mode: RasterizerCullMode,
    pub front_face_ccw: bool,
    /// Minimum row span before a triangle's scan is worth splitting across
    /// the job system at all.
    pub parallel_min_rows: i64,
    /// Minimum screen-space pixel area (bbox w*h) before parallelizing.
    pub parallel_min_pixels: i64,
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self { cull_mode: RasterizerCullMode::Back, front_face_ccw: true, parallel_min_rows: 8, parallel_min_pixels: 128 * 128 }
    }
}

/// Per-call counters, accumulated into [`crate::context::RenderDebugStats`] by
/// the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterizerStats {
    pub tri_input: u64,
    pub tri_after_clip: u64,
    pub tri_raster: u64,
}

/// The set of buffers a rasterize call writes into. Color is mandatory;
/// depth/motion/aux are optional since occlusion-only and depth-prepass
/// callers don't need all of them. `aux` is a second MRT-style color output
/// (the gbuffer pass's normal+roughness attachment), written under the same
/// depth test as `color` so both stay pixel-consistent without a second
/// pass. Borrowed for the duration of one `rasterize_mesh` call and never
/// retained past it.
pub struct RasterizerTarget<'a> {
    pub width: u32,
    pub height: u32,
    pub color: &'a mut [Vec4],
    pub depth: Option<&'a mut [f32]>,
    pub motion: Option<&'a mut [[f32; 2]]>,
    pub aux: Option<&'a mut [Vec4]>,
}

/// Wraps a raw pointer to row-partitioned buffer storage so it can cross the
/// `JobSystem`'s `Send + 'static` boundary. Each job only ever touches the
/// exclusive row range it was handed; `parallel_for_rows` blocks until every
/// job completes before `rasterize_mesh` returns, so the pointee always
/// outlives every dereference made through it. `Copy` so the same handle can
/// be moved into a fresh `'static` closure on every triangle without being
/// consumed — it is a pointer and a length, not the data itself.
struct RowPtr<T>(*mut T, usize);
unsafe impl<T> Send for RowPtr<T> {}
unsafe impl<T> Sync for RowPtr<T> {}
impl<T> Clone for RowPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for RowPtr<T> {}
impl<T> RowPtr<T> {
    fn from_slice(s: &mut [T]) -> Self {
        Self(s.as_mut_ptr(), s.len())
    }
    /// Safety: caller must guarantee the accessed index lies in a row range
    /// exclusively owned by the calling job.
    #[allow(clippy::mut_from_ref)]
    unsafe fn as_slice(&self) -> &mut [T] {
        std::slice::from_raw_parts_mut(self.0, self.1)
    }
}

/// Same idea as [`RowPtr`], for read-only data borrowed across the closure's
/// `'static` boundary: the per-triangle screen vertices, the shader program,
/// and the uniforms bundle. A raw pointer has no lifetime of its own, so
/// `ConstPtr<T>` satisfies `'static` regardless of lifetimes borrowed inside
/// `T` (e.g. `ShaderUniforms<'a>`'s texture/shadow-map references) — the
/// same escape hatch `RowPtr` uses, just immutable and over a single value
/// instead of a slice.
struct ConstPtr<T: ?Sized>(*const T);
unsafe impl<T: ?Sized> Send for ConstPtr<T> {}
unsafe impl<T: ?Sized> Sync for ConstPtr<T> {}
impl<T: ?Sized> Clone for ConstPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: ?Sized> Copy for ConstPtr<T> {}
impl<T: ?Sized> ConstPtr<T> {
    fn new(r: &T) -> Self {
        Self(r)
    }
    /// Safety: caller must guarantee the pointee still lives. Every use here
    /// is inside a job dispatched by `parallel_for_rows`, which blocks until
    /// all jobs finish before the borrowed frame data can go out of scope.
    unsafe fn get(&self) -> &T {
        unsafe { &*self.0 }
    }
}

fn signed_area2(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Barycentric weights of `p` with respect to triangle `(a, b, c)`, given the
/// triangle's doubled signed area. Returns `None` if the triangle is
/// degenerate.
#[must_use]
pub fn barycentric_2d(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> Option<Vec3> {
    let area2 = signed_area2(a, b, c);
    if area2.abs() < 1e-10 {
        return None;
    }
    let w0 = signed_area2(b, c, p) / area2;
    let w1 = signed_area2(c, a, p) / area2;
    let w2 = 1.0 - w0 - w1;
    Some(Vec3::new(w0, w1, w2))
}

struct ScreenVertex {
    rv: RasterVertex,
    screen: Vec2,
    inv_w: f32,
    view_z: f32,
}

fn to_screen(rv: &RasterVertex, width: u32, height: u32) -> Option<ScreenVertex> {
    let w = rv.clip.w;
    if !w.is_finite() || w.abs() < 1e-8 {
        return None;
    }
    let inv_w = 1.0 / w;
    let ndc = Vec3::new(rv.clip.x * inv_w, rv.clip.y * inv_w, rv.clip.z * inv_w);
    if !ndc.is_finite() {
        return None;
    }
    let sx = (ndc.x * 0.5 + 0.5) * width as f32;
    let sy = (1.0 - (ndc.y * 0.5 + 0.5)) * height as f32;
    Some(ScreenVertex { rv: *rv, screen: Vec2::new(sx, sy), inv_w, view_z: w })
}

/// Rasterizes every triangle of `mesh` (or, if `mesh.indices` is `None`, its
/// vertex stream taken as a flat triangle list) with `program`, writing color
/// (and, when present, depth/motion) into `target`. `model`/`prev_model`
/// populate `uniforms.model`/`prev_model` per-draw; the rest of `uniforms` is
/// caller-prepared.
#[allow(clippy::too_many_arguments)]
pub fn rasterize_mesh(
    jobs: &dyn JobSystem,
    config: &RasterizerConfig,
    mesh: &Mesh,
    program: &dyn ShaderProgram,
    uniforms: &ShaderUniforms,
    model: Affine3A,
    prev_model: Affine3A,
    target: &mut RasterizerTarget,
) -> RasterizerStats {
    let mut stats = RasterizerStats::default();
    let mut uniforms = *uniforms;
    uniforms.model = Mat4::from(model);
    uniforms.prev_model = Mat4::from(prev_model);

    let vertex_count = mesh.vertex_count();
    let tri_indices: Vec<[u32; 3]> = match &mesh.indices {
        Some(idx) => idx.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
        None => (0..vertex_count as u32 / 3).map(|t| [t * 3, t * 3 + 1, t * 3 + 2]).collect(),
    };
    stats.tri_input += tri_indices.len() as u64;

    let fetch_vertex = |i: u32| -> ShaderVertex {
        let i = i as usize;
        ShaderVertex {
            position: mesh.positions.get(i).copied().unwrap_or_default(),
            normal: mesh.normals.get(i).copied().unwrap_or(Vec3::Y),
            uv: mesh.uvs.get(i).copied().unwrap_or_default(),
            color: mesh.colors.get(i).copied().unwrap_or(Vec4::ONE),
            tangent: mesh.tangents.get(i).copied().unwrap_or(Vec4::new(1.0, 0.0, 0.0, 1.0)),
        }
    };

    let width = target.width;
    let height = target.height;

    let color_ptr = RowPtr::from_slice(target.color);
    let depth_ptr = target.depth.as_deref_mut().map(RowPtr::from_slice);
    let motion_ptr = target.motion.as_deref_mut().map(RowPtr::from_slice);
    let aux_ptr = target.aux.as_deref_mut().map(RowPtr::from_slice);
    let program_ptr = ConstPtr::new(program);
    let uniforms_ptr = ConstPtr::new(&uniforms);

    for tri in &tri_indices {
        let verts: [VertexOut; 3] = [
            program.vertex_main(&fetch_vertex(tri[0]), &uniforms),
            program.vertex_main(&fetch_vertex(tri[1]), &uniforms),
            program.vertex_main(&fetch_vertex(tri[2]), &uniforms),
        ];
        let raster_verts: [RasterVertex; 3] = [RasterVertex::from(&verts[0]), RasterVertex::from(&verts[1]), RasterVertex::from(&verts[2])];

        let clipped = clip_polygon(&raster_verts);
        if clipped.len() < 3 {
            continue;
        }
        for sub_tri in fan_triangulate(&clipped) {
            stats.tri_after_clip += 1;
            let screen: Option<Vec<ScreenVertex>> = sub_tri.iter().map(|v| to_screen(v, width, height)).collect();
            let Some(screen) = screen else { continue };
            let [sv0, sv1, sv2] = [&screen[0], &screen[1], &screen[2]];
            let [sv0_ptr, sv1_ptr, sv2_ptr] = [ConstPtr::new(sv0), ConstPtr::new(sv1), ConstPtr::new(sv2)];

            let area2 = signed_area2(sv0.screen, sv1.screen, sv2.screen);
            if area2.abs() < 1e-6 {
                continue;
            }
            let is_front = if config.front_face_ccw { area2 < 0.0 } else { area2 > 0.0 };
            match config.cull_mode {
                RasterizerCullMode::Back if !is_front => continue,
                RasterizerCullMode::Front if is_front => continue,
                _ => {}
            }

            let min_x = sv0.screen.x.min(sv1.screen.x).min(sv2.screen.x).floor().max(0.0) as i64;
            let max_x = sv0.screen.x.max(sv1.screen.x).max(sv2.screen.x).ceil().min(width as f32) as i64;
            let min_y = sv0.screen.y.min(sv1.screen.y).min(sv2.screen.y).floor().max(0.0) as i64;
            let max_y = sv0.screen.y.max(sv1.screen.y).max(sv2.screen.y).ceil().min(height as f32) as i64;
            if min_x >= max_x || min_y >= max_y {
                continue;
            }
            stats.tri_raster += 1;

            let row_span = max_y - min_y;
            let pixel_area = (max_x - min_x) * row_span;
            let worth_parallel = jobs.worker_count() > 1 && row_span >= config.parallel_min_rows && pixel_area >= config.parallel_min_pixels;

            // `move`-captured so the closure owns only `Copy` pointer
            // handles (no borrowed references), which is what makes it
            // `Send + Sync + 'static` and usable as `parallel_for_rows`'s
            // job body instead of only the inline fallback below.
            let rasterize_rows = move |y0: i64, y1: i64| {
                // Safety: each invocation of this closure is handed a
                // disjoint [y0, y1) range by `parallel_for_rows`, and the
                // row pointers never escape this call.
                let color = unsafe { color_ptr.as_slice() };
                let depth = depth_ptr.as_ref().map(|p| unsafe { p.as_slice() });
                let motion = motion_ptr.as_ref().map(|p| unsafe { p.as_slice() });
                let aux = aux_ptr.as_ref().map(|p| unsafe { p.as_slice() });
                rasterize_triangle_rows(
                    y0,
                    y1,
                    min_x,
                    max_x,
                    width,
                    height,
                    unsafe { sv0_ptr.get() },
                    unsafe { sv1_ptr.get() },
                    unsafe { sv2_ptr.get() },
                    unsafe { program_ptr.get() },
                    unsafe { uniforms_ptr.get() },
                    color,
                    depth,
                    motion,
                    aux,
                );
            };

            if worth_parallel {
                parallel_for_rows(jobs, min_y, max_y, (row_span / jobs.worker_count() as i64).max(1), rasterize_rows);
            } else {
                rasterize_rows(min_y, max_y);
            }
        }
    }

    stats
}

#[allow(clippy::too_many_arguments)]
fn rasterize_triangle_rows(
    y0: i64,
    y1: i64,
    min_x: i64,
    max_x: i64,
    width: u32,
    height: u32,
    sv0: &ScreenVertex,
    sv1: &ScreenVertex,
    sv2: &ScreenVertex,
    program: &dyn ShaderProgram,
    uniforms: &ShaderUniforms,
    color: &mut [Vec4],
    mut depth: Option<&mut [f32]>,
    mut motion: Option<&mut [[f32; 2]]>,
    mut aux: Option<&mut [Vec4]>,
) {
    for py in y0..y1 {
        for px in min_x..max_x {
            let sample = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
            let Some(bary) = barycentric_2d(sample, sv0.screen, sv1.screen, sv2.screen) else { continue };
            if bary.x < 0.0 || bary.y < 0.0 || bary.z < 0.0 {
                continue;
            }

            // Perspective-correct interpolation: weight by 1/w, then
            // renormalize.
            let iw0 = bary.x * sv0.inv_w;
            let iw1 = bary.y * sv1.inv_w;
            let iw2 = bary.z * sv2.inv_w;
            let iw_sum = iw0 + iw1 + iw2;
            if iw_sum.abs() < 1e-12 {
                continue;
            }
            let (c0, c1, c2) = (iw0 / iw_sum, iw1 / iw_sum, iw2 / iw_sum);

            let ndc_z = bary.x * (sv0.rv.clip.z / sv0.rv.clip.w) + bary.y * (sv1.rv.clip.z / sv1.rv.clip.w) + bary.z * (sv2.rv.clip.z / sv2.rv.clip.w);
            let depth01 = (ndc_z * 0.5 + 0.5).clamp(0.0, 1.0);

            let offset = (py as u32 * width + px as u32) as usize;
            if let Some(depth_buf) = depth.as_deref_mut() {
                if depth01 >= depth_buf[offset] {
                    continue;
                }
            }

            let mut varyings = [Vec4::ZERO; crate::raster::shader::SHS_MAX_VARYINGS];
            for i in 0..varyings.len() {
                varyings[i] = sv0.rv.varyings[i] * c0 + sv1.rv.varyings[i] * c1 + sv2.rv.varyings[i] * c2;
            }
            let fin = FragmentIn {
                varyings,
                varying_mask: sv0.rv.varying_mask | sv1.rv.varying_mask | sv2.rv.varying_mask,
                world_pos: sv0.rv.world_pos * c0 + sv1.rv.world_pos * c1 + sv2.rv.world_pos * c2,
                normal_ws: (sv0.rv.normal_ws * c0 + sv1.rv.normal_ws * c1 + sv2.rv.normal_ws * c2).normalize_or_zero(),
                uv: sv0.rv.uv * c0 + sv1.rv.uv * c1 + sv2.rv.uv * c2,
                depth01,
                px: px as i32,
                py: py as i32,
            };

            let frag = program.fragment_main(&fin, uniforms);
            if frag.discard {
                continue;
            }

            color[offset] = frag.color;
            if let Some(aux_buf) = aux.as_deref_mut() {
                aux_buf[offset] = frag.aux;
            }
            if let Some(depth_buf) = depth.as_deref_mut() {
                depth_buf[offset] = depth01;
            }
            if let Some(motion_buf) = motion.as_deref_mut() {
                if uniforms.enable_motion_vectors {
                    motion_buf[offset] = motion_vector(sv0, sv1, sv2, c0, c1, c2, uniforms, width, height);
                }
            }
        }
    }
}

/// Screen-space motion between this frame and the previous one for the
/// current fragment, computed by re-projecting the interpolated world
/// position with last frame's model/view-proj and differencing NDC, then
/// scaling to pixels and halving (NDC spans `[-1,1]`, pixels span
/// `[0,width]`). Clamped to 96px per axis so a disocclusion or a teleport
/// can't blow up a downstream motion-blur kernel.
fn motion_vector(sv0: &ScreenVertex, sv1: &ScreenVertex, sv2: &ScreenVertex, c0: f32, c1: f32, c2: f32, uniforms: &ShaderUniforms, width: u32, height: u32) -> [f32; 2] {
    let world_pos = sv0.rv.world_pos * c0 + sv1.rv.world_pos * c1 + sv2.rv.world_pos * c2;
    let curr_clip = uniforms.viewproj * world_pos.extend(1.0);
    let prev_clip = uniforms.prev_viewproj * uniforms.prev_model * uniforms.model.inverse() * world_pos.extend(1.0);
    if curr_clip.w.abs() < 1e-8 || prev_clip.w.abs() < 1e-8 {
        return [0.0, 0.0];
    }
    let curr_ndc = curr_clip.truncate() / curr_clip.w;
    let prev_ndc = prev_clip.truncate() / prev_clip.w;
    let delta_ndc = curr_ndc.truncate() - prev_ndc.truncate();
    let mx = delta_ndc.x * 0.5 * width as f32;
    let my = -delta_ndc.y * 0.5 * height as f32;
    [mx.clamp(-96.0, 96.0), my.clamp(-96.0, 96.0)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::InlineJobSystem;
    use crate::raster::shader::{default_vertex_out, FragmentOut};

    struct FlatRed;
    impl ShaderProgram for FlatRed {
        fn vertex_main(&self, vin: &ShaderVertex, u: &ShaderUniforms) -> VertexOut {
            default_vertex_out(vin, u)
        }
        fn fragment_main(&self, _fin: &FragmentIn, _u: &ShaderUniforms) -> FragmentOut {
            FragmentOut { color: Vec4::new(1.0, 0.0, 0.0, 1.0), aux: Vec4::ZERO, discard: false }
        }
    }

    #[test]
    fn fullscreen_triangle_writes_every_covered_pixel() {
        let mesh = Mesh {
            positions: vec![Vec3::new(-1.0, -1.0, 0.0), Vec3::new(3.0, -1.0, 0.0), Vec3::new(-1.0, 3.0, 0.0)],
            normals: vec![Vec3::Z; 3],
            ..Default::default()
        };
        let uniforms = ShaderUniforms { viewproj: Mat4::IDENTITY, ..Default::default() };
        let mut color = vec![Vec4::ZERO; 16 * 16];
        let mut target = RasterizerTarget { width: 16, height: 16, color: &mut color, depth: None, motion: None, aux: None };
        let jobs = InlineJobSystem;
        let stats = rasterize_mesh(&jobs, &RasterizerConfig::default(), &mesh, &FlatRed, &uniforms, Affine3A::IDENTITY, Affine3A::IDENTITY, &mut target);
        assert_eq!(stats.tri_input, 1);
        assert!(stats.tri_raster >= 1);
        assert!(color.iter().filter(|c| c.x > 0.5).count() > 200);
    }

    #[test]
    fn backface_culled_by_default() {
        let mesh = Mesh {
            positions: vec![Vec3::new(-1.0, -1.0, 0.0), Vec3::new(-1.0, 3.0, 0.0), Vec3::new(3.0, -1.0, 0.0)],
            normals: vec![Vec3::Z; 3],
            ..Default::default()
        };
        let uniforms = ShaderUniforms { viewproj: Mat4::IDENTITY, ..Default::default() };
        let mut color = vec![Vec4::ZERO; 16 * 16];
        let mut target = RasterizerTarget { width: 16, height: 16, color: &mut color, depth: None, motion: None, aux: None };
        let jobs = InlineJobSystem;
        rasterize_mesh(&jobs, &RasterizerConfig::default(), &mesh, &FlatRed, &uniforms, Affine3A::IDENTITY, Affine3A::IDENTITY, &mut target);
        assert!(color.iter().all(|c| c.x < 0.5));
    }

    #[test]
    fn barycentric_2d_sums_to_one_inside_triangle() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        let c = Vec2::new(0.0, 10.0);
        let w = barycentric_2d(Vec2::new(2.0, 2.0), a, b, c).unwrap();
        assert!((w.x + w.y + w.z - 1.0).abs() < 1e-5);
    }
}
