use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Affine3A, Mat4, Vec2, Vec3, Vec4};

use shs::job::{InlineJobSystem, ThreadPoolJobSystem};
use shs::raster::{rasterize_mesh, PbrMetallicRoughnessShader, RasterizerConfig, RasterizerTarget, ShaderUniforms};
use shs::registry::Mesh;

/// A flat `n` x `n` vertex grid of two-triangle quads, facing +Z, in the
/// `[-1, 1]` XY range a default orthographic-looking `viewproj` keeps
/// entirely on screen.
fn grid_mesh(n: u32) -> Mesh {
    let mut positions = Vec::with_capacity((n * n) as usize);
    let mut normals = Vec::with_capacity((n * n) as usize);
    let mut uvs = Vec::with_capacity((n * n) as usize);
    for y in 0..n {
        for x in 0..n {
            let u = x as f32 / (n - 1) as f32;
            let v = y as f32 / (n - 1) as f32;
            positions.push(Vec3::new(u * 2.0 - 1.0, v * 2.0 - 1.0, 0.0));
            normals.push(Vec3::Z);
            uvs.push(Vec2::new(u, v));
        }
    }
    let mut indices = Vec::with_capacity(((n - 1) * (n - 1) * 6) as usize);
    for y in 0..n - 1 {
        for x in 0..n - 1 {
            let i0 = y * n + x;
            let i1 = i0 + 1;
            let i2 = i0 + n;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }
    Mesh { positions, normals, uvs, colors: Vec::new(), tangents: Vec::new(), indices: Some(indices) }
}

fn bench_rasterize_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("rasterize_mesh (grid, pbr shader)");
    let uniforms = ShaderUniforms { viewproj: Mat4::IDENTITY, camera_pos: Vec3::new(0.0, 0.0, 3.0), ..Default::default() };
    let shader = PbrMetallicRoughnessShader;

    for &resolution in &[512u32, 1024] {
        let mesh = grid_mesh(64);
        let mut color = vec![Vec4::ZERO; (resolution * resolution) as usize];
        let mut depth = vec![1.0f32; (resolution * resolution) as usize];

        group.bench_with_input(BenchmarkId::new("inline", resolution), &resolution, |b, &resolution| {
            let jobs = InlineJobSystem;
            b.iter(|| {
                let mut target = RasterizerTarget { width: resolution, height: resolution, color: &mut color, depth: Some(&mut depth), motion: None, aux: None };
                black_box(rasterize_mesh(&jobs, &RasterizerConfig::default(), &mesh, &shader, &uniforms, Affine3A::IDENTITY, Affine3A::IDENTITY, &mut target));
            });
        });

        group.bench_with_input(BenchmarkId::new("thread_pool", resolution), &resolution, |b, &resolution| {
            let jobs = ThreadPoolJobSystem::new(4);
            b.iter(|| {
                let mut target = RasterizerTarget { width: resolution, height: resolution, color: &mut color, depth: Some(&mut depth), motion: None, aux: None };
                black_box(rasterize_mesh(&jobs, &RasterizerConfig::default(), &mesh, &shader, &uniforms, Affine3A::IDENTITY, Affine3A::IDENTITY, &mut target));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_rasterize_grid);
criterion_main!(benches);
