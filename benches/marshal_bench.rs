//! Marshaling throughput benchmarks.
//!
//! - Flat copies of blittable vertex data in both directions
//! - Full scene build and read-back through native memory
//!
//! ```bash
//! cargo bench --bench marshal_bench
//! ```

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use glam::Vec3;

use asset_bridge::marshal::{Marshalable, NativeBox};
use asset_bridge::memory::{self, ArrayKind, raw};
use asset_bridge::native::PrimitiveType;
use asset_bridge::native::types::{AiScene, AiVector3D};
use asset_bridge::scene::{Face, Mesh, Scene};

fn vertices(count: usize) -> Vec<AiVector3D> {
    (0..count)
        .map(|i| AiVector3D::from(Vec3::splat(i as f32)))
        .collect()
}

fn grid_scene(meshes: usize, vertices_per_mesh: usize) -> Scene {
    let mut scene = Scene::new();
    let root = scene.create_root("root");
    for m in 0..meshes {
        let mut mesh = Mesh::new(&format!("mesh_{m}"), PrimitiveType::TRIANGLE);
        mesh.vertices = (0..vertices_per_mesh).map(|i| Vec3::new(i as f32, m as f32, 0.0)).collect();
        mesh.normals = vec![Vec3::Z; vertices_per_mesh];
        mesh.faces = (0..vertices_per_mesh as u32 / 3)
            .map(|f| Face::new(&[f * 3, f * 3 + 1, f * 3 + 2]))
            .collect();
        scene.meshes.push(mesh);

        let node = scene.add_child(root, &format!("node_{m}"));
        if let Some(node) = scene.node_mut(node) {
            node.mesh_indices = vec![m as u32];
        }
    }
    scene
}

fn bench_blittable_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshal_array");
    for count in [1_000usize, 100_000] {
        let data = vertices(count);
        group.throughput(Throughput::Bytes((count * raw::size_of::<AiVector3D>()) as u64));

        group.bench_with_input(BenchmarkId::new("to_native", count), &data, |b, data| {
            b.iter(|| {
                let ptr = memory::to_native_array_blittable(black_box(data));
                unsafe { memory::free_memory(ptr) };
            });
        });

        let native = memory::to_native_array_blittable(&data);
        group.bench_with_input(BenchmarkId::new("from_native", count), &count, |b, &count| {
            b.iter(|| {
                let out: Vec<AiVector3D> =
                    unsafe { memory::marshal_array(native.cast_const().cast(), count, ArrayKind::Flat) }.unwrap();
                black_box(out)
            });
        });
        unsafe { memory::free_memory(native) };
    }
    group.finish();
}

fn bench_scene(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene");
    let scene = grid_scene(64, 3_000);

    group.bench_function("to_native", |b| {
        b.iter(|| black_box(NativeBox::new(black_box(&scene)).unwrap()));
    });

    let native = NativeBox::new(&scene).unwrap();
    group.bench_function("from_native", |b| {
        b.iter(|| {
            let raw_scene: AiScene = unsafe { raw::read(native.as_ptr().cast()) };
            black_box(unsafe { Scene::from_native(&raw_scene) }.unwrap())
        });
    });
    group.finish();
}

criterion_group!(benches, bench_blittable_arrays, bench_scene);
criterion_main!(benches);
