//! Asset Context Tests
//!
//! Tests for:
//! - Import from file and memory through a mock native library
//! - Root transform patched before post-processing
//! - Release of native scene and property store on every path
//! - Export to file and to blob chains, and direct conversions
//! - Format queries, settings, log streams and the custom file system

mod common;

use std::sync::Arc;

use glam::{Mat4, Vec3};
use parking_lot::Mutex;

use asset_bridge::config::keys;
use asset_bridge::native::TextureType;
use asset_bridge::{
    AssetContext, BridgeError, FileIoSystem, LogStream, PostProcessSteps, PropertyConfig, RootTransform, Scene,
};

use common::{MockLibrary, MockState, MockValue, TempDir, fixture_scene, init_logger};

fn context() -> (AssetContext<MockLibrary>, Arc<Mutex<MockState>>) {
    init_logger();
    let library = MockLibrary::new(fixture_scene());
    let state = Arc::clone(&library.state);
    (AssetContext::new(library), state)
}

fn assert_released(state: &Mutex<MockState>) {
    let state = state.lock();
    assert_eq!(state.imports, state.releases, "native scenes leaked");
    assert_eq!(state.stores_created, state.stores_released, "property stores leaked");
}

// ============================================================================
// Import
// ============================================================================

#[test]
fn import_file_copies_the_native_scene() {
    let (ctx, state) = context();
    let dir = TempDir::new("import");
    let path = dir.write("model.obj", b"v 0 0 0");

    let scene = ctx.import_file(&path, PostProcessSteps::empty()).unwrap();
    assert_eq!(scene.node_count(), 4);
    assert_eq!(scene.meshes[0].name, "triangle");
    assert_eq!(
        scene.materials[0].texture_path(TextureType::Diffuse, 0).as_deref(),
        Some("skin.png")
    );
    assert!(state.lock().post_processed.is_empty());
    assert_released(&state);
}

#[test]
fn missing_file_fails_before_native_call() {
    let (ctx, state) = context();
    let result = ctx.import_file("/definitely/not/here.obj", PostProcessSteps::empty());
    assert!(matches!(result, Err(BridgeError::FileNotFound(_))));
    assert_eq!(state.lock().stores_created, 0);
}

#[test]
fn import_failure_carries_native_message() {
    let (ctx, state) = context();
    state.lock().fail_import = true;
    let result = ctx.import_from_memory(b"garbage", "xyz", PostProcessSteps::empty());
    match result {
        Err(BridgeError::ImportFailed { message }) => assert!(message.contains("unsupported format")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_released(&state);
}

#[test]
fn import_from_memory_passes_hint_without_dot() {
    let (ctx, state) = context();
    let scene = ctx
        .import_from_memory(b"solid cube", ".stl", PostProcessSteps::empty())
        .unwrap();
    assert_eq!(scene.cameras.len(), 1);
    assert_eq!(state.lock().last_hint, "stl");
    assert_eq!(state.lock().bytes_read, b"solid cube");

    let empty = ctx.import_from_memory(&[], "stl", PostProcessSteps::empty());
    assert!(matches!(empty, Err(BridgeError::InvalidArgument(_))));
}

#[test]
fn root_transform_is_patched_before_post_processing() {
    let (mut ctx, state) = context();
    ctx.set_root_transform(RootTransform::from_scale(2.0));
    let flags = PostProcessSteps::TRIANGULATE | PostProcessSteps::GEN_NORMALS;

    let scene = ctx.import_from_memory(b"data", "obj", flags).unwrap();

    let expected = Mat4::from_scale(Vec3::splat(2.0));
    assert_eq!(state.lock().root_at_post_process, Some(expected));
    assert_eq!(state.lock().post_processed, vec![flags]);
    assert_eq!(scene.node(scene.root().unwrap()).unwrap().transform, expected);
    assert_released(&state);
}

#[test]
fn post_processing_failure_does_not_double_release() {
    let (ctx, state) = context();
    state.lock().fail_post_processing = true;
    let result = ctx.import_from_memory(b"data", "obj", PostProcessSteps::TRIANGULATE);
    assert!(matches!(result, Err(BridgeError::ImportFailed { .. })));
    // The library released the scene itself; the context must not again.
    assert_released(&state);
}

#[test]
fn settings_reach_the_property_store() {
    let (mut ctx, state) = context();
    ctx.set_config(keys::MAX_BONE_WEIGHTS, PropertyConfig::Integer(4));
    ctx.set_config(keys::GLOBAL_SMOOTH_NORMALS_ANGLE, PropertyConfig::Float(66.0));
    ctx.set_config(keys::FAVOR_SPEED, PropertyConfig::Boolean(true));
    ctx.set_config(keys::OPTIMIZE_GRAPH_EXCLUDE_LIST, PropertyConfig::String("keep_me".into()));

    ctx.import_from_memory(b"data", "obj", PostProcessSteps::empty()).unwrap();
    {
        let state = state.lock();
        let configs = &state.last_configs;
        assert_eq!(configs.len(), 4);
        assert_eq!(configs[keys::MAX_BONE_WEIGHTS], MockValue::Integer(4));
        assert_eq!(configs[keys::GLOBAL_SMOOTH_NORMALS_ANGLE], MockValue::Float(66.0));
        assert_eq!(configs[keys::FAVOR_SPEED], MockValue::Integer(1));
        assert_eq!(configs[keys::OPTIMIZE_GRAPH_EXCLUDE_LIST], MockValue::String("keep_me".into()));
    }

    ctx.clear_configs();
    ctx.import_from_memory(b"data", "obj", PostProcessSteps::empty()).unwrap();
    assert!(state.lock().last_configs.is_empty());
    assert_released(&state);
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn export_file_marshals_the_managed_scene() {
    let (ctx, state) = context();
    let mut scene = fixture_scene();
    scene.meshes[0].name = "renamed".into();

    ctx.export_file(&scene, "out/model.obj", "obj", PostProcessSteps::empty())
        .unwrap();

    let state = state.lock();
    let (format, path, exported) = &state.exports[0];
    assert_eq!(format, "obj");
    assert_eq!(path, "out/model.obj");
    assert_eq!(exported.meshes[0].name, "renamed");
    assert_eq!(exported.node_count(), scene.node_count());
}

#[test]
fn unknown_export_format_is_reported() {
    let (ctx, _) = context();
    let result = ctx.export_file(&Scene::new(), "out.xyz", "xyz", PostProcessSteps::empty());
    match result {
        Err(BridgeError::ExportFailed { message }) => assert!(message.contains("xyz")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn export_to_blob_copies_the_whole_chain() {
    let (ctx, state) = context();
    let blob = ctx
        .export_to_blob(&fixture_scene(), "obj", PostProcessSteps::empty())
        .unwrap();

    assert_eq!(blob.data, b"# obj");
    assert!(blob.has_next());
    let names: Vec<_> = blob.iter().map(|b| b.name.clone()).collect();
    assert_eq!(names, vec![String::new(), "mtl".to_owned()]);
    assert_eq!(blob.next.as_ref().unwrap().data, b"newmtl skin");

    let state = state.lock();
    assert_eq!(state.blobs_created, 1);
    assert_eq!(state.blobs_released, 1);
}

#[cfg(any(debug_assertions, feature = "alloc-tracking"))]
#[test]
fn export_releases_native_scene() {
    let (ctx, _) = context();
    let scene = fixture_scene();
    let baseline = asset_bridge::memory::thread_live_allocations();
    ctx.export_file(&scene, "a.obj", "obj", PostProcessSteps::empty()).unwrap();
    ctx.export_to_blob(&scene, "obj", PostProcessSteps::empty()).unwrap();
    assert!(ctx.export_file(&scene, "a.xyz", "xyz", PostProcessSteps::empty()).is_err());
    assert_eq!(asset_bridge::memory::thread_live_allocations(), baseline);
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn convert_memory_exports_the_imported_scene() {
    let (mut ctx, state) = context();
    ctx.set_root_transform(RootTransform::from_scale(0.5));

    ctx.convert_memory_to_file(
        b"data",
        "fbx",
        PostProcessSteps::empty(),
        "converted.dae",
        "collada",
        PostProcessSteps::empty(),
    )
    .unwrap();

    let state_guard = state.lock();
    let (format, _, exported) = &state_guard.exports[0];
    assert_eq!(format, "collada");
    let root = exported.node(exported.root().unwrap()).unwrap();
    assert_eq!(root.transform, Mat4::from_scale(Vec3::splat(0.5)));
    drop(state_guard);
    assert_released(&state);
}

#[test]
fn convert_file_to_blob_releases_everything() {
    let (ctx, state) = context();
    let dir = TempDir::new("convert");
    let path = dir.write("in.fbx", b"fbx");

    let blob = ctx
        .convert_file_to_blob(&path, PostProcessSteps::TRIANGULATE, "obj", PostProcessSteps::empty())
        .unwrap();
    assert_eq!(blob.iter().count(), 2);

    let blob = ctx.convert_memory_to_blob(b"x", "fbx", PostProcessSteps::empty(), "obj", PostProcessSteps::empty());
    assert!(blob.is_ok());

    let out = dir.path().join("out.obj");
    ctx.convert_file_to_file(&path, PostProcessSteps::empty(), &out, "obj", PostProcessSteps::empty())
        .unwrap();

    assert_released(&state);
    assert_eq!(state.lock().blobs_released, 2);
}

// ============================================================================
// Queries, logging, custom file system
// ============================================================================

#[test]
fn format_queries() {
    let (ctx, _) = context();
    assert_eq!(ctx.supported_import_formats(), vec![".obj", ".fbx", ".dae"]);
    assert!(ctx.is_import_format_supported("obj").unwrap());
    assert!(ctx.is_import_format_supported(".dae").unwrap());
    assert!(!ctx.is_import_format_supported("blend").unwrap());

    let exports = ctx.supported_export_formats();
    assert_eq!(exports.len(), 2);
    assert_eq!(exports[1].format_id, "collada");
    assert_eq!(exports[1].file_extension, "dae");
    assert!(ctx.is_export_format_supported("obj"));
    assert!(!ctx.is_export_format_supported("stl"));
}

#[test]
fn log_streams_attach_and_detach() {
    let (mut ctx, state) = context();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    ctx.attach_log_stream(LogStream::with_callback(move |msg| sink.lock().push(msg.to_owned())));
    ctx.attach_log_stream(LogStream::new());

    assert_eq!(ctx.log_stream_count(), 2);
    assert_eq!(state.lock().attached_streams.len(), 2);
    assert_eq!(*seen.lock(), vec!["Info,  T0: Logger attached".to_owned()]);

    ctx.set_verbose_logging(true);
    assert!(state.lock().verbose);
    assert!(ctx.is_verbose_logging());

    drop(ctx);
    assert!(state.lock().attached_streams.is_empty());
}

#[test]
fn custom_io_system_serves_the_importer() {
    let (mut ctx, state) = context();
    let dir = TempDir::new("io");
    dir.write("model.obj", b"v 1 2 3");
    ctx.set_io_system(FileIoSystem::new([dir.path()]));
    assert!(ctx.has_io_system());

    // Resolved against the search directory, not the working directory.
    ctx.import_file("model.obj", PostProcessSteps::empty()).unwrap();
    assert_eq!(state.lock().bytes_read, b"v 1 2 3");

    let missing = ctx.import_file("other.obj", PostProcessSteps::empty());
    assert!(matches!(missing, Err(BridgeError::FileNotFound(_))));
    assert_released(&state);
}

#[test]
fn custom_io_system_receives_exports() {
    let (mut ctx, _) = context();
    let dir = TempDir::new("io-export");
    ctx.set_io_system(FileIoSystem::new([dir.path()]));

    ctx.export_file(&fixture_scene(), "written.obj", "obj", PostProcessSteps::empty())
        .unwrap();
    let written = std::fs::read(dir.path().join("written.obj")).unwrap();
    assert_eq!(written, b"exported obj");

    ctx.remove_io_system();
    assert!(!ctx.has_io_system());
}
