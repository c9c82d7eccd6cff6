use vizij_scene_core::{AttrValue, NodeKind, ScenePath, Stage};
use vizij_skel_core::{CacheConfig, SkelCache};

fn p(s: &str) -> ScenePath {
    ScenePath::parse(s).expect("valid path")
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A root with many children, each holding a skeleton and meshes bound either
/// to their sibling skeleton or to a shared top-level one.
fn wide_stage(root: &str, children: usize) -> Stage {
    let mut stage = Stage::new();
    stage.define("/Shared", NodeKind::Skeleton).expect("shared skel");
    stage.define(root, NodeKind::Root).expect("root");
    for i in 0..children {
        let group = format!("{root}/Group{i}");
        stage.define(&group, NodeKind::Other).expect("group");
        stage
            .set_attribute(&group, "primvars:skel:jointIndices", AttrValue::IntArray(vec![0]))
            .expect("indices");
        stage
            .set_attribute(&group, "primvars:skel:jointWeights", AttrValue::FloatArray(vec![1.0]))
            .expect("weights");

        let skel = format!("{group}/Skel");
        stage.define(&skel, NodeKind::Skeleton).expect("skel");
        let shared = format!("{group}/SharedMesh");
        stage.define(&shared, NodeKind::Skinnable).expect("mesh");
        stage
            .set_relationship(&shared, "skel:skeleton", &["/Shared"])
            .expect("bind shared");
        let local = format!("{group}/LocalMesh");
        stage.define(&local, NodeKind::Skinnable).expect("mesh");
        stage
            .set_relationship(&local, "skel:skeleton", &[skel.as_str()])
            .expect("bind local");
        if i % 3 == 0 {
            stage.set_active(&local, false).expect("deactivate");
        }
    }
    stage
}

#[test]
fn parallel_walk_matches_sequential_walk() {
    init_logging();
    let stage = wide_stage("/Wide", 16);
    let root = p("/Wide");

    let sequential = SkelCache::new();
    assert!(sequential.populate(&stage, &root));
    let parallel = SkelCache::with_config(CacheConfig {
        worker_threads: 4,
        min_parallel_children: 2,
        ..CacheConfig::default()
    });
    assert!(parallel.populate(&stage, &root));

    let expected = sequential.compute_skel_bindings(&root);
    assert_eq!(parallel.compute_skel_bindings(&root), expected);

    // Shared skeleton first, then one binding per group with an active local mesh.
    assert_eq!(expected.len(), 1 + 10);
    assert_eq!(expected[0].skeleton().path(), Some(&p("/Shared")));
    assert_eq!(expected[0].skinning_targets().len(), 16);
    assert_eq!(expected[1].skeleton().path(), Some(&p("/Wide/Group1/Skel")));

    for i in 0..16 {
        let skel = p(&format!("/Wide/Group{i}/Skel"));
        assert_eq!(sequential.skel_query(&skel), parallel.skel_query(&skel));
    }
}

#[test]
fn concurrent_populates_of_different_roots_share_one_cache() {
    init_logging();
    let mut stage = wide_stage("/Left", 6);
    stage.define("/Right", NodeKind::Root).expect("root");
    stage.define("/Right/Mesh", NodeKind::Skinnable).expect("mesh");
    stage
        .set_relationship("/Right/Mesh", "skel:skeleton", &["/Shared"])
        .expect("bind");
    stage
        .set_attribute("/Right/Mesh", "primvars:skel:jointIndices", AttrValue::IntArray(vec![0]))
        .expect("indices");
    stage
        .set_attribute("/Right/Mesh", "primvars:skel:jointWeights", AttrValue::FloatArray(vec![1.0]))
        .expect("weights");

    let cache = SkelCache::with_config(CacheConfig {
        worker_threads: 2,
        min_parallel_children: 2,
        ..CacheConfig::default()
    });
    std::thread::scope(|scope| {
        for root in ["/Left", "/Right"] {
            let cache = &cache;
            let stage = &stage;
            scope.spawn(move || {
                for _ in 0..8 {
                    assert!(cache.populate(stage, &p(root)));
                }
            });
        }
    });

    assert!(cache.is_current(&stage, &p("/Left")));
    assert!(cache.is_current(&stage, &p("/Right")));
    assert_eq!(cache.compute_skel_bindings(&p("/Left")).len(), 1 + 4);
    let right = cache.compute_skel_bindings(&p("/Right"));
    assert_eq!(right.len(), 1);
    assert_eq!(right[0].target_paths(), vec![&p("/Right/Mesh")]);
    assert!(cache.skel_query(&p("/Left/Group5/Skel")).is_valid());
    assert!(cache.skel_query(&p("/Shared")).is_valid());
}
