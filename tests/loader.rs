extern crate stockroom;
extern crate tempfile;

mod common;

use std::sync::atomic::Ordering;

use stockroom::errors::Error;
use stockroom::prelude::*;

use common::*;

#[test]
fn single_request() {
    let (mut assets, loads) = manager();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "Tex_Brick.asset", &texture_bytes(64, 32));
    assets.discover("Content", dir.path()).unwrap();

    let a = AssetRef::new();
    let b = AssetRef::new();
    assets.load_async("Tex_Brick", &a).unwrap();
    assets.load_async("Tex_Brick", &b).unwrap();

    assert_eq!(assets.requests_created(), 1);
    assert_eq!(assets.in_flight(), 1);
    assert!(a.is_pending() && b.is_pending());

    wait_until(&mut assets, |_| !a.is_null() && !b.is_null());

    assert_eq!(a, b);
    assert_eq!(a.get(), b.get());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(assets.requests_created(), 1);
    assert_eq!(assets.in_flight(), 0);

    let texture = a.get().unwrap();
    assert_eq!(texture.ref_count(), 2);
    assert!(texture.is_loaded());
    assert_eq!(
        a.with(|v: &Texture| (v.width, v.height, v.created)),
        Some((64, 32, true))
    );
}

#[test]
fn many_requests() {
    let (mut assets, loads) = manager();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "T_Stone.asset", &texture_bytes(8, 8));
    assets.discover("Content", dir.path()).unwrap();

    let handles: Vec<_> = (0..16).map(|_| AssetRef::new()).collect();
    for v in &handles {
        assets.load_async("T_Stone", v).unwrap();
    }

    wait_until(&mut assets, |_| handles.iter().all(|v| !v.is_null()));

    let texture = assets.get("T_Stone").unwrap().get().unwrap();
    for v in &handles {
        assert_eq!(v.get(), Some(texture.clone()));
    }

    assert_eq!(texture.ref_count(), 16);
    assert_eq!(assets.requests_created(), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn loaded_already() {
    let (mut assets, _) = manager();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "T_Stone.asset", &texture_bytes(8, 8));
    assets.discover("Content", dir.path()).unwrap();

    let sync = assets.load_sync("T_Stone").unwrap();

    let handle = AssetRef::new();
    assets.load_async("T_Stone", &handle).unwrap();
    assert_eq!(handle, sync);
    assert!(!handle.is_pending());
    assert_eq!(assets.requests_created(), 0);
}

#[test]
fn dependencies_first() {
    let (mut assets, _) = manager();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "M_Brick.asset", &material_bytes("T_Brick", 7));
    write_file(dir.path(), "T_Brick.asset", &texture_bytes(16, 16));
    assets.discover("Content", dir.path()).unwrap();

    let handle = AssetRef::new();
    assets.load_async("M_Brick", &handle).unwrap();
    wait_until(&mut assets, |_| !handle.is_null());

    let texture = assets.get("T_Brick").unwrap();
    let (ready, roughness, reference) = handle
        .with(|v: &Material| (v.texture_ready, v.roughness, v.texture.clone()))
        .unwrap();

    assert!(ready);
    assert_eq!(roughness, 7);
    assert_eq!(reference, texture);
    assert_eq!(assets.load_state("T_Brick"), Some(LoadState::Finalized));
}

#[test]
fn shared_dependency() {
    let (mut assets, loads) = manager();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "M_Red.asset", &material_bytes("T_Shared", 1));
    write_file(dir.path(), "M_Blue.asset", &material_bytes("T_Shared", 2));
    write_file(dir.path(), "T_Shared.asset", &texture_bytes(4, 4));
    assets.discover("Content", dir.path()).unwrap();

    let red = AssetRef::new();
    let blue = AssetRef::new();
    assets.load_async("M_Red", &red).unwrap();
    assets.load_async("M_Blue", &blue).unwrap();
    wait_until(&mut assets, |_| !red.is_null() && !blue.is_null());

    let lhs = red.with(|v: &Material| v.texture.clone()).unwrap();
    let rhs = blue.with(|v: &Material| v.texture.clone()).unwrap();
    assert!(!lhs.is_null());
    assert_eq!(lhs, rhs);
    assert!(loads.load(Ordering::SeqCst) >= 1);
}

#[test]
fn cycle() {
    let mut settings = AssetSettings::default();
    settings.requeue_limit = 4;

    let (mut assets, _) = manager_with(settings);
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "N_A.asset", &node_bytes("N_B", "a"));
    write_file(dir.path(), "N_B.asset", &node_bytes("N_A", "b"));
    assets.discover("Content", dir.path()).unwrap();

    let handle = AssetRef::new();
    assets.load_async("N_A", &handle).unwrap();
    wait_until(&mut assets, |v| !handle.is_null() && v.in_flight() == 0);

    let a = assets.get("N_A").unwrap();
    let b = assets.get("N_B").unwrap();
    assert_eq!(handle, a);

    assert_eq!(a.with(|v: &Node| v.label.clone()), Some("a".to_owned()));
    assert_eq!(a.with(|v: &Node| v.next.clone()), Some(b.clone()));
    assert_eq!(b.with(|v: &Node| v.next.clone()), Some(a.clone()));
}

#[test]
fn cycle_sync_create() {
    within(5, || {
        let (mut assets, _) = manager();
        assets.discover_embedded(embedded(vec![
            ("P_A", peer_bytes("P_B", "a"), false),
            ("P_B", peer_bytes("P_A", "b"), false),
        ]));

        let a = assets.load_sync("P_A").unwrap();
        let b = assets.get("P_B").unwrap();

        assert_eq!(a.with(|v: &Peer| v.next.clone()), Some(b.clone()));
        assert_eq!(b.with(|v: &Peer| v.next.clone()), Some(a.clone()));
        assert_eq!(a.with(|v: &Peer| v.seen.clone()), Some(Some("b".to_owned())));

        // P_B is created while P_A is still being read.
        assert_eq!(b.with(|v: &Peer| v.seen.clone()), Some(None));
    });
}

#[test]
fn cycle_async_create() {
    within(10, || {
        let mut settings = AssetSettings::default();
        settings.requeue_limit = 4;

        let (mut assets, _) = manager_with(settings);
        assets.discover_embedded(embedded(vec![
            ("P_A", peer_bytes("P_B", "a"), false),
            ("P_B", peer_bytes("P_A", "b"), false),
            ("P_Loop", peer_bytes("P_Loop", "loop"), false),
        ]));

        let pair = AssetRef::new();
        let looped = AssetRef::new();
        assets.load_async("P_A", &pair).unwrap();
        assets.load_async("P_Loop", &looped).unwrap();
        wait_until(&mut assets, |v| {
            !pair.is_null() && !looped.is_null() && v.in_flight() == 0
        });

        let b = assets.get("P_B").unwrap();
        assert_eq!(pair.with(|v: &Peer| v.next.clone()), Some(b));
        assert_eq!(pair.with(|v: &Peer| v.seen.clone()), Some(Some("b".to_owned())));
        assert_eq!(looped.with(|v: &Peer| v.next.clone()), Some(looped.clone()));
    });
}

#[test]
fn self_reference() {
    let (mut assets, _) = manager();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "N_Loop.asset", &node_bytes("N_Loop", "loop"));
    assets.discover("Content", dir.path()).unwrap();

    let handle = AssetRef::new();
    assets.load_async("N_Loop", &handle).unwrap();
    wait_until(&mut assets, |v| !handle.is_null() && v.in_flight() == 0);

    assert_eq!(handle.with(|v: &Node| v.next.clone()), Some(handle.clone()));
}

#[test]
fn missing_file() {
    let (mut assets, _) = manager();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("T_Missing.asset");
    assets
        .register("T_Missing", Texture::TYPE_TAG, AssetLocation::File(path), false)
        .unwrap();

    let handle = AssetRef::new();
    assets.load_async("T_Missing", &handle).unwrap();
    wait_until(&mut assets, |v| v.in_flight() == 0);

    assert!(handle.is_null());
    assert!(!handle.is_pending());
    assert!(!assets.stub("T_Missing").unwrap().is_loaded());
    assert_eq!(assets.load_state("T_Missing"), None);
    assert!(assets.load_sync("T_Missing").is_none());
}

#[test]
fn missing_dependency() {
    let mut settings = AssetSettings::default();
    settings.requeue_limit = 4;

    let (mut assets, _) = manager_with(settings);
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "M_Red.asset", &material_bytes("T_Missing", 1));
    assets.discover("Content", dir.path()).unwrap();
    assets
        .register(
            "T_Missing",
            Texture::TYPE_TAG,
            AssetLocation::File(dir.path().join("T_Missing.asset")),
            false,
        )
        .unwrap();

    let handle = AssetRef::new();
    assets.load_async("M_Red", &handle).unwrap();
    wait_until(&mut assets, |v| v.in_flight() == 0);

    assert!(!handle.is_null());
    assert_eq!(handle.with(|v: &Material| v.texture.is_null()), Some(true));
}

#[test]
fn unknown_name() {
    let (mut assets, _) = manager();

    let handle = AssetRef::new();
    match assets.load_async("Nope", &handle) {
        Err(Error::NotFound(name)) => assert_eq!(name, "Nope"),
        v => panic!("unexpected {:?}", v),
    }

    assert!(assets.load_sync("Nope").is_none());
    assert_eq!(assets.requests_created(), 0);
}

#[test]
fn rebinding() {
    let (mut assets, _) = manager();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "T_A.asset", &texture_bytes(1, 1));
    write_file(dir.path(), "T_B.asset", &texture_bytes(2, 2));
    assets.discover("Content", dir.path()).unwrap();

    let handle = AssetRef::new();
    assets.load_async("T_A", &handle).unwrap();
    assets.load_async("T_B", &handle).unwrap();
    wait_until(&mut assets, |v| v.in_flight() == 0);

    assert_eq!(handle.name(), Some("T_B".to_owned()));

    // The abandoned load still installs its object.
    let a = assets.stub("T_A").unwrap().asset().unwrap().clone();
    assert_eq!(a.ref_count(), 0);
}

#[test]
fn dropped_handle() {
    let (mut assets, _) = manager();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "T_A.asset", &texture_bytes(1, 1));
    assets.discover("Content", dir.path()).unwrap();

    let handle = AssetRef::new();
    assets.load_async("T_A", &handle).unwrap();
    drop(handle);

    wait_until(&mut assets, |v| v.in_flight() == 0);
    assert!(assets.stub("T_A").unwrap().is_loaded());
    assert_eq!(assets.sweep(), 1);
    assert!(!assets.stub("T_A").unwrap().is_loaded());
}

#[test]
fn preload() {
    let (mut assets, _) = manager();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "T_A.asset", &texture_bytes(1, 1));
    assets.discover("Content", dir.path()).unwrap();

    assert_eq!(assets.load_state("T_A"), None);
    assets.preload("T_A").unwrap();

    let state = assets.load_state("T_A");
    assert!(state.is_some() && state != Some(LoadState::Finalized));

    wait_until(&mut assets, |v| v.get("T_A").is_some());
    assert_eq!(assets.load_state("T_A"), Some(LoadState::Finalized));
}

#[test]
fn renamed_while_loading() {
    let (mut assets, _) = manager();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "T_A.asset", &texture_bytes(3, 3));
    assets.discover("Content", dir.path()).unwrap();

    let handle = AssetRef::new();
    assets.load_async("T_A", &handle).unwrap();
    assets.rename("T_A", "T_Renamed").unwrap();
    assert!(assets.load_state("T_Renamed").is_some());
    assert_eq!(assets.load_state("T_A"), None);

    wait_until(&mut assets, |v| v.in_flight() == 0);

    assert_eq!(handle.name(), Some("T_Renamed".to_owned()));
    assert!(assets.stub("T_Renamed").unwrap().is_loaded());
    assert_eq!(handle.with(|v: &Texture| v.width), Some(3));
}
