#![cfg(feature = "hdf5")]

mod common;

use approx::assert_relative_eq;
use common::{
    expected_charge, tels_of_event, Fixture, LST_PIXELS, MST_PIXELS, NUM_EVENTS, ORPHAN_TEL,
};
use dl1dh_core::{ArrayEvent, BuiltinRegistry, HeaderValue, Quantity};
use dl1dh_io::{
    Dl1EventSource, Error, SourceConfig, SourceRegistry, DL1DH_SOURCE, ORIGIN, SUBARRAY_NAME,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn fixture_file(fixture: &Fixture) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("dl1.h5");
    fixture.write(&path).expect("write fixture");
    (dir, path)
}

fn collect(source: Dl1EventSource) -> Vec<ArrayEvent> {
    source
        .collect::<dl1dh_io::Result<Vec<_>>>()
        .expect("read events")
}

#[test]
fn test_reads_every_event_in_order() {
    let (_dir, path) = fixture_file(&Fixture::default());
    let source = Dl1EventSource::open(&path).expect("open");
    assert_eq!(source.num_events().expect("num_events"), NUM_EVENTS);

    let events = collect(source);
    assert_eq!(events.len(), NUM_EVENTS);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.count, i);
        assert_eq!(event.obs_id, 101);
        assert_eq!(event.event_id, 1000 + i as u64);
        let expected: BTreeSet<u32> = tels_of_event(i).into_iter().collect();
        assert_eq!(event.tels_with_data, expected);
        assert_eq!(event.dl1.keys().copied().collect::<BTreeSet<_>>(), expected);
    }
}

#[test]
fn test_images_come_from_indexed_rows() {
    let (_dir, path) = fixture_file(&Fixture::default());
    let events = collect(Dl1EventSource::open(&path).expect("open"));

    // Event 3: tel 1 -> LST row 3, tel 2 -> LST row 4.
    let tel1 = events[3].image(1).expect("tel 1");
    assert_eq!(tel1.image, expected_charge(3, LST_PIXELS));
    assert!(tel1.pulse_time.iter().all(|&t| (t - 3.5).abs() < 1e-6));
    let tel2 = events[3].image(2).expect("tel 2");
    assert_eq!(tel2.image, expected_charge(4, LST_PIXELS));

    // Event 2: tel 5 -> MST row 2.
    let tel5 = events[2].image(5).expect("tel 5");
    assert_eq!(tel5.num_pixels(), MST_PIXELS);
    assert_eq!(tel5.image, expected_charge(2, MST_PIXELS));
}

#[test]
fn test_shower_quantities_carry_units() {
    let (_dir, path) = fixture_file(&Fixture::default());
    let events = collect(Dl1EventSource::open(&path).expect("open"));

    let mc = &events[1].mc;
    assert_relative_eq!(mc.energy.value(), 1.25);
    assert_eq!(mc.energy.to_string(), "1.25 TeV");
    assert_relative_eq!(mc.alt.value(), 1.2);
    assert_eq!(format!("{:.1}", mc.alt), "1.2 rad");
    assert_eq!(format!("{:.1}", mc.core_x), "-20.0 m");
    assert_eq!(format!("{:.0}", mc.x_max), "350 g / cm2");
    assert_eq!(events[2].mc.shower_primary_id, 101);
}

#[test]
fn test_filter_skips_events_without_allowed_telescopes() {
    let (_dir, path) = fixture_file(&Fixture::default());
    let config = SourceConfig::default().with_allowed_tels([5]);
    let source = Dl1EventSource::open_with(&path, config, Arc::new(BuiltinRegistry))
        .expect("open");
    let events = collect(source);

    // Events 0 and 3 have no data from telescope 5.
    let ids: Vec<u64> = events.iter().map(|e| e.event_id).collect();
    assert_eq!(ids, vec![1001, 1002]);
    let counts: Vec<usize> = events.iter().map(|e| e.count).collect();
    assert_eq!(counts, vec![0, 1]);
    for event in &events {
        assert_eq!(event.tels_with_data, BTreeSet::from([5]));
        assert_eq!(event.dl1.len(), 1);
    }
}

#[test]
fn test_filter_narrows_telescopes_of_kept_events() {
    let (_dir, path) = fixture_file(&Fixture::default());
    let config = SourceConfig::default().with_allowed_tels([2]);
    let source = Dl1EventSource::open_with(&path, config, Arc::new(BuiltinRegistry))
        .expect("open");
    let events = collect(source);

    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.tels_with_data, BTreeSet::from([2]));
        assert!(event.image(1).is_none());
        assert!(event.image(5).is_none());
    }
}

#[test]
fn test_no_telescope_data_leaks_between_events() {
    let (_dir, path) = fixture_file(&Fixture::default());
    let events = collect(Dl1EventSource::open(&path).expect("open"));

    // Event 1 has tel 5 but event 2 does not have tels 2 or 1.
    assert!(events[2].image(2).is_none());
    assert!(events[2].image(1).is_none());
    assert_eq!(events[2].num_tels(), 1);
}

#[test]
fn test_subarray_is_built_once_and_shared() {
    let (_dir, path) = fixture_file(&Fixture::default());
    let mut source = Dl1EventSource::open(&path).expect("open");
    assert!(source.subarray().is_none());

    let first = source.next().expect("first").expect("event");
    let shared = Arc::clone(source.subarray().expect("subarray after first event"));
    assert!(Arc::ptr_eq(&first.subarray, &shared));

    for event in source {
        let event = event.expect("event");
        assert!(Arc::ptr_eq(&event.subarray, &shared));
    }

    assert_eq!(shared.name, SUBARRAY_NAME);
    assert_eq!(shared.num_tels(), 3);
    assert_eq!(shared.tel_types(), vec!["LST_LSTCam", "MST_NectarCam"]);
    assert_eq!(shared.tel_ids_for_type("LST_LSTCam"), vec![1, 2]);
    let tel5 = shared.tel(5).expect("tel 5");
    assert_eq!(tel5.camera_name, "NectarCam");
    assert_eq!(tel5.optics_name, "MST");
    assert_relative_eq!(tel5.position.z.value(), 25.0);
}

#[test]
fn test_event_metadata() {
    let (_dir, path) = fixture_file(&Fixture::default());
    let config = SourceConfig::default().with_max_events(10);
    let source = Dl1EventSource::open_with(&path, config, Arc::new(BuiltinRegistry))
        .expect("open");
    let events = collect(source);

    let meta = &events[0].meta;
    assert_eq!(meta.origin, ORIGIN);
    assert_eq!(meta.input_url, path.display().to_string());
    assert_eq!(meta.max_events, Some(10));
    assert!(meta.is_simulation);
}

#[test]
fn test_max_events_stops_early() {
    let (_dir, path) = fixture_file(&Fixture::default());
    let config = SourceConfig::default().with_max_events(2);
    let mut source = Dl1EventSource::open_with(&path, config, Arc::new(BuiltinRegistry))
        .expect("open");

    assert!(source.next().is_some());
    assert!(source.next().is_some());
    assert!(source.next().is_none());
    assert_eq!(source.events_read(), 2);
}

#[test]
fn test_mc_header_is_shared_and_partial() {
    let (_dir, path) = fixture_file(&Fixture::default());
    let events = collect(Dl1EventSource::open(&path).expect("open"));

    let header = &events[0].mcheader;
    assert!(Arc::ptr_eq(header, &events[3].mcheader));
    assert_eq!(header.len(), 5);
    assert_eq!(header.get("corsika_version"), Some(&HeaderValue::Int(6990)));
    assert_eq!(header.get("diffuse"), Some(&HeaderValue::Bool(true)));
    assert_eq!(
        header.get("atmosphere").and_then(HeaderValue::as_str),
        Some("atm_trans_2150_1_10_0_0_2150")
    );
    assert_eq!(header.run_array_direction(), Some((0.0, 1.2)));
    assert!(header.get("num_showers").is_none());
}

#[test]
fn test_header_read_before_iteration_is_reused() {
    let (_dir, path) = fixture_file(&Fixture::default());
    let source = Dl1EventSource::open(&path).expect("open");
    let header = source.read_mc_header();
    assert!(Arc::ptr_eq(&header, &source.read_mc_header()));

    let events = collect(source);
    assert!(Arc::ptr_eq(&header, &events[0].mcheader));
    assert!(Arc::ptr_eq(&header, &events[3].mcheader));
}

#[test]
fn test_missing_header_is_tolerated() {
    let (_dir, path) = fixture_file(&Fixture::default().without_header());
    let source = Dl1EventSource::open(&path).expect("open");
    assert!(source.read_mc_header().is_empty());

    let events = collect(source);
    assert_eq!(events.len(), NUM_EVENTS);
    assert!(events[0].mcheader.is_empty());
}

#[test]
fn test_unknown_camera_still_describes_telescope() {
    let (_dir, path) = fixture_file(&Fixture::default().mst_camera("PrototypeCam"));
    let source = Dl1EventSource::open(&path).expect("open");
    let subarray = source.read_subarray().expect("subarray");

    let tel5 = subarray.tel(5).expect("tel 5");
    assert_eq!(tel5.camera_name, "PrototypeCam");
    assert!(tel5.camera.is_none());
    assert!(tel5.optics.is_some());
    assert_eq!(tel5.num_pixels(), None);

    let events = collect(source);
    assert_eq!(events.len(), NUM_EVENTS);
}

#[test]
fn test_missing_type_table_is_an_error() {
    let (_dir, path) = fixture_file(&Fixture::default().without_type_table());
    let mut source = Dl1EventSource::open(&path).expect("open");

    let first = source.next().expect("an item");
    assert!(matches!(first, Err(Error::Hdf5(_))));
    assert!(source.next().is_none());
}

#[test]
fn test_index_columns_follow_array_information_order() {
    let (_dir, path) = fixture_file(&Fixture::default().shuffled_ids());
    let source = Dl1EventSource::open(&path).expect("open");
    let subarray = source.read_subarray().expect("subarray");
    assert_relative_eq!(subarray.tel(1).expect("tel 1").position.x.value(), -70.0);
    assert_relative_eq!(subarray.tel(2).expect("tel 2").position.x.value(), -35.0);

    let events = collect(source);
    // LST rows list telescope 2 before telescope 1, so column 0 is tel 2.
    assert_eq!(events[0].tels_with_data, BTreeSet::from([2]));
    assert_eq!(events[0].image(2).expect("tel 2").image, expected_charge(1, LST_PIXELS));
    assert_eq!(events[1].tels_with_data, BTreeSet::from([1, 5]));
    assert_eq!(events[1].image(1).expect("tel 1").image, expected_charge(2, LST_PIXELS));
    assert_eq!(events[3].image(2).expect("tel 2").image, expected_charge(3, LST_PIXELS));
    assert_eq!(events[3].image(1).expect("tel 1").image, expected_charge(4, LST_PIXELS));
}

#[test]
fn test_type_missing_from_type_table_is_invalid() {
    let (_dir, path) = fixture_file(&Fixture::default().orphan_type());
    let mut source = Dl1EventSource::open(&path).expect("open");
    match source.read_subarray() {
        Err(Error::InvalidFormat(msg)) => assert!(msg.contains(&ORPHAN_TEL.to_string())),
        other => panic!("expected InvalidFormat, got {other:?}"),
    }

    let first = source.next().expect("an item");
    assert!(matches!(first, Err(Error::InvalidFormat(_))));
    assert!(source.next().is_none());
}

#[test]
fn test_image_row_out_of_range_is_invalid() {
    let (_dir, path) = fixture_file(&Fixture::default().dangling_index());
    let mut source = Dl1EventSource::open(&path).expect("open");

    assert!(source.next().expect("event 0").is_ok());
    assert!(source.next().expect("event 1").is_ok());
    let third = source.next().expect("an item");
    assert!(matches!(third, Err(Error::InvalidFormat(_))));
    assert!(source.next().is_none());
    assert_eq!(source.events_read(), 2);
}

#[test]
fn test_missing_file_fails_to_open() {
    let dir = TempDir::new().expect("tempdir");
    let result = Dl1EventSource::open(dir.path().join("missing.h5"));
    assert!(result.is_err());
}

#[test]
fn test_source_is_opened_by_name_only() {
    let (_dir, path) = fixture_file(&Fixture::default());
    assert!(!Dl1EventSource::is_compatible(&path));

    let registry = SourceRegistry::with_builtin();
    assert!(matches!(
        registry.open_auto(&path, SourceConfig::default()),
        Err(Error::NoCompatibleSource(_))
    ));

    let events = registry
        .open(DL1DH_SOURCE, &path, SourceConfig::default().with_max_events(3))
        .expect("open by name")
        .collect::<dl1dh_io::Result<Vec<_>>>()
        .expect("events");
    assert_eq!(events.len(), 3);
}
