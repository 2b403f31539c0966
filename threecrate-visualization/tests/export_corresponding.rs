use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use threecrate_core::Point3d;
use threecrate_io::{read_cloud, write_cloud, CloudWriteOptions, Field, FieldCloud, FieldType, FieldValue, IoRegistry};
use threecrate_visualization::{
    export_corresponding, CloudExporter, DisplaySurface, ExportError, ExportOptions, LogLogger, RecordingLogger,
    SourceFileRef, SourceRegistry,
};

/// Random cloud with an extra intensity and label per point
fn random_source(seed: u64, n: usize) -> FieldCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cloud = FieldCloud::new(vec![
        Field::new("x", FieldType::F32, 1),
        Field::new("y", FieldType::F32, 1),
        Field::new("z", FieldType::F32, 1),
        Field::new("intensity", FieldType::F32, 1),
        Field::new("label", FieldType::U32, 1),
    ]);
    for i in 0..n {
        cloud
            .push(vec![
                FieldValue::F32(rng.gen_range(-1.0..1.0)),
                FieldValue::F32(rng.gen_range(-1.0..1.0)),
                FieldValue::F32(rng.gen_range(-1.0..1.0)),
                FieldValue::F32(rng.gen_range(0.0..100.0)),
                FieldValue::U32(i as u32),
            ])
            .unwrap();
    }
    cloud
}

/// 10 x 10 x 10 lattice with unit spacing
fn grid_cube() -> FieldCloud {
    let mut cloud = FieldCloud::new(vec![
        Field::new("x", FieldType::F32, 1),
        Field::new("y", FieldType::F32, 1),
        Field::new("z", FieldType::F32, 1),
    ]);
    for i in 0..10 {
        for j in 0..10 {
            for k in 0..10 {
                cloud
                    .push(vec![
                        FieldValue::F32(i as f32),
                        FieldValue::F32(j as f32),
                        FieldValue::F32(k as f32),
                    ])
                    .unwrap();
            }
        }
    }
    cloud
}

fn write_source(dir: &Path, name: &str, cloud: &FieldCloud) -> PathBuf {
    let path = dir.join(name);
    write_cloud(cloud, &path, &CloudWriteOptions::default()).unwrap();
    path
}

/// Displayed points sitting exactly on the given source points
fn surface_on(cloud: &FieldCloud, indices: &[usize]) -> DisplaySurface {
    let points = cloud.to_point_cloud().unwrap();
    indices.iter().map(|&i| points[i].cast::<f64>()).collect::<Vec<Point3d>>().into()
}

fn prefix(dir: &Path) -> String {
    dir.join("out").to_string_lossy().into_owned()
}

#[test]
fn shared_source_is_exported_once_and_widgets_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let source = random_source(1, 1000);
    let cube = write_source(dir.path(), "cubeA.pcd", &source);

    let mut sources = SourceRegistry::new();
    sources.register_source("cubeA.pcd-0", SourceFileRef::pcd(&cube));
    sources.register_source("cubeA.pcd-1", SourceFileRef::pcd(&cube));
    sources.register_display_only("sphereWidget");

    let picked = [17, 503, 998];
    let surface = surface_on(&source, &[17, 503, 998, 998, 17, 503]);
    let logger = RecordingLogger::new();

    let summary = export_corresponding(&surface, &prefix(dir.path()), &sources, &logger).unwrap();

    let out1 = dir.path().join("out1.pcd");
    assert_eq!(summary.written, vec![out1.clone()]);
    assert_eq!(summary.pruned, 3);
    assert_eq!(summary.displayed, 3);
    assert!(!dir.path().join("out2.pcd").exists());

    let exported = read_cloud(&out1).unwrap();
    assert_eq!(exported.len(), 3);
    assert_eq!(exported.width, 3);
    assert_eq!(exported.height, 1);
    assert_eq!(exported.fields, source.fields);
    for (record, &idx) in exported.records.iter().zip(&picked) {
        assert_eq!(record, &source.records[idx]);
    }

    let text = fs::read(&out1).unwrap();
    let header = String::from_utf8_lossy(&text);
    assert!(header.contains("VIEWPOINT 0 0 0 1 0 0 0"));
    assert!(header.contains("DATA binary"));
    assert!(logger.contains("Number of points pruned: 3"));
}

#[test]
fn grid_cube_exports_the_picked_points() {
    let dir = tempfile::tempdir().unwrap();
    let source = grid_cube();
    let cube = write_source(dir.path(), "cubeA.pcd", &source);

    // Same file, spelled through a `.` component
    let mut sources = SourceRegistry::new();
    sources.register_source("cubeA.pcd-0", SourceFileRef::pcd(&cube));
    sources.register_source("cubeA.pcd-1", SourceFileRef::pcd(dir.path().join(".").join("cubeA.pcd")));
    sources.register_display_only("sphereWidget");

    let picked = [0, 345, 999];
    let surface = surface_on(&source, &picked);
    let summary = export_corresponding(&surface, &prefix(dir.path()), &sources, &LogLogger).unwrap();

    let out1 = dir.path().join("out1.pcd");
    assert_eq!(summary.written, vec![out1.clone()]);
    assert_eq!(summary.pruned, 0);
    assert!(!dir.path().join("out2.pcd").exists());

    let exported = read_cloud(&out1).unwrap();
    assert_eq!(exported.len(), 3);
    for (record, &idx) in exported.records.iter().zip(&picked) {
        assert_eq!(record, &source.records[idx]);
    }
}

#[test]
fn missing_source_stops_the_export() {
    let dir = tempfile::tempdir().unwrap();
    let cube = write_source(dir.path(), "cubeA.pcd", &random_source(2, 1000));
    let other = write_source(dir.path(), "cubeB.pcd", &random_source(3, 100));
    fs::remove_file(&cube).unwrap();

    let mut sources = SourceRegistry::new();
    sources.register_source("cubeA.pcd-0", SourceFileRef::pcd(&cube));
    sources.register_source("cubeB.pcd-0", SourceFileRef::pcd(&other));

    let surface = DisplaySurface::new(vec![Point3d::new(0.0, 0.0, 0.0)]);
    let logger = RecordingLogger::new();

    let err = export_corresponding(&surface, &prefix(dir.path()), &sources, &logger).unwrap_err();
    match &err {
        ExportError::LoadFailure { path, .. } => assert_eq!(path, &cube),
        other => panic!("expected a load failure, got {:?}", other),
    }
    assert!(logger.contains("[failed]"));
    assert!(!dir.path().join("out1.pcd").exists());
    assert!(!dir.path().join("out2.pcd").exists());
}

#[test]
fn earlier_outputs_remain_after_a_later_failure() {
    let dir = tempfile::tempdir().unwrap();
    let source = random_source(4, 200);
    let first = write_source(dir.path(), "first.pcd", &source);
    let missing = dir.path().join("second.pcd");

    let mut sources = SourceRegistry::new();
    sources.register_source("first.pcd-0", SourceFileRef::pcd(&first));
    sources.register_source("second.pcd-0", SourceFileRef::pcd(&missing));

    let err = export_corresponding(&surface_on(&source, &[5]), &prefix(dir.path()), &sources, &LogLogger)
        .unwrap_err();
    assert!(matches!(err, ExportError::LoadFailure { .. }));
    assert!(dir.path().join("out1.pcd").exists());
    assert!(!dir.path().join("out2.pcd").exists());
}

#[test]
fn duplicates_are_pruned_before_matching() {
    let dir = tempfile::tempdir().unwrap();
    let source = random_source(5, 1000);
    let path = write_source(dir.path(), "scan.pcd", &source);

    // 300 distinct displayed points followed by 200 repeats of them
    let indices: Vec<usize> = (0..300).chain(0..200).collect();
    let surface = surface_on(&source, &indices);
    assert_eq!(surface.len(), 500);

    let mut sources = SourceRegistry::new();
    sources.register_source("scan.pcd-0", SourceFileRef::pcd(&path));

    let logger = RecordingLogger::new();
    let summary = export_corresponding(&surface, &prefix(dir.path()), &sources, &logger).unwrap();
    assert_eq!(summary.pruned, 200);
    assert_eq!(summary.displayed, 300);
    assert!(logger.contains("Number of points pruned: 200"));

    let exported = read_cloud(&summary.written[0]).unwrap();
    assert_eq!(exported.len(), 300);
    assert_eq!(exported.records[..], source.records[..300]);
}

#[test]
fn each_distinct_source_gets_the_next_number() {
    let dir = tempfile::tempdir().unwrap();
    let a = random_source(6, 50);
    let b = random_source(7, 80);
    let path_a = write_source(dir.path(), "a.pcd", &a);
    let path_b = write_source(dir.path(), "b.pcd", &b);

    let mut sources = SourceRegistry::new();
    sources.register_display_only("axes");
    sources.register_source("b.pcd-0", SourceFileRef::pcd(&path_b));
    sources.register_display_only("grid");
    sources.register_source("a.pcd-0", SourceFileRef::pcd(&path_a));

    let io = IoRegistry::with_defaults();
    let logger = RecordingLogger::new();
    let options = ExportOptions::with_prefix(prefix(dir.path())).binary(false);
    let summary = CloudExporter::new(&io, &logger)
        .with_options(options)
        .export_corresponding(&surface_on(&a, &[0, 1, 2]), &sources)
        .unwrap();

    assert_eq!(
        summary.written,
        vec![dir.path().join("out1.pcd"), dir.path().join("out2.pcd")]
    );

    // out1 comes from b, out2 from a; every displayed point lies on a
    let from_b = read_cloud(&summary.written[0]).unwrap();
    let from_a = read_cloud(&summary.written[1]).unwrap();
    assert!(!from_b.is_empty() && from_b.len() <= 3);
    assert_eq!(from_a.records[..], a.records[..3]);

    let text = fs::read_to_string(&summary.written[1]).unwrap();
    assert!(text.contains("DATA ascii"));
}
