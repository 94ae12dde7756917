mod common;

use std::cell::Cell;
use std::path::Path;

use approx::assert_abs_diff_eq;
use pcaruco::aruco::{ArucoDetectorParams, DetectError};
use pcaruco::core::{Point, PointCloud, ProjectionParams, RasterImage, TileMask};
use pcaruco::{
    ArucoMarkerDetector, Detections, DetectorError, InputError, InputOutcome, MarkerDetectorService,
    Pipeline, PipelineConfig, PipelineError, PointCloudSource, SourceError,
};

use common::{marker_cloud, write_marker_png, SPACING};

fn aruco() -> ArucoMarkerDetector {
    ArucoMarkerDetector::from_name("DICT_4X4_50", ArucoDetectorParams::default()).expect("detector")
}

fn config(tiles: &[u8]) -> PipelineConfig {
    PipelineConfig {
        projection: ProjectionParams {
            width: 65,
            height: 65,
        },
        tiles: tiles
            .iter()
            .map(|&t| TileMask::new(t).expect("mask"))
            .collect(),
        ..PipelineConfig::default()
    }
}

/// Fails on the call with index `fail_on`, returns nothing otherwise.
struct FlakyDetector {
    calls: Cell<usize>,
    fail_on: usize,
}

impl MarkerDetectorService for FlakyDetector {
    fn detect(&self, image: &RasterImage) -> Result<Detections, DetectorError> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call == self.fail_on {
            return Err(DetectError::EmptyImage {
                width: image.width(),
                height: image.height(),
            }
            .into());
        }
        Ok(Detections::default())
    }
}

#[test]
fn projected_marker_is_found_in_every_tile_it_belongs_to() {
    let cloud = marker_cloud(3, 0b0101);
    let pipeline = Pipeline::new(config(&[1, 2, 4]), aruco());
    let outcomes = pipeline.run_on_pointcloud(&cloud);
    assert_eq!(outcomes.len(), 3);

    let tile1 = outcomes[0].result.as_ref().expect("tile 1");
    assert_eq!(tile1.ids(), vec![3]);
    assert_eq!(tile1.points, 65 * 65);
    assert!(tile1.rejected.is_empty());

    assert!(matches!(
        outcomes[1].result,
        Err(PipelineError::EmptyTile { tile }) if tile == TileMask::TILE_2
    ));

    let tile4 = outcomes[2].result.as_ref().expect("tile 4");
    assert_eq!(tile4.ids(), vec![3]);
}

#[test]
fn marker_corners_are_lifted_back_to_the_cloud() {
    let cloud = marker_cloud(11, 1);
    let pipeline = Pipeline::new(config(&[1]), aruco());
    let outcomes = pipeline.run_on_pointcloud(&cloud);
    let frame = outcomes[0].result.as_ref().expect("tile 1");
    let marker = &frame.markers[0];
    assert_eq!(marker.id, 11);

    let world = marker.corners_world.expect("lifted corners");
    for (corner, lifted) in marker.corners.iter().zip(world) {
        let [x, y, z] = lifted.expect("point under corner");
        assert_abs_diff_eq!(x, corner.x * SPACING, epsilon = SPACING);
        assert_abs_diff_eq!(y, corner.y * SPACING, epsilon = SPACING);
        assert_eq!(z, 1.0);
    }
}

#[test]
fn detector_failure_and_empty_tiles_do_not_stop_the_rest() {
    let mut cloud = PointCloud::empty();
    for (i, tile) in [1u8, 2, 8].into_iter().enumerate() {
        cloud.push(Point::new(i as f32, 0.0, 0.0, [9, 9, 9]), tile);
        cloud.push(Point::new(i as f32, 1.0, 0.0, [9, 9, 9]), tile);
    }
    let detector = FlakyDetector {
        calls: Cell::new(0),
        fail_on: 1,
    };
    let pipeline = Pipeline::new(PipelineConfig::default(), &detector);
    let outcomes = pipeline.run_on_pointcloud(&cloud);

    let tiles: Vec<u8> = outcomes.iter().map(|o| o.tile.bit()).collect();
    assert_eq!(tiles, vec![1, 2, 4, 8]);
    assert!(outcomes[0].result.is_ok());
    assert!(matches!(outcomes[1].result, Err(PipelineError::Detector(_))));
    assert!(matches!(outcomes[2].result, Err(PipelineError::EmptyTile { .. })));
    assert!(outcomes[3].result.is_ok());
    assert_eq!(detector.calls.get(), 3);
}

#[test]
fn image_files_bypass_projection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("marker.png");
    write_marker_png(&path, 21);

    let pipeline = Pipeline::new(PipelineConfig::default(), aruco());
    let frame = pipeline.run_on_image(&path).expect("frame");
    assert_eq!(frame.ids(), vec![21]);
    assert_eq!((frame.width, frame.height, frame.points), (65, 65, 0));
    assert!(frame.markers[0].corners_world.is_none());
    assert_abs_diff_eq!(frame.markers[0].corners[0].x, 7.5, epsilon = 0.75);
}

#[test]
fn unreadable_inputs_are_reported_per_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = Pipeline::new(PipelineConfig::default(), aruco());

    let missing = pipeline
        .run_on_path(&dir.path().join("missing.ply"))
        .expect_err("missing ply");
    assert!(matches!(
        missing,
        PipelineError::UnreadableInput {
            source: InputError::PointCloud(SourceError::Io(_)),
            ..
        }
    ));

    let garbage = dir.path().join("garbage.png");
    std::fs::write(&garbage, b"not a png").expect("write");
    let err = pipeline.run_on_path(&garbage).expect_err("bad png");
    assert!(matches!(
        err,
        PipelineError::UnreadableInput {
            source: InputError::Image(_),
            ..
        }
    ));
    assert!(err.to_string().contains("garbage.png"));
}

struct FixedSource(PointCloud);

impl PointCloudSource for FixedSource {
    fn read(&self, _path: &Path) -> Result<PointCloud, SourceError> {
        Ok(self.0.clone())
    }
}

#[test]
fn ply_extension_dispatches_to_the_point_cloud_source() {
    let source = FixedSource(marker_cloud(5, 2));
    let pipeline = Pipeline::with_source(config(&[1, 2]), aruco(), source);
    let outcome = pipeline.run_on_path(Path::new("rig.PLY")).expect("outcome");
    let InputOutcome::PointCloud(tiles) = &outcome else {
        panic!("expected point-cloud outcome");
    };
    assert_eq!(tiles.len(), 2);
    assert_eq!(outcome.frames().len(), 1);
    assert_eq!(outcome.frames()[0].ids(), vec![5]);
}
