use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use picalign_calib::{
    correct_reference_points, AutoCalibration, CalibrationConfig, CalibrationValidator,
    MercatorView, PlacedPicture,
};
use picalign_geometry::DVec2;

const IMAGE: [DVec2; 3] = [
    DVec2::new(0.0, 0.0),
    DVec2::new(100.0, 0.0),
    DVec2::new(100.0, 100.0),
];

const REFERENCE: [DVec2; 3] = [
    DVec2::new(11.570, 48.140),
    DVec2::new(11.571, 48.140),
    DVec2::new(11.571, 48.141),
];

fn bench_correct(c: &mut Criterion) {
    let mut group = c.benchmark_group("CorrectReferencePoints");
    group.bench_function("three_points", |b| {
        b.iter(|| {
            correct_reference_points(black_box(&REFERENCE), black_box(74.0), black_box(111.0))
        })
    });
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let validator = CalibrationValidator::default();
    let mut group = c.benchmark_group("ValidateTriangles");
    group.bench_function("planar_vs_geodesic", |b| {
        b.iter(|| validator.compare(black_box(&IMAGE), black_box(&REFERENCE)))
    });
    group.finish();
}

fn bench_calibrate(c: &mut Criterion) {
    let view = MercatorView::new(REFERENCE[0], 0.25, DVec2::new(1920.0, 1080.0));
    let mut group = c.benchmark_group("AutoCalibration");
    group.bench_function("full_session", |b| {
        b.iter(|| {
            let mut calibration = AutoCalibration::new(CalibrationConfig::default(), &view);
            calibration.start(PlacedPicture::at(DVec2::new(400.0, 300.0), 1.0));
            for (origin, reference) in IMAGE.iter().zip(REFERENCE.iter()) {
                calibration.add_origin_point(*origin).ok();
                calibration.add_reference_point(*reference).ok();
            }
            calibration.set_distance_01(74.0).ok();
            calibration.set_distance_12(111.0).ok();
            black_box(calibration.calibrate())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_correct, bench_validate, bench_calibrate);
criterion_main!(benches);
