use std::fs;

use chrono::{TimeZone, Utc};
use fieldpack::error::FieldpackError;
use fieldpack::field::FieldSession;
use fieldpack::geometry::{Coord, ImageSize};
use fieldpack::import::{import_package, ImportStage, JobImportPipeline, PackageSource, ProgressUpdate};
use fieldpack::model::{Job, JobId, JobStatus, Photo, Window, WindowId};
use fieldpack::package::create_archive;
use fieldpack::store::{ChangeSet, EntityStore, MemoryStore};

mod common;

use common::{intake_job, write_bmp, write_e1_package, write_manifest, Workspace};

/// Store whose commits always fail; reads go to an empty memory store.
struct FailingStore(MemoryStore);

impl EntityStore for FailingStore {
    fn jobs(&self) -> Result<Vec<Job>, FieldpackError> {
        self.0.jobs()
    }
    fn job(&self, job_id: &JobId) -> Result<Option<Job>, FieldpackError> {
        self.0.job(job_id)
    }
    fn windows(&self, job_id: &JobId) -> Result<Vec<Window>, FieldpackError> {
        self.0.windows(job_id)
    }
    fn window(&self, window_id: &WindowId) -> Result<Option<Window>, FieldpackError> {
        self.0.window(window_id)
    }
    fn photos(&self, window_id: &WindowId) -> Result<Vec<Photo>, FieldpackError> {
        self.0.photos(window_id)
    }
    fn commit(&self, _changes: ChangeSet) -> Result<(), FieldpackError> {
        Err(FieldpackError::StorageFailure {
            message: "disk full".into(),
        })
    }
}

#[test]
fn imports_e1_as_ready_with_stored_overhead() {
    let ws = Workspace::new();
    let package = ws.path("package");
    write_e1_package(&package);

    let report = import_package(&package, &ws.store, &ws.images).expect("import");
    assert_eq!(report.jobs, vec![JobId::from("E1")]);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.images, 1);

    let job = ws.store.job(&JobId::from("E1")).unwrap().expect("job stored");
    assert_eq!(job.status, JobStatus::Ready);
    assert_eq!(job.client_name, "Client E1");
    assert_eq!(job.notes, "gate code 1234");
    assert_eq!(job.overhead.scale_pixels_per_foot, Some(10.0));
    assert_eq!(job.overhead.image_path.as_deref(), Some("E1_overhead.jpg"));
    assert_eq!(job.overhead.source_name.as_deref(), Some("county-gis"));
    assert_eq!(
        job.overhead.fetched_at,
        Some(Utc.with_ymd_and_hms(2025, 9, 26, 14, 0, 10).unwrap())
    );
    assert!(ws.images.contains("E1_overhead.jpg"));
    assert_eq!(ws.image_files(), vec!["E1_overhead.jpg".to_string()]);
}

#[test]
fn imports_zip_with_wrapping_folder() {
    let ws = Workspace::new();
    let package = ws.path("src/E1_package");
    write_e1_package(&package);
    let archive = ws.path("E1_package.zip");
    create_archive(&package, &archive).expect("zip package");

    let source = PackageSource::detect(&archive).unwrap();
    assert!(matches!(source, PackageSource::Archive(_)));

    let report = JobImportPipeline::new(&ws.store, &ws.images)
        .run(&source)
        .expect("import archive");
    assert_eq!(report.jobs, vec![JobId::from("E1")]);
    assert!(ws.images.contains("E1_overhead.jpg"));
}

#[test]
fn missing_and_escaping_images_are_warnings() {
    let ws = Workspace::new();
    let package = ws.path("package");
    write_bmp(&ws.path("secret.bmp"), 10, 10);
    write_manifest(
        &package,
        vec![
            intake_job("E1", Some("overhead/missing.jpg")),
            intake_job("E2", Some("../secret.bmp")),
            intake_job("E3", None),
        ],
    );

    let report = import_package(&package, &ws.store, &ws.images).expect("import");
    assert_eq!(report.jobs.len(), 3);
    assert_eq!(report.warnings.len(), 2);
    assert_eq!(report.warnings[0].job_id, Some(JobId::from("E1")));
    assert_eq!(report.warnings[1].job_id, Some(JobId::from("E2")));

    for id in ["E1", "E2", "E3"] {
        let job = ws.store.job(&JobId::from(id)).unwrap().expect("job stored");
        assert_eq!(job.status, JobStatus::Ready);
        assert!(job.overhead.image_path.is_none());
    }
    assert!(ws.image_files().is_empty());
    assert!(report.to_string().contains("Warnings (2):"));
}

#[test]
fn commit_failure_imports_nothing() {
    let ws = Workspace::new();
    let package = ws.path("package");
    write_e1_package(&package);
    let store = FailingStore(MemoryStore::new());

    let mut updates = Vec::new();
    let err = JobImportPipeline::new(&store, &ws.images)
        .run_with_progress(&PackageSource::Folder(package), |u| updates.push(u))
        .unwrap_err();

    assert!(matches!(err, FieldpackError::StorageFailure { .. }));
    assert!(store.jobs().unwrap().is_empty());
    let leftovers = fs::read_dir(ws.images.root()).unwrap().count();
    assert_eq!(leftovers, 0, "staged images must not survive a failed commit");

    let tail = &updates[updates.len() - 2..];
    assert_eq!(tail[0].stage, ImportStage::Failed);
    assert!((tail[0].fraction - 0.9).abs() < 1e-9);
    assert_eq!(
        tail[1],
        ProgressUpdate {
            stage: ImportStage::Idle,
            fraction: 0.0
        }
    );
}

#[test]
fn progress_is_monotonic_and_walks_every_stage() {
    let ws = Workspace::new();
    let package = ws.path("package");
    write_bmp(&package.join("a.bmp"), 20, 10);
    write_manifest(
        &package,
        vec![
            intake_job("A", Some("a.bmp")),
            intake_job("B", None),
            intake_job("C", None),
            intake_job("D", None),
        ],
    );

    let mut updates: Vec<ProgressUpdate> = Vec::new();
    JobImportPipeline::new(&ws.store, &ws.images)
        .run_with_progress(&PackageSource::Folder(package), |u| updates.push(u))
        .expect("import");

    assert_eq!(updates.first().unwrap().stage, ImportStage::AcquiringRoot);
    assert_eq!(updates.first().unwrap().fraction, 0.0);
    assert_eq!(
        *updates.last().unwrap(),
        ProgressUpdate {
            stage: ImportStage::Complete,
            fraction: 1.0
        }
    );
    assert!(updates.windows(2).all(|w| w[0].fraction <= w[1].fraction));

    for stage in [
        ImportStage::LocatingManifest,
        ImportStage::ParsingManifest,
        ImportStage::MaterializingEntities,
    ] {
        assert!(updates.iter().any(|u| u.stage == stage), "missing {stage}");
    }

    let materialized: Vec<f64> = updates
        .iter()
        .filter(|u| u.stage == ImportStage::MaterializingEntities)
        .map(|u| u.fraction)
        .collect();
    for expected in [0.5, 0.6, 0.7, 0.8, 0.9] {
        assert!(
            materialized.iter().any(|f| (f - expected).abs() < 1e-9),
            "no update at {expected}: {materialized:?}"
        );
    }
}

#[test]
fn malformed_manifest_fails_then_resets_progress() {
    let ws = Workspace::new();
    let package = ws.path("package");
    fs::create_dir_all(&package).unwrap();
    fs::write(package.join("jobs.json"), r#"{"version": "1.0", "jobs": [}"#).unwrap();

    let mut updates = Vec::new();
    let err = JobImportPipeline::new(&ws.store, &ws.images)
        .run_with_progress(&PackageSource::Folder(package), |u| updates.push(u))
        .unwrap_err();

    assert!(matches!(err, FieldpackError::MalformedManifest { .. }));
    assert!(ws.store.jobs().unwrap().is_empty());
    let n = updates.len();
    assert_eq!(updates[n - 2].stage, ImportStage::Failed);
    assert!((updates[n - 2].fraction - 0.3).abs() < 1e-9);
    assert_eq!(updates[n - 1].stage, ImportStage::Idle);
    assert_eq!(updates[n - 1].fraction, 0.0);
}

#[test]
fn folder_without_manifest_is_missing_manifest() {
    let ws = Workspace::new();
    let package = ws.path("package");
    fs::create_dir_all(package.join("nested/deeper")).unwrap();
    write_manifest(&package.join("nested/deeper"), vec![intake_job("E1", None)]);

    let err = import_package(&package, &ws.store, &ws.images).unwrap_err();
    assert!(matches!(err, FieldpackError::MissingManifest { .. }));
}

#[test]
fn reimport_replaces_job_and_keeps_windows() {
    let ws = Workspace::new();
    let package = ws.path("package");
    write_e1_package(&package);
    import_package(&package, &ws.store, &ws.images).expect("first import");

    let job_id = JobId::from("E1");
    let mut job = ws.store.job(&job_id).unwrap().unwrap();
    let created_at = job.created_at;
    job.status = JobStatus::Completed;
    let mut changes = ChangeSet::new();
    changes
        .upsert_job(job)
        .upsert_window(Window::new("E1", "1", Coord::new(120.0, 80.0)));
    ws.store.commit(changes).unwrap();

    let report = import_package(&package, &ws.store, &ws.images).expect("second import");
    assert_eq!(report.replaced, vec![job_id.clone()]);

    let job = ws.store.job(&job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Ready);
    assert_eq!(job.created_at, created_at);
    assert_eq!(ws.store.windows(&job_id).unwrap().len(), 1);
}

#[test]
fn sample_fixture_imports_with_legacy_zoom_scale() {
    let ws = Workspace::new();
    let package = ws.path("package");
    fs::create_dir_all(&package).unwrap();
    fs::copy("tests/fixtures/sample_intake.json", package.join("jobs.json")).unwrap();
    write_bmp(&package.join("overhead/E1.jpg"), 64, 48);

    let report = import_package(&package, &ws.store, &ws.images).expect("import");
    assert_eq!(report.prepared_by, "dispatch-desk");
    assert_eq!(report.jobs.len(), 3);
    assert_eq!(report.images, 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].job_id, Some(JobId::from("E2")));

    let e2 = ws.store.job(&JobId::from("E2")).unwrap().unwrap();
    assert_eq!(e2.overhead.scale_pixels_per_foot, Some(15.0));
    assert_eq!(
        e2.overhead.fetched_at,
        Some(Utc.with_ymd_and_hms(2025, 9, 26, 14, 5, 0).unwrap())
    );
    let e3 = ws.store.job(&JobId::from("E3")).unwrap().unwrap();
    assert_eq!(e3.overhead, Default::default());
}

#[test]
fn ids_differing_only_in_unsafe_characters_keep_their_own_images() {
    let ws = Workspace::new();
    let package = ws.path("package");
    write_bmp(&package.join("a.bmp"), 400, 300);
    write_bmp(&package.join("b.bmp"), 100, 900);
    write_manifest(
        &package,
        vec![intake_job("A B", Some("a.bmp")), intake_job("A_B", Some("b.bmp"))],
    );

    let report = import_package(&package, &ws.store, &ws.images).expect("import");
    assert_eq!(report.images, 2);

    let spaced = ws.store.job(&JobId::from("A B")).unwrap().unwrap();
    let underscored = ws.store.job(&JobId::from("A_B")).unwrap().unwrap();
    let spaced_image = spaced.overhead.image_path.clone().unwrap();
    let underscored_image = underscored.overhead.image_path.clone().unwrap();
    assert_ne!(spaced_image, underscored_image);
    assert_eq!(
        ImageSize::read_from_file(&ws.images.resolve(&spaced_image)).unwrap(),
        ImageSize::new(400.0, 300.0)
    );
    assert_eq!(
        ImageSize::read_from_file(&ws.images.resolve(&underscored_image)).unwrap(),
        ImageSize::new(100.0, 900.0)
    );

    FieldSession::new(&ws.store, &ws.images)
        .delete_job(&JobId::from("A B"))
        .unwrap();
    assert!(!ws.images.contains(&spaced_image));
    assert!(ws.images.contains(&underscored_image));
}

#[test]
fn unmovable_image_is_detached_from_its_job() {
    let ws = Workspace::new();
    let package = ws.path("package");
    write_e1_package(&package);
    // A non-empty directory where the image should land blocks the move.
    fs::create_dir_all(ws.images.root().join("E1_overhead.jpg/inner")).unwrap();

    let report = import_package(&package, &ws.store, &ws.images).expect("import");
    assert_eq!(report.images, 0);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].job_id, Some(JobId::from("E1")));

    let job = ws.store.job(&JobId::from("E1")).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Ready);
    assert!(job.overhead.image_path.is_none());
    assert_eq!(job.overhead.scale_pixels_per_foot, Some(10.0));
}

#[test]
fn reimport_without_image_removes_the_old_one() {
    let ws = Workspace::new();
    let package = ws.path("package");
    write_e1_package(&package);
    import_package(&package, &ws.store, &ws.images).expect("first import");
    assert_eq!(ws.image_files(), vec!["E1_overhead.jpg".to_string()]);

    let updated = ws.path("updated");
    write_manifest(&updated, vec![intake_job("E1", None)]);
    let report = import_package(&updated, &ws.store, &ws.images).expect("second import");
    assert_eq!(report.replaced, vec![JobId::from("E1")]);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let job = ws.store.job(&JobId::from("E1")).unwrap().unwrap();
    assert!(job.overhead.image_path.is_none());
    assert!(ws.image_files().is_empty());
}

#[test]
fn reimport_with_image_overwrites_in_place() {
    let ws = Workspace::new();
    let package = ws.path("package");
    write_e1_package(&package);
    import_package(&package, &ws.store, &ws.images).expect("first import");

    write_bmp(&package.join("overhead/E1.bmp"), 80, 60);
    import_package(&package, &ws.store, &ws.images).expect("second import");

    assert_eq!(ws.image_files(), vec!["E1_overhead.jpg".to_string()]);
    assert_eq!(
        ImageSize::read_from_file(&ws.images.resolve("E1_overhead.jpg")).unwrap(),
        ImageSize::new(80.0, 60.0)
    );
}
