use super::*;
use crate::common::db::test_helpers::setup_test_db;
use crate::external::s3::test_helpers::MemoryStorage;
use crate::pipeline::load::load_readings;
use crate::pipeline::models::CleanReading;
use sea_orm::PaginatorTrait;
use snapshot::decode_snapshot;

fn archive_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 25).unwrap()
}

fn reading(plant_id: i32, plant_name: &str, minute: u32) -> CleanReading {
    let day = archive_date();
    CleanReading {
        plant_id,
        plant_name: plant_name.to_string(),
        soil_moisture: 27.5,
        temperature: 11.25,
        last_watered: day.and_hms_opt(8, 0, 0).unwrap(),
        recording_at: day.and_hms_opt(13, minute, 0).unwrap(),
        botanist_first_name: "Eliza".to_string(),
        botanist_last_name: "Andrews".to_string(),
        botanist_email: "eliza.andrews@lnhm.co.uk".to_string(),
        botanist_phone: "(846)669-6651x75948".to_string(),
    }
}

async fn recording_count(db: &DatabaseConnection) -> u64 {
    recordings::Entity::find().count(db).await.unwrap()
}

#[test]
fn test_snapshot_key_format() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
    assert_eq!(snapshot_key("plant_data", date), "plant_data/2024-03-07.parquet");
    assert_eq!(snapshot_key("/plant_data/", date), "plant_data/2024-03-07.parquet");
    assert_eq!(snapshot_key("", date), "2024-03-07.parquet");
}

#[tokio::test]
async fn test_successful_upload_empties_recording_table() {
    let db = setup_test_db().await;
    load_readings(
        &db,
        &[reading(2, "Tulip", 1), reading(1, "Rose", 0), reading(2, "Tulip", 2)],
    )
    .await
    .unwrap();
    let storage = MemoryStorage::default();

    let summary = run_archive(&db, &storage, "plant_data", archive_date())
        .await
        .unwrap();

    assert_eq!(summary.rows_archived, 3);
    assert_eq!(
        summary.object_key.as_deref(),
        Some("plant_data/2024-11-25.parquet")
    );
    assert_eq!(recording_count(&db).await, 0);
    // Reference data stays for the next pipeline run
    assert_eq!(plants::Entity::find().count(&db).await.unwrap(), 2);

    let data = storage
        .get_object("plant_data/2024-11-25.parquet")
        .await
        .unwrap();
    let rows = decode_snapshot(&data).unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.plant_name.as_str()).collect();
    assert_eq!(names, vec!["Rose", "Tulip", "Tulip"]);
    assert!(rows.iter().all(|r| r.botanist_last_name == "Andrews"));
}

#[tokio::test]
async fn test_local_snapshot_file_is_removed_after_upload() {
    let db = setup_test_db().await;
    load_readings(&db, &[reading(1, "Rose", 0)]).await.unwrap();
    let storage = MemoryStorage::default();
    let work_dir = tempfile::tempdir().unwrap();

    archive_in_dir(&db, &storage, "plant_data", archive_date(), work_dir.path())
        .await
        .unwrap();

    assert!(!work_dir.path().join("2024-11-25.parquet").exists());
    assert_eq!(std::fs::read_dir(work_dir.path()).unwrap().count(), 0);
    assert_eq!(storage.keys(), vec!["plant_data/2024-11-25.parquet".to_string()]);
}

#[tokio::test]
async fn test_failed_upload_leaves_recordings_untouched() {
    let db = setup_test_db().await;
    load_readings(&db, &[reading(1, "Rose", 0), reading(1, "Rose", 1)])
        .await
        .unwrap();
    let storage = MemoryStorage::failing();

    let err = run_archive(&db, &storage, "plant_data", archive_date())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Storage { .. }));
    assert_eq!(recording_count(&db).await, 2);
    assert!(storage.keys().is_empty());
}

#[tokio::test]
async fn test_empty_table_uploads_nothing() {
    let db = setup_test_db().await;
    let storage = MemoryStorage::default();

    let summary = run_archive(&db, &storage, "plant_data", archive_date())
        .await
        .unwrap();

    assert_eq!(
        summary,
        ArchiveSummary {
            rows_archived: 0,
            object_key: None,
        }
    );
    assert!(storage.keys().is_empty());
}

#[tokio::test]
async fn test_same_day_rerun_replaces_snapshot() {
    let db = setup_test_db().await;
    let storage = MemoryStorage::default();

    load_readings(&db, &[reading(1, "Rose", 0)]).await.unwrap();
    run_archive(&db, &storage, "plant_data", archive_date())
        .await
        .unwrap();
    load_readings(&db, &[reading(1, "Rose", 5), reading(1, "Rose", 6)])
        .await
        .unwrap();
    run_archive(&db, &storage, "plant_data", archive_date())
        .await
        .unwrap();

    assert_eq!(storage.keys(), vec!["plant_data/2024-11-25.parquet".to_string()]);
    let data = storage
        .get_object("plant_data/2024-11-25.parquet")
        .await
        .unwrap();
    assert_eq!(decode_snapshot(&data).unwrap().len(), 2);
}
