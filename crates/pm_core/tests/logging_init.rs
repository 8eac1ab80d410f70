use pm_core::db::open_db_in_memory;
use pm_core::model::funder::{FunderPatch, NewFunder};
use pm_core::{
    init_logging, logging_status, FunderService, LogTarget, SqliteFunderRepository,
    SqliteRecordGuard,
};
use std::fs;
use std::path::Path;

fn read_logs(dir: &Path) -> String {
    log::logger().flush();
    let mut contents = String::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "log") {
            contents.push_str(&fs::read_to_string(path).unwrap());
        }
    }
    contents
}

#[test]
fn file_logging_is_idempotent_and_rejects_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("logs");

    init_logging("debug", Some(&log_dir)).unwrap();
    init_logging("DEBUG", Some(&log_dir)).unwrap();

    let (level, target) = logging_status().unwrap();
    assert_eq!(level, "debug");
    assert_eq!(target, LogTarget::Directory(log_dir.clone()));
    assert!(log_dir.is_dir());

    let err = init_logging("info", Some(&log_dir)).unwrap_err();
    assert!(err.contains("already initialized"));
    let err = init_logging("debug", None).unwrap_err();
    assert!(err.contains("already initialized"));

    let conn = open_db_in_memory().unwrap();
    let funders = FunderService::new(
        SqliteFunderRepository::try_new(&conn).unwrap(),
        SqliteRecordGuard::try_new(&conn).unwrap(),
    );
    let funder = funders
        .create(NewFunder::new("Global Fund", "International"))
        .unwrap();
    funders
        .update(
            funder.id,
            FunderPatch {
                funder_type: Some("Multilateral".to_string()),
                ..FunderPatch::default()
            },
        )
        .unwrap();

    let logs = read_logs(&log_dir);
    assert!(logs.contains(&format!(
        "event=funder_create module=service status=ok id={}",
        funder.id
    )));
    assert!(logs.contains(&format!(
        "event=funder_update module=service status=ok id={}",
        funder.id
    )));
    assert!(logs.contains("event=db_open module=db status=ok"));
}
