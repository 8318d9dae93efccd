use std::fs;
use std::time::{Duration, SystemTime};
use wslogger::{LogSink, Logger, RotatingFileSink, RotationConfig};

#[test]
fn size_limit_triggers_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("json_log.txt");
    let log = Logger::builder()
        .json(true)
        .app_name("JsonLogger")
        .rotating_file(RotationConfig::new(&path, 1, 3, 1, false))
        .build()
        .unwrap();

    let message = "x".repeat(8 * 1024);
    for i in 0..200 {
        log.info((message.as_str(), "i", i));
    }
    log.flush();

    assert!(path.exists());
    let backup = dir.path().join("json_log.txt.1");
    assert!(backup.exists(), "missing rotated backup");

    // every line stays whole across the rotation boundary
    for file in [&path, &backup] {
        for line in fs::read_to_string(file).unwrap().lines() {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(record["app_name"], "JsonLogger");
        }
    }
}

#[test]
fn backup_count_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    let sink = RotatingFileSink::open(RotationConfig::new(&path, 1, 2, 0, false)).unwrap();
    for _ in 0..4 {
        sink.write_line(b"line\n").unwrap();
        sink.rotate().unwrap();
    }
    assert!(sink.backups().len() <= 2, "{:?}", sink.backups());
}

#[test]
fn expired_backups_are_pruned_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    let stale = dir.path().join("app.log.1");
    fs::write(&stale, "old\n").unwrap();
    let file = fs::File::options().write(true).open(&stale).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(3 * 24 * 60 * 60)).unwrap();
    drop(file);

    let sink = RotatingFileSink::open(RotationConfig::new(&path, 1, 5, 2, false)).unwrap();
    assert!(!stale.exists());
    assert!(sink.backups().is_empty());
}

#[test]
fn compressed_backups() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    let sink = RotatingFileSink::open(RotationConfig::new(&path, 1, 3, 0, true)).unwrap();
    sink.write_line(b"to be compressed\n").unwrap();
    sink.rotate().unwrap();
    let backups = sink.backups();
    assert_eq!(backups.len(), 1);
    assert!(backups[0].to_string_lossy().ends_with(".gz"), "{:?}", backups);
}
