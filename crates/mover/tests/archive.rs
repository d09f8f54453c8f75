use std::fs;
use std::path::Path;

use gcode_archiver_mover::{Mode, MoveError, MoveOutcome, MoveSummary, Mover};
use tempfile::TempDir;

struct Layout {
    _tmp: TempDir,
    gcode: std::path::PathBuf,
    archive: std::path::PathBuf,
}

fn layout(files: &[&str]) -> Layout {
    let tmp = TempDir::new().unwrap();
    let gcode = tmp.path().join("gcode");
    let archive = gcode.join("archive");
    fs::create_dir_all(&gcode).unwrap();
    for name in files {
        let path = gcode.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("; {}\nG28\n", name)).unwrap();
    }
    Layout { _tmp: tmp, gcode, archive }
}

async fn run(mover: &Mover, names: &[&str]) -> (MoveSummary, Vec<MoveOutcome>) {
    let mut outcomes = Vec::new();
    let summary = mover
        .archive(names.iter().copied(), |o| outcomes.push(o.clone()))
        .await
        .unwrap();
    (summary, outcomes)
}

fn listing(dir: &Path) -> Vec<String> {
    let mut out: Vec<String> = walk(dir)
        .into_iter()
        .map(|p| p.strip_prefix(dir).unwrap().to_string_lossy().to_string())
        .collect();
    out.sort();
    out
}

fn walk(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                out.extend(walk(&path));
            } else {
                out.push(path);
            }
        }
    }
    out
}

#[tokio::test]
async fn dry_run_plans_without_touching_disk() {
    let l = layout(&["a.gcode", "b.gcode", "keep.gcode"]);
    let before = listing(&l.gcode);

    let mover = Mover::new(&l.gcode, &l.archive, Mode::DryRun);
    let (summary, outcomes) = run(&mover, &["a.gcode", "b.gcode"]).await;

    assert_eq!(summary.planned, 2);
    assert_eq!(listing(&l.gcode), before);
    assert!(!l.archive.exists());
    assert_eq!(
        outcomes[0].to_string(),
        format!(
            "mv -n \"{}\" \"{}\"",
            l.gcode.join("a.gcode").display(),
            l.archive.join("a.gcode").display()
        )
    );

    // a second dry run sees the same thing
    let (again, _) = run(&mover, &["a.gcode", "b.gcode"]).await;
    assert_eq!(again, summary);
}

#[tokio::test]
async fn execute_moves_files_and_creates_directories() {
    let l = layout(&["a.gcode", "parts/bracket.gcode", "keep.gcode"]);

    let mover = Mover::new(&l.gcode, &l.archive, Mode::Execute);
    let (summary, outcomes) = run(&mover, &["a.gcode", "parts/bracket.gcode"]).await;

    assert_eq!(summary.moved, 2);
    assert!(matches!(outcomes[0], MoveOutcome::Moved { .. }));
    assert!(l.archive.join("a.gcode").is_file());
    assert!(l.archive.join("parts/bracket.gcode").is_file());
    assert!(!l.gcode.join("a.gcode").exists());
    assert!(l.gcode.join("keep.gcode").is_file());
    assert_eq!(
        fs::read_to_string(l.archive.join("a.gcode")).unwrap(),
        "; a.gcode\nG28\n"
    );
}

#[tokio::test]
async fn rerunning_execute_is_idempotent() {
    let l = layout(&["a.gcode"]);
    let mover = Mover::new(&l.gcode, &l.archive, Mode::Execute);

    let (first, _) = run(&mover, &["a.gcode"]).await;
    assert_eq!(first.moved, 1);

    let (second, outcomes) = run(&mover, &["a.gcode"]).await;
    assert_eq!(second.moved, 0);
    assert_eq!(second.missing, 1);
    assert!(outcomes[0].is_quiet());
    assert!(l.archive.join("a.gcode").is_file());
}

#[tokio::test]
async fn never_clobbers_existing_destination() {
    let l = layout(&["a.gcode"]);
    fs::create_dir_all(&l.archive).unwrap();
    fs::write(l.archive.join("a.gcode"), "older copy").unwrap();

    let mover = Mover::new(&l.gcode, &l.archive, Mode::Execute);
    let (summary, outcomes) = run(&mover, &["a.gcode"]).await;

    assert_eq!(summary.existing, 1);
    assert!(matches!(outcomes[0], MoveOutcome::DestinationExists { .. }));
    assert_eq!(fs::read_to_string(l.archive.join("a.gcode")).unwrap(), "older copy");
    assert!(l.gcode.join("a.gcode").is_file());
}

#[tokio::test]
async fn missing_and_unsafe_names_do_not_stop_the_run() {
    let l = layout(&["real.gcode"]);
    let mover = Mover::new(&l.gcode, &l.archive, Mode::Execute);

    let (summary, outcomes) =
        run(&mover, &["ghost.gcode", "../outside.gcode", "real.gcode"]).await;

    assert_eq!(summary.missing, 1);
    assert_eq!(summary.refused, 1);
    assert_eq!(summary.moved, 1);
    assert!(matches!(outcomes[1], MoveOutcome::Refused { .. }));
    assert!(l.archive.join("real.gcode").is_file());
}

#[tokio::test]
async fn directories_are_not_archived() {
    let l = layout(&[]);
    fs::create_dir_all(l.gcode.join("folder.gcode")).unwrap();

    let mover = Mover::new(&l.gcode, &l.archive, Mode::Execute);
    let (summary, _) = run(&mover, &["folder.gcode"]).await;

    assert_eq!(summary.missing, 1);
    assert!(l.gcode.join("folder.gcode").is_dir());
}

#[tokio::test]
async fn files_already_in_archive_are_left_alone() {
    let l = layout(&["archive/old.gcode"]);
    let mover = Mover::new(&l.gcode, &l.archive, Mode::Execute);

    let (summary, outcomes) = run(&mover, &["archive/old.gcode"]).await;

    assert_eq!(summary.moved, 0);
    assert_eq!(summary.archived, 1);
    assert_eq!(summary.missing, 0);
    assert!(matches!(outcomes[0], MoveOutcome::AlreadyArchived { .. }));
    assert!(l.archive.join("old.gcode").is_file());
    assert!(!l.archive.join("archive").exists());
}

#[tokio::test]
async fn move_failures_are_per_file() {
    let l = layout(&["a.gcode", "b.gcode", "c.gcode"]);
    // a regular file where the archive directory should be
    fs::write(&l.archive, "not a directory").unwrap();

    let mover = Mover::new(&l.gcode, &l.archive, Mode::Execute);
    let (summary, outcomes) = run(&mover, &["a.gcode", "b.gcode", "c.gcode"]).await;

    assert_eq!(summary.failed, 3);
    assert_eq!(summary.moved, 0);
    assert_eq!(outcomes.len(), 3);
    for (outcome, name) in outcomes.iter().zip(["a.gcode", "b.gcode", "c.gcode"]) {
        assert!(matches!(outcome, MoveOutcome::Failed { .. }), "got {:?}", outcome);
        assert!(outcome.to_string().starts_with(&format!(
            "error moving {} -> {}: ",
            l.gcode.join(name).display(),
            l.archive.join(name).display()
        )));
        assert!(l.gcode.join(name).is_file());
    }
}

#[cfg(unix)]
#[tokio::test]
async fn symlinked_files_are_moved_as_links() {
    let l = layout(&[]);
    let target = l.gcode.parent().unwrap().join("shared.gcode");
    fs::write(&target, "G28\n").unwrap();
    std::os::unix::fs::symlink(&target, l.gcode.join("linked.gcode")).unwrap();

    let mover = Mover::new(&l.gcode, &l.archive, Mode::Execute);
    let (summary, outcomes) = run(&mover, &["linked.gcode"]).await;

    assert_eq!(summary.moved, 1);
    assert!(matches!(outcomes[0], MoveOutcome::Moved { .. }));
    let moved = l.archive.join("linked.gcode");
    assert!(fs::symlink_metadata(&moved).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&moved).unwrap(), target);
    assert!(target.is_file());
}

#[tokio::test]
async fn missing_source_directory_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let mover = Mover::new(tmp.path().join("nope"), tmp.path().join("archive"), Mode::Execute);

    let err = mover.archive(["a.gcode"], |_| {}).await.unwrap_err();
    assert!(matches!(err, MoveError::SourceDirMissing(_)));
}

#[tokio::test]
async fn nothing_to_archive_needs_no_directory() {
    let tmp = TempDir::new().unwrap();
    let mover = Mover::new(tmp.path().join("nope"), tmp.path().join("archive"), Mode::Execute);

    let names: [&str; 0] = [];
    let summary = mover.archive(names, |_| {}).await.unwrap();
    assert_eq!(summary, MoveSummary::default());
}
