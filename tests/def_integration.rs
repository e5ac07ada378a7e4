//! Integration tests for the declaration scanner.
//!
//! Fixtures under `testdata/def` are copied into a temp dir before any
//! rewrite so the checked-in files never change.

use std::fs;
use std::path::{Path, PathBuf};

use ctxfmt::{Config, Injector, Mode, Policy};
use tempfile::TempDir;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("def")
}

/// Copy the fixture package into a fresh temp dir.
fn copy_fixture() -> TempDir {
    let temp = TempDir::new().expect("should create temp dir");
    for entry in fs::read_dir(testdata_path()).expect("should read testdata dir") {
        let path = entry.expect("should read entry").path();
        fs::copy(&path, temp.path().join(path.file_name().unwrap())).expect("should copy fixture");
    }
    temp
}

fn fixture_policy() -> Policy {
    let config =
        Config::parse_file(testdata_path().join("ctxfmt.yaml")).expect("should parse config");
    ctxfmt::config::validate(&config).expect("fixture config should be valid");
    Policy::from_config(&config).expect("should build policy")
}

fn go_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|e| e == "go").unwrap_or(false))
        .collect();
    files.sort();
    files
}

#[test]
fn test_dry_run_reports_in_traversal_order() {
    let temp = copy_fixture();
    let policy = fixture_policy();
    let injector = Injector::new(&policy, Mode::DryRun);

    let mut lines = Vec::new();
    for file in go_files(temp.path()) {
        let outcome = injector.scan_file(&file).expect("scan should succeed");
        assert!(!outcome.rewritten);
        lines.extend(outcome.findings.iter().map(|f| {
            let rendered = f.render();
            rendered
                .strip_prefix(&format!("{}/", temp.path().display()))
                .unwrap_or(&rendered)
                .to_string()
        }));
    }

    assert_eq!(
        lines,
        vec![
            "service.go at line 10: UserRepository.FindByID()",
            "service.go at line 11: UserRepository.Save()",
            "service.go at line 12: UserRepository.Count()",
            "service.go at line 28: userService.Get()",
            "service.go at line 35: userService.Rename()",
        ]
    );

    // Dry-run never mutates
    let original = fs::read_to_string(testdata_path().join("service.go")).unwrap();
    assert_eq!(
        fs::read_to_string(temp.path().join("service.go")).unwrap(),
        original
    );
}

#[test]
fn test_rewrite_matches_golden() {
    let temp = copy_fixture();
    let policy = fixture_policy();
    let injector = Injector::new(&policy, Mode::Rewrite);

    let mut rewritten = Vec::new();
    for file in go_files(temp.path()) {
        if injector.scan_file(&file).expect("scan should succeed").rewritten {
            rewritten.push(file.file_name().unwrap().to_string_lossy().to_string());
        }
    }
    assert_eq!(rewritten, vec!["service.go"]);

    let golden = fs::read_to_string(testdata_path().join("service.go.golden")).unwrap();
    assert_eq!(
        fs::read_to_string(temp.path().join("service.go")).unwrap(),
        golden
    );

    // Excluded files are left exactly as they were
    for name in ["mock_service.go", "zz_generated.go"] {
        assert_eq!(
            fs::read_to_string(temp.path().join(name)).unwrap(),
            fs::read_to_string(testdata_path().join(name)).unwrap(),
            "{} should be untouched",
            name
        );
    }
}

#[test]
fn test_second_rewrite_changes_nothing() {
    let temp = copy_fixture();
    let policy = fixture_policy();
    let injector = Injector::new(&policy, Mode::Rewrite);
    let file = temp.path().join("service.go");

    assert!(injector.scan_file(&file).unwrap().rewritten);
    let once = fs::read_to_string(&file).unwrap();

    let again = injector.scan_file(&file).unwrap();
    assert!(!again.rewritten);
    assert_eq!(fs::read_to_string(&file).unwrap(), once);

    let report = Injector::new(&policy, Mode::DryRun).scan_file(&file).unwrap();
    assert!(report.findings.is_empty());
}

#[test]
fn test_default_policy_widens_to_every_interface() {
    let temp = copy_fixture();
    let policy = Policy::from_config(&Config::default()).unwrap();
    let outcome = Injector::new(&policy, Mode::DryRun)
        .scan_file(&temp.path().join("service.go"))
        .unwrap();

    let names: Vec<_> = outcome
        .findings
        .iter()
        .map(|f| format!("{}.{}", f.qualifier, f.name))
        .collect();
    assert_eq!(
        names,
        vec![
            "UserRepository.FindByID",
            "UserRepository.Save",
            "UserRepository.Count",
            "Clock.Now",
            "userService.Get",
            "userService.Rename",
            "userService.PreLoad",
        ]
    );
}
