use spice_core::layout::{
    remove_tree, select_base_dir, OutputLayout, APP_DIR_NAME, SCRATCH_DIR, SURVEYOR_DIR, SURVEY_DIR,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

#[test]
fn test_select_base_dir_fallback_chain() {
    struct TestCase {
        name: &'static str,
        home: Option<&'static str>,
        var_tmp_exists: bool,
        expected: PathBuf,
    }

    let test_cases = vec![
        TestCase {
            name: "regular home",
            home: Some("/home/dev"),
            var_tmp_exists: true,
            expected: Path::new("/home/dev").join(APP_DIR_NAME),
        },
        TestCase {
            name: "root home falls back to /var/tmp",
            home: Some("/"),
            var_tmp_exists: true,
            expected: Path::new("/var/tmp").join(APP_DIR_NAME),
        },
        TestCase {
            name: "blank home falls back to /var/tmp",
            home: Some("  "),
            var_tmp_exists: true,
            expected: Path::new("/var/tmp").join(APP_DIR_NAME),
        },
        TestCase {
            name: "no home and no /var/tmp falls back to /tmp",
            home: None,
            var_tmp_exists: false,
            expected: Path::new("/tmp").join(APP_DIR_NAME),
        },
    ];

    for tc in test_cases {
        let actual = select_base_dir(tc.home.map(Path::new), tc.var_tmp_exists);
        assert_eq!(actual, tc.expected, "{}", tc.name);
    }
}

#[test]
fn test_create_builds_nested_layout() {
    let base = tempdir().unwrap();
    let layout = OutputLayout::create(base.path()).expect("layout should be created");

    assert_eq!(layout.surveyor_root, base.path().join(SURVEYOR_DIR));
    assert_eq!(layout.invocation_dir.parent(), Some(layout.surveyor_root.as_path()));
    assert_eq!(layout.survey_output_dir, layout.invocation_dir.join(SURVEY_DIR));
    assert_eq!(layout.scratch_dir, layout.invocation_dir.join(SCRATCH_DIR));
    assert!(layout.survey_output_dir.is_dir());
    assert!(layout.scratch_dir.is_dir());
}

#[test]
fn test_successive_layouts_never_share_an_invocation_dir() {
    let base = tempdir().unwrap();
    let first = OutputLayout::create(base.path()).unwrap();
    let second = OutputLayout::create(base.path()).unwrap();

    assert_ne!(first.invocation_dir, second.invocation_dir);
    assert!(!first.invocation_dir.starts_with(&second.invocation_dir));
    assert!(!second.invocation_dir.starts_with(&first.invocation_dir));
    let entries = fs::read_dir(base.path().join(SURVEYOR_DIR)).unwrap().count();
    assert_eq!(entries, 2);
}

#[test]
fn test_scratch_guard_removes_only_scratch() {
    let base = tempdir().unwrap();
    let layout = OutputLayout::create(base.path()).unwrap();
    fs::create_dir_all(layout.scratch_dir.join("a/b")).unwrap();
    fs::write(layout.scratch_dir.join("a/b/file.bin"), b"data").unwrap();
    fs::write(layout.survey_output_dir.join("out.grc"), b"adg").unwrap();

    drop(layout.scratch_guard());

    assert!(!layout.scratch_dir.exists());
    assert!(layout.survey_output_dir.join("out.grc").exists());
}

#[test]
fn test_remove_tree_tolerates_missing_directory() {
    let base = tempdir().unwrap();
    let missing = base.path().join("never-created");

    remove_tree(&missing).expect("missing tree is not an error");

    let scratch = base.path().join("scratch");
    fs::create_dir_all(scratch.join("nested")).unwrap();
    fs::write(scratch.join("nested/x.txt"), b"x").unwrap();
    remove_tree(&scratch).unwrap();
    remove_tree(&scratch).expect("second removal is a no-op");
    assert!(!scratch.exists());
}
