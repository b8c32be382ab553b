use assert_cmd::cargo::cargo_bin_cmd;

mod common;

use common::find_python;

#[test]
fn invalid_spec_exits_with_two() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dest = temp.path().join("env");
    let output = cargo_bin_cmd!("vpy")
        .args([dest.to_str().unwrap(), "--python", "3.x", "--no-seed"])
        .output()
        .expect("run vpy");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid interpreter spec"), "{stderr}");
    assert!(!dest.exists(), "nothing may be created on bad input");
}

#[test]
fn rejected_destination_exits_with_two() {
    let Some(python) = find_python() else {
        eprintln!("skipping destination test (python not found)");
        return;
    };
    let sep = if cfg!(windows) { ';' } else { ':' };
    let output = cargo_bin_cmd!("vpy")
        .env("VPY_NO_CACHE", "1")
        .args([
            &format!("bad{sep}dest"),
            "--python",
            python.to_str().unwrap(),
            "--no-seed",
        ])
        .output()
        .expect("run vpy");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("refusing destination"), "{stderr}");
}

#[test]
fn unresolvable_interpreter_exits_with_one() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dest = temp.path().join("env");
    let output = cargo_bin_cmd!("vpy")
        .env("VPY_NO_CACHE", "1")
        .args([dest.to_str().unwrap(), "--python", "9.9", "--no-seed"])
        .output()
        .expect("run vpy");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no interpreter satisfies"), "{stderr}");
}
