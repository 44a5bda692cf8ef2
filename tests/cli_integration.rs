//! CLI integration tests for webrtc-natives.
//!
//! Every test runs inside a scratch project directory; none of them needs
//! a real cmake.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the webrtc-natives binary command, isolated from the caller's environment.
fn natives(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("webrtc-natives").unwrap();
    cmd.current_dir(dir)
        .env_remove("WEBRTC_NATIVES_PLATFORM")
        .env_remove("WEBRTC_NATIVES_CMAKE")
        .env("SOURCE_DATE_EPOCH", "1700000000");
    cmd
}

fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A finished Linux build tree with one deliverable and some noise.
fn linux_build_tree(root: &Path) {
    write(root, "build-tree/lib/libwebrtc-java.so", "ELF");
    write(root, "build-tree/lib/libwebrtc-java.so.debug", "symbols");
    write(root, "build-tree/CMakeFiles/CompilerIdC/libwebrtc-java.so", "intermediate");
    write(root, "build-tree/CMakeCache.txt", "cache");
}

// ============================================================================
// webrtc-natives platform
// ============================================================================

#[test]
fn test_platform_list() {
    let tmp = temp_dir();

    natives(tmp.path())
        .args(["platform", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("linux-x86_64"))
        .stdout(predicate::str::contains("linux-arm32"))
        .stdout(predicate::str::contains("aarch32-linux-clang.cmake"))
        .stdout(predicate::str::contains("windows-x86_64"))
        .stdout(predicate::str::contains("macos-aarch64"))
        .stdout(predicate::str::contains("x86_64-macos-cross.cmake"));
}

#[test]
fn test_platform_override() {
    let tmp = temp_dir();

    natives(tmp.path())
        .args(["platform", "--platform", "linux_x86_64"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Platform:   linux-x86_64"))
        .stdout(predicate::str::contains("dev.kastle.webrtc.linux_x86_64"))
        .stdout(predicate::str::contains("webrtc-java-0.1.0-linux-x86_64.jar"))
        .stdout(predicate::str::contains("missing"));
}

#[test]
fn test_platform_override_from_env() {
    let tmp = temp_dir();

    natives(tmp.path())
        .arg("platform")
        .env("WEBRTC_NATIVES_PLATFORM", "windows-x86_64")
        .assert()
        .success()
        .stdout(predicate::str::contains("Platform:   windows-x86_64"))
        .stdout(predicate::str::contains("Visual Studio 17 2022"));
}

#[test]
fn test_unsupported_platform() {
    let tmp = temp_dir();

    natives(tmp.path())
        .args(["platform", "--platform", "solaris-sparc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported platform"))
        .stderr(predicate::str::contains("platform --list"));
}

#[test]
fn test_missing_explicit_config() {
    let tmp = temp_dir();

    natives(tmp.path())
        .args(["platform", "--list", "--config", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn test_invalid_config() {
    let tmp = temp_dir();
    write(tmp.path(), "natives.toml", "[build\njobs = ");

    natives(tmp.path())
        .args(["platform", "--list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config"));
}

// ============================================================================
// webrtc-natives build
// ============================================================================

#[test]
fn test_build_dry_run_windows() {
    let tmp = temp_dir();

    natives(tmp.path())
        .args(["build", "--platform", "windows-x86_64", "--dry-run", "--jobs", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# windows-x86_64"))
        .stdout(predicate::str::contains("\"Visual Studio 17 2022\""))
        .stdout(predicate::str::contains("-A x64"))
        .stdout(predicate::str::contains("-DOUTPUT_NAME_SUFFIX=windows-x86_64"))
        .stdout(predicate::str::contains("--build"))
        .stdout(predicate::str::contains("--parallel").not());

    assert!(!tmp.path().join("build").exists());
}

#[test]
fn test_build_dry_run_from_build_skips_configure() {
    let tmp = temp_dir();

    natives(tmp.path())
        .args([
            "build",
            "--platform",
            "linux-x86_64",
            "--dry-run",
            "--from",
            "build",
            "--jobs",
            "3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("--parallel 3"))
        .stdout(predicate::str::contains("-DCMAKE_BUILD_TYPE").not());
}

#[test]
fn test_build_rejects_unresumable_stage() {
    let tmp = temp_dir();

    natives(tmp.path())
        .args(["build", "--from", "resolve"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("resolve"));
}

#[test]
fn test_build_without_project_fails() {
    let tmp = temp_dir();
    let cmake = tmp.path().join("cmake");
    write(tmp.path(), "cmake", "");

    natives(tmp.path())
        .args(["build", "--platform", "linux-x86_64"])
        .env("WEBRTC_NATIVES_CMAKE", &cmake)
        .assert()
        .failure()
        .stderr(predicate::str::contains("configure stage failed for `linux-x86_64`"))
        .stderr(predicate::str::contains("1 of 1 platform failed"));
}

#[test]
fn test_build_failure_is_per_platform() {
    let tmp = temp_dir();

    natives(tmp.path())
        .args(["build", "--platform", "linux-x86_64,solaris-sparc", "--dry-run"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("# linux-x86_64"))
        .stderr(predicate::str::contains("unsupported platform"))
        .stderr(predicate::str::contains("solaris-sparc"));
}

// ============================================================================
// webrtc-natives stage / package
// ============================================================================

#[test]
fn test_stage_existing_build_tree() {
    let tmp = temp_dir();
    linux_build_tree(tmp.path());

    natives(tmp.path())
        .args([
            "stage",
            "--platform",
            "linux-x86_64",
            "--build-dir",
            "build-tree",
            "--output",
            "staged",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("libwebrtc-java-linux-x86_64.so"));

    let staged: Vec<_> = fs::read_dir(tmp.path().join("staged"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(staged, ["libwebrtc-java-linux-x86_64.so"]);
    assert_eq!(
        fs::read_to_string(tmp.path().join("staged/libwebrtc-java-linux-x86_64.so")).unwrap(),
        "ELF"
    );
}

#[test]
fn test_stage_without_libraries() {
    let tmp = temp_dir();
    write(tmp.path(), "build-tree/CMakeCache.txt", "cache");

    natives(tmp.path())
        .args(["stage", "--platform", "linux-x86_64", "--build-dir", "build-tree"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no `webrtc-java` libraries"));
}

#[test]
fn test_stage_refuses_project_root_as_output() {
    let tmp = temp_dir();
    linux_build_tree(tmp.path());
    write(tmp.path(), "important.txt", "keep");
    let outside = temp_dir();
    linux_build_tree(outside.path());
    let outside_build = outside.path().join("build-tree");

    for (build_dir, output) in [
        (Path::new("build-tree"), "."),
        (Path::new("build-tree"), "build-tree/../.."),
        (outside_build.as_path(), "."),
    ] {
        natives(tmp.path())
            .args(["stage", "--platform", "linux-x86_64", "--output", output])
            .arg("--build-dir")
            .arg(build_dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("must not contain"));
    }

    assert_eq!(fs::read_to_string(tmp.path().join("important.txt")).unwrap(), "keep");
    assert!(tmp.path().join("build-tree/lib/libwebrtc-java.so").is_file());
    assert!(outside_build.join("lib/libwebrtc-java.so").is_file());
}

#[test]
fn test_package_existing_build_tree() {
    let tmp = temp_dir();
    linux_build_tree(tmp.path());
    write(
        tmp.path(),
        "natives.toml",
        "[project]\nversion = \"0.15.0\"\n",
    );

    natives(tmp.path())
        .args([
            "package",
            "--platform",
            "linux-x86_64",
            "--build-dir",
            "build-tree",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("webrtc-java-0.15.0-linux-x86_64.jar"));

    let jar = tmp
        .path()
        .join("build/libs/webrtc-java-0.15.0-linux-x86_64.jar");
    assert!(jar.is_file());
    assert!(tmp
        .path()
        .join("build/natives/staging/linux-x86_64/libwebrtc-java-linux-x86_64.so")
        .is_file());
}

#[test]
fn test_package_is_reproducible() {
    let tmp = temp_dir();
    linux_build_tree(tmp.path());

    let run = |out: &str| {
        natives(tmp.path())
            .args([
                "package",
                "--platform",
                "linux-x86_64",
                "--build-dir",
                "build-tree",
                "--output",
                out,
            ])
            .assert()
            .success();
        fs::read(tmp.path().join(out).join("webrtc-java-0.1.0-linux-x86_64.jar")).unwrap()
    };

    assert_eq!(run("first"), run("second"));
}

// ============================================================================
// webrtc-natives aggregate
// ============================================================================

#[test]
fn test_aggregate_writes_index() {
    let tmp = temp_dir();
    for name in [
        "webrtc-java-0.15.0.jar",
        "webrtc-java-0.15.0-sources.jar",
        "webrtc-java-0.15.0-linux-x86_64.jar",
        "webrtc-java-0.15.0-macos-aarch64.jar",
        "webrtc-java-0.15.0-windows-x86_64.jar",
    ] {
        write(tmp.path(), &format!("units/{}", name), name);
    }

    natives(tmp.path())
        .args(["aggregate", "units", "--version", "0.15.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("linux-x86_64"))
        .stdout(predicate::str::contains("windows-x86_64"))
        .stdout(predicate::str::contains("sources").not());

    let index = fs::read_to_string(tmp.path().join("units/natives-index.json")).unwrap();
    let index: serde_json::Value = serde_json::from_str(&index).unwrap();
    assert_eq!(index["version"], "0.15.0");
    assert_eq!(index["units"].as_array().unwrap().len(), 3);
}

#[test]
fn test_aggregate_no_index() {
    let tmp = temp_dir();
    write(tmp.path(), "units/webrtc-java-0.1.0-linux-aarch64.jar", "arm");

    natives(tmp.path())
        .args(["aggregate", "units", "--no-index"])
        .assert()
        .success()
        .stdout(predicate::str::contains("linux-aarch64"));

    assert!(!tmp.path().join("units/natives-index.json").exists());
}

#[test]
fn test_aggregate_missing_directory() {
    let tmp = temp_dir();

    natives(tmp.path())
        .args(["aggregate", "units"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

// ============================================================================
// webrtc-natives clean
// ============================================================================

#[test]
fn test_clean_platform() {
    let tmp = temp_dir();
    write(tmp.path(), "build/natives/linux-x86_64/CMakeCache.txt", "");
    write(tmp.path(), "build/natives/linux-aarch64/CMakeCache.txt", "");
    write(tmp.path(), "build/natives/staging/linux-x86_64/libwebrtc-java-linux-x86_64.so", "");

    natives(tmp.path())
        .args(["clean", "--platform", "linux-x86_64"])
        .assert()
        .success();

    assert!(!tmp.path().join("build/natives/linux-x86_64").exists());
    assert!(!tmp.path().join("build/natives/staging/linux-x86_64").exists());
    assert!(tmp.path().join("build/natives/linux-aarch64").exists());
}

#[test]
fn test_clean_all() {
    let tmp = temp_dir();
    write(tmp.path(), "build/natives/linux-x86_64/CMakeCache.txt", "");
    write(tmp.path(), "build/libs/webrtc-java-0.1.0-linux-x86_64.jar", "");

    natives(tmp.path()).arg("clean").assert().success();
    assert!(!tmp.path().join("build/natives").exists());
    assert!(tmp.path().join("build/libs").exists());

    natives(tmp.path()).args(["clean", "--all"]).assert().success();
    assert!(!tmp.path().join("build/libs").exists());
}

// ============================================================================
// webrtc-natives completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = temp_dir();

    natives(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("webrtc-natives"));
}
