//! Test fixtures for common test scenarios.
//!
//! Build trees as a native build would leave them, and a scripted stand-in
//! for `cmake` that records its arguments and produces libraries.

use std::path::{Path, PathBuf};

/// Write `(relative path, content)` pairs under `root`, creating directories.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        std::fs::write(&path, content).expect("failed to write fixture file");
    }
}

/// A CMake project with a stub `CMakeLists.txt` and toolchain directory.
pub fn cmake_project(root: &Path) -> PathBuf {
    let source = root.join("webrtc-jni/src/main/cpp");
    write_files(
        &source,
        &[
            ("CMakeLists.txt", "cmake_minimum_required(VERSION 3.15)\n"),
            ("toolchain/x86_64-linux-clang.cmake", "set(CMAKE_SYSTEM_NAME Linux)\n"),
        ],
    );
    source
}

/// Build tree a Linux build of `webrtc-java` leaves behind.
pub fn linux_build_tree(build_dir: &Path) {
    write_files(
        build_dir,
        &[
            ("CMakeCache.txt", "CMAKE_BUILD_TYPE:STRING=Release\n"),
            ("CMakeFiles/webrtc-java.dir/src/JNI_WebRTC.cpp.o", "obj"),
            ("lib/libwebrtc-java-linux-x86_64.so", "\x7fELF"),
            ("lib/libwebrtc-java-linux-x86_64.a", "!<arch>"),
        ],
    );
}

/// Behaviour of the scripted `cmake`.
#[derive(Debug, Clone, Default)]
pub struct FakeCmake {
    /// Exit non-zero in this step (`configure` or `build`)
    pub fail_in: Option<&'static str>,

    /// Files created relative to the build directory by the build step
    pub outputs: Vec<&'static str>,
}

impl FakeCmake {
    /// Succeeds, creating `outputs` during the build step.
    pub fn producing(outputs: &[&'static str]) -> Self {
        FakeCmake {
            fail_in: None,
            outputs: outputs.to_vec(),
        }
    }

    /// Fails in the given step.
    pub fn failing_in(step: &'static str) -> Self {
        FakeCmake {
            fail_in: Some(step),
            outputs: Vec::new(),
        }
    }

    /// Write the script into `dir` and return its path.
    ///
    /// Each invocation appends its arguments to `<build dir>/<step>.args`.
    #[cfg(unix)]
    pub fn install(&self, dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let mut script = String::from(
            "#!/bin/sh\n\
             step=configure\n\
             dir=\n\
             prev=\n\
             for arg in \"$@\"; do\n\
             \x20 case \"$prev\" in -B|--build) dir=\"$arg\" ;; esac\n\
             \x20 if [ \"$arg\" = \"--build\" ]; then step=build; fi\n\
             \x20 prev=\"$arg\"\n\
             done\n\
             mkdir -p \"$dir\"\n\
             echo \"$@\" >> \"$dir/$step.args\"\n",
        );

        if let Some(step) = self.fail_in {
            script.push_str(&format!(
                "if [ \"$step\" = \"{}\" ]; then echo 'fake cmake failure' >&2; exit 2; fi\n",
                step
            ));
        }

        script.push_str("if [ \"$step\" = \"build\" ]; then\n");
        for output in &self.outputs {
            script.push_str(&format!(
                "  mkdir -p \"$(dirname \"$dir/{0}\")\" && printf 'lib' > \"$dir/{0}\"\n",
                output
            ));
        }
        script.push_str("  :\nfi\nexit 0\n");

        let path = dir.join("cmake");
        std::fs::create_dir_all(dir).expect("failed to create script dir");
        std::fs::write(&path, script).expect("failed to write fake cmake");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to mark fake cmake executable");
        path
    }
}

/// Arguments recorded by the scripted `cmake` for one step.
pub fn recorded_args(build_dir: &Path, step: &str) -> Option<String> {
    std::fs::read_to_string(build_dir.join(format!("{}.args", step))).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_files_creates_parents() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &[("a/b/c.txt", "x")]);
        assert_eq!(std::fs::read_to_string(tmp.path().join("a/b/c.txt")).unwrap(), "x");
    }

    #[cfg(unix)]
    #[test]
    fn test_fake_cmake_records_and_produces() {
        let tmp = TempDir::new().unwrap();
        let cmake = FakeCmake::producing(&["lib/libwebrtc-java.so"]).install(&tmp.path().join("bin"));
        let build = tmp.path().join("out");

        let status = std::process::Command::new(&cmake)
            .args(["--build", build.to_str().unwrap(), "--config", "Release"])
            .status()
            .unwrap();

        assert!(status.success());
        assert!(build.join("lib/libwebrtc-java.so").is_file());
        assert!(recorded_args(&build, "build").unwrap().contains("--config Release"));
    }
}
