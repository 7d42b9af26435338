#![warn(clippy::pedantic)]

//! Integration tests for the grove-boot CLI.
//!
//! These tests spawn the compiled `grove-boot` binary with an isolated
//! environment: a temporary cache directory, a temporary `PATH`, and either
//! an unreachable release server or an `httpmock` server standing in for
//! GitHub.
//!
//! ## Test Strategy
//!
//! 1. **Metadata**: help and version output
//! 2. **Resolution**: system preference, offline fallback, download, no-op
//! 3. **Run**: argument passing and exit code propagation
//! 4. **Install and status**: forced reinstall, health report
//! 5. **Errors**: bad settings, no multiplexer
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p grove-boot
//! ```

use assert_cmd::prelude::*;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use flate2::Compression;
use flate2::write::GzEncoder;
use httpmock::prelude::*;
use predicates::prelude::*;
use sha2::{Digest, Sha256};
use std::process::{Command, Stdio};

/// Release server address that refuses connections.
const UNREACHABLE: &str = "http://127.0.0.1:9";

/// Isolated cache, `PATH` and settings for one test.
struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        root.child("cache").create_dir_all().unwrap();
        root.child("bin").create_dir_all().unwrap();
        Self { root }
    }

    fn cache(&self) -> assert_fs::fixture::ChildPath {
        self.root.child("cache")
    }

    fn command(&self, server: &str) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("grove-boot"));
        cmd.env("GROVE_BOOT_HOME", self.cache().path())
            .env("GROVE_BOOT_CONFIG", self.root.child("bootstrap.toml").path())
            .env("PATH", self.root.child("bin").path())
            .env("GROVE_BOOT_API_SERVER", server)
            .env("GROVE_BOOT_DOWNLOAD_SERVER", server)
            .env("GROVE_BOOT_LOG", "warn")
            .env_remove("GROVE_BOOT_REPOSITORY")
            .env_remove("GITHUB_TOKEN")
            .env_remove("TMUX")
            .env_remove("ZELLIJ");
        cmd
    }

    #[cfg(unix)]
    fn put_system_grove(&self, body: &str) {
        let stub = self.root.child("bin/grove");
        stub.write_str(&format!("#!/bin/sh\n{body}\n")).unwrap();
        make_executable(stub.path());
    }

    #[cfg(unix)]
    fn populate_cache(&self, version: &str) {
        let binary = self.cache().child("grove");
        binary.write_str("#!/bin/sh\necho cached\n").unwrap();
        make_executable(binary.path());
        self.cache()
            .child("grove.version")
            .write_str(&format!("{version}\n"))
            .unwrap();
    }
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Release identifier of the host, e.g. `linux_amd64`.
fn host_platform() -> String {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    };
    format!("{os}_{arch}")
}

/// A release archive whose `grove` prints its version.
fn release_archive(version: &str) -> Vec<u8> {
    let script = format!("#!/bin/sh\necho 'grove {version}'\n");
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_size(script.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    let path = format!("grove_{version}_{}/grove", host_platform());
    builder
        .append_data(&mut header, path, script.as_bytes())
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

/// Serves `v{version}` as the latest release, with archive and checksums.
fn serve_release<'a>(server: &'a MockServer, version: &str) -> httpmock::Mock<'a> {
    let archive = release_archive(version);
    let filename = format!("grove_{version}_{}.tar.gz", host_platform());
    let listing = format!("{}  {filename}\n", hex::encode(Sha256::digest(&archive)));

    server.mock(|when, then| {
        when.method(GET).path("/repos/grove-sh/grove/releases/latest");
        then.status(200)
            .header("content-type", "application/json")
            .body(format!(r#"{{"tag_name":"v{version}"}}"#));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!(
            "/grove-sh/grove/releases/download/v{version}/grove_{version}_checksums.txt"
        ));
        then.status(200).body(listing);
    });
    server.mock(|when, then| {
        when.method(GET).path(format!(
            "/grove-sh/grove/releases/download/v{version}/{filename}"
        ));
        then.status(200).body(archive);
    })
}

#[test]
fn help_lists_subcommands() {
    let sandbox = Sandbox::new();
    sandbox
        .command(UNREACHABLE)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("popup"))
        .stdout(predicate::str::contains("GROVE_BOOT_HOME"));
}

#[test]
fn version_prints_package_version() {
    let sandbox = Sandbox::new();
    sandbox
        .command(UNREACHABLE)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "grove-boot {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[cfg(unix)]
#[test]
fn resolve_prefers_system_binary() {
    let sandbox = Sandbox::new();
    sandbox.put_system_grove("echo system");
    sandbox.populate_cache("v0.1.0");

    sandbox
        .command(UNREACHABLE)
        .arg("resolve")
        .assert()
        .success()
        .stdout("grove\n");
}

#[cfg(unix)]
#[test]
fn resolve_falls_back_to_cache_when_offline() {
    let sandbox = Sandbox::new();
    sandbox.populate_cache("v0.1.0");

    let expected = format!("{}\n", sandbox.cache().child("grove").path().display());
    sandbox
        .command(UNREACHABLE)
        .arg("resolve")
        .assert()
        .success()
        .stdout(expected)
        .stderr(predicate::str::contains("using cached v0.1.0"));
}

#[test]
fn resolve_fails_offline_without_cache() {
    let sandbox = Sandbox::new();

    sandbox
        .command(UNREACHABLE)
        .arg("resolve")
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("not on PATH"))
        .stderr(predicate::str::contains("network unavailable"));
}

#[cfg(unix)]
#[test]
fn resolve_downloads_latest_release() {
    let sandbox = Sandbox::new();
    let server = MockServer::start();
    let archive = serve_release(&server, "1.2.0");

    let expected = format!("{}\n", sandbox.cache().child("grove").path().display());
    sandbox
        .command(&server.base_url())
        .arg("resolve")
        .assert()
        .success()
        .stdout(expected);

    archive.assert_hits(1);
    sandbox.cache().child("grove.version").assert("v1.2.0\n");
    sandbox
        .cache()
        .child("grove")
        .assert(predicate::str::contains("grove 1.2.0"));
}

#[cfg(unix)]
#[test]
fn resolve_replaces_stale_cache() {
    let sandbox = Sandbox::new();
    sandbox.populate_cache("v1.0.0");
    let server = MockServer::start();
    let archive = serve_release(&server, "2.0.0");

    sandbox
        .command(&server.base_url())
        .arg("resolve")
        .assert()
        .success();

    archive.assert_hits(1);
    sandbox.cache().child("grove.version").assert("v2.0.0\n");
}

#[cfg(unix)]
#[test]
fn resolve_skips_download_when_current() {
    let sandbox = Sandbox::new();
    sandbox.populate_cache("v1.2.0");
    let server = MockServer::start();
    let archive = serve_release(&server, "1.2.0");

    sandbox
        .command(&server.base_url())
        .arg("resolve")
        .assert()
        .success();

    archive.assert_hits(0);
    sandbox
        .cache()
        .child("grove")
        .assert(predicate::str::contains("cached"));
}

#[cfg(unix)]
#[test]
fn resolve_falls_back_to_cache_when_server_is_slow() {
    let sandbox = Sandbox::new();
    sandbox.populate_cache("v0.1.0");
    sandbox
        .root
        .child("bootstrap.toml")
        .write_str("version_timeout_secs = 1\n")
        .unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/grove-sh/grove/releases/latest");
        then.status(200)
            .delay(std::time::Duration::from_secs(10))
            .body(r#"{"tag_name":"v2.0.0"}"#);
    });

    let expected = format!("{}\n", sandbox.cache().child("grove").path().display());
    let started = std::time::Instant::now();
    sandbox
        .command(&server.base_url())
        .arg("resolve")
        .assert()
        .success()
        .stdout(expected)
        .stderr(predicate::str::contains("using cached v0.1.0"));

    assert!(started.elapsed() < std::time::Duration::from_secs(8));
    sandbox.cache().child("grove.version").assert("v0.1.0\n");
}

#[cfg(unix)]
#[test]
fn corrupt_download_keeps_cache() {
    let sandbox = Sandbox::new();
    sandbox.populate_cache("v1.0.0");
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/grove-sh/grove/releases/latest");
        then.status(200).body(r#"{"tag_name":"v2.0.0"}"#);
    });
    server.mock(|when, then| {
        when.method(GET).path_contains(".tar.gz");
        then.status(200).body("truncated");
    });

    sandbox
        .command(&server.base_url())
        .arg("resolve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt release artifact"));

    sandbox.cache().child("grove.version").assert("v1.0.0\n");
    sandbox
        .cache()
        .child("grove")
        .assert(predicate::str::contains("cached"));
}

#[cfg(unix)]
#[test]
fn run_passes_arguments_to_grove() {
    let sandbox = Sandbox::new();
    sandbox.put_system_grove("echo \"args: $*\"");

    sandbox
        .command(UNREACHABLE)
        .args(["run", "--", "--all", "feature"])
        .assert()
        .success()
        .stdout("args: --all feature\n");
}

#[cfg(unix)]
#[test]
fn run_propagates_exit_code() {
    let sandbox = Sandbox::new();
    sandbox.put_system_grove("exit 7");

    sandbox
        .command(UNREACHABLE)
        .arg("run")
        .assert()
        .code(7)
        .stderr("");
}

#[test]
fn run_pause_on_error_waits_for_enter() {
    let sandbox = Sandbox::new();

    sandbox
        .command(UNREACHABLE)
        .args(["run", "--pause-on-error"])
        .stdin(Stdio::null())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Press Enter to close"))
        .stderr(predicate::str::contains("not on PATH"));
}

#[cfg(unix)]
#[test]
fn install_force_reinstalls_current_version() {
    let sandbox = Sandbox::new();
    sandbox.populate_cache("v1.2.0");
    let server = MockServer::start();
    let archive = serve_release(&server, "1.2.0");

    sandbox
        .command(&server.base_url())
        .args(["install", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed grove v1.2.0"));

    archive.assert_hits(1);
    sandbox
        .cache()
        .child("grove")
        .assert(predicate::str::contains("grove 1.2.0"));
}

#[cfg(unix)]
#[test]
fn install_ignores_system_binary() {
    let sandbox = Sandbox::new();
    sandbox.put_system_grove("echo system");
    let server = MockServer::start();
    let archive = serve_release(&server, "1.2.0");

    sandbox
        .command(&server.base_url())
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed grove v1.2.0"))
        .stdout(predicate::str::contains("takes precedence"));

    archive.assert_hits(1);
}

#[test]
fn install_fails_when_offline() {
    let sandbox = Sandbox::new();

    sandbox
        .command(UNREACHABLE)
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("network unavailable"));
}

#[test]
fn status_reports_offline_release_server() {
    let sandbox = Sandbox::new();

    sandbox
        .command(UNREACHABLE)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("[WARN] latest release"))
        .stdout(predicate::str::contains("[WARN] multiplexer"));
}

#[test]
fn bind_requires_multiplexer() {
    let sandbox = Sandbox::new();

    sandbox
        .command(UNREACHABLE)
        .arg("bind")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not running inside tmux or zellij"));
}

#[test]
fn invalid_repository_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox
        .root
        .child("bootstrap.toml")
        .write_str("repository = \"no-slash\"\n")
        .unwrap();

    sandbox
        .command(UNREACHABLE)
        .arg("resolve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("owner/project"));
}

#[test]
fn malformed_settings_name_the_file() {
    let sandbox = Sandbox::new();
    sandbox
        .root
        .child("bootstrap.toml")
        .write_str("repository = [\n")
        .unwrap();

    sandbox
        .command(UNREACHABLE)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bootstrap.toml"));
}
