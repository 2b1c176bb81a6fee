//! Stamps the binary with its commit, build time and cargo profile.
//!
//! The startup log line in main.rs reads these back through `env!`.

use std::process::Command;

fn main() {
    // Builds from a source tarball have no .git; fall back rather than fail
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let build_timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
    // Re-stamp on checkout/commit, not on every source edit
    println!("cargo:rerun-if-changed=.git/HEAD");
}
