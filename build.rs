//! Embeds build metadata (`BUILD_DATETIME`, `BUILD_GIT_HASH`) logged at startup.
//! Values exported by the image build take precedence over local detection.

use std::process::Command;

fn main() {
    let datetime = std::env::var("BUILD_DATETIME")
        .unwrap_or_else(|_| chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
    let git_hash = std::env::var("BUILD_GIT_HASH")
        .ok()
        .or_else(git_revision)
        .unwrap_or_else(|| "unknown".to_string());

    for (key, value) in [("BUILD_DATETIME", datetime), ("BUILD_GIT_HASH", git_hash)] {
        println!("cargo:rustc-env={key}={value}");
        println!("cargo:rerun-if-env-changed={key}");
    }
    println!("cargo:rerun-if-changed=build.rs");
}

/// Short commit hash, suffixed with `-dirty` when the work tree has changes
fn git_revision() -> Option<String> {
    let head = git(&["rev-parse", "--short", "HEAD"])?;
    let clean = Command::new("git")
        .args(["diff", "--quiet"])
        .status()
        .is_ok_and(|status| status.success());

    Some(if clean { head } else { format!("{head}-dirty") })
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}
