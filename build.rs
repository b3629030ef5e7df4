//! Generates `version.rs` with the build time and the git revision

use chrono::Utc;
use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

fn git_revision() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let out_dir = env::var_os("OUT_DIR").expect("cargo sets OUT_DIR for build scripts");
    let build_time = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    let generated = format!(
        "pub const BUILD_TIME: &str = {:?};\npub const GIT_HASH: &str = {:?};\n",
        build_time.to_string(),
        git_revision()
    );
    fs::write(Path::new(&out_dir).join("version.rs"), generated)
        .expect("failed to write version.rs");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
