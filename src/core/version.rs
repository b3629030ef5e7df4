//! Build metadata shared by the CLI version banner and startup logging.
//! This includes the generated version.rs from the build script, providing a
//! single source of truth.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Package version from Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// Long version string shown by `--version`
pub fn long_version() -> String {
    format!("{} ({} built {})", version(), git_hash(), build_time())
}
