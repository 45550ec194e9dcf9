//! Target platform resolution for image manifest checks.

use crate::model::{CpuArchitecture, RuntimePlatform};

/// An OCI platform pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// `amd64` or `arm64`.
    pub arch: &'static str,
    /// `linux` or `windows`.
    pub os: &'static str,
}

/// Resolves the platform a task runs on.
///
/// Fargate tasks default to `linux/amd64`. Without Fargate and without a
/// runtime platform the platform is undetermined and `None` is returned.
#[must_use]
pub fn normalize_platform(runtime: Option<&RuntimePlatform>, is_fargate: bool) -> Option<Platform> {
    let Some(runtime) = runtime else {
        return is_fargate.then_some(Platform { arch: "amd64", os: "linux" });
    };
    let arch = match runtime.cpu_architecture {
        Some(CpuArchitecture::Arm64) => "arm64",
        _ => "amd64",
    };
    let os = match runtime.operating_system_family.as_deref() {
        None | Some("" | "LINUX") => "linux",
        Some(_) => "windows",
    };
    Some(Platform { arch, os })
}
