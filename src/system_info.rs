//! Capture of the [`SystemInfo`] snapshot attached to every new record.
//!
//! The app-side values (version, build, bundle id) come from the embedding
//! application; host values come from the operating system. Anything that
//! cannot be read ends up as "Unknown".

use sysinfo::System;

use crate::models::SystemInfo;

pub trait SystemInfoSource: Send + Sync {
    fn capture(&self) -> SystemInfo;
}

/// Identity of the application filing the report.
#[derive(Debug, Clone, Default)]
pub struct AppIdentity {
    pub version: Option<String>,
    pub build_number: Option<String>,
    pub bundle_id: Option<String>,
}

impl AppIdentity {
    pub fn new(version: impl Into<String>, build_number: impl Into<String>, bundle_id: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            build_number: Some(build_number.into()),
            bundle_id: Some(bundle_id.into()),
        }
    }
}

/// Reads OS and device details from the running host.
#[derive(Debug, Clone, Default)]
pub struct HostSystemInfo {
    app: AppIdentity,
}

impl HostSystemInfo {
    pub fn new(app: AppIdentity) -> Self {
        Self { app }
    }
}

impl SystemInfoSource for HostSystemInfo {
    fn capture(&self) -> SystemInfo {
        SystemInfo::new(
            self.app.version.clone(),
            self.app.build_number.clone(),
            self.app.bundle_id.clone(),
            System::name(),
            System::os_version(),
            // a host has no hardware model identifier
            None,
            System::host_name(),
        )
    }
}

/// Fixed snapshot, for tests and for platforms where the embedding app
/// gathers the values itself.
#[derive(Debug, Clone)]
pub struct StaticSystemInfo(pub SystemInfo);

impl SystemInfoSource for StaticSystemInfo {
    fn capture(&self) -> SystemInfo {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNKNOWN;

    #[test]
    fn host_capture_keeps_app_identity_and_fills_every_field() {
        let source = HostSystemInfo::new(AppIdentity::new("2.1.0", "314", "com.example.app"));
        let info = source.capture();
        assert_eq!(info.app_version(), "2.1.0");
        assert_eq!(info.build_number(), "314");
        assert_eq!(info.bundle_id(), "com.example.app");
        assert_eq!(info.device_model(), UNKNOWN);
        let host = System::host_name().filter(|h| !h.trim().is_empty());
        assert_eq!(info.device_name(), host.as_deref().map(str::trim).unwrap_or(UNKNOWN));
        let os = System::name().filter(|n| !n.trim().is_empty());
        assert_eq!(info.os_name(), os.as_deref().map(str::trim).unwrap_or(UNKNOWN));
    }

    #[test]
    fn missing_app_identity_reads_unknown() {
        let info = HostSystemInfo::default().capture();
        assert_eq!(info.app_version(), UNKNOWN);
        assert_eq!(info.bundle_id(), UNKNOWN);
    }
}
