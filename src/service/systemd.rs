//! Systemd user-manager backend.
//!
//! A registration is a plain unit file under `~/.config/systemd/user`; state
//! transitions shell out to `systemctl --user`. Construction fails when
//! `systemctl` is not on PATH so lifecycle commands degrade to one clear
//! error instead of five.

use std::fs;
use std::path::PathBuf;

use crate::process::Cmd;

use super::{ServiceDescriptor, ServiceError, ServiceHost, ServiceStatus};

pub struct SystemdUserHost {
    systemctl: PathBuf,
    unit_dir: PathBuf,
}

impl SystemdUserHost {
    pub fn new() -> Result<Self, ServiceError> {
        let systemctl = which::which("systemctl").map_err(|_| ServiceError::HostUnavailable {
            reason: "systemctl not found in PATH; user services need systemd".into(),
        })?;
        let config_dir = dirs::config_dir().ok_or_else(|| ServiceError::HostUnavailable {
            reason: "cannot determine the user configuration directory".into(),
        })?;
        Ok(Self {
            systemctl,
            unit_dir: config_dir.join("systemd/user"),
        })
    }

    #[cfg(test)]
    fn with_paths(systemctl: PathBuf, unit_dir: PathBuf) -> Self {
        Self {
            systemctl,
            unit_dir,
        }
    }

    fn unit_path(&self, name: &str) -> PathBuf {
        self.unit_dir.join(format!("{name}.service"))
    }

    fn systemctl(&self, args: &[&str]) -> Result<(), ServiceError> {
        Cmd::new(&self.systemctl)
            .arg("--user")
            .args(args.iter().copied())
            .run()
            .map(|_| ())
            .map_err(|source| ServiceError::Manager { source })
    }
}

impl ServiceHost for SystemdUserHost {
    fn install(&self, descriptor: &ServiceDescriptor) -> Result<(), ServiceError> {
        if !descriptor.user_service {
            return Err(ServiceError::HostUnavailable {
                reason: "only user-scope services are supported".into(),
            });
        }

        fs::create_dir_all(&self.unit_dir).map_err(|source| ServiceError::Registration {
            path: self.unit_dir.clone(),
            source,
        })?;

        let unit_path = self.unit_path(&descriptor.name);
        fs::write(&unit_path, render_unit(descriptor)).map_err(|source| {
            ServiceError::Registration {
                path: unit_path.clone(),
                source,
            }
        })?;

        self.systemctl(&["daemon-reload"])?;
        self.systemctl(&["enable", &descriptor.name])?;
        Ok(())
    }

    fn uninstall(&self, name: &str) -> Result<(), ServiceError> {
        let unit_path = self.unit_path(name);
        if !unit_path.exists() {
            return Err(ServiceError::NotRegistered {
                name: name.to_string(),
            });
        }

        // May fail when the unit was never enabled; removing the file is
        // what actually unregisters.
        let _ = self.systemctl(&["disable", name]);

        fs::remove_file(&unit_path).map_err(|source| ServiceError::Registration {
            path: unit_path,
            source,
        })?;
        self.systemctl(&["daemon-reload"])?;
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), ServiceError> {
        self.systemctl(&["start", name])
    }

    fn stop(&self, name: &str) -> Result<(), ServiceError> {
        self.systemctl(&["stop", name])
    }

    fn status(&self, name: &str) -> Result<ServiceStatus, ServiceError> {
        if !self.unit_path(name).exists() {
            return Ok(ServiceStatus::Unknown);
        }

        // `is-active` exits non-zero for anything but active; the word on
        // stdout is the interesting part.
        let result = Cmd::new(&self.systemctl)
            .arg("--user")
            .args(["is-active", name])
            .allow_fail()
            .run()
            .map_err(|source| ServiceError::Manager { source })?;

        match result.stdout.trim() {
            "active" | "activating" | "reloading" => Ok(ServiceStatus::Running),
            _ => Ok(ServiceStatus::Stopped),
        }
    }
}

fn render_unit(descriptor: &ServiceDescriptor) -> String {
    let exec_start = std::iter::once(descriptor.executable.display().to_string())
        .chain(descriptor.args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "[Unit]\n\
         Description={description}\n\
         \n\
         [Service]\n\
         ExecStart={exec_start}\n\
         Restart=on-failure\n\
         \n\
         [Install]\n\
         WantedBy=default.target\n",
        description = descriptor.description,
        exec_start = exec_start,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    fn descriptor(name: &str) -> ServiceDescriptor {
        ServiceDescriptor {
            name: name.into(),
            display_name: "Demo".into(),
            description: "demo service".into(),
            executable: PathBuf::from("/opt/appstack/appstack"),
            args: vec!["run".into(), "database".into()],
            user_service: true,
        }
    }

    fn fake_systemctl(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("systemctl");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn render_unit_lists_exec_start_with_args() {
        let unit = render_unit(&descriptor("demo"));

        assert!(unit.starts_with("[Unit]\n"));
        assert!(unit.contains("Description=demo service\n"));
        assert!(unit.contains("ExecStart=/opt/appstack/appstack run database\n"));
        assert!(unit.contains("Restart=on-failure\n"));
        assert!(unit.contains("WantedBy=default.target\n"));
    }

    #[test]
    fn install_writes_unit_file() {
        let tmp = TempDir::new().unwrap();
        let systemctl = fake_systemctl(tmp.path(), "exit 0");
        let unit_dir = tmp.path().join("systemd/user");
        let host = SystemdUserHost::with_paths(systemctl, unit_dir.clone());

        host.install(&descriptor("demo")).unwrap();

        let unit = fs::read_to_string(unit_dir.join("demo.service")).unwrap();
        assert!(unit.contains("ExecStart=/opt/appstack/appstack run database"));
    }

    #[test]
    fn install_rejects_system_scope_descriptors() {
        let tmp = TempDir::new().unwrap();
        let systemctl = fake_systemctl(tmp.path(), "exit 0");
        let host = SystemdUserHost::with_paths(systemctl, tmp.path().join("units"));

        let mut desc = descriptor("demo");
        desc.user_service = false;

        let err = host.install(&desc).unwrap_err();
        assert!(matches!(err, ServiceError::HostUnavailable { .. }));
    }

    #[test]
    fn uninstall_removes_unit_file() {
        let tmp = TempDir::new().unwrap();
        let systemctl = fake_systemctl(tmp.path(), "exit 0");
        let unit_dir = tmp.path().join("systemd/user");
        let host = SystemdUserHost::with_paths(systemctl, unit_dir.clone());

        host.install(&descriptor("demo")).unwrap();
        host.uninstall("demo").unwrap();

        assert!(!unit_dir.join("demo.service").exists());
    }

    #[test]
    fn uninstall_without_unit_file_reports_not_registered() {
        let tmp = TempDir::new().unwrap();
        let systemctl = fake_systemctl(tmp.path(), "exit 0");
        let host = SystemdUserHost::with_paths(systemctl, tmp.path().join("units"));

        let err = host.uninstall("demo").unwrap_err();
        assert!(matches!(err, ServiceError::NotRegistered { .. }));
    }

    #[test]
    fn status_without_unit_file_is_unknown() {
        let tmp = TempDir::new().unwrap();
        let systemctl = fake_systemctl(tmp.path(), "exit 0");
        let host = SystemdUserHost::with_paths(systemctl, tmp.path().join("units"));

        assert_eq!(host.status("demo").unwrap(), ServiceStatus::Unknown);
    }

    #[test]
    fn status_maps_is_active_output() {
        let tmp = TempDir::new().unwrap();
        let unit_dir = tmp.path().join("units");
        fs::create_dir_all(&unit_dir).unwrap();
        fs::write(unit_dir.join("demo.service"), "[Unit]\n").unwrap();

        let active = fake_systemctl(tmp.path(), "echo active; exit 0");
        let host = SystemdUserHost::with_paths(active, unit_dir.clone());
        assert_eq!(host.status("demo").unwrap(), ServiceStatus::Running);

        let inactive = fake_systemctl(tmp.path(), "echo inactive; exit 3");
        let host = SystemdUserHost::with_paths(inactive, unit_dir);
        assert_eq!(host.status("demo").unwrap(), ServiceStatus::Stopped);
    }

    #[test]
    fn failed_manager_command_surfaces_output() {
        let tmp = TempDir::new().unwrap();
        let systemctl = fake_systemctl(tmp.path(), "echo 'Failed to connect to bus' >&2; exit 1");
        let host = SystemdUserHost::with_paths(systemctl, tmp.path().join("units"));

        let err = host.start("demo").unwrap_err();
        assert!(err.to_string().contains("service manager command failed"));
        match err {
            ServiceError::Manager { source } => {
                assert!(source.to_string().contains("Failed to connect to bus"));
            }
            other => panic!("expected Manager, got {other:?}"),
        }
    }
}
