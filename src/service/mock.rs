//! In-memory host manager for tests: records every call it receives and
//! replays scripted failures.

use std::cell::RefCell;

use super::{ServiceDescriptor, ServiceError, ServiceHost, ServiceStatus};

#[derive(Default)]
pub(crate) struct MockHost {
    calls: RefCell<Vec<String>>,
    registered: RefCell<Vec<String>>,
    running: RefCell<Vec<String>>,
    pub fail_stop: bool,
    pub fail_start: bool,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registered(name: &str, running: bool) -> Self {
        let host = Self::default();
        host.registered.borrow_mut().push(name.to_string());
        if running {
            host.running.borrow_mut().push(name.to_string());
        }
        host
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.borrow().iter().any(|n| n == name)
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl ServiceHost for MockHost {
    fn install(&self, descriptor: &ServiceDescriptor) -> Result<(), ServiceError> {
        self.record(format!("install {}", descriptor.name));
        self.registered.borrow_mut().push(descriptor.name.clone());
        Ok(())
    }

    fn uninstall(&self, name: &str) -> Result<(), ServiceError> {
        self.record(format!("uninstall {name}"));
        if !self.is_registered(name) {
            return Err(ServiceError::NotRegistered {
                name: name.to_string(),
            });
        }
        self.registered.borrow_mut().retain(|n| n != name);
        self.running.borrow_mut().retain(|n| n != name);
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), ServiceError> {
        self.record(format!("start {name}"));
        if self.fail_start {
            return Err(ServiceError::HostUnavailable {
                reason: "scripted start failure".into(),
            });
        }
        if !self.is_registered(name) {
            return Err(ServiceError::NotRegistered {
                name: name.to_string(),
            });
        }
        self.running.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<(), ServiceError> {
        self.record(format!("stop {name}"));
        if self.fail_stop {
            return Err(ServiceError::HostUnavailable {
                reason: "scripted stop failure".into(),
            });
        }
        self.running.borrow_mut().retain(|n| n != name);
        Ok(())
    }

    fn status(&self, name: &str) -> Result<ServiceStatus, ServiceError> {
        self.record(format!("status {name}"));
        if !self.is_registered(name) {
            return Ok(ServiceStatus::Unknown);
        }
        if self.running.borrow().iter().any(|n| n == name) {
            Ok(ServiceStatus::Running)
        } else {
            Ok(ServiceStatus::Stopped)
        }
    }
}
