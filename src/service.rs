//! The `Service` entity (spec §3).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resource::ResourceReservation;

/// Backend-reported lifecycle status of a single container.
///
/// Transitions `Undefined -> Start -> Die -> Destroy`. `restarted()`
/// moves a `Die` back to `Start` after corrective action (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendStatus {
    Undefined,
    Start,
    Die,
    Destroy,
}

/// Static description of how to run a service: image, ports, volumes,
/// command template, replica count, and placement constraints. The
/// concrete backend driver (out of scope here) interprets this to spawn
/// a real container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub docker_image: String,
    pub command: String,
    pub ports: Vec<u16>,
    pub volumes: Vec<String>,
    pub replicas: u32,
}

/// One container within an `Execution`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub name: String,
    pub dns_name: String,
    pub essential: bool,
    pub description: ServiceDescription,
    pub resource_reservation: ResourceReservation,
    pub backend_status: BackendStatus,
    pub backend_host: Option<String>,
    pub backend_id: Option<String>,
    pub ip_address: Option<String>,
    pub error_message: Option<String>,
}

impl Service {
    pub fn new(
        execution_id: Uuid,
        name: impl Into<String>,
        essential: bool,
        description: ServiceDescription,
        resource_reservation: ResourceReservation,
    ) -> Self {
        let name = name.into();
        let dns_name = format!("{}-{}", name, &execution_id.simple().to_string()[..8]);
        Self {
            id: Uuid::new_v4(),
            execution_id,
            name,
            dns_name,
            essential,
            description,
            resource_reservation,
            backend_status: BackendStatus::Undefined,
            backend_host: None,
            backend_id: None,
            ip_address: None,
            error_message: None,
        }
    }

    /// Clears a `Die` status back to `Start` after the dead-service
    /// detector has taken corrective action. Host/id assignment is left
    /// in place for the backend driver to overwrite on the next
    /// successful spawn (see SPEC_FULL.md).
    pub fn restarted(&mut self) {
        self.backend_status = BackendStatus::Start;
        self.error_message = None;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.backend_status = BackendStatus::Destroy;
        self.error_message = Some(message.into());
    }

    pub fn set_active(&mut self, backend_id: impl Into<String>, ip_address: impl Into<String>) {
        self.backend_status = BackendStatus::Start;
        self.backend_id = Some(backend_id.into());
        self.ip_address = Some(ip_address.into());
    }

    pub fn is_dead(&self) -> bool {
        self.backend_status == BackendStatus::Die
    }

    pub fn is_active(&self) -> bool {
        self.backend_status == BackendStatus::Start && self.backend_host.is_some()
    }
}
