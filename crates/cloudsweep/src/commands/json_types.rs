use serde::Serialize;

use cloudsweep_config::{ResourceClass, Service};

/// One row of `cloudsweep services --json`.
#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: Service,
    pub description: &'static str,
    pub classes: Vec<ClassInfo>,
}

#[derive(Serialize)]
pub struct ClassInfo {
    pub class: ResourceClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<&'static str>,
    pub retention_days: i64,
    pub policy: String,
}
