use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechnicianStatus {
    Active,
    #[default]
    Available,
    Inactive,
}

impl TechnicianStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TechnicianStatus::Active => "active",
            TechnicianStatus::Available => "available",
            TechnicianStatus::Inactive => "inactive",
        }
    }
}

/// Technician as listed to the dashboard. Credential material never leaves
/// the registry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Technician {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub status: TechnicianStatus,
    pub created_at: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTechnicianInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginInput {
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginOutcome {
    pub id: String,
    pub name: String,
}
