use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::UnknownStatus;

/// Review state of a data change request (`solicituts_canvi_dades.estat`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChangeRequestStatus {
    #[default]
    #[serde(rename = "pendent")]
    Pending,
    #[serde(rename = "aprovada")]
    Approved,
    #[serde(rename = "rebutjada")]
    Rejected,
}

impl ChangeRequestStatus {
    pub const ALL: [ChangeRequestStatus; 3] = [
        ChangeRequestStatus::Pending,
        ChangeRequestStatus::Approved,
        ChangeRequestStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeRequestStatus::Pending => "pendent",
            ChangeRequestStatus::Approved => "aprovada",
            ChangeRequestStatus::Rejected => "rebutjada",
        }
    }
}

impl fmt::Display for ChangeRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeRequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A row of `solicituts_canvi_dades`: a tutor asking an administrator to
/// change one field of a student's record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DataChangeRequest {
    pub id: String,
    pub alumne_id: String,
    pub tutor_solicitant: String,
    pub camp_modificar: String,
    pub valor_actual: Option<String>,
    pub valor_nou: Option<String>,
    pub justificacio: String,
    pub estat: String,
    pub admin_responsable: Option<String>,
    pub data_resolucio: Option<DateTime<Utc>>,
    pub notes_admin: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DataChangeRequest {
    pub fn status(&self) -> Result<ChangeRequestStatus, UnknownStatus> {
        self.estat.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_spelling() {
        assert_eq!(ChangeRequestStatus::default(), ChangeRequestStatus::Pending);
        assert_eq!("aprovada".parse::<ChangeRequestStatus>(), Ok(ChangeRequestStatus::Approved));
        assert_eq!(ChangeRequestStatus::Rejected.to_string(), "rebutjada");
        assert_eq!(
            serde_json::from_str::<ChangeRequestStatus>("\"rebutjada\"").unwrap(),
            ChangeRequestStatus::Rejected
        );
    }

    #[test]
    fn test_appointment_statuses_do_not_apply() {
        // Appointments use "confirmada"; change requests never do
        assert!("confirmada".parse::<ChangeRequestStatus>().is_err());
    }
}
