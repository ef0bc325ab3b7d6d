use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::UnknownStatus;

/// Lifecycle of a family appointment, as stored in `cites_calendari.estat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AppointmentStatus {
    #[default]
    #[serde(rename = "pendent")]
    Pending,
    #[serde(rename = "confirmada")]
    Confirmed,
    #[serde(rename = "realitzada")]
    Completed,
    #[serde(rename = "cancelada")]
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pendent",
            AppointmentStatus::Confirmed => "confirmada",
            AppointmentStatus::Completed => "realitzada",
            AppointmentStatus::Cancelled => "cancelada",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A row of `cites_calendari`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: String,
    pub alumne_id: String,
    pub tutor_email: String,
    pub any_curs: String,
    pub data_cita: DateTime<Utc>,
    pub durada_minuts: Option<i32>,
    pub nom_familia: String,
    pub email_familia: String,
    pub telefon_familia: String,
    pub estat: String,
    pub notes: Option<String>,
    pub google_event_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn status(&self) -> Result<AppointmentStatus, UnknownStatus> {
        self.estat.parse()
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.durada_minuts
            .map(|minutes| self.data_cita + chrono::Duration::minutes(i64::from(minutes)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn appointment(estat: &str, durada_minuts: Option<i32>) -> Appointment {
        Appointment {
            id: "cita_1".into(),
            alumne_id: "alu_1".into(),
            tutor_email: "tutor@escola.cat".into(),
            any_curs: "2025-2026".into(),
            data_cita: Utc.with_ymd_and_hms(2025, 10, 6, 16, 0, 0).unwrap(),
            durada_minuts,
            nom_familia: "Família Puig".into(),
            email_familia: "familia@example.com".into(),
            telefon_familia: "600000000".into(),
            estat: estat.into(),
            notes: None,
            google_event_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_stored_spelling() {
        assert_eq!(AppointmentStatus::default().as_str(), "pendent");
        assert_eq!("realitzada".parse::<AppointmentStatus>(), Ok(AppointmentStatus::Completed));
        assert_eq!(AppointmentStatus::Cancelled.to_string(), "cancelada");
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::Confirmed).unwrap(),
            "\"confirmada\""
        );
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "cancelled".parse::<AppointmentStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("cancelled".into()));
        assert!(appointment("desconegut", Some(30)).status().is_err());
    }

    #[test]
    fn test_ends_at_uses_duration() {
        let cita = appointment("confirmada", Some(45));
        assert_eq!(cita.status(), Ok(AppointmentStatus::Confirmed));
        assert_eq!(
            cita.ends_at(),
            Some(Utc.with_ymd_and_hms(2025, 10, 6, 16, 45, 0).unwrap())
        );
        assert_eq!(appointment("pendent", None).ends_at(), None);
    }
}
