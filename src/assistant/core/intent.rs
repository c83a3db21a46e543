//! Handling strategies a query can be routed to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Intent of a user query.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// The user describes how they feel.
    SymptomCheck,
    /// Booking or moving a visit.
    AppointmentScheduling,
    /// Medication schedules and reminders.
    MedicationReminder,
    /// Lifestyle and wellness advice.
    HealthRecommendation,
    /// Questions about stored records or results.
    MedicalRecordQuery,
    /// Anything else.
    General,
}

impl Intent {
    /// All intents, in keyword-matching priority order (`General` last).
    pub const ALL: [Self; 6] = [
        Self::SymptomCheck,
        Self::AppointmentScheduling,
        Self::MedicationReminder,
        Self::HealthRecommendation,
        Self::MedicalRecordQuery,
        Self::General,
    ];

    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SymptomCheck => "symptom_check",
            Self::AppointmentScheduling => "appointment_scheduling",
            Self::MedicationReminder => "medication_reminder",
            Self::HealthRecommendation => "health_recommendation",
            Self::MedicalRecordQuery => "medical_record_query",
            Self::General => "general",
        }
    }

    /// Whether answers for this intent benefit from knowledge-base context.
    #[must_use]
    pub const fn is_medical(self) -> bool {
        matches!(
            self,
            Self::SymptomCheck | Self::HealthRecommendation | Self::General
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == value)
            .ok_or_else(|| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_names_are_stable() {
        for intent in Intent::ALL {
            assert_eq!(intent.as_str().parse::<Intent>(), Ok(intent));
        }
        assert_eq!(
            serde_json::to_string(&Intent::MedicalRecordQuery).unwrap(),
            "\"medical_record_query\""
        );
    }
}
