use crate::domain::universe;
use crate::error::RecommendError;
use serde::{Deserialize, Serialize};

/// Investor profile submitted with a recommendation request. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: u32,
    #[serde(alias = "income", default = "unspecified_income")]
    pub income_bracket: String,
    pub risk: i32,
    pub horizon: String,
}

fn unspecified_income() -> String {
    "unspecified".to_string()
}

impl UserProfile {
    pub fn validate(&self) -> Result<(), RecommendError> {
        universe::validate_risk(self.risk)?;
        if self.age > 130 {
            return Err(RecommendError::invalid(
                "age",
                format!("must be at most 130 (got {})", self.age),
            ));
        }
        Ok(())
    }
}
