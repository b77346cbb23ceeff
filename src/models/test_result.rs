use serde::{Deserialize, Serialize};

use crate::models::ids::{EmployeeId, ResultId, TestId};
use crate::utils::serde_flex::{opt_bool_flexible, opt_u32_flexible, u32_flexible};

/// A persisted attempt result as the tests backend stores it.
///
/// The submit endpoint echoes only part of the record, so everything except the id is
/// optional or defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: ResultId,
    #[serde(default)]
    pub test_id: Option<TestId>,
    #[serde(default)]
    pub test_title: Option<String>,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    #[serde(default, deserialize_with = "opt_u32_flexible")]
    pub score: Option<u32>,
    #[serde(default, deserialize_with = "opt_u32_flexible")]
    pub max_score: Option<u32>,
    #[serde(default, deserialize_with = "opt_u32_flexible")]
    pub percentage: Option<u32>,
    #[serde(default, deserialize_with = "opt_bool_flexible")]
    pub passed: Option<bool>,
    #[serde(default, deserialize_with = "u32_flexible")]
    pub attempt_number: u32,
    #[serde(default, deserialize_with = "opt_u32_flexible")]
    pub time_spent: Option<u32>,
    #[serde(default)]
    pub completed_at: Option<String>,
}
