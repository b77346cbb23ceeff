use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::ids::{EmployeeId, TestId};
use crate::models::test::Test;
use crate::services::backend_service::TestsApi;

#[derive(Debug, Clone)]
pub struct LoadedTest {
    pub test: Arc<Test>,
    pub attempt_number: u32,
}

/// Loads a test and works out which attempt the employee is about to make.
#[derive(Clone)]
pub struct LoaderService {
    api: Arc<dyn TestsApi>,
}

impl LoaderService {
    pub fn new(api: Arc<dyn TestsApi>) -> Self {
        Self { api }
    }

    pub async fn load_for_attempt(&self, test_id: TestId, employee_id: EmployeeId) -> Result<LoadedTest> {
        let test = self.api.fetch_test(test_id).await?;
        let prior = self.api.list_results(test_id, employee_id).await?;

        // Results are counted, but a gap in the backend's history must not reuse a number.
        let highest = prior.iter().map(|r| r.attempt_number).max().unwrap_or(0);
        let prior_attempts = u32::try_from(prior.len()).unwrap_or(u32::MAX).max(highest);

        if test.attempts_exhausted(prior_attempts) {
            tracing::info!(%test_id, %employee_id, prior_attempts, max_attempts = test.max_attempts, "Attempts exhausted");
            return Err(Error::Conflict(format!(
                "All {} attempts for test {} have been used",
                test.max_attempts, test_id
            )));
        }

        tracing::info!(
            %test_id,
            %employee_id,
            questions = test.questions().len(),
            attempt = prior_attempts + 1,
            "Test loaded"
        );
        Ok(LoadedTest {
            test: Arc::new(test),
            attempt_number: prior_attempts.saturating_add(1),
        })
    }
}
