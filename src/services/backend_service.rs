use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use url::Url;

use crate::dto::backend_dto::{ApiEnvelope, CreateNotificationRequest, SubmitResultRequest, TestDto};
use crate::error::{Error, Result};
use crate::models::ids::{EmployeeId, TestId};
use crate::models::test::Test;
use crate::models::test_result::TestResult;

/// The external tests backend, as far as test taking needs it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestsApi: Send + Sync {
    /// A test with its questions and answer key; `Error::NotFound` when it does not exist.
    async fn fetch_test(&self, test_id: TestId) -> Result<Test>;

    async fn list_results(&self, test_id: TestId, employee_id: EmployeeId) -> Result<Vec<TestResult>>;

    async fn submit_result(&self, request: &SubmitResultRequest) -> Result<TestResult>;

    async fn create_notification(&self, request: &CreateNotificationRequest) -> Result<()>;
}

/// `TestsApi` over the backend's `?action=` HTTP functions.
#[derive(Clone)]
pub struct HttpTestsApi {
    client: Client,
    tests_url: Url,
    notifications_url: Url,
}

impl HttpTestsApi {
    pub fn new(tests_url: &str, notifications_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let tests_url = Url::parse(tests_url)?;
        let notifications_url = match notifications_url {
            Some(raw) => Url::parse(raw)?,
            None => tests_url.clone(),
        };
        Ok(Self {
            client,
            tests_url,
            notifications_url,
        })
    }

    fn action_url(base: &Url, action: &str, params: &[(&str, String)]) -> Url {
        let mut url = base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("action", action);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url
    }

    async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<ApiEnvelope<T>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND {
                return Err(Error::NotFound(format!("Backend returned 404: {}", body)));
            }
            return Err(Error::Backend(format!("HTTP status {}: {}", status, body)));
        }
        let envelope = response.json::<ApiEnvelope<T>>().await?;
        if let Some(err) = envelope.error.as_ref() {
            return Err(Error::Backend(err.clone()));
        }
        Ok(envelope)
    }
}

#[async_trait]
impl TestsApi for HttpTestsApi {
    async fn fetch_test(&self, test_id: TestId) -> Result<Test> {
        let url = Self::action_url(&self.tests_url, "get_test_full", &[("id", test_id.to_string())]);
        tracing::debug!(%test_id, "Fetching test definition");

        let response = self.client.get(url).send().await?;
        let envelope = Self::read_envelope::<TestDto>(response).await?;
        let dto = envelope
            .data
            .ok_or_else(|| Error::NotFound(format!("Test {} not found", test_id)))?;
        dto.into_test()
            .map_err(|e| Error::Backend(format!("Invalid test definition: {}", e)))
    }

    async fn list_results(&self, test_id: TestId, employee_id: EmployeeId) -> Result<Vec<TestResult>> {
        let url = Self::action_url(
            &self.tests_url,
            "get_test_results",
            &[
                ("test_id", test_id.to_string()),
                ("employee_id", employee_id.to_string()),
            ],
        );
        let response = self.client.get(url).send().await?;
        let envelope = Self::read_envelope::<Vec<TestResult>>(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn submit_result(&self, request: &SubmitResultRequest) -> Result<TestResult> {
        let url = Self::action_url(&self.tests_url, "submit_test", &[]);
        let response = self.client.post(url).json(request).send().await?;
        let envelope = Self::read_envelope::<TestResult>(response).await?;
        envelope.data.ok_or_else(|| {
            Error::Backend(
                envelope
                    .message
                    .unwrap_or_else(|| "Submit returned no result".to_string()),
            )
        })
    }

    async fn create_notification(&self, request: &CreateNotificationRequest) -> Result<()> {
        let url = Self::action_url(&self.notifications_url, "create_notification", &[]);
        let response = self.client.post(url).json(request).send().await?;
        Self::read_envelope::<JsonValue>(response).await?;
        Ok(())
    }
}
