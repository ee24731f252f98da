use std::future::Future;
use std::time::Duration;

use orderly_core::{BreakerConfig, CircuitBreaker, DependencyError, ResilienceError, RetryPolicy};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Base URL, HTTP client and breaker shared by the typed service clients.
pub(crate) struct ServiceClient {
    service: &'static str,
    base_url: String,
    http: Client,
    breaker: CircuitBreaker,
}

impl ServiceClient {
    pub(crate) fn new(
        service: &'static str,
        base_url: &str,
        timeout: Duration,
        breaker: BreakerConfig,
    ) -> Result<Self, DependencyError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DependencyError::Request {
                service: service.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            breaker: CircuitBreaker::new(breaker),
        })
    }

    pub(crate) fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Send one request and require the `expected` status.
    pub(crate) async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        expected: StatusCode,
    ) -> Result<Response, DependencyError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| DependencyError::Request {
            service: self.service.to_string(),
            message: e.to_string(),
        })?;

        if response.status() != expected {
            return Err(DependencyError::Status {
                service: self.service.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    pub(crate) async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, DependencyError> {
        response.json::<T>().await.map_err(|e| DependencyError::Decode {
            service: self.service.to_string(),
            message: e.to_string(),
        })
    }

    /// Run `operation` through the breaker, with retries when a policy is given.
    pub(crate) async fn call<F, Fut, T>(
        &self,
        retry: Option<&RetryPolicy>,
        operation: F,
    ) -> Result<T, DependencyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DependencyError>>,
    {
        let result = match retry {
            Some(policy) => self.breaker.execute_with_retry(policy, operation).await,
            None => self.breaker.execute(operation).await,
        };
        result.map_err(|e| self.flatten(e))
    }

    fn flatten(&self, err: ResilienceError<DependencyError>) -> DependencyError {
        match err {
            ResilienceError::CircuitOpen { .. } => DependencyError::CircuitOpen {
                service: self.service.to_string(),
            },
            ResilienceError::Operation(e) => e,
            ResilienceError::RetriesExhausted { attempts, last } => DependencyError::RetriesExhausted {
                service: self.service.to_string(),
                attempts,
                last: last.to_string(),
            },
        }
    }
}
