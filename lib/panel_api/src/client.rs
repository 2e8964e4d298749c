use std::sync::Arc;

use chipp_http::{HttpClient, HttpMethod, NoInterceptor};
use log::{debug, trace};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{Error, Result, SystemState};

/// Client for the register panel REST service. Cheap to clone; the
/// underlying HTTP client is shared.
#[derive(Clone)]
pub struct Client {
    http: Arc<HttpClient<NoInterceptor>>,
}

/// Body of a single-register write command.
#[derive(Debug, Serialize, PartialEq)]
pub struct WriteRequest {
    pub device_name: String,
    pub unit_id: u8,
    pub address: u16,
    pub value: serde_json::Number,
}

/// Body of an add-register request. The address stays a string on the wire;
/// the server decides which formats it accepts.
#[derive(Debug, Serialize, PartialEq)]
struct AddRegisterRequest {
    address: String,
}

impl Client {
    /// `base_url` points at the service API root, e.g.
    /// `http://localhost:5000/api`.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = HttpClient::new(base_url)?;

        Ok(Self {
            http: Arc::new(http),
        })
    }

    /// Fetches a fresh snapshot of the whole system.
    pub async fn state(&self) -> Result<SystemState> {
        let body = self.perform(&["state"], HttpMethod::Get, None::<&()>).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn write_register(&self, write: &WriteRequest) -> Result<()> {
        self.perform(&["write"], HttpMethod::Post, Some(write))
            .await?;
        Ok(())
    }

    pub async fn set_armed(&self, armed: bool) -> Result<()> {
        self.perform(&["arm"], HttpMethod::Post, Some(&json!({ "armed": armed })))
            .await?;
        Ok(())
    }

    /// Requests that the server start polling one more register. The address
    /// is forwarded verbatim; the server decides which formats it accepts.
    pub async fn add_register(&self, address: &str) -> Result<()> {
        let request = AddRegisterRequest {
            address: address.to_string(),
        };

        self.perform(&["registers"], HttpMethod::Post, Some(&request))
            .await?;
        Ok(())
    }

    /// Performs one call and applies the shared success/error convention:
    /// non-2xx fails with the server-supplied `error` field when present,
    /// otherwise a generic `HTTP <status>` message. A response body that is
    /// not valid JSON is treated as an empty object.
    async fn perform<B: Serialize>(
        &self,
        segments: &[&str],
        method: HttpMethod,
        body: Option<&B>,
    ) -> Result<Value> {
        let mut request = self.http.new_request(segments);
        request.set_method(method);

        if let Some(body) = body {
            request.set_json_body(body);
        }

        debug!("request /{}", segments.join("/"));

        let (status, body) = self
            .http
            .perform_request(request, |_, response| {
                trace!("response: {}", String::from_utf8_lossy(&response.body));

                let body = serde_json::from_slice(&response.body)
                    .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

                Ok((response.status_code as u16, body))
            })
            .await?;

        if (200..300).contains(&status) {
            Ok(body)
        } else {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}"));

            Err(Error::Api { status, message })
        }
    }
}
