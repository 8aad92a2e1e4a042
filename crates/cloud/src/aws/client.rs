//! Signed HTTP transport for the AWS query, JSON and REST-JSON protocols.

use std::sync::Arc;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::models::{error_code, JsonErrorBody, XmlErrorBody};
use super::params::QueryParams;
use super::signer::{self, SignableRequest};
use crate::config::ClientConfig;
use crate::providers::CloudError;

/// Where a request goes and how it is signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Signing name of the service (`ec2`, `lightsail`, ...).
    pub service: &'static str,
    /// Signing region.
    pub region: String,
    /// Host name of the public endpoint.
    pub host: String,
}

impl Endpoint {
    /// `<service>.<region>.amazonaws.com`.
    #[must_use]
    pub fn regional(service: &'static str, region: &str) -> Self {
        Self {
            service,
            region: region.to_string(),
            host: format!("{service}.{region}.amazonaws.com"),
        }
    }

    /// A service with a single global endpoint signed for `region`.
    #[must_use]
    pub fn global(service: &'static str, host: &str, region: &str) -> Self {
        Self {
            service,
            region: region.to_string(),
            host: host.to_string(),
        }
    }
}

/// Raw HTTP reply before decoding.
struct Reply {
    status: StatusCode,
    text: String,
    /// `x-amzn-ErrorType` header, used by REST-JSON services.
    error_type: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Protocol {
    Query,
    Json,
}

/// A signed AWS HTTP client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct AwsClient {
    http: Client,
    config: Arc<ClientConfig>,
}

impl AwsClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self, CloudError> {
        Ok(Self {
            http: config.http_client()?,
            config: Arc::new(config.clone()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call a query-protocol action (EC2, RDS, STS) and decode the XML reply.
    ///
    /// # Errors
    /// Returns error if the request fails, AWS rejects it, or the reply cannot be decoded.
    pub async fn query<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        action: &str,
        version: &str,
        params: &QueryParams,
    ) -> Result<T, CloudError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", action)
            .append_pair("Version", version)
            .extend_pairs(params.as_slice().iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();

        debug!(service = endpoint.service, region = %endpoint.region, action, "AWS request");
        let reply = self
            .send(
                endpoint,
                Method::POST,
                "/",
                &[(
                    "content-type",
                    "application/x-www-form-urlencoded; charset=utf-8",
                )],
                body.into_bytes(),
            )
            .await?;

        if reply.status.is_success() {
            quick_xml::de::from_str(&reply.text).map_err(|e| {
                warn!(action, error = %e, "Failed to decode XML response");
                CloudError::Xml(e)
            })
        } else {
            Err(Self::api_error(&reply, Protocol::Query))
        }
    }

    /// Call a JSON 1.1 protocol operation (`X-Amz-Target`).
    ///
    /// # Errors
    /// Returns error if the request fails, AWS rejects it, or the reply cannot be decoded.
    pub async fn json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        target: &str,
        body: &B,
    ) -> Result<T, CloudError> {
        let payload = serde_json::to_vec(body)?;
        debug!(service = endpoint.service, region = %endpoint.region, target, "AWS request");
        let reply = self
            .send(
                endpoint,
                Method::POST,
                "/",
                &[
                    ("content-type", "application/x-amz-json-1.1"),
                    ("x-amz-target", target),
                ],
                payload,
            )
            .await?;
        Self::decode_json(&reply)
    }

    /// Call a REST-JSON operation at `path`.
    ///
    /// # Errors
    /// Returns error if the request fails, AWS rejects it, or the reply cannot be decoded.
    pub async fn rest_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, CloudError> {
        let payload = serde_json::to_vec(body)?;
        debug!(service = endpoint.service, region = %endpoint.region, %method, path, "AWS request");
        let reply = self
            .send(
                endpoint,
                method,
                path,
                &[("content-type", "application/json")],
                payload,
            )
            .await?;
        Self::decode_json(&reply)
    }

    /// REST-JSON call without a request body (`GET`, `DELETE`).
    ///
    /// # Errors
    /// Same as [`rest_json`](Self::rest_json).
    pub async fn rest_json_no_body<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        method: Method,
        path: &str,
    ) -> Result<T, CloudError> {
        debug!(service = endpoint.service, region = %endpoint.region, %method, path, "AWS request");
        let reply = self.send(endpoint, method, path, &[], Vec::new()).await?;
        Self::decode_json(&reply)
    }

    async fn send(
        &self,
        endpoint: &Endpoint,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        payload: Vec<u8>,
    ) -> Result<Reply, CloudError> {
        let (base, host) = match &self.config.endpoint_override {
            Some(base) => {
                let parsed = url::Url::parse(base)
                    .map_err(|e| CloudError::Config(format!("invalid endpoint '{base}': {e}")))?;
                let host = match (parsed.host_str(), parsed.port()) {
                    (Some(h), Some(p)) => format!("{h}:{p}"),
                    (Some(h), None) => h.to_string(),
                    (None, _) => {
                        return Err(CloudError::Config(format!("endpoint '{base}' has no host")))
                    }
                };
                (base.clone(), host)
            }
            None => (format!("https://{}", endpoint.host), endpoint.host.clone()),
        };

        let mut signable: Vec<(String, String)> = vec![("host".to_string(), host)];
        signable.extend(headers.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));

        let signed = signer::sign(
            &self.config.credentials,
            &endpoint.region,
            endpoint.service,
            &SignableRequest {
                method: method.as_str(),
                path,
                query: &[],
                headers: &signable,
                payload: &payload,
            },
            chrono::Utc::now(),
        )?;

        let mut request = self.http.request(method, format!("{base}{path}"));
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        for (name, value) in signed.into_pairs() {
            request = request.header(name, value);
        }

        let response = request.body(payload).send().await?;
        let status = response.status();
        let error_type = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(error_code);
        let text = response.text().await?;
        Ok(Reply {
            status,
            text,
            error_type,
        })
    }

    fn decode_json<T: DeserializeOwned>(reply: &Reply) -> Result<T, CloudError> {
        if !reply.status.is_success() {
            return Err(Self::api_error(reply, Protocol::Json));
        }
        let text = if reply.text.trim().is_empty() { "null" } else { reply.text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            warn!(error = %e, body = %text, "Failed to parse response");
            CloudError::Serialization(e)
        })
    }

    fn api_error(reply: &Reply, protocol: Protocol) -> CloudError {
        let status = reply.status;
        let (code, message) = match protocol {
            Protocol::Query => quick_xml::de::from_str::<XmlErrorBody>(&reply.text)
                .ok()
                .and_then(XmlErrorBody::into_error)
                .map(|e| (e.code, e.message)),
            Protocol::Json => serde_json::from_str::<JsonErrorBody>(&reply.text)
                .ok()
                .map(|e| (error_code(&e.kind), e.message)),
        }
        .map(|(code, message)| match (&reply.error_type, code.is_empty()) {
            (Some(header), true) => (header.clone(), message),
            _ => (code, message),
        })
        .unwrap_or_else(|| {
            (
                reply.error_type.clone().unwrap_or_else(|| {
                    status.canonical_reason().unwrap_or("Unknown").to_string()
                }),
                reply.text.clone(),
            )
        });

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            CloudError::Auth(format!("{code}: {message}"))
        } else if code.ends_with("NotFound") || code.ends_with("NotFoundException") {
            CloudError::NotFound(message)
        } else {
            CloudError::Api {
                status: status.as_u16(),
                code,
                message,
            }
        }
    }
}

impl std::fmt::Debug for AwsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
