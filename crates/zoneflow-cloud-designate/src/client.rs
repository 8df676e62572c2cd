//! Designate v2 zones API client
//!
//! Direct HTTP implementation of [`ZoneClient`] for the OpenStack DNS
//! service. Uses a pre-issued token (`X-Auth-Token`); obtaining one is left
//! to the caller.

use crate::error::{DesignateError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use zoneflow_cloud::{ClientResult, ZoneClient, ZoneDescriptor, ZonePatch, ZoneSpec, ZoneType};

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const SUDO_PROJECT_HEADER: &str = "X-Auth-Sudo-Project-ID";
const ALL_PROJECTS_HEADER: &str = "X-Auth-All-Projects";

/// Configuration for the zones client
#[derive(Debug, Clone)]
pub struct DesignateConfig {
    /// Service endpoint, e.g. `https://dns.example.com:9001`
    pub endpoint: String,
    pub auth_token: String,
    /// Act on zones of another project
    pub project_id: Option<String>,
    /// Per-request timeout
    pub request_timeout: Option<Duration>,
}

impl DesignateConfig {
    /// Create DesignateConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("OS_DNS_ENDPOINT")
            .map_err(|_| DesignateError::MissingEnvVar("OS_DNS_ENDPOINT".to_string()))?;
        let auth_token = std::env::var("OS_AUTH_TOKEN")
            .map_err(|_| DesignateError::MissingEnvVar("OS_AUTH_TOKEN".to_string()))?;
        let project_id = std::env::var("OS_PROJECT_ID").ok().filter(|p| !p.is_empty());
        let request_timeout = match std::env::var("OS_DNS_REQUEST_TIMEOUT") {
            Ok(value) => Some(zoneflow_cloud::settings::parse_duration(&value).ok_or_else(
                || DesignateError::InvalidConfig(format!("OS_DNS_REQUEST_TIMEOUT: {}", value)),
            )?),
            Err(_) => None,
        };

        Ok(Self {
            endpoint,
            auth_token,
            project_id,
            request_timeout,
        })
    }
}

/// Designate zones client
pub struct DesignateZones {
    client: reqwest::Client,
    endpoint: String,
    auth_token: String,
    project_id: Option<String>,
}

impl DesignateZones {
    pub fn new(config: DesignateConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(DesignateError::InvalidConfig("empty endpoint".to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            auth_token: config.auth_token,
            project_id: config.project_id,
        })
    }

    fn zones_url(&self) -> String {
        format!("{}/v2/zones", self.endpoint)
    }

    fn zone_url(&self, id: &str) -> String {
        format!("{}/v2/zones/{}", self.endpoint, id)
    }

    fn request(&self, method: Method, url: &str, project_id: Option<&str>) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header(AUTH_TOKEN_HEADER, &self.auth_token);

        if let Some(project_id) = project_id.or(self.project_id.as_deref()) {
            builder = builder
                .header(SUDO_PROJECT_HEADER, project_id)
                .header(ALL_PROJECTS_HEADER, "true");
        }
        builder
    }

    /// Send and return the raw body, turning non-success statuses into API errors
    async fn send_raw(&self, builder: RequestBuilder) -> Result<String> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DesignateError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(body)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let body = self.send_raw(builder).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn create_zone(&self, spec: &ZoneSpec) -> Result<ZoneDescriptor> {
        let body = create_body(spec);
        tracing::debug!("Creating zone {} with options: {}", spec.name, body);

        let builder = self
            .request(Method::POST, &self.zones_url(), spec.project_id.as_deref())
            .json(&body);
        let zone: ApiZone = self.send(builder).await?;
        Ok(zone.into())
    }

    pub async fn get_zone(&self, id: &str) -> Result<ZoneDescriptor> {
        let builder = self.request(Method::GET, &self.zone_url(id), None);
        let zone: ApiZone = self.send(builder).await?;
        tracing::debug!("Retrieved zone {} ({})", id, zone.status);
        Ok(zone.into())
    }

    pub async fn update_zone(&self, id: &str, patch: &ZonePatch) -> Result<ZoneDescriptor> {
        tracing::debug!("Updating zone {} with options: {:?}", id, patch);

        let builder = self
            .request(Method::PATCH, &self.zone_url(id), None)
            .json(patch);
        let zone: ApiZone = self.send(builder).await?;
        Ok(zone.into())
    }

    pub async fn delete_zone(&self, id: &str) -> Result<()> {
        tracing::debug!("Deleting zone {}", id);

        // Designate answers 202 with the zone, but proxies may strip the body
        let builder = self.request(Method::DELETE, &self.zone_url(id), None);
        self.send_raw(builder).await?;
        Ok(())
    }
}

#[async_trait]
impl ZoneClient for DesignateZones {
    async fn create(&self, spec: &ZoneSpec) -> ClientResult<ZoneDescriptor> {
        Ok(self.create_zone(spec).await?)
    }

    async fn read(&self, id: &str) -> ClientResult<ZoneDescriptor> {
        Ok(self.get_zone(id).await?)
    }

    async fn update(&self, id: &str, patch: &ZonePatch) -> ClientResult<ZoneDescriptor> {
        Ok(self.update_zone(id, patch).await?)
    }

    async fn delete(&self, id: &str) -> ClientResult<()> {
        Ok(self.delete_zone(id).await?)
    }
}

/// Request body for zone creation
///
/// Value specs are merged in last but never override a field set by the spec.
pub fn create_body(spec: &ZoneSpec) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    body.insert("name".to_string(), spec.name.clone().into());
    body.insert(
        "type".to_string(),
        spec.zone_type.unwrap_or_default().to_string().into(),
    );
    if let Some(email) = &spec.email {
        body.insert("email".to_string(), email.clone().into());
    }
    if let Some(ttl) = spec.ttl {
        body.insert("ttl".to_string(), ttl.into());
    }
    if let Some(description) = &spec.description {
        body.insert("description".to_string(), description.clone().into());
    }
    if !spec.masters.is_empty() {
        body.insert(
            "masters".to_string(),
            spec.masters.iter().cloned().collect::<Vec<_>>().into(),
        );
    }
    if !spec.attributes.is_empty() {
        body.insert(
            "attributes".to_string(),
            spec.attributes
                .iter()
                .map(|(key, value)| (key.clone(), value.clone().into()))
                .collect::<serde_json::Map<_, _>>()
                .into(),
        );
    }
    for (key, value) in &spec.value_specs {
        body.entry(key.clone())
            .or_insert_with(|| value.clone().into());
    }
    serde_json::Value::Object(body)
}

/// Pull the human-readable message out of an error body
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiErrorBody {
        message: Option<String>,
        #[serde(rename = "type")]
        error_type: Option<String>,
    }

    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            message: Some(message),
            ..
        }) => message,
        Ok(ApiErrorBody {
            error_type: Some(error_type),
            ..
        }) => error_type,
        _ if body.trim().is_empty() => "Unknown error".to_string(),
        _ => body.trim().to_string(),
    }
}

/// Designate timestamps come without an offset and are always UTC
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ApiZone {
    id: String,
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    ttl: u32,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type", default)]
    zone_type: ZoneType,
    #[serde(default)]
    masters: Vec<String>,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    project_id: Option<String>,
    status: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl From<ApiZone> for ZoneDescriptor {
    fn from(zone: ApiZone) -> Self {
        ZoneDescriptor {
            id: zone.id,
            name: zone.name,
            email: zone.email,
            ttl: zone.ttl,
            description: zone.description.unwrap_or_default(),
            zone_type: zone.zone_type,
            masters: zone.masters.into_iter().collect(),
            attributes: zone.attributes,
            project_id: zone.project_id,
            status: zone.status,
            created_at: zone.created_at.as_deref().and_then(parse_timestamp),
            updated_at: zone.updated_at.as_deref().and_then(parse_timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn config() -> DesignateConfig {
        DesignateConfig {
            endpoint: "https://dns.example.com:9001/".to_string(),
            auth_token: "token".to_string(),
            project_id: None,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }

    #[test]
    fn test_urls() {
        let zones = DesignateZones::new(config()).unwrap();
        assert_eq!(zones.zones_url(), "https://dns.example.com:9001/v2/zones");
        assert_eq!(
            zones.zone_url("a86dba58"),
            "https://dns.example.com:9001/v2/zones/a86dba58"
        );
    }

    #[test]
    fn test_empty_endpoint_is_rejected() {
        let mut config = config();
        config.endpoint = " ".to_string();
        assert!(matches!(
            DesignateZones::new(config),
            Err(DesignateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_create_body() {
        let mut spec = ZoneSpec::new("example.org.")
            .with_email("joe@example.org")
            .with_ttl(7200)
            .with_attribute("tier", "gold");
        spec.value_specs.insert("pool_id".to_string(), "p1".to_string());
        spec.value_specs.insert("ttl".to_string(), "1".to_string());

        let body = create_body(&spec);

        assert_eq!(
            body,
            serde_json::json!({
                "name": "example.org.",
                "type": "PRIMARY",
                "email": "joe@example.org",
                "ttl": 7200,
                "attributes": {"tier": "gold"},
                "pool_id": "p1",
            })
        );
    }

    #[test]
    fn test_create_body_for_secondary() {
        let spec = ZoneSpec::new("example.net.")
            .with_zone_type(ZoneType::Secondary)
            .with_master("10.0.0.2")
            .with_master("10.0.0.1");

        let body = create_body(&spec);
        assert_eq!(body["type"], "SECONDARY");
        assert_eq!(body["masters"], serde_json::json!(["10.0.0.1", "10.0.0.2"]));
        assert!(body.get("email").is_none());
    }

    #[test]
    fn test_zone_conversion() {
        let json = r#"{
            "id": "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3",
            "pool_id": "572ba08c-d929-4c70-8e42-03824bb24ca2",
            "project_id": "4335d1f0-f793-11e2-b778-0800200c9a66",
            "name": "example.org.",
            "email": "joe@example.org",
            "ttl": 7200,
            "serial": 1404757531,
            "status": "ACTIVE",
            "action": "CREATE",
            "description": "This is an example zone.",
            "masters": [],
            "type": "PRIMARY",
            "transferred_at": null,
            "version": 1,
            "created_at": "2014-07-07T18:22:08.000000",
            "updated_at": null
        }"#;

        let zone: ZoneDescriptor = serde_json::from_str::<ApiZone>(json).unwrap().into();

        assert_eq!(zone.id, "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3");
        assert_eq!(zone.ttl, 7200);
        assert_eq!(zone.status, "ACTIVE");
        assert_eq!(zone.zone_type, ZoneType::Primary);
        assert_eq!(
            zone.project_id.as_deref(),
            Some("4335d1f0-f793-11e2-b778-0800200c9a66")
        );
        assert!(zone.masters.is_empty());
        assert!(zone.updated_at.is_none());

        let created = zone.created_at.unwrap();
        assert_eq!(created.year(), 2014);
        assert_eq!(created.hour(), 18);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"code": 409, "type": "duplicate_zone", "message": "Duplicate Zone"}"#),
            "Duplicate Zone"
        );
        assert_eq!(error_message(r#"{"type": "quota_exceeded"}"#), "quota_exceeded");
        assert_eq!(error_message(""), "Unknown error");
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2014-07-07T18:22:08.000000").is_some());
        assert!(parse_timestamp("2014-07-07T18:22:08Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let zones = DesignateZones::new(DesignateConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            auth_token: "token".to_string(),
            project_id: None,
            request_timeout: Some(Duration::from_secs(5)),
        })
        .unwrap();

        let err = tokio_test::assert_err!(zones.read("z1").await);
        assert_eq!(err.kind, zoneflow_cloud::ClientErrorKind::Transport);
    }

    /// Serve a single HTTP response on a local port and return its endpoint
    async fn respond_once(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            while reader.read_line(&mut line).await.unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            reader.get_mut().write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn local_zones(endpoint: String) -> DesignateZones {
        DesignateZones::new(DesignateConfig {
            endpoint,
            auth_token: "token".to_string(),
            project_id: None,
            request_timeout: Some(Duration::from_secs(5)),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let zones = local_zones(respond_once("204 No Content", "").await);
        tokio_test::assert_ok!(zones.delete("z1").await);
    }

    #[tokio::test]
    async fn test_delete_of_missing_zone_is_not_found() {
        let body = r#"{"code": 404, "type": "zone_not_found", "message": "Could not find Zone"}"#;
        let zones = local_zones(respond_once("404 Not Found", body).await);

        let err = tokio_test::assert_err!(zones.delete("z1").await);
        assert!(err.is_not_found());
        assert_eq!(err.message, "API error (status 404): Could not find Zone");
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("OS_DNS_ENDPOINT", Some("https://dns.example.com")),
                ("OS_AUTH_TOKEN", Some("secret")),
                ("OS_PROJECT_ID", Some("p1")),
                ("OS_DNS_REQUEST_TIMEOUT", Some("20s")),
            ],
            || {
                let config = DesignateConfig::from_env().unwrap();
                assert_eq!(config.endpoint, "https://dns.example.com");
                assert_eq!(config.project_id.as_deref(), Some("p1"));
                assert_eq!(config.request_timeout, Some(Duration::from_secs(20)));
            },
        );
    }

    #[test]
    fn test_config_requires_token() {
        temp_env::with_vars(
            [
                ("OS_DNS_ENDPOINT", Some("https://dns.example.com")),
                ("OS_AUTH_TOKEN", None),
            ],
            || {
                assert!(matches!(
                    DesignateConfig::from_env(),
                    Err(DesignateError::MissingEnvVar(name)) if name == "OS_AUTH_TOKEN"
                ));
            },
        );
    }
}
