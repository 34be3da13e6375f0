//! HTTP side of device identification: the SOAP `GetDeviceInformation` call.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use tracing::trace;

use camscout_common::error::IdentifyError;
use camscout_common::identify::{Credentials, DeviceInformationProvider, SecretProvider};
use camscout_common::models::{
    ADDRESS, AUTH_MODE, AuthMode, DeviceInformation, ONVIF_PROTOCOL, PORT, ProtocolMap,
    ProtocolProperties, SECRET_PATH,
};
use camscout_protocols::devicemgmt::{self, DEVICE_SERVICE_PATH, SOAP_CONTENT_TYPE, UsernameToken};
use camscout_protocols::httpdigest::DigestChallenge;

/// Queries `http://<Address>:<Port>/onvif/device_service`, authenticating with the
/// credentials stored under the device's `SecretPath` as its `AuthMode` asks.
pub struct OnvifInformationClient {
    http: reqwest::Client,
    secrets: Arc<dyn SecretProvider>,
}

impl OnvifInformationClient {
    pub fn new(secrets: Arc<dyn SecretProvider>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self { http, secrets })
    }

    /// Auth mode of the device and the credentials it needs, if any.
    fn credentials(
        &self,
        props: &ProtocolProperties,
    ) -> Result<(AuthMode, Option<Credentials>), IdentifyError> {
        let auth_mode: AuthMode = match props.get(AUTH_MODE) {
            Some(raw) => raw.parse().map_err(|_| IdentifyError::InvalidProperty {
                key: AUTH_MODE,
                value: raw.to_string(),
            })?,
            None => AuthMode::default(),
        };
        if auth_mode == AuthMode::None {
            return Ok((auth_mode, None));
        }

        let secret_path = props
            .get(SECRET_PATH)
            .ok_or(IdentifyError::MissingProperty(SECRET_PATH))?;
        Ok((auth_mode, Some(self.secrets.credentials(secret_path)?)))
    }

    async fn post(
        &self,
        url: &str,
        body: String,
        authorization: Option<String>,
    ) -> Result<reqwest::Response, IdentifyError> {
        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(body);
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        request.send().await.map_err(|e| IdentifyError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl DeviceInformationProvider for OnvifInformationClient {
    async fn device_information(
        &self,
        protocols: &ProtocolMap,
    ) -> Result<DeviceInformation, IdentifyError> {
        let props = protocols
            .get(ONVIF_PROTOCOL)
            .ok_or(IdentifyError::MissingProperty(ONVIF_PROTOCOL))?;
        let url = device_service_url(props)?;
        let (auth_mode, creds) = self.credentials(props)?;

        let token = creds
            .as_ref()
            .filter(|_| auth_mode.uses_username_token())
            .map(|c| UsernameToken::new(&c.username, &c.password));
        let envelope = devicemgmt::get_device_information_request(token.as_ref());

        trace!("GetDeviceInformation -> {url} ({auth_mode})");
        let mut response = self.post(&url, envelope.clone(), None).await?;

        if response.status() == StatusCode::UNAUTHORIZED && auth_mode.uses_http_digest() {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|value| value.to_str().ok())
                .and_then(DigestChallenge::parse);
            if let (Some(challenge), Some(creds)) = (challenge, creds.as_ref()) {
                trace!("{url} answered with a digest challenge for realm '{}'", challenge.realm);
                let authorization = challenge.authorization(
                    &creds.username,
                    &creds.password,
                    "POST",
                    DEVICE_SERVICE_PATH,
                );
                response = self.post(&url, envelope, Some(authorization)).await?;
            }
        }

        let status = response.status();
        let body = response.text().await.map_err(|e| IdentifyError::Request {
            url: url.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            // Devices report auth failures as a SOAP fault inside a 400/500
            if let Err(IdentifyError::Fault(reason)) = devicemgmt::parse_device_information(&body) {
                return Err(IdentifyError::Fault(reason));
            }
            return Err(IdentifyError::Status {
                url,
                status: status.as_u16(),
            });
        }

        devicemgmt::parse_device_information(&body)
    }
}

fn device_service_url(props: &ProtocolProperties) -> Result<String, IdentifyError> {
    let address = props
        .get(ADDRESS)
        .ok_or(IdentifyError::MissingProperty(ADDRESS))?;
    let port = props.get(PORT).ok_or(IdentifyError::MissingProperty(PORT))?;
    let port: u16 = port.parse().map_err(|_| IdentifyError::InvalidProperty {
        key: PORT,
        value: port.to_string(),
    })?;

    let host = match address.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
        _ => address.to_string(),
    };
    Ok(format!("http://{host}:{port}{DEVICE_SERVICE_PATH}"))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
