use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use camscout_common::error::IdentifyError;
use camscout_common::identify::{Credentials, DeviceInformationProvider};
use camscout_common::models::{
    ADDRESS, AUTH_MODE, ONVIF_PROTOCOL, PORT, ProtocolMap, ProtocolProperties, SECRET_PATH,
};
use camscout_core::identify::OnvifInformationClient;
use camscout_core::secrets::CredentialStore;

use crate::support::{digest_device_service, fixed_http_responder, DeviceService};

fn client() -> OnvifInformationClient {
    let store = CredentialStore::from_map(HashMap::from([(
        "credentials001".to_string(),
        Credentials {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        },
    )]));
    OnvifInformationClient::new(Arc::new(store), Duration::from_secs(2)).unwrap()
}

fn protocols(addr: SocketAddr, auth_mode: &str) -> ProtocolMap {
    ProtocolMap::from([(
        ONVIF_PROTOCOL.to_string(),
        ProtocolProperties::new()
            .with(ADDRESS, addr.ip().to_string())
            .with(PORT, addr.port().to_string())
            .with(AUTH_MODE, auth_mode)
            .with(SECRET_PATH, "credentials001"),
    )])
}

#[tokio::test]
async fn signed_request_returns_device_information() {
    let device = DeviceService::start(Some("admin")).await;

    let info = client()
        .device_information(&protocols(device.addr, "usernametoken"))
        .await
        .unwrap();

    assert_eq!(info.manufacturer, "Acme Corp");
    assert_eq!(info.model, "Cam 1");
    assert_eq!(info.firmware_version, "1.0.4");
    assert_eq!(info.serial_number, "SN-0001");
    assert_eq!(info.hardware_id, "HW-1");

    let request = &device.requests()[0];
    assert!(request.contains("PasswordDigest"));
    assert!(request.contains("GetDeviceInformation"));
}

#[tokio::test]
async fn rejected_credentials_surface_the_soap_fault() {
    let device = DeviceService::start(Some("someone-else")).await;

    let err = client()
        .device_information(&protocols(device.addr, "usernametoken"))
        .await
        .unwrap_err();

    match err {
        IdentifyError::Fault(reason) => assert_eq!(reason, "Sender not Authorized"),
        other => panic!("expected SOAP fault, got {other:?}"),
    }
}

#[tokio::test]
async fn non_soap_error_status_is_reported() {
    let addr = fixed_http_responder("503 Service Unavailable", "").await;

    let err = client()
        .device_information(&protocols(addr, "none"))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentifyError::Status { status: 503, .. }));
}

#[tokio::test]
async fn unexpected_body_is_a_response_error() {
    let addr = fixed_http_responder("200 OK", "<html><body>login</body></html>").await;

    let err = client()
        .device_information(&protocols(addr, "none"))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentifyError::Response(_)));
}

#[tokio::test]
async fn unreachable_device_is_a_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client()
        .device_information(&protocols(addr, "none"))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentifyError::Request { .. }));
}

#[tokio::test]
async fn digest_challenge_is_answered_with_stored_credentials() {
    let device = digest_device_service("admin", "admin123").await;

    let info = client()
        .device_information(&protocols(device.addr, "digest"))
        .await
        .unwrap();

    assert_eq!(info.manufacturer, "Acme Corp");
    let requests = device.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[1].contains("wsse:Security"));
}

#[tokio::test]
async fn both_mode_signs_the_envelope_and_answers_the_challenge() {
    let device = digest_device_service("admin", "admin123").await;

    client()
        .device_information(&protocols(device.addr, "both"))
        .await
        .unwrap();

    assert!(device.requests()[1].contains("PasswordDigest"));
}

#[tokio::test]
async fn wrong_digest_password_is_an_unauthorized_status() {
    let device = digest_device_service("admin", "other-password").await;

    let err = client()
        .device_information(&protocols(device.addr, "digest"))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentifyError::Status { status: 401, .. }));
    assert_eq!(device.requests().len(), 2);
}

#[tokio::test]
async fn username_token_mode_does_not_answer_digest_challenges() {
    let device = digest_device_service("admin", "admin123").await;

    let err = client()
        .device_information(&protocols(device.addr, "usernametoken"))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentifyError::Status { status: 401, .. }));
    assert_eq!(device.requests().len(), 1);
}
