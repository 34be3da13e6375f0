use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use camscout_common::config::DiscoveryMode;
use camscout_common::identify::Credentials;
use camscout_common::models::{AuthMode, DiscoveredDevice, MANUFACTURER, PORT, SECRET_PATH};
use camscout_common::network::range::IpCollection;
use camscout_core::discovery::DiscoveryService;
use camscout_core::identify::OnvifInformationClient;
use camscout_core::scanner::ScanOptions;
use camscout_core::secrets::CredentialStore;
use camscout_plugins::onvif::{OnvifProtocolDiscovery, OnvifSettings};

use crate::support::{probe_match, DeviceService, DiscoveryResponder};

fn creds(username: &str, password: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: password.to_string(),
    }
}

fn service(
    store: CredentialStore,
    mode: DiscoveryMode,
    responder: &DiscoveryResponder,
) -> DiscoveryService {
    let client = OnvifInformationClient::new(Arc::new(store), Duration::from_secs(2)).unwrap();
    let onvif = OnvifProtocolDiscovery::new(Arc::new(client), OnvifSettings::default());
    let options = ScanOptions {
        ports: vec![responder.addr.port()],
        timeout: Duration::from_millis(300),
        max_concurrency: 4,
        multicast_group: responder.addr,
    };
    DiscoveryService::new(Arc::new(onvif), mode, options)
}

fn loopback() -> IpCollection {
    let mut targets = IpCollection::new();
    targets.add_single(IpAddr::V4(Ipv4Addr::LOCALHOST));
    targets
}

async fn discover(service: &DiscoveryService) -> Vec<DiscoveredDevice> {
    service.perform_discovery(loopback(), None).await.unwrap()
}

/// A camera that accepts the shared default credentials is fully identified.
#[tokio::test]
async fn discovery_identifies_camera_with_default_credentials() {
    let device = DeviceService::start(Some("admin")).await;
    let responder =
        DiscoveryResponder::start(vec![probe_match("urn:uuid:123", &device.xaddr())]).await;
    let store = CredentialStore::from_map(HashMap::from([(
        "credentials001".to_string(),
        creds("admin", "admin123"),
    )]));

    let devices = discover(&service(store, DiscoveryMode::Netscan, &responder)).await;

    assert_eq!(devices.len(), 1);
    let camera = &devices[0];
    assert_eq!(camera.name, "Acme-Corp-Cam-1-urn:uuid:123");
    assert_eq!(camera.description, "Acme Corp Cam 1 Camera");
    assert_eq!(camera.labels, vec!["auto-discovery", "Acme Corp", "Cam 1"]);

    let props = camera.onvif_properties().unwrap();
    assert_eq!(props.get(PORT), Some(device.addr.port().to_string().as_str()));
    assert_eq!(props.get(SECRET_PATH), Some("credentials001"));

    assert_eq!(responder.probes().len(), 1);
    assert_eq!(device.requests().len(), 1);
    assert!(!device.requests()[0].contains("admin123"));
}

/// Per-device credentials keyed by the endpoint reference are tried after the default.
#[tokio::test]
async fn discovery_falls_back_to_per_device_credentials() {
    let device = DeviceService::start(Some("lobby")).await;
    let responder =
        DiscoveryResponder::start(vec![probe_match("urn:uuid:123", &device.xaddr())]).await;
    let store = CredentialStore::from_map(HashMap::from([
        ("credentials001".to_string(), creds("admin", "admin123")),
        ("urn:uuid:123".to_string(), creds("lobby", "s3cret")),
    ]));

    let devices = discover(&service(store, DiscoveryMode::Netscan, &responder)).await;

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "Acme-Corp-Cam-1-urn:uuid:123");
    let props = devices[0].onvif_properties().unwrap();
    assert_eq!(props.get(SECRET_PATH), Some("urn:uuid:123"));
    assert_eq!(props.get(MANUFACTURER), Some("Acme Corp"));
    assert_eq!(device.requests().len(), 2);
}

/// A camera that refuses every credential still shows up, named after its endpoint.
#[tokio::test]
async fn discovery_keeps_unidentified_camera() {
    let device = DeviceService::start(Some("nobody")).await;
    let responder =
        DiscoveryResponder::start(vec![probe_match("urn:uuid:999", &device.xaddr())]).await;
    let store = CredentialStore::from_map(HashMap::from([
        ("credentials001".to_string(), creds("admin", "admin123")),
        ("urn:uuid:999".to_string(), creds("lobby", "s3cret")),
    ]));

    let devices = discover(&service(store, DiscoveryMode::Netscan, &responder)).await;

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "urn:uuid:999");
    assert_eq!(devices[0].description, "Auto discovered Onvif camera");
    assert_eq!(devices[0].labels, vec!["auto-discovery"]);
    assert!(!devices[0].onvif_properties().unwrap().contains(MANUFACTURER));
}

/// Duplicate answers from one camera collapse into a single record.
#[tokio::test]
async fn discovery_merges_duplicate_answers() {
    let device = DeviceService::start(None).await;
    let answer = probe_match("urn:uuid:123", &device.xaddr());
    let responder = DiscoveryResponder::start(vec![answer.clone(), answer]).await;

    let service = service(CredentialStore::default(), DiscoveryMode::Netscan, &responder);
    let devices = discover(&service).await;

    assert_eq!(devices.len(), 1);
}

/// An answer without endpoint reference is dropped without failing the scan.
#[tokio::test]
async fn discovery_drops_answers_without_endpoint_reference() {
    let device = DeviceService::start(None).await;
    let responder = DiscoveryResponder::start(vec![probe_match("", &device.xaddr())]).await;

    let service = service(CredentialStore::default(), DiscoveryMode::Netscan, &responder);
    let devices = discover(&service).await;

    assert!(devices.is_empty());
    assert!(device.requests().is_empty());
}

/// Anonymous identification works without any stored credentials.
#[tokio::test]
async fn discovery_with_anonymous_auth() {
    let device = DeviceService::start(None).await;
    let responder =
        DiscoveryResponder::start(vec![probe_match("urn:uuid:123", &device.xaddr())]).await;
    let client =
        OnvifInformationClient::new(Arc::new(CredentialStore::default()), Duration::from_secs(2))
            .unwrap();
    let settings = OnvifSettings {
        default_auth_mode: AuthMode::None,
        ..OnvifSettings::default()
    };
    let onvif = OnvifProtocolDiscovery::new(Arc::new(client), settings);
    let options = ScanOptions {
        ports: vec![responder.addr.port()],
        timeout: Duration::from_millis(300),
        max_concurrency: 4,
        multicast_group: responder.addr,
    };
    let service = DiscoveryService::new(Arc::new(onvif), DiscoveryMode::Netscan, options);

    let devices = discover(&service).await;

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "Acme-Corp-Cam-1-urn:uuid:123");
    assert!(!device.requests()[0].contains("wsse:Security"));
}

/// Group probing attributes answers to the host in their XAddr.
#[tokio::test]
async fn multicast_mode_probes_the_group_only() {
    let device = DeviceService::start(None).await;
    let responder =
        DiscoveryResponder::start(vec![probe_match("urn:uuid:123", &device.xaddr())]).await;
    let store = CredentialStore::default();

    let devices = service(store, DiscoveryMode::Multicast, &responder)
        .perform_discovery(IpCollection::new(), None)
        .await
        .unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(responder.probes().len(), 1);
}

/// Netscan and multicast together still produce one record per camera.
#[tokio::test]
async fn both_modes_merge_by_name() {
    let device = DeviceService::start(None).await;
    let responder =
        DiscoveryResponder::start(vec![probe_match("urn:uuid:123", &device.xaddr())]).await;

    let service = service(CredentialStore::default(), DiscoveryMode::Both, &responder);
    let devices = discover(&service).await;

    assert_eq!(devices.len(), 1);
    assert_eq!(responder.probes().len(), 2);
}

/// A camera answering both the sweep and the group probe is identified only once, so a
/// refused first attempt cannot leave a second, unidentified record behind.
#[tokio::test]
async fn both_modes_identify_each_camera_once() {
    let device = DeviceService::start_rejecting_first(Some("admin"), 1).await;
    let responder =
        DiscoveryResponder::start(vec![probe_match("urn:uuid:123", &device.xaddr())]).await;
    let store = CredentialStore::from_map(HashMap::from([
        ("credentials001".to_string(), creds("admin", "admin123")),
        ("urn:uuid:123".to_string(), creds("admin", "admin123")),
    ]));

    let devices = discover(&service(store, DiscoveryMode::Both, &responder)).await;

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "Acme-Corp-Cam-1-urn:uuid:123");
    assert_eq!(responder.probes().len(), 2);
    assert_eq!(device.requests().len(), 2);
}
