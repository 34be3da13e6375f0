//! Turns a decoded probe match into the record handed back to the inventory.

use tracing::{debug, warn};

use camscout_common::error::ConvertError;
use camscout_common::identify::DeviceInformationProvider;
use camscout_common::models::{
    ADDRESS, AUTH_MODE, AUTO_DISCOVERY_LABEL, AuthMode, DeviceInformation, DiscoveredDevice,
    ENDPOINT_REF_ADDRESS, ONVIF_PROTOCOL, OnvifDevice, PORT, ProtocolMap, ProtocolProperties,
    SECRET_PATH,
};

use super::identify::resolve_device_information;

/// Values seeded into every new device before identification.
#[derive(Debug, Clone)]
pub struct OnvifSettings {
    pub default_auth_mode: AuthMode,
    pub default_secret_path: String,
}

impl Default for OnvifSettings {
    fn default() -> Self {
        Self {
            default_auth_mode: AuthMode::default(),
            default_secret_path: camscout_common::config::DEFAULT_SECRET_PATH.to_string(),
        }
    }
}

/// Builds a [`DiscoveredDevice`] for `device`.
///
/// A failed identification still produces a record, named after the endpoint reference.
/// Only an empty endpoint reference is rejected.
pub async fn create_discovered_device(
    provider: &dyn DeviceInformationProvider,
    settings: &OnvifSettings,
    device: OnvifDevice,
) -> Result<DiscoveredDevice, ConvertError> {
    let endpoint_ref = device.endpoint_ref_address.trim().to_string();
    if endpoint_ref.is_empty() {
        warn!(
            "The EndpointRefAddress is empty, the camera at XAddr {} cannot be named",
            device.xaddr
        );
        return Err(ConvertError::MissingEndpointReference {
            xaddr: device.xaddr,
        });
    }

    let (address, port) = device.address_and_port();
    let mut protocols = ProtocolMap::from([(
        ONVIF_PROTOCOL.to_string(),
        ProtocolProperties::new()
            .with(ADDRESS, address.as_str())
            .with(PORT, port)
            .with(AUTH_MODE, settings.default_auth_mode.as_str())
            .with(SECRET_PATH, settings.default_secret_path.as_str())
            .with(ENDPOINT_REF_ADDRESS, endpoint_ref.as_str()),
    )]);

    let record = match resolve_device_information(provider, &mut protocols, &endpoint_ref).await {
        Ok(info) => identified(&info, &endpoint_ref, protocols),
        Err(e) => {
            warn!("failed to get the device information for the camera {endpoint_ref}: {e}");
            DiscoveredDevice {
                name: endpoint_ref.clone(),
                protocols,
                description: format!("Auto discovered {ONVIF_PROTOCOL} camera"),
                labels: vec![AUTO_DISCOVERY_LABEL.to_string()],
            }
        }
    };

    debug!(
        "Discovered camera '{}' from the address '{}'",
        record.name, address
    );
    Ok(record)
}

fn identified(
    info: &DeviceInformation,
    endpoint_ref: &str,
    protocols: ProtocolMap,
) -> DiscoveredDevice {
    let name = format!(
        "{}-{}-{}",
        info.manufacturer.replace(' ', "-"),
        info.model.replace(' ', "-"),
        endpoint_ref
    );

    DiscoveredDevice {
        name,
        protocols,
        description: format!("{} {} Camera", info.manufacturer, info.model),
        labels: vec![
            AUTO_DISCOVERY_LABEL.to_string(),
            info.manufacturer.clone(),
            info.model.clone(),
        ],
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
