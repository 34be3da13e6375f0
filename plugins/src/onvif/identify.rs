use tracing::debug;

use camscout_common::error::IdentifyError;
use camscout_common::identify::DeviceInformationProvider;
use camscout_common::models::{
    DeviceInformation, FIRMWARE_VERSION, HARDWARE_ID, MANUFACTURER, MODEL, ONVIF_PROTOCOL,
    ProtocolMap, SECRET_PATH, SERIAL_NUMBER,
};

/// Queries `provider` for device metadata and stores it in the ONVIF properties.
///
/// The first attempt uses whatever `SecretPath` is seeded. If it fails, `SecretPath` is
/// replaced with `endpoint_ref` and the call is made exactly once more. That replacement is
/// kept even when the retry fails too.
pub async fn resolve_device_information(
    provider: &dyn DeviceInformationProvider,
    protocols: &mut ProtocolMap,
    endpoint_ref: &str,
) -> Result<DeviceInformation, IdentifyError> {
    let info = match provider.device_information(protocols).await {
        Ok(info) => info,
        Err(e) => {
            debug!(
                "{endpoint_ref}: default credentials rejected ({e}), \
                 retrying with per-device secret path"
            );
            protocols
                .entry(ONVIF_PROTOCOL.to_string())
                .or_default()
                .set(SECRET_PATH, endpoint_ref);
            provider.device_information(protocols).await?
        }
    };

    let props = protocols.entry(ONVIF_PROTOCOL.to_string()).or_default();
    props.set(MANUFACTURER, info.manufacturer.as_str());
    props.set(MODEL, info.model.as_str());
    props.set(FIRMWARE_VERSION, info.firmware_version.as_str());
    props.set(SERIAL_NUMBER, info.serial_number.as_str());
    props.set(HARDWARE_ID, info.hardware_id.as_str());

    Ok(info)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
