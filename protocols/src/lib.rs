//! Wire codecs for the ONVIF discovery handshake.
//!
//! * [`wsdiscovery`]: the UDP `Probe` message and `ProbeMatches` decoding.
//! * [`devicemgmt`]: the authenticated `GetDeviceInformation` SOAP call.
//! * [`httpdigest`]: HTTP Digest answers for devices that challenge the SOAP call.

pub mod devicemgmt;
pub mod httpdigest;
pub mod wsdiscovery;
