pub mod onvif;
