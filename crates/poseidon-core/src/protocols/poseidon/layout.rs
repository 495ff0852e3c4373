/// Transport property carrying the originating device id.
pub const DEVICE_ID_PROPERTY: &str = "iothub-connection-device-id";
/// Transport property carrying the message correlation id.
pub const CORRELATION_ID_PROPERTY: &str = "iothub-connection-auth-generation-id";
