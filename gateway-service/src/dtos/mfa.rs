use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequest {
    #[validate(length(min = 1, max = 64, message = "Device name must not be empty"))]
    pub device_name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDeviceRequest {
    #[validate(length(min = 1, max = 64, message = "Device name must not be empty"))]
    pub device_name: String,

    #[validate(length(min = 6, max = 8, message = "Code must be 6 to 8 digits"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(length(min = 6, max = 8, message = "Code must be 6 to 8 digits"))]
    pub code: String,
}
