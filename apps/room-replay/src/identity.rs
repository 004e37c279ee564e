//! Static identity of the captured Android client.
//!
//! The room service and the websocket gateway both check these headers, so
//! they are reproduced as the client sent them.

const OS_TYPE: &str = "android";
const APP_CHANNEL: &str = "official";
const CLIENT_NET: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub app_id: String,
    pub device_id: String,
    pub model: String,
    pub os_version: String,
    pub sdk_version: String,
    pub app_version: String,
    pub app_version_code: String,
    pub cpu_arch: String,
    pub country: String,
    pub language: String,
    /// Locale sent to the room service.
    pub http_locale: String,
    /// Locale sent on the websocket upgrade; the client uses a different one.
    pub ws_locale: String,
    pub user_agent: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            app_id: "1802".into(),
            device_id: "3390e1a3d2931a3e10acd093c452151d".into(),
            model: "OnePlus PJE110".into(),
            os_version: "12".into(),
            sdk_version: "32".into(),
            app_version: "3.1.8".into(),
            app_version_code: "30108".into(),
            cpu_arch: "aarch64".into(),
            country: "IN".into(),
            language: "en".into(),
            http_locale: "en_IN".into(),
            ws_locale: "en_ca".into(),
            user_agent: "okhttp/3.12.1".into(),
        }
    }
}

impl DeviceProfile {
    /// Headers for the room-entry POST. The token travels in two headers.
    ///
    /// `accept-encoding` is left to the HTTP client so it can also decode
    /// the gzip body it asks for.
    pub fn http_headers(&self, token: &str) -> Vec<(&'static str, String)> {
        vec![
            ("x-appid", self.app_id.clone()),
            ("country", self.country.clone()),
            ("x-authtoken", token.to_string()),
            ("osversion", self.os_version.clone()),
            ("stype", "1".into()),
            ("machine", self.model.clone()),
            ("hdid", self.device_id.clone()),
            ("x-authtype", "3".into()),
            ("language", self.language.clone()),
            ("version", self.app_version.clone()),
            ("x-cpuarch", self.cpu_arch.clone()),
            ("x-devicetype", self.model.clone()),
            ("x-sdk-ver", self.sdk_version.clone()),
            ("x-os-ver", self.os_version.clone()),
            ("x-auth-token", token.to_string()),
            ("x-ostype", OS_TYPE.into()),
            ("x-client-net", CLIENT_NET.into()),
            ("x-app-lastver", String::new()),
            ("x-deviceid", self.device_id.clone()),
            ("x-lang", self.http_locale.clone()),
            ("x-app-ver", self.app_version_code.clone()),
            ("content-type", "application/x-www-form-urlencoded".into()),
            ("user-agent", self.user_agent.clone()),
        ]
    }

    /// Headers for the websocket upgrade request.
    pub fn ws_headers(&self, token: &str) -> Vec<(&'static str, String)> {
        vec![
            ("X-CpuArch", self.cpu_arch.clone()),
            ("X-App-Channel", APP_CHANNEL.into()),
            ("X-DeviceType", self.model.clone()),
            ("X-Sdk-Ver", self.sdk_version.clone()),
            ("X-Client-Net", CLIENT_NET.into()),
            ("X-Lang", self.ws_locale.clone()),
            ("X-App-Ver", self.app_version_code.clone()),
            ("X-Os-Ver", self.os_version.clone()),
            ("X-Auth-Token", token.to_string()),
            ("X-OsType", OS_TYPE.into()),
            ("X-DeviceId", self.device_id.clone()),
            ("User-Agent", self.user_agent.clone()),
        ]
    }
}
