use linkplayctl_core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Devices usually send every value as a string, but some firmware sends bare
/// numbers. Keep both as text and parse on access.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Read a field that must be present
pub(crate) fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| Error::api(format!("Device response is missing '{}'", key)))
}

/// Read a field that must be present and hold an integer
pub(crate) fn required_int(value: &Option<String>, key: &str) -> Result<i64> {
    let text = required(value, key)?;
    text.trim()
        .parse::<i64>()
        .map_err(|_| Error::api(format!("Expected integer for '{}', got: '{}'", key, text)))
}

/// Response from getStatus
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceStatus {
    #[serde(rename = "DeviceName", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(rename = "GroupName", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub hardware: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,
    #[serde(rename = "NewVer", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(rename = "hideSSID", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub hide_ssid: Option<String>,
    #[serde(rename = "WifiChannel", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub wifi_channel: Option<String>,
    #[serde(rename = "MAC", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub securemode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub encry: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub psk: Option<String>,
    /// Present only while the device is a multiroom slave
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub master_ip: Option<String>,
    /// Every other key the device reported
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceStatus {
    /// `securemode` is non-zero when the network uses authentication
    pub fn is_secure(&self) -> bool {
        self.securemode
            .as_deref()
            .and_then(|mode| mode.trim().parse::<i64>().ok())
            .map_or(false, |mode| mode != 0)
    }

    pub fn wifi_auth(&self) -> WifiAuth {
        WifiAuth {
            securemode: self.securemode.clone(),
            auth: self.auth.clone(),
            encry: self.encry.clone(),
            psk: self.psk.clone(),
        }
    }
}

/// Network authentication subset of getStatus
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WifiAuth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub securemode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psk: Option<String>,
}

/// Response from getPlayerStatus
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlayerStatus {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(rename = "loop", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub loop_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub eq: Option<String>,
    /// Position in milliseconds
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub curpos: Option<String>,
    /// Total length in milliseconds
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub totlen: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub vol: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub mute: Option<String>,
    // Hex-encoded on most firmware
    #[serde(rename = "Title", alias = "title", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Artist", alias = "artist", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(rename = "Album", alias = "album", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Multiroom role of this device merged with its slave list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiroomInfo {
    /// "master" or "slave"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master: Option<MasterRef>,
    /// Body of multiroom:getSlaveList (`slaves`, `slave_list`, ...)
    #[serde(flatten)]
    pub slaves: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MasterRef {
    pub ip: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_player_status() {
        let json = r#"{
            "type":"0",
            "ch":"2",
            "mode":"10",
            "loop":"0",
            "eq":"0",
            "status":"play",
            "curpos":"184919",
            "offset_pts":"184919",
            "totlen":"0",
            "vol":"39",
            "mute":"0",
            "Title":"54696D65",
            "Artist":"50696E6B20466C6F7964",
            "Album":"The Dark Side of the Moon"
        }"#;

        let status: PlayerStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.status.as_deref(), Some("play"));
        assert_eq!(status.loop_mode.as_deref(), Some("0"));
        assert_eq!(required_int(&status.vol, "vol").unwrap(), 39);
        assert_eq!(status.title.as_deref(), Some("54696D65"));
        assert_eq!(status.extra.get("ch"), Some(&Value::String("2".to_string())));
    }

    #[test]
    fn test_lowercase_metadata_keys() {
        let status: PlayerStatus =
            serde_json::from_str(r#"{"vol": 12, "title": "Time", "artist": "Pink Floyd"}"#).unwrap();
        assert_eq!(status.vol.as_deref(), Some("12"));
        assert_eq!(status.title.as_deref(), Some("Time"));
        assert_eq!(status.artist.as_deref(), Some("Pink Floyd"));
    }

    #[test]
    fn test_parse_device_status() {
        let json = r#"{
            "DeviceName":"Kitchen",
            "GroupName":"Kitchen",
            "ssid":"Kitchen_2C4F",
            "hideSSID":"0",
            "WifiChannel":"6",
            "securemode":"1",
            "auth":"WPA2PSK",
            "encry":"AES",
            "psk":"secret",
            "firmware":"4.2.8020",
            "project":"UP2STREAM_MINI_V3",
            "netstat":"2"
        }"#;

        let status: DeviceStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.device_name.as_deref(), Some("Kitchen"));
        assert_eq!(required_int(&status.wifi_channel, "WifiChannel").unwrap(), 6);
        assert!(status.is_secure());
        assert!(status.master_ip.is_none());
        assert_eq!(status.extra.get("netstat"), Some(&Value::String("2".to_string())));
        assert_eq!(status.wifi_auth().auth.as_deref(), Some("WPA2PSK"));
    }

    #[test]
    fn test_serialize_keeps_device_keys() {
        let status: DeviceStatus =
            serde_json::from_str(r#"{"DeviceName":"Den","MAC":"00:22:6C:11:22:33","uptime":"120"}"#).unwrap();
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["DeviceName"], "Den");
        assert_eq!(value["MAC"], "00:22:6C:11:22:33");
        assert_eq!(value["uptime"], "120");
        assert!(value.get("ssid").is_none());
    }

    #[test]
    fn test_missing_and_malformed_fields() {
        let status = PlayerStatus::default();
        assert!(matches!(required_int(&status.vol, "vol"), Err(Error::Api(_))));

        let status: PlayerStatus = serde_json::from_str(r#"{"vol":"loud"}"#).unwrap();
        let err = required_int(&status.vol, "vol").unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_open_network_is_not_secure() {
        let status: DeviceStatus = serde_json::from_str(r#"{"securemode":"0"}"#).unwrap();
        assert!(!status.is_secure());
        assert!(!DeviceStatus::default().is_secure());
    }
}
