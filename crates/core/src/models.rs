use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Normalization for mode names typed by a user (lowercase, trim whitespace)
pub fn normalize_key(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Declares a mode enum together with its static name <-> device code table.
///
/// Names are matched after `normalize_key`; codes are matched exactly.
macro_rules! mode_table {
    (
        $(#[$meta:meta])*
        $name:ident: $label:literal {
            $($variant:ident => ($text:literal, $code:expr)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Value used for this mode on the wire
            pub fn code(&self) -> i32 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            /// Map a device-reported code back to a mode
            pub fn from_code(code: i32) -> Result<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|mode| mode.code() == code)
                    .ok_or_else(|| {
                        Error::api(format!("Received unknown {} value '{}' from device", $label, code))
                    })
            }

            pub fn names() -> Vec<&'static str> {
                Self::ALL.iter().map(|mode| mode.as_str()).collect()
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let key = normalize_key(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|mode| mode.as_str() == key)
                    .ok_or_else(|| {
                        Error::validation(format!(
                            "{} must be one of [{}], not '{}'",
                            $label,
                            Self::names().join(", "),
                            s
                        ))
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

mode_table! {
    /// Built-in equalizer presets
    EqualizerMode: "equalizer mode" {
        Off => ("off", 0),
        Classical => ("classical", 1),
        Pop => ("pop", 2),
        Jazz => ("jazz", 3),
        Vocal => ("vocal", 4),
    }
}

mode_table! {
    /// Where the player is currently taking audio from (`mode` in player status)
    PlayerSource: "player source" {
        NoSource => ("none", 0),
        Airplay => ("airplay", 1),
        Dlna => ("dlna", 2),
        Wiimu => ("wiimu", 10),
        WiimuLocal => ("wiimu-local", 11),
        WiimuStation => ("wiimu-station", 12),
        WiimuRadio => ("wiimu-radio", 13),
        WiimuSonglist => ("wiimu-songlist", 14),
        WiimuMax => ("wiimu-max", 19),
        Http => ("http", 20),
        HttpLocal => ("http-local", 21),
        HttpMax => ("http-max", 29),
        Alarm => ("alarm", 30),
        LineIn => ("line-in", 40),
        Bluetooth => ("bluetooth", 41),
        ExtLocal => ("ext-local", 42),
        Optical => ("optical", 43),
        LineInMax => ("line-in-max", 49),
        Mirror => ("mirror", 50),
        Talk => ("talk", 60),
        Slave => ("slave", 99),
    }
}

mode_table! {
    /// WiFi authentication used by `setNetwork`
    AuthType: "authentication type" {
        Off => ("off", 0),
        Psk => ("psk", 1),
    }
}

impl AuthType {
    pub fn requires_password(&self) -> bool {
        *self != AuthType::Off
    }
}

/// State of the WiFi connection as reported by `wlanGetConnectState`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WifiStatus {
    Connecting,
    ErrorPassword,
    Disconnected,
    Connected,
}

impl WifiStatus {
    pub const ALL: &'static [WifiStatus] = &[
        WifiStatus::Connecting,
        WifiStatus::ErrorPassword,
        WifiStatus::Disconnected,
        WifiStatus::Connected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WifiStatus::Connecting => "connecting",
            WifiStatus::ErrorPassword => "error-password",
            WifiStatus::Disconnected => "disconnected",
            WifiStatus::Connected => "connected",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WifiStatus::Connecting => "PROCESS",
            WifiStatus::ErrorPassword => "PAIRFAIL",
            WifiStatus::Disconnected => "FAIL",
            WifiStatus::Connected => "ok",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.code() == code)
            .ok_or_else(|| Error::api(format!("Received unrecognized wifi status: '{}'", code)))
    }
}

impl FromStr for WifiStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = normalize_key(s);
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == key)
            .ok_or_else(|| Error::validation(format!("unknown wifi status '{}'", s)))
    }
}

impl fmt::Display for WifiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repeat axis of the loop mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Repeat {
    Off,
    All,
    One,
}

impl Repeat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Repeat::Off => "off",
            Repeat::All => "all",
            Repeat::One => "one",
        }
    }
}

impl FromStr for Repeat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_key(s).as_str() {
            "one" => Ok(Repeat::One),
            "all" | "on" | "1" | "true" | "yes" => Ok(Repeat::All),
            "off" | "0" | "false" | "no" => Ok(Repeat::Off),
            _ => Err(Error::validation(format!(
                "Repeat must be one of [off, all, one], not '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shuffle axis of the loop mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shuffle {
    Off,
    On,
}

impl Shuffle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shuffle::Off => "off",
            Shuffle::On => "on",
        }
    }
}

impl From<bool> for Shuffle {
    fn from(on: bool) -> Self {
        if on {
            Shuffle::On
        } else {
            Shuffle::Off
        }
    }
}

impl FromStr for Shuffle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_key(s).as_str() {
            "on" | "1" | "true" | "yes" => Ok(Shuffle::On),
            "off" | "0" | "false" | "no" => Ok(Shuffle::Off),
            _ => Err(Error::validation(format!(
                "Shuffle must be one of [on, off], not '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Shuffle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combined repeat x shuffle state, carried on the wire as one integer
///
/// `Repeat::One` always plays with shuffle off, so only five values exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoopMode {
    repeat: Repeat,
    shuffle: Shuffle,
}

const LOOP_CODES: [(Repeat, Shuffle, i32); 5] = [
    (Repeat::Off, Shuffle::Off, -1),
    (Repeat::All, Shuffle::Off, 0),
    (Repeat::One, Shuffle::Off, 1),
    (Repeat::All, Shuffle::On, 2),
    (Repeat::Off, Shuffle::On, 3),
];

impl LoopMode {
    pub const ALL: [LoopMode; 5] = [
        LoopMode { repeat: Repeat::Off, shuffle: Shuffle::Off },
        LoopMode { repeat: Repeat::All, shuffle: Shuffle::Off },
        LoopMode { repeat: Repeat::One, shuffle: Shuffle::Off },
        LoopMode { repeat: Repeat::Off, shuffle: Shuffle::On },
        LoopMode { repeat: Repeat::All, shuffle: Shuffle::On },
    ];

    pub fn new(repeat: Repeat, shuffle: Shuffle) -> Self {
        let shuffle = if repeat == Repeat::One { Shuffle::Off } else { shuffle };
        Self { repeat, shuffle }
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    pub fn shuffle(&self) -> Shuffle {
        self.shuffle
    }

    /// Same repeat setting, new shuffle setting
    pub fn with_shuffle(self, shuffle: Shuffle) -> Self {
        Self::new(self.repeat, shuffle)
    }

    /// Same shuffle setting, new repeat setting
    pub fn with_repeat(self, repeat: Repeat) -> Self {
        Self::new(repeat, self.shuffle)
    }

    pub fn code(&self) -> i32 {
        LOOP_CODES
            .iter()
            .find(|(r, s, _)| *r == self.repeat && *s == self.shuffle)
            .map(|(_, _, code)| *code)
            .unwrap_or(-1)
    }

    pub fn from_code(code: i32) -> Result<Self> {
        LOOP_CODES
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|(repeat, shuffle, _)| Self { repeat: *repeat, shuffle: *shuffle })
            .ok_or_else(|| {
                Error::api(format!("Received unknown loop mode value '{}' from device", code))
            })
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "repeat:{}:shuffle:{}", self.repeat, self.shuffle)
    }
}

impl FromStr for LoopMode {
    type Err = Error;

    /// Accepts `repeat:<r>:shuffle:<s>` or a raw device code such as `2`
    fn from_str(s: &str) -> Result<Self> {
        let key = normalize_key(s);
        if let Some(mode) = Self::ALL.iter().find(|mode| mode.to_string() == key) {
            return Ok(*mode);
        }
        if let Ok(code) = key.parse::<i32>() {
            return Self::from_code(code)
                .map_err(|_| Error::validation(format!("Cannot set unknown loop mode '{}'", s)));
        }
        Err(Error::validation(format!("Cannot set unknown loop mode '{}'", s)))
    }
}

/// Requested volume: an absolute level or a signed step relative to the current one
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeChange {
    Absolute(i64),
    Relative(i64),
}

impl VolumeChange {
    /// Whether the current volume must be read before this change can be applied
    pub fn is_relative(&self) -> bool {
        matches!(self, VolumeChange::Relative(_))
    }

    /// Resulting level, clamped to 0..=100
    pub fn apply(&self, current: i64) -> u8 {
        let target = match *self {
            VolumeChange::Absolute(level) => level,
            VolumeChange::Relative(delta) => current.saturating_add(delta),
        };
        target.clamp(0, 100) as u8
    }
}

impl FromStr for VolumeChange {
    type Err = Error;

    /// `"42"` sets 42, `"+5"` and `"-10"` step from the current volume.
    /// Fractional values are rounded down.
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let invalid = || {
            Error::validation(format!(
                "Volume must be between 0 and 100 or -100 to +100, inclusive, not '{}'",
                s
            ))
        };
        let value = text.parse::<f64>().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        let value = value.floor() as i64;
        if text.starts_with('+') || text.starts_with('-') {
            Ok(VolumeChange::Relative(value))
        } else {
            Ok(VolumeChange::Absolute(value))
        }
    }
}

impl From<u8> for VolumeChange {
    fn from(level: u8) -> Self {
        VolumeChange::Absolute(i64::from(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  Jazz  "), "jazz");
        assert_eq!(normalize_key("Line-In"), "line-in");
    }

    #[test]
    fn test_int_tables_are_bijections() {
        for mode in EqualizerMode::ALL {
            assert_eq!(EqualizerMode::from_code(mode.code()).unwrap(), *mode);
            assert_eq!(mode.as_str().parse::<EqualizerMode>().unwrap(), *mode);
        }
        for source in PlayerSource::ALL {
            assert_eq!(PlayerSource::from_code(source.code()).unwrap(), *source);
            assert_eq!(source.as_str().parse::<PlayerSource>().unwrap(), *source);
        }
        for auth in AuthType::ALL {
            assert_eq!(AuthType::from_code(auth.code()).unwrap(), *auth);
            assert_eq!(auth.as_str().parse::<AuthType>().unwrap(), *auth);
        }

        let codes: HashSet<i32> = PlayerSource::ALL.iter().map(|s| s.code()).collect();
        assert_eq!(codes.len(), PlayerSource::ALL.len());
    }

    #[test]
    fn test_unknown_codes_are_api_errors() {
        assert!(matches!(EqualizerMode::from_code(5), Err(Error::Api(_))));
        assert!(matches!(PlayerSource::from_code(3), Err(Error::Api(_))));
        assert!(matches!(AuthType::from_code(2), Err(Error::Api(_))));
        assert!(matches!(LoopMode::from_code(4), Err(Error::Api(_))));
        assert!(matches!(WifiStatus::from_code("OK"), Err(Error::Api(_))));
    }

    #[test]
    fn test_unknown_names_are_validation_errors() {
        let err = "rock".parse::<EqualizerMode>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("off, classical, pop, jazz, vocal"));
        assert!(matches!("wpa".parse::<AuthType>(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_wifi_status_table() {
        for status in WifiStatus::ALL {
            assert_eq!(WifiStatus::from_code(status.code()).unwrap(), *status);
            assert_eq!(status.as_str().parse::<WifiStatus>().unwrap(), *status);
        }
        assert_eq!(WifiStatus::from_code("PAIRFAIL").unwrap(), WifiStatus::ErrorPassword);
    }

    #[test]
    fn test_loop_mode_codes() {
        for mode in LoopMode::ALL {
            assert_eq!(LoopMode::from_code(mode.code()).unwrap(), mode);
            assert_eq!(mode.to_string().parse::<LoopMode>().unwrap(), mode);
        }
        assert_eq!(LoopMode::new(Repeat::Off, Shuffle::Off).code(), -1);
        assert_eq!(LoopMode::new(Repeat::All, Shuffle::On).code(), 2);
        assert_eq!(LoopMode::new(Repeat::Off, Shuffle::On).code(), 3);
        assert_eq!("2".parse::<LoopMode>().unwrap().to_string(), "repeat:all:shuffle:on");
    }

    #[test]
    fn test_repeat_one_forces_shuffle_off() {
        let mode = LoopMode::new(Repeat::All, Shuffle::On).with_repeat(Repeat::One);
        assert_eq!(mode.shuffle(), Shuffle::Off);
        assert_eq!(mode.code(), 1);

        let mode = LoopMode::new(Repeat::One, Shuffle::On);
        assert_eq!(mode.to_string(), "repeat:one:shuffle:off");
    }

    #[test]
    fn test_with_shuffle_preserves_repeat() {
        let mode = LoopMode::new(Repeat::All, Shuffle::Off).with_shuffle(Shuffle::On);
        assert_eq!(mode.to_string(), "repeat:all:shuffle:on");
        assert_eq!(mode.code(), 2);
    }

    #[test]
    fn test_parse_switch_words() {
        assert_eq!("ON".parse::<Shuffle>().unwrap(), Shuffle::On);
        assert_eq!("0".parse::<Shuffle>().unwrap(), Shuffle::Off);
        assert_eq!("one".parse::<Repeat>().unwrap(), Repeat::One);
        assert_eq!("1".parse::<Repeat>().unwrap(), Repeat::All);
        assert!("sometimes".parse::<Shuffle>().is_err());
    }

    #[test]
    fn test_parse_volume_change() {
        assert_eq!("42".parse::<VolumeChange>().unwrap(), VolumeChange::Absolute(42));
        assert_eq!("+5".parse::<VolumeChange>().unwrap(), VolumeChange::Relative(5));
        assert_eq!("-10".parse::<VolumeChange>().unwrap(), VolumeChange::Relative(-10));
        assert_eq!("12.7".parse::<VolumeChange>().unwrap(), VolumeChange::Absolute(12));
        assert!(matches!("loud".parse::<VolumeChange>(), Err(Error::Validation(_))));
        assert!(matches!("+".parse::<VolumeChange>(), Err(Error::Validation(_))));
        assert!("NaN".parse::<VolumeChange>().is_err());
    }

    #[test]
    fn test_volume_clamps_to_range() {
        for current in 0..=100 {
            for delta in -100..=100 {
                let expected = (current + delta).clamp(0, 100) as u8;
                assert_eq!(VolumeChange::Relative(delta).apply(current), expected);
            }
        }
        assert_eq!(VolumeChange::Relative(5).apply(97), 100);
        assert_eq!(VolumeChange::Absolute(150).apply(20), 100);
        assert_eq!(VolumeChange::Absolute(-3).apply(20), 0);
    }
}
