//! Static table of operations the command line can reach, and the word
//! resolution that picks one.

use linkplayctl_core::{
    AuthType, EqualizerMode, Error, LoopMode, PlayerSource, Repeat, Result, Shuffle, Transport,
    VolumeChange,
};
use linkplayctl_device::LinkplayClient;
use serde::Serialize;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Info,
    Reboot,
    SafeReboot,
    QuietReboot,
    Shutdown,
    Command,
    DeviceInfo,
    Name,
    Group,
    Uuid,
    Hardware,
    Model,
    WifiSsid,
    WifiSsidHidden,
    WifiChannel,
    WifiPower,
    WifiMac,
    WifiAuth,
    WifiNetworks,
    WifiStatus,
    WifiOff,
    PlayerInfo,
    Transport,
    Play,
    Pause,
    Resume,
    Stop,
    Previous,
    Next,
    Seek,
    Back,
    Forward,
    Position,
    Length,
    Loop,
    Shuffle,
    Repeat,
    Title,
    Album,
    Artist,
    Volume,
    VolumeUp,
    VolumeDown,
    Mute,
    MuteOn,
    MuteOff,
    Source,
    Playlist,
    Bluetooth,
    Aux,
    Local,
    Preset,
    Equalizer,
    EqualizerModes,
    Prompt,
    PromptOn,
    PromptOff,
    PromptLanguage,
    FirmwareVersion,
    FirmwareUpdateSearch,
    FirmwareUpdateAvailable,
    FirmwareUpdateVersion,
    MultiroomInfo,
    MultiroomAdd,
    MultiroomMaster,
    MultiroomRemove,
    MultiroomHide,
    MultiroomShow,
    MultiroomOff,
}

/// Every name the command line accepts, aliases included
pub const OPERATIONS: &[(&str, Operation)] = &[
    ("info", Operation::Info),
    ("reboot", Operation::Reboot),
    ("safe_reboot", Operation::SafeReboot),
    ("reboot_safe", Operation::SafeReboot),
    ("quiet_reboot", Operation::QuietReboot),
    ("reboot_quiet", Operation::QuietReboot),
    ("silent_reboot", Operation::QuietReboot),
    ("reboot_silent", Operation::QuietReboot),
    ("shutdown", Operation::Shutdown),
    ("command", Operation::Command),
    ("device_info", Operation::DeviceInfo),
    ("name", Operation::Name),
    ("group", Operation::Group),
    ("uuid", Operation::Uuid),
    ("hardware", Operation::Hardware),
    ("model", Operation::Model),
    ("wifi_ssid", Operation::WifiSsid),
    ("wifi_ssid_hidden", Operation::WifiSsidHidden),
    ("wifi_channel", Operation::WifiChannel),
    ("wifi_power", Operation::WifiPower),
    ("wifi_mac", Operation::WifiMac),
    ("wifi_auth", Operation::WifiAuth),
    ("wifi_networks", Operation::WifiNetworks),
    ("wifi_status", Operation::WifiStatus),
    ("wifi_off", Operation::WifiOff),
    ("player_info", Operation::PlayerInfo),
    ("transport", Operation::Transport),
    ("play", Operation::Play),
    ("pause", Operation::Pause),
    ("resume", Operation::Resume),
    ("stop", Operation::Stop),
    ("previous", Operation::Previous),
    ("next", Operation::Next),
    ("seek", Operation::Seek),
    ("back", Operation::Back),
    ("forward", Operation::Forward),
    ("position", Operation::Position),
    ("length", Operation::Length),
    ("loop", Operation::Loop),
    ("shuffle", Operation::Shuffle),
    ("repeat", Operation::Repeat),
    ("title", Operation::Title),
    ("album", Operation::Album),
    ("artist", Operation::Artist),
    ("volume", Operation::Volume),
    ("volume_up", Operation::VolumeUp),
    ("volume_down", Operation::VolumeDown),
    ("mute", Operation::Mute),
    ("mute_on", Operation::MuteOn),
    ("mute_off", Operation::MuteOff),
    ("source", Operation::Source),
    ("playlist", Operation::Playlist),
    ("bluetooth", Operation::Bluetooth),
    ("aux", Operation::Aux),
    ("linein", Operation::Aux),
    ("local", Operation::Local),
    ("preset", Operation::Preset),
    ("equalizer", Operation::Equalizer),
    ("equalizer_modes", Operation::EqualizerModes),
    ("prompt", Operation::Prompt),
    ("prompt_on", Operation::PromptOn),
    ("prompt_off", Operation::PromptOff),
    ("prompt_language", Operation::PromptLanguage),
    ("firmware_version", Operation::FirmwareVersion),
    ("firmware_update_search", Operation::FirmwareUpdateSearch),
    ("firmware_update_available", Operation::FirmwareUpdateAvailable),
    ("firmware_update_version", Operation::FirmwareUpdateVersion),
    ("multiroom_info", Operation::MultiroomInfo),
    ("multiroom_add", Operation::MultiroomAdd),
    ("multiroom_master", Operation::MultiroomMaster),
    ("multiroom_remove", Operation::MultiroomRemove),
    ("multiroom_hide", Operation::MultiroomHide),
    ("multiroom_show", Operation::MultiroomShow),
    ("multiroom_off", Operation::MultiroomOff),
];

pub fn lookup(name: &str) -> Option<(&'static str, Operation)> {
    OPERATIONS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .copied()
}

/// An operation picked from the command words, with its positional arguments
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub name: &'static str,
    pub operation: Operation,
    pub args: Vec<String>,
}

/// Find the longest leading run of words that names an operation
///
/// Words are joined with `_` (hyphens count as underscores). Trailing words
/// are dropped one at a time until the phrase matches; the dropped words,
/// in their original order and spelling, become the arguments.
pub fn resolve(words: &[String]) -> Option<Resolved> {
    for split in (1..=words.len()).rev() {
        let phrase = words[..split]
            .iter()
            .map(|word| word.replace('-', "_"))
            .collect::<Vec<_>>()
            .join("_");
        tracing::debug!("Searching for '{}' operation...", phrase);

        if let Some((name, operation)) = lookup(&phrase) {
            return Some(Resolved {
                name,
                operation,
                args: words[split..].to_vec(),
            });
        }
    }
    None
}

/// Positional arguments of one invocation
struct Args<'a> {
    name: &'static str,
    values: &'a [String],
}

impl<'a> Args<'a> {
    fn at_most(&self, count: usize) -> Result<()> {
        if self.values.len() > count {
            return Err(Error::validation(format!(
                "{}() takes at most {} argument(s) but {} were given",
                self.name,
                count,
                self.values.len()
            )));
        }
        Ok(())
    }

    fn optional(&self, index: usize) -> Option<&'a str> {
        self.values.get(index).map(String::as_str)
    }

    fn required(&self, index: usize, what: &str) -> Result<&'a str> {
        self.optional(index).ok_or_else(|| {
            Error::validation(format!("{}() missing required argument '{}'", self.name, what))
        })
    }
}

fn parse<V: FromStr>(text: &str, what: &str) -> Result<V> {
    text.trim()
        .parse()
        .map_err(|_| Error::validation(format!("Invalid {} '{}'", what, text)))
}

/// on/off style words; anything else is rejected
fn parse_switch(text: &str) -> Result<bool> {
    match linkplayctl_core::normalize_key(text).as_str() {
        "on" | "1" | "true" | "yes" => Ok(true),
        "off" | "0" | "false" | "no" => Ok(false),
        _ => Err(Error::validation(format!("Expected on or off, not '{}'", text))),
    }
}

fn json<V: Serialize>(value: &V) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Error::api(format!("Failed to format response: {}", e)))
}

/// Run a resolved operation and render its result for printing
pub async fn run<T: Transport>(client: &mut LinkplayClient<T>, resolved: &Resolved) -> Result<String> {
    let args = Args {
        name: resolved.name,
        values: &resolved.args,
    };

    match resolved.operation {
        Operation::Info => {
            args.at_most(0)?;
            json(&client.info().await?)
        }
        Operation::Reboot => {
            args.at_most(0)?;
            client.reboot().await
        }
        Operation::SafeReboot => {
            args.at_most(1)?;
            // a negative count means no limit
            let retries = match args.optional(0) {
                None => client.settings().reboot_retries,
                Some(text) => {
                    let count: i64 = parse(text, "retry count")?;
                    if count < 0 {
                        None
                    } else {
                        Some(u32::try_from(count).map_err(|_| {
                            Error::validation(format!("Invalid retry count '{}'", text))
                        })?)
                    }
                }
            };
            client.safe_reboot(retries).await
        }
        Operation::QuietReboot => {
            args.at_most(0)?;
            client.quiet_reboot().await
        }
        Operation::Shutdown => {
            args.at_most(0)?;
            client.shutdown().await
        }
        Operation::Command => {
            args.at_most(1)?;
            client.command(args.required(0, "text")?).await
        }
        Operation::DeviceInfo => {
            args.at_most(0)?;
            json(&client.device_info().await?)
        }
        Operation::Name => {
            args.at_most(1)?;
            match args.optional(0) {
                None => client.name().await,
                Some(name) => client.set_name(name).await,
            }
        }
        Operation::Group => {
            args.at_most(0)?;
            client.group().await
        }
        Operation::Uuid => {
            args.at_most(0)?;
            client.uuid().await
        }
        Operation::Hardware => {
            args.at_most(0)?;
            client.hardware().await
        }
        Operation::Model => {
            args.at_most(0)?;
            client.model().await
        }
        Operation::WifiSsid => {
            args.at_most(0)?;
            client.wifi_ssid().await
        }
        Operation::WifiSsidHidden => {
            args.at_most(0)?;
            Ok(client.wifi_ssid_hidden().await?.to_string())
        }
        Operation::WifiChannel => {
            args.at_most(0)?;
            Ok(client.wifi_channel().await?.to_string())
        }
        Operation::WifiPower => {
            args.at_most(1)?;
            match args.optional(0) {
                None => client.wifi_power().await,
                Some(power) => client.set_wifi_power(parse_switch(power)?).await,
            }
        }
        Operation::WifiMac => {
            args.at_most(0)?;
            client.wifi_mac().await
        }
        Operation::WifiAuth => {
            args.at_most(2)?;
            match args.optional(0) {
                None => json(&client.wifi_auth().await?),
                Some(auth) => {
                    let auth: AuthType = auth.parse()?;
                    client.set_wifi_auth(auth, args.optional(1)).await
                }
            }
        }
        Operation::WifiNetworks => {
            args.at_most(0)?;
            json(&client.wifi_networks().await?)
        }
        Operation::WifiStatus => {
            args.at_most(0)?;
            Ok(client.wifi_status().await?.to_string())
        }
        Operation::WifiOff => {
            args.at_most(0)?;
            client.wifi_off().await
        }
        Operation::PlayerInfo => {
            args.at_most(0)?;
            json(&client.player_info().await?)
        }
        Operation::Transport => {
            args.at_most(0)?;
            client.transport_state().await
        }
        Operation::Play => {
            args.at_most(1)?;
            client.play(args.optional(0)).await
        }
        Operation::Pause => {
            args.at_most(0)?;
            client.pause().await
        }
        Operation::Resume => {
            args.at_most(0)?;
            client.resume().await
        }
        Operation::Stop => {
            args.at_most(0)?;
            client.stop().await
        }
        Operation::Previous => {
            args.at_most(0)?;
            client.previous().await
        }
        Operation::Next => {
            args.at_most(0)?;
            client.next().await
        }
        Operation::Seek => {
            args.at_most(1)?;
            let seconds: f64 = parse(args.required(0, "seconds")?, "time offset")?;
            client.seek(seconds).await
        }
        Operation::Back => {
            args.at_most(1)?;
            let seconds = args.optional(0).map(|s| parse(s, "time offset")).transpose()?;
            client.back(seconds).await
        }
        Operation::Forward => {
            args.at_most(1)?;
            let seconds = args.optional(0).map(|s| parse(s, "time offset")).transpose()?;
            client.forward(seconds).await
        }
        Operation::Position => {
            args.at_most(1)?;
            match args.optional(0) {
                None => Ok(client.position().await?.to_string()),
                Some(ms) => client.set_position(parse(ms, "position")?).await,
            }
        }
        Operation::Length => {
            args.at_most(0)?;
            Ok(client.length().await?.to_string())
        }
        Operation::Loop => {
            args.at_most(1)?;
            match args.optional(0) {
                None => Ok(client.loop_mode().await?.to_string()),
                Some(mode) => client.set_loop_mode(mode.parse::<LoopMode>()?).await,
            }
        }
        Operation::Shuffle => {
            args.at_most(1)?;
            match args.optional(0) {
                None => Ok(client.shuffle().await?.to_string()),
                Some(value) => client.set_shuffle(value.parse::<Shuffle>()?).await,
            }
        }
        Operation::Repeat => {
            args.at_most(1)?;
            match args.optional(0) {
                None => Ok(client.repeat().await?.to_string()),
                Some(value) => client.set_repeat(value.parse::<Repeat>()?).await,
            }
        }
        Operation::Title => {
            args.at_most(0)?;
            client.title().await
        }
        Operation::Album => {
            args.at_most(0)?;
            client.album().await
        }
        Operation::Artist => {
            args.at_most(0)?;
            client.artist().await
        }
        Operation::Volume => {
            args.at_most(1)?;
            match args.optional(0) {
                None => Ok(client.volume().await?.to_string()),
                Some(value) => client.set_volume(value.parse::<VolumeChange>()?).await,
            }
        }
        Operation::VolumeUp => {
            args.at_most(1)?;
            let step = args.optional(0).map(|s| parse(s, "volume step")).transpose()?;
            client.volume_up(step).await
        }
        Operation::VolumeDown => {
            args.at_most(1)?;
            let step = args.optional(0).map(|s| parse(s, "volume step")).transpose()?;
            client.volume_down(step).await
        }
        Operation::Mute => {
            args.at_most(1)?;
            match args.optional(0) {
                None => Ok(client.mute().await?.to_string()),
                Some(value) => client.set_mute(parse_switch(value)?).await,
            }
        }
        Operation::MuteOn => {
            args.at_most(0)?;
            client.mute_on().await
        }
        Operation::MuteOff => {
            args.at_most(0)?;
            client.mute_off().await
        }
        Operation::Source => {
            args.at_most(1)?;
            match args.optional(0) {
                None => Ok(client.source().await?.to_string()),
                Some(source) => client.set_source(source.parse::<PlayerSource>()?).await,
            }
        }
        Operation::Playlist => {
            args.at_most(1)?;
            client.playlist(args.required(0, "uri")?).await
        }
        Operation::Bluetooth => {
            args.at_most(0)?;
            client.bluetooth().await
        }
        Operation::Aux => {
            args.at_most(0)?;
            client.aux().await
        }
        Operation::Local => {
            args.at_most(1)?;
            let index = args.optional(0).map(|s| parse(s, "track index")).transpose()?;
            client.local(index).await
        }
        Operation::Preset => {
            args.at_most(2)?;
            let number: i64 = args.required(0, "number")?.trim().parse().map_err(|_| {
                Error::validation("Preset number must be an integer between 1 and 6, inclusive")
            })?;
            match args.optional(1) {
                None => client.preset(number).await,
                Some(uri) => client.set_preset_uri(number, uri).await,
            }
        }
        Operation::Equalizer => {
            args.at_most(1)?;
            match args.optional(0) {
                None => Ok(client.equalizer().await?.to_string()),
                Some(mode) => client.set_equalizer(mode.parse::<EqualizerMode>()?).await,
            }
        }
        Operation::EqualizerModes => {
            args.at_most(0)?;
            Ok(client
                .equalizer_modes()
                .iter()
                .map(|mode| format!("{}: {}", mode, mode.code()))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Operation::Prompt => {
            args.at_most(0)?;
            client.prompt().await
        }
        Operation::PromptOn => {
            args.at_most(0)?;
            client.prompt_on().await
        }
        Operation::PromptOff => {
            args.at_most(0)?;
            client.prompt_off().await
        }
        Operation::PromptLanguage => {
            args.at_most(1)?;
            match args.optional(0) {
                None => client.prompt_language().await,
                Some(language) => client.set_prompt_language(language).await,
            }
        }
        Operation::FirmwareVersion => {
            args.at_most(0)?;
            client.firmware_version().await
        }
        Operation::FirmwareUpdateSearch => {
            args.at_most(0)?;
            client.firmware_update_search().await
        }
        Operation::FirmwareUpdateAvailable => {
            args.at_most(0)?;
            json(&client.firmware_update_available().await?)
        }
        Operation::FirmwareUpdateVersion => {
            args.at_most(0)?;
            client.firmware_update_version().await
        }
        Operation::MultiroomInfo => {
            args.at_most(0)?;
            json(&client.multiroom_info().await?)
        }
        Operation::MultiroomAdd => {
            args.at_most(1)?;
            client.multiroom_add(args.required(0, "slave_ip")?).await
        }
        Operation::MultiroomMaster => {
            args.at_most(5)?;
            let ssid = args.required(0, "ssid")?;
            let channel: i64 = parse(args.required(1, "channel")?, "channel")?;
            let auth = args.required(2, "auth")?;
            let encryption = args.optional(3).unwrap_or_default();
            let psk = args.optional(4).unwrap_or_default();
            client
                .multiroom_master(ssid, channel, auth, encryption, psk)
                .await
        }
        Operation::MultiroomRemove => {
            args.at_most(1)?;
            client.multiroom_remove(args.required(0, "slave_ip")?).await
        }
        Operation::MultiroomHide => {
            args.at_most(1)?;
            client.multiroom_hide(args.required(0, "slave_ip")?).await
        }
        Operation::MultiroomShow => {
            args.at_most(1)?;
            client.multiroom_show(args.required(0, "slave_ip")?).await
        }
        Operation::MultiroomOff => {
            args.at_most(0)?;
            client.multiroom_off().await
        }
    }
}
