use crate::http::HttpTransport;
use crate::models::*;
use linkplayctl_core::{
    decode_hex_text, encode_hex_text, AuthType, Command, EqualizerMode, Error, LoopMode,
    PlayerSource, Repeat, Response, Result, Shuffle, Transport, VolumeChange, WifiStatus,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// Tunables for operations that span several commands
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientSettings {
    /// How long to wait after a reboot before checking the device is back
    pub reboot_delay_ms: u64,
    /// Volume used while rebooting quietly
    pub quiet_reboot_volume: u8,
    /// Extra reboots a verified reboot may attempt; `None` retries forever
    pub reboot_retries: Option<u32>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            reboot_delay_ms: 60_000,
            quiet_reboot_volume: 1,
            reboot_retries: Some(3),
        }
    }
}

impl ClientSettings {
    pub fn reboot_delay(&self) -> Duration {
        Duration::from_millis(self.reboot_delay_ms)
    }
}

/// Steps of a verified reboot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RebootState {
    Attempting,
    WaitingForDevice,
    Verifying,
    Succeeded,
    Failed,
}

/// LinkPlay device client
///
/// Each operation compiles to one or a few wire commands and decodes the
/// device's answer. Commands go out one at a time through the transport.
pub struct LinkplayClient<T = HttpTransport> {
    transport: T,
    settings: ClientSettings,
}

impl LinkplayClient<HttpTransport> {
    /// Create a client talking HTTP to the device at `address`
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(address)?))
    }
}

impl<T: Transport> LinkplayClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self::with_settings(transport, ClientSettings::default())
    }

    pub fn with_settings(transport: T, settings: ClientSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn address(&self) -> &str {
        self.transport.address()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    // ---- Internal command helpers ----

    async fn send(&mut self, command: Command) -> Result<Response> {
        self.transport.send(&command).await
    }

    /// Send a command that must answer 200, returning the body
    async fn send_ok(&mut self, command: Command, action: &str) -> Result<String> {
        let response = self.send(command).await?;
        if !response.is_success() {
            return Err(Error::api(format!(
                "Failed to {}: Status code={}",
                action, response.status
            )));
        }
        Ok(response.body)
    }

    /// Send a command that must answer 200 with a JSON body
    async fn query<D: DeserializeOwned>(&mut self, command: Command, action: &str) -> Result<D> {
        let body = self.send_ok(command, action).await?;
        json_decode(&body)
    }

    async fn device_status(&mut self) -> Result<DeviceStatus> {
        self.query(Command::new("getStatus"), "retrieve device status").await
    }

    async fn player_status(&mut self) -> Result<PlayerStatus> {
        self.query(Command::new("getPlayerStatus"), "retrieve player status")
            .await
    }

    async fn player_cmd(&mut self, action: &str, arg: Option<String>) -> Result<String> {
        let mut command = Command::new("setPlayerCmd").arg(action);
        if let Some(arg) = arg {
            command = command.arg(arg);
        }
        self.send_ok(command, action).await
    }

    // ---- Basic information & commands ----

    /// Combined device and player information
    pub async fn info(&mut self) -> Result<Map<String, Value>> {
        tracing::info!("Retrieving combined device and player info...");
        let mut info: Map<String, Value> = self
            .query(Command::new("getStatus"), "retrieve device status")
            .await?;
        let player: Map<String, Value> = self
            .query(Command::new("getPlayerStatus"), "retrieve player status")
            .await?;
        info.extend(player);
        Ok(info)
    }

    /// Request an immediate reboot without waiting for the device to return
    pub async fn reboot(&mut self) -> Result<String> {
        tracing::info!("Requesting reboot...");
        self.reboot_once().await
    }

    async fn reboot_once(&mut self) -> Result<String> {
        let response = self.send(Command::new("reboot")).await?;
        if !response.is_success() || response.body != "OK" {
            return Err(Error::api(format!(
                "Failed to reboot: Status {} Content: {}",
                response.status, response.body
            )));
        }
        Ok(response.body)
    }

    /// Reboot and wait until the device answers again, rebooting again up to
    /// `retries` more times (`None` for no limit)
    pub async fn safe_reboot(&mut self, retries: Option<u32>) -> Result<String> {
        tracing::info!("Requesting safe reboot...");
        let delay = self.settings.reboot_delay();
        if delay > Duration::from_secs(5) {
            tracing::info!(
                "Note: This call may take {} seconds or more to return",
                delay.as_secs()
            );
        }
        self.verified_reboot(retries).await
    }

    async fn verified_reboot(&mut self, retries: Option<u32>) -> Result<String> {
        let started = Instant::now();
        let limit = retries.map_or_else(|| "<unlimited>".to_string(), |n| (n + 1).to_string());
        let mut attempt: u32 = 1;
        let mut state = RebootState::Attempting;

        loop {
            state = match state {
                RebootState::Attempting => {
                    tracing::debug!("Starting reboot attempt {} of {}...", attempt, limit);
                    self.reboot_once().await?;
                    RebootState::WaitingForDevice
                }
                RebootState::WaitingForDevice => {
                    let delay = self.settings.reboot_delay();
                    tracing::debug!("Waiting {} seconds while device reboots...", delay.as_secs());
                    tokio::time::sleep(delay).await;
                    RebootState::Verifying
                }
                RebootState::Verifying => {
                    tracing::debug!("Verifying device is back up and responsive after reboot...");
                    if self.check().await {
                        RebootState::Succeeded
                    } else if retries.map_or(true, |n| attempt <= n) {
                        tracing::debug!("Device is not responding after reboot. Trying again...");
                        attempt += 1;
                        RebootState::Attempting
                    } else {
                        RebootState::Failed
                    }
                }
                RebootState::Succeeded => {
                    let elapsed = started.elapsed().as_secs_f64();
                    if attempt > 1 {
                        tracing::info!(
                            "Safe reboot required {} attempts and {:.1} seconds.",
                            attempt,
                            elapsed
                        );
                    } else {
                        tracing::debug!("Safe reboot complete on first attempt in {:.1} seconds.", elapsed);
                    }
                    return Ok("OK".to_string());
                }
                RebootState::Failed => {
                    return Err(Error::api(format!(
                        "Failed to bring device back up after {} reboot attempts. Giving up.",
                        attempt
                    )));
                }
            };
        }
    }

    /// True if the device answers a player status query that includes a volume
    async fn check(&mut self) -> bool {
        match self.player_status().await {
            Ok(status) if status.vol.is_some() => true,
            Ok(_) => {
                tracing::debug!("Device is not okay: player status has no volume key");
                false
            }
            Err(e) => {
                tracing::debug!("Device is not okay: {}", e);
                false
            }
        }
    }

    /// Reboot at minimum volume so the boot chime is not heard, then restore
    /// the previous volume
    pub async fn quiet_reboot(&mut self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Requesting quiet reboot...");
        let delay = self.settings.reboot_delay();
        if delay > Duration::from_secs(5) {
            tracing::info!(
                "Note: This call may take {} seconds or more to return",
                delay.as_secs()
            );
        }

        let quiet = self.settings.quiet_reboot_volume;
        let old_volume = self.volume().await?;
        tracing::debug!(
            "Saving current volume '{}' and setting new volume to '{}'...",
            old_volume,
            quiet
        );
        self.apply_volume(VolumeChange::from(quiet)).await?;
        if self.volume().await? != quiet {
            return Err(Error::api("Failed to set volume to minimum before quiet reboot"));
        }

        self.verified_reboot(self.settings.reboot_retries).await?;

        tracing::debug!("Restoring previous volume '{}'...", old_volume);
        self.apply_volume(VolumeChange::from(old_volume)).await?;
        if self.volume().await? != old_volume {
            return Err(Error::api(format!(
                "Failed to restore old volume '{}' after reboot",
                old_volume
            )));
        }

        tracing::debug!(
            "Quiet reboot complete. Elapsed time: {:.1}ms",
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok("OK".to_string())
    }

    pub async fn shutdown(&mut self) -> Result<String> {
        tracing::info!("Requesting shutdown...");
        self.send_ok(Command::new("getShutdown"), "shutdown").await
    }

    /// Send `text` verbatim and return the body, whatever the status
    pub async fn command(&mut self, text: &str) -> Result<String> {
        tracing::info!("Executing command '{}'...", text);
        let response = self.send(Command::raw(text)).await?;
        if !response.is_success() {
            tracing::warn!("Device returned status {} for '{}'", response.status, text);
        }
        Ok(response.body)
    }

    // ---- Device information & settings ----

    /// Device and hardware info, such as name and firmware
    pub async fn device_info(&mut self) -> Result<DeviceStatus> {
        tracing::info!("Retrieving device info...");
        self.device_status().await
    }

    /// Name used for services such as AirPlay
    pub async fn name(&mut self) -> Result<String> {
        tracing::info!("Retrieving device name...");
        let status = self.device_status().await?;
        Ok(required(&status.device_name, "DeviceName")?.to_string())
    }

    pub async fn set_name(&mut self, name: &str) -> Result<String> {
        if name.trim().is_empty() {
            return Err(Error::validation("Device name must be a non-empty string"));
        }
        tracing::info!("Setting device name to '{}'...", name);
        self.send_ok(
            Command::new("setDeviceName").arg(name),
            &format!("set device name to '{}'", name),
        )
        .await
    }

    /// Name of the multiroom group the device belongs to
    pub async fn group(&mut self) -> Result<String> {
        tracing::info!("Retrieving device group name...");
        let status = self.device_status().await?;
        Ok(required(&status.group_name, "GroupName")?.to_string())
    }

    pub async fn uuid(&mut self) -> Result<String> {
        tracing::info!("Retrieving device UUID...");
        let status = self.device_status().await?;
        Ok(required(&status.uuid, "uuid")?.to_string())
    }

    pub async fn hardware(&mut self) -> Result<String> {
        tracing::info!("Retrieving device hardware version...");
        let status = self.device_status().await?;
        Ok(required(&status.hardware, "hardware")?.to_string())
    }

    /// Model name, reported by the device as `project`
    pub async fn model(&mut self) -> Result<String> {
        tracing::info!("Retrieving device model name (aka project)...");
        let status = self.device_status().await?;
        Ok(required(&status.project, "project")?.to_string())
    }

    // ---- WiFi status & connections ----

    pub async fn wifi_ssid(&mut self) -> Result<String> {
        tracing::info!("Retrieving WiFi SSID...");
        let status = self.device_status().await?;
        Ok(required(&status.ssid, "ssid")?.to_string())
    }

    pub async fn wifi_ssid_hidden(&mut self) -> Result<bool> {
        tracing::info!("Retrieving WiFi hidden SSID flag...");
        let status = self.device_status().await?;
        Ok(required_int(&status.hide_ssid, "hideSSID")? == 1)
    }

    pub async fn wifi_channel(&mut self) -> Result<i64> {
        tracing::info!("Retrieving WiFi channel...");
        let status = self.device_status().await?;
        required_int(&status.wifi_channel, "WifiChannel")
    }

    pub async fn wifi_mac(&mut self) -> Result<String> {
        tracing::info!("Retrieving WiFi MAC address...");
        let status = self.device_status().await?;
        Ok(required(&status.mac, "MAC")?.to_string())
    }

    pub async fn wifi_power(&mut self) -> Result<String> {
        tracing::info!("Retrieving current WiFi radio power... [NOT IMPLEMENTED]");
        Err(Error::Unsupported("wifi_power"))
    }

    /// Only powering the radio down is known
    pub async fn set_wifi_power(&mut self, on: bool) -> Result<String> {
        if on {
            return Err(Error::Unsupported("wifi_power(<value>)"));
        }
        self.wifi_off().await
    }

    pub async fn wifi_auth(&mut self) -> Result<WifiAuth> {
        tracing::info!("Retrieving WiFi authentication information...");
        Ok(self.device_status().await?.wifi_auth())
    }

    /// Change network authentication; the device reboots afterwards
    pub async fn set_wifi_auth(&mut self, auth: AuthType, password: Option<&str>) -> Result<String> {
        let password = password.filter(|p| !p.is_empty());
        if auth.requires_password() && password.is_none() {
            return Err(Error::validation(format!(
                "Authentication type '{}' requires a non-empty password",
                auth
            )));
        }
        tracing::info!("Setting WiFi authentication type to '{}'...", auth);

        let mut command = Command::new("setNetwork").arg(auth.code());
        if let Some(password) = password {
            command = command.arg(password);
        }
        let body = self.send_ok(command, "set WiFi authentication").await?;
        tracing::debug!("Authentication set. Device is rebooting...");
        Ok(body)
    }

    /// Access points visible to the device
    pub async fn wifi_networks(&mut self) -> Result<Value> {
        tracing::info!("Retrieving WiFi available networks list...");
        self.query(Command::new("wlanGetApList"), "list WiFi networks").await
    }

    pub async fn wifi_status(&mut self) -> Result<WifiStatus> {
        tracing::info!("Retrieving WiFi connection status...");
        let body = self
            .send_ok(Command::new("wlanGetConnectState"), "retrieve WiFi status")
            .await?;
        WifiStatus::from_code(body.trim())
    }

    pub async fn wifi_off(&mut self) -> Result<String> {
        tracing::info!("Turning off WiFi radio...");
        self.send_ok(Command::new("setWifiPowerDown"), "turn off WiFi").await
    }

    // ---- Player status & commands ----

    /// Player subsystem information, such as current title and volume
    pub async fn player_info(&mut self) -> Result<PlayerStatus> {
        tracing::info!("Retrieving player information...");
        self.player_status().await
    }

    /// Transport state, e.g. play, pause, stop
    pub async fn transport_state(&mut self) -> Result<String> {
        tracing::info!("Retrieving current transport status, e.g., play, pause, stop.");
        tracing::info!("Note: Devices report incorrect transport status for some streams, such as airplay/dlna");
        let status = self.player_status().await?;
        Ok(required(&status.status, "status")?.to_string())
    }

    /// Start playback of `uri`, or of the current media
    pub async fn play(&mut self, uri: Option<&str>) -> Result<String> {
        match uri {
            Some(uri) => tracing::info!("Starting playback of '{}'...", uri),
            None => tracing::info!("Starting playback of current media..."),
        }
        self.player_cmd("play", uri.map(str::to_string)).await
    }

    pub async fn pause(&mut self) -> Result<String> {
        tracing::info!("Pausing playback...");
        self.player_cmd("pause", None).await
    }

    pub async fn resume(&mut self) -> Result<String> {
        tracing::info!("Resuming playback...");
        self.player_cmd("resume", None).await
    }

    pub async fn stop(&mut self) -> Result<String> {
        tracing::info!("Stop playback...");
        self.player_cmd("stop", None).await
    }

    pub async fn previous(&mut self) -> Result<String> {
        tracing::info!("Skipping backward to previous media track...");
        self.player_cmd("prev", None).await
    }

    pub async fn next(&mut self) -> Result<String> {
        tracing::info!("Skipping forward to next media track...");
        self.player_cmd("next", None).await
    }

    // ---- Position & seek ----

    /// Current position in the media, in milliseconds
    pub async fn position(&mut self) -> Result<i64> {
        tracing::info!("Retrieving player's current position in media...");
        self.current_position().await
    }

    async fn current_position(&mut self) -> Result<i64> {
        let status = self.player_status().await?;
        required_int(&status.curpos, "curpos")
    }

    /// Move to `position_ms`, clamped to the media length
    pub async fn set_position(&mut self, position_ms: i64) -> Result<String> {
        tracing::info!("Setting player's position in media to {}...", position_ms);
        self.seek_clamped(position_ms).await
    }

    async fn seek_clamped(&mut self, position_ms: i64) -> Result<String> {
        tracing::debug!("Checking total media length to ensure new position is not past the end of the media...");
        let total_ms = self.media_length().await?.max(0);
        let position_ms = position_ms.clamp(0, total_ms);
        tracing::debug!(
            "Setting player media position to {} (of {} ms)...",
            position_ms,
            total_ms
        );
        self.player_cmd("seek", Some((position_ms / 1000).to_string()))
            .await
    }

    /// Move to the given second mark
    pub async fn seek(&mut self, seconds: f64) -> Result<String> {
        tracing::info!("Seeking to '{}' second mark in media...", seconds);
        let offset = seconds_to_ms(seconds)?;
        self.seek_clamped(offset).await
    }

    /// Rewind by `seconds` (10 when not given)
    pub async fn back(&mut self, seconds: Option<f64>) -> Result<String> {
        let seconds = seconds.unwrap_or(10.0);
        tracing::info!("Rewinding playback by '{}' seconds...", seconds);
        let offset = seconds_to_ms(seconds)?;
        let current = self.current_position().await?;
        self.seek_clamped(current.saturating_sub(offset)).await
    }

    /// Fast-forward by `seconds` (10 when not given)
    pub async fn forward(&mut self, seconds: Option<f64>) -> Result<String> {
        let seconds = seconds.unwrap_or(10.0);
        tracing::info!("Fast-forwarding playback by '{}' seconds...", seconds);
        let offset = seconds_to_ms(seconds)?;
        let current = self.current_position().await?;
        self.seek_clamped(current.saturating_add(offset)).await
    }

    /// Total length of the current media, in milliseconds
    pub async fn length(&mut self) -> Result<i64> {
        tracing::info!("Retrieving total length of current media in ms...");
        self.media_length().await
    }

    async fn media_length(&mut self) -> Result<i64> {
        let status = self.player_status().await?;
        required_int(&status.totlen, "totlen")
    }

    // ---- Shuffle and repeat ----

    pub async fn loop_mode(&mut self) -> Result<LoopMode> {
        tracing::info!("Retrieving current loop mode...");
        let status = self.player_status().await?;
        let value = required_int(&status.loop_mode, "loop")?;
        tracing::debug!("Current loop mode value is '{}'. Mapping to mode names...", value);
        let code = i32::try_from(value)
            .map_err(|_| Error::api(format!("Received unknown loop mode value '{}' from device", value)))?;
        LoopMode::from_code(code)
    }

    pub async fn set_loop_mode(&mut self, mode: LoopMode) -> Result<String> {
        tracing::info!("Setting loop mode to '{}' [value: '{}']...", mode, mode.code());
        self.player_cmd("loopmode", Some(mode.code().to_string())).await
    }

    pub async fn shuffle(&mut self) -> Result<Shuffle> {
        tracing::info!("Retrieving shuffle setting...");
        Ok(self.loop_mode().await?.shuffle())
    }

    /// Change shuffle, keeping the current repeat setting
    pub async fn set_shuffle(&mut self, shuffle: Shuffle) -> Result<String> {
        tracing::info!("Setting shuffle to '{}'", shuffle);
        let mode = self.loop_mode().await?.with_shuffle(shuffle);
        self.set_loop_mode(mode).await
    }

    pub async fn repeat(&mut self) -> Result<Repeat> {
        tracing::info!("Retrieving repeat setting...");
        Ok(self.loop_mode().await?.repeat())
    }

    /// Change repeat, keeping the current shuffle setting unless repeating one
    pub async fn set_repeat(&mut self, repeat: Repeat) -> Result<String> {
        tracing::info!("Setting repeat to '{}'", repeat);
        let mode = if repeat == Repeat::One {
            LoopMode::new(Repeat::One, Shuffle::Off)
        } else {
            self.loop_mode().await?.with_repeat(repeat)
        };
        self.set_loop_mode(mode).await
    }

    // ---- Media info ----

    pub async fn title(&mut self) -> Result<String> {
        tracing::info!("Retrieving current media title...");
        let status = self.player_status().await?;
        Ok(decode_hex_text(required(&status.title, "Title")?))
    }

    pub async fn album(&mut self) -> Result<String> {
        tracing::info!("Retrieving current media album...");
        let status = self.player_status().await?;
        Ok(decode_hex_text(required(&status.album, "Album")?))
    }

    pub async fn artist(&mut self) -> Result<String> {
        tracing::info!("Retrieving current media artist...");
        let status = self.player_status().await?;
        Ok(decode_hex_text(required(&status.artist, "Artist")?))
    }

    // ---- Volume control ----

    pub async fn volume(&mut self) -> Result<u8> {
        tracing::info!("Retrieving device volume...");
        let status = self.player_status().await?;
        let volume = required_int(&status.vol, "vol")?;
        u8::try_from(volume)
            .ok()
            .filter(|v| *v <= 100)
            .ok_or_else(|| Error::api(format!("Received out of range volume '{}' from device", volume)))
    }

    /// Set an absolute volume or step the current one, clamped to 0..=100
    pub async fn set_volume(&mut self, change: VolumeChange) -> Result<String> {
        tracing::info!("Setting volume '{:?}'...", change);
        self.apply_volume(change).await
    }

    async fn apply_volume(&mut self, change: VolumeChange) -> Result<String> {
        let level = if change.is_relative() {
            tracing::debug!("Adjusting volume by {:?}. Getting old volume...", change);
            let current = self.volume().await?;
            change.apply(i64::from(current))
        } else {
            change.apply(0)
        };
        tracing::debug!("Setting volume to {}", level);
        self.send_ok(
            Command::new("setPlayerCmd").arg("vol").arg(level),
            &format!("set volume to '{}'", level),
        )
        .await
    }

    /// Raise volume by `step` (5 when not given)
    pub async fn volume_up(&mut self, step: Option<u8>) -> Result<String> {
        self.set_volume(VolumeChange::Relative(i64::from(step.unwrap_or(5)))).await
    }

    /// Lower volume by `step` (5 when not given)
    pub async fn volume_down(&mut self, step: Option<u8>) -> Result<String> {
        self.set_volume(VolumeChange::Relative(-i64::from(step.unwrap_or(5)))).await
    }

    pub async fn mute(&mut self) -> Result<bool> {
        tracing::info!("Retrieving state of muting function...");
        let status = self.player_status().await?;
        Ok(required_int(&status.mute, "mute")? == 1)
    }

    pub async fn set_mute(&mut self, muted: bool) -> Result<String> {
        if muted {
            self.mute_on().await
        } else {
            self.mute_off().await
        }
    }

    pub async fn mute_on(&mut self) -> Result<String> {
        tracing::info!("Turning muting on");
        self.player_cmd("mute", Some("1".to_string())).await
    }

    pub async fn mute_off(&mut self) -> Result<String> {
        tracing::info!("Turning muting off");
        self.player_cmd("mute", Some("0".to_string())).await
    }

    // ---- Source control ----

    /// Current player source, such as airplay, dlna or bluetooth
    pub async fn source(&mut self) -> Result<PlayerSource> {
        tracing::info!("Retrieving current player source (e.g., airplay, dlna, etc.)...");
        let status = self.player_status().await?;
        let value = required_int(&status.mode, "mode")?;
        let code = i32::try_from(value)
            .map_err(|_| Error::api(format!("Received unknown player source value '{}' from device", value)))?;
        PlayerSource::from_code(code)
    }

    pub async fn set_source(&mut self, source: PlayerSource) -> Result<String> {
        tracing::info!("Setting player source to '{}'... [NOT IMPLEMENTED]", source);
        Err(Error::Unsupported("source(<mode>)"))
    }

    /// Play the playlist at `uri`; some devices ignore this, `play(uri)` works more widely
    pub async fn playlist(&mut self, uri: &str) -> Result<String> {
        tracing::info!("Setting player playlist to '{}'...", uri);
        self.player_cmd("playlist", Some(uri.to_string())).await
    }

    pub async fn bluetooth(&mut self) -> Result<String> {
        tracing::info!("Setting player source to bluetooth...");
        self.player_cmd("switchmode", Some("bluetooth".to_string())).await
    }

    /// Switch to AUX / line-in
    pub async fn aux(&mut self) -> Result<String> {
        tracing::info!("Setting player source to AUX/line-in...");
        self.player_cmd("switchmode", Some("line-in".to_string())).await
    }

    /// Play from local storage (SD, USB) starting at track `index` (1 when not given)
    pub async fn local(&mut self, index: Option<u32>) -> Result<String> {
        let index = index.unwrap_or(1);
        tracing::info!(
            "Setting player source to local device (SD, USB, etc.), track number '{}'...",
            index
        );
        self.player_cmd("playLocalList", Some(index.to_string())).await
    }

    /// Load preset `number` (1 to 6)
    pub async fn preset(&mut self, number: i64) -> Result<String> {
        if !(1..=6).contains(&number) {
            return Err(Error::validation(
                "Preset number must be an integer between 1 and 6, inclusive",
            ));
        }
        tracing::info!("Setting device to Preset number '{}'...", number);
        self.send_ok(Command::new("MCUKeyShortClick").arg(number), "load preset")
            .await
    }

    pub async fn set_preset_uri(&mut self, _number: i64, _uri: &str) -> Result<String> {
        Err(Error::Unsupported("preset(<number>, <uri>)"))
    }

    // ---- Equalizer control ----

    pub async fn equalizer(&mut self) -> Result<EqualizerMode> {
        tracing::info!("Retrieving current equalizer setting...");
        let value: Value = self
            .query(Command::new("getEqualizer"), "retrieve equalizer")
            .await?;
        let code = value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .and_then(|code| i32::try_from(code).ok())
            .ok_or_else(|| Error::api(format!("Received unknown equalizer mode value '{}'", value)))?;
        let mode = EqualizerMode::from_code(code)?;
        tracing::info!("Received equalizer mode '{}' (value {})", mode, code);
        Ok(mode)
    }

    pub async fn set_equalizer(&mut self, mode: EqualizerMode) -> Result<String> {
        tracing::info!("Setting equalizer to '{}' (value {})...", mode, mode.code());
        self.send_ok(
            Command::new("setPlayerCmd").arg("equalizer").arg(mode.code()),
            &format!("set equalizer to mode '{}' (value '{}')", mode, mode.code()),
        )
        .await
    }

    /// Allowed equalizer modes with their device values
    pub fn equalizer_modes(&self) -> &'static [EqualizerMode] {
        EqualizerMode::ALL
    }

    // ---- Voice prompts & jingles ----

    pub async fn prompt(&mut self) -> Result<String> {
        tracing::info!("Retrieving voice prompts setting...");
        Err(Error::Unsupported("prompt"))
    }

    pub async fn prompt_on(&mut self) -> Result<String> {
        tracing::info!("Turning voice prompts on...");
        self.send_ok(Command::new("PromptEnable"), "enable prompts").await
    }

    pub async fn prompt_off(&mut self) -> Result<String> {
        tracing::info!("Turning voice prompts off...");
        self.send_ok(Command::new("PromptDisable"), "disable prompts").await
    }

    pub async fn prompt_language(&mut self) -> Result<String> {
        tracing::info!("Getting voice prompts language...");
        let status = self.device_status().await?;
        Ok(required(&status.language, "language")?.to_string())
    }

    pub async fn set_prompt_language(&mut self, language: &str) -> Result<String> {
        tracing::info!("Setting voice prompts language to '{}'... [NOT IMPLEMENTED]", language);
        Err(Error::Unsupported("prompt_language"))
    }

    // ---- Firmware updating ----

    pub async fn firmware_version(&mut self) -> Result<String> {
        tracing::info!("Retrieving current firmware version");
        let status = self.device_status().await?;
        Ok(required(&status.firmware, "firmware")?.to_string())
    }

    /// Start a non-blocking search for new firmware
    pub async fn firmware_update_search(&mut self) -> Result<String> {
        tracing::info!("Starting firmware update search...");
        self.send_ok(Command::new("getMvRemoteUpdateStartCheck"), "start firmware search")
            .await
    }

    /// Result of the last firmware search
    pub async fn firmware_update_available(&mut self) -> Result<Value> {
        tracing::info!("Retrieving firmware update availability...");
        self.query(Command::new("getMvRemoteUpdateStatus"), "retrieve firmware update status")
            .await
    }

    pub async fn firmware_update_version(&mut self) -> Result<String> {
        tracing::info!("Retrieving firmware update version...");
        let status = self.device_status().await?;
        Ok(required(&status.new_version, "NewVer")?.to_string())
    }

    // ---- Multiroom setup ----

    pub async fn multiroom_info(&mut self) -> Result<MultiroomInfo> {
        tracing::info!("Retrieving multiroom master and slaves of this device, if any...");
        tracing::debug!("Retrieving master information...");
        let status = self.device_status().await?;
        let master = status.master_ip.map(|ip| MasterRef { ip });

        tracing::debug!("Retrieving slave information...");
        let slaves: Map<String, Value> = self
            .query(Command::new("multiroom:getSlaveList"), "retrieve multiroom slaves")
            .await?;

        Ok(MultiroomInfo {
            status: if master.is_some() { "slave" } else { "master" }.to_string(),
            master,
            slaves,
        })
    }

    /// Make the device at `slave_ip` join this device's group
    ///
    /// This device's WiFi credentials are read and passed to the slave, which
    /// is contacted over its own, independent transport.
    pub async fn multiroom_add(&mut self, slave_ip: &str) -> Result<String> {
        tracing::info!("Slaving '{}' to this device...", slave_ip);
        let status = self.device_status().await?;
        let ssid = required(&status.ssid, "ssid")?.to_string();
        let channel = required_int(&status.wifi_channel, "WifiChannel")?;
        let (auth, encry, psk) = if status.is_secure() {
            (
                status.auth.clone().unwrap_or_default(),
                status.encry.clone().unwrap_or_default(),
                status.psk.clone().unwrap_or_default(),
            )
        } else {
            ("OPEN".to_string(), String::new(), String::new())
        };

        tracing::debug!("Opening client connection to slave device '{}'...", slave_ip);
        let transport = self.transport.open(slave_ip)?;
        let mut slave = LinkplayClient::with_settings(transport, self.settings.clone());
        slave
            .multiroom_master(&ssid, channel, &auth, &encry, &psk)
            .await
    }

    /// Join the group whose master runs the given network
    pub async fn multiroom_master(
        &mut self,
        ssid: &str,
        channel: i64,
        auth: &str,
        encryption: &str,
        psk: &str,
    ) -> Result<String> {
        tracing::info!("Requesting multiroom sync as slave to master at ssid '{}'...", ssid);
        let command = Command::new("ConnectMasterAp")
            .arg(format!("ssid={}", encode_hex_text(ssid)))
            .arg(format!("ch={}", channel))
            .arg(format!("auth={}", auth))
            .arg(format!("encry={}", encryption))
            .arg(format!("pwd={}", encode_hex_text(psk)))
            .arg("chext=0");
        self.send_ok(command, "join multiroom master").await
    }

    /// Remove the device at `slave_ip` from this group
    pub async fn multiroom_remove(&mut self, slave_ip: &str) -> Result<String> {
        tracing::info!("Removing slave '{}' from multiroom group", slave_ip);
        self.send_ok(Command::new("multiroom:SlaveKickout").arg(slave_ip), "remove multiroom slave")
            .await
    }

    /// Hide the slave at `slave_ip` from the local network
    pub async fn multiroom_hide(&mut self, slave_ip: &str) -> Result<String> {
        tracing::info!("Hiding multiroom slave '{}' from network list", slave_ip);
        self.send_ok(Command::new("multiroom:SlaveMask").arg(slave_ip), "hide multiroom slave")
            .await
    }

    pub async fn multiroom_show(&mut self, slave_ip: &str) -> Result<String> {
        tracing::info!("Unhiding multiroom slave '{}' from network list", slave_ip);
        self.send_ok(Command::new("multiroom:SlaveUnMask").arg(slave_ip), "show multiroom slave")
            .await
    }

    /// Leave the group; a master tears the whole group down
    pub async fn multiroom_off(&mut self) -> Result<String> {
        tracing::info!("Tearing down the current multiroom group...");
        self.send_ok(Command::new("multiroom:Ungroup"), "ungroup multiroom").await
    }
}

fn json_decode<D: DeserializeOwned>(body: &str) -> Result<D> {
    serde_json::from_str(body)
        .map_err(|_| Error::api(format!("Expected JSON from API, got: '{}'", body)))
}

fn seconds_to_ms(seconds: f64) -> Result<i64> {
    if !seconds.is_finite() {
        return Err(Error::validation(format!("Invalid time offset '{}'", seconds)));
    }
    Ok((seconds * 1000.0).floor() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkplayctl_core::test_utils::MockTransport;

    fn client(mock: &MockTransport) -> LinkplayClient<MockTransport> {
        LinkplayClient::with_transport(mock.clone())
    }

    #[test]
    fn test_json_decode_error_carries_body() {
        let err = json_decode::<Value>("<html>busy</html>").unwrap_err();
        assert!(err.is_api());
        assert!(err.to_string().contains("<html>busy</html>"));
    }

    #[test]
    fn test_seconds_to_ms_floors() {
        assert_eq!(seconds_to_ms(1.2345).unwrap(), 1234);
        assert_eq!(seconds_to_ms(-2.0).unwrap(), -2000);
        assert!(seconds_to_ms(f64::NAN).is_err());
    }

    #[test]
    fn test_default_settings() {
        let settings = ClientSettings::default();
        assert_eq!(settings.reboot_delay(), Duration::from_secs(60));
        assert_eq!(settings.quiet_reboot_volume, 1);
        assert_eq!(settings.reboot_retries, Some(3));

        let parsed: ClientSettings = serde_json::from_str(r#"{"reboot_delay_ms": 0}"#).unwrap();
        assert_eq!(parsed.reboot_delay(), Duration::ZERO);
        assert_eq!(parsed.quiet_reboot_volume, 1);
    }

    #[tokio::test]
    async fn test_simple_action_requires_200() {
        let mock = MockTransport::new("10.0.0.2");
        mock.reply_status("setPlayerCmd:pause", 500, "Failed");
        let err = client(&mock).pause().await.unwrap_err();
        assert!(matches!(err, Error::Api(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_play_with_uri() {
        let mock = MockTransport::new("10.0.0.2");
        let mut player = client(&mock);
        assert_eq!(player.play(None).await.unwrap(), "OK");
        player.play(Some("http://radio.example/stream.mp3")).await.unwrap();
        assert_eq!(
            mock.sent(),
            vec![
                "setPlayerCmd:play",
                "setPlayerCmd:play:http://radio.example/stream.mp3"
            ]
        );
    }

    #[tokio::test]
    async fn test_reboot_requires_ok_body() {
        let mock = MockTransport::new("10.0.0.2");
        mock.reply("reboot", "busy");
        let err = client(&mock).reboot().await.unwrap_err();
        assert!(err.to_string().contains("busy"));
    }

    #[tokio::test]
    async fn test_equalizer_get_and_set() {
        let mock = MockTransport::new("10.0.0.2");
        mock.reply("getEqualizer", "3");
        let mut player = client(&mock);
        assert_eq!(player.equalizer().await.unwrap(), EqualizerMode::Jazz);

        player.set_equalizer(EqualizerMode::Vocal).await.unwrap();
        assert_eq!(mock.sent().last().unwrap(), "setPlayerCmd:equalizer:4");
    }

    #[tokio::test]
    async fn test_unknown_equalizer_code_is_api_error() {
        let mock = MockTransport::new("10.0.0.2");
        mock.reply("getEqualizer", "9");
        assert!(matches!(client(&mock).equalizer().await, Err(Error::Api(_))));
    }

    #[tokio::test]
    async fn test_metadata_is_dehexed() {
        let mock = MockTransport::new("10.0.0.2");
        mock.reply(
            "getPlayerStatus",
            r#"{"vol":"20","Title":"54696D65","Artist":"Pink Floyd","Album":"416E696D616C73"}"#,
        );
        let mut player = client(&mock);
        assert_eq!(player.title().await.unwrap(), "Time");
        assert_eq!(player.artist().await.unwrap(), "Pink Floyd");
        assert_eq!(player.album().await.unwrap(), "Animals");
    }

    #[tokio::test]
    async fn test_source_mapping() {
        let mock = MockTransport::new("10.0.0.2");
        mock.reply("getPlayerStatus", r#"{"mode":"41"}"#)
            .reply("getPlayerStatus", r#"{"mode":"7"}"#);
        let mut player = client(&mock);
        assert_eq!(player.source().await.unwrap(), PlayerSource::Bluetooth);
        assert!(matches!(player.source().await, Err(Error::Api(_))));
    }

    #[tokio::test]
    async fn test_preset_validated_before_sending() {
        let mock = MockTransport::new("10.0.0.2");
        let mut player = client(&mock);
        assert!(matches!(player.preset(7).await, Err(Error::Validation(_))));
        assert!(mock.sent().is_empty());

        player.preset(2).await.unwrap();
        assert_eq!(mock.sent(), vec!["MCUKeyShortClick:2"]);
    }

    #[tokio::test]
    async fn test_wifi_auth_commands() {
        let mock = MockTransport::new("10.0.0.2");
        let mut player = client(&mock);
        assert!(matches!(
            player.set_wifi_auth(AuthType::Psk, None).await,
            Err(Error::Validation(_))
        ));
        player.set_wifi_auth(AuthType::Psk, Some("hunter22")).await.unwrap();
        player.set_wifi_auth(AuthType::Off, None).await.unwrap();
        assert_eq!(mock.sent(), vec!["setNetwork:1:hunter22", "setNetwork:0"]);
    }

    #[tokio::test]
    async fn test_wifi_status_table() {
        let mock = MockTransport::new("10.0.0.2");
        mock.reply("wlanGetConnectState", "PAIRFAIL")
            .reply("wlanGetConnectState", "???");
        let mut player = client(&mock);
        assert_eq!(player.wifi_status().await.unwrap(), WifiStatus::ErrorPassword);
        assert!(matches!(player.wifi_status().await, Err(Error::Api(_))));
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let mock = MockTransport::new("10.0.0.2");
        let mut player = client(&mock);
        assert!(matches!(player.prompt().await, Err(Error::Unsupported(_))));
        assert!(matches!(player.wifi_power().await, Err(Error::Unsupported(_))));
        assert!(matches!(player.set_wifi_power(true).await, Err(Error::Unsupported(_))));
        assert!(mock.sent().is_empty());

        player.set_wifi_power(false).await.unwrap();
        assert_eq!(mock.sent(), vec!["setWifiPowerDown"]);
    }

    #[tokio::test]
    async fn test_info_merges_statuses() {
        let mock = MockTransport::new("10.0.0.2");
        mock.reply("getStatus", r#"{"DeviceName":"Den","uuid":"FF31F09E"}"#)
            .reply("getPlayerStatus", r#"{"vol":"30","status":"stop"}"#);
        let info = client(&mock).info().await.unwrap();
        assert_eq!(info["DeviceName"], "Den");
        assert_eq!(info["vol"], "30");
    }

    #[tokio::test]
    async fn test_malformed_json_is_api_error() {
        let mock = MockTransport::new("10.0.0.2");
        mock.reply("getStatus", "unknown command");
        let err = client(&mock).device_info().await.unwrap_err();
        assert!(err.is_api());
        assert!(err.to_string().contains("unknown command"));
    }

    #[tokio::test]
    async fn test_multiroom_info_roles() {
        let mock = MockTransport::new("10.0.0.2");
        mock.reply("getStatus", r#"{"master_ip":"10.0.0.7"}"#)
            .reply("multiroom:getSlaveList", r#"{"slaves":0}"#);
        let info = client(&mock).multiroom_info().await.unwrap();
        assert_eq!(info.status, "slave");
        assert_eq!(info.master, Some(MasterRef { ip: "10.0.0.7".to_string() }));
        assert_eq!(info.slaves["slaves"], 0);
    }

    #[tokio::test]
    async fn test_multiroom_master_hexes_credentials() {
        let mock = MockTransport::new("10.0.0.2");
        client(&mock)
            .multiroom_master("Home", 11, "WPA2PSK", "AES", "pw")
            .await
            .unwrap();
        assert_eq!(
            mock.sent(),
            vec!["ConnectMasterAp:ssid=486f6d65:ch=11:auth=WPA2PSK:encry=AES:pwd=7077:chext=0"]
        );
    }
}
