use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::scene::cascaded_shadow::MAX_CASCADES;

pub const SETTINGS_FILE: &str = "settings.json";

/// Window and renderer options shared by every sample. Missing keys in
/// `settings.json` keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub sample_count: u32,
    pub shadow_map_size: u32,
    pub cascade_count: u32,
    pub resolution: Resolution,
    pub present_mode: PresentModeSetting,
    /// Sample launched by the main binary when no name is given on the command line.
    pub sample: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_count: 4,
            shadow_map_size: 2048,
            cascade_count: 4,
            resolution: Resolution::default(),
            present_mode: PresentModeSetting::default(),
            sample: "cascaded_shadow".to_string(),
        }
    }
}

impl RenderSettings {
    pub fn load() -> Self {
        Self::load_from_path(SETTINGS_FILE)
    }

    /// Never fails: unreadable or malformed files log a warning and yield defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("No {} found, using default settings", path.display());
                return Self::default();
            }
            Err(err) => {
                warn!("Cannot read {}: {}", path.display(), err);
                return Self::default();
            }
        };

        match serde_json::from_str::<RenderSettings>(&contents) {
            Ok(settings) => {
                info!("Settings loaded from {}", path.display());
                settings.validate()
            }
            Err(err) => {
                warn!("Ignoring {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    /// Replaces out-of-range fields with their defaults.
    pub(crate) fn validate(mut self) -> Self {
        let defaults = Self::default();

        if !matches!(self.sample_count, 1 | 2 | 4 | 8) {
            warn!("sample_count {} unsupported, using {}", self.sample_count, defaults.sample_count);
            self.sample_count = defaults.sample_count;
        }
        if !self.shadow_map_size.is_power_of_two() {
            warn!(
                "shadow_map_size {} is not a power of two, using {}",
                self.shadow_map_size, defaults.shadow_map_size
            );
            self.shadow_map_size = defaults.shadow_map_size;
        }
        if !(1..=MAX_CASCADES as u32).contains(&self.cascade_count) {
            warn!(
                "cascade_count {} outside 1..={}, using {}",
                self.cascade_count, MAX_CASCADES, defaults.cascade_count
            );
            self.cascade_count = defaults.cascade_count;
        }
        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Empty resolution, using {:?}", defaults.resolution);
            self.resolution = defaults.resolution;
        }
        self
    }

    /// The configured mode if the surface offers it, else FIFO, else whatever comes first.
    pub fn present_mode(&self, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
        let desired = wgpu::PresentMode::from(self.present_mode);
        if available.contains(&desired) {
            return desired;
        }
        warn!("Present mode {:?} not supported by the surface", desired);
        if available.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            available.first().copied().unwrap_or(wgpu::PresentMode::Fifo)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeSetting {
    #[default]
    Fifo,
    FifoRelaxed,
    Immediate,
    Mailbox,
    AutoVsync,
    AutoNoVsync,
}

impl From<PresentModeSetting> for wgpu::PresentMode {
    fn from(mode: PresentModeSetting) -> Self {
        match mode {
            PresentModeSetting::Fifo => Self::Fifo,
            PresentModeSetting::FifoRelaxed => Self::FifoRelaxed,
            PresentModeSetting::Immediate => Self::Immediate,
            PresentModeSetting::Mailbox => Self::Mailbox,
            PresentModeSetting::AutoVsync => Self::AutoVsync,
            PresentModeSetting::AutoNoVsync => Self::AutoNoVsync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_fields_fall_back() {
        let settings = RenderSettings {
            sample_count: 3,
            shadow_map_size: 1000,
            cascade_count: 12,
            resolution: Resolution { width: 0, height: 600 },
            present_mode: PresentModeSetting::Immediate,
            sample: "lighting".to_string(),
        }
        .validate();
        let defaults = RenderSettings::default();

        assert_eq!(settings.sample_count, defaults.sample_count);
        assert_eq!(settings.shadow_map_size, defaults.shadow_map_size);
        assert_eq!(settings.cascade_count, defaults.cascade_count);
        assert_eq!(settings.resolution, defaults.resolution);
        assert_eq!(settings.present_mode, PresentModeSetting::Immediate);
        assert_eq!(settings.sample, "lighting");
    }

    #[test]
    fn valid_fields_survive_validation() {
        let settings = RenderSettings {
            sample_count: 1,
            shadow_map_size: 1024,
            cascade_count: 8,
            resolution: Resolution { width: 1920, height: 1080 },
            ..RenderSettings::default()
        }
        .validate();

        assert_eq!(settings.sample_count, 1);
        assert_eq!(settings.shadow_map_size, 1024);
        assert_eq!(settings.cascade_count, 8);
        assert_eq!(settings.resolution.width, 1920);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let parsed: RenderSettings =
            serde_json::from_str(r#"{ "sample": "cube", "cascade_count": 2, "present_mode": "mailbox" }"#)
                .unwrap();

        assert_eq!(parsed.sample, "cube");
        assert_eq!(parsed.cascade_count, 2);
        assert_eq!(parsed.present_mode, PresentModeSetting::Mailbox);
        assert_eq!(parsed.sample_count, 4);
        assert_eq!(parsed.resolution, Resolution::default());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let settings = RenderSettings::load_from_path("no/such/dir/settings.json");
        assert_eq!(settings.shadow_map_size, 2048);
    }

    #[test]
    fn present_mode_fallback_order() {
        let settings = RenderSettings {
            present_mode: PresentModeSetting::Mailbox,
            ..RenderSettings::default()
        };
        use wgpu::PresentMode::*;

        assert_eq!(settings.present_mode(&[Fifo, Mailbox]), Mailbox);
        assert_eq!(settings.present_mode(&[Immediate, Fifo]), Fifo);
        assert_eq!(settings.present_mode(&[Immediate]), Immediate);
        assert_eq!(settings.present_mode(&[]), Fifo);
    }
}
