//! Device and viewport emulation profiles.

use serde::{Deserialize, Serialize};

use crate::types::Viewport;

/// A device profile applied to a page before navigation.
///
/// Width and height are in CSS pixels; the viewport height is the fold used by
/// the above-the-fold probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceProfile {
    /// Viewport width in CSS pixels.
    pub width: u32,
    /// Viewport height in CSS pixels.
    pub height: u32,
    /// Device pixel ratio.
    pub device_scale_factor: f32,
    /// Whether the `meta viewport` tag is honored.
    pub is_mobile: bool,
    /// Whether the device supports touch events.
    pub has_touch: bool,
    /// Whether the viewport is in landscape orientation.
    pub is_landscape: bool,
    /// User agent announced by the device, if it has its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl DeviceProfile {
    /// Create a desktop profile with the given viewport size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Set the device pixel ratio.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.device_scale_factor = scale;
        self
    }

    /// Mark the device as mobile with touch support.
    pub fn mobile(mut self) -> Self {
        self.is_mobile = true;
        self.has_touch = true;
        self
    }

    /// Switch to landscape orientation, swapping width and height if needed.
    pub fn landscape(mut self) -> Self {
        if self.height > self.width {
            std::mem::swap(&mut self.width, &mut self.height);
        }
        self.is_landscape = true;
        self
    }

    /// Set the device's own user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// The emulated viewport.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }

    /// Look up a built-in device by name (case-insensitive).
    pub fn preset(name: &str) -> Option<Self> {
        let profile = match name.to_ascii_lowercase().as_str() {
            "iphone x" => Self::new(375, 812)
                .with_scale(3.0)
                .mobile()
                .with_user_agent(IPHONE_X_UA),
            "ipad" => Self::new(768, 1024)
                .with_scale(2.0)
                .mobile()
                .with_user_agent(IPAD_UA),
            "pixel 2" => Self::new(411, 731)
                .with_scale(2.625)
                .mobile()
                .with_user_agent(PIXEL_2_UA),
            "desktop hd" => Self::new(1920, 1080),
            _ => return None,
        };
        Some(profile)
    }

    /// Names accepted by [`DeviceProfile::preset`].
    pub fn preset_names() -> &'static [&'static str] {
        &["iPhone X", "iPad", "Pixel 2", "Desktop HD"]
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1080,
            device_scale_factor: 1.0,
            is_mobile: false,
            has_touch: false,
            is_landscape: false,
            user_agent: None,
        }
    }
}

const IPHONE_X_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 11_0 like Mac OS X) AppleWebKit/604.1.38 (KHTML, like Gecko) Version/11.0 Mobile/15A372 Safari/604.1";
const IPAD_UA: &str = "Mozilla/5.0 (iPad; CPU OS 11_0 like Mac OS X) AppleWebKit/604.1.34 (KHTML, like Gecko) Version/11.0 Mobile/15A5341f Safari/604.1";
const PIXEL_2_UA: &str = "Mozilla/5.0 (Linux; Android 8.0; Pixel 2 Build/OPD3.170816.012) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/75.0.3765.0 Mobile Safari/537.36";
