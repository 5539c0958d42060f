//! Point-edit focus coordinates

use serde::{Deserialize, Serialize};

use retouch_common::{Error, Result};

/// Pixel coordinate in the natural resolution of the current image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    pub x: u32,
    pub y: u32,
}

impl Hotspot {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Map a click on the displayed image back to natural pixel space.
    ///
    /// `displayed` is the on-screen size of the image, `natural` its intrinsic
    /// resolution. Coordinates are rounded to the nearest pixel and clamped to
    /// the image bounds.
    pub fn from_display_click(
        click: (f64, f64),
        displayed: (f64, f64),
        natural: (u32, u32),
    ) -> Result<Self> {
        let (display_w, display_h) = displayed;
        let (click_x, click_y) = click;
        if ![click_x, click_y, display_w, display_h]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(Error::InvalidInput(
                "Click and display coordinates must be finite numbers".to_string(),
            ));
        }
        if !(display_w > 0.0 && display_h > 0.0) {
            return Err(Error::InvalidInput(
                "Displayed image size must be positive".to_string(),
            ));
        }
        if natural.0 == 0 || natural.1 == 0 {
            return Err(Error::InvalidInput(
                "Natural image size must be positive".to_string(),
            ));
        }

        if click_x < 0.0 || click_y < 0.0 || click_x > display_w || click_y > display_h {
            return Err(Error::InvalidInput(format!(
                "Click ({}, {}) is outside the displayed image",
                click_x, click_y
            )));
        }

        let scale_x = f64::from(natural.0) / display_w;
        let scale_y = f64::from(natural.1) / display_h;

        let x = ((click_x * scale_x).round() as u32).min(natural.0 - 1);
        let y = ((click_y * scale_y).round() as u32).min(natural.1 - 1);

        Ok(Self { x, y })
    }
}

impl std::fmt::Display for Hotspot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(x: {}, y: {})", self.x, self.y)
    }
}
