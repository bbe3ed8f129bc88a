//! Configuration document for `ch57x-keyboard-tool`
//!
//! The pad has a single row of three buttons and one knob, and KeyPilot only
//! ever programs the first layer. The shape is therefore fixed and only the
//! six action tokens vary.

use keypilot_profile::KeyMapping;
use serde::{Deserialize, Serialize};

/// Physical layout rows of the pad.
pub const ROWS: u8 = 1;
/// Physical layout columns of the pad.
pub const COLUMNS: u8 = 3;
/// Number of rotary knobs.
pub const KNOBS: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Normal,
    UpsideDown,
    Clockwise,
    CounterClockwise,
}

/// Top-level document accepted by `ch57x-keyboard-tool upload|validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub orientation: Orientation,
    pub rows: u8,
    pub columns: u8,
    pub knobs: u8,
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// One inner sequence per row.
    pub buttons: Vec<Vec<String>>,
    pub knobs: Vec<Knob>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Knob {
    pub ccw: String,
    pub press: String,
    pub cw: String,
}

impl DeviceConfig {
    /// Single-layer document for `mapping`.
    pub fn from_mapping(mapping: &KeyMapping) -> Self {
        Self {
            orientation: Orientation::Normal,
            rows: ROWS,
            columns: COLUMNS,
            knobs: KNOBS,
            layers: vec![Layer {
                buttons: vec![vec![
                    mapping.button1.clone(),
                    mapping.button2.clone(),
                    mapping.button3.clone(),
                ]],
                knobs: vec![Knob {
                    ccw: mapping.knob_ccw.clone(),
                    press: mapping.knob_press.clone(),
                    cw: mapping.knob_cw.clone(),
                }],
            }],
        }
    }

    /// Recover the mapping from the first layer, if the shape matches.
    pub fn to_mapping(&self) -> Option<KeyMapping> {
        let layer = self.layers.first()?;
        let [b1, b2, b3] = layer.buttons.first()?.as_slice() else {
            return None;
        };
        let knob = layer.knobs.first()?;
        Some(KeyMapping {
            button1: b1.clone(),
            button2: b2.clone(),
            button3: b3.clone(),
            knob_ccw: knob.ccw.clone(),
            knob_press: knob.press.clone(),
            knob_cw: knob.cw.clone(),
        })
    }
}

/// Render the YAML document the tool consumes for `mapping`.
pub fn render_config(mapping: &KeyMapping) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&DeviceConfig::from_mapping(mapping))
}
