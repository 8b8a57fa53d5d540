use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Axis along which a workspace or split container lays out its children.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    /// Children side by side, left to right.
    #[default]
    Horizontal,
    /// Children stacked top to bottom.
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResizeDirection {
    GrowWidth,
    GrowHeight,
    ShrinkWidth,
    ShrinkHeight,
}

impl ResizeDirection {
    /// The layout axis this resize acts on.
    pub fn orientation(self) -> Orientation {
        match self {
            ResizeDirection::GrowWidth | ResizeDirection::ShrinkWidth => Orientation::Horizontal,
            ResizeDirection::GrowHeight | ResizeDirection::ShrinkHeight => Orientation::Vertical,
        }
    }

    pub fn is_grow(self) -> bool {
        matches!(self, ResizeDirection::GrowWidth | ResizeDirection::GrowHeight)
    }

    /// Signed change in size percentage for a step of `step`.
    pub fn delta(self, step: f64) -> f64 { if self.is_grow() { step } else { -step } }
}
