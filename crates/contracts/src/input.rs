//! Game controller input ids as they appear on the wire

use serde::{Deserialize, Serialize};

/// Xbox controller buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    A,
    B,
    X,
    Y,
    Lb,
    Rb,
    Ljoy,
    Rjoy,
    Start,
    Back,
}

impl Button {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Button::A),
            1 => Some(Button::B),
            2 => Some(Button::X),
            3 => Some(Button::Y),
            4 => Some(Button::Lb),
            5 => Some(Button::Rb),
            6 => Some(Button::Ljoy),
            7 => Some(Button::Rjoy),
            8 => Some(Button::Start),
            9 => Some(Button::Back),
            _ => None,
        }
    }
}

/// Analog triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Left,
    Right,
}

impl Trigger {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Trigger::Left),
            1 => Some(Trigger::Right),
            _ => None,
        }
    }
}

/// Analog joysticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joystick {
    Left,
    Right,
}

impl Joystick {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Joystick::Left),
            1 => Some(Joystick::Right),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_tags() {
        assert_eq!(Button::from_tag(0), Some(Button::A));
        assert_eq!(Button::from_tag(9), Some(Button::Back));
        assert_eq!(Button::from_tag(10), None);
    }

    #[test]
    fn test_trigger_and_joystick_tags() {
        assert_eq!(Trigger::from_tag(1), Some(Trigger::Right));
        assert_eq!(Joystick::from_tag(0), Some(Joystick::Left));
        assert_eq!(Joystick::from_tag(2), None);
    }
}
