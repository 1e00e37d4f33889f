//! External button → controller flag mapping.
//!
//! The application layer (an on-screen button panel, a remote, the CLI)
//! presses and releases discrete [`ExternalButton`]s per hand.  Each press
//! expands through a per-hand lookup table into one or more
//! [`ControllerInput`] bits; several buttons may be held at once and their
//! masks are OR'd together.

use std::fmt;

use handctl_types::{ControllerError, ControllerInput as In, Hand};
use serde::{Deserialize, Serialize};

/// Discrete buttons the application can drive.  The discriminant is the id
/// used by [`ExternalButtons::press`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExternalButton {
    System = 1,
    Menu = 2,
    /// A on the right hand, X on the left.
    Primary = 3,
    /// B on the right hand, Y on the left.
    Secondary = 4,
    Stick = 5,
    Trigger = 6,
    Grip = 7,
    Trackpad = 8,
}

impl ExternalButton {
    pub const ALL: [ExternalButton; 8] = [
        Self::System,
        Self::Menu,
        Self::Primary,
        Self::Secondary,
        Self::Stick,
        Self::Trigger,
        Self::Grip,
        Self::Trackpad,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Menu => "menu",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Stick => "stick",
            Self::Trigger => "trigger",
            Self::Grip => "grip",
            Self::Trackpad => "trackpad",
        }
    }

    /// Output bits this button sets on `hand`.
    pub fn flags(self, hand: Hand) -> u64 {
        let table = match hand {
            Hand::Left => &LEFT_TABLE,
            Hand::Right => &RIGHT_TABLE,
        };
        table[self as usize - 1]
    }
}

impl TryFrom<u8> for ExternalButton {
    type Error = ControllerError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|b| b.id() == id)
            .ok_or(ControllerError::UnknownButton(id))
    }
}

impl fmt::Display for ExternalButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lookup tables (indexed by id - 1)
// ────────────────────────────────────────────────────────────────────────────

const STICK_TOUCH: u64 = In::mask(&[In::JoystickTouch, In::TrackpadTouch]);

const LEFT_TABLE: [u64; 8] = [
    In::SystemClick.flag(),
    In::ApplicationMenuClick.flag(),
    In::mask(&[In::XClick, In::XTouch]),
    In::mask(&[In::YClick, In::YTouch]),
    In::mask(&[In::JoystickLeftClick, In::JoystickClick, In::TrackpadClick]) | STICK_TOUCH,
    In::mask(&[In::TriggerClick, In::TriggerTouch]),
    In::mask(&[In::GripClick, In::GripTouch]),
    In::mask(&[In::TrackpadClick, In::JoystickClick]) | STICK_TOUCH,
];

const RIGHT_TABLE: [u64; 8] = [
    In::SystemClick.flag(),
    In::ApplicationMenuClick.flag(),
    In::mask(&[In::AClick, In::ATouch]),
    In::mask(&[In::BClick, In::BTouch]),
    In::mask(&[In::JoystickRightClick, In::JoystickClick, In::TrackpadClick]) | STICK_TOUCH,
    In::mask(&[In::TriggerClick, In::TriggerTouch]),
    In::mask(&[In::GripClick, In::GripTouch]),
    In::mask(&[In::TrackpadClick, In::JoystickClick]) | STICK_TOUCH,
];

// ────────────────────────────────────────────────────────────────────────────
// Held state
// ────────────────────────────────────────────────────────────────────────────

/// Buttons currently held per hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExternalButtons {
    held: [u16; 2],
}

impl ExternalButtons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold button `id` on `hand`.  Pressing a held button is a no-op.
    pub fn press(&mut self, hand: Hand, id: u8) -> Result<ExternalButton, ControllerError> {
        let button = ExternalButton::try_from(id)?;
        self.held[hand.index()] |= 1 << button.id();
        Ok(button)
    }

    /// Release button `id` on `hand`.
    pub fn release(&mut self, hand: Hand, id: u8) -> Result<ExternalButton, ControllerError> {
        let button = ExternalButton::try_from(id)?;
        self.held[hand.index()] &= !(1 << button.id());
        Ok(button)
    }

    /// Release everything on both hands.
    pub fn release_all(&mut self) {
        self.held = [0; 2];
    }

    pub fn is_held(&self, hand: Hand, button: ExternalButton) -> bool {
        self.held[hand.index()] & (1 << button.id()) != 0
    }

    pub fn held(&self, hand: Hand) -> impl Iterator<Item = ExternalButton> + '_ {
        ExternalButton::ALL
            .into_iter()
            .filter(move |b| self.is_held(hand, *b))
    }

    /// Union of the flags of every button held on `hand`.
    pub fn mask(&self, hand: Hand) -> u64 {
        self.held(hand).fold(0, |mask, b| mask | b.flags(hand))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for button in ExternalButton::ALL {
            assert_eq!(ExternalButton::try_from(button.id()), Ok(button));
        }
    }

    #[test]
    fn unknown_id_is_an_error() {
        assert_eq!(ExternalButton::try_from(0), Err(ControllerError::UnknownButton(0)));
        assert_eq!(ExternalButton::try_from(9), Err(ControllerError::UnknownButton(9)));
    }

    #[test]
    fn primary_is_hand_specific() {
        assert_eq!(
            ExternalButton::Primary.flags(Hand::Left),
            In::XClick.flag() | In::XTouch.flag()
        );
        assert_eq!(
            ExternalButton::Primary.flags(Hand::Right),
            In::AClick.flag() | In::ATouch.flag()
        );
    }

    #[test]
    fn stick_click_shares_joystick_and_trackpad_bits() {
        let left = ExternalButton::Stick.flags(Hand::Left);
        let right = ExternalButton::Stick.flags(Hand::Right);
        for shared in [In::JoystickClick, In::TrackpadClick, In::JoystickTouch] {
            assert_ne!(left & shared.flag(), 0);
            assert_ne!(right & shared.flag(), 0);
        }
        assert_ne!(left & In::JoystickLeftClick.flag(), 0);
        assert_eq!(left & In::JoystickRightClick.flag(), 0);
        assert_ne!(right & In::JoystickRightClick.flag(), 0);
    }

    #[test]
    fn held_buttons_combine() {
        let mut buttons = ExternalButtons::new();
        buttons.press(Hand::Right, 3).unwrap();
        buttons.press(Hand::Right, 4).unwrap();
        let mask = buttons.mask(Hand::Right);
        assert_ne!(mask & In::AClick.flag(), 0);
        assert_ne!(mask & In::BClick.flag(), 0);
        assert_eq!(buttons.mask(Hand::Left), 0);
    }

    #[test]
    fn release_keeps_other_buttons() {
        let mut buttons = ExternalButtons::new();
        buttons.press(Hand::Left, ExternalButton::Trigger.id()).unwrap();
        buttons.press(Hand::Left, ExternalButton::Menu.id()).unwrap();
        buttons.release(Hand::Left, ExternalButton::Trigger.id()).unwrap();
        assert_eq!(buttons.mask(Hand::Left), In::ApplicationMenuClick.flag());
    }

    #[test]
    fn release_all_clears_both_hands() {
        let mut buttons = ExternalButtons::new();
        buttons.press(Hand::Left, 1).unwrap();
        buttons.press(Hand::Right, 2).unwrap();
        buttons.release_all();
        assert_eq!(buttons.mask(Hand::Left), 0);
        assert_eq!(buttons.mask(Hand::Right), 0);
    }

    #[test]
    fn bad_press_leaves_state_unchanged() {
        let mut buttons = ExternalButtons::new();
        assert!(buttons.press(Hand::Left, 200).is_err());
        assert_eq!(buttons, ExternalButtons::new());
    }
}
