//! Host key identity and the guest key-code space.

use std::fmt;

/// Host-native identifier of a physical key.
///
/// Names follow the `KeyboardEvent.code` convention: `"KeyA"`, `"Digit1"`,
/// `"Escape"`, `"ArrowLeft"`. They name the key's position, not the character
/// it produces, so `"KeyA"` is the same key with or without shift.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalKey(String);

impl PhysicalKey {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The key labelled with an ASCII letter, e.g. `letter('w')` is `"KeyW"`.
    #[must_use]
    pub fn letter(c: char) -> Option<Self> {
        c.is_ascii_alphabetic()
            .then(|| Self(format!("Key{}", c.to_ascii_uppercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PhysicalKey {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for PhysicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key codes the guest understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum KeyCode {
    A = 0,
    D = 3,
    E = 4,
    Q = 16,
    S = 18,
    W = 22,
    Escape = 100,
    /// Any key outside the table; still delivered so the guest can decide.
    Unrecognized = -1,
}

impl KeyCode {
    #[must_use]
    pub fn translate(key: &PhysicalKey) -> Self {
        match key.as_str() {
            "KeyA" => Self::A,
            "KeyD" => Self::D,
            "KeyE" => Self::E,
            "KeyQ" => Self::Q,
            "KeyS" => Self::S,
            "KeyW" => Self::W,
            "Escape" => Self::Escape,
            _ => Self::Unrecognized,
        }
    }

    /// Value passed to the guest's `key_down` / `key_up`.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl From<&PhysicalKey> for KeyCode {
    fn from(key: &PhysicalKey) -> Self {
        Self::translate(key)
    }
}
