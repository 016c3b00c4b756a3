//! Gesture class alphabet
//!
//! The classifier emits one probability per letter, in alphabet order. That
//! order is part of the artifact contract: index 0 is `A`, index 25 is `Z`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::NUM_CLASSES;

/// One of the 26 static letter gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GestureLabel(u8);

impl GestureLabel {
    /// Label for class index `idx`, if it is inside the alphabet
    pub fn from_index(idx: usize) -> Option<Self> {
        if idx < NUM_CLASSES {
            Some(Self(idx as u8))
        } else {
            None
        }
    }

    /// Label for an ASCII letter (case-insensitive)
    pub fn from_char(c: char) -> Option<Self> {
        let upper = c.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            Some(Self(upper as u8 - b'A'))
        } else {
            None
        }
    }

    /// Class index used by the classifier output
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Upper-case letter
    pub fn as_char(&self) -> char {
        (b'A' + self.0) as char
    }

    /// All labels in classifier output order
    pub fn all() -> impl Iterator<Item = GestureLabel> {
        (0..NUM_CLASSES as u8).map(GestureLabel)
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Error returned when a string is not a single letter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a gesture label: {0:?}")]
pub struct ParseLabelError(pub String);

impl FromStr for GestureLabel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c).ok_or_else(|| ParseLabelError(s.to_string())),
            _ => Err(ParseLabelError(s.to_string())),
        }
    }
}

impl TryFrom<String> for GestureLabel {
    type Error = ParseLabelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GestureLabel> for String {
    fn from(label: GestureLabel) -> Self {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trip() {
        for (i, label) in GestureLabel::all().enumerate() {
            assert_eq!(label.index(), i);
            assert_eq!(GestureLabel::from_index(i), Some(label));
        }
        assert_eq!(GestureLabel::from_index(26), None);
    }

    #[test]
    fn parsing() {
        assert_eq!("A".parse::<GestureLabel>().unwrap().index(), 0);
        assert_eq!("z".parse::<GestureLabel>().unwrap().as_char(), 'Z');
        assert_eq!(" Q ".parse::<GestureLabel>().unwrap().as_char(), 'Q');
        assert!("AB".parse::<GestureLabel>().is_err());
        assert!("".parse::<GestureLabel>().is_err());
        assert!("1".parse::<GestureLabel>().is_err());
    }

    #[test]
    fn serializes_as_letter() {
        let label = GestureLabel::from_char('K').unwrap();
        assert_eq!(serde_json::to_string(&label).unwrap(), "\"K\"");
        let back: GestureLabel = serde_json::from_str("\"K\"").unwrap();
        assert_eq!(back, label);
    }
}
