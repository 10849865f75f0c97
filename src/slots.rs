//! The ten numbered hotkey slots and their `config.json` representation.
//!
//! Each slot is keyed `shift_<digit>` and holds either `"None"` or the name of
//! a snippet. New snippets take the first free slot in the order
//! 1, 2, ..., 9, 0.

use crate::error::{KlipError, Result};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Marker stored in `config.json` for an unassigned slot
pub const UNASSIGNED: &str = "None";

pub const SLOT_PREFIX: &str = "shift_";

/// Prefixes older configs used for the same slots, in lookup order
const LEGACY_PREFIXES: [&str; 7] = [
    "ctrl_",
    "alt_gr_",
    "alt_shift_",
    "scroll_",
    "ctrl_alt_",
    "ctrl_shift_",
    "alt_",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(u8);

impl Slot {
    /// Assignment order: 1 through 9, then 0
    pub const ORDER: [Slot; 10] = [
        Slot(1),
        Slot(2),
        Slot(3),
        Slot(4),
        Slot(5),
        Slot(6),
        Slot(7),
        Slot(8),
        Slot(9),
        Slot(0),
    ];

    pub fn new(digit: u8) -> Option<Slot> {
        (digit <= 9).then_some(Slot(digit))
    }

    pub fn digit(self) -> u8 {
        self.0
    }

    /// The `config.json` key, e.g. `shift_3`
    pub fn key(self) -> String {
        format!("{}{}", SLOT_PREFIX, self.0)
    }

    fn index(self) -> usize {
        // Position inside `Slot::ORDER`
        if self.0 == 0 {
            9
        } else {
            self.0 as usize - 1
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Slot {
    type Err = KlipError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix(SLOT_PREFIX).unwrap_or(trimmed);
        let mut chars = digits.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_digit() => Ok(Slot(c as u8 - b'0')),
            _ => Err(KlipError::InvalidSlot(s.to_string())),
        }
    }
}

/// Slot assignments, indexed in `Slot::ORDER`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotkeySlots {
    slots: [Option<String>; 10],
}

impl HotkeySlots {
    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.slots[slot.index()].as_deref()
    }

    pub fn set(&mut self, slot: Slot, name: Option<String>) {
        self.slots[slot.index()] = name.filter(|n| is_assigned(n));
    }

    pub fn clear(&mut self, slot: Slot) {
        self.slots[slot.index()] = None;
    }

    pub fn first_free(&self) -> Option<Slot> {
        Slot::ORDER.into_iter().find(|slot| self.get(*slot).is_none())
    }

    /// Put `name` into the first free slot, if any
    pub fn assign_next(&mut self, name: &str) -> Option<Slot> {
        let slot = self.first_free()?;
        self.set(slot, Some(name.to_string()));
        Some(slot)
    }

    /// Clear every slot whose value satisfies `matches`
    pub fn clear_where(&mut self, matches: impl Fn(&str) -> bool) -> Vec<Slot> {
        let mut cleared = Vec::new();
        for slot in Slot::ORDER {
            if self.get(slot).is_some_and(&matches) {
                self.clear(slot);
                cleared.push(slot);
            }
        }
        cleared
    }

    /// Point every slot whose value satisfies `matches` at `new`
    pub fn repoint_where(&mut self, new: &str, matches: impl Fn(&str) -> bool) -> Vec<Slot> {
        let mut moved = Vec::new();
        for slot in Slot::ORDER {
            if self.get(slot).is_some_and(&matches) {
                self.set(slot, Some(new.to_string()));
                moved.push(slot);
            }
        }
        moved
    }

    /// Drop assignments that match none of `names` (case-insensitive).
    /// Returns the cleared slots with the stale value they held.
    pub fn retain_existing<'a, I>(&mut self, names: I) -> Vec<(Slot, String)>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let known: Vec<String> = names.into_iter().map(|n| n.to_lowercase()).collect();
        let mut cleared = Vec::new();
        for slot in Slot::ORDER {
            if let Some(value) = self.get(slot) {
                if !known.contains(&value.to_lowercase()) {
                    cleared.push((slot, value.to_string()));
                    self.clear(slot);
                }
            }
        }
        cleared
    }

    /// The first slot holding exactly `name`
    pub fn slot_of(&self, name: &str) -> Option<Slot> {
        Slot::ORDER
            .into_iter()
            .find(|slot| self.get(*slot) == Some(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, Option<&str>)> + '_ {
        Slot::ORDER.into_iter().map(move |slot| (slot, self.get(slot)))
    }

    pub fn assigned_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

fn is_assigned(value: &str) -> bool {
    !value.is_empty() && value != UNASSIGNED
}

impl Serialize for HotkeySlots {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Slot::ORDER.len()))?;
        for (slot, value) in self.iter() {
            map.serialize_entry(&slot.key(), value.unwrap_or(UNASSIGNED))?;
        }
        map.end()
    }
}

impl HotkeySlots {
    /// Read slots from any JSON value. Non-string slot values and non-object
    /// maps count as unassigned.
    pub fn from_value(value: &Value) -> HotkeySlots {
        let mut slots = HotkeySlots::default();
        let Some(raw) = value.as_object() else {
            return slots;
        };
        let name_at = |key: String| raw.get(&key).and_then(Value::as_str).map(str::to_string);

        for slot in Slot::ORDER {
            let current = name_at(slot.key()).or_else(|| {
                LEGACY_PREFIXES
                    .iter()
                    .find_map(|prefix| name_at(format!("{}{}", prefix, slot.digit())))
            });
            slots.set(slot, current);
        }
        slots
    }
}

impl<'de> Deserialize<'de> for HotkeySlots {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(HotkeySlots::from_value(&Value::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slot(d: u8) -> Slot {
        Slot::new(d).unwrap()
    }

    #[test]
    fn parses_digits_and_keys() {
        assert_eq!("3".parse::<Slot>().unwrap(), slot(3));
        assert_eq!("shift_0".parse::<Slot>().unwrap(), slot(0));
        assert!("10".parse::<Slot>().is_err());
        assert!("shift_".parse::<Slot>().is_err());
        assert!("x".parse::<Slot>().is_err());
        assert!(Slot::new(10).is_none());
    }

    #[test]
    fn assigns_in_order_one_through_nine_then_zero() {
        let mut slots = HotkeySlots::default();
        let assigned: Vec<Slot> = (0..10)
            .map(|i| slots.assign_next(&format!("s{}", i)).unwrap())
            .collect();
        assert_eq!(assigned, Slot::ORDER.to_vec());
        assert_eq!(slots.get(slot(0)), Some("s9"));
        assert_eq!(slots.assign_next("overflow"), None);
    }

    #[test]
    fn first_free_fills_gaps() {
        let mut slots = HotkeySlots::default();
        for name in ["a", "b", "c"] {
            slots.assign_next(name);
        }
        slots.clear(slot(2));
        assert_eq!(slots.first_free(), Some(slot(2)));
    }

    #[test]
    fn clear_and_repoint_follow_the_predicate() {
        let mut slots = HotkeySlots::default();
        slots.set(slot(1), Some("Orders".into()));
        slots.set(slot(5), Some("orders".into()));
        slots.set(slot(2), Some("users".into()));

        let moved = slots.repoint_where("sales", |v| v == "orders");
        assert_eq!(moved, vec![slot(5)]);
        assert_eq!(slots.get(slot(5)), Some("sales"));

        assert_eq!(
            slots.clear_where(|v| v.eq_ignore_ascii_case("orders")),
            vec![slot(1)]
        );
        assert_eq!(slots.get(slot(1)), None);
        assert_eq!(slots.get(slot(2)), Some("users"));
    }

    #[test]
    fn retain_existing_reports_stale_values() {
        let mut slots = HotkeySlots::default();
        slots.set(slot(1), Some("Kept".into()));
        slots.set(slot(2), Some("gone".into()));
        let names = vec!["kept".to_string()];

        let cleared = slots.retain_existing(&names);
        assert_eq!(cleared, vec![(slot(2), "gone".to_string())]);
        assert_eq!(slots.get(slot(1)), Some("Kept"));
    }

    #[test]
    fn serializes_every_slot_with_none_marker() {
        let mut slots = HotkeySlots::default();
        slots.set(slot(1), Some("a".into()));
        let value = serde_json::to_value(&slots).unwrap();
        assert_eq!(value["shift_1"], "a");
        assert_eq!(value["shift_0"], "None");
        assert_eq!(value.as_object().unwrap().len(), 10);
    }

    #[test]
    fn reads_legacy_prefixes_when_shift_key_missing() {
        let value = json!({
            "ctrl_1": "from-ctrl",
            "alt_2": "from-alt",
            "shift_2": "from-shift",
            "alt_gr_3": "gr",
            "alt_3": "plain-alt",
            "shift_4": null,
            "shift_5": "",
            "shift_6": "None"
        });
        let slots: HotkeySlots = serde_json::from_value(value).unwrap();
        assert_eq!(slots.get(slot(1)), Some("from-ctrl"));
        assert_eq!(slots.get(slot(2)), Some("from-shift"));
        assert_eq!(slots.get(slot(3)), Some("gr"));
        assert_eq!(slots.get(slot(4)), None);
        assert_eq!(slots.get(slot(5)), None);
        assert_eq!(slots.get(slot(6)), None);
        assert_eq!(slots.assigned_count(), 3);
    }

    #[test]
    fn non_string_values_are_unassigned() {
        let value = json!({
            "shift_1": 5,
            "ctrl_1": "legacy-wins",
            "shift_2": {"name": "x"},
            "shift_3": "plain"
        });
        let slots = HotkeySlots::from_value(&value);
        assert_eq!(slots.get(slot(1)), Some("legacy-wins"));
        assert_eq!(slots.get(slot(2)), None);
        assert_eq!(slots.get(slot(3)), Some("plain"));
        assert_eq!(HotkeySlots::from_value(&json!([1, 2])), HotkeySlots::default());
    }
}
