//! Presets: the MIDI-addressable entries of a bank.

use super::zone::ZoneList;
use serde::Serialize;
use std::fmt;

/// A (bank, program) instrument combination and its zones. Each non-global
/// zone links to an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    pub bank: u16,
    pub program: u16,
    pub zones: ZoneList,
}

impl Preset {
    /// A summary suitable for listings.
    pub fn summary(&self, index: usize) -> PresetSummary {
        PresetSummary {
            index,
            name: self.name.clone(),
            bank: self.bank,
            program: self.program,
            zones: self.zones.len(),
        }
    }
}

/// Listing entry for one preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetSummary {
    pub index: usize,
    pub name: String,
    pub bank: u16,
    pub program: u16,
    pub zones: usize,
}

impl fmt::Display for PresetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:4}  {:03}:{:03}  {}",
            self.index, self.bank, self.program, self.name
        )
    }
}
