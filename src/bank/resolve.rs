//! Turns (preset, key, velocity) into concrete voice parameters.
//!
//! For every preset zone and instrument zone that contain the note:
//!
//! 1. start from the generator defaults,
//! 2. overwrite with the instrument's global zone, then the matching
//!    instrument zone (local values replace global ones),
//! 3. build the preset adjustment the same way (global, then local
//!    replacing it) from generators presets may use,
//! 4. add the adjustment onto the instrument values.
//!
//! Modulators follow the same layering: the instrument zone's modulators
//! replace identical global ones, the preset layer is appended, and the
//! default modulators stay unless a bank modulator with the same source,
//! destination and amount source replaces them.

use super::generator::{GeneratorIndex, GeneratorSet};
use super::modulator::{Destination, Modulator, DEFAULT_MODULATORS};
use super::zone::Zone;
use super::Bank;

/// Most modulators a single voice carries.
pub const MAX_MODULATORS: usize = 64;

const LINK_FLAG: u16 = 1 << 15;

/// A fixed-capacity modulator list, so resolving a note never allocates.
#[derive(Debug, Clone, Copy)]
pub struct ModulatorSet {
    entries: [Modulator; MAX_MODULATORS],
    len: usize,
}

impl Default for ModulatorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ModulatorSet {
    pub fn new() -> Self {
        Self {
            entries: [DEFAULT_MODULATORS[0]; MAX_MODULATORS],
            len: 0,
        }
    }

    pub fn as_slice(&self) -> &[Modulator] {
        &self.entries[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a modulator; returns `false` once the set is full.
    pub fn push(&mut self, modulator: Modulator) -> bool {
        if self.len == MAX_MODULATORS {
            return false;
        }
        self.entries[self.len] = modulator;
        self.len += 1;
        true
    }

    /// Appends a global and a local modulator list as one layer.
    ///
    /// A local modulator identical to a global one takes its slot. Link
    /// destinations, which index into their own zone's list, are rewritten
    /// to positions in this set.
    fn push_layer(&mut self, global: &[Modulator], local: &[Modulator]) {
        let base = self.len;
        let mut global_slots = [usize::MAX; MAX_MODULATORS];
        for (i, slot) in global_slots.iter_mut().enumerate().take(global.len()) {
            if base + i < MAX_MODULATORS {
                *slot = base + i;
            }
        }
        for modulator in global.iter() {
            if !self.push(relink(modulator, &global_slots)) {
                break;
            }
        }

        let mut local_slots = [usize::MAX; MAX_MODULATORS];
        let mut next = self.len;
        for (i, modulator) in local.iter().enumerate().take(MAX_MODULATORS) {
            let replaced = (base..self.len).find(|&k| self.entries[k].same_identity(modulator));
            local_slots[i] = match replaced {
                Some(slot) => slot,
                None if next < MAX_MODULATORS => {
                    next += 1;
                    next - 1
                }
                None => usize::MAX,
            };
        }
        for (modulator, slot) in local.iter().zip(local_slots.iter()) {
            if *slot == usize::MAX {
                continue;
            }
            self.entries[*slot] = relink(modulator, &local_slots);
            self.len = self.len.max(slot + 1);
        }
    }
}

fn relink(modulator: &Modulator, slots: &[usize; MAX_MODULATORS]) -> Modulator {
    let mut modulator = *modulator;
    if let Some(Destination::Link(target)) = modulator.destination() {
        let slot = slots.get(target).copied().unwrap_or(usize::MAX);
        modulator.destination = if slot == usize::MAX {
            // A dangling link feeds nothing; aim it at an unused generator.
            GeneratorIndex::Unused1 as u16
        } else {
            LINK_FLAG | slot as u16
        };
    }
    modulator
}

/// Everything a voice needs to start: resolved generators, modulators and
/// the sample to play.
#[derive(Debug, Clone, Copy)]
pub struct VoiceSetup {
    pub generators: GeneratorSet,
    pub modulators: ModulatorSet,
    /// Index into the bank's samples.
    pub sample: usize,
    pub key: u8,
    pub velocity: u8,
}

impl VoiceSetup {
    /// Combines the four zones that apply to one voice.
    pub fn resolve(
        preset_global: Option<&Zone>,
        preset_zone: &Zone,
        instrument_global: Option<&Zone>,
        instrument_zone: &Zone,
        sample: usize,
        key: u8,
        velocity: u8,
    ) -> Self {
        let mut generators = GeneratorSet::defaults();
        if let Some(global) = instrument_global {
            global.apply(&mut generators);
        }
        instrument_zone.apply(&mut generators);

        let mut adjustment = GeneratorSet::zeroed();
        if let Some(global) = preset_global {
            global.apply_preset(&mut adjustment);
        }
        preset_zone.apply_preset(&mut adjustment);
        generators.add(&adjustment);

        let layers: [&[Modulator]; 4] = [
            instrument_global.map_or(&[], |z| z.modulators.as_slice()),
            instrument_zone.modulators.as_slice(),
            preset_global.map_or(&[], |z| z.modulators.as_slice()),
            preset_zone.modulators.as_slice(),
        ];

        let mut modulators = ModulatorSet::new();
        for default in DEFAULT_MODULATORS.iter() {
            let replaced = layers
                .iter()
                .flat_map(|layer| layer.iter())
                .any(|m| m.same_identity(default));
            if !replaced {
                modulators.push(*default);
            }
        }
        modulators.push_layer(layers[0], layers[1]);
        modulators.push_layer(layers[2], layers[3]);

        Self {
            generators,
            modulators,
            sample,
            key,
            velocity,
        }
    }
}

impl Bank {
    /// Calls `start` once for every voice a note should start.
    ///
    /// Layered zones produce several voices. Zones whose instrument or
    /// sample is missing from the bank were already removed at load time.
    ///
    /// # Arguments
    ///
    /// * `preset` - Preset index
    /// * `key` - MIDI key (0-127)
    /// * `velocity` - Note velocity (1-127)
    /// * `start` - Receives each resolved setup
    ///
    /// # Returns
    ///
    /// The number of setups produced
    pub fn for_each_voice<F>(&self, preset: usize, key: u8, velocity: u8, mut start: F) -> usize
    where
        F: FnMut(&VoiceSetup),
    {
        let Some(preset) = self.preset(preset) else {
            return 0;
        };
        let mut count = 0;
        for preset_zone in preset.zones.matching(key, velocity) {
            let Some(instrument) = preset_zone.link.and_then(|i| self.instrument(i)) else {
                continue;
            };
            for instrument_zone in instrument.zones.matching(key, velocity) {
                let Some(sample) = instrument_zone.link else {
                    continue;
                };
                let setup = VoiceSetup::resolve(
                    preset.zones.global.as_ref(),
                    preset_zone,
                    instrument.zones.global.as_ref(),
                    instrument_zone,
                    sample,
                    key,
                    velocity,
                );
                start(&setup);
                count += 1;
            }
        }
        count
    }
}
