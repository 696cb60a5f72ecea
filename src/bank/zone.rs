//! Zones: generator and modulator scopes limited to a key/velocity range.

use super::generator::{Generator, GeneratorIndex, GeneratorSet};
use super::modulator::{Destination, Modulator};
use crate::sf2::records::{BagRecord, GeneratorRecord, ModulatorRecord};
use crate::sf2::RangeError;
use std::ops::Range;
use tracing::debug;

const LINK_FLAG: u16 = 1 << 15;

/// An inclusive key or velocity range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    pub low: u8,
    pub high: u8,
}

impl KeyRange {
    pub const FULL: KeyRange = KeyRange { low: 0, high: 127 };

    pub fn contains(&self, value: u8) -> bool {
        self.low <= value && value <= self.high
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// One zone of a preset or instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub key_range: KeyRange,
    pub velocity_range: KeyRange,
    /// Value generators in file order; structural generators are removed.
    pub generators: Vec<Generator>,
    /// Valid modulators with duplicates and broken links removed.
    pub modulators: Vec<Modulator>,
    /// Instrument index (preset zone) or sample index (instrument zone).
    /// `None` marks a global zone.
    pub link: Option<usize>,
}

impl Zone {
    /// True if the note falls in both ranges (bounds inclusive).
    pub fn contains(&self, key: u8, velocity: u8) -> bool {
        self.key_range.contains(key) && self.velocity_range.contains(velocity)
    }

    pub fn is_global(&self) -> bool {
        self.link.is_none()
    }

    /// Overwrites `set` with this zone's values.
    pub fn apply(&self, set: &mut GeneratorSet) {
        for generator in &self.generators {
            set.set(generator.index, generator.value());
        }
    }

    /// Overwrites `set` with the values a preset zone may adjust; the
    /// generators presets may not use are ignored.
    pub fn apply_preset(&self, set: &mut GeneratorSet) {
        for generator in self
            .generators
            .iter()
            .filter(|g| g.index.valid_in_preset())
        {
            set.set(generator.index, generator.value());
        }
    }
}

/// The zones of one preset or instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneList {
    pub global: Option<Zone>,
    pub zones: Vec<Zone>,
}

impl ZoneList {
    /// Zones (global excluded) that contain the note.
    pub fn matching(&self, key: u8, velocity: u8) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(move |z| z.contains(key, velocity))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

fn slice<'a, T>(
    items: &'a [T],
    range: Range<usize>,
    kind: &'static str,
) -> Result<&'a [T], RangeError> {
    items.get(range.clone()).ok_or(RangeError::IndexOutOfRange {
        kind,
        start: range.start,
        end: range.end,
        count: items.len(),
    })
}

/// Decodes one bag's generators.
///
/// The key range is honoured only as the first generator and the
/// velocity range only as the first or right after the key range.
/// Generators after the terminal link are ignored.
fn decode_generators(
    records: &[GeneratorRecord],
    terminal: GeneratorIndex,
) -> (KeyRange, KeyRange, Vec<Generator>, Option<usize>) {
    let mut key_range = KeyRange::FULL;
    let mut velocity_range = KeyRange::FULL;
    let mut generators = Vec::with_capacity(records.len());
    let mut link = None;
    let mut saw_key_range = false;

    for (position, generator) in records.iter().filter_map(Generator::from_record).enumerate() {
        match generator.index {
            GeneratorIndex::KeyRange if position == 0 => {
                let (low, high) = generator.amount.range();
                key_range = KeyRange { low, high };
                saw_key_range = true;
            }
            GeneratorIndex::VelocityRange
                if position == 0 || (position == 1 && saw_key_range) =>
            {
                let (low, high) = generator.amount.range();
                velocity_range = KeyRange { low, high };
            }
            index if index == terminal => {
                link = Some(generator.amount.unsigned() as usize);
                break;
            }
            index if index.is_structural() => {
                debug!(generator = %index, position, "ignoring misplaced generator");
            }
            _ => generators.push(generator),
        }
    }
    (key_range, velocity_range, generators, link)
}

/// Drops invalid modulators and earlier duplicates, then rewrites link
/// destinations to the surviving positions. Links to dropped modulators
/// drop the linking modulator too.
fn decode_modulators(records: &[ModulatorRecord]) -> Vec<Modulator> {
    let modulators: Vec<Modulator> = records.iter().map(Modulator::from_record).collect();
    let mut keep: Vec<bool> = modulators.iter().map(Modulator::is_valid).collect();
    for (i, modulator) in modulators.iter().enumerate() {
        if modulators[i + 1..].iter().any(|m| m.same_identity(modulator)) {
            keep[i] = false;
        }
    }

    loop {
        let mut changed = false;
        for (i, modulator) in modulators.iter().enumerate() {
            if let (true, Some(Destination::Link(target))) = (keep[i], modulator.destination()) {
                let target_ok = keep.get(target).copied().unwrap_or(false)
                    && target != i
                    && modulators[target].source.is_link();
                if !target_ok {
                    keep[i] = false;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let mut new_index = vec![usize::MAX; modulators.len()];
    let mut next = 0;
    for (i, kept) in keep.iter().enumerate() {
        if *kept {
            new_index[i] = next;
            next += 1;
        }
    }

    modulators
        .iter()
        .enumerate()
        .filter(|(i, _)| keep[*i])
        .map(|(_, modulator)| {
            let mut modulator = *modulator;
            if let Some(Destination::Link(target)) = modulator.destination() {
                modulator.destination = LINK_FLAG | new_index[target] as u16;
            }
            modulator
        })
        .collect()
}

/// Builds the zones of one owner from its bag range.
///
/// # Arguments
///
/// * `bags` - The owner's bag records plus the following one, which
///   delimits the last zone's generator and modulator slices
/// * `generators` - The whole generator array of the hydra
/// * `modulators` - The whole modulator array of the hydra
/// * `terminal` - `Instrument` for presets, `SampleId` for instruments
///
/// # Returns
///
/// The zones plus the bounds errors of any zones that had to be skipped.
pub fn build_zones(
    bags: &[BagRecord],
    generators: &[GeneratorRecord],
    modulators: &[ModulatorRecord],
    terminal: GeneratorIndex,
) -> (ZoneList, Vec<RangeError>) {
    let mut list = ZoneList::default();
    let mut errors = Vec::new();

    for (position, pair) in bags.windows(2).enumerate() {
        let generator_range =
            pair[0].generator_index as usize..pair[1].generator_index as usize;
        let modulator_range =
            pair[0].modulator_index as usize..pair[1].modulator_index as usize;

        let records = match (
            slice(generators, generator_range, "generator"),
            slice(modulators, modulator_range, "modulator"),
        ) {
            (Ok(g), Ok(m)) => (g, m),
            (Err(error), _) | (_, Err(error)) => {
                errors.push(error);
                continue;
            }
        };

        let (key_range, velocity_range, zone_generators, link) =
            decode_generators(records.0, terminal);
        let zone_modulators = decode_modulators(records.1);
        let zone = Zone {
            key_range,
            velocity_range,
            generators: zone_generators,
            modulators: zone_modulators,
            link,
        };

        if zone.link.is_some() {
            list.zones.push(zone);
        } else if position == 0 && (!zone.generators.is_empty() || !zone.modulators.is_empty()) {
            list.global = Some(zone);
        } else {
            debug!(position, "dropping zone without a link");
        }
    }
    (list, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::modulator::{Source, DEFAULT_MODULATORS};

    fn gen(index: GeneratorIndex, amount: u16) -> GeneratorRecord {
        GeneratorRecord {
            operator: index as u16,
            amount,
        }
    }

    fn bag(generator_index: u16, modulator_index: u16) -> BagRecord {
        BagRecord {
            generator_index,
            modulator_index,
        }
    }

    fn record(modulator: &Modulator) -> ModulatorRecord {
        ModulatorRecord {
            source: modulator.source.0,
            destination: modulator.destination,
            amount: modulator.amount,
            amount_source: modulator.amount_source.0,
            transform: modulator.transform,
        }
    }

    #[test]
    fn test_global_and_local_zones() {
        let generators = [
            gen(GeneratorIndex::Pan, 100),
            gen(GeneratorIndex::KeyRange, 0x3c00),
            gen(GeneratorIndex::SampleId, 0),
            gen(GeneratorIndex::KeyRange, 0x7f3d),
            gen(GeneratorIndex::VelocityRange, 0x4000),
            gen(GeneratorIndex::Pan, 200),
            gen(GeneratorIndex::SampleId, 1),
        ];
        let bags = [bag(0, 0), bag(1, 0), bag(3, 0), bag(7, 0)];
        let (list, errors) = build_zones(&bags, &generators, &[], GeneratorIndex::SampleId);
        assert!(errors.is_empty());

        let global = list.global.as_ref().unwrap();
        assert_eq!(global.generators, vec![Generator::new(GeneratorIndex::Pan, 100)]);
        assert_eq!(list.zones.len(), 2);
        assert_eq!(list.zones[0].key_range, KeyRange { low: 0, high: 60 });
        assert_eq!(list.zones[0].link, Some(0));
        assert_eq!(list.zones[1].velocity_range, KeyRange { low: 0, high: 64 });
        assert!(list.zones[1].contains(61, 64));
        assert!(!list.zones[1].contains(60, 64));
        assert!(!list.zones[1].contains(61, 65));
        assert_eq!(list.matching(30, 100).count(), 1);
    }

    #[test]
    fn test_global_only_first() {
        let generators = [
            gen(GeneratorIndex::SampleId, 0),
            gen(GeneratorIndex::Pan, 100),
        ];
        let bags = [bag(0, 0), bag(1, 0), bag(2, 0)];
        let (list, _) = build_zones(&bags, &generators, &[], GeneratorIndex::SampleId);
        assert!(list.global.is_none());
        assert_eq!(list.zones.len(), 1);
    }

    #[test]
    fn test_misplaced_key_range_is_ignored() {
        let generators = [
            gen(GeneratorIndex::Pan, 100),
            gen(GeneratorIndex::KeyRange, 0x3c00),
            gen(GeneratorIndex::SampleId, 3),
            gen(GeneratorIndex::Pan, 300),
        ];
        let (key_range, _, generators, link) =
            decode_generators(&generators, GeneratorIndex::SampleId);
        assert_eq!(key_range, KeyRange::FULL);
        assert_eq!(generators.len(), 1);
        assert_eq!(link, Some(3));
    }

    #[test]
    fn test_bad_bag_range_skips_zone() {
        let generators = [gen(GeneratorIndex::SampleId, 0)];
        let bags = [bag(0, 0), bag(1, 0), bag(9, 0)];
        let (list, errors) = build_zones(&bags, &generators, &[], GeneratorIndex::SampleId);
        assert_eq!(list.zones.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            RangeError::IndexOutOfRange {
                kind: "generator",
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_modulators_keep_last() {
        let mut first = DEFAULT_MODULATORS[3];
        first.amount = 10;
        let mut second = first;
        second.amount = 20;
        let decoded = decode_modulators(&[record(&first), record(&second)]);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].amount, 20);
    }

    #[test]
    fn test_links_are_rewritten() {
        let invalid = Modulator {
            source: Source(0x0005),
            ..DEFAULT_MODULATORS[3]
        };
        let feeder = Modulator {
            destination: LINK_FLAG | 2,
            ..DEFAULT_MODULATORS[3]
        };
        let linked = Modulator::new(
            Source::general(crate::bank::modulator::GeneralController::Link),
            GeneratorIndex::Pan,
            100,
            Source::NONE,
        );
        let dangling = Modulator {
            destination: LINK_FLAG,
            ..DEFAULT_MODULATORS[7]
        };
        let decoded = decode_modulators(&[
            record(&invalid),
            record(&feeder),
            record(&linked),
            record(&dangling),
        ]);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].destination(), Some(Destination::Link(1)));
        assert_eq!(decoded[1], linked);
    }
}
