//! Instruments: named zone lists that reference samples.

use super::zone::ZoneList;

/// An instrument and its zones. Each non-global zone links to a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub name: String,
    pub zones: ZoneList,
}

impl Instrument {
    /// Sample indices referenced by the zones, in zone order.
    pub fn sample_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.zones.zones.iter().filter_map(|z| z.link)
    }
}
