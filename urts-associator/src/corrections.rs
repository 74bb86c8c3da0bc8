//! Static and source-specific travel-time corrections, pre-loaded and
//! applied during PSO residual evaluation (spec §4.5 step 3).

use std::collections::HashMap;

use urts_types::{ChannelId, Phase};

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionEntry {
    pub channel: ChannelId,
    pub phase: Phase,
    pub correction_seconds: f64,
}

/// A lookup from (channel, phase) to a travel-time correction in
/// seconds. Entries absent from the table contribute a zero
/// correction, so an empty table is equivalent to applying none.
#[derive(Debug, Clone, Default)]
pub struct CorrectionTable {
    entries: HashMap<(ChannelId, PhaseKey), f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PhaseKey {
    P,
    S,
}

impl From<Phase> for PhaseKey {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::P => PhaseKey::P,
            Phase::S => PhaseKey::S,
        }
    }
}

impl CorrectionTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<CorrectionEntry>) -> Self {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            map.insert((entry.channel, entry.phase.into()), entry.correction_seconds);
        }
        Self { entries: map }
    }

    pub fn correction_for(&self, channel: &ChannelId, phase: Phase) -> f64 {
        self.entries
            .get(&(channel.clone(), phase.into()))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch() -> ChannelId {
        ChannelId::new("UU", "ABC", "HHZ", "01")
    }

    #[test]
    fn missing_entry_yields_zero_correction() {
        let table = CorrectionTable::empty();
        assert_eq!(table.correction_for(&ch(), Phase::P), 0.0);
    }

    #[test]
    fn from_entries_looks_up_by_channel_and_phase() {
        let table = CorrectionTable::from_entries(vec![CorrectionEntry {
            channel: ch(),
            phase: Phase::P,
            correction_seconds: 0.12,
        }]);
        assert_eq!(table.correction_for(&ch(), Phase::P), 0.12);
        assert_eq!(table.correction_for(&ch(), Phase::S), 0.0);
    }
}
