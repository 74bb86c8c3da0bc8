//! Core data model for the URTS real-time seismic data plane.
//!
//! Everything here is plain data: packets, picks, arrivals, origins and
//! their supporting value types. Behaviour that touches shared mutable
//! state (the packet cache, the threshold extractor, the associator)
//! lives in sibling crates that depend on this one.

pub mod error;
pub mod ids;
pub mod wire;

pub use error::TypesError;
pub use ids::IdentifierGenerator;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A point in time, expressed as integer microseconds since the Unix
/// epoch. Picks and packets are timestamped at microsecond precision
/// per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MicroTime(pub i64);

impl MicroTime {
    pub const fn from_micros(micros: i64) -> Self {
        MicroTime(micros)
    }

    pub fn as_micros(self) -> i64 {
        self.0
    }

    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    pub fn from_seconds(seconds: f64) -> Self {
        MicroTime((seconds * 1_000_000.0).round() as i64)
    }

    pub fn checked_add_micros(self, delta: i64) -> Self {
        MicroTime(self.0 + delta)
    }
}

impl std::ops::Add<i64> for MicroTime {
    type Output = MicroTime;
    fn add(self, rhs: i64) -> MicroTime {
        MicroTime(self.0 + rhs)
    }
}

impl std::ops::Sub for MicroTime {
    type Output = i64;
    fn sub(self, rhs: MicroTime) -> i64 {
        self.0 - rhs.0
    }
}

impl std::ops::Sub<i64> for MicroTime {
    type Output = MicroTime;
    fn sub(self, rhs: i64) -> MicroTime {
        MicroTime(self.0 - rhs)
    }
}

/// The four-part identifier of a seismic data stream (glossary:
/// Network / Station / Channel / Location).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId {
    pub network: String,
    pub station: String,
    pub channel: String,
    pub location: String,
}

impl ChannelId {
    pub fn new(
        network: impl Into<String>,
        station: impl Into<String>,
        channel: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            network: network.into(),
            station: station.into(),
            channel: channel.into(),
            location: location.into(),
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.network, self.station, self.channel, self.location
        )
    }
}

/// Common header shared by `DataPacket` and `ProbabilityPacket`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketHeader {
    pub channel: ChannelId,
    pub sampling_rate_hz: f64,
    pub start_time: MicroTime,
}

/// A mapping of (network, station, channel, location) to a sampling
/// rate, a UTC start time, and an ordered sequence of samples
/// (spec §3, `DataPacket`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPacket {
    pub header: PacketHeader,
    pub samples: Vec<f64>,
}

/// Behaviour shared by every sample-carrying packet type, used by the
/// cache, interpolator and threshold extractor so they do not need to
/// be generic over `DataPacket` vs. `ProbabilityPacket` separately.
pub trait Packet {
    fn channel(&self) -> &ChannelId;
    fn sampling_rate_hz(&self) -> f64;
    fn start_time(&self) -> MicroTime;
    fn samples(&self) -> &[f64];

    /// One sampling period, in microseconds.
    fn period_micros(&self) -> f64 {
        1_000_000.0 / self.sampling_rate_hz()
    }

    /// Derived end time. `None` for a zero-length packet: spec §3
    /// states a zero-length packet is legal but its end time is
    /// undefined.
    fn end_time(&self) -> Option<MicroTime> {
        let n = self.samples().len();
        if n == 0 {
            return None;
        }
        let offset = ((n - 1) as f64 / self.sampling_rate_hz() * 1_000_000.0).round() as i64;
        Some(self.start_time() + offset)
    }

    fn len(&self) -> usize {
        self.samples().len()
    }

    fn is_empty(&self) -> bool {
        self.samples().is_empty()
    }
}

impl DataPacket {
    pub fn new(
        channel: ChannelId,
        sampling_rate_hz: f64,
        start_time: MicroTime,
        samples: Vec<f64>,
    ) -> Result<Self, TypesError> {
        if sampling_rate_hz <= 0.0 {
            return Err(TypesError::InvalidSamplingRate(sampling_rate_hz));
        }
        Ok(Self {
            header: PacketHeader {
                channel,
                sampling_rate_hz,
                start_time,
            },
            samples,
        })
    }
}

impl Packet for DataPacket {
    fn channel(&self) -> &ChannelId {
        &self.header.channel
    }
    fn sampling_rate_hz(&self) -> f64 {
        self.header.sampling_rate_hz
    }
    fn start_time(&self) -> MicroTime {
        self.header.start_time
    }
    fn samples(&self) -> &[f64] {
        &self.samples
    }
}

/// Ordering for packets in the circular cache: strictly by start time
/// (spec §4.1 ordering invariant).
impl PartialOrd for DataPacket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.start_time().cmp(&other.start_time()))
    }
}
impl Eq for DataPacket {}
impl Ord for DataPacket {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start_time().cmp(&other.start_time())
    }
}

/// A `DataPacket` whose samples are per-sample probabilities of a
/// binary classification, produced by an ML detector (spec §3,
/// `ProbabilityPacket`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityPacket {
    pub header: PacketHeader,
    pub samples: Vec<f64>,
    pub positive_class_name: String,
    pub negative_class_name: String,
    pub algorithm: String,
    pub original_channels: Vec<String>,
}

impl ProbabilityPacket {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel: ChannelId,
        sampling_rate_hz: f64,
        start_time: MicroTime,
        samples: Vec<f64>,
        positive_class_name: impl Into<String>,
        negative_class_name: impl Into<String>,
        algorithm: impl Into<String>,
        original_channels: Vec<String>,
    ) -> Result<Self, TypesError> {
        if sampling_rate_hz <= 0.0 {
            return Err(TypesError::InvalidSamplingRate(sampling_rate_hz));
        }
        Ok(Self {
            header: PacketHeader {
                channel,
                sampling_rate_hz,
                start_time,
            },
            samples,
            positive_class_name: positive_class_name.into(),
            negative_class_name: negative_class_name.into(),
            algorithm: algorithm.into(),
            original_channels,
        })
    }
}

impl Packet for ProbabilityPacket {
    fn channel(&self) -> &ChannelId {
        &self.header.channel
    }
    fn sampling_rate_hz(&self) -> f64 {
        self.header.sampling_rate_hz
    }
    fn start_time(&self) -> MicroTime {
        self.header.start_time
    }
    fn samples(&self) -> &[f64] {
        &self.samples
    }
}

/// `P`/`S` phase label (glossary: Phase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    P,
    S,
}

/// A phase hint attached to a pick before it is promoted to an arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseHint {
    P,
    S,
    Unknown,
}

/// First-motion polarity of a P pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirstMotion {
    Down,
    Unknown,
    Up,
}

impl FirstMotion {
    /// Wire encoding per spec §6: `FirstMotion ∈ {−1,0,+1}`.
    pub fn to_wire(self) -> i8 {
        match self {
            FirstMotion::Down => -1,
            FirstMotion::Unknown => 0,
            FirstMotion::Up => 1,
        }
    }

    pub fn from_wire(value: i8) -> Self {
        match value {
            v if v < 0 => FirstMotion::Down,
            v if v > 0 => FirstMotion::Up,
            _ => FirstMotion::Unknown,
        }
    }
}

/// Whether a pick/origin was produced automatically or hand-reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    Automatic,
    Manual,
}

impl ReviewStatus {
    pub fn to_wire(self) -> u8 {
        match self {
            ReviewStatus::Automatic => 0,
            ReviewStatus::Manual => 1,
        }
    }

    pub fn from_wire(value: u8) -> Self {
        if value == 0 {
            ReviewStatus::Automatic
        } else {
            ReviewStatus::Manual
        }
    }
}

/// One side (lower or upper) of an uncertainty bound pair: a
/// percentile in `[0,100]` and the associated time perturbation in
/// microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBound {
    pub percentile: f64,
    pub perturbation_micros: i64,
}

/// Lower/upper uncertainty bound pair attached to a pick (spec §3).
/// Invariant: `lower.percentile <= upper.percentile` and
/// `lower.perturbation_micros <= upper.perturbation_micros`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBounds {
    pub lower: UncertaintyBound,
    pub upper: UncertaintyBound,
}

impl UncertaintyBounds {
    pub fn new(lower: UncertaintyBound, upper: UncertaintyBound) -> Result<Self, TypesError> {
        if !(0.0..=100.0).contains(&lower.percentile) {
            return Err(TypesError::InvalidPercentile(lower.percentile));
        }
        if !(0.0..=100.0).contains(&upper.percentile) {
            return Err(TypesError::InvalidPercentile(upper.percentile));
        }
        if lower.percentile > upper.percentile
            || lower.perturbation_micros > upper.perturbation_micros
        {
            return Err(TypesError::InvalidUncertaintyBounds {
                lower_percentile: lower.percentile,
                upper_percentile: upper.percentile,
                lower_perturbation: lower.perturbation_micros,
                upper_perturbation: upper.perturbation_micros,
            });
        }
        Ok(Self { lower, upper })
    }
}

/// A single detection on a channel: a time, a monotonic identifier,
/// and the metadata accumulated as it moves through the picker
/// pipeline (spec §3, `Pick`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub channel: ChannelId,
    pub time: MicroTime,
    pub identifier: u64,
    pub phase_hint: Option<PhaseHint>,
    pub first_motion: FirstMotion,
    pub review_status: ReviewStatus,
    pub uncertainty: Option<UncertaintyBounds>,
    pub original_channels: Option<Vec<ChannelId>>,
    pub processing_algorithms: Option<Vec<String>>,
}

impl Pick {
    pub fn new(channel: ChannelId, time: MicroTime, identifier: u64) -> Self {
        Self {
            channel,
            time,
            identifier,
            phase_hint: None,
            first_motion: FirstMotion::Unknown,
            review_status: ReviewStatus::Automatic,
            uncertainty: None,
            original_channels: None,
            processing_algorithms: None,
        }
    }

    /// Append a processing-algorithm tag (e.g. `"algorithm failed"` per
    /// spec §4.4 when a downstream inference step fails softly).
    pub fn tag_algorithm(&mut self, tag: impl Into<String>) {
        self.processing_algorithms
            .get_or_insert_with(Vec::new)
            .push(tag.into());
    }
}

/// A `Pick` promoted to membership in an `Origin` (spec §3, glossary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    pub pick: Pick,
    pub phase: Phase,
    pub origin_identifier: Option<u64>,
    pub travel_time_seconds: Option<f64>,
    pub residual_seconds: Option<f64>,
    pub signal_to_noise_ratio: Option<f64>,
}

impl Arrival {
    pub fn new(pick: Pick, phase: Phase) -> Self {
        Self {
            pick,
            phase,
            origin_identifier: None,
            travel_time_seconds: None,
            residual_seconds: None,
            signal_to_noise_ratio: None,
        }
    }
}

impl std::ops::Deref for Arrival {
    type Target = Pick;
    fn deref(&self) -> &Pick {
        &self.pick
    }
}
impl std::ops::DerefMut for Arrival {
    fn deref_mut(&mut self) -> &mut Pick {
        &mut self.pick
    }
}

fn normalize_longitude(lon: f64) -> f64 {
    // ((lon + 180) mod 360) - 180, with exactly 180 mapping to -180
    // (open design question in spec §9, resolved here).
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == 180.0 {
        -180.0
    } else {
        wrapped
    }
}

/// A hypothesized earthquake location and time, supported by one or
/// more `Arrival`s (spec §3, `Origin`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub time: MicroTime,
    pub latitude: f64,
    longitude: f64,
    pub depth_meters: f64,
    pub identifier: u64,
    pub review_status: ReviewStatus,
    pub algorithms: Vec<String>,
    pub arrivals: Vec<Arrival>,
}

impl Origin {
    pub fn new(
        time: MicroTime,
        latitude: f64,
        longitude: f64,
        depth_meters: f64,
        identifier: u64,
    ) -> Result<Self, TypesError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(TypesError::InvalidLatitude(latitude));
        }
        if !(-8900.0..=800_000.0).contains(&depth_meters) {
            return Err(TypesError::InvalidDepth(depth_meters));
        }
        Ok(Self {
            time,
            latitude,
            longitude: normalize_longitude(longitude),
            depth_meters,
            identifier,
            review_status: ReviewStatus::Automatic,
            algorithms: Vec::new(),
            arrivals: Vec::new(),
        })
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Sets longitude, normalizing into `[-180, 180)` (spec §9 open
    /// question, §8 testable property 5).
    pub fn set_longitude(&mut self, longitude: f64) {
        self.longitude = normalize_longitude(longitude);
    }

    /// Setting the identifier propagates it to every attached arrival
    /// (spec §3 invariant, §8 testable property 6).
    pub fn set_identifier(&mut self, identifier: u64) {
        self.identifier = identifier;
        for arrival in &mut self.arrivals {
            arrival.origin_identifier = Some(identifier);
        }
    }

    /// Attaches an arrival, stamping it with this origin's current
    /// identifier so the invariant holds regardless of attach order.
    pub fn add_arrival(&mut self, mut arrival: Arrival) {
        arrival.origin_identifier = Some(self.identifier);
        self.arrivals.push(arrival);
    }
}

/// One sample referenced by time and value, used to mark the
/// boundaries and peak of a `TriggerWindow`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub time: MicroTime,
    pub value: f64,
}

/// An interval on a probability stream bounded by on/off threshold
/// crossings, with the interior maximum recorded (spec §3,
/// `TriggerWindow`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerWindow {
    pub start: SamplePoint,
    pub end: SamplePoint,
    pub max: SamplePoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch() -> ChannelId {
        ChannelId::new("UU", "ABC", "HHZ", "01")
    }

    #[test]
    fn data_packet_end_time_is_derived() {
        let p = DataPacket::new(ch(), 100.0, MicroTime::from_micros(0), vec![0.0; 5]).unwrap();
        // 4 samples after the first at 100 Hz = 40_000 us
        assert_eq!(p.end_time(), Some(MicroTime::from_micros(40_000)));
    }

    #[test]
    fn zero_length_packet_has_undefined_end_time() {
        let p = DataPacket::new(ch(), 100.0, MicroTime::from_micros(0), vec![]).unwrap();
        assert_eq!(p.end_time(), None);
    }

    #[test]
    fn rejects_non_positive_sampling_rate() {
        assert!(DataPacket::new(ch(), 0.0, MicroTime::from_micros(0), vec![1.0]).is_err());
        assert!(DataPacket::new(ch(), -1.0, MicroTime::from_micros(0), vec![1.0]).is_err());
    }

    #[test]
    fn longitude_wraps_at_180() {
        let mut o = Origin::new(MicroTime::from_micros(0), 40.0, 0.0, 0.0, 1).unwrap();
        o.set_longitude(200.0);
        assert_eq!(o.longitude(), -160.0);
        o.set_longitude(-200.0);
        assert_eq!(o.longitude(), 160.0);
        o.set_longitude(180.0);
        assert_eq!(o.longitude(), -180.0);
    }

    #[test]
    fn setting_identifier_propagates_to_arrivals() {
        let mut o = Origin::new(MicroTime::from_micros(0), 40.0, -111.0, 5000.0, 0).unwrap();
        let pick = Pick::new(ch(), MicroTime::from_micros(1_000_000), 7);
        o.add_arrival(Arrival::new(pick.clone(), Phase::P));
        o.add_arrival(Arrival::new(pick, Phase::P));
        o.set_identifier(42);
        assert_eq!(o.identifier, 42);
        for arrival in &o.arrivals {
            assert_eq!(arrival.origin_identifier, Some(42));
        }
    }

    #[test]
    fn uncertainty_bounds_validate_invariant() {
        let lower = UncertaintyBound {
            percentile: 10.0,
            perturbation_micros: -500,
        };
        let upper = UncertaintyBound {
            percentile: 90.0,
            perturbation_micros: 500,
        };
        assert!(UncertaintyBounds::new(lower, upper).is_ok());

        let bad_upper = UncertaintyBound {
            percentile: 5.0,
            perturbation_micros: 500,
        };
        assert!(UncertaintyBounds::new(lower, bad_upper).is_err());
    }

    #[test]
    fn rejects_out_of_range_latitude_and_depth() {
        assert!(Origin::new(MicroTime::from_micros(0), 95.0, 0.0, 0.0, 1).is_err());
        assert!(Origin::new(MicroTime::from_micros(0), 0.0, 0.0, 900_000.0, 1).is_err());
    }
}
