//! CBOR wire codecs for the messages enumerated in spec §6.
//!
//! Every message carries `MessageType` and `MessageVersion` fields so a
//! subscriber can dispatch on type before attempting a full decode, and
//! drop/ log anything with an unrecognised type or version (spec §7 kind
//! 3, message-validity errors).

use crate::{
    Arrival, ChannelId, DataPacket, FirstMotion, MicroTime, Origin, Phase, PhaseHint, Pick,
    ProbabilityPacket, ReviewStatus, TypesError, UncertaintyBound, UncertaintyBounds,
};
use crate::error::WireError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const MESSAGE_VERSION: &str = "1.0.0";

/// Encode any wire DTO as CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)?;
    Ok(buf)
}

/// Decode CBOR bytes into a wire DTO.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    Ok(ciborium::de::from_reader(bytes)?)
}

fn channel_to_wire(channel: &ChannelId) -> String {
    format!(
        "{}.{}.{}.{}",
        channel.network, channel.station, channel.channel, channel.location
    )
}

fn channel_from_wire(s: &str) -> Result<ChannelId, WireError> {
    let mut parts = s.splitn(4, '.');
    let (Some(network), Some(station), Some(channel), Some(location)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(WireError::MalformedField(format!(
            "malformed channel identifier: {s}"
        )));
    };
    Ok(ChannelId::new(network, station, channel, location))
}

fn check_version(version: &str) -> Result<(), WireError> {
    if version != MESSAGE_VERSION {
        return Err(WireError::UnsupportedVersion(version.to_string()));
    }
    Ok(())
}

fn check_type(expected: &str, actual: &str) -> Result<(), WireError> {
    if expected != actual {
        return Err(WireError::UnexpectedMessageType {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------
// DataPacket
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketMessage {
    #[serde(rename = "MessageType")]
    pub message_type: String,
    #[serde(rename = "MessageVersion")]
    pub message_version: String,
    #[serde(rename = "Network")]
    pub network: String,
    #[serde(rename = "Station")]
    pub station: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "LocationCode")]
    pub location_code: String,
    #[serde(rename = "StartTime")]
    pub start_time: i64,
    #[serde(rename = "SamplingRate")]
    pub sampling_rate: f64,
    #[serde(rename = "Data")]
    pub data: Vec<f64>,
    #[serde(rename = "EndTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

impl From<&DataPacket> for PacketMessage {
    fn from(p: &DataPacket) -> Self {
        use crate::Packet as _;
        PacketMessage {
            message_type: "Packet".to_string(),
            message_version: MESSAGE_VERSION.to_string(),
            network: p.header.channel.network.clone(),
            station: p.header.channel.station.clone(),
            channel: p.header.channel.channel.clone(),
            location_code: p.header.channel.location.clone(),
            start_time: p.header.start_time.as_micros(),
            sampling_rate: p.header.sampling_rate_hz,
            data: p.samples.clone(),
            end_time: p.end_time().map(MicroTime::as_micros),
        }
    }
}

impl TryFrom<PacketMessage> for DataPacket {
    type Error = WireError;
    fn try_from(m: PacketMessage) -> Result<Self, WireError> {
        check_type("Packet", &m.message_type)?;
        check_version(&m.message_version)?;
        let channel = ChannelId::new(m.network, m.station, m.channel, m.location_code);
        DataPacket::new(
            channel,
            m.sampling_rate,
            MicroTime::from_micros(m.start_time),
            m.data,
        )
        .map_err(|e: TypesError| WireError::InvalidValue(e.to_string()))
    }
}

/// Encode a `DataPacket` to CBOR bytes per spec §6.
pub fn packet_to_message(p: &DataPacket) -> Result<Vec<u8>, WireError> {
    to_cbor(&PacketMessage::from(p))
}

/// Decode CBOR bytes into a `DataPacket`.
pub fn packet_from_message(bytes: &[u8]) -> Result<DataPacket, WireError> {
    from_cbor::<PacketMessage>(bytes)?.try_into()
}

// ---------------------------------------------------------------------
// ProbabilityPacket
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityPacketMessage {
    #[serde(rename = "MessageType")]
    pub message_type: String,
    #[serde(rename = "MessageVersion")]
    pub message_version: String,
    #[serde(rename = "Network")]
    pub network: String,
    #[serde(rename = "Station")]
    pub station: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "LocationCode")]
    pub location_code: String,
    #[serde(rename = "StartTime")]
    pub start_time: i64,
    #[serde(rename = "SamplingRate")]
    pub sampling_rate: f64,
    #[serde(rename = "Data")]
    pub data: Vec<f64>,
    #[serde(rename = "EndTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(rename = "Algorithm")]
    pub algorithm: String,
    #[serde(rename = "PositiveClassName")]
    pub positive_class_name: String,
    #[serde(rename = "NegativeClassName")]
    pub negative_class_name: String,
    #[serde(rename = "OriginalChannels")]
    pub original_channels: Vec<String>,
}

impl From<&ProbabilityPacket> for ProbabilityPacketMessage {
    fn from(p: &ProbabilityPacket) -> Self {
        use crate::Packet as _;
        ProbabilityPacketMessage {
            message_type: "ProbabilityPacket".to_string(),
            message_version: MESSAGE_VERSION.to_string(),
            network: p.header.channel.network.clone(),
            station: p.header.channel.station.clone(),
            channel: p.header.channel.channel.clone(),
            location_code: p.header.channel.location.clone(),
            start_time: p.header.start_time.as_micros(),
            sampling_rate: p.header.sampling_rate_hz,
            data: p.samples.clone(),
            end_time: p.end_time().map(MicroTime::as_micros),
            algorithm: p.algorithm.clone(),
            positive_class_name: p.positive_class_name.clone(),
            negative_class_name: p.negative_class_name.clone(),
            original_channels: p.original_channels.clone(),
        }
    }
}

impl TryFrom<ProbabilityPacketMessage> for ProbabilityPacket {
    type Error = WireError;
    fn try_from(m: ProbabilityPacketMessage) -> Result<Self, WireError> {
        check_type("ProbabilityPacket", &m.message_type)?;
        check_version(&m.message_version)?;
        let channel = ChannelId::new(m.network, m.station, m.channel, m.location_code);
        ProbabilityPacket::new(
            channel,
            m.sampling_rate,
            MicroTime::from_micros(m.start_time),
            m.data,
            m.positive_class_name,
            m.negative_class_name,
            m.algorithm,
            m.original_channels,
        )
        .map_err(|e: TypesError| WireError::InvalidValue(e.to_string()))
    }
}

pub fn probability_packet_to_message(p: &ProbabilityPacket) -> Result<Vec<u8>, WireError> {
    to_cbor(&ProbabilityPacketMessage::from(p))
}

pub fn probability_packet_from_message(bytes: &[u8]) -> Result<ProbabilityPacket, WireError> {
    from_cbor::<ProbabilityPacketMessage>(bytes)?.try_into()
}

// ---------------------------------------------------------------------
// Pick
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncertaintyBoundsMessage {
    #[serde(rename = "LowerPercentile")]
    pub lower_percentile: f64,
    #[serde(rename = "LowerPerturbation")]
    pub lower_perturbation: i64,
    #[serde(rename = "UpperPercentile")]
    pub upper_percentile: f64,
    #[serde(rename = "UpperPerturbation")]
    pub upper_perturbation: i64,
}

impl From<UncertaintyBounds> for UncertaintyBoundsMessage {
    fn from(b: UncertaintyBounds) -> Self {
        UncertaintyBoundsMessage {
            lower_percentile: b.lower.percentile,
            lower_perturbation: b.lower.perturbation_micros,
            upper_percentile: b.upper.percentile,
            upper_perturbation: b.upper.perturbation_micros,
        }
    }
}

impl TryFrom<UncertaintyBoundsMessage> for UncertaintyBounds {
    type Error = WireError;
    fn try_from(m: UncertaintyBoundsMessage) -> Result<Self, WireError> {
        UncertaintyBounds::new(
            UncertaintyBound {
                percentile: m.lower_percentile,
                perturbation_micros: m.lower_perturbation,
            },
            UncertaintyBound {
                percentile: m.upper_percentile,
                perturbation_micros: m.upper_perturbation,
            },
        )
        .map_err(|e| WireError::InvalidValue(e.to_string()))
    }
}

fn phase_hint_to_wire(hint: PhaseHint) -> &'static str {
    match hint {
        PhaseHint::P => "P",
        PhaseHint::S => "S",
        PhaseHint::Unknown => "Unknown",
    }
}

fn phase_hint_from_wire(s: &str) -> PhaseHint {
    match s {
        "P" => PhaseHint::P,
        "S" => PhaseHint::S,
        _ => PhaseHint::Unknown,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickMessage {
    #[serde(rename = "MessageType")]
    pub message_type: String,
    #[serde(rename = "MessageVersion")]
    pub message_version: String,
    #[serde(rename = "Network")]
    pub network: String,
    #[serde(rename = "Station")]
    pub station: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "LocationCode")]
    pub location_code: String,
    #[serde(rename = "Time")]
    pub time: i64,
    #[serde(rename = "Identifier")]
    pub identifier: u64,
    #[serde(rename = "UncertaintyBounds", skip_serializing_if = "Option::is_none")]
    pub uncertainty_bounds: Option<UncertaintyBoundsMessage>,
    #[serde(rename = "OriginalChannels", skip_serializing_if = "Option::is_none")]
    pub original_channels: Option<Vec<String>>,
    #[serde(rename = "PhaseHint", skip_serializing_if = "Option::is_none")]
    pub phase_hint: Option<String>,
    #[serde(rename = "FirstMotion")]
    pub first_motion: i8,
    #[serde(rename = "ReviewStatus")]
    pub review_status: u8,
    #[serde(rename = "ProcessingAlgorithms")]
    pub processing_algorithms: Vec<String>,
}

impl From<&Pick> for PickMessage {
    fn from(p: &Pick) -> Self {
        PickMessage {
            message_type: "Pick".to_string(),
            message_version: MESSAGE_VERSION.to_string(),
            network: p.channel.network.clone(),
            station: p.channel.station.clone(),
            channel: p.channel.channel.clone(),
            location_code: p.channel.location.clone(),
            time: p.time.as_micros(),
            identifier: p.identifier,
            uncertainty_bounds: p.uncertainty.map(UncertaintyBoundsMessage::from),
            original_channels: p
                .original_channels
                .as_ref()
                .map(|chs| chs.iter().map(channel_to_wire).collect()),
            phase_hint: p.phase_hint.map(phase_hint_to_wire).map(str::to_string),
            first_motion: p.first_motion.to_wire(),
            review_status: p.review_status.to_wire(),
            processing_algorithms: p.processing_algorithms.clone().unwrap_or_default(),
        }
    }
}

impl TryFrom<PickMessage> for Pick {
    type Error = WireError;
    fn try_from(m: PickMessage) -> Result<Self, WireError> {
        check_type("Pick", &m.message_type)?;
        check_version(&m.message_version)?;
        let channel = ChannelId::new(m.network, m.station, m.channel, m.location_code);
        let mut pick = Pick::new(channel, MicroTime::from_micros(m.time), m.identifier);
        pick.phase_hint = m.phase_hint.as_deref().map(phase_hint_from_wire);
        pick.first_motion = FirstMotion::from_wire(m.first_motion);
        pick.review_status = ReviewStatus::from_wire(m.review_status);
        if let Some(ub) = m.uncertainty_bounds {
            pick.uncertainty = Some(ub.try_into()?);
        }
        if let Some(chs) = m.original_channels {
            let parsed = chs
                .iter()
                .map(|s| channel_from_wire(s))
                .collect::<Result<Vec<_>, _>>()?;
            pick.original_channels = Some(parsed);
        }
        if !m.processing_algorithms.is_empty() {
            pick.processing_algorithms = Some(m.processing_algorithms);
        }
        Ok(pick)
    }
}

pub fn pick_to_message(p: &Pick) -> Result<Vec<u8>, WireError> {
    to_cbor(&PickMessage::from(p))
}

pub fn pick_from_message(bytes: &[u8]) -> Result<Pick, WireError> {
    from_cbor::<PickMessage>(bytes)?.try_into()
}

// ---------------------------------------------------------------------
// Origin / Arrival
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalMessage {
    #[serde(rename = "Network")]
    pub network: String,
    #[serde(rename = "Station")]
    pub station: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "LocationCode")]
    pub location_code: String,
    #[serde(rename = "Time")]
    pub time: i64,
    #[serde(rename = "Identifier")]
    pub identifier: u64,
    #[serde(rename = "Phase")]
    pub phase: String,
    #[serde(rename = "FirstMotion")]
    pub first_motion: i8,
    #[serde(rename = "ReviewStatus")]
    pub review_status: u8,
    #[serde(rename = "TravelTime", skip_serializing_if = "Option::is_none")]
    pub travel_time_seconds: Option<f64>,
    #[serde(rename = "Residual", skip_serializing_if = "Option::is_none")]
    pub residual_seconds: Option<f64>,
    #[serde(rename = "SignalToNoiseRatio", skip_serializing_if = "Option::is_none")]
    pub signal_to_noise_ratio: Option<f64>,
}

impl From<&Arrival> for ArrivalMessage {
    fn from(a: &Arrival) -> Self {
        ArrivalMessage {
            network: a.pick.channel.network.clone(),
            station: a.pick.channel.station.clone(),
            channel: a.pick.channel.channel.clone(),
            location_code: a.pick.channel.location.clone(),
            time: a.pick.time.as_micros(),
            identifier: a.pick.identifier,
            phase: match a.phase {
                Phase::P => "P".to_string(),
                Phase::S => "S".to_string(),
            },
            first_motion: a.pick.first_motion.to_wire(),
            review_status: a.pick.review_status.to_wire(),
            travel_time_seconds: a.travel_time_seconds,
            residual_seconds: a.residual_seconds,
            signal_to_noise_ratio: a.signal_to_noise_ratio,
        }
    }
}

impl TryFrom<ArrivalMessage> for Arrival {
    type Error = WireError;
    fn try_from(m: ArrivalMessage) -> Result<Self, WireError> {
        let channel = ChannelId::new(m.network, m.station, m.channel, m.location_code);
        let mut pick = Pick::new(channel, MicroTime::from_micros(m.time), m.identifier);
        pick.first_motion = FirstMotion::from_wire(m.first_motion);
        pick.review_status = ReviewStatus::from_wire(m.review_status);
        let phase = match m.phase.as_str() {
            "P" => Phase::P,
            "S" => Phase::S,
            other => {
                return Err(WireError::MalformedField(format!(
                    "unknown arrival phase: {other}"
                )))
            }
        };
        let mut arrival = Arrival::new(pick, phase);
        arrival.travel_time_seconds = m.travel_time_seconds;
        arrival.residual_seconds = m.residual_seconds;
        arrival.signal_to_noise_ratio = m.signal_to_noise_ratio;
        Ok(arrival)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginMessage {
    #[serde(rename = "MessageType")]
    pub message_type: String,
    #[serde(rename = "MessageVersion")]
    pub message_version: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Depth")]
    pub depth: f64,
    #[serde(rename = "Time")]
    pub time: i64,
    #[serde(rename = "Identifier")]
    pub identifier: u64,
    #[serde(rename = "ReviewStatus")]
    pub review_status: u8,
    #[serde(rename = "Algorithms")]
    pub algorithms: Vec<String>,
    #[serde(rename = "Arrivals", skip_serializing_if = "Option::is_none")]
    pub arrivals: Option<Vec<ArrivalMessage>>,
}

impl From<&Origin> for OriginMessage {
    fn from(o: &Origin) -> Self {
        OriginMessage {
            message_type: "Origin".to_string(),
            message_version: MESSAGE_VERSION.to_string(),
            latitude: o.latitude,
            longitude: o.longitude(),
            depth: o.depth_meters,
            time: o.time.as_micros(),
            identifier: o.identifier,
            review_status: o.review_status.to_wire(),
            algorithms: o.algorithms.clone(),
            arrivals: if o.arrivals.is_empty() {
                None
            } else {
                Some(o.arrivals.iter().map(ArrivalMessage::from).collect())
            },
        }
    }
}

impl TryFrom<OriginMessage> for Origin {
    type Error = WireError;
    fn try_from(m: OriginMessage) -> Result<Self, WireError> {
        check_type("Origin", &m.message_type)?;
        check_version(&m.message_version)?;
        let mut origin = Origin::new(
            MicroTime::from_micros(m.time),
            m.latitude,
            m.longitude,
            m.depth,
            m.identifier,
        )
        .map_err(|e| WireError::InvalidValue(e.to_string()))?;
        origin.review_status = ReviewStatus::from_wire(m.review_status);
        origin.algorithms = m.algorithms;
        if let Some(arrivals) = m.arrivals {
            for am in arrivals {
                origin.add_arrival(am.try_into()?);
            }
        }
        Ok(origin)
    }
}

pub fn origin_to_message(o: &Origin) -> Result<Vec<u8>, WireError> {
    to_cbor(&OriginMessage::from(o))
}

pub fn origin_from_message(bytes: &[u8]) -> Result<Origin, WireError> {
    from_cbor::<OriginMessage>(bytes)?.try_into()
}

// ---------------------------------------------------------------------
// AssociationRequest / AssociationResponse
// ---------------------------------------------------------------------

/// The reduced pick projection carried by association requests, per
/// spec §4.5: `{channel, time, phase hint, standard error, identifier}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssociationPick {
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Time")]
    pub time: i64,
    #[serde(rename = "PhaseHint", skip_serializing_if = "Option::is_none")]
    pub phase_hint: Option<String>,
    #[serde(rename = "StandardError")]
    pub standard_error_seconds: f64,
    #[serde(rename = "Identifier")]
    pub identifier: u64,
}

impl AssociationPick {
    pub fn channel_id(&self) -> Result<ChannelId, WireError> {
        channel_from_wire(&self.channel)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationRequestMessage {
    #[serde(rename = "MessageType")]
    pub message_type: String,
    #[serde(rename = "MessageVersion")]
    pub message_version: String,
    #[serde(rename = "Identifier")]
    pub identifier: u64,
    #[serde(rename = "Picks")]
    pub picks: Vec<AssociationPick>,
}

pub fn association_request_to_message(
    identifier: u64,
    picks: &[AssociationPick],
) -> Result<Vec<u8>, WireError> {
    to_cbor(&AssociationRequestMessage {
        message_type: "AssociationRequest".to_string(),
        message_version: MESSAGE_VERSION.to_string(),
        identifier,
        picks: picks.to_vec(),
    })
}

pub fn association_request_from_message(
    bytes: &[u8],
) -> Result<AssociationRequestMessage, WireError> {
    let m = from_cbor::<AssociationRequestMessage>(bytes)?;
    check_type("AssociationRequest", &m.message_type)?;
    check_version(&m.message_version)?;
    Ok(m)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationReturnCode {
    Success,
    InvalidRequest,
    AlgorithmicFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationResponseMessage {
    #[serde(rename = "MessageType")]
    pub message_type: String,
    #[serde(rename = "MessageVersion")]
    pub message_version: String,
    #[serde(rename = "Identifier")]
    pub identifier: u64,
    #[serde(rename = "ReturnCode")]
    pub return_code: AssociationReturnCode,
    #[serde(rename = "Origins")]
    pub origins: Vec<OriginMessage>,
    #[serde(rename = "UnassociatedPicks")]
    pub unassociated_picks: Vec<AssociationPick>,
}

#[allow(clippy::too_many_arguments)]
pub fn association_response_to_message(
    identifier: u64,
    return_code: AssociationReturnCode,
    origins: &[Origin],
    unassociated_picks: &[AssociationPick],
) -> Result<Vec<u8>, WireError> {
    let origins = origins.iter().map(OriginMessage::from).collect();
    to_cbor(&AssociationResponseMessage {
        message_type: "AssociationResponse".to_string(),
        message_version: MESSAGE_VERSION.to_string(),
        identifier,
        return_code,
        origins,
        unassociated_picks: unassociated_picks.to_vec(),
    })
}

pub fn association_response_from_message(
    bytes: &[u8],
) -> Result<(u64, AssociationReturnCode, Vec<Origin>, Vec<AssociationPick>), WireError> {
    let m = from_cbor::<AssociationResponseMessage>(bytes)?;
    check_type("AssociationResponse", &m.message_type)?;
    check_version(&m.message_version)?;
    let origins = m
        .origins
        .into_iter()
        .map(Origin::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((m.identifier, m.return_code, origins, m.unassociated_picks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Packet as _, PhaseHint, UncertaintyBound};

    fn ch() -> ChannelId {
        ChannelId::new("UU", "ABC", "HHZ", "01")
    }

    #[test]
    fn packet_round_trips() {
        let p = DataPacket::new(
            ch(),
            100.0,
            MicroTime::from_micros(1_000),
            vec![0.1, 0.2, 0.3],
        )
        .unwrap();
        let bytes = packet_to_message(&p).unwrap();
        let back = packet_from_message(&bytes).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn probability_packet_round_trips() {
        let p = ProbabilityPacket::new(
            ch(),
            100.0,
            MicroTime::from_micros(0),
            vec![0.1, 0.9],
            "P",
            "Noise",
            "phasenet",
            vec!["UU.ABC.HHZ.01".to_string()],
        )
        .unwrap();
        let bytes = probability_packet_to_message(&p).unwrap();
        let back = probability_packet_from_message(&bytes).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn pick_round_trips_with_all_optionals() {
        let mut p = Pick::new(ch(), MicroTime::from_micros(123_456), 9);
        p.phase_hint = Some(PhaseHint::P);
        p.first_motion = FirstMotion::Up;
        p.review_status = ReviewStatus::Manual;
        p.uncertainty = Some(
            UncertaintyBounds::new(
                UncertaintyBound {
                    percentile: 5.0,
                    perturbation_micros: -1000,
                },
                UncertaintyBound {
                    percentile: 95.0,
                    perturbation_micros: 1000,
                },
            )
            .unwrap(),
        );
        p.original_channels = Some(vec![ch()]);
        p.tag_algorithm("phasenet");

        let bytes = pick_to_message(&p).unwrap();
        let back = pick_from_message(&bytes).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn pick_round_trips_with_no_optionals() {
        let p = Pick::new(ch(), MicroTime::from_micros(0), 1);
        let bytes = pick_to_message(&p).unwrap();
        let back = pick_from_message(&bytes).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn origin_round_trips_with_arrivals() {
        let mut o = Origin::new(MicroTime::from_micros(0), 40.5, -111.8, 8000.0, 1).unwrap();
        let pick = Pick::new(ch(), MicroTime::from_micros(500_000), 2);
        let mut arrival = Arrival::new(pick, Phase::P);
        arrival.travel_time_seconds = Some(4.2);
        arrival.residual_seconds = Some(-0.05);
        o.add_arrival(arrival);
        o.set_identifier(77);

        let bytes = origin_to_message(&o).unwrap();
        let back = origin_from_message(&bytes).unwrap();
        assert_eq!(o, back);
    }

    #[test]
    fn rejects_wrong_message_type() {
        let p = DataPacket::new(ch(), 100.0, MicroTime::from_micros(0), vec![1.0]).unwrap();
        let bytes = pick_to_message(&Pick::new(ch(), MicroTime::from_micros(0), 1)).unwrap();
        // Feeding a Pick message to the Packet decoder must fail, not panic.
        assert!(packet_from_message(&bytes).is_err());
        let _ = p;
    }

    #[test]
    fn association_request_round_trips() {
        let picks = vec![AssociationPick {
            channel: channel_to_wire(&ch()),
            time: 1_000,
            phase_hint: Some("P".to_string()),
            standard_error_seconds: 0.05,
            identifier: 3,
        }];
        let bytes = association_request_to_message(42, &picks).unwrap();
        let decoded = association_request_from_message(&bytes).unwrap();
        assert_eq!(decoded.identifier, 42);
        assert_eq!(decoded.picks, picks);
    }
}
