//! Replicated associator worker (spec §4.5 concurrency model): N of
//! these can run side by side behind the same request queue, each
//! decoding a CBOR `AssociationRequest`, running [`AssociatorService`],
//! and encoding the `AssociationResponse`.

use std::sync::Arc;
use std::time::Duration;

use urts_config::ServiceConfig;
use urts_transport::{RequestClient, TransportError};
use urts_types::wire::{
    association_request_from_message, association_response_to_message, AssociationReturnCode,
};

use crate::error::AssociatorError;
use crate::service::AssociatorService;

/// Request/reply worker built on [`urts_transport::ReplyServer`],
/// speaking raw CBOR bytes at its boundary so it can sit behind the
/// same transport the picker pipeline's command surface uses.
pub struct AssociatorWorker {
    inner: urts_transport::ReplyServer<Vec<u8>, Vec<u8>>,
    service: Arc<AssociatorService>,
}

impl AssociatorWorker {
    pub fn new(service: Arc<AssociatorService>, config: &ServiceConfig) -> Self {
        Self {
            inner: urts_transport::ReplyServer::from_service_config(config),
            service,
        }
    }

    pub fn start(&self) {
        let service = self.service.clone();
        self.inner.start(move |request_bytes: Vec<u8>| {
            handle_request(&service, &request_bytes).unwrap_or_else(|encode_error| {
                tracing::error!(error = %encode_error, "failed to encode association response");
                Vec::new()
            })
        });
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    pub fn submit(&self, request_bytes: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.inner.request(request_bytes, timeout)
    }
}

fn handle_request(
    service: &AssociatorService,
    request_bytes: &[u8],
) -> Result<Vec<u8>, urts_types::error::WireError> {
    let (identifier, return_code, origins, unassociated) = match association_request_from_message(request_bytes) {
        Ok(request) => match service.associate(&request.picks, request.identifier) {
            Ok((code, origins, unassociated)) => (request.identifier, code, origins, unassociated),
            Err(AssociatorError::EmptyRequest) | Err(AssociatorError::MalformedChannel(_)) => {
                (request.identifier, AssociationReturnCode::InvalidRequest, Vec::new(), Vec::new())
            }
            Err(AssociatorError::NoKnownStations) | Err(AssociatorError::InvalidHypocenter(_)) => {
                (request.identifier, AssociationReturnCode::AlgorithmicFailure, Vec::new(), Vec::new())
            }
        },
        Err(decode_error) => {
            tracing::warn!(error = %decode_error, "dropping malformed association request");
            return Err(decode_error);
        }
    };

    association_response_to_message(identifier, return_code, &origins, &unassociated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corrections::CorrectionTable;
    use crate::region::RegionConfig;
    use crate::stations::StationCatalog;
    use crate::travel_time::ConstantVelocityModel;
    use urts_types::wire::{
        association_request_to_message, association_response_from_message, AssociationPick,
    };
    use urts_types::ChannelId;

    fn service_with_known_stations() -> Arc<AssociatorService> {
        let mut stations = StationCatalog::new();
        stations.insert(ChannelId::new("UU", "A", "HHZ", "01"), 40.3, -111.7);
        Arc::new(AssociatorService::new(
            RegionConfig::utah(),
            stations,
            Box::new(ConstantVelocityModel::continental_crust()),
            CorrectionTable::empty(),
        ))
    }

    #[test]
    fn worker_round_trips_an_association_request() {
        let config = ServiceConfig::new("associator", "inproc://associator");
        let worker = AssociatorWorker::new(service_with_known_stations(), &config);
        worker.start();

        let picks = vec![AssociationPick {
            channel: "UU.A.HHZ.01".to_string(),
            time: 1_000_000,
            phase_hint: Some("P".to_string()),
            standard_error_seconds: 0.05,
            identifier: 1,
        }];
        let request_bytes = association_request_to_message(42, &picks).unwrap();

        let response_bytes = worker.submit(request_bytes, Duration::from_millis(500)).unwrap();
        let (identifier, return_code, origins, unassociated) =
            association_response_from_message(&response_bytes).unwrap();

        assert_eq!(identifier, 42);
        assert_eq!(return_code, AssociationReturnCode::Success);
        assert!(origins.is_empty());
        assert_eq!(unassociated.len(), 1);

        worker.stop();
    }

    #[test]
    fn worker_reports_invalid_request_for_an_empty_pick_list() {
        let config = ServiceConfig::new("associator", "inproc://associator");
        let worker = AssociatorWorker::new(service_with_known_stations(), &config);
        worker.start();

        let request_bytes = association_request_to_message(7, &[]).unwrap();
        let response_bytes = worker.submit(request_bytes, Duration::from_millis(500)).unwrap();
        let (_, return_code, _, _) = association_response_from_message(&response_bytes).unwrap();

        assert_eq!(return_code, AssociationReturnCode::InvalidRequest);
        worker.stop();
    }
}
