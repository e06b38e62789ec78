//! One-shot board listing.

use std::{sync::Arc, time::Duration};

use boardwatch::{
    board::BoardCandidate,
    discovery::DiscoveryBackend,
    lookup::VidPidClient,
    session::Instance,
    BoardListRequest, Error,
};
use tokio::time::Instant;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common::{self, FnLookup, ScriptedBackend};

fn request(instance: Instance, timeout_ms: u64) -> BoardListRequest {
    BoardListRequest {
        instance,
        timeout_ms,
    }
}

#[tokio::test(start_paused = true)]
async fn test_list_waits_then_identifies_in_discovery_order() {
    let backend = ScriptedBackend::listing(
        "serial",
        vec![
            common::plain_port("/dev/ttyS0"),
            common::usb_port("/dev/ttyACM0", "0x2341", "0x0043"),
            common::usb_port("/dev/ttyUSB0", "0x1a86", "0x7523"),
        ],
    );
    let remote = FnLookup::new(|_, _| {
        Ok(vec![BoardCandidate::new("CH340 board", "vendor:esp:ch340")])
    });
    let (service, instance) = common::service(
        vec![backend],
        common::signatures(common::UNO_SIGNATURES),
        remote.clone(),
    );

    let started = Instant::now();
    let listing = service.list(request(instance, 1500)).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(1500));

    let addresses: Vec<_> = listing.ports.iter().map(|p| p.port.address.as_str()).collect();
    assert_eq!(addresses, vec!["/dev/ttyS0", "/dev/ttyACM0", "/dev/ttyUSB0"]);

    assert!(listing.ports[0].matching_boards.is_empty());
    assert_eq!(listing.ports[1].matching_boards[0].fqbn, "arduino:avr:uno");
    assert_eq!(listing.ports[2].matching_boards[0].fqbn, "vendor:esp:ch340");
    assert!(listing.discovery_start_errors.is_empty());

    // Only the CH340 needed the remote service.
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn test_list_unknown_instance() {
    let (service, _) = common::service(
        vec![],
        common::no_signatures(),
        FnLookup::new(|_, _| Err(Error::NotFound)),
    );

    let err = service.list(request(Instance(999), 0)).await.unwrap_err();
    assert!(matches!(err.error, Error::InvalidInstance));
    assert!(err.discovery_start_errors.is_empty());
}

#[tokio::test]
async fn test_list_tolerates_backend_start_failure() {
    let working: Arc<dyn DiscoveryBackend> = ScriptedBackend::listing(
        "serial",
        vec![common::usb_port("/dev/ttyACM0", "0x2341", "0x0043")],
    );
    let broken: Arc<dyn DiscoveryBackend> = ScriptedBackend::broken("network");
    let (service, instance) = common::service(
        vec![broken, working],
        common::signatures(common::UNO_SIGNATURES),
        FnLookup::new(|_, _| Err(Error::NotFound)),
    );

    let listing = service.list(request(instance, 0)).await.unwrap();

    assert_eq!(listing.ports.len(), 1);
    assert_eq!(listing.ports[0].matching_boards[0].name, "Arduino Uno");
    assert_eq!(listing.discovery_start_errors.len(), 1);
    match &listing.discovery_start_errors[0] {
        Error::Discovery { backend, .. } => assert_eq!(backend, "network"),
        other => panic!("expected Discovery error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_list_unknown_board_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/0x2341/0x0043"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let remote = Arc::new(VidPidClient::new(server.uri(), Duration::from_secs(5)).unwrap());
    let backend = ScriptedBackend::listing(
        "serial",
        vec![common::usb_port("/dev/ttyACM0", "0x2341", "0x0043")],
    );
    let (service, instance) = common::service(vec![backend], common::no_signatures(), remote);

    let listing = service.list(request(instance, 0)).await.unwrap();

    assert_eq!(listing.ports.len(), 1);
    assert!(listing.ports[0].matching_boards.is_empty());
}

#[tokio::test]
async fn test_list_aborts_when_service_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let remote = Arc::new(VidPidClient::new(server.uri(), Duration::from_secs(5)).unwrap());
    let working: Arc<dyn DiscoveryBackend> = ScriptedBackend::listing(
        "serial",
        vec![
            common::usb_port("/dev/ttyACM0", "0x2341", "0x0043"),
            common::usb_port("/dev/ttyUSB0", "0x1a86", "0x7523"),
        ],
    );
    let broken: Arc<dyn DiscoveryBackend> = ScriptedBackend::broken("network");
    let (service, instance) = common::service(
        vec![working, broken],
        common::signatures(common::UNO_SIGNATURES),
        remote,
    );

    let err = service.list(request(instance, 0)).await.unwrap_err();

    match &err.error {
        Error::Unavailable { source, .. } => {
            assert!(matches!(**source, Error::Upstream(_)), "{:?}", source);
        }
        other => panic!("expected Unavailable, got {:?}", other),
    }
    // Start errors still reach the caller.
    assert_eq!(err.discovery_start_errors.len(), 1);
}

#[tokio::test]
async fn test_list_releases_lease() {
    let backend = ScriptedBackend::listing("serial", vec![common::plain_port("/dev/ttyS0")]);
    let (service, instance) = common::service(
        vec![backend],
        common::no_signatures(),
        FnLookup::new(|_, _| Err(Error::NotFound)),
    );

    service.list(request(instance, 0)).await.unwrap();
    assert_eq!(service.registry().active_leases(instance), 0);
}
