//! Tests for the lazy-connecting forwarder.

use std::{sync::Arc, thread};

use parking_lot::Mutex;
use rstest::{fixture, rstest};

use crate::{
    connect::ConnectionEstablisher,
    destination::{Destination, Protocol},
    error::ForwarderError,
    test_utils::{CollectingSink, FakeResolver, FakeSocketFactory, Outcome},
    trust::TrustConfig,
};

use super::{LogForwarder, SharedLogForwarder};

#[fixture]
fn sink() -> CollectingSink {
    CollectingSink::new()
}

fn forwarder_with(
    resolver: FakeResolver,
    factory: &FakeSocketFactory,
    sink: &CollectingSink,
) -> LogForwarder {
    let destination = Destination::new("collector.example", 514, Protocol::Tcp).unwrap();
    LogForwarder::with_parts(
        destination,
        TrustConfig::default(),
        ConnectionEstablisher::new(Box::new(resolver), Box::new(factory.clone())),
        Box::new(sink.clone()),
    )
}

#[rstest]
fn does_not_connect_until_first_send(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([Outcome::Accept]);
    let mut forwarder = forwarder_with(FakeResolver::with_ports([1]), &factory, &sink);
    assert!(!forwarder.is_connected());
    assert_eq!(factory.opened(), 0);

    forwarder.send("hello").expect("send succeeds");
    assert!(forwarder.is_connected());
    assert_eq!(factory.opened(), 1);
}

#[rstest]
fn reuses_socket_across_sends(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([Outcome::Accept]);
    let mut forwarder = forwarder_with(FakeResolver::with_ports([1]), &factory, &sink);
    for record in ["a", "b", "c"] {
        forwarder.send(record).expect("send succeeds");
    }
    assert_eq!(factory.opened(), 1);
    assert_eq!(
        factory.written(),
        vec![b"a\n".to_vec(), b"b\n".to_vec(), b"c\n".to_vec()]
    );
    assert!(sink.collected().is_empty());
}

#[rstest]
fn write_failure_is_reported_once_and_swallowed(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([Outcome::AcceptFailingWrites]);
    let mut forwarder = forwarder_with(FakeResolver::with_ports([1]), &factory, &sink);

    forwarder.send("lost").expect("write errors never propagate");

    let reports = sink.collected();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("collector.example"));
    assert!(reports[0].contains("peer went away"));
    assert_eq!(forwarder.dropped(), 1);
}

#[rstest]
fn each_failed_send_notifies_sink(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([
        Outcome::AcceptFailingWrites,
        Outcome::AcceptFailingWrites,
        Outcome::AcceptFailingWrites,
    ]);
    let mut forwarder = forwarder_with(FakeResolver::with_ports([1]), &factory, &sink);
    for _ in 0..3 {
        forwarder.send("lost").expect("write errors never propagate");
    }
    assert_eq!(sink.collected().len(), 3);
    assert_eq!(factory.open_handles(), 0);
}

#[rstest]
fn failed_write_discards_socket_and_next_send_reconnects(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([Outcome::AcceptFailingWrites, Outcome::Accept]);
    let mut forwarder = forwarder_with(FakeResolver::with_ports([1]), &factory, &sink);

    forwarder.send("first").expect("swallowed");
    assert!(!forwarder.is_connected());
    assert_eq!(factory.open_handles(), 0);

    forwarder.send("second").expect("reconnects");
    assert_eq!(factory.opened(), 2);
    assert_eq!(factory.written(), vec![b"second\n".to_vec()]);
    assert_eq!(sink.collected().len(), 1);
}

#[rstest]
fn resolution_failure_propagates_without_sink_report(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([Outcome::Accept]);
    let mut forwarder = forwarder_with(FakeResolver::unknown_host(), &factory, &sink);
    let err = forwarder.send("record").expect_err("host is unknown");
    assert!(matches!(err, ForwarderError::Resolution { .. }));
    assert!(sink.collected().is_empty());
    assert!(!forwarder.is_connected());
}

#[rstest]
fn connection_failure_leaves_forwarder_retryable(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([Outcome::Refuse, Outcome::Accept]);
    let mut forwarder = forwarder_with(FakeResolver::with_ports([1]), &factory, &sink);

    let err = forwarder.send("early").expect_err("collector refuses");
    assert!(matches!(err, ForwarderError::Connection { attempts: 1, .. }));
    assert!(!forwarder.is_connected());
    assert_eq!(factory.open_handles(), 0);

    forwarder.send("later").expect("second attempt connects");
    assert_eq!(factory.written(), vec![b"later\n".to_vec()]);
    assert_eq!(forwarder.dropped(), 1);
}

#[rstest]
fn close_without_connecting_is_safe(sink: CollectingSink) {
    let factory = FakeSocketFactory::default();
    let mut forwarder = forwarder_with(FakeResolver::with_ports([1]), &factory, &sink);
    forwarder.close();
    forwarder.close();
    assert_eq!(factory.opened(), 0);
}

#[rstest]
fn close_releases_socket_and_send_reconnects(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([Outcome::Accept, Outcome::Accept]);
    let mut forwarder = forwarder_with(FakeResolver::with_ports([1]), &factory, &sink);
    forwarder.send("before").expect("send");
    forwarder.close();
    assert_eq!(factory.open_handles(), 0);
    forwarder.close();

    forwarder.send("after").expect("reconnects");
    assert_eq!(factory.opened(), 2);
}

#[rstest]
fn dropping_forwarder_closes_socket(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([Outcome::Accept]);
    let mut forwarder = forwarder_with(FakeResolver::with_ports([1]), &factory, &sink);
    forwarder.connect().expect("eager connect");
    assert_eq!(factory.open_handles(), 1);
    drop(forwarder);
    assert_eq!(factory.open_handles(), 0);
}

#[rstest]
fn send_bytes_is_verbatim(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([Outcome::Accept]);
    let mut forwarder = forwarder_with(FakeResolver::with_ports([1]), &factory, &sink);
    forwarder.send_bytes(b"raw").expect("send");
    assert_eq!(factory.written(), vec![b"raw".to_vec()]);
}

#[rstest]
fn closure_sinks_receive_reports() {
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let captured = Arc::clone(&seen);
    let factory = FakeSocketFactory::new([Outcome::AcceptFailingWrites]);
    let destination = Destination::new("collector.example", 514, Protocol::Udp).unwrap();
    let mut forwarder = LogForwarder::with_parts(
        destination,
        TrustConfig::default(),
        ConnectionEstablisher::new(
            Box::new(FakeResolver::with_ports([1])),
            Box::new(factory.clone()),
        ),
        Box::new(move |msg: &str| captured.lock().push(msg.to_owned())),
    );
    forwarder.send("lost").expect("swallowed");
    assert_eq!(seen.lock().len(), 1);
}

#[rstest]
fn shared_forwarder_connects_once_across_threads(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([Outcome::Accept]);
    let forwarder = Arc::new(SharedLogForwarder::new(forwarder_with(
        FakeResolver::with_ports([1]),
        &factory,
        &sink,
    )));

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let forwarder = Arc::clone(&forwarder);
            thread::spawn(move || {
                for n in 0..10 {
                    forwarder
                        .send(&format!("worker {worker} record {n}"))
                        .expect("send");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread");
    }

    assert_eq!(factory.opened(), 1);
    assert_eq!(factory.written().len(), 40);
    assert!(forwarder.is_connected());
    forwarder.close();
    assert_eq!(factory.open_handles(), 0);
}

#[rstest]
fn newline_terminated_record_is_not_terminated_twice(sink: CollectingSink) {
    let factory = FakeSocketFactory::new([Outcome::Accept]);
    let mut forwarder = forwarder_with(FakeResolver::with_ports([1]), &factory, &sink);
    forwarder.send("already framed\n").expect("send");
    forwarder.send("bare").expect("send");
    assert_eq!(
        factory.written(),
        vec![b"already framed\n".to_vec(), b"bare\n".to_vec()]
    );
}
