use super::*;
use alloc::rc::Rc;
use alloc::vec;
use core::cell::RefCell;

fn message(pgn: u32, priority: u8, source: u8, destination: u8) -> DecodedMessage {
    DecodedMessage {
        pgn,
        priority,
        source_address: source,
        destination_address: destination,
        payload: vec![0xAA; 3],
        timestamp: Instant::from_ticks(0),
        source_name: None,
        destination_name: None,
    }
}

#[test]
fn test_delivery_follows_registration_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut dispatcher = Dispatcher::new();

    for id in 0..3u8 {
        let log = Rc::clone(&log);
        dispatcher.subscribe(move |m: &DecodedMessage| {
            log.borrow_mut().push((id, m.pgn));
            Ok(())
        });
    }

    let report = dispatcher.dispatch(&message(0xFEF1, 6, 0x00, 0xFF));
    assert_eq!(report.delivered, 3);
    assert!(report.failures.is_empty());
    assert_eq!(
        *log.borrow(),
        vec![(0, 0xFEF1), (1, 0xFEF1), (2, 0xFEF1)]
    );
}

#[test]
fn test_failure_does_not_stop_delivery() {
    let received = Rc::new(RefCell::new(0usize));
    let mut dispatcher = Dispatcher::new();

    let failing = dispatcher.subscribe(|_: &DecodedMessage| Err(SubscriberError::Rejected));
    let counter = Rc::clone(&received);
    dispatcher.subscribe(move |_: &DecodedMessage| {
        *counter.borrow_mut() += 1;
        Ok(())
    });

    let report = dispatcher.dispatch(&message(0xFECA, 6, 0x00, 0xFF));
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failures, vec![(failing, SubscriberError::Rejected)]);
    assert_eq!(*received.borrow(), 1);
}

#[test]
fn test_unsubscribe() {
    let mut dispatcher = Dispatcher::new();
    let first = dispatcher.subscribe(|_: &DecodedMessage| Ok(()));
    let second = dispatcher.subscribe(|_: &DecodedMessage| Ok(()));
    assert_ne!(first, second);

    assert!(dispatcher.unsubscribe(first));
    assert!(!dispatcher.unsubscribe(first));
    assert_eq!(dispatcher.subscriber_count(), 1);

    let report = dispatcher.dispatch(&message(0xFECA, 6, 0x00, 0xFF));
    assert_eq!(report.delivered, 1);
}

#[test]
fn test_filtered_subscription() {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let mut dispatcher = Dispatcher::new();

    let sink = Rc::clone(&hits);
    dispatcher.subscribe_filtered(
        MessageFilter::any().with_pgns(&[0xFEF1, 0xF004]),
        move |m: &DecodedMessage| {
            sink.borrow_mut().push(m.pgn);
            Ok(())
        },
    );

    dispatcher.dispatch(&message(0xFEF1, 6, 0x00, 0xFF));
    let skipped = dispatcher.dispatch(&message(0xFECA, 6, 0x00, 0xFF));
    dispatcher.dispatch(&message(0xF004, 3, 0x00, 0xFF));

    assert_eq!(skipped.delivered, 0);
    assert_eq!(*hits.borrow(), vec![0xFEF1, 0xF004]);
}

#[test]
fn test_filter_criteria() {
    let by_priority = MessageFilter::any().with_max_priority(3);
    assert!(by_priority.matches(&message(0xF004, 3, 0x00, 0xFF)));
    assert!(!by_priority.matches(&message(0xF004, 6, 0x00, 0xFF)));

    let by_source = MessageFilter::any().from_source(0x17);
    assert!(by_source.matches(&message(0xFECA, 6, 0x17, 0xFF)));
    assert!(!by_source.matches(&message(0xFECA, 6, 0x18, 0xFF)));

    let by_destination = MessageFilter::any().to_destination(0x20);
    assert!(by_destination.matches(&message(0xEF00, 6, 0x17, 0x20)));
    assert!(by_destination.matches(&message(0xFECA, 6, 0x17, 0xFF)));
    assert!(!by_destination.matches(&message(0xEF00, 6, 0x17, 0x21)));

    assert!(MessageFilter::any().matches(&message(0, 7, 0xFE, 0x00)));
}
