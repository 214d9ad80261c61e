//! Dispatcher behavior tests: priority ordering, retry exhaustion,
//! readback verification, and congestion admission.

use std::sync::Arc;
use std::time::Duration;

use sector_core::{TransmissionPriority, TransmissionStatus, Urgency};
use sector_server::dispatch::{DispatchSettings, Dispatcher, TransmissionRequest};
use sector_server::synth::SilentSynthesizer;

fn dispatcher(ack_timeout_ms: u64, max_retries: u32, congestion_limit: usize) -> Dispatcher {
    Dispatcher::new(
        Arc::new(SilentSynthesizer),
        DispatchSettings {
            ack_timeout: Duration::from_millis(ack_timeout_ms),
            max_retries,
            congestion_window: chrono::Duration::seconds(60),
            congestion_limit,
        },
    )
}

fn request(priority: TransmissionPriority, message: &str) -> TransmissionRequest {
    TransmissionRequest {
        callsign: "UAL123".to_string(),
        message: message.to_string(),
        priority,
        urgency: Urgency::Routine,
        frequency_mhz: 132.4,
        alert_id: None,
    }
}

#[tokio::test]
async fn emergency_dispatches_before_advisory() {
    let dispatcher = dispatcher(20, 0, 100);

    let advisory = dispatcher
        .enqueue(request(TransmissionPriority::Advisory, "advisory message"))
        .await;
    let emergency = dispatcher
        .enqueue(request(TransmissionPriority::Emergency, "go around"))
        .await;

    // With zero retries the first drive runs one transmission to FAILED
    assert!(dispatcher.drive_next().await);

    let settled = dispatcher.lookup(&emergency.id).expect("emergency settled");
    assert_eq!(settled.status, TransmissionStatus::Failed);
    // The advisory is still queued, untouched
    assert!(dispatcher.lookup(&advisory.id).is_none());
    assert_eq!(dispatcher.queue_status().advisory_count, 1);
}

#[tokio::test]
async fn unacknowledged_transmission_retries_then_fails() {
    let dispatcher = dispatcher(20, 2, 100);

    let tx = dispatcher
        .enqueue(request(TransmissionPriority::Routine, "climb and maintain"))
        .await;
    assert_eq!(tx.status, TransmissionStatus::Queued);

    let mut drives = 0;
    while dispatcher.drive_next().await {
        drives += 1;
        assert!(drives <= 10, "dispatcher failed to converge");
    }

    // Initial attempt plus exactly two retries
    assert_eq!(drives, 3);
    let settled = dispatcher.lookup(&tx.id).expect("settled");
    assert_eq!(settled.status, TransmissionStatus::Failed);
    assert_eq!(settled.retry_count, 2);
    assert_eq!(dispatcher.stats().failed, 1);
}

#[tokio::test]
async fn correct_readback_confirms_transmission() {
    let dispatcher = Arc::new(dispatcher(2000, 2, 100));

    let tx = dispatcher
        .enqueue(request(
            TransmissionPriority::Routine,
            "descend and maintain flight level 240",
        ))
        .await;

    let driver = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.drive_next().await })
    };

    // Let the transmission reach the awaiting-readback state
    tokio::time::sleep(Duration::from_millis(50)).await;
    let assessment = dispatcher
        .submit_readback(&tx.id, "descend and maintain flight level 240")
        .expect("transmission awaiting readback");
    assert!(assessment.is_correct);

    assert!(driver.await.unwrap());
    let settled = dispatcher.lookup(&tx.id).expect("settled");
    assert_eq!(settled.status, TransmissionStatus::Confirmed);
    assert!(settled.confirmed_at.is_some());
    assert_eq!(dispatcher.stats().confirmed, 1);
}

#[tokio::test]
async fn wrong_altitude_readback_is_critical_and_incorrect() {
    let dispatcher = Arc::new(dispatcher(2000, 2, 100));

    let tx = dispatcher
        .enqueue(request(
            TransmissionPriority::Critical,
            "descend and maintain flight level 240",
        ))
        .await;

    let driver = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.drive_next().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let assessment = dispatcher
        .submit_readback(&tx.id, "down to flight level 340")
        .expect("transmission awaiting readback");
    assert!(!assessment.is_correct);
    assert!(assessment.critical_error);

    driver.await.unwrap();
    let settled = dispatcher.lookup(&tx.id).expect("settled");
    assert_eq!(settled.status, TransmissionStatus::Incorrect);
    assert_eq!(dispatcher.stats().incorrect, 1);
}

#[tokio::test]
async fn readback_for_unknown_transmission_is_rejected() {
    let dispatcher = dispatcher(20, 0, 100);
    assert!(dispatcher.submit_readback("no-such-id", "roger").is_err());
}

#[tokio::test]
async fn congestion_defers_routine_but_not_emergency() {
    // One recent transmission saturates the channel
    let dispatcher = dispatcher(20, 0, 1);

    dispatcher
        .enqueue(request(TransmissionPriority::Routine, "first"))
        .await;
    assert!(dispatcher.drive_next().await);

    dispatcher
        .enqueue(request(TransmissionPriority::Routine, "second"))
        .await;
    assert!(
        !dispatcher.drive_next().await,
        "routine should wait for the channel to clear"
    );
    assert_eq!(dispatcher.queue_status().queue_length, 1);
    assert!(dispatcher.channel_status(132.4).is_congested);

    dispatcher
        .enqueue(request(TransmissionPriority::Emergency, "go around"))
        .await;
    assert!(
        dispatcher.drive_next().await,
        "emergency bypasses congestion"
    );
}
