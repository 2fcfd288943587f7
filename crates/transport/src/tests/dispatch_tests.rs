use super::*;
use crate::memory::MemoryTransport;
use tokio::sync::Mutex;

#[derive(Default)]
struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().await.push(duration);
    }
}

fn dispatcher(transport: &MemoryTransport, sleeper: &Arc<RecordingSleeper>) -> NotificationDispatcher {
    NotificationDispatcher::with_sleeper(
        Arc::new(transport.clone()),
        RetryPolicy::new(3, Duration::from_secs(1)),
        sleeper.clone(),
    )
}

#[test]
fn delay_doubles_per_attempt() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    assert_eq!(policy.delay_for(1), Duration::from_secs(2));
    assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    assert_eq!(policy.delay_for(40), Duration::from_secs(1).saturating_mul(u32::MAX));
}

#[test]
fn zero_attempt_policy_still_tries_once() {
    assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
}

#[tokio::test]
async fn first_attempt_success_never_waits() {
    let transport = MemoryTransport::new();
    let sleeper = Arc::new(RecordingSleeper::default());

    let report = dispatcher(&transport, &sleeper)
        .notify(ChatId(-1), &ViewMessage::text("order"))
        .await;

    assert!(report.is_delivered());
    assert_eq!(report.attempts, 1);
    assert!(report.waits.is_empty());
    assert_eq!(
        report.states,
        vec![
            DeliveryState::Idle,
            DeliveryState::Attempting(0),
            DeliveryState::Delivered(MessageHandle(1)),
        ]
    );
}

#[tokio::test]
async fn succeeds_on_third_attempt_after_two_backoffs() {
    let transport = MemoryTransport::new();
    transport.fail_next_channel_sends(2).await;
    let sleeper = Arc::new(RecordingSleeper::default());

    let report = dispatcher(&transport, &sleeper)
        .notify(ChatId(-1), &ViewMessage::text("order"))
        .await;

    assert!(report.is_delivered());
    assert_eq!(report.attempts, 3);
    assert_eq!(report.waits, vec![Duration::from_secs(1), Duration::from_secs(2)]);
    assert_eq!(
        *sleeper.waits.lock().await,
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    assert_eq!(transport.channel_attempts().await, 3);
    assert_eq!(transport.sent().await.len(), 1);
}

#[tokio::test]
async fn exhausts_after_bound_without_raising() {
    let transport = MemoryTransport::new();
    transport.set_channel_down(true).await;
    let sleeper = Arc::new(RecordingSleeper::default());

    let report = dispatcher(&transport, &sleeper)
        .notify(ChatId(-1), &ViewMessage::text("order"))
        .await;

    assert_eq!(transport.channel_attempts().await, 3);
    assert_eq!(sleeper.waits.lock().await.len(), 2);
    assert_eq!(report.attempts, 3);
    assert_eq!(report.states.last(), Some(&DeliveryState::Exhausted));
    match &report.outcome {
        DeliveryOutcome::Exhausted { last_error } => assert!(last_error.contains("unreachable")),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(
        report.into_result(),
        Err(OrderingError::NotificationExhausted { attempts: 3 })
    );
}

#[tokio::test]
async fn backoff_does_not_block_other_notifications() {
    let transport = MemoryTransport::new();
    transport.fail_next_channel_sends(1).await;
    let dispatcher = NotificationDispatcher::new(
        Arc::new(transport.clone()),
        RetryPolicy::new(2, Duration::from_millis(20)),
    );

    let first = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.notify(ChatId(-1), &ViewMessage::text("first")).await }
    });
    let second = dispatcher.notify(ChatId(-2), &ViewMessage::text("second")).await;
    let first = first.await.expect("join");

    // Exactly one of the two hit the scripted failure and backed off.
    assert!(first.is_delivered() && second.is_delivered());
    assert_eq!(first.waits.len() + second.waits.len(), 1);
    assert_eq!(transport.channel_attempts().await, 3);
}
