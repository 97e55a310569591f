mod helpers;

use calendar_reminders_api::{
    execute, Application, CreateEventUseCase, GetEventUseCase, GetEventsForRemindUseCase,
    NotificationSender, ReminderScheduler,
};
use calendar_reminders_infra::{InMemoryBroker, QueueError, QueueManager};
use chrono::{Duration, Utc};
use helpers::setup::{spawn_app, test_context, RecordingNotifier};
use helpers::utils::{event_data, eventually};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn reminder_is_sent_and_acknowledged() {
    let app = spawn_app().await;
    let now = Utc::now();

    let event_id = execute(
        CreateEventUseCase {
            data: event_data(now + Duration::hours(1), now - Duration::seconds(1)),
        },
        &app.ctx,
    )
    .await
    .expect("To create event");

    let ctx = app.ctx.clone();
    let marked = eventually(|| {
        let ctx = ctx.clone();
        async move {
            execute(GetEventUseCase { event_id }, &ctx)
                .await
                .map(|e| e.remind_sent_time.is_some())
                .unwrap_or(false)
        }
    })
    .await;
    assert!(marked, "Reminder was never acknowledged");

    let sent = app.notifier.sent.lock().unwrap().clone();
    assert!(!sent.is_empty());
    assert!(sent.iter().all(|msg| msg.id == event_id));
    assert_eq!(sent[0].title, "Quarterly review");

    let due = execute(GetEventsForRemindUseCase, &app.ctx).await.unwrap();
    assert!(due.iter().all(|e| e.id != event_id));

    app.application.stop().await;
}

#[tokio::test]
async fn future_reminders_are_not_sent() {
    let app = spawn_app().await;
    let now = Utc::now();

    let event_id = execute(
        CreateEventUseCase {
            data: event_data(now + Duration::days(2), now + Duration::days(1)),
        },
        &app.ctx,
    )
    .await
    .expect("To create event");

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    assert!(app.notifier.sent.lock().unwrap().is_empty());
    let event = execute(GetEventUseCase { event_id }, &app.ctx).await.unwrap();
    assert!(event.remind_sent_time.is_none());

    app.application.stop().await;
}

// Walks a reminder through the pipeline one stage at a time
#[tokio::test]
async fn pipeline_stages() {
    let mut ctx = test_context();
    // Only the explicit poll below dispatches
    ctx.config.scheduler.period = std::time::Duration::from_secs(60 * 60);
    let broker = InMemoryBroker::new();
    let queue = ctx.config.scheduler.queue.clone();
    let ack_queue = ctx.config.scheduler.ack_queue();
    let now = Utc::now();

    let event_id = execute(
        CreateEventUseCase {
            data: event_data(now + Duration::hours(1), now - Duration::seconds(1)),
        },
        &ctx,
    )
    .await
    .unwrap();

    let scheduler_queues = QueueManager::new(Arc::new(broker.clone()), ctx.config.broker.clone());
    scheduler_queues.connect().await.unwrap();
    let scheduler = ReminderScheduler::new(ctx.clone(), &scheduler_queues)
        .await
        .unwrap();

    // One poll, one pending message
    assert_eq!(scheduler.dispatch_due_reminders().await, 1);
    assert_eq!(broker.queue_depth(&queue), 1);

    // The sender forwards it to the acknowledgement queue
    let sender_queues = QueueManager::new(Arc::new(broker.clone()), ctx.config.broker.clone());
    sender_queues.connect().await.unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let sender = NotificationSender::new(&ctx.config.scheduler, &sender_queues, notifier.clone())
        .await
        .unwrap();
    let shutdown = CancellationToken::new();
    let sender_job = sender.start(shutdown.clone()).await.unwrap();

    let (acks_broker, acks_name) = (&broker, ack_queue.as_str());
    assert!(eventually(|| async move { acks_broker.queue_depth(acks_name) == 1 }).await);
    assert_eq!(broker.queue_depth(&queue), 0);
    assert_eq!(notifier.sent.lock().unwrap().len(), 1);

    // Not marked until the scheduler consumes the acknowledgement
    let event = execute(GetEventUseCase { event_id }, &ctx).await.unwrap();
    assert!(event.remind_sent_time.is_none());

    let mut jobs = scheduler.start(shutdown.clone()).await.unwrap();
    jobs.push(sender_job);

    let marked = eventually(|| {
        let ctx = ctx.clone();
        async move {
            execute(GetEventUseCase { event_id }, &ctx)
                .await
                .map(|e| e.remind_sent_time.is_some())
                .unwrap_or(false)
        }
    })
    .await;
    assert!(marked);
    assert!(execute(GetEventsForRemindUseCase, &ctx).await.unwrap().is_empty());

    shutdown.cancel();
    for job in jobs {
        job.await.unwrap();
    }
}

// Scheduler and sender started as separate applications, the way they run
// as separate processes
#[tokio::test]
async fn scheduler_and_sender_run_apart() {
    let ctx = test_context();
    let broker = InMemoryBroker::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let now = Utc::now();

    let event_id = execute(
        CreateEventUseCase {
            data: event_data(now + Duration::hours(1), now - Duration::seconds(1)),
        },
        &ctx,
    )
    .await
    .unwrap();

    let scheduler = Application::scheduler(ctx.clone(), Arc::new(broker.clone()))
        .await
        .expect("To start the scheduler");
    let sender = Application::sender(&ctx.config, Arc::new(broker.clone()), notifier.clone())
        .await
        .expect("To start the sender");

    let marked = eventually(|| {
        let ctx = ctx.clone();
        async move {
            execute(GetEventUseCase { event_id }, &ctx)
                .await
                .map(|e| e.remind_sent_time.is_some())
                .unwrap_or(false)
        }
    })
    .await;
    assert!(marked);
    assert!(notifier.sent.lock().unwrap().iter().all(|msg| msg.id == event_id));

    sender.stop().await;
    scheduler.stop().await;
}

#[tokio::test]
async fn unreachable_broker_is_fatal() {
    let ctx = test_context();
    let broker = InMemoryBroker::new();
    broker.shut_down();

    let res = Application::sender(
        &ctx.config,
        Arc::new(broker.clone()),
        Arc::new(RecordingNotifier::default()),
    )
    .await;
    assert!(matches!(res, Err(QueueError::Connection(_))));

    let res = Application::scheduler(ctx, Arc::new(broker)).await;
    assert!(matches!(res, Err(QueueError::Connection(_))));
}

#[tokio::test]
async fn stops_with_an_unbounded_shutdown_timeout() {
    let mut ctx = test_context();
    ctx.config.shutdown_timeout = std::time::Duration::MAX;
    let app = Application::new(
        ctx,
        Arc::new(InMemoryBroker::new()),
        Arc::new(RecordingNotifier::default()),
    )
    .await
    .unwrap();

    tokio::time::timeout(std::time::Duration::from_secs(5), app.stop())
        .await
        .expect("Application to stop");
}
