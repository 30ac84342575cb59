#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};

use super::test_helpers::*;
use super::*;
use crate::adapters::AdapterCapabilities;
use crate::notify::NotifierSet;
use crate::status::MemoryStatusRecorder;
use crate::types::{FailedTarget, ImageAttachment, ImageData, JobId, TargetStatus};

fn progress_of(event: &Event) -> (String, TargetStatus, u8) {
    match event {
        Event::Progress {
            target,
            status,
            progress,
            ..
        } => (target.clone(), *status, *progress),
        other => panic!("expected progress, got {other:?}"),
    }
}

fn registry(adapters: &[(&str, Arc<ScriptedAdapter>)]) -> AdapterRegistry {
    adapters
        .iter()
        .fold(AdapterRegistry::new(), |registry, (id, adapter)| {
            registry.with_adapter(id, adapter.clone())
        })
}

#[tokio::test]
async fn success_error_scheduled_end_to_end() {
    let retry_at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
    let a = Arc::new(ScriptedAdapter::new("a", Behavior::Succeed));
    let b = Arc::new(ScriptedAdapter::new("b", Behavior::Fail("rejected")));
    let c = Arc::new(ScriptedAdapter::new("c", Behavior::Schedule(retry_at)));
    let harness = Harness::new(registry(&[("a", a), ("b", b), ("c", c)]));

    let job = Job::new(["a", "b", "c"]).with_id("job-1").with_text("hello");
    let summary = harness.orchestrator.run(&job).await.unwrap();

    assert_eq!(summary.successful_targets, vec!["a", "c"]);
    assert_eq!(
        summary.failed_targets,
        vec![FailedTarget {
            target: "b".into(),
            reason: "rejected".into()
        }]
    );

    let events = harness.notifier.events();
    assert_eq!(events.len(), 4);
    assert_eq!(
        progress_of(&events[0]),
        ("a".into(), TargetStatus::Success, 33)
    );
    assert_eq!(progress_of(&events[1]), ("b".into(), TargetStatus::Error, 67));
    assert_eq!(
        progress_of(&events[2]),
        ("c".into(), TargetStatus::Scheduled, 100)
    );
    match &events[1] {
        Event::Progress { error, .. } => assert_eq!(error.as_deref(), Some("rejected")),
        _ => unreachable!(),
    }
    match &events[2] {
        Event::Progress { retry_at: got, .. } => assert_eq!(*got, Some(retry_at)),
        _ => unreachable!(),
    }
    match &events[3] {
        Event::Summary {
            job_id,
            status,
            summary: event_summary,
        } => {
            assert_eq!(job_id.as_str(), "job-1");
            assert_eq!(*status, SummaryStatus::Completed);
            assert_eq!(event_summary, &summary);
        }
        other => panic!("expected summary, got {other:?}"),
    }

    let id = JobId::from("job-1");
    let recorder = &harness.recorder;
    assert_eq!(recorder.len(), 4);
    assert_eq!(
        recorder.get(&id, "a").unwrap().status,
        TargetStatus::Success
    );
    let b_record = recorder.get(&id, "b").unwrap();
    assert_eq!(b_record.status, TargetStatus::Error);
    assert_eq!(b_record.error.as_deref(), Some("rejected"));
    assert_eq!(
        recorder.get(&id, "c").unwrap().retry_at,
        Some(retry_at)
    );
    let summary_record = recorder.get(&id, SUMMARY_TARGET).unwrap();
    assert_eq!(summary_record.status, TargetStatus::Error);
    assert_eq!(summary_record.error.as_deref(), Some("b"));
}

#[tokio::test]
async fn every_target_yields_one_event_and_progress_is_monotonic() {
    let ids = ["t0", "t1", "t2", "t3", "t4", "t5", "t6"];
    let registry = ids.iter().enumerate().fold(AdapterRegistry::new(), |r, (i, id)| {
        let behavior = if i % 3 == 1 {
            Behavior::Fail("nope")
        } else {
            Behavior::Succeed
        };
        r.with_adapter(id, Arc::new(ScriptedAdapter::new(id, behavior)))
    });
    let harness = Harness::new(registry);

    let summary = harness
        .orchestrator
        .run(&Job::new(ids).with_text("x"))
        .await
        .unwrap();
    assert_eq!(summary.total(), ids.len());

    let events = harness.notifier.events();
    assert_eq!(events.len(), ids.len() + 1);
    let percents: Vec<u8> = events[..ids.len()]
        .iter()
        .map(|e| progress_of(e).2)
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.iter().all(|p| (1..=100).contains(p)));

    let targets: Vec<String> = events[..ids.len()]
        .iter()
        .map(|e| progress_of(e).0)
        .collect();
    assert_eq!(targets, ids);
    assert!(matches!(events.last(), Some(Event::Summary { .. })));
}

#[tokio::test]
async fn failing_panicking_or_hanging_target_does_not_affect_others() {
    for behavior in [Behavior::Fail("boom"), Behavior::Panic, Behavior::Hang] {
        let bad = Arc::new(ScriptedAdapter::new("bad", behavior.clone()));
        let good = Arc::new(ScriptedAdapter::new("good", Behavior::Succeed));
        let harness = Harness::new(registry(&[("bad", bad), ("good", good.clone())]));

        let summary = harness
            .orchestrator
            .run(&Job::new(["bad", "good"]).with_text("x"))
            .await
            .unwrap();

        assert_eq!(summary.successful_targets, vec!["good"], "{behavior:?}");
        assert_eq!(summary.failed_targets.len(), 1, "{behavior:?}");
        assert_eq!(summary.failed_targets[0].target, "bad");
        assert_eq!(good.calls(), 1);
    }
}

#[tokio::test]
async fn panic_and_timeout_reasons_are_reported() {
    let panicky = Arc::new(ScriptedAdapter::new("panicky", Behavior::Panic));
    let slow = Arc::new(ScriptedAdapter::new("slow", Behavior::Hang));
    let harness = Harness::new(registry(&[("panicky", panicky), ("slow", slow)]));

    let started = Instant::now();
    let summary = harness
        .orchestrator
        .run(&Job::new(["panicky", "slow"]).with_text("x"))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    let reasons: Vec<&str> = summary
        .failed_targets
        .iter()
        .map(|f| f.reason.as_str())
        .collect();
    assert!(reasons[0].contains("panicked"), "{reasons:?}");
    assert!(reasons[0].contains("panicky blew up"), "{reasons:?}");
    assert!(reasons[1].contains("timed out"), "{reasons:?}");
}

#[tokio::test]
async fn scheduled_counts_as_success_with_retry_at() {
    let retry_at = Utc::now() + chrono::Duration::hours(24);
    let tumblr = Arc::new(ScriptedAdapter::new("tumblr", Behavior::Schedule(retry_at)));
    let harness = Harness::new(registry(&[("tumblr", tumblr)]));

    let summary = harness
        .orchestrator
        .run(&Job::new(["tumblr"]).with_text("x"))
        .await
        .unwrap();
    assert_eq!(summary.successful_targets, vec!["tumblr"]);
    assert!(summary.failed_targets.is_empty());

    match &harness.notifier.events()[0] {
        Event::Progress {
            status,
            retry_at: got,
            progress,
            ..
        } => {
            assert_eq!(*status, TargetStatus::Scheduled);
            assert_eq!(*got, Some(retry_at));
            assert_eq!(*progress, 100);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn empty_targets_are_rejected_without_side_effects() {
    let a = Arc::new(ScriptedAdapter::new("a", Behavior::Succeed));
    let harness = Harness::new(registry(&[("a", a.clone())]));

    let err = harness
        .orchestrator
        .run(&Job::new(Vec::<String>::new()).with_text("x"))
        .await
        .unwrap_err();

    assert_eq!(err, ValidationError::NoTargets);
    assert!(harness.notifier.events().is_empty());
    assert!(harness.recorder.is_empty());
    assert_eq!(a.calls(), 0);
}

#[tokio::test]
async fn blank_and_duplicate_targets_are_rejected() {
    let harness = Harness::new(AdapterRegistry::new());

    let err = harness
        .orchestrator
        .run(&Job::new(["tumblr", "  "]))
        .await
        .unwrap_err();
    assert_eq!(err, ValidationError::EmptyTarget { index: 1 });

    let err = harness
        .orchestrator
        .run(&Job::new(["twitter", "X"]))
        .await
        .unwrap_err();
    assert_eq!(err, ValidationError::DuplicateTarget("X".into()));

    assert!(harness.notifier.events().is_empty());
    assert!(harness.recorder.is_empty());
}

#[tokio::test]
async fn summary_record_name_is_not_a_valid_target() {
    let a = Arc::new(ScriptedAdapter::new("a", Behavior::Succeed));
    let harness = Harness::new(registry(&[("a", a.clone())]));

    let err = harness
        .orchestrator
        .run(&Job::new(["a", " _SUMMARY "]).with_text("x"))
        .await
        .unwrap_err();

    assert_eq!(err, ValidationError::ReservedTarget(" _SUMMARY ".into()));
    assert!(harness.notifier.events().is_empty());
    assert!(harness.recorder.is_empty());
    assert_eq!(a.calls(), 0);
}

#[tokio::test]
async fn adapter_option_validation_gates_the_whole_job() {
    let tumblr = Arc::new(ScriptedAdapter::new("tumblr", Behavior::Succeed).requiring("blogName"));
    let other = Arc::new(ScriptedAdapter::new("other", Behavior::Succeed));
    let harness = Harness::new(registry(&[("tumblr", tumblr.clone()), ("other", other.clone())]));

    let err = harness
        .orchestrator
        .run(&Job::new(["other", "tumblr"]).with_text("x"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ValidationError::MissingTargetOption {
            target: "tumblr".into(),
            option: "blogName".into()
        }
    );
    assert_eq!(other.calls(), 0);
    assert!(harness.recorder.is_empty());

    let job = Job::new(["other", "tumblr"])
        .with_text("x")
        .with_options("Tumblr", TargetOptions::default().with("blogName", "myblog"));
    let summary = harness.orchestrator.run(&job).await.unwrap();
    assert_eq!(summary.successful_targets, vec!["other", "tumblr"]);
}

#[tokio::test]
async fn unknown_and_unconfigured_targets_fail_individually() {
    let a = Arc::new(ScriptedAdapter::new("a", Behavior::Succeed));
    let harness = Harness::new(registry(&[("a", a.clone())]));

    let summary = harness
        .orchestrator
        .run(&Job::new(["myspace", "a", "threads"]).with_text("x"))
        .await
        .unwrap();

    assert_eq!(summary.successful_targets, vec!["a"]);
    let failed: Vec<&str> = summary
        .failed_targets
        .iter()
        .map(|f| f.target.as_str())
        .collect();
    assert_eq!(failed, vec!["myspace", "threads"]);
    assert!(summary.failed_targets[0].reason.contains("myspace"));
    assert!(summary.failed_targets[1].reason.contains("threads"));
    assert_eq!(harness.notifier.events().len(), 4);
    assert_eq!(a.calls(), 1);
}

#[tokio::test]
async fn images_follow_affinity() {
    let a = Arc::new(ScriptedAdapter::new("a", Behavior::Succeed));
    let b = Arc::new(ScriptedAdapter::new("b", Behavior::Succeed));
    let harness = Harness::new(registry(&[("a", a.clone()), ("b", b.clone())]));

    let x = image(1);
    let y = image(2);
    let job = Job::new(["a", "b"])
        .with_image(ImageAttachment::for_targets(x.clone(), ["a"]))
        .with_image(ImageAttachment::for_all(y.clone()));
    harness.orchestrator.run(&job).await.unwrap();

    let a_images: Vec<ImageData> = a.received()[0]
        .images
        .iter()
        .map(|i| (*i.data).clone())
        .collect();
    let b_images: Vec<ImageData> = b.received()[0]
        .images
        .iter()
        .map(|i| (*i.data).clone())
        .collect();
    assert_eq!(a_images, vec![x, y.clone()]);
    assert_eq!(b_images, vec![y]);
}

#[tokio::test]
async fn max_images_truncates_routed_images() {
    let a = Arc::new(
        ScriptedAdapter::new("a", Behavior::Succeed)
            .with_capabilities(AdapterCapabilities::raw_bytes(Some(2))),
    );
    let harness = Harness::new(registry(&[("a", a.clone())]));

    let job = (0..5).fold(Job::new(["a"]), |job, i| {
        job.with_image(ImageAttachment::for_all(image(i)))
    });
    harness.orchestrator.run(&job).await.unwrap();

    let indices: Vec<usize> = a.received()[0].images.iter().map(|i| i.index).collect();
    assert_eq!(indices, vec![0, 1]);
}

#[tokio::test]
async fn hosted_url_targets_receive_uploaded_urls_once() {
    let hosted = Arc::new(
        ScriptedAdapter::new("hosted", Behavior::Succeed)
            .with_capabilities(AdapterCapabilities::hosted_url(None)),
    );
    let raw = Arc::new(ScriptedAdapter::new("raw", Behavior::Succeed));
    let host = Arc::new(StubHost::new(false));
    let harness = Harness::with_host(
        registry(&[("hosted", hosted.clone()), ("raw", raw.clone())]),
        host.clone(),
    );

    let job = Job::new(["hosted", "raw"])
        .with_image(ImageAttachment::for_all(image(1)))
        .with_image(ImageAttachment::for_all(image(1)))
        .with_image(ImageAttachment::for_targets(image(2), ["raw"]));
    let summary = harness.orchestrator.run(&job).await.unwrap();
    assert_eq!(summary.successful_targets, vec!["hosted", "raw"]);

    // identical payloads share one upload; raw-only images are never hosted
    assert_eq!(host.uploads(), 1);
    let hosted_content = &hosted.received()[0];
    assert_eq!(hosted_content.images.len(), 2);
    assert!(
        hosted_content
            .images
            .iter()
            .all(|i| i.hosted_url.as_deref() == Some("https://img.test/1"))
    );
    assert!(raw.received()[0].images.iter().all(|i| i.hosted_url.is_none()));
}

#[tokio::test]
async fn upload_failure_only_fails_hosted_targets_with_images() {
    let hosted = Arc::new(
        ScriptedAdapter::new("hosted", Behavior::Succeed)
            .with_capabilities(AdapterCapabilities::hosted_url(None)),
    );
    let raw = Arc::new(ScriptedAdapter::new("raw", Behavior::Succeed));
    let harness = Harness::with_host(
        registry(&[("hosted", hosted.clone()), ("raw", raw.clone())]),
        Arc::new(StubHost::new(true)),
    );

    let job = Job::new(["hosted", "raw"])
        .with_text("x")
        .with_image(ImageAttachment::for_all(image(1)));
    let summary = harness.orchestrator.run(&job).await.unwrap();

    assert_eq!(summary.successful_targets, vec!["raw"]);
    assert_eq!(
        summary.failed_targets,
        vec![FailedTarget {
            target: "hosted".into(),
            reason: UPLOAD_FAILED.into()
        }]
    );
    assert_eq!(hosted.calls(), 0);
    assert_eq!(raw.calls(), 1);
}

#[tokio::test]
async fn hosted_target_without_routed_images_ignores_upload_failure() {
    let hosted = Arc::new(
        ScriptedAdapter::new("hosted", Behavior::Succeed)
            .with_capabilities(AdapterCapabilities::hosted_url(None)),
    );
    let other = Arc::new(
        ScriptedAdapter::new("other", Behavior::Succeed)
            .with_capabilities(AdapterCapabilities::hosted_url(None)),
    );
    let harness = Harness::new(registry(&[("hosted", hosted.clone()), ("other", other)]));

    // no host configured, only "other" needs the image
    let job = Job::new(["hosted", "other"])
        .with_text("x")
        .with_image(ImageAttachment::for_targets(image(1), ["other"]));
    let summary = harness.orchestrator.run(&job).await.unwrap();

    assert_eq!(summary.successful_targets, vec!["hosted"]);
    assert_eq!(summary.failed_targets[0].target, "other");
    assert_eq!(hosted.calls(), 1);
}

#[tokio::test]
async fn recorder_and_notifier_failures_do_not_stop_the_job() {
    let a = Arc::new(ScriptedAdapter::new("a", Behavior::Succeed));
    let b = Arc::new(ScriptedAdapter::new("b", Behavior::Succeed));
    let recording = Arc::new(RecordingNotifier::default());
    let notifier = NotifierSet::new()
        .with(Arc::new(FailingNotifier))
        .with(recording.clone());
    let orchestrator = JobOrchestrator::new(
        Arc::new(registry(&[("a", a.clone()), ("b", b.clone())])),
        ImagePreparer::new(None, no_retry()),
        Arc::new(FailingRecorder),
        Arc::new(notifier),
        fast_settings(),
    );

    let summary = orchestrator
        .run(&Job::new(["a", "b"]).with_text("x"))
        .await
        .unwrap();

    assert_eq!(summary.successful_targets, vec!["a", "b"]);
    assert_eq!(recording.events().len(), 3);
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn failing_notifier_alone_does_not_stop_the_job() {
    let a = Arc::new(ScriptedAdapter::new("a", Behavior::Succeed));
    let recorder = Arc::new(MemoryStatusRecorder::new());
    let orchestrator = JobOrchestrator::new(
        Arc::new(registry(&[("a", a)])),
        ImagePreparer::new(None, no_retry()),
        recorder.clone(),
        Arc::new(FailingNotifier),
        fast_settings(),
    );

    let job = Job::new(["a"]).with_text("x");
    orchestrator.run(&job).await.unwrap();
    assert_eq!(recorder.len(), 2);
}

#[tokio::test]
async fn delay_applies_only_after_success_with_targets_remaining() {
    let settings = OrchestratorSettings {
        inter_target_delay: Duration::from_millis(150),
        target_timeout: Duration::from_secs(5),
    };

    // success then failure: one pause (after "ok", before "bad")
    let ok = Arc::new(ScriptedAdapter::new("ok", Behavior::Succeed));
    let bad = Arc::new(ScriptedAdapter::new("bad", Behavior::Fail("no")));
    let harness = Harness::with_settings(registry(&[("ok", ok), ("bad", bad)]), settings);
    let started = Instant::now();
    harness
        .orchestrator
        .run(&Job::new(["ok", "bad"]).with_text("x"))
        .await
        .unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(150), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "{elapsed:?}");

    // failure first, success last: no pause at all
    let ok = Arc::new(ScriptedAdapter::new("ok", Behavior::Succeed));
    let bad = Arc::new(ScriptedAdapter::new("bad", Behavior::Fail("no")));
    let harness = Harness::with_settings(registry(&[("ok", ok), ("bad", bad)]), settings);
    let started = Instant::now();
    harness
        .orchestrator
        .run(&Job::new(["bad", "ok"]).with_text("x"))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_millis(150));
}

#[tokio::test]
async fn options_reach_the_adapter_by_canonical_id() {
    let twitter = Arc::new(ScriptedAdapter::new("twitter", Behavior::Succeed).requiring("handle"));
    let harness = Harness::new(registry(&[("twitter", twitter.clone())]));

    let job = Job::new(["X"])
        .with_text("x")
        .with_options("twitter", TargetOptions::default().with("handle", "@me"));
    let summary = harness.orchestrator.run(&job).await.unwrap();

    assert_eq!(summary.successful_targets, vec!["X"]);
    assert_eq!(twitter.calls(), 1);
}

#[tokio::test]
async fn direct_publish_returns_the_result_without_events_or_records() {
    let a = Arc::new(ScriptedAdapter::new("a", Behavior::Succeed));
    let b = Arc::new(ScriptedAdapter::new("b", Behavior::Fail("rejected")));
    let harness = Harness::new(registry(&[("a", a.clone()), ("b", b)]));

    let result = harness
        .orchestrator
        .publish_direct(&Job::new(["A"]).with_text("x"))
        .await
        .unwrap();
    assert!(result.is_success());
    assert_eq!(a.calls(), 1);

    let result = harness
        .orchestrator
        .publish_direct(&Job::new(["b"]).with_text("x"))
        .await
        .unwrap();
    assert_eq!(result, TargetResult::failure("rejected", false));

    assert!(harness.notifier.events().is_empty());
    assert!(harness.recorder.is_empty());
}

#[tokio::test]
async fn direct_publish_hosts_images_for_url_targets() {
    let hosted = Arc::new(
        ScriptedAdapter::new("hosted", Behavior::Succeed)
            .with_capabilities(AdapterCapabilities::hosted_url(None)),
    );
    let host = Arc::new(StubHost::new(false));
    let harness = Harness::with_host(registry(&[("hosted", hosted.clone())]), host.clone());

    let job = Job::new(["hosted"]).with_image(ImageAttachment::for_all(image(3)));
    harness.orchestrator.publish_direct(&job).await.unwrap();

    assert_eq!(host.uploads(), 1);
    assert_eq!(
        hosted.received()[0].images[0].hosted_url.as_deref(),
        Some("https://img.test/1")
    );
}

#[tokio::test]
async fn direct_publish_reports_missing_adapters_and_bad_options() {
    let tumblr = Arc::new(ScriptedAdapter::new("tumblr", Behavior::Succeed).requiring("blogName"));
    let harness = Harness::new(registry(&[("tumblr", tumblr.clone())]));

    let err = harness
        .orchestrator
        .publish_direct(&Job::new(["threads"]).with_text("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TargetNotConfigured(ref t) if t == "threads"));

    let err = harness
        .orchestrator
        .publish_direct(&Job::new(["myspace"]).with_text("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTarget(_)));

    let err = harness
        .orchestrator
        .publish_direct(&Job::new(["tumblr"]).with_text("x"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::MissingTargetOption { .. })
    ));
    assert_eq!(tumblr.calls(), 0);
}
