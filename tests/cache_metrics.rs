use std::collections::HashSet;
use std::sync::Arc;

use asksniff::cache::{
    CacheConfig, ContentCache, ContentKey, METRIC_CACHE_EVICT, METRIC_CACHE_HIT,
    METRIC_CACHE_MISS,
};
use asksniff::domain::types::AgeGroup;
use asksniff::infra::telemetry::METRIC_GATE_REDIRECT;
use asksniff::util::clock::{Clock, ManualClock};
use metrics_util::debugging::DebuggingRecorder;
use time::macros::datetime;

mod support;

#[tokio::test]
async fn cache_and_gate_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(datetime!(2026-10-16 09:00 UTC)));
    let cache = ContentCache::new(
        &CacheConfig {
            entry_limit: 1,
            ..CacheConfig::default()
        },
        clock,
    );

    let first = ContentKey::Heading {
        heading_id: 1,
        age_group: AgeGroup::UnderOneMonth,
    };
    let second = ContentKey::Symptom("rash".into());

    for key in [first.clone(), first, second] {
        let _: Option<String> = cache
            .get_or_compute(key, || async {
                Ok::<_, std::convert::Infallible>(Some("cached".to_string()))
            })
            .await
            .expect("infallible compute");
    }

    let mut app = support::TestApp::new();
    app.get("/homepage/")
        .await
        .assert_redirect("/disclaimer/?next=%2Fhomepage%2F");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        METRIC_CACHE_HIT,
        METRIC_CACHE_MISS,
        METRIC_CACHE_EVICT,
        METRIC_GATE_REDIRECT,
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
