use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveTime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

use meeting_sync::error::{EtlError, Result as EtlResult};
use meeting_sync::lookup::TimeLookup;
use meeting_sync::normalize::Normalizer;
use meeting_sync::pipeline::BatchPipeline;
use meeting_sync::storage::{InMemoryMeetingStore, MeetingStore, SqliteMeetingStore};
use meeting_sync::types::RawMeetingRecord;

/// Lookup double with canned answers and call counters.
#[derive(Default)]
struct FakeTimeLookup {
    offsets: HashMap<String, f64>,
    coordinate_zones: HashMap<(String, String), String>,
    offset_calls: AtomicU32,
    coordinate_calls: AtomicU32,
}

#[async_trait]
impl TimeLookup for FakeTimeLookup {
    async fn offset_by_timezone(&self, time_zone: &str) -> EtlResult<f64> {
        self.offset_calls.fetch_add(1, Ordering::SeqCst);
        self.offsets
            .get(time_zone)
            .copied()
            .ok_or_else(|| EtlError::OffsetUnavailable {
                time_zone: time_zone.to_string(),
            })
    }

    async fn timezone_by_coordinates(&self, lat: &str, lon: &str) -> EtlResult<Option<String>> {
        self.coordinate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .coordinate_zones
            .get(&(lat.to_string(), lon.to_string()))
            .cloned())
    }
}

fn amsterdam_lookup() -> FakeTimeLookup {
    FakeTimeLookup {
        offsets: HashMap::from([("Europe/Amsterdam".to_string(), 1.0)]),
        coordinate_zones: HashMap::from([(
            ("52.37".to_string(), "4.89".to_string()),
            "Europe/Amsterdam".to_string(),
        )]),
        ..Default::default()
    }
}

fn meeting(id: &str) -> RawMeetingRecord {
    RawMeetingRecord {
        id_bigint: id.into(),
        meeting_name: format!("Meeting {id}"),
        time_zone: "Europe/Amsterdam".into(),
        start_time: "14:00:00".into(),
        duration_time: "01:30:00".into(),
        ..Default::default()
    }
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[tokio::test]
async fn amsterdam_meeting_is_enriched_to_utc() -> Result<()> {
    let pipeline = BatchPipeline::new(Normalizer::new(Arc::new(amsterdam_lookup())));

    let outcome = pipeline.process_batch(&[meeting("1")]).await;
    assert_eq!(outcome.enriched.len(), 1);

    let enriched = &outcome.enriched[0];
    assert_eq!(enriched.utc_offset_hours, 1.0);
    assert_eq!(enriched.utc_start_time, time(13, 0));
    assert_eq!(enriched.utc_end_time, time(14, 30));
    Ok(())
}

#[tokio::test]
async fn coordinates_fall_back_to_the_same_enrichment() -> Result<()> {
    let lookup = Arc::new(amsterdam_lookup());
    let pipeline = BatchPipeline::new(Normalizer::new(lookup.clone()));

    let mut raw = meeting("1");
    raw.time_zone.clear();
    raw.latitude = "52.37".into();
    raw.longitude = "4.89".into();

    let outcome = pipeline.process_batch(&[raw]).await;
    assert_eq!(outcome.enriched.len(), 1);

    let enriched = &outcome.enriched[0];
    assert_eq!(enriched.utc_offset_hours, 1.0);
    assert_eq!(enriched.utc_start_time, time(13, 0));
    assert_eq!(enriched.utc_end_time, time(14, 30));
    assert_eq!(lookup.coordinate_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn unresolvable_meeting_is_dropped_without_touching_the_rest() -> Result<()> {
    let lookup = Arc::new(amsterdam_lookup());
    let pipeline = BatchPipeline::new(Normalizer::new(lookup.clone()));

    let mut unresolvable = meeting("2");
    unresolvable.time_zone.clear();

    let outcome = pipeline
        .process_batch(&[meeting("1"), unresolvable, meeting("3")])
        .await;

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.failed, 1);
    let ids: Vec<&str> = outcome
        .enriched
        .iter()
        .map(|m| m.raw.id_bigint.as_str())
        .collect();
    assert_eq!(ids, vec!["1", "3"]);
    // The record with neither zone nor coordinates made no lookup calls:
    // two good records, one offset call each.
    assert_eq!(lookup.offset_calls.load(Ordering::SeqCst), 2);
    assert_eq!(lookup.coordinate_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn absurd_duration_drops_only_its_own_record() -> Result<()> {
    let pipeline = BatchPipeline::new(Normalizer::new(Arc::new(amsterdam_lookup())));

    let mut absurd = meeting("2");
    absurd.duration_time = "3000000000000:00".into();

    let outcome = pipeline
        .process_batch(&[meeting("1"), absurd, meeting("3")])
        .await;

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.failed, 1);
    let ids: Vec<&str> = outcome
        .enriched
        .iter()
        .map(|m| m.raw.id_bigint.as_str())
        .collect();
    assert_eq!(ids, vec!["1", "3"]);
    Ok(())
}

#[tokio::test]
async fn second_run_replaces_the_first_snapshot() -> Result<()> {
    let pipeline = BatchPipeline::new(Normalizer::new(Arc::new(amsterdam_lookup())));
    let store = InMemoryMeetingStore::new();
    store.ensure_schema().await?;

    let first = pipeline
        .process_batch(&[meeting("1"), meeting("2")])
        .await;
    store.replace_all(&first.enriched).await?;
    assert_eq!(store.count().await?, 2);

    let second = pipeline.process_batch(&[meeting("9")]).await;
    store.replace_all(&second.enriched).await?;

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].raw.id_bigint, "9");
    Ok(())
}

#[tokio::test]
async fn full_run_lands_in_sqlite() -> Result<()> {
    let dir = tempdir()?;
    let pipeline = BatchPipeline::new(Normalizer::new(Arc::new(amsterdam_lookup())));
    let store = SqliteMeetingStore::open(dir.path().join("meetings.db"))?;
    store.ensure_schema().await?;

    let mut bad = meeting("2");
    bad.duration_time = "ninety minutes".into();

    let outcome = pipeline
        .process_batch(&[meeting("1"), bad, meeting("3")])
        .await;
    let written = store.replace_all(&outcome.enriched).await?;

    assert_eq!(written, 2);
    assert_eq!(store.count().await?, 2);
    assert_eq!(store.meeting_ids()?, vec!["1", "3"]);
    Ok(())
}
