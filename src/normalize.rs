use crate::error::{EtlError, Result};
use crate::lookup::TimeLookup;
use crate::types::{EnrichedMeetingRecord, RawMeetingRecord};
use chrono::{Duration, NaiveTime};
use std::sync::Arc;
use tracing::debug;

/// Turns one raw meeting into an enriched one by resolving its UTC
/// offset and shifting the local schedule to UTC.
pub struct Normalizer {
    lookup: Arc<dyn TimeLookup>,
}

impl Normalizer {
    pub fn new(lookup: Arc<dyn TimeLookup>) -> Self {
        Self { lookup }
    }

    /// Per-record entry point. Errors are values for the pipeline to
    /// match on; a failed record never aborts anything here.
    pub async fn normalize(&self, raw: &RawMeetingRecord) -> Result<EnrichedMeetingRecord> {
        let offset_hours = self.resolve_offset(raw).await?;

        let start_time = parse_start_time(&raw.start_time)?;
        let duration = parse_duration(&raw.duration_time)?;

        let utc_start_time = shift_to_utc(start_time, offset_hours);
        let (utc_end_time, _) = utc_start_time.overflowing_add_signed(duration);

        debug!(
            meeting_id = %raw.id_bigint,
            offset_hours,
            %utc_start_time,
            %utc_end_time,
            "Normalized meeting schedule"
        );

        Ok(EnrichedMeetingRecord {
            raw: raw.clone(),
            utc_offset_hours: offset_hours,
            utc_start_time,
            utc_end_time,
        })
    }

    /// Offset resolution order: timezone identifier first, then the
    /// coordinate fallback. A record with neither never touches the
    /// network. Lookup errors propagate and fail the record.
    async fn resolve_offset(&self, raw: &RawMeetingRecord) -> Result<f64> {
        let mut offset_hours = None;

        if !raw.time_zone.is_empty() {
            offset_hours = Some(self.lookup.offset_by_timezone(&raw.time_zone).await?);
        }

        if offset_hours.is_none() && !raw.latitude.is_empty() && !raw.longitude.is_empty() {
            if let Some(time_zone) = self
                .lookup
                .timezone_by_coordinates(&raw.latitude, &raw.longitude)
                .await?
            {
                offset_hours = Some(self.lookup.offset_by_timezone(&time_zone).await?);
            }
        }

        offset_hours.ok_or_else(|| {
            EtlError::Normalization(
                "UTC offset unresolved: no usable time zone or coordinates".to_string(),
            )
        })
    }
}

/// `start_time` is a bare 24-hour wall-clock time with no date.
fn parse_start_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .map_err(|e| EtlError::Normalization(format!("invalid start_time '{value}': {e}")))
}

/// Parses an `H:MM` or `H:MM:SS` elapsed span.
fn parse_duration(value: &str) -> Result<Duration> {
    let invalid = || EtlError::Normalization(format!("invalid duration_time '{value}'"));

    let parts: Vec<&str> = value.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m] => (*h, *m, "0"),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(invalid()),
    };

    let hours: i64 = hours.trim().parse().map_err(|_| invalid())?;
    let minutes: i64 = minutes.trim().parse().map_err(|_| invalid())?;
    let seconds: i64 = seconds.trim().parse().map_err(|_| invalid())?;
    if hours < 0 || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
        return Err(invalid());
    }

    // Upstream-controlled text: an absurd hour count must fail the
    // record, not overflow or trip chrono's duration bounds.
    let total_seconds = hours
        .checked_mul(3600)
        .and_then(|s| s.checked_add(minutes * 60 + seconds))
        .ok_or_else(invalid)?;
    Duration::try_seconds(total_seconds).ok_or_else(invalid)
}

/// Applies the local-to-UTC shift with sub-hour precision (+5:30 and
/// +5:45 zones exist), wrapping across midnight since there is no date.
fn shift_to_utc(local: NaiveTime, offset_hours: f64) -> NaiveTime {
    let offset_seconds = (offset_hours * 3600.0).round() as i64;
    let (utc, _) = local.overflowing_sub_signed(Duration::seconds(offset_seconds));
    utc
}
