use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// One meeting row exactly as the upstream directory returns it.
///
/// Every field is text on the wire; absent and empty-string are treated
/// the same throughout the pipeline, so missing keys default to `""`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawMeetingRecord {
    pub id_bigint: String,
    pub worldid_mixed: String,
    pub service_body_bigint: String,
    pub weekday_tinyint: String,
    pub venue_type: String,
    pub start_time: String,
    pub duration_time: String,
    pub time_zone: String,
    pub formats: String,
    pub longitude: String,
    pub latitude: String,
    pub root_server_uri: String,
    pub format_shared_id_list: String,
    pub meeting_name: String,
    pub location_text: String,
    pub location_info: String,
    pub location_street: String,
    pub location_neighborhood: String,
    pub location_municipality: String,
    pub location_sub_province: String,
    pub location_province: String,
    pub location_postal_code_1: String,
    pub contact_name_1: String,
    pub contact_phone_1: String,
    pub contact_email_1: String,
    pub contact_name_2: String,
    pub contact_phone_2: String,
    pub contact_email_2: String,
    pub phone_meeting_number: String,
    pub virtual_meeting_link: String,
    pub virtual_meeting_additional_info: String,
}

/// A raw meeting plus its resolved UTC schedule.
///
/// Composition rather than inheritance: the raw record rides along
/// unchanged (flattened on the wire so the JSON/DB shape stays flat)
/// next to the three derived fields. `start_time` carries no calendar
/// date upstream, so the UTC times are wall-clock times-of-day that
/// wrap across midnight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedMeetingRecord {
    #[serde(flatten)]
    pub raw: RawMeetingRecord,
    pub utc_offset_hours: f64,
    pub utc_start_time: NaiveTime,
    pub utc_end_time: NaiveTime,
}

/// Envelope for the directory search endpoint.
#[derive(Debug, Deserialize)]
pub struct DirectoryResponse {
    #[serde(default)]
    pub meetings: Vec<RawMeetingRecord>,
}

/// A UTC offset as reported by the timezone lookup service. Only
/// `seconds` is consumed; the other representations ride along.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UtcOffset {
    #[serde(default)]
    pub seconds: i32,
    #[serde(default)]
    pub milliseconds: i64,
    #[serde(default)]
    pub ticks: i64,
    #[serde(default)]
    pub nanoseconds: i64,
}

/// Response from the timezone → offset lookup.
///
/// `current_utc_offset` is optional on purpose: "offset present with
/// zero seconds" (UTC itself) and "offset absent" are distinct states,
/// and only the latter means the zone could not be resolved.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeZoneResponse {
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub current_utc_offset: Option<UtcOffset>,
}

/// Response from the coordinate → timezone lookup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateResponse {
    #[serde(default)]
    pub time_zone: Option<String>,
}
