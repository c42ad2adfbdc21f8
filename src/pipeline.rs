use crate::normalize::Normalizer;
use crate::types::{EnrichedMeetingRecord, RawMeetingRecord};
use tracing::{info, instrument, warn};

/// Summary of one batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Successfully enriched meetings, in input order.
    pub enriched: Vec<EnrichedMeetingRecord>,
    pub total: usize,
    pub failed: usize,
}

/// Drives the normalizer over a whole raw batch, one record at a time.
/// A failing record is logged and dropped; it never aborts the batch.
pub struct BatchPipeline {
    normalizer: Normalizer,
}

impl BatchPipeline {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    #[instrument(skip(self, raws), fields(total = raws.len()))]
    pub async fn process_batch(&self, raws: &[RawMeetingRecord]) -> BatchOutcome {
        let mut enriched = Vec::with_capacity(raws.len());
        let mut failed = 0usize;

        for raw in raws {
            match self.normalizer.normalize(raw).await {
                Ok(record) => enriched.push(record),
                Err(err) => {
                    failed += 1;
                    let serialized = serde_json::to_string(raw)
                        .unwrap_or_else(|_| "<unserializable record>".to_string());
                    warn!(
                        meeting_id = %raw.id_bigint,
                        error = %err,
                        record = %serialized,
                        "Skipping meeting that failed normalization"
                    );
                }
            }
        }

        info!(
            total = raws.len(),
            enriched = enriched.len(),
            failed,
            "Batch normalization finished"
        );

        BatchOutcome {
            total: raws.len(),
            failed,
            enriched,
        }
    }
}
