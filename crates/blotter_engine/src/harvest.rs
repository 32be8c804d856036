use std::collections::BTreeSet;

use blotter_core::{Record, RecordBatch, RecordId, Settings};
use blotter_logging::{blotter_debug, blotter_warn};
use chrono::NaiveDate;

use crate::detail::parse_details;
use crate::error::HarvestError;
use crate::fetch::{Method, Session};
use crate::listing::parse_listing;

/// Harvests one calendar day.
///
/// Fetches and parses the listing, drops records the listing filter rejects
/// or whose id is in `skip_ids`, fetches every remaining detail page at once,
/// then applies the detail filter. A detail page answering with an error
/// status only marks its record; any other failure aborts the day.
pub async fn harvest_day(
    session: &Session<'_>,
    settings: &Settings,
    day: NaiveDate,
    skip_ids: Option<&BTreeSet<RecordId>>,
) -> Result<RecordBatch, HarvestError> {
    let formatted_day = settings.format_day(day);
    let listing = session
        .fetch_one(
            Method::GET,
            settings.base_url.as_str(),
            &[(settings.date_param.as_str(), formatted_day.as_str())],
        )
        .await?;

    let records = parse_listing(&listing, &settings.base_url)?;
    let listed = records.len();
    let candidates: Vec<Record> = records
        .into_iter()
        .filter(|record| {
            !settings.filter.excludes_listing(record)
                && !skip_ids.is_some_and(|skip| skip.contains(&record.id))
        })
        .collect();
    blotter_debug!(
        "Excluded {} entries out of {} from initial set",
        listed - candidates.len(),
        listed
    );

    let urls: Vec<&str> = candidates.iter().map(|record| record.url.as_str()).collect();
    let responses = session.fetch_many(&urls).await?;

    let mut failures = 0usize;
    let mut enriched = Vec::with_capacity(candidates.len());
    for (index, (record, response)) in candidates.into_iter().zip(responses).enumerate() {
        let outcome = match response {
            Ok(body) => {
                blotter_debug!("Parsing details from response #{}...", index + 1);
                Ok(parse_details(&body)?)
            }
            Err(bad) => {
                blotter_warn!("Keeping record {} without details: {}", record.id, bad);
                failures += 1;
                Err(bad)
            }
        };
        enriched.push(record.enriched(outcome));
    }
    if failures > 0 {
        blotter_debug!("Encountered {} failure(s)", failures);
    }

    let enriched_count = enriched.len();
    let survivors: Vec<Record> = enriched
        .into_iter()
        .filter(|record| !settings.filter.excludes(record))
        .collect();
    blotter_debug!(
        "Excluded {} entries out of {} from initial filtered set",
        enriched_count - survivors.len(),
        enriched_count
    );

    Ok(RecordBatch::new(day, survivors))
}
