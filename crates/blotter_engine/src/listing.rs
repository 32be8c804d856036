use std::collections::HashMap;

use blotter_core::{Record, RecordId};
use scraper::{ElementRef, Html};
use url::Url;

use crate::error::LayoutError;
use crate::html::{children_named, descendants_named, text_of};

pub const IDENTIFIER_HEADER: &str = "dispatch number";
const ADDRESS_HEADER: &str = "address";
const ACTIVITY_HEADER: &str = "activity";
const DISPOSITION_HEADER: &str = "disposition";
const DETAILS_FLAG_HEADER: &str = "details";

/// Lower-cased header labels the listing table must carry, in the order
/// missing ones are reported.
pub const REQUIRED_HEADERS: [&str; 5] = [
    IDENTIFIER_HEADER,
    ADDRESS_HEADER,
    ACTIVITY_HEADER,
    DISPOSITION_HEADER,
    DETAILS_FLAG_HEADER,
];

/// Parses the daily listing table into records, in row order.
///
/// Columns are located by header label, so any column order works. Detail
/// links are resolved against `base_url`. The first row without a usable
/// link or dispatch number fails the whole page.
pub fn parse_listing(html: &str, base_url: &Url) -> Result<Vec<Record>, LayoutError> {
    let document = Html::parse_document(html);
    let head = descendants_named(document.root_element(), "thead").next();
    let columns = ColumnMap::from_header(head)?;

    // Rows must come from the table that owns the header.
    let Some(body) = head
        .and_then(enclosing_table)
        .and_then(|table| children_named(table, "tbody").next())
    else {
        return Ok(Vec::new());
    };

    children_named(body, "tr")
        .enumerate()
        .map(|(index, row)| columns.record_from_row(row, index + 1, base_url))
        .collect()
}

fn enclosing_table(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "table")
}

/// Position of each required column within a row.
struct ColumnMap {
    positions: HashMap<&'static str, usize>,
}

impl ColumnMap {
    fn from_header(head: Option<ElementRef<'_>>) -> Result<Self, LayoutError> {
        let labels: Vec<String> = head
            .map(|head| {
                descendants_named(head, "th")
                    .map(|cell| text_of(cell).trim().to_lowercase())
                    .collect()
            })
            .unwrap_or_default();

        let mut positions = HashMap::new();
        let mut duplicate = None;
        for (position, label) in labels.iter().enumerate() {
            let Some(required) = REQUIRED_HEADERS.iter().find(|r| **r == label.as_str()) else {
                continue;
            };
            if positions.insert(*required, position).is_some() && duplicate.is_none() {
                duplicate = Some(label.clone());
            }
        }

        let missing: Vec<String> = REQUIRED_HEADERS
            .iter()
            .filter(|label| !positions.contains_key(*label))
            .map(|label| label.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LayoutError::MissingHeaders(missing));
        }
        if let Some(label) = duplicate {
            return Err(LayoutError::DuplicateHeader(label));
        }

        Ok(Self { positions })
    }

    fn record_from_row(
        &self,
        row: ElementRef<'_>,
        row_number: usize,
        base_url: &Url,
    ) -> Result<Record, LayoutError> {
        let cells: Vec<ElementRef<'_>> = children_named(row, "td").collect();
        let cell = |label: &str| self.positions.get(label).and_then(|&i| cells.get(i)).copied();

        let id_cell = cell(IDENTIFIER_HEADER);
        let url = id_cell
            .and_then(|cell| descendants_named(cell, "a").next())
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| base_url.join(href.trim()).ok())
            .ok_or(LayoutError::RowLink { row: row_number })?;
        let id = id_cell
            .and_then(|cell| text_of(cell).trim().parse::<RecordId>().ok())
            .ok_or(LayoutError::RowIdentifier { row: row_number })?;

        let has_details = cell(DETAILS_FLAG_HEADER)
            .map(|cell| text_of(cell).trim().to_lowercase() == "y")
            .unwrap_or(false);

        Ok(Record::new(
            id,
            url,
            cell(ACTIVITY_HEADER).map(text_of),
            cell(DISPOSITION_HEADER).map(text_of),
            has_details,
        ))
    }
}
