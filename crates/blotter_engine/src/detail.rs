use scraper::{ElementRef, Html};

use crate::error::LayoutError;
use crate::html::{descendants_named, text_of};

/// Label of the free-text field on a detail page, compared case-insensitively.
pub const DETAILS_LABEL: &str = "details";

/// Extracts the trimmed details text from a detail page.
///
/// The text is the first `dd` after the `dt` labelled "Details" among the
/// direct children of the page's first `dl`. A page without that pair is a layout change.
pub fn parse_details(html: &str) -> Result<String, LayoutError> {
    let document = Html::parse_document(html);
    let list = descendants_named(document.root_element(), "dl")
        .next()
        .ok_or(LayoutError::MissingDetails)?;

    let mut after_label = false;
    for element in list.children().filter_map(ElementRef::wrap) {
        match element.value().name() {
            "dd" if after_label => return Ok(text_of(element).trim().to_string()),
            "dt" if text_of(element).trim().to_lowercase() == DETAILS_LABEL => after_label = true,
            _ => {}
        }
    }
    Err(LayoutError::MissingDetails)
}
