mod common;

use blotter_engine::{parse_listing, LayoutError, Record, REQUIRED_HEADERS};
use common::{init_logging, listing_page, listing_page_ordered, row};
use pretty_assertions::assert_eq;
use url::Url;

fn base() -> Url {
    Url::parse("http://test/police/log").unwrap()
}

fn sample_rows() -> Vec<[String; 5]> {
    vec![
        row(123, "FOO", "COMPLETED", "Y"),
        row(456, "BAR", "IN PROGRESS", "N"),
        row(789, "BAZ FOO", "UNKNOWN AT THIS TIME", "Y"),
    ]
}

fn permutations(items: Vec<usize>) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items];
    }
    let mut all = Vec::new();
    for (i, &first) in items.iter().enumerate() {
        let mut rest = items.clone();
        rest.remove(i);
        for mut tail in permutations(rest) {
            tail.insert(0, first);
            all.push(tail);
        }
    }
    all
}

#[test]
fn parses_rows_in_order() {
    init_logging();
    let records = parse_listing(&listing_page(&sample_rows()), &base()).unwrap();
    assert_eq!(
        records,
        vec![
            Record::new(
                123,
                Url::parse("http://test/123").unwrap(),
                Some("FOO".to_string()),
                Some("COMPLETED".to_string()),
                true,
            ),
            Record::new(
                456,
                Url::parse("http://test/456").unwrap(),
                Some("BAR".to_string()),
                Some("IN PROGRESS".to_string()),
                false,
            ),
            Record::new(
                789,
                Url::parse("http://test/789").unwrap(),
                Some("BAZ FOO".to_string()),
                Some("UNKNOWN AT THIS TIME".to_string()),
                true,
            ),
        ]
    );
    assert!(records.iter().all(Record::is_pending));
}

#[test]
fn header_order_does_not_matter() {
    init_logging();
    let canonical = parse_listing(&listing_page(&sample_rows()), &base()).unwrap();
    for order in permutations((0..5).collect()) {
        let page = listing_page_ordered(&order, &sample_rows());
        let records = parse_listing(&page, &base()).unwrap();
        assert_eq!(records, canonical, "column order {order:?}");
    }
}

#[test]
fn each_missing_header_is_named() {
    init_logging();
    for (dropped, label) in REQUIRED_HEADERS.iter().enumerate() {
        let order: Vec<usize> = (0..5).filter(|&i| i != dropped).collect();
        let page = listing_page_ordered(&order, &sample_rows());
        let err = parse_listing(&page, &base()).unwrap_err();
        assert_eq!(err, LayoutError::MissingHeaders(vec![label.to_string()]));
        assert_eq!(
            err.to_string(),
            format!("did not find expected page header(s): {label}")
        );
    }
}

#[test]
fn several_missing_headers_are_comma_joined() {
    init_logging();
    let page = listing_page_ordered(&[1, 3, 4], &sample_rows());
    let err = parse_listing(&page, &base()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "did not find expected page header(s): dispatch number, activity"
    );
}

#[test]
fn page_without_table_reports_every_header() {
    init_logging();
    let err = parse_listing("<html><body><p>maintenance</p></body></html>", &base()).unwrap_err();
    assert_eq!(
        err,
        LayoutError::MissingHeaders(REQUIRED_HEADERS.iter().map(|h| h.to_string()).collect())
    );
}

#[test]
fn bad_link_names_the_data_row() {
    init_logging();
    for broken in 1..=3 {
        let mut rows = sample_rows();
        rows[broken - 1][0] = "123".to_string();
        let err = parse_listing(&listing_page(&rows), &base()).unwrap_err();
        assert_eq!(err, LayoutError::RowLink { row: broken });
        assert_eq!(
            err.to_string(),
            format!("could not parse dispatch URL from row {broken}")
        );
    }
}

#[test]
fn malformed_link_names_the_data_row() {
    init_logging();
    let mut rows = sample_rows();
    rows[1][0] = "<a href=\"http://[::1\">456</a>".to_string();
    let err = parse_listing(&listing_page(&rows), &base()).unwrap_err();
    assert_eq!(err, LayoutError::RowLink { row: 2 });
}

#[test]
fn empty_table_yields_no_records() {
    init_logging();
    assert_eq!(parse_listing(&listing_page(&[]), &base()).unwrap(), Vec::new());
}
