#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Once;

use blotter_core::RawSettings;
use blotter_engine::Settings;
use chrono::NaiveDate;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LISTING_PATH: &str = "/police/log";
pub const HEADERS: [&str; 5] = ["Dispatch Number", "Address", "Activity", "Disposition", "Details"];

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(blotter_logging::initialize_for_tests);
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Cells of one listing row in canonical header order.
pub fn row(id: u64, activity: &str, disposition: &str, flag: &str) -> [String; 5] {
    [
        format!("<a href=\"/{id}\">{id}</a>"),
        "123 Fake St".to_string(),
        activity.to_string(),
        disposition.to_string(),
        flag.to_string(),
    ]
}

/// Listing page whose columns appear in `order` (indices into `HEADERS`).
pub fn listing_page_ordered(order: &[usize], rows: &[[String; 5]]) -> String {
    let head: String = order
        .iter()
        .map(|&i| format!("<th>{}</th>", HEADERS[i]))
        .collect();
    let body: String = rows
        .iter()
        .map(|cells| {
            let tds: String = order
                .iter()
                .map(|&i| format!("<td>{}</td>", cells[i]))
                .collect();
            format!("<tr>{tds}</tr>\n")
        })
        .collect();
    format!(
        "<!DOCTYPE html>\n<html><head><title>Blotter page</title></head><body>\n\
         <table><thead><tr>{head}</tr></thead>\n<tbody>\n{body}</tbody></table>\n</body></html>"
    )
}

pub fn listing_page(rows: &[[String; 5]]) -> String {
    listing_page_ordered(&[0, 1, 2, 3, 4], rows)
}

pub fn detail_page(details: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>Blotter entry</title></head><body><div><dl>\n\
         <dt>Dispatch Number</dt><dd>123</dd>\n\
         <dt>Dispatch Time</dt><dd>1/1/1970 1:00:00 AM</dd>\n\
         <dt>Activity</dt><dd>FOO</dd>\n\
         <dt>Details</dt><dd>{details}</dd>\n\
         </dl></div></body></html>"
    )
}

pub fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

pub fn settings_for(
    server: &MockServer,
    activities: &[&str],
    dispositions: &[&str],
    details: &[&str],
) -> Settings {
    let owned = |list: &[&str]| -> Option<Vec<String>> {
        Some(list.iter().map(|p| p.to_string()).collect())
    };
    Settings::from_raw(RawSettings {
        base_url: Some(format!("{}{}", server.uri(), LISTING_PATH)),
        activity_exclusions: owned(activities),
        disposition_exclusions: owned(dispositions),
        detail_exclusions: owned(details),
        ..RawSettings::default()
    })
    .unwrap()
}

pub async fn mount_listing(server: &MockServer, day: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("activityDate", day))
        .respond_with(html(body))
        .mount(server)
        .await;
}

pub async fn mount_detail(server: &MockServer, id: u64, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/{id}")))
        .respond_with(response)
        .mount(server)
        .await;
}

/// A local address nothing is listening on.
pub fn closed_port_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}{path}")
}
