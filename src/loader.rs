use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::credentials::ServiceAccount;
use crate::error::DashboardError;
use crate::models::{Record, Table};

pub const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone)]
pub enum Source {
    Drive { file_id: String },
    Local { path: PathBuf },
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    created: String,
    status: String,
}

pub async fn load_table(name: &str, source: &Source) -> Result<Table, DashboardError> {
    let bytes = match source {
        Source::Drive { file_id } => {
            let account = ServiceAccount::from_env()?;
            let client = Client::new();
            let token = account.access_token(&client).await?;
            download(&client, DRIVE_FILES_URL, &token, file_id).await?
        }
        Source::Local { path } => read_local(path)?,
    };

    let table = parse_table(name, &bytes)?;
    info!(dataset = name, rows = table.records.len(), "dataset loaded");
    Ok(table)
}

/// Drains the media stream of a Drive file under `files_url` into one buffer.
pub async fn download(
    client: &Client,
    files_url: &str,
    token: &str,
    file_id: &str,
) -> Result<Vec<u8>, DashboardError> {
    let url = format!("{}/{file_id}", files_url.trim_end_matches('/'));
    let mut response = client
        .get(&url)
        .query(&[("alt", "media")])
        .bearer_auth(token)
        .send()
        .await?;

    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(DashboardError::PermissionDenied(file_id.to_string()))
        }
        StatusCode::NOT_FOUND => return Err(DashboardError::NotFound(file_id.to_string())),
        status if !status.is_success() => {
            return Err(DashboardError::Fetch(format!(
                "Drive returned status {status} for {file_id}"
            )))
        }
        _ => {}
    }

    let mut buffer = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        buffer.extend_from_slice(&chunk);
        debug!(received = buffer.len(), "download progress");
    }

    info!(file_id, bytes = buffer.len(), "download complete");
    Ok(buffer)
}

fn read_local(path: &Path) -> Result<Vec<u8>, DashboardError> {
    debug!(path = %path.display(), "reading local csv");
    Ok(std::fs::read(path)?)
}

pub fn parse_table(name: &str, bytes: &[u8]) -> Result<Table, DashboardError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let mut records = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row_number = index + 1;
        let row = result.map_err(|e| DashboardError::Parse(format!("row {row_number}: {e}")))?;

        if row.status.is_empty() {
            return Err(DashboardError::Parse(format!(
                "row {row_number}: status is empty"
            )));
        }

        let created = parse_created(&row.created).ok_or_else(|| {
            DashboardError::Parse(format!(
                "row {row_number}: cannot parse created timestamp {:?}",
                row.created
            ))
        })?;

        records.push(Record {
            created,
            status: row.status,
        });
    }

    Ok(Table {
        name: name.to_string(),
        records,
    })
}

/// Offset-aware values keep their own wall-clock time.
pub fn parse_created(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.naive_local());
    }
    if let Ok(value) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(value.naive_local());
    }
    for format in NAIVE_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(value);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_http::{closed_url, serve_once};
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_common_timestamp_shapes() {
        let cases = [
            ("2024-05-03T10:15:00Z", (2024, 5, 3, 10)),
            ("2024-05-03T23:30:00-04:00", (2024, 5, 3, 23)),
            ("2024-05-03 10:15:00+00:00", (2024, 5, 3, 10)),
            ("2024-05-03 10:15:00.123456", (2024, 5, 3, 10)),
            ("2024-05-03T10:15:00", (2024, 5, 3, 10)),
            ("2024-05-03 10:15", (2024, 5, 3, 10)),
            ("2024-05-03", (2024, 5, 3, 0)),
        ];

        for (raw, (year, month, day, hour)) in cases {
            let parsed = parse_created(raw).unwrap_or_else(|| panic!("failed on {raw}"));
            assert_eq!(
                (parsed.year(), parsed.month(), parsed.day(), parsed.hour()),
                (year, month, day, hour),
                "{raw}"
            );
        }
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_created("yesterday").is_none());
        assert!(parse_created("2024-13-01").is_none());
        assert!(parse_created("").is_none());
    }

    #[test]
    fn parses_table_and_ignores_extra_columns() {
        let csv = "id,created,status,email\n\
                   1,2024-05-03 10:00:00,ACTIVE,a@example.com\n\
                   2,2024-05-04 11:00:00,SUSPENDED,b@example.com\n";

        let table = parse_table("onboarding", csv.as_bytes()).unwrap();
        assert_eq!(table.name, "onboarding");
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[1].status, "SUSPENDED");
        assert_eq!(table.records[1].created.day(), 4);
    }

    #[test]
    fn bad_timestamp_is_fatal_and_names_row() {
        let csv = "created,status\n2024-05-03,ACTIVE\nnot-a-date,ACTIVE\n";
        let err = parse_table("df", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DashboardError::Parse(_)));
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn missing_column_is_fatal() {
        let csv = "created\n2024-05-03\n";
        assert!(matches!(
            parse_table("df", csv.as_bytes()),
            Err(DashboardError::Parse(_))
        ));
    }

    #[test]
    fn empty_status_is_fatal() {
        let csv = "created,status\n2024-05-03,\n";
        let err = parse_table("df", csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("status is empty"));
    }

    #[test]
    fn header_only_yields_empty_table() {
        let table = parse_table("df", b"created,status\n").unwrap();
        assert!(table.records.is_empty());
    }

    #[tokio::test]
    async fn loads_local_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cardholder.csv");
        std::fs::write(&path, "created,status\n2024-01-31 08:00:00,PENDINGKYC\n").unwrap();

        let table = load_table("cardholder", &Source::Local { path }).await.unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].status, "PENDINGKYC");
    }

    #[tokio::test]
    async fn missing_local_file_is_io_error() {
        let source = Source::Local {
            path: PathBuf::from("/definitely/not/here.csv"),
        };
        assert!(matches!(
            load_table("df", &source).await,
            Err(DashboardError::Io(_))
        ));
    }

    #[test]
    fn status_values_pass_through_unchanged() {
        let csv = "created,status\n2024-05-03, ACTIVE\n2024-05-03,active\n";
        let table = parse_table("df", csv.as_bytes()).unwrap();
        assert_eq!(table.records[0].status, " ACTIVE");
        assert_eq!(table.records[1].status, "active");
    }

    #[test]
    fn short_rows_in_extra_columns_are_tolerated() {
        let csv = "created,status,x\n2024-05-03,ACTIVE\n2024-05-04,SUSPENDED,extra\n";
        let table = parse_table("df", csv.as_bytes()).unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].status, "ACTIVE");
    }

    #[tokio::test]
    async fn download_drains_every_chunk() {
        let (url, request) = serve_once(
            "200 OK",
            vec!["created,status\n", "2024-05-03,ACTIVE\n", "2024-05-04,SUSPENDED\n"],
        )
        .await;

        let bytes = download(&Client::new(), &url, "token-123", "file-abc")
            .await
            .unwrap();
        assert_eq!(
            bytes,
            b"created,status\n2024-05-03,ACTIVE\n2024-05-04,SUSPENDED\n".to_vec()
        );

        let request = request.await.unwrap();
        assert!(request.starts_with("GET /file-abc?alt=media "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer token-123"));

        let table = parse_table("df", &bytes).unwrap();
        assert_eq!(table.records.len(), 2);
    }

    #[tokio::test]
    async fn forbidden_is_permission_denied() {
        let (url, _request) = serve_once("403 Forbidden", vec!["denied"]).await;
        let err = download(&Client::new(), &url, "t", "file-abc").await.unwrap_err();
        assert!(matches!(err, DashboardError::PermissionDenied(id) if id == "file-abc"));
    }

    #[tokio::test]
    async fn unauthorized_is_permission_denied() {
        let (url, _request) = serve_once("401 Unauthorized", vec!["nope"]).await;
        let err = download(&Client::new(), &url, "t", "file-abc").await.unwrap_err();
        assert!(matches!(err, DashboardError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let (url, _request) = serve_once("404 Not Found", vec!["missing"]).await;
        let err = download(&Client::new(), &url, "t", "file-abc").await.unwrap_err();
        assert!(matches!(err, DashboardError::NotFound(id) if id == "file-abc"));
    }

    #[tokio::test]
    async fn server_error_is_fetch_error() {
        let (url, _request) = serve_once("500 Internal Server Error", vec!["boom"]).await;
        let err = download(&Client::new(), &url, "t", "file-abc").await.unwrap_err();
        match err {
            DashboardError::Fetch(message) => assert!(message.contains("500")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_store_is_fetch_error() {
        let url = closed_url().await;
        let err = download(&Client::new(), &url, "t", "file-abc").await.unwrap_err();
        assert!(matches!(err, DashboardError::Fetch(_)));
    }
}
