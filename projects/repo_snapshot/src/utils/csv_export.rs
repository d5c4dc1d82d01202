use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::repository::models::OwnerRepositoryRow;

pub const EXPORT_FILENAME: &str = "data.csv";
pub const EXPORT_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub const EXPORT_HEADER: [&str; 7] = [
    "Owner ID",
    "Owner Name",
    "Owner Email",
    "Repo ID",
    "Repo Name",
    "Status",
    "Stars Count",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("WriteRecord: {source}")]
    WriteRecord {
        #[from]
        source: csv::Error,
    },
    #[error("FlushBuffer: {source}")]
    FlushBuffer {
        #[from]
        source: std::io::Error,
    },
}

pub fn render_csv(rows: &[OwnerRepositoryRow]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(EXPORT_HEADER)?;

    for row in rows {
        let owner_id = row.owner_id.to_string();
        let repo_id = row.repo_id.to_string();
        let stars = row.repo_stars.to_string();
        writer.write_record([
            owner_id.as_str(),
            row.owner_name.as_str(),
            row.owner_email.as_deref().unwrap_or(""),
            repo_id.as_str(),
            row.repo_name.as_str(),
            row.repo_status.as_str(),
            stars.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| ExportError::FlushBuffer {
            source: err.into_error(),
        })
}

#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: &'static str,
    pub body: Vec<u8>,
}

impl CsvExport {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            filename: EXPORT_FILENAME,
            body,
        }
    }
}

impl IntoResponse for CsvExport {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, EXPORT_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", self.filename),
                ),
            ],
            self.body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(repo_id: i64, repo_name: &str, status: &str, stars: i32) -> OwnerRepositoryRow {
        OwnerRepositoryRow {
            owner_id: 1,
            owner_name: "alice".to_string(),
            owner_email: None,
            repo_id,
            repo_name: repo_name.to_string(),
            repo_status: status.to_string(),
            repo_stars: stars,
        }
    }

    #[test]
    fn renders_header_and_rows() {
        let body = render_csv(&[row(10, "repo-a", "public", 5)]).unwrap();

        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Owner ID,Owner Name,Owner Email,Repo ID,Repo Name,Status,Stars Count\n\
             1,alice,,10,repo-a,public,5\n"
        );
    }

    #[test]
    fn empty_rows_render_header_only() {
        let body = render_csv(&[]).unwrap();

        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Owner ID,Owner Name,Owner Email,Repo ID,Repo Name,Status,Stars Count\n"
        );
    }

    #[test]
    fn zero_stars_private_row_is_kept() {
        let body = render_csv(&[row(11, "secret", "private", 0)]).unwrap();
        let text = String::from_utf8(body).unwrap();

        assert_eq!(text.lines().nth(1), Some("1,alice,,11,secret,private,0"));
    }

    #[test]
    fn embedded_delimiters_and_quotes_are_escaped() {
        let mut tricky = row(12, "a,b", "public", 1);
        tricky.owner_name = "Alice \"Al\" Smith".to_string();
        tricky.owner_email = Some("alice@example.com".to_string());

        let body = render_csv(&[tricky]).unwrap();
        let text = String::from_utf8(body).unwrap();

        assert_eq!(
            text.lines().nth(1),
            Some("1,\"Alice \"\"Al\"\" Smith\",alice@example.com,12,\"a,b\",public,1")
        );
    }

    #[test]
    fn line_count_is_header_plus_rows() {
        let rows: Vec<_> = (0..5).map(|i| row(i, "r", "public", 0)).collect();

        let body = render_csv(&rows).unwrap();

        assert_eq!(String::from_utf8(body).unwrap().lines().count(), 1 + rows.len());
    }

    #[test]
    fn response_is_a_csv_attachment() {
        let response = CsvExport::new(b"x\n".to_vec()).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"data.csv\""
        );
    }
}
