//! CSV export of assembled rows.

use crate::assembler::JoinPolicy;
use csv::WriterBuilder;
use harvest_core::{CollectionRow, Community, CoreError};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Column order of every export.
pub const COLUMNS: [&str; 15] = [
    "community",
    "post_id",
    "title",
    "author",
    "score",
    "num_comments",
    "upvote_ratio",
    "url",
    "created_utc",
    "ranking_method",
    "comment_id",
    "comment_author",
    "comment_score",
    "comment_body",
    "comment_created_utc",
];

/// Flat CSV record; field order must match [`COLUMNS`].
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    community: &'a str,
    post_id: &'a str,
    title: &'a str,
    author: &'a str,
    score: i64,
    num_comments: u64,
    upvote_ratio: f64,
    url: &'a str,
    created_utc: String,
    ranking_method: &'static str,
    comment_id: Option<&'a str>,
    comment_author: Option<&'a str>,
    comment_score: Option<i64>,
    comment_body: Option<&'a str>,
    comment_created_utc: Option<String>,
}

impl<'a> From<&'a CollectionRow> for CsvRow<'a> {
    fn from(row: &'a CollectionRow) -> Self {
        let post = &row.post;
        let comment = row.comment.as_ref();
        Self {
            community: post.community.as_str(),
            post_id: &post.post_id,
            title: &post.title,
            author: &post.author,
            score: post.score,
            num_comments: post.num_comments,
            upvote_ratio: post.upvote_ratio,
            url: &post.url,
            created_utc: post.created_utc.to_rfc3339(),
            ranking_method: post.ranking_method.as_str(),
            comment_id: comment.map(|c| c.comment_id.as_str()),
            comment_author: comment.and_then(|c| c.author.as_deref()),
            comment_score: comment.map(|c| c.score),
            comment_body: comment.map(|c| c.body.as_str()),
            comment_created_utc: comment.map(|c| c.created_utc.to_rfc3339()),
        }
    }
}

/// Writes the header and every row to `writer`.
pub fn write_rows<W: Write>(rows: &[CollectionRow], writer: W) -> Result<(), CoreError> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(COLUMNS)?;
    for row in rows {
        csv_writer.serialize(CsvRow::from(row))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_bytes(rows: &[CollectionRow]) -> Result<Vec<u8>, CoreError> {
    let mut buffer = Vec::new();
    write_rows(rows, &mut buffer)?;
    Ok(buffer)
}

pub fn write_csv<P: AsRef<Path>>(rows: &[CollectionRow], path: P) -> Result<(), CoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_rows(rows, std::io::BufWriter::new(file))?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// `{communities}_posts.csv` for post-only exports, `{communities}_comments.csv`
/// otherwise; several communities are joined with `+`.
pub fn default_file_name(communities: &[Community], join: JoinPolicy) -> String {
    let stem = if communities.is_empty() {
        "reddit".to_string()
    } else {
        communities
            .iter()
            .map(Community::as_str)
            .collect::<Vec<_>>()
            .join("+")
    };

    match join {
        JoinPolicy::PostsOnly { .. } => format!("{}_posts.csv", stem),
        JoinPolicy::LeftJoin | JoinPolicy::InnerJoin => format!("{}_comments.csv", stem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use harvest_core::{CommentRecord, PostRecord, RankingMethod};

    fn row(with_comment: bool) -> CollectionRow {
        CollectionRow {
            post: PostRecord {
                community: Community::new("testsub").unwrap(),
                post_id: "p1".to_string(),
                title: "Hello, \"world\"".to_string(),
                author: "None".to_string(),
                score: 7,
                num_comments: 1,
                upvote_ratio: 0.5,
                url: "https://example.com/p1".to_string(),
                created_utc: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
                ranking_method: RankingMethod::Top,
            },
            comment: with_comment.then(|| CommentRecord {
                comment_id: "c1".to_string(),
                post_id: "p1".to_string(),
                author: None,
                score: -2,
                body: "multi\nline".to_string(),
                created_utc: Utc.with_ymd_and_hms(2024, 1, 2, 4, 0, 0).unwrap(),
            }),
        }
    }

    #[test]
    fn test_header_written_for_empty_export() {
        let bytes = to_csv_bytes(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.trim_end(), COLUMNS.join(","));
    }

    #[test]
    fn test_rows_follow_column_order() {
        let bytes = to_csv_bytes(&[row(true), row(false)]).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());

        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, COLUMNS);

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);

        let joined = &records[0];
        assert_eq!(&joined[0], "testsub");
        assert_eq!(&joined[2], "Hello, \"world\"");
        assert_eq!(&joined[8], "2024-01-02T03:04:05+00:00");
        assert_eq!(&joined[9], "top");
        assert_eq!(&joined[10], "c1");
        assert_eq!(&joined[11], "");
        assert_eq!(&joined[12], "-2");
        assert_eq!(&joined[13], "multi\nline");

        let post_only = &records[1];
        assert_eq!(post_only.len(), COLUMNS.len());
        assert!((10..15).all(|i| post_only[i].is_empty()));
    }

    #[test]
    fn test_write_csv_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports").join("testsub_comments.csv");

        write_csv(&[row(true)], &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("community,post_id,title"));
    }

    #[test]
    fn test_default_file_name() {
        let communities = vec![
            Community::new("rust").unwrap(),
            Community::new("programming").unwrap(),
        ];
        assert_eq!(
            default_file_name(&communities[..1], JoinPolicy::PostsOnly { dedupe_posts: true }),
            "rust_posts.csv"
        );
        assert_eq!(
            default_file_name(&communities, JoinPolicy::LeftJoin),
            "rust+programming_comments.csv"
        );
    }
}
