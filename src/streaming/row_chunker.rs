//! Fixed-row chunking of header-plus-rows tabular text.
//!
//! Splits a tabular content body into chunks of at most `rows_per_chunk`
//! data rows while ensuring each chunk starts with the header row. Chunks are
//! rejoined with [`ROW_TERMINATOR`], the separator the downstream tabular
//! parser expects.

use std::num::NonZeroUsize;

use crate::error::AppError;
use crate::manifest::{BatchContent, ContentRecord};

/// Separator placed between the header and every row of a chunk.
///
/// The surrounding spaces are part of the wire format.
pub const ROW_TERMINATOR: &str = " \r\n ";

/// Maximum number of data rows per chunk (excluding header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSize(NonZeroUsize);

impl ChunkSize {
    /// Rows per chunk used when nothing is configured.
    pub const DEFAULT: ChunkSize = match NonZeroUsize::new(5) {
        Some(n) => ChunkSize(n),
        None => unreachable!(),
    };

    /// Validates a configured rows-per-chunk value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidChunkSize` if `rows` is zero or negative.
    pub fn new(rows: i64) -> Result<Self, AppError> {
        usize::try_from(rows)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(ChunkSize)
            .ok_or(AppError::InvalidChunkSize(rows))
    }

    /// Returns the chunk size as a usize.
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for ChunkSize {
    type Error = AppError;

    fn try_from(rows: i64) -> Result<Self, Self::Error> {
        Self::new(rows)
    }
}

/// A tabular body split into its header and data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tabular<'a> {
    pub header: &'a str,
    pub rows: Vec<&'a str>,
}

/// Row counts produced while chunking a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkStats {
    /// Number of source records processed.
    pub records: u64,
    /// Total data rows processed (excluding headers).
    pub total_rows: u64,
    /// Number of data rows in each emitted chunk, in output order.
    pub rows_per_chunk: Vec<u64>,
}

impl ChunkStats {
    /// Number of chunks emitted.
    pub fn chunk_count(&self) -> usize {
        self.rows_per_chunk.len()
    }
}

/// Splits a body into header and rows.
///
/// Lines end at `\n`, with a trailing `\r` stripped. Blank lines are kept as
/// empty rows; a final line terminator does not produce an extra row.
///
/// # Errors
///
/// Returns `AppError::EmptyInput` if the body has no lines at all.
pub fn parse_tabular(body: &str) -> Result<Tabular<'_>, AppError> {
    let mut lines = body.lines();
    let header = lines.next().ok_or(AppError::EmptyInput)?;

    Ok(Tabular {
        header,
        rows: lines.collect(),
    })
}

/// Partitions rows into consecutive groups of `size`.
///
/// Only the last group may be shorter. An empty input still yields one empty
/// group so that a header-only body produces a header-only chunk.
pub fn chunk_rows<T>(rows: &[T], size: ChunkSize) -> Vec<&[T]> {
    if rows.is_empty() {
        return vec![&rows[..0]];
    }
    rows.chunks(size.get()).collect()
}

/// Builds a chunk as `header + terminator + join(terminator, rows)`.
///
/// The terminator follows the header even when `rows` is empty.
pub fn reassemble(header: &str, rows: &[&str], terminator: &str) -> String {
    let capacity = header.len()
        + rows.iter().map(|r| r.len()).sum::<usize>()
        + rows.len().max(1) * terminator.len();
    let mut out = String::with_capacity(capacity);
    out.push_str(header);
    out.push_str(terminator);
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            out.push_str(terminator);
        }
        out.push_str(row);
    }
    out
}

/// Splits a chunk built by [`reassemble`] with [`ROW_TERMINATOR`] back into
/// header and rows.
///
/// A single empty segment after the header decodes as zero rows, so a group
/// holding one blank row reads back as a header-only chunk.
pub fn split_chunk(chunk: &str) -> Tabular<'_> {
    let mut parts = chunk.split(ROW_TERMINATOR);
    // split always yields at least one item
    let header = parts.next().unwrap_or_default();
    let mut rows: Vec<&str> = parts.collect();
    if rows.len() == 1 && rows[0].is_empty() {
        rows.clear();
    }
    Tabular { header, rows }
}

/// Chunks one content record.
///
/// Every output record carries the source's type and metadata; output order
/// follows row order.
///
/// # Errors
///
/// Returns `AppError::EmptyInput` if the record body has no header.
pub fn transform_record(
    record: &ContentRecord,
    size: ChunkSize,
) -> Result<Vec<ContentRecord>, AppError> {
    let tabular = parse_tabular(&record.content_body)?;

    Ok(chunk_rows(&tabular.rows, size)
        .into_iter()
        .map(|group| record.with_body(reassemble(tabular.header, group, ROW_TERMINATOR)))
        .collect())
}

/// Chunks every record of a batch, keeping record order.
///
/// # Errors
///
/// Fails on the first record whose body has no header; nothing is returned
/// for the batch in that case.
pub fn chunk_content(
    content: &BatchContent,
    size: ChunkSize,
) -> Result<(BatchContent, ChunkStats), AppError> {
    let mut stats = ChunkStats::default();
    let mut file_contents = Vec::new();

    for record in &content.file_contents {
        let chunks = transform_record(record, size)?;

        // transform_record succeeded, so the body has a header line
        let rows = record.content_body.lines().count().saturating_sub(1);
        let placeholders = vec![(); rows];
        stats.records += 1;
        stats.total_rows += rows as u64;
        stats
            .rows_per_chunk
            .extend(chunk_rows(&placeholders, size).iter().map(|g| g.len() as u64));

        file_contents.extend(chunks);
    }

    tracing::debug!(
        records = stats.records,
        total_rows = stats.total_rows,
        chunk_count = stats.chunk_count(),
        "Batch chunking complete"
    );

    Ok((BatchContent { file_contents }, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn size(n: i64) -> ChunkSize {
        ChunkSize::new(n).expect("valid chunk size")
    }

    fn record(body: &str) -> ContentRecord {
        let mut metadata = BTreeMap::new();
        metadata.insert("page".to_string(), "3".to_string());
        metadata.insert("lang".to_string(), "en".to_string());
        ContentRecord {
            content_type: "TEXT".into(),
            content_metadata: metadata,
            content_body: body.into(),
        }
    }

    /// Builds a body with `n` numbered rows under header "id,name".
    fn body_with_rows(n: usize) -> String {
        let mut lines = vec!["id,name".to_string()];
        lines.extend((1..=n).map(|i| format!("{},row{}", i, i)));
        lines.join("\n")
    }

    #[test]
    fn test_parse_header_and_rows() {
        let parsed = parse_tabular("id,name\n1,a\n2,b").unwrap();
        assert_eq!(parsed.header, "id,name");
        assert_eq!(parsed.rows, vec!["1,a", "2,b"]);
    }

    #[test]
    fn test_parse_strips_crlf() {
        let parsed = parse_tabular("id,name\r\n1,a\r\n2,b\r\n").unwrap();
        assert_eq!(parsed.header, "id,name");
        assert_eq!(parsed.rows, vec!["1,a", "2,b"]);
    }

    #[test]
    fn test_parse_keeps_blank_rows() {
        let parsed = parse_tabular("id\n1\n\n3").unwrap();
        assert_eq!(parsed.rows, vec!["1", "", "3"]);
    }

    #[test]
    fn test_parse_header_only() {
        let parsed = parse_tabular("id\n").unwrap();
        assert_eq!(parsed.header, "id");
        assert!(parsed.rows.is_empty());
    }

    #[test]
    fn test_parse_empty_body_is_error() {
        assert!(matches!(parse_tabular(""), Err(AppError::EmptyInput)));
    }

    #[test]
    fn test_chunk_size_rejects_non_positive() {
        assert!(matches!(ChunkSize::new(0), Err(AppError::InvalidChunkSize(0))));
        assert!(matches!(ChunkSize::new(-4), Err(AppError::InvalidChunkSize(-4))));
        assert_eq!(ChunkSize::new(1).unwrap().get(), 1);
        assert_eq!(ChunkSize::default().get(), 5);
        assert!(ChunkSize::try_from(0i64).is_err());
    }

    #[test]
    fn test_chunk_rows_remainder() {
        let rows = vec!["1", "2", "3", "4", "5"];
        let groups = chunk_rows(&rows, size(2));
        let lengths: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        assert_eq!(lengths, vec![2, 2, 1]);
    }

    #[test]
    fn test_chunk_rows_exact_multiple_has_no_trailing_group() {
        let rows = vec!["1", "2", "3", "4", "5"];
        let groups = chunk_rows(&rows, size(5));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0], &rows[..]);
    }

    #[test]
    fn test_chunk_rows_empty_yields_one_empty_group() {
        let rows: Vec<&str> = Vec::new();
        let groups = chunk_rows(&rows, size(5));
        assert_eq!(groups.len(), 1);
        assert!(groups[0].is_empty());
    }

    #[test]
    fn test_row_count_and_size_laws() {
        for total in 0..=23usize {
            for n in 1..=7usize {
                let body = body_with_rows(total);
                let parsed = parse_tabular(&body).unwrap();
                let groups = chunk_rows(&parsed.rows, size(n as i64));

                let expected = if total == 0 { 1 } else { total.div_ceil(n) };
                assert_eq!(groups.len(), expected, "total={} n={}", total, n);

                let (last, full) = groups.split_last().unwrap();
                assert!(full.iter().all(|g| g.len() == n));
                if total == 0 {
                    assert!(last.is_empty());
                } else {
                    assert!((1..=n).contains(&last.len()));
                }

                // Coverage: concatenated groups give back the original rows
                let flattened: Vec<&str> = groups.iter().flat_map(|g| g.iter().copied()).collect();
                assert_eq!(flattened, parsed.rows);
            }
        }
    }

    #[test]
    fn test_reassemble_uses_spaced_crlf() {
        let chunk = reassemble("id,name", &["1,a", "2,b"], ROW_TERMINATOR);
        assert_eq!(chunk, "id,name \r\n 1,a \r\n 2,b");
    }

    #[test]
    fn test_reassemble_header_only() {
        assert_eq!(reassemble("id", &[], ROW_TERMINATOR), "id \r\n ");
        assert_eq!(
            reassemble("id,name", &[], ROW_TERMINATOR),
            format!("id,name{}", ROW_TERMINATOR)
        );
    }

    #[test]
    fn test_split_chunk_round_trip() {
        let rows = vec!["1,a", "", "3,c"];
        let chunk = reassemble("id,name", &rows, ROW_TERMINATOR);
        let parsed = split_chunk(&chunk);
        assert_eq!(parsed.header, "id,name");
        assert_eq!(parsed.rows, rows);

        let header_only_chunk = reassemble("id", &[], ROW_TERMINATOR);
        let header_only = split_chunk(&header_only_chunk);
        assert_eq!(header_only.header, "id");
        assert!(header_only.rows.is_empty());
    }

    #[test]
    fn test_six_rows_into_chunks_of_five() {
        let source = record("id,name\n1,a\n2,b\n3,c\n4,d\n5,e\n6,f");
        let chunks = transform_record(&source, size(5)).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0].content_body,
            "id,name \r\n 1,a \r\n 2,b \r\n 3,c \r\n 4,d \r\n 5,e"
        );
        assert_eq!(chunks[1].content_body, "id,name \r\n 6,f");
    }

    #[test]
    fn test_header_only_record_produces_one_chunk() {
        let chunks = transform_record(&record("id"), size(5)).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content_body, "id \r\n ");
    }

    #[test]
    fn test_exactly_five_rows_produce_one_chunk() {
        let chunks = transform_record(&record("id\n1\n2\n3\n4\n5"), size(5)).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(split_chunk(&chunks[0].content_body).rows, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_empty_body_record_fails() {
        assert!(matches!(
            transform_record(&record(""), size(5)),
            Err(AppError::EmptyInput)
        ));
    }

    #[test]
    fn test_header_and_metadata_on_every_chunk() {
        let source = record(&body_with_rows(11));
        let chunks = transform_record(&source, size(3)).unwrap();
        assert_eq!(chunks.len(), 4);

        let mut rows = Vec::new();
        for chunk in &chunks {
            assert!(chunk.content_body.starts_with("id,name"));
            assert_eq!(chunk.content_type, source.content_type);
            assert_eq!(chunk.content_metadata, source.content_metadata);

            let parsed = split_chunk(&chunk.content_body);
            assert_eq!(parsed.header, "id,name");
            rows.extend(parsed.rows.into_iter().map(str::to_string));
        }

        let original = parse_tabular(&source.content_body).unwrap().rows;
        assert_eq!(rows, original);
    }

    #[test]
    fn test_chunk_content_stats_and_order() {
        let content = BatchContent {
            file_contents: vec![record(&body_with_rows(7)), record("id"), record(&body_with_rows(2))],
        };
        let (chunked, stats) = chunk_content(&content, size(3)).unwrap();

        assert_eq!(stats.records, 3);
        assert_eq!(stats.total_rows, 9);
        assert_eq!(stats.rows_per_chunk, vec![3, 3, 1, 0, 2]);
        assert_eq!(stats.chunk_count(), chunked.file_contents.len());
        assert_eq!(chunked.file_contents[3].content_body, "id \r\n ");
        assert!(chunked.file_contents[4].content_body.ends_with("2,row2"));
    }

    #[test]
    fn test_chunk_content_fails_whole_batch() {
        let content = BatchContent {
            file_contents: vec![record("id\n1"), record("")],
        };
        assert!(matches!(
            chunk_content(&content, size(5)),
            Err(AppError::EmptyInput)
        ));
    }

    #[test]
    fn test_chunk_content_matches_transform_record() {
        let content = BatchContent {
            file_contents: vec![
                record(&body_with_rows(5)),
                record("id,name\r\n1,a\r\n\r\n3,c\r\n"),
                record("id,name"),
            ],
        };
        let (chunked, stats) = chunk_content(&content, size(2)).unwrap();

        let expected: Vec<ContentRecord> = content
            .file_contents
            .iter()
            .flat_map(|r| transform_record(r, size(2)).unwrap())
            .collect();
        assert_eq!(chunked.file_contents, expected);

        let counted: Vec<u64> = chunked
            .file_contents
            .iter()
            .map(|r| split_chunk(&r.content_body).rows.len() as u64)
            .collect();
        assert_eq!(stats.rows_per_chunk, counted);
        assert_eq!(stats.rows_per_chunk, vec![2, 2, 1, 2, 1, 0]);
        assert_eq!(stats.total_rows, 8);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let source = record(&body_with_rows(9));
        let first = transform_record(&source, size(4)).unwrap();
        let second = transform_record(&source, size(4)).unwrap();
        assert_eq!(first, second);
    }
}
