use std::io::Cursor;
use transcript_analyzer::models::{TranscriptLine, UNKNOWN_MODEL};
use transcript_analyzer::parser::{
    parse_line, CollectorProcessor, Records, SkipReason, TranscriptReader,
};

mod common;
use common::{assistant_line, create_transcript, top_level_usage_line, user_line, SONNET};

#[test]
fn test_nested_usage_wins_over_top_level() {
    let line: TranscriptLine = serde_json::from_str(
        r#"{"message":{"model":"m","usage":{"input_tokens":1}},"usage":{"input_tokens":99}}"#,
    )
    .unwrap();
    assert_eq!(line.usage().unwrap().input_tokens, 1);
}

#[test]
fn test_top_level_usage_fallback() {
    let line: TranscriptLine =
        serde_json::from_str(r#"{"message":{"model":"m"},"usage":{"output_tokens":7}}"#).unwrap();
    assert_eq!(line.usage().unwrap().output_tokens, 7);
    assert_eq!(line.model(), "m");
}

#[test]
fn test_missing_fields_default_to_zero_and_unknown_model() {
    let record = parse_line(br#"{"usage":{"input_tokens":42}}"#, 9).unwrap();
    assert_eq!(record.model, UNKNOWN_MODEL);
    assert_eq!(record.line_number, 9);
    assert_eq!(record.usage.input_tokens, 42);
    assert_eq!(record.usage.output_tokens, 0);
    assert_eq!(record.usage.cache_read_input_tokens, 0);
    assert_eq!(record.usage.cache_creation_input_tokens, 0);
}

#[test]
fn test_message_num_counts_only_usage_lines() {
    let lines = vec![
        user_line(),
        String::new(),
        assistant_line(SONNET, 10, 20, 0, 0),
        "   ".to_string(),
        "{not json at all".to_string(),
        top_level_usage_line(5, 6),
        r#"{"message":{"usage":"oops"}}"#.to_string(),
        assistant_line(SONNET, 1, 2, 3, 4),
    ];
    let (_dir, path) = create_transcript(&lines);

    let reader = TranscriptReader::open(&path).unwrap();
    let records = reader.process(CollectorProcessor::new()).unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(
        records.iter().map(|r| r.line_number).collect::<Vec<_>>(),
        vec![3, 6, 8]
    );
    assert_eq!(records[1].model, UNKNOWN_MODEL);
}

#[test]
fn test_reader_is_restartable() {
    let lines = vec![
        assistant_line(SONNET, 10, 20, 0, 0),
        assistant_line(SONNET, 30, 40, 0, 0),
    ];
    let (_dir, path) = create_transcript(&lines);
    let reader = TranscriptReader::open(&path).unwrap();

    let first: Vec<_> = reader.records().unwrap().map(|r| r.unwrap()).collect();
    let second: Vec<_> = reader.records().unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TranscriptReader::open(dir.path().join("nope.jsonl")).unwrap_err();
    assert!(err.to_string().starts_with("File not found"));
}

#[test]
fn test_records_is_lazy() {
    let input = format!(
        "{}\n{}\n",
        assistant_line(SONNET, 1, 1, 0, 0),
        assistant_line(SONNET, 2, 2, 0, 0)
    );
    let mut records = Records::from_reader(Cursor::new(input));

    let first = records.next().unwrap().unwrap();
    assert_eq!(first.usage.input_tokens, 1);
    assert_eq!(records.stats().lines, 1);

    assert!(records.next().is_some());
    assert!(records.next().is_none());
    assert!(records.next().is_none());
}

#[test]
fn test_crlf_and_missing_trailing_newline() {
    let input = format!(
        "{}\r\n{}",
        assistant_line(SONNET, 1, 1, 0, 0),
        top_level_usage_line(2, 2)
    );
    let records: Vec<_> = Records::from_reader(Cursor::new(input))
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_empty_usage_block_is_not_a_message() {
    assert_eq!(
        parse_line(br#"{"message":{"model":"m","usage":{}}}"#, 1),
        Err(SkipReason::NoUsage)
    );
    assert_eq!(parse_line(br#"{"usage":{}}"#, 2), Err(SkipReason::NoUsage));

    // the nested block is chosen even when empty, so no fallback
    assert_eq!(
        parse_line(br#"{"message":{"usage":{}},"usage":{"input_tokens":5}}"#, 3),
        Err(SkipReason::NoUsage)
    );

    let zero = parse_line(br#"{"message":{"model":"m","usage":{"input_tokens":0}}}"#, 4).unwrap();
    assert_eq!(zero.usage.input_tokens, 0);
}

#[test]
fn test_empty_usage_lines_do_not_advance_message_count() {
    let lines = vec![
        assistant_line(SONNET, 10, 20, 0, 0),
        r#"{"message":{"model":"m","usage":{}}}"#.to_string(),
        r#"{"usage":{}}"#.to_string(),
        assistant_line(SONNET, 10, 20, 0, 0),
    ];
    let records = Records::from_reader(Cursor::new(lines.join("\n").into_bytes()));
    let collected: Vec<_> = records.map(|r| r.unwrap().line_number).collect();
    assert_eq!(collected, vec![1, 4]);
}
