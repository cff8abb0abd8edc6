use ordered_read_stream::{InputSource, LineReader};

fn reader(text: &str) -> LineReader {
    LineReader::new(InputSource::from_bytes(text.as_bytes().to_vec()))
}

#[test]
fn push_back_returns_same_line_without_counting() {
    let mut lr = reader("@r1\nACGT\n");
    let first = lr.next_line().unwrap().unwrap().to_string();
    let count = lr.line_count();

    lr.push_back();
    let again = lr.next_line().unwrap().unwrap().to_string();
    assert_eq!(first, again);
    assert_eq!(lr.line_count(), count);

    assert_eq!(lr.next_line().unwrap(), Some("ACGT"));
    assert_eq!(lr.line_count(), count + 1);
}

#[test]
fn last_line_is_exposed_without_reparsing() {
    let mut lr = reader("first\nsecond line\n");
    lr.next_line().unwrap();
    lr.next_line().unwrap();
    assert_eq!(lr.line(), "second line");
    assert_eq!(lr.len(), 11);
    assert_eq!(lr.context().line_num, 2);
}

#[test]
fn empty_lines_are_lines() {
    let mut lr = reader("\n\nx");
    assert_eq!(lr.next_line().unwrap(), Some(""));
    assert_eq!(lr.next_line().unwrap(), Some(""));
    assert_eq!(lr.next_line().unwrap(), Some("x"));
    assert_eq!(lr.next_line().unwrap(), None);
    assert_eq!(lr.line_count(), 3);
}

#[test]
fn pending_push_back_hides_eof() {
    let mut lr = reader("only\n");
    lr.next_line().unwrap();
    lr.push_back();
    assert!(!lr.is_eof());
    assert_eq!(lr.next_line().unwrap(), Some("only"));
    assert_eq!(lr.next_line().unwrap(), None);
    assert!(lr.is_eof());
}

#[test]
fn rewind_resets_position_and_counters() {
    let mut lr = reader("a\nb\n");
    lr.next_line().unwrap();
    lr.next_line().unwrap();
    lr.push_back();
    lr.rewind().unwrap();
    assert_eq!(lr.line_count(), 0);
    assert_eq!(lr.byte_pos(), 0);
    assert!(!lr.is_pushed_back());
    assert_eq!(lr.next_line().unwrap(), Some("a"));
}
