use super::*;

fn texts(text: &str) -> Vec<&str> {
    tokenize(text).into_iter().map(|t| t.text).collect()
}

#[test]
fn test_tokenize_splits_brackets() {
    assert_eq!(
        texts("<Bias> [-20 -20 -20]"),
        vec!["<Bias>", "[", "-20", "-20", "-20", "]"]
    );
    assert_eq!(texts("[ 1 2;3 4 ]"), vec!["[", "1", "2", ";", "3", "4", "]"]);
    assert!(tokenize(" \n\t ").is_empty());
}

#[test]
fn test_tokenize_records_line_breaks() {
    let tokens = tokenize("[ 1 2\n 3 4 ]");
    let breaks: Vec<bool> = tokens.iter().map(|t| t.newline_before).collect();
    assert_eq!(breaks, vec![false, false, false, true, false, false]);
}

#[test]
fn test_read_matrix_newline_rows() {
    let mut reader = TokenReader::new("[ 1 2 3 4 5 \n 2 3 5 6 8 ] ");
    let matrix = reader.read_matrix("input").unwrap();
    assert_eq!(
        matrix,
        array![[1.0, 2.0, 3.0, 4.0, 5.0], [2.0, 3.0, 5.0, 6.0, 8.0]]
    );
    assert!(reader.is_empty());
}

#[test]
fn test_read_matrix_semicolon_rows() {
    let mut reader = TokenReader::new("[ -1 -2 ; 0 0 ;\n 1 2 ]");
    let matrix = reader.read_matrix("<Filters>").unwrap();
    assert_eq!(matrix, array![[-1.0, -2.0], [0.0, 0.0], [1.0, 2.0]]);
}

#[test]
fn test_read_matrix_leading_newline() {
    // layout produced by write_matrix
    let mut reader = TokenReader::new(" [\n  1 2\n  3 4 ]");
    let matrix = reader.read_matrix("<Filters>").unwrap();
    assert_eq!(matrix, array![[1.0, 2.0], [3.0, 4.0]]);
}

#[test]
fn test_read_matrix_empty() {
    let mut reader = TokenReader::new("[ ]");
    assert_eq!(reader.read_matrix("m").unwrap().dim(), (0, 0));
}

#[test]
fn test_read_matrix_errors() {
    let ragged = TokenReader::new("[ 1 2 ; 3 ]").read_matrix("<Filters>");
    assert!(matches!(ragged, Err(ModelError::ConfigError(msg)) if msg.contains("row 1")));

    let unclosed = TokenReader::new("[ 1 2 ").read_matrix("<Filters>");
    assert!(matches!(unclosed, Err(ModelError::ConfigError(msg)) if msg.contains("']'")));

    let not_a_number = TokenReader::new("[ 1 x ]").read_matrix("<Filters>");
    assert!(matches!(not_a_number, Err(ModelError::ConfigError(msg)) if msg.contains("'x'")));

    let no_bracket = TokenReader::new("1 2 ]").read_matrix("<Filters>");
    assert!(no_bracket.is_err());
}

#[test]
fn test_read_vector() {
    let mut reader = TokenReader::new("[ -20 -20 -20 ]");
    assert_eq!(reader.read_vector("<Bias>").unwrap(), array![-20.0, -20.0, -20.0]);

    let mut reader = TokenReader::new("[ 1 ; 2 ]");
    assert!(reader.read_vector("<Bias>").is_err());
}

#[test]
fn test_reader_words() {
    let mut reader = TokenReader::new("<PatchDim> 3 <PatchStep> x");
    assert_eq!(reader.peek(), Some("<PatchDim>"));
    assert_eq!(reader.next_word("a tag").unwrap(), "<PatchDim>");
    assert_eq!(reader.read_usize("<PatchDim>").unwrap(), 3);
    assert_eq!(reader.next_word("a tag").unwrap(), "<PatchStep>");
    assert!(reader.read_usize("<PatchStep>").is_err());
    assert!(reader.is_empty());
    assert!(reader.next_word("anything").is_err());
}

#[test]
fn test_write_then_read_literals() {
    let matrix = array![[0.1f32, -2.5e-7, 3.0], [1.0 / 3.0, f32::MAX, -0.0]];
    let vector = array![1.0f32 / 7.0, -20.0];
    let mut text = String::new();
    write_matrix(&mut text, &matrix);
    write_vector(&mut text, &vector);

    let mut reader = TokenReader::new(&text);
    assert_eq!(reader.read_matrix("m").unwrap(), matrix);
    assert_eq!(reader.read_vector("v").unwrap(), vector);
}
