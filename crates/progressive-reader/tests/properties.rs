use context_progressive_reader::{
    build_table, open, Chunk, IndexerMode, Input, ReaderConfig, Session, SourceDocument,
};
use proptest::prelude::*;

const NAMES: &[&str] = &[
    "a.ts", "a.js", "a.rs", "a.py", "a.go", "A.java", "a.rb", "a.kt", "a.swift", "notes.txt",
];

/// Source-ish lines that stress delimiters, literals, comments and decorators
fn fragment() -> impl Strategy<Value = String> {
    let fixed = prop::sample::select(vec![
        "class A {\n",
        "export class Service {\n",
        "abstract f(\n",
        "  void g() {}\n",
        "function run(\n",
        "fn main() {\n",
        "impl Point {\n",
        "#[derive(Debug)]\n",
        "type T struct {\n",
        "def h(self):\n",
        "class K:\n",
        "    pass\n",
        "end\n",
        "  @Decorated\n",
        "@Arg() x: string);\n",
        "}\n",
        "{\n",
        "(",
        ")",
        ";\n",
        "\"\"\"\n",
        "'str {'\n",
        "`tmpl ${\n",
        "/* open {\n",
        "*/\n",
        "// } comment\n",
        "    return 1;\n",
        "\te\u{301}t\u{e9}\n",
        "\n",
    ])
    .prop_map(str::to_string);
    prop_oneof![
        4 => fixed,
        1 => "[ a-z(){};@\"]{0,12}\n?",
    ]
}

fn source() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment(), 0..80).prop_map(|parts| parts.concat())
}

fn config() -> impl Strategy<Value = ReaderConfig> {
    (1usize..40, 16usize..600, any::<bool>()).prop_map(|(lines, bytes, alignment)| {
        ReaderConfig::default()
            .max_lines(lines)
            .max_bytes(bytes)
            .alignment(alignment)
    })
}

fn read_all(session: &mut Session) -> Vec<Chunk> {
    std::iter::from_fn(|| session.next_chunk()).collect()
}

proptest! {
    #[test]
    fn boundary_tables_are_well_nested(text in source(), name in prop::sample::select(NAMES)) {
        let document = SourceDocument::from_text(text, Some(name));
        for mode in [IndexerMode::Heuristic, IndexerMode::Syntax, IndexerMode::Auto] {
            let table = build_table(&document, mode);
            prop_assert!(table.is_well_nested(), "{mode:?}: {:?}", table.entries());
        }
    }

    #[test]
    fn chunks_cover_the_document_within_budgets(
        text in source(),
        name in prop::sample::select(NAMES),
        config in config(),
    ) {
        let mut session = open(Input::named(name, text.clone()), config.clone()).unwrap();
        let chunks = read_all(&mut session);

        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        prop_assert_eq!(&joined, &text);
        prop_assert_eq!(chunks.first().map(|c| c.start_line), (!text.is_empty()).then_some(1));
        for pair in chunks.windows(2) {
            prop_assert_eq!(pair[0].end_line + 1, pair[1].start_line);
            prop_assert!(!pair[0].is_final);
        }
        if let Some(last) = chunks.last() {
            prop_assert!(last.is_final);
            prop_assert_eq!(last.end_line, session.document().total_lines());
        }
        for chunk in &chunks {
            prop_assert!(chunk.line_count() <= config.max_lines_per_chunk);
            prop_assert!(chunk.text.len() <= config.max_bytes_per_chunk || chunk.line_count() == 1);
        }

        session.reset();
        prop_assert_eq!(read_all(&mut session), chunks);
    }

    #[test]
    fn seek_resumes_at_or_before_the_target_line(
        text in source(),
        name in prop::sample::select(NAMES),
        config in config(),
        target in any::<prop::sample::Index>(),
    ) {
        let mut session = open(Input::named(name, text), config).unwrap();
        let total = session.document().total_lines();
        prop_assume!(total > 0);

        let line = target.index(total) + 1;
        session.seek(line).unwrap();
        let chunk = session.next_chunk().unwrap();
        prop_assert!(chunk.start_line <= line);
        prop_assert!(chunk.contains_line(line), "seek({}) -> {}-{}", line, chunk.start_line, chunk.end_line);
    }
}
