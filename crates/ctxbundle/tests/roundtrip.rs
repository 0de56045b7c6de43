use ctxbundle::{
    BundleFormat, CodecError, Entry, ParsedSection, PromptTemplate, ReverseOptions, ReverseParser,
    parse, serialize,
};

fn sample_entries() -> Vec<Entry> {
    vec![
        Entry::new("src/index.ts", "export const a = 1;", "typescript"),
        Entry::new("src/util/math.ts", "export function add(a: number, b: number) {\n  return a + b;\n}", "typescript"),
        Entry::new("README.md", "# Demo", "markdown"),
    ]
}

fn sections_of(entries: &[Entry]) -> Vec<ParsedSection> {
    entries
        .iter()
        .map(|entry| ParsedSection::new(entry.path.clone(), entry.content.clone()))
        .collect()
}

#[test]
fn every_format_round_trips_trimmed_content() {
    let entries = sample_entries();
    for format in [BundleFormat::Text, BundleFormat::Markdown, BundleFormat::Json] {
        let bundle = serialize(&entries, format, PromptTemplate::None, "demo").unwrap();
        let parsed = parse(&bundle.bundle_text).unwrap();
        assert_eq!(parsed, sections_of(&entries), "format {}", format.as_str());
    }
}

#[test]
fn preambles_do_not_disturb_reconstruction() {
    let entries = sample_entries();
    for template in [PromptTemplate::Claude, PromptTemplate::ChatGpt, PromptTemplate::Gemini] {
        for format in [BundleFormat::Text, BundleFormat::Json] {
            let bundle = serialize(&entries, format, template, "demo").unwrap();
            let outcome = ReverseParser::new().parse_detailed(&bundle.bundle_text).unwrap();
            assert_eq!(outcome.format, format);
            assert_eq!(outcome.sections, sections_of(&entries));
        }
    }
}

#[test]
fn json_round_trip_is_exact_for_any_content() {
    let entries = vec![
        Entry::new("pad.txt", "\n  x\n\n", "text"),
        Entry::new(" notes.txt", format!("above\n{}\nbelow", "=".repeat(80)), "text"),
        Entry::new("docs/fence.md", "```\ncode\n```\n", "markdown"),
        Entry::new("empty.txt", "", "text"),
    ];
    for template in [PromptTemplate::None, PromptTemplate::Claude, PromptTemplate::ChatGpt] {
        let bundle = serialize(&entries, BundleFormat::Json, template, "demo").unwrap();
        let outcome = ReverseParser::new().parse_detailed(&bundle.bundle_text).unwrap();
        assert_eq!(outcome.format, BundleFormat::Json);
        assert_eq!(outcome.sections, sections_of(&entries), "template {}", template.as_str());
    }
}

#[test]
fn serialization_is_deterministic() {
    let entries = sample_entries();
    let first = serialize(&entries, BundleFormat::Markdown, PromptTemplate::Claude, "demo").unwrap();
    let second = serialize(&entries, BundleFormat::Markdown, PromptTemplate::Claude, "demo").unwrap();
    assert_eq!(first, second);
}

#[test]
fn caller_order_is_preserved() {
    let entries = vec![
        Entry::new("z.js", "z", "javascript"),
        Entry::new("a.js", "a", "javascript"),
    ];
    let bundle = serialize(&entries, BundleFormat::Text, PromptTemplate::None, "p").unwrap();
    let z = bundle.bundle_text.find("FILE: z.js").unwrap();
    let a = bundle.bundle_text.find("FILE: a.js").unwrap();
    assert!(z < a);

    let paths: Vec<_> = parse(&bundle.bundle_text)
        .unwrap()
        .into_iter()
        .map(|section| section.path)
        .collect();
    assert_eq!(paths, ["z.js", "a.js"]);
}

#[test]
fn deselected_entries_are_left_out() {
    let mut entries = sample_entries();
    entries[1].selected = false;
    let bundle = serialize(&entries, BundleFormat::Json, PromptTemplate::None, "demo").unwrap();
    assert_eq!(bundle.total_files, 2);
    assert!(!bundle.bundle_text.contains("math.ts"));
    assert!(!bundle.tree.contains("math.ts"));
}

#[test]
fn metrics_cover_selected_entries() {
    let entries = vec![
        Entry::new("a.py", "print(1)\nprint(2)", "python"),
        Entry::new("b.py", "x = 1", "python"),
        Entry::new("c.rs", "fn c() {}", "rust"),
    ];
    let bundle = serialize(&entries, BundleFormat::Text, PromptTemplate::None, "m").unwrap();
    assert_eq!(bundle.total_files, 3);
    assert_eq!(bundle.total_size, 17 + 5 + 9);
    assert_eq!(bundle.stats.total_lines, 4);
    assert_eq!(bundle.stats.languages.get("python"), Some(&2));
    assert_eq!(bundle.stats.languages.get("rust"), Some(&1));
    assert_eq!(
        bundle.total_tokens,
        bundle.bundle_text.chars().count().div_ceil(4)
    );
}

#[test]
fn plain_json_document_is_accepted() {
    let text = r#"{"project":"x","files":[{"path":"a.txt","content":"hello"}]}"#;
    let outcome = ReverseParser::new().parse_detailed(text).unwrap();
    assert_eq!(outcome.format, BundleFormat::Json);
    assert_eq!(outcome.sections, vec![ParsedSection::new("a.txt", "hello")]);
}

#[test]
fn unrecognized_input_explains_supported_formats() {
    let err = parse("just some notes\nwith no structure").unwrap_err();
    assert!(matches!(err, CodecError::NoSectionsFound));
    let message = err.to_string();
    assert!(message.starts_with("no files found in the input."));
    assert!(message.contains("FILE: "));
    assert!(message.contains("### File: "));
}

#[test]
fn delimiter_inside_content_splits_the_section() {
    let entries = vec![Entry::new(
        "notes.txt",
        format!("before\n{0}\nFILE: fake.txt\n{0}\n\nafter", "=".repeat(80)),
        "text",
    )];
    let bundle = serialize(&entries, BundleFormat::Text, PromptTemplate::None, "p").unwrap();
    let parsed = parse(&bundle.bundle_text).unwrap();
    assert_eq!(
        parsed,
        vec![
            ParsedSection::new("notes.txt", "before"),
            ParsedSection::new("fake.txt", "after"),
        ]
    );
}

#[test]
fn exact_mode_keeps_surrounding_whitespace() {
    let entries = vec![Entry::new("pad.txt", "\n  indented\n\n", "text")];
    let bundle = serialize(&entries, BundleFormat::Text, PromptTemplate::None, "p").unwrap();

    let trimmed = parse(&bundle.bundle_text).unwrap();
    assert_eq!(trimmed[0].content, "indented");

    let exact = ReverseParser::with_options(ReverseOptions { trim_content: false })
        .parse(&bundle.bundle_text)
        .unwrap();
    assert_eq!(exact[0].content, "\n  indented\n\n");
}

#[test]
fn markdown_round_trips_configured_language_tags() {
    let entries = vec![
        Entry::new("a.m", "int a;", "objective c"),
        Entry::new("run.sh", "echo hi", "text/x-sh"),
    ];
    let bundle = serialize(&entries, BundleFormat::Markdown, PromptTemplate::None, "p").unwrap();
    assert_eq!(parse(&bundle.bundle_text).unwrap(), sections_of(&entries));
}
