use mixdown::{parse, stringify};

fn roundtrip(source: &str) {
    let tree = parse(source).unwrap_or_else(|e| panic!("parse failed: {}", e));
    assert_eq!(stringify(&tree), source);
}

#[test]
fn stringify_parsed_tree() {
    roundtrip("# Title\n## Sub title\n\ta: b: 2\n\n```js\n1+1\n```");
}

#[test]
fn stringify_header_only() {
    roundtrip("# Title");
}

#[test]
fn stringify_nested_sections() {
    roundtrip("# A\n## B\n### C\ntext\n\n## D\n\t*\t1\n\t*\t2");
}

#[test]
fn stringify_keeps_block_text() {
    roundtrip("# A\nsome text\nover two lines\n\n\tuser without pass; with\n\t\t// comment\n\t\tname: 'x'\n\n\t1 + 1");
}

#[test]
fn stringify_empty_code_block() {
    roundtrip("# A\n```\n```\n\nafter");
}

#[test]
fn stringify_normalizes_blank_lines() {
    let tree = parse("# A\n\n\ntext\n\n\n\n\tx: 1\n\n").unwrap();
    assert_eq!(stringify(&tree), "# A\ntext\n\n\tx: 1");
}
