use mixdown::{parse, Key, Node, ParseError, Section, Value, ValueKind};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_ok(source: &str) -> Section {
    match parse(source) {
        Ok(section) => section,
        Err(e) => panic!("unexpected parse error: {}", e),
    }
}

fn parse_err(source: &str) -> ParseError {
    match parse(source) {
        Ok(section) => panic!("expected a parse error, got {:#?}", section),
        Err(e) => e,
    }
}

/// The single value block of a one-block document.
fn only_value(source: &str) -> Value {
    let root = parse_ok(source);
    let values = root.values();
    assert_eq!(values.len(), 1, "expected one value block");
    values[0].clone()
}

fn keys(value: &Value) -> &[Key] {
    match &value.kind {
        ValueKind::Object { keys } => keys,
        other => panic!("expected an object, got {:?}", other),
    }
}

fn key_names(value: &Value) -> Vec<&str> {
    keys(value).iter().map(|k| k.name.as_str()).collect()
}

fn code(value: &Value) -> &str {
    match &value.kind {
        ValueKind::Expression { code } => code,
        other => panic!("expected an expression, got {:?}", other),
    }
}

fn elements(value: &Value) -> (&[Value], bool) {
    match &value.kind {
        ValueKind::Array { elements, unordered } => (elements, *unordered),
        other => panic!("expected an array, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

#[test]
fn readme_example() {
    let root = parse_ok("# Title\n## Section\nSome textual comment\n\tuser:\n\t\tname: \"Gui\"");
    assert_eq!(root.name, "Title");
    assert_eq!(root.level, 1);
    assert_eq!(root.line, 1);
    assert_eq!(root.children.len(), 1);

    let Node::Section(section) = &root.children[0] else {
        panic!("expected a section");
    };
    assert_eq!(section.name, "Section");
    assert_eq!(section.level, 2);
    assert_eq!(section.line, 2);
    assert_eq!(section.children.len(), 2);

    let Node::Text(text) = &section.children[0] else {
        panic!("expected text");
    };
    assert_eq!(text.content, "Some textual comment");
    assert_eq!((text.line, text.size), (3, 1));

    let Node::Value(value) = &section.children[1] else {
        panic!("expected a value");
    };
    assert_eq!((value.line, value.size), (4, 2));
    assert_eq!(value.content, "\tuser:\n\t\tname: \"Gui\"");
    assert_eq!(key_names(value), ["user"]);

    let user = &keys(value)[0].value;
    assert_eq!((user.line, user.size), (5, 1));
    assert_eq!(key_names(user), ["name"]);

    let name = &keys(user)[0].value;
    assert_eq!((name.line, name.size), (5, 1));
    assert_eq!(code(name), "\"Gui\"");
}

#[test]
fn consecutive_text_lines_merge() {
    let root = parse_ok("# T\nline one\nline two\n\nline three");
    assert_eq!(root.children.len(), 2);

    let Node::Text(first) = &root.children[0] else {
        panic!("expected text");
    };
    assert_eq!(first.content, "line one\nline two");
    assert_eq!((first.line, first.size), (2, 2));

    let Node::Text(second) = &root.children[1] else {
        panic!("expected text");
    };
    assert_eq!(second.content, "line three");
    assert_eq!(second.line, 5);
}

#[test]
fn block_kind_change_starts_new_block() {
    let root = parse_ok("# T\ntext\n\tx: 1\nmore text");
    let kinds: Vec<_> = root
        .children
        .iter()
        .map(|child| match child {
            Node::Text(_) => "text",
            Node::Value(_) => "value",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, ["text", "value", "text"]);
}

#[test]
fn blank_line_separates_values() {
    let root = parse_ok("# T\n\ta: 1\n\n\tb: 2\n");
    let values = root.values();
    assert_eq!(values.len(), 2);
    assert_eq!(key_names(values[0]), ["a"]);
    assert_eq!(key_names(values[1]), ["b"]);
    assert_eq!(values[1].line, 4);
}

#[test]
fn code_blocks() {
    let root = parse_ok("# T\n```js\n1+1\n# not a header\n```\nafter");
    assert_eq!(root.children.len(), 2);

    let Node::Code(code) = &root.children[0] else {
        panic!("expected code");
    };
    assert_eq!(code.language, "js");
    assert_eq!(code.content, "1+1\n# not a header");
    assert_eq!((code.line, code.size), (2, 4));
    assert_eq!(root.children[1].line(), 6);
}

#[test]
fn empty_code_block() {
    let root = parse_ok("# T\n```\n```");
    let Node::Code(code) = &root.children[0] else {
        panic!("expected code");
    };
    assert_eq!(code.language, "");
    assert_eq!(code.content, "");
    assert_eq!(code.size, 2);
}

#[test]
fn header_nesting() {
    let root = parse_ok("# A\n## B\n### C\n#### D\n## E\ntext");
    let names: Vec<_> = root.sections().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["B", "E"]);

    let b = root.find_section("B").unwrap();
    assert_eq!(b.sections().count(), 1);
    let c = root.find_section("C").unwrap();
    assert_eq!(c.level, 3);
    assert_eq!(c.find_section("D").unwrap().level, 4);

    let e = root.find_section("E").unwrap();
    assert_eq!(e.children.len(), 1);
    assert!(matches!(e.children[0], Node::Text(_)));
}

#[test]
fn header_without_title() {
    let root = parse_ok("#\n##\n\tx: 1");
    assert_eq!(root.name, "");
    assert_eq!(root.find_section("").unwrap().level, 1);
    assert_eq!(root.values().len(), 1);
}

#[test]
fn crlf_line_endings() {
    let value = only_value("# A\r\n\ta: 1\r\n\tb: x\r\n");
    assert_eq!(key_names(&value), ["a", "b"]);
    assert_eq!(code(&keys(&value)[1].value), "x");
}

#[test]
fn values_in_document_order() {
    let root = parse_ok("# A\n\tx: 1\n## B\n\t*\t2\n## C\n\ty");
    let subtypes: Vec<_> = root.values().iter().map(|v| v.subtype()).collect();
    assert_eq!(subtypes, ["object", "array", "expression"]);
}

// ---------------------------------------------------------------------------
// Structural errors
// ---------------------------------------------------------------------------

#[test]
fn empty_document() {
    let e = parse_err("");
    assert_eq!(e.message, "empty document");
}

#[test]
fn must_start_with_level_one_header() {
    let e = parse_err("text\n# T");
    assert_eq!(e.message, "the document must start with a level 1 header");
    assert_eq!(e.line, 1);

    parse_err("## T");
    parse_err("\n# T");
}

#[test]
fn header_level_jump() {
    let e = parse_err("# A\n### C");
    assert_eq!(e.message, "unexpected header level 3 on section level 1");
    assert_eq!(e.line, 2);
}

#[test]
fn second_level_one_header() {
    let e = parse_err("# A\n## B\n# C");
    assert_eq!(e.message, "there can be only one level 1 header, on the first line");
    assert_eq!(e.line, 3);
}

#[test]
fn unterminated_code_block() {
    let e = parse_err("# A\ntext\n```js\n1 + 1");
    assert_eq!(e.message, "unterminated code block");
    assert_eq!(e.line, 3);
}

#[test]
fn space_indentation_rejected() {
    let e = parse_err("# A\n  x: 1");
    assert_eq!(e.message, "invalid line");
    assert_eq!(e.line, 2);
    assert_eq!(e.notes, ["tabs are the only legal indentation"]);
}

#[test]
fn error_carries_snippet() {
    let e = parse_err("# A\n\ta: 1\n\tb\n\tc: 3");
    assert_eq!(e.message, "expected a key followed by ':'");
    assert_eq!(e.line, 3);
    assert_eq!(e.snippet, " 1    | # A\n 2    | \ta: 1\n 3 >> | \tb\n 4    | \tc: 3");
    assert_eq!(e.to_string(), format!("{}\n{}", e.message, e.snippet));
}

// ---------------------------------------------------------------------------
// Value grammar
// ---------------------------------------------------------------------------

#[test]
fn expression_value() {
    let value = only_value("# A\n\t1 + 2 ");
    assert_eq!(code(&value), "1 + 2");
    assert_eq!(value.subtype(), "expression");
}

#[test]
fn multiline_expression_rejected() {
    let e = parse_err("# A\n\t1 +\n\t2");
    assert_eq!(e.message, "invalid value syntax");
    assert_eq!((e.line, e.size), (2, 2));
}

#[test]
fn ordered_array() {
    let value = only_value("# A\n\t*\t1\n\t*\t'two'");
    let (items, unordered) = elements(&value);
    assert!(!unordered);
    assert_eq!(items.len(), 2);
    assert_eq!(code(&items[0]), "1");
    assert_eq!(code(&items[1]), "'two'");
    assert_eq!(items[1].line, 3);
}

#[test]
fn unordered_array() {
    let value = only_value("# A\n\t@\t1\n\t@\t2");
    let (items, unordered) = elements(&value);
    assert!(unordered);
    assert_eq!(items.len(), 2);
}

#[test]
fn mixed_array_markers_rejected() {
    let e = parse_err("# A\n\t*\t1\n\t@\t2");
    assert_eq!(e.line, 3);
    assert!(e.message.contains("cannot mix"));
}

#[test]
fn array_of_objects_and_nested_arrays() {
    let value = only_value("# A\n\t*\t\n\t\ta: 1\n\t\tb: 2\n\t*\t*\t3\n\t\t*\t4");
    let (items, _) = elements(&value);
    assert_eq!(items.len(), 2);

    assert_eq!(key_names(&items[0]), ["a", "b"]);
    assert_eq!((items[0].line, items[0].size), (3, 2));

    let (inner, _) = elements(&items[1]);
    assert_eq!(inner.iter().map(code).collect::<Vec<_>>(), ["3", "4"]);
}

#[test]
fn object_with_inline_nested_object() {
    let value = only_value("# A\n\ta: b: 2");
    let inner = &keys(&value)[0].value;
    assert_eq!(key_names(inner), ["b"]);
    assert_eq!(code(&keys(inner)[0].value), "2");
}

#[test]
fn quoted_and_optional_keys() {
    let value = only_value("# A\n\t\"a key\": 1\n\t\"say \\\"hi\\\"\": 2\n\tmaybe?: 3\n\t$id_2: 4");
    assert_eq!(key_names(&value), ["a key", "say \"hi\"", "maybe?", "$id_2"]);
}

#[test]
fn comments_are_invisible() {
    let value = only_value("# A\n\t// leading\n\ta: 1\n\t// between\n\tb:\n\t\t// nested\n\t\tc: 2");
    assert_eq!(key_names(&value), ["a", "b"]);
    assert_eq!(key_names(&keys(&value)[1].value), ["c"]);
}

#[test]
fn empty_nested_value_rejected() {
    let e = parse_err("# A\n\ta:\n\tb: 1");
    assert_eq!(e.message, "expected a value");
    assert_eq!(e.line, 2);
}

#[test]
fn mixin_with() {
    let value = only_value("# A\n\tuser with\n\t\tname: 'Bob'\n\t\tage: 3");
    let ValueKind::Mixin { base, removals, additions } = &value.kind else {
        panic!("expected a mixin");
    };
    assert_eq!(base, "user");
    assert!(removals.is_empty());
    let names: Vec<_> = additions.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, ["name", "age"]);
}

#[test]
fn mixin_without_and_with() {
    let value = only_value(
        "# A\n\torder without items.price, id, items.price; with total: 3\n\t\titems.0.name: 'x'",
    );
    let ValueKind::Mixin { base, removals, additions } = &value.kind else {
        panic!("expected a mixin");
    };
    assert_eq!(base, "order");
    assert_eq!(removals, &["items.price", "id"]);
    let names: Vec<_> = additions.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, ["total", "items.0.name"]);
}

#[test]
fn mixin_on_dotted_base() {
    let value = only_value("# A\n\torder.items without price");
    let ValueKind::Mixin { base, removals, additions } = &value.kind else {
        panic!("expected a mixin");
    };
    assert_eq!(base, "order.items");
    assert_eq!(removals, &["price"]);
    assert!(additions.is_empty());
}

#[test]
fn mixin_errors() {
    let e = parse_err("# A\n\tuser without");
    assert!(e.message.contains("at least one path"));

    let e = parse_err("# A\n\tuser without pass\n\t\tname: 1");
    assert!(e.message.contains("unexpected lines"));
    assert_eq!(e.line, 3);

    let e = parse_err("# A\n\tuser without a b");
    assert!(e.message.contains("invalid path"));

    let e = parse_err("# A\n\tuser without a; name: 1");
    assert!(e.message.contains("'with'"));

    let e = parse_err("# A\n\tuser with");
    assert!(e.message.contains("at least one addition"));
}
