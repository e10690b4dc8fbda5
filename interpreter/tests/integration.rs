use std::sync::Arc;

use interpreter::{base_context, compile, CompileError, Compiler, Error};
use mixdown::{
    parse, stringify, Context, DiagnosticError, MixinError, RuntimeError, RuntimeValue, Value,
    ValueKind,
};
use serde_json::json;

fn context() -> Context {
    Context::new()
        .with("user", json!({"name": "John", "pass": "123"}))
        .with(
            "order",
            json!({
                "items": [{"name": "a", "price": 60}, {"name": "b", "price": 63}],
                "price": 123,
            }),
        )
        .with(
            "Math",
            [("random", RuntimeValue::function("random", |_| Ok(RuntimeValue::Number(0.17))))]
                .into_iter()
                .collect::<mixdown::Object>(),
        )
        .with(
            "randomId",
            RuntimeValue::function("randomId", |_| Ok("123456789012345678901234".into())),
        )
        .with("randomStr", RuntimeValue::function("randomStr", |_| Ok("hi".into())))
        .with("five", 5.0)
}

/// Build a one-value document from value lines, each indented by one tab.
fn document(lines: &[&str]) -> String {
    let body: Vec<String> = lines.iter().map(|line| format!("\t{}", line)).collect();
    format!("#\n{}", body.join("\n"))
}

fn run_value(lines: &[&str]) -> Result<RuntimeValue, DiagnosticError> {
    let source = document(lines);
    let tree = compile(&source, None).unwrap_or_else(|e| panic!("compile failed: {}", e));
    let values = tree.values();
    assert_eq!(values.len(), 1, "expected one value block");
    values[0].compiled().expect("value was not compiled").run(&context())
}

fn run_ok(lines: &[&str]) -> RuntimeValue {
    match run_value(lines) {
        Ok(value) => value,
        Err(e) => panic!("run failed: {}", e),
    }
}

fn check(lines: &[&str], expected: serde_json::Value) {
    assert_eq!(run_ok(lines).to_json(), expected, "for {:?}", lines);
}

fn run_err(lines: &[&str]) -> DiagnosticError {
    match run_value(lines) {
        Ok(value) => panic!("expected a runtime error, got {:?}", value),
        Err(e) => e,
    }
}

fn array(items: Vec<RuntimeValue>, unordered: bool) -> RuntimeValue {
    RuntimeValue::array(items, unordered)
}

fn numbers(items: &[f64]) -> Vec<RuntimeValue> {
    items.iter().map(|n| RuntimeValue::Number(*n)).collect()
}

// ---------------------------------------------------------------------------
// Objects and expressions
// ---------------------------------------------------------------------------

#[test]
fn basic_properties() {
    check(
        &["user:", "\tname: \"John\"", "\tpassword: \"123\""],
        json!({"user": {"name": "John", "password": "123"}}),
    );

    check(
        &[
            "item:",
            "\tname: \"Chocolate\" + \" \" + \"Cake\"",
            "\t// prices must be like \"3.14\"",
            "\tprice: (314/100).toFixed(2)",
        ],
        json!({"item": {"name": "Chocolate Cake", "price": "3.14"}}),
    );
}

#[test]
fn expressions() {
    check(&["[\"sugar\", \"milk\"]"], json!(["sugar", "milk"]));
    check(&["Math.random()"], json!(0.17));
    check(&["itemId:", "\trandomId()"], json!({"itemId": "123456789012345678901234"}));
    check(&["itemId: randomId()"], json!({"itemId": "123456789012345678901234"}));
    check(&["five * 2 > 9 ? 'yes' : 'no'"], json!("yes"));
}

#[test]
fn later_duplicate_keys_win() {
    check(&["a: 1", "b: 2", "a: 3"], json!({"a": 3, "b": 2}));
}

#[test]
fn escaped_keys() {
    check(&["\"1 vérÿ odd \\\" key\": 17"], json!({"1 vérÿ odd \" key": 17}));
}

#[test]
fn empty_lines_at_the_end() {
    check(&["a: 2", "\t", "", "\t\t"], json!({"a": 2}));
}

// ---------------------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------------------

#[test]
fn simple_arrays() {
    check(&["tags: [\"light\", \"pink\"]"], json!({"tags": ["light", "pink"]}));

    let value = run_ok(&["tags:", "\t*\t\"light\"", "\t*\t\"pink\""]);
    let RuntimeValue::Object(object) = &value else {
        panic!("expected an object, got {:?}", value);
    };
    assert_eq!(
        object.get("tags"),
        Some(&array(vec!["light".into(), "pink".into()], false))
    );

    assert_eq!(run_ok(&["*\t3", "*\t14", "*\t15"]), array(numbers(&[3.0, 14.0, 15.0]), false));
}

#[test]
fn unordered_arrays() {
    assert_eq!(run_ok(&["@\t92", "@\t65", "@\t35"]), array(numbers(&[92.0, 65.0, 35.0]), true));
}

#[test]
fn complex_arrays() {
    check(
        &[
            "messages:",
            "\t*\tgroup: \"family\"",
            "\t\tnum: 2",
            "\t*\tgroup: \"work\"",
            "\t\tnum: 12",
        ],
        json!({"messages": [{"group": "family", "num": 2}, {"group": "work", "num": 12}]}),
    );

    assert_eq!(
        run_ok(&["*\t@\t1", "\t@\t2", "*\t*\t3", "\t*\t4"]),
        array(
            vec![
                array(numbers(&[1.0, 2.0]), true),
                array(numbers(&[3.0, 4.0]), false),
            ],
            false
        )
    );
}

// ---------------------------------------------------------------------------
// Mixins
// ---------------------------------------------------------------------------

#[test]
fn simple_mixins() {
    check(&["user with pass: \"1234\""], json!({"name": "John", "pass": "1234"}));
    check(&["user without name"], json!({"pass": "123"}));
    check(
        &["user without name, pass; with", "\tage: 36", "\ttoken: randomStr(16)"],
        json!({"age": 36, "token": "hi"}),
    );
}

#[test]
fn complex_mixins() {
    check(
        &["order without items.price"],
        json!({"items": [{"name": "a"}, {"name": "b"}], "price": 123}),
    );
    check(
        &["order without items.0.name, price"],
        json!({"items": [{"price": 60}, {"name": "b", "price": 63}]}),
    );
    check(
        &["order with items.ok: true"],
        json!({
            "items": [
                {"name": "a", "price": 60, "ok": true},
                {"name": "b", "price": 63, "ok": true}
            ],
            "price": 123
        }),
    );
    check(&["order.items without 0"], json!([{"name": "b", "price": 63}]));
}

#[test]
fn mixins_with_array_index() {
    check(
        &["order with items.0.name: \"c\""],
        json!({"items": [{"name": "c", "price": 60}, {"name": "b", "price": 63}], "price": 123}),
    );
}

#[test]
fn mixin_additions_are_values() {
    check(
        &["user with", "\tpass: user.pass + '4'", "\ttags:", "\t\t@\t'a'", "\t\t@\t'b'"],
        json!({"name": "John", "pass": "1234", "tags": ["a", "b"]}),
    );
}

#[test]
fn mixins_nest_inside_objects() {
    check(
        &["buyer: user without pass", "total: order.price"],
        json!({"buyer": {"name": "John"}, "total": 123}),
    );
}

#[test]
fn mixins_never_modify_the_context() {
    let source = document(&["order without items.price; with price: 0"]);
    let tree = compile(&source, None).unwrap();
    let context = context();
    let before = context.get("order").cloned();
    tree.values()[0].compiled().unwrap().run(&context).unwrap();
    assert_eq!(context.get("order").cloned(), before);
}

// ---------------------------------------------------------------------------
// Runtime errors
// ---------------------------------------------------------------------------

#[test]
fn undefined_variable_points_at_the_value() {
    let err = run_err(&["a: 1", "b: nope"]);
    assert_eq!(err.error, RuntimeError::UndefinedVariable("nope".to_string()));
    assert_eq!((err.line, err.size), (3, 1));
    assert_eq!(
        err.to_string(),
        "nope is not defined\n 1    | #\n 2    | \ta: 1\n 3 >> | \tb: nope"
    );
}

#[test]
fn runtime_error_is_the_diagnostic_source() {
    let err = run_err(&["b: nope"]);
    let source = std::error::Error::source(&err).map(|e| e.to_string());
    assert_eq!(source.as_deref(), Some("nope is not defined"));
}

#[test]
fn mixin_errors_point_at_the_mixin() {
    let err = run_err(&["first: 1", "second: user without missing"]);
    assert_eq!(
        err.error,
        RuntimeError::Mixin(MixinError::MissingKey { key: "missing".to_string() })
    );
    assert_eq!(err.line, 3);
    assert!(err.to_string().starts_with("can't remove key missing from the object\n"));
}

#[test]
fn mixin_base_must_be_structured() {
    let err = run_err(&["five with a: 1"]);
    assert_eq!(
        err.error,
        RuntimeError::Mixin(MixinError::InvalidBase { got: "number".to_string() })
    );
    assert!(err
        .to_string()
        .starts_with("expected base of mixin to be a non-null object"));

    let err = run_err(&["ghost with a: 1"]);
    assert_eq!(err.error, RuntimeError::UndefinedVariable("ghost".to_string()));
}

#[test]
fn expression_syntax_errors_surface_at_run_time() {
    let source = document(&["a: 1 +"]);
    let tree = compile(&source, None).expect("expression text is not parsed at compile time");
    let err = tree.values()[0].compiled().unwrap().run(&context()).unwrap_err();
    assert!(matches!(err.error, RuntimeError::Syntax(_)));
    assert_eq!(err.line, 2);
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

#[test]
fn compile_replaces_every_value() {
    let source = "# Doc\n\ta: 1\n## Part\ntext\n\n\t*\t1\n### Deeper\n\tuser without pass";
    let tree = compile(source, None).unwrap();
    let values = tree.values();
    assert_eq!(values.len(), 3);
    assert!(values.iter().all(|v| v.is_compiled()));
    assert_eq!(
        values[2].compiled().unwrap().run(&context()).unwrap().to_json(),
        json!({"name": "John"})
    );
}

#[test]
fn compile_keeps_positions_and_text() {
    let source = "# T\n## Sub title\n\ta: b: 2\n\n```js\n1+1\n```";
    let parsed = parse(source).unwrap();
    let compiled = compile(source, Some(parsed.clone())).unwrap();
    let (before, after) = (parsed.values()[0], compiled.values()[0]);
    assert_eq!((after.line, after.size), (before.line, before.size));
    assert_eq!(after.content, before.content);
    assert_eq!(stringify(&compiled), source);
}

#[test]
fn compile_is_idempotent() {
    let source = document(&["a: 1"]);
    let once = compile(&source, None).unwrap();
    let first = once.values()[0].compiled().unwrap().clone();

    let mut twice = once.clone();
    let count = Compiler::new(&source).compile_document(&mut twice).unwrap();
    assert_eq!(count, 0);
    assert_eq!(twice.values()[0].compiled(), Some(&first));
}

#[test]
fn compile_reports_parse_errors() {
    match compile("# A\n### C", None) {
        Err(Error::Parse(e)) => assert_eq!(e.line, 2),
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn nested_compiled_values_are_rejected() {
    let source = document(&["a: 1"]);
    let compiled = compile(&source, None).unwrap().values()[0].clone();
    let wrapper = Value {
        line: 1,
        size: 1,
        content: String::new(),
        kind: ValueKind::Array {
            elements: vec![compiled],
            unordered: false,
        },
    };
    assert_eq!(
        Compiler::new(&source).compile_value(&wrapper).unwrap_err(),
        CompileError::NestedCompiled { line: 2 }
    );
}

#[test]
fn custom_expression_evaluator() {
    let source = document(&["a: anything at all", "b: 2"]);
    let mut tree = parse(&source).unwrap();
    let compiler = Compiler::new(&source).with_evaluator(Arc::new(
        |code: &str, _: &Context| -> Result<RuntimeValue, RuntimeError> {
            Ok(RuntimeValue::String(code.to_uppercase()))
        },
    ));
    compiler.compile_document(&mut tree).unwrap();
    let value = tree.values()[0].compiled().unwrap().run(&Context::new()).unwrap();
    assert_eq!(value.to_json(), json!({"a": "ANYTHING AT ALL", "b": "2"}));
}

#[test]
fn compiled_values_run_concurrently() {
    let source = document(&["name: user.name", "n: five"]);
    let tree = compile(&source, None).unwrap();
    let compiled = tree.values()[0].compiled().unwrap().clone();

    std::thread::scope(|scope| {
        for i in 0..4 {
            let compiled = compiled.clone();
            scope.spawn(move || {
                let context = context().with("five", f64::from(i));
                let value = compiled.run(&context).unwrap();
                assert_eq!(value.to_json(), json!({"name": "John", "n": i}));
            });
        }
    });
}

#[test]
fn helpers_are_available_to_expressions() {
    let source = document(&["id: randomHex(6)", "n: randomInt(1, 2)", "empty: empty"]);
    let tree = compile(&source, None).unwrap();
    let value = tree.values()[0].compiled().unwrap().run(&base_context()).unwrap();
    let json = value.to_json();
    assert_eq!(json["id"].as_str().map(str::len), Some(6));
    assert_eq!(json["n"], json!(1));
    assert_eq!(json["empty"], json!({}));
}

#[test]
fn helper_failures_come_back_as_errors() {
    let source = document(&["x: randomDate(1e20)"]);
    let tree = compile(&source, None).unwrap();
    let err = tree.values()[0].compiled().unwrap().run(&base_context()).unwrap_err();
    assert_eq!(err.line, 2);
    assert!(err.to_string().starts_with("randomDate: interval"));

    let y = document(&["y: randomStr(1e20)"]);
    let tree = compile(&y, None).unwrap();
    let err = tree.values()[0].compiled().unwrap().run(&base_context()).unwrap_err();
    assert!(matches!(err.error, RuntimeError::Custom(_)));
}
