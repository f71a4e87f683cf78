use octo::{data, Engine, ErrorKind, HelperSet, Value};

#[test]
fn helper_one_arg() {
    let mut engine = Engine::new();
    engine.add_helper("double", |n: i64| n * 2);
    let result = engine
        .compile("#(@double(n))")
        .unwrap()
        .render(data! { n: 21 })
        .unwrap();
    assert_eq!(result, "42");
}

#[test]
fn helper_two_args() {
    let mut engine = Engine::new();
    engine.add_helper("repeat", |s: String, n: i64| s.repeat(n as usize));
    let result = engine
        .compile("#(@repeat(word, 3))")
        .unwrap()
        .render(data! { word: "ha" })
        .unwrap();
    assert_eq!(result, "hahaha");
}

#[test]
fn helper_three_args() {
    let mut engine = Engine::new();
    engine.add_helper("clamp", |n: f64, lo: f64, hi: f64| n.max(lo).min(hi));
    let result = engine
        .compile("#(@clamp(n, 0.0, 1.0))")
        .unwrap()
        .render(data! { n: 3.5 })
        .unwrap();
    assert_eq!(result, "1");
}

#[test]
fn helper_option_return() {
    let mut engine = Engine::new();
    engine.add_helper("head", |mut list: Vec<Value>| {
        if list.is_empty() {
            None
        } else {
            Some(list.remove(0))
        }
    });
    let result = engine
        .compile("#(@head(items))!")
        .unwrap()
        .render(data! { items: [] })
        .unwrap();
    assert_eq!(result, "!");
}

#[test]
fn helper_result_return() {
    let mut engine = Engine::new();
    engine.add_helper("checked", |n: i64| -> Result<i64, String> {
        if n < 0 {
            Err(String::from("negative"))
        } else {
            Ok(n)
        }
    });
    let template = engine.compile("#(@checked(n))").unwrap();
    assert_eq!(template.render(data! { n: 1 }).unwrap(), "1");
    let err = template.render(data! { n: -1 }).unwrap_err();
    assert!(err.to_string().contains("negative"));
}

#[test]
fn helper_err_wrong_arity() {
    let mut engine = Engine::new();
    engine.add_helper("double", |n: i64| n * 2);
    let err = engine
        .compile("#(@double(n, 2))")
        .unwrap()
        .render(data! { n: 1 })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert!(err.to_string().contains("expected 1 arguments, found 2"));
}

#[test]
fn helper_err_wrong_type() {
    let mut engine = Engine::new();
    engine.add_helper("double", |n: i64| n * 2);
    let err = engine
        .compile("#(@double(n))")
        .unwrap()
        .render(data! { n: "nope" })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert!(err.to_string().contains("expected integer argument, found string"));
}

#[test]
fn helper_registration_is_first_write_wins() {
    let mut engine = Engine::new();
    engine.add_helper("greet", |s: String| format!("Hello {s}"));
    engine.add_helper("greet", |s: String| format!("Bye {s}"));
    let result = engine
        .compile("#(name):greet")
        .unwrap()
        .render(data! { name: "Ann" })
        .unwrap();
    assert_eq!(result, "Hello Ann");
}

#[test]
fn helper_render_overrides() {
    let mut engine = Engine::new();
    engine.add_helper("unit", |n: i64| format!("{n}px"));
    let template = engine.compile("#(n):unit").unwrap();
    assert_eq!(template.render(data! { n: 2 }).unwrap(), "2px");

    let mut overrides = HelperSet::new();
    overrides.add("unit", |n: i64| format!("{n}em"));
    assert_eq!(
        template
            .render_with_helpers(data! { n: 2 }, &overrides)
            .unwrap(),
        "2em"
    );
    // the engine set is untouched
    assert_eq!(template.render(data! { n: 2 }).unwrap(), "2px");
}

#[test]
fn helper_overrides_extend() {
    let engine = Engine::new();
    let template = engine.compile("#(s):scramble").unwrap();
    assert!(template.render(data! { s: "x" }).is_err());

    let mut overrides = HelperSet::new();
    overrides.add("scramble", |s: String| s.chars().rev().collect::<String>());
    assert_eq!(
        template
            .render_with_helpers(data! { s: "abc" }, &overrides)
            .unwrap(),
        "cba"
    );
}

#[test]
fn builtin_case_helpers() {
    let engine = Engine::new();
    assert_eq!(
        engine
            .compile("#(name):upper")
            .unwrap()
            .render(data! { name: "ann" })
            .unwrap(),
        "ANN"
    );
    assert_eq!(
        engine
            .compile("#(name):lower")
            .unwrap()
            .render(data! { name: "ANN" })
            .unwrap(),
        "ann"
    );
}

#[test]
fn builtin_trim() {
    let engine = Engine::new();
    assert_eq!(
        engine
            .compile("#(s):trim!")
            .unwrap()
            .render(data! { s: "  padded  " })
            .unwrap(),
        "padded!"
    );
}

#[test]
fn builtin_length() {
    let engine = Engine::new();
    assert_eq!(
        engine
            .compile("#(@length(items))")
            .unwrap()
            .render(data! { items: [1, 2, 3] })
            .unwrap(),
        "3"
    );
    assert_eq!(
        engine
            .compile("#(@length(word))")
            .unwrap()
            .render(data! { word: "four" })
            .unwrap(),
        "4"
    );
}

#[test]
fn builtin_first_last_reverse() {
    let engine = Engine::new();
    let ctx = data! { items: ["a", "b", "c"] };
    assert_eq!(
        engine
            .compile("#(@first(items))#(@last(items))")
            .unwrap()
            .render(&ctx)
            .unwrap(),
        "ac"
    );
    assert_eq!(
        engine
            .compile("#(@reverse(word))")
            .unwrap()
            .render(data! { word: "abc" })
            .unwrap(),
        "cba"
    );
}

#[test]
fn builtin_encode_html_is_unaffected_by_unsafe() {
    // explicitly piping through encodeHTML escapes even unsafe output
    let engine = Engine::new();
    assert_eq!(
        engine
            .compile("#!(s):encodeHTML")
            .unwrap()
            .render(data! { s: "<b>" })
            .unwrap(),
        "&#60;b&#62;"
    );
}
