use octo::{data, Engine, ErrorKind, Settings};

#[track_caller]
fn render(source: &str, ctx: octo::Value) -> String {
    Engine::new()
        .compile(source)
        .unwrap()
        .render(&ctx)
        .unwrap()
}

#[test]
fn render_raw() {
    let sources = [
        "lorem ipsum dolor sit amet",
        "multi\nline\ttext",
        "braces { belong } to the text",
        "unicode привіт 🦀",
    ];
    for source in sources {
        assert_eq!(render(source, data! {}), source);
    }
}

#[test]
fn render_inline_expr_bool() {
    assert_eq!(render("lorem #(ipsum)", data! { ipsum: true }), "lorem true");
}

#[test]
fn render_inline_expr_i64() {
    assert_eq!(render("lorem #(ipsum)", data! { ipsum: 123 }), "lorem 123");
}

#[test]
fn render_inline_expr_f64() {
    assert_eq!(
        render("lorem #(ipsum)", data! { ipsum: 123.4 }),
        "lorem 123.4"
    );
}

#[test]
fn render_inline_expr_string() {
    assert_eq!(
        render("lorem #(ipsum)", data! { ipsum: "dolor" }),
        "lorem dolor"
    );
}

#[test]
fn render_inline_expr_none_is_empty() {
    assert_eq!(render("lorem #(ipsum)!", data! { ipsum: None }), "lorem !");
    assert_eq!(render("lorem #(missing)!", data! {}), "lorem !");
}

#[test]
fn render_inline_expr_nested_path() {
    assert_eq!(
        render("#(user.address.city)", data! { user: { address: { city: "Oslo" } } }),
        "Oslo"
    );
}

#[test]
fn render_inline_expr_root_sigil() {
    assert_eq!(render("#($.name)", data! { name: "root" }), "root");
}

#[test]
fn render_inline_expr_missing_map_key_is_empty() {
    assert_eq!(render("#(user.age)!", data! { user: {} }), "!");
}

#[test]
fn render_inline_expr_err_access_of_none() {
    let err = Engine::new()
        .compile("lorem #(ipsum.dolor)")
        .unwrap()
        .render(data! { ipsum: None })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(
        format!("{:#}", err),
        "
   |
 1 | lorem #(ipsum.dolor)
   |               ^^^^^ cannot access `dolor` of none
"
    );
}

#[test]
fn render_inline_expr_err_access_of_scalar() {
    let err = Engine::new()
        .compile("#(ipsum.dolor)")
        .unwrap()
        .render(data! { ipsum: 123 })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert!(err.to_string().contains("cannot access `dolor` of integer"));
}

#[test]
fn render_inline_expr_err_unrenderable() {
    let err = Engine::new()
        .compile("#(ipsum)")
        .unwrap()
        .render(data! { ipsum: {} })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn render_escaping() {
    assert_eq!(render("#(value)", data! { value: "<b>" }), "&#60;b&#62;");
    assert_eq!(render("#!(value)", data! { value: "<b>" }), "<b>");
    assert_eq!(
        render("#(value)", data! { value: "a & b / 'c'" }),
        "a &#38; b &#47; &#39;c&#39;"
    );
}

#[test]
fn render_escaping_skips_entities() {
    assert_eq!(render("#(value)", data! { value: "&#38; &" }), "&#38; &#38;");
}

#[test]
fn render_index_expr() {
    assert_eq!(
        render("#(items[1])", data! { items: ["a", "b"] }),
        "b"
    );
    assert_eq!(
        render("#(items[lookup])", data! { items: ["a", "b"], lookup: 0 }),
        "a"
    );
    assert_eq!(
        render("#(map[\"key\"])", data! { map: { key: "val" } }),
        "val"
    );
    // out of range indexes are absent, not errors
    assert_eq!(render("#(items[9])!", data! { items: ["a"] }), "!");
}

#[test]
fn render_length_member() {
    assert_eq!(render("#(items.length)", data! { items: [1, 2, 3] }), "3");
    assert_eq!(render("#(word.length)", data! { word: "four" }), "4");
}

#[test]
fn render_if_true() {
    assert_eq!(render("#if(cond){yes}", data! { cond: true }), "yes");
}

#[test]
fn render_if_false() {
    assert_eq!(render("#if(cond){yes}", data! { cond: false }), "");
}

#[test]
fn render_if_truthiness() {
    for (value, exp) in [
        (data! { cond: 0 }, ""),
        (data! { cond: 1 }, "yes"),
        (data! { cond: "" }, ""),
        (data! { cond: "x" }, "yes"),
        (data! { cond: None }, ""),
        (data! { cond: [] }, "yes"),
        (data! { cond: {} }, "yes"),
    ] {
        assert_eq!(render("#if(cond){yes}", value), exp);
    }
}

#[test]
fn render_if_missing_cond_is_falsy() {
    assert_eq!(render("#if(cond){yes}", data! {}), "");
}

#[test]
fn render_if_else() {
    assert_eq!(
        render("#if(cond){yes}#else{no}", data! { cond: false }),
        "no"
    );
}

#[test]
fn render_conditional_chain() {
    let source = "#if(false){A}#elseif(true){B}#else{C}";
    assert_eq!(render(source, data! {}), "B");

    let source = "#if(a){A}#elseif(b){B}#elseif(c){C}#else{D}";
    assert_eq!(render(source, data! { a: true }), "A");
    assert_eq!(render(source, data! { b: true }), "B");
    assert_eq!(render(source, data! { c: true }), "C");
    assert_eq!(render(source, data! {}), "D");
}

#[test]
fn render_conditional_chain_with_whitespace() {
    let source = "#if(a){A} #elseif(b){B} #else{C}";
    assert_eq!(render(source, data! { b: true }), "B");
    assert_eq!(render(source, data! {}), "C");
}

#[test]
fn render_if_comparisons() {
    assert_eq!(render("#if(n == 3){eq}", data! { n: 3 }), "eq");
    assert_eq!(render("#if(n = 3){eq}", data! { n: 3 }), "eq");
    assert_eq!(render("#if(n != 3){ne}", data! { n: 4 }), "ne");
    assert_eq!(render("#if(n < 10){lt}", data! { n: 4 }), "lt");
    assert_eq!(render("#if(n >= 10){ge}#else{no}", data! { n: 4 }), "no");
    assert_eq!(render("#if(n == 3.0){eq}", data! { n: 3 }), "eq");
    assert_eq!(
        render("#if(name == \"Ann\"){hi}", data! { name: "Ann" }),
        "hi"
    );
}

#[test]
fn render_for_loop() {
    assert_eq!(
        render("#for([\"a\",\"b\",\"c\"] -> v, i){#(i)#(v)}", data! {}),
        "0a1b2c"
    );
}

#[test]
fn render_for_loop_without_index() {
    assert_eq!(
        render("#for(items -> v){#(v),}", data! { items: [1, 2, 3] }),
        "1,2,3,"
    );
}

#[test]
fn render_for_loop_absent_is_noop() {
    assert_eq!(render("#for(items -> v){#(v)}", data! {}), "");
    assert_eq!(render("#for(items -> v){#(v)}", data! { items: None }), "");
    assert_eq!(render("#for(items -> v){#(v)}", data! { items: 42 }), "");
}

#[test]
fn render_for_loop_of_maps() {
    assert_eq!(
        render(
            "#for(users -> u){#(u.name);}",
            data! { users: [{ name: "Ann" }, { name: "Bob" }] }
        ),
        "Ann;Bob;"
    );
}

#[test]
fn render_each_loop() {
    assert_eq!(
        render("#each({x:1,y:2} -> k, v){#(k)=#(v);}", data! {}),
        "x=1;y=2;"
    );
}

#[test]
fn render_each_loop_order_is_stable() {
    let source = "#each(map -> k, v){#(k)}";
    let ctx = data! { map: { b: 1, a: 2, c: 3 } };
    let first = render(source, ctx.clone());
    for _ in 0..3 {
        assert_eq!(render(source, ctx.clone()), first);
    }
}

#[test]
fn render_each_loop_absent_is_noop() {
    assert_eq!(render("#each(m -> k, v){#(k)}", data! {}), "");
    assert_eq!(render("#each(m -> k, v){#(k)}", data! { m: false }), "");
    assert_eq!(render("#each(m -> k, v){#(k)}", data! { m: [1] }), "");
}

#[test]
fn render_nested_loops() {
    assert_eq!(
        render(
            "#for(rows -> row){#for(row -> cell){#(cell)}|}",
            data! { rows: [[1, 2], [3, 4]] }
        ),
        "12|34|"
    );
}

#[test]
fn render_scope_restored_after_block() {
    // after the block closes, `v` resolves exactly as before it opened
    let source = "#each(list -> k, v){#(v)}|#(v)|";
    assert_eq!(render(source, data! { list: { a: 1 } }), "1||");
    assert_eq!(
        render(source, data! { list: { a: 1 }, v: "outer" }),
        "1|outer|"
    );
}

#[test]
fn render_scope_restored_nested_same_name() {
    let source = "#for(xs -> v){#for(ys -> v){#(v)}#(v)}";
    assert_eq!(
        render(source, data! { xs: ["outer"], ys: ["inner"] }),
        "innerouter"
    );
}

#[test]
fn render_loop_source_sees_outer_binding() {
    // the iterable is translated before the loop names are bound
    let source = "#for(v -> v){#(v)}";
    assert_eq!(render(source, data! { v: ["a", "b"] }), "ab");
}

#[test]
fn render_scope_inside_conditional() {
    let source = "#each(list -> k, v){#if(v){#(k)}}";
    assert_eq!(
        render(source, data! { list: { a: 1, b: 0, c: 2 } }),
        "ac"
    );
}

#[test]
fn render_partial_lifecycle() {
    assert_eq!(
        render(
            "#def(\"greet\"){Hello #(name)!}#use(\"greet\")",
            data! { name: "Ann" }
        ),
        "Hello Ann!"
    );
}

#[test]
fn render_partial_undefined_is_empty() {
    assert_eq!(render("#use(\"missing\")", data! {}), "");
}

#[test]
fn render_partial_def_emits_nothing() {
    assert_eq!(render("a#def(\"p\"){hidden}b", data! {}), "ab");
}

#[test]
fn render_partial_use_before_def_is_empty() {
    // a partial only resolves once its `def` has closed earlier in the
    // template
    assert_eq!(render("#use(\"p\")#def(\"p\"){late}", data! {}), "");
}

#[test]
fn render_partial_reuse() {
    assert_eq!(
        render("#def(\"x\"){ab}#use(\"x\")#use(\"x\")#use(\"x\")", data! {}),
        "ababab"
    );
}

#[test]
fn render_partial_with_directives() {
    let source = "#def(\"row\"){#if(on){+}#else{-}}#use(\"row\")#use(\"row\")";
    assert_eq!(render(source, data! { on: true }), "++");
    assert_eq!(render(source, data! { on: false }), "--");
}

#[test]
fn render_partial_sees_use_site_scope() {
    let source = "#def(\"cell\"){[#(v)]}#for(items -> v){#use(\"cell\")}";
    assert_eq!(render(source, data! { items: [1, 2] }), "[1][2]");
}

#[test]
fn render_partial_nested_def() {
    let source = "#def(\"outer\"){#def(\"inner\"){i}o}#use(\"outer\")#use(\"inner\")";
    assert_eq!(render(source, data! {}), "oi");
}

#[test]
fn render_partial_redefinition_overwrites() {
    let source = "#def(\"p\"){one}#def(\"p\"){two}#use(\"p\")";
    assert_eq!(render(source, data! {}), "two");
}

#[test]
fn render_json() {
    assert_eq!(
        render("#!json(user)", data! { user: { name: "Ann", age: 9 } }),
        r#"{"age":9,"name":"Ann"}"#
    );
    assert_eq!(render("#!json(items)", data! { items: [1, 2] }), "[1,2]");
}

#[test]
fn render_json_escaped_by_default() {
    assert_eq!(
        render("#json(user)", data! { user: { name: "Ann" } }),
        "{&#34;name&#34;:&#34;Ann&#34;}"
    );
}

#[test]
fn render_comments_excluded() {
    assert_eq!(render("a## comment\nb", data! {}), "a\nb");
    assert_eq!(render("a#* comment *#b", data! {}), "ab");
    assert_eq!(
        render("#if(true){y#* inner *#es}", data! {}),
        "yes"
    );
}

#[test]
fn render_unregistered_directive_passthrough() {
    assert_eq!(render("tag #nope(1) here", data! {}), "tag #nope(1) here");
    assert_eq!(render("100% #1 done", data! {}), "100% #1 done");
}

#[test]
fn render_grammar_mismatch_passthrough() {
    assert_eq!(render("#if oops", data! {}), "#if oops");
}

#[test]
fn render_pipes() {
    let mut engine = Engine::new();
    engine.add_helper("shout", |s: String| s.to_uppercase());
    engine.add_helper("wrap", |s: String| format!("[{s}]"));
    let result = engine
        .compile("#(name):shout:wrap")
        .unwrap()
        .render(data! { name: "ann" })
        .unwrap();
    assert_eq!(result, "[ANN]");
}

#[test]
fn render_pipe_output_is_escaped() {
    let mut engine = Engine::new();
    engine.add_helper("tag", |s: String| format!("<{s}>"));
    let result = engine
        .compile("#(name):tag")
        .unwrap()
        .render(data! { name: "b" })
        .unwrap();
    assert_eq!(result, "&#60;b&#62;");
}

#[test]
fn render_helper_call_in_expr() {
    let mut engine = Engine::new();
    engine.add_helper("join", |list: Vec<octo::Value>, sep: String| {
        list.iter()
            .map(|v| match v {
                octo::Value::String(s) => s.clone(),
                v => format!("{v:?}"),
            })
            .collect::<Vec<_>>()
            .join(&sep)
    });
    let result = engine
        .compile("#(@join(items, \", \"))")
        .unwrap()
        .render(data! { items: ["a", "b"] })
        .unwrap();
    assert_eq!(result, "a, b");
}

#[test]
fn render_err_unknown_helper() {
    let err = Engine::new()
        .compile("#(name):nothere")
        .unwrap()
        .render(data! { name: "x" })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert!(err.to_string().contains("unknown helper"));
}

#[test]
fn render_globals() {
    assert_eq!(render("#(parseInt(n))", data! { n: "12px" }), "12");
    assert_eq!(render("#(parseFloat(n))", data! { n: "2.5rem" }), "2.5");
    assert_eq!(render("#(Math.floor(n))", data! { n: 9.7 }), "9");
    assert_eq!(render("#(Math.max(1, n, 2))", data! { n: 7 }), "7");
    assert_eq!(render("#if(isNaN(n)){nan}", data! { n: "x" }), "nan");
    assert_eq!(render("#if(isFinite(n)){fin}", data! { n: 1 }), "fin");
}

#[test]
fn render_globals_shadow_bindings() {
    // the closed set of globals cannot be rebound by loops
    let source = "#for(items -> Math){#(Math.floor(2.5))}";
    assert_eq!(render(source, data! { items: [1] }), "2");
}

#[test]
fn render_err_not_callable() {
    let err = Engine::new()
        .compile("#(name(1))")
        .unwrap()
        .render(data! { name: "x" })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert!(err.to_string().contains("not callable"));
}

#[test]
fn render_literal_seq_and_map() {
    assert_eq!(render("#!json(true)", data! {}), "true");
    assert_eq!(render("#!json([1, \"two\", null])", data! {}), r#"[1,"two",null]"#);
    assert_eq!(render("#!json({a: 1})", data! {}), r#"{"a":1}"#);
}

#[test]
fn render_strip_mode() {
    let engine = Engine::with_settings(Settings::new().strip(true));
    let result = engine
        .compile("  <ul>\n    <li>#(item)</li>\n  </ul>")
        .unwrap()
        .render(data! { item: "x" })
        .unwrap();
    assert_eq!(result, "<ul> <li>x</li> </ul>");
}

#[test]
fn render_append_modes_equivalent() {
    let source = "a#* c *#b#(x)c";
    let ctx = data! { x: 1 };
    let append = Engine::with_settings(Settings::new().append(true))
        .compile(source)
        .unwrap()
        .render(&ctx)
        .unwrap();
    let split = Engine::with_settings(Settings::new().append(false))
        .compile(source)
        .unwrap()
        .render(&ctx)
        .unwrap();
    assert_eq!(append, split);
    assert_eq!(append, "ab1c");
}

#[test]
fn render_to_writer() {
    let mut buf = Vec::new();
    Engine::new()
        .compile("Hello #(name)!")
        .unwrap()
        .render_to_writer(&mut buf, data! { name: "Ann" })
        .unwrap();
    assert_eq!(buf, b"Hello Ann!");
}

#[test]
fn render_repeatedly_with_different_contexts() {
    let engine = Engine::new();
    let template = engine.compile("#(greeting), #(name)!").unwrap();
    assert_eq!(
        template
            .render(data! { greeting: "Hello", name: "Ann" })
            .unwrap(),
        "Hello, Ann!"
    );
    assert_eq!(
        template
            .render(data! { greeting: "Hei", name: "Bob" })
            .unwrap(),
        "Hei, Bob!"
    );
}

#[test]
fn render_stored_template() {
    let mut engine = Engine::new();
    engine.add_template("page", "#for(items -> v){#(v)}").unwrap();
    let result = engine
        .get_template("page")
        .unwrap()
        .render(data! { items: ["x", "y"] })
        .unwrap();
    assert_eq!(result, "xy");
}
