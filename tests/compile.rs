use octo::{Engine, ErrorKind, Settings};

#[test]
fn compile_empty() {
    Engine::new().compile("").unwrap();
}

#[test]
fn compile_raw() {
    Engine::new().compile("lorem ipsum dolor sit amet").unwrap();
}

#[test]
fn compile_raw_with_braces() {
    Engine::new().compile("fn main() { return; }").unwrap();
}

#[test]
fn compile_inline_expr() {
    Engine::new()
        .compile("lorem #(ipsum.dolor) sit amet")
        .unwrap();
}

#[test]
fn compile_inline_expr_literals() {
    let engine = Engine::new();
    for arg in [
        "nested.path",
        "$.path",
        "$",
        r#""normal""#,
        r#""escaped \n \r \t \\ \"""#,
        "true",
        "false",
        "null",
        "123",
        "-123",
        "3.14",
        "-3.14",
        "3.14e2",
        "314e-2",
        "[1, 2, 3]",
        "{x: 1, y: 2}",
        "items[0]",
        "items[key]",
        "a == b",
        "a = b",
        "a != b",
        "a < b",
        "a <= b",
        "a > b",
        "a >= b",
        "@upper(name)",
        "Math.floor(n)",
        "parseInt(n)",
    ] {
        engine.compile(&format!("#({arg})")).unwrap();
    }
}

#[test]
fn compile_blocks() {
    let engine = Engine::new();
    for source in [
        "#if(cond){lorem}",
        "#if(cond){lorem}#else{ipsum}",
        "#if(cond){lorem}#elseif(other){ipsum}#else{dolor}",
        "#each(map -> k, v){#(k)#(v)}",
        "#for(list -> item){#(item)}",
        "#for(list -> item, i){#(i)}",
        "#def(\"name\"){lorem}#use(\"name\")",
        "#if(a){#if(b){#each(c -> k, v){#(k)}}}",
    ] {
        engine.compile(source).unwrap();
    }
}

#[test]
fn compile_comments() {
    let engine = Engine::new();
    engine.compile("lorem ## ipsum\ndolor").unwrap();
    engine.compile("lorem #* ipsum *# dolor").unwrap();
    engine.compile("#if(a){#* comment *#}").unwrap();
}

#[test]
fn compile_err_unclosed_block() {
    for source in [
        "#if(true){",
        "#if(true){lorem",
        "#each(map -> k, v){",
        "#for(list -> v){#(v)",
        "#def(\"partial\"){lorem",
    ] {
        let err = Engine::new().compile(source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnbalancedBlock, "source: {source}");
    }
}

#[test]
fn compile_err_unmatched_close() {
    let err = Engine::new().compile("lorem } #(ipsum)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnbalancedBlock);
}

#[test]
fn compile_close_in_raw_text_is_literal() {
    // a close brace away from any directive is just text
    Engine::new().compile("lorem } ipsum").unwrap();
}

#[test]
fn compile_err_unexpected_else() {
    let err = Engine::new().compile("lorem #else{C}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);

    let err = Engine::new()
        .compile("#if(a){A}#else{B}#elseif(c){C}")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn compile_err_chain_broken_by_text() {
    let err = Engine::new().compile("#if(a){A} x #else{B}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn compile_unregistered_directive_is_literal() {
    Engine::new().compile("lorem #nope(1) ipsum").unwrap();
}

#[test]
fn compile_grammar_mismatch_is_literal() {
    let engine = Engine::new();
    for source in [
        "#if oops",
        "#if(unbalanced",
        "#each(list){lorem}",
        "#each(list -> only){lorem}",
        "#for(list -> v) no block open",
        "#def(name){lorem}",
        "#use(123)",
        "#()",
    ] {
        engine.compile(source).unwrap();
    }
}

#[test]
fn compile_strict_grammar_mismatch_is_error() {
    let engine = Engine::with_settings(Settings::new().strict(true));
    for source in [
        "#if oops",
        "#each(list){lorem}",
        "#def(name){lorem}",
        "#(a b)",
    ] {
        let err = engine.compile(source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax, "source: {source}");
    }
}

#[test]
fn compile_strict_still_allows_unregistered() {
    // an unrecognized name is pass-through even in strict mode
    let engine = Engine::with_settings(Settings::new().strict(true));
    engine.compile("lorem #nope ipsum").unwrap();
}

#[test]
fn compile_err_partial_depth() {
    let err = Engine::new()
        .compile("#def(\"a\"){#use(\"a\")}#use(\"a\")")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert!(err.to_string().contains("depth"));
}

#[test]
fn compile_custom_sigil() {
    let engine = Engine::with_settings(Settings::new().sigil('%'));
    engine.compile("lorem %(ipsum) # dolor").unwrap();
}

#[test]
fn compile_directive_alias() {
    let mut engine = Engine::new();
    engine.add_directive("when", octo::Descriptor::block(octo::Op::If));
    engine.compile("#when(cond){lorem}").unwrap();
}

#[test]
fn compile_determinism() {
    let engine = Engine::new();
    let source = "#for(items -> v, i){#(i):#(v) }#if(done){ok}";
    let a = engine.compile(source).unwrap();
    let b = engine.compile(source).unwrap();
    let ctx = octo::data! { items: ["x", "y"], done: true };
    assert_eq!(a.render(&ctx).unwrap(), b.render(&ctx).unwrap());
}

#[test]
fn compile_never_corrupts_engine() {
    let engine = Engine::new();
    assert!(engine.compile("#if(a){").is_err());
    // the failed compile must not affect later ones
    let t = engine.compile("#if(a){ok}").unwrap();
    assert_eq!(t.render(octo::data! { a: true }).unwrap(), "ok");
}
