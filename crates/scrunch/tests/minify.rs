//! End-to-end pipeline tests: parse, analyze, crunch, emit.

use scrunch::{
    analyze, crunch, minify, parse, CrunchOptions, MinifyOptions, OutputMode, ScopeTree, Severity,
};

fn passthrough_options() -> MinifyOptions {
    MinifyOptions { crunch: CrunchOptions::passthrough(), ..MinifyOptions::default() }
}

fn run(source: &str, options: &MinifyOptions) -> String {
    minify(source, options).unwrap().code
}

#[test]
fn test_emission_is_idempotent() {
    let options = passthrough_options();
    let sources = [
        "var a = 1, b = [1, , 3]; function f(x) { return x ? a : b; }",
        "for (var k in o) { if (o[k] === 2) continue; total += o[k]; }",
        "do { x = -(-x); } while (x < 10);",
        "try { f(); } catch (e) { g(e); } finally { h(); }",
        "switch (a) { case 1: f(); break; default: g(); }",
        "x = { \"a\": 1, \"two words\": [2], three: function () { return this; } };",
    ];
    for source in sources {
        let once = run(source, &options);
        let twice = run(&once, &options);
        assert_eq!(once, twice, "not stable for {source:?}");
    }
}

#[test]
fn test_minified_output_reparses() {
    let options = MinifyOptions::default();
    let out = run(
        "function outer(first, second) {\n\
           var sum = first + second;\n\
           function inner(third) { return sum * third; }\n\
           return inner(2);\n\
         }",
        &options,
    );
    assert!(parse(&out).is_ok());
    // And minifying the minified form changes nothing but names it already
    // chose, so it is a fixed point
    assert_eq!(run(&out, &options), out);
}

#[test]
fn test_array_literal_survives() {
    assert_eq!(run("x = [1, 2, 3];", &MinifyOptions::default()), "x=[1,2,3]");
}

#[test]
fn test_eval_keeps_its_function_honest() {
    let out = run(
        "function risky(input) { var secret = 1; eval(input); return secret; }\n\
         function safe() { var hidden = 2; return hidden; }",
        &MinifyOptions::default(),
    );
    // Everything in the eval-bearing function keeps its source name
    assert!(out.contains("var secret=1"));
    assert!(out.contains("return secret"));
    assert!(out.contains("eval(input)"));
    // The sibling function still gets crunched
    assert!(out.contains("var a=2;return a"));
}

#[test]
fn test_eval_protects_outer_scopes_too() {
    let out = run(
        "function outer() { var count = 1; function risky() { eval(s); } return count; }",
        &MinifyOptions::default(),
    );
    // eval inside `risky` can reach `count` through the scope chain, so the
    // whole ancestry keeps its source names
    assert!(out.contains("var count=1"));
    assert!(out.contains("return count"));
}

#[test]
fn test_evals_are_safe_restores_renaming() {
    let options = MinifyOptions {
        crunch: CrunchOptions { evals_are_safe: true, ..CrunchOptions::default() },
        ..MinifyOptions::default()
    };
    let out = run("function risky(input) { var secret = 1; eval(input); return secret; }", &options);
    assert!(!out.contains("secret"));
}

#[test]
fn test_with_body_names_are_untouchable() {
    let out = run(
        "function f(obj) { var width = 1; with (obj) { width = height; } return width; }",
        &MinifyOptions::default(),
    );
    // `width` may refer to the object at runtime; both it and the ambient
    // `height` keep their names
    assert!(out.contains("width=height"));
    assert!(out.contains("var width=1"));
    assert!(out.contains("return width"));
}

#[test]
fn test_assigned_names_are_unique_per_visibility() {
    let source = "function outer(first, second) {\n\
                    var third = first;\n\
                    function inner(fourth) { return first + fourth; }\n\
                    function other() { var fifth; return second; }\n\
                  }";
    let mut ast = parse(source).unwrap();
    let options = CrunchOptions::default();
    let mut analysis = analyze(&mut ast, &options);
    crunch(&mut analysis.scopes, &options);
    let scopes = &analysis.scopes;

    for s in 0..scopes.scope_count() {
        // No two bindings of one scope share an output name
        let mut seen = Vec::new();
        for &b in &scopes.scope(s).declared {
            if scopes.binding(b).outer.is_some() {
                continue;
            }
            let name = scopes.output_name(b).to_string();
            assert!(!seen.contains(&name), "duplicate {name} in scope {s}");
            seen.push(name);
        }
        // No assigned name shadows something an enclosing scope still calls
        // by that name
        let mut ancestor = scopes.scope(s).parent;
        while let Some(a) = ancestor {
            for &b in &scopes.scope(a).declared {
                if scopes.binding(b).outer.is_some() {
                    continue;
                }
                let outer_name = scopes.output_name(b);
                for &own in &scopes.scope(s).declared {
                    if scopes.binding(own).outer.is_none()
                        && scopes.binding(own).crunched.is_some()
                    {
                        assert_ne!(scopes.output_name(own), outer_name);
                    }
                }
            }
            ancestor = scopes.scope(a).parent;
        }
    }
}

#[test]
fn test_name_sequence_reaches_double_letters() {
    let mut decls: Vec<String> = Vec::new();
    for i in 0..60 {
        decls.push(format!("v{i}={i}"));
    }
    let source = format!("function f() {{ var {}; }}", decls.join(","));
    let out = run(&source, &MinifyOptions::default());

    // Single letters first; `f` stays free because the enclosing function
    // still answers to it. Then the bijective tail begins.
    assert!(out.contains("var a=0"));
    assert!(out.contains("e=4"));
    assert!(out.contains("g=5"));
    assert!(out.contains("z=24"));
    assert!(out.contains("A=25"));
    assert!(out.contains("Z=50"));
    assert!(out.contains("aa=51"));
    assert!(out.contains("ia=59"));
}

#[test]
fn test_top_level_renaming_is_opt_in() {
    let source = "var total = 0; function bump() { total += 1; }";
    let kept = run(source, &MinifyOptions::default());
    assert!(kept.contains("var total=0"));
    assert!(kept.contains("function bump()"));

    let options = MinifyOptions {
        crunch: CrunchOptions { rename_top_level: true, ..CrunchOptions::default() },
        ..MinifyOptions::default()
    };
    let renamed = run(source, &options);
    assert!(!renamed.contains("total"));
    assert!(!renamed.contains("bump"));
}

#[test]
fn test_label_spelling_is_shared_by_all_jumps() {
    let out = run(
        "scan: while (a) { while (b) { if (c) break scan; continue scan; } }",
        &MinifyOptions::default(),
    );
    assert!(out.starts_with("a:while(a)"));
    assert!(out.contains("break a"));
    assert!(out.contains("continue a"));
    assert!(!out.contains("scan"));
}

#[test]
fn test_labels_keep_names_when_disabled() {
    let options = MinifyOptions {
        crunch: CrunchOptions { rename_labels: false, ..CrunchOptions::default() },
        ..MinifyOptions::default()
    };
    let out = run("scan: while (a) { while (b) { break scan; } }", &options);
    assert!(out.contains("scan:while(a)"));
    assert!(out.contains("break scan"));
}

#[test]
fn test_cc_directives_round_trip() {
    let source = "/*@cc_on @set @version = 4 @if (@version >= 4) special(); @else @*/ normal(); /*@end @*/";
    let options = passthrough_options();
    let once = run(source, &options);
    assert!(once.contains("@cc_on"));
    assert!(once.contains("@set@version=4"));
    assert!(once.contains("@if(@version>=4)"));
    assert!(once.contains("@else"));
    assert!(once.contains("@end"));
    assert!(once.contains("normal()"));
    // The wrapped form parses again and is stable
    assert_eq!(run(&once, &options), once);
}

#[test]
fn test_diagnostics_come_with_best_effort_output() {
    let out = minify(
        "function f(dup, dup) { return dup; } break missing;",
        &MinifyOptions::default(),
    );
    // break at top level: the undefined label is reported, output still
    // produced
    let out = out.unwrap();
    assert!(!out.code.is_empty());
    assert!(out.diagnostics.iter().any(|d| d.severity == Severity::Warning));
    assert!(out.diagnostics.iter().any(|d| d.severity == Severity::Error));
}

#[test]
fn test_syntax_errors_are_fatal() {
    assert!(minify("var = ;", &MinifyOptions::default()).is_err());
    assert!(minify("function (", &MinifyOptions::default()).is_err());
}

#[test]
fn test_multi_line_mode_differs_only_in_whitespace() {
    let source = "function f(x) { if (x) { return 1; } return 2; }";
    let single = run(source, &MinifyOptions::default());
    let options = MinifyOptions {
        codegen: scrunch::CodegenOptions {
            output_mode: OutputMode::MultiLine,
            ..scrunch::CodegenOptions::default()
        },
        ..MinifyOptions::default()
    };
    let multi = run(source, &options);
    assert!(multi.contains('\n'));
    let squeeze = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    assert_eq!(squeeze(&single), squeeze(&multi));
}

#[test]
fn test_predefined_globals_are_never_renamed() {
    let out = run(
        "function f() { var el = document.getElementById(\"x\"); return el; }",
        &MinifyOptions::default(),
    );
    assert!(out.contains("document.getElementById"));
    assert!(!out.contains("el"));
}

#[test]
fn test_reserved_names_survive_round_trip() {
    let mut reserved = rustc_hash::FxHashSet::default();
    reserved.insert("keepMe".to_string());
    let options = MinifyOptions {
        crunch: CrunchOptions { reserved_names: reserved, ..CrunchOptions::default() },
        ..MinifyOptions::default()
    };
    let out = run("function f() { var keepMe = 1, other = 2; return keepMe + other; }", &options);
    assert!(out.contains("keepMe"));
    assert!(!out.contains("other"));
}

#[test]
fn test_catch_scope_holds_only_the_parameter() {
    let mut ast = parse("function f() { try { g(); } catch (err) { var leak = err; } }").unwrap();
    let options = CrunchOptions::default();
    let analysis = analyze(&mut ast, &options);
    let scopes = &analysis.scopes;

    // Global, function, catch
    assert_eq!(scopes.scope_count(), 3);
    let catch_scope = (0..scopes.scope_count())
        .find(|&s| scopes.scope(s).kind == scrunch::ScopeKind::Catch)
        .unwrap();
    let names: Vec<&str> = scopes
        .scope(catch_scope)
        .declared
        .iter()
        .map(|&b| scopes.binding(b).name.as_str())
        .collect();
    assert_eq!(names, vec!["err"]);
    // `leak` hoisted past it into the function scope
    let fn_scope = scopes.scope(catch_scope).parent.unwrap();
    assert!(scopes.lookup_in(fn_scope, "leak").is_some());
    assert_ne!(fn_scope, ScopeTree::GLOBAL);
}
