use std::path::Path;

use unitdag::exec::diagnostics::{failure_diagnostics, parse_diagnostics};

#[test]
fn parses_paren_style_diagnostics() {
    let out = "src/app.ts(12,5): error TS2322: Type 'string' is not assignable to type 'number'.";

    let errors = parse_diagnostics("web:compile", Path::new("/ws/apps/web"), out);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].task, "web:compile");
    assert_eq!(errors[0].file.as_deref(), Some(Path::new("/ws/apps/web/src/app.ts")));
    assert_eq!(errors[0].line, Some(12));
    assert!(errors[0].message.starts_with("error TS2322"));
}

#[test]
fn parses_colon_style_diagnostics_with_and_without_column() {
    let out = "\
compiling...
/abs/theme.scss:3:14: expected \";\"
lib/grammar.pegjs:7: unexpected token
done";

    let errors = parse_diagnostics("ui:style", Path::new("/ws/libs/ui"), out);

    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].file.as_deref(), Some(Path::new("/abs/theme.scss")));
    assert_eq!(errors[0].line, Some(3));
    assert_eq!(errors[0].message, "expected \";\"");
    assert_eq!(errors[1].file.as_deref(), Some(Path::new("/ws/libs/ui/lib/grammar.pegjs")));
    assert_eq!(errors[1].line, Some(7));
}

#[test]
fn unparseable_failure_reports_status_and_last_line() {
    let errors = failure_diagnostics(
        "core:native",
        Path::new("/ws/libs/core"),
        "make all",
        Some(2),
        "building\nmake: *** [all] Error 1\n\n",
    );

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].file, None);
    assert_eq!(
        errors[0].message,
        "`make all` exited with status 2: make: *** [all] Error 1"
    );
    assert_eq!(
        errors[0].to_string(),
        "[core:native] `make all` exited with status 2: make: *** [all] Error 1"
    );
}

#[test]
fn display_includes_location_when_known() {
    let errors = parse_diagnostics("a:compile", Path::new("/r"), "x.ts(1,1): boom");

    assert_eq!(errors[0].to_string(), "[a:compile] /r/x.ts:1: boom");
}
