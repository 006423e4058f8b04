use unitdag::cli::LogLevel;
use unitdag::logging::build_filter;

#[test]
fn cli_level_wins_over_environment() {
    let filter = build_filter(Some(LogLevel::Debug), Some("trace"));
    assert_eq!(filter.to_string(), "debug");
}

#[test]
fn environment_accepts_module_directives() {
    let filter = build_filter(None, Some("info,unitdag::watch=trace"));
    let rendered = filter.to_string();
    assert!(rendered.contains("unitdag::watch=trace"), "{rendered}");
}

#[test]
fn missing_or_bad_environment_defaults_to_info() {
    assert_eq!(build_filter(None, None).to_string(), "info");
    assert_eq!(build_filter(None, Some("   ")).to_string(), "info");
    assert_eq!(build_filter(None, Some("unitdag=loud")).to_string(), "info");
}
