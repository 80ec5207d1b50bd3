use docsift::{config::Config, postprocess::clean_text};

#[test]
fn sanitizes_control_chars() {
    let cfg = Config::default();
    let cleaned = clean_text(&cfg.postprocess, "Alpha\u{0002}Beta\u{0084}\nLine\tTabbed\r\nNext");

    assert!(!cleaned.contains('\u{0002}'));
    assert!(cleaned.contains("AlphaBeta"));
    assert!(cleaned.contains('\n'));
    assert!(cleaned.contains('\t'));
    assert!(!cleaned.contains('\r'));
}

#[test]
fn trims_lines_and_edges() {
    let cfg = Config::default();
    let cleaned = clean_text(&cfg.postprocess, "\n\n  first   \nsecond\t \n\n");
    assert_eq!(cleaned, "first\nsecond");
}

#[test]
fn applies_compatibility_normalization() {
    let cfg = Config::default();
    assert_eq!(clean_text(&cfg.postprocess, "ﬁle №５"), "file No5");
}

#[test]
fn cleaning_is_idempotent() {
    let cfg = Config::default();
    let inputs = [
        "",
        "plain",
        " \r\n Mixed\u{0007} line endings\r\r\ntrailing   \n",
        "--- Page 1 ---\nInvoice 2024\n\n--- Page 2 ---\n",
    ];
    for raw in inputs {
        let once = clean_text(&cfg.postprocess, raw);
        assert_eq!(clean_text(&cfg.postprocess, &once), once, "input {raw:?}");
    }
}

#[test]
fn normalization_can_be_disabled() {
    let mut cfg = Config::default();
    cfg.postprocess.normalize_unicode = false;
    cfg.postprocess.control_chars_to_sanitize.clear();
    let cleaned = clean_text(&cfg.postprocess, "ﬁ\u{0007}");
    assert_eq!(cleaned, "ﬁ\u{0007}");
}
