use assert_cmd::cargo::cargo_bin_cmd;

fn help_output(args: &[&str]) -> String {
    let assert = cargo_bin_cmd!("lspace").args(args).assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 help")
}

#[test]
fn top_level_help_lists_every_command() {
    let output = help_output(&["--help"]);
    assert!(
        output.contains("Regenerate the workspace file and open it in the editor."),
        "open summary missing: {output}"
    );
    assert!(
        output.contains("Build the current project and its selected neighbors"),
        "build summary missing: {output}"
    );
    assert!(
        output.contains("Pull every reachable dependency into the space"),
        "complete summary missing: {output}"
    );
    assert!(
        output.contains("Detach a package, or every non-root member"),
        "eject summary missing: {output}"
    );
    assert!(
        output.contains("Show the resolved space membership and links."),
        "list summary missing: {output}"
    );
    assert!(
        output.contains("lspace build --mode downstream"),
        "examples missing: {output}"
    );
}

#[test]
fn build_help_shows_modes_and_examples() {
    let output = help_output(&["build", "--help"]);
    assert!(
        output.contains("lspace build [--mode single|downstream|everything] [--root DIR]"),
        "usage override missing: {output}"
    );
    assert!(
        output.contains("lspace build --mode everything --root ~/work/app"),
        "root example missing: {output}"
    );
    assert!(
        output.contains("Report the build selection without running anything"),
        "dry-run flag help missing: {output}"
    );
}

#[test]
fn eject_help_shows_both_targets() {
    let output = help_output(&["eject", "--help"]);
    assert!(
        output.contains("lspace eject (--package NAME | --all)"),
        "usage override missing: {output}"
    );
    assert!(
        output.contains("--package"),
        "package flag missing: {output}"
    );
    assert!(
        output.contains("Detach every non-root member"),
        "all flag help missing: {output}"
    );
}
