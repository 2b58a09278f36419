use assert_cmd::Command;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("claim-vectors").expect("binary exists");
    cmd.arg("--help").assert().success();
}

#[test]
fn infer_help_lists_resume() {
    let mut cmd = Command::cargo_bin("claim-vectors").expect("binary exists");
    let output = cmd.args(["infer", "--help"]).output().expect("run binary");
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("--resume"));
}
