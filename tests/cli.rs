use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp file");
    tmp.write_all(contents.as_bytes()).expect("write temp file");
    tmp
}

fn build_scene() -> NamedTempFile {
    write_temp(
        r#"<scene>
  <camera>
    <position>0 0 3</position>
    <yaw>-90</yaw>
  </camera>
  <object>
    <name>Crate</name>
    <position>0 0 0</position>
  </object>
  <light>
    <position>1.2 1 2</position>
  </light>
</scene>
"#,
    )
}

#[test]
fn cli_replays_input_and_prints_final_camera() {
    let scene = build_scene();
    let replay = write_temp(
        "# look right a little, walk forward, zoom in\n\
         cursor 600 400\n\
         cursor 610 400\n\
         press W\n\
         frame 1.0\n\
         release W\n\
         scroll 4\n\
         frame 0\n",
    );
    let mut cmd = Command::cargo_bin("freelook").expect("binary exists");
    cmd.arg(scene.path())
        .arg("--replay")
        .arg(replay.path())
        .arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 1 objects (1 lights)"))
        .stdout(contains(" - Crate"))
        .stdout(contains("Replayed 2 frame(s)"))
        .stdout(contains(
            "Camera pos=(0.03, 0.00, 0.50) yaw=-89.20 pitch=0.00 fov=44.00",
        ));
}

#[test]
fn cli_without_scene_uses_demo() {
    let mut cmd = Command::cargo_bin("freelook").expect("binary exists");
    cmd.arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 10 objects (1 lights)"))
        .stdout(contains(
            "Camera pos=(0.00, 0.00, 3.00) yaw=-90.00 pitch=0.00 fov=45.00",
        ));
}

#[test]
fn cli_reports_bad_replay_line() {
    let replay = write_temp("press W\nteleport 1 2 3\n");
    let mut cmd = Command::cargo_bin("freelook").expect("binary exists");
    cmd.arg("--summary-only").arg("--replay").arg(replay.path());
    cmd.assert()
        .failure()
        .stderr(contains("invalid command on line 2"));
}

#[test]
fn cli_rejects_malformed_scene() {
    let scene = write_temp("<scene><camera><fov>wide</fov></camera></scene>");
    let mut cmd = Command::cargo_bin("freelook").expect("binary exists");
    cmd.arg(scene.path()).arg("--summary-only");
    cmd.assert()
        .failure()
        .stderr(contains("<fov> is not a number"));
}

#[test]
fn cli_applies_scene_bindings_and_pointer_motion() {
    let scene = write_temp(
        "<scene><bindings><forward>Up</forward></bindings></scene>",
    );
    let replay = write_temp(
        "motion 0 0\n\
         motion 4500 0\n\
         press W\n\
         frame 1\n\
         press Up\n\
         frame 1\n",
    );
    let mut cmd = Command::cargo_bin("freelook").expect("binary exists");
    cmd.arg(scene.path())
        .arg("--replay")
        .arg(replay.path())
        .arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Replayed 2 frame(s)"))
        .stdout(contains("0.00, 0.50) yaw=270.00 pitch=0.00 fov=45.00"));
}

#[test]
fn cli_rejects_non_finite_replay_numbers() {
    let replay = write_temp("scroll NaN\nframe 0\n");
    let mut cmd = Command::cargo_bin("freelook").expect("binary exists");
    cmd.arg("--summary-only").arg("--replay").arg(replay.path());
    cmd.assert()
        .failure()
        .stderr(contains("invalid command on line 1"))
        .stderr(contains("not a finite number"));
}
