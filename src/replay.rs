use anyhow::{anyhow, bail, Context, Result};
use log::debug;

use crate::app::{FlyController, FrameClock};
use crate::input::KeyCode;

/// One recorded input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayCommand {
    Press(KeyCode),
    Release(KeyCode),
    Cursor { x: f32, y: f32 },
    /// Relative pointer motion, as reported by a grabbed mouse.
    Motion { dx: f32, dy: f32 },
    Scroll(f32),
    Resize { width: f32, height: f32 },
    /// Runs one controller update with the given elapsed seconds.
    Frame(f32),
}

/// Parses a replay script, one command per line.
///
/// ```text
/// # walk forward for a second while turning
/// press W
/// cursor 400 300
/// cursor 410 300
/// motion 25 0
/// frame 1.0
/// release W
/// scroll 2
/// ```
pub fn parse_replay(script: &str) -> Result<Vec<ReplayCommand>> {
    let mut commands = Vec::new();
    for (line_no, line) in script.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let command =
            parse_command(trimmed).with_context(|| format!("invalid command on line {}", line_no + 1))?;
        commands.push(command);
    }
    Ok(commands)
}

fn parse_command(line: &str) -> Result<ReplayCommand> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        bail!("empty command");
    };
    let command = match verb {
        "press" => ReplayCommand::Press(parse_key(parts.next())?),
        "release" => ReplayCommand::Release(parse_key(parts.next())?),
        "cursor" => ReplayCommand::Cursor {
            x: parse_number(parts.next())?,
            y: parse_number(parts.next())?,
        },
        "motion" => ReplayCommand::Motion {
            dx: parse_number(parts.next())?,
            dy: parse_number(parts.next())?,
        },
        "scroll" => ReplayCommand::Scroll(parse_number(parts.next())?),
        "resize" => ReplayCommand::Resize {
            width: parse_number(parts.next())?,
            height: parse_number(parts.next())?,
        },
        "frame" => ReplayCommand::Frame(parse_number(parts.next())?),
        other => bail!("unknown command {other:?}"),
    };
    if let Some(extra) = parts.next() {
        bail!("unexpected argument {extra:?}");
    }
    Ok(command)
}

fn parse_key(name: Option<&str>) -> Result<KeyCode> {
    let name = name.ok_or_else(|| anyhow!("missing key name"))?;
    KeyCode::from_name(name).ok_or_else(|| anyhow!("unknown key {name:?}"))
}

fn parse_number(value: Option<&str>) -> Result<f32> {
    let value = value.ok_or_else(|| anyhow!("missing number"))?;
    let number = value
        .parse::<f32>()
        .with_context(|| format!("{value:?} is not a number"))?;
    if !number.is_finite() {
        bail!("{value:?} is not a finite number");
    }
    Ok(number)
}

/// Feeds commands into the controller in order. Returns the number of frames
/// that were simulated.
pub fn run_replay(
    controller: &mut FlyController,
    clock: &mut FrameClock,
    commands: &[ReplayCommand],
) -> usize {
    let mut frames = 0;
    for command in commands {
        debug!("replay {command:?}");
        match *command {
            ReplayCommand::Press(key) => controller.key_pressed(key),
            ReplayCommand::Release(key) => controller.key_released(key),
            ReplayCommand::Cursor { x, y } => controller.cursor_moved(x, y),
            ReplayCommand::Motion { dx, dy } => controller.pointer_moved_by(dx, dy),
            ReplayCommand::Scroll(amount) => controller.scrolled(amount),
            ReplayCommand::Resize { width, height } => controller.resized(width, height),
            ReplayCommand::Frame(seconds) => {
                let elapsed = clock.advance(seconds);
                controller.update(elapsed);
                frames += 1;
            }
        }
        if controller.exit_requested() {
            break;
        }
    }
    frames
}
