//! Replays a JSON list of timed input steps into an [`InputState`].

use glam::{EulerRot, Quat, Vec2, Vec3};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;
use xrinteract_core::{Handedness, InteractorId, Pose};
use xrinteract_input::{HandFrame, InputState, PalmFacing, ThreeDofFrame};

/// Errors raised while loading a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The file could not be read.
    #[error("failed to read script {path}: {source}")]
    Io {
        /// Script path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The file is not a valid script.
    #[error("invalid script: {0}")]
    Parse(#[from] serde_json::Error),
    /// The script has no steps.
    #[error("scripted input file contains no steps")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct ScriptedInputFile {
    steps: Vec<ScriptedStep>,
}

/// Head or hand orientation as yaw/pitch in degrees.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Aim {
    /// Rotation about +Y.
    pub yaw: f32,
    /// Rotation about +X; positive looks down.
    pub pitch: f32,
}

impl Aim {
    fn rotation(self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw.to_radians(), self.pitch.to_radians(), 0.0)
    }
}

/// Head pose for a step.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScriptedHead {
    /// World position.
    pub position: Vec3,
    /// Orientation.
    pub aim: Aim,
}

impl Default for ScriptedHead {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.5, 0.0),
            aim: Aim::default(),
        }
    }
}

/// One tracked hand for a step. Absent hands are untracked.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScriptedHand {
    /// Grip and pointer position.
    pub position: Vec3,
    /// Pointer orientation.
    pub aim: Aim,
    /// Pinch held.
    pub pinch: bool,
    /// Grip held.
    pub grip: bool,
    /// Palm turned towards the head.
    pub palm: bool,
    /// Watch overlay shown.
    pub watch: bool,
}

impl Default for ScriptedHand {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.2, 1.2, 0.3),
            aim: Aim::default(),
            pinch: false,
            grip: false,
            palm: false,
            watch: false,
        }
    }
}

impl ScriptedHand {
    fn frame(&self) -> HandFrame {
        let pose = Pose::new(self.position, self.aim.rotation());
        HandFrame {
            tracking: true,
            grip_pose: pose,
            pointer_pose: pose,
            pinch: self.pinch,
            grip: self.grip,
            facing: if self.palm { PalmFacing::Palm } else { PalmFacing::Back },
            watch_overlay: self.watch,
        }
    }
}

/// Phone pointer for a step.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ScriptedThreeDof {
    /// Device orientation.
    pub aim: Aim,
    /// Primary button held.
    pub button: bool,
}

/// Mouse for a step.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ScriptedMouse {
    /// Cursor motion in pixels per second.
    pub motion: Vec2,
}

/// Touch surface for a step.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ScriptedTouch {
    /// Finger resting.
    pub touching: bool,
    /// Motion per second.
    pub motion: Vec2,
}

/// Input held for `duration` seconds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScriptedStep {
    /// Seconds this step lasts.
    pub duration: f32,
    /// Head pose.
    pub head: ScriptedHead,
    /// Left hand, when tracked.
    pub left_hand: Option<ScriptedHand>,
    /// Right hand, when tracked.
    pub right_hand: Option<ScriptedHand>,
    /// Phone pointer, when connected.
    pub three_dof: Option<ScriptedThreeDof>,
    /// Mouse, when connected.
    pub mouse: Option<ScriptedMouse>,
    /// Touch surface.
    pub touch: ScriptedTouch,
    /// Interactors whose select button is held.
    pub buttons: Vec<u16>,
}

/// Steps through a script, holding the last step once it is reached.
#[derive(Debug)]
pub struct ScriptedInputPlayer {
    steps: Vec<ScriptedStep>,
    index: usize,
    time_in_step: f32,
    finished: bool,
    held: BTreeSet<InteractorId>,
}

impl ScriptedInputPlayer {
    /// Load from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ScriptError> {
        let contents = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from JSON text.
    pub fn from_json(contents: &str) -> Result<Self, ScriptError> {
        let file: ScriptedInputFile = serde_json::from_str(contents)?;
        Self::from_steps(file.steps)
    }

    /// Player over `steps`.
    pub fn from_steps(steps: Vec<ScriptedStep>) -> Result<Self, ScriptError> {
        if steps.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(Self {
            steps,
            index: 0,
            time_in_step: 0.0,
            finished: false,
            held: BTreeSet::new(),
        })
    }

    /// Whether every step has run its full duration.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Index of the current step.
    pub fn step_index(&self) -> usize {
        self.index
    }

    /// Advance by `dt` and write the current step into `input`.
    ///
    /// The caller starts the frame with [`InputState::begin_frame`].
    pub fn advance(&mut self, dt: f32, input: &mut InputState) {
        self.time_in_step += dt;
        while self.time_in_step >= self.steps[self.index].duration {
            self.time_in_step -= self.steps[self.index].duration;
            if self.index + 1 < self.steps.len() {
                self.index += 1;
            } else {
                self.time_in_step = 0.0;
                self.finished = true;
                break;
            }
        }
        let step = &self.steps[self.index];
        apply_step(step, dt, input, &mut self.held);
    }
}

fn apply_step(step: &ScriptedStep, dt: f32, input: &mut InputState, held: &mut BTreeSet<InteractorId>) {
    input.head_pose = Pose::new(step.head.position, step.head.aim.rotation());
    input.set_hand(Handedness::Left, step.left_hand.map(|h| h.frame()));
    input.set_hand(Handedness::Right, step.right_hand.map(|h| h.frame()));
    input.set_three_dof(step.three_dof.map(|p| ThreeDofFrame {
        orientation: p.aim.rotation(),
        button: p.button,
    }));

    input.mouse_connected = step.mouse.is_some();
    if let Some(mouse) = step.mouse {
        input.add_mouse_motion(mouse.motion * dt);
    }
    input.touching = step.touch.touching;
    input.add_touch_motion(step.touch.motion * dt);

    let wanted: BTreeSet<InteractorId> = step.buttons.iter().copied().map(InteractorId).collect();
    for released in held.difference(&wanted) {
        input.release(*released);
    }
    for pressed in wanted.difference(held) {
        input.press(*pressed);
    }
    *held = wanted;
}

/// Built-in session used when no script is given: the right hand grabs and
/// throws the cube, then the mouse clicks the panel.
pub fn demo_steps(cube: Vec3, mouse: InteractorId) -> Vec<ScriptedStep> {
    let reach = ScriptedHand {
        position: cube + Vec3::new(0.0, 0.0, 0.2),
        ..ScriptedHand::default()
    };
    let hold = ScriptedHand { grip: true, ..reach };
    let thrown = ScriptedHand {
        position: cube + Vec3::new(0.4, 0.1, 0.0),
        ..hold
    };
    let open = ScriptedHand { grip: false, ..thrown };
    let hands = |right: ScriptedHand, duration: f32| ScriptedStep {
        duration,
        right_hand: Some(right),
        ..ScriptedStep::default()
    };
    vec![
        hands(reach, 0.5),
        hands(ScriptedHand { position: cube, ..reach }, 0.3),
        hands(ScriptedHand { position: cube, ..hold }, 0.3),
        hands(thrown, 0.1),
        hands(open, 0.5),
        ScriptedStep {
            // Cursor from the corner to the screen centre, where the panel sits.
            duration: 0.3,
            mouse: Some(ScriptedMouse {
                motion: Vec2::new(3200.0, 1800.0),
            }),
            ..ScriptedStep::default()
        },
        ScriptedStep {
            duration: 0.1,
            mouse: Some(ScriptedMouse::default()),
            buttons: vec![mouse.0],
            ..ScriptedStep::default()
        },
        ScriptedStep {
            duration: 0.5,
            mouse: Some(ScriptedMouse::default()),
            ..ScriptedStep::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_script_is_rejected() {
        assert!(matches!(
            ScriptedInputPlayer::from_json(r#"{ "steps": [] }"#),
            Err(ScriptError::Empty)
        ));
    }

    #[test]
    fn buttons_follow_step_levels() {
        let mut player = ScriptedInputPlayer::from_json(
            r#"{ "steps": [
                { "duration": 0.1, "buttons": [7] },
                { "duration": 0.1 }
            ] }"#,
        )
        .expect("valid script");
        let mut input = InputState::new();

        input.begin_frame();
        player.advance(0.05, &mut input);
        assert!(input.button_just_pressed(InteractorId(7)));

        input.begin_frame();
        player.advance(0.1, &mut input);
        assert_eq!(player.step_index(), 1);
        assert!(input.button_just_released(InteractorId(7)));
        assert!(!player.is_finished());

        input.begin_frame();
        player.advance(0.2, &mut input);
        assert!(player.is_finished());
    }

    #[test]
    fn hands_are_untracked_unless_listed() {
        let mut player = ScriptedInputPlayer::from_json(
            r#"{ "steps": [ { "duration": 1.0, "right_hand": { "position": [0.0, 1.0, 0.5], "pinch": true } } ] }"#,
        )
        .expect("valid script");
        let mut input = InputState::new();
        input.begin_frame();
        player.advance(0.016, &mut input);
        assert!(input.hand(Handedness::Left).is_none());
        let right = input.hand(Handedness::Right).expect("right hand tracked");
        assert!(right.pinch);
        assert_eq!(right.grip_pose.position, Vec3::new(0.0, 1.0, 0.5));
    }
}
