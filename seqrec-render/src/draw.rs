//! Pure mapping from what the experiment wants shown to shapes on a canvas.
//!
//! Nothing here touches pixels; `Rasterizer` turns the commands into a
//! `Pixmap`, the terminal display only needs the state itself.

use seqrec_core::Side;

pub type Rgba = [u8; 4];

pub const BACKGROUND: Rgba = [0, 0, 0, 255];
pub const FOREGROUND: Rgba = [255, 255, 255, 255];
pub const CUE: Rgba = [0, 200, 0, 255];
pub const WRONG: Rgba = [200, 0, 0, 255];

const TEXT_PX: f32 = 32.0;
const LINE_SPACING: f32 = 1.4;
const CUE_OFFSET: f32 = 300.0;
const CUE_RADIUS: f32 = 100.0;
const STAIRCASE_RADIUS: f32 = 280.0;
const BOX_WIDTH: f32 = 100.0;
const BOX_HEIGHT: f32 = 50.0;
const BOX_GAP: f32 = 20.0;
const PENDING_INTENSITY: f32 = 0.15;

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayState {
    Blank,
    Prompt { text: String },
    Cue { side: Side },
    /// Streak towards the staircase cutoff, `0.0..=1.0`.
    StaircaseProgress { fraction: f32 },
    Feedback { correct: bool, fraction: f32 },
    /// `answered` of `total` response windows are done.
    ResponseProgress { answered: usize, total: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear { color: Rgba },
    Text { text: String, center: (f32, f32), size_px: f32, color: Rgba },
    Circle { center: (f32, f32), radius: f32, color: Rgba },
    Rect { x: f32, y: f32, width: f32, height: f32, color: Rgba },
}

fn dimmed(color: Rgba, intensity: f32) -> Rgba {
    let scale = |c: u8| (c as f32 * intensity).round() as u8;
    [scale(color[0]), scale(color[1]), scale(color[2]), color[3]]
}

fn progress_discs(center: (f32, f32), fraction: f32, outer: Rgba) -> [DrawCommand; 2] {
    let fraction = fraction.clamp(0.0, 1.0);
    [
        DrawCommand::Circle {
            center,
            radius: STAIRCASE_RADIUS,
            color: outer,
        },
        DrawCommand::Circle {
            center,
            radius: STAIRCASE_RADIUS * (1.0 - fraction),
            color: dimmed(outer, PENDING_INTENSITY),
        },
    ]
}

pub fn draw_commands(state: &DisplayState, width: u32, height: u32) -> Vec<DrawCommand> {
    let center = (width as f32 / 2.0, height as f32 / 2.0);
    let mut commands = vec![DrawCommand::Clear { color: BACKGROUND }];

    match state {
        DisplayState::Blank => {}
        DisplayState::Prompt { text } => {
            let lines: Vec<&str> = text.lines().collect();
            let step = TEXT_PX * LINE_SPACING;
            let top = center.1 - step * (lines.len().saturating_sub(1)) as f32 / 2.0;
            for (i, line) in lines.iter().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                commands.push(DrawCommand::Text {
                    text: line.to_string(),
                    center: (center.0, top + step * i as f32),
                    size_px: TEXT_PX,
                    color: FOREGROUND,
                });
            }
        }
        DisplayState::Cue { side } => {
            let dx = match side {
                Side::A => -CUE_OFFSET,
                Side::B => CUE_OFFSET,
            };
            commands.push(DrawCommand::Circle {
                center: (center.0 + dx, center.1),
                radius: CUE_RADIUS,
                color: CUE,
            });
        }
        DisplayState::StaircaseProgress { fraction } => {
            commands.extend(progress_discs(center, *fraction, FOREGROUND));
        }
        DisplayState::Feedback { correct, fraction } => {
            let outer = if *correct { CUE } else { WRONG };
            commands.extend(progress_discs(center, *fraction, outer));
        }
        DisplayState::ResponseProgress { answered, total } => {
            let row = *total as f32 * BOX_WIDTH + total.saturating_sub(1) as f32 * BOX_GAP;
            let left = center.0 - row / 2.0;
            for i in 0..*total {
                let color = if i < *answered {
                    FOREGROUND
                } else {
                    dimmed(FOREGROUND, PENDING_INTENSITY)
                };
                commands.push(DrawCommand::Rect {
                    x: left + i as f32 * (BOX_WIDTH + BOX_GAP),
                    y: center.1 - BOX_HEIGHT / 2.0,
                    width: BOX_WIDTH,
                    height: BOX_HEIGHT,
                    color,
                });
            }
        }
    }
    commands
}
