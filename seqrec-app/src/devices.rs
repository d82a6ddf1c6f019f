//! Terminal-backed collaborators for the experiment binary.

use seqrec_core::{Error, Key, Result, Side, TokenRef};
use seqrec_experiment::{AudioPlayer, Display, InputDevice, PromptOptions};
use seqrec_render::{DisplayState, Rasterizer};
use seqrec_timing::{HighPrecisionTimer, Timer};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const FRAME: Duration = Duration::from_nanos(16_666_667);
const BAR_WIDTH: usize = 20;

/// Writes every display state as a numbered PNG.
pub struct FrameRecorder {
    dir: PathBuf,
    rasterizer: Rasterizer,
    size: (u32, u32),
    count: usize,
}

impl FrameRecorder {
    pub fn new(dir: impl Into<PathBuf>, rasterizer: Rasterizer, width: u32, height: u32) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            rasterizer,
            size: (width, height),
            count: 0,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.count
    }

    fn record(&mut self, state: &DisplayState) -> anyhow::Result<PathBuf> {
        let canvas = self.rasterizer.render(state, self.size.0, self.size.1)?;
        let path = self.dir.join(format!("frame_{:05}.png", self.count));
        canvas.save_png(&path)?;
        self.count += 1;
        Ok(path)
    }
}

/// Prints display states to a terminal, optionally recording frames
pub struct TerminalDisplay<W: Write> {
    out: W,
    timer: HighPrecisionTimer,
    frames: Option<FrameRecorder>,
    last: DisplayState,
}

impl TerminalDisplay<std::io::Stdout> {
    pub fn stdout(frames: Option<FrameRecorder>) -> Self {
        Self::new(std::io::stdout(), frames)
    }
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W, frames: Option<FrameRecorder>) -> Self {
        Self {
            out,
            timer: HighPrecisionTimer::new(),
            frames,
            last: DisplayState::Blank,
        }
    }

    pub fn last_state(&self) -> &DisplayState {
        &self.last
    }

    pub fn frames(&self) -> Option<&FrameRecorder> {
        self.frames.as_ref()
    }

    fn present(&mut self, state: DisplayState, line: &str) {
        if !line.is_empty() {
            if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
                warn!("terminal write failed: {}", e);
            }
        }
        if let Some(frames) = self.frames.as_mut() {
            match frames.record(&state) {
                Ok(path) => debug!("frame written to {}", path.display()),
                Err(e) => warn!("frame not recorded: {:#}", e),
            }
        }
        self.last = state;
    }
}

fn bar(fraction: f32) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        fraction.clamp(0.0, 1.0) * 100.0
    )
}

impl<W: Write> Display for TerminalDisplay<W> {
    fn show_prompt(&mut self, text: &str, options: PromptOptions) {
        self.present(
            DisplayState::Prompt {
                text: text.to_string(),
            },
            &format!("\n{text}"),
        );
        if !options.self_paced {
            self.timer.sleep(FRAME * options.min_frames);
        }
    }

    fn show_progress(&mut self, fraction: f32) {
        self.present(DisplayState::StaircaseProgress { fraction }, &bar(fraction));
    }

    fn show_response_progress(&mut self, item_index: usize, total: usize) {
        let boxes: Vec<&str> = (0..total)
            .map(|i| if i < item_index { "x" } else { "_" })
            .collect();
        self.present(
            DisplayState::ResponseProgress {
                answered: item_index,
                total,
            },
            &format!("[{}]", boxes.join(" ")),
        );
    }

    fn show_cue(&mut self, side: Side) {
        let line = match side {
            Side::A => "<<< A",
            Side::B => "    B >>>",
        };
        self.present(DisplayState::Cue { side }, line);
    }

    fn show_feedback(&mut self, correct: bool, fraction: f32) {
        let word = if correct { "correct" } else { "wrong" };
        self.present(
            DisplayState::Feedback { correct, fraction },
            &format!("{word:<8}{}", bar(fraction)),
        );
    }

    fn clear(&mut self) {
        self.present(DisplayState::Blank, "");
    }
}

/// Keys typed as lines; an empty line is `space`.
///
/// A reader thread forwards lines over a channel so waits can time out.
pub struct LineInput {
    lines: Receiver<String>,
}

impl LineInput {
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { lines: rx }
    }

    pub fn stdin() -> Self {
        Self::spawn(std::io::BufReader::new(std::io::stdin()))
    }

    fn key_for(line: &str) -> Key {
        match line.trim() {
            "" => Key::new("space"),
            name => Key::new(name.to_lowercase()),
        }
    }
}

impl InputDevice for LineInput {
    fn wait_for_key(&mut self, timeout: Option<Duration>) -> Result<Option<Key>> {
        let line = match timeout {
            Some(timeout) => match self.lines.recv_timeout(timeout) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::Input("input closed".into()));
                }
            },
            None => self
                .lines
                .recv()
                .map_err(|_| Error::Input("input closed".into()))?,
        };
        Ok(Some(Self::key_for(&line)))
    }

    fn discard_pending(&mut self) {
        let dropped = self.lines.try_iter().count();
        if dropped > 0 {
            debug!("discarded {} key(s) typed before the wait", dropped);
        }
    }
}

/// Reports WAV durations without a sound device.
///
/// Playback is not audible; the runner still waits out every duration, so
/// session timing matches a real run.
#[derive(Debug, Default)]
pub struct WavPlayer {
    played: usize,
}

impl WavPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> usize {
        self.played
    }
}

impl AudioPlayer for WavPlayer {
    fn play(&mut self, token: &TokenRef) -> Result<Duration> {
        let failure = |reason: String| Error::PlaybackFailure {
            path: token.path().to_path_buf(),
            reason,
        };
        let reader = hound::WavReader::open(token.path()).map_err(|e| failure(e.to_string()))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(failure("sample rate is zero".into()));
        }
        let frames = reader.duration() as u64;
        let duration = Duration::from_nanos(frames * 1_000_000_000 / spec.sample_rate as u64);
        self.played += 1;
        debug!("playing {} ({:?})", token.short_id(), duration);
        Ok(duration)
    }

    fn play_tone(&mut self, frequency_hz: f32, duration: Duration) -> Result<Duration> {
        debug!("tone {:.2} Hz for {:?}", frequency_hz, duration);
        Ok(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn write_wav(path: &std::path::Path, sample_rate: u32, frames: u32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * 2 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn wav_duration_comes_from_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kupo_erica_1_A.wav");
        write_wav(&path, 44_100, 22_050);

        let mut player = WavPlayer::new();
        let d = player.play(&TokenRef::new(&path)).unwrap();
        assert_eq!(d, Duration::from_millis(500));
        assert_eq!(player.played(), 1);
    }

    #[test]
    fn unreadable_audio_is_a_playback_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"not a wav").unwrap();

        let err = WavPlayer::new().play(&TokenRef::new(&path)).unwrap_err();
        match err {
            Error::PlaybackFailure { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lines_become_keys_and_eof_is_an_error() {
        let mut input = LineInput::spawn(Cursor::new("a\n\n B \n"));
        let wait = Some(Duration::from_secs(5));
        assert_eq!(input.wait_for_key(wait).unwrap(), Some(Key::new("a")));
        assert_eq!(input.wait_for_key(None).unwrap(), Some(Key::new("space")));
        assert_eq!(input.wait_for_key(wait).unwrap(), Some(Key::new("b")));
        assert!(matches!(input.wait_for_key(wait), Err(Error::Input(_))));
    }

    #[test]
    fn keys_typed_ahead_are_discarded() {
        let mut input = LineInput::spawn(Cursor::new("a\nb\nb\n"));
        assert_eq!(
            input.wait_for_key(Some(Duration::from_secs(5))).unwrap(),
            Some(Key::new("a"))
        );
        thread::sleep(Duration::from_millis(200));
        input.discard_pending();
        // nothing left and the reader hit EOF
        assert!(matches!(
            input.wait_for_key(Some(Duration::from_millis(100))),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn bounded_wait_returns_when_nothing_is_typed() {
        struct Slow;
        impl Read for Slow {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                thread::sleep(Duration::from_millis(300));
                buf[0] = b'\n';
                Ok(1)
            }
        }

        let mut input = LineInput::spawn(std::io::BufReader::new(Slow));
        let timer = HighPrecisionTimer::new();
        let t0 = timer.now();
        assert_eq!(input.wait_for_key(Some(Duration::from_millis(20))).unwrap(), None);
        assert!(timer.elapsed(t0) < Duration::from_millis(250));
    }

    #[test]
    fn terminal_display_prints_and_records_frames() {
        let dir = tempfile::tempdir().unwrap();
        let frames = FrameRecorder::new(dir.path().join("frames"), Rasterizer::without_font(), 320, 200)
            .unwrap();
        let mut display = TerminalDisplay::new(Vec::new(), Some(frames));

        display.show_prompt("press space", PromptOptions::self_paced());
        display.show_cue(Side::B);
        display.show_feedback(false, 0.0);
        display.show_response_progress(1, 3);
        display.clear();

        assert_eq!(display.last_state(), &DisplayState::Blank);
        assert_eq!(display.frames().unwrap().frames_written(), 5);
        assert!(dir.path().join("frames/frame_00004.png").is_file());

        let text = String::from_utf8(display.out.clone()).unwrap();
        assert!(text.contains("press space"));
        assert!(text.contains("B >>>"));
        assert!(text.contains("wrong"));
        assert!(text.contains("[x _ _]"));
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(bar(0.5), format!("[{}{}]  50%", "#".repeat(10), "-".repeat(10)));
        assert_eq!(bar(2.0), format!("[{}] 100%", "#".repeat(20)));
    }
}
