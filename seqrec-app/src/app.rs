use crate::devices::{FrameRecorder, LineInput, TerminalDisplay, WavPlayer};
use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use seqrec_experiment::{
    Collaborators, ConfigStore, DirectoryPoolSource, Display, ExperimentConfig, JsonResultsSink,
    PromptOptions, SessionOrchestrator, TemplateSet, TomlConfigStore,
};
use seqrec_render::Rasterizer;
use seqrec_timing::HighPrecisionTimer;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "seqrec")]
#[command(about = "Sequence recall experiment with a 2AFC calibration gate")]
#[command(version)]
pub struct Args {
    /// Participant identifier; names the results file
    #[arg(short, long)]
    pub participant: String,

    /// Folder holding `<item>_A` and `<item>_B` stimulus folders
    #[arg(long, default_value = "stimuli")]
    pub root: PathBuf,

    #[arg(long, default_value = "seqrec.toml")]
    pub config: PathBuf,

    /// One A/B pattern per line
    #[arg(long, default_value = "templates.txt")]
    pub templates: PathBuf,

    #[arg(long, default_value = "results")]
    pub results: PathBuf,

    /// Also write every screen as a PNG into this folder
    #[arg(long)]
    pub frames: Option<PathBuf>,

    /// TrueType font for text in recorded frames
    #[arg(long)]
    pub font: Option<PathBuf>,

    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Seed for contrast order, staircase draws and shuffles
    #[arg(long)]
    pub seed: Option<u64>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

pub struct App {
    args: Args,
}

impl App {
    pub fn new(args: Args) -> Self {
        Self { args }
    }

    pub fn run(self) -> Result<()> {
        let args = self.args;
        info!(
            "seqrec v{} on {}/{}",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        );

        let store = TomlConfigStore::new(&args.config);
        if !store.exists() {
            store.save(&ExperimentConfig::starter())?;
            warn!(
                "no configuration found; a starter file was written to {}. Edit speakers and contrasts, then run again.",
                store.path().display()
            );
            return Ok(());
        }
        let config = store.load()?;
        info!(
            "{} contrast(s), {} speaker(s), staircase cutoff {}",
            config.contrasts.len(),
            config.speakers.len(),
            config.staircase_cutoff
        );

        let templates = TemplateSet::load(&args.templates)
            .with_context(|| format!("loading templates from {}", args.templates.display()))?;
        if templates.is_empty() {
            bail!("no templates in {}", args.templates.display());
        }
        info!("{} template(s) over levels {:?}", templates.len(), templates.levels());

        let mut sink = JsonResultsSink::new(&args.results);
        sink.path_for(&args.participant)?;

        let frames = match &args.frames {
            Some(dir) => {
                let rasterizer = match &args.font {
                    Some(font) => Rasterizer::with_font_file(font)?,
                    None => Rasterizer::without_font(),
                };
                Some(FrameRecorder::new(dir, rasterizer, args.width, args.height)?)
            }
            None => None,
        };
        let mut display = TerminalDisplay::stdout(frames);

        let source = DirectoryPoolSource::new(&args.root);
        if !args.root.is_dir() {
            let created = source.scaffold(&config.contrasts)?;
            let listing: Vec<String> = created.iter().map(|p| p.display().to_string()).collect();
            error!("stimulus root {} was missing", args.root.display());
            display.show_prompt(
                &format!(
                    "Stimulus folders were created. Put the audio files into:\n{}\nthen start again.",
                    listing.join("\n")
                ),
                PromptOptions::timed(100),
            );
            bail!("stimulus folders created under {}", args.root.display());
        }

        let rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut session = SessionOrchestrator::new(
            config,
            templates,
            Collaborators {
                player: WavPlayer::new(),
                display,
                input: LineInput::stdin(),
                source,
            },
            HighPrecisionTimer::new(),
            rng,
        );
        let result = session.run(&args.participant, &mut sink)?;
        info!(
            "{} trial(s) saved to {}",
            result.trial_count(),
            sink.path_for(&args.participant)?.display()
        );
        Ok(())
    }
}
