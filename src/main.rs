//! Chord Survivor headless runner
//!
//! Plays a run on autopilot through the frame runner and prints the run
//! summary as JSON. Useful for balance soak tests and replay checks.
//!
//! Usage: `chord-survivor [--seed N] [--config PATH] [--difficulty easy|normal|hard] [--seconds N]`

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use clap::Parser;

    use chord_survivor::consts::*;
    use chord_survivor::sim::{BasicChordResolver, GameEvent, GamePhase, GameState};
    use chord_survivor::{DifficultyConfig, DifficultyPreset, RunSettings, RunSummary, Runner};

    fn parse_preset(s: &str) -> Result<DifficultyPreset, String> {
        DifficultyPreset::parse(s).ok_or_else(|| format!("unknown difficulty {s:?} (easy, normal, hard)"))
    }

    #[derive(Parser)]
    #[command(name = "chord-survivor")]
    #[command(about = "Play a Chord Survivor run on autopilot and print its summary")]
    struct Args {
        /// RNG seed for the run
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// JSON run settings; built-in defaults when omitted
        #[arg(long)]
        config: Option<String>,
        /// Replace the configured difficulty with a preset
        #[arg(long, value_parser = parse_preset)]
        difficulty: Option<DifficultyPreset>,
        /// Simulated seconds before the run is cut off
        #[arg(long, default_value_t = 600.0)]
        seconds: f32,
    }

    pub fn run() {
        env_logger::init();
        let args = Args::parse();

        let mut settings = match &args.config {
            Some(path) => RunSettings::load(path),
            None => RunSettings::default(),
        };
        if let Some(preset) = args.difficulty {
            let chords = std::mem::take(&mut settings.difficulty.allowed_chords);
            settings.difficulty = DifficultyConfig {
                allowed_chords: chords,
                ..DifficultyConfig::from_preset(preset)
            };
            log::info!("Difficulty preset: {}", preset.as_str());
        }

        log::info!("Chord Survivor starting with seed {}", args.seed);
        let state = GameState::new(args.seed, settings, &BasicChordResolver);
        let mut runner = Runner::new(state);
        runner.set_autopilot(true);

        let mut bosses = 0u32;
        while runner.state.phase != GamePhase::GameOver && runner.state.elapsed < args.seconds {
            runner.update(SIM_DT);
            bosses += runner
                .state
                .events
                .iter()
                .filter(|e| matches!(e, GameEvent::EnemySpawned { boss: true, .. }))
                .count() as u32;
        }

        let summary = match runner.state.summary.clone() {
            Some(summary) => summary,
            // Time limit reached with the player still standing
            None => RunSummary::from_state(&runner.state, false),
        };
        log::info!("Bosses seen: {bosses}");

        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("Failed to serialize summary: {e}"),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    native::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host page; there is no standalone entry point
}
