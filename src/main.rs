//! Card Arrange headless driver
//!
//! Plays a scripted session against the engine and logs what happens:
//! `card-arrange [settings.json] [seed]`

#[cfg(not(target_arch = "wasm32"))]
use card_arrange::{
    ArrangeError, Settings,
    consts::SIM_DT,
    sim::{ArrangementController, ArrangementEvent, FixedStep, TickInput},
};

/// Frames each arrangement stays live before the wanted card is "found"
#[cfg(not(target_arch = "wasm32"))]
const FRAMES_PER_FIND: u32 = 180;

/// Finds before the scripted round ends
#[cfg(not(target_arch = "wasm32"))]
const FINDS_PER_SESSION: u64 = 50;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Card Arrange (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => match Settings::load(std::path::Path::new(&path)) {
            Ok(settings) => settings,
            Err(err) => {
                log::error!("Failed to load settings from {}: {}", path, err);
                std::process::exit(2);
            }
        },
        None => Settings::default(),
    };
    let seed = match args.next().map(|s| s.parse::<u64>()) {
        Some(Ok(seed)) => seed,
        Some(Err(err)) => {
            log::error!("Seed must be an unsigned integer: {}", err);
            std::process::exit(2);
        }
        None => 12345,
    };

    if let Err(err) = run_session(settings, seed) {
        log::error!("Session aborted: {}", err);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Hosts on the web drive the library directly
}

#[cfg(not(target_arch = "wasm32"))]
fn run_session(settings: Settings, seed: u64) -> Result<(), ArrangeError> {
    let mut controller = ArrangementController::new(settings, seed)?;
    let mut stepper = FixedStep::new();
    let mut input = TickInput {
        round_start: true,
        score: Some(0),
        ..Default::default()
    };

    let mut score = 0;
    let mut nudges = 0;
    let mut repairs = 0;
    while score < FINDS_PER_SESSION {
        // Reveal animation is instant here
        input.entry_complete = true;
        stepper.advance(&mut controller, &mut input, SIM_DT)?;

        for frame in 0..FRAMES_PER_FIND {
            // A miss halfway through each arrangement
            if frame == FRAMES_PER_FIND / 2 {
                let decoy = controller
                    .current_entities()
                    .into_iter()
                    .find(|c| c.active && !c.wanted)
                    .map(|c| c.id);
                input.wrong_selection = decoy;
            }
            stepper.advance(&mut controller, &mut input, SIM_DT)?;
        }

        for event in controller.drain_events() {
            match event {
                ArrangementEvent::PatternStarted { kind, cards } => {
                    println!("score {:>3}: {:<18} {:>2} cards", score, kind, cards);
                }
                ArrangementEvent::TierChanged { from, to } => {
                    println!("           tier {} -> {}", from, to);
                }
                ArrangementEvent::VisibilityNudged { .. } => nudges += 1,
                ArrangementEvent::WantedRepaired { .. } => repairs += 1,
                _ => {}
            }
        }

        score += 1;
        input.score = Some(score);
        input.advance_wanted = true;
    }

    input.round_over = true;
    stepper.advance(&mut controller, &mut input, SIM_DT)?;

    println!(
        "\nround over at score {} ({} visibility nudges, {} wanted repairs)",
        controller.score(),
        nudges,
        repairs
    );
    Ok(())
}
