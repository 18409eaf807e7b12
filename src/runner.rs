use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::clutch::pick_to_outcome;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::fallback::generate_fallback;
use crate::narration::{HttpNarrator, NarrationSource};
use crate::script::GameScript;
use crate::script_gen::generate_script;
use crate::simulator::{ScriptRequest, Simulator};
use crate::state::{Delta, SimCommand};

const POLL_FLOOR: Duration = Duration::from_millis(25);

/// Runs the simulator on its own thread. Commands come in on `cmd_rx`,
/// everything observable goes out on `tx`. The thread exits once the
/// command sender is dropped.
pub fn spawn_simulation(
    tx: Sender<Delta>,
    cmd_rx: Receiver<SimCommand>,
    cfg: SimConfig,
) -> JoinHandle<()> {
    let narrator: Option<Arc<dyn NarrationSource>> = HttpNarrator::from_config(&cfg)
        .map(|n| Arc::new(n) as Arc<dyn NarrationSource>);
    spawn_with_source(tx, cmd_rx, cfg, narrator)
}

pub fn spawn_with_source(
    tx: Sender<Delta>,
    cmd_rx: Receiver<SimCommand>,
    cfg: SimConfig,
    narrator: Option<Arc<dyn NarrationSource>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let poll = (cfg.tick_interval / 4).max(POLL_FLOOR);
        let (script_tx, script_rx) = mpsc::channel::<(u64, GameScript)>();
        let mut sim = Simulator::new(cfg, tx.clone());

        if narrator.is_none() {
            let _ = tx.send(Delta::Log(
                "[INFO] Narration not configured, scripts use the offline generator".to_string(),
            ));
        }

        loop {
            loop {
                match cmd_rx.try_recv() {
                    Ok(cmd) => {
                        handle_command(cmd, &mut sim, &mut rng, &narrator, &script_tx, &tx)
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        info!("command channel closed, simulation thread exiting");
                        return;
                    }
                }
            }

            while let Ok((run_id, script)) = script_rx.try_recv() {
                sim.install_script(run_id, script, Instant::now());
            }

            sim.tick(Instant::now());
            thread::sleep(poll);
        }
    })
}

fn handle_command(
    cmd: SimCommand,
    sim: &mut Simulator,
    rng: &mut StdRng,
    narrator: &Option<Arc<dyn NarrationSource>>,
    script_tx: &Sender<(u64, GameScript)>,
    tx: &Sender<Delta>,
) {
    let result = match cmd {
        SimCommand::Start { matchup, tracked } => sim
            .start(matchup, tracked, rng)
            .map(|req| dispatch_narration(req, narrator.clone(), rng.r#gen(), script_tx.clone())),
        SimCommand::Stop => {
            if !sim.stop() {
                debug!("stop ignored, nothing running");
            }
            Ok(())
        }
        SimCommand::SubmitPrediction {
            window_id,
            predicted,
        } => sim
            .submit_prediction(window_id, predicted, Instant::now())
            .map(|_| ()),
        SimCommand::SubmitPick { window_id, pick } => {
            let prop = sim
                .session()
                .and_then(|s| s.book.get(window_id))
                .map(|w| w.prop.clone());
            match prop {
                Some(prop) => sim
                    .submit_prediction(window_id, pick_to_outcome(&prop, pick), Instant::now())
                    .map(|_| ()),
                None => Err(SimError::InvalidWindow(window_id)),
            }
        }
    };

    if let Err(err) = result {
        warn!(error = %err, "command rejected");
        let _ = tx.send(Delta::CommandRejected(err.to_string()));
    }
}

/// Generates the script off the tick thread so a slow narration call never
/// stalls play. The result is tagged with its run id for the simulator to check.
/// A panic while narrating still yields a fallback script, so the run never
/// waits in `Generating` for a script that will not arrive.
fn dispatch_narration(
    req: ScriptRequest,
    narrator: Option<Arc<dyn NarrationSource>>,
    seed: u64,
    script_tx: Sender<(u64, GameScript)>,
) {
    thread::spawn(move || {
        let script = build_script(narrator.as_deref(), &req, seed);
        let _ = script_tx.send((req.run_id, script));
    });
}

fn build_script(narrator: Option<&dyn NarrationSource>, req: &ScriptRequest, seed: u64) -> GameScript {
    let mut rng = StdRng::seed_from_u64(seed);
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        generate_script(narrator, &req.narration, &mut rng)
    }));
    match attempt {
        Ok(script) => script,
        Err(_) => {
            error!(run_id = req.run_id, "script generation panicked, using fallback generator");
            generate_fallback(&req.narration, &mut StdRng::seed_from_u64(seed))
        }
    }
}
