use rand::Rng;
use tracing::{info, warn};

use crate::error::NarrationError;
use crate::fallback::generate_fallback;
use crate::narration::{NarrationRequest, NarrationSource};
use crate::script::{GameScript, parse_script_json};

/// Produces a script for `request`, preferring the narration source and
/// substituting the offline generator on any failure. Never fails.
pub fn generate_script<R: Rng + ?Sized>(
    source: Option<&dyn NarrationSource>,
    request: &NarrationRequest,
    rng: &mut R,
) -> GameScript {
    match try_narrate(source, request) {
        Ok(script) => {
            info!(plays = script.len(), "narrated script accepted");
            script
        }
        Err(NarrationError::Disabled) => {
            info!("narration disabled, using fallback generator");
            generate_fallback(request, rng)
        }
        Err(err) => {
            warn!(error = %err, "narration failed, using fallback generator");
            generate_fallback(request, rng)
        }
    }
}

fn try_narrate(
    source: Option<&dyn NarrationSource>,
    request: &NarrationRequest,
) -> Result<GameScript, NarrationError> {
    let source = source.ok_or(NarrationError::Disabled)?;
    let body = source.narrate(request)?;
    parse_script_json(&body)
}
