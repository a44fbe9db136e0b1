// SPDX-License-Identifier: MIT OR Apache-2.0
//! Image-import node kind, the representative expensive media
//! computation, run through the async coordinator.
//!
//! Evaluation never blocks: it returns the last-known-good media
//! reference immediately and schedules a background decode whenever the
//! source path changes (stale-while-revalidate). Completions are applied
//! by the scheduler between passes.

use super::{EvalArgs, EvalOutcome};
use crate::media::MediaError;
use image::GenericImageView;
use patchwire_graph::{broadcast_length, MediaRef, PortValue, ValueKind, ValueLoop};
use std::path::Path;
use uuid::Uuid;

/// Decode an image file into a media reference.
///
/// Runs on a coordinator background thread, never on the evaluation
/// context.
pub fn decode_image(path: &str) -> Result<MediaRef, MediaError> {
    if !Path::new(path).exists() {
        return Err(MediaError::NotFound(path.to_string()));
    }
    let decoded = image::open(path).map_err(|err| MediaError::Decode(err.to_string()))?;
    let (width, height) = decoded.dimensions();
    Ok(MediaRef::Loaded {
        id: Uuid::new_v4(),
        width,
        height,
    })
}

/// Evaluate an image-import node.
///
/// One media slot per loop index; a changed path invalidates the slot's
/// previous computation and schedules a new one keyed by
/// `(node, loop_index)`.
pub fn image_import_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let loops: Vec<&ValueLoop> = args.inputs.iter().collect();
    let n = broadcast_length(&loops);
    let slots = args.state.media_mut(n);

    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        let path = args.inputs[0].element_at(i as i64).as_text().to_string();
        let slot = &mut slots[i];

        if slot.source != path {
            slot.source = path.clone();
            if path.is_empty() {
                slot.current = MediaRef::None;
                slot.pending = None;
            } else {
                let compute_path = path.clone();
                let generation = args
                    .media
                    .schedule(args.node_id, i, move || decode_image(&compute_path));
                slot.pending = Some(generation);
                if slot.current == MediaRef::None {
                    slot.current = MediaRef::Loading;
                }
            }
        }

        values.push(PortValue::Media(slot.current.clone()));
    }

    EvalOutcome::outputs(vec![ValueLoop::new(ValueKind::Media, values)])
}
