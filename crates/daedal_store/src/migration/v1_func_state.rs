//! v1 -> v2: function records grow the three-state Clean/Pending/Failed
//! byte. v1 stored a single pending flag; Failed did not exist yet, so the
//! mapping is total.

use daedal_core::{DaedalError, DaedalResult, ProgressChannel};
use daedal_model::FuncState;

use crate::migration::ConversionRoutine;
use crate::raw::RawDocument;

pub struct Conversion;

impl ConversionRoutine for Conversion {
    fn from_version(&self) -> u32 {
        1
    }

    fn name(&self) -> &'static str {
        "function pending flag to state byte"
    }

    fn apply(&self, raw: &mut RawDocument, progress: &dyn ProgressChannel) -> DaedalResult<()> {
        let total = raw.functions.len().max(1);
        for (index, function) in raw.functions.iter_mut().enumerate() {
            if progress.is_cancelled() {
                return Err(DaedalError::aborted("document conversion cancelled"));
            }
            match (function.pending.take(), function.state) {
                (Some(pending), None) => {
                    let state = if pending {
                        FuncState::Pending
                    } else {
                        FuncState::Clean
                    };
                    function.state = Some(state.as_u8());
                }
                // Already carries a state byte: nothing to do for it.
                (None, Some(_)) => {}
                _ => {
                    return Err(DaedalError::unsupported_schema(1, 2));
                }
            }
            progress.report_progress(((index + 1) * 100 / total) as u8);
        }
        Ok(())
    }
}
