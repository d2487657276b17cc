//! Version-indexed conversion chain.
//!
//! Each routine upgrades a raw document exactly one format version. The
//! chain is applied strictly in increasing order with no skipping, so every
//! routine's precondition is simply "the document is at my from-version".
//! A routine either fully succeeds or leaves the document untouched; records
//! a transition does not affect are silently left alone.

use daedal_core::{DaedalError, DaedalResult, ProgressChannel};
use daedal_model::CURRENT_FORMAT_VERSION;
use log::info;

use crate::raw::RawDocument;

mod v1_func_state;
mod v2_validity_flags;

/// One v_i -> v_{i+1} upgrade step over the raw document.
pub trait ConversionRoutine: Send + Sync {
    fn from_version(&self) -> u32;
    fn name(&self) -> &'static str;
    fn apply(&self, raw: &mut RawDocument, progress: &dyn ProgressChannel) -> DaedalResult<()>;
}

pub struct Converter;

impl Converter {
    pub fn routines() -> Vec<Box<dyn ConversionRoutine>> {
        vec![
            Box::new(v1_func_state::Conversion),
            Box::new(v2_validity_flags::Conversion),
        ]
    }

    /// Upgrade `raw` to the current format version, one routine at a time.
    /// Each step is atomic: the routine works on a staged copy that only
    /// replaces the document once the step has fully succeeded.
    pub fn upgrade(raw: &mut RawDocument, progress: &dyn ProgressChannel) -> DaedalResult<()> {
        if raw.format_version > CURRENT_FORMAT_VERSION {
            return Err(DaedalError::unsupported_schema(
                raw.format_version,
                CURRENT_FORMAT_VERSION,
            ));
        }
        for routine in Self::routines() {
            if raw.format_version > routine.from_version() {
                continue;
            }
            if raw.format_version < routine.from_version() {
                // A gap in the chain: no routine knows this stamp.
                return Err(DaedalError::unsupported_schema(
                    raw.format_version,
                    CURRENT_FORMAT_VERSION,
                ));
            }
            if progress.is_cancelled() {
                return Err(DaedalError::aborted("document conversion cancelled"));
            }
            let mut staged = raw.clone();
            routine.apply(&mut staged, progress)?;
            staged.format_version = routine.from_version() + 1;
            info!(
                "store: conversion '{}' upgraded document v{} -> v{}",
                routine.name(),
                routine.from_version(),
                staged.format_version
            );
            *raw = staged;
        }
        if raw.format_version != CURRENT_FORMAT_VERSION {
            return Err(DaedalError::unsupported_schema(
                raw.format_version,
                CURRENT_FORMAT_VERSION,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routines_form_a_contiguous_chain_to_current() {
        let routines = Converter::routines();
        let mut expected = 1;
        for routine in &routines {
            assert_eq!(routine.from_version(), expected, "no gaps, no reordering");
            expected += 1;
        }
        assert_eq!(expected, CURRENT_FORMAT_VERSION);
    }
}
