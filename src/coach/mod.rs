//! Offline coach voice.

pub mod tone;

pub use tone::{ThemeTerms, TimeOfDay, ToneComposer, ToneContext, ToneHook};
