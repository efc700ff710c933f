//! Test doubles for the native layer.

mod scripted;
pub mod test_helpers;

pub use scripted::{NativeCall, ScriptedDriver, ScriptedResult, ScriptedRow};
pub use test_helpers::*;
