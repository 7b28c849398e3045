// SPDX-License-Identifier: MIT
mod ai_loop;
mod context;
mod events;

pub use ai_loop::{AiLoop, LoopControl, LoopOutcome};
pub use context::Context;
pub use events::AiLoopEvent;
