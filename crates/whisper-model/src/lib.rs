// SPDX-License-Identifier: MIT
pub mod mock;
pub mod provider;
pub mod types;

pub use mock::{MockProvider, ScriptedMockProvider};
pub use provider::ModelProvider;
pub use types::*;
