//! Medic: an interruptible diagnostic agent.
//!
//! A model reasons about a reported build or runtime error, calls tools to
//! inspect the project, and is supervised by a human who can approve or
//! reject privileged actions, pause between steps, inject new instructions,
//! or stop the run.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use medic::prelude::*;
//!
//! # async fn example() -> medic::error::Result<()> {
//! let config = MedicConfig::discover()?.apply_env()?;
//! let provider = Arc::new(OpenAiProvider::from_config(&config.agent));
//! let driver = RunDriver::from_config(&config, provider, None);
//! let control = driver.control();
//! let context = DiagnosticContext::new("error[E0425]: cannot find value `x`", ".");
//! let result = driver.run(context).await;
//! println!("{:?} ({})", result.outcome, control.status());
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
