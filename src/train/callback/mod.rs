//! Callback system for training events
//!
//! Provides extensible hooks for training loop events:
//! - `on_train_begin` / `on_train_end`
//! - `on_epoch_begin` / `on_epoch_end`
//! - `on_step_begin` / `on_step_end`
//! - inside a step: `after_pred`, `after_loss`, `before_backward`,
//!   `before_step` (may cancel the optimizer step), `after_cancel_step`,
//!   `after_step`
//! - `on_validation`
//!
//! # Example
//!
//! ```rust
//! use afinar::train::callback::{TrainerCallback, CallbackContext, CallbackAction};
//!
//! struct PrintCallback;
//!
//! impl TrainerCallback for PrintCallback {
//!     fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
//!         println!("Epoch {} finished with loss {:.4}", ctx.epoch, ctx.loss);
//!         CallbackAction::Continue
//!     }
//! }
//! ```

mod early_stopping;
mod manager;
mod progress;
mod traits;

pub use early_stopping::{EarlyStopping, Monitor};
pub use manager::CallbackManager;
pub use progress::ProgressCallback;
pub use traits::{CallbackAction, CallbackContext, TrainerCallback};
