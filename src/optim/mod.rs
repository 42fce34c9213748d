//! Optimizers and learning rate schedules

mod adamw;
mod optimizer;
mod scheduler;
mod sgd;

pub use adamw::AdamW;
pub use optimizer::Optimizer;
pub use scheduler::{sched_cos, ExponentialLR, FlatCosLR, LRScheduler, OneCycleLR, SgdrLR};
pub use sgd::SGD;
