pub mod action_queue;
pub mod ai;
pub mod orchestrator;
pub mod presentation;
pub mod resolver;
pub mod session;
pub mod skill_effects;
pub mod state;
pub mod turn_scheduler;

#[cfg(test)]
pub(crate) mod tests;
