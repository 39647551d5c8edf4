use super::env_flag;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Run the daily task generation job (and its startup run)
    pub enabled: bool,
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_flag("FEEDBACKATM_SCHEDULER_ENABLED", true),
        }
    }
}
