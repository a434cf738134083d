use std::time::Duration;

/// Pause applied before register/login complete, so the UI has a busy state to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatencyPolicy {
    #[default]
    None,
    Fixed(Duration),
}

impl LatencyPolicy {
    pub async fn wait(&self) {
        if let LatencyPolicy::Fixed(delay) = self {
            if !delay.is_zero() {
                tokio::time::sleep(*delay).await;
            }
        }
    }
}
