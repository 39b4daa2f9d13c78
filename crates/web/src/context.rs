use nightstocker_core::UserId;

/// Session context for a request: who is using the screen.
///
/// Injected by `middleware::session_middleware`; never hard-coded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user_id: UserId,
}

impl SessionContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}
