/// Behaviour switches of a [crate::Registry]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Reject registrations once anything has been resolved
    pub freeze_after_first_resolve: bool,
    /// Bind unregistered concrete types to themselves on first request
    pub auto_bind: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        RegistryOptions {
            freeze_after_first_resolve: false,
            auto_bind: true,
        }
    }
}

impl RegistryOptions {
    pub fn frozen_after_first_resolve(mut self) -> Self {
        self.freeze_after_first_resolve = true;
        self
    }

    pub fn explicit_only(mut self) -> Self {
        self.auto_bind = false;
        self
    }
}
