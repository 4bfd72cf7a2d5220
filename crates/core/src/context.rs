/// Identity of the caller on whose behalf an operation runs.
///
/// Created per request and handed to the proxy layer, which copies the
/// tenant and user into receiver fields of transfer notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    /// Remote address of the caller, when the transport exposes it.
    pub remote_addr: Option<String>,
}

impl RequestContext {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            user_id: Some(user_id.into()),
            remote_addr: None,
        }
    }

    /// Attach the caller's remote address.
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }
}
