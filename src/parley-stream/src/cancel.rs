//! Cancellation support for the in-flight request.
//!
//! Holds at most one abort handle. The transport supplies it when a
//! request starts and watches it to know when to stop reading.

use tokio_util::sync::CancellationToken;

/// Owner of the single live abort handle.
#[derive(Debug, Default)]
pub struct CancellationController {
    handle: Option<CancellationToken>,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the handle for a new request, returning any previous one.
    ///
    /// A previous live handle means two streams overlapped; that is the
    /// caller's bug, so the old handle is handed back untouched.
    pub fn attach(&mut self, token: CancellationToken) -> Option<CancellationToken> {
        self.handle.replace(token)
    }

    /// Creates a fresh token, installs it, and returns a clone for the transport.
    pub fn issue(&mut self) -> CancellationToken {
        let token = CancellationToken::new();
        self.handle = Some(token.clone());
        token
    }

    /// Cancels and clears the live handle.
    ///
    /// Returns `true` if there was one. With no handle this is a no-op.
    pub fn abort(&mut self) -> bool {
        match self.handle.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drops the live handle without cancelling it (the request finished).
    pub fn release(&mut self) -> Option<CancellationToken> {
        self.handle.take()
    }

    /// Returns `true` if a request is currently abortable.
    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}
