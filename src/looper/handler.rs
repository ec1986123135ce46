//! Posting surface bound to a [`Looper`].
//!
//! A handler is either synchronous or asynchronous. Asynchronous messages are
//! exempt from synchronous barriers, so they are not held back while the loop
//! is waiting on, say, a frame. How an asynchronous handler can be obtained
//! depends on the looper's [`AsyncSupport`]; [`Handler::for_looper`] probes it
//! once and falls back to a synchronous handler when it has to.

use super::{AsyncSupport, Looper, MessageToken};
use crate::error::{DispatchError, Result};

use std::time::Duration;
use tracing::{debug, trace};

#[derive(Clone)]
pub struct Handler {
    looper: Looper,
    asynchronous: bool,
}

impl Handler {
    /// Baseline synchronous handler. Always available.
    pub fn new(looper: &Looper) -> Self {
        Self {
            looper: looper.clone(),
            asynchronous: false,
        }
    }

    /// Asynchronous handler through the public constructor.
    ///
    /// # Errors
    /// [`DispatchError::Unsupported`] unless the looper advertises
    /// [`AsyncSupport::Public`].
    pub fn create_async(looper: &Looper) -> Result<Self> {
        match looper.async_support() {
            AsyncSupport::Public => Ok(Self {
                looper: looper.clone(),
                asynchronous: true,
            }),
            _ => Err(DispatchError::Unsupported(
                "public asynchronous handler constructor",
            )),
        }
    }

    // Privileged constructor of platforms that support asynchronous messages
    // without exposing them.
    fn create_async_privileged(looper: &Looper) -> Result<Self> {
        match looper.async_support() {
            AsyncSupport::Hidden {
                constructor_available: true,
            } => Ok(Self {
                looper: looper.clone(),
                asynchronous: true,
            }),
            _ => Err(DispatchError::Unsupported(
                "privileged asynchronous handler constructor",
            )),
        }
    }

    /// Picks the best construction path for `looper`.
    ///
    /// With `asynchronous` set, tries the public constructor, then the
    /// privileged one; any failure yields a synchronous handler.
    pub fn for_looper(looper: &Looper, asynchronous: bool) -> Self {
        if !asynchronous {
            return Self::new(looper);
        }

        let attempt = match looper.async_support() {
            AsyncSupport::Unavailable => return Self::new(looper),
            AsyncSupport::Public => Self::create_async(looper),
            AsyncSupport::Hidden { .. } => Self::create_async_privileged(looper),
        };

        attempt.unwrap_or_else(|err| {
            debug!(%err, "asynchronous handler unavailable, using a synchronous one");
            Self::new(looper)
        })
    }

    pub fn looper(&self) -> &Looper {
        &self.looper
    }

    pub fn is_async(&self) -> bool {
        self.asynchronous
    }

    /// Posts `work` to run as soon as possible.
    ///
    /// Returns `None` and drops `work` if the looper has quit.
    pub fn post<F>(&self, work: F) -> Option<MessageToken>
    where
        F: FnOnce() + 'static,
    {
        self.post_delayed(work, Duration::ZERO)
    }

    /// Posts `work` to run once `delay` has elapsed.
    ///
    /// Returns `None` and drops `work` if the looper has quit.
    pub fn post_delayed<F>(&self, work: F, delay: Duration) -> Option<MessageToken>
    where
        F: FnOnce() + 'static,
    {
        let token = self.looper.enqueue(delay, Box::new(work), self.asynchronous);
        if token.is_none() {
            trace!(?delay, "looper quit, message dropped");
        }
        token
    }

    /// Removes a message that has not run yet. Returns `false` if it already
    /// ran or was removed.
    pub fn remove_callbacks(&self, token: MessageToken) -> bool {
        self.looper.remove(token)
    }
}
