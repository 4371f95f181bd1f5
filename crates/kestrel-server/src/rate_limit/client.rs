//! Client identity used to key rate-limit windows.

use std::fmt;
use std::net::IpAddr;

use kestrel_core::UserId;

/// Who a request is counted against.
///
/// An authenticated user is preferred over the network address so that a
/// user keeps one budget across addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKey {
    User(UserId),
    Ip(IpAddr),
    /// No identity and no peer address (e.g. in-process calls).
    Unknown,
}

impl ClientKey {
    /// Picks the user when known, the address otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use kestrel_core::UserId;
    /// use kestrel_server::rate_limit::ClientKey;
    ///
    /// let addr = "10.0.0.7".parse().ok();
    /// assert_eq!(ClientKey::resolve(Some(UserId::new(7)), addr).to_string(), "user:7");
    /// assert_eq!(ClientKey::resolve(None, addr).to_string(), "ip:10.0.0.7");
    /// ```
    pub fn resolve(user: Option<UserId>, addr: Option<IpAddr>) -> Self {
        match (user, addr) {
            (Some(user), _) => Self::User(user),
            (None, Some(addr)) => Self::Ip(addr),
            (None, None) => Self::Unknown,
        }
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{}", id),
            Self::Ip(addr) => write!(f, "ip:{}", addr),
            Self::Unknown => f.write_str("ip:unknown"),
        }
    }
}
