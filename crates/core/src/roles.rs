//! Role names carried in access-token claims.

/// May view and retry any user's jobs and stories.
pub const ROLE_ADMIN: &str = "admin";

pub const ROLE_USER: &str = "user";
