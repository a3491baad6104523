/// Middleware module
///
/// Token guards for protected routes.

mod token_guard;

pub use token_guard::{
    bearer_token, AuthenticatedUser, GuardConfig, PostVerify, PresentedRefreshToken, TokenGuard,
    TokenSource, REFRESH_TOKEN_COOKIE,
};
