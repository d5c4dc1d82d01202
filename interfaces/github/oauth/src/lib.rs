//! GitHub OAuth web flow: authorize redirect and code exchange.

pub mod index;

pub use index::{
    authorize_url, exchange_code, AccessToken, AuthorizeUrlError, ClientSecret, OAuthAppConfig,
    TokenExchangeError,
};
