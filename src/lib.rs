//! Session and access-control core of the care CRM client.
//!
//! Feature modules talk to the API through [`http::client::ApiClient`],
//! read session state from [`services::auth::CredentialStore`], and gate
//! views with [`middleware_layer::auth::SessionGuard`]. Everything is wired
//! by [`state::SessionContext`].

pub mod config;
pub mod error;
pub mod navigation;
pub mod notice;
pub mod state;

pub mod models {
    pub mod envelope;
    pub mod menu;
    pub mod push;
    pub mod session;
    pub mod user;
}

pub mod storage {
    pub mod backend;
    pub mod file;
    pub mod redis;
    pub mod session;
}

pub mod http {
    pub mod auth_api;
    pub mod client;
    pub mod request;
    pub mod retry;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod error_notice;
    pub mod refresh;
}

pub mod services {
    pub mod auth;
    pub mod menus;
    pub mod notifications;
    pub mod permissions;
}

pub mod validation {
    pub mod auth;
}
