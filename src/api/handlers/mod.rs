//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod auth;
pub mod health;
pub mod links;
pub mod redirect;

pub use auth::{
    logout_handler, me_handler, oauth_callback_form_handler, oauth_callback_handler,
    oauth_start_handler, providers_handler, refresh_handler,
};
pub use health::health_handler;
pub use links::{create_link_handler, delete_link_handler, list_links_handler, update_link_handler};
pub use redirect::redirect_handler;
