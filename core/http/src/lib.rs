//! Loopback HTTP surface for KeeBridge.
//!
//! Six JSON endpoints sit in front of a shared [`VaultService`]:
//!
//! | Route              | Body                                  |
//! |--------------------|---------------------------------------|
//! | `POST /unlock`     | `{dbPath?, password, keyfile?}`       |
//! | `POST /lock`       | none                                  |
//! | `GET /status`      | none                                  |
//! | `POST /search`     | `{url}`                               |
//! | `POST /get-credentials` | `{uuid}`                         |
//! | `POST /force-reload` | none                                |
//!
//! Every response body is an `{success, data?, error?}` envelope.
//!
//! [`VaultService`]: keebridge_app::VaultService

pub mod handlers;
pub mod server;

pub use handlers::status_for;
pub use server::{router, serve, start_server_on};
