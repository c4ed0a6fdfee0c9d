// Library root
// -----------
// This crate exposes the repository contents client used by the `ghrepo`
// binary. The binary (`main.rs`) wires configuration, logging and the
// interactive menu around it.
//
// Module responsibilities:
// - `api`: `ContentsClient`, the file and directory operations.
// - `transport`: the request seam, with the blocking HTTP implementation.
// - `memory`: an in-process store speaking the same contract, for tests.
// - `models` / `error`: response shapes and the typed error kinds.
// - `config`: credentials and settings from the environment.
// - `ui`: the terminal menu that drives the client.
pub mod api;
pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod transport;
pub mod ui;

pub use api::ContentsClient;
pub use config::{Credentials, Settings};
pub use error::{Error, Result};
