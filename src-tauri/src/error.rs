use derive_more::{Display, From};
use servedeck_control::ControlError;

/// Errors that can abort application setup.
#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    Control(ControlError),

    #[from]
    Store(tauri_plugin_store::Error),
}

impl std::error::Error for Error {}
