mod compensate;
mod fs_utils;
mod install;
mod types;
mod uninstall;

pub use compensate::{Compensation, CompensationError};
pub use install::{install, install_from_image};
pub use types::{ActionError, InstallStatus, UninstallStatus};
pub use uninstall::{uninstall, uninstall_with};
