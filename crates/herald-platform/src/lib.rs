mod package;
mod paths;
mod proxy;

pub use package::{PackageError, PackageManifest};
pub use paths::{AppPaths, AppPathsError};
pub use proxy::SystemProxy;
