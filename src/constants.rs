//! Global constants used throughout fullupdate.
//!
//! Directory names, file names and defaults are part of the filesystem contract
//! with the release pipeline and the update-discovery service, so they live in
//! one place.

use std::time::Duration;

/// Directory under the workdir holding product installation output.
pub const INSTALLATION_DIR: &str = "installation";

/// Path segments from `<workdir>/installation/<product>` to the installer archive directory.
pub const INSTALLER_SUBPATH: [&str; 3] = ["archive", "install", "en-US"];

/// Directory under the workdir where MAR staging trees live.
pub const MAR_DIR: &str = "mar";

/// Staging directory (under [`MAR_DIR`]) for the extracted current build.
pub const CURRENT_BUILD_DIR: &str = "current-build";

/// Directory under the workdir receiving update artifacts and descriptors.
pub const UPDATE_DIR: &str = "update";

/// Suffix appended to the filename prefix for complete update containers.
pub const COMPLETE_SUFFIX: &str = "-complete";

/// Extension of update containers.
pub const CONTAINER_EXTENSION: &str = "mar";

/// File name of the metadata descriptor in the update directory.
pub const DESCRIPTOR_FILE: &str = "complete_info.json";

/// Name of the hash function recorded in the descriptor.
pub const HASH_FUNCTION: &str = "sha512";

/// Read buffer used when hashing artifacts (1 MiB).
pub const HASH_BUFFER_SIZE: usize = 1024 * 1024;

/// Default container build tool, resolved through `PATH`.
pub const DEFAULT_CONTAINER_TOOL: &str = "make_full_update.sh";

/// Default MAR tool, resolved through `PATH`.
pub const DEFAULT_MAR_TOOL: &str = "mar";

/// Default bound on the container build subprocess.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default bound on the signing subprocess.
pub const DEFAULT_SIGN_TIMEOUT: Duration = Duration::from_secs(600);

/// Environment variable naming the MAR tool.
pub const ENV_MAR: &str = "MAR";

/// Environment variable naming the container build tool.
pub const ENV_CONTAINER_TOOL: &str = "FULLUPDATE_CONTAINER_TOOL";

/// Environment variable naming the configuration file.
pub const ENV_CONFIG: &str = "FULLUPDATE_CONFIG";

/// Environment variable disabling progress spinners when set.
pub const ENV_NO_PROGRESS: &str = "FULLUPDATE_NO_PROGRESS";
