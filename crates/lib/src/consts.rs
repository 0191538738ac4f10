/// Name of the plan entry, the installed binary, the layer and the launch process type.
pub const PLAN_ENTRY_FORC: &str = "forc";

/// Configuration option selecting the forc version constraint.
pub const BP_FORC_VERSION: &str = "BP_FORC_VERSION";

/// Configuration option selecting the forc release platform (e.g. `linux_amd64`).
pub const BP_FORC_PLATFORM: &str = "BP_FORC_PLATFORM";

/// Configuration option enabling the `forc deploy` launch process.
pub const BP_ENABLE_FORC_DEPLOY: &str = "BP_ENABLE_FORC_DEPLOY";

/// Environment variable controlling buildpack log verbosity.
pub const BP_LOG_LEVEL: &str = "BP_LOG_LEVEL";

/// Leading path components dropped when expanding a forc release archive
/// (`./forc-binaries/forc` -> `forc`).
pub const ARCHIVE_STRIP_COMPONENTS: usize = 2;

/// Where `forc build` leaves fetched git dependencies on the builder image.
pub const FORC_DEPENDENCY_SOURCE: &str = "/home/cnb/.forc";

/// File name of the provisioned deploy wallet inside the wallets directory.
pub const WALLET_FILENAME: &str = ".wallet";

/// Manifest whose presence in the application directory makes detection pass.
pub const FORC_MANIFEST: &str = "Forc.toml";

/// Exit code signalling a failed detection to the lifecycle.
pub const DETECT_FAIL_EXIT_CODE: i32 = 100;
