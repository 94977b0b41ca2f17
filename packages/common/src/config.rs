use std::collections::BTreeMap;
use std::path::PathBuf;

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::{Deserialize, Serialize};

/// Legacy override for [`FilesConfig::storage_disk`].
pub const STORAGE_DISK_ENV: &str = "MODEL_FILE_STORAGE_DISK";
/// Legacy override for [`FilesConfig::resized_image_path`].
pub const RESIZED_IMAGE_PATH_ENV: &str = "RESIZED_IMAGE_PATH";
/// Legacy override for [`FilesConfig::default_collection`].
pub const DEFAULT_COLLECTION_ENV: &str = "DEFAULT_FILE_COLLECTION";
/// Path (without extension) of the config file to load.
pub const CONFIG_PATH_ENV: &str = "MODELFILES_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "config/modelfiles";

/// What `delete_file` does when the blob is already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFilePolicy {
    /// Treat the delete as done and keep going.
    #[default]
    Ignore,
    /// Fail the delete before touching the collection.
    Error,
}

/// Storage backend settings for one named disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "driver", rename_all = "snake_case")]
pub enum DiskConfig {
    /// Files under a local directory.
    Local {
        root: PathBuf,
        /// Base URL the directory is served from. Empty means site-relative.
        #[serde(default)]
        url: String,
    },
    /// Objects in an S3-compatible bucket.
    S3 {
        bucket: String,
        #[serde(default = "default_s3_region")]
        region: String,
        /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secret_key: Option<String>,
        /// Public base URL. Defaults to the bucket URL.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default)]
        path_style: bool,
    },
}

fn default_s3_region() -> String {
    "us-east-1".into()
}

/// Migration scaffolding settings used by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MigrationConfig {
    /// Directory the generator writes migration scripts into.
    #[serde(default = "default_migrations_directory")]
    pub directory: PathBuf,
    /// Extension of migration scripts, without the dot.
    #[serde(default = "default_migrations_extension")]
    pub extension: String,
    /// Generator command line. `{name}` and `{table}` are substituted.
    #[serde(default = "default_migrations_generator")]
    pub generator: Vec<String>,
    /// Application root the generator runs in. Unset means the current
    /// directory. A relative `directory` is resolved against it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

fn default_migrations_directory() -> PathBuf {
    PathBuf::from("database/migrations")
}
fn default_migrations_extension() -> String {
    "php".into()
}
fn default_migrations_generator() -> Vec<String> {
    ["php", "artisan", "make:migration", "{name}", "--table={table}"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            directory: default_migrations_directory(),
            extension: default_migrations_extension(),
            generator: default_migrations_generator(),
            working_dir: None,
        }
    }
}

impl MigrationConfig {
    /// Where migration scripts are looked up.
    pub fn migrations_dir(&self) -> PathBuf {
        match &self.working_dir {
            Some(root) => root.join(&self.directory),
            None => self.directory.clone(),
        }
    }
}

/// Settings for attaching file collections to records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilesConfig {
    /// Disk used when neither the call nor the record names one. Default: "public".
    #[serde(default = "default_storage_disk")]
    pub storage_disk: String,
    /// Collection used when the call does not name one. Default: "default".
    #[serde(default = "default_collection")]
    pub default_collection: String,
    /// Directory template for resized variants. `{width}` and `{height}` are substituted.
    #[serde(default = "default_resized_image_path")]
    pub resized_image_path: String,
    #[serde(default)]
    pub missing_file_on_delete: MissingFilePolicy,
    #[serde(default = "default_disks")]
    pub disks: BTreeMap<String, DiskConfig>,
    #[serde(default)]
    pub migrations: MigrationConfig,
}

fn default_storage_disk() -> String {
    "public".into()
}
fn default_collection() -> String {
    "default".into()
}
fn default_resized_image_path() -> String {
    "resized/{width}x{height}/".into()
}
fn default_disks() -> BTreeMap<String, DiskConfig> {
    BTreeMap::from([
        (
            "local".to_string(),
            DiskConfig::Local {
                root: PathBuf::from("storage/app"),
                url: String::new(),
            },
        ),
        (
            "public".to_string(),
            DiskConfig::Local {
                root: PathBuf::from("storage/app/public"),
                url: "/storage".into(),
            },
        ),
    ])
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_disk: default_storage_disk(),
            default_collection: default_collection(),
            resized_image_path: default_resized_image_path(),
            missing_file_on_delete: MissingFilePolicy::default(),
            disks: default_disks(),
            migrations: MigrationConfig::default(),
        }
    }
}

impl FilesConfig {
    /// Load from `config/modelfiles.toml` (or `$MODELFILES_CONFIG`) and the
    /// process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_env(std::env::vars().collect())
    }

    /// Load using `vars` in place of the process environment.
    ///
    /// Precedence, lowest first: built-in defaults, the config file,
    /// `MODELFILES__*` variables, then the three legacy variables.
    pub fn load_from_env(vars: config::Map<String, String>) -> Result<Self, ConfigError> {
        let config_path = vars
            .get(CONFIG_PATH_ENV)
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let storage_disk = non_empty(&vars, STORAGE_DISK_ENV);
        let resized_image_path = non_empty(&vars, RESIZED_IMAGE_PATH_ENV);
        let default_collection = non_empty(&vars, DEFAULT_COLLECTION_ENV);

        let s = Self::with_defaults(Config::builder())?
            .add_source(File::with_name(&config_path).required(false))
            // e.g. MODELFILES__MIGRATIONS__DIRECTORY
            .add_source(
                Environment::with_prefix("MODELFILES")
                    .separator("__")
                    .source(Some(vars)),
            )
            .set_override_option("storage_disk", storage_disk)?
            .set_override_option("resized_image_path", resized_image_path)?
            .set_override_option("default_collection", default_collection)?
            .build()?;

        let mut config: Self = s.try_deserialize()?;
        // Built-in disks fill gaps by name only; a redefined disk is taken as written.
        for (name, disk) in default_disks() {
            config.disks.entry(name).or_insert(disk);
        }
        Ok(config)
    }

    fn with_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let migrations = MigrationConfig::default();
        builder
            .set_default("storage_disk", default_storage_disk())?
            .set_default("default_collection", default_collection())?
            .set_default("resized_image_path", default_resized_image_path())?
            .set_default("missing_file_on_delete", "ignore")?
            .set_default(
                "migrations.directory",
                migrations.directory.to_string_lossy().into_owned(),
            )?
            .set_default("migrations.extension", migrations.extension)?
            .set_default("migrations.generator", migrations.generator)
    }

    /// The collection to use for a call, falling back to the default.
    pub fn collection_or_default<'a>(&'a self, collection: Option<&'a str>) -> &'a str {
        match collection {
            Some(name) if !name.is_empty() => name,
            _ => &self.default_collection,
        }
    }

    /// Render the config as a TOML document.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn non_empty(vars: &config::Map<String, String>, key: &str) -> Option<String> {
    vars.get(key).filter(|v| !v.is_empty()).cloned()
}
