use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use common::MigrationConfig;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::inflect::table_name;

const FILES_COLUMN: &str = "\n\t\t\t$table->json('files')->nullable();";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration generator command is empty")]
    EmptyGenerator,

    #[error("Failed to run migration generator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Migration generator exited with {status}")]
    Generator { status: std::process::ExitStatus },

    #[error("No migration file found in {}", directory.display())]
    MigrationFileNotFound { directory: PathBuf },

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Creates an empty migration script for a table.
pub trait MigrationGenerator {
    fn generate(&self, name: &str, table: &str) -> Result<(), MigrationError>;
}

/// Runs an external command, substituting `{name}` and `{table}` in each
/// argument.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    argv: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandGenerator {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            working_dir: None,
        }
    }

    /// Generator for the configured command, run in the configured
    /// working directory if there is one.
    pub fn from_config(config: &MigrationConfig) -> Self {
        let generator = Self::new(config.generator.clone());
        match &config.working_dir {
            Some(dir) => generator.with_working_dir(dir),
            None => generator,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn render(&self, name: &str, table: &str) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| arg.replace("{name}", name).replace("{table}", table))
            .collect()
    }
}

impl MigrationGenerator for CommandGenerator {
    #[instrument(skip(self))]
    fn generate(&self, name: &str, table: &str) -> Result<(), MigrationError> {
        let argv = self.render(name, table);
        let (program, args) = argv.split_first().ok_or(MigrationError::EmptyGenerator)?;

        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        debug!(?argv, "Running migration generator");
        let status = command.status().map_err(|source| MigrationError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !status.success() {
            return Err(MigrationError::Generator { status });
        }
        Ok(())
    }
}

/// Result of [`add_file_field`].
#[derive(Debug, PartialEq, Eq)]
pub enum Patch {
    /// The column was injected.
    Applied { table: String, path: PathBuf },
    /// The migration has no `Schema::table` opening line for the table.
    AnchorMissing { table: String, path: PathBuf },
}

/// Generate a migration for `model`'s table and inject a nullable JSON
/// `files` column into it.
#[instrument(skip(generator, config))]
pub fn add_file_field(
    generator: &dyn MigrationGenerator,
    config: &MigrationConfig,
    model: &str,
) -> Result<Patch, MigrationError> {
    let table = table_name(model);
    let name = format!("add_files_field_to_{table}_table");
    generator.generate(&name, &table)?;

    let directory = config.migrations_dir();
    let path = latest_migration(&directory, &config.extension)?
        .ok_or(MigrationError::MigrationFileNotFound { directory })?;

    let io_err = |source| MigrationError::Io {
        path: path.clone(),
        source,
    };
    let contents = fs::read_to_string(&path).map_err(io_err)?;

    match inject_files_column(&contents, &table) {
        Some(patched) => {
            fs::write(&path, patched).map_err(io_err)?;
            info!(path = %path.display(), %table, "Patched migration");
            Ok(Patch::Applied { table, path })
        }
        None => Ok(Patch::AnchorMissing { table, path }),
    }
}

/// The lexicographically last file in `directory` with `extension`.
///
/// A missing directory counts as empty.
pub fn latest_migration(directory: &Path, extension: &str) -> Result<Option<PathBuf>, MigrationError> {
    let io_err = |source| MigrationError::Io {
        path: directory.to_path_buf(),
        source,
    };

    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(err)),
    };

    let mut latest: Option<PathBuf> = None;
    for entry in entries {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        if latest.as_ref().is_none_or(|l| path.file_name() > l.file_name()) {
            latest = Some(path);
        }
    }
    Ok(latest)
}

/// Insert the `files` column after every opening line of a
/// `Schema::table` block for `table`. `None` if there is no such line.
pub fn inject_files_column(contents: &str, table: &str) -> Option<String> {
    let anchor = format!("Schema::table('{table}', function (Blueprint $table) {{");
    if !contents.contains(&anchor) {
        return None;
    }
    Some(contents.replace(&anchor, &format!("{anchor}{FILES_COLUMN}")))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    const STUB: &str = "<?php\n\nreturn new class extends Migration\n{\n    public function up(): void\n    {\n        Schema::table('invoices', function (Blueprint $table) {\n            //\n        });\n    }\n};\n";

    /// Writes a migration the way a framework generator would.
    struct StubGenerator {
        directory: PathBuf,
        contents: String,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl StubGenerator {
        fn new(directory: &Path, contents: &str) -> Self {
            Self {
                directory: directory.to_path_buf(),
                contents: contents.to_string(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl MigrationGenerator for StubGenerator {
        fn generate(&self, name: &str, table: &str) -> Result<(), MigrationError> {
            self.calls
                .borrow_mut()
                .push((name.to_string(), table.to_string()));
            fs::create_dir_all(&self.directory).unwrap();
            fs::write(
                self.directory.join(format!("2024_06_01_000000_{name}.php")),
                &self.contents,
            )
            .unwrap();
            Ok(())
        }
    }

    struct NoopGenerator;

    impl MigrationGenerator for NoopGenerator {
        fn generate(&self, _name: &str, _table: &str) -> Result<(), MigrationError> {
            Ok(())
        }
    }

    fn config(directory: &Path) -> MigrationConfig {
        MigrationConfig {
            directory: directory.to_path_buf(),
            ..MigrationConfig::default()
        }
    }

    #[test]
    fn patches_generated_migration() {
        let dir = tempfile::tempdir().unwrap();
        let migrations = dir.path().join("database/migrations");
        fs::create_dir_all(&migrations).unwrap();
        fs::write(migrations.join("2014_10_12_000000_create_users_table.php"), "old").unwrap();
        let generator = StubGenerator::new(&migrations, STUB);

        let patch = add_file_field(&generator, &config(&migrations), "Invoice").unwrap();

        let path = migrations.join("2024_06_01_000000_add_files_field_to_invoices_table.php");
        assert_eq!(
            patch,
            Patch::Applied {
                table: "invoices".into(),
                path: path.clone()
            }
        );
        assert_eq!(
            generator.calls.borrow().as_slice(),
            &[(
                "add_files_field_to_invoices_table".to_string(),
                "invoices".to_string()
            )]
        );

        let patched = fs::read_to_string(path).unwrap();
        assert!(patched.contains(
            "Schema::table('invoices', function (Blueprint $table) {\n\t\t\t$table->json('files')->nullable();\n            //"
        ));
        assert_eq!(
            fs::read_to_string(migrations.join("2014_10_12_000000_create_users_table.php")).unwrap(),
            "old"
        );
    }

    #[test]
    fn missing_migration_file() {
        let dir = tempfile::tempdir().unwrap();
        let migrations = dir.path().join("nothing-here");

        let err = add_file_field(&NoopGenerator, &config(&migrations), "Invoice").unwrap_err();

        assert!(matches!(err, MigrationError::MigrationFileNotFound { .. }));
    }

    #[test]
    fn missing_anchor_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let generator = StubGenerator::new(dir.path(), "<?php // handwritten\n");

        let patch = add_file_field(&generator, &config(dir.path()), "Invoice").unwrap();

        let path = dir
            .path()
            .join("2024_06_01_000000_add_files_field_to_invoices_table.php");
        assert_eq!(
            patch,
            Patch::AnchorMissing {
                table: "invoices".into(),
                path: path.clone()
            }
        );
        assert_eq!(fs::read_to_string(path).unwrap(), "<?php // handwritten\n");
    }

    #[test]
    fn latest_migration_is_last_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "2024_01_02_000000_b.php",
            "2024_01_10_000000_c.php",
            "2024_01_01_000000_a.php",
            "2099_01_01_000000_notes.txt",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("2100_subdir.php")).unwrap();

        let latest = latest_migration(dir.path(), "php").unwrap().unwrap();
        assert_eq!(latest.file_name().unwrap(), "2024_01_10_000000_c.php");
    }

    #[test]
    fn inject_only_matches_the_right_table() {
        assert_eq!(inject_files_column(STUB, "posts"), None);

        let patched = inject_files_column(STUB, "invoices").unwrap();
        assert_eq!(patched.matches("$table->json('files')->nullable();").count(), 1);
    }

    #[test]
    fn command_generator_substitutes_placeholders() {
        let generator = CommandGenerator::new(
            ["php", "artisan", "make:migration", "{name}", "--table={table}"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        assert_eq!(
            generator.render("add_files_field_to_posts_table", "posts"),
            vec![
                "php",
                "artisan",
                "make:migration",
                "add_files_field_to_posts_table",
                "--table=posts"
            ]
        );
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = CommandGenerator::new(Vec::new())
            .generate("n", "t")
            .unwrap_err();
        assert!(matches!(err, MigrationError::EmptyGenerator));
    }

    #[test]
    fn unknown_program_is_a_spawn_error() {
        let err = CommandGenerator::new(vec!["modelfiles-no-such-generator".into()])
            .generate("n", "t")
            .unwrap_err();
        assert!(matches!(err, MigrationError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn command_generator_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let generator = CommandGenerator::new(vec!["touch".into(), "{name}.php".into()])
            .with_working_dir(dir.path());

        generator.generate("add_files_field_to_posts_table", "posts").unwrap();

        assert!(dir.path().join("add_files_field_to_posts_table.php").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn configured_working_dir_is_used_for_generation_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let migrations = dir.path().join("database/migrations");
        fs::create_dir_all(&migrations).unwrap();
        let config = MigrationConfig {
            generator: vec![
                "sh".into(),
                "-c".into(),
                format!("printf '%s' \"$0\" > database/migrations/2024_06_01_000000_{{name}}.php"),
                "Schema::table('{table}', function (Blueprint $table) {\n});".into(),
            ],
            working_dir: Some(dir.path().to_path_buf()),
            ..MigrationConfig::default()
        };

        let patch = add_file_field(&CommandGenerator::from_config(&config), &config, "Post").unwrap();

        let path = migrations.join("2024_06_01_000000_add_files_field_to_posts_table.php");
        assert_eq!(
            patch,
            Patch::Applied {
                table: "posts".into(),
                path: path.clone()
            }
        );
        assert!(
            fs::read_to_string(path)
                .unwrap()
                .contains("$table->json('files')->nullable();")
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_reported() {
        let err = CommandGenerator::new(vec!["false".into()])
            .generate("n", "t")
            .unwrap_err();
        assert!(matches!(err, MigrationError::Generator { .. }));
    }
}
