use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use evr_model::{CategoryId, CategorySchema};

use crate::csv::categories::{CategoryMeta, parse_categories_csv};
use crate::csv::fields::{FieldRow, parse_fields_csv};
use crate::error::SchemaError;
use crate::hash::sha256_hex;
use crate::manifest::{Manifest, ManifestFile};

const MANIFEST_SCHEMA: &str = "evreport.definitions-manifest";
const MANIFEST_SCHEMA_VERSION: u32 = 1;

const REQUIRED_ROLES: &[&str] = &["central_categories", "central_fields", "legacy_categories"];

/// Role prefix for legacy per-category field files; the suffix is the
/// category id (e.g. `legacy_fields/outages`).
const LEGACY_FIELDS_PREFIX: &str = "legacy_fields/";

const ALLOWED_KINDS: &[&str] = &["csv", "toml", "other"];

/// Which of the two equivalent definition sources backs the registry.
///
/// Both sources must yield schemas satisfying the same contract; the toggle
/// exists so identical validation logic can be exercised against either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaSource {
    /// Centralized definitions: one categories.csv plus one fields.csv.
    #[default]
    Central,
    /// Legacy definitions: one field file per category.
    Legacy,
}

impl SchemaSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaSource::Central => "central",
            SchemaSource::Legacy => "legacy",
        }
    }
}

/// Immutable, process-lifetime category schema registry.
///
/// Loaded once at startup from a manifest-verified definitions directory and
/// shared by reference across stage invocations; callers never observe
/// partial or mid-reload state.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    source: SchemaSource,
    schemas: BTreeMap<CategoryId, CategorySchema>,
}

impl SchemaRegistry {
    /// Verify the definitions directory against its manifest and load every
    /// category schema from the selected source.
    pub fn load(definitions_dir: &Path, source: SchemaSource) -> Result<Self, SchemaError> {
        let manifest = load_manifest(&definitions_dir.join("manifest.toml"))?;
        validate_manifest(&manifest, definitions_dir)?;

        let mut files = manifest.files.clone();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        for file in &files {
            verify_file(definitions_dir, file)?;
        }

        let (categories, field_rows) = match source {
            SchemaSource::Central => {
                let categories = parse_categories_csv(&resolve_role_path(
                    definitions_dir,
                    &files,
                    "central_categories",
                )?)?;
                let field_rows = parse_fields_csv(
                    &resolve_role_path(definitions_dir, &files, "central_fields")?,
                    None,
                )?;
                (categories, field_rows)
            }
            SchemaSource::Legacy => {
                let categories = parse_categories_csv(&resolve_role_path(
                    definitions_dir,
                    &files,
                    "legacy_categories",
                )?)?;
                let mut field_rows = Vec::new();
                for category in &categories {
                    let role = format!("{LEGACY_FIELDS_PREFIX}{}", category.category);
                    let path = resolve_role_path(definitions_dir, &files, &role)?;
                    field_rows.extend(parse_fields_csv(&path, Some(&category.category))?);
                }
                (categories, field_rows)
            }
        };

        let schemas = assemble_schemas(&categories, field_rows)?;
        debug!(
            source = source.as_str(),
            categories = schemas.len(),
            "loaded schema registry"
        );
        Ok(Self { source, schemas })
    }

    /// Build a registry directly from schemas; used by tests and by callers
    /// that assemble definitions elsewhere.
    pub fn from_schemas(schemas: impl IntoIterator<Item = CategorySchema>) -> Self {
        Self {
            source: SchemaSource::default(),
            schemas: schemas
                .into_iter()
                .map(|schema| (schema.category.clone(), schema))
                .collect(),
        }
    }

    pub fn source(&self) -> SchemaSource {
        self.source
    }

    /// Look up the schema for a category; unrecognized ids fail.
    pub fn category_schema(&self, category: &CategoryId) -> Result<&CategorySchema, SchemaError> {
        self.schemas
            .get(category)
            .ok_or_else(|| SchemaError::UnknownCategory {
                category: category.to_string(),
            })
    }

    /// All loaded schemas in category order.
    pub fn categories(&self) -> impl Iterator<Item = &CategorySchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn load_manifest(path: &Path) -> Result<Manifest, SchemaError> {
    let contents = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
    toml::from_str(&contents).map_err(|e| SchemaError::Toml {
        path: path.to_path_buf(),
        source: e,
    })
}

fn validate_manifest(manifest: &Manifest, definitions_dir: &Path) -> Result<(), SchemaError> {
    if manifest.manifest.schema != MANIFEST_SCHEMA {
        return Err(SchemaError::InvalidManifest {
            message: format!("unsupported schema: {}", manifest.manifest.schema),
        });
    }
    if manifest.manifest.schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(SchemaError::InvalidManifest {
            message: format!(
                "unsupported schema_version: {}",
                manifest.manifest.schema_version
            ),
        });
    }

    let mut roles: BTreeSet<&str> = BTreeSet::new();
    let mut manifest_paths: BTreeSet<PathBuf> = BTreeSet::new();

    for file in &manifest.files {
        if roles.contains(file.role.as_str()) {
            return Err(SchemaError::DuplicateRole {
                role: file.role.clone(),
            });
        }
        roles.insert(file.role.as_str());

        if !ALLOWED_KINDS.contains(&file.kind.as_str()) {
            return Err(SchemaError::InvalidManifest {
                message: format!("unsupported kind '{}' for {}", file.kind, file.path),
            });
        }

        validate_sha(&file.sha256, &file.path)?;

        let path = validate_path(&file.path)?;
        manifest_paths.insert(path);
    }

    for role in REQUIRED_ROLES {
        if !roles.contains(role) {
            return Err(SchemaError::MissingRole {
                role: (*role).to_string(),
            });
        }
    }

    let actual_files = list_files_under(definitions_dir)?;
    let manifest_paths: BTreeSet<PathBuf> = manifest_paths
        .into_iter()
        .map(|p| normalize_path(&p))
        .collect();

    for path in actual_files {
        if path == PathBuf::from("manifest.toml") {
            continue;
        }
        let normalized = normalize_path(&path);
        if !manifest_paths.contains(&normalized) {
            return Err(SchemaError::UnexpectedFile {
                path: definitions_dir.join(path),
            });
        }
    }

    Ok(())
}

fn verify_file(definitions_dir: &Path, file: &ManifestFile) -> Result<(), SchemaError> {
    let full_path = definitions_dir.join(&file.path);
    let bytes = std::fs::read(&full_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SchemaError::MissingFile {
                path: full_path.clone(),
            }
        } else {
            SchemaError::io(full_path.clone(), e)
        }
    })?;

    let actual = sha256_hex(&bytes);
    let expected = file.sha256.to_ascii_lowercase();
    if actual != expected {
        return Err(SchemaError::Sha256Mismatch {
            path: full_path,
            expected,
            actual,
        });
    }
    Ok(())
}

fn resolve_role_path(
    definitions_dir: &Path,
    files: &[ManifestFile],
    role: &str,
) -> Result<PathBuf, SchemaError> {
    let f = files
        .iter()
        .find(|f| f.role == role)
        .ok_or_else(|| SchemaError::MissingRole {
            role: role.to_string(),
        })?;
    Ok(definitions_dir.join(&f.path))
}

fn assemble_schemas(
    categories: &[CategoryMeta],
    field_rows: Vec<FieldRow>,
) -> Result<BTreeMap<CategoryId, CategorySchema>, SchemaError> {
    let mut by_category: BTreeMap<String, Vec<FieldRow>> = BTreeMap::new();
    for row in field_rows {
        by_category.entry(row.category.clone()).or_default().push(row);
    }

    let known: BTreeSet<&str> = categories.iter().map(|c| c.category.as_str()).collect();
    if let Some(orphan) = by_category.keys().find(|c| !known.contains(c.as_str())) {
        return Err(SchemaError::InvalidCategory {
            category: orphan.clone(),
            message: "fields defined for a category missing from categories.csv".to_string(),
        });
    }

    let mut schemas = BTreeMap::new();
    for meta in categories {
        let rows = by_category.remove(&meta.category).unwrap_or_default();
        if rows.is_empty() {
            return Err(SchemaError::InvalidCategory {
                category: meta.category.clone(),
                message: "category has no field definitions".to_string(),
            });
        }

        let mut seen = BTreeSet::new();
        for row in &rows {
            if !seen.insert(row.definition.name.to_ascii_lowercase()) {
                return Err(SchemaError::InvalidField {
                    category: meta.category.clone(),
                    field: row.definition.name.clone(),
                    message: "duplicate field definition".to_string(),
                });
            }
            if row.nullable_key && row.unique_key_order.is_none() {
                return Err(SchemaError::InvalidField {
                    category: meta.category.clone(),
                    field: row.definition.name.clone(),
                    message: "Nullable Key set on a field outside the unique key".to_string(),
                });
            }
        }

        let mut key_rows: Vec<(u32, &FieldRow)> = rows
            .iter()
            .filter_map(|row| row.unique_key_order.map(|order| (order, row)))
            .collect();
        key_rows.sort_by_key(|(order, _)| *order);
        for pair in key_rows.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(SchemaError::InvalidField {
                    category: meta.category.clone(),
                    field: pair[1].1.definition.name.clone(),
                    message: format!("duplicate Unique Key position {}", pair[1].0),
                });
            }
        }
        if key_rows.is_empty() {
            return Err(SchemaError::InvalidCategory {
                category: meta.category.clone(),
                message: "category defines no unique key fields".to_string(),
            });
        }

        let category = CategoryId::new(meta.category.clone()).map_err(|e| {
            SchemaError::InvalidCategory {
                category: meta.category.clone(),
                message: e.to_string(),
            }
        })?;

        let unique_key_fields: Vec<String> = key_rows
            .iter()
            .map(|(_, row)| row.definition.name.clone())
            .collect();
        let nullable_key_fields: Vec<String> = key_rows
            .iter()
            .filter(|(_, row)| row.nullable_key)
            .map(|(_, row)| row.definition.name.clone())
            .collect();

        schemas.insert(
            category.clone(),
            CategorySchema {
                category,
                label: meta.label.clone(),
                cadence: meta.cadence,
                fields: rows.into_iter().map(|row| row.definition).collect(),
                unique_key_fields,
                nullable_key_fields,
            },
        );
    }

    Ok(schemas)
}

fn validate_sha(sha: &str, path: &str) -> Result<(), SchemaError> {
    if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SchemaError::InvalidSha256 {
            path: PathBuf::from(path),
            message: "sha256 must be 64 hex characters".to_string(),
        });
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<PathBuf, SchemaError> {
    if path.contains('\\') {
        return Err(SchemaError::InvalidPath {
            path: PathBuf::from(path),
            message: "manifest path must use '/' separators".to_string(),
        });
    }

    let p = PathBuf::from(path);
    if p.is_absolute() {
        return Err(SchemaError::InvalidPath {
            path: p,
            message: "manifest path must be relative".to_string(),
        });
    }

    for c in p.components() {
        if matches!(c, Component::ParentDir) {
            return Err(SchemaError::InvalidPath {
                path: PathBuf::from(path),
                message: "manifest path must not traverse out of definitions/".to_string(),
            });
        }
    }

    Ok(p)
}

fn list_files_under(root: &Path) -> Result<BTreeSet<PathBuf>, SchemaError> {
    let mut stack = vec![root.to_path_buf()];
    let mut files = BTreeSet::new();

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).map_err(|e| SchemaError::io(&dir, e))? {
            let entry = entry.map_err(|e| SchemaError::io(&dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                let rel = path
                    .strip_prefix(root)
                    .map_err(|e| SchemaError::InvalidPath {
                        path: path.clone(),
                        message: format!("failed to relativize path: {e}"),
                    })?
                    .to_path_buf();
                files.insert(rel);
            }
        }
    }

    Ok(files)
}

fn normalize_path(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in p.components() {
        match c {
            Component::CurDir => {}
            _ => out.push(c.as_os_str()),
        }
    }
    out
}
