//! Flat JSON store for projects and their saved test cases.
//!
//! Layout under the data directory:
//!
//! ```text
//! projects.json        all projects
//! cases/<id>.json      saved cases for one project
//! ```
//!
//! Every write is a whole-file read-modify-write with no locking. Two
//! processes writing at once can clobber each other.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::project::ProjectSettings;
use crate::testgen::case::TestCase;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt store file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("project not found: {0}")]
    ProjectNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub settings: ProjectSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default, Serialize, Deserialize)]
struct ProjectsFile {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Default, Serialize, Deserialize)]
struct CasesFile {
    #[serde(default)]
    test_cases: Vec<TestCase>,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn list(&self) -> Result<Vec<Project>, StoreError> {
        Ok(self.read_projects()?.projects)
    }

    pub fn get(&self, id: &str) -> Result<Project, StoreError> {
        self.read_projects()?
            .projects
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::ProjectNotFound(id.to_string()))
    }

    pub fn create(&self, settings: ProjectSettings) -> Result<Project, StoreError> {
        let mut file = self.read_projects()?;
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4().to_string(),
            settings,
            created_at: now,
            updated_at: now,
        };

        file.projects.push(project.clone());
        self.write_projects(&file)?;
        info!(id = %project.id, name = %project.settings.name, "project created");
        Ok(project)
    }

    pub fn update(&self, id: &str, settings: ProjectSettings) -> Result<Project, StoreError> {
        let mut file = self.read_projects()?;
        let project = file
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::ProjectNotFound(id.to_string()))?;

        project.settings = settings;
        project.updated_at = Utc::now();
        let updated = project.clone();

        self.write_projects(&file)?;
        Ok(updated)
    }

    /// Removes the project and its saved cases.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut file = self.read_projects()?;
        let before = file.projects.len();
        file.projects.retain(|p| p.id != id);
        if file.projects.len() == before {
            return Err(StoreError::ProjectNotFound(id.to_string()));
        }
        self.write_projects(&file)?;

        let cases = self.cases_path(id);
        match fs::remove_file(&cases) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(StoreError::Io { path: cases, source }),
        }

        info!(id, "project deleted");
        Ok(())
    }

    pub fn save_cases(&self, project_id: &str, cases: &[TestCase]) -> Result<(), StoreError> {
        self.get(project_id)?;

        let payload = CasesFile {
            test_cases: cases.to_vec(),
            saved_at: Some(Utc::now()),
        };
        write_json(&self.cases_path(project_id), &payload)?;
        debug!(project_id, count = cases.len(), "test cases saved");
        Ok(())
    }

    /// Saved cases, or an empty list if none were saved.
    pub fn load_cases(&self, project_id: &str) -> Result<Vec<TestCase>, StoreError> {
        let file: CasesFile = read_json(&self.cases_path(project_id))?;
        Ok(file.test_cases)
    }

    fn projects_path(&self) -> PathBuf {
        self.root.join("projects.json")
    }

    fn cases_path(&self, project_id: &str) -> PathBuf {
        self.root.join("cases").join(format!("{project_id}.json"))
    }

    fn read_projects(&self) -> Result<ProjectsFile, StoreError> {
        read_json(&self.projects_path())
    }

    fn write_projects(&self, file: &ProjectsFile) -> Result<(), StoreError> {
        write_json(&self.projects_path(), file)
    }
}

fn read_json<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if raw.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&raw).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let text = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings(name: &str) -> ProjectSettings {
        ProjectSettings {
            name: name.into(),
            languages: vec!["English".into()],
            ..Default::default()
        }
    }

    fn case(id: u32) -> TestCase {
        TestCase {
            test_case_id: id,
            test_title: "Email Field".into(),
            description: "Valid email".into(),
            preconditions: String::new(),
            test_steps: "1. Open page".into(),
            test_data: "Email: an@example.com".into(),
            expected_result: "Accepted".into(),
            comments: String::new(),
        }
    }

    #[test]
    fn empty_store_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::open(dir.path());
        assert!(store.list().unwrap().is_empty());
        assert!(store.load_cases("missing").unwrap().is_empty());
    }

    #[test]
    fn create_update_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::open(dir.path());

        let a = store.create(settings("Shop")).unwrap();
        let b = store.create(settings("Bank")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.list().unwrap().len(), 2);

        let updated = store.update(&a.id, settings("Shop v2")).unwrap();
        assert_eq!(updated.settings.name, "Shop v2");
        assert!(updated.updated_at >= updated.created_at);
        assert_eq!(store.get(&a.id).unwrap().settings.name, "Shop v2");

        store.delete(&a.id).unwrap();
        assert!(matches!(store.get(&a.id), Err(StoreError::ProjectNotFound(_))));
        assert!(matches!(store.delete(&a.id), Err(StoreError::ProjectNotFound(_))));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn cases_round_trip_and_are_removed_with_project() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::open(dir.path());
        let p = store.create(settings("Shop")).unwrap();

        store.save_cases(&p.id, &[case(1), case(2)]).unwrap();
        assert_eq!(store.load_cases(&p.id).unwrap(), vec![case(1), case(2)]);

        store.delete(&p.id).unwrap();
        assert!(!dir.path().join("cases").join(format!("{}.json", p.id)).exists());
    }

    #[test]
    fn saving_cases_for_unknown_project_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::open(dir.path());
        assert!(matches!(
            store.save_cases("nope", &[case(1)]),
            Err(StoreError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("projects.json"), "{not json").unwrap();
        let store = ProjectStore::open(dir.path());
        assert!(matches!(store.list(), Err(StoreError::Json { .. })));
    }
}
