//! Enrollment and course directory client.
//!
//! In production the directory is the portal's academic service, reached
//! over HTTP. Lookups are cached for a short TTL to keep scan latency off
//! the upstream. With an empty or `mock` URL the client serves an
//! in-process directory, optionally seeded from a JSON file.

use async_trait::async_trait;
use attendance_core::{
    Course, CourseCatalog, DirectorySeed, EnrollmentOracle, Error, InMemoryDirectory, Result,
};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::{health, metrics};
use tracing::{debug, info, warn};

/// Maximum cache entries per lookup kind.
const DIRECTORY_CACHE_MAX_CAPACITY: u64 = 10_000;

/// Directory connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Base URL of the academic service; empty or "mock" for in-process.
    #[serde(default)]
    pub url: String,
    /// JSON seed for the in-process directory.
    #[serde(default)]
    pub seed_path: Option<String>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            seed_path: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DirectoryConfig {
    pub fn is_mock(&self) -> bool {
        self.url.is_empty() || self.url == "mock"
    }
}

fn new_cache<V: Clone + Send + Sync + 'static>(ttl: Duration) -> Cache<String, V> {
    Cache::builder()
        .max_capacity(DIRECTORY_CACHE_MAX_CAPACITY)
        .time_to_live(ttl)
        .build()
}

struct RemoteDirectory {
    base_url: String,
    http_client: reqwest::Client,
    courses: Cache<String, Option<Course>>,
    rosters: Cache<String, Arc<Vec<String>>>,
    student_courses: Cache<String, Arc<Vec<String>>>,
}

enum Backend {
    Local(Arc<InMemoryDirectory>),
    Remote(RemoteDirectory),
}

/// Directory used by the engine in a running server.
pub struct DirectoryClient {
    backend: Backend,
}

impl DirectoryClient {
    /// Serve an existing in-process directory.
    pub fn local(directory: Arc<InMemoryDirectory>) -> Self {
        health().directory.set_healthy();
        Self {
            backend: Backend::Local(directory),
        }
    }

    /// Build from configuration, loading the seed file in mock mode.
    pub async fn from_config(config: &DirectoryConfig) -> Result<Self> {
        if config.is_mock() {
            let directory = match &config.seed_path {
                Some(path) => {
                    let bytes = tokio::fs::read(path).await.map_err(|e| {
                        Error::internal(format!("failed to read directory seed {}: {}", path, e))
                    })?;
                    let seed: DirectorySeed = serde_json::from_slice(&bytes)?;
                    info!(
                        path = %path,
                        courses = seed.courses.len(),
                        enrollments = seed.enrollments.len(),
                        "Loaded directory seed"
                    );
                    InMemoryDirectory::from_seed(seed)
                }
                None => {
                    warn!("Directory running in mock mode without a seed");
                    InMemoryDirectory::new()
                }
            };
            return Ok(Self::local(Arc::new(directory)));
        }

        let ttl = Duration::from_secs(config.cache_ttl_secs);
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("failed to create HTTP client: {}", e)))?;

        info!(url = %config.url, cache_ttl_secs = config.cache_ttl_secs, "Using remote directory");
        Ok(Self {
            backend: Backend::Remote(RemoteDirectory {
                base_url: config.url.trim_end_matches('/').to_string(),
                http_client,
                courses: new_cache(ttl),
                rosters: new_cache(ttl),
                student_courses: new_cache(ttl),
            }),
        })
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.backend, Backend::Local(_))
    }

    /// Check the upstream and record the outcome in the health registry.
    pub async fn check_connection(&self) -> bool {
        match &self.backend {
            Backend::Local(_) => {
                health().directory.set_healthy();
                true
            }
            Backend::Remote(remote) => {
                let url = format!("{}/health", remote.base_url);
                match remote.http_client.get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        health().directory.set_healthy();
                        true
                    }
                    Ok(resp) => {
                        health()
                            .directory
                            .set_unhealthy(format!("health returned {}", resp.status()));
                        false
                    }
                    Err(e) => {
                        health().directory.set_unhealthy(e.to_string());
                        false
                    }
                }
            }
        }
    }
}

impl RemoteDirectory {
    /// GET a JSON document; `Ok(None)` on 404.
    async fn fetch<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();
        metrics().directory_requests.inc();
        debug!(url = %url, "Calling directory service");

        let result = self.send(&url).await;
        metrics()
            .directory_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        match &result {
            Ok(_) => health().directory.set_healthy(),
            Err(e) => {
                metrics().directory_errors.inc();
                health().directory.set_unhealthy(e.to_string());
            }
        }
        result
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            warn!(error = %e, "Directory request failed");
            Error::upstream(format!("directory unavailable: {}", e))
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Directory returned error");
            return Err(Error::upstream(format!("directory returned {}: {}", status, body)));
        }

        response.json().await.map(Some).map_err(|e| {
            warn!(error = %e, "Failed to parse directory response");
            Error::upstream(format!("invalid directory response: {}", e))
        })
    }

    async fn roster(&self, course_id: &str) -> Result<Arc<Vec<String>>> {
        if let Some(cached) = self.rosters.get(course_id).await {
            return Ok(cached);
        }
        let mut students: Vec<String> = self
            .fetch(&format!("/courses/{}/students", course_id))
            .await?
            .unwrap_or_default();
        students.sort();
        students.dedup();
        let students = Arc::new(students);
        self.rosters
            .insert(course_id.to_string(), students.clone())
            .await;
        Ok(students)
    }

    async fn courses_of(&self, student_id: &str) -> Result<Arc<Vec<String>>> {
        if let Some(cached) = self.student_courses.get(student_id).await {
            return Ok(cached);
        }
        let mut courses: Vec<String> = self
            .fetch(&format!("/students/{}/courses", student_id))
            .await?
            .unwrap_or_default();
        courses.sort();
        courses.dedup();
        let courses = Arc::new(courses);
        self.student_courses
            .insert(student_id.to_string(), courses.clone())
            .await;
        Ok(courses)
    }

    async fn course(&self, course_id: &str) -> Result<Option<Course>> {
        if let Some(cached) = self.courses.get(course_id).await {
            return Ok(cached);
        }
        let course: Option<Course> = self.fetch(&format!("/courses/{}", course_id)).await?;
        self.courses
            .insert(course_id.to_string(), course.clone())
            .await;
        Ok(course)
    }
}

#[async_trait]
impl EnrollmentOracle for DirectoryClient {
    async fn is_enrolled(&self, student_id: &str, course_id: &str) -> Result<bool> {
        match &self.backend {
            Backend::Local(dir) => dir.is_enrolled(student_id, course_id).await,
            Backend::Remote(remote) => Ok(remote
                .roster(course_id)
                .await?
                .binary_search_by(|s| s.as_str().cmp(student_id))
                .is_ok()),
        }
    }

    async fn enrolled_students(&self, course_id: &str) -> Result<Vec<String>> {
        match &self.backend {
            Backend::Local(dir) => dir.enrolled_students(course_id).await,
            Backend::Remote(remote) => Ok(remote.roster(course_id).await?.as_ref().clone()),
        }
    }

    async fn courses_for_student(&self, student_id: &str) -> Result<Vec<String>> {
        match &self.backend {
            Backend::Local(dir) => dir.courses_for_student(student_id).await,
            Backend::Remote(remote) => Ok(remote.courses_of(student_id).await?.as_ref().clone()),
        }
    }
}

#[async_trait]
impl CourseCatalog for DirectoryClient {
    async fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
        match &self.backend {
            Backend::Local(dir) => dir.get_course(course_id).await,
            Backend::Remote(remote) => remote.course(course_id).await,
        }
    }
}
