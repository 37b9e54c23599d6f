//! Contracts for the external enrollment oracle and course catalog.
//!
//! The engine consumes these; it never writes enrollment or course data.
//! [`InMemoryDirectory`] backs tests and the development mock mode.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::Result;
use crate::schedule::Course;

/// Answers course membership questions.
#[async_trait]
pub trait EnrollmentOracle: Send + Sync {
    async fn is_enrolled(&self, student_id: &str, course_id: &str) -> Result<bool>;

    /// All students enrolled in a course, sorted and deduplicated.
    async fn enrolled_students(&self, course_id: &str) -> Result<Vec<String>>;

    /// All courses a student is enrolled in, sorted and deduplicated.
    async fn courses_for_student(&self, student_id: &str) -> Result<Vec<String>>;
}

/// Supplies course schedules and instructor assignments.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn get_course(&self, course_id: &str) -> Result<Option<Course>>;
}

/// A (student, course) membership fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentFact {
    pub student_id: String,
    pub course_id: String,
}

/// Serializable directory contents for seeding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub enrollments: Vec<EnrollmentFact>,
}

/// In-process directory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    courses: RwLock<HashMap<String, Course>>,
    /// (course_id, student_id)
    enrollments: RwLock<BTreeSet<(String, String)>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        let directory = Self::new();
        for course in seed.courses {
            directory.add_course(course);
        }
        for fact in seed.enrollments {
            directory.enroll(&fact.student_id, &fact.course_id);
        }
        directory
    }

    pub fn add_course(&self, course: Course) {
        self.courses.write().insert(course.id.clone(), course);
    }

    pub fn enroll(&self, student_id: &str, course_id: &str) {
        self.enrollments
            .write()
            .insert((course_id.to_string(), student_id.to_string()));
    }

    pub fn unenroll(&self, student_id: &str, course_id: &str) {
        self.enrollments
            .write()
            .remove(&(course_id.to_string(), student_id.to_string()));
    }
}

#[async_trait]
impl EnrollmentOracle for InMemoryDirectory {
    async fn is_enrolled(&self, student_id: &str, course_id: &str) -> Result<bool> {
        Ok(self
            .enrollments
            .read()
            .contains(&(course_id.to_string(), student_id.to_string())))
    }

    async fn enrolled_students(&self, course_id: &str) -> Result<Vec<String>> {
        Ok(self
            .enrollments
            .read()
            .iter()
            .filter(|(course, _)| course == course_id)
            .map(|(_, student)| student.clone())
            .collect())
    }

    async fn courses_for_student(&self, student_id: &str) -> Result<Vec<String>> {
        let courses: BTreeSet<String> = self
            .enrollments
            .read()
            .iter()
            .filter(|(_, student)| student == student_id)
            .map(|(course, _)| course.clone())
            .collect();
        Ok(courses.into_iter().collect())
    }
}

#[async_trait]
impl CourseCatalog for InMemoryDirectory {
    async fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
        Ok(self.courses.read().get(course_id).cloned())
    }
}
