//! Validated curriculum and syllabus data model
//!
//! These types only ever exist after validation/repair; raw
//! provider output is decoded into looser shapes first (see
//! validate.rs) and promoted into this model once invariants
//! hold.

use serde::{Deserialize, Serialize};

/// One course inside a semester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course
{   /// Unique course code, e.g. "ML101"
    pub code: String
  , pub title: String
  , /// Credit weight, 1-5
    pub credits: u8
  , pub weekly_hours: u8
  , pub description: String
  , /// At least two topics after repair
    pub topics: Vec<String>
}

/// One semester of the program, 1-indexed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester
{   pub index: u8
  , pub courses: Vec<Course>
}

impl Semester
{   /// Total credit load, used for the plausibility band check
    pub fn credit_sum(&self) -> u32
    {   self.courses
          .iter()
          .map(|c| c.credits as u32)
          .sum()
    }
}

/// Whole-program curriculum outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumStructure
{   pub program: String
  , pub semesters: Vec<Semester>
}

/// Inclusive week range inside a 16-week course
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSpan
{   pub start: u8
  , pub end: u8
}

impl std::fmt::Display for WeekSpan
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   if self.start == self.end
        {   write!(f, "Week {}", self.start)
        } else
        {   write!(f, "Weeks {}-{}", self.start, self.end)
        }
    }
}

/// One teaching unit of a syllabus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusUnit
{   pub title: String
  , pub week_span: WeekSpan
}

/// A capstone project suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIdea
{   pub title: String
  , pub summary: String
}

/// Week-by-week plan entry mapping a span onto a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry
{   pub weeks: WeekSpan
  , pub unit_title: String
}

/// Grade composition; percentages sum to 100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentBreakdown
{   pub assignments: u8
  , pub midterm: u8
  , pub final_project: u8
  , pub participation: u8
}

impl AssessmentBreakdown
{   pub fn total(&self) -> u32
    {   self.assignments as u32
          + self.midterm as u32
          + self.final_project as u32
          + self.participation as u32
    }
}

impl Default for AssessmentBreakdown
{   fn default() -> Self
    {   AssessmentBreakdown
        {   assignments: 30
          , midterm: 25
          , final_project: 35
          , participation: 10
        }
    }
}

/// Detailed teaching plan for a single course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Syllabus
{   pub course: String
  , pub program: String
  , pub objectives: Vec<String>
  , /// Unit spans partition weeks 1-15; week 16 is reserved
    /// for final project presentations
    pub units: Vec<SyllabusUnit>
  , /// Exactly three after repair
    pub certifications: Vec<String>
  , /// Exactly four after repair
    pub capstone_projects: Vec<ProjectIdea>
  , pub reading_list: Vec<String>
  , /// 16-week plan derived from the units when absent
    pub schedule: Vec<ScheduleEntry>
  , pub assessment: AssessmentBreakdown
}

/// What the pipeline returns and the cache stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratedDocument
{   Structure(CurriculumStructure)
  , Syllabus(Syllabus)
}

impl GeneratedDocument
{   pub fn as_structure(&self) -> Option<&CurriculumStructure>
    {   match self
        {   GeneratedDocument::Structure(s) => Some(s)
          , GeneratedDocument::Syllabus(_) => None
        }
    }

    pub fn as_syllabus(&self) -> Option<&Syllabus>
    {   match self
        {   GeneratedDocument::Structure(_) => None
          , GeneratedDocument::Syllabus(s) => Some(s)
        }
    }
}
