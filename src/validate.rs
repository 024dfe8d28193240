//! Response parsing, deterministic repair, and invariants
//!
//! Raw model output is decoded into lenient shapes, repaired
//! where a deterministic default exists, and promoted into the
//! validated model from curriculum.rs. Anything that cannot be
//! repaired deterministically is rejected, never coerced. This
//! module performs no I/O and never calls a provider: given the
//! same raw text it always produces the same outcome.

use serde::Deserialize;
use log::debug;

use crate::curriculum::*;
use crate::error::ValidationError;

/// Certifications padded in when the model under-produces
pub const DEFAULT_CERTIFICATIONS: [&str; 3] =
[ "CompTIA Project+"
, "AWS Certified Cloud Practitioner"
, "Google Career Certificate"
];

/// Expected certification count after repair
pub const CERTIFICATION_COUNT: usize = 3;
/// Expected capstone project count after repair
pub const PROJECT_COUNT: usize = 4;
/// Teaching weeks; week 16 is final presentations
pub const TEACHING_WEEKS: u8 = 15;
/// Plausible per-semester credit band, logged but not enforced
pub const CREDIT_BAND: std::ops::RangeInclusive<u32> = 9..=15;

/// One deterministic correction applied during validation.
/// Lets callers and tests tell repaired output apart from
/// exact model output; repairs are never surfaced as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair
{   DefaultedProgramName
  , FilledTopics { course: String }
  , DefaultedDescription { course: String }
  , DefaultedWeeklyHours { course: String }
  , DefaultedObjectives
  , PaddedCertifications { added: usize }
  , TrimmedCertifications { removed: usize }
  , DroppedBlankCertifications { dropped: usize }
  , PaddedProjects { added: usize }
  , TrimmedProjects { removed: usize }
  , DroppedUntitledProjects { dropped: usize }
  , DefaultedReadingList
  , SynthesizedSchedule
  , AppendedFinalWeek
  , DefaultedAssessment
}

/// A validated value plus the repairs that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired<T>
{   pub value: T
  , pub repairs: Vec<Repair>
}

impl<T> Repaired<T>
{   /// True when the model output needed no correction
    pub fn is_exact(&self) -> bool
    {   self.repairs.is_empty()
    }
}

// ===== Pre-cleaning =====

/// Strip markdown fences and slice out the outermost JSON
/// object. Models wrap JSON in prose or code fences often
/// enough that this runs on every response.
pub fn pre_clean(raw: &str) -> String
{   let mut cleaned = String::with_capacity(raw.len());
    for line in raw.lines()
    {   let trimmed = line.trim_start();
        if trimmed.starts_with("```")
        {   continue;
        }
        cleaned.push_str(line);
        cleaned.push('\n');
    }

    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    match (start, end)
    {   (Some(s), Some(e)) if e > s => {
          cleaned[s..=e].to_string()
        }
      , _ => cleaned.trim().to_string()
    }
}

// ===== Raw shapes (lenient, pre-repair) =====

#[derive(Debug, Deserialize)]
struct RawCurriculum
{   program: Option<String>
  , #[serde(default)]
    semesters: Vec<RawSemester>
}

#[derive(Debug, Deserialize)]
struct RawSemester
{   semester: Option<u8>
  , #[serde(default)]
    subjects: Vec<RawSubject>
}

#[derive(Debug, Deserialize)]
struct RawSubject
{   name: Option<String>
  , code: Option<String>
  , credits: Option<i64>
  , hours_per_week: Option<u8>
  , description: Option<String>
  , topics: Option<Vec<String>>
}

#[derive(Debug, Deserialize)]
struct RawSyllabus
{   objectives: Option<Vec<String>>
  , units: Option<Vec<RawUnit>>
  , reading_list: Option<Vec<String>>
  , schedule: Option<Vec<RawScheduleEntry>>
  , assessment: Option<RawAssessment>
  , capstone_projects: Option<Vec<RawProject>>
  , certifications: Option<Vec<String>>
}

#[derive(Debug, Deserialize)]
struct RawUnit
{   title: Option<String>
  , weeks: Option<String>
}

#[derive(Debug, Deserialize)]
struct RawScheduleEntry
{   weeks: Option<String>
  , unit: Option<String>
}

#[derive(Debug, Deserialize)]
struct RawAssessment
{   assignments: Option<u8>
  , midterm: Option<u8>
  , final_project: Option<u8>
  , participation: Option<u8>
}

#[derive(Debug, Deserialize)]
struct RawProject
{   title: Option<String>
  , summary: Option<String>
}

// ===== Curriculum structure =====

/// Validate and repair a raw structure response against the
/// request that produced it.
pub fn validate_structure(
  raw: &str
, request: &crate::request::GenerationRequest
) -> Result<Repaired<CurriculumStructure>, ValidationError>
{   debug!("Validating structure response");
    let cleaned = pre_clean(raw);
    let parsed: RawCurriculum
      = serde_json::from_str(&cleaned)
        .map_err(|e| {
          ValidationError::Unparseable(e.to_string())
        })?;

    let mut repairs = Vec::new();

    let program = match parsed.program
    {   Some(name) if !name.trim().is_empty() => name
      , _ => {
          repairs.push(Repair::DefaultedProgramName);
          request.subject.clone()
        }
    };

    let expected = request.semester_equivalent() as usize;
    if parsed.semesters.len() != expected
    {   return Err(ValidationError::SchemaViolation(format!(
          "expected {} semesters, got {}",
          expected,
          parsed.semesters.len()
        )));
    }

    let mut semesters = Vec::with_capacity(expected);
    let mut seen_codes
      = std::collections::HashSet::new();

    for (position, raw_semester)
      in parsed.semesters.into_iter().enumerate()
    {   let index = (position + 1) as u8;
        if let Some(numbered) = raw_semester.semester
        {   if numbered != index
            {   return Err(ValidationError::SchemaViolation(
                  format!(
                    "semester {} numbered as {}",
                    index, numbered
                  )
                ));
            }
        }

        if raw_semester.subjects.is_empty()
        {   return Err(ValidationError::SchemaViolation(
              format!("semester {} has no courses", index)
            ));
        }

        let mut courses
          = Vec::with_capacity(raw_semester.subjects.len());
        for subject in raw_semester.subjects
        {   let course = repair_course(
              subject, &mut repairs
            )?;
            if !seen_codes.insert(course.code.clone())
            {   return Err(ValidationError::SchemaViolation(
                  format!(
                    "duplicate course code: {}", course.code
                  )
                ));
            }
            courses.push(course);
        }

        let semester = Semester
        {   index
          , courses
        };

        let credit_sum = semester.credit_sum();
        if !CREDIT_BAND.contains(&credit_sum)
        {   debug!(
              "Semester {} credit sum {} outside band {:?}",
              index, credit_sum, CREDIT_BAND
            );
        }

        semesters.push(semester);
    }

    Ok(Repaired
    {   value: CurriculumStructure
        {   program
          , semesters
        }
      , repairs
    })
}

fn repair_course(
  raw: RawSubject
, repairs: &mut Vec<Repair>
) -> Result<Course, ValidationError>
{   let title = raw.name
      .filter(|n| !n.trim().is_empty())
      .ok_or_else(|| {
        ValidationError::SchemaViolation(
          "course missing name".to_string()
        )
      })?;

    let code = raw.code
      .filter(|c| !c.trim().is_empty())
      .ok_or_else(|| {
        ValidationError::SchemaViolation(format!(
          "course \"{}\" missing code", title
        ))
      })?;

    let credits = match raw.credits
    {   Some(c) if (1..=5).contains(&c) => c as u8
      , Some(c) => {
          return Err(ValidationError::SchemaViolation(
            format!(
              "course {} credits {} outside 1-5", code, c
            )
          ));
        }
      , None => {
          return Err(ValidationError::SchemaViolation(
            format!("course {} missing credits", code)
          ));
        }
    };

    let weekly_hours = match raw.hours_per_week
    {   Some(h) => h
      , None => {
          repairs.push(Repair::DefaultedWeeklyHours
          {   course: code.clone()
          });
          4
        }
    };

    let description = match raw.description
    {   Some(d) if !d.trim().is_empty() => d
      , _ => {
          repairs.push(Repair::DefaultedDescription
          {   course: code.clone()
          });
          format!("Covers {} fundamentals.", title)
        }
    };

    let topics = match raw.topics
    {   Some(t) if !t.is_empty() => t
      , _ => {
          repairs.push(Repair::FilledTopics
          {   course: code.clone()
          });
          vec![
            format!("{} Fundamentals", title)
          , format!("Advanced {} Concepts", title)
          ]
        }
    };

    Ok(Course
    {   code
      , title
      , credits
      , weekly_hours
      , description
      , topics
    })
}

// ===== Syllabus =====

/// Validate and repair a raw syllabus response for one course.
pub fn validate_syllabus(
  raw: &str
, course: &str
, program: &str
) -> Result<Repaired<Syllabus>, ValidationError>
{   debug!("Validating syllabus response for: {}", course);
    let cleaned = pre_clean(raw);
    let parsed: RawSyllabus
      = serde_json::from_str(&cleaned)
        .map_err(|e| {
          ValidationError::Unparseable(e.to_string())
        })?;

    let mut repairs = Vec::new();

    let units = repair_units(parsed.units)?;

    let objectives = match parsed.objectives
    {   Some(o) if !o.is_empty() => o
      , _ => {
          repairs.push(Repair::DefaultedObjectives);
          vec![format!(
            "Understand the core concepts of {}.", course
          )]
        }
    };

    let certifications = repair_certifications(
      parsed.certifications.unwrap_or_default(),
      &mut repairs
    );

    let capstone_projects = repair_projects(
      parsed.capstone_projects.unwrap_or_default(),
      course,
      &mut repairs
    );

    let reading_list = match parsed.reading_list
    {   Some(r) if !r.is_empty() => r
      , _ => {
          repairs.push(Repair::DefaultedReadingList);
          vec![
            format!("Foundations of {}", course)
          , format!("{} in Practice", course)
          ]
        }
    };

    let schedule = repair_schedule(
      parsed.schedule, &units, &mut repairs
    );

    let assessment = repair_assessment(
      parsed.assessment, &mut repairs
    )?;

    Ok(Repaired
    {   value: Syllabus
        {   course: course.to_string()
          , program: program.to_string()
          , objectives
          , units
          , certifications
          , capstone_projects
          , reading_list
          , schedule
          , assessment
        }
      , repairs
    })
}

/// Parse "1-3" or "7" into an inclusive span
fn parse_week_span(text: &str) -> Option<WeekSpan>
{   let trimmed = text.trim();
    let (start, end) = match trimmed.split_once('-')
    {   Some((a, b)) => (
          a.trim().parse::<u8>().ok()?
        , b.trim().parse::<u8>().ok()?
        )
      , None => {
          let week = trimmed.parse::<u8>().ok()?;
          (week, week)
        }
    };
    if start == 0 || end < start || end > 52
    {   return None;
    }
    Some(WeekSpan { start, end })
}

/// Units are the backbone of a syllabus: they must exist and
/// their spans must partition the teaching weeks exactly, or
/// the response is rejected.
fn repair_units(
  raw: Option<Vec<RawUnit>>
) -> Result<Vec<SyllabusUnit>, ValidationError>
{   let raw_units = raw
      .filter(|u| !u.is_empty())
      .ok_or_else(|| {
        ValidationError::SchemaViolation(
          "syllabus has no units".to_string()
        )
      })?;

    let mut units = Vec::with_capacity(raw_units.len());
    for (position, raw_unit)
      in raw_units.into_iter().enumerate()
    {   let title = raw_unit.title
          .filter(|t| !t.trim().is_empty())
          .ok_or_else(|| {
            ValidationError::SchemaViolation(format!(
              "unit {} missing title", position + 1
            ))
          })?;

        let span_text = raw_unit.weeks
          .ok_or_else(|| {
            ValidationError::SchemaViolation(format!(
              "unit \"{}\" missing week span", title
            ))
          })?;

        let week_span = parse_week_span(&span_text)
          .ok_or_else(|| {
            ValidationError::SchemaViolation(format!(
              "unit \"{}\" has invalid week span \"{}\"",
              title, span_text
            ))
          })?;

        units.push(SyllabusUnit
        {   title
          , week_span
        });
    }

    // Spans must cover weeks 1..=TEACHING_WEEKS in order,
    // with no gaps and no overlaps
    let mut expected_start = 1u8;
    for unit in &units
    {   if unit.week_span.start != expected_start
        {   return Err(ValidationError::SchemaViolation(
              format!(
                "unit \"{}\" starts at week {}, expected {}",
                unit.title,
                unit.week_span.start,
                expected_start
              )
            ));
        }
        expected_start = unit.week_span.end + 1;
    }
    if expected_start != TEACHING_WEEKS + 1
    {   return Err(ValidationError::SchemaViolation(
          format!(
            "unit spans end at week {}, expected {}",
            expected_start - 1,
            TEACHING_WEEKS
          )
        ));
    }

    Ok(units)
}

/// Pad with the generic list (skipping duplicates), then trim,
/// so the result always has exactly CERTIFICATION_COUNT items.
fn repair_certifications(
  mut certifications: Vec<String>
, repairs: &mut Vec<Repair>
) -> Vec<String>
{   // Blank entries never count toward the expected total
    let before = certifications.len();
    certifications.retain(|c| !c.trim().is_empty());
    let dropped = before - certifications.len();
    if dropped > 0
    {   repairs.push(
          Repair::DroppedBlankCertifications { dropped }
        );
    }

    if certifications.len() < CERTIFICATION_COUNT
    {   let mut added = 0;
        for default in DEFAULT_CERTIFICATIONS
        {   if certifications.len() >= CERTIFICATION_COUNT
            {   break;
            }
            if !certifications
                 .iter()
                 .any(|c| c.as_str() == default)
            {   certifications.push(default.to_string());
                added += 1;
            }
        }
        repairs.push(Repair::PaddedCertifications { added });
    } else if certifications.len() > CERTIFICATION_COUNT
    {   let removed
          = certifications.len() - CERTIFICATION_COUNT;
        certifications.truncate(CERTIFICATION_COUNT);
        repairs.push(Repair::TrimmedCertifications { removed });
    }
    certifications
}

fn repair_projects(
  raw: Vec<RawProject>
, course: &str
, repairs: &mut Vec<Repair>
) -> Vec<ProjectIdea>
{   let raw_count = raw.len();
    let mut projects: Vec<ProjectIdea> = raw
      .into_iter()
      .filter_map(|p| {
        let title = p.title
          .filter(|t| !t.trim().is_empty())?;
        Some(ProjectIdea
        {   title
          , summary: p.summary.unwrap_or_default()
        })
      })
      .collect();

    let dropped = raw_count - projects.len();
    if dropped > 0
    {   repairs.push(
          Repair::DroppedUntitledProjects { dropped }
        );
    }

    if projects.len() < PROJECT_COUNT
    {   let added = PROJECT_COUNT - projects.len();
        while projects.len() < PROJECT_COUNT
        {   let number = projects.len() + 1;
            projects.push(ProjectIdea
            {   title: format!(
                  "{} Capstone Project {}", course, number
                )
              , summary: format!(
                  "Apply the {} course material to a \
                   realistic end-to-end build.",
                  course
                )
            });
        }
        repairs.push(Repair::PaddedProjects { added });
    } else if projects.len() > PROJECT_COUNT
    {   let removed = projects.len() - PROJECT_COUNT;
        projects.truncate(PROJECT_COUNT);
        repairs.push(Repair::TrimmedProjects { removed });
    }

    projects
}

/// The 16-week plan can always be rebuilt from validated
/// units, so a missing or malformed schedule is repaired
/// rather than rejected.
fn repair_schedule(
  raw: Option<Vec<RawScheduleEntry>>
, units: &[SyllabusUnit]
, repairs: &mut Vec<Repair>
) -> Vec<ScheduleEntry>
{   let parsed = raw.and_then(|entries| {
      if entries.is_empty()
      {   return None;
      }
      let mut schedule = Vec::with_capacity(entries.len());
      for entry in entries
      {   let weeks
            = parse_week_span(entry.weeks.as_deref()?)?;
          let unit_title = entry.unit?;
          schedule.push(ScheduleEntry
          {   weeks
            , unit_title
          });
      }
      Some(schedule)
    });

    let mut schedule = match parsed
    {   Some(s) => s
      , None => {
          repairs.push(Repair::SynthesizedSchedule);
          units
            .iter()
            .map(|u| ScheduleEntry
            {   weeks: u.week_span
              , unit_title: u.title.clone()
            })
            .collect()
        }
    };

    let covers_final_week = schedule
      .iter()
      .any(|e| e.weeks.end >= TEACHING_WEEKS + 1);
    if !covers_final_week
    {   repairs.push(Repair::AppendedFinalWeek);
        schedule.push(ScheduleEntry
        {   weeks: WeekSpan
            {   start: TEACHING_WEEKS + 1
              , end: TEACHING_WEEKS + 1
            }
          , unit_title:
              "Final project presentations".to_string()
        });
    }

    schedule
}

/// A missing or partial block gets the standard breakdown; a
/// complete block that does not sum to 100 is a model error
/// we refuse to second-guess.
fn repair_assessment(
  raw: Option<RawAssessment>
, repairs: &mut Vec<Repair>
) -> Result<AssessmentBreakdown, ValidationError>
{   let raw = match raw
    {   Some(r) => r
      , None => {
          repairs.push(Repair::DefaultedAssessment);
          return Ok(AssessmentBreakdown::default());
        }
    };

    match (
      raw.assignments,
      raw.midterm,
      raw.final_project,
      raw.participation
    )
    {   (Some(a), Some(m), Some(f), Some(p)) => {
          let assessment = AssessmentBreakdown
          {   assignments: a
            , midterm: m
            , final_project: f
            , participation: p
          };
          if assessment.total() != 100
          {   return Err(ValidationError::SchemaViolation(
                format!(
                  "assessment sums to {}, expected 100",
                  assessment.total()
                )
              ));
          }
          Ok(assessment)
        }
      , _ => {
          repairs.push(Repair::DefaultedAssessment);
          Ok(AssessmentBreakdown::default())
        }
    }
}
