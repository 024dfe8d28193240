use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use currigen::GenerationKind;
use currigen::ProviderRole;
use currigen::config::ProviderCallOptions;
use currigen::error::{
  PipelineError, ProviderError, ProviderErrorKind
};
use currigen::orchestrator::GenerationOrchestrator;
use currigen::providers::{InferenceProvider, ProviderHealth};
use currigen::request::*;

fn init_logging()
{   let _ = env_logger::builder()
      .is_test(true)
      .try_init();
}

// ===== Mock provider =====

enum MockBehavior
{   Respond(String)
  , RespondAfterDelay(String, Duration)
  , Fail(ProviderErrorKind)
}

struct MockProvider
{   role: ProviderRole
  , behavior: MockBehavior
  , calls: Arc<AtomicUsize>
}

impl MockProvider
{   fn new(
      role: ProviderRole
    , behavior: MockBehavior
    ) -> (Box<Self>, Arc<AtomicUsize>)
    {   let calls = Arc::new(AtomicUsize::new(0));
        let provider = Box::new(MockProvider
        {   role
          , behavior
          , calls: calls.clone()
        });
        (provider, calls)
    }
}

#[async_trait]
impl InferenceProvider for MockProvider
{   fn role(&self) -> ProviderRole
    {   self.role
    }

    fn model(&self) -> &str
    {   "mock-model"
    }

    async fn call(
      &self
    , _prompt: &str
    , _options: &ProviderCallOptions
    ) -> Result<String, ProviderError>
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior
        {   MockBehavior::Respond(text) => Ok(text.clone())
          , MockBehavior::RespondAfterDelay(text, delay) => {
              tokio::time::sleep(*delay).await;
              Ok(text.clone())
            }
          , MockBehavior::Fail(kind) => Err(ProviderError
            {   role: self.role
              , kind: kind.clone()
            })
        }
    }

    async fn health(&self) -> ProviderHealth
    {   ProviderHealth
        {   role: self.role
          , reachable: true
          , model: "mock-model".to_string()
          , detail: None
        }
    }
}

// ===== Fixtures =====

fn ml_request(semesters: u8) -> GenerationRequest
{   GenerationRequest
    {   subject: "Machine Learning".to_string()
      , education_level: EducationLevel::Postgraduate
      , duration: semesters
      , unit: DurationUnit::Semesters
      , weekly_hours: HoursRange { min: 20, max: 25 }
      , industry_focus: None
    }
}

fn structure_json(semesters: usize) -> String
{   let blocks: Vec<String> = (1..=semesters)
      .map(|i| format!(
        r#"{{"semester": {i}, "subjects": [
          {{"name": "Course A{i}", "code": "ML{i}01", "credits": 3, "hours_per_week": 4, "description": "Intro material", "topics": ["T1", "T2"]}},
          {{"name": "Course B{i}", "code": "ML{i}02", "credits": 4, "hours_per_week": 5, "description": "Core material", "topics": ["T1", "T2"]}},
          {{"name": "Course C{i}", "code": "ML{i}03", "credits": 4, "hours_per_week": 5, "description": "Applied material", "topics": ["T1", "T2"]}}
        ]}}"#
      ))
      .collect();
    format!(
      r#"{{"program": "Machine Learning", "semesters": [{}]}}"#,
      blocks.join(",")
    )
}

fn syllabus_json_without_certifications() -> String
{   r#"{
      "objectives": ["Understand model training"],
      "units": [
        {"title": "Unit One", "weeks": "1-3"},
        {"title": "Unit Two", "weeks": "4-6"},
        {"title": "Unit Three", "weeks": "7-9"},
        {"title": "Unit Four", "weeks": "10-12"},
        {"title": "Unit Five", "weeks": "13-15"}
      ],
      "reading_list": ["Pattern Recognition by Bishop"],
      "schedule": [
        {"weeks": "1-3", "unit": "Unit One"},
        {"weeks": "4-6", "unit": "Unit Two"},
        {"weeks": "7-9", "unit": "Unit Three"},
        {"weeks": "10-12", "unit": "Unit Four"},
        {"weeks": "13-15", "unit": "Unit Five"},
        {"weeks": "16", "unit": "Final project presentations"}
      ],
      "assessment": {"assignments": 30, "midterm": 25, "final_project": 35, "participation": 10},
      "capstone_projects": [
        {"title": "P1", "summary": "s"},
        {"title": "P2", "summary": "s"},
        {"title": "P3", "summary": "s"},
        {"title": "P4", "summary": "s"}
      ]
    }"#.to_string()
}

fn orchestrator_with(
  primary: Box<MockProvider>
, fallback: Box<MockProvider>
) -> GenerationOrchestrator
{   GenerationOrchestrator::new(
      primary,
      fallback,
      ProviderCallOptions::primary_default(),
      ProviderCallOptions::fallback_default()
    )
}

// ===== Tests =====

#[tokio::test]
async fn first_try_success_never_touches_fallback()
{   init_logging();
    // The concrete scenario: Machine Learning, Masters level,
    // 4 semesters, schema-valid primary response
    let (primary, primary_calls) = MockProvider::new(
      ProviderRole::Primary,
      MockBehavior::Respond(structure_json(4))
    );
    let (fallback, fallback_calls) = MockProvider::new(
      ProviderRole::Fallback,
      MockBehavior::Respond(structure_json(4))
    );
    let orchestrator = orchestrator_with(primary, fallback);

    let result = orchestrator
      .generate(&ml_request(4), &GenerationKind::Structure)
      .await
      .expect("generation should succeed");

    let structure = result
      .as_structure()
      .expect("expected a structure document");
    assert_eq!(structure.semesters.len(), 4);
    assert_eq!(structure.program, "Machine Learning");
    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn identical_request_is_served_from_cache()
{   init_logging();
    let (primary, primary_calls) = MockProvider::new(
      ProviderRole::Primary,
      MockBehavior::Respond(structure_json(4))
    );
    let (fallback, fallback_calls) = MockProvider::new(
      ProviderRole::Fallback,
      MockBehavior::Respond(structure_json(4))
    );
    let orchestrator = orchestrator_with(primary, fallback);

    let first = orchestrator
      .generate(&ml_request(4), &GenerationKind::Structure)
      .await
      .unwrap();
    let second = orchestrator
      .generate(&ml_request(4), &GenerationKind::Structure)
      .await
      .unwrap();

    assert_eq!(first, second);
    // Second call hit the cache, no provider was invoked
    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn primary_timeout_fails_over_exactly_once()
{   init_logging();
    let (primary, primary_calls) = MockProvider::new(
      ProviderRole::Primary,
      MockBehavior::Fail(ProviderErrorKind::Timeout)
    );
    let (fallback, fallback_calls) = MockProvider::new(
      ProviderRole::Fallback,
      MockBehavior::Respond(structure_json(4))
    );
    let orchestrator = orchestrator_with(primary, fallback);

    let result = orchestrator
      .generate(&ml_request(4), &GenerationKind::Structure)
      .await
      .expect("fallback should rescue the request");

    assert_eq!(
      result.as_structure().unwrap().semesters.len(), 4
    );
    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn both_providers_failing_is_terminal_and_uncached()
{   init_logging();
    let (primary, primary_calls) = MockProvider::new(
      ProviderRole::Primary,
      MockBehavior::Fail(ProviderErrorKind::Timeout)
    );
    let (fallback, fallback_calls) = MockProvider::new(
      ProviderRole::Fallback,
      MockBehavior::Fail(
        ProviderErrorKind::ConnectionFailure(
          "connection refused".to_string()
        )
      )
    );
    let orchestrator = orchestrator_with(primary, fallback);

    let result = orchestrator
      .generate(&ml_request(4), &GenerationKind::Structure)
      .await;

    match result
    {   Err(PipelineError::AllProvidersFailed
        {   primary
          , fallback
        }) => {
          assert_eq!(primary.role, ProviderRole::Primary);
          assert_eq!(primary.kind, ProviderErrorKind::Timeout);
          assert_eq!(fallback.role, ProviderRole::Fallback);
        }
      , other => panic!(
          "expected AllProvidersFailed, got {:?}", other
        )
    }

    // Nothing was cached for the fingerprint: a retry goes
    // back to the providers
    assert!(orchestrator.cache().is_empty());
    let _ = orchestrator
      .generate(&ml_request(4), &GenerationKind::Structure)
      .await;
    assert_eq!(primary_calls.load(Ordering::SeqCst), 2);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalid_primary_output_retries_untried_fallback()
{   init_logging();
    // Primary answers, but with the wrong semester count;
    // the fallback has not been tried yet, so it gets one shot
    let (primary, primary_calls) = MockProvider::new(
      ProviderRole::Primary,
      MockBehavior::Respond(structure_json(3))
    );
    let (fallback, fallback_calls) = MockProvider::new(
      ProviderRole::Fallback,
      MockBehavior::Respond(structure_json(4))
    );
    let orchestrator = orchestrator_with(primary, fallback);

    let result = orchestrator
      .generate(&ml_request(4), &GenerationKind::Structure)
      .await
      .expect("fallback output should validate");

    assert_eq!(
      result.as_structure().unwrap().semesters.len(), 4
    );
    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_fallback_output_after_failover_is_terminal()
{   init_logging();
    // Primary is down and the fallback produces a semester
    // count mismatch: both providers are spent, the
    // validation failure surfaces
    let (primary, _) = MockProvider::new(
      ProviderRole::Primary,
      MockBehavior::Fail(ProviderErrorKind::Timeout)
    );
    let (fallback, fallback_calls) = MockProvider::new(
      ProviderRole::Fallback,
      MockBehavior::Respond(structure_json(3))
    );
    let orchestrator = orchestrator_with(primary, fallback);

    let result = orchestrator
      .generate(&ml_request(4), &GenerationKind::Structure)
      .await;

    assert!(matches!(
      result,
      Err(PipelineError::ValidationFailed(_))
    ));
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    assert!(orchestrator.cache().is_empty());
}

#[tokio::test]
async fn syllabus_gap_filling_happens_end_to_end()
{   init_logging();
    let (primary, _) = MockProvider::new(
      ProviderRole::Primary,
      MockBehavior::Respond(
        syllabus_json_without_certifications()
      )
    );
    let (fallback, fallback_calls) = MockProvider::new(
      ProviderRole::Fallback,
      MockBehavior::Fail(ProviderErrorKind::Timeout)
    );
    let orchestrator = orchestrator_with(primary, fallback);

    let kind = GenerationKind::Syllabus
    {   course: "Deep Learning".to_string()
    };
    let result = orchestrator
      .generate(&ml_request(4), &kind)
      .await
      .expect("repaired syllabus should validate");

    let syllabus = result
      .as_syllabus()
      .expect("expected a syllabus document");
    assert_eq!(syllabus.course, "Deep Learning");
    assert_eq!(syllabus.program, "Machine Learning");
    // Under-produced certifications were padded to the exact
    // deterministic default list
    assert_eq!(
      syllabus.certifications,
      currigen::validate::DEFAULT_CERTIFICATIONS
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
    );
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_identical_requests_coalesce()
{   init_logging();
    let (primary, primary_calls) = MockProvider::new(
      ProviderRole::Primary,
      MockBehavior::RespondAfterDelay(
        structure_json(4),
        Duration::from_millis(100)
      )
    );
    let (fallback, fallback_calls) = MockProvider::new(
      ProviderRole::Fallback,
      MockBehavior::Respond(structure_json(4))
    );
    let orchestrator
      = Arc::new(orchestrator_with(primary, fallback));

    let mut handles = Vec::new();
    for _ in 0..8
    {   let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
          orchestrator
            .generate(
              &ml_request(4), &GenerationKind::Structure
            )
            .await
        }));
    }

    let mut results = Vec::new();
    for handle in handles
    {   results.push(
          handle.await.unwrap().expect("should succeed")
        );
    }

    // All eight observed the same result from one call
    for result in &results
    {   assert_eq!(result, &results[0]);
    }
    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn different_fingerprints_do_not_share_results()
{   init_logging();
    let (primary, primary_calls) = MockProvider::new(
      ProviderRole::Primary,
      MockBehavior::Respond(structure_json(4))
    );
    let (fallback, _) = MockProvider::new(
      ProviderRole::Fallback,
      MockBehavior::Respond(structure_json(4))
    );
    let orchestrator = orchestrator_with(primary, fallback);

    let _ = orchestrator
      .generate(&ml_request(4), &GenerationKind::Structure)
      .await
      .unwrap();

    let mut other = ml_request(4);
    other.subject = "Data Science".to_string();
    let result = orchestrator
      .generate(&other, &GenerationKind::Structure)
      .await;

    // Different subject, different fingerprint: the second
    // request issued its own provider call
    assert!(result.is_ok());
    assert_eq!(primary_calls.load(Ordering::SeqCst), 2);
    assert_eq!(orchestrator.cache().len(), 2);
}

#[tokio::test]
async fn dropped_caller_releases_the_in_flight_marker()
{   init_logging();
    // The winner's caller imposes its own overall deadline
    // and drops the generate future mid-provider-call. The
    // in-flight marker must be released with it so a
    // coalesced waiter can proceed on its own.
    let (primary, primary_calls) = MockProvider::new(
      ProviderRole::Primary,
      MockBehavior::RespondAfterDelay(
        structure_json(4),
        Duration::from_millis(200)
      )
    );
    let (fallback, fallback_calls) = MockProvider::new(
      ProviderRole::Fallback,
      MockBehavior::Respond(structure_json(4))
    );
    let orchestrator
      = Arc::new(orchestrator_with(primary, fallback));

    let winner = {
      let orchestrator = orchestrator.clone();
      tokio::spawn(async move {
        tokio::time::timeout(
          Duration::from_millis(50),
          orchestrator.generate(
            &ml_request(4), &GenerationKind::Structure
          )
        ).await
      })
    };

    // Give the winner time to take the marker and start its
    // provider call before the waiter queues up behind it
    tokio::time::sleep(Duration::from_millis(10)).await;

    let waiter = {
      let orchestrator = orchestrator.clone();
      tokio::spawn(async move {
        orchestrator
          .generate(&ml_request(4), &GenerationKind::Structure)
          .await
      })
    };

    let winner_result = winner.await.unwrap();
    assert!(
      winner_result.is_err(),
      "winner should have hit its deadline"
    );

    let waiter_result = waiter
      .await
      .unwrap()
      .expect("waiter must not be stranded");
    assert_eq!(
      waiter_result.as_structure().unwrap().semesters.len(),
      4
    );

    // The winner's abandoned call plus the waiter's own
    assert_eq!(primary_calls.load(Ordering::SeqCst), 2);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn health_reports_both_slots_without_generating()
{   init_logging();
    let (primary, primary_calls) = MockProvider::new(
      ProviderRole::Primary,
      MockBehavior::Respond(structure_json(4))
    );
    let (fallback, fallback_calls) = MockProvider::new(
      ProviderRole::Fallback,
      MockBehavior::Respond(structure_json(4))
    );
    let orchestrator = orchestrator_with(primary, fallback);

    let health = orchestrator.health().await;
    assert!(health.healthy);
    assert_eq!(health.primary.role, ProviderRole::Primary);
    assert_eq!(health.fallback.role, ProviderRole::Fallback);
    assert_eq!(health.active_engine, "mock-model");
    // Health never invokes generation
    assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
}
