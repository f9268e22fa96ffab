//! Curriculum-versus-job analysis.

use std::sync::Arc;

use async_trait::async_trait;
use scrapjobs_common::{AppError, AppResult};
use serde::Serialize;

use crate::models::{Curriculum, Job, ResumeAnalysis};

/// Produces a [`ResumeAnalysis`] for a curriculum and a job.
#[async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    /// Analyze how well the curriculum fits the job.
    async fn analyze(&self, curriculum: &Curriculum, job: &Job) -> AppResult<ResumeAnalysis>;
}

/// A text-in, text-out language model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the prompt.
    async fn generate(&self, prompt: &str) -> AppResult<String>;
}

/// Job fields shown to the model.
#[derive(Serialize)]
struct JobForPrompt<'a> {
    title: &'a str,
    company: &'a str,
    location: &'a str,
    description_full: &'a str,
}

const RESPONSE_SHAPE: &str = r#"{
  "matchAnalysis": {
    "overallScoreNumeric": 0,
    "overallScoreQualitative": "",
    "summary": ""
  },
  "strengthsForThisJob": [
    { "point": "", "relevanceToJob": "" }
  ],
  "gapsAndImprovementAreas": [
    { "areaDescription": "", "jobRequirementImpacted": "" }
  ],
  "actionableResumeSuggestions": [
    {
      "suggestion": "",
      "curriculumSectionToApply": "",
      "exampleWording": "",
      "reasoningForThisJob": ""
    }
  ],
  "finalConsiderations": ""
}"#;

/// Build the analysis prompt for a curriculum and a job.
pub fn build_prompt(curriculum: &Curriculum, job: &Job) -> AppResult<String> {
    let curriculum_json = serde_json::to_string_pretty(curriculum)?;
    let job_json = serde_json::to_string_pretty(&JobForPrompt {
        title: &job.title,
        company: &job.company,
        location: &job.location,
        description_full: job.description.as_deref().unwrap_or_default(),
    })?;

    Ok(format!(
        "You are a career analyst who specializes in matching software engineering \
candidates to job openings. Compare the job description with the candidate's \
curriculum and assess how well they fit.

1. JOB DESCRIPTION:
{job_json}

2. CANDIDATE CURRICULUM (JSON):
{curriculum_json}

Using only the data above:
- Score the match from 0 to 100, give a qualitative rating and a short summary.
- List 3 to 5 strengths of the curriculum that are relevant to this job.
- List 2 to 4 gaps between the curriculum and the job requirements.
- Give concrete suggestions for improving the curriculum for this job, naming \
the section to change and example wording where possible.

Answer with JSON only, in exactly this shape:
{RESPONSE_SHAPE}
"
    ))
}

/// The text from the first `{` through the last `}`.
#[must_use]
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a model response into a [`ResumeAnalysis`].
pub fn parse_analysis(text: &str) -> AppResult<ResumeAnalysis> {
    let json = extract_json(text).ok_or_else(|| {
        AppError::ExternalService("analysis response contains no JSON object".to_string())
    })?;
    serde_json::from_str(json)
        .map_err(|e| AppError::ExternalService(format!("invalid analysis JSON: {e}")))
}

/// [`ResumeAnalyzer`] backed by a [`TextGenerator`].
#[derive(Clone)]
pub struct AiResumeAnalyzer {
    generator: Arc<dyn TextGenerator>,
}

impl AiResumeAnalyzer {
    /// Create a new analyzer.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl ResumeAnalyzer for AiResumeAnalyzer {
    async fn analyze(&self, curriculum: &Curriculum, job: &Job) -> AppResult<ResumeAnalysis> {
        let prompt = build_prompt(curriculum, job)?;
        let response = self.generator.generate(&prompt).await?;
        let analysis = parse_analysis(&response)?;

        tracing::debug!(
            job_id = job.id,
            curriculum_id = curriculum.id,
            score = analysis.match_analysis.overall_score_numeric,
            "Resume analysis completed"
        );

        Ok(analysis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct CannedGenerator(String);

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> AppResult<String> {
            Ok(self.0.clone())
        }
    }

    fn job() -> Job {
        Job {
            id: 7,
            site_id: 1,
            title: "Backend Engineer".to_string(),
            location: "Remote".to_string(),
            company: "Acme".to_string(),
            link: "https://jobs.example/7".to_string(),
            requisition_id: 7,
            description: Some("Build services in Rust".to_string()),
            last_seen_at: Utc::now(),
        }
    }

    #[test]
    fn test_extract_json_trims_fences() {
        let text = "Sure!\n```json\n{\"a\": {\"b\": 1}}\n```";
        assert_eq!(extract_json(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_extract_json_without_braces() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_analysis() {
        let text = r#"```json
{
  "matchAnalysis": {"overallScoreNumeric": 82, "overallScoreQualitative": "Strong", "summary": "Good fit"},
  "strengthsForThisJob": [{"point": "Rust", "relevanceToJob": "Core stack"}],
  "gapsAndImprovementAreas": [],
  "actionableResumeSuggestions": [],
  "finalConsiderations": "Apply"
}
```"#;
        let analysis = parse_analysis(text).unwrap();
        assert!((analysis.match_analysis.overall_score_numeric - 82.0).abs() < f64::EPSILON);
        assert_eq!(analysis.strengths_for_this_job[0].point, "Rust");
        assert_eq!(analysis.final_considerations, "Apply");
    }

    #[test]
    fn test_parse_analysis_rejects_invalid_json() {
        assert!(parse_analysis("{ not json }").is_err());
        assert!(parse_analysis("plain text").is_err());
    }

    #[test]
    fn test_prompt_embeds_job_and_curriculum() {
        let curriculum = Curriculum {
            title: "Systems Programmer".to_string(),
            skills: "Rust, Tokio".to_string(),
            ..Curriculum::default()
        };
        let prompt = build_prompt(&curriculum, &job()).unwrap();
        assert!(prompt.contains("\"title\": \"Backend Engineer\""));
        assert!(prompt.contains("\"description_full\": \"Build services in Rust\""));
        assert!(prompt.contains("Rust, Tokio"));
        assert!(prompt.contains("\"matchAnalysis\""));
    }

    #[tokio::test]
    async fn test_analyzer_parses_generator_output() {
        let analyzer = AiResumeAnalyzer::new(Arc::new(CannedGenerator(
            r#"{"matchAnalysis": {"overallScoreNumeric": 50}}"#.to_string(),
        )));
        let analysis = analyzer.analyze(&Curriculum::default(), &job()).await.unwrap();
        assert!((analysis.match_analysis.overall_score_numeric - 50.0).abs() < f64::EPSILON);
    }
}
