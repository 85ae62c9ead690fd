//! Quiz generation on top of a pluggable text generator.
//!
//! The generator is anything that turns a prompt into text. Its reply is
//! expected to hold a `{"questions": [...]}` object, possibly wrapped in
//! markdown fences or chatter, which is cut out and validated here.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ContentError;
use crate::models::Subject;

pub type ContentResult<T> = std::result::Result<T, ContentError>;

pub trait ContentGenerator {
    fn generate(&self, prompt: &str) -> ContentResult<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionDifficulty {
    Easy,
    Medium,
    Hard,
}

impl QuestionDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionDifficulty::Easy => "easy",
            QuestionDifficulty::Medium => "medium",
            QuestionDifficulty::Hard => "hard",
        }
    }
}

/// Difficulty to aim for given a player's recent average score.
pub fn adaptive_difficulty(average_score: f64) -> QuestionDifficulty {
    if average_score >= 80.0 {
        QuestionDifficulty::Hard
    } else if average_score >= 60.0 {
        QuestionDifficulty::Medium
    } else {
        QuestionDifficulty::Easy
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizRequest {
    pub subject: Subject,
    pub grade: i32,
    pub topic: String,
    pub count: usize,
    pub difficulty: QuestionDifficulty,
}

impl QuizRequest {
    /// Five questions on the first weak topic, pitched at the player's level.
    pub fn adaptive(subject: Subject, grade: i32, average_score: f64, weak_topics: &[String]) -> Self {
        Self {
            subject,
            grade,
            topic: weak_topics
                .first()
                .cloned()
                .unwrap_or_else(|| "General".to_string()),
            count: 5,
            difficulty: adaptive_difficulty(average_score),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub en: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub od: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hi: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedOptions {
    pub en: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub od: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hi: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub id: String,
    pub question: LocalizedText,
    pub options: LocalizedOptions,
    #[serde(alias = "correctAnswer")]
    pub correct_answer: usize,
    pub explanation: LocalizedText,
    #[serde(default)]
    pub hint: Option<LocalizedText>,
    #[serde(default, alias = "culturalContext")]
    pub cultural_context: Option<LocalizedText>,
    pub difficulty: QuestionDifficulty,
    pub topic: String,
    pub grade: i32,
    pub subject: Subject,
}

impl GeneratedQuestion {
    fn answer_in_range(&self) -> bool {
        self.correct_answer < self.options.en.len()
    }
}

#[derive(Deserialize)]
struct QuestionBatch {
    questions: Vec<serde_json::Value>,
}

pub fn build_quiz_prompt(request: &QuizRequest) -> String {
    format!(
        r#"Generate {count} multiple-choice questions for the Odisha State Board curriculum.
Subject: {subject}
Grade: {grade}
Topic: {topic}
Difficulty: {difficulty}

Use examples from Odisha where they fit. Give text in English ("en"), Odia ("od") and Hindi ("hi").
Return ONLY a JSON object of this shape:
{{"questions": [{{"id": "q1", "question": {{"en": "..."}}, "options": {{"en": ["...", "...", "...", "..."]}}, "correct_answer": 0, "explanation": {{"en": "..."}}, "difficulty": "{difficulty}", "topic": "{topic}", "grade": {grade}, "subject": "{subject_id}"}}]}}"#,
        count = request.count,
        subject = request.subject.label(),
        subject_id = request.subject.as_str(),
        grade = request.grade,
        topic = request.topic,
        difficulty = request.difficulty.as_str(),
    )
}

/// Cuts the outermost JSON object out of generated text, ignoring markdown
/// fences and any prose around it.
pub fn extract_json(text: &str) -> ContentResult<&str> {
    let start = text.find('{').ok_or(ContentError::NoJson)?;
    let end = text.rfind('}').ok_or(ContentError::NoJson)?;
    if end < start {
        return Err(ContentError::NoJson);
    }
    Ok(&text[start..=end])
}

pub struct QuizService<G> {
    generator: G,
}

impl<G: ContentGenerator> QuizService<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Questions that parse and whose answer index points at an option.
    /// Anything else in the reply is dropped.
    pub fn generate_questions(&self, request: &QuizRequest) -> ContentResult<Vec<GeneratedQuestion>> {
        let prompt = build_quiz_prompt(request);
        let reply = self.generator.generate(&prompt)?;
        let batch: QuestionBatch = serde_json::from_str(extract_json(&reply)?)?;

        let mut questions = Vec::with_capacity(batch.questions.len());
        for raw in batch.questions {
            match serde_json::from_value::<GeneratedQuestion>(raw) {
                Ok(q) if q.answer_in_range() => questions.push(q),
                Ok(q) => warn!(question = %q.id, answer = q.correct_answer, "dropping question with out-of-range answer"),
                Err(e) => warn!(error = %e, "dropping malformed question"),
            }
        }

        debug!(
            subject = request.subject.as_str(),
            requested = request.count,
            kept = questions.len(),
            "quiz generated"
        );
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedGenerator(String);

    impl ContentGenerator for CannedGenerator {
        fn generate(&self, _prompt: &str) -> ContentResult<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingGenerator;

    impl ContentGenerator for FailingGenerator {
        fn generate(&self, _prompt: &str) -> ContentResult<String> {
            Err(ContentError::Generation("service unavailable".into()))
        }
    }

    fn request() -> QuizRequest {
        QuizRequest {
            subject: Subject::Science,
            grade: 8,
            topic: "Photosynthesis".into(),
            count: 2,
            difficulty: QuestionDifficulty::Medium,
        }
    }

    fn question_json(id: &str, answer: usize) -> String {
        format!(
            r#"{{"id": "{id}", "question": {{"en": "Which gas do plants absorb?", "od": "..."}},
                "options": {{"en": ["Oxygen", "Carbon dioxide", "Nitrogen"]}},
                "correctAnswer": {answer}, "explanation": {{"en": "Used in photosynthesis"}},
                "difficulty": "medium", "topic": "Photosynthesis", "grade": 8, "subject": "science"}}"#
        )
    }

    mod extract_json_tests {
        use super::*;

        #[test]
        fn strips_fences_and_prose() {
            let text = "Here you go:\n```json\n{\"questions\": []}\n```\nEnjoy!";
            assert_eq!(extract_json(text).unwrap(), "{\"questions\": []}");
        }

        #[test]
        fn keeps_nested_objects() {
            let text = r#"{"a": {"b": 1}}"#;
            assert_eq!(extract_json(text).unwrap(), text);
        }

        #[test]
        fn no_object_is_an_error() {
            assert!(matches!(extract_json("no json here"), Err(ContentError::NoJson)));
            assert!(matches!(extract_json("} backwards {"), Err(ContentError::NoJson)));
        }
    }

    mod adaptive_tests {
        use super::*;

        #[test]
        fn difficulty_thresholds() {
            assert_eq!(adaptive_difficulty(95.0), QuestionDifficulty::Hard);
            assert_eq!(adaptive_difficulty(80.0), QuestionDifficulty::Hard);
            assert_eq!(adaptive_difficulty(79.9), QuestionDifficulty::Medium);
            assert_eq!(adaptive_difficulty(60.0), QuestionDifficulty::Medium);
            assert_eq!(adaptive_difficulty(59.0), QuestionDifficulty::Easy);
        }

        #[test]
        fn adaptive_request_targets_weak_topic() {
            let req = QuizRequest::adaptive(Subject::Maths, 7, 65.0, &["Fractions".to_string()]);
            assert_eq!(req.topic, "Fractions");
            assert_eq!(req.count, 5);
            assert_eq!(req.difficulty, QuestionDifficulty::Medium);

            let req = QuizRequest::adaptive(Subject::Maths, 7, 20.0, &[]);
            assert_eq!(req.topic, "General");
            assert_eq!(req.difficulty, QuestionDifficulty::Easy);
        }
    }

    mod quiz_service_tests {
        use super::*;

        #[test]
        fn prompt_names_request_fields() {
            let prompt = build_quiz_prompt(&request());
            assert!(prompt.contains("Generate 2"));
            assert!(prompt.contains("Photosynthesis"));
            assert!(prompt.contains("Grade: 8"));
            assert!(prompt.contains("\"subject\": \"science\""));
        }

        #[test]
        fn parses_fenced_reply() {
            let reply = format!(
                "```json\n{{\"questions\": [{}, {}]}}\n```",
                question_json("q1", 1),
                question_json("q2", 0)
            );
            let service = QuizService::new(CannedGenerator(reply));

            let questions = service.generate_questions(&request()).unwrap();
            assert_eq!(questions.len(), 2);
            assert_eq!(questions[0].correct_answer, 1);
            assert_eq!(questions[0].options.en[1], "Carbon dioxide");
            assert_eq!(questions[0].question.od.as_deref(), Some("..."));
            assert!(questions[0].hint.is_none());
        }

        #[test]
        fn drops_out_of_range_and_malformed_questions() {
            let reply = format!(
                "{{\"questions\": [{}, {}, {{\"id\": \"broken\"}}]}}",
                question_json("ok", 2),
                question_json("bad", 3)
            );
            let service = QuizService::new(CannedGenerator(reply));

            let questions = service.generate_questions(&request()).unwrap();
            let ids: Vec<_> = questions.iter().map(|q| q.id.as_str()).collect();
            assert_eq!(ids, vec!["ok"]);
        }

        #[test]
        fn generator_failure_propagates() {
            let service = QuizService::new(FailingGenerator);
            assert!(matches!(
                service.generate_questions(&request()),
                Err(ContentError::Generation(_))
            ));
        }

        #[test]
        fn reply_without_json() {
            let service = QuizService::new(CannedGenerator("Sorry, I cannot help.".into()));
            assert!(matches!(
                service.generate_questions(&request()),
                Err(ContentError::NoJson)
            ));
        }

        #[test]
        fn reply_with_wrong_shape() {
            let service = QuizService::new(CannedGenerator("{\"items\": []}".into()));
            assert!(matches!(
                service.generate_questions(&request()),
                Err(ContentError::Parse(_))
            ));
        }
    }
}
