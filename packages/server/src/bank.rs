//! The question bank collaborator.
//!
//! The engine consumes read-only catalogs behind a trait object; the
//! shipped implementation loads JSON files from a directory at startup.
//! Nothing here is ever mutated by the engine.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use common::catalog::{Challenge, QuizQuestion};
use common::{Language, Round, Track};
use tracing::{info, warn};

#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Ordered question set for a quiz round and language variant.
    async fn quiz_questions(
        &self,
        round: Round,
        language: Language,
    ) -> anyhow::Result<Vec<QuizQuestion>>;

    /// Challenge catalog for a Round 3 track.
    async fn challenges(&self, track: Track) -> anyhow::Result<Vec<Challenge>>;

    async fn challenge(&self, track: Track, id: i32) -> anyhow::Result<Option<Challenge>> {
        Ok(self
            .challenges(track)
            .await?
            .into_iter()
            .find(|c| c.id == id))
    }
}

/// Catalog-backed bank reading `round{n}-{language}.json` and
/// `challenges.json` from a directory once at startup.
pub struct FileQuestionBank {
    quiz: HashMap<(i32, Language), Vec<QuizQuestion>>,
    challenges: Vec<Challenge>,
}

const LANGUAGES: &[Language] = &[Language::Python, Language::C];

impl FileQuestionBank {
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let mut quiz = HashMap::new();

        for round in [Round::One, Round::Two] {
            for &language in LANGUAGES {
                let path = dir.join(format!("round{}-{}.json", round.number(), language));
                if !path.exists() {
                    warn!(path = %path.display(), "Question catalog missing; round will be empty");
                    continue;
                }
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Reading {}", path.display()))?;
                let questions: Vec<QuizQuestion> = serde_json::from_str(&raw)
                    .with_context(|| format!("Parsing {}", path.display()))?;
                for q in &questions {
                    anyhow::ensure!(
                        q.options.len() == 4 && q.correct_answer < q.options.len(),
                        "Malformed question {} in {}",
                        q.id,
                        path.display()
                    );
                }
                info!(
                    round = round.number(),
                    language = %language,
                    count = questions.len(),
                    "Loaded question catalog"
                );
                quiz.insert((round.number(), language), questions);
            }
        }

        let challenges_path = dir.join("challenges.json");
        let challenges: Vec<Challenge> = if challenges_path.exists() {
            let raw = std::fs::read_to_string(&challenges_path)
                .with_context(|| format!("Reading {}", challenges_path.display()))?;
            let challenges: Vec<Challenge> = serde_json::from_str(&raw)
                .with_context(|| format!("Parsing {}", challenges_path.display()))?;
            info!(count = challenges.len(), "Loaded challenge catalog");
            challenges
        } else {
            warn!(path = %challenges_path.display(), "Challenge catalog missing");
            Vec::new()
        };

        Ok(Self { quiz, challenges })
    }
}

#[async_trait]
impl QuestionBank for FileQuestionBank {
    async fn quiz_questions(
        &self,
        round: Round,
        language: Language,
    ) -> anyhow::Result<Vec<QuizQuestion>> {
        Ok(self
            .quiz
            .get(&(round.number(), language))
            .cloned()
            .unwrap_or_default())
    }

    async fn challenges(&self, track: Track) -> anyhow::Result<Vec<Challenge>> {
        Ok(self
            .challenges
            .iter()
            .filter(|c| c.track == track)
            .cloned()
            .collect())
    }
}
